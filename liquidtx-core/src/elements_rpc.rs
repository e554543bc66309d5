use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::assets::AssetId;
use crate::config::ElementsConfig;

/// Oldest node release the wallet calls are known to work with (0.17.0.1).
pub const MIN_SUPPORTED_ELEMENTS_VERSION: u64 = 170001;

const LISTUNSPENT_MAX_CONFIRMATIONS: u32 = 9999999;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Failed to connect to Elements node at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Authentication failed (HTTP {status}): check the RPC username and password")]
    Unauthorized { status: u16 },
    #[error("HTTP error: {status}")]
    Http { status: u16 },
    #[error("RPC error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
    #[error("Invalid Elements URL '{0}'")]
    InvalidUrl(String),
    #[error("Node version ({found:06}) not supported (min: {min:06})")]
    UnsupportedVersion { found: u64, min: u64 },
}

impl RpcError {
    /// Process exit status: 3 for errors reported by the node, 4 when the
    /// node could not be reached or refused the credentials, 5 for an
    /// unsupported node release.
    pub fn exit_code(&self) -> u8 {
        match self {
            RpcError::Node { .. } | RpcError::InvalidResponse(_) => 3,
            RpcError::Connection { .. }
            | RpcError::Unauthorized { .. }
            | RpcError::Http { .. }
            | RpcError::InvalidUrl(_) => 4,
            RpcError::UnsupportedVersion { .. } => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub version: u64,
    #[serde(default)]
    pub subversion: String,
    #[serde(default)]
    pub protocolversion: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Utxo {
    pub txid: String,
    pub vout: u32,
    pub amount: f64, // BTC denominated, as reported by the node
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "scriptPubKey", default)]
    pub script_pub_key: String,
    pub confirmations: u32,
    #[serde(default)]
    pub spendable: bool,
    #[serde(default)]
    pub solvable: bool,
    #[serde(default)]
    pub safe: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub hex: String,
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct ReceivedByAddress {
    address: String,
}

/// The JSON-RPC capability of an Elements node.
///
/// Implementors only provide [`ElementsRpc::call`]; the wallet operations are
/// built on top of it.
#[async_trait]
pub trait ElementsRpc: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    async fn get_network_info(&self) -> Result<NetworkInfo, RpcError> {
        let result = self.call("getnetworkinfo", json!([])).await?;
        parse_result("getnetworkinfo", result)
    }

    /// Fails with [`RpcError::UnsupportedVersion`] on nodes older than
    /// [`MIN_SUPPORTED_ELEMENTS_VERSION`].
    async fn check_version(&self) -> Result<NetworkInfo, RpcError> {
        let info = self.get_network_info().await?;
        if info.version < MIN_SUPPORTED_ELEMENTS_VERSION {
            return Err(RpcError::UnsupportedVersion {
                found: info.version,
                min: MIN_SUPPORTED_ELEMENTS_VERSION,
            });
        }
        debug!(
            "Connected to Elements node {subversion} ({version})",
            subversion = info.subversion,
            version = info.version
        );
        Ok(info)
    }

    async fn get_new_address(&self, label: &str, address_type: &str) -> Result<String, RpcError> {
        let result = self
            .call("getnewaddress", json!([label, address_type]))
            .await?;
        parse_result("getnewaddress", result)
    }

    /// Addresses assigned to `label`, or every wallet address (including
    /// unused ones) when no label is given.
    async fn list_addresses(&self, label: Option<&str>) -> Result<Vec<String>, RpcError> {
        match label {
            Some(label) => {
                let result = self.call("getaddressesbylabel", json!([label])).await?;
                let by_address: BTreeMap<String, Value> =
                    parse_result("getaddressesbylabel", result)?;
                Ok(by_address.into_keys().collect())
            }
            None => {
                let result = self
                    .call("listreceivedbyaddress", json!([0, true]))
                    .await?;
                let received: Vec<ReceivedByAddress> =
                    parse_result("listreceivedbyaddress", result)?;
                Ok(received.into_iter().map(|r| r.address).collect())
            }
        }
    }

    /// Wallet UTXOs including unconfirmed ones, optionally restricted to a
    /// set of addresses.
    async fn list_unspent(&self, addresses: &[String]) -> Result<Vec<Utxo>, RpcError> {
        let result = self
            .call(
                "listunspent",
                json!([0, LISTUNSPENT_MAX_CONFIRMATIONS, addresses]),
            )
            .await?;
        parse_result("listunspent", result)
    }

    async fn sign_raw_transaction_with_wallet(
        &self,
        tx_hex: &str,
    ) -> Result<SignedTransaction, RpcError> {
        let result = self
            .call("signrawtransactionwithwallet", json!([tx_hex]))
            .await?;
        parse_result("signrawtransactionwithwallet", result)
    }

    /// The node's label -> asset id table.
    async fn dump_asset_labels(&self) -> Result<BTreeMap<String, String>, RpcError> {
        let result = self.call("dumpassetlabels", json!([])).await?;
        parse_result("dumpassetlabels", result)
    }

    /// Wallet balances keyed by asset label or asset id. Nodes answering with
    /// a single number are treated as holding bitcoin only.
    async fn get_balance(&self) -> Result<serde_json::Map<String, Value>, RpcError> {
        match self.call("getbalance", json!([])).await? {
            Value::Object(balances) => Ok(balances),
            amount @ Value::Number(_) => {
                let mut balances = serde_json::Map::new();
                balances.insert(crate::assets::BITCOIN_LABEL.to_string(), amount);
                Ok(balances)
            }
            other => Err(RpcError::InvalidResponse(format!(
                "getbalance: unexpected result {other}"
            ))),
        }
    }

    /// Sends `amount` (BTC-denominated decimal string) of `asset` and returns
    /// the transaction id. Passed as named parameters since the positional
    /// layout of `sendtoaddress` differs between node releases.
    async fn send_to_address(
        &self,
        address: &str,
        amount: &str,
        asset: &AssetId,
    ) -> Result<String, RpcError> {
        let result = self
            .call(
                "sendtoaddress",
                json!({
                    "address": address,
                    "amount": amount,
                    "assetlabel": asset.as_str(),
                }),
            )
            .await?;
        parse_result("sendtoaddress", result)
    }

    async fn wallet_lock(&self) -> Result<(), RpcError> {
        self.call("walletlock", json!([])).await?;
        Ok(())
    }

    async fn wallet_passphrase(&self, passphrase: &str, timeout_secs: u64) -> Result<(), RpcError> {
        self.call("walletpassphrase", json!([passphrase, timeout_secs]))
            .await?;
        Ok(())
    }

    async fn wallet_passphrase_change(&self, old: &str, new: &str) -> Result<(), RpcError> {
        self.call("walletpassphrasechange", json!([old, new]))
            .await?;
        Ok(())
    }
}

fn parse_result<T: DeserializeOwned>(method: &str, result: Value) -> Result<T, RpcError> {
    serde_json::from_value(result)
        .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")))
}

/// HTTP JSON-RPC client for an Elements node.
#[derive(Debug)]
pub struct ElementsRpcClient {
    pub url: String,
    pub auth: Option<(String, String)>,
    client: reqwest::Client,
}

impl ElementsRpcClient {
    pub fn new(url: String, auth: Option<(String, String)>) -> Self {
        Self {
            url,
            auth,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &ElementsConfig) -> Self {
        Self::new(config.rpc_url(), config.credentials())
    }

    /// Builds a client from a URL such as `http://user:pw@host:7041/`.
    /// Credentials embedded in the URL are moved into basic auth.
    pub fn from_url(elements_url: &str) -> Result<Self, RpcError> {
        let mut url =
            Url::parse(elements_url).map_err(|_| RpcError::InvalidUrl(elements_url.to_string()))?;

        let auth = if url.username().is_empty() {
            None
        } else {
            Some((
                url.username().to_string(),
                url.password().unwrap_or_default().to_string(),
            ))
        };
        url.set_username("")
            .and_then(|_| url.set_password(None))
            .map_err(|_| RpcError::InvalidUrl(elements_url.to_string()))?;

        Ok(Self::new(url.to_string(), auth))
    }

    /// Prefers an explicit URL over the configured host, port and wallet.
    pub fn connect(elements_url: Option<&str>, config: &ElementsConfig) -> Result<Self, RpcError> {
        match elements_url.filter(|u| !u.is_empty()) {
            Some(url) => Self::from_url(url),
            None => Ok(Self::from_config(config)),
        }
    }
}

#[async_trait]
impl ElementsRpc for ElementsRpcClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        debug!("RPC call: {method}");
        let request_body = json!({
            "jsonrpc": "1.0",
            "id": "liquidtx",
            "method": method,
            "params": params
        });

        let mut request = self.client.post(&self.url).json(&request_body);

        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }

        let connection_error = |source| RpcError::Connection {
            url: self.url.clone(),
            source,
        };
        let response = request.send().await.map_err(connection_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RpcError::Unauthorized {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(connection_error)?;

        // Nodes report RPC errors with HTTP 500/404 and a JSON body
        let json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Http {
                    status: status.as_u16(),
                });
            }
            Err(e) => return Err(RpcError::InvalidResponse(e.to_string())),
        };

        if let Some(error) = json.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Node {
                code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        if !status.is_success() {
            return Err(RpcError::Http {
                status: status.as_u16(),
            });
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| RpcError::InvalidResponse("missing result".to_string()))
    }
}
