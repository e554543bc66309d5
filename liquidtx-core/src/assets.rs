use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::Config;
use crate::elements_rpc::{ElementsRpc, RpcError};

/// Label the node (and configuration) use for the network's native asset.
pub const BITCOIN_LABEL: &str = "bitcoin";

/// Policy asset id (hex, BE) for Liquid mainnet.
pub const LIQUID_POLICY_ASSET: &str =
    "6f0279e9ed041c3d710a9f57d0c02928416460c4b722ae3457a11eec381c526d";

const ASSET_ID_HEX_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Unknown asset: '{0}'")]
    UnknownAsset(String),
    #[error("Invalid asset id '{0}': expected 64 hex characters")]
    InvalidAssetId(String),
}

/// A 64-character hex asset identifier, normalised to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AssetId {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != ASSET_ID_HEX_LEN || hex::decode(s).is_err() {
            return Err(AssetError::InvalidAssetId(s.to_string()));
        }
        Ok(Self(s.to_lowercase()))
    }
}

impl TryFrom<String> for AssetId {
    type Error = AssetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Returns true when the label map has to be completed with the node's
/// `dumpassetlabels` output: either the configuration defines no assets or
/// the caller asked for a full refresh.
pub fn needs_node_labels(config: &Config, full: bool) -> bool {
    full || config.assets.is_empty()
}

/// Bidirectional mapping between asset labels and asset ids.
///
/// Built once per invocation and read-only afterwards. Configuration
/// entries win over node-reported ones, both for a label and for the label
/// shown for an id. Among labels from the same source pointing at one id
/// the lexicographically smallest is shown.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    labels: BTreeMap<String, AssetId>,
    values: BTreeMap<AssetId, String>,
    bitcoin: AssetId,
}

impl AssetRegistry {
    pub fn build(
        config_assets: &BTreeMap<String, String>,
        node_labels: Option<&BTreeMap<String, String>>,
    ) -> Self {
        let config_entries = parse_entries(config_assets, "configuration");
        let node_entries = node_labels
            .map(|labels| parse_entries(labels, "node"))
            .unwrap_or_default();

        let mut labels = config_entries.clone();
        for (label, id) in &node_entries {
            labels.entry(label.clone()).or_insert_with(|| id.clone());
        }

        let default_bitcoin = AssetId(LIQUID_POLICY_ASSET.to_string());
        let bitcoin = labels
            .entry(BITCOIN_LABEL.to_string())
            .or_insert(default_bitcoin)
            .clone();

        // BTreeMap iteration is ordered, so or_insert keeps the smallest label
        let mut values = BTreeMap::new();
        for (label, id) in &config_entries {
            values.entry(id.clone()).or_insert_with(|| label.clone());
        }
        for (label, id) in &labels {
            values.entry(id.clone()).or_insert_with(|| label.clone());
        }

        debug!(
            "Asset registry: {count} labels, bitcoin = {bitcoin}",
            count = labels.len()
        );
        Self {
            labels,
            values,
            bitcoin,
        }
    }

    /// Builds the registry from configuration, asking the node for its label
    /// dump when [`needs_node_labels`] says so.
    pub async fn load<R>(rpc: &R, config: &Config, full: bool) -> Result<Self, RpcError>
    where
        R: ElementsRpc + ?Sized,
    {
        let node_labels = if needs_node_labels(config, full) {
            Some(rpc.dump_asset_labels().await?)
        } else {
            None
        };
        Ok(Self::build(&config.assets, node_labels.as_ref()))
    }

    /// Resolves a label, an asset id or the literal `bitcoin` to an asset id.
    pub fn resolve(&self, token: &str) -> Result<AssetId, AssetError> {
        let token = token.trim();
        let as_id = AssetId::from_str(token).ok();

        if token == BITCOIN_LABEL || as_id.as_ref() == Some(&self.bitcoin) {
            return Ok(self.bitcoin.clone());
        }
        if let Some(id) = as_id.filter(|id| self.values.contains_key(id)) {
            return Ok(id);
        }
        if let Some(id) = self.labels.get(token) {
            return Ok(id.clone());
        }
        Err(AssetError::UnknownAsset(token.to_string()))
    }

    pub fn label_for(&self, id: &AssetId) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn bitcoin(&self) -> &AssetId {
        &self.bitcoin
    }

    pub fn is_bitcoin(&self, id: &AssetId) -> bool {
        *id == self.bitcoin
    }

    pub fn labels(&self) -> &BTreeMap<String, AssetId> {
        &self.labels
    }
}

fn parse_entries(raw: &BTreeMap<String, String>, source: &str) -> BTreeMap<String, AssetId> {
    raw.iter()
        .filter_map(|(label, id)| match id.parse::<AssetId>() {
            Ok(id) => Some((label.clone(), id)),
            Err(e) => {
                warn!("Skipping {source} asset label '{label}': {e}");
                None
            }
        })
        .collect()
}
