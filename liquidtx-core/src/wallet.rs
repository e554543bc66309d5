use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::amount::{parse_send_amount, sats_to_btc_string};
use crate::assets::{AssetId, AssetRegistry};
use crate::balance::{
    BalanceEntry, DisplayAmount, UtxoOutput, filter_balances, format_balances, format_utxos,
};
use crate::config::Config;
use crate::elements_rpc::{ElementsRpc, SignedTransaction};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub address: String,
    /// Decimal BTC (or `sats`-suffixed) for bitcoin, integer units otherwise
    pub amount: String,
    /// Asset label, asset id or `bitcoin`
    pub asset: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResult {
    pub txid: String,
    pub address: String,
    pub asset_id: AssetId,
    pub asset_label: Option<String>,
    pub amount: DisplayAmount,
}

/// Wallet balances, relabelled and formatted, optionally for one asset only.
pub async fn get_balances<R>(
    rpc: &R,
    config: &Config,
    asset: Option<&str>,
    full: bool,
) -> Result<Vec<BalanceEntry>>
where
    R: ElementsRpc + ?Sized,
{
    let registry = AssetRegistry::load(rpc, config, full).await?;
    let asset = asset.map(|token| registry.resolve(token)).transpose()?;

    let raw = rpc.get_balance().await?;
    let entries = format_balances(&raw, &registry)?;
    Ok(match asset {
        Some(asset) => filter_balances(entries, &asset),
        None => entries,
    })
}

pub async fn list_unspent<R>(
    rpc: &R,
    config: &Config,
    asset: Option<&str>,
    full: bool,
) -> Result<Vec<UtxoOutput>>
where
    R: ElementsRpc + ?Sized,
{
    let registry = AssetRegistry::load(rpc, config, full).await?;
    let asset = asset.map(|token| registry.resolve(token)).transpose()?;

    let utxos = rpc.list_unspent(&[]).await?;
    debug!("Node reported {count} UTXOs", count = utxos.len());
    Ok(format_utxos(utxos, &registry, asset.as_ref())?)
}

/// Resolves the asset, validates the amount and sends. Nothing is sent when
/// the asset is unknown or the amount is not positive.
pub async fn send<R>(
    rpc: &R,
    config: &Config,
    request: &SendRequest,
    full: bool,
) -> Result<SendResult>
where
    R: ElementsRpc + ?Sized,
{
    let registry = AssetRegistry::load(rpc, config, full).await?;
    let asset_id = registry.resolve(&request.asset)?;
    let is_bitcoin = registry.is_bitcoin(&asset_id);
    let sats = parse_send_amount(&request.amount, is_bitcoin)?;
    let amount_btc = sats_to_btc_string(sats);

    info!(
        "Sending {amount} of {asset_id} to {address}",
        amount = request.amount,
        address = request.address
    );
    let txid = rpc
        .send_to_address(&request.address, &amount_btc, &asset_id)
        .await?;

    Ok(SendResult {
        txid,
        address: request.address.clone(),
        asset_label: registry.label_for(&asset_id).map(str::to_string),
        asset_id,
        amount: DisplayAmount::new(sats, is_bitcoin),
    })
}

/// Normalises a raw transaction read from a file: whitespace is dropped and
/// the remainder must be non-empty hex.
pub fn parse_raw_transaction(content: &str) -> Result<String> {
    let tx: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    if tx.is_empty() {
        return Err(Error::InvalidTransaction("empty input".to_string()));
    }
    hex::decode(&tx).map_err(|e| Error::InvalidTransaction(e.to_string()))?;
    Ok(tx)
}

pub async fn sign_raw_transaction<R>(rpc: &R, content: &str) -> Result<SignedTransaction>
where
    R: ElementsRpc + ?Sized,
{
    let tx = parse_raw_transaction(content)?;
    let signed = rpc.sign_raw_transaction_with_wallet(&tx).await?;
    if !signed.complete {
        info!("Transaction is only partially signed");
    }
    Ok(signed)
}
