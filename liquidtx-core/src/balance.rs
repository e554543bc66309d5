use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::amount::{AmountError, btc_f64_to_sats, btc_value_to_sats, sats_to_btc_string};
use crate::assets::{AssetId, AssetRegistry};
use crate::elements_rpc::Utxo;

/// An amount as shown to the user: bitcoin as an 8-decimal string, every
/// other asset as an integer count of units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayAmount {
    Btc(String),
    Units(u64),
}

impl DisplayAmount {
    pub fn new(sats: u64, is_bitcoin: bool) -> Self {
        if is_bitcoin {
            Self::Btc(sats_to_btc_string(sats))
        } else {
            Self::Units(sats)
        }
    }
}

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Btc(btc) => f.write_str(btc),
            Self::Units(units) => write!(f, "{units}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub label: String,
    pub asset_id: Option<AssetId>,
    pub amount: DisplayAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtxoOutput {
    pub txid: String,
    pub vout: u32,
    pub address: Option<String>,
    pub label: Option<String>,
    pub asset_id: Option<String>,
    pub asset_label: Option<String>,
    pub amount: DisplayAmount,
    pub confirmations: u32,
    pub spendable: bool,
    pub safe: bool,
}

/// Formats the raw `getbalance` object. Keys may be labels or asset ids;
/// they are relabelled through the registry when they resolve. Keys the
/// registry does not know are kept verbatim and shown as unit counts.
pub fn format_balances(
    raw: &serde_json::Map<String, Value>,
    registry: &AssetRegistry,
) -> Result<Vec<BalanceEntry>, AmountError> {
    raw.iter()
        .map(|(key, value)| {
            let asset_id = registry.resolve(key).ok();
            let is_bitcoin = asset_id.as_ref().is_some_and(|id| registry.is_bitcoin(id));
            let label = asset_id
                .as_ref()
                .and_then(|id| registry.label_for(id))
                .unwrap_or(key.as_str())
                .to_string();
            let sats = btc_value_to_sats(value)?;
            Ok(BalanceEntry {
                label,
                asset_id,
                amount: DisplayAmount::new(sats, is_bitcoin),
            })
        })
        .collect()
}

pub fn filter_balances(entries: Vec<BalanceEntry>, asset: &AssetId) -> Vec<BalanceEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.asset_id.as_ref() == Some(asset))
        .collect()
}

/// Formats wallet UTXOs, optionally keeping only those of one asset.
pub fn format_utxos(
    utxos: Vec<Utxo>,
    registry: &AssetRegistry,
    asset: Option<&AssetId>,
) -> Result<Vec<UtxoOutput>, AmountError> {
    let mut outputs = Vec::with_capacity(utxos.len());
    for utxo in utxos {
        let asset_id = utxo.asset.as_deref().and_then(|a| a.parse::<AssetId>().ok());
        if asset.is_some() && asset_id.as_ref() != asset {
            continue;
        }
        let is_bitcoin = asset_id.as_ref().is_some_and(|id| registry.is_bitcoin(id));
        let asset_label = asset_id
            .as_ref()
            .and_then(|id| registry.label_for(id))
            .map(str::to_string);

        outputs.push(UtxoOutput {
            amount: DisplayAmount::new(btc_f64_to_sats(utxo.amount)?, is_bitcoin),
            txid: utxo.txid,
            vout: utxo.vout,
            address: utxo.address,
            label: utxo.label,
            asset_id: utxo.asset,
            asset_label,
            confirmations: utxo.confirmations,
            spendable: utxo.spendable,
            safe: utxo.safe,
        });
    }
    Ok(outputs)
}
