pub mod amount;
pub mod assets;
pub mod balance;
pub mod config;
pub mod elements_rpc;
pub mod error;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export main functionality for easier access
pub use amount::{AmountError, btc_to_sats, parse_send_amount, sats_to_btc_string};
pub use assets::{AssetError, AssetId, AssetRegistry};
pub use balance::{BalanceEntry, DisplayAmount, UtxoOutput};
pub use config::{Config, ElementsConfig};
pub use elements_rpc::{ElementsRpc, ElementsRpcClient, RpcError};
pub use error::Error;
pub use wallet::{SendRequest, SendResult};
