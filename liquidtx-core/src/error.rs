use crate::amount::AmountError;
use crate::assets::AssetError;
use crate::elements_rpc::RpcError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("Invalid raw transaction: {0}")]
    InvalidTransaction(String),
    #[error("{0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Amount(_)
            | Error::Asset(_)
            | Error::InvalidTransaction(_)
            | Error::InvalidInput(_) => 2,
            Error::Rpc(rpc) => rpc.exit_code(),
        }
    }
}
