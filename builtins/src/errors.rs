use ruint::aliases::U256;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("point ({x}, {y}) is not on the curve")]
    InvalidPoint { x: U256, y: U256 },
    #[error("partial sum and the added point share an x coordinate at step {0}")]
    XCoordinateCollision(usize),
    #[error("value {value} does not fit in {bits} bits")]
    ValueTooLarge { value: U256, bits: usize },
    #[error("scalar {0} is outside the range the builtin accepts")]
    InvalidScalar(U256),
    #[error("no point on the curve has x coordinate {0}")]
    InvalidPublicKey(U256),
    #[error("signature of ecdsa instance {0} does not verify")]
    InvalidSignature(u32),
    #[error(transparent)]
    Binary(#[from] binary::Error),
    #[error("failed to decode json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
