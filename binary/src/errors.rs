use crate::FlagGroup;
use num_bigint::BigUint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid value: {value}, must be less than the field modulus {modulus}")]
    InvalidFieldElement { value: BigUint, modulus: BigUint },
    #[error("memory address {0} has no value")]
    MissingMemory(usize),
    #[error("instruction at pc={pc} has an invalid {group:?} encoding")]
    InvalidInstruction { pc: usize, group: FlagGroup },
    #[error("address computation for instruction at pc={0} is out of range")]
    AddressOverflow(usize),
    #[error("public memory has no entry at address 1 to use as padding")]
    MissingPublicMemoryPadding,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode binary file: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("failed to decode json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
