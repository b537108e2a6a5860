//! Reference computations for the builtin co-processors. Each module turns a
//! builtin instance into the intermediate values its trace cells hold.

pub mod bitwise;
pub mod ec_op;
pub mod ecdsa;
pub mod errors;
pub mod pedersen;
pub mod range_check;
pub mod utils;

pub use errors::Error;
