use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("layouts are only defined over the Stark field")]
    UnsupportedField,
    #[error("builtin `{0}` is not supported")]
    UnsupportedBuiltin(String),
    #[error("public input has a `{0}` segment but the layout has no such builtin")]
    UnexpectedSegment(String),
    #[error("layout has builtin `{0}` but the public input has no segment for it")]
    MissingSegment(String),
    #[error("unknown layout `{0}`")]
    UnknownLayout(String),
    #[error("public input is for layout `{actual}` but the layout is `{expected}`")]
    LayoutMismatch { expected: String, actual: String },
    #[error("trace length {0} is not a power of two multiple of the cycle height")]
    InvalidTraceLength(usize),
    #[error("ratio {ratio} is not valid for builtin `{builtin}`")]
    InvalidRatio { builtin: &'static str, ratio: usize },
    #[error("no free cells left in the {0} pool")]
    PoolExhausted(&'static str),
    #[error("{len} public memory entries do not fit in {capacity} public memory cells")]
    PublicMemoryOverflow { len: usize, capacity: usize },
    #[error("builtin `{builtin}` instance {index} does not fit in the trace")]
    TooManyInstances { builtin: &'static str, index: u32 },
    #[error("memory address {address} is assigned two different values")]
    MemoryMismatch { address: u32 },
    #[error("range checked value {value} is outside [{min}, {max}]")]
    RangeCheckBounds { value: u16, min: u16, max: u16 },
    #[error("expected {expected} execution steps but got {actual}")]
    StepCount { expected: usize, actual: usize },
    #[error("address {0} does not fit in a field element of the trace")]
    InvalidAddress(usize),
    #[error("layout has a pedersen builtin but no pedersen parameters were given")]
    MissingPedersenParams,
    #[error("expected {expected} interaction elements but got {actual}")]
    ChallengeCount { expected: usize, actual: usize },
    #[error(transparent)]
    Constraints(#[from] constraints::Error),
    #[error(transparent)]
    Binary(#[from] binary::Error),
    #[error(transparent)]
    Builtin(#[from] builtins::Error),
    #[error("failed to decode json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
