use crate::domain::Rows;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("trace length {0} must be a power of two")]
    InvalidTraceLength(usize),
    #[error("row set {domain:?} is invalid for a trace of length {trace_len}")]
    InvalidDomain { domain: Rows, trace_len: usize },
    #[error("exclusion {exclusion:?} is not contained in {domain:?}")]
    DomainNotSubset { domain: Rows, exclusion: Rows },
    #[error("expected {expected} random coefficients but received {actual}")]
    CoefficientCount { expected: usize, actual: usize },
    #[error("expected {expected} neighbor values but received {actual}")]
    NeighborCount { expected: usize, actual: usize },
    #[error("expected {expected} periodic values but received {actual}")]
    PeriodicValueCount { expected: usize, actual: usize },
    #[error("expected {expected} point shifts but received {actual}")]
    ShiftCount { expected: usize, actual: usize },
    #[error("expected {expected} precomputed domain tables but received {actual}")]
    PrecomputedCount { expected: usize, actual: usize },
    #[error("expected {expected} trace columns of length {trace_len}")]
    ColumnShape { expected: usize, trace_len: usize },
    #[error("challenge {0} was not supplied")]
    MissingChallenge(usize),
    #[error("hint {0} is not set")]
    MissingHint(usize),
    #[error("periodic column {0} is not defined")]
    MissingPeriodicColumn(usize),
    #[error("evaluation point is a root of a constraint denominator")]
    PointOnDomain,
    #[error("fraction has a zero denominator")]
    ZeroDenominator,
    #[error("periodic column of {len} values with step {step} does not fit a trace of length {trace_len}")]
    InvalidPeriodicColumn {
        len: usize,
        step: usize,
        trace_len: usize,
    },
    #[error("trace cell (column={0}, offset={1}) is read but missing from the mask")]
    UnknownMaskEntry(usize, isize),
    #[error("mask entry (column={0}, offset={1}) is never read")]
    UnusedMaskEntry(usize, isize),
    #[error("constraint '{name}' has degree {degree} which exceeds the bound {bound}")]
    DegreeBoundExceeded {
        name: String,
        degree: usize,
        bound: usize,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
