//! Cairo AIR layouts. A layout places the CPU, memory, range check and
//! builtin components in the trace and collects their constraints.

pub mod builder;
pub mod components;
pub mod config;
pub mod errors;
pub mod hints;
pub mod layout;
pub mod trace;
pub mod utils;

#[cfg(test)]
mod tests;

pub use builder::LayoutBuilder;
pub use config::LayoutConfig;
pub use errors::Error;
pub use errors::Result;
pub use hints::PublicInputHint;
pub use layout::InteractionParams;
pub use layout::Layout;
pub use trace::CairoWitness;
pub use trace::ExecutionTrace;

/// Trace rows per CPU step
pub const CYCLE_HEIGHT: usize = 16;

/// Rows per memory access (address followed by value)
pub const MEMORY_STEP: usize = 2;

/// Rows between two public memory accesses of the memory pool
pub const PUBLIC_MEMORY_STEP: usize = 8;

// columns shared by every layout
pub const RANGE_CHECK_POOL_COLUMN: usize = 0;
pub const FLAGS_COLUMN: usize = 1;
pub const RANGE_CHECK_SORTED_COLUMN: usize = 2;
pub const MEMORY_POOL_COLUMN: usize = 3;
pub const MEMORY_SORTED_COLUMN: usize = 4;
pub const REGISTERS_COLUMN: usize = 5;
pub const NUM_PLAIN_COLUMNS: usize = 6;
