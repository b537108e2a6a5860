//! Constraint system of the Cairo VM. Builds the constraints of a layout,
//! binds them to the public input of an execution and evaluates the
//! resulting composition polynomial for a STARK prover.

pub mod air;

pub use air::CairoAir;
pub use binary;
pub use builtins;
pub use constraints;
pub use layouts;
