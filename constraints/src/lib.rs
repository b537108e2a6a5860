//! Symbolic AIR constraints over execution trace columns and their
//! aggregation into a composition polynomial.

pub mod check;
pub mod composition;
pub mod constraints;
pub mod domain;
pub mod errors;
pub mod expression;
pub mod fraction;
pub mod periodic;

pub use check::check_constraints;
pub use check::Violation;
pub use composition::precompute_domain_evals;
pub use composition::CompositionPolynomial;
pub use constraints::derive_mask;
pub use constraints::AlgebraicItem;
pub use constraints::Constraint;
pub use constraints::ExecutionTraceColumn;
pub use constraints::Hint;
pub use constraints::VerifierChallenge;
pub use constraints::VirtualColumn;
pub use domain::Rows;
pub use domain::VanishingFactor;
pub use errors::Error;
pub use expression::Expr;
pub use fraction::FractionFieldElement;
pub use periodic::PeriodicColumn;
