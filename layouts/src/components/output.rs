use super::Component;
use crate::errors::Result;
use crate::trace::TraceFiller;
use ark_ff::PrimeField;
use constraints::Constraint;

/// The output builtin. Its segment is part of the public memory so it owns no
/// cells and adds no constraints.
pub struct Output;

impl<F: PrimeField> Component<F> for Output {
    fn name(&self) -> &'static str {
        "output"
    }

    fn segment(&self) -> Option<&'static str> {
        Some("output")
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        Vec::new()
    }

    fn fill(&self, _trace: &mut TraceFiller<F>) -> Result<()> {
        Ok(())
    }
}
