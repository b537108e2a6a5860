//! Components of a layout. Each owns a set of trace cells, the constraints
//! over them and the code that fills them.

use crate::errors::Error;
use crate::errors::Result;
use crate::trace::InteractionFiller;
use crate::trace::TraceFiller;
use ark_ff::PrimeField;
use constraints::AlgebraicItem;
use constraints::Constraint;
use constraints::Expr;
use constraints::PeriodicColumn;

pub mod bitwise;
pub mod cpu;
pub mod diluted;
pub mod ec_op;
pub mod ecdsa;
pub mod memory;
pub mod output;
pub mod pedersen;
pub mod range_check;
pub mod rc16;
pub mod subset_sum;

/// When a component fills its cells. Pools are sorted and padded once every
/// cell that feeds them is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Cells,
    Pools,
}

pub trait Component<F: PrimeField>: Send + Sync {
    fn name(&self) -> &'static str;

    /// Builtin segment the component reads its instances from
    fn segment(&self) -> Option<&'static str> {
        None
    }

    fn constraints(&self) -> Vec<Constraint<F>>;

    /// Periodic columns the constraints refer to. Indices are assigned by the
    /// layout builder.
    fn periodic_columns(&self, _trace_len: usize) -> Result<Vec<PeriodicColumn<F>>> {
        Ok(Vec::new())
    }

    fn stage(&self) -> Stage {
        Stage::Cells
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()>;

    fn fill_interaction(&self, _trace: &mut InteractionFiller<F>) -> Result<()> {
        Ok(())
    }
}

pub(crate) fn constant<F: PrimeField>(v: u64) -> Expr<AlgebraicItem<F>> {
    AlgebraicItem::Constant(F::from(v)).into()
}

/// `2^exp` as a constant expression
pub(crate) fn pow2<F: PrimeField>(exp: usize) -> Expr<AlgebraicItem<F>> {
    AlgebraicItem::Constant(F::from(2u64).pow([exp as u64])).into()
}

/// `x * (x - 1)`
pub(crate) fn booleanity<F: PrimeField>(x: &Expr<AlgebraicItem<F>>) -> Expr<AlgebraicItem<F>> {
    x * x - x
}

/// Orders builtin instances by their index. Indices without an instance are
/// `None`.
pub(crate) fn instances_by_index<T: Clone>(
    builtin: &'static str,
    instances: &[T],
    index: impl Fn(&T) -> u32,
    num_instances: usize,
) -> Result<Vec<Option<T>>> {
    let mut res = vec![None; num_instances];
    for instance in instances {
        let index = index(instance);
        let slot = res
            .get_mut(index as usize)
            .ok_or(Error::TooManyInstances { builtin, index })?;
        *slot = Some(instance.clone());
    }
    Ok(res)
}
