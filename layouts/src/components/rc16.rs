use super::booleanity;
use super::constant;
use super::Component;
use super::Stage;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::hints::RangeCheckPermutation;
use crate::trace::InteractionFiller;
use crate::trace::TraceFiller;
use crate::utils::cumulative_product;
use crate::RANGE_CHECK_POOL_COLUMN;
use crate::RANGE_CHECK_SORTED_COLUMN;
use ark_ff::One;
use ark_ff::PrimeField;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Hint;
use constraints::Rows;
use constraints::VerifierChallenge;
use constraints::VirtualColumn;

pub const POOL: VirtualColumn = VirtualColumn::new(RANGE_CHECK_POOL_COLUMN, 1, 0);
pub const SORTED: VirtualColumn = VirtualColumn::new(RANGE_CHECK_SORTED_COLUMN, 1, 0);

/// Checks every value of the pool is in `[rc_min, rc_max]` by showing its
/// sorted copy increases in steps of at most one
pub struct RangeCheck16 {
    /// Interaction column with the running permutation product
    pub cumulative_product: usize,
}

impl<F: PrimeField> Component<F> for RangeCheck16 {
    fn name(&self) -> &'static str {
        "rc16"
    }

    fn stage(&self) -> Stage {
        Stage::Pools
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let z = RangeCheckPermutation::Z.challenge::<F>();
        let perm = VirtualColumn::new(self.cumulative_product, 1, 0);
        let diff = SORTED.next::<F>() - SORTED.curr::<F>();

        vec![
            Constraint::new(
                "rc16/perm/init0",
                (&z - SORTED.curr::<F>()) * perm.curr::<F>() + POOL.curr::<F>() - &z,
                Rows::first(),
            ),
            Constraint::new(
                "rc16/perm/step0",
                (&z - SORTED.next::<F>()) * perm.next::<F>()
                    - (&z - POOL.next::<F>()) * perm.curr::<F>(),
                Rows::ALL,
            )
            .except(Rows::last()),
            Constraint::new(
                "rc16/perm/last",
                perm.curr::<F>() - constant::<F>(1),
                Rows::last(),
            ),
            Constraint::new("rc16/diff_is_bit", booleanity(&diff), Rows::ALL)
                .except(Rows::last()),
            Constraint::new(
                "rc16/minimum",
                SORTED.curr::<F>() - PublicInputHint::RangeCheckMin.hint::<F>(),
                Rows::first(),
            ),
            Constraint::new(
                "rc16/maximum",
                SORTED.curr::<F>() - PublicInputHint::RangeCheckMax.hint::<F>(),
                Rows::last(),
            ),
        ]
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let public_input = trace.public_input;
        let (pool, sorted) = trace
            .range_check_pool_mut()
            .finalize(public_input.rc_min, public_input.rc_max)?;
        for (row, (v, sorted_v)) in pool.into_iter().zip(sorted).enumerate() {
            trace.set(RANGE_CHECK_POOL_COLUMN, row, F::from(v));
            trace.set(RANGE_CHECK_SORTED_COLUMN, row, F::from(sorted_v));
        }
        Ok(())
    }

    fn fill_interaction(&self, trace: &mut InteractionFiller<F>) -> Result<()> {
        let z = trace.challenge(RangeCheckPermutation::Z);
        let pool = trace.main_column(RANGE_CHECK_POOL_COLUMN);
        let sorted = trace.main_column(RANGE_CHECK_SORTED_COLUMN);
        let terms = pool.iter().zip(sorted).map(|(&v, &v_prime)| (z - v, z - v_prime));
        let products = cumulative_product(terms);
        debug_assert!(products.last().map_or(true, |p| p.is_one()));
        for (row, product) in products.into_iter().enumerate() {
            trace.set(self.cumulative_product, row, product);
        }
        Ok(())
    }
}
