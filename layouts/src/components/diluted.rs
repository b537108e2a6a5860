use super::constant;
use super::Component;
use super::Stage;
use crate::errors::Result;
use crate::hints::DilutedCheckAggregation;
use crate::hints::DilutedCheckPermutation;
use crate::hints::PublicInputHint;
use crate::trace::InteractionFiller;
use crate::trace::TraceFiller;
use crate::utils::cumulative_product;
use ark_ff::PrimeField;
use builtins::bitwise::dilute;
use builtins::bitwise::Dilution;
use builtins::utils::reduce_u256;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Hint;
use constraints::Rows;
use constraints::VerifierChallenge;
use constraints::VirtualColumn;
use ruint::aliases::U256;

/// Checks every value of the diluted pool is a diluted `n_bits` value.
///
/// The pool is permuted into a sorted column which is then aggregated as
/// `agg' = agg * (1 + z * diff) + α * diff^2` where `diff` is the difference
/// between neighbouring sorted values. The final aggregate only matches the
/// public cumulative value if the sorted column starts at zero and steps
/// through every diluted value.
pub struct DilutedCheck {
    pub dilution: Dilution,
    pub pool: usize,
    pub sorted: usize,
    /// Interaction column with the running permutation product
    pub permutation: usize,
    /// Interaction column with the running aggregate
    pub aggregation: usize,
}

impl DilutedCheck {
    fn columns(&self) -> [VirtualColumn; 4] {
        [self.pool, self.sorted, self.permutation, self.aggregation]
            .map(|column| VirtualColumn::new(column, 1, 0))
    }

    /// A regular form value in its diluted form
    pub fn diluted<F: PrimeField>(&self, v: u64) -> F {
        let Dilution {
            spacing, n_bits, ..
        } = self.dilution;
        reduce_u256(dilute(U256::from(v), spacing, n_bits))
    }
}

impl<F: PrimeField> Component<F> for DilutedCheck {
    fn name(&self) -> &'static str {
        "diluted_check"
    }

    fn stage(&self) -> Stage {
        Stage::Pools
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let [pool, sorted, perm, agg] = self.columns();
        let perm_z = DilutedCheckPermutation::Z.challenge::<F>();
        let agg_z = DilutedCheckAggregation::Z.challenge::<F>();
        let agg_alpha = DilutedCheckAggregation::A.challenge::<F>();
        let diff = sorted.next::<F>() - sorted.curr::<F>();

        vec![
            Constraint::new(
                "diluted_check/permutation/init0",
                (&perm_z - sorted.curr::<F>()) * perm.curr::<F>() + pool.curr::<F>() - &perm_z,
                Rows::first(),
            ),
            Constraint::new(
                "diluted_check/permutation/step0",
                (&perm_z - sorted.next::<F>()) * perm.next::<F>()
                    - (&perm_z - pool.next::<F>()) * perm.curr::<F>(),
                Rows::ALL,
            )
            .except(Rows::last()),
            Constraint::new(
                "diluted_check/permutation/last",
                perm.curr::<F>() - &one,
                Rows::last(),
            ),
            Constraint::new("diluted_check/init", agg.curr::<F>() - &one, Rows::first()),
            Constraint::new("diluted_check/first_element", sorted.curr::<F>(), Rows::first()),
            Constraint::new(
                "diluted_check/step",
                agg.next::<F>()
                    - (agg.curr::<F>() * (&one + &agg_z * &diff) + &agg_alpha * &diff * &diff),
                Rows::ALL,
            )
            .except(Rows::last()),
            Constraint::new(
                "diluted_check/last",
                agg.curr::<F>() - PublicInputHint::DilutedCheckCumulativeValue.hint::<F>(),
                Rows::last(),
            ),
        ]
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let (pool, sorted) = trace.diluted_pool_mut().finalize()?;
        for (row, (v, sorted_v)) in pool.into_iter().zip(sorted).enumerate() {
            trace.set(self.pool, row, self.diluted(v));
            trace.set(self.sorted, row, self.diluted(sorted_v));
        }
        Ok(())
    }

    fn fill_interaction(&self, trace: &mut InteractionFiller<F>) -> Result<()> {
        let pool = trace.main_column(self.pool);
        let sorted = trace.main_column(self.sorted);

        let z = trace.challenge(DilutedCheckPermutation::Z);
        let terms = pool.iter().zip(sorted).map(|(&v, &v_prime)| (z - v, z - v_prime));
        for (row, product) in cumulative_product(terms).into_iter().enumerate() {
            trace.set(self.permutation, row, product);
        }

        let z = trace.challenge(DilutedCheckAggregation::Z);
        let alpha = trace.challenge(DilutedCheckAggregation::A);
        let mut acc = F::one();
        trace.set(self.aggregation, 0, acc);
        for (row, pair) in sorted.windows(2).enumerate() {
            let diff = pair[1] - pair[0];
            acc = acc * (F::one() + z * diff) + alpha * diff.square();
            trace.set(self.aggregation, row + 1, acc);
        }
        Ok(())
    }
}
