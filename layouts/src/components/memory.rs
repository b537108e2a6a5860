use super::booleanity;
use super::constant;
use super::Component;
use super::Stage;
use crate::errors::Result;
use crate::hints::MemoryPermutation;
use crate::hints::PublicInputHint;
use crate::trace::InteractionFiller;
use crate::trace::TraceFiller;
use crate::utils::cumulative_product;
use crate::MEMORY_POOL_COLUMN;
use crate::MEMORY_SORTED_COLUMN;
use crate::MEMORY_STEP;
use crate::PUBLIC_MEMORY_STEP;
use ark_ff::PrimeField;
use binary::MemoryEntry;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Hint;
use constraints::Rows;
use constraints::VerifierChallenge;
use constraints::VirtualColumn;

/// Address and value of every memory access in the order the CPU and
/// builtins access them. Pairs at rows `2 mod 8` are reserved for the public
/// memory and hold `(0, 0)`.
pub const POOL_ADDRESS: VirtualColumn = VirtualColumn::new(MEMORY_POOL_COLUMN, MEMORY_STEP, 0);
pub const POOL_VALUE: VirtualColumn = VirtualColumn::new(MEMORY_POOL_COLUMN, MEMORY_STEP, 1);

/// The memory pool sorted by address
pub const SORTED_ADDRESS: VirtualColumn =
    VirtualColumn::new(MEMORY_SORTED_COLUMN, MEMORY_STEP, 0);
pub const SORTED_VALUE: VirtualColumn = VirtualColumn::new(MEMORY_SORTED_COLUMN, MEMORY_STEP, 1);

/// Row offset of the public memory address cell within each public memory
/// step
pub const PUBLIC_MEMORY_OFFSET: usize = 2;

/// Continuous read-only memory via a permutation argument between the memory
/// pool and its sorted copy
pub struct Memory {
    /// Interaction column with the running permutation product
    pub cumulative_product: usize,
}

impl Memory {
    fn permutation(&self) -> VirtualColumn {
        VirtualColumn::new(self.cumulative_product, MEMORY_STEP, 0)
    }
}

impl<F: PrimeField> Component<F> for Memory {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn stage(&self) -> Stage {
        Stage::Pools
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let z = MemoryPermutation::Z.challenge::<F>();
        let alpha = MemoryPermutation::A.challenge::<F>();
        let perm = self.permutation();
        let every_access = Rows::every(MEMORY_STEP);
        let last_access = Rows::FromEnd(MEMORY_STEP);

        let address_diff = SORTED_ADDRESS.next::<F>() - SORTED_ADDRESS.curr::<F>();
        let public_memory = Rows::every_at(PUBLIC_MEMORY_STEP, 0);
        let public_address = VirtualColumn::new(MEMORY_POOL_COLUMN, PUBLIC_MEMORY_STEP, 2);
        let public_value = VirtualColumn::new(MEMORY_POOL_COLUMN, PUBLIC_MEMORY_STEP, 3);

        vec![
            Constraint::new(
                "memory/multi_column_perm/perm/init0",
                (&z - (SORTED_ADDRESS.curr::<F>() + &alpha * SORTED_VALUE.curr::<F>())) * perm.curr::<F>()
                    + POOL_ADDRESS.curr::<F>()
                    + &alpha * POOL_VALUE.curr::<F>()
                    - &z,
                Rows::first(),
            ),
            Constraint::new(
                "memory/multi_column_perm/perm/step0",
                (&z - (SORTED_ADDRESS.next::<F>() + &alpha * SORTED_VALUE.next::<F>())) * perm.next::<F>()
                    - (&z - (POOL_ADDRESS.next::<F>() + &alpha * POOL_VALUE.next::<F>())) * perm.curr::<F>(),
                every_access,
            )
            .except(last_access),
            Constraint::new(
                "memory/multi_column_perm/perm/last",
                perm.curr::<F>() - PublicInputHint::MemoryQuotient.hint::<F>(),
                last_access,
            ),
            Constraint::new("memory/diff_is_bit", booleanity(&address_diff), every_access)
                .except(last_access),
            Constraint::new(
                "memory/is_func",
                (&address_diff - &one) * (SORTED_VALUE.curr::<F>() - SORTED_VALUE.next::<F>()),
                every_access,
            )
            .except(last_access),
            Constraint::new(
                "memory/initial_addr",
                SORTED_ADDRESS.curr::<F>() - &one,
                Rows::first(),
            ),
            Constraint::new(
                "public_memory_addr_zero",
                public_address.curr::<F>(),
                public_memory,
            ),
            Constraint::new("public_memory_value_zero", public_value.curr::<F>(), public_memory),
        ]
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let public_input = trace.public_input;
        let witness = trace.witness;
        let padding = public_input.public_memory_padding()?;
        let (pool, sorted) = trace.memory_pool_mut().finalize(&public_input.public_memory, padding, |address| {
            witness
                .memory
                .get(address as usize)
                .map(|word| word.into_felt())
                .unwrap_or(F::ZERO)
        })?;

        for (i, (access, sorted_access)) in pool.into_iter().zip(sorted).enumerate() {
            let row = i * MEMORY_STEP;
            let MemoryEntry { address, value } = access;
            trace.set(MEMORY_POOL_COLUMN, row, F::from(address));
            trace.set(MEMORY_POOL_COLUMN, row + 1, value);
            let MemoryEntry { address, value } = sorted_access;
            trace.set(MEMORY_SORTED_COLUMN, row, F::from(address));
            trace.set(MEMORY_SORTED_COLUMN, row + 1, value);
        }
        Ok(())
    }

    fn fill_interaction(&self, trace: &mut InteractionFiller<F>) -> Result<()> {
        // see distinction between (a', v') and (a, v) in the Cairo paper.
        let z = trace.challenge(MemoryPermutation::Z);
        let alpha = trace.challenge(MemoryPermutation::A);
        let pool = trace.main_column(MEMORY_POOL_COLUMN);
        let sorted = trace.main_column(MEMORY_SORTED_COLUMN);
        let terms = pool
            .chunks_exact(MEMORY_STEP)
            .zip(sorted.chunks_exact(MEMORY_STEP))
            .map(|(access, sorted_access)| {
                let (a, v) = (access[0], access[1]);
                let (a_prime, v_prime) = (sorted_access[0], sorted_access[1]);
                (z - (alpha * v + a), z - (alpha * v_prime + a_prime))
            });
        let products = cumulative_product(terms);
        for (i, product) in products.into_iter().enumerate() {
            trace.set(self.cumulative_product, i * MEMORY_STEP, product);
        }
        Ok(())
    }
}
