use crate::components::Stage;
use crate::errors::Error;
use crate::errors::Result;
use crate::layout::Layout;
use crate::utils::DilutedCheckPool;
use crate::utils::MemoryPool;
use crate::utils::RangeCheckPool;
use crate::CYCLE_HEIGHT;
use crate::MEMORY_STEP;
use crate::PUBLIC_MEMORY_STEP;
use ark_ff::Field;
use ark_ff::PrimeField;
use binary::AirPrivateInput;
use binary::AirPublicInput;
use binary::Memory;
use binary::MemoryEntry;
use binary::RegisterStates;
use constraints::VerifierChallenge;
use std::fs::File;

#[derive(Debug)]
pub struct CairoWitness<F: Field> {
    pub air_private_input: AirPrivateInput,
    pub register_states: RegisterStates,
    pub memory: Memory<F>,
}

impl<F: Field> CairoWitness<F> {
    pub fn new(
        air_private_input: AirPrivateInput,
        register_states: RegisterStates,
        memory: Memory<F>,
    ) -> Self {
        Self {
            air_private_input,
            register_states,
            memory,
        }
    }
}

impl<F: PrimeField> CairoWitness<F> {
    /// Loads the register trace and memory files the private input points to
    pub fn from_private_input(air_private_input: AirPrivateInput) -> Result<Self> {
        let open = |path| File::open(path).map_err(binary::Error::from);
        let register_states = RegisterStates::from_reader(open(&air_private_input.trace_path)?)?;
        let memory = Memory::from_reader(open(&air_private_input.memory_path)?)?;
        Ok(Self::new(air_private_input, register_states, memory))
    }
}

/// Main trace columns under construction. Components write their cells
/// directly and push the values that go through a permutation argument into
/// the pools.
pub struct TraceFiller<'a, F: PrimeField> {
    trace_len: usize,
    pub public_input: &'a AirPublicInput<F>,
    pub witness: &'a CairoWitness<F>,
    columns: Vec<Vec<F>>,
    memory_pool: MemoryPool<F>,
    range_check_pool: RangeCheckPool,
    diluted_pool: DilutedCheckPool,
}

impl<'a, F: PrimeField> TraceFiller<'a, F> {
    fn new(
        layout: &Layout<F>,
        public_input: &'a AirPublicInput<F>,
        witness: &'a CairoWitness<F>,
    ) -> Self {
        let trace_len = layout.trace_len();
        let diluted_n_bits = layout.config().dilution().map_or(0, |d| d.n_bits);
        Self {
            trace_len,
            public_input,
            witness,
            columns: vec![vec![F::ZERO; trace_len]; layout.num_main_columns()],
            memory_pool: MemoryPool::new(
                trace_len / MEMORY_STEP,
                PUBLIC_MEMORY_STEP / MEMORY_STEP,
                crate::components::memory::PUBLIC_MEMORY_OFFSET / MEMORY_STEP,
            ),
            range_check_pool: RangeCheckPool::new(trace_len),
            diluted_pool: DilutedCheckPool::new(
                if diluted_n_bits == 0 { 0 } else { trace_len },
                diluted_n_bits,
            ),
        }
    }

    pub fn trace_len(&self) -> usize {
        self.trace_len
    }

    pub fn set(&mut self, column: usize, row: usize, value: F) {
        self.columns[column][row] = value;
    }

    /// Records a memory access in the memory pool pair starting at `row`.
    /// Fails if the execution's memory holds a different value.
    pub fn set_memory(&mut self, row: usize, address: u32, value: F) -> Result<()> {
        debug_assert_eq!(0, row % MEMORY_STEP);
        if let Ok(word) = self.witness.memory.get(address as usize) {
            if word.into_felt() != value {
                return Err(Error::MemoryMismatch { address });
            }
        }
        self.memory_pool
            .push(row / MEMORY_STEP, MemoryEntry { address, value })
    }

    /// Adds a value to the 16-bit range check pool
    pub fn set_range_check(&mut self, row: usize, value: u16) {
        self.range_check_pool.push(row, value)
    }

    /// Adds a value (in regular form) to the diluted pool
    pub fn set_diluted(&mut self, row: usize, value: u64) {
        self.diluted_pool.push(row, value)
    }

    /// First address of a builtin's memory segment
    pub fn segment_begin(&self, name: &str) -> Result<u32> {
        self.public_input
            .memory_segments
            .builtin(name)
            .map(|segment| segment.begin_addr)
            .ok_or_else(|| Error::MissingSegment(name.into()))
    }

    pub fn memory_pool_mut(&mut self) -> &mut MemoryPool<F> {
        &mut self.memory_pool
    }

    pub fn range_check_pool_mut(&mut self) -> &mut RangeCheckPool {
        &mut self.range_check_pool
    }

    pub fn diluted_pool_mut(&mut self) -> &mut DilutedCheckPool {
        &mut self.diluted_pool
    }
}

/// Interaction columns under construction. Column indices are global i.e.
/// the first interaction column has index `num_main_columns`.
pub struct InteractionFiller<'a, F: PrimeField> {
    main: &'a [Vec<F>],
    challenges: &'a [F],
    columns: Vec<Vec<F>>,
}

impl<'a, F: PrimeField> InteractionFiller<'a, F> {
    pub fn main_column(&self, column: usize) -> &'a [F] {
        &self.main[column]
    }

    pub fn challenge(&self, challenge: impl VerifierChallenge) -> F {
        self.challenges[challenge.index()]
    }

    pub fn set(&mut self, column: usize, row: usize, value: F) {
        self.columns[column - self.main.len()][row] = value;
    }
}

/// Main trace of a Cairo execution for a layout
pub struct ExecutionTrace<'a, F: PrimeField> {
    layout: &'a Layout<F>,
    columns: Vec<Vec<F>>,
}

impl<'a, F: PrimeField> ExecutionTrace<'a, F> {
    pub fn new(
        layout: &'a Layout<F>,
        witness: &CairoWitness<F>,
        public_input: &AirPublicInput<F>,
    ) -> Result<Self> {
        let num_steps = witness.register_states.len();
        let expected = layout.trace_len() / CYCLE_HEIGHT;
        if num_steps != expected {
            return Err(Error::StepCount {
                expected,
                actual: num_steps,
            });
        }

        let mut filler = TraceFiller::new(layout, public_input, witness);
        for stage in [Stage::Cells, Stage::Pools] {
            for component in layout.components() {
                if component.stage() == stage {
                    let _span = tracing::debug_span!("fill", component = component.name()).entered();
                    component.fill(&mut filler)?;
                }
            }
        }

        Ok(Self {
            layout,
            columns: filler.columns,
        })
    }

    pub fn columns(&self) -> &[Vec<F>] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Vec<F>> {
        self.columns
    }

    /// Builds the interaction columns for the verifier's challenges
    pub fn interaction_columns(&self, challenges: &[F]) -> Result<Vec<Vec<F>>> {
        let layout = self.layout;
        if challenges.len() != layout.num_challenges() {
            return Err(Error::ChallengeCount {
                expected: layout.num_challenges(),
                actual: challenges.len(),
            });
        }
        let trace_len = layout.trace_len();
        let num_interaction = layout.num_columns() - layout.num_main_columns();
        let mut filler = InteractionFiller {
            main: &self.columns,
            challenges,
            columns: vec![vec![F::ZERO; trace_len]; num_interaction],
        };
        for component in layout.components() {
            component.fill_interaction(&mut filler)?;
        }
        Ok(filler.columns)
    }

    /// Main columns followed by the interaction columns
    pub fn all_columns(&self, challenges: &[F]) -> Result<Vec<Vec<F>>> {
        let mut columns = self.columns.clone();
        columns.extend(self.interaction_columns(challenges)?);
        Ok(columns)
    }
}
