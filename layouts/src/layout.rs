use crate::builder::LayoutBuilder;
use crate::components::Component;
use crate::config::LayoutConfig;
use crate::errors::Error;
use crate::errors::Result;
use crate::hints::DilutedCheckAggregation;
use crate::hints::MemoryPermutation;
use crate::hints::PublicInputHint;
use crate::utils::compute_diluted_cumulative_value;
use crate::utils::compute_public_memory_quotient;
use crate::CYCLE_HEIGHT;
use crate::PUBLIC_MEMORY_STEP;
use ark_ff::PrimeField;
use binary::AirPublicInput;
use constraints::check_constraints;
use constraints::CompositionPolynomial;
use constraints::Constraint;
use constraints::Hint;
use constraints::PeriodicColumn;
use constraints::VerifierChallenge;
use constraints::Violation;

/// Initial address hint of each builtin with an address chain
const BUILTIN_ADDR_HINTS: [(&str, PublicInputHint); 5] = [
    ("pedersen", PublicInputHint::InitialPedersenAddr),
    ("range_check", PublicInputHint::InitialRangeCheckAddr),
    ("ecdsa", PublicInputHint::InitialEcdsaAddr),
    ("bitwise", PublicInputHint::InitialBitwiseAddr),
    ("ec_op", PublicInputHint::InitialEcOpAddr),
];

/// What a prover needs to commit to the interaction trace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InteractionParams {
    pub num_challenges: usize,
    pub num_columns: usize,
}

/// Cairo AIR for a fixed layout and trace length.
///
/// Column indices are global: main columns come first and are followed by the
/// interaction columns.
///
/// ```text
/// ┌───────────────┬──────────────────────┬───────────────────────┐
/// │ plain columns │ builtin main columns │ interaction columns   │
/// │ 0..6          │ 6..num_main_columns  │ num_main..num_columns │
/// └───────────────┴──────────────────────┴───────────────────────┘
/// ```
pub struct Layout<F: PrimeField> {
    config: LayoutConfig,
    trace_len: usize,
    column_names: Vec<String>,
    num_main_columns: usize,
    num_challenges: usize,
    components: Vec<Box<dyn Component<F>>>,
    constraints: Vec<Constraint<F>>,
    periodic_columns: Vec<PeriodicColumn<F>>,
    mask: Vec<(usize, isize)>,
}

impl<F: PrimeField> Layout<F> {
    pub fn builder(config: LayoutConfig, trace_len: usize) -> LayoutBuilder {
        LayoutBuilder::new(config, trace_len)
    }

    /// Builds a layout that has no Pedersen builtin
    pub fn new(config: LayoutConfig, trace_len: usize) -> Result<Self> {
        Self::builder(config, trace_len).build()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        config: LayoutConfig,
        trace_len: usize,
        column_names: Vec<String>,
        num_main_columns: usize,
        num_challenges: usize,
        components: Vec<Box<dyn Component<F>>>,
        constraints: Vec<Constraint<F>>,
        periodic_columns: Vec<PeriodicColumn<F>>,
        mask: Vec<(usize, isize)>,
    ) -> Self {
        Self {
            config,
            trace_len,
            column_names,
            num_main_columns,
            num_challenges,
            components,
            constraints,
            periodic_columns,
            mask,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn trace_len(&self) -> usize {
        self.trace_len
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn num_columns(&self) -> usize {
        self.column_names.len()
    }

    pub fn num_main_columns(&self) -> usize {
        self.num_main_columns
    }

    pub fn num_challenges(&self) -> usize {
        self.num_challenges
    }

    pub fn interaction_params(&self) -> InteractionParams {
        InteractionParams {
            num_challenges: self.num_challenges,
            num_columns: self.num_columns() - self.num_main_columns,
        }
    }

    pub fn components(&self) -> &[Box<dyn Component<F>>] {
        &self.components
    }

    pub fn constraints(&self) -> &[Constraint<F>] {
        &self.constraints
    }

    pub fn periodic_columns(&self) -> &[PeriodicColumn<F>] {
        &self.periodic_columns
    }

    /// Trace cells (column, row offset) the constraints read, sorted
    pub fn mask(&self) -> &[(usize, isize)] {
        &self.mask
    }

    /// Exclusive bound on the degree of the composition polynomial
    pub fn degree_bound(&self) -> usize {
        self.config.constraint_degree * self.trace_len
    }

    /// Checks the public input describes an execution this layout can prove
    pub fn validate_public_input(&self, public_input: &AirPublicInput<F>) -> Result<()> {
        if public_input.layout != self.config.name {
            return Err(Error::LayoutMismatch {
                expected: self.config.name.clone(),
                actual: public_input.layout.clone(),
            });
        }

        let expected_steps = self.trace_len / CYCLE_HEIGHT;
        if public_input.n_steps != expected_steps as u64 {
            return Err(Error::StepCount {
                expected: expected_steps,
                actual: public_input.n_steps as usize,
            });
        }

        for (name, segment) in public_input.memory_segments.builtins() {
            match (segment.is_some(), self.config.has_builtin(name)) {
                (true, false) => return Err(Error::UnexpectedSegment(name.into())),
                (false, true) => return Err(Error::MissingSegment(name.into())),
                _ => {}
            }
        }

        let capacity = self.trace_len / PUBLIC_MEMORY_STEP;
        if public_input.public_memory.len() > capacity {
            return Err(Error::PublicMemoryOverflow {
                len: public_input.public_memory.len(),
                capacity,
            });
        }

        Ok(())
    }

    /// Values of the public input hints. Hints of builtins the layout does
    /// not carry are `None`.
    pub fn hints(
        &self,
        public_input: &AirPublicInput<F>,
        challenges: &[F],
    ) -> Result<Vec<Option<F>>> {
        if challenges.len() != self.num_challenges {
            return Err(Error::ChallengeCount {
                expected: self.num_challenges,
                actual: challenges.len(),
            });
        }
        let mut hints = vec![None; PublicInputHint::COUNT];
        let mut set = |hint: PublicInputHint, value: F| hints[hint.index()] = Some(value);

        set(
            PublicInputHint::InitialAp,
            F::from(public_input.initial_ap()),
        );
        set(
            PublicInputHint::InitialPc,
            F::from(public_input.initial_pc()),
        );
        set(PublicInputHint::FinalAp, F::from(public_input.final_ap()));
        set(PublicInputHint::FinalPc, F::from(public_input.final_pc()));

        let memory_quotient = compute_public_memory_quotient(
            challenges[MemoryPermutation::Z.index()],
            challenges[MemoryPermutation::A.index()],
            self.trace_len,
            PUBLIC_MEMORY_STEP,
            &public_input.public_memory,
            public_input.public_memory_padding()?,
        )?;
        set(PublicInputHint::MemoryQuotient, memory_quotient);

        set(
            PublicInputHint::RangeCheckMin,
            F::from(public_input.rc_min as u64),
        );
        set(
            PublicInputHint::RangeCheckMax,
            F::from(public_input.rc_max as u64),
        );

        if let Some(dilution) = self.config.dilution() {
            let cumulative_value = compute_diluted_cumulative_value(
                challenges[DilutedCheckAggregation::Z.index()],
                challenges[DilutedCheckAggregation::A.index()],
                dilution.spacing,
                dilution.n_bits,
            );
            set(
                PublicInputHint::DilutedCheckCumulativeValue,
                cumulative_value,
            );
        }

        for (name, hint) in BUILTIN_ADDR_HINTS {
            if self.config.has_builtin(name) {
                let segment = public_input
                    .memory_segments
                    .builtin(name)
                    .ok_or_else(|| Error::MissingSegment(name.into()))?;
                set(hint, F::from(segment.begin_addr));
            }
        }

        Ok(hints)
    }

    /// Binds the constraints to a public input and the verifier's challenges
    pub fn composition_polynomial(
        &self,
        public_input: &AirPublicInput<F>,
        challenges: &[F],
    ) -> Result<CompositionPolynomial<F>> {
        self.validate_public_input(public_input)?;
        let hints = self.hints(public_input, challenges)?;
        Ok(CompositionPolynomial::with_mask(
            self.trace_len,
            self.mask.clone(),
            &self.constraints,
            self.periodic_columns.clone(),
            challenges,
            &hints,
            self.degree_bound(),
        )?)
    }

    /// Evaluates every constraint on a full trace (main followed by
    /// interaction columns) and returns the rows where one does not hold
    pub fn check_trace(
        &self,
        columns: &[Vec<F>],
        public_input: &AirPublicInput<F>,
        challenges: &[F],
    ) -> Result<Vec<Violation>> {
        let hints = self.hints(public_input, challenges)?;
        Ok(check_constraints(
            self.trace_len,
            columns,
            &self.constraints,
            &self.periodic_columns,
            challenges,
            &hints,
        )?)
    }
}

impl<F: PrimeField> core::fmt::Debug for Layout<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Layout")
            .field("name", &self.config.name)
            .field("trace_len", &self.trace_len)
            .field("columns", &self.column_names)
            .field("num_constraints", &self.constraints.len())
            .finish()
    }
}
