use ark_ff::PrimeField;
use binary::AirPublicInput;
use binary::Fp;
use builtins::pedersen::PedersenParams;
use constraints::CompositionPolynomial;
use constraints::Violation;
use layouts::CairoWitness;
use layouts::Error;
use layouts::ExecutionTrace;
use layouts::InteractionParams;
use layouts::Layout;
use layouts::LayoutConfig;
use layouts::Result;
use layouts::CYCLE_HEIGHT;

/// Cairo AIR for a single execution. Binds a layout to the public input of
/// the execution it proves.
pub struct CairoAir<F: PrimeField = Fp> {
    layout: Layout<F>,
    public_input: AirPublicInput<F>,
}

impl<F: PrimeField> CairoAir<F> {
    /// AIR for a layout without the Pedersen builtin
    pub fn new(config: LayoutConfig, public_input: AirPublicInput<F>) -> Result<Self> {
        Self::from_config(config, None, public_input)
    }

    pub fn with_pedersen_params(
        config: LayoutConfig,
        params: PedersenParams,
        public_input: AirPublicInput<F>,
    ) -> Result<Self> {
        Self::from_config(config, Some(params), public_input)
    }

    fn from_config(
        config: LayoutConfig,
        params: Option<PedersenParams>,
        public_input: AirPublicInput<F>,
    ) -> Result<Self> {
        let n_steps = usize::try_from(public_input.n_steps)
            .map_err(|_| Error::InvalidTraceLength(usize::MAX))?;
        let trace_len = n_steps
            .checked_mul(CYCLE_HEIGHT)
            .ok_or(Error::InvalidTraceLength(usize::MAX))?;
        let mut builder = Layout::<F>::builder(config, trace_len);
        if let Some(params) = params {
            builder = builder.with_pedersen_params(params);
        }
        let layout = builder.build()?;
        layout.validate_public_input(&public_input)?;
        Ok(Self {
            layout,
            public_input,
        })
    }

    pub fn layout(&self) -> &Layout<F> {
        &self.layout
    }

    pub fn public_input(&self) -> &AirPublicInput<F> {
        &self.public_input
    }

    pub fn trace_len(&self) -> usize {
        self.layout.trace_len()
    }

    pub fn num_columns(&self) -> usize {
        self.layout.num_columns()
    }

    pub fn interaction_params(&self) -> InteractionParams {
        self.layout.interaction_params()
    }

    pub fn mask(&self) -> &[(usize, isize)] {
        self.layout.mask()
    }

    pub fn num_constraints(&self) -> usize {
        self.layout.constraints().len()
    }

    pub fn num_random_coefficients(&self) -> usize {
        self.num_constraints()
    }

    pub fn degree_bound(&self) -> usize {
        self.layout.degree_bound()
    }

    /// Composition polynomial with every public input hint bound
    pub fn composition_polynomial(&self, challenges: &[F]) -> Result<CompositionPolynomial<F>> {
        self.layout
            .composition_polynomial(&self.public_input, challenges)
    }

    /// Fills the main trace of an execution of this AIR
    pub fn execution_trace<'a>(&'a self, witness: &CairoWitness<F>) -> Result<ExecutionTrace<'a, F>> {
        ExecutionTrace::new(&self.layout, witness, &self.public_input)
    }

    /// Fills the whole trace of an execution and reports the constraints
    /// that do not hold on it
    pub fn check_execution(
        &self,
        witness: &CairoWitness<F>,
        challenges: &[F],
    ) -> Result<Vec<Violation>> {
        let trace = self.execution_trace(witness)?;
        let columns = trace.all_columns(challenges)?;
        self.layout
            .check_trace(&columns, &self.public_input, challenges)
    }
}

#[cfg(test)]
mod tests {
    use super::CairoAir;
    use ark_ff::UniformRand;
    use binary::AirPublicInput;
    use binary::Fp;
    use layouts::Error;
    use layouts::LayoutConfig;

    fn public_input(layout: &str, n_steps: u64) -> AirPublicInput<Fp> {
        let json = format!(
            r#"{{
                "rc_min": 32767,
                "rc_max": 32769,
                "n_steps": {n_steps},
                "layout": "{layout}",
                "memory_segments": {{
                    "program": {{ "begin_addr": 1, "stop_ptr": 3 }},
                    "execution": {{ "begin_addr": 6, "stop_ptr": 7 }}
                }},
                "public_memory": [
                    {{ "address": 1, "value": "0x480680017fff8000" }},
                    {{ "address": 2, "value": "0x5" }},
                    {{ "address": 3, "value": "0x10780017fff8000" }},
                    {{ "address": 4, "value": "0x0" }}
                ]
            }}"#
        );
        AirPublicInput::from_json(&json).unwrap()
    }

    #[test]
    fn plain_air_dimensions() {
        let air = CairoAir::new(LayoutConfig::plain(), public_input("plain", 4)).unwrap();

        assert_eq!(64, air.trace_len());
        assert_eq!(8, air.num_columns());
        assert_eq!(2, air.interaction_params().num_columns);
        assert_eq!(3, air.interaction_params().num_challenges);
        assert_eq!(49, air.mask().len());
        assert_eq!(47, air.num_random_coefficients());
        assert_eq!(128, air.degree_bound());
    }

    #[test]
    fn composition_binds_public_input() {
        let air = CairoAir::new(LayoutConfig::plain(), public_input("plain", 4)).unwrap();
        let mut rng = ark_std::test_rng();
        let challenges = (0..3).map(|_| Fp::rand(&mut rng)).collect::<Vec<Fp>>();

        let composition = air.composition_polynomial(&challenges).unwrap();

        assert_eq!(air.num_constraints(), composition.num_constraints());
        assert_eq!(air.mask(), composition.mask());
        assert!(matches!(
            air.composition_polynomial(&challenges[..2]),
            Err(Error::ChallengeCount {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn public_input_must_match_layout() {
        let res = CairoAir::new(LayoutConfig::plain(), public_input("recursive", 4));

        assert!(matches!(res, Err(Error::LayoutMismatch { .. })));
    }

    #[test]
    fn steps_must_be_a_power_of_two() {
        let res = CairoAir::new(LayoutConfig::plain(), public_input("plain", 5));

        assert!(matches!(res, Err(Error::InvalidTraceLength(80))));
    }
}
