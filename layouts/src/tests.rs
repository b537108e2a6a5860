//! Layouts filled with small Cairo executions and checked row by row

use crate::config::BitwiseConfig;
use crate::config::DilutedPoolConfig;
use crate::config::EcOpConfig;
use crate::config::EcdsaConfig;
use crate::config::PedersenConfig;
use crate::config::RangeCheckConfig;
use crate::CairoWitness;
use crate::Error;
use crate::ExecutionTrace;
use crate::Layout;
use crate::LayoutConfig;
use crate::CYCLE_HEIGHT;
use crate::FLAGS_COLUMN;
use crate::NUM_PLAIN_COLUMNS;
use crate::RANGE_CHECK_POOL_COLUMN;
use crate::REGISTERS_COLUMN;
use ark_ff::FftField;
use ark_ff::Field;
use ark_ff::PrimeField;
use ark_ff::UniformRand;
use ark_ff::Zero;
use ark_poly::EvaluationDomain;
use ark_poly::Radix2EvaluationDomain;
use binary::AirPrivateInput;
use binary::AirPublicInput;
use binary::BitwiseInstance;
use binary::EcOpInstance;
use binary::Fp;
use binary::Memory;
use binary::MemoryEntry;
use binary::MemorySegments;
use binary::PedersenInstance;
use binary::RangeCheckInstance;
use binary::RegisterState;
use binary::RegisterStates;
use binary::Segment;
use builtins::ec_op::gen_dummy_instance;
use builtins::ecdsa::sign;
use builtins::utils::curve::Fr;
use builtins::pedersen::PedersenParams;
use constraints::Violation;
use ruint::aliases::U256;
use std::path::PathBuf;

/// `[ap] = 5, ap++`
const ASSERT_AP_IMM: u64 = 0x480680017fff8000;
/// `jmp rel 0`
const JMP_REL_0: u64 = 0x010780017fff8000;

/// First address after the program and execution memory
const FREE_ADDRESS: u32 = 7;

/// Program `[ap] = 5, ap++; jmp rel 0` at addresses 1 to 4 run for
/// `trace_len / 16` steps. The execution starts with `ap = fp = 6`.
fn execution(config: &LayoutConfig, trace_len: usize) -> (AirPublicInput<Fp>, CairoWitness<Fp>) {
    let program = [ASSERT_AP_IMM, 5, JMP_REL_0, 0];
    let mut memory = program
        .iter()
        .enumerate()
        .map(|(i, &word)| (i + 1, U256::from(word)))
        .collect::<Vec<(usize, U256)>>();
    memory.push((5, U256::ZERO));
    memory.push((6, U256::from(5u64)));

    let num_steps = trace_len / CYCLE_HEIGHT;
    let mut register_states = vec![RegisterState { pc: 1, ap: 6, fp: 6 }];
    register_states.resize(num_steps, RegisterState { pc: 3, ap: 7, fp: 6 });

    let public_memory = program
        .iter()
        .enumerate()
        .map(|(i, &word)| MemoryEntry {
            address: i as u32 + 1,
            value: Fp::from(word),
        })
        .collect();
    let public_input = AirPublicInput {
        rc_min: 0x7fff,
        rc_max: 0x8001,
        n_steps: num_steps as u64,
        layout: config.name.clone(),
        memory_segments: MemorySegments {
            program: Segment {
                begin_addr: 1,
                stop_ptr: 3,
            },
            execution: Segment {
                begin_addr: 6,
                stop_ptr: 7,
            },
            ..Default::default()
        },
        public_memory,
    };
    let private_input = AirPrivateInput {
        trace_path: PathBuf::new(),
        memory_path: PathBuf::new(),
        pedersen: Vec::new(),
        range_check: Vec::new(),
        bitwise: Vec::new(),
        ecdsa: Vec::new(),
        ec_op: Vec::new(),
    };
    let witness = CairoWitness::new(
        private_input,
        RegisterStates::new(register_states),
        Memory::from_entries(memory),
    );
    (public_input, witness)
}

/// A single `[ap] = 5, ap++` step starting at `pc = 1, ap = fp = 4`. The
/// instruction reads `[fp - 1]` at address 3.
fn single_step_execution() -> (AirPublicInput<Fp>, CairoWitness<Fp>) {
    let config = LayoutConfig::plain();
    let (mut public_input, witness) = execution(&config, CYCLE_HEIGHT);
    let memory = [(1, ASSERT_AP_IMM), (2, 5), (3, 0), (4, 5)]
        .map(|(address, word)| (address, U256::from(word)))
        .to_vec();
    public_input.public_memory = [ASSERT_AP_IMM, 5]
        .iter()
        .enumerate()
        .map(|(i, &word)| MemoryEntry {
            address: i as u32 + 1,
            value: Fp::from(word),
        })
        .collect();
    public_input.memory_segments.program = Segment {
        begin_addr: 1,
        stop_ptr: 1,
    };
    public_input.memory_segments.execution = Segment {
        begin_addr: 4,
        stop_ptr: 4,
    };
    let witness = CairoWitness::new(
        witness.air_private_input,
        RegisterStates::new(vec![RegisterState { pc: 1, ap: 4, fp: 4 }]),
        Memory::from_entries(memory),
    );
    (public_input, witness)
}

fn builtin_segment(len: u32) -> Option<Segment> {
    Some(Segment {
        begin_addr: FREE_ADDRESS,
        stop_ptr: FREE_ADDRESS + len,
    })
}

fn challenges(layout: &Layout<Fp>) -> Vec<Fp> {
    let mut rng = ark_std::test_rng();
    (0..layout.num_challenges())
        .map(|_| Fp::rand(&mut rng))
        .collect()
}

fn trace_columns(
    layout: &Layout<Fp>,
    public_input: &AirPublicInput<Fp>,
    witness: &CairoWitness<Fp>,
    challenges: &[Fp],
) -> Vec<Vec<Fp>> {
    layout.validate_public_input(public_input).unwrap();
    let trace = ExecutionTrace::new(layout, witness, public_input).unwrap();
    trace.all_columns(challenges).unwrap()
}

fn violations(
    layout: &Layout<Fp>,
    public_input: &AirPublicInput<Fp>,
    witness: &CairoWitness<Fp>,
) -> Vec<Violation> {
    let challenges = challenges(layout);
    let columns = trace_columns(layout, public_input, witness, &challenges);
    layout
        .check_trace(&columns, public_input, &challenges)
        .unwrap()
}

/// Shifts the first cycle of a column after the interaction columns are
/// filled and returns whether some constraint catches it
fn tamper_is_caught(
    layout: &Layout<Fp>,
    public_input: &AirPublicInput<Fp>,
    witness: &CairoWitness<Fp>,
    column: usize,
) -> bool {
    let challenges = challenges(layout);
    let mut columns = trace_columns(layout, public_input, witness, &challenges);
    for cell in &mut columns[column][..CYCLE_HEIGHT] {
        *cell += Fp::from(1u8);
    }
    !layout
        .check_trace(&columns, public_input, &challenges)
        .unwrap()
        .is_empty()
}

#[test]
fn plain_layout_shape() {
    let layout = Layout::<Fp>::new(LayoutConfig::plain(), 64).unwrap();

    assert_eq!(47, layout.constraints().len());
    assert_eq!(6, layout.num_main_columns());
    assert_eq!(8, layout.num_columns());
    assert_eq!(3, layout.num_challenges());
    assert_eq!(128, layout.degree_bound());
    assert_eq!("cpu/decode/opcode_rc/bit", layout.constraints()[0].name);
    let offsets: [&[isize]; 8] = [
        &[0, 1, 4, 8],
        &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
        &[0, 1],
        &[0, 1, 2, 3, 4, 5, 8, 9, 12, 13, 16],
        &[0, 1, 2, 3],
        &[0, 2, 4, 8, 10, 12, 16, 24],
        &[0, 1],
        &[0, 2],
    ];
    let expected_mask = offsets
        .iter()
        .enumerate()
        .flat_map(|(column, offsets)| offsets.iter().map(move |&offset| (column, offset)))
        .collect::<Vec<(usize, isize)>>();
    assert_eq!(49, expected_mask.len());
    assert_eq!(expected_mask, layout.mask());
    assert!(layout.periodic_columns().is_empty());
}

#[test]
fn plain_execution_satisfies_constraints() {
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), 64).unwrap();
    let (public_input, witness) = execution(&config, 64);

    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
}

#[test]
fn single_step_trace() {
    let layout = Layout::<Fp>::new(LayoutConfig::plain(), CYCLE_HEIGHT).unwrap();
    let (public_input, witness) = single_step_execution();

    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
}

#[test]
fn every_flag_of_a_single_step_is_checked() {
    let layout = Layout::<Fp>::new(LayoutConfig::plain(), CYCLE_HEIGHT).unwrap();
    let (public_input, witness) = single_step_execution();
    let challenges = challenges(&layout);
    let columns = trace_columns(&layout, &public_input, &witness, &challenges);

    for row in 0..15 {
        let mut columns = columns.clone();
        columns[FLAGS_COLUMN][row] += Fp::from(1u8);
        let violations = layout
            .check_trace(&columns, &public_input, &challenges)
            .unwrap();
        assert!(!violations.is_empty(), "flag cell {row} is unconstrained");
    }
}

#[test]
fn tampered_register_is_caught() {
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), 64).unwrap();
    let (public_input, witness) = execution(&config, 64);
    let challenges = challenges(&layout);
    let mut columns = trace_columns(&layout, &public_input, &witness, &challenges);

    // ap of the second step
    columns[REGISTERS_COLUMN][CYCLE_HEIGHT] += Fp::from(1u8);

    let violations = layout
        .check_trace(&columns, &public_input, &challenges)
        .unwrap();
    assert!(violations
        .iter()
        .any(|v| v.name == "cpu/update_registers/update_ap/ap_update" && v.row == 0));
}

#[test]
fn flipped_flag_is_caught() {
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), 64).unwrap();
    let (public_input, witness) = execution(&config, 64);
    let challenges = challenges(&layout);
    let mut columns = trace_columns(&layout, &public_input, &witness, &challenges);

    // lowest flag suffix of the first instruction
    columns[FLAGS_COLUMN][0] += Fp::from(1u8);

    let violations = layout
        .check_trace(&columns, &public_input, &challenges)
        .unwrap();
    assert!(violations.iter().any(|v| v.row == 0));
}

#[test]
fn plain_composition_has_bounded_degree() {
    const N: usize = 64;
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), N).unwrap();
    let (public_input, witness) = execution(&config, N);
    let challenges = challenges(&layout);
    let columns = trace_columns(&layout, &public_input, &witness, &challenges);
    let composition = layout
        .composition_polynomial(&public_input, &challenges)
        .unwrap();

    let mut rng = ark_std::test_rng();
    let coeffs = (0..composition.num_random_coefficients())
        .map(|_| Fp::rand(&mut rng))
        .collect::<Vec<Fp>>();
    let trace_domain = Radix2EvaluationDomain::<Fp>::new(N).unwrap();
    let polys = columns
        .iter()
        .map(|column| trace_domain.ifft(column))
        .collect::<Vec<Vec<Fp>>>();

    let blowup = 4;
    let lde_domain = Radix2EvaluationDomain::<Fp>::new(N * blowup).unwrap();
    let mut lde_evals = vec![Fp::zero(); N * blowup];
    for j in 0..blowup {
        let offset = Fp::GENERATOR * lde_domain.group_gen.pow([j as u64]);
        let coset = trace_domain.get_coset(offset).unwrap();
        let coset_columns = polys
            .iter()
            .map(|poly| coset.fft(poly))
            .collect::<Vec<Vec<Fp>>>();
        let evals = composition
            .eval_on_coset(offset, &coset_columns, &coeffs)
            .unwrap();
        for (i, v) in evals.into_iter().enumerate() {
            lde_evals[j + blowup * i] = v;
        }
    }

    let lde_coset = lde_domain.get_coset(Fp::GENERATOR).unwrap();
    let composition_coeffs = lde_coset.ifft(&lde_evals);
    assert!(composition_coeffs[layout.degree_bound()..]
        .iter()
        .all(|c| c.is_zero()));
    assert!(!composition_coeffs.iter().all(|c| c.is_zero()));
}

#[test]
fn range_check_builtin() {
    let config = LayoutConfig {
        name: "range_check_test".into(),
        range_check: Some(RangeCheckConfig {
            ratio: 8,
            n_parts: 8,
        }),
        ..LayoutConfig::plain()
    };
    let layout = Layout::<Fp>::new(config.clone(), 128).unwrap();
    let (mut public_input, mut witness) = execution(&config, 128);
    // every 16-bit part is 0x8000 to stay within the CPU's offset range
    let value = (0..8).fold(U256::ZERO, |acc, _| (acc << 16usize) | U256::from(0x8000u64));
    public_input.memory_segments.range_check = builtin_segment(1);
    witness
        .air_private_input
        .range_check
        .push(RangeCheckInstance { index: 0, value });

    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
    assert!(tamper_is_caught(&layout, &public_input, &witness, RANGE_CHECK_POOL_COLUMN));
}

#[test]
fn bitwise_builtin() {
    let config = LayoutConfig {
        name: "bitwise_test".into(),
        bitwise: Some(BitwiseConfig {
            ratio: 32,
            total_n_bits: 251,
        }),
        diluted_pool: Some(DilutedPoolConfig {
            spacing: 4,
            n_bits: 4,
        }),
        ..LayoutConfig::plain()
    };
    let layout = Layout::<Fp>::new(config.clone(), 512).unwrap();
    let (mut public_input, mut witness) = execution(&config, 512);
    public_input.memory_segments.bitwise = builtin_segment(5);
    witness.air_private_input.bitwise.push(BitwiseInstance {
        index: 0,
        x: U256::from(0b1100_1010_0111u64) << 236usize,
        y: U256::from(0b1010_0110_1101u64),
    });

    assert_eq!(6, layout.num_challenges());
    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
    assert!(tamper_is_caught(&layout, &public_input, &witness, NUM_PLAIN_COLUMNS));
}

#[test]
fn pedersen_builtin() {
    let config = LayoutConfig {
        name: "pedersen_test".into(),
        pedersen: Some(PedersenConfig { ratio: 32 }),
        ..LayoutConfig::plain()
    };
    let layout = Layout::<Fp>::builder(config.clone(), 512)
        .with_pedersen_params(PedersenParams::insecure_for_testing())
        .build()
        .unwrap();
    let (mut public_input, mut witness) = execution(&config, 512);
    public_input.memory_segments.pedersen = builtin_segment(3);
    witness.air_private_input.pedersen.push(PedersenInstance {
        index: 0,
        a: U256::from(0xcafe_f00du64) << 200usize,
        b: U256::from(42u64),
    });

    assert_eq!(2, layout.periodic_columns().len());
    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
    assert!(tamper_is_caught(&layout, &public_input, &witness, NUM_PLAIN_COLUMNS));
}

#[test]
fn ec_op_builtin() {
    let config = LayoutConfig {
        name: "ec_op_test".into(),
        ec_op: Some(EcOpConfig { ratio: 16 }),
        ..LayoutConfig::plain()
    };
    let layout = Layout::<Fp>::new(config.clone(), 256).unwrap();
    let (mut public_input, mut witness) = execution(&config, 256);
    public_input.memory_segments.ec_op = builtin_segment(7);
    witness.air_private_input.ec_op.push(EcOpInstance {
        m: U256::from(0b1011u64),
        ..gen_dummy_instance(0)
    });

    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
    assert!(tamper_is_caught(&layout, &public_input, &witness, NUM_PLAIN_COLUMNS));
}

fn ecdsa_config() -> LayoutConfig {
    LayoutConfig {
        name: "ecdsa_test".into(),
        ecdsa: Some(EcdsaConfig { ratio: 32 }),
        ..LayoutConfig::plain()
    }
}

fn signature(index: u32) -> binary::EcdsaInstance {
    sign(
        index,
        Fr::from_be_bytes_mod_order(b"cairo-air ecdsa test private key"),
        U256::from_be_slice(b"cairo-air ecdsa test message"),
        Fr::from_be_bytes_mod_order(b"cairo-air ecdsa test nonce"),
    )
    .unwrap()
}

#[test]
fn ecdsa_builtin() {
    let config = ecdsa_config();
    let layout = Layout::<Fp>::new(config.clone(), 1024).unwrap();
    let (mut public_input, mut witness) = execution(&config, 1024);
    // the second instance is a dummy
    public_input.memory_segments.ecdsa = builtin_segment(2);
    witness.air_private_input.ecdsa.push(signature(0));

    assert_eq!(2, layout.periodic_columns().len());
    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
    // key partial sum x
    assert!(tamper_is_caught(&layout, &public_input, &witness, NUM_PLAIN_COLUMNS));
}

#[test]
fn tampered_ecdsa_signature_is_rejected() {
    let config = ecdsa_config();
    let layout = Layout::<Fp>::new(config.clone(), 512).unwrap();
    let (mut public_input, mut witness) = execution(&config, 512);
    public_input.memory_segments.ecdsa = builtin_segment(2);
    let mut instance = signature(0);
    instance.signature.w += U256::from(1u8);
    witness.air_private_input.ecdsa.push(instance);

    let res = ExecutionTrace::new(&layout, &witness, &public_input);

    assert!(matches!(
        res,
        Err(Error::Builtin(builtins::Error::InvalidSignature(0)))
    ));
}

#[test]
fn ecdsa_result_must_match_r() {
    let config = ecdsa_config();
    let layout = Layout::<Fp>::new(config.clone(), 512).unwrap();
    let (mut public_input, mut witness) = execution(&config, 512);
    public_input.memory_segments.ecdsa = builtin_segment(2);
    witness.air_private_input.ecdsa.push(signature(0));
    let challenges = challenges(&layout);
    let mut columns = trace_columns(&layout, &public_input, &witness, &challenges);

    // r is the key suffix on the first row of the instance
    let key_suffix = NUM_PLAIN_COLUMNS + 2;
    columns[key_suffix][0] += Fp::from(2u8);

    let violations = layout
        .check_trace(&columns, &public_input, &challenges)
        .unwrap();
    assert!(violations
        .iter()
        .any(|v| v.name == "ecdsa/signature0/extract_r/x" && v.row == 0));
}

#[test]
fn unused_builtin_instances_are_filled() {
    let config = LayoutConfig {
        name: "ec_op_test".into(),
        ec_op: Some(EcOpConfig { ratio: 16 }),
        ..LayoutConfig::plain()
    };
    let layout = Layout::<Fp>::new(config.clone(), 256).unwrap();
    let (mut public_input, witness) = execution(&config, 256);
    public_input.memory_segments.ec_op = builtin_segment(0);

    assert_eq!(Vec::<Violation>::new(), violations(&layout, &public_input, &witness));
}

#[test]
fn layout_requires_stark_field() {
    use ark_ff::fields::Fp64;
    use ark_ff::fields::MontBackend;
    use ark_ff::fields::MontConfig;

    #[derive(MontConfig)]
    #[modulus = "97"]
    #[generator = "5"]
    struct SmallConfig;
    type SmallField = Fp64<MontBackend<SmallConfig, 1>>;

    let res = Layout::<SmallField>::new(LayoutConfig::plain(), 64);

    assert!(matches!(res, Err(Error::UnsupportedField)));
}

#[test]
fn pedersen_needs_params() {
    let res = Layout::<Fp>::new(LayoutConfig::recursive(), 1 << 12);

    assert!(matches!(res, Err(Error::MissingPedersenParams)));
}

#[test]
fn trace_must_fit_builtin_instances() {
    let config = LayoutConfig {
        name: "ec_op_test".into(),
        ec_op: Some(EcOpConfig { ratio: 16 }),
        ..LayoutConfig::plain()
    };

    let res = Layout::<Fp>::new(config, 128);

    assert!(matches!(res, Err(Error::InvalidTraceLength(128))));
}

#[test]
fn unexpected_segment_is_rejected() {
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), 64).unwrap();
    let (mut public_input, _) = execution(&config, 64);
    public_input.memory_segments.bitwise = builtin_segment(5);

    let res = layout.validate_public_input(&public_input);

    assert!(matches!(res, Err(Error::UnexpectedSegment(name)) if name == "bitwise"));
}

#[test]
fn missing_segment_is_rejected() {
    let config = LayoutConfig {
        name: "range_check_test".into(),
        range_check: Some(RangeCheckConfig {
            ratio: 8,
            n_parts: 8,
        }),
        ..LayoutConfig::plain()
    };
    let layout = Layout::<Fp>::new(config.clone(), 128).unwrap();
    let (public_input, _) = execution(&config, 128);

    let res = layout.validate_public_input(&public_input);

    assert!(matches!(res, Err(Error::MissingSegment(name)) if name == "range_check"));
}

#[test]
fn step_count_must_match_trace() {
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), 64).unwrap();
    let (public_input, _) = execution(&config, 64);
    let (_, short_witness) = execution(&config, 32);

    let res = ExecutionTrace::new(&layout, &short_witness, &public_input);

    assert!(matches!(
        res,
        Err(Error::StepCount {
            expected: 4,
            actual: 2
        })
    ));
}

#[test]
fn interaction_needs_every_challenge() {
    let config = LayoutConfig::plain();
    let layout = Layout::<Fp>::new(config.clone(), 64).unwrap();
    let (public_input, witness) = execution(&config, 64);
    let trace = ExecutionTrace::new(&layout, &witness, &public_input).unwrap();

    let res = trace.interaction_columns(&[Fp::from(1u8)]);

    assert!(matches!(
        res,
        Err(Error::ChallengeCount {
            expected: 3,
            actual: 1
        })
    ));
}
