use crate::errors::Error;
use crate::errors::Result;
use crate::utils::curve::point_from_u256;
use crate::utils::curve::Fr;
use crate::utils::curve::StarkwareCurve;
use crate::utils::felt_from_u256;
use crate::utils::u256_from_felt;
use ark_ec::short_weierstrass::Affine;
use ark_ec::short_weierstrass::Projective;
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ec::CurveGroup;
use ark_ec::Group;
use ark_ff::PrimeField;
use ark_ff::Zero;
use binary::utils::deserialize_hex_str;
use binary::Fp;
use binary::PedersenInstance;
use ruint::aliases::U256;
use serde::Deserialize;

/// Number of low bits of an input multiplied by the first point of its pair
pub const LOW_BITS: usize = 248;

/// Number of high bits of an input multiplied by the second point of its pair
pub const HIGH_BITS: usize = 4;

/// Bits per input. Values are field elements so never exceed this.
pub const INPUT_BITS: usize = LOW_BITS + HIGH_BITS;

/// Rows of a single input's subset sum
pub const STEPS_PER_INPUT: usize = 256;

/// Curve points the hash is defined over: a shift point and one pair of
/// points per input.
///
/// The points are an external asset (StarkWare derives them from the digits
/// of pi) read from JSON of the form:
///
/// ```text
/// {
///   "shift_point": { "x": "0x...", "y": "0x..." },
///   "points": [{ "x": "0x...", "y": "0x..." }, ... 4 points]
/// }
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PedersenParams {
    pub shift_point: Affine<StarkwareCurve>,
    pub points: [Affine<StarkwareCurve>; 4],
    /// Per input: the point added for each of its 252 bits
    bit_points: [Vec<Affine<StarkwareCurve>>; 2],
}

impl PedersenParams {
    pub fn new(shift_point: Affine<StarkwareCurve>, points: [Affine<StarkwareCurve>; 4]) -> Self {
        let [p1, p2, p3, p4] = points;
        Self {
            shift_point,
            points,
            bit_points: [bit_points(p1, p2), bit_points(p3, p4)],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawPoint {
            #[serde(deserialize_with = "deserialize_hex_str")]
            x: U256,
            #[serde(deserialize_with = "deserialize_hex_str")]
            y: U256,
        }

        #[derive(Deserialize)]
        struct RawParams {
            shift_point: RawPoint,
            points: [RawPoint; 4],
        }

        let raw: RawParams = serde_json::from_str(json)?;
        let shift_point = point_from_u256(raw.shift_point.x, raw.shift_point.y)?;
        let [p1, p2, p3, p4] = raw.points;
        let points = [
            point_from_u256(p1.x, p1.y)?,
            point_from_u256(p2.x, p2.y)?,
            point_from_u256(p3.x, p3.y)?,
            point_from_u256(p4.x, p4.y)?,
        ];
        Ok(Self::new(shift_point, points))
    }

    /// Parameters made of fixed multiples of the curve generator.
    ///
    /// NOTE: the discrete logs between the points are public so the hash is
    /// not collision resistant. Only meant for exercising traces.
    pub fn insecure_for_testing() -> Self {
        let g = StarkwareCurve::GENERATOR;
        let point = |tag: &[u8]| (g * Fr::from_be_bytes_mod_order(tag)).into_affine();
        Self::new(
            point(b"cairo-air pedersen shift point"),
            [
                point(b"cairo-air pedersen point one.."),
                point(b"cairo-air pedersen point two.."),
                point(b"cairo-air pedersen point three"),
                point(b"cairo-air pedersen point four."),
            ],
        )
    }

    /// Points added for each bit of input `input` (0 or 1)
    pub fn bit_points(&self, input: usize) -> &[Affine<StarkwareCurve>] {
        &self.bit_points[input]
    }

    /// Periodic point tables used by the hash constraints. Output is of the
    /// form `(x_values, y_values)` with 512 rows:
    ///
    /// ```text
    /// ┌───────────┬────────────────────┐
    /// │ row       │ point              │
    /// ├───────────┼────────────────────┤
    /// │ 0..248    │ P1 * 2^row         │
    /// │ 248..252  │ P2 * 2^(row-248)   │
    /// │ 252..256  │ 0                  │
    /// │ 256..504  │ P3 * 2^(row-256)   │
    /// │ 504..508  │ P4 * 2^(row-504)   │
    /// │ 508..512  │ 0                  │
    /// └───────────┴────────────────────┘
    /// ```
    pub fn points_table(&self) -> (Vec<Fp>, Vec<Fp>) {
        let mut evals = Vec::with_capacity(2 * STEPS_PER_INPUT);
        for points in &self.bit_points {
            evals.extend(points.iter().map(|p| (p.x, p.y)));
            evals.resize(evals.len() + STEPS_PER_INPUT - INPUT_BITS, (Fp::zero(), Fp::zero()));
        }
        evals.into_iter().unzip()
    }
}

/// The points `low * 2^i` for `i < 248` followed by `high * 2^i` for `i < 4`
fn bit_points(
    low: Affine<StarkwareCurve>,
    high: Affine<StarkwareCurve>,
) -> Vec<Affine<StarkwareCurve>> {
    let mut res = Vec::with_capacity(INPUT_BITS);
    for (p, n) in [(low, LOW_BITS), (high, HIGH_BITS)] {
        let mut acc = Projective::from(p);
        for _ in 0..n {
            res.push(acc.into_affine());
            acc.double_in_place();
        }
    }
    res
}

/// Computes the Starkware version of the Pedersen hash of a and b.
/// The hash is defined by:
///     shift_point + a_low * P1 + a_high * P2 + b_low * P3 + b_high * P4
/// where a_low is the 248 low bits of a, a_high is the 4 high bits of a and
/// similarly for b.
pub fn pedersen_hash(params: &PedersenParams, a: Fp, b: Fp) -> Fp {
    let [p1, p2, p3, p4] = params.points;
    let res = Projective::from(params.shift_point)
        + process_element(a, p1, p2)
        + process_element(b, p3, p4);
    res.into_affine().x
}

fn process_element(
    x: Fp,
    low: Affine<StarkwareCurve>,
    high: Affine<StarkwareCurve>,
) -> Projective<StarkwareCurve> {
    let x = u256_from_felt(x);
    let high_part = x >> LOW_BITS;
    let low_part = x - (high_part << LOW_BITS);
    let x_low = Fr::from_le_bytes_mod_order(&low_part.to_le_bytes::<32>());
    let x_high = Fr::from_le_bytes_mod_order(&high_part.to_le_bytes::<32>());
    low * x_low + high * x_high
}

/// State of the subset sum before bit `i` of the input is consumed
#[derive(Clone, Copy, Debug)]
pub struct ElementPartialStep {
    pub point: Affine<StarkwareCurve>,
    /// The input shifted right by `i`
    pub suffix: Fp,
    /// Slope between the partial sum and the bit's point or zero if the bit
    /// is not set
    pub slope: Fp,
}

#[derive(Clone, Debug)]
pub struct InstanceTrace {
    pub instance: PedersenInstance,
    pub a: Fp,
    pub b: Fp,
    pub output: Fp,
    pub a_steps: Vec<ElementPartialStep>,
    pub b_steps: Vec<ElementPartialStep>,
}

impl InstanceTrace {
    pub fn new(params: &PedersenParams, instance: PedersenInstance) -> Result<Self> {
        let a = felt_from_u256(instance.a)?;
        let b = felt_from_u256(instance.b)?;

        let a_steps = gen_element_steps(a, params.shift_point, params.bit_points(0), 0)?;
        let b_start = a_steps[STEPS_PER_INPUT - 1].point;
        let b_steps = gen_element_steps(b, b_start, params.bit_points(1), STEPS_PER_INPUT)?;
        let output = b_steps[STEPS_PER_INPUT - 1].point.x;

        Ok(Self {
            instance,
            a,
            b,
            output,
            a_steps,
            b_steps,
        })
    }
}

/// Generates the 256 partial steps of one input. The last step holds the
/// final sum since the bits above 252 are zero.
fn gen_element_steps(
    x: Fp,
    start: Affine<StarkwareCurve>,
    points: &[Affine<StarkwareCurve>],
    first_row: usize,
) -> Result<Vec<ElementPartialStep>> {
    let x_int = u256_from_felt(x);
    let mut partial_point = start;
    let mut res = Vec::with_capacity(STEPS_PER_INPUT);
    for i in 0..STEPS_PER_INPUT {
        let suffix = x_int >> i;
        let mut slope = Fp::zero();
        let mut partial_point_next = partial_point;
        if suffix.bit(0) {
            // the bits above the input width are always zero
            let constant_point = points[i];
            if partial_point.x == constant_point.x {
                return Err(Error::XCoordinateCollision(first_row + i));
            }
            let dy = partial_point.y - constant_point.y;
            let dx = partial_point.x - constant_point.x;
            slope = dy / dx;
            partial_point_next = (partial_point + constant_point).into_affine();
        }

        res.push(ElementPartialStep {
            point: partial_point,
            suffix: Fp::from_le_bytes_mod_order(&suffix.to_le_bytes::<32>()),
            slope,
        });

        partial_point = partial_point_next;
    }
    Ok(res)
}
