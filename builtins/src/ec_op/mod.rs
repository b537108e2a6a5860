use crate::errors::Error;
use crate::errors::Result;
use crate::utils::curve::point_from_u256;
use crate::utils::curve::Fr;
use crate::utils::curve::StarkwareCurve;
use crate::utils::felt_from_u256;
use crate::utils::u256_from_felt;
use ark_ec::short_weierstrass::Affine;
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ec::CurveGroup;
use ark_ff::Field;
use ark_ff::PrimeField;
use ark_ff::Zero;
use binary::EcOpInstance;
use binary::Fp;
use ruint::aliases::U256;
use ruint::uint;
use std::sync::OnceLock;

/// Rows of an instance's subset sum
pub const STEPS: usize = 256;

/// Bits of the scalar consumed by the subset sum
pub const SCALAR_BITS: usize = 252;

/// An EC op trace for a dummy instance
/// Created once since creating new instance traces each time is expensive.
static DUMMY_INSTANCE_TRACE: OnceLock<InstanceTrace> = OnceLock::new();

#[derive(Clone, Copy, Debug)]
pub struct DoublingStep {
    pub point: Affine<StarkwareCurve>,
    pub slope: Fp,
}

/// State of the subset sum before bit `i` of the scalar is consumed
#[derive(Clone, Copy, Debug)]
pub struct PartialSumStep {
    pub point: Affine<StarkwareCurve>,
    /// The scalar shifted right by `i`
    pub suffix: Fp,
    /// Slope between the partial sum and `q * 2^i` or zero if the bit is not
    /// set
    pub slope: Fp,
    /// `1 / (partial_x - (q * 2^i)_x)`
    pub x_diff_inv: Fp,
}

/// Elliptic Curve operation instance trace for `r = p + m * q` with scalar `m`
/// and points `p`, `q` and `r` on an elliptic curve
#[derive(Clone, Debug)]
pub struct InstanceTrace {
    pub instance: EcOpInstance,
    pub p: Affine<StarkwareCurve>,
    pub q: Affine<StarkwareCurve>,
    pub m: Fp,
    pub q_doubling_steps: Vec<DoublingStep>,
    pub partial_steps: Vec<PartialSumStep>,
    pub r: Affine<StarkwareCurve>,
}

impl InstanceTrace {
    pub fn new(instance: EcOpInstance) -> Result<Self> {
        let p = point_from_u256(instance.p_x, instance.p_y)?;
        let q = point_from_u256(instance.q_x, instance.q_y)?;
        let m = felt_from_u256(instance.m)?;
        let q_doubling_steps = doubling_steps(STEPS, q);

        let points = q_doubling_steps.iter().map(|step| step.point);
        let (partial_steps, r) = partial_sum_steps(u256_from_felt(m), points, p)?;

        Ok(Self {
            instance,
            p,
            q,
            m,
            q_doubling_steps,
            partial_steps,
            r,
        })
    }

    /// Creates a new dummy instance.
    /// Can be used for filling holes in an execution trace
    pub fn new_dummy(index: u32) -> Result<Self> {
        let mut dummy_trace = match DUMMY_INSTANCE_TRACE.get() {
            Some(trace) => trace.clone(),
            None => {
                let trace = Self::new(gen_dummy_instance(0))?;
                DUMMY_INSTANCE_TRACE.get_or_init(|| trace).clone()
            }
        };
        dummy_trace.instance.index = index;
        Ok(dummy_trace)
    }
}

/// Generates a dummy EC op instance computing `p + q` for fixed points
pub fn gen_dummy_instance(index: u32) -> EcOpInstance {
    let g = StarkwareCurve::GENERATOR;
    let p = (g * Fr::from_be_bytes_mod_order(b"cairo-air ec op dummy point")).into_affine();
    EcOpInstance {
        index,
        p_x: u256_from_felt(p.x),
        p_y: u256_from_felt(p.y),
        q_x: u256_from_felt(g.x),
        q_y: u256_from_felt(g.y),
        m: uint!(1_U256),
    }
}

/// Steps of the subset sum `start + Σ m_i * points[i]` followed by the final
/// sum. The partial sum may not share an x coordinate with the point of any
/// step but the last.
pub fn partial_sum_steps(
    m: U256,
    points: impl ExactSizeIterator<Item = Affine<StarkwareCurve>>,
    start: Affine<StarkwareCurve>,
) -> Result<(Vec<PartialSumStep>, Affine<StarkwareCurve>)> {
    let n = points.len();
    let mut partial_sum = start;
    let mut steps = Vec::with_capacity(n);
    for (i, point) in points.enumerate() {
        let suffix = m >> i;
        // the sum is never combined with the last point
        let x_diff_inv = if i == n - 1 {
            Fp::zero()
        } else {
            (partial_sum.x - point.x)
                .inverse()
                .ok_or(Error::XCoordinateCollision(i))?
        };
        let mut slope = Fp::zero();
        let mut partial_sum_next = partial_sum;
        if suffix.bit(0) {
            slope = (partial_sum.y - point.y) * x_diff_inv;
            partial_sum_next = (partial_sum + point).into_affine();
        }
        steps.push(PartialSumStep {
            point: partial_sum,
            suffix: Fp::from_le_bytes_mod_order(&suffix.to_le_bytes::<32>()),
            slope,
            x_diff_inv,
        });
        partial_sum = partial_sum_next;
    }
    Ok((steps, partial_sum))
}

/// The points `p * 2^i` for `i < n` along with the slope of the tangent used
/// to double each of them
pub fn doubling_steps(n: usize, p: Affine<StarkwareCurve>) -> Vec<DoublingStep> {
    let mut res = Vec::with_capacity(n);
    let mut p = p;
    for _ in 0..n {
        // point doubling equation
        // https://en.wikipedia.org/wiki/Elliptic_curve_point_multiplication#Point_doubling
        let xx = p.x.square();
        let slope = (xx + xx + xx + StarkwareCurve::COEFF_A) / (p.y + p.y);
        res.push(DoublingStep { point: p, slope });
        p = (p + p).into_affine();
    }
    res
}

/// Computes `m * point + shift_point` using the same steps as the AIR.
/// Fails if and only if the AIR has no valid assignment i.e. the partial sum
/// shares an x coordinate with a doubled point on a row that is constrained.
pub fn mimic_ec_mult_air(
    m: U256,
    point: Affine<StarkwareCurve>,
    shift_point: Affine<StarkwareCurve>,
) -> Result<Affine<StarkwareCurve>> {
    if m.bit_len() > SCALAR_BITS {
        return Err(Error::InvalidScalar(m));
    }
    let mut point = point;
    let mut partial_sum = shift_point;
    for i in 0..STEPS - 1 {
        if partial_sum.x == point.x {
            return Err(Error::XCoordinateCollision(i));
        }
        if m.bit(i) {
            partial_sum = (partial_sum + point).into_affine();
        }
        point = (point + point).into_affine();
    }
    Ok(partial_sum)
}

#[cfg(test)]
mod tests {
    use super::doubling_steps;
    use super::gen_dummy_instance;
    use super::mimic_ec_mult_air;
    use super::InstanceTrace;
    use super::STEPS;
    use crate::utils::curve::Fr;
    use crate::utils::curve::StarkwareCurve;
    use crate::utils::u256_from_felt;
    use crate::Error;
    use ark_ec::short_weierstrass::SWCurveConfig;
    use ark_ec::CurveGroup;
    use ark_ff::One;
    use ark_ff::Zero;
    use binary::EcOpInstance;
    use binary::Fp;
    use ruint::uint;

    fn instance(m: ruint::aliases::U256) -> EcOpInstance {
        let g = StarkwareCurve::GENERATOR;
        let p = (g * Fr::from(0x1234567u64)).into_affine();
        EcOpInstance {
            index: 0,
            p_x: u256_from_felt(p.x),
            p_y: u256_from_felt(p.y),
            q_x: u256_from_felt(g.x),
            q_y: u256_from_felt(g.y),
            m,
        }
    }

    #[test]
    fn result_matches_scalar_multiplication() {
        let m = uint!(0xdeadbeef_U256);
        let trace = InstanceTrace::new(instance(m)).unwrap();

        let expected = (trace.q * Fr::from(0xdeadbeefu64) + trace.p).into_affine();
        assert_eq!(expected, trace.r);
        assert_eq!(expected, mimic_ec_mult_air(m, trace.q, trace.p).unwrap());
        assert_eq!(expected, trace.partial_steps[STEPS - 1].point);
    }

    #[test]
    fn witnesses_are_consistent() {
        let trace = InstanceTrace::new(instance(uint!(0b101_U256))).unwrap();

        for (step, doubling) in trace.partial_steps[..STEPS - 1]
            .iter()
            .zip(&trace.q_doubling_steps)
        {
            assert_eq!(Fp::one(), step.x_diff_inv * (step.point.x - doubling.point.x));
        }
        assert!(trace.partial_steps[1].slope.is_zero());
        assert!(!trace.partial_steps[2].slope.is_zero());
        assert_eq!(Fp::one(), trace.partial_steps[2].suffix);
        assert!(trace.partial_steps[3].suffix.is_zero());
    }

    #[test]
    fn doubling_steps_double() {
        let g = StarkwareCurve::GENERATOR;
        let steps = doubling_steps(4, g);

        assert_eq!((g * Fr::from(8u8)).into_affine(), steps[3].point);
        let step = steps[1];
        let next = steps[2].point;
        assert_eq!(step.slope * step.slope - step.point.x - step.point.x, next.x);
    }

    #[test]
    fn collision_is_reported() {
        // p = q so the partial sum and q share an x coordinate on the first row
        let g = StarkwareCurve::GENERATOR;
        let mut instance = instance(uint!(1_U256));
        instance.p_x = u256_from_felt(g.x);
        instance.p_y = u256_from_felt(g.y);

        assert!(matches!(
            InstanceTrace::new(instance),
            Err(Error::XCoordinateCollision(0))
        ));
        assert!(matches!(
            mimic_ec_mult_air(uint!(1_U256), g, g),
            Err(Error::XCoordinateCollision(0))
        ));
    }

    #[test]
    fn dummy_instance_is_valid() {
        let trace = InstanceTrace::new_dummy(3).unwrap();

        assert_eq!(3, trace.instance.index);
        assert_eq!(gen_dummy_instance(0).p_x, trace.instance.p_x);
        assert_eq!((trace.p + trace.q).into_affine(), trace.r);
    }
}
