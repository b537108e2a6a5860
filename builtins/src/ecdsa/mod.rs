use crate::ec_op::doubling_steps;
use crate::ec_op::partial_sum_steps;
use crate::ec_op::DoublingStep;
use crate::ec_op::PartialSumStep;
use crate::ec_op::STEPS;
use crate::errors::Error;
use crate::errors::Result;
use crate::utils::curve::Fr;
use crate::utils::curve::StarkwareCurve;
use crate::utils::felt_from_u256;
use crate::utils::reduce_u256;
use crate::utils::u256_from_felt;
use ark_ec::short_weierstrass::Affine;
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ec::CurveGroup;
use ark_ff::Field;
use ark_ff::MontFp;
use ark_ff::PrimeField;
use binary::EcdsaInstance;
use binary::Fp;
use binary::Signature;
use ruint::aliases::U256;
use std::sync::OnceLock;

/// Bits of the message hash and of the signature values `r` and `w`
pub const SCALAR_BITS: usize = 251;

/// Starting point of the subset sums. It cancels out of every result.
pub const SHIFT_POINT: Affine<StarkwareCurve> = Affine::new_unchecked(
    MontFp!("2089986280348253421170679821480865132823066470938446095505822317253594081284"),
    MontFp!("1713931329540660377023406109199410414810705867260802078187082345529207694986"),
);

static DUMMY_INSTANCE_TRACE: OnceLock<InstanceTrace> = OnceLock::new();

static GENERATOR_POINTS: OnceLock<Vec<Affine<StarkwareCurve>>> = OnceLock::new();

/// Signature verification trace for message hash `z`, public key `Q` and
/// signature `(r, w)`:
///
/// ```text
/// ┌─────────────┬──────────────────────────┬────────────────┐
/// │ subset sum  │ partial sum              │ doubled point  │
/// ├─────────────┼──────────────────────────┼────────────────┤
/// │ generator   │ -shift + z * G           │ G * 2^i        │
/// │ key 0..256  │ shift + r * Q            │ Q * 2^i        │
/// │ key 256..512│ shift + w * B            │ B * 2^i        │
/// └─────────────┴──────────────────────────┴────────────────┘
/// ```
///
/// where `B = z * G + r * Q`. The signature is valid if the x coordinate of
/// `w * B` is `r`.
#[derive(Clone, Debug)]
pub struct InstanceTrace {
    pub instance: EcdsaInstance,
    pub pubkey: Affine<StarkwareCurve>,
    pub message: Fp,
    pub r: Fp,
    pub w: Fp,
    pub generator_steps: Vec<PartialSumStep>,
    pub key_steps: Vec<PartialSumStep>,
    /// `Q * 2^i` followed by `B * 2^i`. The slopes of the last step of each
    /// half are `1 / r` and `1 / w` instead since they are never used to
    /// double.
    pub doubling_steps: Vec<DoublingStep>,
    pub b: Affine<StarkwareCurve>,
    pub b_slope: Fp,
    pub b_x_diff_inv: Fp,
    pub r_point_slope: Fp,
    pub r_point_x_diff_inv: Fp,
}

impl InstanceTrace {
    pub fn new(instance: EcdsaInstance) -> Result<Self> {
        let message = check_scalar(instance.message)?;
        let r = check_scalar(instance.signature.r)?;
        let w = check_scalar(instance.signature.w)?;
        let pubkey_x = felt_from_u256(instance.pubkey_x)?;
        let (y0, y1) = Affine::<StarkwareCurve>::get_ys_from_x_unchecked(pubkey_x)
            .ok_or(Error::InvalidPublicKey(instance.pubkey_x))?;

        // only the x coordinate is public so either point may verify
        for pubkey_y in [y0, y1] {
            let pubkey = Affine::new_unchecked(pubkey_x, pubkey_y);
            if let Ok(trace) = Self::with_pubkey(instance, pubkey, message, r, w) {
                return Ok(trace);
            }
        }
        Err(Error::InvalidSignature(instance.index))
    }

    fn with_pubkey(
        instance: EcdsaInstance,
        pubkey: Affine<StarkwareCurve>,
        message: Fp,
        r: Fp,
        w: Fp,
    ) -> Result<Self> {
        let (generator_steps, zg) = partial_sum_steps(
            instance.message,
            generator_points().iter().copied(),
            -SHIFT_POINT,
        )?;

        let mut q_doubling = doubling_steps(STEPS, pubkey);
        let points = q_doubling.iter().map(|step| step.point);
        let (mut key_steps, rq) = partial_sum_steps(instance.signature.r, points, SHIFT_POINT)?;

        let b_x_diff_inv = (zg.x - rq.x)
            .inverse()
            .ok_or(Error::InvalidSignature(instance.index))?;
        let b_slope = (zg.y - rq.y) * b_x_diff_inv;
        let b = (zg + rq).into_affine();

        let mut b_doubling = doubling_steps(STEPS, b);
        let points = b_doubling.iter().map(|step| step.point);
        let (w_steps, wb) = partial_sum_steps(instance.signature.w, points, SHIFT_POINT)?;

        let r_point_x_diff_inv = (wb.x - SHIFT_POINT.x)
            .inverse()
            .ok_or(Error::InvalidSignature(instance.index))?;
        let r_point_slope = (wb.y + SHIFT_POINT.y) * r_point_x_diff_inv;
        let r_point = (wb + -SHIFT_POINT).into_affine();
        if r_point.x != r {
            return Err(Error::InvalidSignature(instance.index));
        }

        // r and w are checked to be non zero
        q_doubling[STEPS - 1].slope = r.inverse().ok_or(Error::InvalidScalar(instance.signature.r))?;
        b_doubling[STEPS - 1].slope = w.inverse().ok_or(Error::InvalidScalar(instance.signature.w))?;
        key_steps.extend(w_steps);
        q_doubling.extend(b_doubling);

        Ok(Self {
            instance,
            pubkey,
            message,
            r,
            w,
            generator_steps,
            key_steps,
            doubling_steps: q_doubling,
            b,
            b_slope,
            b_x_diff_inv,
            r_point_slope,
            r_point_x_diff_inv,
        })
    }

    /// Creates a new dummy instance.
    /// Can be used for filling holes in an execution trace
    pub fn new_dummy(index: u32) -> Result<Self> {
        let mut dummy_trace = match DUMMY_INSTANCE_TRACE.get() {
            Some(trace) => trace.clone(),
            None => {
                let trace = Self::new(gen_dummy_instance(0)?)?;
                DUMMY_INSTANCE_TRACE.get_or_init(|| trace).clone()
            }
        };
        dummy_trace.instance.index = index;
        Ok(dummy_trace)
    }
}

/// Message hashes and signature values lie in `[1, 2^251)`
fn check_scalar(v: U256) -> Result<Fp> {
    if v == U256::ZERO || v.bit_len() > SCALAR_BITS {
        return Err(Error::InvalidScalar(v));
    }
    felt_from_u256(v)
}

/// The points `G * 2^i` for `i < 256` where `G` is the curve generator
pub fn generator_points() -> &'static [Affine<StarkwareCurve>] {
    GENERATOR_POINTS.get_or_init(|| {
        doubling_steps(STEPS, StarkwareCurve::GENERATOR)
            .into_iter()
            .map(|step| step.point)
            .collect()
    })
}

/// x and y coordinates of [generator_points]
pub fn generator_points_table() -> (Vec<Fp>, Vec<Fp>) {
    generator_points().iter().map(|p| (p.x, p.y)).unzip()
}

/// Signs a message hash. The instance holds `w = nonce / (z + r * key)`
/// rather than its inverse `s`.
pub fn sign(index: u32, private_key: Fr, message: U256, nonce: Fr) -> Result<EcdsaInstance> {
    let g = StarkwareCurve::GENERATOR;
    let pubkey = (g * private_key).into_affine();
    let r = u256_from_felt((g * nonce).into_affine().x);
    let s_over_nonce = reduce_u256::<Fr>(message) + reduce_u256::<Fr>(r) * private_key;
    let w = nonce * s_over_nonce.inverse().ok_or(Error::InvalidScalar(message))?;
    Ok(EcdsaInstance {
        index,
        pubkey_x: u256_from_felt(pubkey.x),
        message,
        signature: Signature {
            r,
            w: u256_from_felt(w),
        },
    })
}

/// Generates a dummy signature over a fixed message
pub fn gen_dummy_instance(index: u32) -> Result<EcdsaInstance> {
    sign(
        index,
        Fr::from_be_bytes_mod_order(b"cairo-air ecdsa dummy private key"),
        U256::from_be_slice(b"cairo-air ecdsa dummy message"),
        Fr::from_be_bytes_mod_order(b"cairo-air ecdsa dummy nonce"),
    )
}

#[cfg(test)]
mod tests {
    use super::gen_dummy_instance;
    use super::generator_points;
    use super::sign;
    use super::InstanceTrace;
    use super::SHIFT_POINT;
    use crate::ec_op::STEPS;
    use crate::utils::curve::Fr;
    use crate::utils::curve::StarkwareCurve;
    use crate::Error;
    use ark_ec::short_weierstrass::SWCurveConfig;
    use ark_ec::CurveGroup;
    use ark_ff::One;
    use ark_ff::PrimeField;
    use binary::EcdsaInstance;
    use binary::Fp;
    use ruint::aliases::U256;
    use ruint::uint;

    fn signed() -> EcdsaInstance {
        sign(
            0,
            Fr::from_be_bytes_mod_order(b"cairo-air ecdsa test private key"),
            U256::from_be_slice(b"cairo-air ecdsa test message"),
            Fr::from_be_bytes_mod_order(b"cairo-air ecdsa test nonce"),
        )
        .unwrap()
    }

    #[test]
    fn shift_point_is_on_curve() {
        assert!(SHIFT_POINT.is_on_curve());
    }

    #[test]
    fn generator_points_double() {
        let g = StarkwareCurve::GENERATOR;
        let points = generator_points();

        assert_eq!(STEPS, points.len());
        assert_eq!(g, points[0]);
        assert_eq!((g * Fr::from(8u8)).into_affine(), points[3]);
    }

    #[test]
    fn valid_signature_verifies() {
        let private_key = Fr::from_be_bytes_mod_order(b"cairo-air ecdsa test private key");
        let expected_pubkey = (StarkwareCurve::GENERATOR * private_key).into_affine();

        let trace = InstanceTrace::new(signed()).unwrap();

        assert!(trace.pubkey == expected_pubkey || trace.pubkey == -expected_pubkey);
        assert_eq!(2 * STEPS, trace.key_steps.len());
        assert_eq!(2 * STEPS, trace.doubling_steps.len());
        assert_eq!(trace.b, trace.doubling_steps[STEPS].point);
        assert_eq!(trace.r, trace.key_steps[0].suffix);
        assert_eq!(trace.w, trace.key_steps[STEPS].suffix);
        assert_eq!(trace.message, trace.generator_steps[0].suffix);
        assert_eq!(Fp::one(), trace.r * trace.doubling_steps[STEPS - 1].slope);
        assert_eq!(Fp::one(), trace.w * trace.doubling_steps[2 * STEPS - 1].slope);
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let mut instance = signed();
        instance.signature.w += uint!(1_U256);
        assert!(matches!(InstanceTrace::new(instance), Err(Error::InvalidSignature(0))));

        let mut instance = signed();
        instance.message += uint!(1_U256);
        assert!(matches!(InstanceTrace::new(instance), Err(Error::InvalidSignature(0))));
    }

    #[test]
    fn scalars_out_of_range_are_rejected() {
        let mut instance = signed();
        instance.message = U256::ZERO;
        assert!(matches!(InstanceTrace::new(instance), Err(Error::InvalidScalar(_))));

        let mut instance = signed();
        instance.signature.r = uint!(1_U256) << 251;
        assert!(matches!(InstanceTrace::new(instance), Err(Error::InvalidScalar(_))));
    }

    #[test]
    fn dummy_instance_is_valid() {
        let trace = InstanceTrace::new_dummy(5).unwrap();

        assert_eq!(5, trace.instance.index);
        assert_eq!(gen_dummy_instance(0).unwrap().pubkey_x, trace.instance.pubkey_x);
    }
}
