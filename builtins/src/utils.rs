use crate::errors::Error;
use crate::errors::Result;
use ark_ff::PrimeField;
use binary::utils::try_felt_from_u256;
use binary::Fp;
use num_bigint::BigUint;
use ruint::aliases::U256;

/// Converts a field element to its canonical integer representative
pub fn u256_from_felt<F: PrimeField>(v: F) -> U256 {
    U256::from_limbs_slice(v.into_bigint().as_ref())
}

/// Converts an integer to a STARK field element. Fails if the integer is not
/// a canonical field element.
pub fn felt_from_u256(v: U256) -> Result<Fp> {
    Ok(try_felt_from_u256(v)?)
}

/// Reduces an integer modulo the field order
pub fn reduce_u256<F: PrimeField>(v: U256) -> F {
    F::from(BigUint::from(v))
}

pub mod curve {
    use super::felt_from_u256;
    use crate::errors::Error;
    use crate::errors::Result;
    use ark_ec::short_weierstrass::Affine;
    use ark_ec::short_weierstrass::SWCurveConfig;
    use ark_ec::CurveConfig;
    use ark_ff::Field;
    use ark_ff::Fp256;
    use ark_ff::MontBackend;
    use ark_ff::MontConfig;
    use ark_ff::MontFp;
    use binary::Fp;
    use ruint::aliases::U256;

    #[derive(MontConfig)]
    #[modulus = "3618502788666131213697322783095070105526743751716087489154079457884512865583"]
    #[generator = "3"]
    pub struct FrConfig;
    pub type Fr = Fp256<MontBackend<FrConfig, 4>>;

    // StarkWare's Cairo curve params: https://docs.starkware.co/starkex/crypto/pedersen-hash-function.html
    pub struct StarkwareCurve;

    impl CurveConfig for StarkwareCurve {
        type BaseField = Fp;
        type ScalarField = Fr;

        const COFACTOR: &'static [u64] = &[1];
        const COFACTOR_INV: Self::ScalarField = Fr::ONE;
    }

    impl SWCurveConfig for StarkwareCurve {
        const COEFF_A: Self::BaseField = Fp::ONE;
        const COEFF_B: Self::BaseField =
            MontFp!("3141592653589793238462643383279502884197169399375105820974944592307816406665");

        const GENERATOR: Affine<Self> = Affine::new_unchecked(
            MontFp!("874739451078007766457464989774322083649278607533249481151382481072868806602"),
            MontFp!("152666792071518830868575557812948353041420400780739481342941381225525861407"),
        );
    }

    /// Builds an affine point from integer coordinates. Fails if either
    /// coordinate is not a field element or the point is not on the curve.
    pub fn point_from_u256(x: U256, y: U256) -> Result<Affine<StarkwareCurve>> {
        let invalid = || Error::InvalidPoint { x, y };
        let px = felt_from_u256(x).map_err(|_| invalid())?;
        let py = felt_from_u256(y).map_err(|_| invalid())?;
        let p = Affine::new_unchecked(px, py);
        if p.is_on_curve() {
            Ok(p)
        } else {
            Err(invalid())
        }
    }

    /// calculates the slope between points `p1` and `p2`
    /// Returns None if one of the points is the point at infinity or if the
    /// points are inverses of each other
    pub fn calculate_slope(p1: Affine<StarkwareCurve>, p2: Affine<StarkwareCurve>) -> Option<Fp> {
        if p1.infinity || p2.infinity || (p1.x == p2.x && p1.y != p2.y) {
            return None;
        }

        let y1 = p1.y;
        let y2 = p2.y;
        let x1 = p1.x;
        let x2 = p2.x;

        if x1 == x2 {
            // use tangent line
            let xx = x1.square();
            Some((xx + xx + xx + StarkwareCurve::COEFF_A) / (y1 + y1))
        } else {
            // use slope
            Some((y2 - y1) / (x2 - x1))
        }
    }
}

/// Checks `value < 2^bits`
pub fn check_bit_len(value: U256, bits: usize) -> Result<()> {
    if value.bit_len() > bits {
        Err(Error::ValueTooLarge { value, bits })
    } else {
        Ok(())
    }
}
