use ark_ff::fields::Fp256;
use ark_ff::fields::MontBackend;
use ark_ff::fields::MontConfig;

/// Field used by Cairo: `p = 2^251 + 17 * 2^192 + 1`
#[derive(MontConfig)]
#[modulus = "3618502788666131213697322783095070105623107215331596699973092056135872020481"]
#[generator = "3"]
pub struct StarkFpConfig;

pub type Fp = Fp256<MontBackend<StarkFpConfig, 4>>;

#[cfg(test)]
mod tests {
    use super::Fp;
    use super::StarkFpConfig;
    use ark_ff::FftField;
    use ark_ff::Field;
    use ark_ff::MontConfig;
    use ark_ff::One;
    use ark_ff::PrimeField;
    use num_bigint::BigUint;

    #[test]
    fn modulus_has_cairo_form() {
        let expected = (BigUint::from(1u8) << 251) + (BigUint::from(17u8) << 192) + 1u8;
        assert_eq!(expected, Fp::MODULUS.into());
    }

    #[test]
    fn has_large_two_adic_subgroup() {
        assert_eq!(192, Fp::TWO_ADICITY);
        let g = Fp::get_root_of_unity(1 << 20).unwrap();
        assert_eq!(Fp::one(), g.pow([1u64 << 20]));
        assert_ne!(Fp::one(), g.pow([1u64 << 19]));
    }

    #[test]
    fn config_modulus_matches_field() {
        assert_eq!(Fp::MODULUS, <StarkFpConfig as MontConfig<4>>::MODULUS);
    }
}
