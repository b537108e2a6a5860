use crate::errors::Error;
use crate::errors::Result;
use ark_ff::Field;
use ark_ff::One;
use ark_ff::Zero;
use core::ops::Add;
use core::ops::AddAssign;
use core::ops::Mul;
use core::ops::Neg;
use core::ops::Sub;

/// A field element kept as `numerator / denominator` so that many divisions
/// can share a single inversion at the end.
#[derive(Clone, Copy, Debug)]
pub struct FractionFieldElement<F> {
    pub numerator: F,
    pub denominator: F,
}

impl<F: Field> FractionFieldElement<F> {
    pub fn new(numerator: F, denominator: F) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn zero() -> Self {
        Self::new(F::zero(), F::one())
    }

    pub fn one() -> Self {
        Self::new(F::one(), F::one())
    }

    pub fn inverse(&self) -> Result<Self> {
        if self.numerator.is_zero() {
            return Err(Error::ZeroDenominator);
        }
        Ok(Self::new(self.denominator, self.numerator))
    }

    /// Returns `numerator / denominator`
    pub fn resolve(&self) -> Result<F> {
        let inv = self.denominator.inverse().ok_or(Error::ZeroDenominator)?;
        Ok(self.numerator * inv)
    }
}

impl<F: Field> From<F> for FractionFieldElement<F> {
    fn from(value: F) -> Self {
        Self::new(value, F::one())
    }
}

impl<F: Field> Add for FractionFieldElement<F> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        if self.denominator == rhs.denominator {
            return Self::new(self.numerator + rhs.numerator, self.denominator);
        }
        Self::new(
            self.numerator * rhs.denominator + rhs.numerator * self.denominator,
            self.denominator * rhs.denominator,
        )
    }
}

impl<F: Field> AddAssign for FractionFieldElement<F> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<F: Field> Sub for FractionFieldElement<F> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl<F: Field> Mul for FractionFieldElement<F> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.numerator * rhs.numerator,
            self.denominator * rhs.denominator,
        )
    }
}

impl<F: Field> Neg for FractionFieldElement<F> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.numerator, self.denominator)
    }
}

impl<F: Field> PartialEq for FractionFieldElement<F> {
    fn eq(&self, other: &Self) -> bool {
        self.numerator * other.denominator == other.numerator * self.denominator
    }
}

impl<F: Field> Eq for FractionFieldElement<F> {}

impl<F: Field> Zero for FractionFieldElement<F> {
    fn zero() -> Self {
        Self::zero()
    }

    fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }
}

impl<F: Field> One for FractionFieldElement<F> {
    fn one() -> Self {
        Self::one()
    }
}

#[cfg(test)]
mod tests {
    use super::FractionFieldElement;
    use crate::errors::Error;
    use ark_ff::Field;
    use ark_ff::UniformRand;
    use binary::Fp;

    type Frac = FractionFieldElement<Fp>;

    #[test]
    fn arithmetic_matches_field_division() {
        let mut rng = ark_std::test_rng();
        let (a, b, c, d) = (
            Fp::rand(&mut rng),
            Fp::rand(&mut rng),
            Fp::rand(&mut rng),
            Fp::rand(&mut rng),
        );
        let x = Frac::new(a, b);
        let y = Frac::new(c, d);
        let (fx, fy) = (a / b, c / d);

        assert_eq!(fx + fy, (x + y).resolve().unwrap());
        assert_eq!(fx - fy, (x - y).resolve().unwrap());
        assert_eq!(fx * fy, (x * y).resolve().unwrap());
        assert_eq!(-fx, (-x).resolve().unwrap());
        assert_eq!(fx.inverse().unwrap(), x.inverse().unwrap().resolve().unwrap());
    }

    #[test]
    fn equality_ignores_representation() {
        let two = Fp::from(2u8);
        let three = Fp::from(3u8);

        assert_eq!(Frac::new(two, three), Frac::new(two * two, three * two));
        assert_ne!(Frac::new(two, three), Frac::new(three, two));
    }

    #[test]
    fn zero_denominator_is_an_error() {
        let frac = Frac::new(Fp::from(5u8), Fp::from(0u8));
        assert_eq!(Err(Error::ZeroDenominator), frac.resolve());
    }
}
