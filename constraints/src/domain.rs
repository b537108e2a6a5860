use crate::errors::Error;
use crate::errors::Result;
use ark_ff::Field;

/// A set of trace rows on which a constraint holds.
///
/// ```text
/// ┌──────────────────────┬──────────────────────────┬─────────────────────┐
/// │ Rows                 │ rows (trace length n)    │ vanishing factor    │
/// ├──────────────────────┼──────────────────────────┼─────────────────────┤
/// │ Every { s, o }       │ o, o + s, o + 2s, ...    │ x^(n/s) - g^(o*n/s) │
/// │ First(k)             │ k                        │ x - g^k             │
/// │ FromEnd(k)           │ n - k                    │ x - g^(n-k)         │
/// └──────────────────────┴──────────────────────────┴─────────────────────┘
/// ```
///
/// `g` is the generator of the trace domain of size `n`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rows {
    Every { step: usize, offset: usize },
    First(usize),
    FromEnd(usize),
}

impl Rows {
    pub const ALL: Self = Self::Every { step: 1, offset: 0 };

    pub const fn every(step: usize) -> Self {
        Self::Every { step, offset: 0 }
    }

    pub const fn every_at(step: usize, offset: usize) -> Self {
        Self::Every { step, offset }
    }

    pub const fn first() -> Self {
        Self::First(0)
    }

    pub const fn last() -> Self {
        Self::FromEnd(1)
    }

    /// Checks the row set is well formed for a trace of length `trace_len`
    pub fn validate(&self, trace_len: usize) -> Result<()> {
        if !trace_len.is_power_of_two() {
            return Err(Error::InvalidTraceLength(trace_len));
        }
        let valid = match *self {
            Self::Every { step, offset } => {
                step.is_power_of_two() && step <= trace_len && offset < step
            }
            Self::First(k) => k < trace_len,
            Self::FromEnd(k) => k >= 1 && k <= trace_len,
        };
        if valid {
            Ok(())
        } else {
            Err(Error::InvalidDomain {
                domain: *self,
                trace_len,
            })
        }
    }

    /// Normalizes to `(step, offset)`. Single rows have step `trace_len`.
    fn as_every(&self, trace_len: usize) -> (usize, usize) {
        match *self {
            Self::Every { step, offset } => (step, offset),
            Self::First(k) => (trace_len, k),
            Self::FromEnd(k) => (trace_len, trace_len.saturating_sub(k)),
        }
    }

    pub fn contains(&self, row: usize, trace_len: usize) -> bool {
        let (step, offset) = self.as_every(trace_len);
        row < trace_len && row % step == offset
    }

    /// Number of rows in the set
    pub fn len(&self, trace_len: usize) -> usize {
        let (step, _) = self.as_every(trace_len);
        trace_len / step
    }

    /// Returns true if every row of `self` is also a row of `other`
    pub fn is_subset_of(&self, other: &Self, trace_len: usize) -> bool {
        let (s1, o1) = self.as_every(trace_len);
        let (s2, o2) = other.as_every(trace_len);
        s1 % s2 == 0 && o1 % s2 == o2
    }

    /// Rows in ascending order
    pub fn rows(&self, trace_len: usize) -> impl Iterator<Item = usize> {
        let (step, offset) = self.as_every(trace_len);
        (offset..trace_len).step_by(step)
    }

    pub fn vanishing_factor(&self, trace_len: usize) -> Result<VanishingFactor> {
        self.validate(trace_len)?;
        let (step, offset) = self.as_every(trace_len);
        let exponent = trace_len / step;
        Ok(VanishingFactor {
            exponent,
            shift: (offset * exponent) % trace_len,
        })
    }
}

/// The polynomial `x^exponent - g^shift` where `g` generates the trace domain
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VanishingFactor {
    pub exponent: usize,
    pub shift: usize,
}

impl VanishingFactor {
    /// `g^shift` for the trace domain generator `g`
    pub fn shift_value<F: Field>(&self, trace_generator: F) -> F {
        trace_generator.pow([self.shift as u64])
    }

    pub fn evaluate<F: Field>(&self, x: F, trace_generator: F) -> F {
        x.pow([self.exponent as u64]) - self.shift_value(trace_generator)
    }

    /// Returns true if the factor is zero at `g^row`
    pub fn vanishes_at_row(&self, row: usize, trace_len: usize) -> bool {
        (row * self.exponent) % trace_len == self.shift
    }

    /// The rows `g^row` that are roots of the factor
    pub fn rows(&self, trace_len: usize) -> impl Iterator<Item = usize> {
        let period = trace_len / self.exponent;
        let start = self.shift / self.exponent;
        (0..self.exponent).map(move |k| start + k * period)
    }
}

#[cfg(test)]
mod tests {
    use super::Rows;
    use ark_ff::FftField;
    use ark_ff::Field;
    use ark_ff::One;
    use ark_ff::Zero;
    use binary::Fp;

    #[test]
    fn factor_vanishes_exactly_on_rows() {
        let n = 64;
        let g = Fp::get_root_of_unity(n as u64).unwrap();
        let sets = [
            Rows::ALL,
            Rows::every(16),
            Rows::every_at(16, 4),
            Rows::every_at(8, 7),
            Rows::first(),
            Rows::First(3),
            Rows::last(),
            Rows::FromEnd(16),
        ];

        for rows in sets {
            let factor = rows.vanishing_factor(n).unwrap();
            let expected = rows.rows(n).collect::<Vec<usize>>();
            assert_eq!(expected, factor.rows(n).collect::<Vec<usize>>());
            assert_eq!(expected.len(), rows.len(n));
            for row in 0..n {
                let value = factor.evaluate(g.pow([row as u64]), g);
                assert_eq!(rows.contains(row, n), value.is_zero(), "{rows:?} row {row}");
                assert_eq!(rows.contains(row, n), factor.vanishes_at_row(row, n));
            }
        }
    }

    #[test]
    fn single_row_factors_are_linear() {
        let n = 32;
        let g = Fp::get_root_of_unity(n as u64).unwrap();
        let factor = Rows::FromEnd(16).vanishing_factor(n).unwrap();

        assert_eq!(1, factor.exponent);
        assert_eq!(16, factor.shift);
        assert_eq!(Fp::one() - g.pow([16]), factor.evaluate(Fp::one(), g));
    }

    #[test]
    fn subset_relation() {
        let n = 64;

        assert!(Rows::every(16).is_subset_of(&Rows::ALL, n));
        assert!(Rows::every_at(16, 6).is_subset_of(&Rows::every(2), n));
        assert!(!Rows::every_at(16, 7).is_subset_of(&Rows::every(2), n));
        assert!(Rows::FromEnd(16).is_subset_of(&Rows::every(16), n));
        assert!(!Rows::FromEnd(2).is_subset_of(&Rows::every(16), n));
        assert!(Rows::every_at(16, 15).is_subset_of(&Rows::ALL, n));
        assert!(!Rows::ALL.is_subset_of(&Rows::every(2), n));
    }

    #[test]
    fn rejects_invalid_row_sets() {
        assert!(Rows::every(3).validate(16).is_err());
        assert!(Rows::every_at(4, 4).validate(16).is_err());
        assert!(Rows::every(32).validate(16).is_err());
        assert!(Rows::FromEnd(0).validate(16).is_err());
        assert!(Rows::First(16).validate(16).is_err());
        assert!(Rows::ALL.validate(12).is_err());
        assert!(Rows::every_at(16, 15).validate(16).is_ok());
    }
}
