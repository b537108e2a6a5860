use crate::errors::Error;
use crate::errors::Result;
use ark_ff::FftField;
use ark_ff::Field;
use ark_poly::univariate::DensePolynomial;
use ark_poly::DenseUVPolynomial;
use ark_poly::EvaluationDomain;
use ark_poly::Evaluations;
use ark_poly::Polynomial;
use ark_poly::Radix2EvaluationDomain;

/// A column whose values repeat every `values.len() * column_step` rows.
///
/// Value `i` sits on row `i * column_step` (mod the period). Given the trace
/// generator `g` of order `n` and `c = n / (len * column_step)` the column is
/// the polynomial `P(x^c)` where `P` interpolates the values over the group of
/// order `len`:
///
/// ```text
/// ┌──────────────────────────┬────────────┬─────────────────┐
/// │ row                      │ x          │ P(x^c)          │
/// ├──────────────────────────┼────────────┼─────────────────┤
/// │ 0                        │ 1          │ values[0]       │
/// │ column_step              │ g^step     │ values[1]       │
/// │ ...                      │ ...        │ ...             │
/// │ len * column_step        │ g^(len*s)  │ values[0]       │
/// └──────────────────────────┴────────────┴─────────────────┘
/// ```
///
/// Rows that are not a multiple of `column_step` take whatever value the
/// polynomial has there.
#[derive(Clone, Debug)]
pub struct PeriodicColumn<F: FftField> {
    poly: DensePolynomial<F>,
    len: usize,
    column_step: usize,
    n_copies: usize,
}

impl<F: FftField> PeriodicColumn<F> {
    pub fn new(values: Vec<F>, trace_len: usize, column_step: usize) -> Result<Self> {
        let len = values.len();
        let invalid = || Error::InvalidPeriodicColumn {
            len,
            step: column_step,
            trace_len,
        };
        if !trace_len.is_power_of_two() {
            return Err(Error::InvalidTraceLength(trace_len));
        }
        if !len.is_power_of_two() || !column_step.is_power_of_two() {
            return Err(invalid());
        }
        let period = len.checked_mul(column_step).ok_or_else(invalid)?;
        if period > trace_len {
            return Err(invalid());
        }
        let domain = Radix2EvaluationDomain::new(len).ok_or_else(invalid)?;
        let poly = Evaluations::from_vec_and_domain(values, domain).interpolate();
        Ok(Self {
            poly,
            len,
            column_step,
            n_copies: trace_len / period,
        })
    }

    /// Number of trace rows after which the column repeats
    pub fn period(&self) -> usize {
        self.len * self.column_step
    }

    /// Degree of `P(x^c)` as a polynomial in `x`
    pub fn degree(&self) -> usize {
        self.poly.degree() * self.n_copies
    }

    pub fn eval_at_point(&self, x: F) -> F {
        self.poly.evaluate(&x.pow([self.n_copies as u64]))
    }

    /// Evaluations at `offset * g^i` for `i` in `0..period`. The column takes
    /// the same values at `offset * g^(i + period)` so callers index the
    /// result cyclically.
    pub fn coset_values(&self, offset: F) -> Vec<F> {
        let period = self.period();
        // x^c maps the coset of the trace domain onto a coset of the group of
        // order `period` with offset `offset^c`
        let shift = offset.pow([self.n_copies as u64]);
        let mut coeffs = self.poly.coeffs().to_vec();
        let mut power = F::one();
        for coeff in &mut coeffs {
            *coeff *= power;
            power *= shift;
        }
        coeffs.resize(period, F::zero());
        match Radix2EvaluationDomain::<F>::new(period) {
            Some(domain) => domain.fft(&coeffs),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::PeriodicColumn;
    use ark_ff::FftField;
    use ark_ff::Field;
    use ark_ff::UniformRand;
    use binary::Fp;

    #[test]
    fn values_repeat_on_strided_rows() {
        let n = 64;
        let g = Fp::get_root_of_unity(n as u64).unwrap();
        let values = (1..=4u64).map(Fp::from).collect::<Vec<Fp>>();
        let column = PeriodicColumn::new(values.clone(), n, 2).unwrap();

        assert_eq!(8, column.period());
        assert_eq!(3 * 8, column.degree());
        for i in 0..n / 2 {
            let x = g.pow([(2 * i) as u64]);
            assert_eq!(values[i % 4], column.eval_at_point(x), "row {}", 2 * i);
        }
    }

    #[test]
    fn coset_values_match_pointwise_evaluation() {
        let n = 32;
        let mut rng = ark_std::test_rng();
        let g = Fp::get_root_of_unity(n as u64).unwrap();
        let values = (0..8).map(|_| Fp::rand(&mut rng)).collect::<Vec<Fp>>();
        let column = PeriodicColumn::new(values, n, 2).unwrap();
        let offset = Fp::GENERATOR;

        let coset_values = column.coset_values(offset);
        assert_eq!(16, coset_values.len());
        for i in 0..n {
            let x = offset * g.pow([i as u64]);
            assert_eq!(column.eval_at_point(x), coset_values[i % 16]);
        }
    }

    #[test]
    fn rejects_columns_longer_than_the_trace() {
        let values = vec![Fp::from(1u8); 8];
        assert!(PeriodicColumn::new(values.clone(), 16, 4).is_err());
        assert!(PeriodicColumn::new(values[..3].to_vec(), 16, 1).is_err());
        assert!(PeriodicColumn::new(values, 16, 2).is_ok());
    }
}
