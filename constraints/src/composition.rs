use crate::constraints::derive_mask;
use crate::constraints::AlgebraicItem;
use crate::constraints::Constraint;
use crate::domain::VanishingFactor;
use crate::errors::Error;
use crate::errors::Result;
use crate::expression::Expr;
use crate::fraction::FractionFieldElement;
use crate::periodic::PeriodicColumn;
use ark_ff::batch_inversion;
use ark_ff::FftField;
use ark_ff::Field;
use ark_ff::Zero;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::Instant;

/// Leaves of a compiled constraint. Challenges and hints are bound to
/// constants at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvalItem<F> {
    Constant(F),
    /// Index into the mask
    Neighbor(usize),
    /// Index into the periodic columns
    Periodic(usize),
}

/// Where the value of a vanishing factor comes from during evaluation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FactorSource {
    /// `point - shifts[i]`
    PointShift(usize),
    /// `precomputed_domains[i]`
    Precomputed(usize),
}

#[derive(Clone, Debug)]
struct NumeratorGroup {
    /// Indices into `factor_sources`
    factors: Vec<usize>,
    constraints: Vec<usize>,
}

#[derive(Clone, Debug)]
struct DenominatorGroup {
    factor: usize,
    numerators: Vec<NumeratorGroup>,
}

/// The random linear combination of all constraints each divided by its
/// vanishing factor.
///
/// Constraints are grouped by denominator and then by numerator so a point
/// evaluation costs one multiplication per distinct numerator and one
/// fraction addition per distinct denominator:
///
/// ```text
///                 ┌                                                       ┐
///  C(x) =   Σ     │    Σ      Π num(x)  ·     Σ       coeff_i · v_i(x)     │ / den(x)
///          den    └   nums                 i in group                      ┘
/// ```
#[derive(Clone, Debug)]
pub struct CompositionPolynomial<F: FftField> {
    trace_len: usize,
    trace_generator: F,
    degree_bound: usize,
    mask: Vec<(usize, isize)>,
    periodic_columns: Vec<PeriodicColumn<F>>,
    names: Vec<String>,
    exprs: Vec<Expr<EvalItem<F>>>,
    /// Distinct vanishing factors in order of first appearance
    factors: Vec<VanishingFactor>,
    factor_sources: Vec<FactorSource>,
    point_shifts: Vec<F>,
    /// Exponents and shifts of the factors evaluated through lookup tables
    domain_exponents: Vec<usize>,
    domain_shifts: Vec<F>,
    groups: Vec<DenominatorGroup>,
}

impl<F: FftField> CompositionPolynomial<F> {
    /// Builds the composition polynomial with the mask derived from the
    /// trace cells the constraints read.
    pub fn new(
        trace_len: usize,
        constraints: &[Constraint<F>],
        periodic_columns: Vec<PeriodicColumn<F>>,
        challenges: &[F],
        hints: &[Option<F>],
        degree_bound: usize,
    ) -> Result<Self> {
        let mask = derive_mask(constraints);
        Self::with_mask(
            trace_len,
            mask,
            constraints,
            periodic_columns,
            challenges,
            hints,
            degree_bound,
        )
    }

    /// Builds the composition polynomial against a published mask. Fails if
    /// a constraint reads a cell missing from the mask or if a mask entry is
    /// never read.
    pub fn with_mask(
        trace_len: usize,
        mask: Vec<(usize, isize)>,
        constraints: &[Constraint<F>],
        periodic_columns: Vec<PeriodicColumn<F>>,
        challenges: &[F],
        hints: &[Option<F>],
        degree_bound: usize,
    ) -> Result<Self> {
        if !trace_len.is_power_of_two() {
            return Err(Error::InvalidTraceLength(trace_len));
        }
        let trace_generator =
            F::get_root_of_unity(trace_len as u64).ok_or(Error::InvalidTraceLength(trace_len))?;

        let mask_index = mask
            .iter()
            .enumerate()
            .map(|(i, &cell)| (cell, i))
            .collect::<BTreeMap<(usize, isize), usize>>();
        let mut used_mask_entries = BTreeSet::new();

        let mut factors = Vec::new();
        let mut factor_lookup = BTreeMap::new();
        let mut factor_index = |factor: VanishingFactor| -> usize {
            *factor_lookup.entry(factor).or_insert_with(|| {
                factors.push(factor);
                factors.len() - 1
            })
        };

        let mut names = Vec::new();
        let mut exprs = Vec::new();
        let mut groups: Vec<DenominatorGroup> = Vec::new();

        for (i, constraint) in constraints.iter().enumerate() {
            let denominator = constraint.domain.vanishing_factor(trace_len)?;
            let mut numerators = Vec::new();
            for exclusion in &constraint.exclusions {
                if !exclusion.is_subset_of(&constraint.domain, trace_len) {
                    return Err(Error::DomainNotSubset {
                        domain: constraint.domain,
                        exclusion: *exclusion,
                    });
                }
                numerators.push(exclusion.vanishing_factor(trace_len)?);
            }

            let expr = constraint.expr.try_map_leaves(&mut |item| {
                Ok(match *item {
                    AlgebraicItem::Constant(v) => EvalItem::Constant(v),
                    AlgebraicItem::Trace(column, offset) => {
                        let idx = *mask_index
                            .get(&(column, offset))
                            .ok_or(Error::UnknownMaskEntry(column, offset))?;
                        used_mask_entries.insert(idx);
                        EvalItem::Neighbor(idx)
                    }
                    AlgebraicItem::Periodic(idx) => {
                        if idx >= periodic_columns.len() {
                            return Err(Error::MissingPeriodicColumn(idx));
                        }
                        EvalItem::Periodic(idx)
                    }
                    AlgebraicItem::Challenge(idx) => {
                        let challenge = challenges.get(idx).ok_or(Error::MissingChallenge(idx))?;
                        EvalItem::Constant(*challenge)
                    }
                    AlgebraicItem::Hint(idx) => {
                        let hint = hints.get(idx).copied().flatten();
                        EvalItem::Constant(hint.ok_or(Error::MissingHint(idx))?)
                    }
                })
            })?;

            // degree of the term after dividing by the vanishing factor
            let expr_degree = expr.degree(&mut |item| match item {
                EvalItem::Constant(_) => 0,
                EvalItem::Neighbor(_) => trace_len - 1,
                EvalItem::Periodic(idx) => periodic_columns[*idx].degree(),
            });
            let numerator_degree = numerators.iter().map(|f| f.exponent).sum::<usize>();
            let degree = (expr_degree + numerator_degree).saturating_sub(denominator.exponent);
            if degree >= degree_bound {
                return Err(Error::DegreeBoundExceeded {
                    name: constraint.name.clone(),
                    degree,
                    bound: degree_bound,
                });
            }

            let denominator_idx = factor_index(denominator);
            let mut numerator_idxs = numerators
                .into_iter()
                .map(&mut factor_index)
                .collect::<Vec<usize>>();
            numerator_idxs.sort_unstable();

            let group_idx = match groups.iter().position(|g| g.factor == denominator_idx) {
                Some(idx) => idx,
                None => {
                    groups.push(DenominatorGroup {
                        factor: denominator_idx,
                        numerators: Vec::new(),
                    });
                    groups.len() - 1
                }
            };
            let numerator_groups = &mut groups[group_idx].numerators;
            match numerator_groups.iter().position(|g| g.factors == numerator_idxs) {
                Some(idx) => numerator_groups[idx].constraints.push(i),
                None => numerator_groups.push(NumeratorGroup {
                    factors: numerator_idxs,
                    constraints: vec![i],
                }),
            }

            names.push(constraint.name.clone());
            exprs.push(expr);
        }

        if let Some(unused) = (0..mask.len()).find(|i| !used_mask_entries.contains(i)) {
            let (column, offset) = mask[unused];
            return Err(Error::UnusedMaskEntry(column, offset));
        }

        let mut factor_sources = Vec::new();
        let mut point_shifts = Vec::new();
        let mut domain_exponents = Vec::new();
        let mut domain_shifts = Vec::new();
        for factor in &factors {
            let shift = factor.shift_value(trace_generator);
            if factor.exponent == 1 {
                factor_sources.push(FactorSource::PointShift(point_shifts.len()));
                point_shifts.push(shift);
            } else {
                factor_sources.push(FactorSource::Precomputed(domain_exponents.len()));
                domain_exponents.push(factor.exponent);
                domain_shifts.push(shift);
            }
        }

        tracing::debug!(
            trace_len,
            num_constraints = exprs.len(),
            mask_len = mask.len(),
            num_factors = factors.len(),
            num_denominators = groups.len(),
            "built composition polynomial"
        );

        Ok(Self {
            trace_len,
            trace_generator,
            degree_bound,
            mask,
            periodic_columns,
            names,
            exprs,
            factors,
            factor_sources,
            point_shifts,
            domain_exponents,
            domain_shifts,
            groups,
        })
    }

    pub fn trace_len(&self) -> usize {
        self.trace_len
    }

    pub fn trace_generator(&self) -> F {
        self.trace_generator
    }

    pub fn degree_bound(&self) -> usize {
        self.degree_bound
    }

    pub fn mask(&self) -> &[(usize, isize)] {
        &self.mask
    }

    pub fn num_constraints(&self) -> usize {
        self.exprs.len()
    }

    /// One random coefficient is bound to each constraint in declaration order
    pub fn num_random_coefficients(&self) -> usize {
        self.exprs.len()
    }

    pub fn constraint_names(&self) -> &[String] {
        &self.names
    }

    pub fn periodic_columns(&self) -> &[PeriodicColumn<F>] {
        &self.periodic_columns
    }

    /// Distinct vanishing factors used as numerators or denominators
    pub fn factors(&self) -> &[VanishingFactor] {
        &self.factors
    }

    /// `g^k` of each linear factor `x - g^k`
    pub fn point_shifts(&self) -> &[F] {
        &self.point_shifts
    }

    /// Exponents of the factors `x^e - s` evaluated via lookup tables
    pub fn domain_exponents(&self) -> &[usize] {
        &self.domain_exponents
    }

    /// Shifts `s` matching [Self::domain_exponents]
    pub fn domain_shifts(&self) -> &[F] {
        &self.domain_shifts
    }

    /// Evaluates the composition polynomial at `point` given the values of
    /// the mask entries (`neighbors`), of the periodic columns, the linear
    /// factor shifts and the values of the precomputed factors at `point`.
    pub fn constraints_eval(
        &self,
        neighbors: &[F],
        periodic_values: &[F],
        random_coefficients: &[F],
        point: F,
        shifts: &[F],
        precomputed_domains: &[F],
    ) -> Result<FractionFieldElement<F>> {
        check_len(neighbors.len(), self.mask.len(), |expected, actual| {
            Error::NeighborCount { expected, actual }
        })?;
        check_len(
            periodic_values.len(),
            self.periodic_columns.len(),
            |expected, actual| Error::PeriodicValueCount { expected, actual },
        )?;
        check_len(
            random_coefficients.len(),
            self.exprs.len(),
            |expected, actual| Error::CoefficientCount { expected, actual },
        )?;
        check_len(shifts.len(), self.point_shifts.len(), |expected, actual| {
            Error::ShiftCount { expected, actual }
        })?;
        check_len(
            precomputed_domains.len(),
            self.domain_exponents.len(),
            |expected, actual| Error::PrecomputedCount { expected, actual },
        )?;

        let factor_value = |idx: usize| match self.factor_sources[idx] {
            FactorSource::PointShift(i) => point - shifts[i],
            FactorSource::Precomputed(i) => precomputed_domains[i],
        };

        let mut res = FractionFieldElement::zero();
        for group in &self.groups {
            let denominator = factor_value(group.factor);
            if denominator.is_zero() {
                return Err(Error::PointOnDomain);
            }

            let mut outer_sum = F::zero();
            for numerator in &group.numerators {
                let mut inner_sum = F::zero();
                for &i in &numerator.constraints {
                    let value = self.exprs[i].eval(&mut |item| match *item {
                        EvalItem::Constant(v) => v,
                        EvalItem::Neighbor(j) => neighbors[j],
                        EvalItem::Periodic(j) => periodic_values[j],
                    });
                    inner_sum += random_coefficients[i] * value;
                }
                let numerator_value = numerator
                    .factors
                    .iter()
                    .fold(F::one(), |acc, &f| acc * factor_value(f));
                outer_sum += inner_sum * numerator_value;
            }

            res += FractionFieldElement::new(outer_sum, denominator);
        }

        Ok(res)
    }

    /// Evaluates the composition polynomial at an arbitrary point
    pub fn eval_at_point(
        &self,
        point: F,
        neighbors: &[F],
        random_coefficients: &[F],
    ) -> Result<FractionFieldElement<F>> {
        let periodic_values = self
            .periodic_columns
            .iter()
            .map(|column| column.eval_at_point(point))
            .collect::<Vec<F>>();
        let precomputed_domains = self
            .domain_exponents
            .iter()
            .zip(&self.domain_shifts)
            .map(|(&exponent, &shift)| point.pow([exponent as u64]) - shift)
            .collect::<Vec<F>>();
        self.constraints_eval(
            neighbors,
            &periodic_values,
            random_coefficients,
            point,
            &self.point_shifts,
            &precomputed_domains,
        )
    }

    /// Evaluates the composition polynomial on the coset `offset·<g>` of the
    /// trace domain. `columns[c][i]` must hold the evaluation of trace column
    /// `c` at `offset·g^i`. Returns the evaluation at `offset·g^i` for every
    /// `i` in `0..trace_len`.
    pub fn eval_on_coset(
        &self,
        offset: F,
        columns: &[Vec<F>],
        random_coefficients: &[F],
    ) -> Result<Vec<F>> {
        let n = self.trace_len;
        let num_columns = self.mask.iter().map(|&(c, _)| c + 1).max().unwrap_or(0);
        if columns.len() < num_columns || columns.iter().any(|column| column.len() != n) {
            return Err(Error::ColumnShape {
                expected: num_columns,
                trace_len: n,
            });
        }
        check_len(
            random_coefficients.len(),
            self.exprs.len(),
            |expected, actual| Error::CoefficientCount { expected, actual },
        )?;

        let now = Instant::now();
        // tables shared read-only by every point of the coset
        let periodic_tables = self
            .periodic_columns
            .iter()
            .map(|column| column.coset_values(offset))
            .collect::<Vec<Vec<F>>>();
        let domain_tables = precompute_domain_evals(
            offset,
            self.trace_generator,
            n,
            &self.domain_exponents,
            &self.domain_shifts,
        )?;
        let mut points = Vec::with_capacity(n);
        let mut x = offset;
        for _ in 0..n {
            points.push(x);
            x *= self.trace_generator;
        }

        let fractions = ark_std::cfg_into_iter!(0..n)
            .map(|i| {
                let neighbors = self
                    .mask
                    .iter()
                    .map(|&(column, offset)| {
                        let row = (i as isize + offset).rem_euclid(n as isize) as usize;
                        columns[column][row]
                    })
                    .collect::<Vec<F>>();
                let periodic_values = periodic_tables
                    .iter()
                    .map(|table| table[i % table.len()])
                    .collect::<Vec<F>>();
                let precomputed_domains = domain_tables
                    .iter()
                    .map(|table| table[i % table.len()])
                    .collect::<Vec<F>>();
                self.constraints_eval(
                    &neighbors,
                    &periodic_values,
                    random_coefficients,
                    points[i],
                    &self.point_shifts,
                    &precomputed_domains,
                )
            })
            .collect::<Result<Vec<FractionFieldElement<F>>>>()?;

        let mut denominators = fractions.iter().map(|f| f.denominator).collect::<Vec<F>>();
        batch_inversion(&mut denominators);
        let res = fractions
            .iter()
            .zip(denominators)
            .map(|(f, inv)| f.numerator * inv)
            .collect::<Vec<F>>();

        tracing::debug!(
            coset_size = n,
            elapsed = ?now.elapsed(),
            "evaluated composition polynomial on coset"
        );
        Ok(res)
    }
}

/// Tabulates the factors `x^e - shift` over the points `point·generator^i`.
///
/// The table of exponent `e` has `trace_len / e` entries because
/// `generator` has order `trace_len` so `(point·generator^i)^e` repeats after
/// that many steps. Callers index the tables cyclically.
pub fn precompute_domain_evals<F: Field>(
    point: F,
    generator: F,
    trace_len: usize,
    exponents: &[usize],
    shifts: &[F],
) -> Result<Vec<Vec<F>>> {
    check_len(shifts.len(), exponents.len(), |expected, actual| {
        Error::ShiftCount { expected, actual }
    })?;
    exponents
        .iter()
        .zip(shifts)
        .map(|(&exponent, &shift)| {
            if exponent == 0 || trace_len % exponent != 0 {
                return Err(Error::InvalidTraceLength(trace_len));
            }
            let len = trace_len / exponent;
            let step = generator.pow([exponent as u64]);
            let mut acc = point.pow([exponent as u64]);
            let mut table = Vec::with_capacity(len);
            for _ in 0..len {
                table.push(acc - shift);
                acc *= step;
            }
            Ok(table)
        })
        .collect()
}

fn check_len(actual: usize, expected: usize, err: impl Fn(usize, usize) -> Error) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(err(expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::precompute_domain_evals;
    use super::CompositionPolynomial;
    use crate::constraints::AlgebraicItem::*;
    use crate::constraints::Constraint;
    use crate::constraints::ExecutionTraceColumn;
    use crate::constraints::VirtualColumn;
    use crate::domain::Rows;
    use crate::errors::Error;
    use crate::expression::Expr;
    use crate::periodic::PeriodicColumn;
    use ark_ff::FftField;
    use ark_ff::Field;
    use ark_ff::One;
    use ark_ff::UniformRand;
    use ark_ff::Zero;
    use ark_poly::EvaluationDomain;
    use ark_poly::Radix2EvaluationDomain;
    use binary::Fp;
    use rand::Rng;

    const N: usize = 16;

    /// Fibonacci-like toy machine: column 0 holds a_i, column 1 holds a
    /// running sum reset every 4 rows by the periodic column.
    fn toy_constraints() -> Vec<Constraint<Fp>> {
        let a = VirtualColumn::new(0, 1, 0);
        let acc = VirtualColumn::new(1, 1, 0);
        let one = Expr::from(Constant(Fp::one()));
        vec![
            Constraint::new("a/first", a.curr() - Hint(0), Rows::first()),
            Constraint::new("a/step", a.next() - a.curr() - &one, Rows::ALL)
                .except(Rows::last()),
            // acc[i+1] = acc[i] * p(i) + a[i+1] where p is 0 every 4th row
            Constraint::new(
                "acc/step",
                acc.next() - acc.curr() * Periodic(0) - a.next() * Challenge(0),
                Rows::ALL,
            )
            .except(Rows::last()),
            Constraint::new("a/last", a.curr() - Hint(1), Rows::last()),
        ]
    }

    fn toy_periodic() -> Vec<PeriodicColumn<Fp>> {
        let values = vec![Fp::one(), Fp::one(), Fp::one(), Fp::zero()];
        vec![PeriodicColumn::new(values, N, 1).unwrap()]
    }

    fn toy_trace(start: u64, challenge: Fp) -> Vec<Vec<Fp>> {
        let a = (0..N as u64).map(|i| Fp::from(start + i)).collect::<Vec<Fp>>();
        let mut acc = vec![a[0] * challenge];
        for i in 1..N {
            let keep = if (i - 1) % 4 == 3 { Fp::zero() } else { Fp::one() };
            acc.push(acc[i - 1] * keep + a[i] * challenge);
        }
        vec![a, acc]
    }

    fn toy_composition(start: u64, challenge: Fp) -> CompositionPolynomial<Fp> {
        let hints = [Some(Fp::from(start)), Some(Fp::from(start + N as u64 - 1))];
        CompositionPolynomial::new(
            N,
            &toy_constraints(),
            toy_periodic(),
            &[challenge],
            &hints,
            2 * N,
        )
        .unwrap()
    }

    fn interpolate_column(values: &[Fp]) -> Vec<Fp> {
        let domain = Radix2EvaluationDomain::<Fp>::new(values.len()).unwrap();
        domain.ifft(values)
    }

    fn eval_poly(coeffs: &[Fp], x: Fp) -> Fp {
        coeffs.iter().rev().fold(Fp::zero(), |acc, c| acc * x + c)
    }

    #[test]
    fn groups_share_factors() {
        let composition = toy_composition(3, Fp::from(5u8));

        // x - g^(n-1), x - 1, x^n - 1
        assert_eq!(3, composition.factors().len());
        assert_eq!(2, composition.point_shifts().len());
        assert_eq!(&[N], composition.domain_exponents());
        assert_eq!(4, composition.num_random_coefficients());
        assert_eq!(&[(0, 0), (0, 1), (1, 0), (1, 1)], composition.mask());
    }

    #[test]
    fn valid_trace_gives_low_degree_composition() {
        let mut rng = ark_std::test_rng();
        let challenge = Fp::rand(&mut rng);
        let composition = toy_composition(7, challenge);
        let trace = toy_trace(7, challenge);
        let coeffs = (0..4).map(|_| Fp::rand(&mut rng)).collect::<Vec<Fp>>();
        let polys = trace.iter().map(|c| interpolate_column(c)).collect::<Vec<_>>();

        // evaluate on 4 cosets to get a blowup 4 evaluation domain
        let blowup = 4;
        let lde_domain = Radix2EvaluationDomain::<Fp>::new(N * blowup).unwrap();
        let h = lde_domain.group_gen;
        let mut lde_evals = vec![Fp::zero(); N * blowup];
        for j in 0..blowup {
            let offset = Fp::GENERATOR * h.pow([j as u64]);
            let g = composition.trace_generator();
            let columns = polys
                .iter()
                .map(|p| {
                    (0..N)
                        .map(|i| eval_poly(p, offset * g.pow([i as u64])))
                        .collect::<Vec<Fp>>()
                })
                .collect::<Vec<Vec<Fp>>>();
            let evals = composition.eval_on_coset(offset, &columns, &coeffs).unwrap();
            for (i, v) in evals.into_iter().enumerate() {
                lde_evals[j + blowup * i] = v;
            }
        }

        // lde_evals[m] is the composition at GENERATOR·h^m
        let mut coeffs = lde_domain.ifft(&lde_evals);
        let offset_inv = Fp::GENERATOR.inverse().unwrap();
        let mut power = Fp::one();
        for c in &mut coeffs {
            *c *= power;
            power *= offset_inv;
        }
        assert!(coeffs[composition.degree_bound()..].iter().all(|c| c.is_zero()));
        assert!(!coeffs.iter().all(|c| c.is_zero()));
    }

    #[test]
    fn coset_evaluation_matches_point_evaluation() {
        let mut rng = ark_std::test_rng();
        let challenge = Fp::rand(&mut rng);
        let composition = toy_composition(7, challenge);
        let mut trace = toy_trace(7, challenge);
        trace[1][5] += Fp::one();
        let polys = trace.iter().map(|c| interpolate_column(c)).collect::<Vec<_>>();
        let coeffs = (0..4).map(|_| Fp::rand(&mut rng)).collect::<Vec<Fp>>();

        let g = composition.trace_generator();
        let offset = Fp::GENERATOR;
        let columns = polys
            .iter()
            .map(|p| {
                (0..N)
                    .map(|i| eval_poly(p, offset * g.pow([i as u64])))
                    .collect::<Vec<Fp>>()
            })
            .collect::<Vec<Vec<Fp>>>();
        let on_coset = composition.eval_on_coset(offset, &columns, &coeffs).unwrap();

        // holds for invalid traces too
        for i in [0, 3, 11] {
            let x = offset * g.pow([i as u64]);
            let neighbors = composition
                .mask()
                .iter()
                .map(|&(c, k)| eval_poly(&polys[c], x * g.pow([k as u64])))
                .collect::<Vec<Fp>>();
            let at_point = composition
                .eval_at_point(x, &neighbors, &coeffs)
                .unwrap()
                .resolve()
                .unwrap();
            assert_eq!(at_point, on_coset[i]);
        }
    }

    #[test]
    fn coefficient_binds_to_constraint_in_declaration_order() {
        let challenge = Fp::from(3u8);
        let composition = toy_composition(1, challenge);
        let mut rng = rand::thread_rng();
        let x = Fp::from(rng.gen::<u64>()) + Fp::from(N as u64 + 1);
        let neighbors = (0..4).map(|i| Fp::from(100 + i as u64)).collect::<Vec<Fp>>();
        let g = composition.trace_generator();

        // only the coefficient of "a/step" is set
        let mut coeffs = vec![Fp::zero(); 4];
        coeffs[1] = Fp::one();
        let value = composition
            .eval_at_point(x, &neighbors, &coeffs)
            .unwrap()
            .resolve()
            .unwrap();
        // (a' - a - 1) * (x - g^(n-1)) / (x^n - 1)
        let expected = (neighbors[1] - neighbors[0] - Fp::one()) * (x - g.pow([N as u64 - 1]))
            / (x.pow([N as u64]) - Fp::one());
        assert_eq!(expected, value);
    }

    #[test]
    fn point_on_trace_domain_fails() {
        let composition = toy_composition(1, Fp::one());
        let g = composition.trace_generator();
        let neighbors = vec![Fp::one(); 4];
        let coeffs = vec![Fp::one(); 4];

        let res = composition.eval_at_point(g.pow([5]), &neighbors, &coeffs);
        assert_eq!(Some(Error::PointOnDomain), res.err());
    }

    #[test]
    fn input_lengths_are_checked() {
        let composition = toy_composition(1, Fp::one());
        let x = Fp::from(99u8);

        let res = composition.eval_at_point(x, &[Fp::one(); 3], &[Fp::one(); 4]);
        assert_eq!(
            Some(Error::NeighborCount {
                expected: 4,
                actual: 3
            }),
            res.err()
        );
        let res = composition.eval_at_point(x, &[Fp::one(); 4], &[Fp::one(); 5]);
        assert_eq!(
            Some(Error::CoefficientCount {
                expected: 4,
                actual: 5
            }),
            res.err()
        );
    }

    #[test]
    fn mask_mismatch_is_rejected() {
        let constraints = toy_constraints();
        let hints = [Some(Fp::one()), Some(Fp::one())];
        let build = |mask: Vec<(usize, isize)>| {
            CompositionPolynomial::with_mask(
                N,
                mask,
                &constraints,
                toy_periodic(),
                &[Fp::one()],
                &hints,
                2 * N,
            )
            .err()
        };

        assert_eq!(
            Some(Error::UnknownMaskEntry(1, 1)),
            build(vec![(0, 0), (0, 1), (1, 0)])
        );
        assert_eq!(
            Some(Error::UnusedMaskEntry(2, 0)),
            build(vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0)])
        );
        assert_eq!(None, build(vec![(0, 0), (0, 1), (1, 0), (1, 1)]));
    }

    #[test]
    fn missing_bindings_are_rejected() {
        let constraints = toy_constraints();
        let res = CompositionPolynomial::new(
            N,
            &constraints,
            toy_periodic(),
            &[Fp::one()],
            &[Some(Fp::one()), None],
            2 * N,
        );
        assert_eq!(Some(Error::MissingHint(1)), res.err());

        let res = CompositionPolynomial::new(
            N,
            &constraints,
            toy_periodic(),
            &[],
            &[Some(Fp::one()), Some(Fp::one())],
            2 * N,
        );
        assert_eq!(Some(Error::MissingChallenge(0)), res.err());
    }

    #[test]
    fn exclusions_must_be_subsets() {
        let a = VirtualColumn::new(0, 1, 0);
        let constraints = vec![
            Constraint::<Fp>::new("a", a.curr() * a.curr(), Rows::every(4))
                .except(Rows::every_at(4, 1)),
        ];
        let res = CompositionPolynomial::new(N, &constraints, vec![], &[], &[], 2 * N);
        assert!(matches!(res, Err(Error::DomainNotSubset { .. })));
    }

    #[test]
    fn degree_bound_is_enforced() {
        let a = VirtualColumn::new(0, 1, 0);
        // 4 * (n - 1) - n = 3n - 4
        let constraints = vec![Constraint::<Fp>::new("quartic", a.curr().pow(4), Rows::ALL)];
        let res = CompositionPolynomial::new(N, &constraints, vec![], &[], &[], 2 * N);
        assert!(matches!(res, Err(Error::DegreeBoundExceeded { .. })));
        assert!(CompositionPolynomial::new(N, &constraints, vec![], &[], &[], 3 * N).is_ok());
    }

    #[test]
    fn domain_tables_match_direct_evaluation() {
        let n = 32;
        let g = Fp::get_root_of_unity(n as u64).unwrap();
        let point = Fp::from(7u8);
        let exponents = [2, 8, 32];
        let shifts = [Fp::one(), g, g.pow([3])];
        let tables = precompute_domain_evals(point, g, n, &exponents, &shifts).unwrap();

        for (k, table) in tables.iter().enumerate() {
            assert_eq!(n / exponents[k], table.len());
            for i in 0..n {
                let x = point * g.pow([i as u64]);
                let expected = x.pow([exponents[k] as u64]) - shifts[k];
                assert_eq!(expected, table[i % table.len()]);
            }
        }
    }
}
