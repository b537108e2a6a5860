use crate::constraints::AlgebraicItem;
use crate::constraints::Constraint;
use crate::errors::Error;
use crate::errors::Result;
use crate::periodic::PeriodicColumn;
use ark_ff::FftField;
use ark_ff::One;
use ark_ff::Zero;

/// A constraint that does not vanish on a row it applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub constraint: usize,
    pub name: String,
    pub row: usize,
}

/// Evaluates every constraint on every trace row it applies to and reports
/// the rows where it is non-zero. Offsets that run off the end of the trace
/// wrap around.
pub fn check_constraints<F: FftField>(
    trace_len: usize,
    columns: &[Vec<F>],
    constraints: &[Constraint<F>],
    periodic_columns: &[PeriodicColumn<F>],
    challenges: &[F],
    hints: &[Option<F>],
) -> Result<Vec<Violation>> {
    if !trace_len.is_power_of_two() {
        return Err(Error::InvalidTraceLength(trace_len));
    }
    if columns.iter().any(|column| column.len() != trace_len) {
        return Err(Error::ColumnShape {
            expected: columns.len(),
            trace_len,
        });
    }

    // values on the trace domain itself
    let periodic_values = periodic_columns
        .iter()
        .map(|column| column.coset_values(F::one()))
        .collect::<Vec<Vec<F>>>();

    let mut violations = Vec::new();
    for (i, constraint) in constraints.iter().enumerate() {
        constraint.domain.validate(trace_len)?;
        for exclusion in &constraint.exclusions {
            exclusion.validate(trace_len)?;
        }

        // resolve everything that does not depend on the row first
        let expr = constraint.expr.try_map_leaves(&mut |item| {
            Ok(match *item {
                AlgebraicItem::Challenge(idx) => {
                    AlgebraicItem::Constant(*challenges.get(idx).ok_or(Error::MissingChallenge(idx))?)
                }
                AlgebraicItem::Hint(idx) => {
                    let hint = hints.get(idx).copied().flatten();
                    AlgebraicItem::Constant(hint.ok_or(Error::MissingHint(idx))?)
                }
                AlgebraicItem::Trace(column, offset) => {
                    if column >= columns.len() {
                        return Err(Error::UnknownMaskEntry(column, offset));
                    }
                    AlgebraicItem::Trace(column, offset)
                }
                AlgebraicItem::Periodic(idx) => {
                    if idx >= periodic_columns.len() {
                        return Err(Error::MissingPeriodicColumn(idx));
                    }
                    AlgebraicItem::Periodic(idx)
                }
                item => item,
            })
        })?;

        for row in constraint.domain.rows(trace_len) {
            if constraint
                .exclusions
                .iter()
                .any(|exclusion| exclusion.contains(row, trace_len))
            {
                continue;
            }

            let value = expr.eval(&mut |item| match *item {
                AlgebraicItem::Constant(v) => v,
                AlgebraicItem::Trace(column, offset) => {
                    let cell = (row as isize + offset).rem_euclid(trace_len as isize) as usize;
                    columns[column][cell]
                }
                AlgebraicItem::Periodic(idx) => {
                    let values = &periodic_values[idx];
                    values[row % values.len()]
                }
                // bound above
                AlgebraicItem::Challenge(_) | AlgebraicItem::Hint(_) => F::one(),
            });

            if !value.is_zero() {
                violations.push(Violation {
                    constraint: i,
                    name: constraint.name.clone(),
                    row,
                });
            }
        }
    }

    if !violations.is_empty() {
        tracing::debug!(num_violations = violations.len(), "trace fails constraints");
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::check_constraints;
    use crate::constraints::AlgebraicItem::*;
    use crate::constraints::Constraint;
    use crate::constraints::ExecutionTraceColumn;
    use crate::constraints::VirtualColumn;
    use crate::domain::Rows;
    use crate::periodic::PeriodicColumn;
    use ark_ff::One;
    use ark_ff::Zero;
    use binary::Fp;
    use proptest::prelude::*;

    fn bit_constraint() -> Constraint<Fp> {
        let bit = VirtualColumn::new(0, 1, 0);
        Constraint::new("bit", bit.curr() * bit.curr() - bit.curr(), Rows::ALL)
    }

    proptest! {
        #[test]
        fn booleanity_accepts_only_bits(v in 0u64..8) {
            let mut column = vec![Fp::zero(); 8];
            column[3] = Fp::from(v);
            let violations = check_constraints(8, &[column], &[bit_constraint()], &[], &[], &[]).unwrap();
            prop_assert_eq!(v > 1, !violations.is_empty());
            if v > 1 {
                prop_assert_eq!(3, violations[0].row);
            }
        }
    }

    #[test]
    fn exclusions_are_skipped() {
        let a = VirtualColumn::new(0, 1, 0);
        let constraint = Constraint::new("inc", a.next() - a.curr() - Constant(Fp::one()), Rows::ALL)
            .except(Rows::last());
        let column = (0..8u64).map(Fp::from).collect::<Vec<Fp>>();

        let violations =
            check_constraints(8, &[column.clone()], &[constraint.clone()], &[], &[], &[]).unwrap();
        assert!(violations.is_empty());

        // without the exclusion the wrap around from row 7 to row 0 fails
        let constraint = Constraint::new("inc", constraint.expr, Rows::ALL);
        let violations = check_constraints(8, &[column], &[constraint], &[], &[], &[]).unwrap();
        assert_eq!(1, violations.len());
        assert_eq!(7, violations[0].row);
    }

    #[test]
    fn periodic_values_follow_rows() {
        let a = VirtualColumn::new(0, 1, 0);
        let constraint = Constraint::new("periodic", a.curr() - Periodic(0), Rows::every(2));
        let values = vec![Fp::from(5u8), Fp::from(9u8)];
        let periodic = PeriodicColumn::new(values, 16, 2).unwrap();
        let column = (0..16)
            .map(|i| match i % 4 {
                0 => Fp::from(5u8),
                2 => Fp::from(9u8),
                _ => Fp::from(1u8),
            })
            .collect::<Vec<Fp>>();

        let violations = check_constraints(16, &[column], &[constraint], &[periodic], &[], &[]).unwrap();
        assert!(violations.is_empty());
    }
}
