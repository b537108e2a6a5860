use crate::domain::Rows;
use crate::expression::Expr;
use core::ops::Add;
use core::ops::Mul;
use core::ops::Neg;
use core::ops::Sub;
use std::collections::BTreeSet;

/// The leaves of a constraint expression
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlgebraicItem<T> {
    Constant(T),
    /// Trace cell `(column, row offset)` relative to the current row
    Trace(usize, isize),
    /// Value of the periodic column with the given index
    Periodic(usize),
    /// Interaction element supplied after the first commitment
    Challenge(usize),
    /// Public scalar derived from the public input
    Hint(usize),
}

impl<T, R: Into<Expr<AlgebraicItem<T>>>> Add<R> for AlgebraicItem<T> {
    type Output = Expr<AlgebraicItem<T>>;

    fn add(self, rhs: R) -> Self::Output {
        Expr::from(self) + rhs
    }
}

impl<T, R: Into<Expr<AlgebraicItem<T>>>> Sub<R> for AlgebraicItem<T> {
    type Output = Expr<AlgebraicItem<T>>;

    fn sub(self, rhs: R) -> Self::Output {
        Expr::from(self) - rhs
    }
}

impl<T, R: Into<Expr<AlgebraicItem<T>>>> Mul<R> for AlgebraicItem<T> {
    type Output = Expr<AlgebraicItem<T>>;

    fn mul(self, rhs: R) -> Self::Output {
        Expr::from(self) * rhs
    }
}

impl<T> Neg for AlgebraicItem<T> {
    type Output = Expr<AlgebraicItem<T>>;

    fn neg(self) -> Self::Output {
        -Expr::from(self)
    }
}

pub trait ExecutionTraceColumn {
    fn index(&self) -> usize;

    fn offset<T>(&self, offset: isize) -> Expr<AlgebraicItem<T>>;

    fn curr<T>(&self) -> Expr<AlgebraicItem<T>> {
        self.offset(0)
    }

    fn next<T>(&self) -> Expr<AlgebraicItem<T>> {
        self.offset(1)
    }
}

pub trait Hint {
    fn index(&self) -> usize;

    fn hint<T>(&self) -> Expr<AlgebraicItem<T>> {
        AlgebraicItem::Hint(self.index()).into()
    }
}

pub trait VerifierChallenge {
    fn index(&self) -> usize;

    fn challenge<T>(&self) -> Expr<AlgebraicItem<T>> {
        AlgebraicItem::Challenge(self.index()).into()
    }
}

/// The cells of `column` at rows `offset`, `offset + step`, `offset + 2*step`,
/// ... i.e. a column of height `trace_len / step` interleaved with others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VirtualColumn {
    pub column: usize,
    pub step: usize,
    pub offset: usize,
}

impl VirtualColumn {
    pub const fn new(column: usize, step: usize, offset: usize) -> Self {
        Self {
            column,
            step,
            offset,
        }
    }

    /// Trace row of the `i`th cell
    pub const fn row(&self, i: usize) -> usize {
        self.offset + self.step * i
    }

    /// Number of cells for a trace of length `trace_len`
    pub const fn len(&self, trace_len: usize) -> usize {
        trace_len / self.step
    }

    /// The same cells shifted by `rows` trace rows
    pub const fn shifted(&self, rows: usize) -> Self {
        Self::new(self.column, self.step, self.offset + rows)
    }

    /// The rows covered by this virtual column as a row set
    pub const fn rows(&self) -> Rows {
        Rows::Every {
            step: self.step,
            offset: self.offset,
        }
    }
}

impl ExecutionTraceColumn for VirtualColumn {
    fn index(&self) -> usize {
        self.column
    }

    fn offset<T>(&self, offset: isize) -> Expr<AlgebraicItem<T>> {
        let trace_offset = self.step as isize * offset + self.offset as isize;
        AlgebraicItem::Trace(self.column, trace_offset).into()
    }
}

/// A named polynomial identity that must vanish on the rows of `domain`
/// except the rows of each `exclusions` entry.
///
/// The composition polynomial divides the expression by the vanishing
/// polynomial of `domain` and multiplies it by the vanishing polynomials of
/// the exclusions.
#[derive(Clone, Debug)]
pub struct Constraint<T> {
    pub name: String,
    pub expr: Expr<AlgebraicItem<T>>,
    pub domain: Rows,
    pub exclusions: Vec<Rows>,
}

impl<T> Constraint<T> {
    pub fn new(name: impl Into<String>, expr: Expr<AlgebraicItem<T>>, domain: Rows) -> Self {
        Self {
            name: name.into(),
            expr,
            domain,
            exclusions: Vec::new(),
        }
    }

    pub fn except(mut self, rows: Rows) -> Self {
        self.exclusions.push(rows);
        self
    }

    /// Every `(column, offset)` pair the constraint reads
    pub fn trace_cells(&self) -> BTreeSet<(usize, isize)> {
        let mut res = BTreeSet::new();
        self.expr.traverse(&mut |item| {
            if let AlgebraicItem::Trace(column, offset) = item {
                res.insert((*column, *offset));
            }
        });
        res
    }

    pub fn periodic_columns(&self) -> BTreeSet<usize> {
        let mut res = BTreeSet::new();
        self.expr.traverse(&mut |item| {
            if let AlgebraicItem::Periodic(i) = item {
                res.insert(*i);
            }
        });
        res
    }

    pub fn challenges(&self) -> BTreeSet<usize> {
        let mut res = BTreeSet::new();
        self.expr.traverse(&mut |item| {
            if let AlgebraicItem::Challenge(i) = item {
                res.insert(*i);
            }
        });
        res
    }

    pub fn hints(&self) -> BTreeSet<usize> {
        let mut res = BTreeSet::new();
        self.expr.traverse(&mut |item| {
            if let AlgebraicItem::Hint(i) = item {
                res.insert(*i);
            }
        });
        res
    }
}

/// Returns the mask (every trace cell read by any constraint) ordered by
/// column then row offset.
pub fn derive_mask<T>(constraints: &[Constraint<T>]) -> Vec<(usize, isize)> {
    let mut cells = BTreeSet::new();
    for constraint in constraints {
        cells.extend(constraint.trace_cells());
    }
    cells.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::derive_mask;
    use super::AlgebraicItem::*;
    use super::Constraint;
    use super::ExecutionTraceColumn;
    use super::VirtualColumn;
    use crate::domain::Rows;
    use crate::expression::Expr;
    use binary::Fp;

    #[test]
    fn virtual_column_offsets_are_strided() {
        let column = VirtualColumn::new(3, 16, 4);

        assert_eq!(Expr::<_>::from(Trace::<Fp>(3, 4)), column.curr());
        assert_eq!(Expr::<_>::from(Trace::<Fp>(3, 20)), column.next());
        assert_eq!(Expr::<_>::from(Trace::<Fp>(3, -12)), column.offset(-1));
        assert_eq!(36, column.row(2));
        assert_eq!(4, column.len(64));
    }

    #[test]
    fn mask_is_sorted_and_deduplicated() {
        let a = VirtualColumn::new(1, 2, 0);
        let b = VirtualColumn::new(0, 1, 0);
        let constraints = vec![
            Constraint::<Fp>::new("a", a.next() * a.curr() - b.curr(), Rows::ALL),
            Constraint::new("b", b.next() - b.curr() + Constant(Fp::from(1u8)), Rows::ALL),
        ];

        assert_eq!(vec![(0, 0), (0, 1), (1, 0), (1, 2)], derive_mask(&constraints));
    }
}
