use ark_ff::Field;
use core::ops::Add;
use core::ops::Mul;
use core::ops::Neg;
use core::ops::Sub;

/// Symbolic expression over leaves of type `T`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr<T> {
    Leaf(T),
    Neg(Box<Expr<T>>),
    Add(Box<Expr<T>>, Box<Expr<T>>),
    Mul(Box<Expr<T>>, Box<Expr<T>>),
    Pow(Box<Expr<T>>, usize),
}

impl<T> Expr<T> {
    pub fn pow(self, exp: usize) -> Self {
        Self::Pow(Box::new(self), exp)
    }

    /// Rebuilds the expression with every leaf mapped by `f`
    pub fn map_leaves<U>(&self, f: &mut impl FnMut(&T) -> U) -> Expr<U> {
        match self {
            Self::Leaf(v) => Expr::Leaf(f(v)),
            Self::Neg(a) => Expr::Neg(Box::new(a.map_leaves(f))),
            Self::Add(a, b) => {
                let a = a.map_leaves(f);
                let b = b.map_leaves(f);
                Expr::Add(Box::new(a), Box::new(b))
            }
            Self::Mul(a, b) => {
                let a = a.map_leaves(f);
                let b = b.map_leaves(f);
                Expr::Mul(Box::new(a), Box::new(b))
            }
            Self::Pow(a, e) => Expr::Pow(Box::new(a.map_leaves(f)), *e),
        }
    }

    /// Like [Expr::map_leaves] but stops at the first leaf that fails to map
    pub fn try_map_leaves<U, E>(
        &self,
        f: &mut impl FnMut(&T) -> Result<U, E>,
    ) -> Result<Expr<U>, E> {
        Ok(match self {
            Self::Leaf(v) => Expr::Leaf(f(v)?),
            Self::Neg(a) => Expr::Neg(Box::new(a.try_map_leaves(f)?)),
            Self::Add(a, b) => {
                let a = a.try_map_leaves(f)?;
                let b = b.try_map_leaves(f)?;
                Expr::Add(Box::new(a), Box::new(b))
            }
            Self::Mul(a, b) => {
                let a = a.try_map_leaves(f)?;
                let b = b.try_map_leaves(f)?;
                Expr::Mul(Box::new(a), Box::new(b))
            }
            Self::Pow(a, e) => Expr::Pow(Box::new(a.try_map_leaves(f)?), *e),
        })
    }

    /// Visits every leaf from left to right
    pub fn traverse(&self, f: &mut impl FnMut(&T)) {
        match self {
            Self::Leaf(v) => f(v),
            Self::Neg(a) | Self::Pow(a, _) => a.traverse(f),
            Self::Add(a, b) | Self::Mul(a, b) => {
                a.traverse(f);
                b.traverse(f);
            }
        }
    }

    pub fn eval<F: Field>(&self, leaf: &mut impl FnMut(&T) -> F) -> F {
        match self {
            Self::Leaf(v) => leaf(v),
            Self::Neg(a) => -a.eval(leaf),
            Self::Add(a, b) => a.eval(leaf) + b.eval(leaf),
            Self::Mul(a, b) => a.eval(leaf) * b.eval(leaf),
            Self::Pow(a, e) => a.eval(leaf).pow([*e as u64]),
        }
    }

    /// Upper bound on the degree of the expression given the degree of each
    /// leaf. Sums take the max, products add degrees.
    pub fn degree(&self, leaf_degree: &mut impl FnMut(&T) -> usize) -> usize {
        match self {
            Self::Leaf(v) => leaf_degree(v),
            Self::Neg(a) => a.degree(leaf_degree),
            Self::Add(a, b) => a.degree(leaf_degree).max(b.degree(leaf_degree)),
            Self::Mul(a, b) => a.degree(leaf_degree) + b.degree(leaf_degree),
            Self::Pow(a, e) => a.degree(leaf_degree) * e,
        }
    }
}

impl<T> From<T> for Expr<T> {
    fn from(value: T) -> Self {
        Self::Leaf(value)
    }
}

impl<'a, T: Clone> From<&'a Expr<T>> for Expr<T> {
    fn from(value: &'a Expr<T>) -> Self {
        value.clone()
    }
}

impl<T, R: Into<Expr<T>>> Add<R> for Expr<T> {
    type Output = Self;

    fn add(self, rhs: R) -> Self {
        Self::Add(Box::new(self), Box::new(rhs.into()))
    }
}

impl<T, R: Into<Expr<T>>> Sub<R> for Expr<T> {
    type Output = Self;

    fn sub(self, rhs: R) -> Self {
        Self::Add(Box::new(self), Box::new(Self::Neg(Box::new(rhs.into()))))
    }
}

impl<T, R: Into<Expr<T>>> Mul<R> for Expr<T> {
    type Output = Self;

    fn mul(self, rhs: R) -> Self {
        Self::Mul(Box::new(self), Box::new(rhs.into()))
    }
}

impl<T> Neg for Expr<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::Neg(Box::new(self))
    }
}

impl<'a, T: Clone, R: Into<Expr<T>>> Add<R> for &'a Expr<T> {
    type Output = Expr<T>;

    fn add(self, rhs: R) -> Expr<T> {
        self.clone() + rhs
    }
}

impl<'a, T: Clone, R: Into<Expr<T>>> Sub<R> for &'a Expr<T> {
    type Output = Expr<T>;

    fn sub(self, rhs: R) -> Expr<T> {
        self.clone() - rhs
    }
}

impl<'a, T: Clone, R: Into<Expr<T>>> Mul<R> for &'a Expr<T> {
    type Output = Expr<T>;

    fn mul(self, rhs: R) -> Expr<T> {
        self.clone() * rhs
    }
}

impl<'a, T: Clone> Neg for &'a Expr<T> {
    type Output = Expr<T>;

    fn neg(self) -> Expr<T> {
        -self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Expr;
    use binary::Fp;

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Var {
        X,
        Y,
    }

    fn eval(expr: &Expr<Var>, x: u64, y: u64) -> Fp {
        expr.eval(&mut |v| match v {
            Var::X => Fp::from(x),
            Var::Y => Fp::from(y),
        })
    }

    #[test]
    fn evaluates_arithmetic() {
        let x = Expr::from(Var::X);
        let y = Expr::from(Var::Y);
        // (x - y) * (x + y) + y^3
        let expr = (&x - &y) * (&x + &y) + y.clone().pow(3);

        assert_eq!(Fp::from(9 - 4 + 8u64), eval(&expr, 3, 2));
        assert_eq!(-Fp::from(7u64) + Fp::from(64u64), eval(&expr, 3, 4));
    }

    #[test]
    fn degree_of_products_adds() {
        let x = Expr::from(Var::X);
        let y = Expr::from(Var::Y);
        let expr = &x * &y * &x + y.clone().pow(2) - x;

        assert_eq!(3, expr.degree(&mut |_| 1));
        assert_eq!(
            4,
            expr.degree(&mut |v| match v {
                Var::X => 1,
                Var::Y => 2,
            })
        );
    }

    #[test]
    fn map_and_traverse_visit_leaves_in_order() {
        let expr = Expr::from(Var::X) * Var::Y - Var::X;
        let mut leaves = Vec::new();
        expr.traverse(&mut |v| leaves.push(*v));
        assert_eq!(vec![Var::X, Var::Y, Var::X], leaves);

        let mapped = expr.map_leaves(&mut |v| matches!(v, Var::Y));
        let mut flags = Vec::new();
        mapped.traverse(&mut |v| flags.push(*v));
        assert_eq!(vec![false, true, false], flags);
    }
}
