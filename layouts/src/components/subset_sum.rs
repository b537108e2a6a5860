//! Constraints shared by the components that compute an elliptic curve
//! subset sum `start + Σ bit_i * point_i` over 256 steps of `step` rows.

use super::booleanity;
use super::constant;
use super::pow2;
use ark_ff::PrimeField;
use constraints::AlgebraicItem;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Expr;
use constraints::Rows;
use constraints::VirtualColumn;
use ruint::aliases::U256;

/// Steps of a subset sum
pub const STEPS: usize = 256;

/// Cells of a subset sum. All columns share the same step.
#[derive(Clone, Copy, Debug)]
pub struct SubsetSum {
    pub partial_sum_x: VirtualColumn,
    pub partial_sum_y: VirtualColumn,
    /// The scalar shifted right by the number of steps so far
    pub suffix: VirtualColumn,
    pub slope: VirtualColumn,
    /// Width of the scalar. The suffix is zero from this step on.
    pub scalar_bits: usize,
}

impl SubsetSum {
    pub fn new(columns: [usize; 4], step: usize, scalar_bits: usize) -> Self {
        let [x, y, suffix, slope] = columns.map(|c| VirtualColumn::new(c, step, 0));
        Self {
            partial_sum_x: x,
            partial_sum_y: y,
            suffix,
            slope,
            scalar_bits,
        }
    }

    /// Rows between two steps
    pub fn step(&self) -> usize {
        self.suffix.step
    }

    /// Rows of a whole subset sum
    pub fn height(&self) -> usize {
        STEPS * self.step()
    }

    /// The bit consumed at the current step
    pub fn bit<F: PrimeField>(&self) -> Expr<AlgebraicItem<F>> {
        self.suffix.curr::<F>() - self.suffix.next::<F>() * constant::<F>(2)
    }

    /// Every step except the last step of each subset sum
    pub fn transition(&self) -> (Rows, Rows) {
        (
            Rows::every(self.step()),
            Rows::every_at(self.height(), (STEPS - 1) * self.step()),
        )
    }

    /// Checks the scalar is less than the field modulus. Given the Stark
    /// field modulus `2^251 + 17 * 2^192 + 1` a 252 bit scalar has a unique
    /// unpacking unless bit 251 is set together with bit 196 or bit 192:
    ///
    /// ```text
    /// 100000000000000000000000000000000000000000000000000000010001000000...1
    /// ^                                                       ^   ^
    /// 251                                                    196 192
    /// ```
    ///
    /// In that case the bits below 192 and the bits between 192 and 196 and
    /// between 196 and 251 must all be zero. `bit_unpacking` holds
    /// `prod_ones192 = b251 * b196 * b192` on the first step of each sum and
    /// `prod_ones196 = b251 * b196` on the second.
    pub fn bit_unpacking_constraints<F: PrimeField>(
        &self,
        prefix: &str,
        bit_unpacking: VirtualColumn,
    ) -> Vec<Constraint<F>> {
        let s = |k: isize| self.suffix.offset::<F>(k);
        let bit = |k: isize| s(k) - s(k + 1) * constant::<F>(2);
        let prod_ones192 = bit_unpacking.offset::<F>(0);
        let prod_ones196 = bit_unpacking.offset::<F>(1);
        let every_sum = Rows::every(self.height());

        vec![
            Constraint::new(
                format!("{prefix}/bit_unpacking/last_one_is_zero"),
                &prod_ones192 * bit(0),
                every_sum,
            ),
            Constraint::new(
                format!("{prefix}/bit_unpacking/zeroes_between_ones0"),
                &prod_ones192 * (s(1) - s(192) * pow2::<F>(191)),
                every_sum,
            ),
            Constraint::new(
                format!("{prefix}/bit_unpacking/cumulative_bit192"),
                &prod_ones192 - &prod_ones196 * bit(192),
                every_sum,
            ),
            Constraint::new(
                format!("{prefix}/bit_unpacking/zeroes_between_ones192"),
                &prod_ones196 * (s(193) - s(196) * pow2::<F>(3)),
                every_sum,
            ),
            Constraint::new(
                format!("{prefix}/bit_unpacking/cumulative_bit196"),
                &prod_ones196 - bit(251) * bit(196),
                every_sum,
            ),
            Constraint::new(
                format!("{prefix}/bit_unpacking/zeroes_between_ones196"),
                bit(251) * (s(197) - s(251) * pow2::<F>(54)),
                every_sum,
            ),
        ]
    }

    /// Constraints of the conditional additions of `(point_x, point_y)` to
    /// the partial sum at every step
    pub fn constraints<F: PrimeField>(
        &self,
        prefix: &str,
        point_x: &Expr<AlgebraicItem<F>>,
        point_y: &Expr<AlgebraicItem<F>>,
    ) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let (transition, last_step) = self.transition();
        let bit = self.bit::<F>();
        let bit_neg = &one - &bit;
        let x = self.partial_sum_x.curr::<F>();
        let y = self.partial_sum_y.curr::<F>();
        let next_x = self.partial_sum_x.next::<F>();
        let next_y = self.partial_sum_y.next::<F>();
        let slope = self.slope.curr::<F>();
        let step = self.step();

        vec![
            Constraint::new(
                format!("{prefix}/booleanity_test"),
                booleanity(&bit),
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/bit_extraction_end"),
                self.suffix.curr::<F>(),
                Rows::every_at(self.height(), self.scalar_bits * step),
            ),
            Constraint::new(
                format!("{prefix}/zeros_tail"),
                self.suffix.curr::<F>(),
                last_step,
            ),
            Constraint::new(
                format!("{prefix}/add_points/slope"),
                &bit * (&y - point_y) - &slope * (&x - point_x),
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/add_points/x"),
                &slope * &slope - &bit * (&x + point_x + &next_x),
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/add_points/y"),
                &bit * (&y + &next_y) - &slope * (&x - &next_x),
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/copy_point/x"),
                &bit_neg * (&next_x - &x),
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/copy_point/y"),
                &bit_neg * (&next_y - &y),
                transition,
            )
            .except(last_step),
        ]
    }

    /// Witnesses that the partial sum never shares an x coordinate with the
    /// point added to it
    pub fn x_diff_inv_constraint<F: PrimeField>(
        &self,
        prefix: &str,
        x_diff_inv: VirtualColumn,
        point_x: &Expr<AlgebraicItem<F>>,
    ) -> Constraint<F> {
        let (transition, last_step) = self.transition();
        Constraint::new(
            format!("{prefix}/add_points/x_diff_inv"),
            x_diff_inv.curr::<F>() * (self.partial_sum_x.curr::<F>() - point_x)
                - constant::<F>(1),
            transition,
        )
        .except(last_step)
    }
}

/// Cells of a point that is doubled at every step of a subset sum
#[derive(Clone, Copy, Debug)]
pub struct Doubling {
    pub x: VirtualColumn,
    pub y: VirtualColumn,
    pub slope: VirtualColumn,
}

impl Doubling {
    /// `next = 2 * curr` on every step of `sum` but its last
    pub fn constraints<F: PrimeField>(
        &self,
        prefix: &str,
        sum: &SubsetSum,
        alpha: &Expr<AlgebraicItem<F>>,
    ) -> Vec<Constraint<F>> {
        let (transition, last_step) = sum.transition();
        let x = self.x.curr::<F>();
        let y = self.y.curr::<F>();
        let next_x = self.x.next::<F>();
        let next_y = self.y.next::<F>();
        let slope = self.slope.curr::<F>();

        vec![
            Constraint::new(
                format!("{prefix}/slope"),
                &x * &x * constant::<F>(3) + alpha - (&y + &y) * &slope,
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/x"),
                &slope * &slope - (&x + &x + &next_x),
                transition,
            )
            .except(last_step),
            Constraint::new(
                format!("{prefix}/y"),
                &y + &next_y - &slope * (&x - &next_x),
                transition,
            )
            .except(last_step),
        ]
    }
}

/// Values of the bit unpacking cells `[prod_ones192, prod_ones196]` of a
/// scalar
pub fn bit_unpacking_cells<F: PrimeField>(scalar: U256) -> [F; 2] {
    let bit = |i: usize| F::from(scalar.bit(i));
    let prod_ones196 = bit(251) * bit(196);
    let prod_ones192 = prod_ones196 * bit(192);
    [prod_ones192, prod_ones196]
}
