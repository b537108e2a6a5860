use super::constant;
use super::instances_by_index;
use super::subset_sum::Doubling;
use super::subset_sum::SubsetSum;
use super::subset_sum::STEPS;
use super::Component;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::trace::TraceFiller;
use crate::utils::felt_into;
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ff::Field;
use ark_ff::PrimeField;
use builtins::ec_op::DoublingStep;
use builtins::ec_op::PartialSumStep;
use builtins::ecdsa::generator_points_table;
use builtins::ecdsa::InstanceTrace;
use builtins::ecdsa::SCALAR_BITS;
use builtins::ecdsa::SHIFT_POINT;
use builtins::utils::curve::StarkwareCurve;
use constraints::AlgebraicItem;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Expr;
use constraints::Hint;
use constraints::PeriodicColumn;
use constraints::Rows;
use constraints::VirtualColumn;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Cells of an instance that are used once
#[derive(Clone, Copy, Debug)]
pub struct InstanceCells {
    pub message_inv: VirtualColumn,
    pub pubkey_x_squared: VirtualColumn,
    pub b_slope: VirtualColumn,
    pub b_x_diff_inv: VirtualColumn,
    pub r_point_slope: VirtualColumn,
    pub r_point_x_diff_inv: VirtualColumn,
}

impl InstanceCells {
    /// Lays the cells out on the first rows of each instance of `column`
    pub fn new(column: usize, height: usize) -> Self {
        let cell = |offset: usize| VirtualColumn::new(column, height, offset);
        Self {
            message_inv: cell(0),
            pubkey_x_squared: cell(1),
            b_slope: cell(2),
            b_x_diff_inv: cell(3),
            r_point_slope: cell(4),
            r_point_x_diff_inv: cell(5),
        }
    }
}

/// ECDSA signature verification builtin. Each instance checks a signature
/// `(r, w)` of the message hash `z` under the public key with x coordinate
/// `Q_x`. Only `Q_x` and `z` are written to memory.
///
/// The generator subset sum computes `z * G - shift` once per instance. The
/// key subset sum runs twice as often: first `r * Q + shift` and then
/// `w * B + shift` for `B = z * G + r * Q`. The doubling columns hold the
/// point the key sum adds at each step.
pub struct Ecdsa {
    pub ratio: usize,
    pub key: SubsetSum,
    pub key_x_diff_inv: VirtualColumn,
    pub doubling: Doubling,
    pub generator: SubsetSum,
    pub generator_x_diff_inv: VirtualColumn,
    pub cells: InstanceCells,
    /// Memory slots of the public key and the message
    pub pubkey: VirtualColumn,
    pub message: VirtualColumn,
    /// Index of the periodic x coordinates of the generator points (the y
    /// coordinates follow)
    pub periodic_offset: usize,
}

impl Ecdsa {
    /// Builds the component from its 14 columns in the order
    /// key x, key y, key suffix, key slope, key x_diff_inv, doubling x,
    /// doubling y, doubling slope, generator x, generator y, generator
    /// suffix, generator slope, generator x_diff_inv, instance cells
    pub fn new(
        ratio: usize,
        columns: [usize; 14],
        height: usize,
        pubkey: VirtualColumn,
        message: VirtualColumn,
        periodic_offset: usize,
    ) -> Self {
        let [k_x, k_y, k_suffix, k_slope, k_x_diff_inv, d_x, d_y, d_slope, g_x, g_y, g_suffix, g_slope, g_x_diff_inv, cells] =
            columns;
        let key_step = height / (2 * STEPS);
        let generator_step = height / STEPS;
        let key_column = |c: usize| VirtualColumn::new(c, key_step, 0);
        Self {
            ratio,
            key: SubsetSum::new([k_x, k_y, k_suffix, k_slope], key_step, SCALAR_BITS),
            key_x_diff_inv: key_column(k_x_diff_inv),
            doubling: Doubling {
                x: key_column(d_x),
                y: key_column(d_y),
                slope: key_column(d_slope),
            },
            generator: SubsetSum::new([g_x, g_y, g_suffix, g_slope], generator_step, SCALAR_BITS),
            generator_x_diff_inv: VirtualColumn::new(g_x_diff_inv, generator_step, 0),
            cells: InstanceCells::new(cells, height),
            pubkey,
            message,
            periodic_offset,
        }
    }

    /// Rows of an instance
    pub fn height(&self) -> usize {
        self.generator.height()
    }
}

impl<F: PrimeField> Component<F> for Ecdsa {
    fn name(&self) -> &'static str {
        "ecdsa"
    }

    fn segment(&self) -> Option<&'static str> {
        Some("ecdsa")
    }

    fn periodic_columns(&self, trace_len: usize) -> Result<Vec<PeriodicColumn<F>>> {
        let (xs, ys) = generator_points_table();
        let step = self.generator.step();
        Ok(vec![
            PeriodicColumn::new(xs.into_iter().map(felt_into).collect(), trace_len, step)?,
            PeriodicColumn::new(ys.into_iter().map(felt_into).collect(), trace_len, step)?,
        ])
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let height = self.height();
        let every_instance = Rows::every(height);
        let every_key_sum = Rows::every(self.key.height());
        let felt = |v: binary::Fp| Expr::from(AlgebraicItem::Constant(felt_into::<F>(v)));
        let alpha = felt(StarkwareCurve::COEFF_A);
        let beta = felt(StarkwareCurve::COEFF_B);
        let shift_x = felt(SHIFT_POINT.x);
        let shift_y = felt(SHIFT_POINT.y);
        let last = STEPS as isize - 1;

        let key = &self.key;
        let generator = &self.generator;
        let doubling = &self.doubling;
        let cells = &self.cells;
        let point_x = Expr::from(AlgebraicItem::Periodic(self.periodic_offset));
        let point_y = Expr::from(AlgebraicItem::Periodic(self.periodic_offset + 1));
        let q_x = doubling.x.curr::<F>();
        let q_y = doubling.y.curr::<F>();
        let addr = |slot: VirtualColumn, k: isize| slot.offset::<F>(k);
        let value = |slot: VirtualColumn| slot.shifted(1).curr::<F>();

        let mut constraints = doubling.constraints("ecdsa/signature0/doubling_key", key, &alpha);
        constraints.extend(generator.constraints(
            "ecdsa/signature0/exponentiate_generator",
            &point_x,
            &point_y,
        ));
        constraints.push(generator.x_diff_inv_constraint(
            "ecdsa/signature0/exponentiate_generator",
            self.generator_x_diff_inv,
            &point_x,
        ));
        constraints.extend(key.constraints("ecdsa/signature0/exponentiate_key", &q_x, &q_y));
        constraints.push(key.x_diff_inv_constraint(
            "ecdsa/signature0/exponentiate_key",
            self.key_x_diff_inv,
            &q_x,
        ));

        let gen_x = generator.partial_sum_x.offset::<F>(last);
        let gen_y = generator.partial_sum_y.offset::<F>(last);
        let key_x = key.partial_sum_x.offset::<F>(last);
        let key_y = key.partial_sum_y.offset::<F>(last);
        let b_x = doubling.x.offset::<F>(STEPS as isize);
        let b_y = doubling.y.offset::<F>(STEPS as isize);
        let b_slope = cells.b_slope.curr::<F>();
        let wb_x = key.partial_sum_x.offset::<F>(2 * STEPS as isize - 1);
        let wb_y = key.partial_sum_y.offset::<F>(2 * STEPS as isize - 1);
        let r_slope = cells.r_point_slope.curr::<F>();
        let x_squared = cells.pubkey_x_squared.curr::<F>();

        constraints.extend([
            Constraint::new(
                "ecdsa/signature0/init_gen/x",
                generator.partial_sum_x.curr::<F>() - &shift_x,
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/init_gen/y",
                generator.partial_sum_y.curr::<F>() + &shift_y,
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/init_key/x",
                key.partial_sum_x.curr::<F>() - &shift_x,
                every_key_sum,
            ),
            Constraint::new(
                "ecdsa/signature0/init_key/y",
                key.partial_sum_y.curr::<F>() - &shift_y,
                every_key_sum,
            ),
            // B = (z * G - shift) + (r * Q + shift)
            Constraint::new(
                "ecdsa/signature0/add_results/slope",
                &gen_y - (&key_y + &b_slope * (&gen_x - &key_x)),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/add_results/x",
                &b_slope * &b_slope - (&gen_x + &key_x + &b_x),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/add_results/y",
                &gen_y + &b_y - &b_slope * (&gen_x - &b_x),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/add_results/x_diff_inv",
                cells.b_x_diff_inv.curr::<F>() * (&gen_x - &key_x) - &one,
                every_instance,
            ),
            // (w * B + shift) - shift has x coordinate r
            Constraint::new(
                "ecdsa/signature0/extract_r/slope",
                &wb_y + &shift_y - &r_slope * (&wb_x - &shift_x),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/extract_r/x",
                &r_slope * &r_slope - (&wb_x + &shift_x + key.suffix.curr::<F>()),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/extract_r/x_diff_inv",
                cells.r_point_x_diff_inv.curr::<F>() * (&wb_x - &shift_x) - &one,
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/z_nonzero",
                generator.suffix.curr::<F>() * cells.message_inv.curr::<F>() - &one,
                every_instance,
            ),
            // the last doubling slope of each key sum holds the inverse of r or w
            Constraint::new(
                "ecdsa/signature0/r_and_w_nonzero",
                key.suffix.curr::<F>() * doubling.slope.offset::<F>(last) - &one,
                every_key_sum,
            ),
            Constraint::new(
                "ecdsa/signature0/q_on_curve/x_squared",
                &x_squared - &q_x * &q_x,
                every_instance,
            ),
            Constraint::new(
                "ecdsa/signature0/q_on_curve/on_curve",
                &q_y * &q_y - (&q_x * &x_squared + &alpha * &q_x + &beta),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/init_addr",
                addr(self.pubkey, 0) - PublicInputHint::InitialEcdsaAddr.hint::<F>(),
                Rows::first(),
            ),
            Constraint::new(
                "ecdsa/message_addr",
                addr(self.message, 0) - (addr(self.pubkey, 0) + &one),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/pubkey_addr",
                addr(self.pubkey, 1) - (addr(self.message, 0) + &one),
                every_instance,
            )
            .except(Rows::FromEnd(height)),
            Constraint::new(
                "ecdsa/message_value0",
                value(self.message) - generator.suffix.curr::<F>(),
                every_instance,
            ),
            Constraint::new(
                "ecdsa/pubkey_value0",
                value(self.pubkey) - &q_x,
                every_instance,
            ),
        ]);
        constraints
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let num_instances = trace.trace_len() / self.height();
        let segment = trace.segment_begin("ecdsa")?;
        let instances = instances_by_index(
            "ecdsa",
            &trace.witness.air_private_input.ecdsa,
            |instance| instance.index,
            num_instances,
        )?;
        let instance_traces = ark_std::cfg_into_iter!(instances)
            .enumerate()
            .map(|(i, instance)| {
                Ok(match instance {
                    Some(instance) => InstanceTrace::new(instance)?,
                    None => InstanceTrace::new_dummy(i as u32)?,
                })
            })
            .collect::<Result<Vec<InstanceTrace>>>()?;

        let key = &self.key;
        let generator = &self.generator;
        let cells = &self.cells;
        for (i, instance_trace) in instance_traces.into_iter().enumerate() {
            let InstanceTrace {
                instance,
                pubkey,
                message,
                generator_steps,
                key_steps,
                doubling_steps,
                b_slope,
                b_x_diff_inv,
                r_point_slope,
                r_point_x_diff_inv,
                ..
            } = instance_trace;

            for (k, step) in generator_steps.into_iter().enumerate() {
                let PartialSumStep {
                    point,
                    suffix,
                    slope,
                    x_diff_inv,
                } = step;
                let row = generator.suffix.row(i * STEPS + k);
                trace.set(generator.partial_sum_x.column, row, felt_into(point.x));
                trace.set(generator.partial_sum_y.column, row, felt_into(point.y));
                trace.set(generator.suffix.column, row, felt_into(suffix));
                trace.set(generator.slope.column, row, felt_into(slope));
                trace.set(self.generator_x_diff_inv.column, row, felt_into(x_diff_inv));
            }

            for (k, (step, doubling)) in key_steps.into_iter().zip(doubling_steps).enumerate() {
                let PartialSumStep {
                    point,
                    suffix,
                    slope,
                    x_diff_inv,
                } = step;
                let DoublingStep {
                    point: doubled_point,
                    slope: doubling_slope,
                } = doubling;
                let row = key.suffix.row(i * 2 * STEPS + k);
                trace.set(key.partial_sum_x.column, row, felt_into(point.x));
                trace.set(key.partial_sum_y.column, row, felt_into(point.y));
                trace.set(key.suffix.column, row, felt_into(suffix));
                trace.set(key.slope.column, row, felt_into(slope));
                trace.set(self.key_x_diff_inv.column, row, felt_into(x_diff_inv));
                trace.set(self.doubling.x.column, row, felt_into(doubled_point.x));
                trace.set(self.doubling.y.column, row, felt_into(doubled_point.y));
                trace.set(self.doubling.slope.column, row, felt_into(doubling_slope));
            }

            let message_inv = message.inverse().unwrap_or_default();
            for (cell, value) in [
                (cells.message_inv, message_inv),
                (cells.pubkey_x_squared, pubkey.x.square()),
                (cells.b_slope, b_slope),
                (cells.b_x_diff_inv, b_x_diff_inv),
                (cells.r_point_slope, r_point_slope),
                (cells.r_point_x_diff_inv, r_point_x_diff_inv),
            ] {
                trace.set(cell.column, cell.row(i), felt_into(value));
            }

            let [pubkey_addr, message_addr] = instance.mem_addr(segment);
            trace.set_memory(self.pubkey.row(i), pubkey_addr, felt_into(pubkey.x))?;
            trace.set_memory(self.message.row(i), message_addr, felt_into(message))?;
        }
        Ok(())
    }
}
