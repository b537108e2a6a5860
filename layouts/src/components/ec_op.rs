use super::constant;
use super::instances_by_index;
use super::subset_sum::bit_unpacking_cells;
use super::subset_sum::Doubling;
use super::subset_sum::SubsetSum;
use super::subset_sum::STEPS;
use super::Component;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::trace::TraceFiller;
use crate::utils::felt_into;
use ark_ec::short_weierstrass::SWCurveConfig;
use ark_ff::PrimeField;
use builtins::ec_op::DoublingStep;
use builtins::ec_op::InstanceTrace;
use builtins::ec_op::PartialSumStep;
use builtins::ec_op::SCALAR_BITS;
use builtins::utils::curve::StarkwareCurve;
use constraints::AlgebraicItem;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Expr;
use constraints::Hint;
use constraints::Rows;
use constraints::VirtualColumn;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Memory cells of an instance: p_x, p_y, q_x, q_y, m, r_x, r_y
const NUM_MEMORY_CELLS: usize = 7;

/// Memory slot positions reserved per instance
const MEMORY_SLOT_CELLS: usize = 8;

/// Elliptic curve operation builtin computing `r = p + m * q`.
///
/// `q` is doubled at every step while the subset sum starting from `p` adds
/// the doubled point whenever the current bit of `m` is set.
pub struct EcOp {
    pub ratio: usize,
    pub subset_sum: SubsetSum,
    pub x_diff_inv: VirtualColumn,
    /// `q * 2^i` on step `i`
    pub doubling: Doubling,
    pub bit_unpacking: VirtualColumn,
    /// Memory slot of the instance cells. The slot has 8 positions per
    /// instance. The last is left to the memory pool.
    pub memory: VirtualColumn,
}

impl EcOp {
    /// Builds the component from its 9 columns in the order
    /// p_x, p_y, slope, x_diff_inv, suffix, q_x, q_y, q_slope, bit_unpacking
    pub fn new(ratio: usize, columns: [usize; 9], step: usize, memory: VirtualColumn) -> Self {
        let [p_x, p_y, slope, x_diff_inv, suffix, q_x, q_y, q_slope, bit_unpacking] = columns;
        let column = |c: usize| VirtualColumn::new(c, step, 0);
        Self {
            ratio,
            subset_sum: SubsetSum::new([p_x, p_y, suffix, slope], step, SCALAR_BITS),
            x_diff_inv: column(x_diff_inv),
            doubling: Doubling {
                x: column(q_x),
                y: column(q_y),
                slope: column(q_slope),
            },
            bit_unpacking: column(bit_unpacking),
            memory,
        }
    }

    /// Rows of an instance
    pub fn height(&self) -> usize {
        self.subset_sum.height()
    }
}

impl<F: PrimeField> Component<F> for EcOp {
    fn name(&self) -> &'static str {
        "ec_op"
    }

    fn segment(&self) -> Option<&'static str> {
        Some("ec_op")
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let sum = &self.subset_sum;
        let height = self.height();
        let every_instance = Rows::every(height);
        let addr = |k: isize| self.memory.offset::<F>(k);
        let value = |k: isize| self.memory.shifted(1).offset::<F>(k);

        let q_x = self.doubling.x.curr::<F>();
        let q_y = self.doubling.y.curr::<F>();
        let alpha = Expr::from(AlgebraicItem::Constant(felt_into::<F>(
            StarkwareCurve::COEFF_A,
        )));
        let last = STEPS as isize - 1;

        let mut constraints = vec![
            Constraint::new(
                "ec_op/init_addr",
                addr(0) - PublicInputHint::InitialEcOpAddr.hint::<F>(),
                Rows::first(),
            ),
            Constraint::new(
                "ec_op/p_x_addr",
                addr(MEMORY_SLOT_CELLS as isize) - (addr(0) + constant::<F>(NUM_MEMORY_CELLS as u64)),
                every_instance,
            )
            .except(Rows::FromEnd(height)),
        ];
        for (k, name) in ["p_y", "q_x", "q_y", "m", "r_x", "r_y"].into_iter().enumerate() {
            let k = k as isize + 1;
            constraints.push(Constraint::new(
                format!("ec_op/{name}_addr"),
                addr(k) - (addr(k - 1) + &one),
                every_instance,
            ));
        }
        constraints.extend(self.doubling.constraints("ec_op/doubling_q", sum, &alpha));
        constraints.extend([
            Constraint::new("ec_op/get_q_x", value(2) - &q_x, every_instance),
            Constraint::new("ec_op/get_q_y", value(3) - &q_y, every_instance),
        ]);
        constraints.extend(sum.bit_unpacking_constraints("ec_op/ec_subset_sum", self.bit_unpacking));
        constraints.extend(sum.constraints("ec_op/ec_subset_sum", &q_x, &q_y));
        constraints.push(sum.x_diff_inv_constraint("ec_op/ec_subset_sum", self.x_diff_inv, &q_x));
        constraints.extend([
            Constraint::new("ec_op/get_m", sum.suffix.curr::<F>() - value(4), every_instance),
            Constraint::new(
                "ec_op/get_p_x",
                value(0) - sum.partial_sum_x.curr::<F>(),
                every_instance,
            ),
            Constraint::new(
                "ec_op/get_p_y",
                value(1) - sum.partial_sum_y.curr::<F>(),
                every_instance,
            ),
            Constraint::new(
                "ec_op/set_r_x",
                value(5) - sum.partial_sum_x.offset::<F>(last),
                every_instance,
            ),
            Constraint::new(
                "ec_op/set_r_y",
                value(6) - sum.partial_sum_y.offset::<F>(last),
                every_instance,
            ),
        ]);
        constraints
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let height = self.height();
        let num_instances = trace.trace_len() / height;
        let segment = trace.segment_begin("ec_op")?;
        let instances = instances_by_index(
            "ec_op",
            &trace.witness.air_private_input.ec_op,
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

        let sum = &self.subset_sum;
        for (i, instance_trace) in instance_traces.into_iter().enumerate() {
            let InstanceTrace {
                instance,
                p,
                q,
                m,
                q_doubling_steps,
                partial_steps,
                r,
            } = instance_trace;
            let first_step = i * STEPS;

            for (k, (doubling, partial)) in q_doubling_steps.into_iter().zip(partial_steps).enumerate() {
                let DoublingStep {
                    point: doubled_point,
                    slope: doubling_slope,
                } = doubling;
                let PartialSumStep {
                    point,
                    suffix,
                    slope,
                    x_diff_inv,
                } = partial;
                let row = sum.suffix.row(first_step + k);
                trace.set(sum.partial_sum_x.column, row, felt_into(point.x));
                trace.set(sum.partial_sum_y.column, row, felt_into(point.y));
                trace.set(sum.suffix.column, row, felt_into(suffix));
                trace.set(sum.slope.column, row, felt_into(slope));
                trace.set(self.x_diff_inv.column, row, felt_into(x_diff_inv));
                trace.set(self.doubling.x.column, row, felt_into(doubled_point.x));
                trace.set(self.doubling.y.column, row, felt_into(doubled_point.y));
                trace.set(self.doubling.slope.column, row, felt_into(doubling_slope));
            }
            let [prod_ones192, prod_ones196] = bit_unpacking_cells::<F>(instance.m);
            let unpacking = self.bit_unpacking;
            trace.set(unpacking.column, unpacking.row(first_step), prod_ones192);
            trace.set(unpacking.column, unpacking.row(first_step + 1), prod_ones196);

            let values = [p.x, p.y, q.x, q.y, m, r.x, r.y];
            let addresses = instance.mem_addr(segment);
            for (k, (address, value)) in addresses.into_iter().zip(values).enumerate() {
                let row = self.memory.row(MEMORY_SLOT_CELLS * i + k);
                trace.set_memory(row, address, felt_into(value))?;
            }
        }
        Ok(())
    }
}
