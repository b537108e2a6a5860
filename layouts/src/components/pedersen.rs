use super::constant;
use super::instances_by_index;
use super::subset_sum::bit_unpacking_cells;
use super::subset_sum::SubsetSum;
use super::subset_sum::STEPS;
use super::Component;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::trace::TraceFiller;
use crate::utils::felt_into;
use ark_ff::PrimeField;
use binary::PedersenInstance;
use builtins::pedersen::ElementPartialStep;
use builtins::pedersen::InstanceTrace;
use builtins::pedersen::PedersenParams;
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

/// Pedersen hash builtin. Each instance hashes two inputs with two
/// consecutive subset sums over the constant points table:
///
/// ```text
/// ┌────────────┬───────────────────────────────────────────┐
/// │ steps      │ partial sum                               │
/// ├────────────┼───────────────────────────────────────────┤
/// │ 0..256     │ shift_point + a_low * P1 + a_high * P2    │
/// │ 256..512   │ ... + b_low * P3 + b_high * P4            │
/// └────────────┴───────────────────────────────────────────┘
/// ```
///
/// The hash is the x coordinate of the partial sum at step 511.
pub struct Pedersen {
    pub params: PedersenParams,
    pub ratio: usize,
    pub subset_sum: SubsetSum,
    pub bit_unpacking: VirtualColumn,
    /// Memory slots of the two inputs and the output
    pub input0: VirtualColumn,
    pub input1: VirtualColumn,
    pub output: VirtualColumn,
    /// Index of the periodic x coordinates (the y coordinates follow)
    pub periodic_offset: usize,
}

impl Pedersen {
    /// Rows of an instance
    pub fn height(&self) -> usize {
        2 * self.subset_sum.height()
    }
}

impl<F: PrimeField> Component<F> for Pedersen {
    fn name(&self) -> &'static str {
        "pedersen"
    }

    fn segment(&self) -> Option<&'static str> {
        Some("pedersen")
    }

    fn periodic_columns(&self, trace_len: usize) -> Result<Vec<PeriodicColumn<F>>> {
        let (xs, ys) = self.params.points_table();
        let step = self.subset_sum.step();
        Ok(vec![
            PeriodicColumn::new(xs.into_iter().map(felt_into).collect(), trace_len, step)?,
            PeriodicColumn::new(ys.into_iter().map(felt_into).collect(), trace_len, step)?,
        ])
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let sum = &self.subset_sum;
        let height = self.height();
        let every_instance = Rows::every(height);
        let point_x = Expr::from(AlgebraicItem::Periodic(self.periodic_offset));
        let point_y = Expr::from(AlgebraicItem::Periodic(self.periodic_offset + 1));
        let shift_point = self.params.shift_point;
        let addr = |slot: VirtualColumn, k: isize| slot.offset::<F>(k);
        let value = |slot: VirtualColumn| slot.shifted(1).curr::<F>();

        let mut constraints = sum.bit_unpacking_constraints("pedersen/hash0/ec_subset_sum", self.bit_unpacking);
        constraints.extend(sum.constraints("pedersen/hash0/ec_subset_sum", &point_x, &point_y));
        constraints.extend([
            // the second input starts from the sum of the first
            Constraint::new(
                "pedersen/hash0/copy_point/x",
                sum.partial_sum_x.offset::<F>(STEPS as isize)
                    - sum.partial_sum_x.offset::<F>(STEPS as isize - 1),
                every_instance,
            ),
            Constraint::new(
                "pedersen/hash0/copy_point/y",
                sum.partial_sum_y.offset::<F>(STEPS as isize)
                    - sum.partial_sum_y.offset::<F>(STEPS as isize - 1),
                every_instance,
            ),
            Constraint::new(
                "pedersen/hash0/init/x",
                sum.partial_sum_x.curr::<F>() - constant_felt::<F>(shift_point.x),
                every_instance,
            ),
            Constraint::new(
                "pedersen/hash0/init/y",
                sum.partial_sum_y.curr::<F>() - constant_felt::<F>(shift_point.y),
                every_instance,
            ),
            Constraint::new(
                "pedersen/input0_value0",
                value(self.input0) - sum.suffix.curr::<F>(),
                every_instance,
            ),
            Constraint::new(
                "pedersen/input0_addr",
                addr(self.input0, 1) - (addr(self.output, 0) + &one),
                every_instance,
            )
            .except(Rows::FromEnd(height)),
            Constraint::new(
                "pedersen/init_addr",
                addr(self.input0, 0) - PublicInputHint::InitialPedersenAddr.hint::<F>(),
                Rows::first(),
            ),
            Constraint::new(
                "pedersen/input1_value0",
                value(self.input1) - sum.suffix.offset::<F>(STEPS as isize),
                every_instance,
            ),
            Constraint::new(
                "pedersen/input1_addr",
                addr(self.input1, 0) - (addr(self.input0, 0) + &one),
                every_instance,
            ),
            Constraint::new(
                "pedersen/output_value0",
                value(self.output) - sum.partial_sum_x.offset::<F>(2 * STEPS as isize - 1),
                every_instance,
            ),
            Constraint::new(
                "pedersen/output_addr",
                addr(self.output, 0) - (addr(self.input1, 0) + &one),
                every_instance,
            ),
        ]);
        constraints
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let num_instances = trace.trace_len() / self.height();
        let segment = trace.segment_begin("pedersen")?;
        let instances = instances_by_index(
            "pedersen",
            &trace.witness.air_private_input.pedersen,
            |instance| instance.index,
            num_instances,
        )?;
        let instance_traces = ark_std::cfg_into_iter!(instances)
            .enumerate()
            .map(|(i, instance)| {
                let instance = instance.unwrap_or_else(|| PedersenInstance::new_empty(i as u32));
                Ok(InstanceTrace::new(&self.params, instance)?)
            })
            .collect::<Result<Vec<InstanceTrace>>>()?;

        let sum = &self.subset_sum;
        for (i, instance_trace) in instance_traces.into_iter().enumerate() {
            let InstanceTrace {
                instance,
                a,
                b,
                output,
                a_steps,
                b_steps,
            } = instance_trace;
            let base_step = i * 2 * STEPS;

            for (j, (input, steps)) in [(instance.a, a_steps), (instance.b, b_steps)]
                .into_iter()
                .enumerate()
            {
                let first_step = base_step + j * STEPS;
                for (k, partial_step) in steps.into_iter().enumerate() {
                    let ElementPartialStep {
                        point,
                        suffix,
                        slope,
                    } = partial_step;
                    let row = sum.suffix.row(first_step + k);
                    trace.set(sum.partial_sum_x.column, row, felt_into(point.x));
                    trace.set(sum.partial_sum_y.column, row, felt_into(point.y));
                    trace.set(sum.suffix.column, row, felt_into(suffix));
                    trace.set(sum.slope.column, row, felt_into(slope));
                }
                let [prod_ones192, prod_ones196] = bit_unpacking_cells::<F>(input);
                let unpacking = self.bit_unpacking;
                trace.set(unpacking.column, unpacking.row(first_step), prod_ones192);
                trace.set(unpacking.column, unpacking.row(first_step + 1), prod_ones196);
            }

            let [a_addr, b_addr, output_addr] = instance.mem_addr(segment);
            trace.set_memory(self.input0.row(i), a_addr, felt_into(a))?;
            trace.set_memory(self.input1.row(i), b_addr, felt_into(b))?;
            trace.set_memory(self.output.row(i), output_addr, felt_into(output))?;
        }
        Ok(())
    }
}

fn constant_felt<F: PrimeField>(v: binary::Fp) -> Expr<AlgebraicItem<F>> {
    Expr::from(AlgebraicItem::Constant(felt_into::<F>(v)))
}
