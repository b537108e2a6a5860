use super::constant;
use super::instances_by_index;
use super::pow2;
use super::Component;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::trace::TraceFiller;
use ark_ff::PrimeField;
use binary::RangeCheckInstance;
use builtins::range_check::InstanceTrace;
use builtins::range_check::PART_BITS;
use builtins::utils::reduce_u256;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Hint;
use constraints::Rows;
use constraints::VirtualColumn;

/// Range check builtin. Checks a memory value is less than
/// `2^(16 * n_parts)` by splitting it into 16-bit parts that go through the
/// 16-bit range check pool.
pub struct RangeCheckBuiltin {
    pub ratio: usize,
    pub n_parts: usize,
    /// Memory slot of the checked value
    pub memory: VirtualColumn,
    /// Range check pool slot of the parts (most significant first)
    pub parts: VirtualColumn,
}

impl RangeCheckBuiltin {
    /// Rows of an instance
    pub fn height(&self) -> usize {
        self.memory.step
    }
}

impl<F: PrimeField> Component<F> for RangeCheckBuiltin {
    fn name(&self) -> &'static str {
        "range_check"
    }

    fn segment(&self) -> Option<&'static str> {
        Some("range_check")
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let every_instance = Rows::every(self.height());
        let address = &self.memory;
        let value = self.memory.shifted(1);

        let parts_value = (1..self.n_parts as isize).fold(self.parts.curr::<F>(), |acc, j| {
            acc * pow2::<F>(PART_BITS) + self.parts.offset::<F>(j)
        });

        vec![
            Constraint::new(
                "rc_builtin/value",
                parts_value - value.curr::<F>(),
                every_instance,
            ),
            Constraint::new(
                "rc_builtin/addr_step",
                address.next::<F>() - (address.curr::<F>() + &one),
                every_instance,
            )
            .except(Rows::FromEnd(self.height())),
            Constraint::new(
                "rc_builtin/init_addr",
                address.curr::<F>() - PublicInputHint::InitialRangeCheckAddr.hint::<F>(),
                Rows::first(),
            ),
        ]
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let num_instances = trace.trace_len() / self.height();
        let segment = trace.segment_begin("range_check")?;
        let instances = instances_by_index(
            "range_check",
            &trace.witness.air_private_input.range_check,
            |instance| instance.index,
            num_instances,
        )?;

        for (i, instance) in instances.into_iter().enumerate() {
            let instance = instance.unwrap_or_else(|| RangeCheckInstance::new_empty(i as u32));
            let instance_trace = InstanceTrace::new(instance, self.n_parts)?;
            let value = reduce_u256::<F>(instance.value);
            trace.set_memory(self.memory.row(i), instance.mem_addr(segment), value)?;
            for (j, part) in instance_trace.parts.into_iter().enumerate() {
                trace.set_range_check(self.parts.row(i * self.n_parts + j), part);
            }
        }
        Ok(())
    }
}
