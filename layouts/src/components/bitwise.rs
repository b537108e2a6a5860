use super::constant;
use super::instances_by_index;
use super::pow2;
use super::Component;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::trace::TraceFiller;
use ark_ff::PrimeField;
use binary::BitwiseInstance;
use builtins::bitwise::Dilution;
use builtins::bitwise::InstanceTrace;
use builtins::utils::reduce_u256;
use constraints::AlgebraicItem;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Expr;
use constraints::Hint;
use constraints::Rows;
use constraints::VirtualColumn;
use ruint::aliases::U256;

/// Values of an instance in the order their strands sit in the diluted pool
const NUM_VALUES: usize = 4;

/// Bitwise builtin. Computes `x & y`, `x ^ y` and `x | y` by splitting `x`,
/// `y`, `x & y` and `x ^ y` into diluted strands. For diluted strands the
/// identity `x + y = (x ^ y) + 2 * (x & y)` holds bit by bit since the
/// spacing leaves room for the carry.
///
/// Strand `k` of value `v` sits on diluted pool row `d * (4k + v)` of an
/// instance and the trim cell of top strand `j` on row `4dj + 1`:
///
/// ```text
/// ┌───────┬──────────┬──────────┬────────────┐
/// │ row   │ 0        │ 1        │ d, 2d, 3d  │
/// ├───────┼──────────┼──────────┼────────────┤
/// │ 4dk   │ x_k      │ trim_k   │ y_k, and_k │
/// │       │          │          │ xor_k      │
/// └───────┴──────────┴──────────┴────────────┘
/// ```
pub struct Bitwise {
    pub ratio: usize,
    pub dilution: Dilution,
    /// The diluted pool column
    pub pool: usize,
    /// Memory slot of `x`, `y`, `x & y` and `x ^ y`
    pub var_pool: VirtualColumn,
    /// Memory slot of `x | y`
    pub x_or_y: VirtualColumn,
}

impl Bitwise {
    /// Rows of an instance
    pub fn height(&self) -> usize {
        self.x_or_y.step
    }

    /// Rows between two strands
    pub fn strand_step(&self) -> usize {
        self.height() / (NUM_VALUES * self.dilution.n_strands())
    }

    fn strand(&self, value: usize, k: usize) -> usize {
        self.strand_step() * (NUM_VALUES * k + value)
    }

    fn trim(&self, j: usize) -> usize {
        NUM_VALUES * self.strand_step() * j + 1
    }

    fn pool_cell<F>(&self, row: usize) -> Expr<AlgebraicItem<F>> {
        AlgebraicItem::Trace(self.pool, row as isize).into()
    }

    /// Top strands of the last chunk that have unused high bits
    fn trimmed_strands(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let dilution = self.dilution;
        (0..dilution.spacing)
            .map(move |j| (j, dilution.top_strand_bits(j)))
            .filter(move |&(_, bits)| bits < dilution.n_bits)
    }

    /// Regular form of a diluted strand
    fn compact(&self, strand: U256) -> u64 {
        let Dilution {
            spacing, n_bits, ..
        } = self.dilution;
        (0..n_bits).fold(0, |acc, t| acc | (u64::from(strand.bit(spacing * t)) << t))
    }
}

impl<F: PrimeField> Component<F> for Bitwise {
    fn name(&self) -> &'static str {
        "bitwise"
    }

    fn segment(&self) -> Option<&'static str> {
        Some("bitwise")
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        let one = constant::<F>(1);
        let height = self.height();
        let every_instance = Rows::every(height);
        let var_addr = |k: isize| self.var_pool.offset::<F>(k);
        let var_value = |k: isize| self.var_pool.shifted(1).offset::<F>(k);
        let or_addr = self.x_or_y.curr::<F>();
        let or_value = self.x_or_y.shifted(1).curr::<F>();
        let last_chunk = self.dilution.n_chunks() - 1;
        let top_strand = |value: usize, j: usize| {
            self.pool_cell::<F>(self.strand(value, last_chunk * self.dilution.spacing + j))
        };

        let mut constraints = vec![
            Constraint::new(
                "bitwise/init_var_pool_addr",
                var_addr(0) - PublicInputHint::InitialBitwiseAddr.hint::<F>(),
                Rows::first(),
            ),
            Constraint::new(
                "bitwise/step_var_pool_addr",
                var_addr(1) - (var_addr(0) + &one),
                Rows::every(self.var_pool.step),
            )
            .except(Rows::every_at(height, 3 * self.var_pool.step)),
            Constraint::new(
                "bitwise/x_or_y_addr",
                &or_addr - (var_addr(3) + &one),
                every_instance,
            ),
            Constraint::new(
                "bitwise/next_var_pool_addr",
                var_addr(4) - (&or_addr + &one),
                every_instance,
            )
            .except(Rows::FromEnd(height)),
        ];

        for (value, name) in ["x", "y", "x_and_y", "x_xor_y"].into_iter().enumerate() {
            let recombined = (0..self.dilution.n_strands())
                .map(|k| {
                    self.pool_cell::<F>(self.strand(value, k))
                        * pow2::<F>(self.dilution.strand_shift(k))
                })
                .reduce(|acc, term| acc + term)
                .unwrap_or_else(|| constant::<F>(0));
            constraints.push(Constraint::new(
                format!("bitwise/partition_{name}"),
                var_value(value as isize) - recombined,
                every_instance,
            ));
        }

        constraints.push(Constraint::new(
            "bitwise/or_is_and_plus_xor",
            or_value - (var_value(2) + var_value(3)),
            every_instance,
        ));
        let d = self.strand_step();
        constraints.push(Constraint::new(
            "bitwise/addition_is_xor_with_and",
            self.pool_cell::<F>(0) + self.pool_cell::<F>(d)
                - (self.pool_cell::<F>(3 * d) + self.pool_cell::<F>(2 * d) * constant::<F>(2)),
            Rows::every(NUM_VALUES * d),
        ));

        for (j, bits) in self.trimmed_strands() {
            let or_strand = top_strand(2, j) + top_strand(3, j);
            let expr = if bits == 0 {
                or_strand
            } else {
                let shift = self.dilution.spacing * (self.dilution.n_bits - bits);
                or_strand * pow2::<F>(shift) - self.pool_cell::<F>(self.trim(j))
            };
            constraints.push(Constraint::new(
                format!("bitwise/unique_unpacking{j}"),
                expr,
                every_instance,
            ));
        }
        constraints
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let height = self.height();
        let num_instances = trace.trace_len() / height;
        let segment = trace.segment_begin("bitwise")?;
        let instances = instances_by_index(
            "bitwise",
            &trace.witness.air_private_input.bitwise,
            |instance| instance.index,
            num_instances,
        )?;
        let last_chunk = self.dilution.n_chunks() - 1;

        for (i, instance) in instances.into_iter().enumerate() {
            let instance = instance.unwrap_or_else(|| BitwiseInstance::new_empty(i as u32));
            let instance_trace = InstanceTrace::new(instance, self.dilution)?;
            let base = i * height;

            for (value, partition) in instance_trace.partitions().into_iter().enumerate() {
                for (k, &strand) in partition.iter().enumerate() {
                    trace.set_diluted(base + self.strand(value, k), self.compact(strand));
                }
            }

            for (j, bits) in self.trimmed_strands().collect::<Vec<(usize, usize)>>() {
                let k = last_chunk * self.dilution.spacing + j;
                let or_strand = self.compact(instance_trace.x_and_y_partition[k])
                    | self.compact(instance_trace.x_xor_y_partition[k]);
                if bits > 0 {
                    let trim = or_strand << (self.dilution.n_bits - bits);
                    trace.set_diluted(base + self.trim(j), trim);
                }
            }

            let addresses = instance.mem_addr(segment);
            let values = [
                instance_trace.x,
                instance_trace.y,
                instance_trace.x_and_y,
                instance_trace.x_xor_y,
            ];
            for (k, (address, value)) in addresses.into_iter().zip(values).enumerate() {
                trace.set_memory(self.var_pool.row(NUM_VALUES * i + k), address, reduce_u256(value))?;
            }
            trace.set_memory(
                self.x_or_y.row(i),
                addresses[NUM_VALUES],
                reduce_u256(instance_trace.x_or_y),
            )?;
        }
        Ok(())
    }
}
