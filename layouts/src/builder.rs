use crate::components::bitwise::Bitwise;
use crate::components::cpu::Cpu;
use crate::components::diluted::DilutedCheck;
use crate::components::ec_op::EcOp;
use crate::components::ecdsa::Ecdsa;
use crate::components::memory::Memory;
use crate::components::memory::PUBLIC_MEMORY_OFFSET;
use crate::components::output::Output;
use crate::components::pedersen::Pedersen;
use crate::components::range_check::RangeCheckBuiltin;
use crate::components::rc16::RangeCheck16;
use crate::components::subset_sum::SubsetSum;
use crate::components::subset_sum::STEPS;
use crate::components::Component;
use crate::config::LayoutConfig;
use crate::errors::Error;
use crate::errors::Result;
use crate::hints::NUM_DILUTED_CHALLENGES;
use crate::hints::NUM_PLAIN_CHALLENGES;
use crate::layout::Layout;
use crate::CYCLE_HEIGHT;
use crate::MEMORY_POOL_COLUMN;
use crate::MEMORY_STEP;
use crate::NUM_PLAIN_COLUMNS;
use crate::PUBLIC_MEMORY_STEP;
use crate::RANGE_CHECK_POOL_COLUMN;
use ark_ff::BigInteger;
use ark_ff::PrimeField;
use binary::Fp;
use builtins::pedersen::PedersenParams;
use builtins::pedersen::INPUT_BITS;
use constraints::derive_mask;
use constraints::VirtualColumn;

/// Names of the columns every layout starts with
const PLAIN_COLUMNS: [&str; NUM_PLAIN_COLUMNS] = [
    "rc16/pool",
    "cpu/decode/opcode_rc",
    "rc16/sorted",
    "memory/pool",
    "memory/sorted",
    "cpu/registers",
];

/// Memory pool rows used by every CPU step as (step, offset) pairs
const CPU_MEMORY_SLOTS: [(usize, usize); 4] = [
    (CYCLE_HEIGHT, 0),
    (CYCLE_HEIGHT, 4),
    (CYCLE_HEIGHT, 8),
    (CYCLE_HEIGHT, 12),
];

/// Range check pool rows used by every CPU step for the instruction offsets
const CPU_RANGE_CHECK_SLOTS: [(usize, usize); 3] =
    [(CYCLE_HEIGHT, 0), (CYCLE_HEIGHT, 4), (CYCLE_HEIGHT, 8)];

/// Appends columns to the layout and returns their indices
fn add_columns(column_names: &mut Vec<String>, names: &[&str]) -> Vec<usize> {
    let first = column_names.len();
    column_names.extend(names.iter().map(|name| name.to_string()));
    (first..column_names.len()).collect()
}

/// Hands out the rows of a column to components. A slot is the set of rows
/// `offset, offset + step, offset + 2*step, ...`. Steps are powers of two so
/// two slots share a row iff their offsets agree modulo the smaller step.
#[derive(Clone, Debug)]
pub struct SlotAllocator {
    column: usize,
    /// Offsets are multiples of the granularity
    granularity: usize,
    used: Vec<(usize, usize)>,
}

impl SlotAllocator {
    pub fn new(column: usize, granularity: usize) -> Self {
        Self {
            column,
            granularity,
            used: Vec::new(),
        }
    }

    pub fn reserve(&mut self, step: usize, offset: usize) {
        self.used.push((step, offset));
    }

    fn collides(&self, step: usize, offset: usize) -> bool {
        self.used.iter().any(|&(used_step, used_offset)| {
            let m = used_step.min(step);
            used_offset % m == offset % m
        })
    }

    /// Allocates the first free slot with the given step
    pub fn allocate(&mut self, step: usize, owner: &'static str) -> Result<VirtualColumn> {
        if !step.is_power_of_two() || step < self.granularity {
            return Err(Error::PoolExhausted(owner));
        }
        let offset = (0..step)
            .step_by(self.granularity)
            .find(|&offset| !self.collides(step, offset))
            .ok_or(Error::PoolExhausted(owner))?;
        self.reserve(step, offset);
        Ok(VirtualColumn::new(self.column, step, offset))
    }
}

/// Assembles the components of a layout for a fixed trace length
#[derive(Clone, Debug)]
pub struct LayoutBuilder {
    config: LayoutConfig,
    trace_len: usize,
    pedersen_params: Option<PedersenParams>,
}

impl LayoutBuilder {
    pub fn new(config: LayoutConfig, trace_len: usize) -> Self {
        Self {
            config,
            trace_len,
            pedersen_params: None,
        }
    }

    /// Points of the Pedersen hash. Required if the layout has the Pedersen
    /// builtin.
    pub fn with_pedersen_params(mut self, params: PedersenParams) -> Self {
        self.pedersen_params = Some(params);
        self
    }

    pub fn build<F: PrimeField>(self) -> Result<Layout<F>> {
        let Self {
            config,
            trace_len: n,
            pedersen_params,
        } = self;

        // builtins and pools operate on the Stark field
        if F::MODULUS.to_bytes_le() != Fp::MODULUS.to_bytes_le() {
            return Err(Error::UnsupportedField);
        }
        config.validate()?;
        if !n.is_power_of_two() || n < CYCLE_HEIGHT {
            return Err(Error::InvalidTraceLength(n));
        }
        let check_height = |height: usize| {
            if height <= n {
                Ok(())
            } else {
                Err(Error::InvalidTraceLength(n))
            }
        };

        let mut column_names = PLAIN_COLUMNS.map(String::from).to_vec();

        let mut memory = SlotAllocator::new(MEMORY_POOL_COLUMN, MEMORY_STEP);
        for (step, offset) in CPU_MEMORY_SLOTS {
            memory.reserve(step, offset);
        }
        memory.reserve(PUBLIC_MEMORY_STEP, PUBLIC_MEMORY_OFFSET);
        let mut range_check = SlotAllocator::new(RANGE_CHECK_POOL_COLUMN, 1);
        for (step, offset) in CPU_RANGE_CHECK_SLOTS {
            range_check.reserve(step, offset);
        }

        // main columns
        let pedersen_columns = config.pedersen.map(|_| {
            add_columns(
                &mut column_names,
                &[
                    "pedersen/partial_sum_x",
                    "pedersen/partial_sum_y",
                    "pedersen/suffix",
                    "pedersen/slope",
                    "pedersen/bit_unpacking",
                ],
            )
        });
        let diluted_columns = config.dilution().map(|_| {
            add_columns(
                &mut column_names,
                &["diluted_check/pool", "diluted_check/sorted"],
            )
        });
        let ecdsa_columns = config.ecdsa.map(|_| {
            add_columns(
                &mut column_names,
                &[
                    "ecdsa/key/partial_sum_x",
                    "ecdsa/key/partial_sum_y",
                    "ecdsa/key/suffix",
                    "ecdsa/key/slope",
                    "ecdsa/key/x_diff_inv",
                    "ecdsa/key/doubling_x",
                    "ecdsa/key/doubling_y",
                    "ecdsa/key/doubling_slope",
                    "ecdsa/generator/partial_sum_x",
                    "ecdsa/generator/partial_sum_y",
                    "ecdsa/generator/suffix",
                    "ecdsa/generator/slope",
                    "ecdsa/generator/x_diff_inv",
                    "ecdsa/instance_cells",
                ],
            )
        });
        let ec_op_columns = config.ec_op.map(|_| {
            add_columns(
                &mut column_names,
                &[
                    "ec_op/partial_sum_x",
                    "ec_op/partial_sum_y",
                    "ec_op/slope",
                    "ec_op/x_diff_inv",
                    "ec_op/suffix",
                    "ec_op/doubled_x",
                    "ec_op/doubled_y",
                    "ec_op/doubling_slope",
                    "ec_op/bit_unpacking",
                ],
            )
        });
        let num_main_columns = column_names.len();

        // interaction columns
        let rc16_columns = add_columns(&mut column_names, &["rc16/perm/cum_prod"]);
        let memory_columns = add_columns(&mut column_names, &["memory/perm/cum_prod"]);
        let diluted_interaction_columns = diluted_columns.as_ref().map(|_| {
            add_columns(
                &mut column_names,
                &["diluted_check/permutation/cum_prod", "diluted_check/aggregate"],
            )
        });

        let mut components: Vec<Box<dyn Component<F>>> = vec![
            Box::new(Cpu),
            Box::new(Memory {
                cumulative_product: memory_columns[0],
            }),
            Box::new(RangeCheck16 {
                cumulative_product: rc16_columns[0],
            }),
        ];

        if let (Some(dilution), Some(main), Some(interaction)) = (
            config.dilution(),
            &diluted_columns,
            &diluted_interaction_columns,
        ) {
            components.push(Box::new(DilutedCheck {
                dilution,
                pool: main[0],
                sorted: main[1],
                permutation: interaction[0],
                aggregation: interaction[1],
            }));
        }

        if config.output.is_some() {
            components.push(Box::new(Output));
        }

        let mut num_periodic_columns = 0;
        if let (Some(pedersen), Some(columns)) = (config.pedersen, &pedersen_columns) {
            let params = pedersen_params.ok_or(Error::MissingPedersenParams)?;
            let height = CYCLE_HEIGHT * pedersen.ratio;
            check_height(height)?;
            let step = height / (2 * STEPS);
            let component = Pedersen {
                params,
                ratio: pedersen.ratio,
                subset_sum: SubsetSum::new(
                    [columns[0], columns[1], columns[2], columns[3]],
                    step,
                    INPUT_BITS,
                ),
                bit_unpacking: VirtualColumn::new(columns[4], step, 0),
                input0: memory.allocate(height, "pedersen")?,
                input1: memory.allocate(height, "pedersen")?,
                output: memory.allocate(height, "pedersen")?,
                periodic_offset: num_periodic_columns,
            };
            num_periodic_columns += 2;
            components.push(Box::new(component));
        }

        if let Some(builtin) = config.range_check {
            let height = CYCLE_HEIGHT * builtin.ratio;
            check_height(height)?;
            components.push(Box::new(RangeCheckBuiltin {
                ratio: builtin.ratio,
                n_parts: builtin.n_parts,
                memory: memory.allocate(height, "range_check")?,
                parts: range_check.allocate(height / builtin.n_parts, "range_check")?,
            }));
        }

        if let (Some(builtin), Some(columns)) = (config.ecdsa, &ecdsa_columns) {
            let height = CYCLE_HEIGHT * builtin.ratio;
            check_height(height)?;
            let mut ecdsa_columns = [0; 14];
            ecdsa_columns.copy_from_slice(columns);
            components.push(Box::new(Ecdsa::new(
                builtin.ratio,
                ecdsa_columns,
                height,
                memory.allocate(height, "ecdsa")?,
                memory.allocate(height, "ecdsa")?,
                num_periodic_columns,
            )));
            num_periodic_columns += 2;
        }

        if let (Some(builtin), Some(dilution), Some(main)) =
            (config.bitwise, config.dilution(), &diluted_columns)
        {
            let height = CYCLE_HEIGHT * builtin.ratio;
            check_height(height)?;
            let num_strand_cells = 4 * dilution.n_strands();
            let strand_step = height / num_strand_cells;
            if height % num_strand_cells != 0 || !strand_step.is_power_of_two() || strand_step < 2
            {
                return Err(Error::InvalidRatio {
                    builtin: "bitwise",
                    ratio: builtin.ratio,
                });
            }
            components.push(Box::new(Bitwise {
                ratio: builtin.ratio,
                dilution,
                pool: main[0],
                var_pool: memory.allocate(height / 4, "bitwise")?,
                x_or_y: memory.allocate(height, "bitwise")?,
            }));
        }

        if let (Some(builtin), Some(columns)) = (config.ec_op, &ec_op_columns) {
            let height = CYCLE_HEIGHT * builtin.ratio;
            check_height(height)?;
            let mut ec_columns = [0; 9];
            ec_columns.copy_from_slice(columns);
            components.push(Box::new(EcOp::new(
                builtin.ratio,
                ec_columns,
                height / STEPS,
                memory.allocate(height / 8, "ec_op")?,
            )));
        }

        let mut constraints = Vec::new();
        let mut periodic_columns = Vec::new();
        for component in &components {
            constraints.extend(component.constraints());
            periodic_columns.extend(component.periodic_columns(n)?);
        }
        debug_assert_eq!(num_periodic_columns, periodic_columns.len());
        let mask = derive_mask(&constraints);
        let num_challenges = if config.dilution().is_some() {
            NUM_DILUTED_CHALLENGES
        } else {
            NUM_PLAIN_CHALLENGES
        };

        tracing::info!(
            layout = config.name,
            trace_len = n,
            num_columns = column_names.len(),
            num_constraints = constraints.len(),
            mask_len = mask.len(),
            "built layout"
        );

        Ok(Layout::from_parts(
            config,
            n,
            column_names,
            num_main_columns,
            num_challenges,
            components,
            constraints,
            periodic_columns,
            mask,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::add_columns;
    use super::SlotAllocator;
    use crate::Error;

    #[test]
    fn slots_are_first_fit() {
        let mut allocator = SlotAllocator::new(3, 2);
        allocator.reserve(16, 0);
        allocator.reserve(8, 2);

        let a = allocator.allocate(16, "a").unwrap();
        let b = allocator.allocate(32, "b").unwrap();
        let c = allocator.allocate(4, "c");

        assert_eq!((16, 4), (a.step, a.offset));
        assert_eq!((32, 6), (b.step, b.offset));
        // every even offset mod 4 is taken
        assert!(matches!(c, Err(Error::PoolExhausted("c"))));
    }

    #[test]
    fn slots_with_larger_steps_interleave() {
        let mut allocator = SlotAllocator::new(0, 1);
        allocator.reserve(2, 0);

        let a = allocator.allocate(4, "a").unwrap();
        let b = allocator.allocate(4, "b").unwrap();

        assert_eq!(1, a.offset);
        assert_eq!(3, b.offset);
    }

    #[test]
    fn columns_are_appended_in_order() {
        let mut names = vec!["a".to_string()];

        let first = add_columns(&mut names, &["b", "c"]);
        let second = add_columns(&mut names, &["d"]);

        assert_eq!(vec![1, 2], first);
        assert_eq!(vec![3], second);
        assert_eq!(4, names.len());
    }
}
