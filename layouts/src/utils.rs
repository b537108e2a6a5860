use crate::errors::Error;
use crate::errors::Result;
use ark_ff::batch_inversion;
use ark_ff::BigInteger;
use ark_ff::Field;
use ark_ff::PrimeField;
use binary::Fp;
use binary::MemoryEntry;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Computes the value of the public memory quotient:
/// Adapted from https://github.com/starkware-libs/starkex-contracts
///
/// `public_memory_step` is the row distance between two public memory cells
/// of the memory pool.
pub fn compute_public_memory_quotient<F: PrimeField>(
    z: F,
    alpha: F,
    trace_len: usize,
    public_memory_step: usize,
    public_memory: &[MemoryEntry<F>],
    public_memory_padding: MemoryEntry<F>,
) -> Result<F> {
    // the actual number of public memory cells
    let n = public_memory.len();
    // the num of cells allocated for the pub mem (include padding)
    let s = trace_len / public_memory_step;
    if n > s {
        return Err(Error::PublicMemoryOverflow {
            len: n,
            capacity: s,
        });
    }

    // numerator = (z - (0 + alpha * 0))^S,
    let numerator = z.pow([s as u64]);
    // denominator = \prod_i( z - (addr_i + alpha * value_i) ),
    let denominator = public_memory
        .iter()
        .map(|e| z - (alpha * e.value + F::from(e.address)))
        .product::<F>();
    let padding = {
        // padding = (z - (padding_addr + alpha * padding_value))^(S - N),
        let padding_address = F::from(public_memory_padding.address);
        let padding_value = public_memory_padding.value;
        (z - (alpha * padding_value + padding_address)).pow([(s - n) as u64])
    };

    // numerator / (denominator * padding)
    let denominator_inv = (denominator * padding)
        .inverse()
        .ok_or(constraints::Error::ZeroDenominator)?;
    Ok(numerator * denominator_inv)
}

/// Source: https://github.com/starkware-libs/starkex-contracts
///
/// # Context
/// The cumulative value is defined using the following recursive formula:
///
/// $$r_1 = 1$$
/// $$r_{j+1} = r_j * (1 + z * u_j) + \alpha * u_j^2$$
///
/// (for $j >= 1$) where $u_j = Dilute(j, spacing, n_{bits}) - Dilute(j-1,
/// spacing, n_{bits})$ and we want to compute the final value
/// $r_{2^{n_{bits}}}$. Note that $u_j$ depends only on the number of trailing
/// zeros in the binary representation of $j$. Specifically,
///
/// $$u_{(1 + 2k) * 2^i} = u_{2^i} =
/// u_{2^{i - 1}} + 2^{i * spacing} - 2^{(i - 1) * spacing + 1}.$$
///
/// The recursive formula can be reduced to a nonrecursive form:
///
/// $$r_j = \prod_{i=1}^{j-1}(1 + z*u_i) + \alpha
///      * \sum_{i=1}^{j-1}(u_i^2 * \prod_{k=i + 1}^{j-1}(1 + z * u_m))$$
///
/// We rewrite this equation to generate a recursive formula that converges
/// in $log(j)$ steps: Denote:
///
/// $$p_i = \prod_{n=1}^{2^i - 1}(1 + z * u_n)$$
/// $$q_i = \sum_{n=1}^{2^i - 1}(u_n^2 * \prod_{m=n + 1}^{2^i-1}(1 + z * u_m))$$
/// $$x_i = u_{2^i}$$
///
/// Clearly $r_{2^i} = p_i + \alpha * q_i$. Moreover, due to the symmetry of the
/// sequence $$u_j, p_i = p_{i - 1} * (1 + z * x_{i - 1}) * p_{i - 1}
/// q_i = q_{i - 1} * (1 + z * x_{i - 1}) * p_{i - 1}
///         + x_{i - 1}^2 * p_{i - 1} + q_{i - 1}$$
///
/// Now we can compute $p_{n_{bits}}$ and $q_{n_{bits}}$ in '$n_{bits}$' steps
/// and we are done.
pub fn compute_diluted_cumulative_value<F: Field>(
    z: F,
    alpha: F,
    spacing: usize,
    n_bits: usize,
) -> F {
    let diff_multiplier = F::from(2u64).pow([spacing as u64]);
    let mut diff_x = diff_multiplier - F::from(2u64);
    // Initialize p, q and x to p_1, q_1 and x_0 respectively.
    let mut p = z + F::ONE;
    let mut q = F::ONE;
    let mut x = F::ONE;
    for _ in 1..n_bits {
        x += diff_x;
        diff_x *= diff_multiplier;
        // store intermediate values to save multiplications
        let xp = x * p;
        let y = p + z * xp;
        q += q * y + x * xp;
        p *= y;
    }
    p + q * alpha
}

/// Maps a Stark field element into `F`. Only meaningful if `F` has the same
/// modulus which layouts check on construction.
pub fn felt_into<F: PrimeField>(v: Fp) -> F {
    F::from_le_bytes_mod_order(&v.into_bigint().to_bytes_le())
}

/// Running product of `numerator_i / denominator_i`. Used for the
/// permutation arguments between a pool and its sorted copy.
pub fn cumulative_product<F: Field>(terms: impl IntoIterator<Item = (F, F)>) -> Vec<F> {
    let mut numerators = Vec::new();
    let mut denominators = Vec::new();
    let mut numerator_acc = F::one();
    let mut denominator_acc = F::one();
    for (numerator, denominator) in terms {
        numerator_acc *= numerator;
        denominator_acc *= denominator;
        numerators.push(numerator_acc);
        denominators.push(denominator_acc);
    }
    batch_inversion(&mut denominators);
    numerators.iter_mut().zip(denominators).for_each(|(n, d)| *n *= d);
    numerators
}

/// Fills the free cells of a pool with `padding` (in order) and then with
/// `default`. Fails if the padding does not fit.
fn fill_free<T: Copy>(
    cells: &mut [Option<T>],
    is_free: impl Fn(usize) -> bool,
    padding: &[T],
    default: T,
    pool: &'static str,
) -> Result<()> {
    let mut padding = padding.iter().copied();
    for (i, cell) in cells.iter_mut().enumerate() {
        if cell.is_none() && is_free(i) {
            *cell = Some(padding.next().unwrap_or(default));
        }
    }
    if padding.next().is_some() {
        return Err(Error::PoolExhausted(pool));
    }
    Ok(())
}

/// Memory accesses by their position in the memory pool
pub struct MemoryPool<F> {
    accesses: Vec<Option<MemoryEntry<F>>>,
    /// Every `public_step`th position is reserved for the public memory
    public_step: usize,
    public_offset: usize,
    values: BTreeMap<u32, F>,
}

impl<F: PrimeField> MemoryPool<F> {
    pub fn new(num_positions: usize, public_step: usize, public_offset: usize) -> Self {
        Self {
            accesses: vec![None; num_positions],
            public_step,
            public_offset,
            values: BTreeMap::new(),
        }
    }

    fn is_public(&self, position: usize) -> bool {
        position % self.public_step == self.public_offset
    }

    /// Records an access at the given pool position. Fails if memory at the
    /// address already has a different value.
    pub fn push(&mut self, position: usize, entry: MemoryEntry<F>) -> Result<()> {
        self.record(entry)?;
        self.accesses[position] = Some(entry);
        Ok(())
    }

    fn record(&mut self, entry: MemoryEntry<F>) -> Result<()> {
        match self.values.insert(entry.address, entry.value) {
            Some(prev) if prev != entry.value => Err(Error::MemoryMismatch {
                address: entry.address,
            }),
            _ => Ok(()),
        }
    }

    /// Number of cells reserved for the public memory
    pub fn public_capacity(&self) -> usize {
        (0..self.accesses.len())
            .filter(|&i| self.is_public(i))
            .count()
    }

    /// Returns the pool in trace order and sorted by address.
    ///
    /// Memory needs to be continuous so address gaps e.g. [..., (a:4, v:..),
    /// (a:7, v:..), ...] are filled with [(a:5, v:..), (a:6, v:..)] using
    /// the free cells of the pool. `gap_value` supplies the value of a gap
    /// address. Remaining free cells and the public memory cells that are
    /// not used take the padding entry.
    pub fn finalize(
        &mut self,
        public_memory: &[MemoryEntry<F>],
        padding_entry: MemoryEntry<F>,
        gap_value: impl Fn(u32) -> F,
    ) -> Result<(Vec<MemoryEntry<F>>, Vec<MemoryEntry<F>>)> {
        let capacity = self.public_capacity();
        if public_memory.len() > capacity {
            return Err(Error::PublicMemoryOverflow {
                len: public_memory.len(),
                capacity,
            });
        }
        for &entry in public_memory {
            self.record(entry)?;
        }

        let max_address = self.values.keys().last().copied().unwrap_or(0);
        let gaps = (1..max_address)
            .filter(|a| !self.values.contains_key(a))
            .map(|address| MemoryEntry {
                address,
                value: gap_value(address),
            })
            .collect::<Vec<MemoryEntry<F>>>();
        tracing::debug!(gaps = gaps.len(), max_address, "memory gaps");

        let (public_step, public_offset) = (self.public_step, self.public_offset);
        fill_free(
            &mut self.accesses,
            |i| i % public_step != public_offset,
            &gaps,
            padding_entry,
            "memory",
        )?;

        let public_cell = MemoryEntry {
            address: 0,
            value: F::ZERO,
        };
        let mut ordered = Vec::with_capacity(self.accesses.len());
        let mut pool = Vec::with_capacity(self.accesses.len());
        for (i, access) in std::mem::take(&mut self.accesses).into_iter().enumerate() {
            match access {
                Some(entry) if i % public_step != public_offset => {
                    ordered.push(entry);
                    pool.push(entry);
                }
                _ => pool.push(public_cell),
            }
        }
        ordered.extend_from_slice(public_memory);
        ordered.resize(pool.len(), padding_entry);
        ordered.sort_by_key(|e| e.address);

        Ok((pool, ordered))
    }
}

/// Values of the 16-bit range check pool by trace row
#[derive(Default, Debug, Clone)]
pub struct RangeCheckPool(Vec<Option<u16>>);

impl RangeCheckPool {
    pub fn new(len: usize) -> Self {
        Self(vec![None; len])
    }

    pub fn push(&mut self, row: usize, v: u16) {
        self.0[row] = Some(v)
    }

    pub fn min(&self) -> Option<u16> {
        self.0.iter().flatten().min().copied()
    }

    pub fn max(&self) -> Option<u16> {
        self.0.iter().flatten().max().copied()
    }

    /// Returns the pool in trace order and sorted.
    ///
    /// Range check values need to be continuos therefore any gaps e.g.
    /// [..., 3, 4, 7, 8, ...] need to be filled with [5, 6] as padding. The
    /// padding goes in the free cells of the pool along with copies of `max`.
    pub fn finalize(&mut self, min: u16, max: u16) -> Result<(Vec<u16>, Vec<u16>)> {
        let used = self.0.iter().flatten().copied().collect::<BTreeSet<u16>>();
        if let Some(&value) = used.iter().find(|&&v| v < min || v > max) {
            return Err(Error::RangeCheckBounds { value, min, max });
        }
        let gaps = (min..=max)
            .filter(|v| !used.contains(v))
            .collect::<Vec<u16>>();
        fill_free(&mut self.0, |_| true, &gaps, max, "range check")?;

        let pool = std::mem::take(&mut self.0)
            .into_iter()
            .map(|v| v.unwrap_or(max))
            .collect::<Vec<u16>>();
        let mut ordered = pool.clone();
        ordered.sort_unstable();
        Ok((pool, ordered))
    }
}

/// Values of the diluted pool by trace row in their regular form
#[derive(Default, Debug, Clone)]
pub struct DilutedCheckPool {
    cells: Vec<Option<u64>>,
    n_bits: usize,
}

impl DilutedCheckPool {
    pub fn new(len: usize, n_bits: usize) -> Self {
        Self {
            cells: vec![None; len],
            n_bits,
        }
    }

    /// Pushes a binary value without dilution to the pool
    pub fn push(&mut self, row: usize, v: u64) {
        debug_assert!(v >> self.n_bits == 0);
        self.cells[row] = Some(v)
    }

    /// Returns the pool in trace order and sorted (regular form).
    ///
    /// Diluted check values, in their regular form, need to be continuos and
    /// cover every value from 0 to 2^n_bits - 1. For example with SPACING=4:
    /// ```text
    /// [
    ///   0b0000_0000_0001_0001 -> regular form = 3 (0b0011)
    ///   0b0000_0001_0000_0000 -> regular form = 4 (0b0100)
    ///   0b0000_0001_0001_0001 -> regular form = 7 (0b0111)
    ///   0b0001_0000_0000_0000 -> regular form = 8 (0b1000)
    /// ]
    /// ```
    /// needs to be filled with
    /// ```text
    /// [
    ///   0b0000_0001_0000_0001 -> regular form = 5 (0b0101)
    ///   0b0000_0001_0001_0000 -> regular form = 6 (0b0110)
    /// ]
    /// ```
    /// (along with the values outside [3, 8]) as padding.
    pub fn finalize(&mut self) -> Result<(Vec<u64>, Vec<u64>)> {
        let used = self.cells.iter().flatten().copied().collect::<BTreeSet<u64>>();
        let gaps = (0..1u64 << self.n_bits)
            .filter(|v| !used.contains(v))
            .collect::<Vec<u64>>();
        fill_free(&mut self.cells, |_| true, &gaps, 0, "diluted")?;

        let pool = std::mem::take(&mut self.cells)
            .into_iter()
            .map(|v| v.unwrap_or(0))
            .collect::<Vec<u64>>();
        let mut ordered = pool.clone();
        ordered.sort_unstable();
        Ok((pool, ordered))
    }
}
