use crate::errors::Result;
use crate::utils::check_bit_len;
use binary::BitwiseInstance;
use ruint::aliases::U256;

/// Shape of the diluted strands a value is split into
///
/// A value of `total_n_bits` bits is cut into chunks of `spacing * n_bits`
/// bits. Each chunk is split into `spacing` strands where strand `j` collects
/// the bits `j, j + spacing, j + 2*spacing, ...` of the chunk and keeps them at
/// their position. For example to break up a 16 bit chunk `v` with spacing 4:
///
/// ```text
///  v = 0b1100_1010_0110_1001
/// s0 = 0b0000_0000_0000_0001
/// s1 = 0b0000_0001_0001_0000
/// s2 = 0b0001_0000_0001_0000
/// s3 = 0b0001_0001_0000_0001
/// ```
///
/// note that `v = s0 * 2^0 + s1 * 2^1 + s2 * 2^2 + s3 * 2^3` and that every
/// strand is a diluted value i.e. a value with `spacing - 1` zero bits between
/// its bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dilution {
    pub spacing: usize,
    pub n_bits: usize,
    pub total_n_bits: usize,
}

impl Dilution {
    pub const fn new(spacing: usize, n_bits: usize, total_n_bits: usize) -> Self {
        Self {
            spacing,
            n_bits,
            total_n_bits,
        }
    }

    /// Bits covered by one chunk
    pub const fn chunk_bits(&self) -> usize {
        self.spacing * self.n_bits
    }

    pub const fn n_chunks(&self) -> usize {
        (self.total_n_bits + self.chunk_bits() - 1) / self.chunk_bits()
    }

    /// Number of strands a value is split into
    pub const fn n_strands(&self) -> usize {
        self.n_chunks() * self.spacing
    }

    /// Power of two strand `k` is multiplied by when recombining a value
    pub const fn strand_shift(&self, k: usize) -> usize {
        let chunk = k / self.spacing;
        let j = k % self.spacing;
        chunk * self.chunk_bits() + j
    }

    /// Number of bits of strand `j` of the last chunk that lie below
    /// `total_n_bits`. The other bits of the strand must be zero.
    pub const fn top_strand_bits(&self, j: usize) -> usize {
        let start = (self.n_chunks() - 1) * self.chunk_bits() + j;
        if start >= self.total_n_bits {
            return 0;
        }
        let bits = (self.total_n_bits - start + self.spacing - 1) / self.spacing;
        if bits > self.n_bits {
            self.n_bits
        } else {
            bits
        }
    }

    /// Splits `v` into its strands (least significant chunk first)
    pub fn partition(&self, v: U256) -> Vec<U256> {
        let mut strands = vec![U256::ZERO; self.n_strands()];
        for (k, strand) in strands.iter_mut().enumerate() {
            let shift = self.strand_shift(k);
            for t in 0..self.n_bits {
                let bit = shift + self.spacing * t;
                if bit < U256::BITS {
                    strand.set_bit(self.spacing * t, v.bit(bit));
                }
            }
        }
        strands
    }
}

/// Dilutes input v by interspersing `spacing - 1` many 0s between its lowest
/// `n_bits` bits. E.g. `spacing=4, v=0b1111, diluted_v=0001000100010001`
pub fn dilute(v: U256, spacing: usize, n_bits: usize) -> U256 {
    let mut res = U256::ZERO;
    for i in 0..n_bits {
        res.set_bit(i * spacing, v.bit(i));
    }
    res
}

#[derive(Clone, Debug)]
pub struct InstanceTrace {
    pub instance: BitwiseInstance,
    pub x: U256,
    pub y: U256,
    pub x_and_y: U256,
    pub x_xor_y: U256,
    pub x_or_y: U256,
    pub x_partition: Vec<U256>,
    pub y_partition: Vec<U256>,
    pub x_and_y_partition: Vec<U256>,
    pub x_xor_y_partition: Vec<U256>,
}

impl InstanceTrace {
    pub fn new(instance: BitwiseInstance, dilution: Dilution) -> Result<Self> {
        let BitwiseInstance { x, y, .. } = instance;
        check_bit_len(x, dilution.total_n_bits)?;
        check_bit_len(y, dilution.total_n_bits)?;
        let x_and_y = x & y;
        let x_xor_y = x ^ y;
        let x_or_y = x | y;

        Ok(Self {
            instance,
            x,
            y,
            x_and_y,
            x_xor_y,
            x_or_y,
            x_partition: dilution.partition(x),
            y_partition: dilution.partition(y),
            x_and_y_partition: dilution.partition(x_and_y),
            x_xor_y_partition: dilution.partition(x_xor_y),
        })
    }

    /// Partitions in the order the trace stores them: x, y, x&y, x^y
    pub fn partitions(&self) -> [&[U256]; 4] {
        [
            &self.x_partition,
            &self.y_partition,
            &self.x_and_y_partition,
            &self.x_xor_y_partition,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::dilute;
    use super::Dilution;
    use super::InstanceTrace;
    use crate::Error;
    use binary::BitwiseInstance;
    use proptest::prelude::*;
    use ruint::aliases::U256;
    use ruint::uint;

    const DILUTION: Dilution = Dilution::new(4, 16, 251);

    fn recombine(dilution: &Dilution, strands: &[U256]) -> U256 {
        strands
            .iter()
            .enumerate()
            .fold(U256::ZERO, |acc, (k, s)| acc + (*s << dilution.strand_shift(k)))
    }

    #[test]
    fn dilute_works() {
        let input = U256::from(0b101u32);

        assert_eq!(U256::from(0b0001_0000_0001u32), dilute(input, 4, 16))
    }

    #[test]
    fn partition_of_a_chunk() {
        let dilution = Dilution::new(4, 4, 16);
        let strands = dilution.partition(uint!(0b1100_1010_0110_1001_U256));

        assert_eq!(
            vec![
                uint!(0b0000_0000_0000_0001_U256),
                uint!(0b0000_0001_0001_0000_U256),
                uint!(0b0001_0000_0001_0000_U256),
                uint!(0b0001_0001_0000_0001_U256),
            ],
            strands
        );
    }

    #[test]
    fn top_strands_cover_the_value_width() {
        // 4 chunks of 64 bits, the last covers bits 192..251
        assert_eq!(16, DILUTION.n_strands());
        assert_eq!([15, 15, 15, 14], [0, 1, 2, 3].map(|j| DILUTION.top_strand_bits(j)));
        let exact = Dilution::new(4, 16, 256);
        assert_eq!([16, 16, 16, 16], [0, 1, 2, 3].map(|j| exact.top_strand_bits(j)));
        let short = Dilution::new(4, 4, 17);
        assert_eq!([1, 0, 0, 0], [0, 1, 2, 3].map(|j| short.top_strand_bits(j)));
    }

    #[test]
    fn rejects_wide_operands() {
        let instance = BitwiseInstance {
            index: 0,
            x: uint!(1_U256) << 251,
            y: U256::ZERO,
        };

        assert!(matches!(
            InstanceTrace::new(instance, DILUTION),
            Err(Error::ValueTooLarge { bits: 251, .. })
        ));
    }

    proptest! {
        #[test]
        fn partitions_recombine(limbs in any::<[u64; 4]>(), other in any::<[u64; 4]>()) {
            let x = U256::from_limbs(limbs) >> 5;
            let y = U256::from_limbs(other) >> 5;
            let instance = BitwiseInstance { index: 0, x, y };

            let trace = InstanceTrace::new(instance, DILUTION).unwrap();

            prop_assert_eq!(x, recombine(&DILUTION, &trace.x_partition));
            prop_assert_eq!(trace.x_or_y, trace.x_and_y + trace.x_xor_y);
            for k in 0..DILUTION.n_strands() {
                // per strand addition never carries into the next diluted bit
                prop_assert_eq!(
                    trace.x_partition[k] + trace.y_partition[k],
                    trace.x_xor_y_partition[k] + (trace.x_and_y_partition[k] << 1)
                );
            }
        }
    }
}
