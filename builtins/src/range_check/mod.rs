use crate::errors::Result;
use crate::utils::check_bit_len;
use binary::RangeCheckInstance;
use ruint::aliases::U256;

/// Bits per range checked part
pub const PART_BITS: usize = 16;

#[derive(Clone, Debug)]
pub struct InstanceTrace {
    pub instance: RangeCheckInstance,
    /// 16 bit parts of the value, most significant first
    pub parts: Vec<u16>,
}

impl InstanceTrace {
    pub fn new(instance: RangeCheckInstance, n_parts: usize) -> Result<Self> {
        let value = instance.value;
        check_bit_len(value, n_parts * PART_BITS)?;

        // decompose value into u16 parts
        let parts = (0..n_parts)
            .map(|i| {
                let shift = (n_parts - i - 1) * PART_BITS;
                if shift >= U256::BITS {
                    0
                } else {
                    (value >> shift).as_limbs()[0] as u16
                }
            })
            .collect();

        Ok(Self { instance, parts })
    }

    /// Recombines the parts into the checked value
    pub fn value(&self) -> U256 {
        self.parts
            .iter()
            .fold(U256::ZERO, |acc, &part| (acc << PART_BITS) + U256::from(part))
    }
}

#[cfg(test)]
mod tests {
    use super::InstanceTrace;
    use crate::Error;
    use binary::RangeCheckInstance;
    use ruint::aliases::U256;
    use ruint::uint;

    #[test]
    fn parts_are_most_significant_first() {
        let instance = RangeCheckInstance {
            index: 0,
            value: uint!(0x0001_0002_0003_0004_0005_0006_0007_0008_U256),
        };

        let trace = InstanceTrace::new(instance, 8).unwrap();

        assert_eq!(vec![1, 2, 3, 4, 5, 6, 7, 8], trace.parts);
        assert_eq!(instance.value, trace.value());
    }

    #[test]
    fn value_must_fit_the_parts() {
        let instance = RangeCheckInstance {
            index: 0,
            value: uint!(1_U256) << 128,
        };

        assert!(matches!(
            InstanceTrace::new(instance, 8),
            Err(Error::ValueTooLarge { bits: 128, .. })
        ));
        assert_eq!(9, InstanceTrace::new(instance, 9).unwrap().parts.len());
    }

    #[test]
    fn empty_instance_has_zero_parts() {
        let trace = InstanceTrace::new(RangeCheckInstance::new_empty(2), 4).unwrap();

        assert!(trace.parts.iter().all(|&p| p == 0));
        assert_eq!(U256::ZERO, trace.value());
    }
}
