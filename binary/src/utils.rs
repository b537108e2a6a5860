use crate::errors::Error;
use crate::MemoryEntry;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use ruint::aliases::U256;
use serde::de;
use serde::Deserialize;
use serde::Deserializer;

pub fn try_felt_from_u256<F: PrimeField>(value: U256) -> Result<F, Error> {
    let value = BigUint::from(value);
    let modulus = F::MODULUS.into();
    if value < modulus {
        Ok(value.into())
    } else {
        Err(Error::InvalidFieldElement { value, modulus })
    }
}

/// Deserializes a hex string into a big integer
pub fn deserialize_hex_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let hex_str = String::deserialize(deserializer)?;
    hex_str.parse::<U256>().map_err(de::Error::custom)
}

/// Deserializes a hex string into a field element. Fails if the value is not
/// a canonical field element.
pub fn deserialize_hex_felt<'de, D: Deserializer<'de>, F: PrimeField>(
    deserializer: D,
) -> Result<F, D::Error> {
    let value = deserialize_hex_str(deserializer)?;
    try_felt_from_u256(value).map_err(de::Error::custom)
}

/// Deserializes a list of memory entries of the form
/// `{value: "0x...", address: ...}`
pub fn deserialize_hex_felt_memory_entries<'de, D: Deserializer<'de>, F: PrimeField>(
    deserializer: D,
) -> Result<Vec<MemoryEntry<F>>, D::Error> {
    #[derive(Deserialize)]
    struct Entry {
        #[serde(deserialize_with = "deserialize_hex_str")]
        pub value: U256,
        pub address: u32,
    }
    let v = Vec::<Entry>::deserialize(deserializer)?;
    v.into_iter()
        .map(|Entry { address, value }| {
            let value = try_felt_from_u256(value).map_err(de::Error::custom)?;
            Ok(MemoryEntry { address, value })
        })
        .collect()
}

/// Calculates the number of bytes per field element the
/// same way as StarkWare's runner
pub const fn field_bytes<F: PrimeField>() -> usize {
    (F::MODULUS_BIT_SIZE as usize + 7) / 8
}
