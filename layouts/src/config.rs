use crate::errors::Error;
use crate::errors::Result;
use crate::CYCLE_HEIGHT;
use builtins::bitwise::Dilution;
use serde::Deserialize;
use serde::Serialize;

/// Number of columns a diluted value's bits are spread over
pub const DILUTED_SPACING: usize = 4;

/// Bits of a diluted value before dilution
pub const DILUTED_N_BITS: usize = 16;

/// Width of the bitwise builtin's operands
pub const BITWISE_TOTAL_N_BITS: usize = 251;

/// Parts of a range check builtin value
pub const RANGE_CHECK_N_PARTS: usize = 8;

/// Describes which builtins a layout carries and how often.
///
/// A ratio is the number of CPU steps per builtin instance so an instance of
/// a builtin with ratio `r` spans `16 * r` trace rows.
///
/// ```text
/// {
///   "name": "recursive",
///   "constraint_degree": 2,
///   "pedersen": { "ratio": 128 },
///   "range_check": { "ratio": 8, "n_parts": 8 },
///   "bitwise": { "ratio": 8, "total_n_bits": 251 },
///   "diluted_pool": { "spacing": 4, "n_bits": 16 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub name: String,
    #[serde(default = "default_constraint_degree")]
    pub constraint_degree: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedersen: Option<PedersenConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_check: Option<RangeCheckConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecdsa: Option<EcdsaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitwise: Option<BitwiseConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec_op: Option<EcOpConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keccak: Option<UnsupportedConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poseidon: Option<UnsupportedConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diluted_pool: Option<DilutedPoolConfig>,
}

fn default_constraint_degree() -> usize {
    2
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedersenConfig {
    pub ratio: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeCheckConfig {
    pub ratio: usize,
    #[serde(default = "default_range_check_n_parts")]
    pub n_parts: usize,
}

fn default_range_check_n_parts() -> usize {
    RANGE_CHECK_N_PARTS
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitwiseConfig {
    pub ratio: usize,
    #[serde(default = "default_bitwise_total_n_bits")]
    pub total_n_bits: usize,
}

fn default_bitwise_total_n_bits() -> usize {
    BITWISE_TOTAL_N_BITS
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaConfig {
    pub ratio: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcOpConfig {
    pub ratio: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DilutedPoolConfig {
    pub spacing: usize,
    pub n_bits: usize,
}

impl Default for DilutedPoolConfig {
    fn default() -> Self {
        Self {
            spacing: DILUTED_SPACING,
            n_bits: DILUTED_N_BITS,
        }
    }
}

/// Builtins whose parameters are external assets this crate does not ship
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedConfig {
    pub ratio: usize,
}

impl LayoutConfig {
    /// The layout with only the CPU, memory and 16-bit range check components
    pub fn plain() -> Self {
        Self {
            name: "plain".into(),
            constraint_degree: default_constraint_degree(),
            output: None,
            pedersen: None,
            range_check: None,
            ecdsa: None,
            bitwise: None,
            ec_op: None,
            keccak: None,
            poseidon: None,
            diluted_pool: None,
        }
    }

    /// The layout used to prove Cairo verifier executions
    pub fn recursive() -> Self {
        Self {
            name: "recursive".into(),
            output: Some(OutputConfig {}),
            pedersen: Some(PedersenConfig { ratio: 128 }),
            range_check: Some(RangeCheckConfig {
                ratio: 8,
                n_parts: RANGE_CHECK_N_PARTS,
            }),
            bitwise: Some(BitwiseConfig {
                ratio: 8,
                total_n_bits: BITWISE_TOTAL_N_BITS,
            }),
            diluted_pool: Some(DilutedPoolConfig::default()),
            ..Self::plain()
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "plain" => Ok(Self::plain()),
            "recursive" => Ok(Self::recursive()),
            _ => Err(Error::UnknownLayout(name.into())),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Names of the builtins this layout carries in segment order
    pub fn builtins(&self) -> Vec<&'static str> {
        let enabled = [
            ("output", self.output.is_some()),
            ("pedersen", self.pedersen.is_some()),
            ("range_check", self.range_check.is_some()),
            ("ecdsa", self.ecdsa.is_some()),
            ("bitwise", self.bitwise.is_some()),
            ("ec_op", self.ec_op.is_some()),
            ("keccak", self.keccak.is_some()),
            ("poseidon", self.poseidon.is_some()),
        ];
        enabled
            .into_iter()
            .filter_map(|(name, enabled)| enabled.then_some(name))
            .collect()
    }

    pub fn has_builtin(&self, name: &str) -> bool {
        self.builtins().contains(&name)
    }

    /// Diluted pool parameters. Only present if a component uses the pool.
    pub fn dilution(&self) -> Option<Dilution> {
        let bitwise = self.bitwise?;
        let pool = self.diluted_pool.unwrap_or_default();
        Some(Dilution::new(pool.spacing, pool.n_bits, bitwise.total_n_bits))
    }

    /// Checks the parameters that do not depend on the trace length
    pub fn validate(&self) -> Result<()> {
        for (name, unsupported) in [
            ("keccak", self.keccak.is_some()),
            ("poseidon", self.poseidon.is_some()),
        ] {
            if unsupported {
                return Err(Error::UnsupportedBuiltin(name.into()));
            }
        }
        if let Some(PedersenConfig { ratio }) = self.pedersen {
            check_ratio("pedersen", ratio, 32)?;
        }
        if let Some(RangeCheckConfig { ratio, n_parts }) = self.range_check {
            check_ratio("range_check", ratio, 1)?;
            // parts are spread evenly over the instance rows
            if !n_parts.is_power_of_two() || n_parts > ratio * CYCLE_HEIGHT {
                return Err(Error::InvalidRatio {
                    builtin: "range_check",
                    ratio,
                });
            }
        }
        if let Some(EcdsaConfig { ratio }) = self.ecdsa {
            // two key subset sums of 256 steps fit in an instance
            check_ratio("ecdsa", ratio, 32)?;
        }
        if let Some(EcOpConfig { ratio }) = self.ec_op {
            check_ratio("ec_op", ratio, 16)?;
        }
        if let Some(BitwiseConfig { ratio, .. }) = self.bitwise {
            check_ratio("bitwise", ratio, 4)?;
        }
        if let Some(dilution) = self.dilution() {
            let valid = dilution.spacing > 0
                && dilution.n_bits > 0
                && dilution.n_bits <= 32
                && dilution.chunk_bits() <= 256
                && dilution.total_n_bits > 0
                && dilution.total_n_bits < 252;
            if !valid {
                return Err(Error::InvalidRatio {
                    builtin: "bitwise",
                    ratio: dilution.total_n_bits,
                });
            }
        }
        Ok(())
    }
}

fn check_ratio(builtin: &'static str, ratio: usize, min: usize) -> Result<()> {
    if ratio.is_power_of_two() && ratio >= min {
        Ok(())
    } else {
        Err(Error::InvalidRatio { builtin, ratio })
    }
}
