use constraints::Hint;
use constraints::VerifierChallenge;

/// Public scalars the constraints are bound to. Hints of builtins a layout
/// does not carry are left unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicInputHint {
    InitialAp,
    InitialPc,
    FinalAp,
    FinalPc,
    MemoryQuotient,
    RangeCheckMin,
    RangeCheckMax,
    DilutedCheckCumulativeValue,
    InitialPedersenAddr,
    InitialRangeCheckAddr,
    InitialEcdsaAddr,
    InitialBitwiseAddr,
    InitialEcOpAddr,
}

impl PublicInputHint {
    pub const COUNT: usize = Self::InitialEcOpAddr as usize + 1;
}

impl Hint for PublicInputHint {
    fn index(&self) -> usize {
        *self as usize
    }
}

/// Symbolic memory permutation challenges
/// Note section 9.7.2 from Cairo whitepaper
/// (z − (address + α * value))
#[derive(Clone, Copy, Debug)]
pub enum MemoryPermutation {
    Z = 0, // =z
    A = 1, // =α
}

impl VerifierChallenge for MemoryPermutation {
    fn index(&self) -> usize {
        *self as usize
    }
}

/// Symbolic range check permutation challenges
/// Note section 9.7.2 from Cairo whitepaper
/// (z − value)
#[derive(Clone, Copy, Debug)]
pub enum RangeCheckPermutation {
    Z = 2, // =z
}

impl VerifierChallenge for RangeCheckPermutation {
    fn index(&self) -> usize {
        *self as usize
    }
}

/// Symbolic diluted check permutation challenges
#[derive(Clone, Copy, Debug)]
pub enum DilutedCheckPermutation {
    Z = 3, // =z
}

impl VerifierChallenge for DilutedCheckPermutation {
    fn index(&self) -> usize {
        *self as usize
    }
}

/// Symbolic diluted check aggregation challenges
#[derive(Clone, Copy, Debug)]
pub enum DilutedCheckAggregation {
    Z = 4, // =z
    A = 5, // =α
}

impl VerifierChallenge for DilutedCheckAggregation {
    fn index(&self) -> usize {
        *self as usize
    }
}

/// Number of interaction elements of the plain components
pub const NUM_PLAIN_CHALLENGES: usize = 3;

/// Number of interaction elements once the diluted pool is used
pub const NUM_DILUTED_CHALLENGES: usize = 6;

#[cfg(test)]
mod tests {
    use super::PublicInputHint;
    use constraints::Hint;

    #[test]
    fn builtin_address_hints_fit_hint_table() {
        assert_eq!(13, PublicInputHint::COUNT);
        for hint in [
            PublicInputHint::InitialPedersenAddr,
            PublicInputHint::InitialRangeCheckAddr,
            PublicInputHint::InitialEcdsaAddr,
            PublicInputHint::InitialBitwiseAddr,
            PublicInputHint::InitialEcOpAddr,
        ] {
            assert!(hint.index() < PublicInputHint::COUNT);
        }
        assert_eq!(PublicInputHint::COUNT - 1, PublicInputHint::InitialEcOpAddr.index());
    }
}
