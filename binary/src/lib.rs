use ark_ff::Field;
use ark_ff::PrimeField;
use num_bigint::BigUint;
use ruint::aliases::U256;
use ruint::uint;
use serde::Deserialize;
use serde::Serialize;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::marker::PhantomData;
use std::ops::Deref;
use std::path::PathBuf;
use utils::deserialize_hex_felt_memory_entries;
use utils::deserialize_hex_str;
use utils::field_bytes;
use utils::try_felt_from_u256;

mod errors;
mod field;
pub mod utils;

pub use errors::Error;
pub use errors::Result;
pub use field::Fp;
pub use field::StarkFpConfig;

// https://eprint.iacr.org/2021/1063.pdf figure 3
/// Word offset of `off_DST`
pub const OFF_DST_BIT_OFFSET: usize = 0;
/// Word offset of `off_OP0`
pub const OFF_OP0_BIT_OFFSET: usize = 16;
/// Word offset of `off_OP1`
pub const OFF_OP1_BIT_OFFSET: usize = 32;
/// Word offset of instruction flags
pub const FLAGS_BIT_OFFSET: usize = 48;

/// Number of Cairo instruction flags
pub const NUM_FLAGS: usize = 16;

// Mask for word offsets (16 bits each)
pub const OFF_MASK: usize = 0xFFFF;

pub const OFFSET: usize = 2usize.pow(16);
pub const HALF_OFFSET: usize = 2usize.pow(15);

/// Holds register values
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterState {
    pub ap: usize,
    pub fp: usize,
    pub pc: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RegisterStates(Vec<RegisterState>);

impl RegisterStates {
    pub fn new(states: Vec<RegisterState>) -> Self {
        Self(states)
    }

    /// Parses trace data in the format outputted by a `cairo-run`.
    pub fn from_reader(r: impl Read) -> Result<Self> {
        let mut reader = BufReader::new(r);
        let mut register_states = Vec::new();
        while !reader.fill_buf()?.is_empty() {
            let entry: RegisterState = bincode::deserialize_from(&mut reader)?;
            register_states.push(entry);
        }
        Ok(RegisterStates(register_states))
    }
}

impl Deref for RegisterStates {
    type Target = Vec<RegisterState>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct Memory<F>(Vec<Option<Word<F>>>);

impl<F: Field> Memory<F> {
    pub fn new(cells: Vec<Option<Word<F>>>) -> Self {
        Self(cells)
    }

    /// Builds memory from `(address, value)` pairs. Unset addresses are
    /// `None`.
    pub fn from_entries(entries: impl IntoIterator<Item = (usize, U256)>) -> Self {
        let mut memory = Vec::new();
        for (address, value) in entries {
            if memory.len() <= address {
                memory.resize(address + 1, None);
            }
            memory[address] = Some(Word::new(value));
        }
        Memory(memory)
    }

    /// Parses the partial memory data outputted by a `cairo-run`.
    ///
    /// The file holds the program, execution and builtin segments one after
    /// another as `(address: u64, value: [u8; field_bytes])` records.
    pub fn from_reader(r: impl Read) -> Result<Self>
    where
        F: PrimeField,
    {
        let mut reader = BufReader::new(r);
        let mut partial_memory = Vec::new();
        let mut word_bytes = vec![0; field_bytes::<F>()];
        while !reader.fill_buf()?.is_empty() {
            let address: u64 = bincode::deserialize_from(&mut reader)?;
            reader.read_exact(&mut word_bytes)?;
            let word = U256::try_from_le_slice(&word_bytes).unwrap_or(U256::MAX);
            // rejects words that are not field elements
            try_felt_from_u256::<F>(word)?;
            let address = usize::try_from(address).map_err(|_| Error::AddressOverflow(0))?;
            partial_memory.push((address, word));
        }
        Ok(Self::from_entries(partial_memory))
    }

    pub fn get(&self, address: usize) -> Result<Word<F>> {
        self.0
            .get(address)
            .copied()
            .flatten()
            .ok_or(Error::MissingMemory(address))
    }
}

impl<F> Deref for Memory<F> {
    type Target = Vec<Option<Word<F>>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryEntry<T> {
    pub address: u32,
    pub value: T,
}

impl MemoryEntry<U256> {
    /// Converts into an equivalent memory entry where the value is a field
    /// element. Returns none if the value is outside the range of the field.
    pub fn try_into_felt_entry<F: PrimeField>(self) -> Option<MemoryEntry<F>> {
        let value = try_felt_from_u256(self.value).ok()?;
        Some(MemoryEntry {
            address: self.address,
            value,
        })
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub begin_addr: u32,
    pub stop_ptr: u32,
}

impl Segment {
    pub fn len(&self) -> u32 {
        self.stop_ptr.saturating_sub(self.begin_addr)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Address ranges of the memory segments. Builtin segments are present iff
/// the program used the builtin.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemorySegments {
    pub program: Segment,
    pub execution: Segment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pedersen: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_check: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecdsa: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitwise: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec_op: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keccak: Option<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poseidon: Option<Segment>,
}

impl Default for Segment {
    fn default() -> Self {
        Self {
            begin_addr: 1,
            stop_ptr: 1,
        }
    }
}

impl MemorySegments {
    /// Builtin segments by name in the order Cairo assigns them
    pub fn builtins(&self) -> [(&'static str, Option<Segment>); 8] {
        [
            ("output", self.output),
            ("pedersen", self.pedersen),
            ("range_check", self.range_check),
            ("ecdsa", self.ecdsa),
            ("bitwise", self.bitwise),
            ("ec_op", self.ec_op),
            ("keccak", self.keccak),
            ("poseidon", self.poseidon),
        ]
    }

    pub fn builtin(&self, name: &str) -> Option<Segment> {
        self.builtins()
            .into_iter()
            .find(|(n, _)| *n == name)
            .and_then(|(_, segment)| segment)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(bound = "F: PrimeField")]
pub struct AirPublicInput<F: Field> {
    pub rc_min: u16,
    pub rc_max: u16,
    pub n_steps: u64,
    pub layout: String,
    pub memory_segments: MemorySegments,
    #[serde(
        deserialize_with = "deserialize_hex_felt_memory_entries",
        serialize_with = "serialize_felt_memory_entries"
    )]
    pub public_memory: Vec<MemoryEntry<F>>,
}

impl<F: PrimeField> AirPublicInput<F> {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn initial_pc(&self) -> u32 {
        self.memory_segments.program.begin_addr
    }

    pub fn final_pc(&self) -> u32 {
        self.memory_segments.program.stop_ptr
    }

    pub fn initial_ap(&self) -> u32 {
        self.memory_segments.execution.begin_addr
    }

    pub fn final_ap(&self) -> u32 {
        self.memory_segments.execution.stop_ptr
    }

    /// The entry used to pad the public memory slots of the memory pool
    pub fn public_memory_padding(&self) -> Result<MemoryEntry<F>> {
        self.public_memory
            .iter()
            .find(|e| e.address == 1)
            .copied()
            .ok_or(Error::MissingPublicMemoryPadding)
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_felt_memory_entries<S: serde::Serializer, F: PrimeField>(
    entries: &Vec<MemoryEntry<F>>,
    serializer: S,
) -> core::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = serializer.serialize_seq(Some(entries.len()))?;
    for entry in entries {
        let value: BigUint = entry.value.into_bigint().into();
        seq.serialize_element(&MemoryEntry {
            address: entry.address,
            value: format!("{value:#x}"),
        })?;
    }
    seq.end()
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct PedersenInstance {
    pub index: u32,
    #[serde(rename = "x", deserialize_with = "deserialize_hex_str")]
    pub a: U256,
    #[serde(rename = "y", deserialize_with = "deserialize_hex_str")]
    pub b: U256,
}

impl PedersenInstance {
    pub fn new_empty(index: u32) -> Self {
        Self {
            index,
            a: U256::ZERO,
            b: U256::ZERO,
        }
    }

    /// Get the memory address for this instance
    /// Output is of the form [a_addr, b_addr, output_addr]
    pub fn mem_addr(&self, pedersen_segment_addr: u32) -> [u32; 3] {
        let instance_offset = pedersen_segment_addr + self.index * 3;
        [instance_offset, instance_offset + 1, instance_offset + 2]
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct RangeCheckInstance {
    pub index: u32,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub value: U256,
}

impl RangeCheckInstance {
    pub fn new_empty(index: u32) -> Self {
        Self {
            index,
            value: U256::ZERO,
        }
    }

    /// Get the memory address for this instance
    pub fn mem_addr(&self, range_check_segment_addr: u32) -> u32 {
        range_check_segment_addr + self.index
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct BitwiseInstance {
    pub index: u32,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub x: U256,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub y: U256,
}

impl BitwiseInstance {
    pub fn new_empty(index: u32) -> Self {
        Self {
            index,
            x: U256::ZERO,
            y: U256::ZERO,
        }
    }

    /// Get the memory address for this instance
    /// Output is of the form [x_addr, y_addr, x&y_addr, x^y_addr, x|y_addr]
    pub fn mem_addr(&self, bitwise_segment_addr: u32) -> [u32; 5] {
        let instance_offset = bitwise_segment_addr + self.index * 5;
        core::array::from_fn(|i| instance_offset + i as u32)
    }
}

/// Elliptic Curve operation instance for `p + m * q` on an elliptic curve
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct EcOpInstance {
    pub index: u32,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub p_x: U256,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub p_y: U256,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub q_x: U256,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub q_y: U256,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub m: U256,
}

impl EcOpInstance {
    /// Get the memory address for this instance
    /// Output is of the form [p_x_addr, p_y_addr, q_x_addr, q_y_addr, m_addr,
    /// r_x_addr, r_y_addr]
    pub fn mem_addr(&self, ec_op_segment_addr: u32) -> [u32; 7] {
        let instance_offset = ec_op_segment_addr + self.index * 7;
        core::array::from_fn(|i| instance_offset + i as u32)
    }
}

#[derive(Deserialize, Clone, Copy, Debug)]
pub struct Signature {
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub r: U256,
    #[serde(deserialize_with = "deserialize_hex_str")]
    pub w: U256,
}

/// A signature check. Only the x coordinate of the public key is written to
/// memory and either of the two matching curve points may verify.
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct EcdsaInstance {
    pub index: u32,
    #[serde(rename = "pubkey", deserialize_with = "deserialize_hex_str")]
    pub pubkey_x: U256,
    #[serde(rename = "msg", deserialize_with = "deserialize_hex_str")]
    pub message: U256,
    #[serde(rename = "signature_input")]
    pub signature: Signature,
}

impl EcdsaInstance {
    /// Get the memory address for this instance
    /// Output is of the form [pubkey_addr, msg_addr]
    pub fn mem_addr(&self, ecdsa_segment_addr: u32) -> [u32; 2] {
        let instance_offset = ecdsa_segment_addr + self.index * 2;
        [instance_offset, instance_offset + 1]
    }
}

#[derive(Debug, Deserialize)]
pub struct AirPrivateInput {
    pub trace_path: PathBuf,
    pub memory_path: PathBuf,
    #[serde(default)]
    pub pedersen: Vec<PedersenInstance>,
    #[serde(default)]
    pub range_check: Vec<RangeCheckInstance>,
    #[serde(default)]
    pub bitwise: Vec<BitwiseInstance>,
    #[serde(default)]
    pub ecdsa: Vec<EcdsaInstance>,
    #[serde(default)]
    pub ec_op: Vec<EcOpInstance>,
}

/// Represents a Cairo word
/// Value is a field element in the range `[0, Fp::MODULUS)`
/// Stored as a U256 to make binary decompositions more efficient
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Word<F>(pub U256, PhantomData<F>);

impl<F> Word<F> {
    pub const fn new(word: U256) -> Self {
        Word(word, PhantomData)
    }

    /// Calculates $\tilde{f_i}$ - https://eprint.iacr.org/2021/1063.pdf
    pub fn get_flag_prefix(&self, flag: Flag) -> u16 {
        if flag == Flag::Zero {
            return 0;
        }

        let flag = flag as usize;
        let prefix = self.0 >> (FLAGS_BIT_OFFSET + flag);
        let mask = (uint!(1_U256) << (15 - flag)) - uint!(1_U256);
        // masked to at most 15 bits
        (prefix & mask).as_limbs()[0] as u16
    }

    fn offset_at(&self, bit_offset: usize) -> u16 {
        let prefix = self.0 >> bit_offset;
        (prefix & U256::from(OFF_MASK)).as_limbs()[0] as u16
    }

    pub fn get_off_dst(&self) -> u16 {
        self.offset_at(OFF_DST_BIT_OFFSET)
    }

    pub fn get_off_op0(&self) -> u16 {
        self.offset_at(OFF_OP0_BIT_OFFSET)
    }

    pub fn get_off_op1(&self) -> u16 {
        self.offset_at(OFF_OP1_BIT_OFFSET)
    }

    pub fn get_flag(&self, flag: Flag) -> bool {
        self.0.bit(FLAGS_BIT_OFFSET + flag as usize)
    }

    pub fn get_flag_group(&self, flag_group: FlagGroup) -> u8 {
        match flag_group {
            FlagGroup::DstReg => self.get_flag(Flag::DstReg) as u8,
            FlagGroup::Op0Reg => self.get_flag(Flag::Op0Reg) as u8,
            FlagGroup::Op1Src => {
                self.get_flag(Flag::Op1Imm) as u8
                    + self.get_flag(Flag::Op1Fp) as u8 * 2
                    + self.get_flag(Flag::Op1Ap) as u8 * 4
            }
            FlagGroup::ResLogic => {
                self.get_flag(Flag::ResAdd) as u8 + self.get_flag(Flag::ResMul) as u8 * 2
            }
            FlagGroup::PcUpdate => {
                self.get_flag(Flag::PcJumpAbs) as u8
                    + self.get_flag(Flag::PcJumpRel) as u8 * 2
                    + self.get_flag(Flag::PcJnz) as u8 * 4
            }
            FlagGroup::ApUpdate => {
                self.get_flag(Flag::ApAdd) as u8 + self.get_flag(Flag::ApAdd1) as u8 * 2
            }
            FlagGroup::Opcode => {
                self.get_flag(Flag::OpcodeCall) as u8
                    + self.get_flag(Flag::OpcodeRet) as u8 * 2
                    + self.get_flag(Flag::OpcodeAssertEq) as u8 * 4
            }
        }
    }

    /// `base + off - 2^15` for a biased 16 bit offset
    fn biased_addr(pc: usize, base: usize, off: u16) -> Result<usize> {
        (base + off as usize)
            .checked_sub(HALF_OFFSET)
            .ok_or(Error::AddressOverflow(pc))
    }

    pub fn get_op0_addr(&self, pc: usize, ap: usize, fp: usize) -> Result<usize> {
        let base = if self.get_flag(Flag::Op0Reg) { fp } else { ap };
        Self::biased_addr(pc, base, self.get_off_op0())
    }

    pub fn get_dst_addr(&self, pc: usize, ap: usize, fp: usize) -> Result<usize> {
        let base = if self.get_flag(Flag::DstReg) { fp } else { ap };
        Self::biased_addr(pc, base, self.get_off_dst())
    }
}

impl<F: PrimeField> Word<F> {
    pub fn into_felt(self) -> F {
        BigUint::from(self.0).into()
    }

    pub fn get_op0(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<F> {
        Ok(mem.get(self.get_op0_addr(pc, ap, fp)?)?.into_felt())
    }

    pub fn get_dst(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<F> {
        Ok(mem.get(self.get_dst_addr(pc, ap, fp)?)?.into_felt())
    }

    pub fn get_op1_addr(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<usize> {
        let base = match self.get_flag_group(FlagGroup::Op1Src) {
            0 => {
                let op0 = mem.get(self.get_op0_addr(pc, ap, fp)?)?.0;
                usize::try_from(op0).map_err(|_| Error::AddressOverflow(pc))?
            }
            1 => pc,
            2 => fp,
            4 => ap,
            _ => {
                return Err(Error::InvalidInstruction {
                    pc,
                    group: FlagGroup::Op1Src,
                })
            }
        };
        Self::biased_addr(pc, base, self.get_off_op1())
    }

    pub fn get_op1(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<F> {
        Ok(mem.get(self.get_op1_addr(pc, ap, fp, mem)?)?.into_felt())
    }

    pub fn get_res(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<F> {
        let pc_update = self.get_flag_group(FlagGroup::PcUpdate);
        let res_logic = self.get_flag_group(FlagGroup::ResLogic);
        match pc_update {
            4 => {
                let opcode = self.get_flag_group(FlagGroup::Opcode);
                let ap_update = self.get_flag_group(FlagGroup::ApUpdate);
                if res_logic == 0 && opcode == 0 && ap_update != 1 {
                    // From the Cairo whitepaper "We use the term Unused to
                    // describe a variable that will not be used later in the
                    // flow. As such, we don't need to assign it a concrete
                    // value.". Note `res` is repurposed when calculating next_pc and
                    // stores the value of `dst^(-1)`.
                    Ok(self.get_dst(pc, ap, fp, mem)?.inverse().unwrap_or_else(F::zero))
                } else {
                    Err(Error::InvalidInstruction {
                        pc,
                        group: FlagGroup::PcUpdate,
                    })
                }
            }
            0..=2 => {
                let op0 = self.get_op0(pc, ap, fp, mem)?;
                let op1 = self.get_op1(pc, ap, fp, mem)?;
                match res_logic {
                    0 => Ok(op1),
                    1 => Ok(op0 + op1),
                    2 => Ok(op0 * op1),
                    _ => Err(Error::InvalidInstruction {
                        pc,
                        group: FlagGroup::ResLogic,
                    }),
                }
            }
            _ => Err(Error::InvalidInstruction {
                pc,
                group: FlagGroup::PcUpdate,
            }),
        }
    }

    pub fn get_tmp0(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<F> {
        if self.get_flag(Flag::PcJnz) {
            self.get_dst(pc, ap, fp, mem)
        } else {
            Ok(F::zero())
        }
    }

    pub fn get_tmp1(&self, pc: usize, ap: usize, fp: usize, mem: &Memory<F>) -> Result<F> {
        Ok(self.get_tmp0(pc, ap, fp, mem)? * self.get_res(pc, ap, fp, mem)?)
    }
}

/// Cairo flag group
/// https://eprint.iacr.org/2021/1063.pdf section 9.4
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagGroup {
    DstReg,
    Op0Reg,
    Op1Src,
    ResLogic,
    PcUpdate,
    ApUpdate,
    Opcode,
}

/// Cairo flag
/// https://eprint.iacr.org/2021/1063.pdf section 9
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::EnumIter)]
#[repr(u16)]
pub enum Flag {
    // Group: [FlagGroup::DstReg]
    DstReg = 0,

    // Group: [FlagGroup::Op0]
    Op0Reg = 1,

    // Group: [FlagGroup::Op1Src]
    Op1Imm = 2,
    Op1Fp = 3,
    Op1Ap = 4,

    // Group: [FlagGroup::ResLogic]
    ResAdd = 5,
    ResMul = 6,

    // Group: [FlagGroup::PcUpdate]
    PcJumpAbs = 7,
    PcJumpRel = 8,
    PcJnz = 9,

    // Group: [FlagGroup::ApUpdate]
    ApAdd = 10,
    ApAdd1 = 11,

    // Group: [FlagGroup::Opcode]
    OpcodeCall = 12,
    OpcodeRet = 13,
    OpcodeAssertEq = 14,

    // 0 - padding to make flag cells a power-of-2
    Zero = 15,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruint::uint;
    use strum::IntoEnumIterator;

    // `[ap] = imm` with the immediate at `pc + 1`
    const ASSERT_EQ_IMM: U256 = uint!(0x400680017fff8000_U256);

    fn memory(entries: &[(usize, u64)]) -> Memory<Fp> {
        Memory::from_entries(entries.iter().map(|&(a, v)| (a, U256::from(v))))
    }

    #[test]
    fn decodes_assert_eq_with_immediate() {
        let word = Word::<Fp>::new(ASSERT_EQ_IMM);

        assert_eq!(0x8000, word.get_off_dst());
        assert_eq!(0x7fff, word.get_off_op0());
        assert_eq!(0x8001, word.get_off_op1());
        assert!(!word.get_flag(Flag::DstReg));
        assert!(word.get_flag(Flag::Op0Reg));
        assert!(word.get_flag(Flag::Op1Imm));
        assert!(word.get_flag(Flag::OpcodeAssertEq));
        assert_eq!(4, word.get_flag_group(FlagGroup::Opcode));
        assert_eq!(0, word.get_flag_group(FlagGroup::ApUpdate));
    }

    #[test]
    fn flag_prefixes_shift_down() {
        let word = Word::<Fp>::new(ASSERT_EQ_IMM);
        for flag in Flag::iter().filter(|f| *f != Flag::Zero) {
            let curr = word.get_flag_prefix(flag);
            let next = match Flag::iter().nth(flag as usize + 1) {
                Some(next) => word.get_flag_prefix(next),
                None => 0,
            };
            assert_eq!(word.get_flag(flag) as u16, curr - 2 * next);
        }
        assert_eq!(0, word.get_flag_prefix(Flag::Zero));
    }

    #[test]
    fn computes_operands_from_memory() {
        let mem = memory(&[(1, 0x400680017fff8000), (2, 7), (3, 7)]);
        let word = mem.get(1).unwrap();
        let (pc, ap, fp) = (1, 3, 3);

        assert_eq!(3, word.get_dst_addr(pc, ap, fp).unwrap());
        assert_eq!(2, word.get_op0_addr(pc, ap, fp).unwrap());
        assert_eq!(2, word.get_op1_addr(pc, ap, fp, &mem).unwrap());
        assert_eq!(Fp::from(7u8), word.get_dst(pc, ap, fp, &mem).unwrap());
        assert_eq!(Fp::from(7u8), word.get_res(pc, ap, fp, &mem).unwrap());
        assert_eq!(Fp::from(0u8), word.get_tmp1(pc, ap, fp, &mem).unwrap());
    }

    #[test]
    fn missing_memory_is_an_error() {
        let mem = memory(&[(1, 0x400680017fff8000)]);
        let word = mem.get(1).unwrap();
        assert!(matches!(
            word.get_op1(1, 3, 3, &mem),
            Err(Error::MissingMemory(2))
        ));
    }

    #[test]
    fn parses_public_input() {
        let json = r#"{
            "rc_min": 32767,
            "rc_max": 32769,
            "n_steps": 1,
            "layout": "plain",
            "memory_segments": {
                "program": { "begin_addr": 1, "stop_ptr": 3 },
                "execution": { "begin_addr": 3, "stop_ptr": 3 }
            },
            "public_memory": [
                { "address": 1, "value": "0x400680017fff8000", "page": 0 },
                { "address": 2, "value": "0x7", "page": 0 }
            ]
        }"#;
        let public_input = AirPublicInput::<Fp>::from_json(json).unwrap();

        assert_eq!(1, public_input.initial_pc());
        assert_eq!(3, public_input.final_pc());
        assert_eq!(3, public_input.initial_ap());
        assert_eq!(None, public_input.memory_segments.builtin("pedersen"));
        assert_eq!(
            Fp::from(7u8),
            public_input.public_memory[1].value,
        );
        assert_eq!(1, public_input.public_memory_padding().unwrap().address);
    }

    #[test]
    fn parses_ecdsa_instances() {
        let json = r#"{
            "trace_path": "trace.bin",
            "memory_path": "memory.bin",
            "ecdsa": [{
                "index": 2,
                "pubkey": "0x1ef15c18599971b7beced415a40f0c7deacfd9b0d1819e03d723d8bc943cfca",
                "msg": "0x2",
                "signature_input": { "r": "0x3", "w": "0x4" }
            }]
        }"#;

        let input: AirPrivateInput = serde_json::from_str(json).unwrap();

        let instance = input.ecdsa[0];
        assert!(input.pedersen.is_empty());
        assert_eq!(U256::from(2u8), instance.message);
        assert_eq!(U256::from(4u8), instance.signature.w);
        assert_eq!([14, 15], instance.mem_addr(10));
    }

    #[test]
    fn rejects_values_outside_the_field() {
        let json = r#"{
            "rc_min": 0, "rc_max": 0, "n_steps": 1, "layout": "plain",
            "memory_segments": {
                "program": { "begin_addr": 1, "stop_ptr": 2 },
                "execution": { "begin_addr": 2, "stop_ptr": 2 }
            },
            "public_memory": [
                { "address": 1, "value": "0x800000000000011000000000000000000000000000000000000000000000001" }
            ]
        }"#;
        assert!(AirPublicInput::<Fp>::from_json(json).is_err());
    }

    #[test]
    fn reads_register_states_and_memory() {
        let mut trace_bytes = Vec::new();
        for state in [
            RegisterState { ap: 3, fp: 3, pc: 1 },
            RegisterState { ap: 3, fp: 3, pc: 3 },
        ] {
            bincode::serialize_into(&mut trace_bytes, &state).unwrap();
        }
        let states = RegisterStates::from_reader(trace_bytes.as_slice()).unwrap();
        assert_eq!(2, states.len());
        assert_eq!(3, states[1].pc);

        let mut memory_bytes = Vec::new();
        for (address, value) in [(1u64, 0x400680017fff8000u64), (2, 7)] {
            bincode::serialize_into(&mut memory_bytes, &address).unwrap();
            let mut word = [0u8; 32];
            word[..8].copy_from_slice(&value.to_le_bytes());
            memory_bytes.extend_from_slice(&word);
        }
        let memory = Memory::<Fp>::from_reader(memory_bytes.as_slice()).unwrap();
        assert_eq!(Fp::from(7u8), memory.get(2).unwrap().into_felt());
        assert!(memory.get(0).is_err());
    }
}
