use super::booleanity;
use super::constant;
use super::pow2;
use super::Component;
use crate::errors::Error;
use crate::errors::Result;
use crate::hints::PublicInputHint;
use crate::trace::TraceFiller;
use crate::CYCLE_HEIGHT;
use crate::FLAGS_COLUMN;
use crate::MEMORY_POOL_COLUMN;
use crate::RANGE_CHECK_POOL_COLUMN;
use crate::REGISTERS_COLUMN;
use ark_ff::PrimeField;
use binary::Memory;
use binary::RegisterState;
use binary::Word;
use constraints::AlgebraicItem;
use constraints::Constraint;
use constraints::ExecutionTraceColumn;
use constraints::Expr;
use constraints::Hint;
use constraints::Rows;
use constraints::VirtualColumn;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Decodes and executes one instruction per 16 row cycle
pub struct Cpu;

impl<F: PrimeField> Component<F> for Cpu {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn constraints(&self) -> Vec<Constraint<F>> {
        use PublicInputHint::*;
        let one = constant::<F>(1);
        let two = constant::<F>(2);
        let four = constant::<F>(4);
        let offset_size = pow2::<F>(16);
        let half_offset_size = pow2::<F>(15);
        let every_cycle = Rows::every(CYCLE_HEIGHT);
        let last_cycle = Rows::FromEnd(CYCLE_HEIGHT);

        let b = |flag: Flag| flag.curr::<F>();
        let pc = Npc::Pc.curr::<F>();
        let next_pc = Npc::Pc.next::<F>();
        let ap = Auxiliary::Ap.curr::<F>();
        let next_ap = Auxiliary::Ap.next::<F>();
        let fp = Auxiliary::Fp.curr::<F>();
        let next_fp = Auxiliary::Fp.next::<F>();
        let op0 = Npc::MemOp0.curr::<F>();
        let op1 = Npc::MemOp1.curr::<F>();
        let dst = Npc::MemDst.curr::<F>();
        let res = Auxiliary::Res.curr::<F>();
        let tmp0 = Auxiliary::Tmp0.curr::<F>();
        let tmp1 = Auxiliary::Tmp1.curr::<F>();
        let off_dst = RangeCheck::OffDst.curr::<F>();
        let off_op0 = RangeCheck::OffOp0.curr::<F>();
        let off_op1 = RangeCheck::OffOp1.curr::<F>();

        // cpu/decode/flag_op1_base_op0_0
        let flag_op1_base_op0 = &one - (b(Flag::Op1Imm) + b(Flag::Op1Ap) + b(Flag::Op1Fp));
        // cpu/decode/flag_res_op1_0
        // NOTE: PcJnz is included since `res` is unused (and repurposed) by jnz
        let flag_res_op1 = &one - (b(Flag::ResAdd) + b(Flag::ResMul) + b(Flag::PcJnz));
        // cpu/decode/flag_pc_update_regular_0
        let flag_pc_update_regular =
            &one - (b(Flag::PcJumpAbs) + b(Flag::PcJumpRel) + b(Flag::PcJnz));
        // cpu/decode/fp_update_regular_0
        let fp_update_regular = &one - (b(Flag::OpcodeCall) + b(Flag::OpcodeRet));

        // NOTE: npc_reg_0 = pc + instruction_size
        // NOTE: instruction_size = fOP1_IMM + 1
        let npc_reg_0 = &pc + b(Flag::Op1Imm) + &one;

        // the flag bit of the current row (as opposed to the bit prefix)
        let flag_prefixes = VirtualColumn::new(FLAGS_COLUMN, 1, 0);
        let whole_flag_prefix = flag_prefixes.curr::<F>();
        let opcode_rc_bit = &whole_flag_prefix - flag_prefixes.next::<F>() * &two;

        // The first word of each instruction:
        // ┌─────────────────────────────────────────────────────────────────────────┐
        // │                     off_dst (biased representation)                     │
        // ├─────────────────────────────────────────────────────────────────────────┤
        // │                     off_op0 (biased representation)                     │
        // ├─────────────────────────────────────────────────────────────────────────┤
        // │                     off_op1 (biased representation)                     │
        // ├─────┬─────┬───────┬───────┬───────────┬────────┬───────────────────┬────┤
        // │ dst │ op0 │  op1  │  res  │    pc     │   ap   │      opcode       │ 0  │
        // │ reg │ reg │  src  │ logic │  update   │ update │                   │    │
        // ├─────┼─────┼───┬───┼───┬───┼───┬───┬───┼───┬────┼────┬────┬────┬────┼────┤
        // │  0  │  1  │ 2 │ 3 │ 4 │ 5 │ 6 │ 7 │ 8 │ 9 │ 10 │ 11 │ 12 │ 13 │ 14 │ 15 │
        // └─────┴─────┴───┴───┴───┴───┴───┴───┴───┴───┴────┴────┴────┴────┴────┴────┘
        let opcode_rc_input = Npc::Instruction.curr::<F>()
            - (((&whole_flag_prefix * &offset_size + &off_op1) * &offset_size + &off_op0)
                * &offset_size
                + &off_dst);

        let mem_dst_addr = Npc::MemDstAddr.curr::<F>() + &half_offset_size
            - (b(Flag::DstReg) * &fp + (&one - b(Flag::DstReg)) * &ap + &off_dst);
        let mem0_addr = Npc::MemOp0Addr.curr::<F>() + &half_offset_size
            - (b(Flag::Op0Reg) * &fp + (&one - b(Flag::Op0Reg)) * &ap + &off_op0);
        let mem1_addr = Npc::MemOp1Addr.curr::<F>() + &half_offset_size
            - (b(Flag::Op1Imm) * &pc
                + b(Flag::Op1Ap) * &ap
                + b(Flag::Op1Fp) * &fp
                + &flag_op1_base_op0 * &op0
                + &off_op1);
        let ops_mul = Auxiliary::Op0MulOp1.curr::<F>() - &op0 * &op1;
        let res_constraint = (&one - b(Flag::PcJnz)) * &res
            - (b(Flag::ResAdd) * (&op0 + &op1)
                + b(Flag::ResMul) * Auxiliary::Op0MulOp1.curr::<F>()
                + &flag_res_op1 * &op1);

        let update_tmp0 = &tmp0 - b(Flag::PcJnz) * &dst;
        let update_tmp1 = &tmp1 - &tmp0 * &res;
        let pc_cond_negative = (&one - b(Flag::PcJnz)) * &next_pc
            + &tmp0 * (&next_pc - (&pc + &op1))
            - (&flag_pc_update_regular * &npc_reg_0
                + b(Flag::PcJumpAbs) * &res
                + b(Flag::PcJumpRel) * (&pc + &res));
        let pc_cond_positive = (&tmp1 - b(Flag::PcJnz)) * (&next_pc - &npc_reg_0);
        let ap_update = &next_ap
            - (&ap + b(Flag::ApAdd) * &res + b(Flag::ApAdd1) + b(Flag::OpcodeCall) * &two);
        let fp_update = &next_fp
            - (&fp_update_regular * &fp
                + b(Flag::OpcodeRet) * &dst
                + b(Flag::OpcodeCall) * (&ap + &two));

        // call pushes fp and the return pc onto the stack
        let call_push_fp = b(Flag::OpcodeCall) * (&dst - &fp);
        let call_push_pc = b(Flag::OpcodeCall) * (&op0 - (&pc + b(Flag::Op1Imm) + &one));
        let call_off0 = b(Flag::OpcodeCall) * (&off_dst - &half_offset_size);
        let call_off1 = b(Flag::OpcodeCall) * (&off_op0 - (&half_offset_size + &one));
        let call_flags = b(Flag::OpcodeCall)
            * (b(Flag::OpcodeCall) + b(Flag::OpcodeCall) + &one + &one
                - (b(Flag::DstReg) + b(Flag::Op0Reg) + &four));
        let ret_off0 = b(Flag::OpcodeRet) * (&off_dst + &two - &half_offset_size);
        let ret_off2 = b(Flag::OpcodeRet) * (&off_op1 + &one - &half_offset_size);
        let ret_flags = b(Flag::OpcodeRet)
            * (b(Flag::PcJumpAbs) + b(Flag::DstReg) + b(Flag::Op1Fp) + &flag_res_op1 - &four);
        let assert_eq = b(Flag::OpcodeAssertEq) * (&dst - &res);

        vec![
            Constraint::new("cpu/decode/opcode_rc/bit", booleanity(&opcode_rc_bit), Rows::ALL)
                .except(Rows::every_at(CYCLE_HEIGHT, Flag::Zero as usize)),
            Constraint::new(
                "cpu/decode/opcode_rc/zero",
                whole_flag_prefix.clone(),
                Rows::every_at(CYCLE_HEIGHT, Flag::Zero as usize),
            ),
            Constraint::new("cpu/decode/opcode_rc_input", opcode_rc_input, every_cycle),
            Constraint::new(
                "cpu/decode/flag_op1_base_op0_bit",
                booleanity(&flag_op1_base_op0),
                every_cycle,
            ),
            Constraint::new(
                "cpu/decode/flag_res_op1_bit",
                booleanity(&flag_res_op1),
                every_cycle,
            ),
            Constraint::new(
                "cpu/decode/flag_pc_update_regular_bit",
                booleanity(&flag_pc_update_regular),
                every_cycle,
            ),
            Constraint::new(
                "cpu/decode/fp_update_regular_bit",
                booleanity(&fp_update_regular),
                every_cycle,
            ),
            Constraint::new("cpu/operands/mem_dst_addr", mem_dst_addr, every_cycle),
            Constraint::new("cpu/operands/mem0_addr", mem0_addr, every_cycle),
            Constraint::new("cpu/operands/mem1_addr", mem1_addr, every_cycle),
            Constraint::new("cpu/operands/ops_mul", ops_mul, every_cycle),
            Constraint::new("cpu/operands/res", res_constraint, every_cycle),
            Constraint::new("cpu/update_registers/update_pc/tmp0", update_tmp0, every_cycle)
                .except(last_cycle),
            Constraint::new("cpu/update_registers/update_pc/tmp1", update_tmp1, every_cycle)
                .except(last_cycle),
            Constraint::new(
                "cpu/update_registers/update_pc/pc_cond_negative",
                pc_cond_negative,
                every_cycle,
            )
            .except(last_cycle),
            Constraint::new(
                "cpu/update_registers/update_pc/pc_cond_positive",
                pc_cond_positive,
                every_cycle,
            )
            .except(last_cycle),
            Constraint::new(
                "cpu/update_registers/update_ap/ap_update",
                ap_update,
                every_cycle,
            )
            .except(last_cycle),
            Constraint::new(
                "cpu/update_registers/update_fp/fp_update",
                fp_update,
                every_cycle,
            )
            .except(last_cycle),
            Constraint::new("cpu/opcodes/call/push_fp", call_push_fp, every_cycle),
            Constraint::new("cpu/opcodes/call/push_pc", call_push_pc, every_cycle),
            Constraint::new("cpu/opcodes/call/off0", call_off0, every_cycle),
            Constraint::new("cpu/opcodes/call/off1", call_off1, every_cycle),
            Constraint::new("cpu/opcodes/call/flags", call_flags, every_cycle),
            Constraint::new("cpu/opcodes/ret/off0", ret_off0, every_cycle),
            Constraint::new("cpu/opcodes/ret/off2", ret_off2, every_cycle),
            Constraint::new("cpu/opcodes/ret/flags", ret_flags, every_cycle),
            Constraint::new("cpu/opcodes/assert_eq/assert_eq", assert_eq, every_cycle),
            Constraint::new("initial_ap", &ap - InitialAp.hint::<F>(), Rows::first()),
            Constraint::new("initial_fp", &fp - InitialAp.hint::<F>(), Rows::first()),
            Constraint::new("initial_pc", &pc - InitialPc.hint::<F>(), Rows::first()),
            Constraint::new("final_ap", &ap - FinalAp.hint::<F>(), last_cycle),
            Constraint::new("final_fp", &fp - InitialAp.hint::<F>(), last_cycle),
            Constraint::new("final_pc", &pc - FinalPc.hint::<F>(), last_cycle),
        ]
    }

    fn fill(&self, trace: &mut TraceFiller<F>) -> Result<()> {
        let witness = trace.witness;
        let register_states = &*witness.register_states;

        let steps = ark_std::cfg_iter!(register_states)
            .map(|&registers| CpuStep::new(registers, &witness.memory))
            .collect::<Result<Vec<CpuStep<F>>>>()?;

        for (i, step) in steps.into_iter().enumerate() {
            let cycle = i * CYCLE_HEIGHT;

            // FLAGS
            for (flag, prefix) in Flag::iter().zip(step.flag_prefixes) {
                trace.set(FLAGS_COLUMN, cycle + flag as usize, F::from(prefix));
            }

            // NPC
            for (cell, address, value) in [
                (Npc::Pc, step.pc, step.instruction),
                (Npc::MemOp0Addr, step.op0_addr, step.op0),
                (Npc::MemDstAddr, step.dst_addr, step.dst),
                (Npc::MemOp1Addr, step.op1_addr, step.op1),
            ] {
                trace.set_memory(cycle + cell as usize, address, value)?;
            }

            // RANGE CHECK
            for (cell, offset) in [
                (RangeCheck::OffDst, step.off_dst),
                (RangeCheck::OffOp1, step.off_op1),
                (RangeCheck::OffOp0, step.off_op0),
            ] {
                trace.set_range_check(cycle + cell as usize, offset);
            }

            // AUXILIARY
            for (cell, value) in [
                (Auxiliary::Ap, step.ap),
                (Auxiliary::Tmp0, step.tmp0),
                (Auxiliary::Op0MulOp1, step.op0 * step.op1),
                (Auxiliary::Fp, step.fp),
                (Auxiliary::Tmp1, step.tmp1),
                (Auxiliary::Res, step.res),
            ] {
                trace.set(REGISTERS_COLUMN, cycle + cell as usize, value);
            }
        }
        Ok(())
    }
}

/// Values of a single CPU step
struct CpuStep<F> {
    flag_prefixes: [u16; 16],
    off_dst: u16,
    off_op0: u16,
    off_op1: u16,
    pc: u32,
    instruction: F,
    op0_addr: u32,
    op0: F,
    dst_addr: u32,
    dst: F,
    op1_addr: u32,
    op1: F,
    ap: F,
    fp: F,
    res: F,
    tmp0: F,
    tmp1: F,
}

impl<F: PrimeField> CpuStep<F> {
    fn new(registers: RegisterState, memory: &Memory<F>) -> Result<Self> {
        let RegisterState { pc, ap, fp } = registers;
        let word: Word<F> = memory.get(pc)?;
        let address = |a: usize| u32::try_from(a).map_err(|_| Error::InvalidAddress(a));
        let mut flag_prefixes = [0; 16];
        for flag in Flag::iter() {
            flag_prefixes[flag as usize] = word.get_flag_prefix(flag.into());
        }

        Ok(Self {
            flag_prefixes,
            off_dst: word.get_off_dst(),
            off_op0: word.get_off_op0(),
            off_op1: word.get_off_op1(),
            pc: address(pc)?,
            instruction: word.into_felt(),
            op0_addr: address(word.get_op0_addr(pc, ap, fp)?)?,
            op0: word.get_op0(pc, ap, fp, memory)?,
            dst_addr: address(word.get_dst_addr(pc, ap, fp)?)?,
            dst: word.get_dst(pc, ap, fp, memory)?,
            op1_addr: address(word.get_op1_addr(pc, ap, fp, memory)?)?,
            op1: word.get_op1(pc, ap, fp, memory)?,
            ap: F::from(address(ap)?),
            fp: F::from(address(fp)?),
            res: word.get_res(pc, ap, fp, memory)?,
            tmp0: word.get_tmp0(pc, ap, fp, memory)?,
            tmp1: word.get_tmp1(pc, ap, fp, memory)?,
        })
    }
}

/// Cairo flag
/// https://eprint.iacr.org/2021/1063.pdf section 9
#[derive(Clone, Copy, Debug, EnumIter, PartialEq, Eq)]
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

impl From<Flag> for binary::Flag {
    fn from(value: Flag) -> Self {
        match value {
            Flag::DstReg => Self::DstReg,
            Flag::Op0Reg => Self::Op0Reg,
            Flag::Op1Imm => Self::Op1Imm,
            Flag::Op1Fp => Self::Op1Fp,
            Flag::Op1Ap => Self::Op1Ap,
            Flag::ResAdd => Self::ResAdd,
            Flag::ResMul => Self::ResMul,
            Flag::PcJumpAbs => Self::PcJumpAbs,
            Flag::PcJumpRel => Self::PcJumpRel,
            Flag::PcJnz => Self::PcJnz,
            Flag::ApAdd => Self::ApAdd,
            Flag::ApAdd1 => Self::ApAdd1,
            Flag::OpcodeCall => Self::OpcodeCall,
            Flag::OpcodeRet => Self::OpcodeRet,
            Flag::OpcodeAssertEq => Self::OpcodeAssertEq,
            Flag::Zero => Self::Zero,
        }
    }
}

impl ExecutionTraceColumn for Flag {
    fn index(&self) -> usize {
        FLAGS_COLUMN
    }

    fn offset<T>(&self, cycle_offset: isize) -> Expr<AlgebraicItem<T>> {
        use AlgebraicItem::Trace;
        // Get the individual bit (as opposed to the bit prefix)
        let col = self.index();
        let trace_offset = CYCLE_HEIGHT as isize * cycle_offset;
        let flag_offset = trace_offset + *self as isize;
        Expr::from(Trace(col, flag_offset))
            - (Trace(col, flag_offset + 1) + Trace(col, flag_offset + 1))
    }
}

// Trace column 3
// Instruction fetch and operand accesses of the memory pool
#[derive(Clone, Copy, Debug)]
pub enum Npc {
    Pc = 0, // Program counter
    Instruction = 1,
    // NOTE: cells 2, 3 (and 10, 11) hold the public memory
    MemOp0Addr = 4,
    MemOp0 = 5,
    MemDstAddr = 8,
    MemDst = 9,
    MemOp1Addr = 12,
    MemOp1 = 13,
}

impl ExecutionTraceColumn for Npc {
    fn index(&self) -> usize {
        MEMORY_POOL_COLUMN
    }

    fn offset<T>(&self, cycle_offset: isize) -> Expr<AlgebraicItem<T>> {
        let trace_offset = CYCLE_HEIGHT as isize * cycle_offset + *self as isize;
        AlgebraicItem::Trace(self.index(), trace_offset).into()
    }
}

// Trace column 0
// Instruction offsets in the 16-bit range check pool
#[derive(Clone, Copy, Debug)]
pub enum RangeCheck {
    OffDst = 0,
    OffOp1 = 4,
    OffOp0 = 8,
}

impl ExecutionTraceColumn for RangeCheck {
    fn index(&self) -> usize {
        RANGE_CHECK_POOL_COLUMN
    }

    fn offset<T>(&self, cycle_offset: isize) -> Expr<AlgebraicItem<T>> {
        let trace_offset = CYCLE_HEIGHT as isize * cycle_offset + *self as isize;
        AlgebraicItem::Trace(self.index(), trace_offset).into()
    }
}

// Trace column 5
// Registers and intermediate values of a step
#[derive(Clone, Copy, Debug)]
pub enum Auxiliary {
    Ap = 0,
    Tmp0 = 2,
    Op0MulOp1 = 4,
    Fp = 8,
    Tmp1 = 10,
    Res = 12,
}

impl ExecutionTraceColumn for Auxiliary {
    fn index(&self) -> usize {
        REGISTERS_COLUMN
    }

    fn offset<T>(&self, cycle_offset: isize) -> Expr<AlgebraicItem<T>> {
        let trace_offset = CYCLE_HEIGHT as isize * cycle_offset + *self as isize;
        AlgebraicItem::Trace(self.index(), trace_offset).into()
    }
}
