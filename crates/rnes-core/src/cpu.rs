//! 6502 interpreter: register file, flag algebra, stack, interrupts and the
//! per-instruction eval loop.
//!
//! One [`Cpu::tick`] services a pending NMI, fetches and decodes a single
//! opcode through the table in [`crate::opcodes`], and runs its handler. The
//! `Z` and `N` flags are not stored: they derive on read from the most recent
//! arithmetic or load result, kept in [`Registers::last_result`].

use std::fmt;

use crate::interrupt::NmiLine;
use crate::mmu::{MemoryError, Mmu};
use crate::opcodes::{self, Class, Mode, OpcodeInfo};
use crate::ppu::Ppu;

/// The stack lives in page one: 0x0100 | SP.
pub const STACK_BASE: u16 = 0x0100;

/// NMI vector (little endian)
pub const NMI_VECTOR: u16 = 0xFFFA;

/// Reset vector (little endian)
pub const RESET_VECTOR: u16 = 0xFFFC;

/// Status byte at reset: interrupt-disable plus the fixed bits.
pub const RESET_STATUS: u8 = 0x34;

/// Stack pointer at reset
pub const RESET_SP: u8 = 0xFD;

/// Processor status register.
///
/// Stored flags only: `Z` and `N` live in [`Registers::last_result`] and are
/// merged in by [`Registers::status_byte`]. Bit 5 always reads 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(u8);

impl Status {
    pub const CARRY: u8 = 0b0000_0001;
    pub const ZERO: u8 = 0b0000_0010;
    pub const INTERRUPT_DISABLE: u8 = 0b0000_0100;
    pub const DECIMAL: u8 = 0b0000_1000;
    pub const BREAK: u8 = 0b0001_0000;
    pub const UNUSED: u8 = 0b0010_0000;
    pub const OVERFLOW: u8 = 0b0100_0000;
    pub const NEGATIVE: u8 = 0b1000_0000;

    pub fn new(bits: u8) -> Self {
        Self(bits | Self::UNUSED)
    }

    pub fn bits(self) -> u8 {
        self.0 | Self::UNUSED
    }

    pub fn carry(self) -> bool {
        self.0 & Self::CARRY != 0
    }

    pub fn interrupt_disable(self) -> bool {
        self.0 & Self::INTERRUPT_DISABLE != 0
    }

    pub fn decimal(self) -> bool {
        self.0 & Self::DECIMAL != 0
    }

    pub fn overflow(self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
        self.0 |= Self::UNUSED;
    }

    pub fn set_carry(&mut self, on: bool) {
        self.set(Self::CARRY, on);
    }

    pub fn set_interrupt_disable(&mut self, on: bool) {
        self.set(Self::INTERRUPT_DISABLE, on);
    }

    pub fn set_decimal(&mut self, on: bool) {
        self.set(Self::DECIMAL, on);
    }

    pub fn set_overflow(&mut self, on: bool) {
        self.set(Self::OVERFLOW, on);
    }
}

/// CPU register file.
#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: Status,
    pub sp: u8,
    pub pc: u16,
    /// Most recent arithmetic/load result; `Z` and `N` derive from it.
    pub last_result: u8,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            p: Status::new(RESET_STATUS),
            sp: RESET_SP,
            pc: 0,
            last_result: 0,
        }
    }
}

impl Registers {
    pub fn zero(&self) -> bool {
        self.last_result == 0
    }

    pub fn negative(&self) -> bool {
        self.last_result & 0x80 != 0
    }

    /// Full status byte with `Z` and `N` materialized.
    pub fn status_byte(&self) -> u8 {
        let mut bits = self.p.bits() & !(Status::ZERO | Status::NEGATIVE);
        if self.zero() {
            bits |= Status::ZERO;
        }
        if self.negative() {
            bits |= Status::NEGATIVE;
        }
        bits
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A:${:02X} X:${:02X} Y:${:02X} SP:${:02X} PC:${:04X} P:{:08b}",
            self.a,
            self.x,
            self.y,
            self.sp,
            self.pc,
            self.status_byte(),
        )
    }
}

/// Handler argument, prepared by [`Cpu::eval`] per instruction class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    None,
    Byte(u8),
    Addr(u16),
}

/// CPU execution errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CpuError {
    #[error("unknown opcode {opcode:#04x} at {pc:#06x}")]
    UnknownOpcode { opcode: u8, pc: u16 },
    #[error("{mnemonic} ({opcode:#04x}) at {pc:#06x} has no handler")]
    UnimplementedOperation {
        mnemonic: &'static str,
        opcode: u8,
        pc: u16,
    },
    #[error("{mnemonic} needed an effective address but none was decoded")]
    NullAddress { mnemonic: &'static str },
    #[error(transparent)]
    Memory(#[from] MemoryError),
}

/// 6502 execution state.
#[derive(Debug, Clone)]
pub struct Cpu {
    pub regs: Registers,
    nmi: NmiLine,
    ticks: u64,
    cycles: u64,
}

impl Cpu {
    pub fn new(nmi: NmiLine) -> Self {
        Self {
            regs: Registers::default(),
            nmi,
            ticks: 0,
            cycles: 0,
        }
    }

    /// Instructions executed since reset.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Base machine cycles accumulated from the opcode table.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Load the reset vector and bring the register file to its power-on
    /// state.
    pub fn reset(&mut self, mmu: &Mmu, ppu: &mut Ppu) -> Result<(), CpuError> {
        self.regs = Registers::default();
        self.regs.pc = self.read_word(mmu, ppu, RESET_VECTOR)?;
        self.ticks = 0;
        self.cycles = 0;
        log::debug!("CPU reset: PC={:#06x}", self.regs.pc);
        Ok(())
    }

    /// Execute one instruction, servicing a pending NMI first.
    pub fn tick(&mut self, mmu: &mut Mmu, ppu: &mut Ppu) -> Result<(), CpuError> {
        if self.nmi.take() {
            self.service_nmi(mmu, ppu)?;
        }

        let at = self.regs.pc;
        let opcode = self.fetch(mmu, ppu)?;
        let info = opcodes::decode(opcode).ok_or(CpuError::UnknownOpcode { opcode, pc: at })?;
        self.eval(info, opcode, at, mmu, ppu)?;
        self.ticks += 1;
        self.cycles += u64::from(info.cycles);
        Ok(())
    }

    fn service_nmi(&mut self, mmu: &mut Mmu, ppu: &mut Ppu) -> Result<(), CpuError> {
        let pc = self.regs.pc;
        self.push(mmu, ppu, (pc >> 8) as u8)?;
        self.push(mmu, ppu, pc as u8)?;
        let p = self.regs.status_byte();
        self.push(mmu, ppu, p)?;
        self.regs.pc = self.read_word(mmu, ppu, NMI_VECTOR)?;
        Ok(())
    }

    fn fetch(&mut self, mmu: &Mmu, ppu: &mut Ppu) -> Result<u8, CpuError> {
        let byte = mmu.read_byte(self.regs.pc, ppu)?;
        self.regs.pc = self.regs.pc.wrapping_add(1);
        Ok(byte)
    }

    fn read_word(&self, mmu: &Mmu, ppu: &mut Ppu, addr: u16) -> Result<u16, CpuError> {
        let low = mmu.read_byte(addr, ppu)?;
        let high = mmu.read_byte(addr.wrapping_add(1), ppu)?;
        Ok(u16::from_le_bytes([low, high]))
    }

    /// Pointer fetch for the zero-page indirect modes: the high byte wraps
    /// within the zero page, so a pointer at 0xFF reads its high byte from
    /// 0x00, not 0x100.
    fn read_zero_page_word(&self, mmu: &Mmu, ppu: &mut Ppu, ptr: u8) -> Result<u16, CpuError> {
        let low = mmu.read_byte(u16::from(ptr), ppu)?;
        let high = mmu.read_byte(u16::from(ptr.wrapping_add(1)), ppu)?;
        Ok(u16::from_le_bytes([low, high]))
    }

    fn push(&mut self, mmu: &mut Mmu, ppu: &mut Ppu, value: u8) -> Result<(), CpuError> {
        mmu.write_byte(STACK_BASE | u16::from(self.regs.sp), value, ppu)?;
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        Ok(())
    }

    fn pop(&mut self, mmu: &Mmu, ppu: &mut Ppu) -> Result<u8, CpuError> {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        Ok(mmu.read_byte(STACK_BASE | u16::from(self.regs.sp), ppu)?)
    }

    /// Decode operands and the effective address, build the handler argument
    /// per instruction class, run the handler, and store its result.
    fn eval(
        &mut self,
        info: &OpcodeInfo,
        opcode: u8,
        at: u16,
        mmu: &mut Mmu,
        ppu: &mut Ppu,
    ) -> Result<(), CpuError> {
        let mut operands = [0u8; 2];
        for slot in operands.iter_mut().take(usize::from(info.bytes) - 1) {
            *slot = self.fetch(mmu, ppu)?;
        }
        let absolute = u16::from_le_bytes([operands[0], operands[1]]);

        let addr = match info.mode {
            Mode::ZeroPage => Some(u16::from(operands[0])),
            Mode::ZeroPageX => Some(u16::from(operands[0].wrapping_add(self.regs.x))),
            Mode::ZeroPageY => Some(u16::from(operands[0].wrapping_add(self.regs.y))),
            Mode::Absolute => Some(absolute),
            Mode::AbsoluteX => Some(absolute.wrapping_add(u16::from(self.regs.x))),
            Mode::AbsoluteY => Some(absolute.wrapping_add(u16::from(self.regs.y))),
            Mode::Indirect => Some(self.read_word(mmu, ppu, absolute)?),
            Mode::IndexedIndirect => {
                let pointer = operands[0].wrapping_add(self.regs.x);
                Some(self.read_zero_page_word(mmu, ppu, pointer)?)
            }
            Mode::IndirectIndexed => {
                let base = self.read_zero_page_word(mmu, ppu, operands[0])?;
                Some(base.wrapping_add(u16::from(self.regs.y)))
            }
            Mode::Implied | Mode::Accumulator | Mode::Immediate | Mode::Relative => None,
        };

        let arg = match info.class {
            Class::MemoryRead => match info.mode {
                Mode::Implied => Arg::None,
                Mode::Accumulator => Arg::Byte(self.regs.a),
                Mode::Immediate | Mode::Relative => Arg::Byte(operands[0]),
                _ => {
                    let addr = addr.ok_or(CpuError::NullAddress {
                        mnemonic: info.mnemonic,
                    })?;
                    Arg::Byte(mmu.read_byte(addr, ppu)?)
                }
            },
            Class::Jump => match info.mode {
                Mode::Relative => Arg::Byte(operands[0]),
                Mode::Implied => Arg::None,
                _ => Arg::Addr(addr.ok_or(CpuError::NullAddress {
                    mnemonic: info.mnemonic,
                })?),
            },
            Class::MemoryWrite | Class::RegisterModify | Class::FlagsSet => Arg::None,
        };

        let handler = info.handler.ok_or(CpuError::UnimplementedOperation {
            mnemonic: info.mnemonic,
            opcode,
            pc: at,
        })?;
        if let Some(value) = handler(self, mmu, ppu, arg)? {
            match info.mode {
                Mode::Accumulator => self.regs.a = value,
                _ => {
                    let addr = addr.ok_or(CpuError::NullAddress {
                        mnemonic: info.mnemonic,
                    })?;
                    mmu.write_byte(addr, value, ppu)?;
                }
            }
        }
        Ok(())
    }
}

/// Instruction handlers referenced by the opcode table.
///
/// A handler mutates CPU state and returns `Some(value)` when the eval
/// framework should store the value (to `A` under accumulator addressing,
/// through the MMU otherwise).
pub(crate) mod handlers {
    use super::{Arg, Cpu, CpuError, Status};
    use crate::mmu::Mmu;
    use crate::ppu::Ppu;

    fn byte(arg: Arg, mnemonic: &'static str) -> Result<u8, CpuError> {
        match arg {
            Arg::Byte(value) => Ok(value),
            _ => Err(CpuError::NullAddress { mnemonic }),
        }
    }

    fn addr(arg: Arg, mnemonic: &'static str) -> Result<u16, CpuError> {
        match arg {
            Arg::Addr(value) => Ok(value),
            _ => Err(CpuError::NullAddress { mnemonic }),
        }
    }

    fn branch(cpu: &mut Cpu, arg: Arg, taken: bool, mnemonic: &'static str) -> Result<Option<u8>, CpuError> {
        let offset = byte(arg, mnemonic)?;
        if taken {
            cpu.regs.pc = cpu.regs.pc.wrapping_add(i16::from(offset as i8) as u16);
        }
        Ok(None)
    }

    fn compare(cpu: &mut Cpu, register: u8, arg: Arg, mnemonic: &'static str) -> Result<Option<u8>, CpuError> {
        let m = byte(arg, mnemonic)?;
        cpu.regs.p.set_carry(register >= m);
        cpu.regs.last_result = register.wrapping_sub(m);
        Ok(None)
    }

    pub(crate) fn adc(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let m = byte(arg, "ADC")?;
        let sum = u16::from(cpu.regs.a) + u16::from(m) + u16::from(cpu.regs.p.carry());
        let result = sum as u8;
        // Signed overflow: both inputs share a sign the result lacks.
        cpu.regs
            .p
            .set_overflow((cpu.regs.a ^ result) & (m ^ result) & 0x80 != 0);
        cpu.regs.p.set_carry(sum > 0xFF);
        cpu.regs.a = result;
        cpu.regs.last_result = result;
        Ok(None)
    }

    pub(crate) fn sbc(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let m = byte(arg, "SBC")?;
        let borrow = i16::from(!cpu.regs.p.carry());
        let diff = i16::from(cpu.regs.a) - i16::from(m) - borrow;
        let result = diff as u8;
        cpu.regs
            .p
            .set_overflow((cpu.regs.a ^ m) & (cpu.regs.a ^ result) & 0x80 != 0);
        cpu.regs.p.set_carry(diff >= 0);
        cpu.regs.a = result;
        cpu.regs.last_result = result;
        Ok(None)
    }

    pub(crate) fn and(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a &= byte(arg, "AND")?;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    pub(crate) fn ora(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a |= byte(arg, "ORA")?;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    pub(crate) fn eor(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a ^= byte(arg, "EOR")?;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    pub(crate) fn asl(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let value = byte(arg, "ASL")?;
        cpu.regs.p.set_carry(value & 0x80 != 0);
        let result = value << 1;
        cpu.regs.last_result = result;
        Ok(Some(result))
    }

    pub(crate) fn lsr(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let value = byte(arg, "LSR")?;
        cpu.regs.p.set_carry(value & 0x01 != 0);
        let result = value >> 1;
        cpu.regs.last_result = result;
        Ok(Some(result))
    }

    pub(crate) fn rol(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let value = byte(arg, "ROL")?;
        let carry_in = u8::from(cpu.regs.p.carry());
        cpu.regs.p.set_carry(value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        cpu.regs.last_result = result;
        Ok(Some(result))
    }

    pub(crate) fn ror(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let value = byte(arg, "ROR")?;
        let carry_in = u8::from(cpu.regs.p.carry());
        cpu.regs.p.set_carry(value & 0x01 != 0);
        let result = (value >> 1) | (carry_in << 7);
        cpu.regs.last_result = result;
        Ok(Some(result))
    }

    pub(crate) fn cmp(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let register = cpu.regs.a;
        compare(cpu, register, arg, "CMP")
    }

    pub(crate) fn cpx(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let register = cpu.regs.x;
        compare(cpu, register, arg, "CPX")
    }

    pub(crate) fn cpy(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let register = cpu.regs.y;
        compare(cpu, register, arg, "CPY")
    }

    pub(crate) fn inc(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let result = byte(arg, "INC")?.wrapping_add(1);
        cpu.regs.last_result = result;
        Ok(Some(result))
    }

    pub(crate) fn dec(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let result = byte(arg, "DEC")?.wrapping_sub(1);
        cpu.regs.last_result = result;
        Ok(Some(result))
    }

    pub(crate) fn inx(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.x = cpu.regs.x.wrapping_add(1);
        cpu.regs.last_result = cpu.regs.x;
        Ok(None)
    }

    pub(crate) fn iny(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.y = cpu.regs.y.wrapping_add(1);
        cpu.regs.last_result = cpu.regs.y;
        Ok(None)
    }

    pub(crate) fn dex(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.x = cpu.regs.x.wrapping_sub(1);
        cpu.regs.last_result = cpu.regs.x;
        Ok(None)
    }

    pub(crate) fn dey(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.y = cpu.regs.y.wrapping_sub(1);
        cpu.regs.last_result = cpu.regs.y;
        Ok(None)
    }

    pub(crate) fn lda(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a = byte(arg, "LDA")?;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    pub(crate) fn ldx(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.x = byte(arg, "LDX")?;
        cpu.regs.last_result = cpu.regs.x;
        Ok(None)
    }

    pub(crate) fn ldy(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.y = byte(arg, "LDY")?;
        cpu.regs.last_result = cpu.regs.y;
        Ok(None)
    }

    pub(crate) fn sta(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        Ok(Some(cpu.regs.a))
    }

    pub(crate) fn stx(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        Ok(Some(cpu.regs.x))
    }

    pub(crate) fn sty(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        Ok(Some(cpu.regs.y))
    }

    pub(crate) fn jmp(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.pc = addr(arg, "JMP")?;
        Ok(None)
    }

    pub(crate) fn jsr(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let target = addr(arg, "JSR")?;
        let ret = cpu.regs.pc.wrapping_sub(1);
        cpu.push(mmu, ppu, (ret >> 8) as u8)?;
        cpu.push(mmu, ppu, ret as u8)?;
        cpu.regs.pc = target;
        Ok(None)
    }

    pub(crate) fn rts(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        let low = cpu.pop(mmu, ppu)?;
        let high = cpu.pop(mmu, ppu)?;
        cpu.regs.pc = u16::from_le_bytes([low, high]).wrapping_add(1);
        Ok(None)
    }

    pub(crate) fn rti(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        let p = cpu.pop(mmu, ppu)?;
        cpu.regs.p = Status::new(p & !Status::BREAK);
        let low = cpu.pop(mmu, ppu)?;
        let high = cpu.pop(mmu, ppu)?;
        cpu.regs.pc = u16::from_le_bytes([low, high]);
        Ok(None)
    }

    pub(crate) fn bcc(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = !cpu.regs.p.carry();
        branch(cpu, arg, taken, "BCC")
    }

    pub(crate) fn bcs(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = cpu.regs.p.carry();
        branch(cpu, arg, taken, "BCS")
    }

    pub(crate) fn beq(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = cpu.regs.zero();
        branch(cpu, arg, taken, "BEQ")
    }

    pub(crate) fn bne(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = !cpu.regs.zero();
        branch(cpu, arg, taken, "BNE")
    }

    pub(crate) fn bmi(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = cpu.regs.negative();
        branch(cpu, arg, taken, "BMI")
    }

    pub(crate) fn bpl(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = !cpu.regs.negative();
        branch(cpu, arg, taken, "BPL")
    }

    pub(crate) fn bvc(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = !cpu.regs.p.overflow();
        branch(cpu, arg, taken, "BVC")
    }

    pub(crate) fn bvs(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, arg: Arg) -> Result<Option<u8>, CpuError> {
        let taken = cpu.regs.p.overflow();
        branch(cpu, arg, taken, "BVS")
    }

    pub(crate) fn pha(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        let a = cpu.regs.a;
        cpu.push(mmu, ppu, a)?;
        Ok(None)
    }

    pub(crate) fn php(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        // The pushed copy carries the break bit.
        let p = cpu.regs.status_byte() | Status::BREAK;
        cpu.push(mmu, ppu, p)?;
        Ok(None)
    }

    pub(crate) fn pla(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a = cpu.pop(mmu, ppu)?;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    pub(crate) fn plp(cpu: &mut Cpu, mmu: &mut Mmu, ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        let p = cpu.pop(mmu, ppu)?;
        cpu.regs.p = Status::new(p & !Status::BREAK);
        Ok(None)
    }

    pub(crate) fn clc(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_carry(false);
        Ok(None)
    }

    pub(crate) fn cld(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_decimal(false);
        Ok(None)
    }

    pub(crate) fn cli(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_interrupt_disable(false);
        Ok(None)
    }

    pub(crate) fn clv(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_overflow(false);
        Ok(None)
    }

    pub(crate) fn sec(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_carry(true);
        Ok(None)
    }

    pub(crate) fn sed(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_decimal(true);
        Ok(None)
    }

    pub(crate) fn sei(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.p.set_interrupt_disable(true);
        Ok(None)
    }

    pub(crate) fn tax(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.x = cpu.regs.a;
        cpu.regs.last_result = cpu.regs.x;
        Ok(None)
    }

    pub(crate) fn tay(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.y = cpu.regs.a;
        cpu.regs.last_result = cpu.regs.y;
        Ok(None)
    }

    pub(crate) fn tsx(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.x = cpu.regs.sp;
        cpu.regs.last_result = cpu.regs.x;
        Ok(None)
    }

    pub(crate) fn txa(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a = cpu.regs.x;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    /// TXS is the one transfer that leaves the flags alone.
    pub(crate) fn txs(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.sp = cpu.regs.x;
        Ok(None)
    }

    pub(crate) fn tya(cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        cpu.regs.a = cpu.regs.y;
        cpu.regs.last_result = cpu.regs.a;
        Ok(None)
    }

    pub(crate) fn nop(_cpu: &mut Cpu, _mmu: &mut Mmu, _ppu: &mut Ppu, _arg: Arg) -> Result<Option<u8>, CpuError> {
        Ok(None)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::cpu::STACK_BASE;
        use crate::interrupt::NmiLine;
        use crate::mmu::Region;

        fn fixture() -> (Cpu, Mmu, Ppu) {
            let mut mmu = Mmu::new();
            mmu.map(Region::ram(0x0000, 0x2000, 0x800)).unwrap();
            mmu.sort_regions();
            (Cpu::new(NmiLine::new()), mmu, Ppu::new(NmiLine::new()))
        }

        #[test]
        fn adc_sets_carry_and_overflow() {
            let (mut cpu, mut mmu, mut ppu) = fixture();
            cpu.regs.a = 0x50;
            adc(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x50)).unwrap();
            assert_eq!(cpu.regs.a, 0xA0);
            assert!(cpu.regs.p.overflow());
            assert!(!cpu.regs.p.carry());
            assert!(cpu.regs.negative());

            cpu.regs.p.set_carry(false);
            cpu.regs.a = 0xFF;
            adc(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x01)).unwrap();
            assert_eq!(cpu.regs.a, 0x00);
            assert!(cpu.regs.p.carry());
            assert!(cpu.regs.zero());
        }

        #[test]
        fn sbc_carry_means_no_borrow() {
            let (mut cpu, mut mmu, mut ppu) = fixture();
            cpu.regs.p.set_carry(true);
            cpu.regs.a = 0x50;
            sbc(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x10)).unwrap();
            assert_eq!(cpu.regs.a, 0x40);
            assert!(cpu.regs.p.carry());

            cpu.regs.p.set_carry(true);
            cpu.regs.a = 0x10;
            sbc(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x20)).unwrap();
            assert_eq!(cpu.regs.a, 0xF0);
            assert!(!cpu.regs.p.carry());
        }

        #[test]
        fn rotates_move_carry_through_both_ends() {
            let (mut cpu, mut mmu, mut ppu) = fixture();
            cpu.regs.p.set_carry(true);
            let out = rol(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x80)).unwrap();
            assert_eq!(out, Some(0x01));
            assert!(cpu.regs.p.carry());

            cpu.regs.p.set_carry(true);
            let out = ror(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x01)).unwrap();
            assert_eq!(out, Some(0x80));
            assert!(cpu.regs.p.carry());
        }

        #[test]
        fn compare_sets_carry_on_greater_or_equal() {
            let (mut cpu, mut mmu, mut ppu) = fixture();
            cpu.regs.a = 0x40;
            cmp(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x40)).unwrap();
            assert!(cpu.regs.p.carry());
            assert!(cpu.regs.zero());

            cmp(&mut cpu, &mut mmu, &mut ppu, Arg::Byte(0x41)).unwrap();
            assert!(!cpu.regs.p.carry());
            assert!(!cpu.regs.zero());
        }

        #[test]
        fn php_pushes_break_bit_and_plp_drops_it() {
            let (mut cpu, mut mmu, mut ppu) = fixture();
            php(&mut cpu, &mut mmu, &mut ppu, Arg::None).unwrap();
            let pushed = mmu
                .read_byte(STACK_BASE | u16::from(cpu.regs.sp.wrapping_add(1)), &mut ppu)
                .unwrap();
            assert_ne!(pushed & Status::BREAK, 0);

            plp(&mut cpu, &mut mmu, &mut ppu, Arg::None).unwrap();
            assert_eq!(cpu.regs.p.bits() & Status::BREAK, 0);
        }

        #[test]
        fn txs_does_not_touch_flags() {
            let (mut cpu, mut mmu, mut ppu) = fixture();
            cpu.regs.last_result = 0x01;
            cpu.regs.x = 0x00;
            txs(&mut cpu, &mut mmu, &mut ppu, Arg::None).unwrap();
            assert_eq!(cpu.regs.sp, 0x00);
            assert!(!cpu.regs.zero());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bit_5_always_reads_one() {
        let status = Status::new(0x00);
        assert_ne!(status.bits() & Status::UNUSED, 0);

        let mut status = Status::new(0xFF);
        status.set_carry(false);
        assert_ne!(status.bits() & Status::UNUSED, 0);
    }

    #[test]
    fn zero_and_negative_derive_from_last_result() {
        let mut regs = Registers::default();
        regs.last_result = 0;
        assert!(regs.zero());
        assert!(!regs.negative());

        regs.last_result = 0x80;
        assert!(!regs.zero());
        assert!(regs.negative());

        regs.last_result = 0x7F;
        assert!(!regs.zero());
        assert!(!regs.negative());
    }

    #[test]
    fn status_byte_merges_lazy_flags() {
        let mut regs = Registers::default();
        regs.last_result = 0;
        let bits = regs.status_byte();
        assert_ne!(bits & Status::ZERO, 0);
        assert_eq!(bits & Status::NEGATIVE, 0);
        assert_ne!(bits & Status::UNUSED, 0);
    }
}
