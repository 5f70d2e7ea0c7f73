//! The 6502 opcode table: one immutable descriptor per opcode byte.
//!
//! Built once at compile time; [`decode`] is a pure function from opcode byte
//! to descriptor. Unofficial opcodes have no entry and decode to
//! `UnknownOpcode` upstream. An entry without a handler is known to the
//! decoder but surfaces `UnimplementedOperation` when executed; that covers
//! `BRK`, and `BIT`, whose `N`-from-memory contract the lazy flag derivation
//! in [`crate::cpu`] cannot express without storing `Z` and `N` eagerly.

use crate::cpu::handlers as h;
use crate::cpu::{Arg, Cpu, CpuError};
use crate::mmu::Mmu;
use crate::ppu::Ppu;

/// Instruction class: how `eval` prepares the handler argument and treats the
/// handler's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    FlagsSet,
    MemoryRead,
    MemoryWrite,
    RegisterModify,
    Jump,
}

/// Addressing mode: how the operand bytes become an effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndexedIndirect,
    IndirectIndexed,
}

/// Instruction handler signature.
pub type Handler = fn(&mut Cpu, &mut Mmu, &mut Ppu, Arg) -> Result<Option<u8>, CpuError>;

/// One opcode descriptor.
#[derive(Debug, Clone, Copy)]
pub struct OpcodeInfo {
    pub mnemonic: &'static str,
    pub class: Class,
    pub mode: Mode,
    /// Total encoded length, opcode byte included.
    pub bytes: u8,
    /// Base machine cycles, without page-cross or branch penalties.
    pub cycles: u8,
    pub handler: Option<Handler>,
}

/// Look up the descriptor for an opcode byte.
pub fn decode(opcode: u8) -> Option<&'static OpcodeInfo> {
    OPCODES[usize::from(opcode)].as_ref()
}

const fn op(
    mnemonic: &'static str,
    class: Class,
    mode: Mode,
    bytes: u8,
    cycles: u8,
    handler: Handler,
) -> Option<OpcodeInfo> {
    Some(OpcodeInfo {
        mnemonic,
        class,
        mode,
        bytes,
        cycles,
        handler: Some(handler),
    })
}

/// Descriptor for an opcode the decoder knows but cannot execute.
const fn stub(
    mnemonic: &'static str,
    class: Class,
    mode: Mode,
    bytes: u8,
    cycles: u8,
) -> Option<OpcodeInfo> {
    Some(OpcodeInfo {
        mnemonic,
        class,
        mode,
        bytes,
        cycles,
        handler: None,
    })
}

use Class::*;
use Mode::*;

#[rustfmt::skip]
pub static OPCODES: [Option<OpcodeInfo>; 256] = [
    /* 0x00 */ stub("BRK", Jump, Implied, 1, 7),
    /* 0x01 */ op("ORA", MemoryRead, IndexedIndirect, 2, 6, h::ora),
    /* 0x02 */ None,
    /* 0x03 */ None,
    /* 0x04 */ None,
    /* 0x05 */ op("ORA", MemoryRead, ZeroPage, 2, 3, h::ora),
    /* 0x06 */ op("ASL", MemoryRead, ZeroPage, 2, 5, h::asl),
    /* 0x07 */ None,
    /* 0x08 */ op("PHP", RegisterModify, Implied, 1, 3, h::php),
    /* 0x09 */ op("ORA", MemoryRead, Immediate, 2, 2, h::ora),
    /* 0x0A */ op("ASL", MemoryRead, Accumulator, 1, 2, h::asl),
    /* 0x0B */ None,
    /* 0x0C */ None,
    /* 0x0D */ op("ORA", MemoryRead, Absolute, 3, 4, h::ora),
    /* 0x0E */ op("ASL", MemoryRead, Absolute, 3, 6, h::asl),
    /* 0x0F */ None,
    /* 0x10 */ op("BPL", Jump, Relative, 2, 2, h::bpl),
    /* 0x11 */ op("ORA", MemoryRead, IndirectIndexed, 2, 5, h::ora),
    /* 0x12 */ None,
    /* 0x13 */ None,
    /* 0x14 */ None,
    /* 0x15 */ op("ORA", MemoryRead, ZeroPageX, 2, 4, h::ora),
    /* 0x16 */ op("ASL", MemoryRead, ZeroPageX, 2, 6, h::asl),
    /* 0x17 */ None,
    /* 0x18 */ op("CLC", FlagsSet, Implied, 1, 2, h::clc),
    /* 0x19 */ op("ORA", MemoryRead, AbsoluteY, 3, 4, h::ora),
    /* 0x1A */ None,
    /* 0x1B */ None,
    /* 0x1C */ None,
    /* 0x1D */ op("ORA", MemoryRead, AbsoluteX, 3, 4, h::ora),
    /* 0x1E */ op("ASL", MemoryRead, AbsoluteX, 3, 7, h::asl),
    /* 0x1F */ None,
    /* 0x20 */ op("JSR", Jump, Absolute, 3, 6, h::jsr),
    /* 0x21 */ op("AND", MemoryRead, IndexedIndirect, 2, 6, h::and),
    /* 0x22 */ None,
    /* 0x23 */ None,
    /* 0x24 */ stub("BIT", MemoryRead, ZeroPage, 2, 3),
    /* 0x25 */ op("AND", MemoryRead, ZeroPage, 2, 3, h::and),
    /* 0x26 */ op("ROL", MemoryRead, ZeroPage, 2, 5, h::rol),
    /* 0x27 */ None,
    /* 0x28 */ op("PLP", RegisterModify, Implied, 1, 4, h::plp),
    /* 0x29 */ op("AND", MemoryRead, Immediate, 2, 2, h::and),
    /* 0x2A */ op("ROL", MemoryRead, Accumulator, 1, 2, h::rol),
    /* 0x2B */ None,
    /* 0x2C */ stub("BIT", MemoryRead, Absolute, 3, 4),
    /* 0x2D */ op("AND", MemoryRead, Absolute, 3, 4, h::and),
    /* 0x2E */ op("ROL", MemoryRead, Absolute, 3, 6, h::rol),
    /* 0x2F */ None,
    /* 0x30 */ op("BMI", Jump, Relative, 2, 2, h::bmi),
    /* 0x31 */ op("AND", MemoryRead, IndirectIndexed, 2, 5, h::and),
    /* 0x32 */ None,
    /* 0x33 */ None,
    /* 0x34 */ None,
    /* 0x35 */ op("AND", MemoryRead, ZeroPageX, 2, 4, h::and),
    /* 0x36 */ op("ROL", MemoryRead, ZeroPageX, 2, 6, h::rol),
    /* 0x37 */ None,
    /* 0x38 */ op("SEC", FlagsSet, Implied, 1, 2, h::sec),
    /* 0x39 */ op("AND", MemoryRead, AbsoluteY, 3, 4, h::and),
    /* 0x3A */ None,
    /* 0x3B */ None,
    /* 0x3C */ None,
    /* 0x3D */ op("AND", MemoryRead, AbsoluteX, 3, 4, h::and),
    /* 0x3E */ op("ROL", MemoryRead, AbsoluteX, 3, 7, h::rol),
    /* 0x3F */ None,
    /* 0x40 */ op("RTI", Jump, Implied, 1, 6, h::rti),
    /* 0x41 */ op("EOR", MemoryRead, IndexedIndirect, 2, 6, h::eor),
    /* 0x42 */ None,
    /* 0x43 */ None,
    /* 0x44 */ None,
    /* 0x45 */ op("EOR", MemoryRead, ZeroPage, 2, 3, h::eor),
    /* 0x46 */ op("LSR", MemoryRead, ZeroPage, 2, 5, h::lsr),
    /* 0x47 */ None,
    /* 0x48 */ op("PHA", RegisterModify, Implied, 1, 3, h::pha),
    /* 0x49 */ op("EOR", MemoryRead, Immediate, 2, 2, h::eor),
    /* 0x4A */ op("LSR", MemoryRead, Accumulator, 1, 2, h::lsr),
    /* 0x4B */ None,
    /* 0x4C */ op("JMP", Jump, Absolute, 3, 3, h::jmp),
    /* 0x4D */ op("EOR", MemoryRead, Absolute, 3, 4, h::eor),
    /* 0x4E */ op("LSR", MemoryRead, Absolute, 3, 6, h::lsr),
    /* 0x4F */ None,
    /* 0x50 */ op("BVC", Jump, Relative, 2, 2, h::bvc),
    /* 0x51 */ op("EOR", MemoryRead, IndirectIndexed, 2, 5, h::eor),
    /* 0x52 */ None,
    /* 0x53 */ None,
    /* 0x54 */ None,
    /* 0x55 */ op("EOR", MemoryRead, ZeroPageX, 2, 4, h::eor),
    /* 0x56 */ op("LSR", MemoryRead, ZeroPageX, 2, 6, h::lsr),
    /* 0x57 */ None,
    /* 0x58 */ op("CLI", FlagsSet, Implied, 1, 2, h::cli),
    /* 0x59 */ op("EOR", MemoryRead, AbsoluteY, 3, 4, h::eor),
    /* 0x5A */ None,
    /* 0x5B */ None,
    /* 0x5C */ None,
    /* 0x5D */ op("EOR", MemoryRead, AbsoluteX, 3, 4, h::eor),
    /* 0x5E */ op("LSR", MemoryRead, AbsoluteX, 3, 7, h::lsr),
    /* 0x5F */ None,
    /* 0x60 */ op("RTS", Jump, Implied, 1, 6, h::rts),
    /* 0x61 */ op("ADC", MemoryRead, IndexedIndirect, 2, 6, h::adc),
    /* 0x62 */ None,
    /* 0x63 */ None,
    /* 0x64 */ None,
    /* 0x65 */ op("ADC", MemoryRead, ZeroPage, 2, 3, h::adc),
    /* 0x66 */ op("ROR", MemoryRead, ZeroPage, 2, 5, h::ror),
    /* 0x67 */ None,
    /* 0x68 */ op("PLA", RegisterModify, Implied, 1, 4, h::pla),
    /* 0x69 */ op("ADC", MemoryRead, Immediate, 2, 2, h::adc),
    /* 0x6A */ op("ROR", MemoryRead, Accumulator, 1, 2, h::ror),
    /* 0x6B */ None,
    /* 0x6C */ op("JMP", Jump, Indirect, 3, 5, h::jmp),
    /* 0x6D */ op("ADC", MemoryRead, Absolute, 3, 4, h::adc),
    /* 0x6E */ op("ROR", MemoryRead, Absolute, 3, 6, h::ror),
    /* 0x6F */ None,
    /* 0x70 */ op("BVS", Jump, Relative, 2, 2, h::bvs),
    /* 0x71 */ op("ADC", MemoryRead, IndirectIndexed, 2, 5, h::adc),
    /* 0x72 */ None,
    /* 0x73 */ None,
    /* 0x74 */ None,
    /* 0x75 */ op("ADC", MemoryRead, ZeroPageX, 2, 4, h::adc),
    /* 0x76 */ op("ROR", MemoryRead, ZeroPageX, 2, 6, h::ror),
    /* 0x77 */ None,
    /* 0x78 */ op("SEI", FlagsSet, Implied, 1, 2, h::sei),
    /* 0x79 */ op("ADC", MemoryRead, AbsoluteY, 3, 4, h::adc),
    /* 0x7A */ None,
    /* 0x7B */ None,
    /* 0x7C */ None,
    /* 0x7D */ op("ADC", MemoryRead, AbsoluteX, 3, 4, h::adc),
    /* 0x7E */ op("ROR", MemoryRead, AbsoluteX, 3, 7, h::ror),
    /* 0x7F */ None,
    /* 0x80 */ None,
    /* 0x81 */ op("STA", MemoryWrite, IndexedIndirect, 2, 6, h::sta),
    /* 0x82 */ None,
    /* 0x83 */ None,
    /* 0x84 */ op("STY", MemoryWrite, ZeroPage, 2, 3, h::sty),
    /* 0x85 */ op("STA", MemoryWrite, ZeroPage, 2, 3, h::sta),
    /* 0x86 */ op("STX", MemoryWrite, ZeroPage, 2, 3, h::stx),
    /* 0x87 */ None,
    /* 0x88 */ op("DEY", RegisterModify, Implied, 1, 2, h::dey),
    /* 0x89 */ None,
    /* 0x8A */ op("TXA", RegisterModify, Implied, 1, 2, h::txa),
    /* 0x8B */ None,
    /* 0x8C */ op("STY", MemoryWrite, Absolute, 3, 4, h::sty),
    /* 0x8D */ op("STA", MemoryWrite, Absolute, 3, 4, h::sta),
    /* 0x8E */ op("STX", MemoryWrite, Absolute, 3, 4, h::stx),
    /* 0x8F */ None,
    /* 0x90 */ op("BCC", Jump, Relative, 2, 2, h::bcc),
    /* 0x91 */ op("STA", MemoryWrite, IndirectIndexed, 2, 6, h::sta),
    /* 0x92 */ None,
    /* 0x93 */ None,
    /* 0x94 */ op("STY", MemoryWrite, ZeroPageX, 2, 4, h::sty),
    /* 0x95 */ op("STA", MemoryWrite, ZeroPageX, 2, 4, h::sta),
    /* 0x96 */ op("STX", MemoryWrite, ZeroPageY, 2, 4, h::stx),
    /* 0x97 */ None,
    /* 0x98 */ op("TYA", RegisterModify, Implied, 1, 2, h::tya),
    /* 0x99 */ op("STA", MemoryWrite, AbsoluteY, 3, 5, h::sta),
    /* 0x9A */ op("TXS", RegisterModify, Implied, 1, 2, h::txs),
    /* 0x9B */ None,
    /* 0x9C */ None,
    /* 0x9D */ op("STA", MemoryWrite, AbsoluteX, 3, 5, h::sta),
    /* 0x9E */ None,
    /* 0x9F */ None,
    /* 0xA0 */ op("LDY", MemoryRead, Immediate, 2, 2, h::ldy),
    /* 0xA1 */ op("LDA", MemoryRead, IndexedIndirect, 2, 6, h::lda),
    /* 0xA2 */ op("LDX", MemoryRead, Immediate, 2, 2, h::ldx),
    /* 0xA3 */ None,
    /* 0xA4 */ op("LDY", MemoryRead, ZeroPage, 2, 3, h::ldy),
    /* 0xA5 */ op("LDA", MemoryRead, ZeroPage, 2, 3, h::lda),
    /* 0xA6 */ op("LDX", MemoryRead, ZeroPage, 2, 3, h::ldx),
    /* 0xA7 */ None,
    /* 0xA8 */ op("TAY", RegisterModify, Implied, 1, 2, h::tay),
    /* 0xA9 */ op("LDA", MemoryRead, Immediate, 2, 2, h::lda),
    /* 0xAA */ op("TAX", RegisterModify, Implied, 1, 2, h::tax),
    /* 0xAB */ None,
    /* 0xAC */ op("LDY", MemoryRead, Absolute, 3, 4, h::ldy),
    /* 0xAD */ op("LDA", MemoryRead, Absolute, 3, 4, h::lda),
    /* 0xAE */ op("LDX", MemoryRead, Absolute, 3, 4, h::ldx),
    /* 0xAF */ None,
    /* 0xB0 */ op("BCS", Jump, Relative, 2, 2, h::bcs),
    /* 0xB1 */ op("LDA", MemoryRead, IndirectIndexed, 2, 5, h::lda),
    /* 0xB2 */ None,
    /* 0xB3 */ None,
    /* 0xB4 */ op("LDY", MemoryRead, ZeroPageX, 2, 4, h::ldy),
    /* 0xB5 */ op("LDA", MemoryRead, ZeroPageX, 2, 4, h::lda),
    /* 0xB6 */ op("LDX", MemoryRead, ZeroPageY, 2, 4, h::ldx),
    /* 0xB7 */ None,
    /* 0xB8 */ op("CLV", FlagsSet, Implied, 1, 2, h::clv),
    /* 0xB9 */ op("LDA", MemoryRead, AbsoluteY, 3, 4, h::lda),
    /* 0xBA */ op("TSX", RegisterModify, Implied, 1, 2, h::tsx),
    /* 0xBB */ None,
    /* 0xBC */ op("LDY", MemoryRead, AbsoluteX, 3, 4, h::ldy),
    /* 0xBD */ op("LDA", MemoryRead, AbsoluteX, 3, 4, h::lda),
    /* 0xBE */ op("LDX", MemoryRead, AbsoluteY, 3, 4, h::ldx),
    /* 0xBF */ None,
    /* 0xC0 */ op("CPY", MemoryRead, Immediate, 2, 2, h::cpy),
    /* 0xC1 */ op("CMP", MemoryRead, IndexedIndirect, 2, 6, h::cmp),
    /* 0xC2 */ None,
    /* 0xC3 */ None,
    /* 0xC4 */ op("CPY", MemoryRead, ZeroPage, 2, 3, h::cpy),
    /* 0xC5 */ op("CMP", MemoryRead, ZeroPage, 2, 3, h::cmp),
    /* 0xC6 */ op("DEC", MemoryRead, ZeroPage, 2, 5, h::dec),
    /* 0xC7 */ None,
    /* 0xC8 */ op("INY", RegisterModify, Implied, 1, 2, h::iny),
    /* 0xC9 */ op("CMP", MemoryRead, Immediate, 2, 2, h::cmp),
    /* 0xCA */ op("DEX", RegisterModify, Implied, 1, 2, h::dex),
    /* 0xCB */ None,
    /* 0xCC */ op("CPY", MemoryRead, Absolute, 3, 4, h::cpy),
    /* 0xCD */ op("CMP", MemoryRead, Absolute, 3, 4, h::cmp),
    /* 0xCE */ op("DEC", MemoryRead, Absolute, 3, 6, h::dec),
    /* 0xCF */ None,
    /* 0xD0 */ op("BNE", Jump, Relative, 2, 2, h::bne),
    /* 0xD1 */ op("CMP", MemoryRead, IndirectIndexed, 2, 5, h::cmp),
    /* 0xD2 */ None,
    /* 0xD3 */ None,
    /* 0xD4 */ None,
    /* 0xD5 */ op("CMP", MemoryRead, ZeroPageX, 2, 4, h::cmp),
    /* 0xD6 */ op("DEC", MemoryRead, ZeroPageX, 2, 6, h::dec),
    /* 0xD7 */ None,
    /* 0xD8 */ op("CLD", FlagsSet, Implied, 1, 2, h::cld),
    /* 0xD9 */ op("CMP", MemoryRead, AbsoluteY, 3, 4, h::cmp),
    /* 0xDA */ None,
    /* 0xDB */ None,
    /* 0xDC */ None,
    /* 0xDD */ op("CMP", MemoryRead, AbsoluteX, 3, 4, h::cmp),
    /* 0xDE */ op("DEC", MemoryRead, AbsoluteX, 3, 7, h::dec),
    /* 0xDF */ None,
    /* 0xE0 */ op("CPX", MemoryRead, Immediate, 2, 2, h::cpx),
    /* 0xE1 */ op("SBC", MemoryRead, IndexedIndirect, 2, 6, h::sbc),
    /* 0xE2 */ None,
    /* 0xE3 */ None,
    /* 0xE4 */ op("CPX", MemoryRead, ZeroPage, 2, 3, h::cpx),
    /* 0xE5 */ op("SBC", MemoryRead, ZeroPage, 2, 3, h::sbc),
    /* 0xE6 */ op("INC", MemoryRead, ZeroPage, 2, 5, h::inc),
    /* 0xE7 */ None,
    /* 0xE8 */ op("INX", RegisterModify, Implied, 1, 2, h::inx),
    /* 0xE9 */ op("SBC", MemoryRead, Immediate, 2, 2, h::sbc),
    /* 0xEA */ op("NOP", RegisterModify, Implied, 1, 2, h::nop),
    /* 0xEB */ None,
    /* 0xEC */ op("CPX", MemoryRead, Absolute, 3, 4, h::cpx),
    /* 0xED */ op("SBC", MemoryRead, Absolute, 3, 4, h::sbc),
    /* 0xEE */ op("INC", MemoryRead, Absolute, 3, 6, h::inc),
    /* 0xEF */ None,
    /* 0xF0 */ op("BEQ", Jump, Relative, 2, 2, h::beq),
    /* 0xF1 */ op("SBC", MemoryRead, IndirectIndexed, 2, 5, h::sbc),
    /* 0xF2 */ None,
    /* 0xF3 */ None,
    /* 0xF4 */ None,
    /* 0xF5 */ op("SBC", MemoryRead, ZeroPageX, 2, 4, h::sbc),
    /* 0xF6 */ op("INC", MemoryRead, ZeroPageX, 2, 6, h::inc),
    /* 0xF7 */ None,
    /* 0xF8 */ op("SED", FlagsSet, Implied, 1, 2, h::sed),
    /* 0xF9 */ op("SBC", MemoryRead, AbsoluteY, 3, 4, h::sbc),
    /* 0xFA */ None,
    /* 0xFB */ None,
    /* 0xFC */ None,
    /* 0xFD */ op("SBC", MemoryRead, AbsoluteX, 3, 4, h::sbc),
    /* 0xFE */ op("INC", MemoryRead, AbsoluteX, 3, 7, h::inc),
    /* 0xFF */ None,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_bytes(mode: Mode) -> u8 {
        match mode {
            Implied | Accumulator => 1,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | Relative | IndexedIndirect
            | IndirectIndexed => 2,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 3,
        }
    }

    #[test]
    fn table_covers_all_official_opcodes() {
        let present = OPCODES.iter().filter(|entry| entry.is_some()).count();
        assert_eq!(present, 151);
    }

    #[test]
    fn byte_lengths_match_addressing_modes() {
        for (byte, entry) in OPCODES.iter().enumerate() {
            if let Some(info) = entry {
                assert_eq!(
                    info.bytes,
                    mode_bytes(info.mode),
                    "opcode {byte:#04x} ({})",
                    info.mnemonic
                );
            }
        }
    }

    #[test]
    fn cycle_counts_stay_in_range() {
        for entry in OPCODES.iter().flatten() {
            assert!((2..=7).contains(&entry.cycles), "{}", entry.mnemonic);
        }
    }

    #[test]
    fn decode_finds_known_opcodes() {
        let lda = decode(0xA9).unwrap();
        assert_eq!(lda.mnemonic, "LDA");
        assert_eq!(lda.mode, Immediate);

        let jmp = decode(0x6C).unwrap();
        assert_eq!(jmp.mode, Indirect);
        assert_eq!(jmp.class, Jump);

        assert!(decode(0x02).is_none());
    }

    #[test]
    fn bit_and_brk_have_no_handler() {
        for byte in [0x00u8, 0x24, 0x2C] {
            let info = decode(byte).unwrap();
            assert!(info.handler.is_none(), "{}", info.mnemonic);
        }
    }

    #[test]
    fn handlerless_entries_are_only_bit_and_brk() {
        for entry in OPCODES.iter().flatten() {
            if entry.handler.is_none() {
                assert!(matches!(entry.mnemonic, "BIT" | "BRK"));
            }
        }
    }
}
