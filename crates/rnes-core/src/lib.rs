//! rnes-core - NES emulation core
//!
//! The execution engine of a Nintendo Entertainment System: a 6502
//! interpreter, a region-mapped memory management unit with memory-mapped I/O
//! hooks, and a PPU timing core that raises NMI at VBLANK. A driver loop
//! interleaves one CPU tick with three PPU ticks; everything else is wiring.

#![forbid(unsafe_code)]

/// Cartridge loading and the read-only PRG/CHR view
pub mod cartridge;
/// 6502 interpreter: registers, flags, stack, interrupts, eval loop
pub mod cpu;
/// Interrupt lines shared between chips
pub mod interrupt;
/// Memory management unit: regions, mirroring, write protection, hooks
pub mod mmu;
/// The 256-entry opcode table
pub mod opcodes;
/// PPU timing core: ports, VRAM, scanline/cycle machine, VBLANK/NMI
pub mod ppu;
/// System integration and the driver step
pub mod system;
