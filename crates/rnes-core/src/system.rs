//! System integration: wires cartridge, MMU, PPU and CPU into a runnable
//! console and drives the fixed CPU:PPU tick interleave.

use crate::cartridge::{Cartridge, CartridgeError};
use crate::cpu::{Cpu, CpuError};
use crate::interrupt::NmiLine;
use crate::mmu::{MemoryError, Mmu, PortHook, Region};
use crate::ppu::{Ppu, PORT_COUNT};

/// PPU ticks per CPU tick (the NTSC master-clock ratio).
pub const PPU_TICKS_PER_CPU_TICK: u32 = 3;

/// Internal RAM size; mirrors through 0x0000-0x1FFF.
pub const RAM_SIZE: usize = 0x800;

/// PRG RAM window size at 0x6000-0x7FFF
pub const PRG_RAM_SIZE: usize = 0x2000;

/// System construction and execution errors
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Cpu(#[from] CpuError),
}

/// A wired console: CPU, PPU, memory map and the shared NMI line.
/// Not `Clone`: both chips hold ends of the same NMI line.
#[derive(Debug)]
pub struct Nes {
    cpu: Cpu,
    ppu: Ppu,
    mmu: Mmu,
}

impl Nes {
    /// Build the NROM (mapper 0) memory map around a cartridge and reset the
    /// CPU from its vector.
    ///
    /// CHR does not appear on the CPU bus; it loads into the PPU's pattern
    /// space. The 0x6000-0x7FFF window is PRG RAM.
    pub fn new(cartridge: &Cartridge) -> Result<Self, SystemError> {
        let nmi = NmiLine::new();
        let mut ppu = Ppu::new(nmi.clone());
        ppu.load_pattern_data(cartridge.chr());

        let mut mmu = Mmu::new();
        mmu.map(Region::ram(0x0000, 0x2000, RAM_SIZE))?;
        mmu.map(Region::ports(0x2000, 0x4000, PORT_COUNT, PortHook::Ppu))?;
        // OAMDMA sits in the middle of the APU/IO window; it gets its own
        // hooked byte so the rest of the window stays plain backing.
        mmu.map(Region::ram(0x4000, 0x4014, 0x14))?;
        mmu.map(Region::ports(0x4014, 0x4015, 1, PortHook::Ppu))?;
        mmu.map(Region::ram(0x4015, 0x4018, 3))?;
        mmu.map(Region::ram(0x6000, 0x8000, PRG_RAM_SIZE))?;
        mmu.map(Region::rom(0x8000, 0x1_0000, cartridge.prg().to_vec()))?;
        mmu.sort_regions();
        log::debug!(
            "NROM wiring complete: {} bytes PRG at 0x8000, {} bytes CHR in PPU pattern space",
            cartridge.prg().len(),
            cartridge.chr().len(),
        );

        let mut cpu = Cpu::new(nmi);
        cpu.reset(&mmu, &mut ppu)?;
        Ok(Self { cpu, ppu, mmu })
    }

    /// Parse an iNES image and build the console around it.
    pub fn from_ines(image: &[u8]) -> Result<Self, SystemError> {
        let cartridge = Cartridge::from_ines(image)?;
        Self::new(&cartridge)
    }

    /// One driver step: a CPU tick followed by three PPU ticks.
    pub fn step(&mut self) -> Result<(), CpuError> {
        self.cpu.tick(&mut self.mmu, &mut self.ppu)?;
        for _ in 0..PPU_TICKS_PER_CPU_TICK {
            self.ppu.tick();
        }
        Ok(())
    }

    /// Run up to `limit` instructions (`None` = until execution stops).
    ///
    /// Returns the number of instructions executed, or the error that stopped
    /// the loop.
    pub fn run(&mut self, limit: Option<u64>) -> Result<u64, CpuError> {
        let mut executed = 0;
        loop {
            if let Some(limit) = limit {
                if executed >= limit {
                    return Ok(executed);
                }
            }
            self.step()?;
            executed += 1;
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn mmu(&self) -> &Mmu {
        &self.mmu
    }

    /// Read one byte through the memory map (ports included).
    pub fn read(&mut self, addr: u16) -> Result<u8, MemoryError> {
        self.mmu.read_byte(addr, &mut self.ppu)
    }

    /// Write one byte through the memory map (ports included).
    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        self.mmu.write_byte(addr, value, &mut self.ppu)
    }
}
