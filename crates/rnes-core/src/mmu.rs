//! Memory management unit: address decoding, mirroring, write protection and
//! memory-mapped I/O hooks.
//!
//! The CPU's 16-bit address space is covered by non-overlapping regions, each
//! a half-open interval `[start, end)` over a byte buffer. When the interval
//! is larger than its buffer, accesses mirror modulo the buffer length; this
//! is how 2 KiB of system RAM fills 0x0000-0x1FFF, how the eight PPU ports
//! repeat through 0x2000-0x3FFF, and how a 16 KiB NROM PRG image fills the
//! upper 32 KiB.

use crate::ppu::{Ppu, PpuError};

/// Listener a hooked region dispatches to on every access.
///
/// Hooks run synchronously inside the CPU's memory operation. They may touch
/// chip-internal state and the shared NMI line only; a hook must never
/// reenter the CPU or the MMU. The PPU is the only listener this core wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortHook {
    Ppu,
}

/// One mapped range of the address space.
#[derive(Debug, Clone)]
pub struct Region {
    start: u16,
    /// Exclusive end; 0x10000 covers through the top of the address space.
    end: u32,
    backing: Vec<u8>,
    writable: bool,
    hook: Option<PortHook>,
}

impl Region {
    pub fn new(start: u16, end: u32, backing: Vec<u8>, writable: bool, hook: Option<PortHook>) -> Self {
        debug_assert!(u32::from(start) < end && end <= 0x1_0000);
        debug_assert!(!backing.is_empty());
        Self {
            start,
            end,
            backing,
            writable,
            hook,
        }
    }

    /// Writable zero-filled region of `len` bytes.
    pub fn ram(start: u16, end: u32, len: usize) -> Self {
        Self::new(start, end, vec![0; len], true, None)
    }

    /// Read-only region over the given bytes.
    pub fn rom(start: u16, end: u32, bytes: Vec<u8>) -> Self {
        Self::new(start, end, bytes, false, None)
    }

    /// Hardware-register region of `len` bytes dispatching to `hook`.
    pub fn ports(start: u16, end: u32, len: usize, hook: PortHook) -> Self {
        Self::new(start, end, vec![0; len], true, Some(hook))
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end
    }

    fn contains(&self, addr: u16) -> bool {
        addr >= self.start && u32::from(addr) < self.end
    }

    /// Backing index for `addr`, mirroring when the range outsizes the buffer.
    fn index(&self, addr: u16) -> usize {
        usize::from(addr - self.start) % self.backing.len()
    }

    fn overlaps(&self, other: &Region) -> bool {
        u32::from(self.start) < other.end && u32::from(other.start) < self.end
    }
}

/// The memory map: a sequence of regions kept sorted by start address.
#[derive(Debug, Clone, Default)]
pub struct Mmu {
    regions: Vec<Region>,
}

impl Mmu {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region. Fails when it intersects an existing mapping.
    ///
    /// Call [`Mmu::sort_regions`] once wiring is complete; lookups binary
    /// search and require the sorted order.
    pub fn map(&mut self, region: Region) -> Result<(), MemoryError> {
        if self.regions.iter().any(|r| r.overlaps(&region)) {
            return Err(MemoryError::AlreadyMapped {
                start: region.start,
                end: region.end,
            });
        }
        self.regions.push(region);
        Ok(())
    }

    /// Order regions by start address. The map is read-only afterwards.
    pub fn sort_regions(&mut self) {
        self.regions.sort_by_key(|r| r.start);
    }

    /// Binary search for the region containing `addr`.
    fn position(&self, addr: u16) -> Option<usize> {
        let after = self.regions.partition_point(|r| r.start <= addr);
        let candidate = after.checked_sub(1)?;
        self.regions[candidate].contains(addr).then_some(candidate)
    }

    /// Read one byte, firing the region's hook when present.
    pub fn read_byte(&self, addr: u16, ppu: &mut Ppu) -> Result<u8, MemoryError> {
        let region = &self.regions[self.position(addr).ok_or(MemoryError::Unmapped { addr })?];
        match region.hook {
            // The listener owns the canonical port state; plain backing
            // holds only the raw bytes last written through the bus.
            Some(PortHook::Ppu) => Ok(ppu.port_read(addr)?),
            None => Ok(region.backing[region.index(addr)]),
        }
    }

    /// Write one byte: store into backing, then fire the hook.
    pub fn write_byte(&mut self, addr: u16, value: u8, ppu: &mut Ppu) -> Result<(), MemoryError> {
        let slot = self.position(addr).ok_or(MemoryError::Unmapped { addr })?;
        let region = &mut self.regions[slot];
        if !region.writable {
            return Err(MemoryError::ReadOnly { addr });
        }
        let index = region.index(addr);
        region.backing[index] = value;
        if let Some(PortHook::Ppu) = region.hook {
            ppu.port_write(addr, value)?;
        }
        Ok(())
    }

    /// Fill `buf` with consecutive bytes starting at `addr`.
    ///
    /// The address wraps at 16 bits and mirroring applies per byte, so a read
    /// spanning a mirror boundary sees the same bytes a one-at-a-time reader
    /// would.
    pub fn read_bytes(&self, addr: u16, buf: &mut [u8], ppu: &mut Ppu) -> Result<(), MemoryError> {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(addr.wrapping_add(i as u16), ppu)?;
        }
        Ok(())
    }
}

/// Memory map errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("no mapped region contains address {addr:#06x}")]
    Unmapped { addr: u16 },
    #[error("range {start:#06x}..{end:#07x} overlaps an existing mapping")]
    AlreadyMapped { start: u16, end: u32 },
    #[error("write to read-only memory at {addr:#06x}")]
    ReadOnly { addr: u16 },
    #[error(transparent)]
    Port(#[from] PpuError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::NmiLine;

    fn ppu() -> Ppu {
        Ppu::new(NmiLine::new())
    }

    fn sample_mmu() -> Mmu {
        let mut mmu = Mmu::new();
        mmu.map(Region::ram(0x0000, 0x2000, 0x800)).unwrap();
        mmu.map(Region::rom(0x8000, 0x1_0000, vec![0xEA; 0x4000]))
            .unwrap();
        mmu.sort_regions();
        mmu
    }

    #[test]
    fn read_after_write_round_trips() {
        let mut mmu = sample_mmu();
        let mut ppu = ppu();
        mmu.write_byte(0x0123, 0x42, &mut ppu).unwrap();
        assert_eq!(mmu.read_byte(0x0123, &mut ppu).unwrap(), 0x42);
        // Reads have no side effects.
        assert_eq!(mmu.read_byte(0x0123, &mut ppu).unwrap(), 0x42);
    }

    #[test]
    fn ram_mirrors_through_the_mapped_range() {
        let mut mmu = sample_mmu();
        let mut ppu = ppu();
        mmu.write_byte(0x0001, 0x77, &mut ppu).unwrap();
        assert_eq!(mmu.read_byte(0x0801, &mut ppu).unwrap(), 0x77);
        assert_eq!(mmu.read_byte(0x1801, &mut ppu).unwrap(), 0x77);
    }

    #[test]
    fn mirrored_reads_follow_backing_modulo() {
        let mut mmu = Mmu::new();
        let backing: Vec<u8> = (0x00..0x10).collect();
        mmu.map(Region::rom(0x120, 0x140, backing)).unwrap();
        mmu.sort_regions();
        let mut ppu = ppu();

        assert_eq!(mmu.read_byte(0x13F, &mut ppu).unwrap(), 0x0F);
        assert_eq!(mmu.read_byte(0x137, &mut ppu).unwrap(), 0x07);
        assert_eq!(mmu.read_byte(0x13C, &mut ppu).unwrap(), 0x0C);
    }

    #[test]
    fn overlapping_map_is_rejected() {
        let mut mmu = Mmu::new();
        mmu.map(Region::rom(0x120, 0x140, vec![0; 16])).unwrap();
        let err = mmu.map(Region::ram(0x110, 0x130, 16)).unwrap_err();
        assert_eq!(
            err,
            MemoryError::AlreadyMapped {
                start: 0x110,
                end: 0x130
            }
        );
    }

    #[test]
    fn adjacent_regions_are_not_overlapping() {
        let mut mmu = Mmu::new();
        mmu.map(Region::ram(0x100, 0x200, 0x100)).unwrap();
        mmu.map(Region::ram(0x200, 0x300, 0x100)).unwrap();
        mmu.sort_regions();
        let mut ppu = ppu();
        assert!(mmu.read_byte(0x1FF, &mut ppu).is_ok());
        assert!(mmu.read_byte(0x200, &mut ppu).is_ok());
    }

    #[test]
    fn unmapped_access_fails() {
        let mmu = sample_mmu();
        let mut ppu = ppu();
        assert_eq!(
            mmu.read_byte(0x5000, &mut ppu).unwrap_err(),
            MemoryError::Unmapped { addr: 0x5000 }
        );
    }

    #[test]
    fn rom_rejects_writes() {
        let mut mmu = sample_mmu();
        let mut ppu = ppu();
        assert_eq!(
            mmu.write_byte(0x8000, 0x00, &mut ppu).unwrap_err(),
            MemoryError::ReadOnly { addr: 0x8000 }
        );
        assert_eq!(mmu.read_byte(0x8000, &mut ppu).unwrap(), 0xEA);
    }

    #[test]
    fn binary_search_agrees_with_linear_scan() {
        let mut mmu = Mmu::new();
        mmu.map(Region::ram(0x0000, 0x2000, 0x800)).unwrap();
        mmu.map(Region::ram(0x4000, 0x4018, 0x18)).unwrap();
        mmu.map(Region::ram(0x6000, 0x8000, 0x2000)).unwrap();
        mmu.map(Region::rom(0x8000, 0x1_0000, vec![0; 0x4000]))
            .unwrap();
        mmu.sort_regions();

        for addr in (0x0000..=0xFFFF).step_by(13) {
            let linear = mmu.regions.iter().position(|r| r.contains(addr));
            assert_eq!(mmu.position(addr), linear, "address {addr:#06x}");
        }
    }

    #[test]
    fn read_bytes_crosses_mirror_boundaries() {
        let mut mmu = Mmu::new();
        let backing: Vec<u8> = (0x00..0x10).collect();
        mmu.map(Region::rom(0x120, 0x140, backing)).unwrap();
        mmu.sort_regions();
        let mut ppu = ppu();

        let mut buf = [0u8; 4];
        mmu.read_bytes(0x12E, &mut buf, &mut ppu).unwrap();
        assert_eq!(buf, [0x0E, 0x0F, 0x00, 0x01]);
    }
}
