//! Whole-system tests: cartridge, wiring, CPU/PPU interleave, NMI delivery.

use rnes_core::cartridge::{CHR_UNIT, INES_MAGIC, PRG_UNIT};
use rnes_core::system::Nes;

/// 16 KiB PRG image: an infinite `JMP $C000` loop, NMI vector at 0xD000.
fn loop_image() -> Vec<u8> {
    let mut prg = vec![0xEA; PRG_UNIT];
    prg[0x0000] = 0x4C; // JMP $C000 (0xC000 maps to PRG offset 0)
    prg[0x0001] = 0x00;
    prg[0x0002] = 0xC0;
    prg[0x3FFA] = 0x00; // NMI vector -> 0xD000
    prg[0x3FFB] = 0xD0;
    prg[0x3FFC] = 0x00; // reset vector -> 0xC000
    prg[0x3FFD] = 0xC0;

    let mut rom = Vec::new();
    rom.extend_from_slice(&INES_MAGIC);
    rom.push(1);
    rom.push(1);
    rom.extend_from_slice(&[0u8; 10]);
    rom.extend_from_slice(&prg);
    rom.extend_from_slice(&[0u8; CHR_UNIT]);
    rom
}

#[test]
fn ram_mirrors_through_the_low_window() {
    let mut nes = Nes::from_ines(&loop_image()).unwrap();
    nes.write(0x0000, 0x42).unwrap();
    assert_eq!(nes.read(0x0800).unwrap(), 0x42);
    assert_eq!(nes.read(0x1000).unwrap(), 0x42);
    assert_eq!(nes.read(0x1800).unwrap(), 0x42);
}

#[test]
fn vblank_raises_nmi_and_the_cpu_services_it() {
    let mut nes = Nes::from_ines(&loop_image()).unwrap();
    // Enable NMI generation on VBLANK.
    nes.write(0x2000, 0x80).unwrap();

    // Run until the CPU lands in the NMI handler. The PPU needs its warm-up
    // ticks plus most of a frame before VBLANK starts.
    let mut serviced = false;
    for _ in 0..200_000 {
        nes.step().unwrap();
        if (0xD000..0xD100).contains(&nes.cpu().regs.pc) {
            serviced = true;
            break;
        }
    }
    assert!(serviced, "NMI never delivered");
    assert!(nes.ppu().status().vblank());

    // The loop keeps PC at 0xC000 between instructions, so that is the
    // context the NMI pushed: high byte, low byte, then the status byte.
    assert_eq!(nes.cpu().regs.sp, 0xFA);
    assert_eq!(nes.read(0x01FD).unwrap(), 0xC0);
    assert_eq!(nes.read(0x01FC).unwrap(), 0x00);
    assert_eq!(nes.read(0x01FB).unwrap(), 0x36);
}

/// CPU steps that comfortably cover the PPU warm-up (three PPU ticks each).
const BOOT_STEPS: usize = 20_000;

#[test]
fn ppustatus_read_clears_vblank_on_the_next_tick() {
    let mut nes = Nes::from_ines(&loop_image()).unwrap();
    // Warm-up forces VBLANK well before the first frame ends.
    for _ in 0..BOOT_STEPS {
        nes.step().unwrap();
    }
    assert!(nes.ppu().status().vblank());

    let bits = nes.read(0x2002).unwrap();
    assert_ne!(bits & 0x80, 0);
    nes.step().unwrap();
    assert!(!nes.ppu().status().vblank());
}

#[test]
fn cpu_and_ppu_stay_in_ratio() {
    let mut nes = Nes::from_ines(&loop_image()).unwrap();
    for _ in 0..1000 {
        nes.step().unwrap();
    }
    assert_eq!(nes.cpu().ticks(), 1000);
    assert_eq!(nes.ppu().ticks(), 3000);
}
