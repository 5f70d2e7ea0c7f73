//! rnes - command line driver for the rnes-core emulator.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use rnes_core::cartridge::Cartridge;
use rnes_core::system::Nes;

/// NES emulator driver
#[derive(Parser, Debug)]
#[command(name = "rnes")]
#[command(about = "Run an iNES ROM on the rnes emulation core", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Stop after this many CPU instructions (0 = run until execution stops)
    #[arg(short, long, default_value = "0")]
    steps: u64,

    /// Dump CPU state after execution
    #[arg(long)]
    dump_cpu: bool,

    /// Dump PPU state after execution
    #[arg(long)]
    dump_ppu: bool,

    /// Render one pattern-table tile as ASCII after execution
    #[arg(long, value_name = "INDEX")]
    dump_tile: Option<u8>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let image = fs::read(&args.rom)
        .with_context(|| format!("reading ROM file {}", args.rom.display()))?;
    let cartridge = Cartridge::from_ines(&image).context("loading cartridge")?;

    println!("Loaded cartridge:");
    println!("  PRG ROM: {} bytes", cartridge.prg().len());
    println!("  CHR ROM: {} bytes", cartridge.chr().len());
    println!("  Mapper: {}", cartridge.mapper());
    println!("  Mirroring: {:?}", cartridge.mirroring());

    let mut nes = Nes::new(&cartridge).context("wiring system")?;

    let limit = (args.steps > 0).then_some(args.steps);
    let outcome = nes.run(limit);

    if args.dump_cpu {
        dump_cpu_state(&nes);
    }
    if args.dump_ppu {
        dump_ppu_state(&nes);
    }
    if let Some(index) = args.dump_tile {
        dump_tile(&nes, index);
    }

    match outcome {
        Ok(executed) => {
            println!("Executed {executed} instructions.");
            Ok(())
        }
        Err(err) => Err(err).with_context(|| {
            format!(
                "execution stopped after {} instructions",
                nes.cpu().ticks()
            )
        }),
    }
}

fn dump_cpu_state(nes: &Nes) {
    let cpu = nes.cpu();
    println!("\nCPU state:");
    println!("  {}", cpu.regs);
    println!("  Instructions: {}", cpu.ticks());
    println!("  Cycles: {}", cpu.cycles());
}

fn dump_ppu_state(nes: &Nes) {
    let ppu = nes.ppu();
    println!("\nPPU state:");
    println!("  Row: {} Col: {}", ppu.frame_row(), ppu.frame_col());
    println!("  Ticks: {}", ppu.ticks());
    println!("  Ready: {}", ppu.is_ready());
    println!("  VBLANK: {}", ppu.status().vblank());
}

fn dump_tile(nes: &Nes, index: u8) {
    const SHADES: [char; 4] = [' ', '.', 'x', 'X'];
    println!("\nPattern tile {index}:");
    for row in nes.ppu().pattern_tile(0, index) {
        let line: String = row
            .iter()
            .map(|&pixel| SHADES[usize::from(pixel)])
            .collect();
        println!("  {line}");
    }
}
