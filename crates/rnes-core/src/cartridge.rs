//! Cartridge loading and the read-only view the rest of the system consumes.
//!
//! Parses the iNES byte layout: a 16-byte header, an optional 512-byte
//! trainer, PRG ROM in 16 KiB units and CHR ROM in 8 KiB units. Only the
//! fixed-bank NROM layout (mapper 0) is accepted.

/// iNES magic number: "NES\x1A"
pub const INES_MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];

/// iNES header size in bytes
pub const HEADER_SIZE: usize = 16;

/// PRG ROM unit size (header byte 4 counts these)
pub const PRG_UNIT: usize = 16 * 1024;

/// CHR ROM unit size (header byte 5 counts these)
pub const CHR_UNIT: usize = 8 * 1024;

/// Trainer blob size, skipped when present
pub const TRAINER_SIZE: usize = 512;

/// Nametable mirroring arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Decoded iNES header fields
#[derive(Debug, Clone, Copy)]
pub struct InesHeader {
    /// PRG ROM size in 16 KiB units
    pub prg_units: u8,
    /// CHR ROM size in 8 KiB units
    pub chr_units: u8,
    /// Mapper number, `(byte7 & 0xF0) | (byte6 >> 4)`
    pub mapper: u8,
    pub mirroring: Mirroring,
    /// Battery-backed PRG RAM present
    pub persistent_memory: bool,
    /// 512-byte trainer precedes PRG data
    pub trainer: bool,
    pub vs_unisystem: bool,
    pub playchoice_10: bool,
    /// NES 2.0 marker, `(byte7 & 0x0C) == 0x08`
    pub nes2: bool,
}

impl InesHeader {
    /// Parse the 16-byte header.
    pub fn parse(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0..4] != INES_MAGIC {
            return Err(CartridgeError::BadMagic);
        }

        let flags6 = bytes[6];
        let flags7 = bytes[7];
        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            prg_units: bytes[4],
            chr_units: bytes[5],
            mapper: (flags7 & 0xF0) | (flags6 >> 4),
            mirroring,
            persistent_memory: flags6 & 0x02 != 0,
            trainer: flags6 & 0x04 != 0,
            vs_unisystem: flags7 & 0x01 != 0,
            playchoice_10: flags7 & 0x02 != 0,
            nes2: flags7 & 0x0C == 0x08,
        })
    }
}

/// Read-only cartridge handle: PRG, CHR, mapper id and mirroring.
#[derive(Debug, Clone)]
pub struct Cartridge {
    header: InesHeader,
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl Cartridge {
    /// Build a cartridge from a complete iNES image.
    pub fn from_ines(image: &[u8]) -> Result<Self, CartridgeError> {
        let header = InesHeader::parse(image)?;
        if header.nes2 {
            return Err(CartridgeError::Nes2Unsupported);
        }
        if header.mapper != 0 {
            return Err(CartridgeError::UnsupportedMapper(header.mapper));
        }

        let mut offset = HEADER_SIZE;
        if header.trainer {
            offset += TRAINER_SIZE;
        }
        let prg_len = usize::from(header.prg_units) * PRG_UNIT;
        let chr_len = usize::from(header.chr_units) * CHR_UNIT;
        let expected = offset + prg_len + chr_len;
        if image.len() < expected {
            return Err(CartridgeError::Truncated {
                expected,
                actual: image.len(),
            });
        }

        let prg = image[offset..offset + prg_len].to_vec();
        let chr = image[offset + prg_len..offset + prg_len + chr_len].to_vec();
        log::debug!(
            "loaded iNES image: {} bytes PRG, {} bytes CHR, mapper {}, {:?} mirroring",
            prg.len(),
            chr.len(),
            header.mapper,
            header.mirroring,
        );

        Ok(Self { header, prg, chr })
    }

    pub fn header(&self) -> &InesHeader {
        &self.header
    }

    /// Program ROM bytes.
    pub fn prg(&self) -> &[u8] {
        &self.prg
    }

    /// Character ROM bytes (pattern tables, consumed by the PPU).
    pub fn chr(&self) -> &[u8] {
        &self.chr
    }

    pub fn mapper(&self) -> u8 {
        self.header.mapper
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring
    }
}

/// Cartridge load errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CartridgeError {
    #[error("not an iNES image: bad magic")]
    BadMagic,
    #[error("iNES image truncated: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("mapper {0} is not supported (only NROM / mapper 0)")]
    UnsupportedMapper(u8),
    #[error("NES 2.0 images are not supported")]
    Nes2Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_units: u8, chr_units: u8, flags6: u8, flags7: u8) -> Vec<u8> {
        let mut rom = Vec::new();
        rom.extend_from_slice(&INES_MAGIC);
        rom.push(prg_units);
        rom.push(chr_units);
        rom.push(flags6);
        rom.push(flags7);
        rom.extend_from_slice(&[0u8; 8]);
        rom.extend_from_slice(&vec![0xAA; usize::from(prg_units) * PRG_UNIT]);
        rom.extend_from_slice(&vec![0x55; usize::from(chr_units) * CHR_UNIT]);
        rom
    }

    #[test]
    fn parses_header_fields() {
        let header = InesHeader::parse(&image(2, 1, 0b0000_0011, 0)).unwrap();
        assert_eq!(header.prg_units, 2);
        assert_eq!(header.chr_units, 1);
        assert_eq!(header.mapper, 0);
        assert_eq!(header.mirroring, Mirroring::Vertical);
        assert!(header.persistent_memory);
        assert!(!header.trainer);
    }

    #[test]
    fn four_screen_overrides_mirroring_bit() {
        let header = InesHeader::parse(&image(1, 1, 0b0000_1001, 0)).unwrap();
        assert_eq!(header.mirroring, Mirroring::FourScreen);
    }

    #[test]
    fn mapper_nibbles_combine() {
        let header = InesHeader::parse(&image(1, 1, 0x10, 0x40)).unwrap();
        assert_eq!(header.mapper, 0x41);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut rom = image(1, 1, 0, 0);
        rom[0] = b'X';
        assert_eq!(
            Cartridge::from_ines(&rom).unwrap_err(),
            CartridgeError::BadMagic
        );
    }

    #[test]
    fn rejects_nonzero_mapper() {
        let rom = image(1, 1, 0x40, 0);
        assert_eq!(
            Cartridge::from_ines(&rom).unwrap_err(),
            CartridgeError::UnsupportedMapper(4)
        );
    }

    #[test]
    fn rejects_nes2_marker() {
        let rom = image(1, 1, 0, 0x08);
        assert_eq!(
            Cartridge::from_ines(&rom).unwrap_err(),
            CartridgeError::Nes2Unsupported
        );
    }

    #[test]
    fn rejects_truncated_prg() {
        let mut rom = image(1, 1, 0, 0);
        rom.truncate(HEADER_SIZE + 100);
        assert!(matches!(
            Cartridge::from_ines(&rom).unwrap_err(),
            CartridgeError::Truncated { .. }
        ));
    }

    #[test]
    fn splits_prg_and_chr() {
        let cart = Cartridge::from_ines(&image(1, 1, 0, 0)).unwrap();
        assert_eq!(cart.prg().len(), PRG_UNIT);
        assert_eq!(cart.chr().len(), CHR_UNIT);
        assert!(cart.prg().iter().all(|&b| b == 0xAA));
        assert!(cart.chr().iter().all(|&b| b == 0x55));
    }
}
