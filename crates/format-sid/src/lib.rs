//! PSID/RSID music container parser.
//!
//! A SID file wraps a C64 music program: a memory payload plus the metadata
//! needed to run it — load address, init entry point, play entry point,
//! song count and credits. Header words are big-endian. A header load
//! address of zero means the real load address is the first two payload
//! bytes, little-endian, as a PRG-style prefix.

use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;

/// Minimum v1 header size; also the v1 payload offset.
pub const HEADER_V1_LEN: usize = 0x76;

/// Errors from parsing a SID container.
#[derive(Debug, Error)]
pub enum SidError {
    #[error("file too short: {0} bytes")]
    Truncated(usize),
    #[error("bad magic {0:02X?} (expected PSID or RSID)")]
    BadMagic([u8; 4]),
    #[error("data offset ${0:04X} points past end of file")]
    BadDataOffset(u16),
    #[error("payload missing its embedded load address")]
    MissingLoadAddress,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Container flavor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Magic {
    /// Self-contained tune, callable from a bare machine.
    Psid,
    /// Real C64 environment required (stricter; treated the same here).
    Rsid,
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Magic::Psid => "PSID",
            Magic::Rsid => "RSID",
        })
    }
}

/// A parsed SID container.
pub struct SidFile {
    magic: Magic,
    version: u16,
    load_address: u16,
    init_address: u16,
    play_address: u16,
    songs: u16,
    start_song: u16,
    speed: u32,
    name: String,
    author: String,
    released: String,
    payload: Vec<u8>,
}

impl SidFile {
    pub fn from_file(path: &Path) -> Result<Self, SidError> {
        Self::from_bytes(&fs::read(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SidError> {
        if data.len() < HEADER_V1_LEN {
            return Err(SidError::Truncated(data.len()));
        }

        let magic = match &data[0..4] {
            b"PSID" => Magic::Psid,
            b"RSID" => Magic::Rsid,
            other => {
                return Err(SidError::BadMagic([other[0], other[1], other[2], other[3]]));
            }
        };

        let version = word(data, 0x04);
        let data_offset = word(data, 0x06);
        let mut load_address = word(data, 0x08);
        let init_address = word(data, 0x0A);
        let play_address = word(data, 0x0C);
        let songs = word(data, 0x0E);
        let start_song = word(data, 0x10);
        let speed = u32::from(word(data, 0x12)) << 16 | u32::from(word(data, 0x14));

        let name = credit(data, 0x16);
        let author = credit(data, 0x36);
        let released = credit(data, 0x56);

        let mut body = data
            .get(data_offset as usize..)
            .ok_or(SidError::BadDataOffset(data_offset))?;

        // Load address 0: PRG-style prefix on the payload itself.
        if load_address == 0 {
            if body.len() < 2 {
                return Err(SidError::MissingLoadAddress);
            }
            load_address = u16::from_le_bytes([body[0], body[1]]);
            body = &body[2..];
        }

        Ok(Self {
            magic,
            version,
            load_address,
            init_address,
            play_address,
            songs,
            start_song,
            speed,
            name,
            author,
            released,
            payload: body.to_vec(),
        })
    }

    pub fn magic(&self) -> Magic {
        self.magic
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Base address the payload loads at.
    pub fn load_address(&self) -> u16 {
        self.load_address
    }

    pub fn init_address(&self) -> u16 {
        self.init_address
    }

    /// Play entry point. Zero means "read the interrupt vector after init".
    pub fn play_address(&self) -> u16 {
        self.play_address
    }

    pub fn songs(&self) -> u16 {
        self.songs
    }

    /// Default song, 1-based as stored in the header.
    pub fn start_song(&self) -> u16 {
        self.start_song
    }

    /// True when `song` (0-based) wants CIA timer ticks rather than the
    /// vertical blank. Informational only; the capture tick rate is fixed
    /// by session configuration.
    pub fn uses_cia_timing(&self, song: u16) -> bool {
        let bit = song.min(31);
        self.speed & (1 << bit) != 0
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn released(&self) -> &str {
        &self.released
    }

    /// The C64 memory payload, load-address prefix already stripped.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

fn word(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

/// Credit fields are 32 bytes of Latin-1, zero-padded.
fn credit(data: &[u8], offset: usize) -> String {
    data[offset..offset + 32]
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| b as char)
        .collect()
}
