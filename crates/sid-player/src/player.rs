//! Execution driver: runs init/play routines and produces frames.

use cpu_6502::{Mos6502, Step};
use format_sid::SidFile;
use sid_core::{ADDRESS_SPACE, Bus, LoadError, Memory};
use thiserror::Error;
use tracing::{info, warn};

use crate::{Frame, SessionConfig};

/// Processor port value after boot: BASIC, I/O and Kernal all mapped in.
const DEFAULT_BANK_STATE: u8 = 0x37;

/// Fatal session errors.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("play routine exceeded {ceiling} instructions at frame {frame}")]
    Runaway { frame: u64, ceiling: u32 },
    #[error("register window ${base:04X}+{len} extends past end of memory")]
    WindowOutOfRange { base: u16, len: usize },
}

/// How one routine invocation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Completed,
    Runaway,
}

/// One playback capture session.
///
/// Owns the address space and CPU outright; independent sessions don't
/// share anything, so tests can run several in parallel. Routine
/// invocations are strictly sequential — each runs to completion (or is
/// aborted by the runaway guard) before the next begins.
pub struct Player {
    config: SessionConfig,
    memory: Memory,
    cpu: Mos6502,
    init_address: u16,
    play_address: u16,
    subtune: u8,
    ticks: u64,
    instructions: u64,
    opcode_warned: bool,
}

impl Player {
    /// Load a tune into a fresh 64 KiB address space.
    ///
    /// `subtune` is zero-based, as passed to the init routine in A.
    pub fn new(sid: &SidFile, subtune: u8, config: SessionConfig) -> Result<Self, PlayerError> {
        // Every frame must be exactly window_len bytes, so the window has
        // to fit the address space outright.
        if usize::from(config.window_base) + config.window_len > ADDRESS_SPACE {
            return Err(PlayerError::WindowOutOfRange {
                base: config.window_base,
                len: config.window_len,
            });
        }

        let mut memory = Memory::new();
        memory.load(sid.payload(), sid.load_address())?;
        memory.write(0x01, DEFAULT_BANK_STATE);

        Ok(Self {
            config,
            memory,
            cpu: Mos6502::new(),
            init_address: sid.init_address(),
            play_address: sid.play_address(),
            subtune,
            ticks: 0,
            instructions: 0,
            opcode_warned: false,
        })
    }

    /// Run the init routine once to configure the selected subtune.
    ///
    /// A runaway here is a warning, not a failure: the tune may have left
    /// memory in a degraded but usable state, so playback proceeds anyway.
    pub fn run_init(&mut self) {
        if self.run_routine(self.init_address, self.subtune, false) == Outcome::Runaway {
            warn!(
                ceiling = self.config.instruction_ceiling,
                "init routine hit the instruction ceiling, continuing anyway"
            );
        }
        self.resolve_play_address();
    }

    /// Run the play routine once and capture the register window.
    ///
    /// A runaway here is fatal: once the play routine stops returning, no
    /// further output can be trusted.
    pub fn play_frame(&mut self) -> Result<Frame, PlayerError> {
        let frame = self.ticks;
        self.ticks += 1;
        match self.run_routine(self.play_address, 0, true) {
            Outcome::Completed => Ok(Frame::capture(
                &self.memory,
                self.config.window_base,
                self.config.window_len,
            )),
            Outcome::Runaway => Err(PlayerError::Runaway {
                frame,
                ceiling: self.config.instruction_ceiling,
            }),
        }
    }

    /// The lazy frame sequence for the whole session. Consumes the player:
    /// restarting a capture means loading a fresh session.
    pub fn frames(self) -> Frames {
        let total = self.config.total_frames();
        Frames {
            player: self,
            produced: 0,
            total,
        }
    }

    /// Play entry point, after any vector fallback resolution.
    pub fn play_address(&self) -> u16 {
        self.play_address
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Instructions executed so far, across all invocations.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    fn run_routine(&mut self, entry: u16, arg: u8, check_terminal: bool) -> Outcome {
        self.cpu.begin_routine(&mut self.memory, entry, arg, 0, 0);

        for _ in 0..self.config.instruction_ceiling {
            self.instructions += 1;
            match self.cpu.step(&mut self.memory) {
                Ok(Step::Halted) => return Outcome::Completed,
                Ok(Step::Running) => {}
                Err(err) => self.skip_unimplemented(err),
            }

            // Play routines installed as IRQ handlers exit by jumping into
            // the Kernal handler tail rather than returning. Only relevant
            // while the Kernal ROM is banked in.
            if check_terminal
                && self.kernal_mapped()
                && self.config.terminal_addresses.contains(&self.cpu.pc)
            {
                return Outcome::Completed;
            }
        }

        Outcome::Runaway
    }

    /// Best-effort policy for opcodes outside the modeled set: log once,
    /// then treat each occurrence as a one-byte no-op. Tunes are assumed
    /// not to depend on undocumented behavior.
    fn skip_unimplemented(&mut self, err: cpu_6502::CpuError) {
        if !self.opcode_warned {
            warn!("{err}; treating as no-op (reported once)");
            self.opcode_warned = true;
        }
    }

    /// A declared play address of zero means the init routine installed an
    /// interrupt handler; read the entry point from the active vector.
    fn resolve_play_address(&mut self) {
        if self.play_address != 0 {
            return;
        }
        let vector = if self.kernal_mapped() { 0x0314 } else { 0xFFFE };
        self.play_address = u16::from_le_bytes([
            self.memory.peek(vector),
            self.memory.peek(vector.wrapping_add(1)),
        ]);
        info!(
            "play address 0, using interrupt vector ${:04X} -> ${:04X}",
            vector, self.play_address
        );
    }

    fn kernal_mapped(&self) -> bool {
        self.memory.peek(0x01) & 0x07 != 0x05
    }
}

/// Lazy, finite, non-restartable frame sequence.
///
/// Yields one frame per play invocation from `first_frame` onward; earlier
/// invocations still run to advance playback state. Fuses after an error.
pub struct Frames {
    player: Player,
    produced: u64,
    total: u64,
}

impl Iterator for Frames {
    type Item = Result<Frame, PlayerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let first_emitted = u64::from(self.player.config.first_frame);
        while self.produced < self.total {
            let tick = self.produced;
            self.produced += 1;
            match self.player.play_frame() {
                Ok(frame) => {
                    if tick >= first_emitted {
                        return Some(Ok(frame));
                    }
                }
                Err(err) => {
                    self.produced = self.total;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
