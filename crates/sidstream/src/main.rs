//! SID register streamer binary.
//!
//! Loads a SID file, runs its init routine, then executes the play routine
//! once per tick, pushing each captured register frame over the serial
//! link (and optionally dumping it as hex). Real-time pacing lives here,
//! not in the engine: the emulation itself runs as fast as it can.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use format_sid::SidFile;
use sid_player::{Player, SessionConfig};
use sid_relay::{FrameSink, HexSink, open_serial};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "sidstream",
    about = "Stream SID register frames from an emulated C64 music program to playback hardware.",
    after_help = "CPU emulation is best-effort: undocumented opcodes are skipped with a warning."
)]
struct Args {
    /// SID file to play
    sidfile: PathBuf,

    /// Subtune number, zero-based
    #[arg(short = 'a', long, default_value_t = 0)]
    subtune: u8,

    /// Playback speed in updates per second
    #[arg(short = 's', long, default_value_t = 50)]
    speed: u32,

    /// Playback time in seconds
    #[arg(short = 't', long, default_value_t = 300)]
    seconds: u32,

    /// First frame to emit (earlier frames still execute)
    #[arg(short = 'f', long, default_value_t = 0)]
    first_frame: u32,

    /// Serial device for the playback hardware
    #[arg(long, default_value = sid_relay::DEFAULT_PORT)]
    port: String,

    /// Serial line speed
    #[arg(long, default_value_t = sid_relay::DEFAULT_BAUD)]
    baud: u32,

    /// Print each frame as hex on stdout
    #[arg(long, action = clap::ArgAction::SetTrue)]
    hex: bool,

    /// Skip the serial link entirely (useful with --hex)
    #[arg(long, action = clap::ArgAction::SetTrue)]
    no_relay: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let sid = SidFile::from_file(&args.sidfile)
        .with_context(|| format!("reading {}", args.sidfile.display()))?;

    info!(
        "{}: \"{}\" by {} ({}), {} subtune(s)",
        sid.magic(),
        sid.name(),
        sid.author(),
        sid.released(),
        sid.songs()
    );
    info!(
        "load ${:04X}, init ${:04X}, play ${:04X}",
        sid.load_address(),
        sid.init_address(),
        sid.play_address()
    );

    let config = SessionConfig {
        frame_rate: args.speed.max(1),
        seconds: args.seconds,
        first_frame: args.first_frame,
        ..SessionConfig::default()
    };
    let delay = config.frame_duration();

    let mut player =
        Player::new(&sid, args.subtune, config).context("loading tune into memory")?;
    player.run_init();
    info!("playing from ${:04X}", player.play_address());

    let mut sinks: Vec<Box<dyn FrameSink>> = Vec::new();
    if args.hex {
        sinks.push(Box::new(HexSink::stdout()));
    }
    if !args.no_relay {
        let relay = open_serial(&args.port, args.baud)
            .with_context(|| format!("opening serial port {}", args.port))?;
        sinks.push(Box::new(relay));
    }

    for frame in player.frames() {
        let frame = frame.context("capture session aborted")?;
        for sink in &mut sinks {
            sink.send(frame.bytes()).context("relaying frame")?;
        }
        spin_sleep::sleep(delay);
    }

    Ok(())
}
