//! Frame relay: wire framing and transports.
//!
//! Each captured frame goes out as a fixed 5-byte header token followed by
//! the raw register-window bytes. The playback hardware resynchronizes on
//! the header, so partial frames from a dropped link recover on the next
//! one. Pacing is the caller's job; sinks just write.

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;

/// Header token preceding every frame on the wire. The leading carriage
/// return gives the receiver an unambiguous resync point.
pub const FRAME_HEADER: &[u8; 5] = b"\rSDMP";

/// Default target device on the capture host.
pub const DEFAULT_PORT: &str = "/dev/ttyAMA0";

/// Default line speed, matching the receiver firmware.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Relay-side failures. Nothing here reaches back into the capture core.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("serial port: {0}")]
    Serial(#[from] serialport::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Anything that can consume the ordered frame sequence.
pub trait FrameSink {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;
}

/// Frames the byte stream for the physical link: header token, then the
/// raw window bytes, flushed per frame.
pub struct WireRelay<W: Write> {
    writer: W,
}

impl<W: Write> WireRelay<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for WireRelay<W> {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        self.writer.write_all(FRAME_HEADER)?;
        self.writer.write_all(frame)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Open a serial link configured like the original player: raw 8N1.
pub fn open_serial(
    path: &str,
    baud: u32,
) -> Result<WireRelay<Box<dyn serialport::SerialPort>>, TransportError> {
    let port = serialport::new(path, baud)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(Duration::from_secs(1))
        .open()?;
    Ok(WireRelay::new(port))
}

/// Human-readable sink: one line of two-digit hex bytes per frame.
pub struct HexSink<W: Write> {
    writer: W,
}

impl HexSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            writer: io::stdout(),
        }
    }
}

impl<W: Write> HexSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for HexSink<W> {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        for byte in frame {
            write!(self.writer, "{byte:02x} ")?;
        }
        writeln!(self.writer)?;
        Ok(())
    }
}
