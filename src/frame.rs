//! Frame encoding and validation for the PM2x05 wire protocol.
//!
//! Commands are 6 bytes: `[0x16, len, cmd, data_lo, data_hi, checksum]`.
//! Measurement responses are 12 bytes with the header at index 1, the
//! situation byte at index 3 and the checksum in the trailing byte. The
//! checksum in both directions is the sum of all preceding bytes modulo
//! 256. Everything in here is pure; no I/O.

use core::fmt;

use scroll::{Pread, Pwrite, LE};

use crate::variant::Variant;

pub(crate) const HEADER: u8 = 0x16;
pub(crate) const COMMAND_FRAME_SIZE: usize = 6;
pub(crate) const RESPONSE_FRAME_SIZE: usize = 12;

const CMD_MEASURE: u8 = 0x0c;
const CMD_POWER: u8 = 0xe4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    Measure,
    Sleep,
    Wake,
}

impl Command {
    fn code(self) -> u8 {
        match self {
            Command::Measure => CMD_MEASURE,
            Command::Sleep | Command::Wake => CMD_POWER,
        }
    }

    fn data(self) -> u16 {
        match self {
            Command::Measure | Command::Sleep => 0,
            Command::Wake => 1,
        }
    }
}

/// Errors produced while validating a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    #[error("response is {got} bytes, expected {expected}")]
    MalformedLength { expected: usize, got: usize },
    #[error("unexpected header byte {0:#04x}")]
    UnexpectedHeader(u8),
    #[error("checksum mismatch, computed {computed:#04x} received {received:#04x}")]
    ChecksumMismatch { computed: u8, received: u8 },
}

/// Detection state reported in byte 3 of a measurement response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Situation {
    Close,
    Malfunction,
    UnderDetecting,
    Completed,
    Unknown(u8),
}

impl Situation {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => Situation::Close,
            2 => Situation::Malfunction,
            3 => Situation::UnderDetecting,
            0x80 => Situation::Completed,
            other => Situation::Unknown(other),
        }
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Situation::Close => f.write_str("close"),
            Situation::Malfunction => f.write_str("malfunction"),
            Situation::UnderDetecting => f.write_str("under detecting"),
            Situation::Completed => f.write_str("detection completed"),
            Situation::Unknown(byte) => write!(f, "unknown situation {:#04x}", byte),
        }
    }
}

/// One decoded measurement response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MeasurementFrame {
    pub situation: Situation,
    pub pm1_0: u16,
    pub pm2_5: u16,
}

struct Layout {
    pm2_5: usize,
    pm1_0: usize,
}

const fn layout(variant: Variant) -> Layout {
    match variant {
        Variant::Pm2005 => Layout { pm2_5: 7, pm1_0: 9 },
        Variant::Pm2105 => Layout { pm2_5: 6, pm1_0: 8 },
    }
}

pub(crate) fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

pub(crate) fn encode_command(command: Command) -> [u8; COMMAND_FRAME_SIZE] {
    let mut buffer = [0u8; COMMAND_FRAME_SIZE];
    let mut offset = 0usize;

    buffer.gwrite::<u8>(HEADER, &mut offset).unwrap();
    buffer
        .gwrite::<u8>(COMMAND_FRAME_SIZE as u8, &mut offset)
        .unwrap();
    buffer.gwrite::<u8>(command.code(), &mut offset).unwrap();
    buffer
        .gwrite_with::<u16>(command.data(), &mut offset, LE)
        .unwrap();

    let sum = checksum(&buffer[..COMMAND_FRAME_SIZE - 1]);
    buffer.gwrite::<u8>(sum, &mut offset).unwrap();

    buffer
}

pub(crate) fn decode_measurement(
    variant: Variant,
    bytes: &[u8],
) -> Result<MeasurementFrame, FrameError> {
    if bytes.len() != RESPONSE_FRAME_SIZE {
        return Err(FrameError::MalformedLength {
            expected: RESPONSE_FRAME_SIZE,
            got: bytes.len(),
        });
    }

    let header: u8 = bytes.pread(1).unwrap();
    if header != HEADER {
        return Err(FrameError::UnexpectedHeader(header));
    }

    let length: u8 = bytes.pread(2).unwrap();
    if length as usize != RESPONSE_FRAME_SIZE {
        return Err(FrameError::MalformedLength {
            expected: RESPONSE_FRAME_SIZE,
            got: length as usize,
        });
    }

    let received: u8 = bytes.pread(RESPONSE_FRAME_SIZE - 1).unwrap();
    let computed = checksum(&bytes[..RESPONSE_FRAME_SIZE - 1]);
    if computed != received {
        return Err(FrameError::ChecksumMismatch { computed, received });
    }

    let fields = layout(variant);
    Ok(MeasurementFrame {
        situation: Situation::from_byte(bytes.pread(3).unwrap()),
        pm1_0: bytes.pread_with(fields.pm1_0, LE).unwrap(),
        pm2_5: bytes.pread_with(fields.pm2_5, LE).unwrap(),
    })
}
