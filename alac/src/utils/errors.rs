#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

/// No error.
pub const ALAC_NO_ERR: i32 = 0;

/// The requested operation is not implemented by this decoder.
pub const ALAC_UNIMPLEMENTED_ERROR: i32 = -4;

/// A parameter or the bitstream is invalid.
pub const ALAC_PARAM_ERROR: i32 = -50;

/// Memory for the decoder instance could not be allocated.
pub const ALAC_MEM_FULL_ERROR: i32 = -108;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Magic cookie is empty")]
    EmptyCookie,

    #[error("Magic cookie too short: {0} bytes left for a 24-byte ALACSpecificConfig")]
    CookieTooShort(usize),

    #[error("Unsupported compatible_version {0}, only version 0 is supported")]
    UnsupportedVersion(u8),

    #[error("frame_length must not be 0")]
    ZeroFrameLength,

    #[error("Unsupported bit_depth {0}, expected 16, 20, 24 or 32")]
    UnsupportedBitDepth(u8),

    #[error("num_channels must be between 1 and 8. Read {0}")]
    InvalidChannelCount(u8),

    #[error("kb must be between 1 and 31. Read {0}")]
    InvalidRiceLimit(u8),

    #[error("Channel layout info size must be 24. Read {0}")]
    InvalidLayoutInfoSize(u32),

    #[error("Channel layout info version must be 0. Read {0}")]
    InvalidLayoutInfoVersion(u32),

    #[error("Unknown ALAC channel layout tag {0:#010X}")]
    UnknownLayoutTag(u32),

    #[error("Channel layout describes {layout} channels, config declares {config}")]
    LayoutChannelMismatch { layout: u8, config: u8 },

    #[error("Reserved fields of channel layout info must be 0")]
    LayoutReservedNonZero,

    #[error("Failed to allocate decoder buffers for frame_length {0}")]
    OutOfMemory(u32),
}

impl ConfigError {
    pub fn status_code(&self) -> i32 {
        match self {
            ConfigError::OutOfMemory(_) => ALAC_MEM_FULL_ERROR,
            _ => ALAC_PARAM_ERROR,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("num_channels must be at least 1")]
    NoChannels,

    #[error("Sample buffer holds {actual} bytes, {required} required")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Frame ended before an END element")]
    UnexpectedEndOfFrame,

    #[error("Unused element header bits must be 0. Read {0:#05X}")]
    UnusedHeaderNonZero(u16),

    #[error("bytes_shifted must be 0, 1 or 2. Read 3")]
    InvalidBytesShifted,

    #[error("Shifting {shift} low-order bits leaves nothing of the {bit_depth}-bit samples")]
    ShiftExceedsBitDepth { shift: u32, bit_depth: u8 },

    #[error("mix_bits must be at most 31. Read {0}")]
    InvalidMixBits(u8),

    #[error("Element carries {samples} samples, exceeding frame_length {frame_length}")]
    SampleCountExceedsFrameLength { samples: u32, frame_length: u32 },

    #[error("Element carries {samples} samples, exceeding the requested maximum {max}")]
    SampleCountExceedsRequest { samples: u32, max: u32 },

    #[error("Zero run of {run} samples overflows the {remaining} remaining samples")]
    ZeroRunOverflow { run: u32, remaining: u32 },

    #[error("Adaptive mean {0:#010X} is out of range for a zero run")]
    MeanOutOfRange(u32),

    #[error("Unsupported element type {0}")]
    UnsupportedElement(&'static str),

    #[error("{0} bytes trail the END element")]
    TrailingData(u64),

    #[error("Frame is {actual} bytes, larger than max_frame_bytes {max}")]
    FrameTooLarge { actual: usize, max: u32 },
}

impl DecodeError {
    pub fn status_code(&self) -> i32 {
        match self {
            DecodeError::UnsupportedElement(_) => ALAC_UNIMPLEMENTED_ERROR,
            _ => ALAC_PARAM_ERROR,
        }
    }
}

/// Maps any error produced by this crate to an ALAC status code.
///
/// Bitstream exhaustion and other I/O errors report [`ALAC_PARAM_ERROR`].
pub fn status_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<DecodeError>() {
        e.status_code()
    } else if let Some(e) = err.downcast_ref::<ConfigError>() {
        e.status_code()
    } else {
        ALAC_PARAM_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            status_code(&anyhow!(DecodeError::UnsupportedElement("CCE"))),
            ALAC_UNIMPLEMENTED_ERROR
        );
        assert_eq!(
            status_code(&anyhow!(DecodeError::InvalidBytesShifted)),
            ALAC_PARAM_ERROR
        );
        assert_eq!(
            status_code(&anyhow!(ConfigError::OutOfMemory(4096))),
            ALAC_MEM_FULL_ERROR
        );

        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(status_code(&anyhow::Error::from(eof)), ALAC_PARAM_ERROR);
    }
}
