//! Magic cookie parsing.
//!
//! ## Layout
//!
//! The cookie handed to the decoder is the `ALACSpecificConfig` (24 bytes,
//! big-endian), optionally followed by an `ALACChannelLayoutInfo` atom
//! (24 bytes). Cookies vended by older encoders may wrap the config in a
//! format (`frma`) atom and an `alac` atom header, which are skipped.
//!
//! ## Tuning Parameters
//!
//! `pb`, `mb` and `kb` drive the adaptive Golomb coder; `max_run` is carried
//! for completeness and not used by the decoder.

use anyhow::{Result, bail};
use log::{debug, trace};

use crate::process::matrix::bytes_per_sample;
use crate::structs::channel::ChannelLayoutTag;
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::ConfigError;

/// Highest `compatible_version` this decoder understands.
pub const ALAC_COMPATIBLE_VERSION: u8 = 0;

/// Size of the `ALACSpecificConfig` structure in bytes.
pub const ALAC_SPECIFIC_CONFIG_SIZE: usize = 24;

/// Size of the `ALACChannelLayoutInfo` atom in bytes.
pub const CHANNEL_LAYOUT_INFO_SIZE: usize = 24;

/// Size of a skipped `frma` atom or `alac` atom header.
const ATOM_HEADER_SIZE: usize = 12;

pub const MAX_CHANNELS: u8 = 8;

pub const DEFAULT_PB: u8 = 40;
pub const DEFAULT_MB: u8 = 10;
pub const DEFAULT_KB: u8 = 14;
pub const DEFAULT_MAX_RUN: u16 = 255;

/// Parsed `ALACSpecificConfig`.
///
/// Field order and widths match Apple's C structure so a reference can be
/// handed across the C boundary unchanged. Multi-byte fields are stored in
/// native byte order.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlacSpecificConfig {
    /// Samples per channel in a full frame.
    pub frame_length: u32,
    pub compatible_version: u8,
    pub bit_depth: u8,
    /// Rice history multiplier.
    pub pb: u8,
    /// Rice initial history.
    pub mb: u8,
    /// Rice parameter limit.
    pub kb: u8,
    pub num_channels: u8,
    pub max_run: u16,
    /// Largest compressed frame in the stream, 0 when unknown.
    pub max_frame_bytes: u32,
    /// Average bit rate in bits per second, 0 when unknown.
    pub avg_bit_rate: u32,
    pub sample_rate: u32,
}

impl AlacSpecificConfig {
    /// Builds a config with the encoder's default tuning parameters.
    pub fn new(frame_length: u32, bit_depth: u8, num_channels: u8, sample_rate: u32) -> Self {
        Self {
            frame_length,
            compatible_version: ALAC_COMPATIBLE_VERSION,
            bit_depth,
            pb: DEFAULT_PB,
            mb: DEFAULT_MB,
            kb: DEFAULT_KB,
            num_channels,
            max_run: DEFAULT_MAX_RUN,
            max_frame_bytes: 0,
            avg_bit_rate: 0,
            sample_rate,
        }
    }

    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let config = Self {
            frame_length: reader.get_n(32)?,
            compatible_version: reader.get_n(8)?,
            bit_depth: reader.get_n(8)?,
            pb: reader.get_n(8)?,
            mb: reader.get_n(8)?,
            kb: reader.get_n(8)?,
            num_channels: reader.get_n(8)?,
            max_run: reader.get_n(16)?,
            max_frame_bytes: reader.get_n(32)?,
            avg_bit_rate: reader.get_n(32)?,
            sample_rate: reader.get_n(32)?,
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compatible_version > ALAC_COMPATIBLE_VERSION {
            bail!(ConfigError::UnsupportedVersion(self.compatible_version));
        }

        if self.frame_length == 0 {
            bail!(ConfigError::ZeroFrameLength);
        }

        if !matches!(self.bit_depth, 16 | 20 | 24 | 32) {
            bail!(ConfigError::UnsupportedBitDepth(self.bit_depth));
        }

        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            bail!(ConfigError::InvalidChannelCount(self.num_channels));
        }

        if self.kb == 0 || self.kb > 31 {
            bail!(ConfigError::InvalidRiceLimit(self.kb));
        }

        Ok(())
    }

    /// Serializes the config in its big-endian cookie form.
    pub fn to_bytes(&self) -> [u8; ALAC_SPECIFIC_CONFIG_SIZE] {
        let mut bytes = [0u8; ALAC_SPECIFIC_CONFIG_SIZE];

        bytes[0..4].copy_from_slice(&self.frame_length.to_be_bytes());
        bytes[4] = self.compatible_version;
        bytes[5] = self.bit_depth;
        bytes[6] = self.pb;
        bytes[7] = self.mb;
        bytes[8] = self.kb;
        bytes[9] = self.num_channels;
        bytes[10..12].copy_from_slice(&self.max_run.to_be_bytes());
        bytes[12..16].copy_from_slice(&self.max_frame_bytes.to_be_bytes());
        bytes[16..20].copy_from_slice(&self.avg_bit_rate.to_be_bytes());
        bytes[20..24].copy_from_slice(&self.sample_rate.to_be_bytes());

        bytes
    }

    /// Bytes occupied by one decoded sample in the output buffer.
    ///
    /// 20-bit samples are left-justified in 3 bytes.
    pub fn output_bytes_per_sample(&self) -> usize {
        bytes_per_sample(self.bit_depth)
    }

    /// Container bit depth of the decoded samples.
    pub fn output_bit_depth(&self) -> u32 {
        self.output_bytes_per_sample() as u32 * 8
    }

    /// Bytes needed to hold `samples` decoded samples of every channel.
    pub fn output_frame_bytes(&self, samples: u32) -> usize {
        samples as usize * self.num_channels as usize * self.output_bytes_per_sample()
    }
}

/// A parsed magic cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagicCookie {
    pub config: AlacSpecificConfig,
    /// Layout from the `ALACChannelLayoutInfo` atom, when present.
    pub channel_layout_info: Option<ChannelLayoutTag>,
}

impl MagicCookie {
    pub fn parse(cookie: &[u8]) -> Result<Self> {
        if cookie.is_empty() {
            bail!(ConfigError::EmptyCookie);
        }

        let mut rest = cookie;

        for atom in [b"frma", b"alac"] {
            if rest.len() >= ATOM_HEADER_SIZE && &rest[4..8] == atom {
                trace!(
                    "Skipping '{}' atom in magic cookie",
                    String::from_utf8_lossy(atom)
                );
                rest = &rest[ATOM_HEADER_SIZE..];
            }
        }

        if rest.len() < ALAC_SPECIFIC_CONFIG_SIZE {
            bail!(ConfigError::CookieTooShort(rest.len()));
        }

        let reader = &mut BsIoSliceReader::from_slice(&rest[..ALAC_SPECIFIC_CONFIG_SIZE]);
        let config = AlacSpecificConfig::read(reader)?;

        let layout = &rest[ALAC_SPECIFIC_CONFIG_SIZE..];
        let channel_layout_info =
            if layout.len() >= CHANNEL_LAYOUT_INFO_SIZE && &layout[4..8] == b"chan" {
                let reader = &mut BsIoSliceReader::from_slice(&layout[..CHANNEL_LAYOUT_INFO_SIZE]);
                Some(Self::read_channel_layout_info(reader, config.num_channels)?)
            } else {
                if !layout.is_empty() {
                    debug!(
                        "Ignoring {} trailing magic cookie bytes without channel layout info",
                        layout.len()
                    );
                }
                None
            };

        Ok(Self {
            config,
            channel_layout_info,
        })
    }

    fn read_channel_layout_info(
        reader: &mut BsIoSliceReader,
        num_channels: u8,
    ) -> Result<ChannelLayoutTag> {
        let size: u32 = reader.get_n(32)?;
        if size as usize != CHANNEL_LAYOUT_INFO_SIZE {
            bail!(ConfigError::InvalidLayoutInfoSize(size));
        }

        reader.skip_n(32)?; // 'chan'

        let version: u32 = reader.get_n(32)?;
        if version != 0 {
            bail!(ConfigError::InvalidLayoutInfoVersion(version));
        }

        let raw_tag: u32 = reader.get_n(32)?;
        let Some(tag) = ChannelLayoutTag::from_u32(raw_tag) else {
            bail!(ConfigError::UnknownLayoutTag(raw_tag));
        };

        if tag.channel_count() != num_channels {
            bail!(ConfigError::LayoutChannelMismatch {
                layout: tag.channel_count(),
                config: num_channels,
            });
        }

        let reserved1: u32 = reader.get_n(32)?;
        let reserved2: u32 = reader.get_n(32)?;
        if reserved1 != 0 || reserved2 != 0 {
            bail!(ConfigError::LayoutReservedNonZero);
        }

        Ok(tag)
    }

    /// Effective channel layout: the explicit one, or the ALAC default for
    /// the channel count.
    pub fn channel_layout(&self) -> ChannelLayoutTag {
        self.channel_layout_info
            .or_else(|| ChannelLayoutTag::for_channel_count(self.config.num_channels))
            .unwrap_or(ChannelLayoutTag::Stereo)
    }
}
