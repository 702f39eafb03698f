//! Frame decoding.
//!
//! A [`Decoder`] is created from a magic cookie and then fed one compressed
//! frame at a time. Frames are independent of each other: every element
//! starts its entropy coder and predictor from the parameters carried in
//! the frame, so a failed frame does not affect the next one.

use anyhow::{Result, anyhow, bail};
use log::Level::Warn;
use log::{debug, trace};

use crate::log_or_err;
use crate::process::FrameDecoder;
use crate::process::entropy::{AgParams, dyn_decomp};
use crate::process::matrix::{apply_shift, unmix, write_channel, zero_channel};
use crate::process::predictor::{integrate, unpc_block};
use crate::structs::channel::ChannelLayoutTag;
use crate::structs::config::{AlacSpecificConfig, MagicCookie};
use crate::structs::element::{
    ElementHeader, ElementType, MixParams, PredictorParams, skip_data_stream_element,
    skip_fill_element,
};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::{ConfigError, DecodeError};

/// Scratch buffers sized for one frame.
#[derive(Debug)]
struct ElementBuffers {
    mix_u: Vec<i32>,
    mix_v: Vec<i32>,
    predictor: Vec<i32>,
    /// Uncompressed low-order bits, interleaved for channel pairs.
    shift: Vec<u16>,
}

fn zeroed<T: Copy + Default>(len: usize, frame_length: u32) -> Result<Vec<T>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ConfigError::OutOfMemory(frame_length))?;
    buf.resize(len, T::default());

    Ok(buf)
}

impl ElementBuffers {
    fn new(frame_length: u32) -> Result<Self> {
        let len = frame_length as usize;

        Ok(Self {
            mix_u: zeroed(len, frame_length)?,
            mix_v: zeroed(len, frame_length)?,
            predictor: zeroed(len, frame_length)?,
            shift: zeroed(len * 2, frame_length)?,
        })
    }
}

/// Decodes ALAC frames to interleaved little-endian PCM.
#[derive(Debug)]
pub struct Decoder {
    config: AlacSpecificConfig,
    channel_layout: ChannelLayoutTag,
    buffers: ElementBuffers,
    fail_level: log::Level,
}

impl Decoder {
    /// Creates a decoder from a magic cookie.
    ///
    /// Fails with [`ConfigError`] if the cookie is malformed or describes an
    /// unsupported stream, or if the frame buffers cannot be allocated.
    pub fn new(cookie: &[u8]) -> Result<Self> {
        let cookie = MagicCookie::parse(cookie)?;
        let config = cookie.config;

        debug!(
            "ALAC stream: {} Hz, {} channels ({}), {}-bit, {} samples per frame",
            config.sample_rate,
            config.num_channels,
            cookie.channel_layout(),
            config.bit_depth,
            config.frame_length
        );

        Ok(Self {
            config,
            channel_layout: cookie.channel_layout(),
            buffers: ElementBuffers::new(config.frame_length)?,
            fail_level: log::Level::Error,
        })
    }

    pub fn config(&self) -> &AlacSpecificConfig {
        &self.config
    }

    pub fn channel_layout(&self) -> ChannelLayoutTag {
        self.channel_layout
    }

    /// Sets the failure level for stream anomalies.
    ///
    /// - `log::Level::Error`: Only fail on malformed frames (default)
    /// - `log::Level::Warn`: Also fail on trailing data and oversized frames (strict mode)
    pub fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }

    /// Decodes one compressed frame into `out`.
    ///
    /// `out` must hold `max_samples` interleaved samples of `num_channels`
    /// channels. Returns the number of samples per channel written, which
    /// never exceeds `max_samples`.
    pub fn decode(
        &mut self,
        frame: &[u8],
        out: &mut [u8],
        max_samples: u32,
        num_channels: u32,
    ) -> Result<u32> {
        let max_frame_bytes = self.config.max_frame_bytes;
        if max_frame_bytes != 0 && frame.len() > max_frame_bytes as usize {
            log_or_err!(
                self,
                Warn,
                anyhow!(DecodeError::FrameTooLarge {
                    actual: frame.len(),
                    max: max_frame_bytes,
                })
            );
        }

        let reader = &mut BsIoSliceReader::from_slice(frame);
        self.decode_bitstream(reader, out, max_samples, num_channels)
    }

    fn decode_bitstream(
        &mut self,
        reader: &mut BsIoSliceReader,
        out: &mut [u8],
        max_samples: u32,
        num_channels: u32,
    ) -> Result<u32> {
        if num_channels == 0 {
            bail!(DecodeError::NoChannels);
        }

        let bit_depth = self.config.bit_depth;
        let num_channels = num_channels as usize;
        let required = self
            .config
            .output_bytes_per_sample()
            .checked_mul(num_channels)
            .and_then(|bytes| bytes.checked_mul(max_samples as usize));
        match required {
            Some(required) if out.len() >= required => {}
            _ => bail!(DecodeError::BufferTooSmall {
                required: required.unwrap_or(usize::MAX),
                actual: out.len(),
            }),
        }

        let mut num_samples = self.config.frame_length.min(max_samples);
        let mut channel_index = 0;

        loop {
            if reader.available()? == 0 {
                bail!(DecodeError::UnexpectedEndOfFrame);
            }

            let element = ElementType::read(reader)?;

            match element {
                ElementType::SCE | ElementType::LFE => {
                    num_samples = self.decode_element(
                        reader,
                        element,
                        out,
                        channel_index,
                        num_channels,
                        max_samples,
                    )?;
                    channel_index += 1;
                }
                ElementType::CPE => {
                    if channel_index + 2 > num_channels {
                        debug!(
                            "CPE at channel {channel_index} exceeds {num_channels} requested channels"
                        );
                        break;
                    }

                    num_samples = self.decode_element(
                        reader,
                        element,
                        out,
                        channel_index,
                        num_channels,
                        max_samples,
                    )?;
                    channel_index += 2;
                }
                ElementType::CCE | ElementType::PCE => {
                    bail!(DecodeError::UnsupportedElement(element.name()));
                }
                ElementType::DSE => skip_data_stream_element(reader)?,
                ElementType::FIL => skip_fill_element(reader)?,
                ElementType::END => {
                    reader.byte_align();

                    let trailing = reader.available()? / 8;
                    if trailing > 0 {
                        log_or_err!(self, Warn, anyhow!(DecodeError::TrailingData(trailing)));
                    }

                    break;
                }
            }

            if channel_index >= num_channels {
                break;
            }
        }

        for channel in channel_index..num_channels {
            zero_channel(out, num_samples as usize, channel, num_channels, bit_depth);
        }

        Ok(num_samples)
    }

    fn element_sample_count(&self, header: &ElementHeader, max_samples: u32) -> Result<u32> {
        let frame_length = self.config.frame_length;

        let samples = match header.num_samples {
            Some(samples) if samples > frame_length => {
                bail!(DecodeError::SampleCountExceedsFrameLength {
                    samples,
                    frame_length,
                });
            }
            Some(samples) => samples,
            None => frame_length,
        };

        if samples > max_samples {
            bail!(DecodeError::SampleCountExceedsRequest {
                samples,
                max: max_samples,
            });
        }

        Ok(samples)
    }

    /// Decodes an SCE, LFE or CPE into the output starting at `channel_index`.
    fn decode_element(
        &mut self,
        reader: &mut BsIoSliceReader,
        element: ElementType,
        out: &mut [u8],
        channel_index: usize,
        num_channels: usize,
        max_samples: u32,
    ) -> Result<u32> {
        let header = ElementHeader::read(reader)?;
        let config = self.config;
        let bit_depth = config.bit_depth;
        let pair = element == ElementType::CPE;

        let shift = header.shift_bits();
        if shift >= bit_depth as u32 {
            bail!(DecodeError::ShiftExceedsBitDepth { shift, bit_depth });
        }

        let num_samples = self.element_sample_count(&header, max_samples)?;
        let n = num_samples as usize;

        trace!(
            "{element} {}: {num_samples} samples, {} bytes shifted{}",
            header.instance_tag,
            header.bytes_shifted,
            if header.escape { ", escaped" } else { "" }
        );

        let ElementBuffers {
            mix_u,
            mix_v,
            predictor,
            shift: shift_buffer,
        } = &mut self.buffers;
        let u = &mut mix_u[..n];
        let v = &mut mix_v[..n];

        if header.escape {
            let chan_bits = bit_depth as u32;

            if pair {
                for (l, r) in u.iter_mut().zip(v.iter_mut()) {
                    *l = reader.get_s(chan_bits)?;
                    *r = reader.get_s(chan_bits)?;
                }
            } else {
                for sample in u.iter_mut() {
                    *sample = reader.get_s(chan_bits)?;
                }
            }
        } else {
            // A pair carries one extra bit for the side channel.
            let chan_bits = bit_depth as u32 - shift + pair as u32;

            let mix = MixParams::read(reader)?;
            let mut params_u = PredictorParams::read(reader)?;
            let mut params_v = if pair {
                Some(PredictorParams::read(reader)?)
            } else {
                None
            };

            let stride = if pair { 2 } else { 1 };
            if shift > 0 {
                for low in shift_buffer[..n * stride].iter_mut() {
                    *low = reader.get_n(shift)?;
                }
            }

            let predictor = &mut predictor[..n];
            decode_channel(&config, reader, &mut params_u, predictor, u, chan_bits)?;

            if let Some(params_v) = params_v.as_mut() {
                decode_channel(&config, reader, params_v, predictor, v, chan_bits)?;
                unmix(u, v, mix.mix_bits, mix.mix_res)?;
                apply_shift(v, shift_buffer, stride, 1, shift);
            }

            apply_shift(u, shift_buffer, stride, 0, shift);
        }

        write_channel(out, u, channel_index, num_channels, bit_depth);
        if pair {
            write_channel(out, v, channel_index + 1, num_channels, bit_depth);
        }

        Ok(num_samples)
    }
}

/// Decodes the residuals of one channel and runs its predictor into `out`.
fn decode_channel(
    config: &AlacSpecificConfig,
    reader: &mut BsIoSliceReader,
    params: &mut PredictorParams,
    predictor: &mut [i32],
    out: &mut [i32],
    chan_bits: u32,
) -> Result<()> {
    let ag_params = AgParams::new(config.mb, config.pb, params.pb_factor, config.kb);
    dyn_decomp(&ag_params, reader, predictor, chan_bits)?;

    if params.mode != 0 {
        integrate(predictor, chan_bits);
    }

    let num_coefs = params.num_coefs as usize;
    unpc_block(
        predictor,
        out,
        &mut params.coefs[..num_coefs],
        chan_bits,
        params.den_shift as u32,
    );

    Ok(())
}

impl FrameDecoder for Decoder {
    fn create(cookie: &[u8]) -> Result<Self> {
        Decoder::new(cookie)
    }

    fn decode_frame(
        &mut self,
        frame: &[u8],
        out: &mut [u8],
        max_samples: u32,
        num_channels: u32,
    ) -> Result<u32> {
        self.decode(frame, out, max_samples, num_channels)
    }

    fn config(&self) -> &AlacSpecificConfig {
        &self.config
    }

    fn channel_layout(&self) -> ChannelLayoutTag {
        self.channel_layout
    }

    fn set_fail_level(&mut self, level: log::Level) {
        self.fail_level = level;
    }
}
