use anyhow::Result;

use crate::structs::channel::ChannelLayoutTag;
use crate::structs::config::AlacSpecificConfig;

/// Audio decoding to PCM samples.
///
/// Provides the [`Decoder`](decode::Decoder) that turns compressed frames into
/// interleaved little-endian PCM.
pub mod decode;

/// Adaptive Golomb decoding of prediction residuals.
pub mod entropy;

/// Channel pair un-mixing and output packing.
pub mod matrix;

/// Adaptive linear prediction.
pub mod predictor;

/// Lifecycle of a decoder instance: create, decode frames, inspect the
/// configuration, destroy.
///
/// Implemented by [`decode::Decoder`] and used by the C surface and the
/// command line tool, so either can run against another implementation.
pub trait FrameDecoder: Sized {
    /// Creates an instance from a magic cookie.
    fn create(cookie: &[u8]) -> Result<Self>;

    /// Decodes one frame into `out`, returning the samples written per
    /// channel.
    ///
    /// `out` must hold `max_samples` interleaved samples of `num_channels`
    /// channels.
    fn decode_frame(
        &mut self,
        frame: &[u8],
        out: &mut [u8],
        max_samples: u32,
        num_channels: u32,
    ) -> Result<u32>;

    /// Parsed stream configuration.
    fn config(&self) -> &AlacSpecificConfig;

    /// Order of the decoded channels. Defaults to the standard layout for
    /// the channel count.
    fn channel_layout(&self) -> ChannelLayoutTag {
        ChannelLayoutTag::for_channel_count(self.config().num_channels)
            .unwrap_or(ChannelLayoutTag::Stereo)
    }

    /// Sets the level at which stream anomalies turn into errors.
    fn set_fail_level(&mut self, level: log::Level);

    /// Releases the instance.
    fn destroy(self) {}
}
