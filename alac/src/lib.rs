#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! ### Magic Cookie
//!
//! The `ALACSpecificConfig` (24 bytes, big-endian) carries the frame length,
//! bit depth, channel count, sample rate and the tuning parameters of the
//! entropy coder, optionally followed by a channel layout atom.
//!
//! ### Frame Organization
//!
//! A frame is a sequence of elements (single channels, channel pairs, LFE,
//! data and fill elements) terminated by an END element. Audio elements are
//! either stored verbatim or compressed with:
//!
//! - adaptive Golomb coding of prediction residuals
//! - an adaptive linear predictor of up to 31 taps
//! - mid/side mixing for channel pairs
//! - low-order bytes sent uncompressed for high bit depths
//!
//! ### Output
//!
//! 16-bit samples in 2 bytes, 20- and 24-bit samples in 3 bytes, 32-bit
//! samples in 4 bytes, interleaved and little-endian.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alac::process::decode::Decoder;
//!
//! # let cookie: &[u8] = &[];
//! # let frames: Vec<Vec<u8>> = Vec::new();
//! let mut decoder = Decoder::new(cookie)?;
//!
//! let config = *decoder.config();
//! let channels = config.num_channels as u32;
//! let mut pcm = vec![0u8; config.output_frame_bytes(config.frame_length)];
//!
//! for frame in &frames {
//!     let samples = decoder.decode(frame, &mut pcm, config.frame_length, channels)?;
//!     let bytes = config.output_frame_bytes(samples);
//!     // Consume &pcm[..bytes]
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

/// C interface over [`process::decode::Decoder`].
pub mod ffi;

/// Frame decoding.
///
/// 1. **Entropy decoding** ([`process::entropy`]): Golomb-coded residuals
/// 2. **Prediction** ([`process::predictor`]): Sample reconstruction
/// 3. **Un-mixing** ([`process::matrix`]): Channel pairs and output packing
/// 4. **Decoding** ([`process::decode`]): Element loop and decoder lifecycle
pub mod process;

/// Data structures representing ALAC format components.
///
/// - **Configuration** ([`structs::config`]): Magic cookie
/// - **Channels** ([`structs::channel`]): Channel layouts
/// - **Elements** ([`structs::element`]): Element headers and parameters
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): Bounded bit-level reading
/// - **Error Handling** ([`utils::errors`]): Error types and status codes
pub mod utils;
