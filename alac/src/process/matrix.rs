//! Channel pair un-mixing and PCM output.
//!
//! Decoded channels are written interleaved into the caller's byte buffer as
//! little-endian integers: 16-bit samples in 2 bytes, 20-bit samples
//! left-justified in 3 bytes, 24-bit samples in 3 bytes and 32-bit samples in
//! 4 bytes.

use anyhow::{Result, bail};

use crate::utils::errors::DecodeError;

/// Reverses the mid/side mix of a channel pair in place.
///
/// `u` becomes the left channel and `v` the right one. A `mix_res` of 0 means
/// the pair was coded as plain left/right and is left untouched.
pub fn unmix(u: &mut [i32], v: &mut [i32], mix_bits: u8, mix_res: i8) -> Result<()> {
    if mix_res == 0 {
        return Ok(());
    }

    if mix_bits > 31 {
        bail!(DecodeError::InvalidMixBits(mix_bits));
    }

    let mix_res = mix_res as i32;

    for (l, r) in u.iter_mut().zip(v.iter_mut()) {
        let side = *r;
        let left = l
            .wrapping_add(side)
            .wrapping_sub(mix_res.wrapping_mul(side) >> mix_bits);

        *l = left;
        *r = left.wrapping_sub(side);
    }

    Ok(())
}

/// Re-attaches the low-order bits sent uncompressed.
///
/// `shift_buffer` holds `stride` interleaved values per sample; the values of
/// this channel start at `offset`.
pub fn apply_shift(
    samples: &mut [i32],
    shift_buffer: &[u16],
    stride: usize,
    offset: usize,
    shift: u32,
) {
    if shift == 0 {
        return;
    }

    let low_bits = shift_buffer.iter().skip(offset).step_by(stride);
    for (sample, &low) in samples.iter_mut().zip(low_bits) {
        *sample = (*sample << shift) | low as i32;
    }
}

/// Bytes used by one output sample of the given bit depth.
pub fn bytes_per_sample(bit_depth: u8) -> usize {
    match bit_depth {
        16 => 2,
        20 | 24 => 3,
        _ => 4,
    }
}

/// Writes one channel into the interleaved output buffer.
pub fn write_channel(
    out: &mut [u8],
    samples: &[i32],
    channel: usize,
    num_channels: usize,
    bit_depth: u8,
) {
    let bps = bytes_per_sample(bit_depth);
    let start = channel * bps;

    for (frame, &sample) in out.chunks_exact_mut(bps * num_channels).zip(samples) {
        let dst = &mut frame[start..start + bps];

        match bit_depth {
            16 => dst.copy_from_slice(&(sample as i16).to_le_bytes()),
            20 => dst.copy_from_slice(&(sample << 4).to_le_bytes()[..3]),
            24 => dst.copy_from_slice(&sample.to_le_bytes()[..3]),
            _ => dst.copy_from_slice(&sample.to_le_bytes()),
        }
    }
}

/// Fills one channel of the interleaved output buffer with silence.
pub fn zero_channel(
    out: &mut [u8],
    num_samples: usize,
    channel: usize,
    num_channels: usize,
    bit_depth: u8,
) {
    let bps = bytes_per_sample(bit_depth);
    let start = channel * bps;

    for frame in out.chunks_exact_mut(bps * num_channels).take(num_samples) {
        frame[start..start + bps].fill(0);
    }
}
