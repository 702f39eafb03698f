//! Adaptive Golomb decoding of prediction residuals.
//!
//! Each residual is coded with a Golomb parameter `k` derived from a running
//! mean `mb` of the magnitudes seen so far. A prefix of 9 ones escapes to a
//! raw value. When the mean drops low enough, a run of zero residuals is
//! signalled instead of individual codes.

use anyhow::{Result, bail};

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::DecodeError;

const QBSHIFT: u32 = 9;
const QB: u32 = 1 << QBSHIFT;
const MMULSHIFT: u32 = 2;
const MDENSHIFT: u32 = 6;
const MOFF: u32 = 1 << (MDENSHIFT - 2);
const BITOFF: u32 = 24;

const N_MAX_MEAN_CLAMP: u32 = 0xffff;
const N_MEAN_CLAMP_VAL: u32 = 0xffff;

/// Longest unary prefix before the value is sent verbatim.
const MAX_PREFIX: u32 = 9;

/// Width of an escaped zero run length.
const ZERO_RUN_BITS: u32 = 16;

/// Parameters of the adaptive Golomb coder for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgParams {
    /// Initial mean.
    pub mb0: u32,
    /// History multiplier.
    pub pb: u32,
    /// Limit on `k`.
    pub kb: u32,
    /// Mask of `kb` bits.
    pub wb: u32,
}

impl AgParams {
    /// Builds the parameters from the configured tuning values and the
    /// per-channel `pb_factor`.
    pub fn new(mb: u8, pb: u8, pb_factor: u8, kb: u8) -> Self {
        let kb = kb as u32;

        Self {
            mb0: mb as u32,
            pb: pb as u32 * pb_factor as u32 / 4,
            kb,
            wb: ((1u64 << kb) - 1) as u32,
        }
    }
}

/// `floor(log2(x + 3))`
#[inline(always)]
fn lg3a(x: u32) -> u32 {
    31 - (x + 3).leading_zeros()
}

/// Reads one Golomb code with parameter `k` and multiplier `m = 2^k - 1`.
///
/// The `k`-bit suffix is only fully consumed when its value is at least 2;
/// otherwise its last bit belongs to the next code.
#[inline(always)]
fn dyn_get(reader: &mut BsIoSliceReader, m: u32, k: u32, max_bits: u32) -> Result<u32> {
    let prefix = reader.get_unary(MAX_PREFIX)?;

    if prefix >= MAX_PREFIX {
        return Ok(reader.get_bits(max_bits.min(32))?);
    }

    let mut value = prefix.wrapping_mul(m);

    if k > 1 {
        let suffix = reader.get_bits(k - 1)?;
        if suffix != 0 {
            let suffix = (suffix << 1) | reader.get()? as u32;
            value = value.wrapping_add(suffix - 1);
        }
    }

    Ok(value)
}

/// Decodes `out.len()` residuals of `max_bits` bits each.
pub fn dyn_decomp(
    params: &AgParams,
    reader: &mut BsIoSliceReader,
    out: &mut [i32],
    max_bits: u32,
) -> Result<()> {
    let num = out.len();
    let mut mb = params.mb0;
    let mut zmode = 0u32;
    let mut c = 0;

    while c < num {
        let k = lg3a(mb >> QBSHIFT).min(params.kb);
        let m = ((1u64 << k) - 1) as u32;

        let n = dyn_get(reader, m, k, max_bits)?;

        // The low bit carries the sign.
        let ndecode = n.wrapping_add(zmode);
        let magnitude = (ndecode.wrapping_add(1) >> 1) as i32;
        out[c] = if ndecode & 1 != 0 {
            magnitude.wrapping_neg()
        } else {
            magnitude
        };
        c += 1;

        mb = params
            .pb
            .wrapping_mul(ndecode)
            .wrapping_add(mb)
            .wrapping_sub(params.pb.wrapping_mul(mb) >> QBSHIFT);

        if n > N_MAX_MEAN_CLAMP {
            mb = N_MEAN_CLAMP_VAL;
        }

        zmode = 0;

        if (mb << MMULSHIFT) < QB && c < num {
            zmode = 1;

            // Only a mean that wrapped past 2^30 yields a wide parameter.
            let k = mb
                .leading_zeros()
                .wrapping_sub(BITOFF)
                .wrapping_add(mb.wrapping_add(MOFF) >> MDENSHIFT);
            if k > ZERO_RUN_BITS {
                bail!(DecodeError::MeanOutOfRange(mb));
            }
            let mz = ((1u32 << k) - 1) & params.wb;

            let run = dyn_get(reader, mz, k, ZERO_RUN_BITS)?;
            let remaining = num - c;
            if run as usize > remaining {
                bail!(DecodeError::ZeroRunOverflow {
                    run,
                    remaining: remaining as u32,
                });
            }

            out[c..c + run as usize].fill(0);
            c += run as usize;

            if run >= 65535 {
                zmode = 0;
            }

            mb = 0;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::config::{DEFAULT_KB, DEFAULT_MB, DEFAULT_PB};
    use crate::utils::bitstream_io::test_bits::BitBuilder;

    fn default_params() -> AgParams {
        AgParams::new(DEFAULT_MB, DEFAULT_PB, 4, DEFAULT_KB)
    }

    #[test]
    fn test_params() {
        let params = AgParams::new(10, 40, 2, 14);
        assert_eq!(params.pb, 20);
        assert_eq!(params.wb, 0x3FFF);

        assert_eq!(AgParams::new(10, 40, 4, 31).wb, 0x7FFF_FFFF);
    }

    #[test]
    fn test_small_residuals() {
        // Codes 2, 0 and 3 separated by empty zero runs. Each run switches on
        // zero mode, which adds one to the following code.
        let data = BitBuilder::new().put_str("110 00 0 00 1110").finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);

        let mut out = [0x55; 3];
        dyn_decomp(&default_params(), reader, &mut out, 16).unwrap();

        assert_eq!(out, [1, -1, 2]);
        assert_eq!(reader.position().unwrap(), 12);
    }

    #[test]
    fn test_silent_block() {
        // A zero residual followed by an escaped zero run covering the rest.
        let data = BitBuilder::new()
            .put_str("0 111111111")
            .put(16, 4095)
            .finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);

        let mut out = vec![7; 4096];
        dyn_decomp(&default_params(), reader, &mut out, 16).unwrap();

        assert!(out.iter().all(|&s| s == 0));
        assert_eq!(reader.position().unwrap(), 26);
    }

    #[test]
    fn test_escaped_value() {
        // Nine ones escape to a raw 16-bit value: 0x8001 decodes to -16385.
        let data = BitBuilder::new()
            .put_str("111111111")
            .put(16, 0x8001)
            .finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);

        let mut out = [0; 1];
        dyn_decomp(&default_params(), reader, &mut out, 16).unwrap();

        assert_eq!(out, [-16385]);
    }

    #[test]
    fn test_zero_run_overflow() {
        let data = BitBuilder::new()
            .put_str("0 111111111")
            .put(16, 100)
            .finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);

        let mut out = [0; 16];
        let err = dyn_decomp(&default_params(), reader, &mut out, 16).unwrap_err();
        assert!(matches!(
            err.downcast::<DecodeError>().unwrap(),
            DecodeError::ZeroRunOverflow {
                run: 100,
                remaining: 15
            }
        ));
    }

    #[test]
    fn test_wrapped_mean_rejected() {
        // Maximal escaped residuals with a steep history multiplier wrap the
        // mean to 0x4000007E, which passes the zero run test.
        let params = AgParams::new(DEFAULT_MB, 150, 4, DEFAULT_KB);
        let mut builder = BitBuilder::new();
        for n in [65535; 223].into_iter().chain([46332]) {
            builder = builder.put_str("111111111").put(16, n);
        }
        let data = builder.finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);

        let mut out = [0; 256];
        let err = dyn_decomp(&params, reader, &mut out, 16).unwrap_err();
        assert!(matches!(
            err.downcast::<DecodeError>().unwrap(),
            DecodeError::MeanOutOfRange(0x4000_007E)
        ));
    }

    #[test]
    fn test_truncated_residuals() {
        let reader = &mut BsIoSliceReader::default();

        let mut out = [0; 4];
        assert!(dyn_decomp(&default_params(), reader, &mut out, 16).is_err());
    }
}
