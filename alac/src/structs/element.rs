//! Frame elements and their headers.
//!
//! A compressed frame is a sequence of elements, each introduced by a 3-bit
//! tag, terminated by an END element.
//!
//! ## Audio Elements
//!
//! - **SCE / LFE**: one channel
//! - **CPE**: a channel pair, optionally mid/side mixed
//!
//! Audio elements carry either verbatim (escaped) samples, or mixing
//! parameters, predictor parameters and Golomb-coded residuals for each
//! channel.
//!
//! ## Auxiliary Elements
//!
//! DSE and FIL are skipped. CCE and PCE are rejected.

use std::fmt::Display;

use anyhow::{Result, bail};
use log::trace;

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::DecodeError;

/// Maximum number of predictor coefficients.
pub const MAX_COEFS: usize = 32;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementType {
    /// Single channel element
    SCE = 0,
    /// Channel pair element
    CPE = 1,
    /// Coupling channel element
    CCE = 2,
    /// Low-frequency effects element
    LFE = 3,
    /// Data stream element
    DSE = 4,
    /// Program config element
    PCE = 5,
    /// Fill element
    FIL = 6,
    /// End of frame
    END = 7,
}

impl ElementType {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let tag = reader.get_n::<u8>(3)?;
        Ok(ElementType::from(tag))
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementType::SCE => "SCE",
            ElementType::CPE => "CPE",
            ElementType::CCE => "CCE",
            ElementType::LFE => "LFE",
            ElementType::DSE => "DSE",
            ElementType::PCE => "PCE",
            ElementType::FIL => "FIL",
            ElementType::END => "END",
        }
    }
}

impl From<u8> for ElementType {
    fn from(value: u8) -> Self {
        match value & 7 {
            0 => ElementType::SCE,
            1 => ElementType::CPE,
            2 => ElementType::CCE,
            3 => ElementType::LFE,
            4 => ElementType::DSE,
            5 => ElementType::PCE,
            6 => ElementType::FIL,
            _ => ElementType::END,
        }
    }
}

impl Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Header shared by SCE, CPE and LFE elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementHeader {
    pub instance_tag: u8,
    /// Sample count of a partial frame, `None` for a full frame.
    pub num_samples: Option<u32>,
    /// Low-order bytes sent uncompressed, 0 to 2.
    pub bytes_shifted: u8,
    /// Samples are stored verbatim.
    pub escape: bool,
}

impl ElementHeader {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let instance_tag = reader.get_n::<u8>(4)?;

        let unused = reader.get_n::<u16>(12)?;
        if unused != 0 {
            bail!(DecodeError::UnusedHeaderNonZero(unused));
        }

        let partial_frame = reader.get()?;
        let bytes_shifted = reader.get_n::<u8>(2)?;
        if bytes_shifted == 3 {
            bail!(DecodeError::InvalidBytesShifted);
        }
        let escape = reader.get()?;

        let num_samples = if partial_frame {
            let hi = reader.get_n::<u32>(16)?;
            let lo = reader.get_n::<u32>(16)?;
            Some((hi << 16) | lo)
        } else {
            None
        };

        Ok(Self {
            instance_tag,
            num_samples,
            bytes_shifted,
            escape,
        })
    }

    /// Bits of each uncompressed low-order sample part.
    pub fn shift_bits(&self) -> u32 {
        self.bytes_shifted as u32 * 8
    }
}

/// Mid/side mixing parameters of a compressed element.
///
/// A mono element carries them as well; they are read and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixParams {
    pub mix_bits: u8,
    pub mix_res: i8,
}

impl MixParams {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        Ok(Self {
            mix_bits: reader.get_n(8)?,
            mix_res: reader.get_s(8)?,
        })
    }
}

/// Per-channel predictor parameters of a compressed element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    /// 0 for the plain predictor, anything else adds a first-order stage.
    pub mode: u8,
    pub den_shift: u8,
    /// Scales the configured Rice history multiplier in quarters.
    pub pb_factor: u8,
    pub num_coefs: u8,
    pub coefs: [i16; MAX_COEFS],
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            mode: 0,
            den_shift: 0,
            pb_factor: 0,
            num_coefs: 0,
            coefs: [0; MAX_COEFS],
        }
    }
}

impl PredictorParams {
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Self> {
        let mut params = PredictorParams {
            mode: reader.get_n(4)?,
            den_shift: reader.get_n(4)?,
            pb_factor: reader.get_n(3)?,
            num_coefs: reader.get_n(5)?,
            ..Default::default()
        };

        for coef in params.coefs.iter_mut().take(params.num_coefs as usize) {
            *coef = reader.get_s(16)?;
        }

        Ok(params)
    }
}

/// Skips a data stream element following its tag.
pub fn skip_data_stream_element(reader: &mut BsIoSliceReader) -> Result<()> {
    let instance_tag = reader.get_n::<u8>(4)?;
    let byte_align = reader.get()?;

    let mut count = reader.get_n::<u32>(8)?;
    if count == 255 {
        count += reader.get_n::<u32>(8)?;
    }

    if byte_align {
        reader.byte_align();
    }

    trace!("Skipping DSE {instance_tag} carrying {count} bytes");

    reader.skip_n(count * 8)?;

    Ok(())
}

/// Skips a fill element following its tag.
pub fn skip_fill_element(reader: &mut BsIoSliceReader) -> Result<()> {
    let mut count = reader.get_n::<u32>(4)?;
    if count == 15 {
        count += reader.get_n::<u32>(8)?;
        count -= 1;
    }

    trace!("Skipping FIL carrying {count} bytes");

    reader.skip_n(count * 8)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bitstream_io::test_bits::BitBuilder;

    #[test]
    fn test_element_header() {
        let data = BitBuilder::new()
            .put(4, 3)
            .put(12, 0)
            .put_str("1 10 0")
            .put(16, 0)
            .put(16, 352)
            .finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        let header = ElementHeader::read(reader).unwrap();

        assert_eq!(header.instance_tag, 3);
        assert_eq!(header.num_samples, Some(352));
        assert_eq!(header.bytes_shifted, 2);
        assert_eq!(header.shift_bits(), 16);
        assert!(!header.escape);

        let data = BitBuilder::new().put(4, 0).put(12, 0).put_str("0 11 1").finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        let err = ElementHeader::read(reader).unwrap_err();
        assert!(matches!(
            err.downcast::<DecodeError>().unwrap(),
            DecodeError::InvalidBytesShifted
        ));

        let data = BitBuilder::new().put(4, 0).put(12, 1).put(4, 0).finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        assert!(ElementHeader::read(reader).is_err());
    }

    #[test]
    fn test_predictor_params() {
        let data = BitBuilder::new()
            .put(4, 0)
            .put(4, 9)
            .put(3, 4)
            .put(5, 2)
            .put(16, 1000)
            .put(16, (-300i16) as u16 as u32)
            .finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        let params = PredictorParams::read(reader).unwrap();

        assert_eq!(params.den_shift, 9);
        assert_eq!(params.pb_factor, 4);
        assert_eq!(params.num_coefs, 2);
        assert_eq!(params.coefs[..3], [1000, -300, 0]);
    }

    #[test]
    fn test_skip_elements() {
        // DSE: tag, align flag set, 2 bytes of payload after alignment.
        let data = BitBuilder::new()
            .put(4, 0)
            .put_str("1")
            .put(8, 2)
            .put(3, 0)
            .put(16, 0xABCD)
            .put(3, ElementType::END as u32)
            .finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        skip_data_stream_element(reader).unwrap();
        assert_eq!(ElementType::read(reader).unwrap(), ElementType::END);

        // FIL with an extended count of 15 + 2 - 1 bytes.
        let mut builder = BitBuilder::new().put(4, 15).put(8, 2);
        for _ in 0..16 {
            builder = builder.put(8, 0xA5);
        }
        let data = builder.put(3, ElementType::END as u32).finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        skip_fill_element(reader).unwrap();
        assert_eq!(ElementType::read(reader).unwrap(), ElementType::END);

        // Payload running past the frame.
        let data = BitBuilder::new().put(4, 4).put(8, 0xFF).finish();
        let reader = &mut BsIoSliceReader::from_slice(&data);
        assert!(skip_fill_element(reader).is_err());
    }
}
