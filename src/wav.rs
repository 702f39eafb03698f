use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use crate::byteorder::WriteBytesLe;
use alacd_macros::ToBytes;

// Sony Wave64 chunk GUIDs
pub const W64_RIFF_GUID: [u8; 16] = [
    0x72, 0x69, 0x66, 0x66, 0x2E, 0x91, 0xCF, 0x11, 0xA5, 0xD6, 0x28, 0xDB, 0x04, 0xC1, 0x00, 0x00,
];
pub const W64_WAVE_GUID: [u8; 16] = [
    0x77, 0x61, 0x76, 0x65, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_FMT_GUID: [u8; 16] = [
    0x66, 0x6D, 0x74, 0x20, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];
pub const W64_DATA_GUID: [u8; 16] = [
    0x64, 0x61, 0x74, 0x61, 0xF3, 0xAC, 0xD3, 0x11, 0x8C, 0xD1, 0x00, 0xC0, 0x4F, 0x8E, 0xDB, 0x8A,
];

const W64_CHUNK_HEADER_SIZE: u64 = 24;

/// PCMWAVEFORMAT
#[derive(Debug, Clone, ToBytes)]
struct WaveFormat {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

/// Sony Wave64 writer for integer PCM.
pub struct W64Writer<W: Write + Seek> {
    writer: BufWriter<W>,
    format: WaveFormat,
    file_size_position: u64,
    data_size_position: u64,
    data_written: u64,
}

impl<W: Write + Seek> W64Writer<W> {
    pub fn new(writer: W, sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        let block_align = channels * bits_per_sample.div_ceil(8);

        Self {
            writer: BufWriter::new(writer),
            format: WaveFormat {
                format_tag: 1,
                channels,
                sample_rate,
                byte_rate: sample_rate.saturating_mul(block_align as u32),
                block_align,
                bits_per_sample,
            },
            file_size_position: 0,
            data_size_position: 0,
            data_written: 0,
        }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(&W64_RIFF_GUID)?;
        self.file_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_le_bytes())?;
        self.writer.write_all(&W64_WAVE_GUID)?;

        let mut fmt = Vec::new();
        self.format.write_le(&mut fmt);

        self.writer.write_all(&W64_FMT_GUID)?;
        self.writer
            .write_all(&(W64_CHUNK_HEADER_SIZE + fmt.len() as u64).to_le_bytes())?;
        self.writer.write_all(&fmt)?;

        self.writer.write_all(&W64_DATA_GUID)?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u64.to_le_bytes())?;

        Ok(())
    }

    /// Appends interleaved little-endian samples.
    pub fn write_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.data_written += data.len() as u64;
        Ok(())
    }

    /// Patches the RIFF and data chunk sizes.
    pub fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()?;

        let current_pos = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        let data_chunk_size = self.data_written + W64_CHUNK_HEADER_SIZE;
        self.writer.write_all(&data_chunk_size.to_le_bytes())?;

        // Chunks are padded to 8 bytes
        let padding = data_chunk_size.next_multiple_of(8) - data_chunk_size;
        let file_size = current_pos + padding;

        self.writer.seek(SeekFrom::Start(self.file_size_position))?;
        self.writer.write_all(&file_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.write_all(&vec![0u8; padding as usize])?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn data_written(&self) -> u64 {
        self.data_written
    }

    #[cfg(test)]
    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn le_u64(buf: &[u8], pos: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[pos..pos + 8]);
        u64::from_le_bytes(bytes)
    }

    #[test]
    fn test_w64_header() -> io::Result<()> {
        let mut writer = W64Writer::new(Cursor::new(Vec::new()), 44100, 2, 24);
        writer.write_header()?;

        let buf = writer.into_inner()?.into_inner();

        assert_eq!(&buf[0..16], &W64_RIFF_GUID);
        assert_eq!(&buf[24..40], &W64_WAVE_GUID);
        assert_eq!(&buf[40..56], &W64_FMT_GUID);
        assert_eq!(le_u64(&buf, 56), 40);

        // fmt body
        assert_eq!(&buf[64..66], &1u16.to_le_bytes());
        assert_eq!(&buf[66..68], &2u16.to_le_bytes());
        assert_eq!(&buf[68..72], &44100u32.to_le_bytes());
        assert_eq!(&buf[72..76], &(44100u32 * 6).to_le_bytes());
        assert_eq!(&buf[76..78], &6u16.to_le_bytes());
        assert_eq!(&buf[78..80], &24u16.to_le_bytes());

        assert_eq!(&buf[80..96], &W64_DATA_GUID);
        assert_eq!(buf.len(), 104);

        Ok(())
    }

    #[test]
    fn test_w64_extreme_rate() -> io::Result<()> {
        let mut writer = W64Writer::new(Cursor::new(Vec::new()), u32::MAX, 8, 32);
        writer.write_header()?;

        let buf = writer.into_inner()?.into_inner();
        assert_eq!(&buf[68..72], &u32::MAX.to_le_bytes());
        assert_eq!(&buf[72..76], &u32::MAX.to_le_bytes());
        assert_eq!(&buf[76..78], &32u16.to_le_bytes());

        Ok(())
    }

    #[test]
    fn test_w64_sizes() -> io::Result<()> {
        let mut writer = W64Writer::new(Cursor::new(Vec::new()), 48000, 1, 16);
        writer.write_header()?;
        writer.write_data(&[1, 2, 3, 4, 5, 6])?;
        assert_eq!(writer.data_written(), 6);
        writer.finish()?;

        let buf = writer.into_inner()?.into_inner();

        assert_eq!(le_u64(&buf, 96), 30);
        assert_eq!(buf.len(), 112);
        assert_eq!(le_u64(&buf, 16), 112);
        assert_eq!(&buf[104..110], &[1, 2, 3, 4, 5, 6]);

        Ok(())
    }
}
