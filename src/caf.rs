use std::io::{self, Seek, SeekFrom, Write};

use alacd_macros::{ToBytes, caf_chunk};

pub fn write_caf_file_header<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_all(b"caff")?;
    writer.write_all(&1u16.to_be_bytes())?;
    writer.write_all(&0u16.to_be_bytes())?;

    Ok(())
}

pub trait CafChunk {
    fn chunk_type(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    fn write_all<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let chunk_data = self.chunk_data();

        writer.write_all(self.chunk_type())?;
        writer.write_all(&(chunk_data.len() as u64).to_be_bytes())?;
        writer.write_all(&chunk_data)?;

        Ok(())
    }
}

#[derive(Debug, Clone, ToBytes)]
#[caf_chunk(b"desc")]
pub struct AudioDescription {
    pub sample_rate: f64,
    pub format_id: [u8; 4],
    pub format_flags: u32,
    pub bytes_per_packet: u32,
    pub frames_per_packet: u32,
    pub channels_per_frame: u32,
    pub bits_per_channel: u32,
}

/// Channel layout given by a Core Audio layout tag alone.
#[derive(Debug, Clone, ToBytes)]
#[caf_chunk(b"chan")]
pub struct ChannelLayout {
    pub channel_layout_tag: u32,
    pub channel_bitmap: u32,
    pub number_channel_descriptions: u32,
}

impl ChannelLayout {
    pub fn from_tag(channel_layout_tag: u32) -> Self {
        Self {
            channel_layout_tag,
            channel_bitmap: 0,
            number_channel_descriptions: 0,
        }
    }
}

/// Linear PCM format flags
#[derive(Debug, Clone, Copy)]
pub struct LinearPcmFormatFlags {
    /// kCAFLinearPCMFormatFlagIsFloat (bit 0)
    pub is_float: bool,
    /// kCAFLinearPCMFormatFlagIsLittleEndian (bit 1)
    pub is_little_endian: bool,
}

impl LinearPcmFormatFlags {
    pub fn little_endian_signed_integer() -> Self {
        Self {
            is_float: false,
            is_little_endian: true,
        }
    }

    pub fn to_u32(self) -> u32 {
        let mut flags = 0u32;

        if self.is_float {
            flags |= 1 << 0;
        }
        if self.is_little_endian {
            flags |= 1 << 1;
        }

        flags
    }
}

/// CAF writer for little-endian integer PCM whose length is patched in on
/// [`finish`](CafWriter::finish).
pub struct CafWriter<W: Write + Seek> {
    writer: W,
    audio_description: Option<AudioDescription>,
    channel_layout: Option<ChannelLayout>,
    data_chunk_start: Option<u64>,
    data_size_position: Option<u64>,
    data_written: u64,
    finished: bool,
}

impl<W: Write + Seek> CafWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            audio_description: None,
            channel_layout: None,
            data_chunk_start: None,
            data_size_position: None,
            data_written: 0,
            finished: false,
        }
    }

    fn check_not_finished(&self) -> io::Result<()> {
        if self.finished {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Writer already finished",
            ));
        }
        Ok(())
    }

    /// Sets the format of interleaved samples stored in `bits_per_channel`
    /// bits each.
    pub fn set_audio_format(
        &mut self,
        sample_rate: u32,
        channels: u32,
        bits_per_channel: u32,
    ) -> io::Result<()> {
        if self.data_chunk_start.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing header",
            ));
        }

        self.audio_description = Some(AudioDescription {
            sample_rate: sample_rate as f64,
            format_id: *b"lpcm",
            format_flags: LinearPcmFormatFlags::little_endian_signed_integer().to_u32(),
            bytes_per_packet: (bits_per_channel / 8) * channels,
            frames_per_packet: 1,
            channels_per_frame: channels,
            bits_per_channel,
        });
        Ok(())
    }

    pub fn set_channel_layout(&mut self, layout: ChannelLayout) {
        self.channel_layout = Some(layout);
    }

    /// Writes the file header, the description chunks and an open-ended
    /// data chunk header.
    pub fn write_header(&mut self) -> io::Result<()> {
        self.check_not_finished()?;
        let Some(description) = &self.audio_description else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Audio format must be set before writing header",
            ));
        };

        write_caf_file_header(&mut self.writer)?;
        description.write_all(&mut self.writer)?;

        if let Some(layout) = &self.channel_layout {
            layout.write_all(&mut self.writer)?;
        }

        self.writer.write_all(b"data")?;
        self.data_size_position = Some(self.writer.stream_position()?);
        self.writer.write_all(&(-1i64).to_be_bytes())?;

        // edit count
        self.writer.write_all(&0u32.to_be_bytes())?;

        self.data_chunk_start = Some(self.writer.stream_position()?);
        Ok(())
    }

    pub fn write_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.check_not_finished()?;
        if self.data_chunk_start.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Must call write_header() before writing data",
            ));
        }

        self.writer.write_all(data)?;
        self.data_written += data.len() as u64;
        Ok(())
    }

    /// Patches the data chunk size. Further calls are no-ops.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }

        let (Some(data_size_pos), Some(data_start)) =
            (self.data_size_position, self.data_chunk_start)
        else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Must call write_header() before finish()",
            ));
        };

        let current_pos = self.writer.stream_position()?;
        let chunk_size = current_pos - data_start + 4;

        self.writer.seek(SeekFrom::Start(data_size_pos))?;
        self.writer.write_all(&chunk_size.to_be_bytes())?;
        self.writer.seek(SeekFrom::Start(current_pos))?;
        self.writer.flush()?;

        self.finished = true;
        Ok(())
    }

    pub fn data_written(&self) -> u64 {
        self.data_written
    }
}

impl<W: Write + Seek> Drop for CafWriter<W> {
    fn drop(&mut self) {
        if !self.finished && self.data_chunk_start.is_some() {
            let _ = self.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn be_u32(buf: &[u8], pos: usize) -> u32 {
        u32::from_be_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
    }

    fn be_u64(buf: &[u8], pos: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&buf[pos..pos + 8]);
        u64::from_be_bytes(bytes)
    }

    #[test]
    fn test_caf_layout() -> io::Result<()> {
        let mut cursor = Cursor::new(Vec::new());

        let mut writer = CafWriter::new(&mut cursor);
        writer.set_audio_format(44100, 2, 24)?;
        writer.set_channel_layout(ChannelLayout::from_tag((101 << 16) | 2));
        writer.write_header()?;
        writer.write_data(&[0u8; 12])?;
        assert_eq!(writer.data_written(), 12);
        writer.finish()?;
        drop(writer);

        let buf = cursor.into_inner();
        assert_eq!(&buf[0..4], b"caff");

        // desc
        assert_eq!(&buf[8..12], b"desc");
        assert_eq!(be_u64(&buf, 12), 32);
        assert_eq!(&buf[20..28], &44100.0f64.to_be_bytes());
        assert_eq!(&buf[28..32], b"lpcm");
        assert_eq!(be_u32(&buf, 32), 2);
        assert_eq!(be_u32(&buf, 36), 6);
        assert_eq!(be_u32(&buf, 40), 1);
        assert_eq!(be_u32(&buf, 44), 2);
        assert_eq!(be_u32(&buf, 48), 24);

        // chan
        assert_eq!(&buf[52..56], b"chan");
        assert_eq!(be_u64(&buf, 56), 12);
        assert_eq!(be_u32(&buf, 64), (101 << 16) | 2);

        // data
        assert_eq!(&buf[76..80], b"data");
        assert_eq!(be_u64(&buf, 80), 16);
        assert_eq!(buf.len(), 92 + 12);

        Ok(())
    }

    #[test]
    fn test_drop_finishes() -> io::Result<()> {
        let mut cursor = Cursor::new(Vec::new());

        {
            let mut writer = CafWriter::new(&mut cursor);
            writer.set_audio_format(48000, 1, 16)?;
            writer.write_header()?;
            writer.write_data(&[1, 2])?;
        }

        let buf = cursor.into_inner();
        assert_eq!(&buf[52..56], b"data");
        assert_eq!(be_u64(&buf, 56), 6);

        Ok(())
    }

    #[test]
    fn test_misuse() {
        let mut writer = CafWriter::new(Cursor::new(Vec::new()));
        assert!(writer.write_header().is_err());
        assert!(writer.write_data(&[0]).is_err());
        assert!(writer.finish().is_err());
    }
}
