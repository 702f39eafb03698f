use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;

use super::super::command::AudioFormat;
use crate::caf::{CafWriter, ChannelLayout};
use crate::wav::W64Writer;
use alac::structs::channel::ChannelLayoutTag;
use alac::structs::config::AlacSpecificConfig;

/// Appends `expected_ext` unless the path already carries it.
pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match base_path.extension() {
        Some(ext) if ext == expected_ext => base_path.to_path_buf(),
        Some(_) => {
            let mut name = base_path.as_os_str().to_owned();
            name.push(".");
            name.push(expected_ext);
            PathBuf::from(name)
        }
        None => base_path.with_extension(expected_ext),
    }
}

pub enum AudioWriter {
    Pcm(BufWriter<File>),
    Caf(CafWriter<BufWriter<File>>),
    W64(W64Writer<File>),
}

impl AudioWriter {
    /// Creates the output file and writes its header.
    pub fn create(
        path: &Path,
        format: AudioFormat,
        config: &AlacSpecificConfig,
        layout: ChannelLayoutTag,
    ) -> Result<Self> {
        let file = File::create(path)?;
        let channels = config.num_channels as u32;
        let bits = config.output_bit_depth();

        let writer = match format {
            AudioFormat::Pcm => AudioWriter::Pcm(BufWriter::new(file)),
            AudioFormat::Caf => {
                let mut caf_writer = CafWriter::new(BufWriter::new(file));
                caf_writer.set_audio_format(config.sample_rate, channels, bits)?;
                caf_writer.set_channel_layout(ChannelLayout::from_tag(layout.core_audio_tag()));
                caf_writer.write_header()?;
                AudioWriter::Caf(caf_writer)
            }
            AudioFormat::W64 => {
                let mut w64_writer =
                    W64Writer::new(file, config.sample_rate, channels as u16, bits as u16);
                w64_writer.write_header()?;
                AudioWriter::W64(w64_writer)
            }
        };

        Ok(writer)
    }

    /// Appends interleaved little-endian samples.
    pub fn write_pcm(&mut self, pcm: &[u8]) -> Result<()> {
        match self {
            AudioWriter::Pcm(pcm_writer) => pcm_writer.write_all(pcm)?,
            AudioWriter::Caf(caf_writer) => caf_writer.write_data(pcm)?,
            AudioWriter::W64(w64_writer) => w64_writer.write_data(pcm)?,
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        let data_written = match self {
            AudioWriter::Pcm(pcm_writer) => {
                pcm_writer.flush()?;
                None
            }
            AudioWriter::Caf(caf_writer) => {
                caf_writer.finish()?;
                Some(caf_writer.data_written())
            }
            AudioWriter::W64(w64_writer) => {
                w64_writer.finish()?;
                Some(w64_writer.data_written())
            }
        };

        if let Some(bytes) = data_written {
            log::debug!("Wrote {bytes} bytes of audio data");
        }
        Ok(())
    }
}
