use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use anyhow::{Result, anyhow, bail};
use indicatif::MultiProgress;
use log::Level;

use super::decoder_thread::{DecoderThreadConfig, spawn_decoder_thread};
use super::output::{AudioWriter, create_path_with_extension};
use super::progress::{create_progress_bar, finalize_progress_bar};
use crate::cli::command::{AudioFormat, Cli, DecodeArgs};
use crate::input::{PacketReader, collect_packet_paths, read_input};
use alac::process::FrameDecoder;
use alac::process::decode::Decoder;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding ALAC packets with cookie {} (strict mode: {})",
        args.cookie.display(),
        cli.strict
    );

    let cookie = read_input(&args.cookie)?;
    let paths = collect_packet_paths(&args.packets)?;

    let output_path = args
        .output_path
        .as_deref()
        .map(|path| create_path_with_extension(path, args.format.extension()));

    match &output_path {
        Some(path) => log::info!("Output path specified: {}", path.display()),
        None => log::info!("No output path specified, decoded audio is discarded"),
    }

    let job = DecodeJob {
        paths,
        output_path,
        format: args.format,
        frames_per_packet: args.frames_per_packet,
        strict_mode: cli.strict,
    };

    run_decode::<Decoder>(&cookie, job, multi).map(|_| ())
}

pub struct DecodeJob {
    pub paths: Vec<PathBuf>,
    pub output_path: Option<PathBuf>,
    pub format: AudioFormat,
    pub frames_per_packet: Option<u32>,
    pub strict_mode: bool,
}

/// Decodes all packets of `job` with a `D` built from `cookie`, returning
/// the number of samples per channel written.
pub fn run_decode<D>(cookie: &[u8], job: DecodeJob, multi: Option<&MultiProgress>) -> Result<u64>
where
    D: FrameDecoder + Send + 'static,
{
    let mut decoder = D::create(cookie)?;
    decoder.set_fail_level(if job.strict_mode {
        Level::Warn
    } else {
        Level::Error
    });

    let config = *decoder.config();
    let max_samples = job.frames_per_packet.unwrap_or(config.frame_length);
    if max_samples == 0 {
        bail!("Frames per packet must be positive");
    }

    let mut writer = job
        .output_path
        .as_deref()
        .map(|path| AudioWriter::create(path, job.format, &config, decoder.channel_layout()))
        .transpose()?;

    let pb = multi
        .map(|multi| create_progress_bar(multi, job.paths.len() as u64))
        .transpose()?;

    let (tx, rx) = mpsc::channel();
    let decode_thread = spawn_decoder_thread(DecoderThreadConfig {
        packets: PacketReader::new(job.paths),
        decoder,
        max_samples,
        strict_mode: job.strict_mode,
        tx,
        pb: pb.clone(),
    });

    let start_time = Instant::now();
    let mut decoded_samples = 0u64;

    while let Ok(result) = rx.recv() {
        let decoded = match result {
            Ok(decoded) => decoded,
            Err(e) => {
                if let Some(pb) = &pb {
                    pb.finish_with_message("decode failed");
                }
                return Err(e);
            }
        };

        log::trace!("Packet {}: {} samples", decoded.index, decoded.samples);

        if let Some(writer) = &mut writer {
            writer.write_pcm(&decoded.pcm)?;
        }
        decoded_samples += decoded.samples as u64;
    }

    if let Some(writer) = &mut writer {
        writer.finish()?;
    }

    match decode_thread.join() {
        Ok(Ok(())) => {
            finalize_progress_bar(&pb, decoded_samples, config.sample_rate, start_time);
            log::info!("Decoding completed successfully");
        }
        Ok(Err(e)) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
        Err(_) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode thread panicked");
            }
            return Err(anyhow!("Decode thread panicked"));
        }
    }

    Ok(decoded_samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::decode::decoder_thread::tests::PatternDecoder;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn job(dir: &TempDir, packets: &[&[u8]], format: AudioFormat, strict_mode: bool) -> DecodeJob {
        let packet_dir = dir.path().join("packets");
        fs::create_dir(&packet_dir).unwrap();
        for (i, data) in packets.iter().enumerate() {
            fs::write(packet_dir.join(format!("{i:04}.bin")), data).unwrap();
        }

        DecodeJob {
            paths: collect_packet_paths(&[packet_dir]).unwrap(),
            output_path: Some(dir.path().join(format!("out.{}", format.extension()))),
            format,
            frames_per_packet: None,
            strict_mode,
        }
    }

    #[test]
    fn test_decode_to_pcm() {
        let dir = tempdir().unwrap();
        let job = job(&dir, &[&[7, 7, 7], &[9]], AudioFormat::Pcm, false);
        let output = job.output_path.clone().unwrap();

        let samples = run_decode::<PatternDecoder>(&[0; 4], job, None).unwrap();
        assert_eq!(samples, 4);
        assert_eq!(fs::read(&output).unwrap(), [7, 7, 7, 7, 7, 7, 9, 9]);
    }

    #[test]
    fn test_decode_to_caf() {
        let dir = tempdir().unwrap();
        let job = job(&dir, &[&[1, 1], &[2, 2]], AudioFormat::Caf, false);
        let output = job.output_path.clone().unwrap();

        run_decode::<PatternDecoder>(&[0; 4], job, None).unwrap();

        let buf = fs::read(&output).unwrap();
        assert_eq!(&buf[0..4], b"caff");
        assert_eq!(&buf[buf.len() - 8..], &[1, 1, 1, 1, 2, 2, 2, 2]);
    }

    #[test]
    fn test_strict_failure() {
        let dir = tempdir().unwrap();
        let job = job(&dir, &[&[1], &[], &[3]], AudioFormat::W64, true);

        assert!(run_decode::<PatternDecoder>(&[0; 4], job, None).is_err());
    }

    #[test]
    fn test_zero_frames_per_packet() {
        let dir = tempdir().unwrap();
        let mut job = job(&dir, &[&[1]], AudioFormat::Pcm, false);
        job.frames_per_packet = Some(0);

        assert!(run_decode::<PatternDecoder>(&[0; 4], job, None).is_err());
    }
}
