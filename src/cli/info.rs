use std::path::PathBuf;

use anyhow::{Result, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use serde::Serialize;

use super::command::{Cli, InfoArgs};
use super::decode::progress::time_str;
use crate::input::{PacketReader, collect_packet_paths, read_input};
use alac::structs::config::{AlacSpecificConfig, MagicCookie};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Reading magic cookie: {}", args.cookie.display());

    let cookie = MagicCookie::parse(&read_input(&args.cookie)?)?;

    let packets = if args.packets.is_empty() {
        None
    } else {
        let paths = collect_packet_paths(&args.packets)?;
        Some(summarize_packets(paths, &cookie.config, cli.strict, multi)?)
    };

    let report = StreamReport::new(&cookie, packets);

    if args.yaml {
        print!("{}", serde_yaml_ng::to_string(&report)?);
    } else {
        display_report(&report);
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct StreamReport {
    frame_length: u32,
    compatible_version: u8,
    bit_depth: u8,
    output_bytes_per_sample: usize,
    sample_rate: u32,
    channels: u8,
    channel_layout: LayoutReport,
    rice: RiceReport,
    max_frame_bytes: u32,
    avg_bit_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    packets: Option<PacketSummary>,
}

#[derive(Debug, Serialize)]
struct LayoutReport {
    name: String,
    tag: u32,
    explicit: bool,
    channels: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct RiceReport {
    pb: u8,
    mb: u8,
    kb: u8,
    max_run: u16,
}

#[derive(Debug, Serialize)]
struct PacketSummary {
    count: usize,
    total_bytes: u64,
    largest_bytes: usize,
    duration: String,
    average_kbps: f64,
}

impl StreamReport {
    fn new(cookie: &MagicCookie, packets: Option<PacketSummary>) -> Self {
        let config = &cookie.config;
        let layout = cookie.channel_layout();

        Self {
            frame_length: config.frame_length,
            compatible_version: config.compatible_version,
            bit_depth: config.bit_depth,
            output_bytes_per_sample: config.output_bytes_per_sample(),
            sample_rate: config.sample_rate,
            channels: config.num_channels,
            channel_layout: LayoutReport {
                name: layout.to_string(),
                tag: layout as u32,
                explicit: cookie.channel_layout_info.is_some(),
                channels: layout
                    .channel_labels()
                    .iter()
                    .map(|label| label.abbreviation())
                    .collect(),
            },
            rice: RiceReport {
                pb: config.pb,
                mb: config.mb,
                kb: config.kb,
                max_run: config.max_run,
            },
            max_frame_bytes: config.max_frame_bytes,
            avg_bit_rate: config.avg_bit_rate,
            packets,
        }
    }
}

/// Counts packets and bytes; the duration assumes full-length frames.
fn summarize_packets(
    paths: Vec<PathBuf>,
    config: &AlacSpecificConfig,
    strict: bool,
    multi: Option<&MultiProgress>,
) -> Result<PacketSummary> {
    let pb = match multi {
        Some(multi) => {
            let pb = multi.add(ProgressBar::new(paths.len() as u64));
            pb.set_style(ProgressStyle::with_template(
                "{spinner:.green} {msg} {pos}/{len}",
            )?);
            pb.set_message("Reading packets...");
            Some(pb)
        }
        None => None,
    };

    let mut count = 0usize;
    let mut total_bytes = 0u64;
    let mut largest_bytes = 0usize;

    for packet in PacketReader::new(paths) {
        let (path, data) = packet?;

        if config.max_frame_bytes != 0 && data.len() > config.max_frame_bytes as usize {
            if strict {
                bail!(
                    "{}: {} bytes exceeds the stream maximum of {}",
                    path.display(),
                    data.len(),
                    config.max_frame_bytes
                );
            }
            log::warn!(
                "{}: {} bytes exceeds the stream maximum of {}",
                path.display(),
                data.len(),
                config.max_frame_bytes
            );
        }

        count += 1;
        total_bytes += data.len() as u64;
        largest_bytes = largest_bytes.max(data.len());

        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    let duration_secs =
        count as f64 * config.frame_length as f64 / config.sample_rate.max(1) as f64;
    let average_kbps = if duration_secs > 0.0 {
        (total_bytes as f64 * 8.0) / (duration_secs * 1000.0)
    } else {
        0.0
    };

    Ok(PacketSummary {
        count,
        total_bytes,
        largest_bytes,
        duration: time_str(duration_secs),
        average_kbps,
    })
}

fn display_report(report: &StreamReport) {
    println!();
    println!("ALAC Stream Information");
    println!("=======================");
    println!();

    println!("Format");
    println!("  Sampling rate             {} Hz", report.sample_rate);
    println!("  Bit depth                 {} bits", report.bit_depth);
    println!(
        "  Output sample size        {} bytes",
        report.output_bytes_per_sample
    );
    println!("  Frame length              {} samples", report.frame_length);
    println!("  Compatible version        {}", report.compatible_version);
    println!();

    let layout = &report.channel_layout;
    println!("Channels");
    println!("  Number of channels        {}", report.channels);
    println!(
        "  Layout                    {} ({})",
        layout.name,
        if layout.explicit { "explicit" } else { "default" }
    );
    println!("  Order                     {}", layout.channels.join(" "));
    println!();

    println!("Entropy Coder");
    println!(
        "  pb / mb / kb              {} / {} / {}",
        report.rice.pb, report.rice.mb, report.rice.kb
    );
    println!("  Max run                   {}", report.rice.max_run);
    println!();

    println!("Bit Rate");
    if report.max_frame_bytes != 0 {
        println!("  Max frame size            {} bytes", report.max_frame_bytes);
    } else {
        println!("  Max frame size            unknown");
    }
    if report.avg_bit_rate != 0 {
        println!(
            "  Average bit rate          {:.1} kbps",
            report.avg_bit_rate as f64 / 1000.0
        );
    } else {
        println!("  Average bit rate          unknown");
    }
    println!();

    if let Some(packets) = &report.packets {
        let size_mb = packets.total_bytes as f64 / 1_000_000.0;

        println!("Packet Summary");
        println!("  Packets                   {}", packets.count);
        println!(
            "  Size                      {size_mb:.2} MB ({} bytes)",
            packets.total_bytes
        );
        println!("  Largest packet            {} bytes", packets.largest_bytes);
        println!("  Duration                  {}", packets.duration);
        println!("  Average data rate         {:.1} kbps", packets.average_kbps);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn stereo_cookie() -> Vec<u8> {
        let mut bytes = AlacSpecificConfig::new(4096, 24, 2, 48000).to_bytes().to_vec();
        bytes.extend_from_slice(&24u32.to_be_bytes());
        bytes.extend_from_slice(b"chan");
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&((101u32 << 16) | 2).to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        bytes
    }

    #[test]
    fn test_report_yaml() {
        let cookie = MagicCookie::parse(&stereo_cookie()).unwrap();
        let report = StreamReport::new(&cookie, None);

        assert!(report.channel_layout.explicit);
        assert_eq!(report.channel_layout.channels, vec!["L", "R"]);
        assert_eq!(report.output_bytes_per_sample, 3);

        let yaml = serde_yaml_ng::to_string(&report).unwrap();
        assert!(yaml.contains("frame_length: 4096"));
        assert!(yaml.contains("sample_rate: 48000"));
        assert!(yaml.contains("name: Stereo"));
        assert!(!yaml.contains("packets"));
    }

    #[test]
    fn test_packet_summary() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), vec![0u8; 1000]).unwrap();
        fs::write(dir.path().join("b"), vec![0u8; 3000]).unwrap();

        let mut config = AlacSpecificConfig::new(4800, 16, 2, 48000);
        let paths = collect_packet_paths(&[dir.path().to_path_buf()]).unwrap();
        let summary = summarize_packets(paths.clone(), &config, false, None).unwrap();

        assert_eq!(summary.count, 2);
        assert_eq!(summary.total_bytes, 4000);
        assert_eq!(summary.largest_bytes, 3000);
        assert_eq!(summary.duration, "00:00:00.200");
        assert!((summary.average_kbps - 160.0).abs() < 1e-9);

        config.max_frame_bytes = 2000;
        assert!(summarize_packets(paths.clone(), &config, false, None).is_ok());
        assert!(summarize_packets(paths, &config, true, None).is_err());
    }
}
