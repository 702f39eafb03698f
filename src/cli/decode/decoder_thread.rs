use std::sync::mpsc;
use std::thread;

use anyhow::Result;
use indicatif::ProgressBar;

use crate::input::PacketReader;
use alac::process::FrameDecoder;

/// Interleaved little-endian PCM of one packet.
#[derive(Debug)]
pub struct DecodedPacket {
    pub index: u64,
    pub samples: u32,
    pub pcm: Vec<u8>,
}

pub struct DecoderThreadConfig<D: FrameDecoder> {
    pub packets: PacketReader,
    pub decoder: D,
    pub max_samples: u32,
    pub strict_mode: bool,
    pub tx: mpsc::Sender<Result<DecodedPacket>>,
    pub pb: Option<ProgressBar>,
}

pub fn spawn_decoder_thread<D>(config: DecoderThreadConfig<D>) -> thread::JoinHandle<Result<()>>
where
    D: FrameDecoder + Send + 'static,
{
    thread::spawn(move || decode_packets(config))
}

/// Decodes every packet in order, sending each result to the writer.
///
/// A packet that fails to decode stops the run in strict mode; otherwise it
/// is logged and replaced by `max_samples` samples of silence.
pub fn decode_packets<D: FrameDecoder>(config: DecoderThreadConfig<D>) -> Result<()> {
    let DecoderThreadConfig {
        packets,
        mut decoder,
        max_samples,
        strict_mode,
        tx,
        pb,
    } = config;

    let stream = *decoder.config();
    let num_channels = stream.num_channels as u32;
    let mut pcm = vec![0u8; stream.output_frame_bytes(max_samples)];

    let mut packet_count = 0u64;
    let mut failed_packets = 0u64;
    let mut total_samples = 0u64;

    for (index, packet) in (0u64..).zip(packets) {
        let (path, data) = match packet {
            Ok(packet) => packet,
            Err(e) => {
                let _ = tx.send(Err(e));
                return Ok(());
            }
        };

        packet_count += 1;
        if let Some(pb) = &pb {
            pb.set_position(packet_count);
        }

        let samples = match decoder.decode_frame(&data, &mut pcm, max_samples, num_channels) {
            Ok(samples) => samples,
            Err(e) => {
                log::error!("Decode error at packet {index} ({}): {e}", path.display());
                if strict_mode {
                    let _ = tx.send(Err(e.context(format!("packet {index}"))));
                    return Ok(());
                }

                failed_packets += 1;
                pcm.fill(0);
                max_samples
            }
        };

        total_samples += samples as u64;
        let decoded = DecodedPacket {
            index,
            samples,
            pcm: pcm[..stream.output_frame_bytes(samples)].to_vec(),
        };
        if tx.send(Ok(decoded)).is_err() {
            break;
        }
    }

    if failed_packets > 0 {
        log::warn!("{failed_packets} packets failed to decode and were replaced by silence");
    }
    log::info!("Processing complete: {packet_count} packets, {total_samples} samples");

    decoder.destroy();
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alac::structs::config::AlacSpecificConfig;

    /// Mono 16-bit decoder that emits the packet's first byte as every
    /// sample and fails on empty packets.
    pub(crate) struct PatternDecoder {
        config: AlacSpecificConfig,
    }

    impl FrameDecoder for PatternDecoder {
        fn create(cookie: &[u8]) -> Result<Self> {
            let frame_length = cookie.len() as u32;
            Ok(Self {
                config: AlacSpecificConfig::new(frame_length, 16, 1, 8000),
            })
        }

        fn decode_frame(
            &mut self,
            frame: &[u8],
            out: &mut [u8],
            max_samples: u32,
            _num_channels: u32,
        ) -> Result<u32> {
            let Some(&value) = frame.first() else {
                anyhow::bail!("empty packet");
            };

            let samples = (frame.len() as u32).min(max_samples);
            out[..samples as usize * 2].fill(value);
            Ok(samples)
        }

        fn config(&self) -> &AlacSpecificConfig {
            &self.config
        }

        fn set_fail_level(&mut self, _level: log::Level) {}
    }

    fn run(packets: Vec<Vec<u8>>, strict_mode: bool) -> Vec<Result<DecodedPacket>> {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<_> = packets
            .iter()
            .enumerate()
            .map(|(i, data)| {
                let path = dir.path().join(format!("{i:04}"));
                std::fs::write(&path, data).unwrap();
                path
            })
            .collect();

        let (tx, rx) = mpsc::channel();
        let handle = spawn_decoder_thread(DecoderThreadConfig {
            packets: PacketReader::new(paths),
            decoder: PatternDecoder::create(&[0; 4]).unwrap(),
            max_samples: 4,
            strict_mode,
            tx,
            pb: None,
        });

        let results = rx.iter().collect();
        handle.join().unwrap().unwrap();
        results
    }

    #[test]
    fn test_packets_in_order() {
        let results = run(vec![vec![1; 4], vec![2; 2]], false);
        let decoded: Vec<_> = results.into_iter().map(Result::unwrap).collect();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].samples, 4);
        assert_eq!(decoded[0].pcm, vec![1; 8]);
        assert_eq!(decoded[1].index, 1);
        assert_eq!(decoded[1].samples, 2);
        assert_eq!(decoded[1].pcm, vec![2; 4]);
    }

    #[test]
    fn test_failure_becomes_silence() {
        let results = run(vec![vec![1; 4], vec![], vec![3; 4]], false);
        let decoded: Vec<_> = results.into_iter().map(Result::unwrap).collect();

        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded[1].samples, 4);
        assert_eq!(decoded[1].pcm, vec![0; 8]);
        assert_eq!(decoded[2].pcm, vec![3; 8]);
    }

    #[test]
    fn test_strict_stops_on_failure() {
        let results = run(vec![vec![1; 4], vec![], vec![3; 4]], true);

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
