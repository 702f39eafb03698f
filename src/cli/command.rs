use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")\nalac ",
    env!("ALAC_VERSION"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    about        = "Tools for inspecting and decoding Apple Lossless (ALAC) streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors and stop on the first bad packet.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode ALAC packets into PCM audio.
    Decode(DecodeArgs),

    /// Print the stream configuration of a magic cookie.
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Magic cookie (use "-" for stdin).
    #[arg(value_name = "COOKIE")]
    pub cookie: PathBuf,

    /// Packet files, one compressed frame each. Directories are read in
    /// file name order.
    #[arg(value_name = "PACKETS", required = true)]
    pub packets: Vec<PathBuf>,

    /// Output path for the audio file.
    #[arg(long, value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Audio format for output.
    #[arg(long, value_enum, default_value_t = AudioFormat::Caf)]
    pub format: AudioFormat,

    /// Maximum samples per channel in a packet [default: frame length of
    /// the cookie].
    #[arg(long, value_name = "N")]
    pub frames_per_packet: Option<u32>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Magic cookie (use "-" for stdin).
    #[arg(value_name = "COOKIE")]
    pub cookie: PathBuf,

    /// Packet files to summarize. Directories are read in file name order.
    #[arg(value_name = "PACKETS")]
    pub packets: Vec<PathBuf>,

    /// Print the report as YAML.
    #[arg(long)]
    pub yaml: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AudioFormat {
    /// Core Audio Format.
    Caf,
    /// Raw interleaved little-endian PCM.
    Pcm,
    /// Sony Wave64.
    W64,
}

impl AudioFormat {
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Caf => "caf",
            AudioFormat::Pcm => "pcm",
            AudioFormat::W64 => "w64",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_decode() {
        let cli = Cli::try_parse_from([
            "alacd",
            "--strict",
            "decode",
            "song.cookie",
            "packets/",
            "--format",
            "w64",
            "--frames-per-packet",
            "352",
        ])
        .unwrap();

        assert!(cli.strict);
        let Commands::Decode(args) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(args.cookie, PathBuf::from("song.cookie"));
        assert_eq!(args.packets, vec![PathBuf::from("packets/")]);
        assert_eq!(args.format, AudioFormat::W64);
        assert_eq!(args.frames_per_packet, Some(352));
    }

    #[test]
    fn test_decode_requires_packets() {
        assert!(Cli::try_parse_from(["alacd", "decode", "song.cookie"]).is_err());
    }
}
