use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use clipgif::{EngineConfig, FfmpegLogLevel, GifTranscoder, ServiceConfig};
use colored::Colorize;
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  clipgif serve --port 8080\n  clipgif probe input.mp4 --json\n  clipgif completions zsh > _clipgif";

#[derive(Debug, Parser)]
#[command(
    name = "clipgif",
    version,
    about = "Video-to-GIF conversion service",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging and pipeline diagnostics.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg console log level (quiet, fatal, error, warning, info, debug).
    #[arg(long, global = true, default_value = "error")]
    ffmpeg_log_level: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the HTTP service.
    #[command(
        about = "Run the HTTP service",
        after_help = "Environment:\n  CLIPGIF_HOST, CLIPGIF_PORT, CLIPGIF_MAX_UPLOAD_MB, CLIPGIF_YTDLP,\n  CLIPGIF_TOOL_TIMEOUT_SECS, CLIPGIF_FFPROBE, CLIPGIF_PROBE_TIMEOUT_SECS, DEBUG"
    )]
    Serve {
        /// Interface to bind (overrides CLIPGIF_HOST).
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to bind (overrides CLIPGIF_PORT).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Resolve the dimensions and frame rate of a local video.
    #[command(
        about = "Print resolved video metadata",
        visible_alias = "info",
        after_help = "Examples:\n  clipgif probe input.mp4\n  clipgif probe input.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output metadata as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let level = match record.level() {
                log::Level::Error => "ERROR".bright_red(),
                log::Level::Warn => "WARN ".yellow(),
                log::Level::Info => "INFO ".green(),
                log::Level::Debug => "DEBUG".blue(),
                log::Level::Trace => "TRACE".magenta(),
            };
            writeln!(buf, "{} {} {}", buf.timestamp(), level, record.args())
        })
        .init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let engine = EngineConfig::from_env();
    init_logging(cli.global.verbose || engine.debug);

    let ffmpeg_level: FfmpegLogLevel = cli.global.ffmpeg_log_level.parse()?;
    clipgif::set_log_level(ffmpeg_level);

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = ServiceConfig::from_env();
            if let Some(host) = host {
                config = config.with_host(host);
            }
            if let Some(port) = port {
                config = config.with_port(port);
            }
            if cli.global.verbose {
                let engine = config.engine.clone().with_debug(true);
                config = config.with_engine(engine);
            }

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(clipgif::server::serve(config))?;
        }
        Commands::Probe { input, json } => {
            if !input.is_file() {
                return Err(format!("input file not found: {}", input.display()).into());
            }
            let transcoder = GifTranscoder::with_config(engine);
            let resolved = transcoder.resolve_metadata(&input)?;
            if json {
                let payload = json!({
                    "input": input.display().to_string(),
                    "width": resolved.metadata.width,
                    "height": resolved.metadata.height,
                    "fps": resolved.metadata.frames_per_second,
                    "source": resolved.source,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "Video: {}x{} @ {:.2} fps",
                    resolved.metadata.width,
                    resolved.metadata.height,
                    resolved.metadata.frames_per_second,
                );
                println!("Resolved by: {}", resolved.source.cyan());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "clipgif", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
