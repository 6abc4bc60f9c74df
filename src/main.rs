//! # Watermark Pro CLI
//!
//! Command-line interface for tiling text watermarks over images.
//!
//! ## Usage
//!
//! ```bash
//! # Start the local web UI
//! watermark-pro serve --listen 127.0.0.1:8080
//!
//! # Watermark a file with the defaults ("Watermark", -30°, 15% black)
//! watermark-pro apply photo.jpg
//!
//! # Custom text and spacing, doubled resolution
//! watermark-pro apply photo.jpg -o marked.png --text "DRAFT" --gap-x 40 --scale 2
//!
//! # Start from a JSON preset, then override a field
//! watermark-pro apply photo.jpg --config preset.json --rotate 45
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use watermark_pro::{
    FontFace, Session, WatermarkConfig, WatermarkError,
    render::export::ExportScale,
    server::{self, ServerConfig},
};

/// Watermark Pro - tile a text watermark across an image
#[derive(Parser, Debug)]
#[command(name = "watermark-pro")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the local web UI
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,

        /// TrueType/OpenType font for the watermark text
        #[arg(long, value_name = "FILE")]
        font: Option<PathBuf>,

        /// Seconds of inactivity before a session is dropped
        #[arg(long, default_value = "3600")]
        session_ttl: u64,
    },

    /// Watermark an image file
    Apply {
        /// Image to watermark
        input: PathBuf,

        /// Output PNG (defaults to watermark-<unix-ms>.png)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// JSON preset with watermark settings
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Watermark text
        #[arg(long)]
        text: Option<String>,

        /// Fill color, e.g. "rgba(0, 0, 0, 0.15)" or "#ff000080"
        #[arg(long)]
        color: Option<String>,

        /// Font size in pixels (12-200)
        #[arg(long)]
        font_size: Option<f32>,

        /// Clockwise rotation in degrees (-180 to 180)
        #[arg(long, allow_negative_numbers = true)]
        rotate: Option<f32>,

        /// Horizontal gap between tiles
        #[arg(long)]
        gap_x: Option<f32>,

        /// Vertical gap between tiles
        #[arg(long)]
        gap_y: Option<f32>,

        /// Horizontal shift of the tile grid
        #[arg(long, allow_negative_numbers = true)]
        offset_x: Option<f32>,

        /// Vertical shift of the tile grid
        #[arg(long, allow_negative_numbers = true)]
        offset_y: Option<f32>,

        /// Output resolution multiplier (1 or 2)
        #[arg(long, default_value = "1")]
        scale: u32,

        /// TrueType/OpenType font for the watermark text
        #[arg(long, value_name = "FILE")]
        font: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("watermark_pro=info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), WatermarkError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            font,
            session_ttl,
        } => {
            let config = ServerConfig {
                listen_addr: listen,
                font_path: font,
                session_ttl: Duration::from_secs(session_ttl),
                ..ServerConfig::default()
            };
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::serve(config))
        }
        Commands::Apply {
            input,
            output,
            config,
            text,
            color,
            font_size,
            rotate,
            gap_x,
            gap_y,
            offset_x,
            offset_y,
            scale,
            font,
        } => {
            let mut watermark = match config {
                Some(path) => WatermarkConfig::from_json_file(&path)?,
                None => WatermarkConfig::default(),
            };

            if let Some(text) = text {
                watermark.content = text;
            }
            if let Some(color) = color {
                watermark.color = color.parse()?;
            }
            if let Some(size) = font_size {
                watermark.font_size = size;
            }
            if let Some(rotate) = rotate {
                watermark.rotate = rotate;
            }
            if let Some(x) = gap_x {
                watermark.gap[0] = x;
            }
            if let Some(y) = gap_y {
                watermark.gap[1] = y;
            }
            if offset_x.is_some() || offset_y.is_some() {
                let [ox, oy] = watermark.offset_or_zero();
                watermark.offset = Some([offset_x.unwrap_or(ox), offset_y.unwrap_or(oy)]);
            }

            let font = match font {
                Some(path) => FontFace::from_file(&path)?,
                None => FontFace::Builtin,
            };
            let scale = ExportScale::try_from(scale)?;

            apply(&input, output, watermark, &font, scale)
        }
    }
}

/// Watermark one file and write the PNG.
fn apply(
    input: &Path,
    output: Option<PathBuf>,
    config: WatermarkConfig,
    font: &FontFace,
    scale: ExportScale,
) -> Result<(), WatermarkError> {
    let bytes = std::fs::read(input)?;
    let filename = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    let mut session = Session::new();
    session.update_config(config)?;
    session.load(&bytes, None, &filename)?;

    let download = session
        .export(font, scale, chrono::Utc::now().timestamp_millis())
        .ok_or_else(|| WatermarkError::InvalidInput(format!("'{}' was not loaded", filename)))??;

    let path = output.unwrap_or_else(|| PathBuf::from(&download.filename));
    std::fs::write(&path, &download.bytes)?;
    println!(
        "Saved {} ({}x{})",
        path.display(),
        download.width,
        download.height
    );

    Ok(())
}
