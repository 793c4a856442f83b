use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use thumbgrid_pdf::{CaptionFont, Options, PageConfig};

/// Lay out PNG and JPEG images as captioned thumbnails on A4 pages.
#[derive(Parser)]
#[command(name = "thumbgrid-pdf", version)]
struct Cli {
    /// Image files or directories (directories are read one level deep, sorted by name)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output PDF
    #[arg(short, long, default_value = "thumbnails.pdf")]
    output: PathBuf,

    /// Number of grid columns
    #[arg(long, default_value_t = PageConfig::default().column_count)]
    columns: usize,

    /// Page margin in mm
    #[arg(long, default_value_t = PageConfig::default().margin)]
    margin: f32,

    /// Gap between columns and rows in mm
    #[arg(long, default_value_t = PageConfig::default().column_gap)]
    gap: f32,

    /// Thumbnail cell height in mm
    #[arg(long, default_value_t = PageConfig::default().cell_height)]
    cell_height: f32,

    /// Height of the caption band under each cell in mm
    #[arg(long, default_value_t = PageConfig::default().caption_band_height)]
    caption_band: f32,

    /// Caption font size in points
    #[arg(long, default_value_t = PageConfig::default().caption_font_size)]
    caption_size: f32,

    /// TrueType/OpenType font for captions (default: Helvetica)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Also write the computed layout as JSON
    #[arg(long)]
    layout_json: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<(), thumbgrid_pdf::Error> {
    let options = Options {
        config: PageConfig {
            column_count: cli.columns,
            margin: cli.margin,
            column_gap: cli.gap,
            cell_height: cli.cell_height,
            caption_band_height: cli.caption_band,
            caption_font_size: cli.caption_size,
            ..PageConfig::default()
        },
        font: cli.font.map(CaptionFont::TrueType).unwrap_or_default(),
    };

    let summary = thumbgrid_pdf::generate(&cli.inputs, &cli.output, &options)?;

    if let Some(path) = cli.layout_json {
        let json = serde_json::to_string_pretty(&summary.document)?;
        std::fs::write(&path, json)?;
    }

    for (path, reason) in &summary.skipped {
        eprintln!("skipped {}: {reason}", path.display());
    }
    println!(
        "Wrote {} ({} images, {} pages)",
        cli.output.display(),
        summary.document.placement_count(),
        summary.document.pages.len(),
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
