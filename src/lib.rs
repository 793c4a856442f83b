mod error;
mod fonts;
pub mod intake;
pub mod layout;
mod model;
pub mod pdf;

pub use error::Error;
pub use fonts::CaptionFont;
pub use layout::layout;
pub use model::{
    Document, ImageFormat, IntakeImage, JpegColor, Page, PageConfig, Placement, SourceImage,
};

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Clone, Debug, Default)]
pub struct Options {
    pub config: PageConfig,
    pub font: CaptionFont,
}

/// What a run produced.
#[derive(Debug)]
pub struct Summary {
    pub document: Document,
    pub skipped: Vec<(PathBuf, String)>,
    pub bytes: usize,
}

/// Lay out already-decoded images and render them to PDF bytes.
pub fn generate_bytes(images: &[IntakeImage], options: &Options) -> Result<(Document, Vec<u8>), Error> {
    let sources: Vec<SourceImage> = images.iter().map(|img| img.source.clone()).collect();
    let doc = layout(&sources, &options.config)?;
    let bytes = pdf::render(&doc, images, &options.config, &options.font)?;
    Ok((doc, bytes))
}

/// Read `inputs` (files or directories), lay them out and write a PDF to `output`.
pub fn generate(inputs: &[PathBuf], output: &Path, options: &Options) -> Result<Summary, Error> {
    let t0 = Instant::now();
    options.config.validate()?;

    let paths = intake::collect_inputs(inputs)?;
    let intake = intake::load_images(&paths);
    let t_intake = t0.elapsed();

    if intake.images.is_empty() {
        return Err(Error::EmptyDocument);
    }

    let (document, bytes) = generate_bytes(&intake.images, options)?;
    let t_render = t0.elapsed();

    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: intake={:.1}ms, layout+render={:.1}ms, write={:.1}ms, total={:.1}ms ({} images on {} pages, {} skipped, output {} bytes)",
        t_intake.as_secs_f64() * 1000.0,
        (t_render - t_intake).as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        intake.images.len(),
        document.pages.len(),
        intake.skipped.len(),
        bytes.len(),
    );

    Ok(Summary {
        document,
        skipped: intake.skipped,
        bytes: bytes.len(),
    })
}
