use std::path::PathBuf;

use serde::Serialize;

use crate::error::Error;

/// One decoded input image as the paginator sees it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceImage {
    pub index: usize,
    pub display_name: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

/// Page and grid geometry. Lengths are millimetres except `caption_font_size`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageConfig {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub column_count: usize,
    /// Horizontal gap between columns, also used as the vertical gap between rows.
    pub column_gap: f32,
    pub cell_height: f32,
    pub caption_band_height: f32,
    pub caption_font_size: f32, // points
    /// Caption baseline, measured down from the bottom edge of the cell.
    pub caption_offset: f32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 15.0,
            column_count: 3,
            column_gap: 5.0,
            cell_height: 60.0,
            caption_band_height: 10.0,
            caption_font_size: 8.0,
            caption_offset: 5.0,
        }
    }
}

impl PageConfig {
    pub fn usable_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    pub fn cell_width(&self) -> f32 {
        let gaps = (self.column_count.saturating_sub(1)) as f32 * self.column_gap;
        (self.usable_width() - gaps) / self.column_count.max(1) as f32
    }

    /// Height of one row without the trailing gap: cell plus caption band.
    pub fn row_height(&self) -> f32 {
        self.cell_height + self.caption_band_height
    }

    /// Distance between the tops of two consecutive rows.
    pub fn row_pitch(&self) -> f32 {
        self.row_height() + self.column_gap
    }

    /// Rows the paginator puts on each page. Always at least one, even when a
    /// single row overflows the usable height.
    pub fn rows_per_page(&self) -> usize {
        let spare = self.page_height - 2.0 * self.margin - self.row_height();
        if spare < 0.0 {
            return 1;
        }
        1 + (spare / self.row_pitch()).floor() as usize
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.column_count < 1 {
            return Err(Error::Config("column count must be at least 1".into()));
        }
        let positive = [
            ("page width", self.page_width),
            ("page height", self.page_height),
            ("cell height", self.cell_height),
            ("caption band height", self.caption_band_height),
            ("caption font size", self.caption_font_size),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        let non_negative = [
            ("margin", self.margin),
            ("column gap", self.column_gap),
            ("caption offset", self.caption_offset),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{name} must not be negative, got {value}")));
            }
        }
        if self.page_width <= 2.0 * self.margin {
            return Err(Error::Config(format!(
                "page width {} leaves no room inside margins of {}",
                self.page_width, self.margin
            )));
        }
        if self.cell_width() <= 0.0 {
            return Err(Error::Config(format!(
                "{} columns with a {} gap do not fit in {} of usable width",
                self.column_count,
                self.column_gap,
                self.usable_width()
            )));
        }
        if self.margin + self.row_height() > self.page_height - self.margin {
            log::warn!(
                "row height {} exceeds usable page height {}; every row will overflow the bottom margin",
                self.row_height(),
                self.page_height - 2.0 * self.margin,
            );
        }
        Ok(())
    }
}

/// Where one image ends up. Coordinates are millimetres from the page's
/// top-left corner.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Placement {
    pub image_index: usize,
    pub page_index: usize,
    pub row: usize,
    pub column: usize,
    pub cell_x: f32,
    pub cell_y: f32,
    pub rendered_width: f32,
    pub rendered_height: f32,
    pub image_x: f32,
    pub image_y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page {
    pub index: usize,
    pub placements: Vec<Placement>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Document {
    pub pages: Vec<Page>,
    pub cell_width: f32,
    pub cell_height: f32,
}

impl Document {
    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.pages.iter().flat_map(|p| p.placements.iter())
    }

    pub fn placement_count(&self) -> usize {
        self.pages.iter().map(|p| p.placements.len()).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Component layout of a JPEG. Gray and RGB are embedded as-is; CMYK is
/// re-encoded from decoded pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum JpegColor {
    Gray,
    Rgb,
    Cmyk,
}

/// An image that made it through intake: layout metadata plus the encoded file.
#[derive(Clone)]
pub struct IntakeImage {
    pub source: SourceImage,
    pub path: PathBuf,
    pub format: ImageFormat,
    /// Only meaningful when `format` is `Jpeg`.
    pub jpeg_color: JpegColor,
    pub data: Vec<u8>,
    /// Pixels decoded at intake, kept for images that cannot be embedded as
    /// encoded (PNG, CMYK JPEG). `None` for pass-through JPEGs.
    pub pixels: Option<image::RgbaImage>,
}

impl IntakeImage {
    /// Whether the encoded bytes can go into the PDF unchanged.
    pub fn passes_through(&self) -> bool {
        self.format == ImageFormat::Jpeg
            && matches!(self.jpeg_color, JpegColor::Gray | JpegColor::Rgb)
    }
}
