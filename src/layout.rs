//! Grid pagination: assigns every image a page, a cell and a scaled size.
//!
//! Pure and synchronous. Images are placed strictly in input order, left to
//! right and top to bottom, `column_count` per row. Page breaks are only ever
//! taken between rows.

use crate::error::Error;
use crate::model::{Document, Page, PageConfig, Placement, SourceImage};

/// Largest uniform scale that fits a `pixel_width` x `pixel_height` image
/// inside a `cell_width` x `cell_height` box.
pub fn fit_ratio(pixel_width: u32, pixel_height: u32, cell_width: f32, cell_height: f32) -> f32 {
    (cell_width / pixel_width as f32).min(cell_height / pixel_height as f32)
}

/// Lay out `images` on as many pages as needed.
///
/// An empty slice yields a document with no pages. A row taller than the
/// usable page height is still placed at the top margin and overflows the
/// bottom one; the following row starts a fresh page.
///
/// Fails before placing anything if `config` is invalid or an image has a
/// zero pixel dimension.
pub fn layout(images: &[SourceImage], config: &PageConfig) -> Result<Document, Error> {
    config.validate()?;
    if let Some(img) = images.iter().find(|i| i.pixel_width == 0 || i.pixel_height == 0) {
        return Err(Error::UnsupportedImage(format!(
            "{}: empty image {}x{}",
            img.display_name, img.pixel_width, img.pixel_height
        )));
    }

    let cell_width = config.cell_width();
    let cell_height = config.cell_height;
    let page_bottom = config.page_height - config.margin;

    let mut pages: Vec<Page> = Vec::new();
    let mut page_index = 0usize;
    let mut row = 0usize;
    let mut column = 0usize;
    let mut row_y = config.margin;

    for img in images {
        let cell_x = config.margin + column as f32 * (cell_width + config.column_gap);
        let ratio = fit_ratio(img.pixel_width, img.pixel_height, cell_width, cell_height);
        let rendered_width = img.pixel_width as f32 * ratio;
        let rendered_height = img.pixel_height as f32 * ratio;

        let placement = Placement {
            image_index: img.index,
            page_index,
            row,
            column,
            cell_x,
            cell_y: row_y,
            rendered_width,
            rendered_height,
            image_x: cell_x + (cell_width - rendered_width) / 2.0,
            image_y: row_y,
        };

        if pages.last().is_none_or(|p| p.index != page_index) {
            pages.push(Page {
                index: page_index,
                placements: Vec::new(),
            });
        }
        if let Some(page) = pages.last_mut() {
            page.placements.push(placement);
        }

        column += 1;
        if column == config.column_count {
            column = 0;
            row += 1;
            row_y += config.row_pitch();

            if row_y + config.row_height() > page_bottom {
                log::debug!(
                    "page {page_index} full after {row} rows (next row would end at {:.1} > {page_bottom:.1})",
                    row_y + config.row_height(),
                );
                page_index += 1;
                row = 0;
                row_y = config.margin;
            }
        }
    }

    log::debug!(
        "layout: {} images on {} pages, cell {cell_width:.2}x{cell_height:.2}",
        images.len(),
        pages.len(),
    );

    Ok(Document {
        pages,
        cell_width,
        cell_height,
    })
}
