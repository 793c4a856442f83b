mod caption;

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};
use rayon::prelude::*;

use crate::error::Error;
use crate::fonts::{CaptionFont, register_font};
use crate::model::{Document, ImageFormat, IntakeImage, JpegColor, PageConfig, Placement};

use caption::{draw_caption, fit_caption};

/// Points per millimetre (1 inch = 72 points = 25.4 mm).
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Image matrix `[w 0 0 h x y]` drawing the unit square at the placement's
/// rendered box. Layout measures from the top-left in mm; PDF from the
/// bottom-left in points.
fn image_transform(p: &Placement, page_h: f32) -> [f32; 6] {
    let w = mm_to_pt(p.rendered_width);
    let h = mm_to_pt(p.rendered_height);
    let x = mm_to_pt(p.image_x);
    let y = page_h - mm_to_pt(p.image_y) - h;
    [w, 0.0, 0.0, h, x, y]
}

/// Horizontal center of the cell and the caption baseline, in points.
fn caption_anchor(p: &Placement, doc: &Document, caption_offset: f32, page_h: f32) -> (f32, f32) {
    let center_x = mm_to_pt(p.cell_x + doc.cell_width / 2.0);
    let baseline_y = page_h - mm_to_pt(p.cell_y + doc.cell_height + caption_offset);
    (center_x, baseline_y)
}

#[derive(Clone, Copy)]
enum PixelSpace {
    Gray,
    Rgb,
}

/// Image stream ready to be written, produced off the main thread.
struct PreparedImage<'a> {
    data: Cow<'a, [u8]>,
    filter: Filter,
    width: u32,
    height: u32,
    space: PixelSpace,
    alpha: Option<Vec<u8>>,
}

/// JPEGs in gray or RGB pass through untouched; anything else is stored as
/// zlib-compressed RGB with an optional alpha soft mask, from the pixels intake
/// already decoded.
fn prepare_image(img: &IntakeImage) -> Result<PreparedImage<'_>, Error> {
    let (w, h) = (img.source.pixel_width, img.source.pixel_height);
    if img.passes_through() {
        return Ok(PreparedImage {
            data: Cow::Borrowed(&img.data),
            filter: Filter::DctDecode,
            width: w,
            height: h,
            space: match img.jpeg_color {
                JpegColor::Gray => PixelSpace::Gray,
                _ => PixelSpace::Rgb,
            },
            alpha: None,
        });
    }

    let rgba: Cow<image::RgbaImage> = match &img.pixels {
        Some(pixels) => Cow::Borrowed(pixels),
        // built by hand rather than by intake
        None => {
            let format = match img.format {
                ImageFormat::Png => image::ImageFormat::Png,
                ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            };
            Cow::Owned(image::load_from_memory_with_format(&img.data, format)?.to_rgba8())
        }
    };
    let (w, h) = (rgba.width(), rgba.height());
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb_data: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let alpha = has_alpha.then(|| {
        let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
        miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6)
    });

    Ok(PreparedImage {
        data: Cow::Owned(miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6)),
        filter: Filter::FlateDecode,
        width: w,
        height: h,
        space: PixelSpace::Rgb,
        alpha,
    })
}

fn write_image(pdf: &mut Pdf, prepared: &PreparedImage, alloc: &mut impl FnMut() -> Ref) -> Ref {
    let xobj_ref = alloc();
    let smask_ref = prepared.alpha.as_ref().map(|alpha| {
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(prepared.width as i32);
        mask.height(prepared.height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask_ref
    });

    let mut xobj = pdf.image_xobject(xobj_ref, &prepared.data);
    xobj.filter(prepared.filter);
    xobj.width(prepared.width as i32);
    xobj.height(prepared.height as i32);
    match prepared.space {
        PixelSpace::Gray => xobj.color_space().device_gray(),
        PixelSpace::Rgb => xobj.color_space().device_rgb(),
    };
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    xobj_ref
}

/// Write `doc` as PDF. `images` must contain every image the document places,
/// looked up by ordinal.
pub fn render(
    doc: &Document,
    images: &[IntakeImage],
    config: &PageConfig,
    font: &CaptionFont,
) -> Result<Vec<u8>, Error> {
    if doc.pages.is_empty() {
        return Err(Error::EmptyDocument);
    }
    let t0 = std::time::Instant::now();

    let by_index: HashMap<usize, &IntakeImage> =
        images.iter().map(|img| (img.source.index, img)).collect();
    let placed: Vec<&IntakeImage> = doc
        .placements()
        .map(|p| {
            by_index.get(&p.image_index).copied().ok_or_else(|| {
                Error::Pdf(format!("placement refers to unknown image #{}", p.image_index))
            })
        })
        .collect::<Result<_, _>>()?;

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: caption font, subset to every character any caption can use
    let mut used_chars: HashSet<char> = placed
        .iter()
        .flat_map(|img| img.source.display_name.chars())
        .collect();
    used_chars.extend([' ', '.', '\u{2026}']);
    let font_entry = register_font(&mut pdf, font, "F1".to_string(), &mut alloc, &used_chars);

    let t_fonts = t0.elapsed();

    // Phase 2: image streams, compressed in parallel, written in placement order
    let prepared: Vec<PreparedImage> = placed
        .par_iter()
        .map(|img| prepare_image(img))
        .collect::<Result<_, _>>()?;
    let mut image_xobjects: HashMap<usize, (String, Ref)> = HashMap::new();
    for (img, prep) in placed.iter().zip(&prepared) {
        let xobj_ref = write_image(&mut pdf, prep, &mut alloc);
        let name = format!("Im{}", image_xobjects.len() + 1);
        image_xobjects.insert(img.source.index, (name, xobj_ref));
    }
    drop(prepared);

    let t_images = t0.elapsed();

    // Phase 3: one content stream per page
    let page_w = mm_to_pt(config.page_width);
    let page_h = mm_to_pt(config.page_height);
    let cell_w = mm_to_pt(doc.cell_width);
    let font_size = config.caption_font_size;

    let mut all_contents: Vec<Content> = Vec::with_capacity(doc.pages.len());
    let mut page_xobjects: Vec<Vec<(String, Ref)>> = Vec::with_capacity(doc.pages.len());
    for page in &doc.pages {
        let mut content = Content::new();
        let mut used = Vec::with_capacity(page.placements.len());
        for p in &page.placements {
            let (name, xobj_ref) = &image_xobjects[&p.image_index];
            content.save_state();
            content.transform(image_transform(p, page_h));
            content.x_object(Name(name.as_bytes()));
            content.restore_state();
            used.push((name.clone(), *xobj_ref));

            let label = fit_caption(
                &by_index[&p.image_index].source.display_name,
                &font_entry,
                font_size,
                cell_w,
            );
            let (center_x, baseline) = caption_anchor(p, doc, config.caption_offset, page_h);
            content.set_fill_gray(0.0);
            draw_caption(&mut content, &font_entry, font_size, &label, center_x, baseline);
        }
        all_contents.push(content);
        page_xobjects.push(used);
    }

    let t_layout = t0.elapsed();

    // Phase 4: page tree
    let n = all_contents.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    for (i, c) in all_contents.into_iter().enumerate() {
        let raw = c.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);
    pdf.document_info(info_id)
        .producer(TextStr(concat!("thumbgrid-pdf ", env!("CARGO_PKG_VERSION"))));

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, page_w, page_h))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        resources
            .fonts()
            .pair(Name(font_entry.pdf_name.as_bytes()), font_entry.font_ref);
        if !page_xobjects[i].is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &page_xobjects[i] {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: font_embed={:.1}ms, images={:.1}ms, pages={:.1}ms, assembly={:.1}ms",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_layout - t_images).as_secs_f64() * 1000.0,
        (t_assembly - t_layout).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_in_points() {
        assert!((mm_to_pt(210.0) - 595.2756).abs() < 1e-3);
        assert!((mm_to_pt(297.0) - 841.8898).abs() < 1e-3);
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    /// A 200x100 image in the middle column of a 50mm-wide grid, second row.
    fn wide_in_second_row() -> (Document, Placement) {
        let p = Placement {
            image_index: 4,
            page_index: 0,
            row: 1,
            column: 1,
            cell_x: 70.0,
            cell_y: 90.0,
            rendered_width: 50.0,
            rendered_height: 25.0,
            image_x: 70.0,
            image_y: 90.0,
        };
        let doc = Document {
            pages: Vec::new(),
            cell_width: 50.0,
            cell_height: 60.0,
        };
        (doc, p)
    }

    #[test]
    fn image_box_is_flipped_to_bottom_left_points() {
        let (_, p) = wide_in_second_row();
        let page_h = mm_to_pt(297.0);
        let [a, b, c, d, e, f] = image_transform(&p, page_h);
        assert!(close(a, mm_to_pt(50.0)));
        assert!(close(d, mm_to_pt(25.0)));
        assert_eq!((b, c), (0.0, 0.0));
        assert!(close(e, mm_to_pt(70.0)));
        // bottom edge of the image: 297 - 90 - 25 mm from the page bottom
        assert!(close(f, mm_to_pt(182.0)));
    }

    #[test]
    fn centered_image_keeps_its_horizontal_offset() {
        let (_, mut p) = wide_in_second_row();
        p.rendered_width = 20.0;
        p.rendered_height = 60.0;
        p.image_x = 85.0;
        let page_h = mm_to_pt(297.0);
        let m = image_transform(&p, page_h);
        assert!(close(m[0], mm_to_pt(20.0)));
        assert!(close(m[3], mm_to_pt(60.0)));
        assert!(close(m[4], mm_to_pt(85.0)));
        assert!(close(m[5], mm_to_pt(147.0)));
    }

    #[test]
    fn caption_sits_under_the_cell_center() {
        let (doc, p) = wide_in_second_row();
        let page_h = mm_to_pt(297.0);
        let (x, y) = caption_anchor(&p, &doc, 5.0, page_h);
        assert!(close(x, mm_to_pt(95.0)));
        // 90 + 60 + 5 mm down from the top
        assert!(close(y, mm_to_pt(142.0)));
    }
}
