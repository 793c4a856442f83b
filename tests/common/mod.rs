#![allow(dead_code)]

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn write_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]))
        .save(&path)
        .expect("write png");
    path
}

pub fn write_transparent_png(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_fn(w, h, |x, _| Rgba([200, 10, 10, if x % 2 == 0 { 255 } else { 0 }]))
        .save(&path)
        .expect("write png");
    path
}

pub fn write_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, 64, (y % 256) as u8]))
        .save(&path)
        .expect("write jpeg");
    path
}

pub fn write_gray_jpeg(dir: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let path = dir.join(name);
    GrayImage::from_fn(w, h, |x, _| Luma([(x % 256) as u8]))
        .save(&path)
        .expect("write jpeg");
    path
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

/// Page objects in a PDF written by pdf-writer (dictionaries are uncompressed).
pub fn page_count(pdf: &[u8]) -> usize {
    count(pdf, b"/Type /Page") - count(pdf, b"/Type /Pages")
}

/// Image XObjects, soft masks included.
pub fn image_xobject_count(pdf: &[u8]) -> usize {
    count(pdf, b"/Subtype /Image")
}

pub fn smask_count(pdf: &[u8]) -> usize {
    count(pdf, b"/SMask")
}

pub fn dct_count(pdf: &[u8]) -> usize {
    count(pdf, b"/DCTDecode")
}

/// All MediaBox rectangles as (width, height).
pub fn media_boxes(pdf: &[u8]) -> Vec<(f32, f32)> {
    let text = String::from_utf8_lossy(pdf);
    text.match_indices("/MediaBox [")
        .filter_map(|(i, m)| {
            let rest = &text[i + m.len()..];
            let end = rest.find(']')?;
            let nums: Vec<f32> = rest[..end]
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
            (nums.len() == 4).then(|| (nums[2] - nums[0], nums[3] - nums[1]))
        })
        .collect()
}

/// Every zlib stream in the file that inflates, as text. With JPEG-only
/// inputs and the built-in font these are exactly the page content streams.
pub fn inflated_streams(pdf: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(off) = find(&pdf[i..], b"stream\n") {
        let start = i + off;
        i = start + b"stream\n".len();
        if start >= 3 && &pdf[start - 3..start] == b"end" {
            continue;
        }
        let Some(len) = find(&pdf[i..], b"\nendstream") else {
            break;
        };
        if let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(&pdf[i..i + len]) {
            out.push(String::from_utf8_lossy(&raw).into_owned());
        }
        i += len;
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Numeric operands of every `op` operator in a content stream.
pub fn operands(content: &str, op: &str) -> Vec<Vec<f32>> {
    let mut found = Vec::new();
    let mut stack: Vec<f32> = Vec::new();
    for token in content.split_whitespace() {
        if let Ok(n) = token.parse::<f32>() {
            stack.push(n);
            continue;
        }
        if token == op {
            found.push(stack.clone());
        }
        stack.clear();
    }
    found
}
