//! Image intake: turns user-supplied paths into decoded, ordered images.
//!
//! Files are filtered by extension, read, sniffed and fully decoded. Pixels
//! are kept for images the PDF writer must re-encode, so nothing is decoded
//! twice. Decoding runs on the rayon pool; results are collected back in input order, so the
//! order images appear in the document never depends on which decode finishes
//! first. A file that fails any step is left out with a warning.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::Error;
use crate::model::{ImageFormat, IntakeImage, JpegColor, SourceImage};

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Images that made it through, in input order, plus what was dropped.
pub struct Intake {
    pub images: Vec<IntakeImage>,
    pub skipped: Vec<(PathBuf, String)>,
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.as_str()))
}

fn open_error(e: std::io::Error, path: &Path) -> Error {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    }
}

/// Expand directories (one level, sorted by file name) and keep explicit files
/// as given. Unsupported extensions are dropped here.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, Error> {
    let mut out = Vec::new();
    for path in paths {
        let meta = std::fs::metadata(path).map_err(|e| open_error(e, path))?;
        if meta.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .map_err(|e| open_error(e, path))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .collect();
            entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
            for entry in entries {
                if is_supported(&entry) {
                    out.push(entry);
                } else {
                    log::debug!("skipping {}: not a PNG or JPEG", entry.display());
                }
            }
        } else if is_supported(path) {
            out.push(path.clone());
        } else {
            log::debug!("skipping {}: not a PNG or JPEG", path.display());
        }
    }
    Ok(out)
}

/// Identify PNG or JPEG by signature.
pub fn sniff_format(data: &[u8]) -> Option<ImageFormat> {
    if data.len() >= 3 && data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Some(ImageFormat::Jpeg);
    }
    if data.len() >= 8 && data[..8] == [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A] {
        return Some(ImageFormat::Png);
    }
    None
}

/// Number of color components declared in the first JPEG frame header.
fn jpeg_components(data: &[u8]) -> Option<u8> {
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        // fill bytes
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof && i + 9 < data.len() {
            return Some(data[i + 9]);
        }
        i += 2 + len;
    }
    None
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Decode one in-memory file. `index` becomes the image's ordinal.
pub fn decode_image(path: PathBuf, data: Vec<u8>, index: usize) -> Result<IntakeImage, Error> {
    let format = sniff_format(&data).ok_or_else(|| {
        Error::UnsupportedImage(format!("{}: not PNG or JPEG data", path.display()))
    })?;
    let decoded = match format {
        ImageFormat::Png => image::load_from_memory_with_format(&data, image::ImageFormat::Png)?,
        ImageFormat::Jpeg => image::load_from_memory_with_format(&data, image::ImageFormat::Jpeg)?,
    };
    let (pixel_width, pixel_height) = (decoded.width(), decoded.height());
    if pixel_width == 0 || pixel_height == 0 {
        return Err(Error::UnsupportedImage(format!(
            "{}: empty image {pixel_width}x{pixel_height}",
            path.display()
        )));
    }

    let jpeg_color = match format {
        ImageFormat::Jpeg => match jpeg_components(&data) {
            Some(1) => JpegColor::Gray,
            Some(4) => JpegColor::Cmyk,
            _ => JpegColor::Rgb,
        },
        ImageFormat::Png => JpegColor::Rgb,
    };

    let mut img = IntakeImage {
        source: SourceImage {
            index,
            display_name: display_name(&path),
            pixel_width,
            pixel_height,
        },
        path,
        format,
        jpeg_color,
        data,
        pixels: None,
    };
    if !img.passes_through() {
        img.pixels = Some(decoded.into_rgba8());
    }
    Ok(img)
}

fn load_one(path: &Path) -> Result<IntakeImage, Error> {
    let data = std::fs::read(path).map_err(|e| open_error(e, path))?;
    decode_image(path.to_path_buf(), data, 0)
}

/// Read and decode `paths` concurrently. Survivors are renumbered 0.. in the
/// order they were given.
pub fn load_images(paths: &[PathBuf]) -> Intake {
    let results: Vec<Result<IntakeImage, Error>> =
        paths.par_iter().map(|p| load_one(p)).collect();

    let mut images = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for (path, result) in paths.iter().zip(results) {
        match result {
            Ok(mut img) => {
                img.source.index = images.len();
                log::debug!(
                    "intake #{}: {} {}x{} {:?}",
                    img.source.index,
                    img.source.display_name,
                    img.source.pixel_width,
                    img.source.pixel_height,
                    img.format,
                );
                images.push(img);
            }
            Err(e) => {
                log::warn!("Skipping {}: {e}", path.display());
                skipped.push((path.clone(), e.to_string()));
            }
        }
    }
    Intake { images, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_filter_ignores_case() {
        assert!(is_supported(Path::new("a/Holiday.JPG")));
        assert!(is_supported(Path::new("scan.jpeg")));
        assert!(is_supported(Path::new("x.png")));
        assert!(!is_supported(Path::new("x.gif")));
        assert!(!is_supported(Path::new("README")));
    }

    #[test]
    fn sniffs_signatures() {
        assert_eq!(
            sniff_format(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]),
            Some(ImageFormat::Png)
        );
        assert_eq!(sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpeg));
        assert_eq!(sniff_format(b"GIF89a"), None);
        assert_eq!(sniff_format(&[]), None);
    }

    #[test]
    fn reads_component_count_from_frame_header() {
        // SOI, APP0 (len 4), SOF0 with 1 component
        let data = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00, 0xFF, 0xC0, 0x00, 0x0B, 0x08, 0x00,
            0x10, 0x00, 0x20, 0x01, 0x01, 0x11, 0x00, 0xFF, 0xD9,
        ];
        assert_eq!(jpeg_components(&data), Some(1));
    }

    fn encode(img: &image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn pixels_are_kept_only_when_rendering_needs_them() {
        let rgb = image::DynamicImage::ImageRgb8(image::RgbImage::new(6, 4));
        let png = decode_image(PathBuf::from("a.png"), encode(&rgb, image::ImageFormat::Png), 0)
            .unwrap();
        let pixels = png.pixels.as_ref().unwrap();
        assert_eq!(pixels.dimensions(), (6, 4));

        let jpg = decode_image(PathBuf::from("b.jpg"), encode(&rgb, image::ImageFormat::Jpeg), 1)
            .unwrap();
        assert!(jpg.passes_through());
        assert!(jpg.pixels.is_none());
    }

    #[test]
    fn garbage_with_image_extension_is_rejected() {
        let err = decode_image(PathBuf::from("fake.png"), b"not an image".to_vec(), 0);
        assert!(matches!(err, Err(Error::UnsupportedImage(_))));
    }
}
