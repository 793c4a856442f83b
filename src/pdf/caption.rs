use pdf_writer::{Content, Name, Str};

use crate::fonts::FontEntry;

/// Shorten `text` with a trailing ellipsis until it fits in `max_width` points.
pub(super) fn fit_caption(text: &str, font: &FontEntry, font_size: f32, max_width: f32) -> String {
    if font.text_width(text, font_size) <= max_width {
        return text.to_string();
    }
    let ellipsis = if font.covers('\u{2026}') { "\u{2026}" } else { "..." };
    let budget = max_width - font.text_width(ellipsis, font_size);
    if budget <= 0.0 {
        return String::new();
    }

    let mut width = 0.0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = font.char_width_1000(ch) * font_size / 1000.0;
        if width + w > budget {
            break;
        }
        width += w;
        out.push(ch);
    }
    let kept = out.trim_end().len();
    out.truncate(kept);
    out.push_str(ellipsis);
    out
}

/// Draw `text` centered on `center_x` with its baseline at `baseline_y` (points,
/// PDF space).
pub(super) fn draw_caption(
    content: &mut Content,
    font: &FontEntry,
    font_size: f32,
    text: &str,
    center_x: f32,
    baseline_y: f32,
) {
    if text.is_empty() {
        return;
    }
    let width = font.text_width(text, font_size);
    content.begin_text();
    content.set_font(Name(font.pdf_name.as_bytes()), font_size);
    content.next_line(center_x - width / 2.0, baseline_y);
    content.show(Str(&font.encode(text)));
    content.end_text();
}
