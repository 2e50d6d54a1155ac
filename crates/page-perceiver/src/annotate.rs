//! Annotated screenshot rendering: bounding boxes and annotation-id labels
//! burned into a copy of the capture. Best-effort by contract; callers
//! treat failures as non-fatal.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::io::Cursor;

use trail_types::ElementDescriptor;

use crate::errors::PerceiverError;

const LABEL_TEXT: Rgba<u8> = Rgba([255, 255, 255, 255]);
const DIGIT_W: i32 = 3;
const DIGIT_H: i32 = 5;
const DIGIT_SCALE: i32 = 2;
const LABEL_PAD: i32 = 2;

/// Burn bounding boxes + annotation ids into the screenshot, returning new
/// PNG bytes. The input image is not modified.
pub fn annotate_screenshot(
    png: &[u8],
    descriptors: &[ElementDescriptor],
) -> Result<Vec<u8>, PerceiverError> {
    let decoded = image::load_from_memory(png)
        .map_err(|e| PerceiverError::Image(format!("decode failed: {e}")))?;
    let mut canvas: RgbaImage = decoded.to_rgba8();
    let (img_w, img_h) = (canvas.width() as i32, canvas.height() as i32);

    for (index, descriptor) in descriptors.iter().enumerate() {
        let bbox = descriptor.bounding_box;
        if bbox.width <= 0 || bbox.height <= 0 {
            continue;
        }
        if bbox.x >= img_w || bbox.y >= img_h {
            continue;
        }

        let color = annotation_color(index);
        let rect = clamp_rect(bbox.x, bbox.y, bbox.width, bbox.height, img_w, img_h);

        // Two nested hollow rects give a 2px outline.
        draw_hollow_rect_mut(&mut canvas, rect, color);
        if bbox.width > 2 && bbox.height > 2 {
            let inner = clamp_rect(bbox.x + 1, bbox.y + 1, bbox.width - 2, bbox.height - 2, img_w, img_h);
            draw_hollow_rect_mut(&mut canvas, inner, color);
        }

        draw_label(
            &mut canvas,
            descriptor.annotation_id,
            bbox.x,
            bbox.y,
            color,
        );
    }

    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
        .map_err(|e| PerceiverError::Image(format!("encode failed: {e}")))?;
    Ok(out)
}

/// Distinct per-element colors via golden-angle hue distribution.
pub fn annotation_color(index: usize) -> Rgba<u8> {
    let hue = (index as f32 * 137.508) % 360.0;
    let saturation = (70 + (index % 3) * 10) as f32 / 100.0;
    let lightness = (50 + (index % 2) * 20) as f32 / 100.0;

    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match hue as u32 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgba([
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
        255,
    ])
}

fn clamp_rect(x: i32, y: i32, w: i32, h: i32, img_w: i32, img_h: i32) -> Rect {
    let x = x.clamp(0, img_w - 1);
    let y = y.clamp(0, img_h - 1);
    let w = (w.max(1)).min(img_w - x).max(1) as u32;
    let h = (h.max(1)).min(img_h - y).max(1) as u32;
    Rect::at(x, y).of_size(w, h)
}

/// Filled tag above the box's top-left corner with the id digits inside.
fn draw_label(canvas: &mut RgbaImage, id: u32, x: i32, y: i32, color: Rgba<u8>) {
    let digits: Vec<u32> = id
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();
    let text_w = digits.len() as i32 * (DIGIT_W * DIGIT_SCALE + DIGIT_SCALE);
    let text_h = DIGIT_H * DIGIT_SCALE;

    let (img_w, img_h) = (canvas.width() as i32, canvas.height() as i32);
    let label_w = text_w + LABEL_PAD * 2;
    let label_h = text_h + LABEL_PAD * 2;
    let label_x = x.clamp(0, (img_w - label_w).max(0));
    let label_y = (y - label_h).clamp(0, (img_h - label_h).max(0));

    draw_filled_rect_mut(
        canvas,
        clamp_rect(label_x, label_y, label_w, label_h, img_w, img_h),
        color,
    );

    let mut pen_x = label_x + LABEL_PAD;
    for digit in digits {
        stamp_digit(canvas, digit, pen_x, label_y + LABEL_PAD);
        pen_x += DIGIT_W * DIGIT_SCALE + DIGIT_SCALE;
    }
}

/// 3x5 bitmap glyphs for 0-9; each row is 3 bits, MSB left.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b010, 0b010, 0b010], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

fn stamp_digit(canvas: &mut RgbaImage, digit: u32, x: i32, y: i32) {
    let glyph = DIGIT_GLYPHS[digit as usize];
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..DIGIT_W {
            if bits & (1 << (DIGIT_W - 1 - col)) == 0 {
                continue;
            }
            for sy in 0..DIGIT_SCALE {
                for sx in 0..DIGIT_SCALE {
                    let px = x + col * DIGIT_SCALE + sx;
                    let py = y + row as i32 * DIGIT_SCALE + sy;
                    if px >= 0 && py >= 0 && (px as u32) < canvas.width() && (py as u32) < canvas.height()
                    {
                        canvas.put_pixel(px as u32, py as u32, LABEL_TEXT);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_types::{BoundingBox, ElementAttributes};

    fn descriptor(id: u32, bbox: BoundingBox) -> ElementDescriptor {
        ElementDescriptor {
            annotation_id: id,
            role: "button".to_string(),
            name: "b".to_string(),
            bounding_box: bbox,
            tag_name: "button".to_string(),
            attributes: ElementAttributes::default(),
            selector_candidates: Vec::new(),
        }
    }

    fn blank_png(w: u32, h: u32) -> Vec<u8> {
        let canvas = RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]));
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(canvas)
            .write_to(&mut Cursor::new(&mut out), image::ImageOutputFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn annotation_colors_differ_for_neighbors() {
        let a = annotation_color(0);
        let b = annotation_color(1);
        assert_ne!(a, b);
    }

    #[test]
    fn annotate_preserves_dimensions() {
        let png = blank_png(200, 100);
        let out = annotate_screenshot(
            &png,
            &[descriptor(0, BoundingBox::new(10, 20, 60, 30))],
        )
        .unwrap();

        let img = image::load_from_memory(&out).unwrap();
        assert_eq!((img.width(), img.height()), (200, 100));
        assert_ne!(out, png);
    }

    #[test]
    fn offscreen_and_degenerate_boxes_are_skipped() {
        let png = blank_png(50, 50);
        let out = annotate_screenshot(
            &png,
            &[
                descriptor(0, BoundingBox::new(500, 500, 10, 10)),
                descriptor(1, BoundingBox::new(5, 5, 0, 0)),
            ],
        )
        .unwrap();
        // Nothing drawn, but the call still succeeds.
        assert!(!out.is_empty());
    }

    #[test]
    fn invalid_png_is_an_image_error() {
        let err = annotate_screenshot(b"not a png", &[]).unwrap_err();
        assert!(matches!(err, PerceiverError::Image(_)));
    }
}
