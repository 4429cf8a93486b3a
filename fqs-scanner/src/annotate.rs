//! Annotated result image
//!
//! Draws each fruit's bounding box on a copy of the upload, colored by
//! quality status, with a "<class> <confidence>" label tab above each box,
//! and writes it as JPEG.

use ab_glyph::{Font, FontRef, PxScale, ScaleFont};
use fqs_common::models::{FruitResult, QualityStatus};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{debug, warn};

const BOX_THICKNESS: i32 = 3;
const LABEL_SCALE: f32 = 14.0;
const LABEL_PADDING: u32 = 2;
const LABEL_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// DejaVu Sans, see assets/DejaVuSans-LICENSE.txt
static LABEL_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

fn label_font() -> Option<FontRef<'static>> {
    match FontRef::try_from_slice(LABEL_FONT) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Label font unusable, drawing boxes only: {}", e);
            None
        }
    }
}

/// Tab size fitting `label`, padded, one line from ascent to descent
fn label_tab_size(font: &FontRef<'_>, scale: PxScale, label: &str) -> (u32, u32) {
    let (text_w, _) = text_size(scale, font, label);
    let line_h = font.as_scaled(scale).height().ceil().max(1.0) as u32;
    (text_w + 2 * LABEL_PADDING, line_h + 2 * LABEL_PADDING)
}

/// Label text for a fruit box
pub fn box_label(fruit: &FruitResult) -> String {
    format!("{} {:.2}", fruit.class_name, fruit.confidence)
}

/// File name of the annotated image for a scan
pub fn processed_file_name(scan_id: &uuid::Uuid) -> String {
    format!("{}_processed.jpg", scan_id)
}

/// Box color per quality status
pub fn quality_color(status: QualityStatus) -> Rgb<u8> {
    match status {
        QualityStatus::Fresh => Rgb([0, 200, 0]),
        QualityStatus::Ripe => Rgb([255, 215, 0]),
        QualityStatus::Unripe => Rgb([0, 200, 255]),
        QualityStatus::Overripe => Rgb([255, 140, 0]),
        QualityStatus::Rotten => Rgb([220, 0, 0]),
        QualityStatus::Unknown => Rgb([128, 128, 128]),
    }
}

/// Draw boxes in place
pub fn draw_boxes(img: &mut RgbImage, fruits: &[FruitResult]) {
    let (width, height) = (img.width() as f64, img.height() as f64);
    let font = label_font();
    let scale = PxScale::from(LABEL_SCALE);

    for fruit in fruits {
        let color = quality_color(fruit.quality_status);
        let x1 = fruit.bbox.x1.clamp(0.0, width) as i32;
        let y1 = fruit.bbox.y1.clamp(0.0, height) as i32;
        let x2 = fruit.bbox.x2.clamp(0.0, width) as i32;
        let y2 = fruit.bbox.y2.clamp(0.0, height) as i32;

        for inset in 0..BOX_THICKNESS {
            let w = x2 - x1 - 2 * inset;
            let h = y2 - y1 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(x1 + inset, y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(img, rect, color);
        }

        let Some(font) = font.as_ref() else {
            continue;
        };

        // Label tab above the box (inside it when at the top edge)
        let label = box_label(fruit);
        let (tab_w, tab_h) = label_tab_size(font, scale, &label);
        let tab_y = if y1 >= tab_h as i32 { y1 - tab_h as i32 } else { y1 };
        draw_filled_rect_mut(img, Rect::at(x1, tab_y).of_size(tab_w, tab_h), color);
        draw_text_mut(
            img,
            LABEL_COLOR,
            x1 + LABEL_PADDING as i32,
            tab_y + LABEL_PADDING as i32,
            scale,
            font,
            &label,
        );
    }
}

/// Write an annotated copy of `source` to `dest`
pub fn annotate_image(source: &Path, dest: &Path, fruits: &[FruitResult]) -> image::ImageResult<()> {
    let mut img = image::open(source)?.to_rgb8();
    draw_boxes(&mut img, fruits);
    img.save_with_format(dest, ImageFormat::Jpeg)?;
    debug!("Annotated image written to {}", dest.display());
    Ok(())
}
