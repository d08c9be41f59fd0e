use std::io::Cursor;

use chrono_tz::Tz;
use common::models::{Direction, Signal};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tracing::debug;

use crate::artifact::{Artifact, RenderError, SignalRenderer};
use crate::font::{GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH, glyph};

pub const WIDTH: u32 = 600;
pub const HEIGHT: u32 = 300;

pub const UP_BACKGROUND: Rgb<u8> = Rgb([0x28, 0xa7, 0x45]);
pub const DOWN_BACKGROUND: Rgb<u8> = Rgb([0xdc, 0x35, 0x45]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);

const FOOTER: &str = "TRADINGVIEW & POCKET OPTION";
const MARGIN_X: u32 = 20;

/// Renders a signal as a 600x300 PNG card. Identical signals produce
/// identical bytes.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    tz: Tz,
}

impl CardRenderer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn background(direction: Direction) -> Rgb<u8> {
        match direction {
            Direction::Up => UP_BACKGROUND,
            Direction::Down => DOWN_BACKGROUND,
        }
    }

    fn lines(&self, signal: &Signal) -> [(u32, u32, String); 5] {
        let time = signal.generated_at.with_timezone(&self.tz).format("%H:%M:%S");
        [
            (20, 5, format!("{} - {}", signal.pair, signal.timeframe)),
            (100, 4, format!("SIGNAL: {}", signal.direction.label())),
            (150, 4, format!("CONFIDENCE: {}%", signal.confidence)),
            (200, 4, format!("TIME: {}", time)),
            (250, 3, FOOTER.to_string()),
        ]
    }
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, scale: u32, text: &str) {
    let mut cursor = x;
    for c in text.chars() {
        if let Some(rows) = glyph(c) {
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if bits & (1u8 << (GLYPH_WIDTH - 1 - col)) == 0 {
                        continue;
                    }
                    fill_block(img, cursor + col * scale, y + row as u32 * scale, scale);
                }
            }
        }
        cursor += GLYPH_ADVANCE * scale;
    }
}

fn fill_block(img: &mut RgbImage, x: u32, y: u32, size: u32) {
    for py in y..(y + size).min(img.height()) {
        for px in x..(x + size).min(img.width()) {
            img.put_pixel(px, py, TEXT_COLOR);
        }
    }
}

impl SignalRenderer for CardRenderer {
    fn render(&self, signal: &Signal) -> Result<Artifact, RenderError> {
        let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Self::background(signal.direction));

        for (y, scale, text) in self.lines(signal) {
            debug_assert!(y + GLYPH_HEIGHT * scale <= HEIGHT);
            draw_text(&mut img, MARGIN_X, y, scale, &text);
        }

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

        let file_name = format!("{}_{}.png", signal.pair, signal.timeframe);
        debug!("Rendered {} ({} bytes)", file_name, bytes.len());

        Ok(Artifact { file_name, bytes })
    }
}
