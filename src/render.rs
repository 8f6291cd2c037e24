//! Draws the match table as a PNG: black cells, grey grid, one text color
//! per column, bold white header.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use font8x8::{BASIC_FONTS, LATIN_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use log::info;

use crate::match_record::{COLUMNS, MatchTable};

const GLYPH: u32 = 8;
const SCALE: u32 = 3;
const CHAR_WIDTH: u32 = GLYPH * SCALE;
const CELL_PAD_X: u32 = 12;
const ROW_HEIGHT: u32 = CHAR_WIDTH + 28;
const MARGIN: u32 = 20;
// Widest text per column, in characters.
const COLUMN_CHARS: [u32; 6] = [18, 26, 26, 8, 8, 8];
// 300 DPI expressed in the PNG pHYs unit.
const PIXELS_PER_METER: u32 = 11_811;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([0x55, 0x55, 0x55]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const CYAN: Rgb<u8> = Rgb([0, 255, 255]);
const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const GREEN: Rgb<u8> = Rgb([0, 128, 0]);

/// Text color for the body cells of each column, in `COLUMNS` order.
pub const COLUMN_COLORS: [Rgb<u8>; 6] = [CYAN, WHITE, WHITE, YELLOW, RED, GREEN];

fn column_width(column: usize) -> u32 {
    COLUMN_CHARS[column] * CHAR_WIDTH + 2 * CELL_PAD_X
}

/// Left edge and width of every column.
fn column_bounds() -> [(u32, u32); 6] {
    let mut x = MARGIN;
    std::array::from_fn(|column| {
        let bounds = (x, column_width(column));
        x += bounds.1;
        bounds
    })
}

pub fn image_width() -> u32 {
    2 * MARGIN + (0..COLUMNS.len()).map(column_width).sum::<u32>()
}

pub fn image_height(rows: usize) -> u32 {
    2 * MARGIN + (rows as u32 + 1) * ROW_HEIGHT
}

/// Number of match rows an image of this height holds.
pub fn rows_in_image(height: u32) -> usize {
    (height.saturating_sub(2 * MARGIN) / ROW_HEIGHT).saturating_sub(1) as usize
}

fn glyph(c: char) -> [u8; 8] {
    BASIC_FONTS
        .get(c)
        .or_else(|| LATIN_FONTS.get(c))
        .or_else(|| BASIC_FONTS.get('?'))
        .unwrap_or([0; 8])
}

fn fit(text: &str, max_chars: u32) -> Vec<char> {
    let chars: Vec<char> = text.chars().collect();
    let max = max_chars as usize;
    if chars.len() <= max {
        return chars;
    }
    let mut cut: Vec<char> = chars[..max - 2].to_vec();
    cut.extend(['.', '.']);
    cut
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

fn draw_char(img: &mut RgbImage, x: u32, y: u32, c: char, color: Rgb<u8>) {
    for (row, bits) in glyph(c).iter().enumerate() {
        for col in 0..GLYPH {
            if *bits & (1u8 << col) != 0 {
                let px = x + col * SCALE;
                let py = y + row as u32 * SCALE;
                fill_rect(img, px, py, SCALE, SCALE, color);
            }
        }
    }
}

fn draw_centered(
    img: &mut RgbImage,
    (cell_x, cell_w): (u32, u32),
    row_y: u32,
    text: &str,
    max_chars: u32,
    color: Rgb<u8>,
    bold: bool,
) {
    let chars = fit(text, max_chars);
    let text_w = chars.len() as u32 * CHAR_WIDTH + u32::from(bold);
    let x = cell_x + cell_w.saturating_sub(text_w) / 2;
    let y = row_y + (ROW_HEIGHT - CHAR_WIDTH) / 2;
    for (i, c) in chars.into_iter().enumerate() {
        let cx = x + i as u32 * CHAR_WIDTH;
        draw_char(img, cx, y, c, color);
        if bold {
            draw_char(img, cx + 1, y, c, color);
        }
    }
}

fn draw_grid(img: &mut RgbImage, rows: usize) {
    let bounds = column_bounds();
    let table_w = image_width() - 2 * MARGIN;
    let table_h = (rows as u32 + 1) * ROW_HEIGHT;
    for row in 0..=rows as u32 + 1 {
        let y = (MARGIN + row * ROW_HEIGHT).min(MARGIN + table_h - 1);
        fill_rect(img, MARGIN, y, table_w, 1, GRID);
    }
    for (x, _) in bounds {
        fill_rect(img, x, MARGIN, 1, table_h, GRID);
    }
    fill_rect(img, MARGIN + table_w - 1, MARGIN, 1, table_h, GRID);
}

/// Draws the table in memory. A table without rows still gets its header.
pub fn render_table(table: &MatchTable) -> RgbImage {
    let mut img = RgbImage::from_pixel(image_width(), image_height(table.len()), BLACK);
    let bounds = column_bounds();

    for (column, label) in COLUMNS.iter().enumerate() {
        draw_centered(
            &mut img,
            bounds[column],
            MARGIN,
            label,
            COLUMN_CHARS[column],
            WHITE,
            true,
        );
    }
    for (i, record) in table.rows.iter().enumerate() {
        let row_y = MARGIN + (i as u32 + 1) * ROW_HEIGHT;
        for (column, cell) in record.cells().iter().enumerate() {
            draw_centered(
                &mut img,
                bounds[column],
                row_y,
                cell,
                COLUMN_CHARS[column],
                COLUMN_COLORS[column],
                false,
            );
        }
    }
    draw_grid(&mut img, table.len());
    img
}

/// Writes `img` as an 8-bit RGB PNG tagged with 300 DPI.
pub fn save_png(img: &RgbImage, path: &Path) -> anyhow::Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), img.width(), img.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: PIXELS_PER_METER,
        yppu: PIXELS_PER_METER,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(img.as_raw())?;
    writer.finish()?;
    Ok(())
}

pub fn render_report(table: &MatchTable, path: &Path) -> anyhow::Result<()> {
    let img = render_table(table);
    save_png(&img, path)?;
    info!(
        "Wrote {}x{} report with {} rows to {}",
        img.width(),
        img.height(),
        table.len(),
        path.display()
    );
    Ok(())
}
