//! PNG rendering of grids with the standard ARC palette

use super::dataset::ArcTask;
use super::grid::Grid;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;
use thiserror::Error;

/// Pixels per cell edge
pub const CELL_SIZE: u32 = 30;

const BORDER: Rgb<u8> = Rgb([0x55, 0x55, 0x55]);

/// black, blue, red, green, yellow, grey, magenta, orange, azure, maroon
pub const PALETTE: [[u8; 3]; 10] = [
    [0x00, 0x00, 0x00],
    [0x00, 0x74, 0xD9],
    [0xFF, 0x41, 0x36],
    [0x2E, 0xCC, 0x40],
    [0xFF, 0xDC, 0x00],
    [0xAA, 0xAA, 0xAA],
    [0xF0, 0x12, 0xBE],
    [0xFF, 0x85, 0x1B],
    [0x7F, 0xDB, 0xFF],
    [0x87, 0x0C, 0x25],
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("task has no test input")]
    NoTestInput,
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub fn colour(cell: u8) -> Rgb<u8> {
    Rgb(PALETTE[usize::from(cell.min(9))])
}

/// Rasterise a grid; the last pixel row and column of each cell is a border
pub fn render_image(grid: &Grid) -> RgbImage {
    let (height, width) = grid.dimensions();
    let mut img = RgbImage::new(width as u32 * CELL_SIZE, height as u32 * CELL_SIZE);
    for (x, y, px) in img.enumerate_pixels_mut() {
        let on_border = x % CELL_SIZE == CELL_SIZE - 1 || y % CELL_SIZE == CELL_SIZE - 1;
        *px = if on_border {
            BORDER
        } else {
            let cell = grid
                .get((y / CELL_SIZE) as usize, (x / CELL_SIZE) as usize)
                .unwrap_or(0);
            colour(cell)
        };
    }
    img
}

pub fn render_png(grid: &Grid) -> Result<Vec<u8>, RenderError> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(render_image(grid))
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
    Ok(bytes)
}

/// PNG of the first test input
pub fn render_task(task: &ArcTask) -> Result<Vec<u8>, RenderError> {
    let example = task.first_test().ok_or(RenderError::NoTestInput)?;
    render_png(&example.input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_dimensions_and_colours() {
        let grid = Grid::new(vec![vec![0, 1, 2], vec![3, 4, 9]]).unwrap();
        let bytes = render_png(&grid).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (3 * CELL_SIZE, 2 * CELL_SIZE));
        assert_eq!(*decoded.get_pixel(CELL_SIZE + 2, 2), colour(1));
        assert_eq!(*decoded.get_pixel(2 * CELL_SIZE + 2, CELL_SIZE + 2), colour(9));
        assert_eq!(*decoded.get_pixel(CELL_SIZE - 1, 0), BORDER);
    }

    #[test]
    fn test_render_task_needs_test_input() {
        let task = ArcTask {
            train: vec![],
            test: vec![],
        };
        assert!(matches!(render_task(&task), Err(RenderError::NoTestInput)));
    }
}
