//! Image front door: decode and classify input rasters, encode snapshots.

use std::path::Path;

use image::{ImageReader, Rgb, RgbImage};

use crate::error::PolyError;
use crate::grid::BORDER_WIDTH;
use crate::raster::{Cell, RasterMap};

/// Load an image and resolve every pixel to one of the three classes.
///
/// Near-black resolves to interior, near-white to exterior, mid-gray to
/// unknown; anything else is a fatal load error. The thresholds are wide so
/// classification images from different producers can be used, but a color
/// that fits no class means the image is not a three-class classification.
///
/// The image must be square and carry a uniform exterior border of
/// [`BORDER_WIDTH`] pixels on all four sides.
pub fn load_classified(path: &Path) -> Result<RasterMap, PolyError> {
    let img = ImageReader::open(path)
        .map_err(|e| PolyError::ImageLoad(e.to_string()))?
        .decode()
        .map_err(|e| PolyError::ImageLoad(e.to_string()))?
        .into_rgb8();

    let (width, height) = img.dimensions();
    if width != height {
        return Err(PolyError::NotSquare { width, height });
    }

    let mut map = RasterMap::new(width as usize, height as usize, Cell::Unknown);
    for (x, y, pixel) in img.enumerate_pixels() {
        let cell = classify_rgb(pixel.0).ok_or(PolyError::InvalidPixel { x, y })?;
        map.set(x as i32, y as i32, cell);
    }

    if !has_border(&map) {
        return Err(PolyError::MissingBorder(BORDER_WIDTH));
    }

    Ok(map)
}

fn classify_rgb([r, g, b]: [u8; 3]) -> Option<Cell> {
    if r < 20 && g < 20 && b < 20 {
        Some(Cell::Interior)
    } else if r > 230 && g > 230 && b > 230 {
        Some(Cell::Exterior)
    } else if (50..200).contains(&r) && (50..200).contains(&g) && (50..200).contains(&b) {
        Some(Cell::Unknown)
    } else {
        None
    }
}

/// The square image must carry a uniform exterior frame; x and y roles are
/// interchangeable, so one index pair checks all four sides.
fn has_border(map: &RasterMap) -> bool {
    let len = map.width() as i32;
    for a in 0..BORDER_WIDTH {
        for b in 0..len {
            if map.get(a, b) != Cell::Exterior
                || map.get(len - 1 - a, b) != Cell::Exterior
                || map.get(b, a) != Cell::Exterior
                || map.get(b, len - 1 - a) != Cell::Exterior
            {
                return false;
            }
        }
    }
    true
}

/// Expand the class palette to RGB and encode the raster as an image file.
pub fn save_snapshot(map: &RasterMap, path: &Path) -> Result<(), PolyError> {
    let mut img = RgbImage::new(map.width() as u32, map.height() as u32);
    for y in 0..map.height() as i32 {
        for x in 0..map.width() as i32 {
            img.put_pixel(x as u32, y as u32, Rgb(map.get(x, y).rgb()));
        }
    }
    img.save(path).map_err(|e| PolyError::ImageSave(e.to_string()))
}
