//! Price-chart rendering onto a pixel surface.
//!
//! The primary style is a filled area chart: each column is a bar from the
//! chart floor up to the scaled price, colored by whether that price sits
//! at or above the inflection value (prior close). The top pixels of each
//! bar are drawn in a brighter crest color so the price line stays
//! readable on small panels. A connected-line variant is available for
//! wider displays.

use crate::models::PriceSeries;
use crate::surface::{PixelSurface, Rgb};

/// Rectangular drawing area, in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    #[must_use]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Colors used by the chart renderer.
#[derive(Debug, Clone, Copy)]
pub struct ChartPalette {
    pub gain_fill: Rgb,
    pub gain_crest: Rgb,
    pub loss_fill: Rgb,
    pub loss_crest: Rgb,
    /// Used for the degenerate flat line and the placeholder wave.
    pub flat: Rgb,
}

impl Default for ChartPalette {
    fn default() -> Self {
        Self {
            gain_fill: Rgb::GAIN_DIM,
            gain_crest: Rgb::GAIN,
            loss_fill: Rgb::LOSS_DIM,
            loss_crest: Rgb::LOSS,
            flat: Rgb::GAIN,
        }
    }
}

/// Height of the crest band at the top of each filled column, in pixels.
const CREST_PIXELS: u32 = 2;

/// Writes a pixel clipped against both the region and the surface.
fn put(surface: &mut impl PixelSurface, region: Region, x: u32, y: u32, color: Rgb) {
    if region.contains(x, y) && x < surface.width() && y < surface.height() {
        surface.set_pixel(x, y, color);
    }
}

/// Renders a filled area chart for `series` into `region`.
///
/// With fewer than two samples the placeholder wave is drawn instead.
/// When every sample equals the range minimum (a flat series) a single
/// horizontal line is drawn at mid-height.
pub fn render_area(
    surface: &mut impl PixelSurface,
    region: Region,
    series: &PriceSeries,
    inflection: f64,
    palette: &ChartPalette,
) {
    if region.width == 0 || region.height == 0 {
        return;
    }
    if series.len() < 2 {
        render_placeholder(surface, region, palette);
        return;
    }

    // Newest samples, one per column, left aligned.
    let count = (series.len()).min(region.width as usize);
    let closes = &series.closes()[series.len() - count..];

    let (mut min, mut max) = match series_extent(closes) {
        Some(extent) => extent,
        None => {
            render_placeholder(surface, region, palette);
            return;
        }
    };
    // Fold the inflection value into the scale so the baseline is visible
    // even when all samples sit on one side of it.
    if inflection.is_finite() {
        min = min.min(inflection);
        max = max.max(inflection);
    }
    let range = max - min;

    if range == 0.0 {
        let y = region.y + region.height / 2;
        for dx in 0..region.width {
            put(surface, region, region.x + dx, y, palette.flat);
        }
        return;
    }

    let bottom = region.y + region.height - 1;
    for (col, &price) in closes.iter().enumerate() {
        let h = (((price - min) / range) * f64::from(region.height - 1)).round() as u32;
        let x = region.x + col as u32;
        let (fill, crest) = if price >= inflection {
            (palette.gain_fill, palette.gain_crest)
        } else {
            (palette.loss_fill, palette.loss_crest)
        };
        let crest_band = h.min(CREST_PIXELS);
        for dy in 0..=h {
            let color = if h - dy < crest_band || dy == h {
                crest
            } else {
                fill
            };
            put(surface, region, x, bottom - dy, color);
        }
    }
}

/// Renders `series` as a connected polyline, one point per column.
///
/// Suited to wider panels where single-pixel columns read poorly. Falls
/// back to the placeholder wave below two samples.
pub fn render_line(
    surface: &mut impl PixelSurface,
    region: Region,
    series: &PriceSeries,
    color: Rgb,
) {
    if region.width == 0 || region.height == 0 {
        return;
    }
    if series.len() < 2 {
        render_placeholder(surface, region, &ChartPalette::default());
        return;
    }

    let count = (series.len()).min(region.width as usize);
    let closes = &series.closes()[series.len() - count..];
    let Some((min, max)) = series_extent(closes) else {
        return;
    };
    let range = max - min;
    let bottom = region.y + region.height - 1;

    let scale = |price: f64| -> u32 {
        if range == 0.0 {
            region.height / 2
        } else {
            (((price - min) / range) * f64::from(region.height - 1)).round() as u32
        }
    };

    let mut prev: Option<(u32, u32)> = None;
    for (col, &price) in closes.iter().enumerate() {
        let x = region.x + col as u32;
        let y = bottom - scale(price);
        match prev {
            Some((px, py)) => draw_segment(surface, region, px, py, x, y, color),
            None => put(surface, region, x, y, color),
        }
        prev = Some((x, y));
    }
}

/// Deterministic sine wave shown while no real data is available.
pub fn render_placeholder(surface: &mut impl PixelSurface, region: Region, palette: &ChartPalette) {
    if region.width == 0 || region.height == 0 {
        return;
    }
    let bottom = region.y + region.height - 1;
    for dx in 0..region.width {
        let phase = f64::from(dx) * 0.35;
        let level = phase.sin() * 0.5 + 0.5;
        let h = (level * f64::from(region.height - 1)).round() as u32;
        let x = region.x + dx;
        for dy in 0..=h {
            let color = if dy == h { palette.flat } else { palette.gain_fill };
            put(surface, region, x, bottom - dy, color);
        }
    }
}

fn series_extent(closes: &[f64]) -> Option<(f64, f64)> {
    let first = *closes.first()?;
    let mut min = first;
    let mut max = first;
    for &close in closes {
        min = min.min(close);
        max = max.max(close);
    }
    Some((min, max))
}

/// Bresenham line clipped to the region.
fn draw_segment(
    surface: &mut impl PixelSurface,
    region: Region,
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
    color: Rgb,
) {
    let (mut x, mut y) = (i64::from(x0), i64::from(y0));
    let (tx, ty) = (i64::from(x1), i64::from(y1));
    let dx = (tx - x).abs();
    let dy = -(ty - y).abs();
    let sx = if x < tx { 1 } else { -1 };
    let sy = if y < ty { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        if x >= 0 && y >= 0 {
            put(surface, region, x as u32, y as u32, color);
        }
        if x == tx && y == ty {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::MemorySurface;

    fn full_region(surface: &MemorySurface) -> Region {
        Region {
            x: 0,
            y: 0,
            width: surface.width(),
            height: surface.height(),
        }
    }

    #[test]
    fn columns_scale_to_region_height() {
        let mut surface = MemorySurface::new(4, 10);
        let region = full_region(&surface);
        let series = PriceSeries::from_closes("TEST", [10.0, 20.0, 10.0, 20.0], 64);
        render_area(&mut surface, region, &series, 10.0, &ChartPalette::default());

        // Minimum price lights one pixel, maximum the full column.
        assert_eq!(surface.lit_in_column(0), 1);
        assert_eq!(surface.lit_in_column(1), 10);
        assert_eq!(surface.lit_in_column(2), 1);
        assert_eq!(surface.lit_in_column(3), 10);
    }

    #[test]
    fn coloring_follows_inflection() {
        let mut surface = MemorySurface::new(2, 8);
        let region = full_region(&surface);
        let series = PriceSeries::from_closes("TEST", [5.0, 15.0], 64);
        render_area(&mut surface, region, &series, 10.0, &ChartPalette::default());

        // Column 0 is below the inflection, column 1 at or above it.
        assert_eq!(surface.pixel(0, 7), Some(Rgb::LOSS));
        assert_eq!(surface.pixel(1, 0), Some(Rgb::GAIN));
    }

    #[test]
    fn flat_series_draws_mid_line() {
        let mut surface = MemorySurface::new(6, 10);
        let region = full_region(&surface);
        let series = PriceSeries::from_closes("TEST", [42.0, 42.0, 42.0], 64);
        render_area(&mut surface, region, &series, 42.0, &ChartPalette::default());

        for x in 0..6 {
            assert_eq!(surface.lit_in_column(x), 1);
            assert_eq!(surface.pixel(x, 5), Some(Rgb::GAIN));
        }
    }

    #[test]
    fn writes_stay_inside_region() {
        let mut surface = MemorySurface::new(16, 16);
        let region = Region {
            x: 4,
            y: 4,
            width: 8,
            height: 8,
        };
        let series = PriceSeries::from_closes("TEST", [1.0, 100.0, 50.0, 100.0, 1.0], 64);
        render_area(&mut surface, region, &series, 50.0, &ChartPalette::default());

        for x in 0..16 {
            for y in 0..16 {
                if !region.contains(x, y) {
                    assert_eq!(surface.pixel(x, y), Some(Rgb::BLACK), "leak at {x},{y}");
                }
            }
        }
    }

    #[test]
    fn region_larger_than_surface_does_not_panic() {
        let mut surface = MemorySurface::new(4, 4);
        let region = Region {
            x: 0,
            y: 0,
            width: 100,
            height: 100,
        };
        let series = PriceSeries::from_closes("TEST", [1.0, 2.0, 3.0], 64);
        render_area(&mut surface, region, &series, 2.0, &ChartPalette::default());
        assert!(surface.lit_count() > 0);
    }

    #[test]
    fn placeholder_is_deterministic_and_non_blank() {
        let mut a = MemorySurface::new(32, 16);
        let mut b = MemorySurface::new(32, 16);
        let region = full_region(&a);
        render_placeholder(&mut a, region, &ChartPalette::default());
        render_placeholder(&mut b, region, &ChartPalette::default());

        assert!(a.lit_count() > 0);
        for x in 0..32 {
            for y in 0..16 {
                assert_eq!(a.pixel(x, y), b.pixel(x, y));
            }
        }
    }

    #[test]
    fn short_series_falls_back_to_placeholder() {
        let mut with_one = MemorySurface::new(32, 16);
        let mut empty = MemorySurface::new(32, 16);
        let region = full_region(&with_one);
        render_area(
            &mut with_one,
            region,
            &PriceSeries::from_closes("TEST", [42.0], 64),
            42.0,
            &ChartPalette::default(),
        );
        render_placeholder(&mut empty, region, &ChartPalette::default());
        for x in 0..32 {
            assert_eq!(with_one.lit_in_column(x), empty.lit_in_column(x));
        }
    }

    #[test]
    fn line_variant_connects_points() {
        let mut surface = MemorySurface::new(8, 8);
        let region = full_region(&surface);
        let series = PriceSeries::from_closes("TEST", [0.0, 7.0], 64);
        render_line(&mut surface, region, &series, Rgb::WHITE);

        // Endpoints plus intermediate steps from Bresenham.
        assert_eq!(surface.pixel(0, 7), Some(Rgb::WHITE));
        assert_eq!(surface.pixel(1, 0), Some(Rgb::WHITE));
        assert!(surface.lit_count() >= 2);
    }
}
