//! Abstract pixel output surface.
//!
//! The renderer and consumer loop draw through the [`PixelSurface`] trait so
//! the same code drives real matrix hardware, the in-memory surface used by
//! tests, or the crossterm half-block preview used by the binary.

use std::io::{self, Write};

use crossterm::{QueueableCommand, cursor, style, terminal};
use tracing::warn;

/// A 24-bit color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Bright green, used for positive change text and chart crests.
    pub const GAIN: Rgb = Rgb::new(0, 255, 0);
    /// Dim green, used for chart fill above the inflection value.
    pub const GAIN_DIM: Rgb = Rgb::new(0, 180, 0);
    /// Bright red, used for negative change text and chart crests.
    pub const LOSS: Rgb = Rgb::new(255, 0, 0);
    /// Dim red, used for chart fill below the inflection value.
    pub const LOSS_DIM: Rgb = Rgb::new(180, 0, 0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Returns `true` for anything other than an unlit pixel.
    #[must_use]
    pub fn is_lit(&self) -> bool {
        *self != Rgb::BLACK
    }
}

/// A writable pixel grid.
///
/// Out-of-bounds writes must be ignored, never panic: callers are allowed
/// to clip against the surface by simply writing.
pub trait PixelSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb);
    /// Resets every pixel to black.
    fn clear(&mut self);
    /// Makes the current buffer visible. No-op for surfaces without
    /// double buffering.
    fn flush(&mut self) {}
}

/// Heap-backed surface for tests and headless use.
#[derive(Debug, Clone)]
pub struct MemorySurface {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl MemorySurface {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgb::BLACK; (width * height) as usize],
        }
    }

    /// Returns the pixel at `(x, y)`, or `None` when out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(self.pixels[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Number of lit (non-black) pixels on the whole surface.
    #[must_use]
    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|p| p.is_lit()).count()
    }

    /// Number of lit pixels in the given column.
    #[must_use]
    pub fn lit_in_column(&self, x: u32) -> usize {
        (0..self.height)
            .filter(|&y| self.pixel(x, y).is_some_and(|p| p.is_lit()))
            .count()
    }
}

impl PixelSurface for MemorySurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = color;
        }
    }

    fn clear(&mut self) {
        self.pixels.fill(Rgb::BLACK);
    }
}

/// Terminal rows reserved above the chart preview for text output.
pub const TEXT_ROWS: u16 = 2;

/// Terminal preview surface.
///
/// Renders two pixel rows per terminal row using the upper-half-block
/// glyph, below the [`TEXT_ROWS`] reserved for [`TerminalText`].
pub struct TerminalSurface {
    buffer: MemorySurface,
}

impl TerminalSurface {
    pub fn new(width: u32, height: u32) -> io::Result<Self> {
        let mut out = io::stdout();
        out.queue(terminal::Clear(terminal::ClearType::All))?
            .queue(cursor::Hide)?;
        out.flush()?;
        Ok(Self {
            buffer: MemorySurface::new(width, height),
        })
    }

    fn present(&self) -> io::Result<()> {
        let mut out = io::stdout();
        for row in 0..self.buffer.height().div_ceil(2) {
            out.queue(cursor::MoveTo(0, TEXT_ROWS + row as u16))?;
            for x in 0..self.buffer.width() {
                let top = self.buffer.pixel(x, row * 2).unwrap_or_default();
                let bottom = self.buffer.pixel(x, row * 2 + 1).unwrap_or_default();
                out.queue(style::SetForegroundColor(to_term(top)))?
                    .queue(style::SetBackgroundColor(to_term(bottom)))?
                    .queue(style::Print('▀'))?;
            }
            out.queue(style::ResetColor)?;
        }
        out.flush()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = out.queue(style::ResetColor).and_then(|o| o.queue(cursor::Show));
        let _ = out.flush();
    }
}

impl PixelSurface for TerminalSurface {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        self.buffer.set_pixel(x, y, color);
    }

    fn clear(&mut self) {
        self.buffer.clear();
        // Also wipe the reserved text rows so stale characters from a
        // longer previous string do not linger.
        let mut out = io::stdout();
        let _ = (0..TEXT_ROWS).try_for_each(|row| {
            out.queue(cursor::MoveTo(0, row))
                .and_then(|o| o.queue(terminal::Clear(terminal::ClearType::CurrentLine)))
                .map(|_| ())
        });
    }

    fn flush(&mut self) {
        if let Err(e) = self.present() {
            warn!(error = %e, "terminal present failed");
        }
    }
}

/// Text sink printing into the [`TEXT_ROWS`] above the chart preview.
///
/// Pixel-space y coordinates map onto the two reserved terminal rows,
/// mirroring the two text lines a real matrix layout uses.
pub struct TerminalText {
    width: u16,
}

impl TerminalText {
    #[must_use]
    pub fn new(width: u32) -> Self {
        Self { width: width as u16 }
    }

    fn write(&self, x: u32, y: u32, align: crate::consumer::Align, color: Rgb, text: &str) -> io::Result<()> {
        let row = if y <= 9 { 0 } else { 1 };
        let col = match align {
            crate::consumer::Align::Left => x as u16,
            crate::consumer::Align::Right => {
                (x as u16).saturating_sub(text.chars().count() as u16)
            }
        };
        let mut out = io::stdout();
        out.queue(cursor::MoveTo(col.min(self.width), row))?
            .queue(style::SetForegroundColor(to_term(color)))?
            .queue(style::Print(text))?
            .queue(style::ResetColor)?;
        out.flush()
    }
}

impl crate::consumer::TextSink for TerminalText {
    fn draw_text(&mut self, x: u32, y: u32, align: crate::consumer::Align, color: Rgb, text: &str) {
        if let Err(e) = self.write(x, y, align, color, text) {
            warn!(error = %e, "terminal text write failed");
        }
    }
}

fn to_term(color: Rgb) -> style::Color {
    style::Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_surface_roundtrip() {
        let mut surface = MemorySurface::new(8, 4);
        surface.set_pixel(3, 2, Rgb::GAIN);
        assert_eq!(surface.pixel(3, 2), Some(Rgb::GAIN));
        assert_eq!(surface.lit_count(), 1);
        assert_eq!(surface.lit_in_column(3), 1);
    }

    #[test]
    fn memory_surface_ignores_out_of_bounds() {
        let mut surface = MemorySurface::new(8, 4);
        surface.set_pixel(8, 0, Rgb::WHITE);
        surface.set_pixel(0, 4, Rgb::WHITE);
        assert_eq!(surface.lit_count(), 0);
        assert_eq!(surface.pixel(8, 0), None);
    }

    #[test]
    fn clear_resets_pixels() {
        let mut surface = MemorySurface::new(4, 4);
        surface.set_pixel(1, 1, Rgb::LOSS);
        surface.clear();
        assert_eq!(surface.lit_count(), 0);
    }

    #[test]
    fn black_is_not_lit() {
        assert!(!Rgb::BLACK.is_lit());
        assert!(Rgb::GAIN_DIM.is_lit());
    }
}
