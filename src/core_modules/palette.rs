// THEORY:
// The `Palette` turns an image with few distinct colors into a color table plus
// one byte per pixel. Palette mode lets the traversal measure cost as distance
// between table positions instead of between colors.
//
// Key architectural principles:
// 1.  **Sorted Table**: Colors are stored in ascending packed order, so similar
//     colors tend to sit at nearby table positions and the wrapped index delta
//     between neighbors stays small.
// 2.  **Refuse, Don't Quantize**: An image with more colors than allowed is not
//     reduced. `from_pixels` returns `None` and the caller falls back to RGB mode.

use crate::core_modules::pixel::pixel::*;
use std::collections::HashMap;

/// A color table and the per-pixel indices into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// Distinct colors in ascending packed order.
    pub colors: Vec<PackedPixel>,
    /// One table position per pixel, row-major.
    pub indices: Vec<u8>,
}

impl Palette {
    /// Builds a palette from packed pixels.
    ///
    /// Without alpha, every color is forced opaque first so that stray alpha
    /// bytes do not split one color in two. Returns `None` when more than
    /// `max_colors` distinct colors are present (`max_colors` is capped at 256).
    pub fn from_pixels(pixels: &[PackedPixel], has_alpha: bool, max_colors: usize) -> Option<Self> {
        let max_colors = max_colors.min(256);
        let normalize = |p: PackedPixel| if has_alpha { p } else { p | (0xFF << ALPHA_SHIFT) };

        let mut colors: Vec<PackedPixel> = pixels.iter().map(|&p| normalize(p)).collect();
        colors.sort_unstable();
        colors.dedup();
        if colors.len() > max_colors || colors.is_empty() {
            return None;
        }

        let position: HashMap<PackedPixel, u8> = colors
            .iter()
            .enumerate()
            .map(|(index, &color)| (color, index as u8))
            .collect();
        let indices = pixels
            .iter()
            .map(|&p| position.get(&normalize(p)).copied())
            .collect::<Option<Vec<u8>>>()?;

        Some(Self { colors, indices })
    }

    /// `(pixel, count)` pairs, sorted by pixel value.
    pub fn histogram(pixels: &[PackedPixel]) -> Vec<(PackedPixel, usize)> {
        let mut counts: HashMap<PackedPixel, usize> = HashMap::new();
        for &p in pixels {
            *counts.entry(p).or_insert(0) += 1;
        }
        let mut histogram: Vec<_> = counts.into_iter().collect();
        histogram.sort_unstable_by_key(|&(pixel, _)| pixel);
        histogram
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Color content of an image, gathered before a mode is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorSurvey {
    /// Distinct packed values, alpha included.
    pub unique_colors: usize,
    /// Every pixel has R == G == B.
    pub grayscale: bool,
}

impl ColorSurvey {
    pub fn of(pixels: &[PackedPixel]) -> Self {
        let histogram = Palette::histogram(pixels);
        Self {
            unique_colors: histogram.len(),
            grayscale: histogram.iter().all(|&(color, _)| Pixel::from(color).is_gray()),
        }
    }
}
