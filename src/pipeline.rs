// THEORY:
// The `pipeline` module is the top-level API of the crate. It wraps the
// traversal engine in plain functions that take buffers and return owned
// results, and it adds the reporting steps a driver needs around a run.
//
// Key architectural principles:
// 1.  **Validate, Then Run**: Every entry point checks its inputs through
//     `PixelSource::validate` before an engine exists. A returned `IterError`
//     means nothing was computed.
// 2.  **Mode Selection Lives Here**: The engine does not know where a palette
//     comes from. `process_image` decides between RGB and palette mode, builds
//     the palette, and hands the engine a `PixelSource`.
// 3.  **Decode to Verify**: `reconstruct` replays a run the way a decoder would,
//     predicting each pixel from what it has decoded so far. A report is lossless
//     only when that replay reproduces the input colors.
// 4.  **A Baseline to Beat**: Every report also carries the scanline
//     gradient-clamp errors, so the adaptive order can be judged against the
//     simplest competitive predictor.

use crate::core_modules::error_stats::{ErrorSummary, without_seeds};
use crate::core_modules::neighbor_predictor::{self, Neighborhood};
use crate::core_modules::palette::{ColorSurvey, Palette};
use crate::core_modules::pixel::pixel::*;
use crate::core_modules::pixel_delta::pixel_delta::{
    PackedDelta, abs_of_each_component, component_sum, gradclamp_prediction_errors,
};
use crate::core_modules::traversal::{MAX_PALETTE_COLORS, PixelSource, TraversalEngine, TraversalStats};
use crate::error::{IterError, Result};
use log::info;

/// Marks pixels a partial run has not revealed yet.
pub const UNREVEALED_MARKER: PackedPixel = 0xFFFF_0000;

/// How `process_image` picks the traversal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Palette mode when the image fits in a palette, RGB otherwise.
    #[default]
    Auto,
    Rgb,
    /// Palette mode, failing with `TooManyColors` if the image does not fit.
    Palette,
}

/// Configuration for a run.
#[derive(Debug, Clone)]
pub struct IterConfig {
    /// Produce the prediction error buffer alongside the order.
    pub emit_deltas: bool,
    pub mode: ColorMode,
    /// Largest palette `process_image` will build, at most 256.
    pub max_palette_colors: usize,
}

impl Default for IterConfig {
    fn default() -> Self {
        Self {
            emit_deltas: true,
            mode: ColorMode::Auto,
            max_palette_colors: MAX_PALETTE_COLORS,
        }
    }
}

/// What one traversal produced.
#[derive(Debug, Clone)]
pub struct IterOutput {
    /// Row-major offsets in reveal order, a permutation of `0..width*height`.
    pub order: Vec<u32>,
    /// Prediction errors by offset when `emit_deltas` was set. Seeds hold raw pixels.
    pub deltas: Option<Vec<PackedDelta>>,
    pub stats: TraversalStats,
}

/// A full run over one image, with everything a driver reports.
#[derive(Debug, Clone)]
pub struct IterReport {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
    pub survey: ColorSurvey,
    /// The palette when the run used palette mode.
    pub palette: Option<Palette>,
    pub order: Vec<u32>,
    pub deltas: Vec<PackedDelta>,
    /// Gradient-clamp errors for the same image in scanline order.
    pub baseline_deltas: Vec<PackedDelta>,
    /// Seed block excluded, see `ErrorSummary::from_prediction_errors`.
    pub adaptive_error: ErrorSummary,
    pub baseline_error: ErrorSummary,
    /// Replaying the order and deltas reproduced every color.
    pub lossless: bool,
    pub stats: TraversalStats,
}

impl IterReport {
    pub fn is_palette(&self) -> bool {
        self.palette.is_some()
    }
}

/// Runs a traversal over any pixel source.
pub fn iterate(source: PixelSource<'_>, width: u32, height: u32, config: &IterConfig) -> Result<IterOutput> {
    let mut engine = TraversalEngine::new(source, width, height, config.emit_deltas)?;
    engine.iterate();
    let output = engine.into_output();
    info!(
        "iterated {}x{} {} image: {} pixels, {} frontier pops",
        width,
        height,
        if source.is_palette() { "palette" } else { "rgb" },
        output.order.len(),
        output.stats.pops
    );
    Ok(IterOutput {
        order: output.order,
        deltas: output.deltas,
        stats: output.stats,
    })
}

pub fn iterate_rgb(pixels: &[PackedPixel], width: u32, height: u32, config: &IterConfig) -> Result<IterOutput> {
    iterate(PixelSource::Rgb(pixels), width, height, config)
}

pub fn iterate_palette(
    colors: &[PackedPixel],
    indices: &[u8],
    width: u32,
    height: u32,
    config: &IterConfig,
) -> Result<IterOutput> {
    iterate(PixelSource::Palette { colors, indices }, width, height, config)
}

/// Chooses a mode, runs the traversal, verifies it and scores it against the baseline.
pub fn process_image(
    pixels: &[PackedPixel],
    width: u32,
    height: u32,
    has_alpha: bool,
    config: &IterConfig,
) -> Result<IterReport> {
    PixelSource::Rgb(pixels).validate(width, height)?;
    let max_colors = config.max_palette_colors.min(MAX_PALETTE_COLORS);
    let survey = ColorSurvey::of(pixels);
    info!(
        "{} unique colors{}",
        survey.unique_colors,
        if survey.grayscale { ", grayscale" } else { "" }
    );

    let palette = match config.mode {
        ColorMode::Rgb => None,
        ColorMode::Auto => Palette::from_pixels(pixels, has_alpha, max_colors),
        ColorMode::Palette => Some(
            Palette::from_pixels(pixels, has_alpha, max_colors).ok_or(IterError::TooManyColors(max_colors))?,
        ),
    };
    if let Some(palette) = &palette {
        info!("palette mode with {} colors", palette.len());
    }

    let run_config = IterConfig {
        emit_deltas: true,
        ..config.clone()
    };
    let output = match &palette {
        Some(palette) => iterate_palette(&palette.colors, &palette.indices, width, height, &run_config)?,
        None => iterate_rgb(pixels, width, height, &run_config)?,
    };
    let deltas = output.deltas.unwrap_or_default();

    let reconstructed = reconstruct(&output.order, &deltas, width as usize, height as usize);
    let lossless = reconstructed
        .iter()
        .zip(pixels)
        .all(|(&decoded, &original)| decoded & RGB_MASK == original & RGB_MASK);

    let baseline_deltas = gradclamp_prediction_errors(pixels, width as usize, height as usize);
    let adaptive_error = ErrorSummary::from_prediction_errors(&deltas, width as usize);
    let baseline_error = ErrorSummary::from_prediction_errors(&baseline_deltas, width as usize);
    info!("adaptive {} | gradclamp {} | lossless {}", adaptive_error, baseline_error, lossless);

    Ok(IterReport {
        width,
        height,
        has_alpha,
        survey,
        palette,
        order: output.order,
        deltas,
        baseline_deltas,
        adaptive_error,
        baseline_error,
        lossless,
        stats: output.stats,
    })
}

/// Rebuilds the RGB content of an image from a reveal order and its deltas.
///
/// Seeds are taken raw. Every later pixel is predicted from the pixels decoded
/// before it, exactly as the engine predicted it, and the delta is added back.
/// Alpha is only carried for the seeds.
pub fn reconstruct(order: &[u32], deltas: &[PackedDelta], width: usize, height: usize) -> Vec<PackedPixel> {
    let mut decoded = vec![0u32; width * height];
    let mut known = vec![false; width * height];
    for (step, &offset) in order.iter().enumerate() {
        let offset = offset as usize;
        let Some(&delta) = deltas.get(offset) else {
            break;
        };
        decoded[offset] = if step < 4 {
            delta
        } else {
            let neighborhood = Neighborhood::gather(
                offset % width,
                offset / width,
                width,
                height,
                |x, y| known[y * width + x],
                |o| decoded[o],
            );
            component_sum(neighbor_predictor::predict(&neighborhood), delta)
        };
        known[offset] = true;
    }
    decoded
}

/// Per-lane error magnitudes as an opaque image. The seed block, which holds
/// raw pixels rather than errors, is drawn black.
pub fn abs_delta_image(deltas: &[PackedDelta], width: usize) -> Vec<PackedPixel> {
    without_seeds(deltas, width)
        .iter()
        .map(|&d| abs_of_each_component(d) | (0xFF << ALPHA_SHIFT))
        .collect()
}

/// `buffer` rearranged into reveal order: entry `i` is `buffer[order[i]]`.
pub fn order_permuted(buffer: &[PackedPixel], order: &[u32]) -> Vec<PackedPixel> {
    order.iter().map(|&offset| buffer[offset as usize]).collect()
}

/// A grayscale ramp showing when each pixel was revealed, dark first.
pub fn order_index_image(order: &[u32], width: usize, height: usize) -> Vec<PackedPixel> {
    let mut image = vec![Pixel::opaque(0, 0, 0).pack(); width * height];
    let last = order.len().saturating_sub(1).max(1);
    for (step, &offset) in order.iter().enumerate() {
        let level = (step * 255 / last) as u8;
        if let Some(slot) = image.get_mut(offset as usize) {
            *slot = Pixel::opaque(level, level, level).pack();
        }
    }
    image
}

/// Paints every pixel whose flag is not set with `UNREVEALED_MARKER`.
pub fn mark_revealed(pixels: &[PackedPixel], flags: &[bool]) -> Vec<PackedPixel> {
    pixels
        .iter()
        .zip(flags.iter().chain(std::iter::repeat(&false)))
        .map(|(&p, &revealed)| if revealed { p } else { UNREVEALED_MARKER })
        .collect()
}
