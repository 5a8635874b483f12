//! Diagnostic images written next to each input.

use adaptive_iter::core_modules::palette::Palette;
use adaptive_iter::core_modules::pixel::pixel::PackedPixel;
use adaptive_iter::core_modules::utils::image_helper::image_helper;
use adaptive_iter::pipeline::{self, IterReport};
use adaptive_iter::{PixelSource, TraversalEngine};
use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Writes `<stem>_<suffix>.png` files for one input.
pub struct DumpWriter<'a> {
    out_dir: &'a Path,
    stem: String,
    width: u32,
    height: u32,
}

impl<'a> DumpWriter<'a> {
    pub fn new(out_dir: &'a Path, input: &Path, width: u32, height: u32) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self {
            out_dir,
            stem,
            width,
            height,
        }
    }

    pub fn path(&self, suffix: &str) -> PathBuf {
        self.out_dir.join(format!("{}_{}.png", self.stem, suffix))
    }

    pub fn write(&self, suffix: &str, pixels: &[PackedPixel], has_alpha: bool) -> Result<PathBuf> {
        self.write_sized(suffix, self.width, self.height, pixels, has_alpha)
    }

    fn write_sized(
        &self,
        suffix: &str,
        width: u32,
        height: u32,
        pixels: &[PackedPixel],
        has_alpha: bool,
    ) -> Result<PathBuf> {
        let path = self.path(suffix);
        image_helper::save(&path, width, height, pixels, has_alpha)
            .with_context(|| format!("writing {}", path.display()))?;
        debug!("wrote {}", path.display());
        Ok(path)
    }

    /// The error images for both predictors.
    pub fn write_summary(&self, report: &IterReport) -> Result<()> {
        let width = self.width as usize;
        self.write("iter_deltas", &report.deltas, false)?;
        self.write("iter_abs_deltas", &pipeline::abs_delta_image(&report.deltas, width), false)?;
        self.write("gradclamp_deltas", &report.baseline_deltas, false)?;
        self.write(
            "gradclamp_abs_deltas",
            &pipeline::abs_delta_image(&report.baseline_deltas, width),
            false,
        )?;
        Ok(())
    }

    /// Everything in the summary plus the reveal-order views and the color table.
    pub fn write_all(&self, report: &IterReport, pixels: &[PackedPixel]) -> Result<()> {
        self.write_summary(report)?;
        let abs = pipeline::abs_delta_image(&report.deltas, self.width as usize);
        self.write("iter_order_deltas", &pipeline::order_permuted(&report.deltas, &report.order), false)?;
        self.write("iter_order_abs_deltas", &pipeline::order_permuted(&abs, &report.order), false)?;
        self.write("iter_order_pixels", &pipeline::order_permuted(pixels, &report.order), report.has_alpha)?;
        self.write(
            "iter_order_index",
            &pipeline::order_index_image(&report.order, self.width as usize, self.height as usize),
            false,
        )?;
        if let Some(palette) = &report.palette {
            self.write_color_table(palette)?;
        }
        Ok(())
    }

    /// The palette as a one-pixel-high strip.
    pub fn write_color_table(&self, palette: &Palette) -> Result<PathBuf> {
        self.write_sized("colortable", palette.len() as u32, 1, &palette.colors, true)
    }

    /// Replays the traversal and writes the revealed pixels every `interval` steps.
    pub fn write_step_snapshots(
        &self,
        source: PixelSource<'_>,
        pixels: &[PackedPixel],
        interval: usize,
    ) -> Result<usize> {
        let mut engine = TraversalEngine::new(source, self.width, self.height, false)?;
        engine.setup();
        let mut step = 0usize;
        let mut written = 0usize;
        while engine.step() {
            step += 1;
            if step % interval == 0 {
                let marked = pipeline::mark_revealed(pixels, engine.processed_flags());
                self.write(&format!("iter_step_{}", step), &marked, false)?;
                written += 1;
            }
        }
        Ok(written)
    }
}
