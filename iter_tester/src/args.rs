//! Command-line arguments for the tester.

use adaptive_iter::pipeline::{ColorMode, IterConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Palette mode when the image has few enough colors
    Auto,
    /// Always predict in RGB
    Rgb,
    /// Always predict palette indices; fails on images with too many colors
    Palette,
}

impl Mode {
    pub fn to_color_mode(self) -> ColorMode {
        match self {
            Mode::Auto => ColorMode::Auto,
            Mode::Rgb => ColorMode::Rgb,
            Mode::Palette => ColorMode::Palette,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpLevel {
    /// Print statistics only
    None,
    /// Error images for the adaptive and baseline predictors
    Summary,
    /// Every diagnostic image, including step snapshots
    All,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "iter_tester")]
#[command(about = "Adaptive pixel traversal and prediction error tester")]
pub struct Args {
    /// Input images
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Directory the dumps are written to
    #[arg(long, short = 'o', default_value = ".")]
    pub out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Mode::Auto)]
    pub mode: Mode,

    #[arg(long, value_enum, default_value_t = DumpLevel::Summary)]
    pub dump: DumpLevel,

    /// Write a snapshot of the revealed pixels every N steps (0 disables, needs --dump all)
    #[arg(long, default_value_t = 1000)]
    pub step_dump_interval: usize,

    /// Time this many extra traversal runs per image
    #[arg(long, default_value_t = 0)]
    pub timing_loops: u32,

    /// Images processed at once (defaults to the number of CPUs)
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Largest palette auto mode will build
    #[arg(long, default_value_t = 256)]
    pub max_palette_colors: usize,

    /// Log at debug level
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Args {
    pub fn iter_config(&self) -> IterConfig {
        IterConfig {
            emit_deltas: true,
            mode: self.mode.to_color_mode(),
            max_palette_colors: self.max_palette_colors,
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs.unwrap_or_else(num_cpus::get).max(1)
    }
}
