// THEORY:
// `iter_tester` is the command-line harness around the `adaptive_iter` library.
// For every input image it runs the full pipeline, prints how the adaptive
// predictor compares with the gradient-clamp baseline, and writes whichever
// diagnostic images were asked for.
//
// Key architectural principles:
// 1.  **One Image, One Blocking Task**: A traversal is single-threaded CPU work.
//     Each input runs inside `spawn_blocking` with its own engine, and a
//     semaphore caps how many run at once.
// 2.  **Failures Stay Per File**: An unreadable or oversized image is reported
//     and counted; the other inputs still finish.

mod args;
mod dumps;

use crate::args::{Args, DumpLevel};
use crate::dumps::DumpWriter;
use adaptive_iter::core_modules::error_stats::ErrorSummary;
use adaptive_iter::core_modules::palette::ColorSurvey;
use adaptive_iter::core_modules::utils::image_helper::image_helper;
use adaptive_iter::pipeline;
use adaptive_iter::PixelSource;
use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use log::{LevelFilter, error, info, warn};
use simple_logger::SimpleLogger;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// One line of output per processed image.
#[derive(Debug)]
struct FileSummary {
    input: PathBuf,
    width: u32,
    height: u32,
    survey: ColorSurvey,
    palette_colors: Option<usize>,
    adaptive: ErrorSummary,
    baseline: ErrorSummary,
    lossless: bool,
    average_run: Option<Duration>,
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}x{} ", self.input.display(), self.width, self.height)?;
        write!(f, "{} colors", self.survey.unique_colors)?;
        if self.survey.grayscale {
            write!(f, " gray")?;
        }
        write!(f, " | ")?;
        match self.palette_colors {
            Some(colors) => write!(f, "palette({})", colors)?,
            None => write!(f, "rgb")?,
        }
        write!(f, " | iter {} | gradclamp {}", self.adaptive, self.baseline)?;
        if !self.lossless {
            write!(f, " | RECONSTRUCTION MISMATCH")?;
        }
        if let Some(average) = self.average_run {
            write!(f, " | {:.3} ms/run", average.as_secs_f64() * 1000.0)?;
        }
        Ok(())
    }
}

/// Logs at info (debug with `--verbose`); `RUST_LOG` overrides either.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
        .context("installing the logger")
}

fn process_file(input: &Path, args: &Args) -> Result<FileSummary> {
    let image = image_helper::load(input).with_context(|| format!("loading {}", input.display()))?;
    info!("{}: {}x{}", input.display(), image.width, image.height);

    let config = args.iter_config();
    let report = pipeline::process_image(&image.pixels, image.width, image.height, image.has_alpha, &config)?;
    if !report.lossless {
        warn!("{}: replaying the deltas did not reproduce the image", input.display());
    }

    let source = match &report.palette {
        Some(palette) => PixelSource::Palette {
            colors: &palette.colors,
            indices: &palette.indices,
        },
        None => PixelSource::Rgb(&image.pixels),
    };

    let writer = DumpWriter::new(&args.out_dir, input, image.width, image.height);
    match args.dump {
        DumpLevel::None => {}
        DumpLevel::Summary => writer.write_summary(&report)?,
        DumpLevel::All => {
            writer.write_all(&report, &image.pixels)?;
            if args.step_dump_interval > 0 {
                let written = writer.write_step_snapshots(source, &image.pixels, args.step_dump_interval)?;
                info!("{}: {} step snapshots", input.display(), written);
            }
        }
    }

    let average_run = if args.timing_loops > 0 {
        let start = Instant::now();
        for _ in 0..args.timing_loops {
            pipeline::iterate(source, image.width, image.height, &config)?;
        }
        Some(start.elapsed() / args.timing_loops)
    } else {
        None
    };

    Ok(FileSummary {
        input: input.to_path_buf(),
        width: image.width,
        height: image.height,
        survey: report.survey,
        palette_colors: report.palette.as_ref().map(|p| p.len()),
        adaptive: report.adaptive_error,
        baseline: report.baseline_error,
        lossless: report.lossless,
        average_run,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let jobs = args.jobs();
    info!("processing {} images, {} at a time", args.inputs.len(), jobs);
    let semaphore = Arc::new(Semaphore::new(jobs));
    let args = Arc::new(args);

    let tasks = args.inputs.iter().cloned().map(|input| {
        let semaphore = Arc::clone(&semaphore);
        let args = Arc::clone(&args);
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.context("job limiter closed")?;
            let summary = tokio::task::spawn_blocking(move || process_file(&input, &args))
                .await
                .context("image task failed")??;
            anyhow::Ok(summary)
        })
    });

    let mut failures = 0usize;
    for result in join_all(tasks).await {
        match result {
            Ok(Ok(summary)) => println!("{}", summary),
            Ok(Err(e)) => {
                error!("{:#}", e);
                failures += 1;
            }
            Err(e) => {
                error!("task panicked: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} inputs failed", failures, args.inputs.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_names_the_colors_and_both_predictors() {
        let zero = ErrorSummary::from_deltas(&[]);
        let summary = FileSummary {
            input: PathBuf::from("flat.png"),
            width: 3,
            height: 3,
            survey: ColorSurvey {
                unique_colors: 1,
                grayscale: true,
            },
            palette_colors: Some(1),
            adaptive: zero,
            baseline: zero,
            lossless: true,
            average_run: None,
        };
        assert_eq!(
            summary.to_string(),
            "flat.png 3x3 1 colors gray | palette(1) | iter MAE 0.0000, MSE 0.0000 | gradclamp MAE 0.0000, MSE 0.0000"
        );
    }
}
