// THEORY:
// This file is the main entry point for the `adaptive_iter` library crate.
// The crate computes a content-adaptive reveal order over the pixels of an
// image, greedily taking the cheapest predicted step next, and the prediction
// error at every revealed pixel. It is a testbed for lossless image predictors.
//
// The `pipeline` module is the intended interface: buffers in, owned orders,
// deltas and reports out. The `core_modules` stay public so that tools can
// drive the `TraversalEngine` one step at a time or reuse the predictors.

pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use crate::core_modules::traversal::{PixelSource, StepObserver, TraversalEngine, TraversalState};
pub use crate::error::{IterError, Result};
pub use crate::pipeline::{ColorMode, IterConfig, IterOutput, IterReport};
