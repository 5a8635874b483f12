// THEORY:
// The `TraversalEngine` decides, one pixel at a time, which unknown pixel to
// reveal next. It always takes the candidate edge whose predicted cost is lowest,
// so smooth regions are swept first and expensive boundaries are crossed last.
// The resulting reveal order, and the prediction error at every revealed pixel,
// are the outputs of a run.
//
// Key architectural principles:
// 1.  **Seeded Growth**: A run starts from the 2x2 block in the top-left corner.
//     Every later pixel is reached by extending a pair of adjacent revealed pixels
//     one step further along a row or column, so each reveal touches at least one
//     pixel revealed before it.
// 2.  **Lazy Frontier**: Candidate edges are never removed when they go stale.
//     A popped entry whose target was revealed through another edge is dropped,
//     and one whose freshly predicted cost grew since it was queued is pushed back
//     at the new cost. Only an entry whose cost held up is acted on.
// 3.  **Incremental Caches**: Revealing a pixel makes at most four new edges
//     computable (to its left, right, up and down neighbors). Exactly those slots
//     of the `EdgeCaches` are filled, once, and the box predictor reads nothing else.
// 4.  **One Owner**: The engine borrows the pixels and owns everything it mutates:
//     processed flags, caches, frontier and outputs. Separate engines share nothing
//     and can run on separate threads.
// 5.  **Explicit Lifecycle**: `Uninitialized -> Seeded -> Running -> Done`. `setup`
//     may be called again to rerun on the same borrowed pixels.

use crate::core_modules::box_predictor::{Direction, EdgeCaches};
use crate::core_modules::frontier::FrontierPriorityStack;
use crate::core_modules::neighbor_predictor::{self, Neighborhood};
use crate::core_modules::pixel::pixel::PackedPixel;
use crate::core_modules::pixel_delta::pixel_delta::{PackedDelta, component_delta, rgb_edge_cost};
use crate::core_modules::wrapped_delta::wrapped_delta::table_edge_cost;
use crate::error::{IterError, Result};
use log::{debug, trace};

/// Frontier buckets for RGB costs, 0..=255 * 3.
pub const RGB_BUCKETS: usize = 255 * 3 + 1;
/// Frontier buckets for palette index costs, 0..=255.
pub const PALETTE_BUCKETS: usize = 256;
/// Largest palette the index buffer can address.
pub const MAX_PALETTE_COLORS: usize = 256;

/// Row-major offsets of the 2x2 seed block, which is revealed before any
/// prediction runs and whose delta slots hold raw pixels.
pub fn seed_offsets(width: usize) -> [usize; 4] {
    [0, 1, width, width + 1]
}

/// Pixels the engine reads from. Borrowed for the whole run and never modified.
#[derive(Debug, Clone, Copy)]
pub enum PixelSource<'a> {
    /// One packed pixel per grid position.
    Rgb(&'a [PackedPixel]),
    /// A color table plus one table index per grid position.
    Palette {
        colors: &'a [PackedPixel],
        indices: &'a [u8],
    },
}

impl<'a> PixelSource<'a> {
    /// Number of grid positions the source covers.
    pub fn len(&self) -> usize {
        match self {
            PixelSource::Rgb(pixels) => pixels.len(),
            PixelSource::Palette { indices, .. } => indices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_palette(&self) -> bool {
        matches!(self, PixelSource::Palette { .. })
    }

    /// The color at a row-major offset.
    #[inline]
    pub fn pixel(&self, offset: usize) -> PackedPixel {
        match self {
            PixelSource::Rgb(pixels) => pixels[offset],
            PixelSource::Palette { colors, indices } => colors[indices[offset] as usize],
        }
    }

    /// Cost of the edge between two offsets.
    #[inline]
    pub fn edge_cost(&self, a: usize, b: usize) -> u32 {
        match self {
            PixelSource::Rgb(pixels) => rgb_edge_cost(pixels[a], pixels[b]),
            PixelSource::Palette { colors, indices } => {
                table_edge_cost(indices[a], indices[b], colors.len() as u32)
            }
        }
    }

    /// Frontier size able to hold every cost this source can produce.
    pub fn num_buckets(&self) -> usize {
        match self {
            PixelSource::Rgb(_) => RGB_BUCKETS,
            PixelSource::Palette { .. } => PALETTE_BUCKETS,
        }
    }

    /// Checks every precondition of a run over a `width` x `height` grid.
    pub fn validate(&self, width: u32, height: u32) -> Result<()> {
        if width < 2 || height < 2 {
            return Err(IterError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if self.len() != expected {
            return Err(IterError::BufferSizeMismatch {
                expected,
                actual: self.len(),
            });
        }
        if let PixelSource::Palette { colors, indices } = self {
            if colors.is_empty() {
                return Err(IterError::EmptyPalette);
            }
            if colors.len() > MAX_PALETTE_COLORS {
                return Err(IterError::PaletteTooLarge(colors.len()));
            }
            if let Some((offset, &index)) = indices
                .iter()
                .enumerate()
                .find(|(_, index)| **index as usize >= colors.len())
            {
                return Err(IterError::IndexOutOfPalette {
                    offset,
                    index,
                    palette_len: colors.len(),
                });
            }
        }
        Ok(())
    }
}

/// A frontier entry: the known edge `from -> to` whose extension would reveal
/// the pixel one step past `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordDelta {
    pub to_x: u32,
    pub to_y: u32,
    pub direction: Direction,
}

impl CoordDelta {
    pub fn new(to_x: usize, to_y: usize, direction: Direction) -> Self {
        Self {
            to_x: to_x as u32,
            to_y: to_y as u32,
            direction,
        }
    }

    /// The revealed pixel one step before `to`.
    pub fn from(&self) -> (usize, usize) {
        let (x, y) = (self.to_x as usize, self.to_y as usize);
        match self.direction {
            Direction::Horizontal => (x - 1, y),
            Direction::Vertical => (x, y - 1),
        }
    }

    pub fn to(&self) -> (usize, usize) {
        (self.to_x as usize, self.to_y as usize)
    }

    /// The pixel this entry would reveal.
    pub fn target(&self) -> (usize, usize) {
        let (x, y) = (self.to_x as usize, self.to_y as usize);
        match self.direction {
            Direction::Horizontal => (x + 1, y),
            Direction::Vertical => (x, y + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Uninitialized,
    Seeded,
    Running,
    Done,
}

/// Counters describing how much work the lazy frontier did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Entries taken off the frontier.
    pub pops: u64,
    /// Popped entries whose target had already been revealed.
    pub stale: u64,
    /// Popped entries pushed back at a higher cost.
    pub requeued: u64,
    /// Accepted entries whose fresh cost was below the stored one.
    pub recalc_smaller: u64,
    /// Accepted entries whose fresh cost matched the stored one.
    pub recalc_equal: u64,
}

/// Hook for watching a run step by step. Both methods default to doing nothing.
pub trait StepObserver {
    /// A pixel was revealed as the `step`-th entry of the order.
    fn on_reveal(&mut self, _step: usize, _offset: u32, _priority: u32) {}

    /// An entry's cost grew from `stored` to `fresh` and it went back on the frontier.
    fn on_requeue(&mut self, _entry: &CoordDelta, _stored: u32, _fresh: u32) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct TraversalOutput {
    /// Row-major offsets in reveal order.
    pub order: Vec<u32>,
    /// Prediction errors by row-major offset, seeds stored raw.
    pub deltas: Option<Vec<PackedDelta>>,
    pub stats: TraversalStats,
}

pub struct TraversalEngine<'a, O = NoopObserver> {
    source: PixelSource<'a>,
    width: usize,
    height: usize,
    /// True once a coordinate has been revealed. Never reset within a run.
    processed: Vec<bool>,
    caches: EdgeCaches,
    frontier: FrontierPriorityStack<CoordDelta>,
    order: Vec<u32>,
    deltas: Option<Vec<PackedDelta>>,
    state: TraversalState,
    stats: TraversalStats,
    observer: O,
}

impl<'a> TraversalEngine<'a> {
    pub fn new(source: PixelSource<'a>, width: u32, height: u32, emit_deltas: bool) -> Result<Self> {
        Self::with_observer(source, width, height, emit_deltas, NoopObserver)
    }
}

impl<'a, O: StepObserver> TraversalEngine<'a, O> {
    /// Validates the inputs and builds an engine that reports to `observer`.
    pub fn with_observer(
        source: PixelSource<'a>,
        width: u32,
        height: u32,
        emit_deltas: bool,
        observer: O,
    ) -> Result<Self> {
        source.validate(width, height)?;
        let (width, height) = (width as usize, height as usize);
        Ok(Self {
            source,
            width,
            height,
            processed: Vec::new(),
            caches: EdgeCaches::new(width, height),
            frontier: FrontierPriorityStack::new(source.num_buckets()),
            order: Vec::new(),
            deltas: emit_deltas.then(Vec::new),
            state: TraversalState::Uninitialized,
            stats: TraversalStats::default(),
            observer,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn state(&self) -> TraversalState {
        self.state
    }

    pub fn order(&self) -> &[u32] {
        &self.order
    }

    pub fn deltas(&self) -> Option<&[PackedDelta]> {
        self.deltas.as_deref()
    }

    pub fn processed_flags(&self) -> &[bool] {
        &self.processed
    }

    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Number of candidate entries still queued, stale ones included.
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Clears all run state and reveals the 2x2 seed block.
    pub fn setup(&mut self) {
        let num_pixels = self.width * self.height;
        self.processed.clear();
        self.processed.resize(num_pixels, false);
        self.caches.reset();
        self.frontier.clear();
        self.order.clear();
        self.order.reserve(num_pixels);
        if let Some(deltas) = self.deltas.as_mut() {
            deltas.clear();
            deltas.resize(num_pixels, 0);
        }
        self.stats = TraversalStats::default();

        debug!(
            "traversal setup {}x{} ({} mode, {} buckets)",
            self.width,
            self.height,
            if self.source.is_palette() { "palette" } else { "rgb" },
            self.frontier.num_buckets()
        );

        self.init_block();
        self.state = TraversalState::Seeded;
    }

    /// Runs every remaining step.
    pub fn iterate(&mut self) {
        if self.state == TraversalState::Uninitialized {
            self.setup();
        }
        while self.step() {}
    }

    /// Reveals one pixel. Returns false once the frontier is exhausted.
    pub fn step(&mut self) -> bool {
        match self.state {
            TraversalState::Uninitialized => self.setup(),
            TraversalState::Done => return false,
            TraversalState::Seeded | TraversalState::Running => {}
        }
        self.state = TraversalState::Running;

        let Some((entry, priority)) = self.minimum_search() else {
            self.state = TraversalState::Done;
            debug!(
                "traversal done: {} revealed, {} pops, {} stale, {} requeued",
                self.order.len(),
                self.stats.pops,
                self.stats.stale,
                self.stats.requeued
            );
            return false;
        };

        let (col, row) = entry.target();
        let offset = row * self.width + col;
        debug_assert!(!self.processed[offset]);
        debug_assert!(col >= 2 || row >= 2, "frontier reached into the seed block");

        self.order.push(offset as u32);
        if self.deltas.is_some() {
            let prediction = self.predict_pixel(col, row);
            let actual = self.source.pixel(offset);
            if let Some(deltas) = self.deltas.as_mut() {
                deltas[offset] = component_delta(prediction, actual);
            }
        }
        self.processed[offset] = true;
        self.update_cache(col, row);
        self.extend_frontier(col, row);

        trace!("reveal ({}, {}) at cost {}", col, row, priority);
        self.observer.on_reveal(self.order.len() - 1, offset as u32, priority);
        true
    }

    /// Consumes the engine, returning what the run produced so far.
    pub fn into_output(self) -> TraversalOutput {
        TraversalOutput {
            order: self.order,
            deltas: self.deltas,
            stats: self.stats,
        }
    }

    #[inline]
    fn is_processed(&self, x: usize, y: usize) -> bool {
        self.processed[y * self.width + x]
    }

    /// The neighbor-based prediction for (x, y) given what is revealed now.
    pub fn predict_pixel(&self, x: usize, y: usize) -> PackedPixel {
        let width = self.width;
        let processed = &self.processed;
        let source = &self.source;
        let neighborhood = Neighborhood::gather(
            x,
            y,
            width,
            self.height,
            |nx, ny| processed[ny * width + nx],
            |offset| source.pixel(offset),
        );
        neighbor_predictor::predict(&neighborhood)
    }

    fn init_block(&mut self) {
        let mut seeds: Vec<(CoordDelta, u32)> = Vec::with_capacity(4);
        if self.width >= 3 {
            for y in 0..2 {
                seeds.push(self.seed_entry(CoordDelta::new(1, y, Direction::Horizontal)));
            }
        }
        if self.height >= 3 {
            for x in 0..2 {
                seeds.push(self.seed_entry(CoordDelta::new(x, 1, Direction::Vertical)));
            }
        }
        // With all four present the push order is col 1, row 1, col 0, row 0.
        if seeds.len() == 4 {
            seeds.swap(1, 2);
            seeds.reverse();
        }
        for (entry, priority) in seeds {
            self.frontier.push(entry, priority);
        }

        for offset in seed_offsets(self.width) {
            let (x, y) = (offset % self.width, offset / self.width);
            self.update_cache(x, y);
            self.order.push(offset as u32);
            self.processed[offset] = true;
            if let Some(deltas) = self.deltas.as_mut() {
                deltas[offset] = self.source.pixel(offset);
            }
        }
    }

    /// A seed entry scored by the direct cost of its edge.
    fn seed_entry(&self, entry: CoordDelta) -> (CoordDelta, u32) {
        let (fx, fy) = entry.from();
        let (tx, ty) = entry.to();
        let cost = self
            .source
            .edge_cost(fy * self.width + fx, ty * self.width + tx);
        (entry, cost)
    }

    /// Pops until an entry survives re-scoring, or the frontier runs dry.
    fn minimum_search(&mut self) -> Option<(CoordDelta, u32)> {
        loop {
            let (entry, stored) = self.frontier.pop_min()?;
            self.stats.pops += 1;

            let (tx, ty) = entry.target();
            if self.is_processed(tx, ty) {
                self.stats.stale += 1;
                continue;
            }

            let fresh = self.caches.predict(entry.direction, tx, ty);
            if fresh > stored {
                self.stats.requeued += 1;
                self.observer.on_requeue(&entry, stored, fresh);
                self.frontier.push(entry, fresh);
                continue;
            }
            if fresh < stored {
                self.stats.recalc_smaller += 1;
            } else {
                self.stats.recalc_equal += 1;
            }
            return Some((entry, stored));
        }
    }

    /// Caches every edge between (x, y) and an already revealed axis neighbor.
    fn update_cache(&mut self, x: usize, y: usize) {
        let width = self.width;
        let here = y * width + x;
        if x > 0 && self.is_processed(x - 1, y) {
            let cost = self.source.edge_cost(here - 1, here);
            self.caches.record(Direction::Horizontal, x - 1, y, cost);
        }
        if x + 1 < width && self.is_processed(x + 1, y) {
            let cost = self.source.edge_cost(here, here + 1);
            self.caches.record(Direction::Horizontal, x, y, cost);
        }
        if y > 0 && self.is_processed(x, y - 1) {
            let cost = self.source.edge_cost(here - width, here);
            self.caches.record(Direction::Vertical, x, y - 1, cost);
        }
        if y + 1 < self.height && self.is_processed(x, y + 1) {
            let cost = self.source.edge_cost(here, here + width);
            self.caches.record(Direction::Vertical, x, y, cost);
        }
    }

    /// Queues the next step down the column and along the row of (col, row).
    fn extend_frontier(&mut self, col: usize, row: usize) {
        if let Some(to_row) = self.extension(row, self.height, |r| self.is_processed(col, r)) {
            let priority = self.caches.predict(Direction::Vertical, col, to_row + 1);
            self.frontier
                .push(CoordDelta::new(col, to_row, Direction::Vertical), priority);
        }
        if let Some(to_col) = self.extension(col, self.width, |c| self.is_processed(c, row)) {
            let priority = self.caches.predict(Direction::Horizontal, to_col + 1, row);
            self.frontier
                .push(CoordDelta::new(to_col, row, Direction::Horizontal), priority);
        }
    }

    /// Where along one axis a new entry should end, if anywhere.
    ///
    /// With the predecessor revealed and the successor open, the new entry ends
    /// here. With the successor already revealed and the one after it open, the
    /// entry ends at the successor instead.
    fn extension<F: Fn(usize) -> bool>(&self, at: usize, len: usize, revealed: F) -> Option<usize> {
        let prev_revealed = at > 0 && revealed(at - 1);
        let next_open = at + 1 < len && !revealed(at + 1);
        if prev_revealed && next_open {
            Some(at)
        } else if !next_open && at + 2 < len && !revealed(at + 2) {
            Some(at + 1)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::pack;

    #[test]
    fn frontier_sizing_covers_the_worst_edge_cost() {
        let rgb = [pack(0, 0, 0, 0xFF), pack(128, 128, 128, 0xFF)];
        let source = PixelSource::Rgb(&rgb);
        assert!((source.edge_cost(0, 1) as usize) < source.num_buckets());

        let colors: Vec<PackedPixel> = (0..=255u8).map(|v| pack(v, v, v, 0xFF)).collect();
        let indices = [0u8, 128];
        let source = PixelSource::Palette {
            colors: &colors,
            indices: &indices,
        };
        assert_eq!(source.edge_cost(0, 1), 255);
        assert!((source.edge_cost(0, 1) as usize) < source.num_buckets());
    }

    #[derive(Default)]
    struct Recorder {
        reveals: Vec<(usize, u32, u32)>,
        requeues: usize,
    }

    impl StepObserver for Recorder {
        fn on_reveal(&mut self, step: usize, offset: u32, priority: u32) {
            self.reveals.push((step, offset, priority));
        }

        fn on_requeue(&mut self, _entry: &CoordDelta, stored: u32, fresh: u32) {
            assert!(fresh > stored);
            self.requeues += 1;
        }
    }

    fn gray(value: u8) -> PackedPixel {
        pack(value, value, value, 0xFF)
    }

    #[test]
    fn coord_delta_points_one_step_past_its_edge() {
        let h = CoordDelta::new(3, 1, Direction::Horizontal);
        assert_eq!(h.from(), (2, 1));
        assert_eq!(h.target(), (4, 1));
        let v = CoordDelta::new(0, 5, Direction::Vertical);
        assert_eq!(v.from(), (0, 4));
        assert_eq!(v.target(), (0, 6));
    }

    #[test]
    fn rejects_bad_inputs_before_allocating() {
        let pixels = vec![0u32; 6];
        assert!(matches!(
            TraversalEngine::new(PixelSource::Rgb(&pixels), 1, 6, false),
            Err(IterError::InvalidDimensions { width: 1, height: 6 })
        ));
        assert!(matches!(
            TraversalEngine::new(PixelSource::Rgb(&pixels), 2, 2, false),
            Err(IterError::BufferSizeMismatch { expected: 4, actual: 6 })
        ));
        let colors = [gray(0), gray(1)];
        let indices = [0u8, 1, 2, 0];
        let source = PixelSource::Palette {
            colors: &colors,
            indices: &indices,
        };
        assert!(matches!(
            TraversalEngine::new(source, 2, 2, false),
            Err(IterError::IndexOutOfPalette { offset: 2, index: 2, palette_len: 2 })
        ));
    }

    #[test]
    fn seed_block_fills_the_four_seed_edges() {
        let pixels: Vec<u32> = (0..9).map(|v| gray(v * 10)).collect();
        let mut engine = TraversalEngine::new(PixelSource::Rgb(&pixels), 3, 3, true).unwrap();
        assert_eq!(engine.state(), TraversalState::Uninitialized);
        engine.setup();
        assert_eq!(engine.state(), TraversalState::Seeded);
        assert_eq!(engine.order(), &[0, 1, 3, 4]);
        assert_eq!(engine.frontier_len(), 4);
        assert_eq!(engine.caches.edge(Direction::Horizontal, 0, 0), Some(30));
        assert_eq!(engine.caches.edge(Direction::Horizontal, 0, 1), Some(30));
        assert_eq!(engine.caches.edge(Direction::Vertical, 0, 0), Some(90));
        assert_eq!(engine.caches.edge(Direction::Vertical, 1, 0), Some(90));
        assert_eq!(engine.caches.edge(Direction::Horizontal, 1, 0), None);
        // Seeds are emitted raw.
        assert_eq!(engine.deltas().unwrap()[4], gray(40));
    }

    #[test]
    fn two_by_two_finishes_after_the_seed() {
        let pixels = vec![gray(1), gray(2), gray(3), gray(4)];
        let mut engine = TraversalEngine::new(PixelSource::Rgb(&pixels), 2, 2, false).unwrap();
        assert!(!engine.step());
        assert_eq!(engine.state(), TraversalState::Done);
        assert!(!engine.step());
        assert_eq!(engine.into_output().order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn smooth_ramp_is_predicted_exactly_inside() {
        // Horizontal ramp: every interior pixel equals the average of L and R.
        let (w, h) = (6usize, 4usize);
        let pixels: Vec<u32> = (0..w * h).map(|i| gray(((i % w) * 20) as u8)).collect();
        let mut engine = TraversalEngine::new(PixelSource::Rgb(&pixels), w as u32, h as u32, true).unwrap();
        engine.iterate();
        let out = engine.into_output();
        assert_eq!(out.order.len(), w * h);
        let deltas = out.deltas.unwrap();
        for &offset in &out.order[4..] {
            let (x, y) = (offset as usize % w, offset as usize / w);
            // A single-neighbor guess on a ramp is off by at most one step.
            let error = deltas[offset as usize] & 0xFF;
            let magnitude = (error as u8 as i8).unsigned_abs();
            assert!(magnitude <= 20, "({}, {}) error {}", x, y, magnitude);
        }
    }

    #[test]
    fn observer_sees_every_non_seed_reveal_in_order() {
        let pixels: Vec<u32> = (0..20).map(|v| gray((v * 37 % 256) as u8)).collect();
        let mut engine = TraversalEngine::with_observer(PixelSource::Rgb(&pixels), 5, 4, false, Recorder::default())
            .unwrap();
        engine.iterate();
        let steps: Vec<usize> = engine.observer().reveals.iter().map(|r| r.0).collect();
        assert_eq!(steps, (4..20).collect::<Vec<_>>());
        let offsets: Vec<u32> = engine.observer().reveals.iter().map(|r| r.1).collect();
        assert_eq!(&engine.order()[4..], offsets.as_slice());
        assert_eq!(engine.stats().requeued as usize, engine.observer().requeues);
    }

    #[test]
    fn setup_again_reproduces_the_same_run() {
        let pixels: Vec<u32> = (0..30).map(|v| gray((v * 91 % 256) as u8)).collect();
        let mut engine = TraversalEngine::new(PixelSource::Rgb(&pixels), 6, 5, true).unwrap();
        engine.iterate();
        let first = (engine.order().to_vec(), engine.deltas().map(<[u32]>::to_vec));
        engine.setup();
        engine.iterate();
        assert_eq!(engine.order(), first.0.as_slice());
        assert_eq!(engine.deltas().map(<[u32]>::to_vec), first.1);
    }
}
