// THEORY:
// The `BoxDeltaPredictor` scores a candidate edge before the pixel at its far end
// is known. It cannot look at that pixel, so it looks at how costly the already
// cached edges around it were: if neighboring rows were smooth at this spot, the
// next step along this row probably is too.
//
// Key architectural principles:
// 1.  **Edges, Not Pixels**: The window reads cached edge costs from the
//     `EdgeCaches`, never raw pixels. Every value it reads was computed once when
//     both endpoints of that edge were revealed.
// 2.  **A 3 x 5 Window**: For a horizontal step to (cx, cy) the window covers
//     columns cx-2..=cx on rows cy-2..=cy+2. The vertical window is the same shape
//     transposed. Rows outside the image are simply absent.
// 3.  **Distance Weighting**: Each line is averaged over its cached slots. The
//     center line always has the edge leading into the candidate and carries the
//     most weight; lines one and two away are averaged in pairs and weighted less.
// 4.  **Shared Shape, Two Caches**: Both directions run the same code. The vertical
//     cache is column-major, so a window column is a contiguous run just like a
//     window row is in the horizontal cache.

use crate::core_modules::grid_cache::{Grid2DCache, Orientation, UNSET};
use crate::core_modules::pixel_delta::pixel_delta::{average_012, fast_div_2, fast_div_3};

/// Axis along which an edge runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Horizontal,
    Vertical,
}

/// Cached costs of every revealed edge, one cache per direction.
#[derive(Debug, Clone)]
pub struct EdgeCaches {
    /// Slot (x, y) holds the cost of the edge (x, y) -> (x + 1, y).
    pub horizontal: Grid2DCache<i16>,
    /// Slot (x, y) holds the cost of the edge (x, y) -> (x, y + 1). Column-major.
    pub vertical: Grid2DCache<i16>,
}

impl EdgeCaches {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            horizontal: Grid2DCache::new(width, height, Orientation::RowMajor, UNSET),
            vertical: Grid2DCache::new(width, height, Orientation::ColumnMajor, UNSET),
        }
    }

    pub fn reset(&mut self) {
        self.horizontal.fill(UNSET);
        self.vertical.fill(UNSET);
    }

    /// Stores the cost of the edge starting at (x, y) in `direction`.
    pub fn record(&mut self, direction: Direction, x: usize, y: usize, cost: u32) {
        match direction {
            Direction::Horizontal => self.horizontal.set_edge(x, y, cost),
            Direction::Vertical => self.vertical.set_edge(x, y, cost),
        }
    }

    pub fn edge(&self, direction: Direction, x: usize, y: usize) -> Option<u32> {
        match direction {
            Direction::Horizontal => self.horizontal.edge(x, y),
            Direction::Vertical => self.vertical.edge(x, y),
        }
    }

    /// Predicted cost of revealing (x, y) by stepping along `direction`.
    ///
    /// The two pixels before (x, y) in that direction must already be revealed.
    pub fn predict(&self, direction: Direction, x: usize, y: usize) -> u32 {
        match direction {
            Direction::Horizontal => box_delta_sum(&self.horizontal, y, x),
            Direction::Vertical => box_delta_sum(&self.vertical, x, y),
        }
    }
}

/// Weighted window sum around `along` on line `line` of a cache.
///
/// Lines are rows of a row-major cache and columns of a column-major one.
fn box_delta_sum(cache: &Grid2DCache<i16>, line: usize, along: usize) -> u32 {
    debug_assert!(along >= 2, "box window needs two revealed predecessors");
    let line_count = match cache.orientation() {
        Orientation::RowMajor => cache.height(),
        Orientation::ColumnMajor => cache.width(),
    };
    let first = along.saturating_sub(2);
    let last = cache.clamp_to_axis_max(along);

    let line_at = |offset: isize| -> Option<u32> {
        let l = line.checked_add_signed(offset)?;
        if l >= line_count {
            return None;
        }
        line_average(cache.run(l, first, last))
    };

    let center = line_at(0);
    debug_assert!(center.is_some(), "edge into the candidate is not cached");
    let near = average_012(line_at(1), line_at(-1));
    let far = average_012(line_at(2), line_at(-2));
    weighted_sum(center.unwrap_or(0), near, far)
}

/// Average of the cached slots in one window line.
fn line_average(run: &[i16]) -> Option<u32> {
    let (sum, count) = run
        .iter()
        .filter(|&&v| v != UNSET)
        .fold((0u32, 0u32), |(sum, count), &v| (sum + v as u32, count + 1));
    match count {
        0 => None,
        1 => Some(sum),
        2 => Some(fast_div_2(sum)),
        _ => Some(fast_div_3(sum)),
    }
}

/// Blends the center line with the averaged near and far line pairs.
pub fn weighted_sum(center: u32, near: Option<u32>, far: Option<u32>) -> u32 {
    match (near, far) {
        (None, None) => center,
        (Some(n), Some(f)) => (center * 16 + n * 10 + f * 6) / 32,
        (None, Some(f)) => (center * 24 + f * 8) / 32,
        (Some(n), None) => (center * 21 + n * 11) / 32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_follow_available_lines() {
        assert_eq!(weighted_sum(40, None, None), 40);
        assert_eq!(weighted_sum(32, Some(0), Some(0)), 16);
        assert_eq!(weighted_sum(32, None, Some(64)), 40);
        assert_eq!(weighted_sum(32, Some(64), None), 43);
    }

    #[test]
    fn horizontal_window_averages_each_row() {
        let mut caches = EdgeCaches::new(5, 5);
        caches.record(Direction::Horizontal, 0, 2, 16);
        caches.record(Direction::Horizontal, 0, 1, 4);
        caches.record(Direction::Horizontal, 1, 1, 6);
        caches.record(Direction::Horizontal, 0, 3, 12);
        // center 16, near = ave(5, 12) = 8, no far rows
        assert_eq!(caches.predict(Direction::Horizontal, 2, 2), (16 * 21 + 8 * 11) / 32);

        caches.record(Direction::Horizontal, 0, 0, 30);
        caches.record(Direction::Horizontal, 1, 0, 30);
        caches.record(Direction::Horizontal, 2, 0, 33);
        // far row 0 averages three slots to 31
        assert_eq!(caches.predict(Direction::Horizontal, 2, 2), (16 * 16 + 8 * 10 + 31 * 6) / 32);
    }

    #[test]
    fn vertical_window_is_the_transpose() {
        let mut caches = EdgeCaches::new(5, 5);
        caches.record(Direction::Vertical, 2, 0, 16);
        caches.record(Direction::Vertical, 1, 0, 4);
        caches.record(Direction::Vertical, 1, 1, 6);
        caches.record(Direction::Vertical, 3, 0, 12);
        assert_eq!(caches.predict(Direction::Vertical, 2, 2), (16 * 21 + 8 * 11) / 32);
        assert_eq!(caches.edge(Direction::Vertical, 1, 1), Some(6));
        assert_eq!(caches.edge(Direction::Horizontal, 1, 1), None);
    }

    #[test]
    fn window_is_clipped_at_the_image_border() {
        let mut caches = EdgeCaches::new(3, 2);
        caches.record(Direction::Horizontal, 0, 0, 9);
        caches.record(Direction::Horizontal, 1, 1, 3);
        // Step to (2, 0): rows -2 and -1 are off the image, row 1 is near.
        assert_eq!(caches.predict(Direction::Horizontal, 2, 0), (9 * 21 + 3 * 11) / 32);
        caches.reset();
        assert_eq!(caches.edge(Direction::Horizontal, 0, 0), None);
    }
}
