// THEORY:
// The `Grid2DCache` is a dense, fixed-size 2D array addressed by (x, y) image
// coordinates. The traversal engine keeps two of them, one per edge direction,
// holding the cost of every edge whose two endpoints are both revealed.
//
// Key architectural principles:
// 1.  **Orientation Is Storage, Not Meaning**: Callers always address the cache
//     with image coordinates. The orientation only decides which axis is
//     contiguous in memory. The vertical edge cache is stored column-major so that
//     walking down a column (the direction vertical box prediction reads) touches
//     consecutive slots, exactly like the horizontal cache does along a row.
// 2.  **Runs Along the Fast Axis**: `run` hands out a borrowed slice along the
//     contiguous axis, which is how the box predictor reads a window line in one go.
// 3.  **Set Once**: Edge slots start as `UNSET` and are written once, when the edge
//     becomes computable. `set_edge` checks this in debug builds.

/// Marks an edge slot whose cost cannot be computed yet.
pub const UNSET: i16 = -1;

/// Which image axis is contiguous in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `offset = y * width + x`
    RowMajor,
    /// `offset = x * height + y`
    ColumnMajor,
}

/// A dense width x height array addressed by image coordinates.
#[derive(Debug, Clone)]
pub struct Grid2DCache<T> {
    /// Width of the image this cache mirrors.
    width: usize,
    /// Height of the image this cache mirrors.
    height: usize,
    /// Memory layout of `values`.
    orientation: Orientation,
    values: Vec<T>,
}

impl<T: Copy> Grid2DCache<T> {
    pub fn new(width: usize, height: usize, orientation: Orientation, fill: T) -> Self {
        Self {
            width,
            height,
            orientation,
            values: vec![fill; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Raw storage in memory order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width, "x {} out of range {}", x, self.width);
        debug_assert!(y < self.height, "y {} out of range {}", y, self.height);
        match self.orientation {
            Orientation::RowMajor => y * self.width + x,
            Orientation::ColumnMajor => x * self.height + y,
        }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.values[self.offset(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let offset = self.offset(x, y);
        self.values[offset] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.values.iter_mut().for_each(|slot| *slot = value);
    }

    /// Clamps a position on the contiguous axis to its last valid index.
    #[inline]
    pub fn clamp_to_axis_max(&self, position: usize) -> usize {
        let axis_len = match self.orientation {
            Orientation::RowMajor => self.width,
            Orientation::ColumnMajor => self.height,
        };
        position.min(axis_len - 1)
    }

    /// Contiguous slots `first..=last` along the fast axis of line `line`.
    ///
    /// For a row-major cache `line` is a row and `first`/`last` are columns; for a
    /// column-major cache `line` is a column and `first`/`last` are rows.
    #[inline]
    pub fn run(&self, line: usize, first: usize, last: usize) -> &[T] {
        debug_assert!(first <= last);
        let start = match self.orientation {
            Orientation::RowMajor => self.offset(first, line),
            Orientation::ColumnMajor => self.offset(line, first),
        };
        &self.values[start..=start + (last - first)]
    }
}

impl Grid2DCache<i16> {
    /// The cached edge cost at (x, y), or `None` while it is still `UNSET`.
    #[inline]
    pub fn edge(&self, x: usize, y: usize) -> Option<u32> {
        let value = self.get(x, y);
        (value != UNSET).then_some(value as u32)
    }

    /// Stores an edge cost. Each slot is written at most once.
    #[inline]
    pub fn set_edge(&mut self, x: usize, y: usize, cost: u32) {
        debug_assert_eq!(self.get(x, y), UNSET, "edge slot ({}, {}) written twice", x, y);
        debug_assert!(cost <= i16::MAX as u32);
        self.set(x, y, cost as i16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientations_map_the_same_coordinate_to_different_slots() {
        let rows = Grid2DCache::new(4, 3, Orientation::RowMajor, 0u8);
        let cols = Grid2DCache::new(4, 3, Orientation::ColumnMajor, 0u8);
        assert_eq!(rows.offset(1, 2), 9);
        assert_eq!(cols.offset(1, 2), 5);
        assert_eq!(rows.offset(3, 2), 11);
        assert_eq!(cols.offset(3, 2), 11);
    }

    #[test]
    fn run_follows_the_contiguous_axis() {
        let mut cols = Grid2DCache::new(3, 4, Orientation::ColumnMajor, 0u32);
        for y in 0..4 {
            cols.set(2, y, 10 + y as u32);
        }
        assert_eq!(cols.run(2, 1, 3), &[11, 12, 13]);

        let mut rows = Grid2DCache::new(3, 4, Orientation::RowMajor, 0u32);
        rows.set(0, 1, 5);
        rows.set(1, 1, 6);
        assert_eq!(rows.run(1, 0, 1), &[5, 6]);
    }

    #[test]
    fn clamp_uses_the_fast_axis_length() {
        let rows = Grid2DCache::new(5, 2, Orientation::RowMajor, 0u8);
        let cols = Grid2DCache::new(5, 2, Orientation::ColumnMajor, 0u8);
        assert_eq!(rows.clamp_to_axis_max(7), 4);
        assert_eq!(cols.clamp_to_axis_max(7), 1);
        assert_eq!(rows.clamp_to_axis_max(2), 2);
    }

    #[test]
    fn edges_start_unset() {
        let mut cache = Grid2DCache::new(2, 2, Orientation::RowMajor, UNSET);
        assert_eq!(cache.edge(0, 1), None);
        cache.set_edge(0, 1, 384);
        assert_eq!(cache.edge(0, 1), Some(384));
        cache.fill(UNSET);
        assert!(cache.values().iter().all(|&v| v == UNSET));
    }
}
