// THEORY:
// Palette mode compares pixels by their position in a sorted color table rather
// than by their color. The `wrapped_delta` module turns a move between two table
// positions into a small unsigned number, which is what the frontier needs as a
// priority.
//
// Key architectural principles:
// 1.  **The Table Is a Ring**: With N entries, stepping from the last entry to the
//     first is one step forward, not N-1 steps back. `wrapped_table_delta` always
//     picks the shortest way around, preferring the positive direction on a tie.
// 2.  **Zigzag Ordering**: Signed deltas are folded into 0, 1, 2, ... as
//     0, +1, -1, +2, -2, ... so that magnitude, not sign, decides the ordering.
// 3.  **Bounded Cost**: With at most 256 entries the largest step is 128, so
//     every cost fits the 256 palette frontier buckets.

pub mod wrapped_delta {
    /// Folds a signed value into an unsigned code: 0 -> 0, +n -> 2n-1, -n -> 2n.
    #[inline]
    pub fn zigzag_encode(value: i32) -> u32 {
        if value > 0 {
            (value as u32) * 2 - 1
        } else {
            value.unsigned_abs() * 2
        }
    }

    /// Shortest signed step from `off1` to `off2` around a ring of `n` entries.
    ///
    /// Results lie in `(-n/2, n/2]` for even `n` and `[-n/2, n/2]` for odd `n`.
    pub fn wrapped_table_delta(off1: u32, off2: u32, n: u32) -> i32 {
        debug_assert!(n >= 1);
        debug_assert!(off1 < n && off2 < n);
        let delta = off2 as i32 - off1 as i32;
        let n = n as i32;
        let mid = n >> 1;
        let neg_mid = if n & 1 == 0 { -mid + 1 } else { -mid };
        if delta > mid {
            delta - n
        } else if delta < neg_mid {
            delta + n
        } else {
            delta
        }
    }

    /// Cost of the edge between two palette positions.
    #[inline]
    pub fn table_edge_cost(index1: u8, index2: u8, n: u32) -> u32 {
        zigzag_encode(wrapped_table_delta(index1 as u32, index2 as u32, n))
    }
}
