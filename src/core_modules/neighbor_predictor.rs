// THEORY:
// The `NeighborPredictor` guesses the value of a pixel about to be revealed from
// whichever of its 8 neighbors are already known. The difference between that
// guess and the real pixel is the prediction error the traversal emits.
//
// Key architectural principles:
// 1.  **Best Evidence First**: Cases are tried in a fixed order, from the richest
//     neighborhood (both axis pairs known) to the poorest (a single axis neighbor).
//     The first case whose neighbors are all present wins.
// 2.  **Component-Wise Direction Choice**: When both the horizontal and vertical
//     pairs are known, each of R, G and B independently averages along the axis
//     whose two endpoints agree more closely. Edges in one channel do not force a
//     direction on the others.
// 3.  **Corners Use Gradient Clamping**: With only an L-shaped corner of three
//     neighbors, the gradient predictor `a + b - c` clamped to its inputs follows
//     ramps without overshooting.
// 4.  **Pure**: The predictor sees a `Neighborhood` snapshot and nothing else. The
//     engine builds the snapshot from its processed flags.

use crate::core_modules::pixel::pixel::*;
use crate::core_modules::pixel_delta::pixel_delta::*;

/// The already-revealed 8-neighborhood of a pixel. `None` means unknown or off-grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Neighborhood {
    pub up_left: Option<PackedPixel>,
    pub up: Option<PackedPixel>,
    pub up_right: Option<PackedPixel>,
    pub left: Option<PackedPixel>,
    pub right: Option<PackedPixel>,
    pub down_left: Option<PackedPixel>,
    pub down: Option<PackedPixel>,
    pub down_right: Option<PackedPixel>,
}

impl Neighborhood {
    /// Collects the revealed neighbors of (x, y).
    ///
    /// `is_known(x, y)` reports whether a coordinate has been revealed and
    /// `pixel_at(offset)` returns the pixel at a row-major offset.
    pub fn gather<K, P>(x: usize, y: usize, width: usize, height: usize, is_known: K, pixel_at: P) -> Self
    where
        K: Fn(usize, usize) -> bool,
        P: Fn(usize) -> PackedPixel,
    {
        let neighbor_at = |dx: isize, dy: isize| -> Option<PackedPixel> {
            let nx = x.checked_add_signed(dx)?;
            let ny = y.checked_add_signed(dy)?;
            if nx >= width || ny >= height || !is_known(nx, ny) {
                return None;
            }
            Some(pixel_at(ny * width + nx))
        };
        Self {
            up_left: neighbor_at(-1, -1),
            up: neighbor_at(0, -1),
            up_right: neighbor_at(1, -1),
            left: neighbor_at(-1, 0),
            right: neighbor_at(1, 0),
            down_left: neighbor_at(-1, 1),
            down: neighbor_at(0, 1),
            down_right: neighbor_at(1, 1),
        }
    }
}

/// Predicts the center pixel of `n`.
pub fn predict(n: &Neighborhood) -> PackedPixel {
    match *n {
        Neighborhood {
            left: Some(l),
            right: Some(r),
            up: Some(u),
            down: Some(d),
            ..
        } => smaller_delta_average(l, r, u, d),
        Neighborhood {
            left: Some(l),
            right: Some(r),
            ..
        } => average_pixels(l, r),
        Neighborhood {
            up: Some(u),
            down: Some(d),
            ..
        } => average_pixels(u, d),
        Neighborhood {
            left: Some(l),
            up: Some(u),
            up_left: Some(ul),
            ..
        } => gradclamp_predict_pixel(l, u, ul),
        Neighborhood {
            left: Some(l),
            down: Some(d),
            down_left: Some(dl),
            ..
        } => gradclamp_predict_pixel(l, d, dl),
        Neighborhood {
            right: Some(r),
            up: Some(u),
            up_right: Some(ur),
            ..
        } => gradclamp_predict_pixel(r, u, ur),
        Neighborhood {
            right: Some(r),
            down: Some(d),
            down_right: Some(dr),
            ..
        } => gradclamp_predict_pixel(r, d, dr),
        _ => axis_fallback(n),
    }
}

/// Per-component average of two pixels. Alpha is zero.
fn average_pixels(p1: PackedPixel, p2: PackedPixel) -> PackedPixel {
    map_rgb(|shift| fast_ave_2(lane(p1, shift) as u32, lane(p2, shift) as u32))
}

fn smaller_delta_average(l: PackedPixel, r: PackedPixel, u: PackedPixel, d: PackedPixel) -> PackedPixel {
    let delta_h = component_delta(l, r);
    let delta_v = component_delta(u, d);
    map_rgb(|shift| {
        let magnitude_h = unsigned_byte_to_signed(lane(delta_h, shift)).unsigned_abs();
        let magnitude_v = unsigned_byte_to_signed(lane(delta_v, shift)).unsigned_abs();
        if magnitude_h <= magnitude_v {
            fast_ave_2(lane(l, shift) as u32, lane(r, shift) as u32)
        } else {
            fast_ave_2(lane(u, shift) as u32, lane(d, shift) as u32)
        }
    })
}

/// Averages whatever single axis neighbors are known, then blends the two axes.
fn axis_fallback(n: &Neighborhood) -> PackedPixel {
    let horizontal = n.left.or(n.right);
    let vertical = n.up.or(n.down);
    match (horizontal, vertical) {
        (Some(h), Some(v)) => average_pixels(h, v),
        (Some(p), None) | (None, Some(p)) => p & RGB_MASK,
        // Unreachable for revealed candidates, which always touch a known pixel.
        (None, None) => 0,
    }
}

#[inline]
fn map_rgb<F: Fn(u32) -> u32>(component: F) -> PackedPixel {
    let mut out = 0u32;
    for shift in [BLUE_SHIFT, GREEN_SHIFT, RED_SHIFT] {
        out |= (component(shift) & 0xFF) << shift;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rgb(r: u8, g: u8, b: u8) -> PackedPixel {
        pack(b, g, r, 0)
    }

    #[test]
    fn both_axes_pick_the_smoother_direction_per_component() {
        // Red varies across L/R but not U/D; blue the other way around.
        let n = Neighborhood {
            left: Some(rgb(0, 50, 100)),
            right: Some(rgb(200, 50, 100)),
            up: Some(rgb(80, 60, 0)),
            down: Some(rgb(80, 60, 250)),
            ..Default::default()
        };
        let p = Pixel::from(predict(&n));
        assert_eq!(p.red, 80);
        // Green ties (0 vs 0) and resolves to the horizontal pair.
        assert_eq!(p.green, 50);
        assert_eq!(p.blue, 100);
        assert_eq!(p.alpha, 0);
    }

    #[test]
    fn single_pairs_average() {
        let n = Neighborhood {
            up: Some(rgb(10, 20, 30)),
            down: Some(rgb(20, 40, 61)),
            left: Some(rgb(255, 255, 255)),
            ..Default::default()
        };
        assert_eq!(predict(&n), rgb(15, 30, 45));
    }

    #[test]
    fn corners_use_gradclamp() {
        let n = Neighborhood {
            left: Some(rgb(100, 0, 0)),
            up: Some(rgb(120, 0, 0)),
            up_left: Some(rgb(110, 0, 0)),
            ..Default::default()
        };
        assert_eq!(Pixel::from(predict(&n)).red, 110);

        let lower_right = Neighborhood {
            right: Some(rgb(10, 0, 0)),
            down: Some(rgb(40, 0, 0)),
            down_right: Some(rgb(0, 0, 0)),
            ..Default::default()
        };
        assert_eq!(Pixel::from(predict(&lower_right)).red, 40);
    }

    #[test]
    fn lone_neighbors_fall_back_to_axis_averages() {
        let only_left = Neighborhood {
            left: Some(pack(1, 2, 3, 0xFF)),
            ..Default::default()
        };
        assert_eq!(predict(&only_left), pack(1, 2, 3, 0));

        let left_and_up = Neighborhood {
            left: Some(rgb(10, 10, 10)),
            up: Some(rgb(20, 30, 40)),
            ..Default::default()
        };
        assert_eq!(predict(&left_and_up), rgb(15, 20, 25));
    }

    #[test]
    fn gather_ignores_unknown_and_off_grid_neighbors() {
        // 3x2 grid, only (0,0) and (2,1) known, centered on (1,0).
        let pixels = [1u32, 2, 3, 4, 5, 6];
        let known = |x: usize, y: usize| (x, y) == (0, 0) || (x, y) == (2, 1);
        let n = Neighborhood::gather(1, 0, 3, 2, known, |offset| pixels[offset]);
        assert_eq!(n.left, Some(1));
        assert_eq!(n.down_right, Some(6));
        assert_eq!(n.up, None);
        assert_eq!(n.right, None);
    }

    fn neighbor() -> impl Strategy<Value = Option<PackedPixel>> {
        prop::option::of(any::<u32>())
    }

    fn assert_rgb_within(p: PackedPixel, inputs: &[PackedPixel]) -> Result<(), TestCaseError> {
        for shift in [BLUE_SHIFT, GREEN_SHIFT, RED_SHIFT] {
            let lo = inputs.iter().map(|&q| lane(q, shift)).min().unwrap_or(0);
            let hi = inputs.iter().map(|&q| lane(q, shift)).max().unwrap_or(0);
            prop_assert!(lane(p, shift) >= lo && lane(p, shift) <= hi);
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn prop_horizontal_pair_averages_without_a_vertical_pair(
            a in any::<u32>(), b in any::<u32>(), u in neighbor(),
            ul in neighbor(), ur in neighbor(), dl in neighbor(), dr in neighbor()
        ) {
            let n = Neighborhood {
                up_left: ul, up: u, up_right: ur, left: Some(a),
                right: Some(b), down_left: dl, down: None, down_right: dr,
            };
            let p = predict(&n);
            prop_assert_eq!(p, average_pixels(a, b));
            prop_assert_eq!(p >> 24, 0);
            assert_rgb_within(p, &[a, b])?;
        }

        #[test]
        fn prop_vertical_pair_averages_without_a_horizontal_pair(
            a in any::<u32>(), b in any::<u32>(), side in neighbor(), on_left in any::<bool>(),
            ul in neighbor(), ur in neighbor(), dl in neighbor(), dr in neighbor()
        ) {
            let (left, right) = if on_left { (side, None) } else { (None, side) };
            let n = Neighborhood {
                up_left: ul, up: Some(a), up_right: ur, left,
                right, down_left: dl, down: Some(b), down_right: dr,
            };
            let p = predict(&n);
            prop_assert_eq!(p, average_pixels(a, b));
            prop_assert_eq!(p >> 24, 0);
            assert_rgb_within(p, &[a, b])?;
        }

        #[test]
        fn prop_lone_corners_use_gradclamp(
            corner in 0usize..4, h in any::<u32>(), v in any::<u32>(), diag in any::<u32>(),
            others in prop::collection::vec(neighbor(), 3)
        ) {
            // Exactly one horizontal and one vertical neighbor, so no axis pair
            // exists. The diagonal between them completes the corner; the other
            // diagonals are arbitrary.
            let mut diagonals = [None; 4];
            let mut rest = others.into_iter();
            for (index, slot) in diagonals.iter_mut().enumerate() {
                *slot = if index == corner { Some(diag) } else { rest.next().flatten() };
            }
            let (left, right) = if corner % 2 == 0 { (Some(h), None) } else { (None, Some(h)) };
            let (up, down) = if corner < 2 { (Some(v), None) } else { (None, Some(v)) };
            let n = Neighborhood {
                up_left: diagonals[0], up_right: diagonals[1],
                down_left: diagonals[2], down_right: diagonals[3],
                left, right, up, down,
            };
            let p = predict(&n);
            prop_assert_eq!(p & RGB_MASK, gradclamp_predict_pixel(h, v, diag) & RGB_MASK);
            assert_rgb_within(p, &[h, v, diag])?;
        }

        #[test]
        fn prop_prediction_stays_within_the_known_neighbors(
            ul in neighbor(), u in neighbor(), ur in neighbor(), l in neighbor(),
            r in neighbor(), dl in neighbor(), d in neighbor(), dr in neighbor()
        ) {
            prop_assume!(l.is_some() || r.is_some() || u.is_some() || d.is_some());
            let n = Neighborhood {
                up_left: ul, up: u, up_right: ur, left: l,
                right: r, down_left: dl, down: d, down_right: dr,
            };
            let known: Vec<PackedPixel> = [ul, u, ur, l, r, dl, d, dr].into_iter().flatten().collect();
            assert_rgb_within(predict(&n), &known)?;
        }
    }
}
