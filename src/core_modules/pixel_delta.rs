// THEORY:
// The `pixel_delta` module holds the arithmetic every predictor in the crate is
// built from. It answers two questions: "what is the difference between these
// two pixels?" and "how expensive is that difference?".
//
// Key architectural principles:
// 1.  **Lane-Wise Modular Arithmetic**: A delta is itself a packed pixel. Each
//     8-bit lane holds `(c2 - c1) mod 256`, which read back as a signed byte is the
//     true signed difference. `component_sum` undoes `component_delta` exactly, so a
//     decoder holding the prediction can always recover the original pixel.
// 2.  **A Scalar Cost**: The traversal needs one number per edge to order its
//     frontier. `sum_of_abs_components` collapses a packed delta into the sum of the
//     per-lane magnitudes (at most 3 * 128 for RGB), which is the cost stored in the
//     edge caches and used as a frontier priority.
// 3.  **Absent, Not Zero**: Neighborhood averaging distinguishes "no value" from
//     "a value of zero". Optional inputs are modeled as `Option<u32>` so that a
//     missing row never drags an average toward zero.

pub mod pixel_delta {
    use crate::core_modules::pixel::pixel::*;

    pub type PackedDelta = u32;
    pub type EdgeCost = u32;

    pub const RGB_COMPONENTS: usize = 3;
    pub const RGBA_COMPONENTS: usize = 4;

    /// Largest possible RGB edge cost: three lanes of magnitude 128.
    pub const MAX_RGB_EDGE_COST: EdgeCost = 3 * 128;

    /// Per-lane `(p2 - p1) mod 256` over the first `num_components` lanes.
    /// Lanes past `num_components` are zero in the result.
    pub fn component_delta_n(p1: PackedPixel, p2: PackedPixel, num_components: usize) -> PackedDelta {
        let mut delta = 0u32;
        for index in 0..num_components {
            let shift = (index as u32) * 8;
            let c1 = lane(p1, shift);
            let c2 = lane(p2, shift);
            delta |= (c2.wrapping_sub(c1) as u32) << shift;
        }
        delta
    }

    /// RGB delta from `p1` to `p2`; alpha is zeroed.
    #[inline]
    pub fn component_delta(p1: PackedPixel, p2: PackedPixel) -> PackedDelta {
        component_delta_n(p1, p2, RGB_COMPONENTS)
    }

    /// Per-lane `(p + d) mod 256`, the inverse of `component_delta_n`.
    pub fn component_sum_n(pixel: PackedPixel, delta: PackedDelta, num_components: usize) -> PackedPixel {
        let mut sum = 0u32;
        for index in 0..num_components {
            let shift = (index as u32) * 8;
            let c = lane(pixel, shift);
            let d = lane(delta, shift);
            sum |= (c.wrapping_add(d) as u32) << shift;
        }
        sum
    }

    #[inline]
    pub fn component_sum(pixel: PackedPixel, delta: PackedDelta) -> PackedPixel {
        component_sum_n(pixel, delta, RGB_COMPONENTS)
    }

    #[inline]
    pub fn unsigned_byte_to_signed(byte: u8) -> i8 {
        byte as i8
    }

    /// Replaces each RGB lane with its signed-byte magnitude. Alpha becomes zero.
    pub fn abs_of_each_component(delta: PackedDelta) -> PackedDelta {
        let mut out = 0u32;
        for index in 0..RGB_COMPONENTS {
            let shift = (index as u32) * 8;
            let magnitude = unsigned_byte_to_signed(lane(delta, shift)).unsigned_abs();
            out |= (magnitude as u32) << shift;
        }
        out
    }

    /// Sum of the signed-byte magnitudes of the first `num_components` lanes.
    pub fn sum_of_abs_components_n(delta: PackedDelta, num_components: usize) -> u32 {
        (0..num_components)
            .map(|index| unsigned_byte_to_signed(component(delta, index)).unsigned_abs() as u32)
            .sum()
    }

    #[inline]
    pub fn sum_of_abs_components(delta: PackedDelta) -> u32 {
        sum_of_abs_components_n(delta, RGB_COMPONENTS)
    }

    /// Cost of the edge between two RGB pixels.
    #[inline]
    pub fn rgb_edge_cost(p1: PackedPixel, p2: PackedPixel) -> EdgeCost {
        if p1 == p2 {
            return 0;
        }
        sum_of_abs_components(component_delta(p1, p2))
    }

    #[inline]
    pub fn fast_div_2(value: u32) -> u32 {
        value >> 1
    }

    /// `value / 3` by multiply and shift. Exact for 0..=1025.
    #[inline]
    pub fn fast_div_3(value: u32) -> u32 {
        ((value + 1) * 341) >> 10
    }

    #[inline]
    pub fn fast_ave_2(a: u32, b: u32) -> u32 {
        (a + b) >> 1
    }

    /// Average of zero, one or two optional values.
    #[inline]
    pub fn average_012(v1: Option<u32>, v2: Option<u32>) -> Option<u32> {
        match (v1, v2) {
            (None, None) => None,
            (Some(v), None) | (None, Some(v)) => Some(v),
            (Some(a), Some(b)) => Some(fast_ave_2(a, b)),
        }
    }

    /// Gradient predictor `a + b - c` clamped to the range spanned by its inputs.
    #[inline]
    pub fn gradclamp_predict(a: u8, b: u8, c: u8) -> u8 {
        let min = a.min(b).min(c) as i32;
        let max = a.max(b).max(c) as i32;
        let grad = a as i32 + b as i32 - c as i32;
        grad.clamp(min, max) as u8
    }

    /// `gradclamp_predict` applied to all four lanes.
    pub fn gradclamp_predict_pixel(a: PackedPixel, b: PackedPixel, c: PackedPixel) -> PackedPixel {
        let mut out = 0u32;
        for index in 0..RGBA_COMPONENTS {
            let shift = (index as u32) * 8;
            let predicted = gradclamp_predict(lane(a, shift), lane(b, shift), lane(c, shift));
            out |= (predicted as u32) << shift;
        }
        out
    }

    /// Scanline gradient-clamp prediction errors for a whole image.
    ///
    /// Each pixel is predicted from its left, up and up-left neighbors (missing
    /// neighbors read as zero) and the error is the four-lane delta from the
    /// prediction to the actual pixel. Serves as the baseline the adaptive
    /// traversal is compared against.
    pub fn gradclamp_prediction_errors(pixels: &[PackedPixel], width: usize, height: usize) -> Vec<PackedDelta> {
        let mut errors = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let offset = y * width + x;
                let left = if x > 0 { pixels[offset - 1] } else { 0 };
                let up = if y > 0 { pixels[offset - width] } else { 0 };
                let up_left = if x > 0 && y > 0 { pixels[offset - width - 1] } else { 0 };
                let prediction = gradclamp_predict_pixel(left, up, up_left);
                errors.push(component_delta_n(prediction, pixels[offset], RGBA_COMPONENTS));
            }
        }
        errors
    }
}
