pub mod box_predictor;
pub mod error_stats;
pub mod frontier;
pub mod grid_cache;
pub mod neighbor_predictor;
pub mod palette;
pub mod pixel;
pub mod pixel_delta;
pub mod traversal;
pub mod wrapped_delta;

pub mod utils {
    pub mod image_helper;
}
