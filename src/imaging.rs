//! On-demand image generation with a fixed fallback asset.

pub mod pipeline;
pub mod store;

pub use pipeline::{ImageOutcome, ImagePipeline};
pub use store::ImageStore;
