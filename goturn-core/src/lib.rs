pub mod analysis;
pub mod consts;
pub mod crop;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod inference;
pub mod review;

// Re-export commonly used types
pub use analysis::{
    bbox::{Bbox, Cropped, Network, Original, Space},
    transform::CropPlacement,
};
pub use crop::{Crop, CropStrategy};
pub use evaluate::{Evaluator, InputMode};
pub use review::{Reviewer, Viewer};
