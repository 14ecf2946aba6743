use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Dim, OwnedRepr};

use crate::{
    consts::{
        BATCH_SIZE, DEFAULT_MODEL_PATH, INPUT_CHANNELS, MEAN_BGR, NETWORK_INPUT_HEIGHT,
        NETWORK_INPUT_WIDTH, OUTPUT_SIZE,
    },
    inference::model::Model,
};

pub type GoturnTensor = ArrayBase<OwnedRepr<f32>, Dim<[usize; 4]>>;
pub type GoturnOutput = ArrayBase<OwnedRepr<f32>, Dim<[usize; 2]>>;

/// Search and target tensors, fed side by side.
pub struct GoturnInput {
    pub search: GoturnTensor,
    pub target: GoturnTensor,
}

/// GOTURN regressor exported to ONNX.
pub struct Goturn {
    path: PathBuf,
    config: GoturnConfig,
}

pub struct GoturnConfig {
    pub required_width: usize,
    pub required_height: usize,
    pub batch_size: usize,
    pub input_channels: usize,
    /// BGR mean subtracted from every pixel
    pub mean: [f32; 3],
    pub output_size: [usize; 2],
    pub search_input_name: String,
    pub target_input_name: String,
    pub output_name: String,
}

impl Default for GoturnConfig {
    fn default() -> Self {
        Self {
            required_width: NETWORK_INPUT_WIDTH as usize,
            required_height: NETWORK_INPUT_HEIGHT as usize,
            batch_size: BATCH_SIZE,
            input_channels: INPUT_CHANNELS,
            mean: MEAN_BGR,
            output_size: OUTPUT_SIZE,
            search_input_name: "image".to_string(),
            target_input_name: "target".to_string(),
            output_name: "fc8".to_string(),
        }
    }
}

impl Goturn {
    pub fn new(path: impl Into<PathBuf>, config: GoturnConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }
}

impl Default for Goturn {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH, GoturnConfig::default())
    }
}

impl Model for Goturn {
    type Input = GoturnInput;
    type Output = GoturnOutput;
    type Config = GoturnConfig;

    const MODEL_NAME: &'static str = "goturn";

    fn path(&self) -> &Path {
        &self.path
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}
