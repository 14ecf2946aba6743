use std::path::Path;

use image::RgbImage;
use ort::{
    execution_providers::CPUExecutionProvider,
    session::{
        Session,
        builder::{GraphOptimizationLevel, SessionBuilder},
    },
};
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::bbox::{Bbox, Network},
    error::{OrtInitSnafu, TrackerError},
};

pub trait Model {
    type Input;
    type Output;
    type Config;

    const MODEL_NAME: &'static str;

    /// File the session is committed from.
    fn path(&self) -> &Path;
    fn config(&self) -> &Self::Config;
}

/// A model that consumes a search crop and a target crop.
pub trait OnnxSession<M: Model> {
    type Output;

    fn preprocess(&self, search: &RgbImage, target: &RgbImage) -> Result<M::Input, TrackerError>;

    fn postprocess(&self, output: M::Output) -> Result<Self::Output, TrackerError>;

    fn infer(&mut self, input: M::Input) -> Result<M::Output, TrackerError>;

    fn run(&mut self, search: &RgbImage, target: &RgbImage) -> Result<Self::Output, TrackerError> {
        let input = self.preprocess(search, target)?;

        let output = self.infer(input)?;

        self.postprocess(output)
    }
}

/// Estimates where the target moved to inside the search crop.
///
/// `search_origin` is the full search frame the crop was cut from. The
/// returned box lives in the regressor's network frame and has to be
/// unscaled against `search_cropped`.
pub trait Regressor {
    fn regress(
        &mut self,
        search_origin: &RgbImage,
        search_cropped: &RgbImage,
        target_cropped: &RgbImage,
    ) -> Result<Bbox<Network>, TrackerError>;
}

/// Compute device for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu(i32),
}

impl Device {
    /// Negative ids select the CPU.
    pub fn from_gpu_id(gpu_id: i32) -> Self {
        if gpu_id < 0 {
            Device::Cpu
        } else {
            Device::Gpu(gpu_id)
        }
    }
}

/// common session builder
pub fn session_builder(device: Device, intra_threads: usize) -> Result<SessionBuilder, TrackerError> {
    let mut providers = Vec::new();

    if let Device::Gpu(_gpu_id) = device {
        #[cfg(feature = "tensorrt")]
        {
            use ort::execution_providers::TensorRTExecutionProvider;
            providers.push(
                TensorRTExecutionProvider::default()
                    .with_device_id(_gpu_id)
                    .build(),
            );
        }
        #[cfg(feature = "cuda")]
        {
            use ort::execution_providers::CUDAExecutionProvider;
            providers.push(CUDAExecutionProvider::default().with_device_id(_gpu_id).build());
        }
        #[cfg(not(any(feature = "cuda", feature = "tensorrt")))]
        warn!("gpu {} requested but no gpu provider is compiled in, using cpu", _gpu_id);
    }
    providers.push(CPUExecutionProvider::default().build());

    let session_builder = Session::builder()
        .context(OrtInitSnafu { stage: "builder" })?
        .with_execution_providers(providers)
        .context(OrtInitSnafu { stage: "provider" })?
        .with_optimization_level(GraphOptimizationLevel::Level1)
        .context(OrtInitSnafu {
            stage: "optimization",
        })?
        .with_intra_threads(intra_threads)
        .context(OrtInitSnafu {
            stage: "intra-threads",
        })?;

    Ok(session_builder)
}
