use std::path::PathBuf;

use glam::Vec2;
use image::{RgbImage, imageops::FilterType};
use ndarray::prelude::*;
use ort::{
    session::{Session, builder::SessionBuilder},
    value::TensorRef,
};
use snafu::{OptionExt, ResultExt, ensure};
use tracing::*;

use crate::{
    analysis::bbox::{Bbox, Network},
    consts::DEFAULT_MODEL_PATH,
    error::*,
    inference::{
        goturn::model::{Goturn, GoturnConfig, GoturnInput, GoturnOutput, GoturnTensor},
        model::{Device, Model, OnnxSession, Regressor, session_builder},
    },
};

/// How to bring up the regressor.
#[derive(Clone, Debug, PartialEq)]
pub struct RegressorConfig {
    /// Exported network definition.
    pub model_file: PathBuf,
    /// Trained weights; replaces `model_file` as the loaded file when set.
    pub trained_file: Option<PathBuf>,
    /// Negative runs on the CPU.
    pub gpu_id: i32,
    pub do_train: bool,
    pub intra_threads: usize,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            model_file: PathBuf::from(DEFAULT_MODEL_PATH),
            trained_file: None,
            gpu_id: 0,
            do_train: false,
            intra_threads: 4,
        }
    }
}

pub struct GoturnSession<M: Model> {
    session: Session,
    model: M,
}

impl GoturnSession<Goturn> {
    pub fn new(session: SessionBuilder, model: Goturn) -> Result<Self, TrackerError> {
        let session = session
            .commit_from_file(model.path())
            .context(OrtInitSnafu { stage: "commit" })?;

        debug!(
            "{} inputs {:?}, outputs {:?}",
            Goturn::MODEL_NAME,
            session.inputs.iter().map(|i| &i.name).collect::<Vec<_>>(),
            session.outputs.iter().map(|o| &o.name).collect::<Vec<_>>()
        );

        Ok(Self { session, model })
    }

    /// Builds the session described by `config`.
    pub fn open(config: &RegressorConfig) -> Result<Self, TrackerError> {
        ensure!(
            !config.do_train,
            UnsupportedSnafu {
                message: "training mode is not available for the regressor test",
            }
        );

        let path = config.trained_file.as_ref().unwrap_or(&config.model_file);
        info!(
            "loading {} from {} (gpu id {})",
            Goturn::MODEL_NAME,
            path.display(),
            config.gpu_id
        );

        let builder = session_builder(Device::from_gpu_id(config.gpu_id), config.intra_threads)?;
        Self::new(builder, Goturn::new(path, GoturnConfig::default()))
    }
}

impl OnnxSession<Goturn> for GoturnSession<Goturn> {
    type Output = Bbox<Network>;

    fn preprocess(
        &self,
        search: &RgbImage,
        target: &RgbImage,
    ) -> Result<<Goturn as Model>::Input, TrackerError> {
        let model_config = self.model.config();

        Ok(GoturnInput {
            search: image_to_tensor(search, model_config),
            target: image_to_tensor(target, model_config),
        })
    }

    fn postprocess(&self, output: <Goturn as Model>::Output) -> Result<Self::Output, TrackerError> {
        Ok(output_to_bbox(&output))
    }

    fn infer(
        &mut self,
        input: <Goturn as Model>::Input,
    ) -> Result<<Goturn as Model>::Output, TrackerError> {
        let model_config = self.model.config();

        let output = self
            .session
            .run(ort::inputs![
                model_config.search_input_name.as_str() => TensorRef::from_array_view(&input.search).context(TensorSnafu{stage: "search"})?,
                model_config.target_input_name.as_str() => TensorRef::from_array_view(&input.target).context(TensorSnafu{stage: "target"})?
            ])
            .context(InferenceSnafu {})?;

        let output_name = model_config.output_name.as_str();
        let tensor = output
            .get(output_name)
            .context(NotFoundOutputSnafu { output_name })?
            .try_extract_array::<f32>()
            .context(TensorSnafu { stage: "extract" })?;

        let output = tensor
            .to_shape(model_config.output_size)
            .context(ShapeSnafu { stage: "output" })?
            .to_owned();

        Ok(output)
    }
}

impl Regressor for GoturnSession<Goturn> {
    fn regress(
        &mut self,
        search_origin: &RgbImage,
        search_cropped: &RgbImage,
        target_cropped: &RgbImage,
    ) -> Result<Bbox<Network>, TrackerError> {
        trace!(
            "regress search {:?} (from {:?}) against target {:?}",
            search_cropped.dimensions(),
            search_origin.dimensions(),
            target_cropped.dimensions()
        );

        self.run(search_cropped, target_cropped)
    }
}

/// Resizes a crop to the network canvas and packs it as a mean-subtracted
/// BGR tensor in NCHW order.
fn image_to_tensor(image: &RgbImage, config: &GoturnConfig) -> GoturnTensor {
    let resized = image::imageops::resize(
        image,
        config.required_width as u32,
        config.required_height as u32,
        FilterType::Triangle,
    );

    let mut input_tensor = Array4::zeros([
        config.batch_size,
        config.input_channels,
        config.required_height,
        config.required_width,
    ]);

    for (x, y, pixel) in resized.enumerate_pixels() {
        let x = x as usize;
        let y = y as usize;
        let [r, g, b] = pixel.0;
        input_tensor[[0, 0, y, x]] = b as f32 - config.mean[0];
        input_tensor[[0, 1, y, x]] = g as f32 - config.mean[1];
        input_tensor[[0, 2, y, x]] = r as f32 - config.mean[2];
    }

    input_tensor
}

/// First row of the output as `x1 y1 x2 y2`, kept as emitted.
fn output_to_bbox(output: &GoturnOutput) -> Bbox<Network> {
    let row = output.row(0);
    Bbox::new(Vec2::new(row[0], row[1]), Vec2::new(row[2], row[3]))
}

#[cfg(test)]
mod tests {
    use image::Rgb;
    use ndarray::array;

    use super::*;

    #[test]
    fn test_image_to_tensor_shape_and_mean() {
        let config = GoturnConfig::default();
        let image = RgbImage::from_pixel(50, 30, Rgb([200, 100, 10]));

        let tensor = image_to_tensor(&image, &config);
        assert_eq!(tensor.shape(), &[1, 3, 227, 227]);

        // Channels are BGR with the mean removed
        assert_eq!(tensor[[0, 0, 100, 100]], 10.0 - 104.0);
        assert_eq!(tensor[[0, 1, 100, 100]], 100.0 - 117.0);
        assert_eq!(tensor[[0, 2, 100, 100]], 200.0 - 123.0);
    }

    #[test]
    fn test_image_to_tensor_custom_size() {
        let config = GoturnConfig {
            required_width: 8,
            required_height: 4,
            mean: [0.0; 3],
            ..GoturnConfig::default()
        };
        let image = RgbImage::from_fn(16, 8, |x, _| {
            if x < 8 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        });

        let tensor = image_to_tensor(&image, &config);
        assert_eq!(tensor.shape(), &[1, 3, 4, 8]);
        // Left half red lands in the last (R) channel
        assert_eq!(tensor[[0, 2, 0, 0]], 255.0);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
        // Right half blue lands in the first (B) channel
        assert_eq!(tensor[[0, 0, 3, 7]], 255.0);
    }

    #[test]
    fn test_output_to_bbox_keeps_raw_order() {
        let output = array![[1.0, 2.0, 7.5, 8.25]];
        let bbox = output_to_bbox(&output);
        assert_eq!(bbox.corners(), [1.0, 2.0, 7.5, 8.25]);

        // Reversed outputs are not reordered here
        let reversed = array![[6.0, 6.0, 3.0, 3.0]];
        assert_eq!(output_to_bbox(&reversed).corners(), [6.0, 6.0, 3.0, 3.0]);
    }

    #[test]
    fn test_open_rejects_training_mode() {
        let config = RegressorConfig {
            do_train: true,
            ..RegressorConfig::default()
        };
        assert!(matches!(
            GoturnSession::open(&config),
            Err(TrackerError::Unsupported { .. })
        ));
    }
}
