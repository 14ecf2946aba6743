/// Width of the canvas the GOTURN regressor consumes.
///
/// Both the target crop and the search crop are resized to this size
/// before being packed into the input tensors.
pub const NETWORK_INPUT_WIDTH: u32 = 227;

/// Height of the canvas the GOTURN regressor consumes.
pub const NETWORK_INPUT_HEIGHT: u32 = 227;

/// Extent of the network output frame.
///
/// The regressor emits `x1 y1 x2 y2` in `[0, SCALE_FACTOR]`, relative to
/// the crop it was fed. Unscaling divides by this value and multiplies by
/// the crop's pixel size.
pub const SCALE_FACTOR: f32 = 10.0;

/// How many box sizes of context the target crop carries.
///
/// A factor of 2 leaves half a box of surrounding pixels on every side of
/// the tracked object.
pub const CONTEXT_FACTOR: f32 = 2.0;

/// Per-channel mean subtracted from the network input, in BGR order.
pub const MEAN_BGR: [f32; 3] = [104.0, 117.0, 123.0];

/// Number of color channels in the input image.
pub const INPUT_CHANNELS: usize = 3;

/// Batch size for model inference.
pub const BATCH_SIZE: usize = 1;

/// Four box coordinates in the regressor output.
pub const OUTPUT_SIZE: [usize; 2] = [BATCH_SIZE, 4];

pub const TARGET_IMAGE: &str = "target.jpg";
pub const SEARCH_IMAGE: &str = "search.jpg";
pub const TARGET_GROUND_TRUTH: &str = "target_gt.txt";
pub const SEARCH_GROUND_TRUTH: &str = "search_gt.txt";
pub const TARGET_RESULT: &str = "target_goturn.jpg";
pub const SEARCH_RESULT: &str = "search_goturn.jpg";
pub const CROPPED_RESULT: &str = "result.jpg";

pub const WINDOW_TITLE: &str = "Regressor Test";

/// Height of the title bar above the side-by-side review images.
pub const TITLE_PADDING: u32 = 50;

pub const TITLE_FONT_SIZE: f32 = 24.0;

pub const REVIEW_BACKGROUND: [u8; 3] = [128, 128, 128];
pub const TITLE_COLOR: [u8; 3] = [255, 255, 0];
pub const GROUND_TRUTH_COLOR: [u8; 3] = [255, 255, 255];
pub const ESTIMATE_COLOR: [u8; 3] = [255, 0, 0];

pub const DEFAULT_MODEL_PATH: &str = "nets/tracker.onnx";
pub const DEFAULT_FONT_PATH: &str = "fonts/DejaVuSans.ttf";
