//! Transforms between the coordinate spaces of a [`Bbox`].
//!
//! ```text
//!  Original --to_cropped(placement)--> Cropped --to_network(crop)--> Network
//!  Original <--to_original(placement)-- Cropped <----unscale(crop)--- Network
//! ```

use glam::Vec2;
use image::RgbImage;
use serde::Serialize;

use crate::{
    analysis::bbox::{Bbox, Cropped, Network, Original},
    consts::SCALE_FACTOR,
};

/// Where a crop canvas sits in its source image.
///
/// `origin` is the original-image coordinate that lands on canvas pixel
/// `(0, 0)`. It can be negative when the canvas hangs over the top or left
/// border of the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CropPlacement {
    pub origin: Vec2,
    /// canvas size in pixels
    pub size: Vec2,
}

impl CropPlacement {
    pub fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }
}

/// Scale that maps the `[0, SCALE_FACTOR]` network frame onto `reference`.
fn network_scale(reference: &RgbImage) -> Vec2 {
    Vec2::new(reference.width() as f32, reference.height() as f32) / SCALE_FACTOR
}

impl Bbox<Network> {
    /// Maps a regressor output into the pixel space of the crop it was
    /// estimated from.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use image::RgbImage;
    /// use goturn_core::analysis::bbox::{Bbox, Network};
    /// let crop = RgbImage::new(200, 100);
    /// let raw = Bbox::<Network>::new(Vec2::new(2.5, 2.5), Vec2::new(7.5, 7.5));
    /// let unscaled = raw.unscale(&crop);
    /// assert_eq!(unscaled.min, Vec2::new(50.0, 25.0));
    /// assert_eq!(unscaled.max, Vec2::new(150.0, 75.0));
    /// ```
    pub fn unscale(&self, reference: &RgbImage) -> Bbox<Cropped> {
        let scale = network_scale(reference);
        Bbox::new(self.min * scale, self.max * scale)
    }
}

impl Bbox<Cropped> {
    /// Inverse of `unscale`: maps a crop-space box into the network frame.
    pub fn to_network(&self, reference: &RgbImage) -> Bbox<Network> {
        let scale = network_scale(reference);
        Bbox::new(self.min / scale, self.max / scale)
    }

    /// Moves a crop-space box back into the source image it was cut from.
    pub fn to_original(&self, placement: &CropPlacement) -> Bbox<Original> {
        Bbox::new(self.min + placement.origin, self.max + placement.origin)
    }
}

impl Bbox<Original> {
    /// Expresses a source-image box relative to a crop canvas.
    pub fn to_cropped(&self, placement: &CropPlacement) -> Bbox<Cropped> {
        Bbox::new(self.min - placement.origin, self.max - placement.origin)
    }
}
