use glam::Vec2;
use image::{RgbImage, imageops};
use tracing::*;

use crate::{
    analysis::{
        bbox::{Bbox, Original},
        transform::CropPlacement,
    },
    consts::CONTEXT_FACTOR,
};

/// A fixed-size canvas cut out of a source image.
///
/// The canvas is always a fresh allocation of exactly the requested size;
/// it never aliases the source.
#[derive(Clone, Debug)]
pub struct Crop {
    pub image: RgbImage,
    pub placement: CropPlacement,
}

impl Crop {
    fn blank(output_width: u32, output_height: u32, origin: Vec2) -> Self {
        Self {
            image: RgbImage::new(output_width, output_height),
            placement: CropPlacement::new(
                origin,
                Vec2::new(output_width as f32, output_height as f32),
            ),
        }
    }
}

/// How a region of interest is placed on the output canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropStrategy {
    /// Box centered on the canvas, black where the source runs out.
    CenteredPad,
    /// Canvas anchored on the box edge nearest the image border.
    LessPad,
}

impl CropStrategy {
    pub fn crop(
        &self,
        bbox: &Bbox<Original>,
        image: &RgbImage,
        output_width: u32,
        output_height: u32,
    ) -> Crop {
        match self {
            CropStrategy::CenteredPad => crop_pad_image(bbox, image, output_width, output_height),
            CropStrategy::LessPad => crop_less_pad_image(bbox, image, output_width, output_height),
        }
    }
}

/// Quadrant of the box center relative to the image center.
///
/// Ties go to the right and bottom quadrants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft,
    BottomLeft,
    TopRight,
    BottomRight,
}

impl Quadrant {
    pub fn classify(center: (i64, i64), image_center: (i64, i64)) -> Self {
        let left = center.0 < image_center.0;
        let top = center.1 < image_center.1;

        match (left, top) {
            (true, true) => Quadrant::TopLeft,
            (true, false) => Quadrant::BottomLeft,
            (false, true) => Quadrant::TopRight,
            (false, false) => Quadrant::BottomRight,
        }
    }
}

/// Source rectangle copied to the top-left corner of a less-pad canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiPlan {
    pub quadrant: Quadrant,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Canvas size for a target crop: the box plus its context, at least one
/// pixel and at most `CONTEXT_FACTOR` times the source on each axis.
pub fn context_size(bbox: &Bbox<Original>, image: &RgbImage) -> (u32, u32) {
    fn side(length: f32, limit: u32) -> u32 {
        let limit = (CONTEXT_FACTOR * limit as f32).max(1.0);
        // NaN falls through `clamp` and is saturated to 0 by the cast
        ((CONTEXT_FACTOR * length).round().clamp(1.0, limit) as u32).max(1)
    }

    (
        side(bbox.width(), image.width()),
        side(bbox.height(), image.height()),
    )
}

/// Computes the less-pad region of interest in integer pixels.
///
/// The result always lies inside the source:
/// `x + width <= source_width` and `y + height <= source_height`.
pub fn plan_less_pad_roi(
    bbox: &Bbox<Original>,
    source_width: u32,
    source_height: u32,
    output_width: u32,
    output_height: u32,
) -> RoiPlan {
    let source_width = source_width as i64;
    let source_height = source_height as i64;
    let output_width = output_width as i64;
    let output_height = output_height as i64;

    let center = (bbox.center_x() as i64, bbox.center_y() as i64);
    let image_center = (source_width / 2, source_height / 2);
    let quadrant = Quadrant::classify(center, image_center);

    let x1 = bbox.x1() as i64;
    let y1 = bbox.y1() as i64;
    let x2 = bbox.x2() as i64;
    let y2 = bbox.y2() as i64;

    let (roi_x, roi_y) = match quadrant {
        Quadrant::TopLeft => (x1, y1),
        Quadrant::BottomLeft => (x1, (y2 - output_height).max(0)),
        Quadrant::TopRight => ((x2 - output_width).max(0), y1),
        Quadrant::BottomRight => ((x2 - output_width).max(0), (y2 - output_height).max(0)),
    };

    let roi_x = roi_x.clamp(0, source_width);
    let roi_y = roi_y.clamp(0, source_height);

    // A box entirely past the source gives an empty ROI, even where the
    // unclamped corner walk would still reach back into the image.
    let (roi_width, roi_height) = if bbox.is_outside(source_width as u32, source_height as u32) {
        (0, 0)
    } else {
        (
            output_width.min(source_width - roi_x),
            output_height.min(source_height - roi_y),
        )
    };

    RoiPlan {
        quadrant,
        x: roi_x as u32,
        y: roi_y as u32,
        width: roi_width as u32,
        height: roi_height as u32,
    }
}

/// Centers `bbox` on an `output_width × output_height` canvas.
///
/// Canvas pixels the source does not cover stay black.
pub fn crop_pad_image(
    bbox: &Bbox<Original>,
    image: &RgbImage,
    output_width: u32,
    output_height: u32,
) -> Crop {
    let source_width = image.width() as i64;
    let source_height = image.height() as i64;

    let center = bbox.center();
    let roi_x = (center.x - output_width as f32 / 2.0).floor() as i64;
    let roi_y = (center.y - output_height as f32 / 2.0).floor() as i64;

    let mut crop = Crop::blank(
        output_width,
        output_height,
        Vec2::new(roi_x as f32, roi_y as f32),
    );

    let src_x0 = roi_x.clamp(0, source_width);
    let src_y0 = roi_y.clamp(0, source_height);
    let src_x1 = (roi_x + output_width as i64).clamp(0, source_width);
    let src_y1 = (roi_y + output_height as i64).clamp(0, source_height);

    if src_x1 > src_x0 && src_y1 > src_y0 {
        let region = imageops::crop_imm(
            image,
            src_x0 as u32,
            src_y0 as u32,
            (src_x1 - src_x0) as u32,
            (src_y1 - src_y0) as u32,
        )
        .to_image();
        imageops::replace(&mut crop.image, &region, src_x0 - roi_x, src_y0 - roi_y);
    } else {
        debug!("centered crop of {:?} does not cover the source", bbox.corners());
    }

    crop
}

/// Picks an output-sized region around `bbox` that wastes as little of the
/// canvas on black padding as possible.
///
/// The box center is compared with the image center; the canvas is then
/// anchored so that the box edge nearest the image border sits flush with
/// the canvas edge and the rest of the canvas extends into the image
/// interior. The covered region is copied to the canvas's top-left corner.
/// A source smaller than the canvas, or a box away from the source, yields
/// a partially or fully black canvas, never an error.
pub fn crop_less_pad_image(
    bbox: &Bbox<Original>,
    image: &RgbImage,
    output_width: u32,
    output_height: u32,
) -> Crop {
    let roi = plan_less_pad_roi(
        bbox,
        image.width(),
        image.height(),
        output_width,
        output_height,
    );
    trace!("less-pad roi {:?}", roi);

    let mut crop = Crop::blank(
        output_width,
        output_height,
        Vec2::new(roi.x as f32, roi.y as f32),
    );

    if roi.width > 0 && roi.height > 0 {
        let region = imageops::crop_imm(image, roi.x, roi.y, roi.width, roi.height).to_image();
        imageops::replace(&mut crop.image, &region, 0, 0);
    }

    crop
}
