use std::{fmt, marker::PhantomData};

use glam::Vec2;
use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};
use serde::Serialize;

/// Coordinate space a [`Bbox`] lives in.
///
/// Boxes of different spaces are different types, so passing a network
/// output where an image-space box is expected does not compile. The only
/// way across is one of the transforms in [`crate::analysis::transform`].
pub trait Space: Clone + Copy + fmt::Debug + Default + PartialEq {
    const NAME: &'static str;
}

/// Pixel space of a full-resolution source image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Original;

/// Pixel space of a fixed-size crop produced by the crop engine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cropped;

/// Frame emitted by the regressor, `[0, SCALE_FACTOR]` on both axes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Network;

impl Space for Original {
    const NAME: &'static str = "original";
}

impl Space for Cropped {
    const NAME: &'static str = "cropped";
}

impl Space for Network {
    const NAME: &'static str = "network";
}

/// A 2D axis-aligned bounding box represented by minimum and maximum points.
///
/// The type parameter tags the coordinate space the box was produced in.
/// Transforms always return a new box; nothing mutates a box across spaces.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(bound = "")]
pub struct Bbox<S: Space> {
    /// The minimum point of the bounding box (top-left corner in image space).
    pub min: Vec2,
    /// The maximum point of the bounding box (bottom-right corner in image space).
    pub max: Vec2,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: Space> Bbox<S> {
    /// Creates a new bounding box from minimum and maximum points.
    ///
    /// The points are stored as given. Use [`Bbox::from_corners`] when the
    /// corner order is not known.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use goturn_core::analysis::bbox::{Bbox, Original};
    /// let bbox = Bbox::<Original>::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0));
    /// assert_eq!(bbox.width(), 10.0);
    /// ```
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min,
            max,
            space: PhantomData,
        }
    }

    /// Creates a bounding box from two opposite corners given in any order.
    ///
    /// The result always satisfies `x1 <= x2` and `y1 <= y2`.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use goturn_core::analysis::bbox::{Bbox, Original};
    /// let bbox = Bbox::<Original>::from_corners(50.0, 50.0, 10.0, 10.0);
    /// assert_eq!(bbox.min, Vec2::new(10.0, 10.0));
    /// assert_eq!(bbox.max, Vec2::new(50.0, 50.0));
    /// ```
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(
            Vec2::new(x1.min(x2), y1.min(y2)),
            Vec2::new(x1.max(x2), y1.max(y2)),
        )
    }

    /// Creates a new bounding box from a minimum point and size vector.
    pub fn new_from_min_size(min: Vec2, size: Vec2) -> Self {
        Self::new(min, min + size)
    }

    /// Creates a new bounding box from a center point and size vector.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use goturn_core::analysis::bbox::{Bbox, Original};
    /// let bbox = Bbox::<Original>::from_center_size(Vec2::new(100.0, 200.0), Vec2::new(50.0, 80.0));
    /// assert_eq!(bbox.min, Vec2::new(75.0, 160.0));
    /// assert_eq!(bbox.max, Vec2::new(125.0, 240.0));
    /// ```
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half_size = size / 2.0;
        Self::new(center - half_size, center + half_size)
    }

    pub fn x1(&self) -> f32 {
        self.min.x
    }

    pub fn y1(&self) -> f32 {
        self.min.y
    }

    pub fn x2(&self) -> f32 {
        self.max.x
    }

    pub fn y2(&self) -> f32 {
        self.max.y
    }

    /// `[x1, y1, x2, y2]`
    pub fn corners(&self) -> [f32; 4] {
        [self.min.x, self.min.y, self.max.x, self.max.y]
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Calculates the area of the bounding box.
    pub fn area(&self) -> f32 {
        let length = self.size();

        length.x * length.y
    }

    /// Calculates the center point of the bounding box.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use goturn_core::analysis::bbox::{Bbox, Cropped};
    /// let bbox = Bbox::<Cropped>::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 2.0));
    /// assert_eq!(bbox.center(), Vec2::new(2.0, 1.0));
    /// ```
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    pub fn center_x(&self) -> f32 {
        self.center().x
    }

    pub fn center_y(&self) -> f32 {
        self.center().y
    }

    /// Calculates the area of intersection between this bounding box and another.
    ///
    /// Returns 0.0 when the boxes do not overlap.
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.
        }
    }

    /// Calculates the Intersection over Union (IoU) between this bounding box and another.
    ///
    /// IoU = Intersection Area / (Area1 + Area2 - Intersection Area), in `[0, 1]`.
    /// Degenerate boxes with no union area score 0.0.
    ///
    /// # Example
    /// ```
    /// use glam::Vec2;
    /// use goturn_core::analysis::bbox::{Bbox, Original};
    /// let bbox1 = Bbox::<Original>::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
    /// let bbox2 = Bbox::<Original>::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
    /// assert_eq!(bbox1.iou(&bbox2), 1.0);
    /// ```
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    /// Clamps the bounding box coordinates to stay within the specified bounds.
    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self::new(self.min.max(min_bounds), self.max.min(max_bounds))
    }

    /// Checks if this bounding box completely contains another bounding box.
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Smallest box that encompasses both this bounding box and another.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Whether the box shares no pixel with a `width × height` image.
    pub fn is_outside(&self, width: u32, height: u32) -> bool {
        self.max.x < 0.0
            || self.max.y < 0.0
            || self.min.x >= width as f32
            || self.min.y >= height as f32
    }

    /// Draws the outline of the box onto `image` in the given color.
    ///
    /// Parts of the outline that fall outside the image are clipped, so a
    /// box produced by an untrusted transform never panics here. Reversed
    /// corners are drawn as the rectangle they span.
    pub fn draw(&self, color: [u8; 3], image: &mut RgbImage) {
        const THICKNESS: i32 = 2;

        // Pull far-away coordinates in to just past the border, beyond the
        // reach of the thick stroke; sides that were outside stay outside
        // and are never walked pixel by pixel.
        let margin = (THICKNESS + 1) as f32;
        let (low_x, high_x) = (-margin, image.width() as f32 + margin);
        let (low_y, high_y) = (-margin, image.height() as f32 + margin);
        let x1 = self.min.x.min(self.max.x).clamp(low_x, high_x) as i32;
        let y1 = self.min.y.min(self.max.y).clamp(low_y, high_y) as i32;
        let x2 = self.min.x.max(self.max.x).clamp(low_x, high_x) as i32;
        let y2 = self.min.y.max(self.max.y).clamp(low_y, high_y) as i32;

        let width = (x2 - x1 + 1).max(1) as u32;
        let height = (y2 - y1 + 1).max(1) as u32;

        for offset in 0..THICKNESS {
            let thick_rect = Rect::at(x1 - offset, y1 - offset)
                .of_size(width + (offset * 2) as u32, height + (offset * 2) as u32);
            draw_hollow_rect_mut(image, thick_rect, Rgb(color));
        }
    }
}

impl<S: Space> fmt::Display for Bbox<S> {
    /// `x1 y1 x2 y2`, the format of the per-entry result line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.min.x, self.min.y, self.max.x, self.max.y
        )
    }
}
