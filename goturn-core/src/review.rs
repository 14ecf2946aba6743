use std::{
    fs,
    path::{Path, PathBuf},
};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::draw_text_mut;
use snafu::ResultExt;
use tracing::*;

use crate::{
    consts::*,
    dataset::{Entry, load_image, save_image},
    error::*,
    evaluate::InputMode,
};

/// Saved artifacts of one evaluated folder.
pub struct ReviewPair {
    pub title: String,
    pub target: RgbImage,
    pub search: RgbImage,
}

impl ReviewPair {
    /// Reads the images the evaluation pass wrote for `mode`.
    pub fn load(entry: &Entry, mode: InputMode) -> Result<Self, TrackerError> {
        let (target_name, search_name) = match mode {
            InputMode::Origin => (TARGET_RESULT, SEARCH_RESULT),
            InputMode::Cropped => (TARGET_IMAGE, CROPPED_RESULT),
        };

        Ok(Self {
            title: entry.name(),
            target: load_image(&entry.path(target_name))?,
            search: load_image(&entry.path(search_name))?,
        })
    }
}

pub fn load_font(path: &Path) -> Result<FontVec, TrackerError> {
    let data = fs::read(path).context(IoReadSnafu {
        path: path.to_string_lossy(),
    })?;

    FontVec::try_from_vec(data).context(FontSnafu)
}

/// Puts target and search side by side under a title bar.
///
/// The canvas is twice the target width and the target height plus the
/// title bar. Without a font the bar stays empty.
pub fn compose(
    target: &RgbImage,
    search: &RgbImage,
    title: &str,
    font: Option<&FontVec>,
) -> RgbImage {
    let width = target.width() * 2;
    let height = target.height() + TITLE_PADDING;

    let mut canvas = RgbImage::from_pixel(width, height, Rgb(REVIEW_BACKGROUND));
    imageops::replace(&mut canvas, target, 0, TITLE_PADDING as i64);
    imageops::replace(
        &mut canvas,
        search,
        target.width() as i64,
        TITLE_PADDING as i64,
    );

    if let Some(font) = font {
        let text_x = (target.width() / 2) as i32;
        let text_y = (TITLE_PADDING as f32 / 2.0 - TITLE_FONT_SIZE / 2.0) as i32;
        draw_text_mut(
            &mut canvas,
            Rgb(TITLE_COLOR),
            text_x,
            text_y,
            PxScale::from(TITLE_FONT_SIZE),
            font,
            title,
        );
    }

    canvas
}

/// Presents one composed review canvas.
pub trait Viewer {
    fn show(&mut self, title: &str, canvas: &RgbImage) -> Result<(), TrackerError>;
}

impl Viewer for Box<dyn Viewer> {
    fn show(&mut self, title: &str, canvas: &RgbImage) -> Result<(), TrackerError> {
        (**self).show(title, canvas)
    }
}

/// Writes each canvas to `<dir>/<index>_<folder-slug>.jpg`.
///
/// The index is the canvas's position in the run, so folders whose slugs
/// collide still land in separate files.
pub struct FileViewer {
    dir: PathBuf,
    shown: usize,
}

impl FileViewer {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir).context(IoWriteSnafu {
                path: dir.to_string_lossy(),
            })?;
            info!("Created review directory: {}", dir.display());
        }

        Ok(Self { dir, shown: 0 })
    }

    fn file_name(index: usize, title: &str) -> String {
        let slug: String = title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!("{:04}_{}.jpg", index, slug.trim_matches('_'))
    }
}

impl Viewer for FileViewer {
    fn show(&mut self, title: &str, canvas: &RgbImage) -> Result<(), TrackerError> {
        let path = self.dir.join(Self::file_name(self.shown, title));
        save_image(canvas, &path)?;
        self.shown += 1;
        info!("review of {} saved to {}", title, path.display());
        Ok(())
    }
}

/// Interactive window; each canvas stays up until a key is pressed.
#[cfg(feature = "display")]
pub struct WindowViewer {
    window: show_image::WindowProxy,
}

#[cfg(feature = "display")]
impl WindowViewer {
    pub fn new() -> Result<Self, TrackerError> {
        let window = show_image::create_window(WINDOW_TITLE, show_image::WindowOptions::default())
            .map_err(|err| TrackerError::Display {
                stage: "create-window".to_string(),
                message: err.to_string(),
            })?;

        Ok(Self { window })
    }
}

#[cfg(feature = "display")]
impl Viewer for WindowViewer {
    fn show(&mut self, title: &str, canvas: &RgbImage) -> Result<(), TrackerError> {
        use show_image::{ImageInfo, ImageView, event::WindowEvent};

        let display_error = |stage: &str, message: String| TrackerError::Display {
            stage: stage.to_string(),
            message,
        };

        let image = ImageView::new(
            ImageInfo::rgb8(canvas.width(), canvas.height()),
            canvas.as_raw(),
        );
        self.window
            .set_image(title, image)
            .map_err(|err| display_error("set-image", err.to_string()))?;

        let events = self
            .window
            .event_channel()
            .map_err(|err| display_error("event-channel", err.to_string()))?;
        for event in events {
            if let WindowEvent::KeyboardInput(event) = event {
                if event.input.state.is_pressed() {
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Replays saved result pairs through a [`Viewer`].
///
/// Reads artifacts only; nothing on disk is modified, so replaying twice
/// shows identical canvases.
pub struct Reviewer<V: Viewer> {
    viewer: V,
    font: Option<FontVec>,
    mode: InputMode,
    span: Span,
}

impl<V: Viewer> Reviewer<V> {
    pub fn new(viewer: V, font: Option<FontVec>, mode: InputMode, span: Span) -> Self {
        Self {
            viewer,
            font,
            mode,
            span,
        }
    }

    /// Shows every entry that has saved results and returns how many were shown.
    pub fn run(&mut self, entries: &[Entry]) -> Result<usize, TrackerError> {
        let _guard = self.span.clone().entered();

        let mut shown = 0;
        for entry in entries {
            let pair = match ReviewPair::load(entry, self.mode) {
                Ok(pair) => pair,
                Err(err) => {
                    warn!("no results to review in {}: {}", entry.name(), err);
                    continue;
                }
            };

            let canvas = compose(&pair.target, &pair.search, &pair.title, self.font.as_ref());
            self.viewer.show(&pair.title, &canvas)?;
            shown += 1;
        }

        info!("reviewed {} of {} folders", shown, entries.len());
        Ok(shown)
    }
}
