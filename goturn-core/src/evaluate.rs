use std::{fs, io::Write, path::Path};

use clap::ValueEnum;
use glam::Vec2;
use serde::Serialize;
use snafu::ResultExt;
use tracing::*;

use crate::{
    analysis::bbox::{Bbox, Cropped, Original},
    consts::*,
    crop::{context_size, crop_less_pad_image, crop_pad_image},
    dataset::{Entry, load_image, read_ground_truth, save_image},
    error::*,
    inference::Regressor,
};

/// What a dataset folder holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum InputMode {
    /// Full frames plus ground truth; the driver crops them itself.
    Origin,
    /// Target and search images that are already cropped to the same size.
    Cropped,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryResult {
    pub folder: String,
    /// Estimate in the pixel space of the search crop.
    pub estimate: Bbox<Cropped>,
    /// Estimate moved back into the full search frame.
    pub estimate_original: Option<Bbox<Original>>,
    pub ground_truth: Option<Bbox<Original>>,
    pub iou: Option<f32>,
}

impl EntryResult {
    /// `<folder> <x1> <y1> <x2> <y2>`
    pub fn line(&self) -> String {
        format!("{} {}", self.folder, self.estimate)
    }

    /// Line printed for a folder that produced no estimate.
    pub fn failed_line(folder: &str) -> String {
        format!("{} NaN NaN NaN NaN", folder)
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct EvaluationSummary {
    pub entries: usize,
    pub failed: usize,
    pub mean_iou: Option<f32>,
    pub results: Vec<EntryResult>,
}

impl EvaluationSummary {
    fn finish(&mut self) {
        let ious: Vec<f32> = self.results.iter().filter_map(|r| r.iou).collect();
        if !ious.is_empty() {
            self.mean_iou = Some(ious.iter().sum::<f32>() / ious.len() as f32);
        }
    }
}

/// Runs the regressor over dataset folders and persists annotated results.
pub struct Evaluator<R: Regressor> {
    regressor: R,
    mode: InputMode,
    span: Span,
}

impl<R: Regressor> Evaluator<R> {
    pub fn new(regressor: R, mode: InputMode, span: Span) -> Self {
        Self {
            regressor,
            mode,
            span,
        }
    }

    /// Evaluates every entry, writing one result line per entry to `out`.
    ///
    /// A failing entry is logged and gets a `NaN` line; it never stops the run.
    pub fn run<W: Write>(
        &mut self,
        entries: &[Entry],
        out: &mut W,
    ) -> Result<EvaluationSummary, TrackerError> {
        let _guard = self.span.clone().entered();

        let mut summary = EvaluationSummary {
            entries: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            match self.evaluate_entry(entry) {
                Ok(result) => {
                    writeln!(out, "{}", result.line()).context(IoWriteSnafu { path: "stdout" })?;
                    summary.results.push(result);
                }
                Err(err) => {
                    error!("skip {}: {}", entry.name(), err);
                    writeln!(out, "{}", EntryResult::failed_line(&entry.name()))
                        .context(IoWriteSnafu { path: "stdout" })?;
                    summary.failed += 1;
                }
            }
        }
        summary.finish();

        info!(
            "evaluated {} folders, {} failed, mean iou {:?}",
            summary.entries, summary.failed, summary.mean_iou
        );
        Ok(summary)
    }

    pub fn evaluate_entry(&mut self, entry: &Entry) -> Result<EntryResult, TrackerError> {
        let span = info_span!(parent: &self.span, "entry", folder = %entry.name());
        let _guard = span.enter();

        match self.mode {
            InputMode::Origin => self.evaluate_origin(entry),
            InputMode::Cropped => self.evaluate_cropped(entry),
        }
    }

    fn evaluate_origin(&mut self, entry: &Entry) -> Result<EntryResult, TrackerError> {
        let mut target_origin = load_image(&entry.path(TARGET_IMAGE))?;
        let mut search_origin = load_image(&entry.path(SEARCH_IMAGE))?;
        let search_truth = ground_truth_or_empty(&entry.path(SEARCH_GROUND_TRUTH));
        let target_bbox = ground_truth_or_empty(&entry.path(TARGET_GROUND_TRUTH))
            .unwrap_or_else(empty_box);
        let search_bbox = search_truth.unwrap_or_else(empty_box);

        // The search crop shares the target crop's size.
        let (width, height) = context_size(&target_bbox, &target_origin);
        let target_cropped = crop_pad_image(&target_bbox, &target_origin, width, height);
        let search_cropped = crop_less_pad_image(&search_bbox, &search_origin, width, height);
        debug!(
            "crop {}x{}, search placed at {:?}",
            width, height, search_cropped.placement.origin
        );

        let raw = self.regressor.regress(
            &search_origin,
            &search_cropped.image,
            &target_cropped.image,
        )?;
        let estimate = raw.unscale(&search_cropped.image);
        let estimate_original = estimate.to_original(&search_cropped.placement);
        let iou = search_truth.map(|truth| estimate_original.iou(&truth));
        debug!("estimate {} (original {}), iou {:?}", estimate, estimate_original, iou);

        // Ground truth in white on the frames, estimate in red on the crop.
        target_bbox.draw(GROUND_TRUTH_COLOR, &mut target_origin);
        search_bbox.draw(GROUND_TRUTH_COLOR, &mut search_origin);
        let target_annotated = crop_pad_image(&target_bbox, &target_origin, width, height);
        let mut search_annotated =
            crop_less_pad_image(&search_bbox, &search_origin, width, height);
        estimate.draw(ESTIMATE_COLOR, &mut search_annotated.image);

        save_image(&target_annotated.image, &entry.path(TARGET_RESULT))?;
        save_image(&search_annotated.image, &entry.path(SEARCH_RESULT))?;

        Ok(EntryResult {
            folder: entry.name(),
            estimate,
            estimate_original: Some(estimate_original),
            ground_truth: search_truth,
            iou,
        })
    }

    fn evaluate_cropped(&mut self, entry: &Entry) -> Result<EntryResult, TrackerError> {
        let target = load_image(&entry.path(TARGET_IMAGE))?;
        let search = load_image(&entry.path(SEARCH_IMAGE))?;

        let raw = self.regressor.regress(&search, &search, &target)?;
        let estimate = raw.unscale(&search);
        debug!("estimate {}", estimate);

        let mut annotated = search;
        estimate.draw(ESTIMATE_COLOR, &mut annotated);
        save_image(&annotated, &entry.path(CROPPED_RESULT))?;

        Ok(EntryResult {
            folder: entry.name(),
            estimate,
            estimate_original: None,
            ground_truth: None,
            iou: None,
        })
    }
}

/// Ground truth that cannot be read is replaced by [`empty_box`] so the
/// entry still produces a line and annotated images.
fn ground_truth_or_empty(path: &Path) -> Option<Bbox<Original>> {
    match read_ground_truth(path) {
        Ok(bbox) => Some(bbox),
        Err(err) => {
            warn!("{}, using an empty box", err);
            None
        }
    }
}

fn empty_box() -> Bbox<Original> {
    Bbox::new(Vec2::ZERO, Vec2::ZERO)
}

pub fn write_report(path: &Path, summary: &EvaluationSummary) -> Result<(), TrackerError> {
    let json = serde_json::to_string_pretty(summary).context(ReportSnafu)?;
    fs::write(path, json).context(IoWriteSnafu {
        path: path.to_string_lossy(),
    })?;

    info!("report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use approx::assert_relative_eq;
    use glam::Vec2;
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::{analysis::bbox::Network, dataset::tests::temp_root};

    /// Returns a fixed network-space box and records the sizes it was fed.
    pub(crate) struct ScriptedRegressor {
        pub(crate) output: Bbox<Network>,
        pub(crate) calls: Vec<[(u32, u32); 3]>,
    }

    impl ScriptedRegressor {
        pub(crate) fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
            Self {
                output: Bbox::new(Vec2::new(x1, y1), Vec2::new(x2, y2)),
                calls: Vec::new(),
            }
        }
    }

    impl Regressor for ScriptedRegressor {
        fn regress(
            &mut self,
            search_origin: &RgbImage,
            search_cropped: &RgbImage,
            target_cropped: &RgbImage,
        ) -> Result<Bbox<Network>, TrackerError> {
            self.calls.push([
                search_origin.dimensions(),
                search_cropped.dimensions(),
                target_cropped.dimensions(),
            ]);
            Ok(self.output)
        }
    }

    /// Writes an origin-mode folder: 120x120 target, 200x200 search.
    pub(crate) fn write_origin_entry(root: &Path, name: &str) -> PathBuf {
        let folder = root.join("class").join(name);
        fs::create_dir_all(&folder).unwrap();

        RgbImage::from_pixel(120, 120, Rgb([30, 90, 150]))
            .save(folder.join(TARGET_IMAGE))
            .unwrap();
        RgbImage::from_pixel(200, 200, Rgb([150, 90, 30]))
            .save(folder.join(SEARCH_IMAGE))
            .unwrap();
        fs::write(folder.join(TARGET_GROUND_TRUTH), "60,60,20,20\n").unwrap();
        fs::write(folder.join(SEARCH_GROUND_TRUTH), "100,100,140,140\n").unwrap();

        folder
    }

    fn span() -> Span {
        info_span!("test")
    }

    #[test]
    fn test_evaluate_origin_entry() {
        let root = temp_root("eval-origin");
        let folder = write_origin_entry(&root, "001");

        // Estimate covers the middle half of the crop
        let regressor = ScriptedRegressor::new(2.5, 2.5, 7.5, 7.5);
        let mut evaluator = Evaluator::new(regressor, InputMode::Origin, span());

        let mut out = Vec::new();
        let summary = evaluator.run(&[Entry::new(&folder)], &mut out).unwrap();

        // Target box 40x40 gives an 80x80 canvas for both crops
        assert_eq!(evaluator.regressor.calls, vec![[(200, 200), (80, 80), (80, 80)]]);

        let result = &summary.results[0];
        assert_eq!(result.estimate.corners(), [20.0, 20.0, 60.0, 60.0]);

        // Search box center (120, 120) is bottom-right: canvas starts at (60, 60)
        let original = result.estimate_original.unwrap();
        assert_eq!(original.corners(), [80.0, 80.0, 120.0, 120.0]);
        assert_relative_eq!(result.iou.unwrap(), 400.0 / 2800.0, epsilon = 1e-6);
        assert_relative_eq!(summary.mean_iou.unwrap(), 400.0 / 2800.0, epsilon = 1e-6);

        let stdout = String::from_utf8(out).unwrap();
        assert_eq!(stdout, format!("{} 20 20 60 60\n", folder.display()));

        let target_result = image::open(folder.join(TARGET_RESULT)).unwrap();
        let search_result = image::open(folder.join(SEARCH_RESULT)).unwrap();
        assert_eq!((target_result.width(), target_result.height()), (80, 80));
        assert_eq!((search_result.width(), search_result.height()), (80, 80));

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_evaluate_continues_after_broken_entry() {
        let root = temp_root("eval-broken");
        let good = write_origin_entry(&root, "001");
        let missing = write_origin_entry(&root, "002");
        fs::remove_file(missing.join(SEARCH_GROUND_TRUTH)).unwrap();
        let garbled = write_origin_entry(&root, "003");
        fs::write(garbled.join(TARGET_GROUND_TRUTH), "10,10,abc,50").unwrap();
        let unreadable = write_origin_entry(&root, "004");
        fs::write(unreadable.join(SEARCH_IMAGE), b"not an image").unwrap();

        let regressor = ScriptedRegressor::new(0.0, 0.0, 10.0, 10.0);
        let mut evaluator = Evaluator::new(regressor, InputMode::Origin, span());

        let entries = [
            Entry::new(&good),
            Entry::new(&missing),
            Entry::new(&garbled),
            Entry::new(&unreadable),
        ];
        let mut out = Vec::new();
        let summary = evaluator.run(&entries, &mut out).unwrap();

        assert_eq!(summary.entries, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results.len(), 3);

        // Every folder gets a line, in order
        let stdout = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(
            lines,
            vec![
                format!("{} 0 0 80 80", good.display()),
                format!("{} 0 0 80 80", missing.display()),
                format!("{} 0 0 1 1", garbled.display()),
                format!("{} NaN NaN NaN NaN", unreadable.display()),
            ]
        );

        // Missing search ground truth: empty box at the origin, no score
        assert!(missing.join(SEARCH_RESULT).exists());
        assert_eq!(summary.results[1].ground_truth, None);
        assert_eq!(summary.results[1].iou, None);

        // Garbled target ground truth collapses the crops to one pixel
        assert!(garbled.join(TARGET_RESULT).exists());
        assert!(summary.results[2].iou.is_some());
        assert!(!unreadable.join(SEARCH_RESULT).exists());

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_evaluate_cropped_entry() {
        let root = temp_root("eval-cropped");
        let folder = root.join("class").join("001");
        fs::create_dir_all(&folder).unwrap();
        RgbImage::from_pixel(60, 60, Rgb([10, 10, 10]))
            .save(folder.join(TARGET_IMAGE))
            .unwrap();
        RgbImage::from_pixel(60, 60, Rgb([20, 20, 20]))
            .save(folder.join(SEARCH_IMAGE))
            .unwrap();

        let regressor = ScriptedRegressor::new(1.0, 2.0, 5.0, 6.0);
        let mut evaluator = Evaluator::new(regressor, InputMode::Cropped, span());

        let mut out = Vec::new();
        let summary = evaluator.run(&[Entry::new(&folder)], &mut out).unwrap();

        // Search image stands in for both the frame and the crop
        assert_eq!(evaluator.regressor.calls, vec![[(60, 60), (60, 60), (60, 60)]]);
        let result = &summary.results[0];
        assert_eq!(result.estimate.corners(), [6.0, 12.0, 30.0, 36.0]);
        assert_eq!(result.iou, None);
        assert_eq!(summary.mean_iou, None);
        assert!(folder.join(CROPPED_RESULT).exists());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{} 6 12 30 36\n", folder.display())
        );

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_write_report() {
        let root = temp_root("report");
        let summary = EvaluationSummary {
            entries: 1,
            failed: 0,
            mean_iou: Some(0.5),
            results: vec![EntryResult {
                folder: "a/b".to_string(),
                estimate: Bbox::from_corners(1.0, 2.0, 3.0, 4.0),
                estimate_original: None,
                ground_truth: None,
                iou: Some(0.5),
            }],
        };

        let path = root.join("report.json");
        write_report(&path, &summary).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["entries"], 1);
        assert_eq!(value["results"][0]["folder"], "a/b");
        assert_eq!(value["results"][0]["estimate"]["min"][0], 1.0);
        assert_eq!(value["results"][0]["estimate"]["max"][1], 4.0);

        fs::remove_dir_all(root).unwrap();
    }
}
