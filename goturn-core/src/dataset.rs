use std::{
    fs,
    path::{Path, PathBuf},
};

use image::RgbImage;
use snafu::{OptionExt, ResultExt};
use tracing::*;

use crate::{
    analysis::bbox::{Bbox, Original},
    consts::*,
    error::*,
};

/// One leaf folder of the dataset, `<root>/<class>/<sequence>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub folder: PathBuf,
}

impl Entry {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.folder.join(file_name)
    }

    /// Name printed at the start of the result line.
    pub fn name(&self) -> String {
        self.folder.to_string_lossy().into_owned()
    }
}

/// Sorted names of the directories directly below `path`.
pub fn find_subfolders(path: &Path) -> Result<Vec<String>, TrackerError> {
    let read_dir = fs::read_dir(path).context(DatasetSnafu {
        path: path.to_string_lossy(),
    })?;

    let mut folders = Vec::new();
    for dir_entry in read_dir {
        let dir_entry = dir_entry.context(DatasetSnafu {
            path: path.to_string_lossy(),
        })?;
        if dir_entry.path().is_dir() {
            folders.push(dir_entry.file_name().to_string_lossy().into_owned());
        }
    }
    folders.sort();

    Ok(folders)
}

/// Finds every `<root>/<class>/<sequence>` folder, in name order.
pub fn discover(root: &Path) -> Result<Vec<Entry>, TrackerError> {
    let mut entries = Vec::new();

    for class_folder in find_subfolders(root)? {
        let class_path = root.join(&class_folder);
        let sub_folders = find_subfolders(&class_path)?;
        debug!("class {} has {} folders", class_folder, sub_folders.len());

        entries.extend(
            sub_folders
                .into_iter()
                .map(|sub_folder| Entry::new(class_path.join(sub_folder))),
        );
    }

    info!("found {} dataset folders under {}", entries.len(), root.display());
    Ok(entries)
}

/// Parses `x1,y1,x2,y2` from the first line of a ground-truth file.
///
/// Corners may come in either order; the box is normalized so that
/// `x1 <= x2` and `y1 <= y2`. Fields after the fourth are ignored.
pub fn parse_ground_truth(content: &str) -> Option<Bbox<Original>> {
    let line = content.lines().next()?;
    let mut values = line.split(',').map(|field| field.trim().parse::<f32>());

    let mut next = || values.next()?.ok();
    let (x1, y1, x2, y2) = (next()?, next()?, next()?, next()?);

    Some(Bbox::from_corners(x1, y1, x2, y2))
}

pub fn read_ground_truth(path: &Path) -> Result<Bbox<Original>, TrackerError> {
    let content = fs::read_to_string(path).context(IoReadSnafu {
        path: path.to_string_lossy(),
    })?;

    parse_ground_truth(&content).context(GroundTruthSnafu {
        path: path.to_string_lossy(),
        line: content.lines().next().unwrap_or_default(),
    })
}

pub fn load_image(path: &Path) -> Result<RgbImage, TrackerError> {
    let image = image::open(path).context(ImageReadSnafu {
        path: path.to_string_lossy(),
    })?;

    Ok(image.to_rgb8())
}

pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), TrackerError> {
    image.save(path).context(ImageWriteSnafu {
        path: path.to_string_lossy(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use uuid::Uuid;

    use super::*;

    /// Fresh empty directory under the system temp dir.
    pub(crate) fn temp_root(label: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("goturn-{label}-{}", Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        root
    }

    #[test]
    fn test_parse_ground_truth_ordered() {
        let bbox = parse_ground_truth("10,10,50,50\n").unwrap();
        assert_eq!(bbox.corners(), [10.0, 10.0, 50.0, 50.0]);
    }

    #[test]
    fn test_parse_ground_truth_reversed() {
        let bbox = parse_ground_truth("50,50,10,10").unwrap();
        assert_eq!(bbox.corners(), [10.0, 10.0, 50.0, 50.0]);
    }

    #[test]
    fn test_parse_ground_truth_whitespace_and_trailing_lines() {
        let bbox = parse_ground_truth(" 3, 40 ,25,  7\r\n1,2,3,4\n").unwrap();
        assert_eq!(bbox.corners(), [3.0, 7.0, 25.0, 40.0]);
    }

    #[test]
    fn test_parse_ground_truth_malformed() {
        assert!(parse_ground_truth("").is_none());
        assert!(parse_ground_truth("10,10,50").is_none());
        assert!(parse_ground_truth("a,b,c,d").is_none());
        assert!(parse_ground_truth("\n10,10,50,50").is_none());
    }

    #[test]
    fn test_read_ground_truth_file() {
        let root = temp_root("gt");
        let path = root.join(SEARCH_GROUND_TRUTH);
        fs::write(&path, "120,80,20,10\n").unwrap();

        let bbox = read_ground_truth(&path).unwrap();
        assert_eq!(bbox.corners(), [20.0, 10.0, 120.0, 80.0]);

        // Missing and malformed files are reported, not panicked on
        assert!(matches!(
            read_ground_truth(&root.join("missing.txt")),
            Err(TrackerError::IoRead { .. })
        ));
        fs::write(&path, "garbage").unwrap();
        assert!(matches!(
            read_ground_truth(&path),
            Err(TrackerError::GroundTruth { .. })
        ));

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_discover_two_levels_sorted() {
        let root = temp_root("discover");
        for folder in ["cat/02", "cat/01", "bird/a", "empty"] {
            fs::create_dir_all(root.join(folder)).unwrap();
        }
        // Stray files are not folders
        fs::write(root.join("cat/notes.txt"), "x").unwrap();
        fs::write(root.join("readme.txt"), "x").unwrap();

        let entries = discover(&root).unwrap();
        let folders: Vec<_> = entries.iter().map(|e| e.folder.clone()).collect();
        assert_eq!(
            folders,
            vec![
                root.join("bird").join("a"),
                root.join("cat").join("01"),
                root.join("cat").join("02"),
            ]
        );

        fs::remove_dir_all(root).unwrap();
    }

    #[test]
    fn test_discover_missing_root() {
        let root = std::env::temp_dir().join(format!("goturn-missing-{}", Uuid::new_v4()));
        assert!(matches!(discover(&root), Err(TrackerError::Dataset { .. })));
    }
}
