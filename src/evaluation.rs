//! Offline evaluation against folders of labeled images.
//!
//! A test folder holds one sub-folder per ground-truth class. Up to
//! [`IMAGES_PER_CLASS`] images are classified from each and checked against
//! the folder name.

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Serialize;
use tracing::{debug, warn};

use crate::classifier::{round_to, ClassificationResult, ClassifierContext};
use crate::error::{Error, Result};
use crate::message::ConfidenceStatus;

/// Images classified per class folder.
pub const IMAGES_PER_CLASS: usize = 5;
/// Report written by folder and auto runs.
pub const DEFAULT_OUTPUT: &str = "test_results.json";
/// Folders tried by `--auto`; missing ones are skipped.
pub const AUTO_TEST_PATHS: &[&str] = &[
    "mini/Aloe_dataset/test",
    "mini/hibiscus_dataset",
    "mini/tomato_dataset/test",
];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// How a class folder name is compared with the predicted raw label.
/// All comparisons are case-insensitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MatchMode {
    /// Folder name appears anywhere in the label
    #[default]
    Substring,
    /// Label starts with the folder name
    Prefix,
    Exact,
}

impl MatchMode {
    pub fn matches(&self, class_folder: &str, raw_class: &str) -> bool {
        let folder = class_folder.to_lowercase();
        let label = raw_class.to_lowercase();
        match self {
            MatchMode::Substring => label.contains(&folder),
            MatchMode::Prefix => label.starts_with(&folder),
            MatchMode::Exact => label == folder,
        }
    }
}

/// One evaluated image, as printed and persisted.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationRecord {
    pub plant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    pub confidence: f64,
    pub status: ConfidenceStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_class: Option<String>,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

impl EvaluationRecord {
    pub fn from_result(result: &ClassificationResult, image: impl Into<String>) -> Self {
        Self {
            plant: result.plant.clone(),
            disease: Some(result.condition.clone()),
            confidence: round_to(result.confidence_percent, 1),
            status: ConfidenceStatus::from_confidence(result.confidence_percent),
            message: result.message.clone(),
            raw_class: Some(result.raw_label.clone()),
            image: image.into(),
            actual_class: None,
            correct: None,
        }
    }

    pub fn failed(error: &Error, image: impl Into<String>) -> Self {
        Self {
            plant: "Unknown".to_string(),
            disease: None,
            confidence: 0.0,
            status: ConfidenceStatus::Error,
            message: format!("Error processing image: {error}"),
            raw_class: None,
            image: image.into(),
            actual_class: None,
            correct: None,
        }
    }

    /// Attaches the ground-truth class and whether the prediction matches it.
    fn judged(mut self, class_folder: &str, mode: MatchMode) -> Self {
        self.correct = Some(
            self.raw_class
                .as_deref()
                .map(|raw| mode.matches(class_folder, raw))
                .unwrap_or(false),
        );
        self.actual_class = Some(class_folder.to_string());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct AccuracySummary {
    pub correct: usize,
    pub total: usize,
    /// Percentage, one decimal
    pub accuracy: f64,
}

pub fn calculate_accuracy(records: &[EvaluationRecord]) -> AccuracySummary {
    let total = records.len();
    let correct = records.iter().filter(|r| r.correct == Some(true)).count();
    let accuracy = if total == 0 {
        0.0
    } else {
        round_to(correct as f64 / total as f64 * 100.0, 1)
    };
    AccuracySummary {
        correct,
        total,
        accuracy,
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EvaluationReport {
    pub summary: AccuracySummary,
    pub results: Vec<EvaluationRecord>,
}

impl EvaluationReport {
    pub fn new(results: Vec<EvaluationRecord>) -> Self {
        Self {
            summary: calculate_accuracy(&results),
            results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Classifies one image file. Failures become an error record, never an `Err`.
pub fn evaluate_image(context: &ClassifierContext, path: &Path) -> EvaluationRecord {
    let image = file_label(path);
    match context.classify_path(path) {
        Ok(result) => EvaluationRecord::from_result(&result, image),
        Err(e) => {
            warn!("{}: {e}", path.display());
            EvaluationRecord::failed(&e, image)
        }
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// Walks every class sub-folder of `folder` in name order.
///
/// Fails only when `folder` itself cannot be listed. A class folder that
/// cannot be read is logged and skipped.
pub fn evaluate_folder(context: &ClassifierContext, folder: &Path, mode: MatchMode) -> Result<Vec<EvaluationRecord>> {
    let class_dirs: Vec<PathBuf> = sorted_entries(folder)?.into_iter().filter(|p| p.is_dir()).collect();
    Ok(evaluate_class_dirs(context, &class_dirs, mode))
}

fn evaluate_class_dirs(context: &ClassifierContext, class_dirs: &[PathBuf], mode: MatchMode) -> Vec<EvaluationRecord> {
    let mut records = Vec::new();

    for class_dir in class_dirs {
        let class_folder = file_label(class_dir);
        let entries = match sorted_entries(class_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("skipping class folder {}: {e}", class_dir.display());
                continue;
            }
        };
        let images: Vec<PathBuf> = entries
            .into_iter()
            .filter(|p| p.is_file() && is_image_file(p))
            .take(IMAGES_PER_CLASS)
            .collect();
        debug!(class = %class_folder, images = images.len(), "evaluating class folder");

        for image in images {
            records.push(evaluate_image(context, &image).judged(&class_folder, mode));
        }
    }

    records
}

/// The entries of `paths` that are directories, in the given order.
pub fn existing_test_folders<'a>(paths: &[&'a str]) -> Vec<&'a Path> {
    paths.iter().map(|p| Path::new(*p)).filter(|p| p.is_dir()).collect()
}

/// Evaluates several test folders into one record list. A folder that
/// cannot be listed is logged and skipped; records already gathered are kept.
pub fn evaluate_folders(context: &ClassifierContext, folders: &[&Path], mode: MatchMode) -> Vec<EvaluationRecord> {
    let mut records = Vec::new();
    for folder in folders {
        match evaluate_folder(context, folder, mode) {
            Ok(found) => records.extend(found),
            Err(e) => warn!("skipping test folder {}: {e}", folder.display()),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(correct: bool) -> EvaluationRecord {
        EvaluationRecord {
            plant: "Tomato".to_string(),
            disease: Some("Early Blight".to_string()),
            confidence: 91.2,
            status: ConfidenceStatus::Confident,
            message: "Your Tomato appears to have Early Blight".to_string(),
            raw_class: Some("Tomato___Early_blight".to_string()),
            image: "leaf.jpg".to_string(),
            actual_class: Some("Tomato___Early_blight".to_string()),
            correct: Some(correct),
        }
    }

    #[test]
    fn test_accuracy_of_ten() {
        let records: Vec<_> = (0..10).map(|i| record(i < 7)).collect();
        assert_eq!(
            calculate_accuracy(&records),
            AccuracySummary {
                correct: 7,
                total: 10,
                accuracy: 70.0
            }
        );
    }

    #[test]
    fn test_accuracy_rounding_and_empty() {
        let records = vec![record(true), record(false), record(false)];
        assert_eq!(calculate_accuracy(&records).accuracy, 33.3);
        assert_eq!(calculate_accuracy(&[]).accuracy, 0.0);
        assert_eq!(calculate_accuracy(&[]).total, 0);
    }

    #[test]
    fn test_accuracy_rounds_half_to_even() {
        // 1/16 = 6.25%
        let records: Vec<_> = (0..16).map(|i| record(i == 0)).collect();
        assert_eq!(calculate_accuracy(&records).accuracy, 6.2);
        // 3/16 = 18.75%
        let records: Vec<_> = (0..16).map(|i| record(i < 3)).collect();
        assert_eq!(calculate_accuracy(&records).accuracy, 18.8);
    }

    struct AlwaysFirst;

    impl crate::classifier::Predictor for AlwaysFirst {
        fn input_size(&self) -> crate::ImageSize {
            crate::ImageSize { width: 4, height: 4 }
        }

        fn predict(&self, _image: &image::DynamicImage) -> Result<Vec<f32>> {
            Ok(vec![0.9, 0.1])
        }
    }

    #[test]
    fn test_unreadable_class_folder_is_skipped() {
        let context = ClassifierContext::new(
            AlwaysFirst,
            vec!["Aloe_Healthy", "Tomato___Early_blight"].into(),
            "test",
        );
        let root = tempfile::tempdir().unwrap();
        let aloe = root.path().join("Aloe_Healthy");
        fs::create_dir(&aloe).unwrap();
        image::RgbImage::new(4, 4).save(aloe.join("leaf.png")).unwrap();

        let gone = root.path().join("Tomato___Early_blight");
        let records = evaluate_class_dirs(&context, &[gone, aloe], MatchMode::Substring);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].actual_class.as_deref(), Some("Aloe_Healthy"));
        assert_eq!(records[0].correct, Some(true));
    }

    #[test]
    fn test_existing_test_folders_keeps_directories_only() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("aloe");
        let file = root.path().join("notes.txt");
        let missing = root.path().join("hibiscus");
        fs::create_dir(&dir).unwrap();
        fs::write(&file, "not a folder").unwrap();

        let (dir, file, missing) = (dir.to_str().unwrap(), file.to_str().unwrap(), missing.to_str().unwrap());
        let found = existing_test_folders(&[missing, file, dir]);
        assert_eq!(found, vec![Path::new(dir)]);
    }

    #[test]
    fn test_match_modes() {
        let label = "Tomato___Early_blight";
        assert!(MatchMode::Substring.matches("early_BLIGHT", label));
        assert!(MatchMode::Substring.matches("tomato", label));
        assert!(!MatchMode::Substring.matches("aloe", label));

        assert!(MatchMode::Prefix.matches("tomato", label));
        assert!(!MatchMode::Prefix.matches("early_blight", label));

        assert!(MatchMode::Exact.matches("TOMATO___EARLY_BLIGHT", label));
        assert!(!MatchMode::Exact.matches("tomato", label));
    }

    #[test]
    fn test_failed_record_is_never_correct() {
        let failed = EvaluationRecord::failed(&Error::ImageDecode("truncated".to_string()), "x.png")
            .judged("tomato", MatchMode::Substring);
        assert_eq!(failed.correct, Some(false));
        assert_eq!(failed.status, ConfidenceStatus::Error);
        assert_eq!(failed.message, "Error processing image: Cannot decode image: truncated");

        let json = serde_json::to_value(&failed).unwrap();
        assert!(json.get("disease").is_none());
        assert!(json.get("raw_class").is_none());
        assert_eq!(json["plant"], "Unknown");
        assert_eq!(json["status"], "❌ Error");
        assert_eq!(json["actual_class"], "tomato");
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image_file(Path::new("a/leaf.JPG")));
        assert!(is_image_file(Path::new("leaf.jpeg")));
        assert!(is_image_file(Path::new("leaf.Png")));
        assert!(!is_image_file(Path::new("notes.txt")));
        assert!(!is_image_file(Path::new("jpg")));
    }

    #[test]
    fn test_report_json_shape() {
        let report = EvaluationReport::new(vec![record(true), record(false)]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["summary"]["correct"], 1);
        assert_eq!(json["summary"]["total"], 2);
        assert_eq!(json["summary"]["accuracy"], 50.0);
        assert_eq!(json["results"][0]["disease"], "Early Blight");
        assert_eq!(json["results"][0]["status"], "✅ Confident");
    }
}
