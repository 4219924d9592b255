//! Inference orchestration: model output → top class → parsed, worded result.

use std::path::Path;

use image::DynamicImage;
use serde::{Serialize, Serializer};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::label::{parse_label, LabelCatalog};
use crate::message::generate_message;
use crate::pipeline::TransformationPipeline;
use crate::ImageSize;

/// Produces a probability vector over the label catalog for one image.
///
/// Implementations must be safe to call from several threads at once.
pub trait Predictor: Send + Sync {
    /// Spatial size images are resized to before the forward pass.
    fn input_size(&self) -> ImageSize;

    fn predict(&self, image: &DynamicImage) -> Result<Vec<f32>>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub plant: String,
    pub condition: String,
    /// Top class probability as a percentage in `0..=100`
    #[serde(rename = "confidence", serialize_with = "serialize_percent")]
    pub confidence_percent: f64,
    pub message: String,
    #[serde(rename = "raw_class")]
    pub raw_label: String,
}

fn serialize_percent<S: Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}

/// Rounds halves to even, so exact binary halves such as `6.25` round like Python's `round`.
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

/// Index and value of the largest entry. Ties go to the lowest index, NaNs are skipped.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (index, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if value <= top => {}
            _ => best = Some((index, value)),
        }
    }
    best
}

/// Turns a probability vector into a result using the label at the argmax.
pub fn classify_probabilities(probabilities: &[f32], labels: &LabelCatalog) -> Result<ClassificationResult> {
    let (index, probability) = argmax(probabilities)
        .ok_or_else(|| Error::Inference("model returned no usable probabilities".to_string()))?;
    let raw_label = labels.get(index).ok_or(Error::IndexMismatch {
        index,
        labels: labels.len(),
    })?;

    let confidence_percent = f64::from(probability) * 100.0;
    let (plant, condition) = parse_label(raw_label);
    let message = generate_message(&plant, &condition, confidence_percent);

    Ok(ClassificationResult {
        plant,
        condition,
        confidence_percent,
        message,
        raw_label: raw_label.to_string(),
    })
}

pub fn classify(image: &DynamicImage, model: &dyn Predictor, labels: &LabelCatalog) -> Result<ClassificationResult> {
    let probabilities = model.predict(image)?;
    if probabilities.len() != labels.len() {
        warn!(
            outputs = probabilities.len(),
            labels = labels.len(),
            "model output size does not match the label catalog"
        );
    }
    let result = classify_probabilities(&probabilities, labels)?;
    debug!(raw_class = %result.raw_label, confidence = result.confidence_percent, "classified");
    Ok(result)
}

/// Decodes an encoded image (JPEG, PNG, ...) and classifies it.
pub fn classify_bytes(bytes: &[u8], model: &dyn Predictor, labels: &LabelCatalog) -> Result<ClassificationResult> {
    let image = image::load_from_memory(bytes)?;
    classify(&image, model, labels)
}

/// The loaded model and label catalog, read-only for the process lifetime.
pub struct ClassifierContext {
    model: Box<dyn Predictor>,
    labels: LabelCatalog,
    model_id: String,
}

impl ClassifierContext {
    pub fn new<M: Predictor + 'static>(model: M, labels: LabelCatalog, model_id: impl Into<String>) -> Self {
        ClassifierContext {
            model: Box::new(model),
            labels,
            model_id: model_id.into(),
        }
    }

    /// Loads the ONNX model and the label catalog. Either failing is fatal.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        info!(model = %config.model_path.display(), "loading model");
        let model = TransformationPipeline::load(&config.model_path, config.input_size, config.resize_filter)?;

        info!(labels = %config.labels_path.display(), "loading class names");
        let labels = LabelCatalog::load(&config.labels_path)?;
        info!("loaded {} class names", labels.len());

        Ok(ClassifierContext::new(model, labels, config.model_id()))
    }

    pub fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult> {
        classify(image, self.model.as_ref(), &self.labels)
    }

    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<ClassificationResult> {
        classify_bytes(bytes, self.model.as_ref(), &self.labels)
    }

    pub fn classify_path(&self, path: &Path) -> Result<ClassificationResult> {
        let image = image::open(path)?;
        self.classify(&image)
    }

    pub fn labels(&self) -> &LabelCatalog {
        &self.labels
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn input_size(&self) -> ImageSize {
        self.model.input_size()
    }
}
