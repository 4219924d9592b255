//! Plant species and disease classification over a pre-trained ONNX image model.
//!
//! The crate is shared by the HTTP service (`vrikzo-cnn`) and the offline batch
//! evaluator (`evaluate`). Both load a [`ClassifierContext`] once and hand it
//! to [`classify`].

pub mod classifier;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod label;
pub mod logging;
pub mod message;
mod pipeline;
pub mod server;
mod transformer;

pub use classifier::{
    argmax, classify, classify_bytes, classify_probabilities, ClassificationResult, ClassifierContext, Predictor,
};
pub use error::{Error, Result};
pub use label::{parse_label, LabelCatalog};
pub use message::{generate_message, ConfidenceStatus};
pub use pipeline::{TensorLayout, TransformationPipeline};
pub use transformer::{GenericTransform, ImageTransform, Normalization, Transpose};

use image::imageops::FilterType;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::tract_ndarray::Array4;
use tract_onnx::prelude::Tensor;

/// Default model artifact, an ONNX export of the Keras classifier.
pub const MODEL_PATH: &str = "vrikzo_model.onnx";
/// Default label catalog, a JSON array of class names.
pub const LABELS_PATH: &str = "class_names.json";

#[derive(Serialize, Deserialize)]
#[serde(remote = "FilterType")]
pub(crate) enum FilterOption {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResizeRgbImage {
    pub(crate) image_size: ImageSize,
    #[serde(with = "FilterOption")]
    pub(crate) filter: FilterType,
}

/// Converts an RGB image into a `1x3xHxW` float array of raw pixel values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToArray {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToTensor {}

pub enum ImageTransformResult {
    RgbImage(RgbImage),
    Array4(Array4<f32>),
    Tensor(Tensor),
}

impl From<RgbImage> for ImageTransformResult {
    fn from(rgb_image: RgbImage) -> Self {
        ImageTransformResult::RgbImage(rgb_image)
    }
}

impl From<Array4<f32>> for ImageTransformResult {
    fn from(arr: Array4<f32>) -> Self {
        ImageTransformResult::Array4(arr)
    }
}

impl From<Tensor> for ImageTransformResult {
    fn from(tensor: Tensor) -> Self {
        ImageTransformResult::Tensor(tensor)
    }
}
