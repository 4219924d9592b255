use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use serde::Serialize;
use tracing::{debug, info};
use tract_onnx::prelude::Tensor;
use tract_onnx::prelude::*;
use tract_onnx::tract_hir::internal::DimLike;

use super::classifier::Predictor;
use super::error::{Error, Result};
use super::{GenericTransform, ImageTransform, Normalization, Transpose};
use super::{ImageSize, ResizeRgbImage, ToTensor};
use super::{ImageTransformResult, ToArray};

type TractSimplePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Memory layout of the model's image input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TensorLayout {
    /// `1x3xHxW`
    Nchw,
    /// `1xHxWx3`, what Keras exports
    Nhwc,
}

impl TensorLayout {
    fn input_shape(&self, size: ImageSize) -> TVec<usize> {
        match self {
            TensorLayout::Nchw => tvec!(1, 3, size.height, size.width),
            TensorLayout::Nhwc => tvec!(1, size.height, size.width, 3),
        }
    }
}

/// Finds the layout and spatial size of a declared rank-4 image input.
///
/// `None` marks a symbolic dim. Declared height and width win over `fallback`,
/// which only fills in what the model leaves open.
pub(crate) fn resolve_input(
    dims: &[Option<usize>],
    fallback: Option<ImageSize>,
) -> std::result::Result<(TensorLayout, ImageSize), String> {
    if dims.len() != 4 {
        return Err(format!("expected a rank-4 image input, found rank {}", dims.len()));
    }

    let (layout, height, width) = if dims[3] == Some(3) {
        (TensorLayout::Nhwc, dims[1], dims[2])
    } else if dims[1] == Some(3) {
        (TensorLayout::Nchw, dims[2], dims[3])
    } else {
        return Err(format!("no 3-channel axis in input shape {dims:?}"));
    };

    let height = height.or(fallback.map(|s| s.height));
    let width = width.or(fallback.map(|s| s.width));
    match (height, width) {
        (Some(height), Some(width)) if height > 0 && width > 0 => {
            Ok((layout, ImageSize { width, height }))
        }
        _ => Err(format!(
            "input height/width are not fixed in {dims:?}; configure an input size"
        )),
    }
}

/// Preprocessing steps plus the optimized ONNX plan, loaded once.
pub struct TransformationPipeline {
    steps: Vec<ImageTransform>,
    model: TractSimplePlan,
    input_size: ImageSize,
}

impl TransformationPipeline {
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_size: Option<ImageSize>,
        filter: FilterType,
    ) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: String| Error::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        if !path.exists() {
            return Err(load_error("file not found".to_string()));
        }
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| load_error(e.to_string()))?;

        let declared = TransformationPipeline::declared_input_dims(&model).map_err(load_error)?;
        let (layout, input_size) = resolve_input(&declared, input_size).map_err(load_error)?;
        debug!(?declared, ?layout, "resolved model input");

        let plan = model
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), layout.input_shape(input_size)),
            )
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| load_error(e.to_string()))?;

        info!(
            model = %path.display(),
            width = input_size.width,
            height = input_size.height,
            ?layout,
            "model loaded"
        );
        Ok(TransformationPipeline::new(plan, input_size, layout, filter))
    }

    fn new(model: TractSimplePlan, input_size: ImageSize, layout: TensorLayout, filter: FilterType) -> Self {
        let mut steps: Vec<ImageTransform> = vec![
            ResizeRgbImage {
                image_size: input_size,
                filter,
            }
            .into(),
            ToArray {}.into(),
            Normalization::unit_range().into(),
        ];
        if layout == TensorLayout::Nhwc {
            steps.push(Transpose::channels_last().into());
        }
        steps.push(ToTensor {}.into());

        if let Ok(json) = serde_json::to_string(&steps) {
            debug!(steps = %json, "preprocessing pipeline");
        }

        TransformationPipeline {
            steps,
            model,
            input_size,
        }
    }

    fn declared_input_dims(model: &InferenceModel) -> std::result::Result<Vec<Option<usize>>, String> {
        let typed = model.clone().into_typed().map_err(|e| e.to_string())?;
        let fact = typed.input_fact(0).map_err(|e| e.to_string())?;
        Ok(fact.shape.iter().map(|dim| dim.to_usize().ok()).collect())
    }

    fn transform_image(&self, image: RgbImage) -> std::result::Result<Tensor, &'static str> {
        let mut result = ImageTransformResult::RgbImage(image);

        for step in &self.steps {
            result = step.transform(result)?;
        }

        match result {
            ImageTransformResult::Tensor(t) => Ok(t),
            _ => Err("Should be converted to tensor already"),
        }
    }
}

impl Predictor for TransformationPipeline {
    fn input_size(&self) -> ImageSize {
        self.input_size
    }

    fn predict(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let image_tensor = self
            .transform_image(image.to_rgb8())
            .map_err(|e| Error::Inference(e.to_string()))?;
        let outputs = self
            .model
            .run(tvec!(image_tensor))
            .map_err(|e| Error::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
        let probabilities: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(format!("cannot read output as f32: {e}")))?
            .iter()
            .cloned()
            .collect();
        Ok(probabilities)
    }
}
