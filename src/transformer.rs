use enum_dispatch::enum_dispatch;
use image::imageops::resize;
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::{tract_ndarray, tract_ndarray::Ix4, Tensor};
use tract_onnx::tract_core::ndarray::Array;

use super::ImageTransformResult;
use super::{ResizeRgbImage, ToArray, ToTensor};

#[enum_dispatch]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum ImageTransform {
    ResizeRgbImage(ResizeRgbImage),
    Normalization(Normalization),
    Transpose(Transpose),
    ToArray(ToArray),
    ToTensor(ToTensor),
}

#[enum_dispatch(ImageTransform)]
pub trait GenericTransform {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult, &'static str>;
}

impl GenericTransform for ResizeRgbImage {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult, &'static str> {
        match input {
            ImageTransformResult::RgbImage(image) => Ok(resize(
                &image,
                self.image_size.width as u32,
                self.image_size.height as u32,
                self.filter,
            )
            .into()),
            ImageTransformResult::Tensor(_) => Err("Image resize not implemented for Tensor"),
            ImageTransformResult::Array4(_) => Err("Image resize not implemented for Array4"),
        }
    }
}

/// Per-channel `(x - sub) / div`, optionally scaling pixels into `[0, 1]` first.
/// Expects a `1x3xHxW` array.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Normalization {
    sub: [f32; 3],
    div: [f32; 3],
    zeroone: bool,
}

impl Normalization {
    pub fn new(sub: [f32; 3], div: [f32; 3], zeroone: bool) -> Self {
        Normalization { sub, div, zeroone }
    }

    /// Plain `pixel / 255`, the rescaling the classifier was trained with.
    pub fn unit_range() -> Self {
        Normalization::new([0.0; 3], [1.0; 3], true)
    }
}

impl GenericTransform for Normalization {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult, &'static str> {
        match input {
            ImageTransformResult::RgbImage(_) => Err("Normalization not implemented for RgbImage"),
            ImageTransformResult::Tensor(_) => Err("Normalization not implemented for Tensor"),
            ImageTransformResult::Array4(arr) => {
                let sub = Array::from_shape_vec((1, 3, 1, 1), self.sub.to_vec())
                    .map_err(|_| "Wrong conversion to array")?;
                let div = Array::from_shape_vec((1, 3, 1, 1), self.div.to_vec())
                    .map_err(|_| "Wrong conversion to array")?;
                let new_arr = if self.zeroone {
                    (arr / 255.0 - sub) / div
                } else {
                    (arr - sub) / div
                };
                Ok(ImageTransformResult::Array4(new_arr))
            }
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transpose {
    axes: [usize; 4],
}

impl Transpose {
    pub fn new(axes: [usize; 4]) -> Self {
        Transpose { axes }
    }

    /// `NCHW -> NHWC`
    pub fn channels_last() -> Self {
        Transpose::new([0, 2, 3, 1])
    }
}

impl GenericTransform for Transpose {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult, &'static str> {
        match input {
            ImageTransformResult::RgbImage(_) => Err("Transpose not implemented for RgbImage"),
            ImageTransformResult::Array4(arr) => {
                let arr = arr.permuted_axes(self.axes).as_standard_layout().into_owned();
                Ok(ImageTransformResult::Array4(arr))
            }
            ImageTransformResult::Tensor(tensor) => {
                // tensor permutation is only valid when the rank matches the axes
                let tensor = tensor
                    .permute_axes(&self.axes)
                    .map_err(|_| "Transpose should match the shape of the tensor")?;
                Ok(ImageTransformResult::Tensor(tensor))
            }
        }
    }
}

impl GenericTransform for ToArray {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult, &'static str> {
        match input {
            ImageTransformResult::RgbImage(image) => {
                let (width, height) = image.dimensions();
                let arr = tract_ndarray::Array4::from_shape_fn(
                    (1_usize, 3_usize, height as usize, width as usize),
                    |(_, c, y, x)| image[(x as _, y as _)][c] as f32,
                );
                Ok(ImageTransformResult::Array4(arr))
            }
            ImageTransformResult::Tensor(tensor) => {
                let dyn_arr = tensor
                    .into_array::<f32>()
                    .map_err(|_| "Cannot convert tensor to Array4")?;
                let arr4 = dyn_arr
                    .into_dimensionality::<Ix4>()
                    .map_err(|_| "Cannot convert dynamic Array to Array4")?;
                Ok(ImageTransformResult::Array4(arr4))
            }
            // already an array
            ImageTransformResult::Array4(arr4) => Ok(ImageTransformResult::Array4(arr4)),
        }
    }
}

impl GenericTransform for ToTensor {
    fn transform(&self, input: ImageTransformResult) -> Result<ImageTransformResult, &'static str> {
        match input {
            ImageTransformResult::RgbImage(image) => {
                let (width, height) = image.dimensions();
                let tensor: Tensor = tract_ndarray::Array4::from_shape_fn(
                    (1_usize, 3_usize, height as usize, width as usize),
                    |(_, c, y, x)| image[(x as _, y as _)][c] as f32,
                )
                .into();
                Ok(ImageTransformResult::Tensor(tensor))
            }
            // already a tensor
            ImageTransformResult::Tensor(tensor) => Ok(ImageTransformResult::Tensor(tensor)),
            ImageTransformResult::Array4(arr4) => Ok(ImageTransformResult::Tensor(arr4.into())),
        }
    }
}
