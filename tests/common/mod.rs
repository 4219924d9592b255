#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};

use vrikzo_cnn::{ClassifierContext, ImageSize, LabelCatalog, Predictor, Result};

pub const LABELS: [&str; 3] = ["Aloe_Healthy", "Tomato___Early_blight", "hibiscus_death_leaf"];

pub fn labels() -> LabelCatalog {
    LABELS.to_vec().into()
}

/// Returns the same probabilities for every image.
pub struct FixedPredictor(pub Vec<f32>);

impl Predictor for FixedPredictor {
    fn input_size(&self) -> ImageSize {
        ImageSize { width: 8, height: 8 }
    }

    fn predict(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

/// Red images are tomatoes with early blight, green ones healthy aloe,
/// blue ones hibiscus.
pub struct ColorPredictor;

impl Predictor for ColorPredictor {
    fn input_size(&self) -> ImageSize {
        ImageSize { width: 8, height: 8 }
    }

    fn predict(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        let rgb = image.to_rgb8();
        let mut sums = [0u64; 3];
        for pixel in rgb.pixels() {
            for (c, sum) in sums.iter_mut().enumerate() {
                *sum += pixel[c] as u64;
            }
        }
        let probabilities = if sums[0] >= sums[1] && sums[0] >= sums[2] {
            vec![0.02, 0.95, 0.03]
        } else if sums[1] >= sums[2] {
            vec![0.9, 0.05, 0.05]
        } else {
            vec![0.2, 0.2, 0.6]
        };
        Ok(probabilities)
    }
}

/// Sleeps before answering, to exercise request deadlines.
pub struct SlowPredictor(pub Duration);

impl Predictor for SlowPredictor {
    fn input_size(&self) -> ImageSize {
        ImageSize { width: 8, height: 8 }
    }

    fn predict(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
        std::thread::sleep(self.0);
        Ok(vec![0.02, 0.95, 0.03])
    }
}

pub fn context<M: Predictor + 'static>(model: M) -> ClassifierContext {
    ClassifierContext::new(model, labels(), "vrikzo_model.onnx")
}

pub fn solid(color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(16, 12, Rgb(color))
}

pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(solid(color))
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

pub const RED: [u8; 3] = [220, 30, 20];
pub const GREEN: [u8; 3] = [20, 200, 40];
pub const BLUE: [u8; 3] = [10, 20, 230];
