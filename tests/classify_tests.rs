mod common;

use common::*;
use image::DynamicImage;
use vrikzo_cnn::{classify, classify_bytes, Error};

#[test]
fn end_to_end_tomato_early_blight() {
    let model = FixedPredictor(vec![0.02, 0.95, 0.03]);
    let image = DynamicImage::ImageRgb8(solid(RED));

    let result = classify(&image, &model, &labels()).unwrap();
    assert_eq!(result.plant, "Tomato");
    assert_eq!(result.condition, "Early Blight");
    assert!((result.confidence_percent - 95.0).abs() < 1e-3);
    assert!(result.message.contains("appears to have"));
    assert_eq!(result.raw_label, "Tomato___Early_blight");
}

#[test]
fn healthy_label_ignores_low_confidence() {
    let model = FixedPredictor(vec![0.40, 0.35, 0.25]);
    let result = classify(&DynamicImage::ImageRgb8(solid(GREEN)), &model, &labels()).unwrap();
    assert_eq!(result.plant, "Aloe Vera");
    assert_eq!(result.message, "This looks like a healthy Aloe Vera");
}

#[test]
fn tie_selects_lowest_index() {
    let model = FixedPredictor(vec![0.1, 0.45, 0.45]);
    let result = classify(&DynamicImage::ImageRgb8(solid(RED)), &model, &labels()).unwrap();
    assert_eq!(result.raw_label, "Tomato___Early_blight");
}

#[test]
fn mismatched_model_reports_failure() {
    let model = FixedPredictor(vec![0.0, 0.0, 0.1, 0.9]);
    let err = classify(&DynamicImage::ImageRgb8(solid(RED)), &model, &labels()).unwrap_err();
    assert!(matches!(err, Error::IndexMismatch { index: 3, labels: 3 }));
}

#[test]
fn empty_output_reports_failure() {
    let model = FixedPredictor(Vec::new());
    let err = classify(&DynamicImage::ImageRgb8(solid(RED)), &model, &labels()).unwrap_err();
    assert!(matches!(err, Error::Inference(_)));
}

#[test]
fn undecodable_bytes_report_failure() {
    let err = classify_bytes(b"GIF89a-not-really", &ColorPredictor, &labels()).unwrap_err();
    assert!(matches!(err, Error::ImageDecode(_)));
}

#[test]
fn context_classifies_encoded_images() {
    let context = context(ColorPredictor);
    assert_eq!(context.model_id(), "vrikzo_model.onnx");
    assert_eq!(context.labels().len(), 3);

    let result = context.classify_bytes(&png_bytes(BLUE)).unwrap();
    assert_eq!(result.plant, "Hibiscus");
    assert_eq!(result.condition, "Death Leaf");
    assert_eq!(
        result.message,
        "I detected possible Death Leaf in your Hibiscus, but confidence is low."
    );
}
