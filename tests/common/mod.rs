#![allow(dead_code)]

pub mod onnx;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use image_classifier::{
    Classifier, ClassifierError, InferenceBackend, InputElementType, InputSpec, InputTensor,
    LabelDictionary,
};
use std::io::Cursor;
use std::sync::Mutex;

/// Returns the same scores for every image.
#[derive(Debug)]
pub struct FixedScores {
    pub spec: InputSpec,
    pub scores: Vec<f32>,
    pub declared_len: Option<usize>,
}

impl FixedScores {
    pub fn quantized(scores: &[u8]) -> Self {
        Self {
            spec: InputSpec::new(4, 4, InputElementType::Uint8),
            scores: scores.iter().map(|&s| f32::from(s)).collect(),
            declared_len: None,
        }
    }

    pub fn floating(scores: &[f32]) -> Self {
        Self {
            spec: InputSpec::new(4, 4, InputElementType::Float32),
            scores: scores.to_vec(),
            declared_len: None,
        }
    }
}

impl InferenceBackend for FixedScores {
    fn input_spec(&self) -> &InputSpec {
        &self.spec
    }

    fn output_len(&self) -> Option<usize> {
        self.declared_len
    }

    fn run(&self, _input: InputTensor) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.scores.clone())
    }
}

/// Scores each class from the image content, so different images rank differently.
#[derive(Debug)]
pub struct PixelScores {
    pub spec: InputSpec,
    pub classes: usize,
}

impl InferenceBackend for PixelScores {
    fn input_spec(&self) -> &InputSpec {
        &self.spec
    }

    fn run(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError> {
        let InputTensor::Uint8(pixels) = input else {
            return Err(ClassifierError::InferenceError("expected a quantized input".into()));
        };
        let sum: u64 = pixels.iter().map(|&v| u64::from(v)).sum();
        Ok((0..self.classes as u64)
            .map(|i| ((sum.wrapping_mul(i + 7) + i * 31) % 256) as f32)
            .collect())
    }
}

/// Remembers the last input tensor it was given.
#[derive(Debug)]
pub struct RecordingBackend {
    pub spec: InputSpec,
    pub classes: usize,
    pub last_input: Mutex<Option<InputTensor>>,
}

impl RecordingBackend {
    pub fn new(spec: InputSpec, classes: usize) -> Self {
        Self {
            spec,
            classes,
            last_input: Mutex::new(None),
        }
    }
}

impl InferenceBackend for RecordingBackend {
    fn input_spec(&self) -> &InputSpec {
        &self.spec
    }

    fn run(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError> {
        *self.last_input.lock().unwrap() = Some(input);
        Ok(vec![0.5; self.classes])
    }
}

pub fn labels(names: &[&str]) -> LabelDictionary {
    names.iter().copied().collect()
}

pub fn classifier_with(names: &[&str], backend: impl InferenceBackend + 'static) -> Classifier {
    Classifier::from_backend(labels(names), Box::new(backend)).expect("failed to build classifier")
}

/// The 200/50 two-class quantized model.
pub fn two_class_classifier() -> Classifier {
    classifier_with(&["class_zero", "class_one"], FixedScores::quantized(&[200, 50]))
}

pub fn solid_image(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
}

pub fn gradient_image(width: u32, height: u32, seed: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x as u8).wrapping_mul(seed),
            (y as u8).wrapping_add(seed),
            ((x + y) as u8) ^ seed,
        ])
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("failed to encode test image");
    bytes
}
