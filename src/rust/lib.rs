//! An image classifier library running pretrained, optionally quantized,
//! models through ONNX Runtime.
//!
//! A [`Classifier`] is loaded once from a model artifact (`.onnx`, or the
//! precompiled flat-buffer `.ort` format) and a label dictionary with one
//! class name per line. Each call converts an image to the model's input
//! tensor, runs one forward pass and returns the classes ranked by confidence.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use image_classifier::Classifier;
//!
//! let classifier = Classifier::builder()
//!     .with_model("models/mobilenet/model.ort")?
//!     .with_labels("models/mobilenet/dict.txt")?
//!     .build()?;
//!
//! for result in classifier.classify_file("dog.jpg", Some(0.25))? {
//!     println!("{}: {}", result.label, result.formatted_confidence());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Errors
//!
//! Failures are reported as [`ClassifierError`], one variant per kind:
//! `ModelLoadError` at startup, `ImageDecodeError` for a bad image (the
//! caller can skip it and go on), `InferenceError` when the model output and
//! the label dictionary disagree.
//!
//! # Thread Safety
//!
//! The classifier is thread-safe and can be shared across threads using `Arc`:
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use image_classifier::Classifier;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let classifier = Arc::new(Classifier::load("model.ort", "dict.txt")?);
//!
//! let mut handles = vec![];
//! for path in ["a.jpg", "b.png"] {
//!     let classifier = Arc::clone(&classifier);
//!     handles.push(thread::spawn(move || classifier.classify_file(path, None)));
//! }
//!
//! for handle in handles {
//!     let _ = handle.join();
//! }
//! # Ok(())
//! # }
//! ```

pub mod classifier;
mod runtime;
pub mod model_manager;

pub use classifier::{
    Classification, ClassificationResult, Classifier, ClassifierBuilder, ClassifierConfig,
    ClassifierError, ClassifierInfo, InferenceBackend, InputElementType, InputSpec, InputTensor,
    LabelDictionary, OrtBackend, TensorLayout,
};
pub use runtime::{RuntimeConfig, create_session_builder};
pub use model_manager::{ModelManager, ModelError, ModelInfo};

pub fn init_logger() {
    env_logger::init();
}
