use std::path::{Path, PathBuf};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::backend::{InferenceBackend, OrtBackend};
use super::classifier::Classifier;
use super::error::ClassifierError;
use super::labels::LabelDictionary;
use crate::runtime::RuntimeConfig;

/// Named, typed settings for a classifier: where the model and labels live,
/// and the default confidence cut-off callers should apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub label_path: PathBuf,
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

impl ClassifierConfig {
    pub fn new(model_path: impl Into<PathBuf>, label_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            label_path: label_path.into(),
            min_confidence: None,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }
}

/// A builder for constructing a Classifier with a fluent interface.
///
/// Both the model and the label dictionary are required. Files are read as
/// soon as they are set, so a bad path fails at the call that named it.
#[derive(Default, Debug)]
pub struct ClassifierBuilder {
    model_path: Option<String>,
    backend: Option<Box<dyn InferenceBackend>>,
    labels: Option<LabelDictionary>,
    min_confidence: Option<f32>,
    runtime_config: RuntimeConfig,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use image_classifier::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            model_path: None,
            backend: None,
            labels: None,
            min_confidence: None,
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Only affects models loaded after this call.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Loads the model artifact (`.onnx` or `.ort`) and allocates its session.
    ///
    /// # Errors
    /// - `ModelLoadError` if a model is already set, the path is empty, the
    ///   file does not exist, or the model cannot be parsed or has an
    ///   unsupported input/output structure
    pub fn with_model<P: AsRef<Path>>(mut self, model_path: P) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if model_path.as_os_str().is_empty() {
            return Err(ClassifierError::ModelLoadError("Model path cannot be empty".to_string()));
        }
        if self.backend.is_some() {
            return Err(ClassifierError::ModelLoadError("Model already set".to_string()));
        }

        let backend = OrtBackend::load(model_path, &self.runtime_config)?;
        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.backend = Some(Box::new(backend));
        Ok(self)
    }

    /// Uses an already constructed backend instead of loading a model file.
    pub fn with_backend(
        mut self,
        backend: Box<dyn InferenceBackend>,
    ) -> Result<Self, ClassifierError> {
        if self.backend.is_some() {
            return Err(ClassifierError::ModelLoadError("Model already set".to_string()));
        }
        self.backend = Some(backend);
        Ok(self)
    }

    /// Reads the label dictionary file.
    ///
    /// # Errors
    /// - `ModelLoadError` if the path is empty or the file cannot be read
    pub fn with_labels<P: AsRef<Path>>(mut self, label_path: P) -> Result<Self, ClassifierError> {
        let label_path = label_path.as_ref();
        if label_path.as_os_str().is_empty() {
            return Err(ClassifierError::ModelLoadError("Label path cannot be empty".to_string()));
        }
        let labels = LabelDictionary::from_file(label_path)?;
        info!("Loaded {} labels from {}", labels.len(), label_path.display());
        self.labels = Some(labels);
        Ok(self)
    }

    /// Uses an in-memory label dictionary.
    pub fn with_label_dictionary(mut self, labels: LabelDictionary) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Sets the classifier's default confidence cut-off.
    ///
    /// The value is checked in [`build`](Self::build).
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = Some(min_confidence);
        self
    }

    /// Loads the model and labels named by a [`ClassifierConfig`] and takes
    /// over its `min_confidence`.
    pub fn with_config(mut self, config: &ClassifierConfig) -> Result<Self, ClassifierError> {
        self.min_confidence = config.min_confidence;
        self.with_model(&config.model_path)?
            .with_labels(&config.label_path)
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The constructed Classifier if
    ///   successful, or an error if:
    ///   - No model has been set
    ///   - No label dictionary has been set
    ///   - The model declares a class count different from the label count
    ///   - The minimum confidence is outside `[0, 1]` (`ValidationError`)
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let backend = self
            .backend
            .ok_or_else(|| ClassifierError::ModelLoadError("A model must be set".to_string()))?;
        let labels = self.labels.ok_or_else(|| {
            ClassifierError::ModelLoadError("A label dictionary must be set".to_string())
        })?;

        if backend.output_len().is_none() {
            warn!("Model output size is dynamic; label count is checked on each classification");
        }

        let mut classifier = Classifier::from_backend(labels, backend)?
            .with_default_min_confidence(self.min_confidence)?;
        classifier.model_path = self.model_path;
        Ok(classifier)
    }
}
