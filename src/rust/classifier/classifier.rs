use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Seek};
use std::path::Path;
use std::sync::Arc;
use image::{DynamicImage, ImageReader};
use log::{debug, warn};
use serde::{Serialize, Serializer};

use super::backend::InferenceBackend;
use super::error::ClassifierError;
use super::labels::LabelDictionary;
use super::preprocess::preprocess;
use super::ranking::{rank_scores, ranked_prefix};

/// One ranked entry of a classification.
///
/// `confidence` keeps full precision for comparisons. The reported form,
/// both [`formatted_confidence`](Self::formatted_confidence) and the serde
/// representation, is rounded to two decimals:
///
/// ```json
/// {"label": "golden retriever", "confidence": "0.78"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: String,
    #[serde(serialize_with = "serialize_confidence")]
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Confidence as text with two decimal places.
    pub fn formatted_confidence(&self) -> String {
        format!("{:.2}", self.confidence)
    }
}

fn serialize_confidence<S: Serializer>(
    confidence: &f32,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}", confidence))
}

/// Ranked classifications, highest confidence first.
pub type ClassificationResult = Vec<Classification>;

/// An image classifier bound to one loaded model and its label dictionary.
///
/// This is the model handle: it is built once at startup, is read-only
/// afterwards, and is passed by reference to whatever needs inference.
///
/// # Thread Safety
///
/// `Classifier` is `Send + Sync`. The ONNX Runtime session evaluates with
/// shared access, so one handle can be shared through `Arc`. Other backends
/// must uphold the same guarantee through the `InferenceBackend` bounds.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use image_classifier::Classifier;
///
/// let classifier = Classifier::load("model.ort", "dict.txt")?;
/// for result in classifier.classify_file("dog.jpg", Some(0.25))? {
///     println!("{}: {}", result.label, result.formatted_confidence());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Classifier {
    pub model_path: Option<String>,
    labels: Arc<LabelDictionary>,
    backend: Box<dyn InferenceBackend>,
    default_min_confidence: Option<f32>,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Loads a model and its label dictionary with the default runtime settings.
    ///
    /// # Errors
    /// - `ModelLoadError` if either file is missing, unreadable or malformed
    pub fn load<M: AsRef<Path>, L: AsRef<Path>>(
        model_path: M,
        label_path: L,
    ) -> Result<Self, ClassifierError> {
        Self::builder()
            .with_model(model_path)?
            .with_labels(label_path)?
            .build()
    }

    /// Binds a label dictionary to an already constructed backend.
    ///
    /// # Errors
    /// - `ModelLoadError` if the backend declares a class count that differs
    ///   from the number of labels
    pub fn from_backend(
        labels: LabelDictionary,
        backend: Box<dyn InferenceBackend>,
    ) -> Result<Self, ClassifierError> {
        if let Some(classes) = backend.output_len() {
            if classes != labels.len() {
                return Err(ClassifierError::ModelLoadError(format!(
                    "Model declares {} classes but the label dictionary has {} labels",
                    classes,
                    labels.len()
                )));
            }
        }
        Ok(Self {
            model_path: None,
            labels: Arc::new(labels),
            backend,
            default_min_confidence: None,
        })
    }

    /// Sets the threshold returned by [`default_min_confidence`](Self::default_min_confidence).
    ///
    /// # Errors
    /// - `ValidationError` if the value is not within `[0, 1]`
    pub fn with_default_min_confidence(
        mut self,
        min_confidence: Option<f32>,
    ) -> Result<Self, ClassifierError> {
        validate_threshold(min_confidence)?;
        self.default_min_confidence = min_confidence;
        Ok(self)
    }

    /// The confidence cut-off configured for this model, if any.
    ///
    /// `classify*` calls take their threshold explicitly; pass this value to
    /// apply the configured one:
    ///
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use image_classifier::{Classifier, ClassifierConfig};
    ///
    /// let config = ClassifierConfig::new("model.ort", "dict.txt").with_min_confidence(0.25);
    /// let classifier = Classifier::builder().with_config(&config)?.build()?;
    /// let results = classifier.classify_file("dog.jpg", classifier.default_min_confidence())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn default_min_confidence(&self) -> Option<f32> {
        self.default_min_confidence
    }

    /// Returns information about the loaded model
    pub fn info(&self) -> super::ClassifierInfo {
        let spec = self.backend.input_spec();
        super::ClassifierInfo {
            model_path: self.model_path.clone(),
            num_classes: self.labels.len(),
            input_height: spec.height,
            input_width: spec.width,
            floating_model: spec.is_floating(),
            layout: spec.layout,
        }
    }

    /// The label dictionary, shareable for reads.
    pub fn labels(&self) -> Arc<LabelDictionary> {
        Arc::clone(&self.labels)
    }

    /// Classifies a decoded image.
    ///
    /// # Arguments
    /// * `image` - Any decoded image; it is converted to RGB and resized to the
    ///   model input
    /// * `min_confidence` - Stop at the first ranked entry below this value;
    ///   `None` keeps all classes
    ///
    /// # Returns
    /// Classifications sorted by descending confidence. Equal scores keep
    /// ascending class order. The list is empty when the best class is already
    /// below the threshold.
    ///
    /// # Errors
    /// - `ValidationError` if `min_confidence` is not a finite value in `[0, 1]`
    /// - `InferenceError` if the forward pass fails or the number of scores
    ///   differs from the number of labels
    pub fn classify(
        &self,
        image: &DynamicImage,
        min_confidence: Option<f32>,
    ) -> Result<ClassificationResult, ClassifierError> {
        validate_threshold(min_confidence)?;

        let spec = self.backend.input_spec();
        let input = preprocess(image, spec);
        debug!("Running inference on tensor {:?}", input.shape());
        let scores = self.backend.run(input)?;

        if scores.len() != self.labels.len() {
            warn!(
                "Model produced {} scores for {} labels",
                scores.len(),
                self.labels.len()
            );
            return Err(ClassifierError::InferenceError(format!(
                "Model produced {} scores but the label dictionary has {} labels",
                scores.len(),
                self.labels.len()
            )));
        }

        let order = rank_scores(&scores);
        ranked_prefix(&scores, &order, spec.is_floating(), min_confidence)
            .map(|(index, confidence)| {
                self.labels
                    .get(index)
                    .map(|label| Classification::new(label, confidence))
                    .ok_or_else(|| {
                        ClassifierError::InferenceError(format!(
                            "No label for class index {}",
                            index
                        ))
                    })
            })
            .collect()
    }

    /// Decodes an in-memory image (any supported raster format) and classifies it.
    ///
    /// # Errors
    /// - `ImageDecodeError` if the bytes are not a decodable image
    /// - Forwards all errors from [`classify`](Self::classify)
    pub fn classify_bytes(
        &self,
        bytes: &[u8],
        min_confidence: Option<f32>,
    ) -> Result<ClassificationResult, ClassifierError> {
        self.classify_reader(Cursor::new(bytes), min_confidence)
    }

    /// Reads, decodes and classifies an image file.
    ///
    /// # Errors
    /// - `ImageDecodeError` if the file cannot be opened or decoded
    /// - Forwards all errors from [`classify`](Self::classify)
    pub fn classify_file<P: AsRef<Path>>(
        &self,
        path: P,
        min_confidence: Option<f32>,
    ) -> Result<ClassificationResult, ClassifierError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ClassifierError::ImageDecodeError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        self.classify_reader(BufReader::new(file), min_confidence)
    }

    /// Decodes an image from a seekable reader and classifies it.
    ///
    /// The format is guessed from the content.
    pub fn classify_reader<R: BufRead + Seek>(
        &self,
        reader: R,
        min_confidence: Option<f32>,
    ) -> Result<ClassificationResult, ClassifierError> {
        // a bad threshold is reported without decoding the image first
        validate_threshold(min_confidence)?;
        let image = decode(reader)?;
        self.classify(&image, min_confidence)
    }
}

fn decode<R: BufRead + Seek>(reader: R) -> Result<DynamicImage, ClassifierError> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| ClassifierError::ImageDecodeError(format!("Failed to read image: {}", e)))?;
    if reader.format().is_none() {
        return Err(ClassifierError::ImageDecodeError("Unrecognized image format".into()));
    }
    Ok(reader.decode()?)
}

fn validate_threshold(min_confidence: Option<f32>) -> Result<(), ClassifierError> {
    match min_confidence {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(ClassifierError::ValidationError(format!(
            "Minimum confidence must be within [0, 1], got {}",
            t
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatted_confidence() {
        assert_eq!(Classification::new("a", 200.0 / 255.0).formatted_confidence(), "0.78");
        assert_eq!(Classification::new("a", 1.0).formatted_confidence(), "1.00");
        assert_eq!(Classification::new("a", 0.0).formatted_confidence(), "0.00");
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_string(&Classification::new("sea lion", 0.4567)).unwrap();
        assert_eq!(json, r#"{"label":"sea lion","confidence":"0.46"}"#);
    }

    #[test]
    fn test_threshold_validation() {
        assert!(validate_threshold(None).is_ok());
        assert!(validate_threshold(Some(0.0)).is_ok());
        assert!(validate_threshold(Some(1.0)).is_ok());
        assert!(matches!(
            validate_threshold(Some(1.5)),
            Err(ClassifierError::ValidationError(_))
        ));
        assert!(matches!(
            validate_threshold(Some(-0.1)),
            Err(ClassifierError::ValidationError(_))
        ));
        assert!(matches!(
            validate_threshold(Some(f32::NAN)),
            Err(ClassifierError::ValidationError(_))
        ));
    }

    #[derive(Debug)]
    struct Constant(crate::InputSpec);

    impl InferenceBackend for Constant {
        fn input_spec(&self) -> &crate::InputSpec {
            &self.0
        }

        fn run(&self, _input: crate::InputTensor) -> Result<Vec<f32>, ClassifierError> {
            Ok(vec![0.5])
        }
    }

    fn constant_classifier() -> Classifier {
        let spec = crate::InputSpec::new(2, 2, crate::InputElementType::Float32);
        Classifier::from_backend(LabelDictionary::parse("only"), Box::new(Constant(spec))).unwrap()
    }

    #[test]
    fn test_default_min_confidence() {
        let classifier = constant_classifier();
        assert_eq!(classifier.default_min_confidence(), None);

        let classifier = classifier.with_default_min_confidence(Some(0.75)).unwrap();
        assert_eq!(classifier.default_min_confidence(), Some(0.75));

        let result = constant_classifier().with_default_min_confidence(Some(2.0));
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_bad_threshold_reported_before_decoding() {
        let result = constant_classifier().classify_bytes(b"not an image", Some(-1.0));
        assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode(Cursor::new(b"not an image at all".as_slice()));
        assert!(matches!(result, Err(ClassifierError::ImageDecodeError(_))));
    }
}
