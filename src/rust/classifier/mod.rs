mod error;
mod backend;
mod classifier;
pub mod builder;
mod labels;
mod preprocess;
mod ranking;

pub use error::ClassifierError;
pub use backend::{InferenceBackend, OrtBackend};
pub use classifier::{Classification, ClassificationResult, Classifier};
pub use builder::{ClassifierBuilder, ClassifierConfig};
pub use labels::LabelDictionary;
pub use preprocess::{
    normalize_pixel, preprocess, InputElementType, InputSpec, InputTensor, TensorLayout,
    RESIZE_FILTER,
};

/// Information about a loaded classifier
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierInfo {
    /// Path to the model file, when loaded from disk
    pub model_path: Option<String>,
    /// Number of classes in the label dictionary
    pub num_classes: usize,
    /// Input image height the model expects
    pub input_height: u32,
    /// Input image width the model expects
    pub input_width: u32,
    /// Whether the model takes normalized floats (true) or raw bytes (false)
    pub floating_model: bool,
    /// Axis order of the input tensor
    pub layout: TensorLayout,
}
