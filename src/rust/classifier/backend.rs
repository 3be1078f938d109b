use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use log::{debug, info};
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};

use super::error::ClassifierError;
use super::preprocess::{InputElementType, InputSpec, InputTensor, TensorLayout, CHANNELS};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Executes a forward pass for an image classification model.
///
/// Implementations own whatever the runtime needs to evaluate the graph and
/// expose the input contract the model declares. The classifier takes care of
/// preprocessing and ranking, a backend only maps one input tensor to one
/// score per class.
///
/// The ONNX Runtime implementation is [`OrtBackend`]. Other runtimes, or fixed
/// score tables in tests, plug in through
/// [`Classifier::from_backend`](crate::Classifier::from_backend).
pub trait InferenceBackend: Send + Sync + fmt::Debug {
    /// Returns the input tensor contract (size, element type, layout)
    fn input_spec(&self) -> &InputSpec;

    /// Returns the number of classes when the model declares it statically
    fn output_len(&self) -> Option<usize> {
        None
    }

    /// Runs one forward pass and returns the squeezed raw output scores.
    ///
    /// Quantized outputs are widened to `f32` without rescaling; the caller
    /// normalizes them into confidences.
    fn run(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputElementType {
    Float32,
    Uint8,
}

/// An [`InferenceBackend`] over an ONNX Runtime session.
///
/// Accepts both `.onnx` graphs and precompiled `.ort` flat-buffer models.
/// The session is created and its buffers allocated once, in [`OrtBackend::load`].
#[derive(Debug)]
pub struct OrtBackend {
    session: Session,
    input_name: String,
    input_spec: InputSpec,
    output_type: OutputElementType,
    output_len: Option<usize>,
}

impl OrtBackend {
    /// Loads a model file and inspects its input and output tensors.
    ///
    /// # Errors
    /// - `ModelLoadError` if the file is missing or cannot be parsed
    /// - `ModelLoadError` if the model does not have a single image input of
    ///   shape `[1, H, W, 3]` or `[1, 3, H, W]` with `f32` or `u8` elements
    /// - `ModelLoadError` if the first output is not `f32` or `u8`
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoadError(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = create_session_builder(config)?
            .commit_from_file(model_path)
            .map_err(|e| {
                ClassifierError::ModelLoadError(format!(
                    "Failed to load model {}: {}",
                    model_path.display(),
                    e
                ))
            })?;

        let backend = Self::from_session(session)?;
        info!(
            "Loaded model {} (input {}x{} {:?} {:?}, {} classes)",
            model_path.display(),
            backend.input_spec.width,
            backend.input_spec.height,
            backend.input_spec.element_type,
            backend.input_spec.layout,
            backend
                .output_len
                .map(|n| n.to_string())
                .unwrap_or_else(|| "dynamic".to_string())
        );
        Ok(backend)
    }

    /// Wraps an existing session, validating its input and output structure.
    pub fn from_session(session: Session) -> Result<Self, ClassifierError> {
        let input = session.inputs.first().ok_or_else(|| {
            ClassifierError::ModelLoadError("Model must have one image input, found none".into())
        })?;
        let (input_type, input_dims) = tensor_parts(&input.input_type, "input")?;
        let input_spec = input_spec_from(input_type, input_dims)?;
        let input_name = input.name.clone();

        let output = session.outputs.first().ok_or_else(|| {
            ClassifierError::ModelLoadError("Model must have at least 1 output for scores".into())
        })?;
        let (output_type, output_dims) = tensor_parts(&output.output_type, "output")?;
        let output_type = match output_type {
            TensorElementType::Float32 => OutputElementType::Float32,
            TensorElementType::Uint8 => OutputElementType::Uint8,
            other => {
                return Err(ClassifierError::ModelLoadError(format!(
                    "Unsupported output element type {:?}, expected f32 or u8",
                    other
                )))
            }
        };
        let output_len = output_len_from(output_dims);
        debug!(
            "Model input '{}' dims {:?}, output dims {:?}",
            input_name, input_dims, output_dims
        );

        Ok(Self {
            session,
            input_name,
            input_spec,
            output_type,
            output_len,
        })
    }
}

impl InferenceBackend for OrtBackend {
    fn input_spec(&self) -> &InputSpec {
        &self.input_spec
    }

    fn output_len(&self) -> Option<usize> {
        self.output_len
    }

    fn run(&self, input: InputTensor) -> Result<Vec<f32>, ClassifierError> {
        let outputs = match input {
            InputTensor::Float32(array) => {
                let tensor = Tensor::from_array(array).map_err(|e| {
                    ClassifierError::InferenceError(format!("Failed to create input tensor: {}", e))
                })?;
                let mut inputs = HashMap::new();
                inputs.insert(self.input_name.as_str(), tensor);
                self.session.run(inputs)
            }
            InputTensor::Uint8(array) => {
                let tensor = Tensor::from_array(array).map_err(|e| {
                    ClassifierError::InferenceError(format!("Failed to create input tensor: {}", e))
                })?;
                let mut inputs = HashMap::new();
                inputs.insert(self.input_name.as_str(), tensor);
                self.session.run(inputs)
            }
        }
        .map_err(|e| ClassifierError::InferenceError(format!("Failed to run model: {}", e)))?;

        let output = &outputs[0];
        let scores = match self.output_type {
            OutputElementType::Float32 => output
                .try_extract_tensor::<f32>()
                .map_err(|e| extract_error(&e))?
                .iter()
                .copied()
                .collect(),
            OutputElementType::Uint8 => output
                .try_extract_tensor::<u8>()
                .map_err(|e| extract_error(&e))?
                .iter()
                .map(|&v| f32::from(v))
                .collect(),
        };
        Ok(scores)
    }
}

fn extract_error(e: &ort::Error) -> ClassifierError {
    ClassifierError::InferenceError(format!("Failed to extract output tensor: {}", e))
}

fn tensor_parts<'a>(
    value_type: &'a ValueType,
    which: &str,
) -> Result<(TensorElementType, &'a [i64]), ClassifierError> {
    match value_type {
        ValueType::Tensor { ty, dimensions, .. } => Ok((*ty, dimensions.as_slice())),
        other => Err(ClassifierError::ModelLoadError(format!(
            "Model {} must be a tensor, found {:?}",
            which, other
        ))),
    }
}

/// Derives the input contract from a declared input tensor.
///
/// Channels-last `[1, H, W, 3]` is the convention; channels-first
/// `[1, 3, H, W]` is recognised when only dimension 1 is 3.
pub(crate) fn input_spec_from(
    ty: TensorElementType,
    dims: &[i64],
) -> Result<InputSpec, ClassifierError> {
    let element_type = match ty {
        TensorElementType::Float32 => InputElementType::Float32,
        TensorElementType::Uint8 => InputElementType::Uint8,
        other => {
            return Err(ClassifierError::ModelLoadError(format!(
                "Unsupported input element type {:?}, expected f32 or u8",
                other
            )))
        }
    };

    if dims.len() != 4 {
        return Err(ClassifierError::ModelLoadError(format!(
            "Model input must have rank 4, found shape {:?}",
            dims
        )));
    }
    if dims[0] != 1 {
        return Err(ClassifierError::ModelLoadError(format!(
            "Model input batch dimension must be 1, found {}",
            dims[0]
        )));
    }

    let channels = CHANNELS as i64;
    let (layout, height, width) = if dims[3] == channels {
        (TensorLayout::Nhwc, dims[1], dims[2])
    } else if dims[1] == channels {
        (TensorLayout::Nchw, dims[2], dims[3])
    } else {
        return Err(ClassifierError::ModelLoadError(format!(
            "Model input must have 3 color channels, found shape {:?}",
            dims
        )));
    };

    let height = u32::try_from(height).ok().filter(|&h| h > 0);
    let width = u32::try_from(width).ok().filter(|&w| w > 0);
    match (height, width) {
        (Some(height), Some(width)) => {
            Ok(InputSpec::new(height, width, element_type).with_layout(layout))
        }
        _ => Err(ClassifierError::ModelLoadError(format!(
            "Model input height and width must be fixed, found shape {:?}",
            dims
        ))),
    }
}

/// Number of scores after squeezing, when every non-batch dimension is fixed.
pub(crate) fn output_len_from(dims: &[i64]) -> Option<usize> {
    dims.iter()
        .enumerate()
        .try_fold(1usize, |acc, (axis, &dim)| match usize::try_from(dim) {
            Ok(d) => acc.checked_mul(d),
            // a dynamic batch axis squeezes away like a fixed one
            Err(_) if axis == 0 => Some(acc),
            Err(_) => None,
        })
}
