use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::Array4;

/// Resize filter used for every input. Bicubic, matching the default the
/// training-side preprocessing used.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Number of color channels every model input carries.
pub const CHANNELS: usize = 3;

/// Element type of the model's input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputElementType {
    /// Normalized floating point input in `[-1, 1]`
    Float32,
    /// Raw quantized bytes in `[0, 255]`
    Uint8,
}

/// Axis order of the model's input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
    /// `[1, height, width, 3]`
    #[default]
    Nhwc,
    /// `[1, 3, height, width]`
    Nchw,
}

/// The input contract a loaded model declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub height: u32,
    pub width: u32,
    pub element_type: InputElementType,
    pub layout: TensorLayout,
}

impl InputSpec {
    pub fn new(height: u32, width: u32, element_type: InputElementType) -> Self {
        Self {
            height,
            width,
            element_type,
            layout: TensorLayout::Nhwc,
        }
    }

    pub fn with_layout(mut self, layout: TensorLayout) -> Self {
        self.layout = layout;
        self
    }

    /// True when the model expects normalized floats rather than raw bytes.
    pub fn is_floating(&self) -> bool {
        self.element_type == InputElementType::Float32
    }

    /// Tensor shape for a batch of one, in this input's layout.
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        let (h, w) = (self.height as usize, self.width as usize);
        match self.layout {
            TensorLayout::Nhwc => (1, h, w, CHANNELS),
            TensorLayout::Nchw => (1, CHANNELS, h, w),
        }
    }
}

/// A batch-of-one image tensor ready to bind as the model input.
#[derive(Debug, Clone, PartialEq)]
pub enum InputTensor {
    Float32(Array4<f32>),
    Uint8(Array4<u8>),
}

impl InputTensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float32(a) => a.shape(),
            Self::Uint8(a) => a.shape(),
        }
    }
}

/// Maps a raw `[0, 255]` channel value to `[-1, 1]`.
#[inline]
pub fn normalize_pixel(value: u8) -> f32 {
    (value as f32 - 127.5) / 127.5
}

/// Converts an image into the tensor the model expects.
///
/// The pipeline is fixed:
/// 1. Convert to 3-channel RGB (alpha dropped, grayscale expanded)
/// 2. Resize to exactly `(width, height)` with [`RESIZE_FILTER`]
/// 3. Add the batch dimension
/// 4. For floating models map every value through [`normalize_pixel`];
///    quantized models get the raw bytes
pub fn preprocess(image: &DynamicImage, spec: &InputSpec) -> InputTensor {
    let rgb = image.to_rgb8();
    let resized = if rgb.dimensions() == (spec.width, spec.height) {
        rgb
    } else {
        imageops::resize(&rgb, spec.width, spec.height, RESIZE_FILTER)
    };

    let pixels = to_array(&resized, spec);
    match spec.element_type {
        InputElementType::Float32 => InputTensor::Float32(pixels.mapv(normalize_pixel)),
        InputElementType::Uint8 => InputTensor::Uint8(pixels),
    }
}

fn to_array(rgb: &RgbImage, spec: &InputSpec) -> Array4<u8> {
    match spec.layout {
        TensorLayout::Nhwc => Array4::from_shape_fn(spec.shape(), |(_, y, x, c)| {
            rgb.get_pixel(x as u32, y as u32)[c]
        }),
        TensorLayout::Nchw => Array4::from_shape_fn(spec.shape(), |(_, c, y, x)| {
            rgb.get_pixel(x as u32, y as u32)[c]
        }),
    }
}
