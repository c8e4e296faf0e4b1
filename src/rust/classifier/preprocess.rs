use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use ndarray::{s, Array4, ArrayView2};
use log::debug;

use super::error::ClassifierError;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;
/// Intermediate side length used by [`ResizeStrategy::CenterCrop`].
pub const RESIZE_SIZE: u32 = 256;
/// Number of values in one channel plane.
pub const CHANNEL_LEN: usize = (INPUT_SIZE * INPUT_SIZE) as usize;
/// Number of values in a full normalized tensor.
pub const TENSOR_LEN: usize = 3 * CHANNEL_LEN;
/// Shape of the model input in NCHW order.
pub const TENSOR_SHAPE: [usize; 4] = [1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize];

/// Per-channel ImageNet mean (R, G, B).
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// Per-channel ImageNet standard deviation (R, G, B).
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// How a source image of arbitrary size is brought down to the model input size.
///
/// The two strategies produce different tensors for the same input, so the
/// strategy must match the one the model was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeStrategy {
    /// Resize straight to 224x224
    Direct,
    /// Resize to 256x256, then take the central 224x224 region
    #[default]
    CenterCrop,
}

/// A normalized image tensor of shape (1, 3, 224, 224) in channel-planar layout.
///
/// Value `(c, y, x)` lives at flat index `c*224*224 + y*224 + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Array4<f32>,
}

impl NormalizedTensor {
    /// Total number of values, always [`TENSOR_LEN`]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Flat view of the tensor in CHW order
    pub fn as_slice(&self) -> &[f32] {
        // always built in standard layout, so the slice is contiguous
        self.data.as_slice().unwrap_or_default()
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array4<f32> {
        self.data
    }

    /// Returns the 224x224 plane of channel `c` (0 = R, 1 = G, 2 = B).
    ///
    /// # Panics
    /// Panics if `c >= 3`.
    pub fn channel(&self, c: usize) -> ArrayView2<'_, f32> {
        self.data.slice(s![0, c, .., ..])
    }

    /// Reconstructs the 8-bit RGB value that produced the tensor entries at `(x, y)`.
    ///
    /// Returns `None` when the coordinates fall outside the 224x224 grid.
    pub fn pixel_at(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= INPUT_SIZE as usize || y >= INPUT_SIZE as usize {
            return None;
        }
        let mut rgb = [0u8; 3];
        for (c, value) in rgb.iter_mut().enumerate() {
            *value = denormalize(self.data[[0, c, y, x]], c);
        }
        Some(rgb)
    }
}

/// Normalizes one 8-bit channel value with the ImageNet statistics of `channel`.
pub fn normalize(value: u8, channel: usize) -> f32 {
    (value as f32 / 255.0 - MEAN[channel]) / STD[channel]
}

/// Inverse of [`normalize`], rounded and clamped to the 8-bit range.
pub fn denormalize(value: f32, channel: usize) -> u8 {
    let restored = ((value * STD[channel] + MEAN[channel]) * 255.0).round();
    restored.clamp(0.0, 255.0) as u8
}

/// Splits a packed `0xAARRGGBB` pixel into its R, G, B components.
pub fn unpack_argb(pixel: u32) -> [u8; 3] {
    [
        ((pixel >> 16) & 0xFF) as u8,
        ((pixel >> 8) & 0xFF) as u8,
        (pixel & 0xFF) as u8,
    ]
}

/// Builds an RGB image from row-major packed ARGB pixels; alpha is dropped.
pub fn rgb_image_from_packed(width: u32, height: u32, pixels: &[u32]) -> Result<RgbImage, ClassifierError> {
    if width == 0 || height == 0 {
        return Err(ClassifierError::ValidationError(
            format!("Image dimensions must be non-zero, got {}x{}", width, height)
        ));
    }
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(ClassifierError::ValidationError(
            format!("Expected {} pixels for a {}x{} image, got {}", expected, width, height, pixels.len())
        ));
    }

    let raw: Vec<u8> = pixels.iter().flat_map(|&p| unpack_argb(p)).collect();
    RgbImage::from_raw(width, height, raw)
        .ok_or_else(|| ClassifierError::ValidationError("Pixel buffer does not match image dimensions".into()))
}

/// Decodes an encoded image (PNG, JPEG, BMP, WebP).
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::DecodeFailure("Image data is empty".into()));
    }
    Ok(image::load_from_memory(bytes)?)
}

/// Brings `image` to exactly 224x224 RGB according to `strategy`.
pub fn resize_to_input(image: &DynamicImage, strategy: ResizeStrategy) -> RgbImage {
    match strategy {
        ResizeStrategy::Direct => image
            .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::Triangle)
            .to_rgb8(),
        ResizeStrategy::CenterCrop => {
            let resized = image
                .resize_exact(RESIZE_SIZE, RESIZE_SIZE, FilterType::Triangle)
                .to_rgb8();
            let offset = (RESIZE_SIZE - INPUT_SIZE) / 2;
            imageops::crop_imm(&resized, offset, offset, INPUT_SIZE, INPUT_SIZE).to_image()
        }
    }
}

/// Converts an already 224x224 RGB image into a normalized CHW tensor.
pub fn image_to_tensor(rgb: &RgbImage) -> Result<NormalizedTensor, ClassifierError> {
    if rgb.width() != INPUT_SIZE || rgb.height() != INPUT_SIZE {
        return Err(ClassifierError::ValidationError(format!(
            "Expected a {}x{} image, got {}x{}",
            INPUT_SIZE, INPUT_SIZE, rgb.width(), rgb.height()
        )));
    }

    let data = Array4::from_shape_fn(
        (1, 3, INPUT_SIZE as usize, INPUT_SIZE as usize),
        |(_, c, y, x)| normalize(rgb.get_pixel(x as u32, y as u32)[c], c),
    );

    Ok(NormalizedTensor { data })
}

/// Full preprocessing: resize/crop, channel extraction, normalization and CHW layout.
pub fn preprocess(image: &DynamicImage, strategy: ResizeStrategy) -> Result<NormalizedTensor, ClassifierError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifierError::ValidationError("Image has zero width or height".into()));
    }
    debug!(
        "Preprocessing {}x{} image with {:?} strategy",
        image.width(), image.height(), strategy
    );
    let rgb = resize_to_input(image, strategy);
    image_to_tensor(&rgb)
}
