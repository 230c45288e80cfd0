//! Conversion of uploaded image bytes into the model's input tensor.
//!
//! The classifier was trained on 224x224 RGB crops scaled to `[0, 1]` and fed
//! channel-first with a batch dimension, so every upload goes through the same
//! fixed pipeline:
//!
//! 1. decode (format sniffed from content)
//! 2. force 3-channel RGB
//! 3. resize to exactly 224x224 with a bicubic filter, ignoring aspect ratio
//! 4. scale intensities by 1/255 and lay out as `[1, 3, H, W]`

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use ndarray::Array4;

use super::error::ClassifierError;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;

/// Number of color channels the model consumes.
pub const INPUT_CHANNELS: usize = 3;

/// Resampling filter used for every resize. Bicubic matches the default of the
/// image library the model was trained with; changing it silently shifts accuracy.
pub const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// A single-image batch in NCHW layout, values in `[0, 1]`.
pub type ImageTensor = Array4<f32>;

/// Shape every tensor handed to the model must have.
pub fn input_shape() -> [usize; 4] {
    [1, INPUT_CHANNELS, INPUT_SIZE as usize, INPUT_SIZE as usize]
}

/// Decodes raw bytes into an image.
///
/// # Errors
/// - `ImageDecode` if the bytes are empty, the format is unknown, or decoding fails
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ClassifierError> {
    if bytes.is_empty() {
        return Err(ClassifierError::ImageDecode("Input is empty".into()));
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ClassifierError::ImageDecode(format!("Failed to sniff image format: {}", e)))?;

    if reader.format().is_none() {
        return Err(ClassifierError::ImageDecode("Unrecognized image format".into()));
    }

    Ok(reader.decode()?)
}

/// Resizes to the model input size and converts to 8-bit RGB.
///
/// Grayscale inputs are expanded to three channels; alpha is dropped.
pub fn to_model_rgb(image: &DynamicImage) -> RgbImage {
    image
        .resize_exact(INPUT_SIZE, INPUT_SIZE, RESIZE_FILTER)
        .to_rgb8()
}

/// Lays out an RGB image as a `[1, 3, H, W]` tensor scaled to `[0, 1]`.
pub fn rgb_to_tensor(rgb: &RgbImage) -> Result<ImageTensor, ClassifierError> {
    let (width, height) = rgb.dimensions();
    let num_pixels = width as usize * height as usize;

    let mut data = vec![0.0f32; INPUT_CHANNELS * num_pixels];
    for (i, pixel) in rgb.pixels().enumerate() {
        data[i] = pixel[0] as f32 / 255.0;
        data[num_pixels + i] = pixel[1] as f32 / 255.0;
        data[2 * num_pixels + i] = pixel[2] as f32 / 255.0;
    }

    Array4::from_shape_vec((1, INPUT_CHANNELS, height as usize, width as usize), data)
        .map_err(|e| ClassifierError::Inference(format!("Failed to create input array: {}", e)))
}

/// Checks that a tensor has exactly the model input shape.
pub fn ensure_shape(tensor: &ImageTensor) -> Result<(), ClassifierError> {
    let expected = input_shape();
    if tensor.shape() != expected {
        return Err(ClassifierError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: tensor.shape().to_vec(),
        });
    }
    Ok(())
}

/// Runs the full preprocessing pipeline on raw upload bytes.
///
/// # Errors
/// - `ImageDecode` for corrupt or unsupported input
/// - `ShapeMismatch` if the produced tensor does not have shape `[1, 3, 224, 224]`
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, ClassifierError> {
    let image = decode_image(bytes)?;
    let rgb = to_model_rgb(&image);
    let tensor = rgb_to_tensor(&rgb)?;
    ensure_shape(&tensor)?;
    Ok(tensor)
}
