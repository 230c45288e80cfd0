#![allow(dead_code)]

pub mod onnx;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use plantdoc::{ClassifierError, ImageTensor, ScoreModel, NUM_CLASSES};

pub const BOUNDARY: &str = "plantdoc-test-boundary";

/// Scores the class whose index equals the red intensity of the top-left pixel.
///
/// A solid image with red value `k` therefore classifies as `k`, which lets the
/// tests follow a known image through the real preprocessing stage.
pub struct RedChannelModel;

impl ScoreModel for RedChannelModel {
    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    fn forward(&self, tensor: ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let red = (tensor[[0, 0, 0, 0]] * 255.0).round() as usize;
        let mut scores = vec![0.0; NUM_CLASSES];
        scores[red % NUM_CLASSES] = 1.0;
        Ok(scores)
    }
}

/// Always fails the forward pass.
pub struct BrokenModel;

impl ScoreModel for BrokenModel {
    fn num_classes(&self) -> usize {
        NUM_CLASSES
    }

    fn forward(&self, _tensor: ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        Err(ClassifierError::Inference("session crashed".into()))
    }
}

pub fn solid_image(width: u32, height: u32, red: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([red, 120, 40])))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).expect("encode test image");
    out.into_inner()
}

pub fn disease_name(i: usize) -> String {
    format!("Disease {}", i)
}

pub fn description(i: usize) -> String {
    format!("Brown spots, yellow \"halo\" on leaf {}", i)
}

pub fn supplement_name(i: usize) -> String {
    format!("Supplement {}", i)
}

/// Writes both reference tables with `rows` rows into `dir`.
pub fn write_tables(dir: &Path, rows: usize) -> (PathBuf, PathBuf) {
    write_tables_sized(dir, rows, rows)
}

pub fn write_tables_sized(dir: &Path, disease_rows: usize, supplement_rows: usize) -> (PathBuf, PathBuf) {
    let mut diseases = String::from("index,disease_name,description,Possible Steps,image_url\n");
    for i in 0..disease_rows {
        diseases.push_str(&format!(
            "{},{},\"{}\",\"Remove infected leaves, rotate crops\",https://img.example/disease/{}.jpg\n",
            i,
            disease_name(i),
            description(i).replace('"', "\"\""),
            i
        ));
    }

    let mut supplements = String::from("index,disease_name,supplement name,supplement image,buy link\n");
    for i in 0..supplement_rows {
        supplements.push_str(&format!(
            "{},{},{},https://img.example/supplement/{}.jpg,https://shop.example/buy/{}\n",
            i,
            disease_name(i),
            supplement_name(i),
            i,
            i
        ));
    }

    let disease_path = dir.join("disease_info.csv");
    let supplement_path = dir.join("supplement_info.csv");
    std::fs::write(&disease_path, diseases).expect("write disease table");
    std::fs::write(&supplement_path, supplements).expect("write supplement table");
    (disease_path, supplement_path)
}

/// Builds a multipart/form-data body with a single file field.
pub fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
