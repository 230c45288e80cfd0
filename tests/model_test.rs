mod common;

use image::ImageFormat;
use plantdoc::{
    decide, preprocess, AppState, ClassifierError, ClassifierModel, ScoreModel, ServiceConfig,
    StartupError, NUM_CLASSES,
};

use common::onnx::{write_model, OutputWidth};
use common::{disease_name, encode, solid_image, write_tables};

const HOT_CLASS: usize = 23;

#[test]
fn test_load_and_forward_real_model() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), NUM_CLASSES, HOT_CLASS, OutputWidth::Fixed);

    let model = ClassifierModel::load(&path)?;
    assert_eq!(model.num_classes(), NUM_CLASSES);
    assert_eq!(model.info().input_name, "input");

    let png = encode(&solid_image(300, 200, 200), ImageFormat::Png);
    let scores = model.forward(preprocess(&png)?)?;
    assert_eq!(scores.len(), NUM_CLASSES);
    assert!((scores[HOT_CLASS] - 200.0 / 255.0).abs() < 1e-3);
    assert_eq!(decide(&scores, NUM_CLASSES), HOT_CLASS);
    Ok(())
}

#[test]
fn test_narrow_output_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), 38, 0, OutputWidth::Fixed);

    let err = ClassifierModel::load(&path).unwrap_err();
    assert!(matches!(err, ClassifierError::ModelLoad(_)), "got {}", err);
    Ok(())
}

#[test]
fn test_narrow_symbolic_output_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), 38, 0, OutputWidth::Symbolic);

    let err = ClassifierModel::load(&path).unwrap_err();
    assert!(matches!(err, ClassifierError::ModelLoad(_)), "got {}", err);
    Ok(())
}

#[test]
fn test_class_count_override_must_match_model() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = write_model(dir.path(), NUM_CLASSES, 0, OutputWidth::Symbolic);

    let err = ClassifierModel::builder()
        .with_num_classes(40)
        .with_model_file(&path)?
        .build()
        .unwrap_err();
    assert!(matches!(err, ClassifierError::ModelLoad(_)), "got {}", err);
    Ok(())
}

#[test]
fn test_service_starts_with_real_model() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (diseases, supplements) = write_tables(dir.path(), NUM_CLASSES);
    let model = write_model(dir.path(), NUM_CLASSES, HOT_CLASS, OutputWidth::Fixed);

    let state = AppState::initialize(&ServiceConfig::new(model, diseases, supplements))?;
    assert_eq!(state.num_classes(), NUM_CLASSES);

    let jpeg = encode(&solid_image(640, 480, 180), ImageFormat::Jpeg);
    let report = state.diagnose(&jpeg);
    assert!(!report.is_error());
    assert_eq!(report.class_index, HOT_CLASS);
    assert_eq!(report.disease_name, disease_name(HOT_CLASS));
    Ok(())
}

#[test]
fn test_service_refuses_narrow_model() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (diseases, supplements) = write_tables(dir.path(), NUM_CLASSES);
    let model = write_model(dir.path(), 38, 0, OutputWidth::Fixed);

    let result = AppState::initialize(&ServiceConfig::new(model, diseases, supplements));
    assert!(matches!(result, Err(StartupError::ModelLoad(ClassifierError::ModelLoad(_)))));
    Ok(())
}
