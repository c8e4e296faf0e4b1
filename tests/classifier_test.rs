use identifruit::classifier::preprocess::{normalize, CHANNEL_LEN, TENSOR_LEN};
use identifruit::{
    ClassLabels, Classifier, ClassifierError, Decision, InferenceEngine, NormalizedTensor, ResizeStrategy,
    ScoreActivation, UNKNOWN_LABEL,
};
use env_logger::{Builder, Env};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::thread;

// Initialize test logger
fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

struct FixedScores(Vec<f32>);

impl InferenceEngine for FixedScores {
    fn infer(&self, _input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.0.clone())
    }
}

struct Failing;

impl InferenceEngine for Failing {
    fn infer(&self, _input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        Err(ClassifierError::ModelError("engine crashed".into()))
    }
}

#[derive(Default)]
struct Recording {
    seen: Mutex<Vec<Vec<f32>>>,
}

impl InferenceEngine for Recording {
    fn infer(&self, input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        self.seen.lock().unwrap().push(input.as_slice().to_vec());
        Ok(vec![0.0; 20])
    }
}

fn peak_at(index: usize, len: usize) -> Vec<f32> {
    let mut scores = vec![0.0; len];
    scores[index] = 8.0;
    scores
}

fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(width, height, Rgb(color)))
}

fn png_bytes(image: &DynamicImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn classifier_with(engine: impl InferenceEngine + 'static) -> Classifier {
    Classifier::builder()
        .with_engine(engine)
        .unwrap()
        .build()
        .expect("Failed to create classifier")
}

#[test]
fn test_clear_maximum_is_labelled() -> Result<(), ClassifierError> {
    init();
    let classifier = classifier_with(FixedScores(peak_at(1, 20)));
    let prediction = classifier.classify_image(&solid_image(300, 200, [250, 220, 60]))?;

    assert_eq!(prediction.label(), "Banana");
    assert_eq!(prediction.decision, Decision::Label { index: 1, name: "Banana".to_string() });
    assert!(prediction.confidence > 0.9);
    assert_eq!(prediction.probabilities.len(), 20);
    Ok(())
}

#[test]
fn test_every_index_maps_to_its_fruit() -> Result<(), ClassifierError> {
    let image = solid_image(64, 64, [0, 128, 0]);
    for (index, fruit) in identifruit::FRUIT_CLASSES.iter().enumerate() {
        let classifier = classifier_with(FixedScores(peak_at(index, 20)));
        assert_eq!(classifier.classify_image(&image)?.label(), *fruit);
    }
    Ok(())
}

#[test]
fn test_all_zero_scores_are_unknown() -> Result<(), ClassifierError> {
    let classifier = classifier_with(FixedScores(vec![0.0; 20]));
    let prediction = classifier.classify_image(&solid_image(10, 10, [0, 0, 0]))?;
    assert_eq!(prediction.decision, Decision::Unknown);
    assert_eq!(prediction.label(), UNKNOWN_LABEL);
    Ok(())
}

#[test]
fn test_all_zero_scores_are_unknown_without_threshold() -> Result<(), ClassifierError> {
    for activation in [ScoreActivation::Softmax, ScoreActivation::Identity] {
        let classifier = Classifier::builder()
            .with_engine(FixedScores(vec![0.0; 20]))?
            .with_activation(activation)
            .with_min_confidence(0.0)?
            .build()?;
        let prediction = classifier.classify_image(&solid_image(10, 10, [0, 0, 0]))?;
        assert_eq!(prediction.label(), UNKNOWN_LABEL);
    }
    Ok(())
}

#[test]
fn test_non_finite_scores_are_inference_failure() {
    let image = solid_image(10, 10, [0, 0, 0]);
    for bad in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
        let mut scores = vec![0.0; 20];
        scores[3] = bad;
        let classifier = classifier_with(FixedScores(scores));
        let result = classifier.classify_image(&image);
        assert!(
            matches!(result, Err(ClassifierError::InferenceFailure(_))),
            "score {} gave {:?}", bad, result
        );
    }
}

#[test]
fn test_ties_resolve_to_lowest_index() -> Result<(), ClassifierError> {
    let mut scores = vec![0.0; 20];
    scores[4] = 0.9;
    scores[17] = 0.9;
    let classifier = Classifier::builder()
        .with_engine(FixedScores(scores))?
        .with_activation(ScoreActivation::Identity)
        .build()?;
    let prediction = classifier.classify_image(&solid_image(10, 10, [255, 255, 0]))?;
    assert_eq!(prediction.label(), "Corn");
    Ok(())
}

#[test]
fn test_threshold_rejects_low_confidence() -> Result<(), ClassifierError> {
    let mut scores = vec![0.0; 20];
    scores[0] = 1.0;
    scores[9] = 1.0;

    // Apple and Lemon split most of the mass; neither clears 0.5
    let classifier = classifier_with(FixedScores(scores.clone()));
    assert!(classifier.classify_image(&solid_image(8, 8, [1, 1, 1]))?.decision.is_unknown());

    let lenient = Classifier::builder()
        .with_engine(FixedScores(scores))?
        .with_min_confidence(0.1)?
        .build()?;
    assert_eq!(lenient.classify_image(&solid_image(8, 8, [1, 1, 1]))?.label(), "Apple");
    Ok(())
}

#[test]
fn test_empty_scores_error() {
    let classifier = classifier_with(FixedScores(Vec::new()));
    let result = classifier.classify_image(&solid_image(10, 10, [0, 0, 0]));
    assert!(matches!(result, Err(ClassifierError::EmptyScores)));
}

#[test]
fn test_wrong_score_count_is_inference_failure() {
    let classifier = classifier_with(FixedScores(vec![1.0; 5]));
    let result = classifier.classify_image(&solid_image(10, 10, [0, 0, 0]));
    assert!(matches!(result, Err(ClassifierError::InferenceFailure(_))));
}

#[test]
fn test_engine_error_is_inference_failure() {
    let classifier = classifier_with(Failing);
    let result = classifier.classify_image(&solid_image(10, 10, [0, 0, 0]));
    match result {
        Err(ClassifierError::InferenceFailure(msg)) => assert!(msg.contains("engine crashed")),
        other => panic!("expected inference failure, got {:?}", other),
    }
}

#[test]
fn test_undecodable_bytes() {
    let classifier = classifier_with(FixedScores(peak_at(0, 20)));
    let result = classifier.classify_bytes(b"definitely not a jpeg");
    assert!(matches!(result, Err(ClassifierError::DecodeFailure(_))));
}

#[test]
fn test_missing_file_is_decode_failure() {
    let classifier = classifier_with(FixedScores(peak_at(0, 20)));
    let result = classifier.classify_file("/nonexistent/identifruit/photo.jpg");
    assert!(matches!(result, Err(ClassifierError::DecodeFailure(_))));
}

#[test]
fn test_encoded_image_reaches_engine_as_chw_tensor() -> Result<(), ClassifierError> {
    let engine = Arc::new(Recording::default());
    let classifier = Classifier::builder()
        .with_engine(Arc::clone(&engine))?
        .with_resize_strategy(ResizeStrategy::Direct)
        .build()?;

    let bytes = png_bytes(&solid_image(97, 41, [200, 100, 50]));
    classifier.classify_bytes(&bytes)?;

    let seen = engine.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let tensor = &seen[0];
    assert_eq!(tensor.len(), TENSOR_LEN);

    let expected = [normalize(200, 0), normalize(100, 1), normalize(50, 2)];
    for (c, value) in expected.iter().enumerate() {
        let block = &tensor[c * CHANNEL_LEN..(c + 1) * CHANNEL_LEN];
        assert!(block.iter().all(|v| (v - value).abs() < 1e-5), "channel {} mismatch", c);
    }
    Ok(())
}

#[test]
fn test_custom_labels() -> Result<(), ClassifierError> {
    let labels = ClassLabels::new(vec!["Ripe", "Unripe", "Overripe"])?;
    let classifier = Classifier::builder()
        .with_engine(FixedScores(vec![0.1, 5.0, 0.2]))?
        .with_labels(labels)
        .build()?;

    let prediction = classifier.classify_image(&solid_image(30, 30, [200, 30, 30]))?;
    assert_eq!(prediction.label(), "Unripe");
    assert_eq!(classifier.info().num_classes, 3);
    Ok(())
}

#[test]
fn test_top_k_orders_by_confidence() -> Result<(), ClassifierError> {
    let mut scores = vec![0.0; 20];
    scores[19] = 6.0;
    scores[13] = 4.0;
    scores[2] = 2.0;
    let classifier = classifier_with(FixedScores(scores));
    let prediction = classifier.classify_image(&solid_image(5, 5, [0, 0, 0]))?;

    let top: Vec<&str> = prediction
        .top_k(classifier.labels(), 3)
        .into_iter()
        .map(|(label, _)| label)
        .collect();
    assert_eq!(top, vec!["Watermelon", "Paprika", "Bell Pepper"]);
    Ok(())
}

#[test]
fn test_confidences_follow_activation() -> Result<(), ClassifierError> {
    let mut scores = vec![0.01; 20];
    scores[8] = 0.7;
    let image = solid_image(5, 5, [120, 160, 40]);

    let identity = Classifier::builder()
        .with_engine(FixedScores(scores.clone()))?
        .with_activation(ScoreActivation::Identity)
        .build()?;
    let prediction = identity.classify_image(&image)?;
    assert_eq!(prediction.probabilities, scores);
    assert_eq!(prediction.label(), "Kiwi");

    let softmax = classifier_with(FixedScores(scores));
    let prediction = softmax.classify_image(&image)?;
    assert!((prediction.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    Ok(())
}

#[test]
fn test_prediction_serializes_label() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = classifier_with(FixedScores(peak_at(10, 20)));
    let prediction = classifier.classify_image(&solid_image(5, 5, [255, 200, 0]))?;
    let json = serde_json::to_value(&prediction)?;
    assert_eq!(json["label"], "Mango");
    assert_eq!(json["probabilities"].as_array().map(Vec::len), Some(20));
    Ok(())
}

#[test]
fn test_thread_safety() {
    let classifier = Arc::new(classifier_with(FixedScores(peak_at(14, 20))));
    let mut handles = vec![];

    for i in 0..3 {
        let classifier = Arc::clone(&classifier);
        let handle = thread::spawn(move || {
            let image = solid_image(20 + i, 30, [100, 150, 50]);
            let prediction = classifier.classify_image(&image).unwrap();
            assert_eq!(prediction.label(), "Pear");
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }
}
