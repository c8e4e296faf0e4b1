use criterion::{black_box, criterion_group, criterion_main, Criterion};
use identifruit::classifier::preprocess::preprocess;
use identifruit::{
    ClassLabels, Classifier, ClassifierError, DecisionPolicy, InferenceEngine, NormalizedTensor, ResizeStrategy,
};
use image::{DynamicImage, ImageBuffer, Rgb};

struct FixedScores(Vec<f32>);

impl InferenceEngine for FixedScores {
    fn infer(&self, _input: &NormalizedTensor) -> Result<Vec<f32>, ClassifierError> {
        Ok(self.0.clone())
    }
}

fn gradient_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

fn bench_preprocessing(c: &mut Criterion) {
    let mut group = c.benchmark_group("Preprocessing");

    // Configure sampling
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    // Thumbnail, camera preview and full photo sizes
    let sizes = [(160, 120), (640, 480), (1920, 1080)];
    for &(width, height) in &sizes {
        let image = gradient_image(width, height);
        for (name, strategy) in [("direct", ResizeStrategy::Direct), ("center_crop", ResizeStrategy::CenterCrop)] {
            group.bench_function(format!("{}_{}x{}", name, width, height), |b| b.iter(|| {
                preprocess(black_box(&image), strategy).unwrap()
            }));
        }
    }

    group.finish();
}

fn bench_decision(c: &mut Criterion) {
    let mut group = c.benchmark_group("Decision");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    // Test scaling with number of classes
    let class_counts = [20, 100, 1000];
    for &count in &class_counts {
        let labels = ClassLabels::new((0..count).map(|i| format!("class_{}", i)).collect::<Vec<_>>()).unwrap();
        let scores: Vec<f32> = (0..count).map(|i| (i % 7) as f32 * 0.5).collect();
        let policy = DecisionPolicy::default();

        group.bench_function(format!("classes_{}", count), |b| b.iter(|| {
            policy.decide(black_box(&scores), &labels)
        }));
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline");
    group.sample_size(30);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let mut scores = vec![0.0; 20];
    scores[1] = 6.0;
    let classifier = Classifier::builder()
        .with_engine(FixedScores(scores))
        .unwrap()
        .build()
        .unwrap();
    let image = gradient_image(640, 480);

    group.bench_function("classify_image_640x480", |b| b.iter(|| {
        classifier.classify_image(black_box(&image)).unwrap()
    }));

    group.finish();
}

criterion_group!(
    benches,
    bench_preprocessing,
    bench_decision,
    bench_pipeline
);
criterion_main!(benches);
