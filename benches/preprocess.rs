// Preprocessing benchmarks
//
// Run with: cargo bench --bench preprocess

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crop_advisor::inference::{
    preprocess_image, FeaturePreprocessor, HandleUnknown, NumericFeatures, OneHotEncoder, StandardScaler,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

fn tabular(c: &mut Criterion) {
    let soils: Vec<String> = ["Alluvial", "Black", "Clay", "Laterite", "Red"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let preprocessor = FeaturePreprocessor::new(
        StandardScaler::new(
            [50.0, 53.0, 48.0, 25.6, 71.5, 6.5, 103.5],
            [36.9, 32.9, 50.6, 5.1, 22.3, 0.77, 54.9],
        )
        .unwrap(),
        OneHotEncoder::new(soils, HandleUnknown::Error).unwrap(),
    );
    let features = NumericFeatures {
        nitrogen: 90.0,
        phosphorus: 42.0,
        potassium: 43.0,
        temperature: 27.5,
        humidity: 82.0,
        ph: 6.5,
        rainfall: 210.0,
    };

    c.bench_function("tabular_transform", |b| {
        b.iter(|| preprocessor.transform(black_box(&features), black_box("laterite")))
    });
}

fn image_input(c: &mut Criterion) {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_fn(640, 480, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 80])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    c.bench_function("image_preprocess_640x480", |b| {
        b.iter(|| preprocess_image(black_box(&bytes)))
    });
}

criterion_group!(benches, tabular, image_input);
criterion_main!(benches);
