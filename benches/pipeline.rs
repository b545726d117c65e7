//! Benchmarks for the cube pipeline stages.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chroma_cube::{
    animation::AnimatedImageEncoder,
    capture::{Camera, CaptureConfig, MockCamera},
    codec,
    dither::{BlueNoiseMask, DitherConfig, Ditherer, MaskConfig},
    palette::{PaletteBuilder, PaletteConfig},
    tensor::TensorAssembler,
};

fn mock_frame(size: u32) -> Vec<u8> {
    let mut camera = MockCamera::new();
    camera
        .open(&CaptureConfig::with_resolution(size))
        .expect("mock camera opens");
    camera.capture().expect("mock frame").into_pixels()
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for size in [64u32, 128, 256] {
        let pixels = mock_frame(size);
        let encoded = codec::encode(&pixels, size, size, 4).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", size), &size, |b, _| {
            b.iter(|| codec::encode(black_box(&pixels), size, size, 4).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &size, |b, _| {
            b.iter(|| codec::decode(black_box(&encoded)).unwrap());
        });
    }

    group.finish();
}

fn bench_palette(c: &mut Criterion) {
    let mut group = c.benchmark_group("palette_build");
    group.sample_size(20);

    let builder = PaletteBuilder::new(PaletteConfig::default()).unwrap();
    let mut samples = Vec::new();
    builder.sample_frame(&mock_frame(128), &mut samples);

    for max_size in [16usize, 64, 256] {
        let builder = PaletteBuilder::new(PaletteConfig {
            max_size,
            ..Default::default()
        })
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(max_size), &max_size, |b, _| {
            b.iter(|| builder.build(black_box(&samples)).unwrap());
        });
    }

    group.finish();
}

fn bench_dither(c: &mut Criterion) {
    let mut group = c.benchmark_group("dither_frame");

    let mask = Arc::new(
        BlueNoiseMask::generate(&MaskConfig {
            width: 64,
            height: 64,
            depth: 8,
            ..Default::default()
        })
        .unwrap(),
    );

    for size in [64u32, 128] {
        let pixels = mock_frame(size);
        let builder = PaletteBuilder::new(PaletteConfig {
            max_size: 64,
            ..Default::default()
        })
        .unwrap();
        let mut samples = Vec::new();
        builder.sample_frame(&pixels, &mut samples);
        let (palette, _) = builder.build(&samples).unwrap();
        let ditherer =
            Ditherer::new(Arc::clone(&mask), Arc::new(palette), &DitherConfig::default()).unwrap();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", size, size)),
            &size,
            |b, _| {
                b.iter(|| ditherer.dither_pixels(black_box(&pixels), size, 3).unwrap());
            },
        );
    }

    group.finish();
}

fn bench_encode_animation(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_animation");
    group.sample_size(10);

    for size in [32usize, 64] {
        let builder = PaletteBuilder::new(PaletteConfig {
            max_size: 32,
            ..Default::default()
        })
        .unwrap();
        let pixels = mock_frame(size as u32);
        let mut samples = Vec::new();
        builder.sample_frame(&pixels, &mut samples);
        let (palette, _) = builder.build(&samples).unwrap();
        let palette = Arc::new(palette);
        let palette_size = palette.len();

        let mut assembler = TensorAssembler::new();
        assembler.start(size, palette, false).unwrap();
        for z in 0..size {
            let plane = (0..size * size)
                .map(|i| ((i * 31 + z * 7) % palette_size) as u8)
                .collect();
            assembler.ingest(z, plane).unwrap();
        }
        let tensor = assembler.finalize().unwrap();
        let encoder = AnimatedImageEncoder::default();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| encoder.encode(black_box(&tensor)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_codec,
    bench_palette,
    bench_dither,
    bench_encode_animation
);
criterion_main!(benches);
