use criterion::{criterion_group, criterion_main, Criterion};
use enginesound::audio::AudioGenerator;
use enginesound::config::{CylinderConfig, EngineConfig};

fn bench_perf(c: &mut Criterion) {
    let simd = if is_x86_feature_detected!("avx2") {
        "avx2"
    } else if is_x86_feature_detected!("sse4.1") {
        "sse4.1"
    } else if is_x86_feature_detected!("sse2") {
        "sse2"
    } else {
        "scalar"
    };
    println!("SIMD: {}", simd);

    const SAMPLE_RATE: u32 = 48000;

    let config = EngineConfig {
        sample_rate: SAMPLE_RATE,
        rpm: 3000.0,
        cylinders: vec![
            CylinderConfig::default(),
            CylinderConfig {
                crank_offset: 0.5,
                ..CylinderConfig::default()
            },
        ],
        ..EngineConfig::default()
    };

    let mut generator = AudioGenerator::new(config);

    let mut buf = [0.0; 2 * (SAMPLE_RATE as usize / 100)];

    c.bench_function("perf", |b| {
        b.iter(|| generator.fill(&mut buf, SAMPLE_RATE as usize / 100))
    });
}

criterion_group!(benches, bench_perf);
criterion_main!(benches);
