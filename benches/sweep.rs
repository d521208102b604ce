use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use isodetect::detection::{locate, DetectionConfig, TruePeakParams};
use isodetect::reference::{CompoundClass, ReferencePattern, ReferencePeak, ReferenceStore};
use isodetect::spectrum::{SampleSpectra, Spectrum};
use isodetect::sweep::{analyze_samples, sweep};

const TARGETS: [(&str, f64, CompoundClass); 4] = [
    ("C16H31O2", 255.2330, CompoundClass::Standard),
    ("C18H35O2", 283.2643, CompoundClass::Standard),
    ("C20H39O2", 311.2956, CompoundClass::Standard),
    ("C24H52PSe", 451.2974, CompoundClass::HighIntensity),
];

/// A centroided MS1 scan: a 0.01 Da grid from 150 to 650 with bumps at every target
fn generate_scan(scan: u32, points: usize) -> Spectrum {
    let step = 500.0 / points as f64;
    let mut mz = Vec::with_capacity(points);
    let mut intensity = Vec::with_capacity(points);
    for j in 0..points {
        let m = 150.0 + j as f64 * step;
        let mut value = 100.0 + ((j as u32 * 31 + scan * 7) % 200) as f64;
        for (_, target, _) in TARGETS {
            let d = (m - target) / 0.01;
            value += 5.0e4 * (-0.5 * d * d).exp() * (1.0 + (scan % 17) as f64 / 17.0);
        }
        mz.push(m);
        intensity.push(value);
    }
    Spectrum::new(scan, Some(scan as f64 * 0.5), mz, intensity).unwrap()
}

fn generate_sample(name: &str, scans: u32, points: usize) -> SampleSpectra {
    SampleSpectra::new(name, (1..=scans).map(|s| generate_scan(s, points)).collect())
}

fn build_store() -> ReferenceStore {
    let mut store = ReferenceStore::new();
    for (formula, target, class) in TARGETS {
        let pattern = ReferencePattern::new(
            formula,
            formula,
            target,
            vec![ReferencePeak::new(target, 100.0), ReferencePeak::new(target + 1.0034, 20.0)],
        )
        .with_class(class);
        store.insert(pattern).unwrap();
    }
    store
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    let params = TruePeakParams::default();

    for points in [1_000, 10_000, 50_000] {
        let spectrum = generate_scan(1, points);
        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), &spectrum, |b, spectrum| {
            b.iter(|| {
                black_box(locate(
                    spectrum.mz(),
                    spectrum.intensity(),
                    black_box(283.2643),
                    0.3,
                    &params,
                ))
            });
        });
    }

    group.finish();
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");
    let store = build_store();
    let config = DetectionConfig::default();
    let pattern = store.get("C18H35O2").unwrap().clone();

    for scans in [100u32, 500, 2_000] {
        let sample = generate_sample("bench", scans, 10_000);
        group.throughput(Throughput::Elements(scans as u64));
        group.bench_with_input(BenchmarkId::from_parameter(scans), &sample, |b, sample| {
            b.iter(|| black_box(sweep(sample, &pattern, &config)));
        });
    }

    group.finish();
}

fn bench_analyze_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_samples");
    group.sample_size(20);
    let store = build_store();
    let config = DetectionConfig::default();

    for count in [1usize, 4, 8] {
        let samples: Vec<SampleSpectra> = (0..count)
            .map(|i| generate_sample(&format!("S{}", i), 300, 10_000))
            .collect();
        group.throughput(Throughput::Elements((count * 300) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &samples, |b, samples| {
            b.iter(|| black_box(analyze_samples(samples, &store, &config)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_locate, bench_sweep, bench_analyze_samples);
criterion_main!(benches);
