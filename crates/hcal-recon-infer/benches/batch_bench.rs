//! Benchmarks for batch assembly and result decoding.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hcal_recon_core::{
    BatchShape, ChannelCalib, ChannelId, RawFrame, RawSample, Subdetector, DEFAULT_SOI, NINPUT,
    SAMPLES_PER_FRAME,
};
use hcal_recon_digi::StaticCalibration;
use hcal_recon_infer::{BatchAssembler, ResultDecoder};

const BATCH_SIZE: usize = 64;

fn frames() -> Vec<RawFrame> {
    (0..BATCH_SIZE)
        .map(|i| {
            let id = ChannelId::new(Subdetector::Barrel, i as i32 + 1, 36, 1 + (i % 4) as u8);
            let samples: [RawSample; SAMPLES_PER_FRAME] =
                core::array::from_fn(|ts| RawSample::new((i + ts) as u8, (ts % 4) as u8));
            RawFrame::new(id, samples, DEFAULT_SOI).unwrap()
        })
        .collect()
}

fn bench_assemble(c: &mut Criterion) {
    let shape = BatchShape::new(NINPUT, 1, BATCH_SIZE);
    let conditions = StaticCalibration::uniform(ChannelCalib::default());
    let frames = frames();

    c.bench_function("assemble_full_batch", |b| {
        b.iter(|| {
            let mut assembler = BatchAssembler::new(shape).unwrap();
            for frame in &frames {
                assembler.accumulate(black_box(frame), &conditions).unwrap();
            }
            black_box(assembler.finalize())
        });
    });
}

fn bench_reconstruct(c: &mut Criterion) {
    let shape = BatchShape::new(NINPUT, 1, BATCH_SIZE);
    let conditions = StaticCalibration::uniform(ChannelCalib::default());
    let frames = frames();

    let mut assembler = BatchAssembler::new(shape).unwrap();
    for frame in &frames {
        assembler.accumulate(frame, &conditions).unwrap();
    }
    let (_, context) = assembler.finalize();
    let output: Vec<f32> = (0..shape.output_len()).map(|i| i as f32).collect();
    let decoder = ResultDecoder::new(shape);

    c.bench_function("reconstruct_full_batch", |b| {
        b.iter(|| decoder.reconstruct(black_box(&output), black_box(&context)).unwrap());
    });
}

criterion_group!(benches, bench_assemble, bench_reconstruct);
criterion_main!(benches);
