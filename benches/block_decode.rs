extern crate hca;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hca::ath::Ath;
use hca::channel::{self, Channel};
use hca::cipher::Cipher;
use hca::header::DecoderConfig;
use hca::tables::{Imdct, SUBBANDS};
use std::time::Duration;

fn synthetic_config() -> DecoderConfig {
    let mut cfg = DecoderConfig::default();
    cfg.channel_count = 2;
    cfg.sampling_rate = 44100;
    cfg.block_size = 1024;
    cfg.comp_r01 = 1;
    cfg.comp_r02 = 15;
    cfg.comp_r03 = 1;
    cfg.comp_r04 = 0;
    cfg.comp_r05 = 64;
    cfg.comp_r06 = 64;
    cfg.comp_r07 = 0;
    cfg.comp_r08 = 0;
    cfg
}

fn decode_one_block(cfg: &DecoderConfig, cipher: &Cipher, ath: &Ath, data: &mut [u8]) {
    let types = channel::assign_channel_types(
        cfg.channel_count as usize,
        cfg.comp_r03 as usize,
        cfg.comp_r04 as usize,
        cfg.comp_r07 as usize,
    );
    let mut channels: Vec<Channel> = types.iter().map(|&t| Channel::new(t, cfg)).collect();
    let mut imdct = Imdct::new(SUBBANDS);
    let _ = hca::block::decode_block(data, cfg, cipher, ath, &mut channels, &mut imdct);
}

fn bench_block_decode(c: &mut Criterion) {
    let cfg = synthetic_config();
    let cipher = Cipher::new(0x38, 0x30DB_E1A8, 0xCC55_4639).unwrap();
    let ath = Ath::new(1, cfg.sampling_rate).unwrap();

    let mut group = c.benchmark_group("block_decode");
    group.sample_size(30).measurement_time(Duration::new(10, 0));
    group.bench_function("silent_block", |b| {
        b.iter_batched(
            || vec![0u8; cfg.block_size as usize],
            |mut data| decode_one_block(&cfg, &cipher, &ath, black_box(&mut data)),
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, bench_block_decode);
criterion_main!(benches);
