use criterion::{black_box, criterion_group, criterion_main, Criterion};
use p2p_wire::core::hash::ContentHash;
use p2p_wire::core::varint::{decode_varint, encode_varint};

fn bench_varint(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint");
    let values = [0u64, 252, 253, 0xffff, 0x1_0000, u64::MAX];
    let encoded: Vec<Vec<u8>> = values.iter().map(|v| encode_varint(*v)).collect();

    group.bench_function("encode", |b| {
        b.iter(|| {
            for v in &values {
                black_box(encode_varint(black_box(*v)));
            }
        })
    });

    group.bench_function("decode", |b| {
        b.iter(|| {
            for bytes in &encoded {
                black_box(decode_varint(black_box(bytes)).unwrap());
            }
        })
    });

    group.finish();
}

fn bench_hash_text(c: &mut Criterion) {
    let hash = ContentHash::double_sha256(b"block");
    let text = hash.to_string();

    c.bench_function("hash_display", |b| b.iter(|| black_box(&hash).to_string()));
    c.bench_function("hash_parse", |b| {
        b.iter(|| ContentHash::parse(black_box(&text)).unwrap())
    });
}

criterion_group!(benches, bench_varint, bench_hash_text);
criterion_main!(benches);
