use criterion::{black_box, Criterion};

use tracetag::trace_flag::TraceFlag;

pub fn bench(c: &mut Criterion) {
    let flag = TraceFlag::new();

    c.bench_function("flag_word_is_set", |b| {
        b.iter(|| black_box(flag.is_set(black_box(0x0201))))
    });

    c.bench_function("flag_word_set_flags_bits", |b| {
        b.iter(|| flag.set_flags_bits(black_box(0x01)))
    });

    c.bench_function("flag_word_set_flags", |b| {
        b.iter(|| flag.set_flags(black_box(0x0300)))
    });
}
