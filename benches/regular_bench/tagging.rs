use criterion::{black_box, BatchSize, Criterion};

use tracetag::{TraceExtension, TraceTagger};

pub fn bench(c: &mut Criterion) {
    let tagger = TraceTagger::default();

    // Most tags hit objects already tagged in the current epoch.
    let tagged = TraceExtension::new();
    tagger.tag(&tagged);
    c.bench_function("tag_already_tagged", |b| {
        b.iter(|| black_box(tagger.tag(black_box(&tagged))))
    });

    c.bench_function("tag_fresh", |b| {
        b.iter_batched(
            TraceExtension::new,
            |object| black_box(tagger.tag(&object)),
            BatchSize::SmallInput,
        )
    });

    let class = TraceExtension::new();
    let method = TraceExtension::new();
    tagger.tag_method(&class, &method);
    c.bench_function("tag_method_already_tagged", |b| {
        b.iter(|| black_box(tagger.tag_method(&class, &method)))
    });
}
