use criterion::Criterion;

mod flag_word;
mod tagging;

pub fn bench(c: &mut Criterion) {
    flag_word::bench(c);
    tagging::bench(c);
}
