use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use leaksafe::Seq;

const LEN: usize = 1024;
const RANGE: std::ops::Range<usize> = 256..768;

fn filled_seq() -> Seq<u32> {
    let mut seq = Seq::with_capacity(LEN);
    for i in 0..LEN as u32 {
        seq.push(i);
    }
    seq
}

fn filled_vec() -> Vec<u32> {
    (0..LEN as u32).collect()
}

// The reason the cursor exists at all: one bulk tail shift instead of one per removal.
fn drain_vs_remove(c: &mut Criterion) {
    c.bench_function("Seq::drain(256..768)", |b| {
        b.iter_batched(
            filled_seq,
            |mut seq| {
                seq.drain(RANGE);
                seq
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("Seq::remove x512", |b| {
        b.iter_batched(
            filled_seq,
            |mut seq| {
                for _ in RANGE {
                    black_box(seq.remove(256));
                }
                seq
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("Vec::drain(256..768)", |b| {
        b.iter_batched(
            filled_vec,
            |mut vec| {
                vec.drain(RANGE);
                vec
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("Vec::remove x512", |b| {
        b.iter_batched(
            filled_vec,
            |mut vec| {
                for _ in RANGE {
                    black_box(vec.remove(256));
                }
                vec
            },
            BatchSize::SmallInput,
        )
    });
}

fn drain_consume(c: &mut Criterion) {
    c.bench_function("Seq::drain collect", |b| {
        b.iter_batched(
            filled_seq,
            |mut seq| seq.drain(RANGE).sum::<u32>(),
            BatchSize::SmallInput,
        )
    });
    c.bench_function("Vec::drain collect", |b| {
        b.iter_batched(
            filled_vec,
            |mut vec| vec.drain(RANGE).sum::<u32>(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, drain_vs_remove, drain_consume);
criterion_main!(benches);
