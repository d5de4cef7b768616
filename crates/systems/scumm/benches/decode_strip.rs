use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scumm_gfx::codec::decompress_bitmap;
use scumm_gfx::surface::PixelView;
use scumm_gfx::RenderContext;

const HEIGHT: usize = 144;

/// Codec byte followed by enough pseudo-random payload that no decoder runs
/// dry before the strip is full.
fn strip_data(code: u8) -> Vec<u8> {
    let mut state = 0x9E37_79B9u32;
    let mut out = vec![code];
    out.extend((0..4096).map(|_| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        state as u8
    }));
    out
}

fn bench_codecs(c: &mut Criterion) {
    let ctx = RenderContext::default();
    let mut dst = vec![0u8; 8 * HEIGHT];
    let mut group = c.benchmark_group("decode_strip");

    let cases = [
        ("raw", 1u8),
        ("zigzag_v", 18),
        ("zigzag_h", 28),
        ("majmin", 68),
        ("majmin_8bit", 108),
    ];
    for (name, code) in cases {
        let src = if code == 1 {
            let mut s = vec![1u8];
            s.extend((0..8 * HEIGHT).map(|i| (i % 251) as u8));
            s
        } else {
            strip_data(code)
        };
        group.bench_with_input(BenchmarkId::from_parameter(name), &src, |b, src| {
            b.iter(|| {
                let mut view = PixelView::new(&mut dst, 0, 8, 1);
                black_box(decompress_bitmap(&mut view, src, HEIGHT, &ctx).is_ok());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codecs);
criterion_main!(benches);
