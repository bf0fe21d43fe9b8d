use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use useragent::http::decode::decode_text;
use useragent::ContentBuffer;

fn sample_page() -> Vec<u8> {
    let mut page = Vec::new();
    for i in 0..2000 {
        page.extend_from_slice(format!("<li>row {} with some text</li>\r\n", i).as_bytes());
    }
    page
}

fn benchmark_buffer_append(c: &mut Criterion) {
    let chunk = vec![b'a'; 8192];

    c.bench_function("content_append_1mb", |b| {
        b.iter(|| {
            let mut buf = ContentBuffer::new();
            for _ in 0..128 {
                buf.append(black_box(&chunk), chunk.len());
            }
            black_box(buf.len())
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let page = sample_page();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&page).unwrap();
    let gz = encoder.finish().unwrap();

    c.bench_function("decode_utf8_lines", |b| {
        b.iter(|| decode_text(black_box(&page), false, "utf-8", 0).unwrap())
    });

    c.bench_function("decode_gzip_latin1", |b| {
        b.iter(|| decode_text(black_box(&gz), true, "iso-8859-1", 0).unwrap())
    });

    c.bench_function("decode_with_limit", |b| {
        b.iter(|| decode_text(black_box(&page), false, "utf-8", 256).unwrap())
    });
}

criterion_group!(benches, benchmark_buffer_append, benchmark_decode);
criterion_main!(benches);
