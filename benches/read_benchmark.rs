//! Benchmarks for xlsxstream row decoding.
//!
//! Run with: cargo bench
//!
//! These benchmarks stream synthetic worksheets of various row counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::{Cursor, Write};

/// Creates a synthetic XLSX package with the given number of rows.
fn create_test_xlsx(row_count: usize) -> Vec<u8> {
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    let mut buffer = Vec::new();
    let mut zip = ZipWriter::new(Cursor::new(&mut buffer));

    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
  <Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
</Types>"#,
    )
    .unwrap();

    zip.start_file("xl/sharedStrings.xml", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t>alpha</t></si><si><t>beta</t></si></sst>"#,
    )
    .unwrap();

    let mut content = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>"#,
    );

    for i in 0..row_count {
        content.push_str(&format!(
            r#"
    <row r="{r}"><c t="s"><v>{s}</v></c><c><v>{n}.250000</v></c><c t="inlineStr"><is><t>row {r}</t></is></c></row>"#,
            r = i + 1,
            s = i % 2,
            n = i,
        ));
    }

    content.push_str(
        r#"
  </sheetData>
</worksheet>"#,
    );

    zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();

    zip.finish().unwrap();
    buffer
}

/// Benchmark full package open plus row streaming.
fn bench_row_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_streaming");

    for row_count in [100, 1000, 10000].iter() {
        let data = create_test_xlsx(*row_count);
        let size = data.len() as u64;

        group.throughput(Throughput::Bytes(size));
        group.bench_with_input(BenchmarkId::new("rows", row_count), &data, |b, data| {
            b.iter(|| {
                let package = xlsxstream::from_bytes(black_box(data.clone())).unwrap();
                let sheets = package.sheets();
                let mut reader = sheets[0].open().unwrap();
                reader.set_reuse_rows(true);
                let mut cells = 0usize;
                while reader.next() {
                    cells += reader.row().len();
                }
                black_box(cells)
            });
        });
    }

    group.finish();
}

/// Benchmark decoding alone, with the package opened once up front.
fn bench_decode_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_only");

    for row_count in [100, 1000, 10000].iter() {
        let data = create_test_xlsx(*row_count);
        let package = xlsxstream::from_bytes(data).unwrap();

        group.bench_with_input(
            BenchmarkId::new("rows", row_count),
            &package,
            |b, package| {
                b.iter(|| {
                    let sheets = package.sheets();
                    let mut reader = sheets[0].open().unwrap();
                    reader.set_reuse_rows(true);
                    let mut cells = 0usize;
                    while reader.next() {
                        cells += reader.row().len();
                    }
                    black_box(cells)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_row_streaming, bench_decode_only);
criterion_main!(benches);
