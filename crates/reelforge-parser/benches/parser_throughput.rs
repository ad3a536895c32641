//! Benchmark reelforge_parser::parse() throughput across filename complexity.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reelforge_parser::FilenameParser;

fn bench_parser(c: &mut Criterion) {
    let inputs = [
        ("simple_movie", "Jawan.2023.Hindi.1080p.BluRay.x264-GROUP.mkv"),
        ("tv_episode", "Beast.Games.S02E06.720p.WEB-DL.mkv"),
        (
            "multi_language",
            "KGF.Chapter.2.2022.1080p.BluRay.DD5.1.x265.HEVC.Tamil.Telugu.Kannada.Hindi.mkv",
        ),
        (
            "site_prefix",
            "www.1TamilMV.pw - Leo (2023) Tamil HQ HDRip - 700MB - x264 - AAC - ESub.mkv",
        ),
        ("no_tags", "home_video_final.mp4"),
    ];

    let parser = FilenameParser::new();
    let mut group = c.benchmark_group("parser");
    for (name, input) in &inputs {
        group.bench_function(*name, |b| {
            b.iter(|| parser.parse(black_box(input)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parser);
criterion_main!(benches);
