// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the coverscan-document crate: per-frame contour
// detection and both rectification strategies.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use coverscan_core::{Frame, Point, Quad, ScanConfig};
use coverscan_document::{BilinearRectifier, ContourDetector, ProjectiveRectifier, Rectifier};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// 640x480 frame: dark desk with a bright cover from (120, 60) to (520, 420).
fn synthetic_cover() -> Frame {
    Frame::from_fn(640, 480, |x, y| {
        if (120..520).contains(&x) && (60..420).contains(&y) {
            [235, 228, 210, 255]
        } else {
            [35, 30, 28, 255]
        }
    })
    .expect("frame")
}

fn skewed_quad() -> Quad {
    Quad::from_ordered([
        Point::new(140.0, 70.0),
        Point::new(500.0, 90.0),
        Point::new(520.0, 410.0),
        Point::new(110.0, 400.0),
    ])
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// One detection pass, the per-frame hot path while capturing.
fn bench_detection(c: &mut Criterion) {
    let frame = synthetic_cover();
    let detector = ContourDetector::from_config(&ScanConfig::default());

    c.bench_function("detect (640x480)", |b| {
        b.iter(|| black_box(detector.detect(black_box(&frame))));
    });
}

fn bench_rectify(c: &mut Criterion) {
    let frame = synthetic_cover();
    let quad = skewed_quad();

    c.bench_function("rectify projective (640x480)", |b| {
        b.iter(|| black_box(ProjectiveRectifier.rectify(black_box(&frame), &quad)));
    });
    c.bench_function("rectify bilinear (640x480)", |b| {
        b.iter(|| black_box(BilinearRectifier.rectify(black_box(&frame), &quad)));
    });
}

criterion_group!(benches, bench_detection, bench_rectify);
criterion_main!(benches);
