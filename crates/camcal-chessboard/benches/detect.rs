use camcal_chessboard::{chess_response, ChessboardDetector};
use camcal_core::{GrayImage, Homography};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Matrix3, Point2};

fn render_board(
    img_w: usize,
    img_h: usize,
    w: u32,
    h: u32,
    square: f64,
    hmg: &Homography,
) -> GrayImage {
    let Some(inv) = hmg.inverse() else {
        return GrayImage::new(img_w, img_h);
    };
    let (bw, bh) = ((w + 1) as f64 * square, (h + 1) as f64 * square);
    let mut img = GrayImage::new(img_w, img_h);
    for y in 0..img_h {
        for x in 0..img_w {
            let b = inv.apply(Point2::new(x as f64 + 0.5, y as f64 + 0.5));
            let inside = b.x >= 0.0 && b.y >= 0.0 && b.x < bw && b.y < bh;
            let black = inside
                && ((b.x / square).floor() as i64 + (b.y / square).floor() as i64) % 2 == 0;
            img.data[y * img_w + x] = if black { 20 } else { 235 };
        }
    }
    img
}

fn bench_detect(c: &mut Criterion) {
    let (s, co) = 0.2f64.sin_cos();
    let hmg = Homography::new(Matrix3::new(
        1.2 * co, -1.2 * s, 150.0, //
        1.2 * s, 1.2 * co, 60.0, //
        0.0002, 0.0001, 1.0,
    ));
    let img = render_board(640, 480, 9, 6, 32.0, &hmg);
    let detector = ChessboardDetector::default();

    c.bench_function("chess_response_640x480", |b| {
        b.iter(|| chess_response(black_box(&img.view())))
    });
    c.bench_function("detect_9x6_640x480", |b| {
        b.iter(|| detector.detect(black_box(&img.view()), 9, 6))
    });
}

criterion_group!(benches, bench_detect);
criterion_main!(benches);
