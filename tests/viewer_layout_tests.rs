use artwork_slideshow::render::layout::{compute_dest_rect, compute_ndc_scale, compute_scaled_size};

fn rect_close(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32), eps: f32) {
    assert!((a.0 - b.0).abs() <= eps, "x mismatch: {:?} vs {:?}", a, b);
    assert!((a.1 - b.1).abs() <= eps, "y mismatch: {:?} vs {:?}", a, b);
    assert!((a.2 - b.2).abs() <= eps, "w mismatch: {:?} vs {:?}", a, b);
    assert!((a.3 - b.3).abs() <= eps, "h mismatch: {:?} vs {:?}", a, b);
}

#[test]
fn square_on_16x9_is_pillarboxed() {
    // scale = min(1920/1000, 1080/1000) = 1.08
    let rect = compute_dest_rect(1000, 1000, 1920, 1080);
    rect_close(rect, (420.0, 0.0, 1080.0, 1080.0), 0.001);
}

#[test]
fn wide_on_16x9_is_letterboxed() {
    // 2:1 on 1920x1080: scale = 0.48, h = 960, y = 60
    let rect = compute_dest_rect(4000, 2000, 1920, 1080);
    rect_close(rect, (0.0, 60.0, 1920.0, 960.0), 0.001);
}

#[test]
fn small_images_scale_up_to_fit() {
    let rect = compute_dest_rect(480, 270, 1920, 1080);
    rect_close(rect, (0.0, 0.0, 1920.0, 1080.0), 0.001);
}

#[test]
fn degenerate_sizes_render_nothing() {
    rect_close(compute_dest_rect(0, 10, 1920, 1080), (0.0, 0.0, 0.0, 0.0), 0.0);
    assert_eq!(compute_ndc_scale(10, 10, 0, 1080), [0.0, 0.0]);
}

#[test]
fn ndc_scale_matches_dest_rect() {
    let [sx, sy] = compute_ndc_scale(1000, 1000, 1920, 1080);
    assert!((sx - 0.5625).abs() < 1e-4, "sx = {sx}");
    assert!((sy - 1.0).abs() < 1e-4, "sy = {sy}");
}

#[test]
fn decode_size_fits_screen_without_upscaling() {
    assert_eq!(compute_scaled_size(4032, 3024, 1920, 1080, 8192), (1440, 1080));
    assert_eq!(compute_scaled_size(3024, 4032, 1080, 1920, 8192), (1080, 1440));
    assert_eq!(compute_scaled_size(800, 600, 1920, 1080, 8192), (800, 600));
}

#[test]
fn decode_size_respects_texture_limit() {
    assert_eq!(compute_scaled_size(8000, 4000, 7680, 4320, 2048), (2048, 1024));
}

#[test]
fn decode_size_never_collapses() {
    assert_eq!(compute_scaled_size(10_000, 1, 100, 100, 8192), (100, 1));
    assert_eq!(compute_scaled_size(0, 0, 100, 100, 8192), (1, 1));
}
