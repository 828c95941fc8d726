//! Contain-fit geometry: the whole image is visible, centred, aspect ratio
//! preserved, with letterbox bars filling the rest of the surface.

/// Destination rectangle `(x, y, w, h)` in surface pixels.
#[allow(clippy::cast_precision_loss)]
pub fn compute_dest_rect(
    img_w: u32,
    img_h: u32,
    screen_w: u32,
    screen_h: u32,
) -> (f32, f32, f32, f32) {
    if img_w == 0 || img_h == 0 || screen_w == 0 || screen_h == 0 {
        return (0.0, 0.0, 0.0, 0.0);
    }
    let (iw, ih) = (img_w as f32, img_h as f32);
    let (sw, sh) = (screen_w as f32, screen_h as f32);
    let scale = (sw / iw).min(sh / ih);
    let w = iw * scale;
    let h = ih * scale;
    ((sw - w) * 0.5, (sh - h) * 0.5, w, h)
}

/// Half extents of the centred image quad in normalised device coordinates.
/// `[1.0, 1.0]` covers the whole surface.
#[allow(clippy::cast_precision_loss)]
pub fn compute_ndc_scale(img_w: u32, img_h: u32, screen_w: u32, screen_h: u32) -> [f32; 2] {
    let (_, _, w, h) = compute_dest_rect(img_w, img_h, screen_w, screen_h);
    if w == 0.0 || h == 0.0 {
        return [0.0, 0.0];
    }
    [w / screen_w as f32, h / screen_h as f32]
}

/// Size to decode an image to before upload: fits the surface and the GPU's
/// texture limit, never upscales, never collapses below one pixel.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn compute_scaled_size(
    img_w: u32,
    img_h: u32,
    screen_w: u32,
    screen_h: u32,
    max_texture_dim: u32,
) -> (u32, u32) {
    if img_w == 0 || img_h == 0 {
        return (1, 1);
    }
    let bound_w = screen_w.max(1).min(max_texture_dim.max(1)) as f32;
    let bound_h = screen_h.max(1).min(max_texture_dim.max(1)) as f32;
    let scale = (bound_w / img_w as f32)
        .min(bound_h / img_h as f32)
        .min(1.0);
    let w = (img_w as f32 * scale).round().max(1.0) as u32;
    let h = (img_h as f32 * scale).round().max(1.0) as u32;
    (w, h)
}
