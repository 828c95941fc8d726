use artwork_slideshow::render::loader::{LoadOutcome, LoaderMsg, decode_for_display, spawn_loader};
use std::fs;
use std::time::Duration;

fn write_png(path: &std::path::Path, w: u32, h: u32) {
    image::RgbaImage::from_pixel(w, h, image::Rgba([200, 40, 40, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn decode_downsizes_to_target() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    write_png(&path, 400, 200);

    let ((w, h), pixels) = decode_for_display(&path, (100, 100), 8192).unwrap();
    assert_eq!((w, h), (100, 50));
    assert_eq!(pixels.len(), (w * h * 4) as usize);
}

#[test]
fn decode_keeps_small_images() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.png");
    write_png(&path, 16, 9);
    let (size, _) = decode_for_display(&path, (1920, 1080), 8192).unwrap();
    assert_eq!(size, (16, 9));
}

#[test]
fn loader_reports_failures_and_keeps_running() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("broken.jpg");
    fs::write(&bad, b"definitely not a jpeg").unwrap();
    let good = dir.path().join("good.png");
    write_png(&good, 8, 8);

    let (req_tx, req_rx) = crossbeam_channel::unbounded();
    let (res_tx, res_rx) = crossbeam_channel::unbounded();
    let handle = spawn_loader(req_rx, res_tx);

    for (index, path) in [(0, bad.clone()), (1, good.clone())] {
        req_tx
            .send(LoaderMsg::Decode {
                index,
                path,
                target: (64, 64),
                max_texture_dim: 8192,
            })
            .unwrap();
    }

    let first = res_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    match first {
        LoadOutcome::Failed { index, path, .. } => {
            assert_eq!(index, 0);
            assert_eq!(path, bad);
        }
        LoadOutcome::Ready(_) => panic!("broken file decoded"),
    }
    let second = res_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(second.index(), 1);
    assert!(matches!(second, LoadOutcome::Ready(ref img) if img.size == (8, 8)));

    req_tx.send(LoaderMsg::Quit).unwrap();
    handle.join().unwrap();
}
