//! A loaded snapshot must reproduce identical compositing output.

use std::io::Cursor;

use lyrivid::{AssetStore, Project, SubtitleSegment, compose_frame, load_snapshot, save_snapshot};

fn png_bytes(r: u8, g: u8, b: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(16, 9, image::Rgba([r, g, b, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn save_load_reproduces_identical_frames() {
    let mut project = Project::default();
    let mut assets = AssetStore::new();
    for (i, color) in [(0u8, (200u8, 40u8, 40u8)), (1, (40, 200, 40)), (2, (40, 40, 200))] {
        let id = format!("img{i}");
        assets.attach_image(id.as_str(), png_bytes(color.0, color.1, color.2)).unwrap();
        project.insert_clip(format!("c{i}"), id.as_str());
    }
    project
        .update_clip("c2", |c| {
            c.crop.zoom = 1.3;
            c.adjustments.saturation = 140.0;
        })
        .unwrap();
    project.insert_subtitle(SubtitleSegment {
        id: "s0".to_string(),
        start_sec: 1.0,
        end_sec: 6.0,
        text: "and the chorus lands".to_string(),
    });
    project.validate().unwrap();

    let dir = std::env::temp_dir().join(format!("lyrivid-parity-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    save_snapshot(&project, &assets, &dir).unwrap();
    let (loaded_project, loaded_assets) = load_snapshot(&dir).unwrap();

    assert_eq!(loaded_project, project);

    for t in [0.0, 2.5, 5.0, 9.9, 14.9] {
        let before = compose_frame(&project, &assets, t);
        let after = compose_frame(&loaded_project, &loaded_assets, t);
        assert_eq!(before, after, "pixel parity at t={t}");
    }

    let _ = std::fs::remove_dir_all(&dir);
}
