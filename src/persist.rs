//! Project snapshots: metadata JSON plus the imported binary sources.
//!
//! A snapshot directory holds `project.json` (the full model, which carries
//! no transient decoded state) and `media/` with the originally-imported
//! bytes. Loading re-decodes every source, regenerating the transient
//! forms, so a loaded project composites identically to the saved one.
//! Failures never disturb in-memory state: both directions build their
//! outputs before touching anything the caller owns.

use std::path::Path;

use anyhow::Context as _;

use crate::assets::AssetStore;
use crate::error::{LyrividError, LyrividResult};
use crate::model::Project;

const SNAPSHOT_VERSION: u32 = 1;
const PROJECT_FILE: &str = "project.json";
const MEDIA_DIR: &str = "media";

#[derive(serde::Serialize, serde::Deserialize)]
struct SnapshotDoc {
    version: u32,
    project: Project,
    media: Vec<MediaEntry>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct MediaEntry {
    id: String,
    kind: MediaKind,
    file: String,
}

#[derive(Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
enum MediaKind {
    Image,
    Audio,
}

/// Write the project and all registered media under `dir`.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn save_snapshot(project: &Project, assets: &AssetStore, dir: &Path) -> LyrividResult<()> {
    let result = (|| -> anyhow::Result<()> {
        let media_dir = dir.join(MEDIA_DIR);
        std::fs::create_dir_all(&media_dir)
            .with_context(|| format!("create snapshot dir '{}'", media_dir.display()))?;

        let mut ids: Vec<&str> = assets.media_ids().collect();
        ids.sort_unstable();

        let mut media = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let bytes = assets
                .source_bytes(id)
                .with_context(|| format!("media '{id}' has no source bytes"))?;
            let file = format!("m{i}.bin");
            std::fs::write(media_dir.join(&file), bytes.as_slice())
                .with_context(|| format!("write media blob '{file}'"))?;
            media.push(MediaEntry {
                id: id.to_string(),
                kind: if assets.is_audio(id) {
                    MediaKind::Audio
                } else {
                    MediaKind::Image
                },
                file,
            });
        }

        let doc = SnapshotDoc {
            version: SNAPSHOT_VERSION,
            project: project.clone(),
            media,
        };
        let json = serde_json::to_vec_pretty(&doc).context("serialize snapshot")?;
        std::fs::write(dir.join(PROJECT_FILE), json).context("write project.json")?;
        Ok(())
    })();

    result.map_err(|e| LyrividError::persistence(format!("{e:#}")))
}

/// Load a snapshot directory into a fresh project and asset store.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn load_snapshot(dir: &Path) -> LyrividResult<(Project, AssetStore)> {
    let doc: SnapshotDoc = (|| -> anyhow::Result<SnapshotDoc> {
        let json = std::fs::read(dir.join(PROJECT_FILE))
            .with_context(|| format!("read '{}/{PROJECT_FILE}'", dir.display()))?;
        let doc: SnapshotDoc = serde_json::from_slice(&json).context("parse project.json")?;
        if doc.version != SNAPSHOT_VERSION {
            anyhow::bail!("unsupported snapshot version {}", doc.version);
        }
        Ok(doc)
    })()
    .map_err(|e| LyrividError::persistence(format!("{e:#}")))?;

    doc.project.validate()?;

    let mut assets = AssetStore::new();
    for entry in &doc.media {
        let path = dir.join(MEDIA_DIR).join(&entry.file);
        let bytes = std::fs::read(&path).map_err(|e| {
            LyrividError::persistence(format!("read media blob '{}': {e}", path.display()))
        })?;
        assets.reattach(&entry.id, bytes, entry.kind == MediaKind::Audio)?;
    }

    Ok((doc.project, assets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Adjustments, Crop, OverlayAnimation, TextOverlay};
    use std::io::Cursor;

    fn png_bytes(seed: u8) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([seed, 100, 200, 255]));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("lyrivid-snap-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn save_load_roundtrip_is_identical() {
        let mut project = Project::default();
        let mut assets = AssetStore::new();
        for i in 0..3u8 {
            let id = format!("img{i}");
            assets.attach_image(id.as_str(), png_bytes(i * 40)).unwrap();
            project.insert_clip(format!("c{i}"), id.as_str());
        }
        project
            .update_clip("c1", |c| {
                c.crop = Crop {
                    offset_x: -12.0,
                    offset_y: 8.0,
                    zoom: 1.4,
                };
                c.adjustments = Adjustments {
                    sepia: 30.0,
                    ..Adjustments::default()
                };
                c.overlays.push(TextOverlay {
                    id: "t0".to_string(),
                    text: "bridge".to_string(),
                    x: 0.5,
                    y: 0.25,
                    font_size_px: 64.0,
                    font_family: "serif".to_string(),
                    color: [250, 220, 90, 255],
                    opacity: 0.9,
                    animation: OverlayAnimation::SlideUp,
                    animation_duration_sec: 0.8,
                });
            })
            .unwrap();

        let dir = temp_dir("roundtrip");
        save_snapshot(&project, &assets, &dir).unwrap();
        let (loaded_project, loaded_assets) = load_snapshot(&dir).unwrap();

        assert_eq!(loaded_project, project);
        for clip in &project.clips {
            assert_eq!(
                loaded_assets.source_bytes(&clip.source).unwrap(),
                assets.source_bytes(&clip.source).unwrap()
            );
            assert!(loaded_assets.image(&clip.source).is_some());
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_missing_dir_is_a_persistence_error() {
        let err = load_snapshot(Path::new("/nonexistent/lyrivid-snap")).unwrap_err();
        assert!(matches!(err, LyrividError::Persistence(_)));
    }

    #[test]
    fn load_rejects_invalid_project_data() {
        let dir = temp_dir("invalid");
        let mut project = Project::default();
        project.insert_clip("c0", "img0");
        let mut assets = AssetStore::new();
        assets.attach_image("img0", png_bytes(1)).unwrap();
        save_snapshot(&project, &assets, &dir).unwrap();

        // Corrupt the stored model.
        let path = dir.join(PROJECT_FILE);
        let text = std::fs::read_to_string(&path)
            .unwrap()
            .replace("\"duration_sec\": 5.0", "\"duration_sec\": -1.0");
        std::fs::write(&path, text).unwrap();

        assert!(load_snapshot(&dir).is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
