//! AI collaborator interface: image captioning and lyric transcription.
//!
//! The remote capability is out of core — callers supply an
//! [`AssistClient`] implementation. The merge helpers here own the
//! invariants: results are applied to the project atomically (whole-list
//! replace), a failed caption degrades to a generic one, and a failed
//! transcription propagates without touching existing state. A call in
//! flight never blocks playback; the compositor simply observes whatever
//! state is current on its next tick.

use crate::assets::AssetStore;
use crate::error::{LyrividError, LyrividResult};
use crate::model::{OverlayAnimation, Project, SubtitleSegment, TextOverlay};

/// One transcribed lyric line on the global timeline.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LyricSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub text: String,
}

/// Remote captioning/transcription capability. Both calls are best-effort.
pub trait AssistClient {
    fn caption_image(&self, image_bytes: &[u8], context: Option<&str>) -> LyrividResult<String>;
    fn transcribe_lyrics(&self, audio_bytes: &[u8]) -> LyrividResult<Vec<LyricSegment>>;
}

/// Safe default when captioning fails.
pub const GENERIC_CAPTION: &str = "A moment from the story";

/// Caption one clip's image and attach the result as a text overlay.
///
/// A remote failure substitutes [`GENERIC_CAPTION`]; only a missing clip
/// or missing source bytes error out.
pub fn caption_clip(
    client: &dyn AssistClient,
    project: &mut Project,
    assets: &AssetStore,
    clip_id: &str,
    context: Option<&str>,
) -> LyrividResult<()> {
    let clip = project
        .clips
        .iter()
        .find(|c| c.id == clip_id)
        .ok_or_else(|| LyrividError::validation(format!("unknown clip id '{clip_id}'")))?;
    let bytes = assets
        .source_bytes(&clip.source)
        .ok_or_else(|| LyrividError::asset(format!("clip '{clip_id}' has no source bytes")))?
        .clone();

    let caption = match client.caption_image(&bytes, context) {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => GENERIC_CAPTION.to_string(),
        Err(e) => {
            tracing::warn!(clip = clip_id, error = %e, "caption failed; using generic caption");
            GENERIC_CAPTION.to_string()
        }
    };

    let mut overlays = clip.overlays.clone();
    overlays.push(TextOverlay {
        id: format!("caption-{clip_id}"),
        text: caption,
        x: 0.5,
        y: 0.82,
        font_size_px: 44.0,
        font_family: "sans-serif".to_string(),
        color: [255, 255, 255, 255],
        opacity: 1.0,
        animation: OverlayAnimation::FadeIn,
        animation_duration_sec: 0.6,
    });
    project.replace_overlays(clip_id, overlays)
}

/// Transcribe the main audio and replace the project's subtitle list.
///
/// On failure the project is left exactly as it was. Segments with
/// non-finite or inverted intervals are dropped with a warning; the rest
/// land sorted by start time.
pub fn transcribe_into_subtitles(
    client: &dyn AssistClient,
    project: &mut Project,
    assets: &AssetStore,
) -> LyrividResult<usize> {
    let track = project
        .main_audio
        .as_ref()
        .ok_or_else(|| LyrividError::validation("no main audio to transcribe"))?;
    let bytes = assets
        .source_bytes(&track.source)
        .ok_or_else(|| LyrividError::asset("main audio has no source bytes"))?
        .clone();

    let segments = client
        .transcribe_lyrics(&bytes)
        .map_err(|e| LyrividError::remote(format!("lyric transcription failed: {e}")))?;

    let mut subtitles: Vec<SubtitleSegment> = Vec::with_capacity(segments.len());
    for (i, seg) in segments.into_iter().enumerate() {
        if !(seg.start_sec.is_finite() && seg.end_sec.is_finite())
            || seg.start_sec < 0.0
            || seg.end_sec < seg.start_sec
        {
            tracing::warn!(index = i, "dropping transcription segment with invalid interval");
            continue;
        }
        subtitles.push(SubtitleSegment {
            id: format!("lyric-{i}"),
            start_sec: seg.start_sec,
            end_sec: seg.end_sec,
            text: seg.text,
        });
    }
    subtitles.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));

    let count = subtitles.len();
    project.subtitles = subtitles;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AudioTrack;
    use std::io::Cursor;

    struct FakeAssist {
        caption: LyrividResult<String>,
        lyrics: LyrividResult<Vec<LyricSegment>>,
    }

    impl AssistClient for FakeAssist {
        fn caption_image(&self, _: &[u8], _: Option<&str>) -> LyrividResult<String> {
            match &self.caption {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(LyrividError::remote("caption backend down")),
            }
        }
        fn transcribe_lyrics(&self, _: &[u8]) -> LyrividResult<Vec<LyricSegment>> {
            match &self.lyrics {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(LyrividError::remote("asr backend down")),
            }
        }
    }

    fn project_with_media() -> (Project, AssetStore) {
        let mut assets = AssetStore::new();
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([9, 9, 9, 255]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assets.attach_image("img0", png).unwrap();

        let mut project = Project::default();
        project.insert_clip("c0", "img0");
        (project, assets)
    }

    #[test]
    fn caption_success_attaches_overlay() {
        let (mut project, assets) = project_with_media();
        let client = FakeAssist {
            caption: Ok("Golden hour on the pier".to_string()),
            lyrics: Ok(vec![]),
        };
        caption_clip(&client, &mut project, &assets, "c0", Some("seaside")).unwrap();
        let overlay = &project.clips[0].overlays[0];
        assert_eq!(overlay.text, "Golden hour on the pier");
        assert_eq!(overlay.animation, OverlayAnimation::FadeIn);
    }

    #[test]
    fn caption_failure_substitutes_generic_text() {
        let (mut project, assets) = project_with_media();
        let client = FakeAssist {
            caption: Err(LyrividError::remote("down")),
            lyrics: Ok(vec![]),
        };
        caption_clip(&client, &mut project, &assets, "c0", None).unwrap();
        assert_eq!(project.clips[0].overlays[0].text, GENERIC_CAPTION);
    }

    #[test]
    fn transcription_failure_leaves_subtitles_untouched() {
        let (mut project, mut assets) = project_with_media();
        assets.inject_audio_for_tests(
            "song",
            crate::assets::AudioPcm {
                sample_rate: 48_000,
                channels: 2,
                interleaved_f32: std::sync::Arc::new(vec![0.0; 96]),
            },
        );
        project.main_audio = Some(AudioTrack::new("song", 30.0));
        project.insert_subtitle(SubtitleSegment {
            id: "keep".to_string(),
            start_sec: 0.0,
            end_sec: 1.0,
            text: "keep me".to_string(),
        });

        let client = FakeAssist {
            caption: Ok(String::new()),
            lyrics: Err(LyrividError::remote("down")),
        };
        let err = transcribe_into_subtitles(&client, &mut project, &assets).unwrap_err();
        assert!(matches!(err, LyrividError::Remote(_)));
        assert_eq!(project.subtitles.len(), 1);
        assert_eq!(project.subtitles[0].id, "keep");
    }

    #[test]
    fn transcription_replaces_sorted_and_drops_invalid() {
        let (mut project, mut assets) = project_with_media();
        assets.inject_audio_for_tests(
            "song",
            crate::assets::AudioPcm {
                sample_rate: 48_000,
                channels: 2,
                interleaved_f32: std::sync::Arc::new(vec![0.0; 96]),
            },
        );
        project.main_audio = Some(AudioTrack::new("song", 30.0));

        let client = FakeAssist {
            caption: Ok(String::new()),
            lyrics: Ok(vec![
                LyricSegment {
                    start_sec: 5.0,
                    end_sec: 7.0,
                    text: "second".to_string(),
                },
                LyricSegment {
                    start_sec: 9.0,
                    end_sec: 2.0, // inverted, dropped
                    text: "bad".to_string(),
                },
                LyricSegment {
                    start_sec: 1.0,
                    end_sec: 3.0,
                    text: "first".to_string(),
                },
            ]),
        };
        let n = transcribe_into_subtitles(&client, &mut project, &assets).unwrap();
        assert_eq!(n, 2);
        let texts: Vec<_> = project.subtitles.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
    }
}
