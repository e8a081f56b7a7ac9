//! Prepared assets: decoded images, decoded audio PCM, fonts.
//!
//! All external IO is front-loaded here; the compositor and mixer only ever
//! see prepared, in-memory data. A clip whose source is missing from the
//! store is skipped at draw time rather than failing the frame.

pub mod decode;
pub mod fonts;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::LyrividResult;
use fonts::FontLibrary;

/// Premultiplied RGBA8 pixels of a decoded still image.
#[derive(Clone, Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Interleaved f32 PCM decoded from an imported audio source.
#[derive(Clone, Debug)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Arc<Vec<f32>>,
}

impl AudioPcm {
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        let frames = self.interleaved_f32.len() / usize::from(self.channels);
        frames as f64 / f64::from(self.sample_rate)
    }
}

/// Session-wide store of imported media and fonts, keyed by the same source
/// ids the project model references.
///
/// The original binary content is retained so snapshots can persist it and
/// regenerate the decoded (transient) forms on load.
#[derive(Default)]
pub struct AssetStore {
    bytes: HashMap<String, Arc<Vec<u8>>>,
    images: HashMap<String, PreparedImage>,
    audio: HashMap<String, AudioPcm>,
    fonts: FontLibrary,
}

impl AssetStore {
    pub fn new() -> Self {
        let mut store = Self::default();
        store.fonts.load_system_fallback();
        store
    }

    /// Decode and register a still image under `id`.
    pub fn attach_image(&mut self, id: impl Into<String>, bytes: Vec<u8>) -> LyrividResult<()> {
        let id = id.into();
        let prepared = decode::decode_image(&bytes)?;
        self.bytes.insert(id.clone(), Arc::new(bytes));
        self.images.insert(id, prepared);
        Ok(())
    }

    /// Decode and register an audio source under `id`; returns its duration
    /// in seconds. Requires the `media-ffmpeg` feature.
    pub fn attach_audio(&mut self, id: impl Into<String>, bytes: Vec<u8>) -> LyrividResult<f64> {
        let id = id.into();
        let pcm = decode::decode_audio_bytes(&bytes, decode::MIX_SAMPLE_RATE)?;
        let duration = pcm.duration_sec();
        self.bytes.insert(id.clone(), Arc::new(bytes));
        self.audio.insert(id, pcm);
        Ok(duration)
    }

    pub fn image(&self, id: &str) -> Option<&PreparedImage> {
        self.images.get(id)
    }

    pub fn audio_pcm(&self, id: &str) -> Option<&AudioPcm> {
        self.audio.get(id)
    }

    /// The originally-imported binary content for `id`, if any.
    pub fn source_bytes(&self, id: &str) -> Option<&Arc<Vec<u8>>> {
        self.bytes.get(id)
    }

    /// Ids of every registered media source (images and audio).
    pub fn media_ids(&self) -> impl Iterator<Item = &str> {
        self.bytes.keys().map(String::as_str)
    }

    pub fn is_audio(&self, id: &str) -> bool {
        self.audio.contains_key(id)
    }

    pub fn fonts(&self) -> &FontLibrary {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontLibrary {
        &mut self.fonts
    }

    #[cfg(test)]
    pub(crate) fn inject_audio_for_tests(&mut self, id: &str, pcm: AudioPcm) {
        self.bytes.insert(id.to_string(), Arc::new(Vec::new()));
        self.audio.insert(id.to_string(), pcm);
    }

    /// Re-attach a persisted blob, routing it through the matching decoder.
    pub(crate) fn reattach(
        &mut self,
        id: &str,
        bytes: Vec<u8>,
        is_audio: bool,
    ) -> LyrividResult<()> {
        if is_audio {
            self.attach_audio(id, bytes).map(|_| ())
        } else {
            self.attach_image(id, bytes)
        }
    }
}

impl std::fmt::Debug for AssetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetStore")
            .field("images", &self.images.len())
            .field("audio", &self.audio.len())
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
