//! Byte-level decoding of imported media.
//!
//! Images decode through the `image` crate into premultiplied RGBA8. Audio
//! decodes through the system `ffmpeg` binary into interleaved f32 PCM at
//! the fixed mix rate (feature `media-ffmpeg`), avoiding native FFmpeg
//! dev-header requirements.

use std::sync::Arc;

use anyhow::Context as _;

use crate::assets::{AudioPcm, PreparedImage};
use crate::error::LyrividResult;

/// All audio is resampled to this rate for mixing and export.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

pub fn decode_image(bytes: &[u8]) -> LyrividResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

/// Decode audio bytes to stereo f32 PCM at `sample_rate`.
#[cfg(feature = "media-ffmpeg")]
pub fn decode_audio_bytes(bytes: &[u8], sample_rate: u32) -> LyrividResult<AudioPcm> {
    use crate::error::LyrividError;

    let path = std::env::temp_dir().join(format!(
        "lyrivid_audio_in_{}_{}.bin",
        std::process::id(),
        bytes.len()
    ));
    std::fs::write(&path, bytes)
        .map_err(|e| LyrividError::asset(format!("failed to stage audio bytes: {e}")))?;
    let guard = TempFileGuard(Some(path.clone()));

    let out = std::process::Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(&path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| LyrividError::asset(format!("failed to run ffmpeg for audio decode: {e}")))?;
    drop(guard);

    if !out.status.success() {
        return Err(LyrividError::asset(format!(
            "ffmpeg audio decode failed: {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(LyrividError::asset(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: Arc::new(pcm),
    })
}

#[cfg(not(feature = "media-ffmpeg"))]
pub fn decode_audio_bytes(_bytes: &[u8], _sample_rate: u32) -> LyrividResult<AudioPcm> {
    Err(crate::error::LyrividError::asset(
        "audio assets require the 'media-ffmpeg' feature",
    ))
}

#[cfg(feature = "media-ffmpeg")]
struct TempFileGuard(Option<std::path::PathBuf>);

#[cfg(feature = "media-ffmpeg")]
impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}
