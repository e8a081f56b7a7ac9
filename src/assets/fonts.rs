//! Font faces for overlay and subtitle rasterization.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{LyrividError, LyrividResult};

const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans-fonts/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Registered faces by family name, plus one fallback face used for any
/// family that has no registration. A project whose fonts never resolve
/// still plays: text layers are skipped, not fatal.
#[derive(Default)]
pub struct FontLibrary {
    faces: HashMap<String, Arc<fontdue::Font>>,
    fallback: Option<Arc<fontdue::Font>>,
}

impl FontLibrary {
    /// Parse `bytes` and register the face under `family`.
    pub fn register(&mut self, family: impl Into<String>, bytes: &[u8]) -> LyrividResult<()> {
        let family = family.into();
        let font = fontdue::Font::from_bytes(bytes.to_vec(), fontdue::FontSettings::default())
            .map_err(|e| LyrividError::asset(format!("font '{family}' failed to parse: {e}")))?;
        let font = Arc::new(font);
        if self.fallback.is_none() {
            self.fallback = Some(font.clone());
        }
        self.faces.insert(family, font);
        Ok(())
    }

    /// Try well-known system font locations for a fallback face. Returns
    /// whether a face is now available.
    pub fn load_system_fallback(&mut self) -> bool {
        if self.fallback.is_some() {
            return true;
        }
        for path in SYSTEM_FONT_CANDIDATES {
            let Ok(bytes) = std::fs::read(path) else {
                continue;
            };
            if let Ok(font) =
                fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            {
                tracing::debug!(path, "loaded system fallback font");
                self.fallback = Some(Arc::new(font));
                return true;
            }
        }
        tracing::warn!("no usable font found; text layers will be skipped");
        false
    }

    /// Resolve `family` to a face: exact registration first, then the
    /// fallback, then `None` (caller skips the text layer).
    pub fn face(&self, family: &str) -> Option<Arc<fontdue::Font>> {
        self.faces
            .get(family)
            .or(self.fallback.as_ref())
            .cloned()
    }

    pub fn has_any_face(&self) -> bool {
        self.fallback.is_some() || !self.faces.is_empty()
    }
}

impl std::fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontLibrary")
            .field("faces", &self.faces.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
