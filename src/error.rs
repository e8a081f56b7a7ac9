/// Convenience result type used across lyrivid.
pub type LyrividResult<T> = Result<T, LyrividError>;

/// Top-level error taxonomy used by engine APIs.
///
/// The compositor itself never returns these: per-layer failures degrade to
/// a skipped layer so the tick loop keeps painting. Everything with a user
/// boundary (export, persistence, remote assist) reports through here.
#[derive(thiserror::Error, Debug)]
pub enum LyrividError {
    /// Invalid user-provided or project data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while resolving timeline state or compositing internals.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// An imported image or audio source failed to decode or probe.
    #[error("asset error: {0}")]
    Asset(String),

    /// Export aborted: encoder setup, stream capture, or mux failure.
    #[error("export error: {0}")]
    Export(String),

    /// Snapshot read/write failure; in-memory state is left untouched.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// AI collaborator (caption/transcription) failure.
    #[error("remote capability error: {0}")]
    Remote(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LyrividError {
    /// Build a [`LyrividError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LyrividError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`LyrividError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`LyrividError::Export`] value.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::Export(msg.into())
    }

    /// Build a [`LyrividError::Persistence`] value.
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Build a [`LyrividError::Remote`] value.
    pub fn remote(msg: impl Into<String>) -> Self {
        Self::Remote(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_map_to_variants() {
        assert!(matches!(
            LyrividError::validation("x"),
            LyrividError::Validation(_)
        ));
        assert!(matches!(LyrividError::export("x"), LyrividError::Export(_)));
        assert!(matches!(
            LyrividError::persistence("x"),
            LyrividError::Persistence(_)
        ));
    }

    #[test]
    fn display_includes_taxonomy_prefix() {
        let e = LyrividError::asset("bad png");
        assert_eq!(e.to_string(), "asset error: bad png");
    }
}
