/// Convenience result type used across slidecast.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Top-level error taxonomy. Every variant aborts the whole conversion.
#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    /// No document was provided, or it could not be read.
    #[error("input error: {0}")]
    Input(String),

    /// The document parser rejected the file.
    #[error("parse error: {0}")]
    Parse(String),

    /// The speech synthesizer failed for one slide.
    #[error("synthesis error (slide {slide}): {msg}")]
    Synthesis {
        /// 0-based slide index.
        slide: usize,
        /// Collaborator message.
        msg: String,
    },

    /// A shape could not be painted (corrupt image payload, missing font).
    #[error("rasterization error: {0}")]
    Rasterization(String),

    /// The encoder failed to produce the output file.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Invalid configuration or inconsistent intermediate data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The request was cancelled through its [`crate::CancelToken`].
    #[error("conversion cancelled")]
    Cancelled,

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    /// Build a [`SlidecastError::Input`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Build a [`SlidecastError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Build a [`SlidecastError::Synthesis`] value.
    pub fn synthesis(slide: usize, msg: impl Into<String>) -> Self {
        Self::Synthesis {
            slide,
            msg: msg.into(),
        }
    }

    /// Build a [`SlidecastError::Rasterization`] value.
    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    /// Build a [`SlidecastError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`SlidecastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Name of the pipeline stage that failed, for user-facing error reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Parse(_) => "parse",
            Self::Synthesis { .. } => "synthesis",
            Self::Rasterization(_) => "rasterization",
            Self::Encoding(_) => "encoding",
            Self::Validation(_) => "validation",
            Self::Cancelled => "cancelled",
            Self::Other(_) => "internal",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
