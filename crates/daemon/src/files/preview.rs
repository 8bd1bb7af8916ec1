//! Preview classification and bounded text reads.
//!
//! Files are classified by the MIME type guessed from their name. Text
//! previews are read into memory and capped at [`MAX_TEXT_PREVIEW_SIZE`];
//! media previews are streamed by the HTTP layer.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use mime_guess::mime::{self, Mime};
use thiserror::Error;

/// Largest text file rendered inline (1 MiB).
pub const MAX_TEXT_PREVIEW_SIZE: u64 = 1024 * 1024;

/// Errors that can occur while reading a preview.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The file type is not previewable.
    #[error("file type cannot be previewed: {0}")]
    Unsupported(String),

    /// Text content exceeds the limit.
    #[error("preview too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// How a file is previewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Text,
    Image,
    Audio,
    Video,
    Pdf,
}

impl PreviewKind {
    /// Classify a file by the MIME type guessed from its name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_mime(&mime_guess::from_path(name).first()?)
    }

    fn from_mime(guess: &Mime) -> Option<Self> {
        let (top, sub) = (guess.type_(), guess.subtype());
        if top == mime::TEXT {
            Some(Self::Text)
        } else if top == mime::IMAGE {
            Some(Self::Image)
        } else if top == mime::AUDIO {
            Some(Self::Audio)
        } else if top == mime::VIDEO {
            Some(Self::Video)
        } else if top != mime::APPLICATION {
            None
        } else if sub == mime::PDF {
            Some(Self::Pdf)
        } else if sub == mime::JSON || sub == mime::XML || sub == mime::JAVASCRIPT {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Content type to serve a preview of `name` with.
    ///
    /// Text is always sent as `text/plain` so markup is shown, not rendered.
    pub fn content_type(&self, name: &str) -> Mime {
        match self {
            Self::Text => mime::TEXT_PLAIN_UTF_8,
            _ => mime_guess::from_path(name).first_or_octet_stream(),
        }
    }
}

/// Read a text preview, refusing files larger than `limit`.
///
/// At most `limit + 1` bytes are read, so a file that grows after its size
/// was checked is still refused. Invalid UTF-8 is replaced rather than
/// rejected.
pub fn read_text_preview(path: &Path, limit: u64) -> Result<String, PreviewError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    if size > limit {
        return Err(PreviewError::TooLarge { size, limit });
    }

    let mut bytes = Vec::with_capacity(size as usize);
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    let read = bytes.len() as u64;
    if read > limit {
        return Err(PreviewError::TooLarge { size: read, limit });
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
