//! Outbound input staging
//!
//! Attachments are base64-encoded when staged and handed to a message as a
//! batch. Taking the batch clears the staging list.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Maximum attachment size (5MB)
pub const MAX_ATTACHMENT_SIZE: u64 = 5 * 1024 * 1024;

/// Media type sent for every image attachment
pub const IMAGE_MEDIA_TYPE: &str = "image/png";

/// Media type sent for every audio attachment
pub const AUDIO_MEDIA_TYPE: &str = "audio/wav";

/// A base64-encoded attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    Image { data: String },
    Audio { data: String },
}

impl Attachment {
    #[must_use]
    pub fn image(bytes: &[u8]) -> Self {
        Attachment::Image {
            data: BASE64.encode(bytes),
        }
    }

    #[must_use]
    pub fn audio(bytes: &[u8]) -> Self {
        Attachment::Audio {
            data: BASE64.encode(bytes),
        }
    }

    #[must_use]
    pub fn media_type(&self) -> &'static str {
        match self {
            Attachment::Image { .. } => IMAGE_MEDIA_TYPE,
            Attachment::Audio { .. } => AUDIO_MEDIA_TYPE,
        }
    }

    #[must_use]
    pub fn data(&self) -> &str {
        match self {
            Attachment::Image { data } | Attachment::Audio { data } => data,
        }
    }

    #[must_use]
    pub fn into_data(self) -> String {
        match self {
            Attachment::Image { data } | Attachment::Audio { data } => data,
        }
    }

    /// Short label for listings
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Attachment::Image { .. } => "image",
            Attachment::Audio { .. } => "voice message",
        }
    }
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("Not an image file: {}", .0.display())]
    NotAnImage(PathBuf),
    #[error("Not an audio file: {}", .0.display())]
    NotAudio(PathBuf),
    #[error("File too large: {size} bytes (max {max} bytes)", max = MAX_ATTACHMENT_SIZE)]
    TooLarge { size: u64 },
    #[error("File is empty: {}", .0.display())]
    Empty(PathBuf),
    #[error("Cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Staging area for attachments of the next outbound message
#[derive(Debug, Default)]
pub struct InputAssembler {
    staged: Vec<Attachment>,
}

impl InputAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an image file. Only files whose extension maps to `image/*` are accepted.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not a supported image.
    pub async fn stage_image_file(&mut self, path: impl AsRef<Path>) -> Result<(), InputError> {
        let path = path.as_ref();
        if mime_guess::from_path(path).first_or_octet_stream().type_() != mime_guess::mime::IMAGE {
            return Err(InputError::NotAnImage(path.to_path_buf()));
        }
        let bytes = read_attachment(path).await?;
        self.stage(Attachment::image(&bytes));
        Ok(())
    }

    /// Stage a recorded audio file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or is not an audio file.
    pub async fn stage_audio_file(&mut self, path: impl AsRef<Path>) -> Result<(), InputError> {
        let path = path.as_ref();
        if mime_guess::from_path(path).first_or_octet_stream().type_() != mime_guess::mime::AUDIO {
            return Err(InputError::NotAudio(path.to_path_buf()));
        }
        let bytes = read_attachment(path).await?;
        self.stage(Attachment::audio(&bytes));
        Ok(())
    }

    /// Append an already-encoded attachment
    pub fn stage(&mut self, attachment: Attachment) {
        tracing::debug!(media_type = attachment.media_type(), "Staged attachment");
        self.staged.push(attachment);
    }

    /// Remove the attachment at `index`
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.staged.len()).then(|| self.staged.remove(index))
    }

    #[must_use]
    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Hand every staged attachment over, in staging order, and clear the list
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.staged)
    }

    /// Put attachments back in front of anything staged since they were taken
    pub fn restore(&mut self, mut attachments: Vec<Attachment>) {
        attachments.append(&mut self.staged);
        self.staged = attachments;
    }
}

async fn read_attachment(path: &Path) -> Result<Vec<u8>, InputError> {
    let metadata = fs::metadata(path).await.map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > MAX_ATTACHMENT_SIZE {
        return Err(InputError::TooLarge {
            size: metadata.len(),
        });
    }
    if metadata.len() == 0 {
        return Err(InputError::Empty(path.to_path_buf()));
    }
    fs::read(path).await.map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })
}
