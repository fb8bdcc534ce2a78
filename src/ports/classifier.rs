//! Image classifier port: Trait for the retinal disease model.
//!
//! The model itself runs elsewhere; the core only sees its confidences.

use std::path::Path;

use crate::domain::ClassificationResult;
use crate::OculusError;

use super::ServiceError;

/// Largest image accepted for upload (16 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

/// An image ready to send to the classifier.
#[derive(Clone)]
pub struct ImagePayload {
    /// File name reported to the service
    pub file_name: String,

    /// MIME type of `bytes`
    pub mime_type: String,

    /// Raw encoded image
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    /// Wrap in-memory image bytes.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    /// Read an image file from disk.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the file is missing, empty or larger than
    /// `max_bytes`, and `Io` if it cannot be read.
    pub fn from_path(path: &Path, max_bytes: u64) -> crate::Result<Self> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            OculusError::InvalidInput(format!("cannot open image {}: {e}", path.display()))
        })?;

        if !metadata.is_file() {
            return Err(OculusError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }
        if metadata.len() == 0 {
            return Err(OculusError::InvalidInput(format!(
                "{} is empty",
                path.display()
            )));
        }
        if metadata.len() > max_bytes {
            return Err(OculusError::InvalidInput(format!(
                "{} is {} bytes; the limit is {max_bytes}",
                path.display(),
                metadata.len()
            )));
        }

        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        Ok(Self::new(file_name, bytes))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Trait for the external retinal image classifier.
pub trait ImageClassifier: Send + Sync {
    /// Classify one fundus image.
    ///
    /// # Errors
    /// Returns `ServiceError::Rejected` when the service refuses the image,
    /// and the other variants when it cannot be reached or answers garbage.
    fn classify(&self, image: &ImagePayload) -> Result<ClassificationResult, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mime_detection() {
        assert_eq!(ImagePayload::new("eye.PNG", vec![1]).mime_type, "image/png");
        assert_eq!(ImagePayload::new("eye.jpeg", vec![1]).mime_type, "image/jpeg");
        assert_eq!(
            ImagePayload::new("eye", vec![1]).mime_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn test_from_path_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fundus.jpg");
        std::fs::File::create(&path)
            .and_then(|mut f| f.write_all(b"\xff\xd8\xff"))
            .expect("write");

        let payload = ImagePayload::from_path(&path, DEFAULT_MAX_IMAGE_BYTES).expect("Should read");
        assert_eq!(payload.file_name, "fundus.jpg");
        assert_eq!(payload.mime_type, "image/jpeg");
        assert_eq!(payload.bytes.len(), 3);
    }

    #[test]
    fn test_from_path_rejects_bad_files() {
        let dir = tempfile::tempdir().expect("tempdir");

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            ImagePayload::from_path(&missing, DEFAULT_MAX_IMAGE_BYTES),
            Err(OculusError::InvalidInput(_))
        ));

        let empty = dir.path().join("empty.png");
        std::fs::File::create(&empty).expect("create");
        assert!(matches!(
            ImagePayload::from_path(&empty, DEFAULT_MAX_IMAGE_BYTES),
            Err(OculusError::InvalidInput(_))
        ));

        let big = dir.path().join("big.png");
        std::fs::write(&big, vec![0u8; 64]).expect("write");
        assert!(matches!(
            ImagePayload::from_path(&big, 32),
            Err(OculusError::InvalidInput(_))
        ));
    }
}
