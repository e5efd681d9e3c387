use std::path::PathBuf;

/// Errors surfaced by a single scan request.
///
/// Input errors are reported back to the caller as-is; anything that goes
/// wrong inside the pipeline is wrapped in [`ScanError::Processing`].
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The request carried no `file` field.
    #[error("No file part")]
    MissingFile,

    /// The `file` field had an empty file name.
    #[error("No selected file")]
    EmptyFilename,

    /// The bytes were empty or could not be decoded as an image.
    #[error("Invalid image file")]
    InvalidImage,

    /// Unexpected failure while running the pipeline.
    #[error("{0}")]
    Processing(#[from] anyhow::Error),
}

impl ScanError {
    /// Whether the caller is at fault (maps to HTTP 400).
    pub fn is_input_error(&self) -> bool {
        !matches!(self, ScanError::Processing(_))
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        ScanError::Processing(err.into())
    }
}

/// A model artifact exists on disk but could not be loaded.
///
/// Never fails a request: the owning stage logs it and falls back to
/// placeholder behaviour.
#[derive(Debug, thiserror::Error)]
#[error("failed to load model {}: {source}", .path.display())]
pub struct ModelLoadError {
    pub path: PathBuf,
    #[source]
    pub source: anyhow::Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_classified() {
        assert!(ScanError::MissingFile.is_input_error());
        assert!(ScanError::EmptyFilename.is_input_error());
        assert!(ScanError::InvalidImage.is_input_error());
        assert!(!ScanError::Processing(anyhow::anyhow!("boom")).is_input_error());
    }

    #[test]
    fn messages_match_the_http_contract() {
        assert_eq!(ScanError::InvalidImage.to_string(), "Invalid image file");
        assert_eq!(ScanError::MissingFile.to_string(), "No file part");
        assert_eq!(ScanError::EmptyFilename.to_string(), "No selected file");
    }

    #[test]
    fn model_load_error_names_the_file() {
        let err = ModelLoadError {
            path: PathBuf::from("models/tumor_model.rten"),
            source: anyhow::anyhow!("bad header"),
        };
        assert_eq!(
            err.to_string(),
            "failed to load model models/tumor_model.rten: bad header"
        );
    }
}
