/// Errors that make a log file unusable as a whole.  Problems with individual lines are never
/// reported here; such lines are dropped silently by the readers.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SarError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The start-date line of the file could not be decoded.  The payload is the offending text.
    #[error("Unknown date format: {0}")]
    UnrecognizedDateFormat(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SarError>;

#[test]
fn test_error_messages() {
    let e = SarError::UnrecognizedDateFormat("13/13/2024".to_string());
    assert!(e.to_string() == "Unknown date format: 13/13/2024");
    let e = SarError::UnknownSection("DISK".to_string());
    assert!(e.to_string() == "Unknown section: DISK");
    let e = SarError::FileNotFound(PathBuf::from("data/system1/sar15"));
    assert!(e.to_string() == "File not found: data/system1/sar15");
}
