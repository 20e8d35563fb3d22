use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    PdfError(String),
    #[error("Failed to read roster file: {0}")]
    RosterError(String),
    #[error("Failed to import students: {0}")]
    ImportError(String),
    #[error("Remote request failed: {0}")]
    RemoteError(String),
    #[error("Invalid chart file: {0}")]
    ChartFileError(String),
    #[error("Invalid date format: {0}")]
    DateError(String),
    #[error("Failed to load logo: {0}")]
    LogoError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
