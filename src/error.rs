use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("no available dataset source found (tried {})", tried.join(", "))]
    #[diagnostic(help("pass --source <path-or-url> or set CLEANED_JSON_PATH"))]
    Retrieval { tried: Vec<String> },

    #[error("source request failed: {0}")]
    SourceHttp(String),

    #[error("source returned status {status}: {message}")]
    SourceStatus { status: u16, message: String },

    #[error("failed to read source at {0}")]
    SourceRead(Utf8PathBuf),

    #[error("invalid source location: {0:?}")]
    InvalidSource(String),

    #[error("source did not supply a JSON array of records: {0}")]
    SourceShape(String),

    #[error("failed to read filter config at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("invalid filter config JSON: {0}")]
    ConfigParse(String),

    #[error("invalid dimension: {0} (expected 2d, 3d or video)")]
    InvalidDimension(String),

    #[error("invalid pipeline stage: {0}")]
    InvalidStage(String),

    #[error("invalid chart selection: {0}")]
    InvalidChartSelection(String),

    #[error("failed to write output: {0}")]
    Output(String),
}
