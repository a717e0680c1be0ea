#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("No questions found in {0}")]
    NoQuestionsFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Figure {0} was already written in this run")]
    FigureExists(String),

    #[error("Failed to write figure {path}: {reason}")]
    FigureWrite { path: String, reason: String },
}
