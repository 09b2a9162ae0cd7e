use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("Json::{}", .0)]
    Json(#[from] serde_json::Error),

    #[error("FlexiLogger::{:?}: {}", .0, .0)]
    FlexiLogger(#[from] flexi_logger::FlexiLoggerError),

    #[error("Config::{}", .0)]
    Config(#[from] gwdoc_core::ConfigError),

    #[error("Template::{}", .0)]
    Template(#[from] gwdoc_core::TemplateError),

    #[error("Pipeline::{}", .0)]
    Pipeline(#[from] gwdoc_core::PipelineError),
}
