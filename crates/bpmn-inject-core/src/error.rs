use std::io;

use bpmn_inject_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Success = 0,
    MissingProcess = 1,
    UnknownNode = 2,
    InvalidArguments = 3,
    Io = 4,
    Xml = 5,
    Config = 6,
}

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("no BPMN process found in the document")]
    MissingProcess,

    #[error("no flow node with id '{id}' in the process")]
    UnknownNode { id: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl InjectError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::MissingProcess => ExitCode::MissingProcess,
            Self::UnknownNode { .. } => ExitCode::UnknownNode,
            Self::InvalidArguments(_) => ExitCode::InvalidArguments,
            Self::Io(_) => ExitCode::Io,
            Self::Xml(_) => ExitCode::Xml,
            Self::Config(_) => ExitCode::Config,
        }
    }
}

pub type InjectResult<T> = Result<T, InjectError>;
