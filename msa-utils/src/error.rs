//! Error types shared by the alignment, parsing and statistics layers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MsaError {
    /// 外部比对工具在超时时间内没有完成（或没有写完）输出文件
    #[error("alignment output '{}' not produced within {:?}", path.display(), waited)]
    MissingOutputTimeout { path: PathBuf, waited: Duration },

    /// 工具正常退出，但输出文件不存在或为空
    #[error("alignment tool exited successfully but '{}' is missing or empty", path.display())]
    MissingOutput { path: PathBuf },

    #[error("alignment tool exited with {status}; see '{}'", log.display())]
    ToolFailed { status: String, log: PathBuf },

    #[error("alignment cancelled")]
    Cancelled,

    #[error("duplicate identifier '{id}' at line {line}")]
    DuplicateIdentifier { id: String, line: usize },

    #[error("sequence {index} has length {found}, expected {expected}")]
    LengthMismatch { index: usize, expected: usize, found: usize },

    #[error("malformed record at line {line}: {text:?}")]
    MalformedRecord { line: usize, text: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("run metadata error: {0}")]
    Meta(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, MsaError>;
