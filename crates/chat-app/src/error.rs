use chatbot_backend::BackendError;
use chatbot_storage::StorageError;
use snafu::Snafu;

use crate::chat::ElementRole;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("required {role} element '{id}' is missing on `{stage}`"))]
    MissingElement {
        stage: &'static str,
        role: ElementRole,
        id: String,
    },
    #[snafu(display("{operation} was cancelled by the user"))]
    UserCancelled {
        stage: &'static str,
        operation: &'static str,
    },
    #[snafu(display("backend call failed on `{stage}`: {source}"))]
    Backend {
        stage: &'static str,
        source: BackendError,
    },
    #[snafu(display("local store access failed on `{stage}`: {source}"))]
    Storage {
        stage: &'static str,
        source: StorageError,
    },
    #[snafu(display("failed to serialize history export on `{stage}`: {source}"))]
    ExportSerialize {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to create export directory {path}: {source}"))]
    CreateExportDirectory {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to write history export {path}: {source}"))]
    ExportWrite {
        stage: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[snafu(display("failed to read terminal input on `{stage}`: {source}"))]
    ReadInput {
        stage: &'static str,
        source: std::io::Error,
    },
}

impl ClientError {
    /// True when the client already showed a notification for this failure.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            Self::Backend { .. }
                | Self::ExportSerialize { .. }
                | Self::CreateExportDirectory { .. }
                | Self::ExportWrite { .. }
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
