use crate::errors::AutoquitError;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Failed to signal process {pid}: {message}")]
    SignalFailed { pid: i32, message: String },

    #[error("Permission denied signaling process {pid}")]
    PermissionDenied { pid: i32 },
}

impl AutoquitError for ProcessError {
    fn error_code(&self) -> &'static str {
        match self {
            ProcessError::SignalFailed { .. } => "PROCESS_SIGNAL_FAILED",
            ProcessError::PermissionDenied { .. } => "PROCESS_PERMISSION_DENIED",
        }
    }
}
