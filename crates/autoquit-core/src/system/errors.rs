use crate::errors::AutoquitError;
use crate::system::types::Pid;

/// Failures at the OS observation seam. None of these are fatal to the
/// monitor; the polling backstop keeps coverage when subscriptions fail.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("Accessibility access is not granted")]
    NotTrusted,

    #[error("Subscription rejected for pid {pid}: {message}")]
    SubscriptionRejected { pid: Pid, message: String },

    #[error("Application with pid {pid} is unreachable")]
    AppUnreachable { pid: Pid },

    #[error("Failed to request termination of pid {pid}: {message}")]
    TerminateFailed { pid: Pid, message: String },
}

impl AutoquitError for SystemError {
    fn error_code(&self) -> &'static str {
        match self {
            SystemError::NotTrusted => "SYSTEM_NOT_TRUSTED",
            SystemError::SubscriptionRejected { .. } => "SYSTEM_SUBSCRIPTION_REJECTED",
            SystemError::AppUnreachable { .. } => "SYSTEM_APP_UNREACHABLE",
            SystemError::TerminateFailed { .. } => "SYSTEM_TERMINATE_FAILED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, SystemError::NotTrusted)
    }
}
