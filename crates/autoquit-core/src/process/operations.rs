use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid as NixPid;
use sysinfo::{Pid as SysinfoPid, ProcessesToUpdate, System};
use tracing::{debug, warn};

use crate::process::errors::ProcessError;

/// Check if a process with the given PID is currently running.
pub fn is_process_running(pid: i32) -> bool {
    let mut system = System::new();
    let pid_obj = SysinfoPid::from_u32(pid as u32);
    system.refresh_processes(ProcessesToUpdate::Some(&[pid_obj]), true);
    system.process(pid_obj).is_some()
}

/// Ask a process to terminate gracefully with SIGTERM.
///
/// A pid that has already exited is a successful no-op: the window close
/// that triggered the quit decision may race with the user quitting the
/// application themselves.
pub fn terminate_gracefully(pid: i32) -> Result<(), ProcessError> {
    debug!(event = "core.process.terminate_requested", pid = pid);

    // Only signal a process that still exists; the target may have quit on
    // its own between the quit decision and this call.
    if !is_process_running(pid) {
        debug!(event = "core.process.terminate_target_gone", pid = pid);
        return Ok(());
    }

    match kill(NixPid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => {
            debug!(event = "core.process.terminate_signaled", pid = pid);
            Ok(())
        }
        Err(Errno::ESRCH) => {
            debug!(event = "core.process.terminate_target_gone", pid = pid);
            Ok(())
        }
        Err(Errno::EPERM) => {
            warn!(event = "core.process.terminate_denied", pid = pid);
            Err(ProcessError::PermissionDenied { pid })
        }
        Err(errno) => Err(ProcessError::SignalFailed {
            pid,
            message: errno.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_process_running_self() {
        let own_pid = std::process::id() as i32;
        assert!(is_process_running(own_pid));
    }

    /// Pid of a child that has already been reaped. Pids are allocated
    /// sequentially, so it will not be reused during the test.
    fn exited_child_pid() -> i32 {
        let mut child = std::process::Command::new("true")
            .spawn()
            .expect("spawn true");
        let pid = child.id() as i32;
        child.wait().expect("wait for child");
        pid
    }

    #[test]
    fn test_is_process_running_exited_child() {
        assert!(!is_process_running(exited_child_pid()));
    }

    #[test]
    fn test_terminate_dead_pid_is_ok() {
        // A pid that does not exist must be treated as already terminated.
        assert!(terminate_gracefully(exited_child_pid()).is_ok());
    }

    #[test]
    fn test_terminate_live_child_signals_it() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("spawn sleep");
        let pid = child.id() as i32;

        assert!(terminate_gracefully(pid).is_ok());

        let status = child.wait().expect("wait for child");
        assert!(!status.success(), "child should die from SIGTERM");
    }
}
