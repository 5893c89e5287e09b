//! Guards consulted before an increment leaves the active zone.

use std::path::Path;
use std::process::Command;

/// Reports work under an increment directory that has not been committed.
pub trait UncommittedWorkGuard {
    fn has_uncommitted_changes(&self, increment_dir: &Path) -> bool;
}

/// Never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUncommittedWork;

impl UncommittedWorkGuard for NoUncommittedWork {
    fn has_uncommitted_changes(&self, _increment_dir: &Path) -> bool {
        false
    }
}

/// Asks git for changes under the increment directory.
///
/// Any `git status --porcelain` output blocks. If git cannot be run or the
/// directory is not in a work tree, nothing blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitWorkingTree;

impl UncommittedWorkGuard for GitWorkingTree {
    fn has_uncommitted_changes(&self, increment_dir: &Path) -> bool {
        let output = Command::new("git")
            .arg("status")
            .arg("--porcelain")
            .arg("--")
            .arg(".")
            .current_dir(increment_dir)
            .output();

        match output {
            Ok(out) if out.status.success() => !out.stdout.is_empty(),
            Ok(out) => {
                tracing::debug!(
                    "git status failed in {}: {}",
                    increment_dir.display(),
                    String::from_utf8_lossy(&out.stderr).trim()
                );
                false
            }
            Err(e) => {
                tracing::debug!("git unavailable: {}", e);
                false
            }
        }
    }
}

impl<F> UncommittedWorkGuard for F
where
    F: Fn(&Path) -> bool,
{
    fn has_uncommitted_changes(&self, increment_dir: &Path) -> bool {
        self(increment_dir)
    }
}
