//! Running the external duplicate file finder.

use std::path::Path;
use std::process::Command;

use dirdupe_core::DirdupeError;

/// Run `<program> -r <dir>` and return its listing.
///
/// `dir` is canonicalized first so that every listed path is absolute.
pub fn run_fdupes(program: &str, dir: &Path) -> Result<String, DirdupeError> {
    let dir = dir.canonicalize().map_err(|e| DirdupeError::io(dir, e))?;
    tracing::info!(program, dir = %dir.display(), "running duplicate scanner");

    let output = Command::new(program)
        .arg("-r")
        .arg(&dir)
        .output()
        .map_err(|e| DirdupeError::Scanner {
            message: format!("failed to start {program}: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DirdupeError::Scanner {
            message: format!("{program} exited with {}: {}", output.status, stderr.trim()),
        });
    }

    match String::from_utf8(output.stdout) {
        Ok(listing) => Ok(listing),
        Err(err) => {
            tracing::warn!("scanner output is not valid UTF-8; affected paths will not match the filesystem");
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}
