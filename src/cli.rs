//! Shared CLI helpers for the four `[[bin]]` targets: stdin/stdout
//! redirection and the overwrite guard (§6/§7).
//!
//! The overwrite guard is fatal unless `-f`/`--force` was given, with one
//! exception: if stdin is a terminal and `-q`/`--quiet` was not given, the
//! user is asked interactively instead.
//!
//! `utkdecode.c`'s own overwrite check has no prompt at all: it just refuses
//! to clobber an existing file unless told to. The interactive path here is
//! this crate's own addition on top of that baseline, not carried over from
//! any example; the prompt text and y/n parsing are original to this file.

use std::io::{self, IsTerminal, Write};
use std::path::Path;

use crate::error::{Result, UtkError};

/// Check whether `path` may be written to, prompting the user if stdin is a
/// terminal and `quiet` is false, otherwise failing outright.
///
/// A non-existent `path`, or `force`, always succeeds without prompting.
pub fn confirm_overwrite(path: &Path, force: bool, quiet: bool) -> Result<()> {
    if force || !path.exists() {
        return Ok(());
    }

    if quiet || !io::stdin().is_terminal() {
        return Err(UtkError::OutputExists {
            path: path.display().to_string(),
        });
    }

    eprint!("'{}' already exists, overwrite? [y/N] ", path.display());
    io::stderr().flush().ok();
    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .map_err(|_| UtkError::OutputExists {
            path: path.display().to_string(),
        })?;

    if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
        Ok(())
    } else {
        Err(UtkError::OutputExists {
            path: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonexistent_path_never_needs_confirmation() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("does-not-exist.wav");
        confirm_overwrite(&path, false, false).unwrap();
    }

    #[test]
    fn force_always_succeeds_even_if_present() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("existing.wav");
        std::fs::write(&path, b"x").unwrap();
        confirm_overwrite(&path, true, false).unwrap();
    }

    #[test]
    fn existing_path_without_force_fails_when_not_a_terminal() {
        // The test harness's stdin is never a terminal, so this exercises
        // the same non-interactive path a `-q` run (or a piped/cron
        // invocation) takes.
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("existing.wav");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(
            confirm_overwrite(&path, false, false),
            Err(UtkError::OutputExists { .. })
        ));
    }

    #[test]
    fn quiet_never_prompts_and_fails_fast() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("existing.wav");
        std::fs::write(&path, b"x").unwrap();
        assert!(matches!(
            confirm_overwrite(&path, false, true),
            Err(UtkError::OutputExists { .. })
        ));
    }
}
