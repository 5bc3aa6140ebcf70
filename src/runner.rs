//! Command runner: every external tool invocation goes through here.
//!
//! Commands are plain shell strings executed via `sh -c` in a working
//! directory. Before execution the raw command text is echoed to stdout so
//! the operator always has a transcript of what ran, and `$VAR` / `${VAR}`
//! references are expanded from the process environment.
//!
//! A non-zero exit status is not itself an error — `run`/`run_in` hand the
//! status back and the caller decides. Workflows that must stop on failure
//! use the `run_fatal*` variants, which convert a non-zero status into a
//! [`CommandFailed`] error; `main` propagates that status as the process
//! exit code.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Error carrying a failed command's exit status to the top of the program.
///
/// `main` downcasts to this to exit with the same status the command did.
#[derive(Debug)]
pub struct CommandFailed {
    /// The command text as echoed to the operator (pre-expansion).
    pub command: String,
    /// The command's exit status.
    pub status: i32,
}

impl fmt::Display for CommandFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "command failed (exit {}): {}", self.status, self.command)
    }
}

impl std::error::Error for CommandFailed {}

/// Runs shell commands rooted at the repository directory by default.
#[derive(Debug, Clone)]
pub struct Runner {
    root: PathBuf,
}

impl Runner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Runner { root: root.into() }
    }

    /// Run a command in the repository root. Returns the exit status.
    pub fn run(&self, cmd: &str) -> Result<i32> {
        self.run_in(cmd, &self.root)
    }

    /// Run a command in the given directory. Returns the exit status.
    ///
    /// The raw command text is printed to stdout before execution; env-var
    /// references are expanded in the text actually executed. A command
    /// killed by a signal has no exit code and is reported as status 1.
    pub fn run_in(&self, cmd: &str, cwd: &Path) -> Result<i32> {
        println!("{}", cmd);
        let expanded = expand_vars(cmd);
        let status = Command::new("sh")
            .arg("-c")
            .arg(&expanded)
            .current_dir(cwd)
            .status()
            .with_context(|| format!("failed to execute: {}", cmd))?;
        Ok(status.code().unwrap_or(1))
    }

    /// Run a command in the repository root, failing on non-zero exit.
    pub fn run_fatal(&self, cmd: &str) -> Result<()> {
        self.run_fatal_in(cmd, &self.root)
    }

    /// Run a command in the given directory, failing on non-zero exit.
    ///
    /// The returned error is a [`CommandFailed`] carrying the exit status.
    pub fn run_fatal_in(&self, cmd: &str, cwd: &Path) -> Result<()> {
        let status = self.run_in(cmd, cwd)?;
        if status != 0 {
            return Err(CommandFailed {
                command: cmd.to_string(),
                status,
            }
            .into());
        }
        Ok(())
    }
}

/// Expand `$VAR` and `${VAR}` references from the process environment.
///
/// References to unset variables are left verbatim, and `$` followed by
/// anything that cannot start a variable name passes through unchanged.
/// Single-quoted segments are left alone, matching what the shell will do
/// with them — [`shell_quote`]d text is never expanded.
pub fn expand_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_single_quote = false;

    while let Some(c) = chars.next() {
        if in_single_quote {
            if c == '\'' {
                in_single_quote = false;
            }
            out.push(c);
            continue;
        }
        if c == '\'' {
            in_single_quote = true;
            out.push(c);
            continue;
        }
        // Backslash escapes the next character, as in the shell; in
        // particular `\'` and `\$` never open a quote or a reference.
        if c == '\\' {
            out.push(c);
            if let Some(nc) = chars.next() {
                out.push(nc);
            }
            continue;
        }
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            // ${VAR}
            Some('{') => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                while let Some(nc) = chars.next() {
                    if nc == '}' {
                        closed = true;
                        break;
                    }
                    name.push(nc);
                }
                if closed && is_var_name(&name) {
                    match std::env::var(&name) {
                        Ok(val) => out.push_str(&val),
                        Err(_) => {
                            out.push_str("${");
                            out.push_str(&name);
                            out.push('}');
                        }
                    }
                } else {
                    // Unterminated or malformed reference: emit what we consumed.
                    out.push_str("${");
                    out.push_str(&name);
                    if closed {
                        out.push('}');
                    }
                }
            }
            // $VAR
            Some(&nc) if nc == '_' || nc.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&nc) = chars.peek() {
                    if nc == '_' || nc.is_ascii_alphanumeric() {
                        name.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match std::env::var(&name) {
                    Ok(val) => out.push_str(&val),
                    Err(_) => {
                        out.push('$');
                        out.push_str(&name);
                    }
                }
            }
            _ => {
                // Lone '$' or '$' before a non-name character.
                out.push('$');
            }
        }
    }

    out
}

/// Quote a string for safe literal inclusion in an `sh -c` command line.
///
/// Wraps the value in single quotes and escapes embedded single quotes,
/// so paths containing spaces, quotes, or `$` survive both [`expand_vars`]
/// and the shell untouched.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn is_var_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_expand_known_var() {
        unsafe { std::env::set_var("CHARTIFY_TEST_VAR", "hello") };
        assert_eq!(expand_vars("echo $CHARTIFY_TEST_VAR"), "echo hello");
        assert_eq!(expand_vars("echo ${CHARTIFY_TEST_VAR}!"), "echo hello!");
        unsafe { std::env::remove_var("CHARTIFY_TEST_VAR") };
    }

    #[test]
    #[serial]
    fn test_expand_unknown_var_left_verbatim() {
        unsafe { std::env::remove_var("CHARTIFY_UNSET_VAR") };
        assert_eq!(expand_vars("go $CHARTIFY_UNSET_VAR ."), "go $CHARTIFY_UNSET_VAR .");
        assert_eq!(
            expand_vars("go ${CHARTIFY_UNSET_VAR} ."),
            "go ${CHARTIFY_UNSET_VAR} ."
        );
    }

    #[test]
    fn test_expand_lone_dollar_passes_through() {
        assert_eq!(expand_vars("cost: $5"), "cost: $5");
        assert_eq!(expand_vars("trailing $"), "trailing $");
    }

    #[test]
    #[serial]
    fn test_expand_adjacent_text() {
        unsafe { std::env::set_var("CHARTIFY_TEST_DIR", "/tmp/x") };
        assert_eq!(
            expand_vars("${CHARTIFY_TEST_DIR}/bin:$CHARTIFY_TEST_DIR"),
            "/tmp/x/bin:/tmp/x"
        );
        unsafe { std::env::remove_var("CHARTIFY_TEST_DIR") };
    }

    #[test]
    fn test_expand_unterminated_brace() {
        assert_eq!(expand_vars("echo ${OOPS"), "echo ${OOPS");
    }

    #[test]
    #[serial]
    fn test_expand_leaves_single_quoted_text_alone() {
        unsafe { std::env::set_var("CHARTIFY_TEST_VAR", "hello") };
        assert_eq!(
            expand_vars("echo '$CHARTIFY_TEST_VAR' $CHARTIFY_TEST_VAR"),
            "echo '$CHARTIFY_TEST_VAR' hello"
        );
        unsafe { std::env::remove_var("CHARTIFY_TEST_VAR") };
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("with space"), "'with space'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$HOME"), "'$HOME'");
    }

    #[test]
    fn test_shell_quoted_text_survives_the_shell() {
        // The quoted value must reach the shell as one literal word, with
        // neither expand_vars nor the shell touching the `$` or the quote.
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path());
        let tricky = "it's $HOME";
        runner
            .run(&format!("printf '%s' {} > out.txt", shell_quote(tricky)))
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, tricky);
    }

    #[test]
    fn test_run_returns_exit_status() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path());
        assert_eq!(runner.run("true").unwrap(), 0);
        assert_eq!(runner.run("exit 3").unwrap(), 3);
    }

    #[test]
    fn test_run_in_respects_cwd() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path());
        runner.run("touch marker").unwrap();
        assert!(dir.path().join("marker").exists());
    }

    #[test]
    fn test_run_fatal_carries_status() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path());
        let err = runner.run_fatal("exit 7").unwrap_err();
        let failed = err.downcast_ref::<CommandFailed>().expect("CommandFailed");
        assert_eq!(failed.status, 7);
        assert_eq!(failed.command, "exit 7");
    }

    #[test]
    fn test_run_fatal_ok_on_success() {
        let dir = TempDir::new().unwrap();
        let runner = Runner::new(dir.path());
        assert!(runner.run_fatal("true").is_ok());
    }
}
