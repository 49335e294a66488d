//! External command execution.
//!
//! Only `git` is spawned today, but the macro keeps call sites uniform.

use anyhow::{Context, Result, bail};
use std::{
    ffi::OsString,
    path::Path,
    process::{Command, Output},
};

/// Run an external command and capture its output.
///
/// Fails when the command cannot be spawned or exits non-zero.
///
/// ```ignore
/// exec!(["git"]; "--version")?;
/// exec!(root; ["git"]; "log", "--format=%aI", "--", path)?;
/// ```
#[macro_export]
macro_rules! exec {
    ($root:expr; $cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            Some($root),
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
        )
    };
    ($cmd:expr; $($arg:expr),* $(,)?) => {
        $crate::utils::exec::exec(
            None,
            &$crate::utils::exec::internal::to_cmd_vec($cmd),
            &$crate::utils::exec::internal::filter_args(&[$($crate::utils::exec::internal::to_os($arg)),*]),
        )
    };
}

#[doc(hidden)]
pub mod internal {
    use std::ffi::OsString;

    #[inline]
    pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
        s.into()
    }

    pub trait ToCmd {
        fn to_cmd(self) -> Vec<OsString>;
    }

    impl<const N: usize> ToCmd for [&str; N] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.into_iter().map(OsString::from).collect()
        }
    }

    impl ToCmd for &[String] {
        #[inline]
        fn to_cmd(self) -> Vec<OsString> {
            self.iter().map(OsString::from).collect()
        }
    }

    #[inline]
    pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
        cmd.to_cmd()
    }

    /// Empty args are dropped so optional flags can be passed as `""`.
    #[inline]
    pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
        args.iter().filter(|a| !a.is_empty()).cloned().collect()
    }
}

pub fn exec(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<Output> {
    let (name, mut command) = prepare(root, cmd, args)?;

    let output = command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))?;

    if !output.status.success() {
        bail!(format_error(&name, &output));
    }
    Ok(output)
}

fn prepare(root: Option<&Path>, cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let (program, rest) = cmd.split_first().context("Empty command")?;
    let name = program.to_string_lossy().into_owned();

    let mut command = Command::new(program);
    command.args(rest).args(args);
    if let Some(dir) = root {
        command.current_dir(dir);
    }
    Ok((name, command))
}

fn format_error(name: &str, output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut msg = format!("Command `{name}` failed with {}", output.status);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        msg.push('\n');
        msg.push_str(stderr);
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::internal::*;
    use super::*;

    #[test]
    fn test_to_cmd_vec() {
        let cmd = to_cmd_vec(["git", "log"]);
        assert_eq!(cmd, vec![OsString::from("git"), OsString::from("log")]);

        let owned = vec!["echo".to_string()];
        assert_eq!(to_cmd_vec(owned.as_slice()), vec![OsString::from("echo")]);
    }

    #[test]
    fn test_filter_args_drops_empty() {
        let args = [to_os("a"), to_os(""), to_os("b")];
        assert_eq!(filter_args(&args), vec![to_os("a"), to_os("b")]);
    }

    #[test]
    fn test_prepare_rejects_empty_command() {
        assert!(prepare(None, &[], &[]).is_err());
    }

    #[test]
    fn test_prepare_names_program() {
        let (name, _) = prepare(None, &to_cmd_vec(["git"]), &[to_os("status")]).unwrap();
        assert_eq!(name, "git");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_reports_failure() {
        let err = exec(None, &to_cmd_vec(["false"]), &[]).unwrap_err();
        assert!(err.to_string().contains("Command `false` failed"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_captures_stdout() {
        let output = crate::exec!(["echo"]; "hello").unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }
}
