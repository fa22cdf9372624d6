use crate::command::ExitCode;
use crate::dispatch::Factory;
use crate::env::Environment;
use crate::error::{Result as WrapResult, WrapError};
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

/// A wrapper around one external program.
///
/// Options are parsed using the [`argh`] crate (`FromArgs`); `run` builds the
/// wrapped command line and launches it in one of the [`crate::subtask`] modes.
pub(crate) trait Wrapper: Sized + FromArgs {
    /// Name the wrapper is invoked by, usually the wrapped program's name.
    fn name() -> &'static str;

    /// One line description shown in the tool list.
    fn about() -> &'static str;

    /// Runs the wrapper. Messages meant for the user go to `stdout`.
    ///
    /// Return value is the exit code to propagate, normally the wrapped program's.
    fn run(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

/// Object-safe form of a parsed wrapper, ready to run.
pub trait Runnable {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode>;
}

impl<T: Wrapper> Runnable for T {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        T::run(*self, stdout, env)
    }
}

/// Factory that tries to create a wrapper from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait WrapperFactory {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Runnable>>;
}

/// `--help` output or an argument error reported by argh.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl Runnable for InvalidArgs {
    fn execute(self: Box<Self>, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
        if self.is_error {
            eprintln!("{}", self.output.trim_end());
            Ok(2)
        } else {
            writeln!(stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

impl<T: Wrapper + 'static> WrapperFactory for Factory<T> {
    fn name(&self) -> &'static str {
        T::name()
    }

    fn description(&self) -> &'static str {
        T::about()
    }

    fn try_create(&self, name: &str, args: &[&str]) -> Option<Box<dyn Runnable>> {
        if name != T::name() {
            return None;
        }
        Some(match T::from_args(&[name], args) {
            Ok(wrapper) => Box::new(wrapper),
            Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                output,
                is_error: status.is_err(),
            }),
        })
    }
}

/// Read one line from the terminal.
///
/// Ctrl-C and end of input become [`WrapError::Interrupted`].
pub fn ask(prompt: &str) -> WrapResult<String> {
    let mut rl = DefaultEditor::new().map_err(|e| WrapError::stop(e.to_string()))?;
    match rl.readline(prompt) {
        Ok(line) => Ok(line.trim().to_string()),
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Err(WrapError::Interrupted),
        Err(err) => Err(WrapError::stop(err.to_string())),
    }
}

/// Ask a yes/no question; anything but `y`/`yes` is no.
pub fn confirm(prompt: &str) -> WrapResult<bool> {
    Ok(is_yes(&ask(prompt)?))
}

/// Pull every occurrence of `switch` out of forwarded arguments.
///
/// Returns whether it was present. Arguments after `--` are left alone.
pub(crate) fn take_switch(args: &mut Vec<String>, switch: &str) -> bool {
    let end = args.iter().position(|a| a == "--").unwrap_or(args.len());
    let before = args.len();
    let mut index = 0;
    args.retain(|a| {
        let keep = index >= end || a != switch;
        index += 1;
        keep
    });
    args.len() != before
}

/// Wrappers that forward their whole command line implement `FromArgs`
/// through this instead of the derive, so the wrapped program's own flags
/// (including `--help`) reach it untouched.
pub(crate) fn forward_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(FromArgs)]
    /// Say hello through a fake program.
    struct Hello {
        #[argh(switch, short = 'l')]
        /// shout.
        loud: bool,

        #[argh(positional, greedy)]
        /// names to greet.
        names: Vec<String>,
    }

    impl Wrapper for Hello {
        fn name() -> &'static str {
            "hello"
        }

        fn about() -> &'static str {
            "Say hello through a fake program."
        }

        fn run(self, stdout: &mut dyn Write, _env: &mut Environment) -> Result<ExitCode> {
            let text = format!("hello {}", self.names.join(" "));
            if self.loud {
                writeln!(stdout, "{}", text.to_uppercase())?;
            } else {
                writeln!(stdout, "{}", text)?;
            }
            Ok(0)
        }
    }

    fn run(name: &str, args: &[&str]) -> Option<(ExitCode, String)> {
        let factory = Factory::<Hello>::default();
        let cmd = factory.try_create(name, args)?;
        let mut out = Vec::new();
        let mut env = Environment::empty("/");
        let code = cmd.execute(&mut out, &mut env).unwrap();
        Some((code, String::from_utf8(out).unwrap()))
    }

    #[test]
    fn test_factory_matches_name_only() {
        assert!(run("bye", &[]).is_none());
        assert_eq!(run("hello", &["a", "b"]), Some((0, "hello a b\n".to_string())));
        assert_eq!(run("hello", &["-l", "x"]), Some((0, "HELLO X\n".to_string())));
    }

    #[test]
    fn test_help_and_bad_args() {
        let (code, out) = run("hello", &["--help"]).unwrap();
        assert_eq!(code, 0);
        assert!(out.contains("Usage: hello"));

        let (code, out) = run("hello", &["--nope"]).unwrap();
        assert_eq!(code, 2);
        assert!(out.is_empty());
    }

    #[test]
    fn test_factory_describes_wrapper() {
        let factory = Factory::<Hello>::default();
        assert_eq!(factory.description(), "Say hello through a fake program.");
        assert_eq!(WrapperFactory::name(&factory), "hello");
    }

    #[test]
    fn test_take_switch_stops_at_double_dash() {
        let mut args = forward_args(&["--daemon", "a.mp4", "--", "--daemon"]);
        assert!(take_switch(&mut args, "--daemon"));
        assert_eq!(args, ["a.mp4", "--", "--daemon"]);
        assert!(!take_switch(&mut args, "--daemon"));
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes("YES"));
        assert!(!is_yes(""));
        assert!(!is_yes("no"));
    }
}
