use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::wrapper::Wrapper;
use anyhow::Result;
use argh::FromArgs;
use std::io::Write;

#[derive(FromArgs)]
/// Show which executable each wrapper would launch.
pub struct Which {
    #[argh(positional, greedy)]
    /// program names to locate.
    pub names: Vec<String>,
}

impl Wrapper for Which {
    fn name() -> &'static str {
        "which"
    }

    fn about() -> &'static str {
        "Show which executable each wrapper would launch."
    }

    fn run(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let mut code = 0;
        for name in &self.names {
            let cmd = Command::new(name, env, Missing::Ignore)?;
            match cmd.file() {
                Some(file) => writeln!(stdout, "{}", file.display())?,
                None => {
                    eprintln!("which: no \"{}\" in search path", name);
                    code = 1;
                }
            }
        }
        Ok(code)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_which_prints_paths_and_flags_missing() {
        let mut env = Environment::empty("/");
        env.set_var("PATH", "/bin:/usr/bin");
        let which = Which {
            names: vec!["sh".into(), "no-such-tool-4242".into()],
        };
        let mut out = Vec::new();
        let code = which.run(&mut out, &mut env).unwrap();
        assert_eq!(code, 1);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.trim_end().ends_with("/sh"));
    }
}
