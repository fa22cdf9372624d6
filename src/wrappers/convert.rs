use crate::command::ExitCode;
use crate::config::Data;
use crate::env::Environment;
use crate::error::WrapError;
use crate::wrapper::{Wrapper, confirm};
use anyhow::Result;
use argh::FromArgs;
use std::io::Write;
use std::path::PathBuf;

#[derive(FromArgs)]
/// Convert between JSON, YAML and BSON files (format from the file extensions).
pub struct Convert {
    #[argh(switch, short = 'c')]
    /// write JSON without indentation.
    pub compact: bool,

    #[argh(switch, short = 'f')]
    /// overwrite the output file without asking.
    pub force: bool,

    #[argh(positional)]
    /// file to read (.json, .yaml, .yml or .bson).
    pub input: String,

    #[argh(positional)]
    /// file to write (.json, .yaml, .yml or .bson).
    pub output: String,
}

impl Wrapper for Convert {
    fn name() -> &'static str {
        "convert"
    }

    fn about() -> &'static str {
        "Convert between JSON, YAML and BSON files."
    }

    fn run(self, stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let input = resolve(env, &self.input);
        let output = resolve(env, &self.output);
        if !input.is_file() {
            return Err(WrapError::stop(format!("Cannot find \"{}\" file.", self.input)).into());
        }
        if output.exists() && !self.force {
            let question = format!("Overwrite \"{}\"? [y/N] ", self.output);
            if !confirm(&question)? {
                return Err(
                    WrapError::stop(format!("Cannot overwrite \"{}\" file.", self.output)).into(),
                );
            }
        }

        let data = Data::read(&input)?;
        data.write(&output, self.compact)?;
        writeln!(stdout, "{} -> {}", self.input, self.output)?;
        Ok(0)
    }
}

fn resolve(env: &Environment, path: &str) -> PathBuf {
    env.current_dir.join(path)
}
