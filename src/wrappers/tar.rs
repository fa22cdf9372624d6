use crate::command::{Command, ExitCode, Missing};
use crate::env::Environment;
use crate::error::WrapError;
use crate::subtask::{Batch, OutputFilter, RunOptions, Task};
use crate::wrapper::Wrapper;
use anyhow::Result;
use argh::FromArgs;
use std::io::Write;
use tracing::debug;

#[derive(FromArgs)]
/// Create a tar archive, compressing according to the archive's extension.
pub struct Tar {
    #[argh(switch, short = 'v')]
    /// list files as they are added.
    pub verbose: bool,

    #[argh(positional)]
    /// archive to create (.tar, .tar.gz, .tgz, .tar.bz2, .tar.xz, .txz, .tar.zst).
    pub archive: String,

    #[argh(positional, greedy)]
    /// files and directories to add.
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    fn from_archive(archive: &str) -> Option<Self> {
        let lower = archive.to_ascii_lowercase();
        let table = [
            (".tar.gz", Compression::Gzip),
            (".tgz", Compression::Gzip),
            (".tar.bz2", Compression::Bzip2),
            (".tbz", Compression::Bzip2),
            (".tar.xz", Compression::Xz),
            (".txz", Compression::Xz),
            (".tar.zst", Compression::Zstd),
            (".tzst", Compression::Zstd),
            (".tar", Compression::None),
        ];
        table
            .iter()
            .find(|(ext, _)| lower.ends_with(ext))
            .map(|(_, c)| *c)
    }

    fn flag(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("-z"),
            Compression::Bzip2 => Some("-j"),
            Compression::Xz => Some("-J"),
            Compression::Zstd => Some("--zstd"),
        }
    }
}

impl Tar {
    fn build(&self, env: &Environment, gnu: bool) -> Result<Command> {
        let compression = Compression::from_archive(&self.archive).ok_or_else(|| {
            WrapError::stop(format!(
                "Unsupported \"{}\" archive format.",
                self.archive
            ))
        })?;
        if self.paths.is_empty() {
            return Err(WrapError::Usage("no files or directories to archive".into()).into());
        }
        for path in &self.paths {
            if !env.current_dir.join(path).exists() {
                return Err(WrapError::stop(format!("Cannot find \"{}\" file.", path)).into());
            }
        }

        let mut tar = Command::new("tar", env, Missing::Stop)?;
        if gnu {
            tar.extend_args(["--create", "--auto-compress"]);
        } else {
            tar.append_arg("-c");
            if let Some(flag) = compression.flag() {
                tar.append_arg(flag);
            }
        }
        if self.verbose {
            tar.append_arg("-v");
        }
        tar.extend_args(["-f", self.archive.as_str()]);
        tar.extend_args(self.paths.iter().cloned());
        Ok(tar)
    }
}

/// GNU tar understands `--auto-compress`; bsdtar needs explicit flags.
fn is_gnu_tar(env: &Environment) -> Result<bool> {
    let tar = Command::new("tar", env, Missing::Stop)?;
    let mut cmdline = tar.cmdline();
    cmdline.push("--version".to_string());
    let result = Batch::new(cmdline).run(env, &RunOptions::default())?;
    let gnu = result
        .output()
        .first()
        .is_some_and(|line| line.contains("GNU tar"));
    debug!("tar is {}", if gnu { "GNU" } else { "not GNU" });
    Ok(gnu)
}

impl Wrapper for Tar {
    fn name() -> &'static str {
        "tar"
    }

    fn about() -> &'static str {
        "Create a tar archive, compressing according to the archive's extension."
    }

    fn run(self, _stdout: &mut dyn Write, env: &mut Environment) -> Result<ExitCode> {
        let gnu = is_gnu_tar(env)?;
        let tar = self.build(env, gnu)?;
        let filter = OutputFilter::new().drop_matching("Removing leading `?/")?;
        Ok(Task::new(tar.cmdline()).run(env, &RunOptions::filtered(filter))?)
    }
}
