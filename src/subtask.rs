//! Execution modes for wrapped programs.
//!
//! - [`Exec`] replaces the current process image.
//! - [`Daemon`] starts a detached process in its own session.
//! - [`Background`] spawns and returns without waiting.
//! - [`Batch`] waits and captures filtered output lines.
//! - [`Task`] waits, re-emitting filtered output, and returns the exit code.

use crate::command::ExitCode;
use crate::env::Environment;
use crate::error::{Result, WrapError};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::process::CommandExt;

/// Line filter applied to captured output.
///
/// Lines matching the drop pattern are discarded; surviving lines have every
/// replacement applied in order.
#[derive(Debug, Clone, Default)]
pub struct OutputFilter {
    pattern: Option<Regex>,
    replacements: Vec<(Regex, String)>,
}

impl OutputFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop lines matching `pattern`.
    pub fn drop_matching(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Rewrite every match of `pattern` with `with` (`$1` style groups allowed).
    pub fn replace(mut self, pattern: &str, with: &str) -> Result<Self> {
        self.replacements.push((Regex::new(pattern)?, with.to_string()));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.replacements.is_empty()
    }

    pub fn apply(&self, line: &str) -> Option<String> {
        if let Some(pattern) = &self.pattern {
            if pattern.is_match(line) {
                return None;
            }
        }
        let mut line = line.to_string();
        for (re, with) in &self.replacements {
            line = re.replace_all(&line, with.as_str()).into_owned();
        }
        Some(line)
    }
}

/// Options shared by [`Batch`] and [`Task`].
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Run in this directory instead of the environment's.
    pub directory: Option<PathBuf>,
    pub filter: OutputFilter,
    /// Treat standard error lines as standard output.
    pub error2output: bool,
    /// Copy filtered standard output into this file.
    pub output_file: Option<PathBuf>,
}

impl RunOptions {
    pub fn filtered(filter: OutputFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

/// Replace the current process with the command.
pub struct Exec {
    cmdline: Vec<String>,
}

impl Exec {
    pub fn new(cmdline: Vec<String>) -> Self {
        Self { cmdline }
    }

    /// On unix this only returns when the exec itself fails.
    pub fn run(&self, env: &Environment) -> Result<ExitCode> {
        let mut cmd = build(&self.cmdline, env, None)?;
        info!("exec {}", self.cmdline.join(" "));
        let _ = io::stdout().flush();

        #[cfg(unix)]
        {
            let err = cmd.exec();
            Err(spawn_error(&self.cmdline, err))
        }

        #[cfg(not(unix))]
        {
            let status = cmd
                .status()
                .map_err(|e| spawn_error(&self.cmdline, e))?;
            Ok(exit_code(status))
        }
    }
}

/// Start the command detached from this process and its terminal.
pub struct Daemon {
    cmdline: Vec<String>,
    log_file: Option<PathBuf>,
}

impl Daemon {
    pub fn new(cmdline: Vec<String>) -> Self {
        Self {
            cmdline,
            log_file: None,
        }
    }

    /// Send standard output and error to `path` instead of discarding them.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Returns the daemon's process id.
    pub fn run(&self, env: &Environment) -> Result<u32> {
        let mut cmd = build(&self.cmdline, env, None)?;
        cmd.stdin(Stdio::null());
        match &self.log_file {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).ok();
                }
                let file = File::create(path).map_err(|e| WrapError::io(path, e))?;
                let err_file = file.try_clone().map_err(|e| WrapError::io(path, e))?;
                cmd.stdout(Stdio::from(file));
                cmd.stderr(Stdio::from(err_file));
            }
            None => {
                cmd.stdout(Stdio::null());
                cmd.stderr(Stdio::null());
            }
        }

        #[cfg(unix)]
        {
            // SAFETY: setsid() is async-signal-safe; the child becomes a
            // session leader without a controlling terminal.
            unsafe {
                cmd.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NEW_PROCESS_GROUP: u32 = 0x00000200;
            const DETACHED_PROCESS: u32 = 0x00000008;
            cmd.creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS);
        }

        let child = cmd.spawn().map_err(|e| spawn_error(&self.cmdline, e))?;
        info!("daemon {} started with pid {}", self.cmdline[0], child.id());
        Ok(child.id())
    }
}

/// Spawn the command sharing our terminal, without waiting for it.
pub struct Background {
    cmdline: Vec<String>,
}

impl Background {
    pub fn new(cmdline: Vec<String>) -> Self {
        Self { cmdline }
    }

    pub fn run(&self, env: &Environment) -> Result<Child> {
        let mut cmd = build(&self.cmdline, env, None)?;
        let child = cmd.spawn().map_err(|e| spawn_error(&self.cmdline, e))?;
        debug!("background {} pid {}", self.cmdline[0], child.id());
        Ok(child)
    }
}

/// Captured result of a [`Batch`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    output: Vec<String>,
    error: Vec<String>,
    exit_code: ExitCode,
}

impl BatchResult {
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn error(&self) -> &[String] {
        &self.error
    }

    pub fn exit_code(&self) -> ExitCode {
        self.exit_code
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Run the command to completion, capturing its output lines.
pub struct Batch {
    cmdline: Vec<String>,
}

impl Batch {
    pub fn new(cmdline: Vec<String>) -> Self {
        Self { cmdline }
    }

    pub fn run(&self, env: &Environment, opts: &RunOptions) -> Result<BatchResult> {
        let mut cmd = build(&self.cmdline, env, opts.directory.clone())?;
        let mut tee = open_tee(opts)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| spawn_error(&self.cmdline, e))?;

        let mut result = BatchResult::default();
        pump(&mut child, opts, |stream, line| {
            match stream {
                Stream::Out => {
                    if let Some((path, file)) = tee.as_mut() {
                        writeln!(file, "{}", line).map_err(|e| WrapError::io(path.clone(), e))?;
                    }
                    result.output.push(line);
                }
                Stream::Err => result.error.push(line),
            }
            Ok(())
        })?;

        let status = child.wait().map_err(|e| spawn_error(&self.cmdline, e))?;
        result.exit_code = exit_code(status);
        debug!(
            "batch {} exited {} ({} lines)",
            self.cmdline[0],
            result.exit_code,
            result.output.len()
        );
        Ok(result)
    }
}

/// Run the command to completion, passing filtered output through.
pub struct Task {
    cmdline: Vec<String>,
}

impl Task {
    pub fn new(cmdline: Vec<String>) -> Self {
        Self { cmdline }
    }

    pub fn run(&self, env: &Environment, opts: &RunOptions) -> Result<ExitCode> {
        let mut cmd = build(&self.cmdline, env, opts.directory.clone())?;
        let passthrough = opts.filter.is_empty() && opts.output_file.is_none() && !opts.error2output;
        if passthrough {
            let status = cmd
                .status()
                .map_err(|e| spawn_error(&self.cmdline, e))?;
            return Ok(exit_code(status));
        }

        let mut tee = open_tee(opts)?;
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| spawn_error(&self.cmdline, e))?;
        pump(&mut child, opts, |stream, line| {
            let written = match stream {
                Stream::Out => {
                    if let Some((path, file)) = tee.as_mut() {
                        writeln!(file, "{}", line).map_err(|e| WrapError::io(path.clone(), e))?;
                    }
                    writeln!(io::stdout(), "{}", line)
                }
                Stream::Err => writeln!(io::stderr(), "{}", line),
            };
            written.map_err(|e| spawn_error(&self.cmdline, e))
        })?;

        let status = child.wait().map_err(|e| spawn_error(&self.cmdline, e))?;
        Ok(exit_code(status))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Out,
    Err,
}

fn build(cmdline: &[String], env: &Environment, directory: Option<PathBuf>) -> Result<Command> {
    let (program, args) = cmdline
        .split_first()
        .ok_or_else(|| WrapError::Usage("empty command line".to_string()))?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    env.apply(&mut cmd);
    if let Some(dir) = directory {
        cmd.current_dir(dir);
    }
    Ok(cmd)
}

fn open_tee(opts: &RunOptions) -> Result<Option<(PathBuf, File)>> {
    match &opts.output_file {
        Some(path) => {
            let file = File::create(path).map_err(|e| WrapError::io(path, e))?;
            Ok(Some((path.clone(), file)))
        }
        None => Ok(None),
    }
}

/// Drain the child's piped streams, feeding filtered lines to `sink` in
/// arrival order.
///
/// When `sink` fails the child is killed and reaped before the error is
/// returned; readers exit once the pipes close.
fn pump<F>(child: &mut Child, opts: &RunOptions, mut sink: F) -> Result<()>
where
    F: FnMut(Stream, String) -> Result<()>,
{
    let (tx, rx) = mpsc::channel();
    let mut readers = Vec::new();
    if let Some(out) = child.stdout.take() {
        readers.push(spawn_reader(out, Stream::Out, tx.clone()));
    }
    if let Some(err) = child.stderr.take() {
        readers.push(spawn_reader(err, Stream::Err, tx.clone()));
    }
    drop(tx);

    for (stream, line) in rx {
        let stream = if opts.error2output {
            Stream::Out
        } else {
            stream
        };
        let Some(line) = opts.filter.apply(&line) else {
            continue;
        };
        if let Err(err) = sink(stream, line) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }
    }
    for reader in readers {
        let _ = reader.join();
    }
    Ok(())
}

fn spawn_reader<R>(source: R, stream: Stream, tx: Sender<(Stream, String)>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\n', '\r'])
                        .to_string();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_error(cmdline: &[String], source: io::Error) -> WrapError {
    WrapError::Spawn {
        program: cmdline.first().cloned().unwrap_or_default(),
        source,
    }
}

/// Exit code of a finished child; signals map to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> ExitCode {
    match status.code() {
        Some(x) => x,
        None => terminated_by_signal(status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> Vec<String> {
        vec!["/bin/sh".into(), "-c".into(), script.into()]
    }

    fn env() -> Environment {
        let mut env = Environment::empty(std::env::temp_dir());
        env.set_var("PATH", "/bin:/usr/bin");
        env
    }

    #[test]
    fn test_filter_drops_and_replaces() {
        let filter = OutputFilter::new()
            .drop_matching("^$|Gtk-WARNING")
            .unwrap()
            .replace(r"(\d+)%", "$1 percent")
            .unwrap();
        assert_eq!(filter.apply(""), None);
        assert_eq!(filter.apply("(vlc:12): Gtk-WARNING **: theme"), None);
        assert_eq!(filter.apply("done 50%").as_deref(), Some("done 50 percent"));
        assert!(!filter.is_empty());
        assert!(OutputFilter::new().is_empty());
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        let err = OutputFilter::new().drop_matching("(").unwrap_err();
        assert!(matches!(err, WrapError::Pattern(_)));
    }

    #[test]
    fn test_batch_captures_filtered_lines() {
        let filter = OutputFilter::new().drop_matching("^noise").unwrap();
        let result = Batch::new(sh("echo one; echo noise; echo two; echo oops >&2; exit 3"))
            .run(&env(), &RunOptions::filtered(filter))
            .unwrap();
        assert_eq!(result.output(), ["one", "two"]);
        assert_eq!(result.error(), ["oops"]);
        assert_eq!(result.exit_code(), 3);
        assert!(result.has_output());
        assert!(result.has_error());
    }

    #[test]
    fn test_batch_error2output_merges_streams() {
        let opts = RunOptions {
            error2output: true,
            ..RunOptions::default()
        };
        let result = Batch::new(sh("echo out; echo err >&2")).run(&env(), &opts).unwrap();
        assert!(!result.has_error());
        let mut lines = result.output().to_vec();
        lines.sort();
        assert_eq!(lines, ["err", "out"]);
    }

    #[test]
    fn test_batch_uses_environment_and_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut env = env();
        env.set_var("WRAPKIT_TEST_VALUE", "42");
        let opts = RunOptions {
            directory: Some(tmp.path().to_path_buf()),
            ..RunOptions::default()
        };
        let result = Batch::new(sh("echo $WRAPKIT_TEST_VALUE; pwd")).run(&env, &opts).unwrap();
        assert_eq!(result.output()[0], "42");
        let reported = fs::canonicalize(&result.output()[1]).unwrap();
        assert_eq!(reported, fs::canonicalize(tmp.path()).unwrap());
    }

    #[test]
    fn test_task_tees_output_file() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("task.log");
        let opts = RunOptions {
            filter: OutputFilter::new().drop_matching("skip").unwrap(),
            output_file: Some(log.clone()),
            ..RunOptions::default()
        };
        let code = Task::new(sh("echo keep; echo skip; exit 5")).run(&env(), &opts).unwrap();
        assert_eq!(code, 5);
        assert_eq!(fs::read_to_string(&log).unwrap(), "keep\n");
    }

    #[test]
    fn test_task_passthrough_exit_code() {
        let code = Task::new(sh("exit 7")).run(&env(), &RunOptions::default()).unwrap();
        assert_eq!(code, 7);
    }

    #[test]
    fn test_signal_maps_to_128_plus() {
        let code = Task::new(sh("kill -TERM $$")).run(&env(), &RunOptions::default()).unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = Task::new(vec!["/no/such/program-4242".into()])
            .run(&env(), &RunOptions::default())
            .unwrap_err();
        assert!(matches!(err, WrapError::Spawn { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_empty_cmdline_is_usage_error() {
        let err = Batch::new(Vec::new()).run(&env(), &RunOptions::default()).unwrap_err();
        assert!(matches!(err, WrapError::Usage(_)));
    }

    fn wait_for_file(path: &Path, needle: &str) -> String {
        for _ in 0..100 {
            let text = fs::read_to_string(path).unwrap_or_default();
            if text.contains(needle) {
                return text;
            }
            thread::sleep(Duration::from_millis(50));
        }
        panic!("{} never contained {:?}", path.display(), needle);
    }

    #[test]
    fn test_background_returns_running_child() {
        let mut child = Background::new(sh("exit 4")).run(&env()).unwrap();
        assert_eq!(child.wait().unwrap().code(), Some(4));
    }

    #[test]
    fn test_daemon_logs_and_leads_own_session() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("logs").join("daemon.log");
        let pid = Daemon::new(sh("echo started; echo oops >&2; sleep 2"))
            .with_log_file(&log)
            .run(&env())
            .unwrap();

        // SAFETY: getsid only queries the kernel about `pid`.
        let sid = unsafe { libc::getsid(pid as libc::pid_t) };
        assert_eq!(sid, pid as libc::pid_t);
        assert_ne!(sid, unsafe { libc::getsid(0) });

        let text = wait_for_file(&log, "oops");
        assert!(text.contains("started"));
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }

    #[test]
    fn test_exec_missing_program_is_spawn_error() {
        let err = Exec::new(vec!["/no/such/program-4242".into()])
            .run(&env())
            .unwrap_err();
        assert!(matches!(err, WrapError::Spawn { ref program, .. } if program == "/no/such/program-4242"));
    }

    #[test]
    fn test_unwritable_output_file_does_not_start_program() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("ran");
        let opts = RunOptions {
            output_file: Some(tmp.path().join("no/such/dir/log")),
            ..RunOptions::default()
        };
        let script = sh(&format!("touch {}", marker.display()));

        let err = Task::new(script.clone()).run(&env(), &opts).unwrap_err();
        assert!(matches!(err, WrapError::Io { .. }));
        let err = Batch::new(script).run(&env(), &opts).unwrap_err();
        assert!(matches!(err, WrapError::Io { .. }));

        thread::sleep(Duration::from_millis(200));
        assert!(!marker.exists());
    }

    #[test]
    fn test_task_error2output_tees_both_streams() {
        let tmp = tempfile::tempdir().unwrap();
        let log = tmp.path().join("merged.log");
        let opts = RunOptions {
            error2output: true,
            output_file: Some(log.clone()),
            ..RunOptions::default()
        };
        let code = Task::new(sh("echo out; echo err >&2; exit 2")).run(&env(), &opts).unwrap();
        assert_eq!(code, 2);
        let mut lines: Vec<String> = fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(String::from)
            .collect();
        lines.sort();
        assert_eq!(lines, ["err", "out"]);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_failed_tee_write_kills_program() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("finished");
        let opts = RunOptions {
            output_file: Some(PathBuf::from("/dev/full")),
            ..RunOptions::default()
        };
        let script = sh(&format!("echo one; sleep 3; touch {}", marker.display()));

        let started = Instant::now();
        let err = Batch::new(script).run(&env(), &opts).unwrap_err();
        assert!(matches!(err, WrapError::Io { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!marker.exists());
    }
}
