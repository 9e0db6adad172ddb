//! `cqp` child process
//!
//! Runs `cqp -c` (child mode) with piped stdio. Each statement is followed by
//! the `.EOL.;` pseudo-command, which makes cqp print an end-of-output marker
//! on stdout; everything cqp writes to stderr while a statement runs is
//! treated as an error report for that statement.
//!
//! cqp writes an error message before it flushes the end marker, so once the
//! marker has been read the message is already sitting in the stderr pipe.
//! Both pipes are read from the calling thread with `poll`, and whatever
//! stderr holds at that point is collected before `execute` returns.

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::path::Path;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::engine::{EngineError, QueryEngine};

/// Line cqp prints after the output of each statement
pub const EOL_MARKER: &str = "-::-EOL-::-";

/// How long `terminate` waits for cqp to exit before signalling it
const EXIT_GRACE: Duration = Duration::from_secs(2);

const EXIT_POLL: Duration = Duration::from_millis(20);

const READ_CHUNK: usize = 4096;

type Result<T> = std::result::Result<T, EngineError>;

/// One child pipe with the bytes read from it that are not yet consumed
struct Pipe<R> {
    pipe: R,
    buf: Vec<u8>,
    eof: bool,
}

impl<R: Read + AsFd> Pipe<R> {
    fn new(pipe: R) -> Self {
        Self {
            pipe,
            buf: Vec::new(),
            eof: false,
        }
    }

    /// Fd to poll, or `None` once the pipe is closed
    fn fd(&self) -> Option<BorrowedFd<'_>> {
        (!self.eof).then(|| self.pipe.as_fd())
    }

    /// Read once; only called after `poll` reported the pipe readable
    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = loop {
            match self.pipe.read(&mut chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            self.eof = true;
        } else {
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn next_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=end).collect();
        Some(decode_line(&line))
    }

    /// Unterminated tail of the buffer
    fn take_rest(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        Some(decode_line(&std::mem::take(&mut self.buf)))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches(['\r', '\n']).to_string()
}

/// Poll the given pipes; returns which of them can be read without blocking
fn poll_pipes(out: Option<BorrowedFd<'_>>, err: Option<BorrowedFd<'_>>, timeout: PollTimeout) -> io::Result<(bool, bool)> {
    let mut fds: Vec<PollFd<'_>> = [out, err]
        .into_iter()
        .flatten()
        .map(|fd| PollFd::new(fd, PollFlags::POLLIN))
        .collect();
    if fds.is_empty() {
        return Ok((false, false));
    }
    loop {
        match poll(&mut fds, timeout) {
            Ok(_) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let mut ready = fds.iter().map(|fd| fd.revents().is_some_and(|r| !r.is_empty()));
    let out_ready = out.is_some() && ready.next().unwrap_or(false);
    let err_ready = err.is_some() && ready.next().unwrap_or(false);
    Ok((out_ready, err_ready))
}

pub struct CqpProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: Pipe<ChildStdout>,
    stderr: Pipe<ChildStderr>,
    version: String,
    terminated: bool,
}

impl CqpProcess {
    /// Start `bin -c -r <registry_dir> -D <corpus>`
    pub fn spawn(bin: &Path, registry_dir: &Path, corpus: &str) -> Result<Self> {
        let mut cmd = Command::new(bin);
        cmd.arg("-c").arg("-r").arg(registry_dir).arg("-D").arg(corpus);
        Self::from_command(cmd)
    }

    /// Start a prepared command that speaks the cqp child protocol
    pub fn from_command(mut cmd: Command) -> Result<Self> {
        let program = Path::new(cmd.get_program()).to_path_buf();
        debug!(?program, "CqpProcess::from_command: called");

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(i), Some(o), Some(e)) => (i, o, e),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(EngineError::Startup("child stdio was not captured".to_string()));
            }
        };

        let mut process = Self {
            child,
            stdin,
            stdout: Pipe::new(stdout),
            stderr: Pipe::new(stderr),
            version: String::new(),
            terminated: false,
        };

        process.version = match process.read_line()? {
            Some(banner) => banner,
            None => {
                // cqp exits right away on a bad registry or corpus; once it
                // is gone its complaint is fully buffered in the stderr pipe
                process.terminated = true;
                let _ = process.child.wait();
                let message = process.drain_errors()?.join("\n");
                return Err(EngineError::Startup(if message.is_empty() {
                    "cqp exited before printing its banner".to_string()
                } else {
                    message
                }));
            }
        };
        let noise = process.drain_errors()?;
        if !noise.is_empty() {
            warn!(messages = ?noise, "cqp wrote to stderr during startup");
        }
        info!(version = %process.version, pid = process.child.id(), "Started cqp");

        process.execute("set PrettyPrint off")?;
        process.execute("set ProgressBar off")?;
        Ok(process)
    }

    /// Version banner printed by cqp on startup
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Next stdout line, reading stderr as it fills so neither pipe stalls
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.stdout.next_line() {
                return Ok(Some(line));
            }
            if self.stdout.eof {
                return Ok(self.stdout.take_rest());
            }
            let (out_ready, err_ready) = poll_pipes(self.stdout.fd(), self.stderr.fd(), PollTimeout::NONE)?;
            if err_ready {
                self.stderr.fill()?;
            }
            if out_ready {
                self.stdout.fill()?;
            }
        }
    }

    /// Collect every stderr line already in the pipe, without waiting for more
    fn drain_errors(&mut self) -> Result<Vec<String>> {
        while let (_, true) = poll_pipes(None, self.stderr.fd(), PollTimeout::ZERO)? {
            self.stderr.fill()?;
        }
        let mut lines = Vec::new();
        while let Some(line) = self.stderr.next_line() {
            lines.push(line);
        }
        lines.extend(self.stderr.take_rest());
        lines.retain(|l| !l.trim().is_empty());
        Ok(lines)
    }

    fn wait_for_exit(&mut self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.child.try_wait()?.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            thread::sleep(EXIT_POLL);
        }
    }

    fn signal_terminate(&self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let pid = self.child.id();
        debug!(pid, "CqpProcess::signal_terminate: sending SIGTERM");
        if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            debug!(pid, %e, "CqpProcess::signal_terminate: SIGTERM failed");
        }
    }
}

impl QueryEngine for CqpProcess {
    fn execute(&mut self, statement: &str) -> Result<Vec<String>> {
        if self.terminated {
            return Err(EngineError::Terminated);
        }
        let statement = statement.trim().trim_end_matches(';').trim_end();
        if statement.contains(['\n', '\r']) {
            return Err(EngineError::InvalidStatement(statement.to_string()));
        }

        let stray = self.drain_errors()?;
        if !stray.is_empty() {
            warn!(messages = ?stray, "cqp wrote to stderr between statements");
        }

        debug!(%statement, "CqpProcess::execute: called");
        writeln!(self.stdin, "{}; .EOL.;", statement)?;
        self.stdin.flush()?;

        let mut output = Vec::new();
        loop {
            match self.read_line()? {
                Some(line) if line == EOL_MARKER => break,
                Some(line) => output.push(line),
                None => {
                    debug!("CqpProcess::execute: stdout closed before end marker");
                    self.terminated = true;
                    let _ = self.child.wait();
                    return Err(EngineError::Terminated);
                }
            }
        }

        let errors = self.drain_errors()?;
        if !errors.is_empty() {
            return Err(EngineError::Query {
                statement: statement.to_string(),
                message: errors.join("\n"),
            });
        }

        debug!(lines = output.len(), "CqpProcess::execute: done");
        Ok(output)
    }

    fn terminate(&mut self) -> Result<()> {
        if self.terminated {
            debug!("CqpProcess::terminate: already terminated");
            return Ok(());
        }
        self.terminated = true;

        let pid = self.child.id();
        info!(pid, "Stopping cqp");
        if let Err(e) = writeln!(self.stdin, "exit;").and_then(|_| self.stdin.flush()) {
            debug!(pid, %e, "CqpProcess::terminate: exit command not delivered");
        }

        if self.wait_for_exit(EXIT_GRACE)? {
            debug!(pid, "CqpProcess::terminate: exited gracefully");
            return Ok(());
        }

        warn!(pid, "cqp did not exit, sending SIGTERM");
        self.signal_terminate();
        if self.wait_for_exit(EXIT_GRACE)? {
            return Ok(());
        }

        warn!(pid, "cqp ignored SIGTERM, killing");
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for CqpProcess {
    fn drop(&mut self) {
        if let Err(e) = self.terminate() {
            warn!(%e, "Failed to stop cqp");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LAST;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    // Minimal child-mode responder: banner, then echo each command's first
    // word before the end marker
    const ECHO: &str = r#"
echo "CQP version 3.5.0"
while IFS= read -r line; do
    case "$line" in
        exit*) exit 0 ;;
        *) set -- $line; echo "$1"; echo "-::-EOL-::-" ;;
    esac
done
"#;

    #[test]
    fn test_banner_and_execute() {
        let mut cqp = CqpProcess::from_command(sh(ECHO)).unwrap();
        assert_eq!(cqp.version(), "CQP version 3.5.0");

        let output = cqp.execute("show corpora;").unwrap();
        assert_eq!(output, vec!["show".to_string()]);

        cqp.terminate().unwrap();
    }

    #[test]
    fn test_execute_after_terminate_fails() {
        let mut cqp = CqpProcess::from_command(sh(ECHO)).unwrap();
        cqp.terminate().unwrap();
        cqp.terminate().unwrap();

        assert!(matches!(cqp.execute("size Last"), Err(EngineError::Terminated)));
    }

    #[test]
    fn test_syntax_error_belongs_to_its_statement() {
        let script = r#"
echo "CQP version 3.5.0"
while IFS= read -r line; do
    case "$line" in
        exit*) exit 0 ;;
        '[word="oops"]'*) echo 'CQP Syntax Error: parse error' >&2 ;;
        size*) echo 0 ;;
    esac
    echo "-::-EOL-::-"
done
"#;
        let mut cqp = CqpProcess::from_command(sh(script)).unwrap();
        for _ in 0..200 {
            match cqp.execute(r#"[word="oops"]"#) {
                Err(EngineError::Query { statement, message }) => {
                    assert_eq!(statement, r#"[word="oops"]"#);
                    assert!(message.contains("Syntax Error"));
                }
                other => panic!("expected a query error, got {:?}", other),
            }
            assert_eq!(cqp.size(LAST).unwrap(), 0);
        }
        cqp.terminate().unwrap();
    }

    #[test]
    fn test_multi_line_statement_is_rejected() {
        let mut cqp = CqpProcess::from_command(sh(ECHO)).unwrap();
        let result = cqp.execute("[word=\"a\"]\nexit");
        assert!(matches!(result, Err(EngineError::InvalidStatement(_))));

        // Nothing was sent, so the connection is still in step
        assert_eq!(cqp.execute("show").unwrap(), vec!["show".to_string()]);
        cqp.terminate().unwrap();
    }

    #[test]
    fn test_large_stderr_does_not_stall() {
        let script = r#"
echo "CQP version 3.5.0"
while IFS= read -r line; do
    case "$line" in
        exit*) exit 0 ;;
        noisy*) i=0; while [ $i -lt 3000 ]; do echo "warning line $i with some padding text" >&2; i=$((i + 1)); done ;;
    esac
    echo "-::-EOL-::-"
done
"#;
        let mut cqp = CqpProcess::from_command(sh(script)).unwrap();
        match cqp.execute("noisy") {
            Err(EngineError::Query { message, .. }) => assert_eq!(message.lines().count(), 3000),
            other => panic!("expected a query error, got {:?}", other),
        }
        cqp.terminate().unwrap();
    }

    #[test]
    fn test_process_dying_mid_statement() {
        let script = r#"
echo "CQP version 3.5.0"
read -r line; echo "-::-EOL-::-"
read -r line; echo "-::-EOL-::-"
read -r line; exit 3
"#;
        let mut cqp = CqpProcess::from_command(sh(script)).unwrap();
        assert!(matches!(cqp.execute("size Last"), Err(EngineError::Terminated)));
        cqp.terminate().unwrap();
    }

    #[test]
    fn test_startup_failure_reports_stderr() {
        let result = CqpProcess::from_command(sh("echo 'CQP Error: corpus BBS undefined' >&2; exit 1"));
        match result {
            Err(EngineError::Startup(message)) => assert!(message.contains("BBS")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("startup should fail"),
        }
    }

    #[test]
    fn test_missing_binary() {
        let result = CqpProcess::spawn(Path::new("/nonexistent/cqp"), Path::new("/tmp"), "BBS");
        assert!(matches!(result, Err(EngineError::Spawn { .. })));
    }

    #[test]
    fn test_unresponsive_process_is_signalled() {
        let script = r#"
trap 'exit 0' TERM
echo "CQP version 3.5.0"
read -r line; echo "-::-EOL-::-"
read -r line; echo "-::-EOL-::-"
while :; do sleep 0.05; done
"#;
        let mut cqp = CqpProcess::from_command(sh(script)).unwrap();
        cqp.terminate().unwrap();
        assert!(cqp.child.try_wait().unwrap().is_some());
    }
}
