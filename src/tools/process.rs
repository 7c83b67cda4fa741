use super::CancelToken;
use anyhow::{Context, Result, anyhow, bail};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Shared settings for every external tool invocation.
#[derive(Debug, Clone)]
pub struct Runner {
    timeout: Option<Duration>,
    cancel: CancelToken,
}

impl Runner {
    pub fn new(timeout_seconds: u64, cancel: CancelToken) -> Self {
        Self {
            timeout: (timeout_seconds > 0).then(|| Duration::from_secs(timeout_seconds)),
            cancel,
        }
    }

    /// Run `cmd`, failing on spawn error, non-zero exit, timeout or cancellation.
    pub fn run(&self, mut cmd: Command) -> Result<Output> {
        let program = cmd.get_program().to_string_lossy().into_owned();
        if self.cancel.is_cancelled() {
            bail!("cancelled before starting {program}");
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        debug!("exec {:?}", cmd);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {program}"))?;

        let output = wait_for(&mut child, self.timeout, &self.cancel)
            .with_context(|| format!("waiting for {program}"))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{program} exited with {}: {}",
                output.status,
                one_line(&output.stderr)
            ));
        }

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("{program} stderr: {}", stderr.trim());
        }

        Ok(output)
    }

    /// Run and return stdout as text.
    pub fn stdout(&self, cmd: Command) -> Result<String> {
        let output = self.run(cmd)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Tool diagnostics folded into a single line for error messages.
fn one_line(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Fail unless `path` exists and is non-empty. Several tools exit 0 without writing anything.
pub fn require_output(path: &Path, what: &str) -> Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("{what} produced no output: {}", path.display()))?;
    if meta.len() == 0 {
        bail!("{what} produced an empty file: {}", path.display());
    }
    Ok(())
}

/// Whether `program` resolves on PATH (or is an existing path).
pub fn is_available(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

fn wait_for(child: &mut Child, timeout: Option<Duration>, cancel: &CancelToken) -> Result<Output> {
    // Drain pipes while waiting so chatty tools can't deadlock on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let collect = |status: ExitStatus| -> Result<Output> {
        let stdout = stdout_thread
            .join()
            .map_err(|_| anyhow!("stdout reader thread panicked"))??;
        let stderr = stderr_thread
            .join()
            .map_err(|_| anyhow!("stderr reader thread panicked"))??;
        Ok(Output {
            status,
            stdout,
            stderr,
        })
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            return collect(status);
        }

        let timed_out = timeout.is_some_and(|t| start.elapsed() > t);
        if timed_out || cancel.is_cancelled() {
            let _ = child.kill();
            let status = child.wait().with_context(|| "wait after kill")?;
            let output = collect(status)?;
            if timed_out {
                warn!("process timed out after {:?}", timeout);
                return Err(anyhow!(
                    "process exceeded timeout ({:?}); stderr: {}",
                    timeout,
                    one_line(&output.stderr)
                ));
            }
            return Err(anyhow!("process killed: run cancelled"));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
