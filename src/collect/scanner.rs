//! Collection scanner subprocess wrapper.
//!
//! Invokes the configured scanner CLI against a target and parses its
//! JSON-lines output. The call is bounded by a wall-clock timeout and a
//! missing tool or non-zero exit yields no evidence instead of an abort.
use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::EvidenceCollector;
use crate::config::ScannerConfig;
use crate::pipeline::RawEvent;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Scanner CLI invocation settings parsed from the service config.
#[derive(Debug, Clone)]
pub struct ScannerCli {
    argv: Vec<String>,
    modules: Vec<String>,
    timeout: Duration,
}

impl ScannerCli {
    pub fn from_config(config: &ScannerConfig) -> Result<Self> {
        let raw = config.command.clone().unwrap_or_default();
        let argv = if raw.trim().is_empty() {
            Vec::new()
        } else {
            shell_words::split(&raw).context("parse scanner command")?
        };
        Ok(Self {
            argv,
            modules: config.modules.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    #[cfg(test)]
    fn with_argv(argv: Vec<String>, timeout: Duration) -> Self {
        Self {
            argv,
            modules: Vec::new(),
            timeout,
        }
    }
}

impl EvidenceCollector for ScannerCli {
    fn collect(&self, target: &str) -> Result<Vec<RawEvent>> {
        let Some(program) = self.argv.first() else {
            tracing::warn!("no scanner command configured; skipping collection");
            return Ok(Vec::new());
        };
        let program = resolve_program(program)?;

        let mut command = Command::new(&program);
        command.args(&self.argv[1..]);
        command.arg("-s").arg(target).arg("-o").arg("json").arg("-q");
        if !self.modules.is_empty() {
            command.arg("-m").arg(self.modules.join(","));
        }
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        tracing::info!(program = %program.display(), target, "running collection scanner");
        let mut child = command
            .spawn()
            .with_context(|| format!("spawn scanner {}", program.display()))?;
        let stdout = drain_pipe(child.stdout.take());
        let stderr = drain_pipe(child.stderr.take());

        let status = wait_with_timeout(&mut child, self.timeout)?;
        let stdout = stdout
            .join()
            .map_err(|_| anyhow!("scanner stdout reader panicked"))?
            .context("read scanner stdout")?;
        let stderr = stderr
            .join()
            .map_err(|_| anyhow!("scanner stderr reader panicked"))?
            .context("read scanner stderr")?;

        if !status.success() {
            tracing::warn!(
                code = ?status.code(),
                stderr = %stderr.trim(),
                "scanner exited non-zero; treating as no evidence"
            );
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for line in stdout.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawEvent>(line) {
                Ok(event) => events.push(event),
                Err(err) => tracing::debug!(error = %err, "skipping malformed scanner line"),
            }
        }
        tracing::info!(events = events.len(), "collection scanner finished");
        Ok(events)
    }
}

/// Resolve the scanner executable: explicit paths are used as-is, bare names
/// are looked up on PATH.
fn resolve_program(program: &str) -> Result<PathBuf> {
    let path = PathBuf::from(program);
    if path.components().count() > 1 {
        if path.is_file() {
            return Ok(path);
        }
        return Err(anyhow!("scanner executable {} not found", path.display()));
    }
    which::which(program).with_context(|| format!("scanner executable {program} not on PATH"))
}

fn drain_pipe<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> thread::JoinHandle<std::io::Result<String>> {
    thread::spawn(move || {
        let mut buffer = String::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_string(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<std::process::ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().context("wait for scanner")? {
            return Ok(status);
        }
        if started.elapsed() > timeout {
            child.kill().ok();
            child.wait().ok();
            return Err(anyhow!("scanner timed out after {}s", timeout.as_secs()));
        }
        thread::sleep(POLL_INTERVAL);
    }
}
