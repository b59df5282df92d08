//! The `ccusage blocks --active --json` subprocess.
//!
//! The process runs on the caller's thread (always a worker, never the
//! control thread). Stdout is drained on a helper thread so a chatty child
//! cannot fill the pipe, while the caller polls for exit until the deadline.
//! On Unix the child leads its own process group, and a timeout kills the
//! whole group so `npx`/node descendants do not outlive the attempt.

#![allow(missing_docs)]

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::config::SourceConfig;
use crate::core::errors::{CcmError, Result};

use super::UsageSource;

/// Launcher used for both invocation styles.
const ENV_LAUNCHER: &str = "/usr/bin/env";
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Where the ccusage executable comes from. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelector {
    /// `npx ccusage ...`
    Npx,
    /// An explicit executable (from `CCUSAGE_PATH` or config).
    Executable(PathBuf),
}

impl SourceSelector {
    /// `Executable` when a path is configured, `Npx` otherwise.
    #[must_use]
    pub fn from_path(path: Option<PathBuf>) -> Self {
        path.map_or(Self::Npx, Self::Executable)
    }

    fn program_args(&self) -> Vec<String> {
        match self {
            Self::Npx => vec!["npx".to_string(), "ccusage".to_string()],
            Self::Executable(path) => vec![path.to_string_lossy().into_owned()],
        }
    }
}

/// Runs ccusage and returns its JSON report.
#[derive(Debug, Clone)]
pub struct CcusageCommand {
    selector: SourceSelector,
    token_limit: String,
    timeout: Duration,
    extra_args: Vec<String>,
}

impl CcusageCommand {
    #[must_use]
    pub fn new(selector: SourceSelector, token_limit: impl Into<String>, timeout: Duration) -> Self {
        Self {
            selector,
            token_limit: token_limit.into(),
            timeout,
            extra_args: Vec::new(),
        }
    }

    /// Build from the `[source]` config section.
    #[must_use]
    pub fn from_config(config: &SourceConfig) -> Self {
        let mut cmd = Self::new(
            SourceSelector::from_path(config.ccusage_path.clone()),
            config.token_limit.clone(),
            Duration::from_secs(config.timeout_secs),
        );
        cmd.extra_args.clone_from(&config.extra_args);
        cmd
    }

    /// Arguments passed to the launcher.
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        let mut args = self.selector.program_args();
        args.extend(
            ["blocks", "--active", "--json", "--token-limit"]
                .iter()
                .map(|s| (*s).to_string()),
        );
        args.push(self.token_limit.clone());
        args.extend(self.extra_args.iter().cloned());
        args
    }

    #[must_use]
    pub fn selector(&self) -> &SourceSelector {
        &self.selector
    }

    fn run(&self) -> Result<String> {
        let args = self.argv();
        let mut command = Command::new(ENV_LAUNCHER);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command
            .spawn()
            .map_err(|e| CcmError::DataSourceUnavailable {
                details: format!("failed to launch {}: {e}", args.join(" ")),
            })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CcmError::DataSourceUnavailable {
                details: "child stdout not captured".to_string(),
            })?;
        let reader = thread::Builder::new()
            .name("ccmon-source-stdout".to_string())
            .spawn(move || {
                let mut buf = String::new();
                stdout.read_to_string(&mut buf).map(|_| buf)
            })
            .map_err(|e| CcmError::Runtime {
                details: format!("failed to spawn stdout reader: {e}"),
            })?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    kill_process_tree(&mut child);
                    let _ = child.wait();
                    return Err(CcmError::DataSourceTimeout {
                        secs: self.timeout.as_secs(),
                    });
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => {
                    return Err(CcmError::DataSourceUnavailable {
                        details: format!("waiting for ccusage failed: {e}"),
                    });
                }
            }
        };

        let output = reader
            .join()
            .map_err(|_| CcmError::Runtime {
                details: "stdout reader panicked".to_string(),
            })?
            .map_err(|e| CcmError::DataSourceUnavailable {
                details: format!("reading ccusage output failed: {e}"),
            })?;

        // Exit status alone is not decisive: ccusage may print a usable report
        // and still exit non-zero.
        if output.trim().is_empty() {
            return Err(CcmError::DataSourceUnavailable {
                details: format!(
                    "ccusage returned nothing (exit {})",
                    status.code().unwrap_or(-1)
                ),
            });
        }
        Ok(output)
    }
}

/// Kill the child and, on Unix, every process left in its group.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Ok(pgid) = i32::try_from(child.id()) {
            if killpg(Pid::from_raw(pgid), Signal::SIGKILL).is_ok() {
                return;
            }
        }
    }
    let _ = child.kill();
}

impl UsageSource for CcusageCommand {
    fn fetch(&self) -> Result<String> {
        self.run()
    }

    fn describe(&self) -> String {
        format!("{ENV_LAUNCHER} {}", self.argv().join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn npx_invocation_args() {
        let cmd = CcusageCommand::new(SourceSelector::Npx, "max", Duration::from_secs(5));
        assert_eq!(
            cmd.argv(),
            vec![
                "npx",
                "ccusage",
                "blocks",
                "--active",
                "--json",
                "--token-limit",
                "max"
            ]
        );
    }

    #[test]
    fn explicit_executable_replaces_npx() {
        let cmd = CcusageCommand::new(
            SourceSelector::Executable(PathBuf::from("/opt/ccusage/bin/ccusage")),
            "500000",
            Duration::from_secs(5),
        );
        let argv = cmd.argv();
        assert_eq!(argv[0], "/opt/ccusage/bin/ccusage");
        assert_eq!(argv[1], "blocks");
        assert_eq!(argv.last().map(String::as_str), Some("500000"));
    }

    #[test]
    fn config_threads_selector_and_extra_args() {
        let config = SourceConfig {
            ccusage_path: Some(PathBuf::from("/usr/local/bin/ccusage")),
            token_limit: "max".to_string(),
            timeout_secs: 3,
            extra_args: vec!["--offline".to_string()],
        };
        let cmd = CcusageCommand::from_config(&config);
        assert_eq!(
            cmd.selector(),
            &SourceSelector::Executable(PathBuf::from("/usr/local/bin/ccusage"))
        );
        assert_eq!(cmd.argv().last().map(String::as_str), Some("--offline"));
        assert!(cmd.describe().starts_with("/usr/bin/env /usr/local/bin/ccusage"));
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-ccusage");
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            let mut perms = fs::metadata(&path).expect("meta").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("chmod");
            path
        }

        fn command(path: PathBuf, timeout: Duration) -> CcusageCommand {
            CcusageCommand::new(SourceSelector::Executable(path), "max", timeout)
        }

        #[test]
        fn captures_report_from_executable() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = script(dir.path(), r#"echo '{"blocks":[{"totalTokens":7}]}'"#);
            let out = command(path, Duration::from_secs(10))
                .fetch()
                .expect("fetch");
            assert!(out.contains("\"totalTokens\":7"));
        }

        #[test]
        fn silent_executable_is_unavailable() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = script(dir.path(), "exit 3");
            let err = command(path, Duration::from_secs(10))
                .fetch()
                .expect_err("no output");
            assert_eq!(err.code(), "CCM-2001");
            assert!(err.to_string().contains("exit 3"));
        }

        #[test]
        fn slow_executable_times_out() {
            let dir = tempfile::tempdir().expect("tempdir");
            let path = script(dir.path(), "sleep 5");
            let started = Instant::now();
            let err = command(path, Duration::from_millis(200))
                .fetch()
                .expect_err("timeout");
            assert_eq!(err.code(), "CCM-2002");
            assert!(started.elapsed() < Duration::from_secs(4));
        }

        #[cfg(target_os = "linux")]
        fn process_is_gone(pid: &str) -> bool {
            // Reaped, or a zombie waiting for a reaper.
            match fs::read_to_string(format!("/proc/{pid}/stat")) {
                Ok(stat) => stat
                    .rsplit_once(')')
                    .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z')),
                Err(_) => true,
            }
        }

        #[cfg(target_os = "linux")]
        #[test]
        fn timeout_kills_descendants_of_the_child() {
            let dir = tempfile::tempdir().expect("tempdir");
            let pid_file = dir.path().join("grandchild.pid");
            let path = script(
                dir.path(),
                &format!("sleep 30 &\necho $! > {}\nwait", pid_file.display()),
            );
            let err = command(path, Duration::from_millis(500))
                .fetch()
                .expect_err("timeout");
            assert_eq!(err.code(), "CCM-2002");

            let pid = fs::read_to_string(&pid_file).expect("pid file");
            let pid = pid.trim();
            assert!(!pid.is_empty());
            let deadline = Instant::now() + Duration::from_secs(3);
            while !process_is_gone(pid) && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(50));
            }
            assert!(process_is_gone(pid), "sleep {pid} outlived the timeout");
        }

        #[test]
        fn missing_executable_is_unavailable() {
            let err = command(
                PathBuf::from("/definitely/not/a/ccusage"),
                Duration::from_secs(5),
            )
            .fetch()
            .expect_err("missing");
            assert!(err.is_no_data());
        }
    }
}
