#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

/// A report with every field present: 50% used, 210 minutes left.
pub const FULL_REPORT: &str = r#"{"blocks":[{
    "totalTokens": 500000,
    "costUSD": 12.5,
    "projection": {"totalTokens": 900000, "totalCost": 20.0, "remainingMinutes": 210},
    "tokenLimitStatus": {"limit": 1000000, "percentUsed": 50.0}
}]}"#;

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_ccmon") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "ccmon.exe" } else { "ccmon" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve ccmon binary path for integration test"),
    }
}

pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with(case_name, args, &[], None)
}

/// Run the binary with extra env vars and optional stdin. `HOME` points at a
/// scratch directory and the activity log is off unless `envs` says otherwise.
pub fn run_cli_case_with(
    case_name: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    stdin: Option<&str>,
) -> CmdResult {
    let root = std::env::temp_dir().join("ccmon-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");
    let home = tempfile::tempdir().expect("scratch home");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut cmd = Command::new(&bin_path);
    cmd.args(args)
        .env("HOME", home.path())
        .env("CCMON_LOG_ENABLED", "false")
        .env_remove("CCUSAGE_PATH")
        .env_remove("CCMON_OUTPUT_FORMAT")
        .env("RUST_BACKTRACE", "1")
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().expect("execute ccmon command");
    if let Some(input) = stdin {
        let mut pipe = child.stdin.take().expect("stdin pipe");
        pipe.write_all(input.as_bytes()).expect("write stdin");
    }
    let output = child.wait_with_output().expect("wait for ccmon");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// Write `report` to `dir/report.json`.
pub fn write_report(dir: &Path, report: &str) -> PathBuf {
    let path = dir.join("report.json");
    fs::write(&path, report).expect("write report");
    path
}

/// Executable shell script standing in for ccusage. It records its arguments
/// to `args.txt` next to itself.
#[cfg(unix)]
pub fn fake_ccusage(dir: &Path, stdout: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let report = dir.join("fake-report.json");
    fs::write(&report, stdout).expect("write fake report");
    let args_file = dir.join("args.txt");
    let path = dir.join("ccusage");
    fs::write(
        &path,
        format!(
            "#!/bin/sh\necho \"$@\" > '{}'\ncat '{}'\n",
            args_file.display(),
            report.display()
        ),
    )
    .expect("write script");
    let mut perms = fs::metadata(&path).expect("meta").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
    path
}
