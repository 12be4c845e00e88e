#![cfg(unix)]

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use mcpdock_registry::{
    DescriptorBuilder, Launcher, Reachability, RuntimeFlags, ServerRegistry, probe,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::Command;

fn fake_server() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../mcp/tests/fixtures/fake_server.sh")
        .to_string_lossy()
        .into_owned()
}

fn write_config(dir: &TempDir, config: &Value) -> PathBuf {
    let path = dir.path().join("mcp_servers.json");
    fs::write(&path, serde_json::to_string_pretty(config).unwrap()).unwrap();
    path
}

/// Installs an executable named `name` that launches the fake server.
fn install_launcher(dir: &Path, name: &str) {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\nexec sh '{}' ok\n", fake_server())).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

async fn is_alive(pid: u32) -> bool {
    // A zombie is gone for good even if nobody reaps it yet.
    if let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) {
        return stat
            .rsplit_once(") ")
            .is_some_and(|(_, rest)| !rest.starts_with('Z'));
    }
    Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

fn read_pid(path: &Path) -> u32 {
    fs::read_to_string(path).unwrap().trim().parse().unwrap()
}

/// Returns whether `pid` is still alive after giving it a moment to die.
async fn lingers(pid: u32) -> bool {
    for _ in 0..50 {
        if !is_alive(pid).await {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    true
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct Logs(Arc<Mutex<Vec<u8>>>);

impl Write for Logs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Logs {
    fn warnings(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(str::to_owned)
            .collect()
    }
}

#[tokio::test]
async fn test_missing_launcher_excludes_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        &json!({ "mcp_servers": {
            "time": { "command": "uvx", "args": ["mcp-server-time"] }
        }}),
    );

    let mut registry = ServerRegistry::new(&path)
        .unwrap()
        .with_runtime_flags(RuntimeFlags::all().with(Launcher::Uvx, false));
    registry.initialize().await;
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_reachable_launcher_is_retained() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    fs::create_dir(&bin).unwrap();
    install_launcher(&bin, "uvx");

    // The child resolves `uvx` through the PATH it is given.
    let search_path = format!("{}:/usr/bin:/bin", bin.display());
    let path = write_config(
        &dir,
        &json!({ "mcp_servers": {
            "time": {
                "command": "uvx",
                "args": ["mcp-server-time"],
                "env": { "PATH": search_path },
            }
        }}),
    );

    let mut registry = ServerRegistry::new(&path)
        .unwrap()
        .with_runtime_flags(RuntimeFlags::all());
    registry.initialize().await;

    let descriptor = registry.get_server("time").unwrap();
    assert_eq!(descriptor.command(), "uvx");
    let handles = registry.get_all_servers();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].command, "uvx");
    assert_eq!(handles[0].args, ["mcp-server-time"]);
}

#[tokio::test]
async fn test_invalid_entry_does_not_stop_the_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        &json!({ "mcp_servers": {
            "no-args": { "command": "sh" },
            "time": { "command": "sh", "args": [fake_server(), "ok"] },
            "rejecting": { "command": "sh", "args": [fake_server(), "reject"] },
            "missing": { "command": "mcpdock-definitely-missing-binary", "args": [] },
        }}),
    );

    let mut registry = ServerRegistry::new(&path).unwrap();
    registry.initialize().await;
    assert_eq!(registry.server_names().collect::<Vec<_>>(), ["time"]);
}

#[tokio::test]
async fn test_timed_out_probe_leaves_no_process() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("hang.pid");
    let path = write_config(
        &dir,
        &json!({ "mcp_servers": {
            "slow": {
                "command": "sh",
                "args": [fake_server(), "hang", pidfile],
                "timeout": 0.5,
            }
        }}),
    );

    let mut registry = ServerRegistry::new(&path).unwrap();
    let started = Instant::now();
    registry.initialize().await;
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(registry.is_empty());

    let pid = read_pid(&pidfile);
    assert!(!is_alive(pid).await);
}

#[tokio::test]
async fn test_probe_accepts_any_timeout_form() {
    let descriptor = DescriptorBuilder::with_command("sh", "sh")
        .with_args([fake_server(), "ok".to_owned()])
        .build();

    let result = probe(&descriptor, 10u64).await;
    assert_eq!(
        result,
        Reachability::Reachable {
            tools: vec!["get_current_time".to_owned(), "convert_time".to_owned()],
        }
    );
    assert!(probe(&descriptor, Duration::from_secs(10)).await.is_reachable());
    assert!(probe(&descriptor, 10.0).await.is_reachable());
    assert!(probe(&descriptor, "10s").await.is_reachable());
    assert!(!probe(&descriptor, "whenever").await.is_reachable());
}

#[tokio::test]
async fn test_probe_failures_are_values() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("hang.pid");
    let descriptor = DescriptorBuilder::with_command("slow", "sh")
        .with_args([fake_server(), "hang".to_owned(), pidfile.to_string_lossy().into_owned()])
        .build();

    let Reachability::Unreachable { reason } =
        probe(&descriptor, Duration::from_millis(300)).await
    else {
        panic!("probe should time out");
    };
    assert!(reason.contains("did not complete"), "{reason}");
    assert!(!is_alive(read_pid(&pidfile)).await);

    let descriptor = DescriptorBuilder::with_command("missing", "mcpdock-definitely-missing-binary")
        .build();
    assert!(!probe(&descriptor, 1u64).await.is_reachable());
}

#[test]
fn test_unusable_configuration_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    assert!(ServerRegistry::new(dir.path().join("nope.json")).is_err());

    let path = dir.path().join("servers.txt");
    fs::write(&path, "{}").unwrap();
    assert!(ServerRegistry::new(&path).is_err());
}

#[tokio::test]
async fn test_timed_out_launcher_leaves_no_grandchild() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = dir.path().join("hang.pid");
    // The wrapper does not exec, so the server runs as its child.
    let inner = format!("sh '{}' hang '{}'; true", fake_server(), pidfile.display());
    let descriptor = DescriptorBuilder::with_command("wrapped", "sh")
        .with_args(["-c".to_owned(), inner])
        .build();

    let result = probe(&descriptor, Duration::from_millis(500)).await;
    assert!(!result.is_reachable());
    assert!(!lingers(read_pid(&pidfile)).await);
}

#[tokio::test]
async fn test_skipped_entries_are_logged() {
    let logs = Logs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .without_time()
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        &json!({ "mcp_servers": {
            "no-args": { "command": "sh" },
            "gated": { "command": "npx", "args": ["-y", "server-memory"] },
            "rejecting": { "command": "sh", "args": [fake_server(), "reject"] },
            "time": { "command": "sh", "args": [fake_server(), "ok"] },
        }}),
    );
    let mut registry = ServerRegistry::new(&path)
        .unwrap()
        .with_runtime_flags(RuntimeFlags::all().with(Launcher::Npx, false));
    registry.initialize().await;
    assert_eq!(registry.server_names().collect::<Vec<_>>(), ["time"]);
    assert!(registry.remove_server("ghost").is_none());

    let warnings = logs.warnings();
    for name in ["no-args", "gated", "rejecting", "ghost"] {
        let needle = format!("`{name}`");
        assert!(
            warnings.iter().any(|line| line.contains(&needle)),
            "no warning names {name}: {warnings:#?}"
        );
    }
    assert!(!warnings.iter().any(|line| line.contains("`time`")), "{warnings:#?}");
}
