// tests/host_signals.rs

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use relaunch_test_utils::builders::ConfigTomlBuilder;

const DEADLINE: Duration = Duration::from_secs(10);

fn poll<T>(mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let start = Instant::now();
    while start.elapsed() < DEADLINE {
        if let Some(value) = check() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(20));
    }
    None
}

fn send_signal(signal: &str, pid: u32) -> bool {
    Command::new("kill")
        .arg(signal)
        .arg(pid.to_string())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn is_alive(pid: u32) -> bool {
    send_signal("-0", pid)
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn spawn_host(dir: &Path, config: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_relaunch"))
        .arg("--config")
        .arg(config)
        .current_dir(dir)
        .env_remove("RELAUNCH_LOG")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap()
}

#[test]
fn sigterm_stops_every_worker_before_the_host_exits() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("manifest.json"), "{}").unwrap();
    let pid_file = dir.path().join("worker.pid");

    let script = format!("echo $$ > '{}'; exec sleep 4242", pid_file.display());
    let config = dir.path().join("Relaunch.toml");
    fs::write(
        &config,
        ConfigTomlBuilder::new()
            .worker("sh", &["-c", script.as_str(), "sh"])
            .instance("web")
            .build(),
    )
    .unwrap();

    let mut host = spawn_host(dir.path(), &config);
    let worker = poll(|| read_pid(&pid_file));
    let Some(worker) = worker else {
        let _ = host.kill();
        panic!("worker never wrote its pid");
    };
    assert!(is_alive(worker));

    assert!(send_signal("-TERM", host.id()));

    let status = poll(|| host.try_wait().unwrap());
    let Some(status) = status else {
        let _ = host.kill();
        send_signal("-KILL", worker);
        panic!("host did not exit after SIGTERM");
    };
    assert!(status.success(), "host exited with {status}");

    let worker_gone = poll(|| (!is_alive(worker)).then_some(())).is_some();
    if !worker_gone {
        send_signal("-KILL", worker);
    }
    assert!(worker_gone, "worker {worker} outlived the host");
}
