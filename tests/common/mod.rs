// Shared test helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Writes an executable shell script named `name` into `dir`.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

/// A fake `esrally` that appends every invocation to `calls.log` in `dir`.
/// `install`, `start` and `stop` run the given shell snippets.
pub struct FakeRally {
    pub binary: PathBuf,
    pub log: PathBuf,
}

impl FakeRally {
    pub fn new(dir: &Path, install: &str, start: &str, stop: &str) -> Self {
        let log = dir.join("calls.log");
        let body = format!(
            r#"echo "$@" >> "{log}"
case "$1" in
  install) {install} ;;
  start) {start} ;;
  stop) {stop} ;;
esac"#,
            log = log.display()
        );
        let binary = write_script(dir, "esrally", &body);
        Self { binary, log }
    }

    /// A fake that installs, starts and stops successfully.
    pub fn healthy(dir: &Path) -> Self {
        Self::new(dir, r#"echo '{"installation-id": "inst-42"}'"#, "true", "true")
    }

    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// First word of every recorded invocation.
    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .filter_map(|call| call.split_whitespace().next().map(str::to_string))
            .collect()
    }
}

/// A recorded HTTP request: request line and body.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// Serves HTTP on an ephemeral local port. Each request is answered by
/// `route(method, path)` returning `(status, body)`.
pub async fn serve_http<F>(route: F) -> (u16, Arc<Mutex<Vec<Recorded>>>)
where
    F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let recorded = Arc::new(Mutex::new(Vec::new()));
    let route = Arc::new(route);
    let log = recorded.clone();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let route = route.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut reader = BufReader::new(read);

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                    return;
                }
                let mut parts = request_line.split_whitespace();
                let method = parts.next().unwrap_or_default().to_string();
                let path = parts.next().unwrap_or_default().to_string();

                let mut content_length = 0usize;
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).await.unwrap_or(0) == 0 {
                        break;
                    }
                    let header = header.trim_end();
                    if header.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = header.split_once(':') {
                        if name.eq_ignore_ascii_case("content-length") {
                            content_length = value.trim().parse().unwrap_or(0);
                        }
                    }
                }
                let mut body = vec![0u8; content_length];
                let _ = reader.read_exact(&mut body).await;

                let (status, response) = route(&method, &path);
                log.lock().unwrap().push(Recorded {
                    method,
                    path,
                    body: String::from_utf8_lossy(&body).into_owned(),
                });

                let reply = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{response}",
                    response.len()
                );
                let _ = write.write_all(reply.as_bytes()).await;
                let _ = write.shutdown().await;
            });
        }
    });

    (port, recorded)
}

/// An `esrally list tracks` table: 12 banner/header lines, one row per
/// `(name, challenges)`, then the 5 footer lines.
pub fn track_table(rows: &[(&str, &str)]) -> String {
    let mut lines = vec![
        "",
        "    ____        ____",
        "   / __ \\____ _/ / /_  __",
        "  / /_/ / __ `/ / / / / /",
        " / _, _/ /_/ / / / /_/ /",
        "/_/ |_|\\__,_/_/_/\\__, /",
        "                /____/",
        "",
        "Available tracks:",
        "",
        "Name                 Challenges",
        "-------------------  ----------------",
    ]
    .into_iter()
    .map(str::to_string)
    .collect::<Vec<_>>();
    lines.extend(rows.iter().map(|(name, challenges)| format!("{name:<20} {challenges}")));
    lines.extend(
        [
            "",
            "-------------------------------",
            "[INFO] SUCCESS (took 2 seconds)",
            "-------------------------------",
            "",
        ]
        .into_iter()
        .map(str::to_string),
    );
    lines.join("\n")
}

fn git(repo: &Path, args: &[&str]) -> String {
    let output = std::process::Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["-c", "user.name=race-matrix", "-c", "user.email=race-matrix@localhost", "-c", "commit.gpgsign=false"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
    String::from_utf8(output.stdout).unwrap()
}

/// Creates a repository at `repo` with one commit on `main` and one more on
/// `feature`, leaving `main` checked out. Returns the `main` commit hash.
pub fn init_git_repo(repo: &Path) -> String {
    fs::create_dir_all(repo).unwrap();
    git(repo, &["init", "-q"]);
    git(repo, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    fs::write(repo.join("README"), "packages\n").unwrap();
    git(repo, &["add", "README"]);
    git(repo, &["commit", "-q", "-m", "initial"]);
    git(repo, &["checkout", "-q", "-b", "feature"]);
    fs::write(repo.join("feature.txt"), "feature\n").unwrap();
    git(repo, &["add", "feature.txt"]);
    git(repo, &["commit", "-q", "-m", "feature"]);
    git(repo, &["checkout", "-q", "main"]);
    git(repo, &["rev-parse", "HEAD"]).trim().to_string()
}

/// Name of the branch `HEAD` points to.
pub fn current_branch(repo: &Path) -> String {
    git(repo, &["rev-parse", "--abbrev-ref", "HEAD"]).trim().to_string()
}
