use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn lctx_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lctx");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("alphabet.txt"), "abcdefghijklmnopqrstuvwxyz").unwrap();
    fs::write(files_dir.join("long.txt"), "x".repeat(2500)).unwrap();
    fs::write(files_dir.join("blank.txt"), "   \n\n  ").unwrap();

    let config_content = r#"[server]
bind = "127.0.0.1:7341"

[chunking]
chunk_size = 1000
overlap = 200
batch_size = 100

[retrieval]
top_k = 5

[index]
provider = "memory"
namespace = "drive-docs"

[[content.projects]]
title = "LaunchThatSong"
description = "Crowdfunding platform where fans vote songs onto the launch stage"
category = "web"
budget = "$40k"
period = "2023-2024"
technologies = ["Next.js", "Supabase", "Stripe"]

[[content.projects]]
title = "Studio Scheduler"
description = "Booking tool for recording studios"
category = "saas"
technologies = ["Rust", "Postgres"]
"#;

    let config_path = config_dir.join("lctx.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_lctx(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lctx_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_SERVICE_ROLE_KEY")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lctx binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_context_lists_every_section() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lctx(&config_path, &["context"]);
    assert!(success, "context failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("=== PROJECTS ==="));
    assert!(stdout.contains("Project: LaunchThatSong | Category: web"));
    assert!(stdout.contains("=== SONGS ==="));
    assert!(stdout.contains("=== TOPICS ==="));

    // Projects come first regardless of which sources are reachable.
    let projects = stdout.find("=== PROJECTS ===").unwrap();
    let songs = stdout.find("=== SONGS ===").unwrap();
    assert!(projects < songs);
}

#[test]
fn test_context_filters_by_query() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lctx(&config_path, &["context", "--query", "rust"]);
    assert!(success, "context failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Studio Scheduler"));
    assert!(!stdout.contains("Project: LaunchThatSong"));
    // Headers survive filtering.
    assert!(stdout.contains("=== PERSONAL CONTENT ==="));
}

#[test]
fn test_chunk_alphabet() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/alphabet.txt");

    let (stdout, stderr, success) = run_lctx(
        &config_path,
        &[
            "chunk",
            file.to_str().unwrap(),
            "--chunk-size",
            "10",
            "--overlap",
            "3",
        ],
    );
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("alphabet_chunk_0  chars: 10"));
    assert!(stdout.contains("alphabet_chunk_3  chars: 5"));
    assert!(!stdout.contains("alphabet_chunk_4"));
    assert!(stdout.contains("4 chunks (chunk_size: 10, overlap: 3)"));
}

#[test]
fn test_chunk_uses_config_defaults() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/long.txt");

    let (stdout, stderr, success) = run_lctx(&config_path, &["chunk", file.to_str().unwrap()]);
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("long_chunk_0  chars: 1000"));
    assert!(stdout.contains("long_chunk_3  chars: 100"));
    assert!(stdout.contains("4 chunks (chunk_size: 1000, overlap: 200)"));
}

#[test]
fn test_chunk_blank_file_has_no_chunks() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/blank.txt");

    let (stdout, _, success) = run_lctx(&config_path, &["chunk", file.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("No chunks."));
}

#[test]
fn test_chunk_rejects_overlap_not_below_size() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/alphabet.txt");

    let (_, stderr, success) = run_lctx(
        &config_path,
        &[
            "chunk",
            file.to_str().unwrap(),
            "--chunk-size",
            "10",
            "--overlap",
            "10",
        ],
    );
    assert!(!success);
    assert!(stderr.contains("overlap"));
}

#[test]
fn test_query_requires_embeddings() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_lctx(&config_path, &["query", "founder"]);
    assert!(!success);
    assert!(stderr.contains("requires embeddings"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("lctx.toml");
    fs::write(
        &config_path,
        "[server]\nbind = \"127.0.0.1:7342\"\n\n[chunking]\nchunk_size = 100\noverlap = 150\n",
    )
    .unwrap();

    let (_, stderr, success) = run_lctx(&config_path, &["context"]);
    assert!(!success);
    assert!(stderr.contains("chunking"));
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lctx(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("lctx"));
}
