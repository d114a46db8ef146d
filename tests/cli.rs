//! CLI integration tests: run the `bookrag` binary against files and
//! configs in a temp directory.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn bookrag_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_bookrag"))
}

fn run_bookrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(bookrag_binary())
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run bookrag");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

/// Temp dir with a config chunking at `words` and a few books.
fn setup_test_env(words: usize) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("bookrag.toml");
    fs::write(&config_path, format!("[chunking]\nwords = {}\n", words)).unwrap();

    fs::write(
        dir.path().join("moby.txt"),
        "Call me Ishmael. The whale surfaced near the ship. \
         Ahab watched the whale from the deck of the Pequod.",
    )
    .unwrap();
    fs::write(
        dir.path().join("desert.md"),
        "# Sand\n\nThe camel crossed the desert. A distant ship of the desert, \
         the camel carried water across the dunes.",
    )
    .unwrap();

    (dir, config_path)
}

fn path_str(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

#[test]
fn test_chunk_reports_word_counts() {
    let (dir, config) = setup_test_env(500);
    let words: Vec<String> = (0..1200).map(|i| format!("w{}", i)).collect();
    fs::write(dir.path().join("long.txt"), words.join(" ")).unwrap();

    let (stdout, stderr, ok) = run_bookrag(&config, &["chunk", &path_str(&dir, "long.txt")]);
    assert!(ok, "chunk failed: {}", stderr);
    assert!(stdout.contains("long.txt: 3 chunks"), "got: {}", stdout);
    assert!(stdout.contains("chunk 0: 500 words"));
    assert!(stdout.contains("chunk 1: 500 words"));
    assert!(stdout.contains("chunk 2: 200 words"));
}

#[test]
fn test_ask_prints_answer_json() {
    let (dir, config) = setup_test_env(500);
    let (stdout, stderr, ok) = run_bookrag(
        &config,
        &[
            "ask",
            "where is the whale",
            "--file",
            &path_str(&dir, "moby.txt"),
            "--file",
            &path_str(&dir, "desert.md"),
        ],
    );
    assert!(ok, "ask failed: {}", stderr);

    let answer: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(answer["question"], "where is the whale");
    assert_eq!(answer["passages"].as_array().unwrap().len(), 2);
    assert_eq!(answer["passages"][0]["book"], "moby.txt");
    assert_eq!(answer["books_used"][0], "moby.txt");
    assert!(answer["answer"]
        .as_str()
        .unwrap()
        .starts_with("Based on 2 book(s)"));
}

#[test]
fn test_which_book_prints_report() {
    let (dir, config) = setup_test_env(5);
    let (stdout, stderr, ok) = run_bookrag(
        &config,
        &[
            "which-book",
            "camel",
            "--file",
            &path_str(&dir, "moby.txt"),
            "--file",
            &path_str(&dir, "desert.md"),
        ],
    );
    assert!(ok, "which-book failed: {}", stderr);

    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["topic"], "camel");
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["book"], "desert.md");
    assert_eq!(results[0]["mentions"], 2);
}

#[test]
fn test_ask_is_deterministic() {
    let (dir, config) = setup_test_env(8);
    let args = [
        "ask",
        "ship of the desert",
        "--file",
        &path_str(&dir, "moby.txt"),
        "--file",
        &path_str(&dir, "desert.md"),
    ];
    let (first, _, ok1) = run_bookrag(&config, &args);
    let (second, _, ok2) = run_bookrag(&config, &args);
    assert!(ok1 && ok2);
    assert_eq!(first, second);
}

#[test]
fn test_missing_config_uses_defaults() {
    let (dir, _) = setup_test_env(500);
    let absent = dir.path().join("nope.toml");
    let (stdout, stderr, ok) = run_bookrag(
        &absent,
        &["ask", "whale", "--file", &path_str(&dir, "moby.txt")],
    );
    assert!(ok, "ask failed: {}", stderr);
    assert!(stdout.contains("moby.txt"));
}

#[test]
fn test_invalid_config_fails() {
    let (dir, config) = setup_test_env(500);
    fs::write(&config, "[retrieval]\nstrategy = \"dense\"\n").unwrap();
    let (_, stderr, ok) = run_bookrag(
        &config,
        &["ask", "whale", "--file", &path_str(&dir, "moby.txt")],
    );
    assert!(!ok);
    assert!(stderr.contains("dense"), "got: {}", stderr);
}

#[test]
fn test_empty_question_fails() {
    let (dir, config) = setup_test_env(500);
    let (_, stderr, ok) = run_bookrag(
        &config,
        &["ask", "   ", "--file", &path_str(&dir, "moby.txt")],
    );
    assert!(!ok);
    assert!(stderr.contains("No question provided"), "got: {}", stderr);
}

#[test]
fn test_empty_book_fails() {
    let (dir, config) = setup_test_env(500);
    fs::write(dir.path().join("blank.txt"), "\n\n   \n").unwrap();
    let (_, stderr, ok) = run_bookrag(
        &config,
        &["ask", "whale", "--file", &path_str(&dir, "blank.txt")],
    );
    assert!(!ok);
    assert!(stderr.contains("No text found"), "got: {}", stderr);
}

#[test]
fn test_unsupported_file_fails() {
    let (dir, config) = setup_test_env(500);
    fs::write(dir.path().join("cover.png"), [0x89u8, b'P', b'N', b'G']).unwrap();
    let (_, stderr, ok) = run_bookrag(
        &config,
        &["ask", "whale", "--file", &path_str(&dir, "cover.png")],
    );
    assert!(!ok);
    assert!(stderr.contains("unsupported content-type"), "got: {}", stderr);
}
