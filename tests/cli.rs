//! Integration tests for the `emotiv-servos` binary.
//!
//! These run the shell over piped stdin, without a live EmoEngine.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

/// Build a [`Command`] for the binary with env isolation.
fn shell_cmd() -> Command {
    let mut cmd = Command::cargo_bin("emotiv-servos").unwrap();
    cmd.env_remove("EMOTIV_SERVOS_CONFIG")
        .env_remove("EMOTIV_SERVOS_CONNECT_TIMEOUT_MS")
        .env_remove("EMOTIV_SERVOS_POLL_WINDOW_MS")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_flag_describes_the_shell() {
    shell_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("prosthetic").and(predicate::str::contains("--config")));
}

#[test]
fn help_then_exit() {
    shell_cmd()
        .write_stdin("help\nexit\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("EmotivServos01> ")
                .and(predicate::str::contains("desconectar"))
                .and(predicate::str::contains("See you!")),
        );
}

#[test]
fn closed_stdin_exits_cleanly() {
    shell_cmd()
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Disconnecting from the Emo Engine"));
}

#[test]
fn read_without_session_reports_engine_codes() {
    shell_cmd()
        .arg("--poll-window-ms")
        .arg("10")
        .write_stdin("ler\nexit\n")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("1280 1280 1280 1280 1280 1280 1280 1280 1280 1280\n")
                .and(predicate::str::contains("770 770 770 770 770 770 770 770 770 770\n")),
        );
}

#[test]
fn unknown_command_is_reported() {
    shell_cmd()
        .write_stdin("abrir\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid command"));
}

#[test]
fn non_utf8_input_does_not_end_the_session() {
    shell_cmd()
        .write_stdin(&b"a\xe7\xe3o\nhelp\nexit\n"[..])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Invalid command")
                .and(predicate::str::contains("COMMANDS"))
                .and(predicate::str::contains("See you!")),
        );
}

#[test]
fn malformed_settings_file_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "poll_window_ms = \"later\"").unwrap();

    shell_cmd()
        .arg("--config")
        .arg(file.path())
        .write_stdin("exit\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not load settings"));
}
