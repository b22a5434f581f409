use std::process::Command;

const GOLDEN: &str = "Promise!\nPromise!\nLast line!\n";

fn run_binary() -> (String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_async-two-ways"))
        .env_remove("RUST_LOG")
        .output()
        .expect("binary runs");
    (
        String::from_utf8(output.stdout).expect("stdout is utf-8"),
        output.status.success(),
    )
}

#[test]
fn prints_golden_output() {
    let (stdout, success) = run_binary();
    assert!(success);
    assert_eq!(stdout, GOLDEN);
}

#[test]
fn output_is_stable_across_runs() {
    for _ in 0..5 {
        assert_eq!(run_binary(), (GOLDEN.to_owned(), true));
    }
}

#[test]
fn verbose_logging_stays_off_stdout() {
    let output = Command::new(env!("CARGO_BIN_EXE_async-two-ways"))
        .env("RUST_LOG", "trace")
        .output()
        .expect("binary runs");
    assert_eq!(String::from_utf8_lossy(&output.stdout), GOLDEN);
    assert!(!output.stderr.is_empty());
}
