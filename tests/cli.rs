use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Write;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::process::{Command, Output, Stdio};

fn psh_c<S: AsRef<OsStr>>(line: S) -> Output {
	Command::new(env!("CARGO_BIN_EXE_psh"))
		.arg("-c")
		.arg(line)
		.stdin(Stdio::null())
		.output()
		.expect("run psh")
}

fn psh_stdin<B: AsRef<[u8]>>(input: B) -> Output {
	let mut child = Command::new(env!("CARGO_BIN_EXE_psh"))
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
		.expect("spawn psh");
	child.stdin.take().unwrap().write_all(input.as_ref()).unwrap();
	child.wait_with_output().unwrap()
}

#[test]
fn runs_a_pipeline_and_exits_with_its_status() {
	let out = psh_c("echo hello | tr a-z A-Z");
	assert!(out.status.success());
	assert_eq!(String::from_utf8_lossy(&out.stdout), "HELLO\n");

	assert_eq!(psh_c("false").status.code(), Some(1));
}

#[test]
fn syntax_errors_are_reported_not_fatal() {
	let out = psh_c("| ls");
	assert_eq!(out.status.code(), Some(2));
	assert!(String::from_utf8_lossy(&out.stderr).contains("syntax error"));

	let out = psh_c("psh-no-such-program");
	assert_eq!(out.status.code(), Some(2));
	assert!(String::from_utf8_lossy(&out.stderr).contains("psh-no-such-program: command not found"));
}

#[test]
fn reads_lines_until_exit() {
	let out = psh_stdin("echo one\n\n| bad\necho two | cat\nexit\necho never\n");
	assert!(out.status.success());
	let stdout = String::from_utf8_lossy(&out.stdout);
	assert!(stdout.contains("one\n"));
	assert!(stdout.contains("two\n"));
	assert!(!stdout.contains("never"));
	assert!(String::from_utf8_lossy(&out.stderr).contains("syntax error"));
}

#[test]
fn overlong_lines_are_discarded() {
	let long = format!("echo {}\necho short\n", "x".repeat(2000));
	let out = psh_stdin(&long);
	let stdout = String::from_utf8_lossy(&out.stdout);
	assert!(!stdout.contains("xxxx"));
	assert!(stdout.contains("short\n"));
	assert!(String::from_utf8_lossy(&out.stderr).contains("line too long"));
}

#[test]
fn background_completion_is_announced_at_the_next_prompt() {
	let out = psh_stdin("sleep 0.1 &\nsleep 0.4\ntrue\n");
	let stdout = String::from_utf8_lossy(&out.stdout);
	assert!(stdout.contains("exited with status 0"), "{}", stdout);
}

fn printf_non_utf8_line(out: &std::path::Path) -> Vec<u8> {
	let mut line = b"printf %s \xff\xfe > ".to_vec();
	line.extend_from_slice(out.as_os_str().as_bytes());
	line
}

#[test]
fn non_utf8_arguments_pass_through_from_the_command_line() {
	let dir = tempfile::tempdir().unwrap();
	let out = dir.path().join("out");
	let line = OsString::from_vec(printf_non_utf8_line(&out));
	let result = psh_c(&line);
	assert_eq!(result.status.code(), Some(0), "{}", String::from_utf8_lossy(&result.stderr));
	assert_eq!(fs::read(&out).unwrap(), b"\xff\xfe");
}

#[test]
fn non_utf8_arguments_pass_through_from_stdin() {
	let dir = tempfile::tempdir().unwrap();
	let out = dir.path().join("out");
	let mut input = printf_non_utf8_line(&out);
	input.extend_from_slice(b"\nexit\n");
	let result = psh_stdin(&input);
	assert!(result.status.success());
	assert_eq!(fs::read(&out).unwrap(), b"\xff\xfe");
}

#[test]
fn unopenable_redirection_target_ends_the_shell() {
	let dir = tempfile::tempdir().unwrap();
	let out = psh_c(format!("echo hi > {}", dir.path().display()));
	assert_eq!(out.status.code(), Some(1));
	assert!(String::from_utf8_lossy(&out.stderr).contains("open: "));

	let input = format!("echo hi > {}\necho after\n", dir.path().display());
	let out = psh_stdin(&input);
	assert_eq!(out.status.code(), Some(1));
	assert!(!String::from_utf8_lossy(&out.stdout).contains("after"));
}
