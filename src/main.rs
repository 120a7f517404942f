use std::env;
use std::io::{self, BufRead, Write};
use std::os::unix::ffi::OsStringExt;
use std::process;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use nix::unistd;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use psh::config::{self, Config};
use psh::eval::{self, EvalResult};
use psh::job::{Exit, ForegroundSlot};
use psh::{signal, tokenize, State};

const EXIT: &[u8] = b"exit";
/// Status reported for lines that never ran (syntax, lookup, fork errors).
const EXIT_NOT_RUN: i32 = 2;

fn init_logging(config: &Config) {
	let filter = EnvFilter::try_new(&config.log_filter)
		.unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_target(false)
		.init();
}

fn prompt(config: &Config) -> String {
	let user = env::var("USER").unwrap_or_default();
	let host = unistd::gethostname()
		.ok()
		.and_then(|h| h.into_string().ok())
		.unwrap_or_else(|| config.hostname_fallback.clone());
	format!("[{} @ {}] ", user, host)
}

fn reap(state: &mut State) {
	for c in state.reap_backgrounds() {
		println!("Child {} exited with status {}", c.pid, c.exit.code());
	}
}

/// Runs one line and reports its outcome. Fatal errors end the shell here.
fn run_line(state: &mut State, line: &[u8]) -> i32 {
	match eval::eval(state, line) {
		Ok(EvalResult::Pipeline(d)) => {
			for c in &d.completions {
				match c.exit {
					Exit::Interrupted => println!("Exiting process {}", c.pid),
					Exit::Stopped(_) => println!("Stopped process {}", c.pid),
					_ => {},
				}
			}
			for pid in &d.background {
				println!("[{}]", pid);
			}
			d.status()
		},
		Ok(r) => r.status(),
		Err(e) => {
			eprintln!("psh: {}", e);
			if e.is_fatal() {
				process::exit(1);
			}
			EXIT_NOT_RUN
		},
	}
}

fn interactive(config: &Config, state: &mut State) -> Result<i32> {
	let prompt = prompt(config);
	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	let mut status = 0;
	loop {
		reap(state);
		let _ = stdout.write_all(prompt.as_bytes());
		let _ = stdout.flush();

		let mut line: Vec<u8> = vec![];
		let n = match stdin_locked.read_until(b'\n', &mut line) {
			Ok(n) => n,
			Err(ref e) if e.kind() == io::ErrorKind::Interrupted => { continue; },
			Err(e) => return Err(e).context("reading input"),
		};
		if n == 0 {
			break;
		}
		if line.len() > config.max_line {
			eprintln!("psh: line too long (limit {} bytes)", config.max_line);
			continue;
		}
		if line.last() == Some(&b'\n') {
			line.pop();
		}
		if tokenize::count(&line) == 0 {
			continue;
		}
		if tokenize::tokenize(&line, 2).eq([EXIT]) {
			break;
		}
		status = run_line(state, &line);
	}
	Ok(status)
}

fn main() -> Result<()> {
	let config = Config::from_env();
	init_logging(&config);

	let mut script: Option<Vec<u8>> = None;
	let mut args = env::args_os().skip(1);
	while let Some(a) = args.next() {
		if a == "-c" {
			script = Some(args.next().ok_or_else(|| anyhow!("missing line after -c"))?.into_vec());
		} else {
			return Err(anyhow!("unknown argument: {}", a.to_string_lossy()));
		}
	}

	let slot = Arc::new(ForegroundSlot::new());
	signal::install(slot.clone()).context("installing signal handlers")?;
	let mut state = State::with_foreground(slot);
	debug!(?config, "starting");

	let status = match script {
		Some(line) => {
			if line.len() > config.max_line {
				return Err(anyhow!("line too long (limit {} bytes)", config.max_line));
			}
			run_line(&mut state, &line)
		},
		None => interactive(&config, &mut state)?,
	};
	process::exit(status);
}
