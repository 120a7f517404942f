use std::ffi::CString;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::unistd::Pid;
use tracing::{debug, debug_span};

use crate::builtin;
use crate::error::{Result, SyntaxError};
use crate::global;
use crate::job::Completion;
use crate::parser;
use crate::pipe::PipeWiring;
use crate::redirect;
use crate::spawn::{self, StdFds};
use crate::types::*;

pub const BACKGROUND_MARKER: &[u8] = b"&";

/// A stage with everything resolved: the only thing left that can fail is the OS.
struct Prepared {
	program: CString,
	argv: Vec<CString>,
	input: Option<OwnedFd>,
	output: Option<OwnedFd>,
	background: bool,
}

/// What one pipeline dispatch did.
#[derive(Debug, Default)]
pub struct Dispatched {
	/// Every spawned pid, in pipeline order.
	pub processes: Vec<Pid>,
	pub background: Vec<Pid>,
	pub pipes_created: usize,
	/// One entry per foreground stage, in pipeline order.
	pub completions: Vec<Completion>,
}

impl Dispatched {
	/// Status of the last waited stage; 0 when nothing was waited on.
	pub fn status(&self) -> i32 {
		self.completions.last().map_or(0, |c| c.exit.code())
	}
}

pub enum EvalResult {
	Builtin(u8),
	Pipeline(Dispatched),
}

impl EvalResult {
	pub fn status(&self) -> i32 {
		match *self {
			EvalResult::Builtin(s) => s as i32,
			EvalResult::Pipeline(ref d) => d.status(),
		}
	}
}

fn strip_background(stage: &mut Stage) {
	if stage.args.last() == Some(&BACKGROUND_MARKER) {
		stage.args.pop();
		stage.background = true;
	}
}

fn prepare(state: &mut global::State, mut stage: Stage, index: usize, stages: usize) -> Result<Prepared> {
	redirect::resolve(&mut stage, index, stages)?;
	strip_background(&mut stage);
	let name = match stage.program() {
		Some(name) => name,
		None => { return Err(SyntaxError::EmptyCommand.into()); },
	};
	let program = match state.search_cache.lookup(name) {
		Some(p) => p,
		None => { return Err(SyntaxError::CommandNotFound(String::from_utf8_lossy(name).into_owned()).into()); },
	};
	let argv: std::result::Result<Vec<CString>, _> = stage.args.iter().map(|&a| CString::new(a)).collect();
	let argv = argv.map_err(|_| SyntaxError::NulByte)?;
	Ok(Prepared {
		program: program,
		argv: argv,
		input: stage.input,
		output: stage.output,
		background: stage.background,
	})
}

fn spawn_stages(state: &mut global::State, prepared: Vec<Prepared>, dispatched: &mut Dispatched,
                foreground: &mut Vec<Pid>) -> Result<()> {
	let mut wiring = PipeWiring::new(prepared.len());
	for (index, stage) in prepared.into_iter().enumerate() {
		let ends = wiring.connect(index)?;
		dispatched.pipes_created = wiring.created();
		// a redirection replaces (and closes) the pipe end it overrides
		let input = stage.input.or(ends.input);
		let output = stage.output.or(ends.output);
		let fds = StdFds {
			input: input.as_ref().map_or(libc::STDIN_FILENO, |fd| fd.as_raw_fd()),
			output: output.as_ref().map_or(libc::STDOUT_FILENO, |fd| fd.as_raw_fd()),
			..StdFds::default()
		};

		let pid = spawn::spawn(&stage.program, &stage.argv, fds)?;
		debug!(stage = index, %pid, argv = ?stage.argv, background = stage.background, "spawned");
		dispatched.processes.push(pid);
		if stage.background {
			state.jobs.detach(pid);
			dispatched.background.push(pid);
		} else {
			foreground.push(pid);
		}
		// the child has its copies now; `input` and `output` close ours on drop
	}
	debug_assert_eq!(wiring.live_endpoints(), 0);
	Ok(())
}

/// Runs an already parsed pipeline. Every stage is validated (redirections opened,
/// background marker stripped, program found) before the first fork, so syntax and
/// file errors never leave half a pipeline behind. Foreground stages are waited in
/// order once all of them are running.
pub fn dispatch_pipeline(state: &mut global::State, pipeline: Pipeline) -> Result<Dispatched> {
	let stages = pipeline.len();
	let _span = debug_span!("dispatch", stages).entered();

	let mut prepared = Vec::with_capacity(stages);
	for (index, stage) in pipeline.stages.into_iter().enumerate() {
		prepared.push(prepare(state, stage, index, stages)?);
	}

	let mut dispatched = Dispatched::default();
	let mut foreground: Vec<Pid> = Vec::with_capacity(stages);
	if let Err(e) = spawn_stages(state, prepared, &mut dispatched, &mut foreground) {
		// already running stages are left to finish on their own
		for &pid in &foreground {
			state.jobs.detach(pid);
		}
		return Err(e);
	}

	for (i, &pid) in foreground.iter().enumerate() {
		match state.jobs.wait(pid) {
			Ok(c) => dispatched.completions.push(c),
			Err(e) => {
				for &rest in &foreground[i + 1 ..] {
					state.jobs.detach(rest);
				}
				return Err(e);
			},
		}
	}
	Ok(dispatched)
}

/// Parses and runs one line as a pipeline. The line is raw bytes; it need not be UTF-8.
pub fn dispatch<L: AsRef<[u8]> + ?Sized>(state: &mut global::State, line: &L) -> Result<Dispatched> {
	let pipeline = parser::parse(line.as_ref())?;
	dispatch_pipeline(state, pipeline)
}

/// Like `dispatch`, but a lone command without redirections may be a built-in.
pub fn eval<L: AsRef<[u8]> + ?Sized>(state: &mut global::State, line: &L) -> Result<EvalResult> {
	let pipeline = parser::parse(line.as_ref())?;
	if pipeline.len() == 1 {
		let args = &pipeline.stages[0].args;
		let redirected = args.iter().any(|a| Direction::from_token(a).is_some());
		if !redirected {
			if let Some(func) = builtin::match_builtin(args[0]) {
				return Ok(EvalResult::Builtin(func(state, &args[1 ..])));
			}
		}
	}
	dispatch_pipeline(state, pipeline).map(EvalResult::Pipeline)
}
