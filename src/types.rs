use std::fmt;
use std::os::fd::OwnedFd;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Direction { Input, Output }

impl Direction {
	pub fn from_token(token: &[u8]) -> Option<Direction> {
		match token {
			b"<" => Some(Direction::Input),
			b">" => Some(Direction::Output),
			_ => None,
		}
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match *self {
			Direction::Input => f.write_str("<"),
			Direction::Output => f.write_str(">"),
		}
	}
}

/// One program invocation. `input`/`output` stay `None` until a redirection
/// overrides them; `None` means "whatever the pipe wiring or terminal provides".
#[derive(Debug)]
pub struct Stage<'a> {
	pub args: Vec<&'a [u8]>,
	pub input: Option<OwnedFd>,
	pub output: Option<OwnedFd>,
	pub background: bool,
}

impl<'a> Stage<'a> {
	pub fn new(args: Vec<&'a [u8]>) -> Stage<'a> {
		Stage { args: args, input: None, output: None, background: false }
	}

	pub fn program(&self) -> Option<&'a [u8]> {
		self.args.first().copied()
	}
}

#[derive(Debug)]
pub struct Pipeline<'a> {
	pub stages: Vec<Stage<'a>>,
}

impl<'a> Pipeline<'a> {
	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}
}
