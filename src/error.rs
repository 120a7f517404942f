use std::io;

use nix::errno::Errno;
use thiserror::Error;

use crate::types::Direction;

pub type Result<T> = std::result::Result<T, Error>;

/// Problems with the shape of a line. The pipeline is dropped and the shell keeps reading.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SyntaxError {
	#[error("pipe at start of line")]
	LeadingPipe,
	#[error("pipe at end of line")]
	TrailingPipe,
	#[error("empty pipeline stage")]
	EmptyStage,
	#[error("empty command")]
	EmptyCommand,
	#[error("missing file name after '{0}'")]
	MissingTarget(Direction),
	#[error("'{direction}' is not allowed on stage {stage}")]
	MisplacedRedirect { direction: Direction, stage: usize },
	#[error("{0}: no such file or directory")]
	FileNotFound(String),
	#[error("{0}: command not found")]
	CommandNotFound(String),
	#[error("nul byte in argument")]
	NulByte,
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("syntax error: {0}")]
	Syntax(#[from] SyntaxError),
	#[error("fork: {0}")]
	Launch(Errno),
	#[error("{op}: {source}")]
	Fatal {
		op: &'static str,
		#[source]
		source: io::Error,
	},
}

impl Error {
	pub fn fatal<E: Into<io::Error>>(op: &'static str, source: E) -> Error {
		Error::Fatal { op: op, source: source.into() }
	}

	/// Whether the shell itself has to terminate after reporting this.
	pub fn is_fatal(&self) -> bool {
		match *self {
			Error::Fatal { .. } => true,
			_ => false,
		}
	}

	pub fn syntax(&self) -> Option<&SyntaxError> {
		match *self {
			Error::Syntax(ref e) => Some(e),
			_ => None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_fatal_is_fatal() {
		assert!(Error::fatal("pipe", Errno::EMFILE).is_fatal());
		assert!(!Error::Launch(Errno::EAGAIN).is_fatal());
		assert!(!Error::from(SyntaxError::EmptyStage).is_fatal());
	}

	#[test]
	fn messages_name_the_operation() {
		let e = Error::fatal("waitpid", Errno::ECHILD);
		assert!(e.to_string().starts_with("waitpid: "));
		let e = Error::from(SyntaxError::CommandNotFound("nope".to_string()));
		assert_eq!(e.to_string(), "syntax error: nope: command not found");
		let e = Error::from(SyntaxError::MisplacedRedirect { direction: Direction::Input, stage: 1 });
		assert_eq!(e.to_string(), "syntax error: '<' is not allowed on stage 1");
	}
}
