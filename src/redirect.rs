use std::ffi::OsStr;
use std::fs;
use std::io;
use std::os::fd::OwnedFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;

use tracing::{debug, error};

use crate::error::{Error, Result, SyntaxError};
use crate::types::*;

/// Owner read/write, applied when `>` creates its target.
const CREATE_MODE: u32 = 0o600;

/// In a multi-stage pipeline only the first stage may read a file and only the last may write one.
pub fn check_placement(direction: Direction, stage: usize, stages: usize) -> std::result::Result<(), SyntaxError> {
	if stages <= 1 {
		return Ok(());
	}
	let legal = match direction {
		Direction::Input => stage == 0,
		Direction::Output => stage + 1 == stages,
	};
	if legal {
		Ok(())
	} else {
		Err(SyntaxError::MisplacedRedirect { direction: direction, stage: stage })
	}
}

fn open_target(direction: Direction, path: &[u8]) -> Result<OwnedFd> {
	let mut oopt = fs::OpenOptions::new();
	let _ = match direction {
		Direction::Input => oopt.read(true),
		Direction::Output => oopt.write(true).create(true).truncate(true).mode(CREATE_MODE),
	};
	match oopt.open(OsStr::from_bytes(path)) {
		Ok(file) => Ok(OwnedFd::from(file)),
		Err(ref e) if e.kind() == io::ErrorKind::NotFound => {
			Err(SyntaxError::FileNotFound(String::from_utf8_lossy(path).into_owned()).into())
		},
		Err(e) => {
			let path = String::from_utf8_lossy(path);
			error!(%path, %direction, "cannot open redirection target: {}", e);
			Err(Error::fatal("open", e))
		},
	}
}

/// Consumes every `<`/`>` pair in the stage's arguments, opening the named file
/// and installing it as the stage's input or output. A later redirection in the
/// same direction replaces (and closes) an earlier one.
pub fn resolve(stage: &mut Stage, index: usize, stages: usize) -> Result<()> {
	if !stage.args.iter().any(|a| Direction::from_token(a).is_some()) {
		return Ok(());
	}

	let mut kept: Vec<&[u8]> = Vec::with_capacity(stage.args.len());
	let mut i = 0;
	while i < stage.args.len() {
		let token = stage.args[i];
		let direction = match Direction::from_token(token) {
			Some(d) => d,
			None => {
				kept.push(token);
				i += 1;
				continue;
			},
		};
		let target = match stage.args.get(i + 1) {
			Some(&t) => t,
			None => { return Err(SyntaxError::MissingTarget(direction).into()); },
		};
		check_placement(direction, index, stages)?;

		let fd = open_target(direction, target)?;
		debug!(stage = index, %direction, file = %String::from_utf8_lossy(target), "redirected");
		match direction {
			Direction::Input => stage.input = Some(fd),
			Direction::Output => stage.output = Some(fd),
		}
		i += 2;
	}
	stage.args = kept;
	Ok(())
}
