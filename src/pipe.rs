//! Pipe wiring between adjacent stages.
//!
//! Only two pipe slots exist no matter how long the pipeline is. Stage `i` reads
//! from the pipe created for stage `i - 1` and writes into a fresh pipe placed in
//! the other slot. Every endpoint is handed out as an `OwnedFd`; the caller drops
//! it once the stage has been spawned, which is what closes the parent's copy.

use std::os::fd::OwnedFd;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd;
use tracing::trace;

use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Pipe {
	read: Option<OwnedFd>,
	write: Option<OwnedFd>,
}

impl Pipe {
	fn open() -> Result<Pipe> {
		let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC).map_err(|e| Error::fatal("pipe", e))?;
		Ok(Pipe { read: Some(read), write: Some(write) })
	}

	fn live(&self) -> usize {
		self.read.is_some() as usize + self.write.is_some() as usize
	}
}

/// The pipe endpoints a single stage inherits.
#[derive(Debug, Default)]
pub struct StageEnds {
	pub input: Option<OwnedFd>,
	pub output: Option<OwnedFd>,
}

#[derive(Debug)]
pub struct PipeWiring {
	slots: [Pipe; 2],
	upstream: usize,
	stages: usize,
	created: usize,
}

impl PipeWiring {
	pub fn new(stages: usize) -> PipeWiring {
		PipeWiring { slots: Default::default(), upstream: 0, stages: stages, created: 0 }
	}

	/// Endpoints for stage `index`. Stages must be connected in order.
	pub fn connect(&mut self, index: usize) -> Result<StageEnds> {
		if index >= self.stages {
			return Err(Error::fatal("pipe", Errno::EINVAL));
		}
		let input = if index == 0 {
			None
		} else {
			self.slots[self.upstream].read.take()
		};
		let output = if index + 1 == self.stages {
			None
		} else {
			let slot = if index == 0 { self.upstream } else { 1 - self.upstream };
			debug_assert_eq!(self.slots[slot].live(), 0);
			self.slots[slot] = Pipe::open()?;
			self.upstream = slot;
			self.created += 1;
			trace!(stage = index, slot, "pipe created");
			self.slots[slot].write.take()
		};
		Ok(StageEnds { input: input, output: output })
	}

	pub fn created(&self) -> usize {
		self.created
	}

	/// Pipe endpoints still held by the wiring itself (not yet handed to a stage).
	pub fn live_endpoints(&self) -> usize {
		self.slots.iter().map(Pipe::live).sum()
	}
}
