use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const NO_FOREGROUND: i32 = -1;

/// The one child the shell is currently blocked on. Written by `Jobs::wait`,
/// read (and cleared) by the signal forwarder at any moment.
#[derive(Debug)]
pub struct ForegroundSlot(AtomicI32);

impl ForegroundSlot {
	pub const fn new() -> ForegroundSlot {
		ForegroundSlot(AtomicI32::new(NO_FOREGROUND))
	}

	pub fn set(&self, pid: Pid) {
		self.0.store(pid.as_raw(), Ordering::SeqCst);
	}

	pub fn get(&self) -> Option<Pid> {
		match self.0.load(Ordering::SeqCst) {
			NO_FOREGROUND => None,
			raw => Some(Pid::from_raw(raw)),
		}
	}

	pub fn clear(&self) {
		self.0.store(NO_FOREGROUND, Ordering::SeqCst);
	}

	/// Clears the slot, returning what was in it. Safe to call from a signal handler.
	pub fn take(&self) -> Option<Pid> {
		match self.0.swap(NO_FOREGROUND, Ordering::SeqCst) {
			NO_FOREGROUND => None,
			raw => Some(Pid::from_raw(raw)),
		}
	}
}

impl Default for ForegroundSlot {
	fn default() -> ForegroundSlot {
		ForegroundSlot::new()
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Exit {
	Code(i32),
	Signaled(Signal),
	Stopped(Signal),
	/// The wait itself was cut short by a signal aimed at the shell.
	Interrupted,
}

impl Exit {
	/// Shell-style numeric status: signals map to 128 + signo.
	pub fn code(self) -> i32 {
		match self {
			Exit::Code(c) => c,
			Exit::Signaled(s) | Exit::Stopped(s) => 128 + s as i32,
			Exit::Interrupted => 128 + Signal::SIGINT as i32,
		}
	}
}

trait WaitStatusExt {
	fn exit(self) -> Option<Exit>;
}

impl WaitStatusExt for WaitStatus {
	fn exit(self) -> Option<Exit> {
		match self {
			WaitStatus::Exited(_, code) => Some(Exit::Code(code)),
			WaitStatus::Signaled(_, sig, _) => Some(Exit::Signaled(sig)),
			WaitStatus::Stopped(_, sig) => Some(Exit::Stopped(sig)),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Completion {
	pub pid: Pid,
	pub exit: Exit,
}

/// Foreground waiting and background bookkeeping for one shell.
#[derive(Debug)]
pub struct Jobs {
	foreground: Arc<ForegroundSlot>,
	background: Vec<Pid>,
}

impl Jobs {
	pub fn new(foreground: Arc<ForegroundSlot>) -> Jobs {
		Jobs { foreground: foreground, background: vec![] }
	}

	pub fn foreground(&self) -> &Arc<ForegroundSlot> {
		&self.foreground
	}

	pub fn background(&self) -> &[Pid] {
		&self.background
	}

	/// Hands `pid` over to the non-blocking reaper.
	pub fn detach(&mut self, pid: Pid) {
		debug!(%pid, "tracking in background");
		self.background.push(pid);
	}

	/// Blocks until `pid` exits or stops. The child sits in the foreground slot for
	/// exactly the duration of the wait. A stopped or interrupted child is moved to
	/// background tracking so it is still reaped later.
	pub fn wait(&mut self, pid: Pid) -> Result<Completion> {
		self.foreground.set(pid);
		let r = loop {
			match waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
				Ok(status) => match status.exit() {
					Some(exit) => break Ok(exit),
					None => { continue; },
				},
				Err(e) => break Err(e),
			}
		};
		self.foreground.clear();

		match r {
			Ok(exit) => {
				debug!(%pid, ?exit, "foreground child done");
				if let Exit::Stopped(_) = exit {
					self.detach(pid);
				}
				Ok(Completion { pid: pid, exit: exit })
			},
			Err(Errno::EINTR) => {
				debug!(%pid, "wait interrupted");
				self.detach(pid);
				Ok(Completion { pid: pid, exit: Exit::Interrupted })
			},
			Err(e) => Err(Error::fatal("waitpid", e)),
		}
	}

	/// Polls every background child once without blocking and returns the ones that finished.
	/// Stopped children stay tracked until something outside the shell continues or kills them.
	pub fn reap(&mut self) -> Vec<Completion> {
		let mut done = vec![];
		self.background.retain(|&pid| {
			match waitpid(pid, Some(WaitPidFlag::WNOHANG)) {
				Ok(WaitStatus::StillAlive) => true,
				Ok(status) => match status.exit() {
					Some(Exit::Stopped(_)) | None => true,
					Some(exit) => {
						done.push(Completion { pid: pid, exit: exit });
						false
					},
				},
				Err(Errno::ECHILD) => {
					warn!(%pid, "background child vanished");
					false
				},
				Err(e) => {
					warn!(%pid, "waitpid: {}", e);
					true
				},
			}
		});
		for c in &done {
			debug!(pid = %c.pid, exit = ?c.exit, "reaped");
		}
		done
	}
}
