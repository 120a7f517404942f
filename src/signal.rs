//! Forwarding of interrupt/suspend from the shell to its foreground child.

use std::sync::{Arc, OnceLock};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::job::ForegroundSlot;

pub const FORWARDED: [Signal; 2] = [Signal::SIGINT, Signal::SIGTSTP];

static TARGET: OnceLock<Arc<ForegroundSlot>> = OnceLock::new();

extern "C" fn forward(signo: libc::c_int) {
	// only atomics and kill(2) in here
	if let Some(slot) = TARGET.get() {
		if let Some(pid) = slot.take() {
			unsafe {
				libc::kill(pid.as_raw(), signo);
			}
		}
	}
}

/// Installs the forwarder for SIGINT and SIGTSTP. Handlers are installed without
/// SA_RESTART so that a blocked foreground wait returns EINTR. The first slot
/// passed in stays the target for the life of the process.
pub fn install(slot: Arc<ForegroundSlot>) -> nix::Result<()> {
	let _ = TARGET.set(slot);
	let action = SigAction::new(SigHandler::Handler(forward), SaFlags::empty(), SigSet::empty());
	for &sig in FORWARDED.iter() {
		unsafe { sigaction(sig, &action)?; }
	}
	Ok(())
}
