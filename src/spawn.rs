//! fork + exec of a single stage.
//!
//! Everything the child needs (program path, argv) is prepared by the caller
//! before the fork. After the fork the child only remaps descriptors, marks
//! the rest close-on-exec and replaces its image; it never returns.

use std::ffi::{CStr, CString};
use std::os::fd::RawFd;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::sys::resource::{getrlimit, Resource};
use nix::unistd::{self, ForkResult, Pid};

use crate::error::{Error, Result};

/// Child exit status when descriptor setup or exec fails.
pub const EXIT_CANNOT_EXEC: i32 = 126;
/// Child exit status when the program disappeared between lookup and exec.
pub const EXIT_NOT_FOUND: i32 = 127;

const FIRST_SWEPT: RawFd = libc::STDERR_FILENO + 1;

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
const CLOSE_RANGE_CLOEXEC: libc::c_uint = 1 << 2;

/// The descriptors that become a child's 0, 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdFds {
	pub input: RawFd,
	pub output: RawFd,
	pub error: RawFd,
}

impl Default for StdFds {
	fn default() -> StdFds {
		StdFds {
			input: libc::STDIN_FILENO,
			output: libc::STDOUT_FILENO,
			error: libc::STDERR_FILENO,
		}
	}
}

/// Forks and execs `program` with `argv` (argv[0] included). Returns the child's
/// pid without waiting. Only a failing fork is reported here; exec failures end
/// the child with `EXIT_NOT_FOUND` or `EXIT_CANNOT_EXEC`.
pub fn spawn(program: &CStr, argv: &[CString], fds: StdFds) -> Result<Pid> {
	match unsafe { unistd::fork() } {
		Ok(ForkResult::Parent { child }) => Ok(child),
		Ok(ForkResult::Child) => exec_child(program, argv, fds),
		Err(e) => Err(Error::Launch(e)),
	}
}

fn remap(mut fds: StdFds) -> nix::Result<()> {
	// move anything that would be clobbered by an earlier dup2 out of the way first
	while fds.output == libc::STDIN_FILENO {
		fds.output = unistd::dup(fds.output)?;
	}
	while fds.error == libc::STDIN_FILENO || fds.error == libc::STDOUT_FILENO {
		fds.error = unistd::dup(fds.error)?;
	}
	unistd::dup2(fds.input, libc::STDIN_FILENO)?;
	unistd::dup2(fds.output, libc::STDOUT_FILENO)?;
	unistd::dup2(fds.error, libc::STDERR_FILENO)?;
	Ok(())
}

#[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
fn close_range_cloexec() -> bool {
	let r = unsafe {
		libc::syscall(libc::SYS_close_range, FIRST_SWEPT as libc::c_uint, libc::c_uint::MAX, CLOSE_RANGE_CLOEXEC)
	};
	r == 0
}

#[cfg(not(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64"))))]
fn close_range_cloexec() -> bool {
	false
}

/// Marks every open descriptor above stderr close-on-exec. Returns how many
/// descriptors could not be marked.
fn mark_cloexec_above_stderr() -> nix::Result<usize> {
	if close_range_cloexec() {
		return Ok(0);
	}
	let (soft, _) = getrlimit(Resource::RLIMIT_NOFILE)?;
	let limit = RawFd::try_from(soft).unwrap_or(RawFd::MAX);
	let mut failed = 0;
	for fd in FIRST_SWEPT .. limit {
		let flags = match fcntl(fd, FcntlArg::F_GETFD) {
			Ok(bits) => FdFlag::from_bits_truncate(bits),
			Err(_) => { continue; },
		};
		if !flags.contains(FdFlag::FD_CLOEXEC) {
			if fcntl(fd, FcntlArg::F_SETFD(flags | FdFlag::FD_CLOEXEC)).is_err() {
				failed += 1;
			}
		}
	}
	Ok(failed)
}

/// Writes straight to descriptor 2: the stderr handle's lock may have been
/// held by another thread at fork time.
fn report(name: &CStr, what: &str, errno: Errno) {
	let msg = format!("{}: {}: {}\n", name.to_string_lossy(), what, errno.desc());
	unsafe {
		libc::write(libc::STDERR_FILENO, msg.as_ptr() as *const libc::c_void, msg.len());
	}
}

fn exec_child(program: &CStr, argv: &[CString], fds: StdFds) -> ! {
	let name = argv.first().map_or(program, |a| a.as_c_str());

	if let Err(e) = remap(fds) {
		report(name, "cannot set up descriptors", e);
		unsafe { libc::_exit(EXIT_CANNOT_EXEC) }
	}
	match mark_cloexec_above_stderr() {
		Ok(0) => {},
		Ok(_) => report(name, "cannot mark descriptors close-on-exec", Errno::last()),
		Err(e) => {
			report(name, "getrlimit", e);
			unsafe { libc::_exit(EXIT_CANNOT_EXEC) }
		},
	}

	let e = match unistd::execv(program, argv) {
		Ok(never) => match never {},
		Err(e) => e,
	};
	if e == Errno::ENOENT {
		report(name, "command not found", e);
		unsafe { libc::_exit(EXIT_NOT_FOUND) }
	}
	report(name, "cannot execute", e);
	unsafe { libc::_exit(EXIT_CANNOT_EXEC) }
}
