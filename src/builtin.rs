use std::env;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::global;

pub type Builtin = fn(&mut global::State, &[&[u8]]) -> u8;

const CURRENT_DIR: &[&[u8]] = &[b"."];

const HELP: &str = "\
psh: run programs, optionally connected by pipes

  prog [args...] [< infile] [> outfile] [&]
  prog1 [args...] [< infile] | prog2 ... | progN [> outfile] [&]

  '<' is only allowed on the first stage and '>' only on the last one when
  there is more than one stage. A trailing '&' runs that stage in the background.

built-ins (not usable inside a pipeline or with redirection):
  about           print the shell's name and version
  cd [dir]        change directory (default $HOME)
  clr             clear the screen
  dir [path...]   list directory contents (default .)
  environ         print the environment
  help            this text
  rehash          forget cached program locations
  exit            leave the shell
";

pub fn builtin_about(_: &mut global::State, _: &[&[u8]]) -> u8 {
	println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
	0
}

pub fn builtin_cd(_: &mut global::State, args: &[&[u8]]) -> u8 {
	let target = match args.first() {
		Some(&dir) => PathBuf::from(OsStr::from_bytes(dir)),
		None => match env::var_os("HOME") {
			Some(home) => PathBuf::from(home),
			None => {
				eprintln!("cd: HOME not set");
				return 1;
			},
		},
	};
	match env::set_current_dir(&target) {
		Ok(()) => 0,
		Err(e) => {
			eprintln!("cd: {}: {}", target.display(), e);
			1
		},
	}
}

pub fn builtin_clr(_: &mut global::State, _: &[&[u8]]) -> u8 {
	let mut stdout = io::stdout();
	let _ = stdout.write_all(b"\x1b[2J\x1b[H");
	let _ = stdout.flush();
	0
}

fn list_dir(path: &Path, out: &mut dyn Write) -> io::Result<()> {
	let mut names: Vec<_> = fs::read_dir(path)?
		.filter_map(|e| e.ok())
		.map(|e| e.file_name())
		.collect();
	names.sort();
	for name in names {
		out.write_all(name.as_bytes())?;
		out.write_all(b"\n")?;
	}
	Ok(())
}

pub fn builtin_dir(_: &mut global::State, args: &[&[u8]]) -> u8 {
	let paths = if args.is_empty() { CURRENT_DIR } else { args };
	let stdout = io::stdout();
	let mut out = stdout.lock();
	let mut status = 0;
	for &path in paths {
		let path = Path::new(OsStr::from_bytes(path));
		if paths.len() > 1 {
			let _ = writeln!(out, "{}:", path.display());
		}
		if let Err(e) = list_dir(path, &mut out) {
			eprintln!("dir: {}: {}", path.display(), e);
			status = 1;
		}
	}
	status
}

pub fn builtin_environ(_: &mut global::State, _: &[&[u8]]) -> u8 {
	let stdout = io::stdout();
	let mut out = stdout.lock();
	for (k, v) in env::vars_os() {
		let _ = writeln!(out, "{}={}", k.to_string_lossy(), v.to_string_lossy());
	}
	0
}

pub fn builtin_help(_: &mut global::State, _: &[&[u8]]) -> u8 {
	print!("{}", HELP);
	0
}

pub fn builtin_rehash(state: &mut global::State, _: &[&[u8]]) -> u8 {
	state.search_cache.rehash();
	0
}

pub fn match_builtin(name: &[u8]) -> Option<Builtin> {
	match name {
		b"about" => Some(builtin_about),
		b"cd" => Some(builtin_cd),
		b"clr" => Some(builtin_clr),
		b"dir" => Some(builtin_dir),
		b"environ" => Some(builtin_environ),
		b"help" => Some(builtin_help),
		b"rehash" => Some(builtin_rehash),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn matches_known_names_only() {
		for name in ["about", "cd", "clr", "dir", "environ", "help", "rehash"] {
			assert!(match_builtin(name.as_bytes()).is_some(), "{}", name);
		}
		assert!(match_builtin(b"ls").is_none());
		assert!(match_builtin(b"exit").is_none());
	}

	#[test]
	fn dir_lists_sorted_names() {
		let d = tempfile::tempdir().unwrap();
		fs::write(d.path().join("b"), b"").unwrap();
		fs::write(d.path().join("a"), b"").unwrap();
		let mut out: Vec<u8> = vec![];
		list_dir(d.path(), &mut out).unwrap();
		assert_eq!(out, b"a\nb\n");
	}

	#[test]
	fn dir_on_missing_path_fails() {
		let mut state = global::State::new();
		assert_eq!(builtin_dir(&mut state, &[&b"/nonexistent/psh-dir"[..]]), 1);
	}

	#[test]
	fn cd_to_missing_directory_fails() {
		let mut state = global::State::new();
		assert_eq!(builtin_cd(&mut state, &[&b"/nonexistent/psh-dir"[..]]), 1);
	}

	#[test]
	fn rehash_empties_the_cache() {
		let mut state = global::State::new();
		assert!(state.search_cache.lookup(b"sh").is_some());
		assert_eq!(builtin_rehash(&mut state, &[]), 0);
		assert!(state.search_cache.is_empty());
	}
}
