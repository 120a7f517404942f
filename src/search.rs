use std::collections::HashMap;
use std::env;
use std::ffi::{CString, OsStr};
use std::fs;
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::trace;

const PATH_KEY: &str = "PATH";

/// Resolves program names to executable paths, remembering PATH hits until `rehash`.
#[derive(Debug, Default)]
pub struct SearchCache {
	imp: HashMap<Vec<u8>, CString>,
}

fn is_executable(path: &Path) -> bool {
	match fs::metadata(path) {
		Ok(m) => m.is_file() && m.permissions().mode() & 0o111 != 0,
		Err(_) => false,
	}
}

fn to_cstring(path: PathBuf) -> Option<CString> {
	CString::new(path.into_os_string().into_vec()).ok()
}

fn find_in(name: &OsStr, paths: &OsStr) -> Option<PathBuf> {
	env::split_paths(paths)
		.map(|dir| dir.join(name))
		.find(|candidate| is_executable(candidate))
}

impl SearchCache {
	pub fn new() -> SearchCache {
		SearchCache { imp: HashMap::new() }
	}

	pub fn rehash(&mut self) {
		self.imp.clear();
	}

	/// Names containing a slash are taken as paths and only need to exist; exec
	/// reports anything else. Bare names are searched along `PATH`.
	pub fn lookup(&mut self, name: &[u8]) -> Option<CString> {
		if name.contains(&b'/') {
			return if Path::new(OsStr::from_bytes(name)).exists() { CString::new(name).ok() } else { None };
		}
		if let Some(hit) = self.imp.get(name) {
			return Some(hit.clone());
		}
		let paths = env::var_os(PATH_KEY)?;
		let found = to_cstring(find_in(OsStr::from_bytes(name), &paths)?)?;
		trace!(name = %String::from_utf8_lossy(name), path = ?found, "resolved");
		self.imp.insert(name.to_vec(), found.clone());
		Some(found)
	}

	pub fn len(&self) -> usize {
		self.imp.len()
	}

	pub fn is_empty(&self) -> bool {
		self.imp.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::ffi::OsString;

	fn touch(path: &Path, mode: u32) {
		fs::write(path, b"#!/bin/sh\n").unwrap();
		fs::set_permissions(path, fs::Permissions::from_mode(mode)).unwrap();
	}

	#[test]
	fn first_executable_along_the_path_wins() {
		let a = tempfile::tempdir().unwrap();
		let b = tempfile::tempdir().unwrap();
		touch(&a.path().join("tool"), 0o644);
		touch(&b.path().join("tool"), 0o755);
		touch(&b.path().join("other"), 0o755);
		let paths = env::join_paths([a.path(), b.path()]).unwrap();

		assert_eq!(find_in(OsStr::new("tool"), &paths), Some(b.path().join("tool")));
		assert_eq!(find_in(OsStr::new("missing"), &paths), None);
		assert_eq!(find_in(OsStr::new("tool"), &OsString::new()), None);
	}

	#[test]
	fn directories_are_not_programs() {
		let a = tempfile::tempdir().unwrap();
		fs::create_dir(a.path().join("sub")).unwrap();
		assert_eq!(find_in(OsStr::new("sub"), a.path().as_os_str()), None);
	}

	#[test]
	fn common_programs_resolve_and_are_cached() {
		let mut cache = SearchCache::new();
		let sh = cache.lookup(b"sh").unwrap();
		assert!(sh.to_str().unwrap().ends_with("/sh"));
		assert_eq!(cache.len(), 1);
		assert_eq!(cache.lookup(b"sh"), Some(sh));
		cache.rehash();
		assert!(cache.is_empty());
	}

	#[test]
	fn unknown_names_are_not_cached() {
		let mut cache = SearchCache::new();
		assert_eq!(cache.lookup(b"psh-no-such-program-anywhere"), None);
		assert!(cache.is_empty());
	}

	#[test]
	fn slash_names_bypass_the_search() {
		let mut cache = SearchCache::new();
		assert_eq!(cache.lookup(b"/bin/sh"), Some(CString::new("/bin/sh").unwrap()));
		assert_eq!(cache.lookup(b"/nonexistent/prog"), None);
		assert!(cache.is_empty());
	}
}
