//! Whitespace word splitting over a borrowed line.
//!
//! Words are handed out as slices of the caller's buffer; nothing is copied
//! and nothing is allocated. Bytes are never decoded, so arguments that are
//! not UTF-8 reach the program unchanged.

#[derive(Debug, Clone)]
pub struct Words<'a> {
	line: &'a [u8],
	i: usize,
	left: usize,
}

pub fn is_whitespace(c: u8) -> bool {
	match c {
		b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => true,
		_ => false,
	}
}

impl<'a> Words<'a> {
	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(&c) = self.line.get(self.i) {
			if !f(c) { break; }
			self.i += 1;
		}
	}
}

impl<'a> Iterator for Words<'a> {
	type Item = &'a [u8];

	fn next(&mut self) -> Option<&'a [u8]> {
		if self.left == 0 {
			return None;
		}
		self.proceed_while(is_whitespace);
		let orig = self.i;
		self.proceed_while(|c| !is_whitespace(c));
		if orig == self.i {
			return None;
		}
		self.left -= 1;
		Some(&self.line[orig .. self.i])
	}
}

/// Splits `line` on runs of whitespace, yielding at most `max` words.
pub fn tokenize(line: &[u8], max: usize) -> Words {
	Words { line: line, i: 0, left: max }
}

/// Number of words `tokenize` would yield with no limit.
pub fn count(line: &[u8]) -> usize {
	tokenize(line, usize::MAX).count()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn words(line: &[u8], max: usize) -> Vec<&[u8]> {
		tokenize(line, max).collect()
	}

	#[test]
	fn splits_on_whitespace_runs() {
		assert_eq!(words(b"  ls\t-l   /tmp \n", 16), vec![&b"ls"[..], &b"-l"[..], &b"/tmp"[..]]);
	}

	#[test]
	fn degenerate_input_yields_nothing() {
		assert!(words(b"", 16).is_empty());
		assert!(words(b" \t \n", 16).is_empty());
		assert_eq!(count(b"   "), 0);
	}

	#[test]
	fn stops_at_max() {
		assert_eq!(words(b"a b c d", 2), vec![&b"a"[..], &b"b"[..]]);
		assert!(words(b"a b", 0).is_empty());
	}

	#[test]
	fn keeps_multibyte_words_intact() {
		let line = "echo héllo wörld".as_bytes();
		assert_eq!(words(line, 8), vec![&b"echo"[..], "héllo".as_bytes(), "wörld".as_bytes()]);
		assert_eq!(count(line), 3);
	}

	#[test]
	fn invalid_utf8_passes_through_untouched() {
		assert_eq!(words(b"echo \xff\xfe x\x80y", 8), vec![&b"echo"[..], &b"\xff\xfe"[..], &b"x\x80y"[..]]);
	}
}
