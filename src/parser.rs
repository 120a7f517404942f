use crate::error::SyntaxError;
use crate::tokenize::{self, is_whitespace};
use crate::types::*;

type ParseResult<T> = Result<T, SyntaxError>;

pub const PIPE: u8 = b'|';

fn trim(line: &[u8]) -> &[u8] {
	let start = line.iter().position(|&c| !is_whitespace(c)).unwrap_or(line.len());
	let end = line.iter().rposition(|&c| !is_whitespace(c)).map_or(start, |i| i + 1);
	&line[start .. end]
}

fn parse_stage(chunk: &[u8]) -> ParseResult<Stage> {
	let n = tokenize::count(chunk);
	if n == 0 {
		return Err(SyntaxError::EmptyStage);
	}
	let mut args: Vec<&[u8]> = Vec::with_capacity(n);
	args.extend(tokenize::tokenize(chunk, n));
	Ok(Stage::new(args))
}

/// Splits a line on `|` and tokenizes every stage. Nothing is opened or spawned here;
/// redirection tokens stay in the argument lists for the resolver.
pub fn parse(line: &[u8]) -> ParseResult<Pipeline> {
	let trimmed = trim(line);
	if trimmed.is_empty() {
		return Err(SyntaxError::EmptyCommand);
	}
	if trimmed.first() == Some(&PIPE) {
		return Err(SyntaxError::LeadingPipe);
	}
	if trimmed.last() == Some(&PIPE) {
		return Err(SyntaxError::TrailingPipe);
	}

	let pipes = trimmed.iter().filter(|&&c| c == PIPE).count();
	let mut stages: Vec<Stage> = Vec::with_capacity(pipes + 1);
	for chunk in trimmed.split(|&c| c == PIPE) {
		stages.push(parse_stage(chunk)?);
	}
	Ok(Pipeline { stages: stages })
}
