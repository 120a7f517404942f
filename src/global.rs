use std::sync::Arc;

use crate::job;
use crate::search;

pub struct State {
	pub search_cache: search::SearchCache,
	pub jobs: job::Jobs,
}

impl State {
	pub fn new() -> State {
		State::with_foreground(Arc::new(job::ForegroundSlot::new()))
	}

	/// A state whose foreground slot is shared with someone else, normally the signal forwarder.
	pub fn with_foreground(slot: Arc<job::ForegroundSlot>) -> State {
		let search_cache = search::SearchCache::new();
		let jobs = job::Jobs::new(slot);
		State { search_cache: search_cache, jobs: jobs }
	}

	/// Non-blocking reap of finished background children; run before reading each line.
	pub fn reap_backgrounds(&mut self) -> Vec<job::Completion> {
		self.jobs.reap()
	}

	pub fn foreground(&self) -> Option<nix::unistd::Pid> {
		self.jobs.foreground().get()
	}

	pub fn clear_foreground(&self) {
		self.jobs.foreground().clear()
	}
}

impl Default for State {
	fn default() -> State {
		State::new()
	}
}
