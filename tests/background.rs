use std::thread::sleep;
use std::time::{Duration, Instant};

use psh::job::{Completion, Exit};
use psh::{dispatch, State};

fn reap_until_done(state: &mut State) -> Vec<Completion> {
	let deadline = Instant::now() + Duration::from_secs(10);
	loop {
		let done = state.reap_backgrounds();
		if !done.is_empty() || Instant::now() > deadline {
			return done;
		}
		sleep(Duration::from_millis(20));
	}
}

#[test]
fn background_stage_does_not_block_and_is_reaped_later() {
	let mut state = State::new();

	let started = Instant::now();
	let d = dispatch(&mut state, "sleep 0.5 &").unwrap();
	assert!(started.elapsed() < Duration::from_millis(400));
	assert_eq!(d.processes.len(), 1);
	assert_eq!(d.background, d.processes);
	assert!(d.completions.is_empty());
	assert_eq!(d.status(), 0);
	assert_eq!(state.jobs.background(), &d.processes[..]);

	// still running: the scan must come back empty, immediately
	let started = Instant::now();
	assert!(state.reap_backgrounds().is_empty());
	assert!(started.elapsed() < Duration::from_millis(100));

	// foreground work in between is unaffected
	assert_eq!(dispatch(&mut state, "true").unwrap().status(), 0);
	assert_eq!(state.jobs.background().len(), 1);

	let done = reap_until_done(&mut state);
	assert_eq!(done, vec![Completion { pid: d.processes[0], exit: Exit::Code(0) }]);
	assert!(state.jobs.background().is_empty());
	assert!(state.reap_backgrounds().is_empty());
}

#[test]
fn marker_only_detaches_the_stage_it_ends() {
	let mut state = State::new();
	let d = dispatch(&mut state, "echo hi | sleep 0.2 &").unwrap();
	assert_eq!(d.processes.len(), 2);
	assert_eq!(d.background, vec![d.processes[1]]);
	assert_eq!(d.completions.len(), 1);
	assert_eq!(d.completions[0].pid, d.processes[0]);

	let done = reap_until_done(&mut state);
	assert_eq!(done, vec![Completion { pid: d.processes[1], exit: Exit::Code(0) }]);
}
