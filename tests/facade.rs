//! Smoke tests for the facade crate: both entry shapes, driven through
//! the prelude.

use std::cell::RefCell;
use std::rc::Rc;

use stochelo::prelude::*;
use stochelo::scheduler::run_until_idle;

#[test]
fn counter_through_the_prelude() {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = seen.clone();
	let runner = start(
		|| {
			let (count, set_count) = use_state(0);
			if *count < 3 {
				set_count.update(|count| count + 1);
			}
			Some(*count)
		},
		move |value| sink.borrow_mut().push(value),
	);
	run_until_idle();
	runner.stop();
	assert_eq!(*seen.borrow(), vec![0, 1, 2, 3]);
	assert!(matches!(runner.completion().peek(), Some(Ok(()))));
}

#[test]
fn subject_through_the_prelude() {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let subject = Subject::new(|| {
		let (label, set_label) = use_state("ready");
		let decorated = use_memo((*label,), || format!("<{}>", *label));
		use_effect_with((*label,), move || {
			if *label == "ready" {
				set_label.set("steady");
			}
		});
		(*decorated).clone()
	});
	let sink = seen.clone();
	let _sub = subject.subscribe(move |value: &String| sink.borrow_mut().push(value.clone()));
	run_until_idle();
	subject.complete();
	assert_eq!(*seen.borrow(), vec!["<ready>", "<steady>"]);
	assert!(matches!(subject.completion().peek(), Some(Ok(()))));
}
