//! The router's lifecycle signals, exposed as an explicit typed channel rather than
//! ambient document-level events.
//!
//! Ordering contract: [`RouterEvent::Start`] precedes any DOM mutation of an attempt, and
//! exactly one of [`RouterEvent::End`]/[`RouterEvent::Error`] follows, always after any
//! history update. [`RouterEvent::Navigate`] is emitted when a soft navigation completed,
//! immediately before its `End`.

use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

/// A zero-payload lifecycle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterEvent {
	/// A navigation attempt started loading.
	Start,
	/// A navigation attempt completed.
	End,
	/// A navigation attempt failed.
	Error,
	/// A soft navigation swapped content and updated the session URL.
	Navigate,
}

/// Handle returned by [`EventChannel::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(usize);

type Subscriber = Rc<dyn Fn(RouterEvent)>;

/// Single-threaded publish/subscribe channel for [`RouterEvent`]s.
///
/// Subscribers run synchronously, in subscription order, on the emitting call stack.
#[derive(Default)]
pub struct EventChannel {
	subscribers: RefCell<Vec<(usize, Subscriber)>>,
	next_id: Cell<usize>,
}

impl EventChannel {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&self, subscriber: impl Fn(RouterEvent) + 'static) -> Subscription {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		self.subscribers.borrow_mut().push((id, Rc::new(subscriber)));
		Subscription(id)
	}

	pub fn unsubscribe(&self, subscription: Subscription) {
		self.subscribers.borrow_mut().retain(|(id, _)| *id != subscription.0);
	}

	/// Synchronously notifies every subscriber.
	///
	/// The subscriber list is snapshotted first, so a subscriber may subscribe or
	/// unsubscribe from within its own callback without poisoning the channel.
	pub fn emit(&self, event: RouterEvent) {
		let subscribers: Vec<Subscriber> = self.subscribers.borrow().iter().map(|(_, subscriber)| Rc::clone(subscriber)).collect();
		for subscriber in subscribers {
			subscriber(event);
		}
	}
}
