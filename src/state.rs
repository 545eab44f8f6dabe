//! Shared, mutable session context: the loading gate, the current URL, the pending
//! redirect target and the runtime configuration.
//!
//! One [`RouterState`] exists per page session. It is an explicit state holder with typed
//! fields, not a reactive proxy; components observe changes through
//! [`RouterState::observe`] where they need to react at all.

use std::{
	cell::{Cell, RefCell},
	rc::Rc,
};

/// Runtime configuration, mutable at any time and read fresh on each navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	/// Selector for the content-replacement boundary element.
	pub target_selector: String,
	/// The originally configured selector, retained for diagnostics after a fallback
	/// selector has been adopted into `target_selector`.
	pub configured_selector: Option<String>,
	/// Seconds before an in-flight request is aborted.
	pub timeout_seconds: u32,
	/// Whether same-host link clicks are intercepted.
	pub intercept_links: bool,
	/// Whether same-origin form submissions are intercepted.
	pub intercept_forms: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			target_selector: "#app > div".to_owned(),
			configured_selector: None,
			timeout_seconds: 30,
			intercept_links: true,
			intercept_forms: true,
		}
	}
}

/// A change notification passed to [`RouterState::observe`] callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
	Loading(bool),
	CurrentUrl(String),
}

/// Handle returned by [`RouterState::observe`], used to stop observing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observer(usize);

type ChangeCallback = Rc<dyn Fn(&StateChange)>;

/// Mutable router session state. Constructed once per session and shared by reference;
/// every mutation runs to completion on the single browser thread, so observers never
/// see interleaved writers.
pub struct RouterState {
	loading: Cell<bool>,
	current_url: RefCell<String>,
	redirected_url: RefCell<Option<String>>,
	settings: RefCell<Settings>,
	observers: RefCell<Vec<(usize, ChangeCallback)>>,
	next_observer: Cell<usize>,
}

impl RouterState {
	#[must_use]
	pub fn new(current_url: String, settings: Settings) -> Self {
		Self {
			loading: Cell::new(false),
			current_url: RefCell::new(current_url),
			redirected_url: RefCell::new(None),
			settings: RefCell::new(settings),
			observers: RefCell::new(Vec::new()),
			next_observer: Cell::new(0),
		}
	}

	#[must_use]
	pub fn loading(&self) -> bool {
		self.loading.get()
	}

	pub fn set_loading(&self, loading: bool) {
		if self.loading.replace(loading) != loading {
			self.notify(&StateChange::Loading(loading));
		}
	}

	#[must_use]
	pub fn current_url(&self) -> String {
		self.current_url.borrow().clone()
	}

	pub fn set_current_url(&self, url: &str) {
		if *self.current_url.borrow() != url {
			url.clone_into(&mut self.current_url.borrow_mut());
			self.notify(&StateChange::CurrentUrl(url.to_owned()));
		}
	}

	#[must_use]
	pub fn redirected_url(&self) -> Option<String> {
		self.redirected_url.borrow().clone()
	}

	pub fn set_redirected_url(&self, url: Option<String>) {
		*self.redirected_url.borrow_mut() = url;
	}

	#[must_use]
	pub fn settings(&self) -> Settings {
		self.settings.borrow().clone()
	}

	pub fn update_settings(&self, update: impl FnOnce(&mut Settings)) {
		update(&mut self.settings.borrow_mut());
	}

	pub fn observe(&self, callback: impl Fn(&StateChange) + 'static) -> Observer {
		let id = self.next_observer.get();
		self.next_observer.set(id + 1);
		self.observers.borrow_mut().push((id, Rc::new(callback)));
		Observer(id)
	}

	pub fn unobserve(&self, observer: Observer) {
		self.observers.borrow_mut().retain(|(id, _)| *id != observer.0);
	}

	fn notify(&self, change: &StateChange) {
		let observers: Vec<ChangeCallback> = self.observers.borrow().iter().map(|(_, callback)| Rc::clone(callback)).collect();
		for observer in observers {
			observer(change);
		}
	}
}
