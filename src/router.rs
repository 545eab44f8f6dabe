//! Session wiring: the shared router context and the document-level interception of
//! link clicks, form submissions and history traversal.

use crate::{
	error::NavigationError,
	events::EventChannel,
	host::HostRuntime,
	page::{navigate_to, submit_form},
	state::{RouterState, Settings},
};
use std::rc::Rc;
use tracing::{instrument, trace};
use wasm_bindgen::{closure::Closure, JsCast, UnwrapThrowExt};
use web_sys::{Document, Element, Event, HtmlAnchorElement, HtmlFormElement, MouseEvent, PopStateEvent, Window};

/// Shared session context: state, lifecycle events and the host-runtime seam.
///
/// Constructed once per page session and passed by reference to every component. Not a
/// global; embedders that need it in several places share the [`Rc`].
pub struct RouterContext {
	state: RouterState,
	events: EventChannel,
	runtime: Box<dyn HostRuntime>,
	window: Window,
	document: Document,
}

impl RouterContext {
	/// Creates the session context against the current browser window.
	#[must_use]
	pub fn new(settings: Settings, runtime: Box<dyn HostRuntime>) -> Rc<Self> {
		let window = web_sys::window().expect_throw("fireline-dom: no window in this context");
		let document = window.document().expect_throw("fireline-dom: window has no document");
		let current_url = window.location().href().unwrap_or_default();

		Rc::new(Self {
			state: RouterState::new(current_url, settings),
			events: EventChannel::new(),
			runtime,
			window,
			document,
		})
	}

	#[must_use]
	pub fn state(&self) -> &RouterState {
		&self.state
	}

	#[must_use]
	pub fn events(&self) -> &EventChannel {
		&self.events
	}

	#[must_use]
	pub fn runtime(&self) -> &dyn HostRuntime {
		self.runtime.as_ref()
	}

	#[must_use]
	pub fn window(&self) -> &Window {
		&self.window
	}

	#[must_use]
	pub fn document(&self) -> &Document {
		&self.document
	}
}

/// The attached router. Intercepts in-app navigation for the lifetime of this value,
/// detaching its listeners on drop.
pub struct Router {
	ctx: Rc<RouterContext>,
	click: Closure<dyn FnMut(MouseEvent)>,
	submit: Closure<dyn FnMut(Event)>,
	popstate: Closure<dyn FnMut(PopStateEvent)>,
}

impl Router {
	/// Wires click, submit and popstate interception for the current document.
	///
	/// Interception toggles are read fresh from the settings on every event, so they can
	/// be flipped at any time without re-attaching.
	///
	/// # Errors
	///
	/// [`NavigationError::Reconciliation`] when a listener cannot be registered.
	pub fn attach(settings: Settings, runtime: Box<dyn HostRuntime>) -> Result<Self, NavigationError> {
		let ctx = RouterContext::new(settings, runtime);

		let click = {
			let ctx = Rc::clone(&ctx);
			Closure::new(move |event: MouseEvent| on_click(&ctx, &event))
		};
		let submit = {
			let ctx = Rc::clone(&ctx);
			Closure::new(move |event: Event| on_submit(&ctx, &event))
		};
		let popstate = {
			let ctx = Rc::clone(&ctx);
			Closure::new(move |_: PopStateEvent| on_popstate(&ctx))
		};

		ctx.document()
			.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())
			.map_err(NavigationError::reconciliation)?;
		ctx.document()
			.add_event_listener_with_callback("submit", submit.as_ref().unchecked_ref())
			.map_err(NavigationError::reconciliation)?;
		ctx.window()
			.add_event_listener_with_callback("popstate", popstate.as_ref().unchecked_ref())
			.map_err(NavigationError::reconciliation)?;

		Ok(Self { ctx, click, submit, popstate })
	}

	#[must_use]
	pub fn context(&self) -> &Rc<RouterContext> {
		&self.ctx
	}

	/// Soft-navigates to `url`.
	pub fn navigate(&self, url: &str) {
		wasm_bindgen_futures::spawn_local(navigate_to(Rc::clone(&self.ctx), url.to_owned(), true));
	}

	/// Re-fetches and reconciles the current URL.
	pub fn reload(&self) {
		if let Ok(href) = self.ctx.window().location().href() {
			wasm_bindgen_futures::spawn_local(navigate_to(Rc::clone(&self.ctx), href, true));
		}
	}

	/// Submits `form` through the router, as the submit interception would.
	pub fn submit(&self, form: HtmlFormElement) {
		wasm_bindgen_futures::spawn_local(submit_form(Rc::clone(&self.ctx), form));
	}

	/// Replaces the router content without a fetch, funneling failures through the
	/// shared error path.
	pub fn replace_html(&self, html: &str) {
		if let Err(error) = crate::page::replace_content(&self.ctx, html) {
			crate::page::fail(&self.ctx, &error);
		}
	}
}

impl Drop for Router {
	fn drop(&mut self) {
		let _ = self.ctx.document().remove_event_listener_with_callback("click", self.click.as_ref().unchecked_ref());
		let _ = self.ctx.document().remove_event_listener_with_callback("submit", self.submit.as_ref().unchecked_ref());
		let _ = self.ctx.window().remove_event_listener_with_callback("popstate", self.popstate.as_ref().unchecked_ref());
	}
}

#[instrument(skip(ctx, event))]
fn on_click(ctx: &Rc<RouterContext>, event: &MouseEvent) {
	if !ctx.state().settings().intercept_links {
		return;
	}

	let Some(anchor) = event
		.target()
		.and_then(|target| target.dyn_into::<Element>().ok())
		.and_then(|element| element.closest("a").ok().flatten())
		.and_then(|element| element.dyn_into::<HtmlAnchorElement>().ok())
	else {
		return;
	};

	// Anchors opting out of interception, or leaving the site, keep native behavior.
	if anchor.has_attribute("native") || anchor.target() == "_blank" {
		return;
	}
	let hostname = ctx.window().location().hostname().unwrap_or_default();
	if anchor.hostname() != hostname {
		return;
	}

	event.prevent_default();

	let Some(url) = anchor.get_attribute("href") else {
		return;
	};

	trace!(url, "Intercepted link click");
	wasm_bindgen_futures::spawn_local(navigate_to(Rc::clone(ctx), url, true));
}

#[instrument(skip(ctx, event))]
fn on_submit(ctx: &Rc<RouterContext>, event: &Event) {
	if !ctx.state().settings().intercept_forms {
		return;
	}

	let Some(form) = event
		.target()
		.and_then(|target| target.dyn_into::<Element>().ok())
		.and_then(|element| element.closest("form").ok().flatten())
		.and_then(|element| element.dyn_into::<HtmlFormElement>().ok())
	else {
		return;
	};

	if form.has_attribute("native") {
		return;
	}
	let origin = ctx.window().location().origin().unwrap_or_default();
	if !form.action().starts_with(&origin) {
		return;
	}

	event.prevent_default();

	trace!(action = form.action(), "Intercepted form submission");
	wasm_bindgen_futures::spawn_local(submit_form(Rc::clone(ctx), form));
}

#[instrument(skip(ctx))]
fn on_popstate(ctx: &Rc<RouterContext>) {
	let Ok(href) = ctx.window().location().href() else {
		return;
	};
	trace!(href, "Replaying history entry");
	// History already points at the entry; replaying must not push it again.
	wasm_bindgen_futures::spawn_local(navigate_to(Rc::clone(ctx), href, false));
}
