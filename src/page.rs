//! The navigation controller: orchestrates fetch, script re-execution, reconciliation,
//! history and title updates, and the lifecycle events around them.
//!
//! Two states, Idle and Loading, with an implicit error branch that folds back to Idle.
//! Every entry point is guarded by the loading flag; every failure funnels through
//! [`fail`].

use crate::{
	diff::{reconcile, DEFAULT_DEPTH_LIMIT},
	error::NavigationError,
	events::RouterEvent,
	fetch::{fetch_page, PageResponse},
	router::RouterContext,
	scripts::inject_scripts,
};
use std::rc::Rc;
use tracing::{error, info, trace_span, warn};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, HtmlFormElement, HtmlTemplateElement};

/// Structural container selectors tried in order when the configured target selector
/// resolves to nothing, most specific first. `body` is the ultimate fallback.
pub const FALLBACK_SELECTORS: &[&str] = &[
	"#content > article",
	"#content > div",
	"#content",
	"#main > article",
	"#main > div",
	"#main",
	"#primary > article",
	"#primary > div",
	"#primary",
	".site-content > article",
	".site-content > div",
	".site-content",
	".content-area > article",
	".content-area > div",
	".content-area",
	"body",
];

/// Performs a soft navigation to `url`.
///
/// On success the fetched content is applied to the target element, the title updated
/// when provided, and, once the host runtime has flushed pending updates, the URL is
/// pushed to history. The push is skipped when the attempt was redirected server-side
/// or `push_state` is false (popstate replay). A second call while a navigation is in
/// flight is dropped silently.
pub async fn navigate_to(ctx: Rc<RouterContext>, url: String, push_state: bool) {
	let envelope = match fetch_page(&ctx, &url, "get", None).await {
		Ok(Some(envelope)) => envelope,
		Ok(None) => return,
		Err(error) => return fail(&ctx, &error),
	};

	if let Err(error) = apply_navigation(&ctx, &envelope, &url, push_state).await {
		fail(&ctx, &error);
	}
}

async fn apply_navigation(ctx: &RouterContext, envelope: &PageResponse, url: &str, push_state: bool) -> Result<(), NavigationError> {
	let html = envelope
		.html
		.as_deref()
		.ok_or_else(|| NavigationError::MalformedResponse("envelope is missing `html`".to_owned()))?;

	if let Some(title) = &envelope.title {
		ctx.document().set_title(title);
	}

	replace_content(ctx, html)?;

	// Post-render barrier: history is only mutated once queued reactive updates ran.
	ctx.runtime().flush().await;

	if push_state && ctx.state().redirected_url().is_none() {
		ctx.window()
			.history()
			.map_err(NavigationError::reconciliation)?
			.push_state_with_url(&JsValue::NULL, "", Some(url))
			.map_err(NavigationError::reconciliation)?;
	}

	let current = ctx.window().location().href().map_err(NavigationError::reconciliation)?;
	ctx.state().set_current_url(&current);

	ctx.events().emit(RouterEvent::Navigate);
	ctx.events().emit(RouterEvent::End);
	ctx.state().set_loading(false);
	Ok(())
}

/// Parses `html` into an inert fragment, re-executes its scripts and reconciles the
/// resolved target element against the fragment's root element.
///
/// # Errors
///
/// [`NavigationError::TargetNotFound`] when no target resolves (the attempt then fails
/// before any script runs or the DOM is touched),
/// [`NavigationError::MalformedResponse`] when `html` has no root element, or
/// [`NavigationError::Reconciliation`] when patching fails.
pub fn replace_content(ctx: &RouterContext, html: &str) -> Result<(), NavigationError> {
	// The target must resolve before scripts execute or anything mutates; fetched
	// content gets no side effects on an attempt that cannot be applied.
	let target = resolve_target(ctx)?;
	let parent = target
		.parent_node()
		.ok_or_else(|| NavigationError::Reconciliation("target element has no parent node".to_owned()))?;

	let template: HtmlTemplateElement = ctx
		.document()
		.create_element("template")
		.map_err(NavigationError::reconciliation)?
		.dyn_into()
		.map_err(|element| NavigationError::Reconciliation(format!("expected a template element, got {element:?}")))?;
	template.set_inner_html(html.trim());

	let fresh = template
		.content()
		.first_element_child()
		.ok_or_else(|| NavigationError::MalformedResponse("envelope `html` has no root element".to_owned()))?;

	inject_scripts(ctx.document(), &fresh)?;

	let span = trace_span!("Reconciling target", target = ?target.tag_name());
	let _enter = span.enter();
	reconcile(ctx.runtime(), &parent, Some(target.as_ref()), fresh.as_ref(), DEFAULT_DEPTH_LIMIT)
}

/// Resolves the content-replacement boundary element.
///
/// Tries the configured selector first, then walks [`FALLBACK_SELECTORS`] and adopts the
/// first that resolves, persisting it for subsequent navigations while retaining the
/// configured selector for diagnostics.
///
/// # Errors
///
/// [`NavigationError::TargetNotFound`] when every selector is exhausted.
pub fn resolve_target(ctx: &RouterContext) -> Result<Element, NavigationError> {
	let configured = ctx.state().settings().target_selector;
	if let Some(element) = ctx.document().query_selector(&configured).ok().flatten() {
		return Ok(element);
	}

	for selector in FALLBACK_SELECTORS {
		if let Some(element) = ctx.document().query_selector(selector).ok().flatten() {
			warn!(configured, adopted = selector, "Target selector did not resolve; adopting fallback");
			ctx.state().update_settings(|settings| {
				(*selector).clone_into(&mut settings.target_selector);
				if settings.configured_selector.is_none() {
					settings.configured_selector = Some(configured.clone());
				}
			});
			return Ok(element);
		}
	}

	Err(NavigationError::TargetNotFound(configured))
}

/// Submits `form` asynchronously and applies the response.
///
/// Branches on the envelope shape: `status == "success"` resets the form; `redirect`
/// triggers a hard navigation and skips everything else; `navigate` clears the loading
/// flag and soft-navigates; `status` + `message` toggles the form's status-marked
/// children; `html` goes through the normal content path.
pub async fn submit_form(ctx: Rc<RouterContext>, form: HtmlFormElement) {
	let action = form
		.get_attribute("action")
		.or_else(|| ctx.window().location().href().ok())
		.unwrap_or_default();
	let method = form.get_attribute("method").unwrap_or_else(|| "get".to_owned());

	let data = match web_sys::FormData::new_with_form(&form) {
		Ok(data) => data,
		Err(error) => return fail(&ctx, &NavigationError::network(error)),
	};

	let envelope = match fetch_page(&ctx, &action, &method, Some(&data)).await {
		Ok(Some(envelope)) => envelope,
		Ok(None) => return,
		Err(error) => return fail(&ctx, &error),
	};

	if let Err(error) = apply_form_response(&ctx, &form, &envelope).await {
		fail(&ctx, &error);
	}
}

async fn apply_form_response(ctx: &Rc<RouterContext>, form: &HtmlFormElement, envelope: &PageResponse) -> Result<(), NavigationError> {
	if envelope.status.as_deref() == Some("success") {
		form.reset();
	}

	if let Some(redirect) = &envelope.redirect {
		info!(redirect, "Form response requested a hard navigation");
		return ctx.window().location().set_href(redirect).map_err(NavigationError::network);
	}

	if let Some(navigate) = &envelope.navigate {
		// The soft navigation runs its own fetch; the gate has to open for it first.
		ctx.state().set_loading(false);
		navigate_to(Rc::clone(ctx), navigate.clone(), true).await;
		return Ok(());
	}

	if let (Some(status), Some(message)) = (&envelope.status, &envelope.message) {
		apply_form_status(form, status, message)?;
	} else if let Some(html) = &envelope.html {
		if let Some(title) = &envelope.title {
			ctx.document().set_title(title);
		}
		form.reset();
		replace_content(ctx, html)?;
	}

	ctx.runtime().flush().await;
	ctx.events().emit(RouterEvent::End);
	ctx.state().set_loading(false);
	Ok(())
}

/// Shows `message` in every form child whose `status` marker attribute equals `status`;
/// clears and hides every other marked child.
pub fn apply_form_status(form: &HtmlFormElement, status: &str, message: &str) -> Result<(), NavigationError> {
	let children = form.children();
	for i in 0..children.length() {
		let Some(child) = children.item(i) else { continue };
		let Some(marker) = child.get_attribute("status") else { continue };
		let Some(styled) = child.dyn_ref::<HtmlElement>() else { continue };

		if marker == status {
			child.set_text_content(Some(message));
			styled.style().set_property("display", "block").map_err(NavigationError::reconciliation)?;
		} else {
			child.set_text_content(Some(""));
			styled.style().set_property("display", "none").map_err(NavigationError::reconciliation)?;
		}
	}
	Ok(())
}

/// The single error funnel: log, emit [`RouterEvent::Error`], unlock the loading gate.
/// The page keeps whatever it currently renders.
pub(crate) fn fail(ctx: &RouterContext, error: &NavigationError) {
	error!(%error, "Navigation failed");
	ctx.events().emit(RouterEvent::Error);
	ctx.state().set_loading(false);
}
