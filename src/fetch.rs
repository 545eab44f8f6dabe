//! The Fetcher: issues the page request, enforces the configured timeout, detects
//! cross-navigation redirects and parses the JSON page envelope.

use crate::{error::NavigationError, events::RouterEvent, router::RouterContext};
use serde::Deserialize;
use tracing::{trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortController, FormData, Request, RequestInit, Response, Url};

/// Marker header identifying router requests to the server-side extraction endpoint.
pub const AGENT_HEADER: &str = "X-Fireline-Agent";

/// One parsed page envelope. `html`/`title` serve plain navigations; the remaining
/// fields only appear in form-submission responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageResponse {
	pub html: Option<String>,
	pub title: Option<String>,
	pub status: Option<String>,
	pub message: Option<String>,
	pub redirect: Option<String>,
	pub navigate: Option<String>,
}

/// Fetches `path` and parses the response envelope.
///
/// Returns `Ok(None)` without any other effect while a navigation is already in flight
/// (drop-new backpressure; the attempt is neither queued nor does it cancel the first).
/// Otherwise emits [`RouterEvent::Start`], clears the pending redirect and raises the
/// loading flag before the request goes out; the caller owns resetting the flag on both
/// the success and every error path.
///
/// A response whose final URL no longer ends in the requested path, but shares the page
/// origin, is a cross-navigation redirect: the resolved URL is pushed to history here
/// and recorded on the state so the post-render step skips its own push.
///
/// # Errors
///
/// [`NavigationError::Network`] for connection failures, timeout aborts and non-2xx
/// statuses; [`NavigationError::MalformedResponse`] for bodies that are not a valid
/// envelope.
pub async fn fetch_page(ctx: &RouterContext, path: &str, method: &str, body: Option<&FormData>) -> Result<Option<PageResponse>, NavigationError> {
	if ctx.state().loading() {
		trace!(path, "Dropping navigation attempt: already loading");
		return Ok(None);
	}

	ctx.events().emit(RouterEvent::Start);
	ctx.state().set_redirected_url(None);
	ctx.state().set_loading(true);

	let init = RequestInit::new();
	init.set_method(method);
	if let Some(body) = body {
		init.set_body(body.as_ref());
	}

	let controller = AbortController::new().map_err(NavigationError::network)?;
	init.set_signal(Some(&controller.signal()));

	let request = Request::new_with_str_and_init(path, &init).map_err(NavigationError::network)?;
	request.headers().set("Accept", "application/json").map_err(NavigationError::network)?;
	request.headers().set(AGENT_HEADER, env!("CARGO_PKG_VERSION")).map_err(NavigationError::network)?;

	// `AbortController` driven by a plain timer. The timer bounds the whole exchange,
	// headers and body; it stays armed until the body has settled.
	let timeout_ms = timeout_millis(ctx.state().settings().timeout_seconds);
	let abort = Closure::<dyn FnMut()>::new(move || controller.abort());
	let timer = ctx
		.window()
		.set_timeout_with_callback_and_timeout_and_arguments_0(abort.as_ref().unchecked_ref(), timeout_ms)
		.map_err(NavigationError::network)?;

	let outcome = exchange(ctx, path, &request).await;
	ctx.window().clear_timeout_with_handle(timer);
	drop(abort);

	let body = outcome?;
	let envelope = serde_json::from_str(&body).map_err(|error| NavigationError::MalformedResponse(error.to_string()))?;
	Ok(Some(envelope))
}

/// Runs the request to a settled body. The caller keeps the abort timer armed across
/// both awaits, so a stalled body stream is aborted the same as a stalled connection.
async fn exchange(ctx: &RouterContext, path: &str, request: &Request) -> Result<String, NavigationError> {
	let response: Response = JsFuture::from(ctx.window().fetch_with_request(request))
		.await
		.map_err(NavigationError::network)?
		.dyn_into()
		.map_err(|value| NavigationError::Network(format!("fetch resolved to a non-Response value: {value:?}")))?;

	if !response.ok() {
		return Err(NavigationError::Network(format!("unexpected response status {}", response.status())));
	}

	if resolved_elsewhere(path, &response.url()) {
		record_redirect(ctx, &response.url())?;
	}

	let body = JsFuture::from(response.text().map_err(NavigationError::network)?).await.map_err(NavigationError::network)?;
	Ok(body.as_string().unwrap_or_default())
}

/// True when the response settled on a URL that is not the one requested.
fn resolved_elsewhere(requested: &str, resolved: &str) -> bool {
	!resolved.ends_with(requested)
}

/// Pushes the redirect target to history and records it, provided it stays on the page
/// origin. Cross-origin redirects are left alone.
fn record_redirect(ctx: &RouterContext, resolved: &str) -> Result<(), NavigationError> {
	let Ok(resolved) = Url::new(resolved) else {
		warn!(resolved, "Redirected to an unparseable URL; leaving history untouched");
		return Ok(());
	};
	let origin = ctx.window().location().origin().map_err(NavigationError::network)?;
	if origin != resolved.origin() {
		return Ok(());
	}

	trace!(url = resolved.href(), "Recording same-origin redirect");
	ctx.window()
		.history()
		.map_err(NavigationError::network)?
		.push_state_with_url(&JsValue::NULL, "", Some(&resolved.href()))
		.map_err(NavigationError::network)?;
	ctx.state().set_redirected_url(Some(resolved.href()));
	Ok(())
}

fn timeout_millis(timeout_seconds: u32) -> i32 {
	i32::try_from(timeout_seconds.saturating_mul(1000)).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
	use super::{resolved_elsewhere, timeout_millis, PageResponse};

	#[test]
	fn envelope_for_plain_navigation() {
		let envelope: PageResponse = serde_json::from_str(r#"{"html":"<div>hi</div>","title":"Hi"}"#).unwrap();
		assert_eq!(envelope.html.as_deref(), Some("<div>hi</div>"));
		assert_eq!(envelope.title.as_deref(), Some("Hi"));
		assert_eq!(envelope.status, None);
		assert_eq!(envelope.redirect, None);
	}

	#[test]
	fn envelope_form_variants() {
		let success: PageResponse = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
		assert_eq!(success.status.as_deref(), Some("success"));

		let redirect: PageResponse = serde_json::from_str(r#"{"redirect":"/login"}"#).unwrap();
		assert_eq!(redirect.redirect.as_deref(), Some("/login"));

		let navigate: PageResponse = serde_json::from_str(r#"{"navigate":"/next"}"#).unwrap();
		assert_eq!(navigate.navigate.as_deref(), Some("/next"));

		let status: PageResponse = serde_json::from_str(r#"{"status":"error","message":"Invalid email"}"#).unwrap();
		assert_eq!(status.status.as_deref(), Some("error"));
		assert_eq!(status.message.as_deref(), Some("Invalid email"));
	}

	#[test]
	fn envelope_tolerates_unknown_fields() {
		let envelope: PageResponse = serde_json::from_str(r#"{"html":"<p>x</p>","cache":"miss"}"#).unwrap();
		assert_eq!(envelope.html.as_deref(), Some("<p>x</p>"));
	}

	#[test]
	fn envelope_rejects_non_object_bodies() {
		assert!(serde_json::from_str::<PageResponse>("<html>not json</html>").is_err());
		assert!(serde_json::from_str::<PageResponse>("[1,2]").is_err());
	}

	#[test]
	fn redirect_detection_compares_path_suffix() {
		assert!(!resolved_elsewhere("/about", "https://example.test/about"));
		assert!(resolved_elsewhere("/about", "https://example.test/login"));
		assert!(resolved_elsewhere("/about", "https://example.test/about/"));
	}

	#[test]
	fn timeout_conversion_saturates() {
		assert_eq!(timeout_millis(30), 30_000);
		assert_eq!(timeout_millis(u32::MAX), i32::MAX);
	}
}
