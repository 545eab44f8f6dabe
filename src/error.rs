use wasm_bindgen::JsValue;

/// Everything that can terminate a navigation attempt.
///
/// All four variants funnel into the same recovery path: the failure is logged, an
/// [`Error`](`crate::events::RouterEvent::Error`) event is emitted and the loading flag is
/// cleared, so a failed attempt can never leave the router locked. There are no retries;
/// each failure is terminal for its attempt and the page keeps its current content.
#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
	/// The request could not be completed: connection failure, timeout abort, or a
	/// non-2xx response status.
	#[error("network request failed: {0}")]
	Network(String),

	/// The response body was not a valid page envelope.
	#[error("malformed page envelope: {0}")]
	MalformedResponse(String),

	/// Neither the configured target selector nor any fallback selector resolved to a
	/// live element.
	#[error("router target element not found (tried {0:?})")]
	TargetNotFound(String),

	/// A DOM operation failed while patching. Mutations applied before the failure are
	/// left in place.
	#[error("reconciliation failed: {0}")]
	Reconciliation(String),
}

impl NavigationError {
	pub(crate) fn network(error: JsValue) -> Self {
		Self::Network(js_value_message(&error))
	}

	pub(crate) fn reconciliation(error: JsValue) -> Self {
		Self::Reconciliation(js_value_message(&error))
	}
}

fn js_value_message(value: &JsValue) -> String {
	value.as_string().unwrap_or_else(|| format!("{value:?}"))
}
