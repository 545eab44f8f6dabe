//! Re-execution of `<script>` elements found in fetched content.
//!
//! Scripts inside a parsed `<template>` fragment are inert; the browser will never run
//! them, even after the fragment's nodes are adopted into the document. Each one is
//! rebuilt as a fresh element that does execute on insertion.

use crate::error::NavigationError;
use tracing::{trace, trace_span};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlScriptElement};

/// Rebuilds every `<script>` under `root` (a freshly parsed, inert fragment) as an
/// executable element, inserts it into `<head>` and removes it again immediately.
///
/// Removal does not interrupt execution the browser has already started, and keeps the
/// head from accumulating stray elements across navigations.
///
/// # Errors
///
/// [`NavigationError::Reconciliation`] when the document has no head or a DOM operation
/// fails.
pub fn inject_scripts(document: &Document, root: &Element) -> Result<(), NavigationError> {
	let head = document.head().ok_or_else(|| NavigationError::Reconciliation("document has no <head>".to_owned()))?;
	let scripts = root.query_selector_all("script").map_err(NavigationError::reconciliation)?;

	for i in 0..scripts.length() {
		let Some(inert) = scripts.get(i).and_then(|node| node.dyn_into::<HtmlScriptElement>().ok()) else {
			continue;
		};

		let span = trace_span!("Re-executing script", src = ?inert.src());
		let _enter = span.enter();

		let script: HtmlScriptElement = document
			.create_element("script")
			.map_err(NavigationError::reconciliation)?
			.dyn_into()
			.map_err(|element| NavigationError::Reconciliation(format!("expected a script element, got {element:?}")))?;

		let declared_type = inert.type_();
		script.set_type(if declared_type.is_empty() { "text/javascript" } else { &declared_type });

		let src = inert.src();
		if src.is_empty() {
			script.set_text_content(inert.text_content().as_deref());
		} else {
			script.set_src(&src);
		}

		head.append_child(&script).map_err(NavigationError::reconciliation)?;
		head.remove_child(&script).map_err(NavigationError::reconciliation)?;
		trace!("Script executed and detached");
	}

	Ok(())
}
