//! Reconciliation: depth-first, single-pass diff/patch of a live DOM subtree against a
//! freshly parsed, detached fragment. Mutation of the live tree is the only observable
//! effect.
//!
//! Children are matched positionally. There is no keyed reordering and no move
//! detection: a reordered list is patched as N content replacements at fixed positions.
//! That tradeoff is deliberate and load-bearing for simplicity; do not add move
//! detection here.
//!
//! Reconciliation does not recover from DOM operation failures. The first failed
//! operation aborts the walk and surfaces as [`NavigationError::Reconciliation`];
//! mutations already applied stay in place.

use crate::{error::NavigationError, host::HostRuntime};
use hashbrown::HashSet;
use tracing::{error, trace, trace_span};
use wasm_bindgen::JsCast;
use web_sys::{Element, NamedNodeMap, Node, NodeList, Text};

/// Default recursion cap for [`reconcile`]. Server-rendered page regions are far
/// shallower than this in practice.
pub const DEFAULT_DEPTH_LIMIT: usize = 128;

/// Patches `old` (a node in the live tree under `parent`) to match `new` (a node in a
/// detached fragment). With `old` absent, `new` is appended to `parent` instead.
///
/// Externally-owned state is released through `runtime` before any node that may carry
/// it leaves the document. Nodes adopted from the new fragment are moved into the live
/// tree by the browser; the caller keeps ownership of both trees.
///
/// # Errors
///
/// [`NavigationError::Reconciliation`] on the first failed DOM operation or when
/// `depth_limit` is exhausted.
pub fn reconcile(runtime: &dyn HostRuntime, parent: &Node, old: Option<&Node>, new: &Node, depth_limit: usize) -> Result<(), NavigationError> {
	if depth_limit == 0 {
		error!("Depth limit reached");
		return Err(NavigationError::Reconciliation("depth limit reached".to_owned()));
	}

	// Replace (or insert) when the old node is missing or of a different kind.
	let old = match old {
		None => {
			let span = trace_span!("Appending node", new = ?new.node_name());
			let _enter = span.enter();
			parent.append_child(new).map_err(NavigationError::reconciliation)?;
			return Ok(());
		}
		Some(old) if old.node_name() != new.node_name() => {
			let span = trace_span!("Replacing mismatching node", old = ?old.node_name(), new = ?new.node_name());
			let _enter = span.enter();
			release_state(runtime, old);
			parent.replace_child(new, old).map_err(NavigationError::reconciliation)?;
			return Ok(());
		}
		Some(old) => old,
	};

	// Text nodes: overwrite data in place.
	if let (Some(old_text), Some(new_text)) = (old.dyn_ref::<Text>(), new.dyn_ref::<Text>()) {
		if old_text.data() != new_text.data() {
			trace!(old = ?old_text.data(), new = ?new_text.data(), "Updating text data");
			old_text.set_data(&new_text.data());
		}
		return Ok(());
	}

	if let (Some(old_element), Some(new_element)) = (old.dyn_ref::<Element>(), new.dyn_ref::<Element>()) {
		// A changed state-boundary declaration breaks the boundary: the old state must
		// be destroyed, not patched over.
		let boundary = runtime.state_boundary_attribute();
		if old_element.has_attribute(boundary) && old_element.get_attribute(boundary) != new_element.get_attribute(boundary) {
			let span = trace_span!("Replacing broken state boundary", tag = ?old_element.tag_name());
			let _enter = span.enter();
			runtime.destroy_tree(old_element);
			parent.replace_child(new, old).map_err(NavigationError::reconciliation)?;
			return Ok(());
		}

		merge_attributes(runtime, old_element, new_element)?;

		// Raw-content subtrees are injected by the host; never touch their children.
		if runtime.raw_content_attributes().iter().any(|marker| old_element.has_attribute(marker)) {
			trace!(tag = ?old_element.tag_name(), "Skipping raw-content subtree");
			return Ok(());
		}
	}

	// Positional child recursion. Both lists are snapshotted up front: appending a child
	// of the new fragment to the live tree removes it from the fragment's live NodeList.
	let old_children = snapshot_children(&old.child_nodes());
	let new_children = snapshot_children(&new.child_nodes());

	for surplus in old_children.iter().skip(new_children.len()).rev() {
		let span = trace_span!("Removing surplus child", node = ?surplus.node_name());
		let _enter = span.enter();
		release_state(runtime, surplus);
		old.remove_child(surplus).map_err(NavigationError::reconciliation)?;
	}

	for (index, new_child) in new_children.iter().enumerate() {
		reconcile(runtime, old, old_children.get(index), new_child, depth_limit - 1)?;
	}

	Ok(())
}

/// Merges attributes of same-tag elements: sets every changed attribute present on
/// `new`, removes attributes absent from `new` unless they are externally bound on the
/// old element, or `style` while the visibility-toggle marker is present.
fn merge_attributes(runtime: &dyn HostRuntime, old: &Element, new: &Element) -> Result<(), NavigationError> {
	let old_attributes = snapshot_attributes(&old.attributes());
	let new_attributes = snapshot_attributes(&new.attributes());

	for (name, value) in &new_attributes {
		if old.get_attribute(name).as_deref() != Some(value) {
			trace!(name, value, "Setting attribute");
			old.set_attribute(name, value).map_err(NavigationError::reconciliation)?;
		}
	}

	// Ownership is decided once per element, against the old element's declarations.
	let bound = bound_attribute_names(runtime.binding_prefixes(), old_attributes.iter().map(|(name, _)| name.as_str()));
	let style_is_framework_owned = old_attributes.iter().any(|(name, _)| name == runtime.visibility_toggle_attribute());

	for (name, _) in &old_attributes {
		if new.has_attribute(name) || bound.contains(name.as_str()) {
			continue;
		}
		if name == "style" && style_is_framework_owned {
			continue;
		}
		trace!(name, "Removing attribute");
		old.remove_attribute(name).map_err(NavigationError::reconciliation)?;
	}

	Ok(())
}

/// Attribute names marked externally owned by a binding-prefix declaration, e.g.
/// `x-bind:class` and `:class` both own `class`.
fn bound_attribute_names<'a>(prefixes: &[&str], names: impl Iterator<Item = &'a str>) -> HashSet<String> {
	names
		.filter_map(|name| prefixes.iter().find_map(|prefix| name.strip_prefix(prefix)))
		.map(str::to_owned)
		.collect()
}

fn release_state(runtime: &dyn HostRuntime, node: &Node) {
	if let Some(element) = node.dyn_ref::<Element>() {
		runtime.destroy_tree(element);
	}
}

fn snapshot_children(children: &NodeList) -> Vec<Node> {
	(0..children.length()).filter_map(|i| children.get(i)).collect()
}

fn snapshot_attributes(attributes: &NamedNodeMap) -> Vec<(String, String)> {
	(0..attributes.length())
		.filter_map(|i| attributes.item(i))
		.map(|attribute| (attribute.name(), attribute.value()))
		.collect()
}
