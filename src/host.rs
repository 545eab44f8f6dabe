//! Seam towards the host reactive/directive runtime.
//!
//! The router never talks to the host framework directly. It consumes it through this
//! trait: a cleanup hook for externally-owned component state, a scheduling barrier that
//! resolves once pending reactive updates have flushed, and the attribute conventions
//! that mark framework-owned parts of the tree.

use std::{future::Future, pin::Pin};

/// A future that resolves once the host framework has flushed its pending updates.
pub type FlushBarrier = Pin<Box<dyn Future<Output = ()>>>;

/// Hooks and conventions of the host reactive runtime.
///
/// The defaults mirror an Alpine.js-style host; a host without an equivalent runtime can
/// use [`NoopRuntime`] as-is, which degrades the flush barrier to a synchronous no-op and
/// makes state cleanup do nothing.
pub trait HostRuntime {
	/// Attribute declaring a reactive state boundary. When its value differs between the
	/// old and new element the boundary is broken: state is destroyed and the element
	/// replaced wholesale instead of patched.
	fn state_boundary_attribute(&self) -> &str {
		"x-data"
	}

	/// Attribute marking an element whose `style` is framework-owned and must survive
	/// attribute removal.
	fn visibility_toggle_attribute(&self) -> &str {
		"x-show"
	}

	/// Attributes marking elements whose children are raw text/HTML injections; their
	/// subtrees are skipped entirely during reconciliation.
	fn raw_content_attributes(&self) -> &[&str] {
		&["x-text", "x-html"]
	}

	/// Prefixes declaring a dynamically bound attribute. An attribute named
	/// `<prefix><name>` marks `<name>` as externally owned on that element.
	fn binding_prefixes(&self) -> &[&str] {
		&["x-bind:", ":"]
	}

	/// Releases externally-owned component state rooted at `element`, which is about to
	/// be removed or replaced.
	fn destroy_tree(&self, element: &web_sys::Element) {
		let _ = element;
	}

	/// Returns the post-render scheduling barrier. History is only mutated once this
	/// future has resolved.
	fn flush(&self) -> FlushBarrier {
		Box::pin(async {})
	}
}

/// Host runtime for pages without a reactive framework.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRuntime;

impl HostRuntime for NoopRuntime {}
