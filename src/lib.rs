#![doc(html_root_url = "https://docs.rs/fireline-dom/0.1.0")]
#![warn(clippy::pedantic)]
//! Turns a conventional multi-page, server-rendered site into a single-page application.
//!
//! A [`Router`] intercepts in-app navigation (link clicks, form submissions,
//! back/forward), fetches the new page as a JSON envelope and reconciles the live DOM
//! against the freshly parsed content in place. There is no full reload, and component
//! state owned by a host framework (Alpine.js-style) survives wherever the content
//! allows it.
//!
//! The host runtime is consumed only through the [`host::HostRuntime`] seam; pages
//! without one run with [`host::NoopRuntime`]. Lifecycle signals (start, end, error,
//! navigate) are exposed on the typed [`events::EventChannel`] for integrations such as
//! progress bars.

pub mod diff;
pub mod error;
pub mod events;
pub mod fetch;
pub mod host;
pub mod page;
pub mod router;
pub mod scripts;
pub mod state;

pub use error::NavigationError;
pub use events::{EventChannel, RouterEvent, Subscription};
pub use fetch::PageResponse;
pub use host::{HostRuntime, NoopRuntime};
pub use router::{Router, RouterContext};
pub use state::{RouterState, Settings, StateChange};
