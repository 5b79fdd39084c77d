//! dbtabs Session - keeps open tabs consistent across the location, memory
//! and saved records
//!
//! The location (`tabs=<ids>&active=<n>`) owns tab order and selection. The
//! in-memory [`TabStateStore`](dbtabs_core::TabStateStore) owns tab content.
//! Saved records, one per (connection, database), let a session come back
//! the way it was left.
//!
//! [`Reconciler`] is the pure state machine that keeps the three in step.
//! [`TabSession`] drives it against real persistence and navigation ports.

mod ids;
pub mod lifecycle;
mod navigator;
pub mod reconciler;
mod session;
mod url;

pub use ids::TabIdAllocator;
pub use lifecycle::{QuerySeed, TabCommand};
pub use navigator::{HistoryNavigator, Navigator};
pub use reconciler::{Effect, Phase, Reconciler, SessionEvent};
pub use session::TabSession;
pub use url::{ACTIVE_PARAM, TABS_PARAM, UrlView, decode, encode};
