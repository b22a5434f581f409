//! Two ways to consume the same [`Promise`](crate::Promise).
//!
//! [`continuation`] attaches callbacks with `then`. [`suspension`] awaits the
//! promise instead, and is itself written twice, following this layout:
//!
//! ```text
//! pub mod suspension {
//!     pub mod auto {
//!         pub async fn log_via_suspension() {
//!             // written with async-await syntax.
//!         }
//!     }
//!
//!     pub mod manual {
//!         pub async fn log_via_suspension() {
//!             // written as a struct which implements `Future`.
//!         }
//!     }
//! }
//! ```
//!
//! Both sides sit on the same task queue: a `then` callback and an `.await`
//! resumption are each one queued job, which is what makes their relative
//! order observable.

pub mod continuation;
pub mod suspension;

/// Trailing line printed by the suspension routine once it has printed the
/// value.
pub const LAST_LINE: &str = "Last line!";
