//! One resolved value, consumed two ways.
//!
//! A [`Promise`] already holding `"Promise!"` is read once by chaining `then`
//! continuations and once by `.await`ing it. Both styles are scheduled on the
//! same explicit [`TaskQueue`], so the order of the three printed lines is a
//! direct consequence of the order in which each style queues its work. See
//! [`program::run`] for the resulting output.

pub mod console;
pub mod error;
pub mod program;
pub mod promise;
pub mod queue;
pub mod two_ways;

pub use console::{Console, Transcript};
pub use error::{Error, Rejected};
pub use program::{run, Style, PAYLOAD};
pub use promise::{Awaiting, Promise, Resolver, Settled};
pub use queue::TaskQueue;
