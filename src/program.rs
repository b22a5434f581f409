use std::rc::Rc;

use tracing::info;

use crate::{
    console::Console,
    error::Error,
    queue::TaskQueue,
    two_ways::{continuation, suspension},
};

/// The value both routines observe.
pub const PAYLOAD: &str = "Promise!";

/// Which form of the suspension routine to run. Both print the same thing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Style {
    /// `async`/`await` syntax.
    #[default]
    Auto,
    /// Hand-written [`Future`](core::future::Future) state machine.
    Manual,
}

/// Runs both routines against one resolved promise on a fresh task queue and
/// drains it.
///
/// The output on this queue is always:
///
/// ```text
/// Promise!      <- continuation routine
/// Promise!      <- suspension routine
/// Last line!    <- suspension routine
/// ```
///
/// Draining starts with the identity continuation and the suspension
/// routine's first resumption. The identity hop queues the print, and the
/// resumed routine awaits again, queueing itself behind that print.
pub fn run(console: Rc<Console>, style: Style) -> Result<(), Error> {
    let queue = TaskQueue::new();
    let source = queue.resolved(PAYLOAD);

    continuation::log_via_continuations(&source, Rc::clone(&console));
    let _done = match style {
        Style::Auto => queue.spawn(suspension::auto::log_via_suspension(
            source,
            Rc::clone(&console),
        )),
        Style::Manual => queue.spawn(suspension::manual::log_via_suspension(
            source,
            Rc::clone(&console),
        )),
    };

    queue.run()?;
    info!(?style, "all routines finished");
    console.finish()?;
    Ok(())
}
