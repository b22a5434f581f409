use core::fmt::Display;
use std::rc::Rc;

use crate::{console::Console, promise::Promise};

/// Passes the value through an identity continuation, then prints it from a
/// second one. Returns immediately; nothing prints until the queue drains.
pub fn log_via_continuations<T>(source: &Promise<T>, console: Rc<Console>)
where
    T: Clone + Display + 'static,
{
    source.then(|res| res).then(move |res| console.log(res));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, queue::TaskQueue};

    #[test]
    fn prints_only_after_two_hops() {
        let queue = TaskQueue::new();
        let (console, transcript) = Console::capture();
        log_via_continuations(&queue.resolved("hello"), Rc::new(console));
        assert!(transcript.lines().is_empty());

        // one job for the identity hop, one for the print.
        assert_eq!(queue.drain(), 2);
        assert_eq!(transcript.lines(), ["hello"]);
    }

    #[test]
    fn rejected_source_goes_unhandled() {
        let queue = TaskQueue::new();
        let (console, transcript) = Console::capture();
        log_via_continuations(&queue.rejected::<&str>("no value"), Rc::new(console));
        assert!(matches!(queue.run(), Err(Error::UnhandledRejection(_))));
        assert!(transcript.lines().is_empty());
    }
}
