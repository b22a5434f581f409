//! Awaits the value, awaits the bound result once more, prints it, then
//! prints [`LAST_LINE`](super::LAST_LINE). Each await is one trip through the
//! task queue.

pub mod auto {
    use core::fmt::Display;
    use std::rc::Rc;

    use crate::{console::Console, error::Rejected, promise::Promise, two_ways::LAST_LINE};

    pub async fn log_via_suspension<T>(
        source: Promise<T>,
        console: Rc<Console>,
    ) -> Result<(), Rejected>
    where
        T: Clone + Display + 'static,
    {
        let queue = source.queue().clone();
        let res = source.await?;
        let res = queue.resolved(res).await?;
        console.log(res);
        console.log(LAST_LINE);
        Ok(())
    }
}

pub mod manual {
    use core::{
        fmt::Display,
        future::{Future, IntoFuture},
        pin::Pin,
        task::{Context, Poll},
    };
    use std::rc::Rc;

    use futures_lite::ready;
    use pin_project::pin_project;

    use crate::{
        console::Console,
        error::Rejected,
        promise::{Awaiting, Promise},
        queue::TaskQueue,
        two_ways::LAST_LINE,
    };

    pub async fn log_via_suspension<T>(
        source: Promise<T>,
        console: Rc<Console>,
    ) -> Result<(), Rejected>
    where
        T: Clone + Display + 'static,
    {
        LogViaSuspension {
            queue: source.queue().clone(),
            console,
            state: State::AwaitingSource(source.into_future()),
        }
        .await
    }

    #[pin_project(project = StateProj)]
    enum State<T> {
        AwaitingSource(#[pin] Awaiting<T>),
        AwaitingEcho(#[pin] Awaiting<T>),
        Done,
    }

    #[pin_project]
    struct LogViaSuspension<T> {
        queue: TaskQueue,
        console: Rc<Console>,
        #[pin]
        state: State<T>,
    }

    impl<T> Future for LogViaSuspension<T>
    where
        T: Clone + Display + 'static,
    {
        type Output = Result<(), Rejected>;

        fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
            let mut this = self.project();
            loop {
                match this.state.as_mut().project() {
                    StateProj::AwaitingSource(source) => {
                        let res = ready!(source.poll(cx))?;
                        this.state
                            .set(State::AwaitingEcho(this.queue.resolved(res).into_future()));
                    }
                    StateProj::AwaitingEcho(echo) => {
                        let res = ready!(echo.poll(cx))?;
                        this.console.log(res);
                        this.console.log(LAST_LINE);
                        this.state.set(State::Done);
                        break Poll::Ready(Ok(()));
                    }
                    StateProj::Done => panic!("`LogViaSuspension` polled after completion"),
                }
            }
        }
    }
}
