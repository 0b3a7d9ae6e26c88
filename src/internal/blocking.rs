//! Drives resolution futures to completion on the calling thread.
//!
//! Synchronous entry points run the same future as their async twins. The
//! driver parks the thread while the future is pending, which keeps nested
//! driving legal: a sync factory may call back into the container while an
//! outer resolution is still being polled on the same thread.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

use futures::channel::oneshot;
use futures::future::BoxFuture;

use crate::error::{DiError, DiResult};

/// Resolution frames polled on one thread before the chain moves on to a
/// fresh one. Keeps deep graphs off the caller's stack.
pub(crate) const FRAMES_PER_THREAD: usize = 16;

const RELAY_STACK_SIZE: usize = 8 * 1024 * 1024;

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Polls `future` on the current thread until it completes.
pub(crate) fn drive<F: Future>(future: F) -> F::Output {
    let mut future = std::pin::pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);

    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            // Spurious wakeups just poll again.
            Poll::Pending => thread::park(),
        }
    }
}

/// Drives `future` on a new thread with its own stack and awaits the result.
///
/// The tokio runtime of the awaiting side, if any, is entered on the new
/// thread. A panic there resumes on the awaiting side.
pub(crate) async fn relay<T: Send + 'static>(future: BoxFuture<'static, DiResult<T>>) -> DiResult<T> {
    let (tx, rx) = oneshot::channel();
    let runtime = tokio::runtime::Handle::try_current().ok();

    thread::Builder::new()
        .name("ferrous-container-resolve".into())
        .stack_size(RELAY_STACK_SIZE)
        .spawn(move || {
            let _entered = runtime.as_ref().map(|handle| handle.enter());
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| drive(future)));
            let _ = tx.send(outcome);
        })
        .map_err(|e| DiError::custom(format!("failed to spawn resolution thread: {}", e)))?;

    match rx.await {
        Ok(Ok(output)) => output,
        Ok(Err(payload)) => panic::resume_unwind(payload),
        Err(_) => Err(DiError::custom("resolution thread exited without a result")),
    }
}
