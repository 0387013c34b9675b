use super::Job;
use crossbeam_channel::Receiver;
use crossbeam_utils::CachePadded;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Job counters shared by the pool handle and every worker.
///
/// Each counter sits on its own cache line; `completed` is bumped by every
/// worker after every job.
#[derive(Default, Debug)]
pub(crate) struct Counters {
    pub(crate) submitted: CachePadded<AtomicUsize>,
    pub(crate) completed: CachePadded<AtomicUsize>,
    pub(crate) panicked: CachePadded<AtomicUsize>,
}

/// Body of a single worker thread.
///
/// Dequeues jobs from the shared queue and runs them one at a time until the
/// queue is both closed and empty. A panicking job is caught, logged and
/// counted; the worker then moves on to the next job, so one bad job never
/// takes a thread out of the pool.
///
/// # Arguments
///
/// - `worker_id`: Index of this worker, used for logs only.
/// - `rx`: Receiving half of the shared job queue.
/// - `counters`: Pool-wide completion and panic counters.
pub(crate) fn worker_loop(_worker_id: usize, rx: Receiver<Job>, counters: &Counters) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {} started", _worker_id);

    // `iter` ends once every sender is gone and the buffer is drained.
    for job in rx.iter() {
        match catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                let _message = panic_message(payload.as_ref());
                #[cfg(feature = "tracing")]
                tracing::error!("Worker {} caught a panicking job: {}", _worker_id, _message);
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {} stopped", _worker_id);
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
