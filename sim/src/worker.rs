//! The single background worker that runs operations and delivers callbacks.
//!
//! All jobs share one thread, so operations run to completion one at a time in submission
//! order. The thread is started on first use.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::thread;

use tokio::sync::mpsc;

use crate::config;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Worker {
    /// `None` when the thread could not be spawned.
    sender: Option<mpsc::UnboundedSender<Job>>,
}

static WORKER: OnceLock<Worker> = OnceLock::new();

impl Worker {
    fn start() -> Self {
        let name = config::current().worker_thread_name.clone();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();

        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            while let Some(job) = receiver.blocking_recv() {
                run_guarded(job);
            }
        });

        match spawned {
            Ok(_) => {
                tracing::debug!(thread = %name, "Operation worker started");
                Self {
                    sender: Some(sender),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to start operation worker, running jobs inline");
                Self { sender: None }
            }
        }
    }
}

/// Queue `job` on the worker. Never blocks on the job itself.
pub(crate) fn dispatch<F>(job: F)
where
    F: FnOnce() + Send + 'static,
{
    let worker = WORKER.get_or_init(Worker::start);
    let job: Job = Box::new(job);

    match &worker.sender {
        Some(sender) => {
            if let Err(mpsc::error::SendError(job)) = sender.send(job) {
                tracing::error!("Operation worker stopped, running job inline");
                run_guarded(job);
            }
        }
        None => run_guarded(job),
    }
}

fn run_guarded(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        tracing::error!(panic = panic_message(&*payload), "Operation callback panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
