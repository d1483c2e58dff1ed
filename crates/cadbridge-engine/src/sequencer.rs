//! Execution sequencer
//!
//! The kernel and the script engine hold non-Send state (`Rc<RefCell<...>>`),
//! so they live on one owning context and every operation is shipped to it
//! as a job over a channel. Jobs run one at a time in submission order;
//! results come back over a oneshot.
//!
//! Two owning contexts are supported:
//!
//! - [`Sequencer::spawn`] starts a dedicated thread that blocks on the queue
//! - [`Sequencer::detached`] hands back a [`Pump`] for a host loop that
//!   already owns the state and drains the queue from its own timer
//!
//! A panicking job is caught and reported as an internal error; the owning
//! context keeps serving the queue.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::{BridgeError, Result};

/// Default time a caller waits for its job
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Handle that submits jobs to the owning context
///
/// This is Send + Sync and can be cloned and shared between tasks.
pub struct Sequencer<S> {
    sender: mpsc::UnboundedSender<Job<S>>,
    timeout: Duration,
}

impl<S> Clone for Sequencer<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: 'static> Sequencer<S> {
    /// Start a dedicated thread that builds the state with `init` and runs
    /// jobs until every handle is dropped
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<F>(name: &str, timeout: Duration, init: F) -> Result<Self>
    where
        F: FnOnce() -> S + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<S>>();

        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut state = init();
                tracing::debug!("Owning context started");
                while let Some(job) = rx.blocking_recv() {
                    job(&mut state);
                }
                tracing::debug!("Owning context stopped");
            })
            .map_err(|e| BridgeError::Connection(format!("cannot start owning context: {e}")))?;

        Ok(Self { sender: tx, timeout })
    }

    /// Create a sequencer whose queue is drained by the returned [`Pump`]
    pub fn detached(timeout: Duration) -> (Self, Pump<S>) {
        let (tx, rx) = mpsc::unbounded_channel::<Job<S>>();
        (
            Self { sender: tx, timeout },
            Pump {
                receiver: rx,
                closed: false,
            },
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queue a task and return a handle to its result
    ///
    /// # Errors
    /// Returns [`BridgeError::Connection`] if the owning context is gone.
    pub fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T> + Send + 'static,
    {
        let (respond, rx) = oneshot::channel();
        let job: Job<S> = Box::new(move |state| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| task(state)))
                .unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::error!("Task panicked: {}", message);
                    Err(BridgeError::Internal(format!("task panicked: {message}")))
                });
            // The caller may have given up waiting
            let _ = respond.send(result);
        });

        self.sender
            .send(job)
            .map_err(|_| BridgeError::Connection("owning context has shut down".into()))?;

        Ok(TaskHandle {
            receiver: rx,
            timeout: self.timeout,
        })
    }

    /// Submit a task and wait for its result
    pub async fn run<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut S) -> Result<T> + Send + 'static,
    {
        self.submit(task)?.wait().await
    }

    /// Whether the owning context still accepts jobs
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Pending result of a submitted task
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T>>,
    timeout: Duration,
}

impl<T> TaskHandle<T> {
    /// Wait for the result, giving up after the sequencer's timeout
    ///
    /// A timed-out task is not cancelled; it still runs when its turn comes.
    pub async fn wait(self) -> Result<T> {
        match tokio::time::timeout(self.timeout, self.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BridgeError::Internal("task dropped without a result".into())),
            Err(_) => Err(BridgeError::Timeout(millis(self.timeout))),
        }
    }

    /// Block the current thread until the result arrives
    ///
    /// Must not be called from the owning context itself.
    pub fn blocking_wait(self) -> Result<T> {
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| Err(BridgeError::Internal("task dropped without a result".into())))
    }
}

/// Queue drain for a host loop that owns the state
pub struct Pump<S> {
    receiver: mpsc::UnboundedReceiver<Job<S>>,
    closed: bool,
}

impl<S> Pump<S> {
    /// Run every queued job, returning how many ran
    pub fn drain(&mut self, state: &mut S) -> usize {
        let mut ran = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(job) => {
                    job(state);
                    ran += 1;
                }
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        ran
    }

    /// Whether every sequencer handle has been dropped
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain on a fixed interval until every handle is dropped
    pub fn run_polling(mut self, state: &mut S, interval: Duration) {
        while !self.closed {
            if self.drain(state) == 0 {
                thread::sleep(interval);
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
