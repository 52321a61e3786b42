// Keyhook Dispatcher
// Fire-and-forget execution of hotkey actions off the hook thread

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use parking_lot::{Mutex, RwLock};

use crate::registry::{Binding, HotkeyId};
use crate::Combo;

/// Default number of worker threads
pub const DEFAULT_WORKERS: usize = 2;

/// Errors that can occur in the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to spawn dispatch worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("dispatch queue is closed")]
    Closed,
}

/// Report for an action that panicked on a worker
#[derive(Debug, Clone)]
pub struct ActionFailure {
    pub id: HotkeyId,
    pub combo: Combo,
    pub message: String,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action for {} ({}) failed: {}", self.combo, self.id, self.message)
    }
}

/// Callback receiving action failures
pub type FailureHandler = Arc<dyn Fn(&ActionFailure) + Send + Sync + 'static>;

fn log_failure(failure: &ActionFailure) {
    log::error!("{}", failure);
}

/// Worker pool running hotkey actions.
///
/// `submit` never waits for the action. Workers are detached: an action that
/// is already queued runs to completion even after the dispatcher is dropped.
pub struct Dispatcher {
    sender: Sender<Binding>,
    on_failure: Arc<RwLock<FailureHandler>>,
    workers: usize,
}

impl Dispatcher {
    /// Spawn a dispatcher with `workers` threads (at least one)
    pub fn new(workers: usize) -> Result<Self, DispatchError> {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel::<Binding>();
        let receiver = Arc::new(Mutex::new(receiver));
        let default_handler: FailureHandler = Arc::new(log_failure);
        let on_failure = Arc::new(RwLock::new(default_handler));

        for index in 0..workers {
            let receiver = receiver.clone();
            let on_failure = on_failure.clone();
            thread::Builder::new()
                .name(format!("keyhook-dispatch-{}", index))
                .spawn(move || worker_loop(&receiver, &on_failure))?;
        }

        log::debug!("Dispatcher started with {} worker(s)", workers);
        Ok(Self {
            sender,
            on_failure,
            workers,
        })
    }

    /// Queue a binding's action and return immediately
    pub fn submit(&self, binding: Binding) -> Result<(), DispatchError> {
        self.sender.send(binding).map_err(|_| DispatchError::Closed)
    }

    /// Replace the failure handler (the default logs the failure)
    pub fn set_failure_handler(&self, handler: FailureHandler) {
        *self.on_failure.write() = handler;
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

fn worker_loop(receiver: &Mutex<Receiver<Binding>>, on_failure: &RwLock<FailureHandler>) {
    loop {
        // Hold the receiver only while waiting, never while running the action
        let next = receiver.lock().recv();
        let binding = match next {
            Ok(binding) => binding,
            Err(_) => break,
        };

        log::trace!("Running action for {}", binding.combo());
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| binding.invoke())) {
            let failure = ActionFailure {
                id: binding.id(),
                combo: binding.combo(),
                message: panic_message(payload.as_ref()),
            };
            let handler = on_failure.read().clone();
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&failure))).is_err() {
                log::error!("Failure handler panicked while reporting: {}", failure);
            }
        }
    }
    log::trace!("Dispatch worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "action panicked".to_string()
    }
}
