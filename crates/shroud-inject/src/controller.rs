use std::mem;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{info, warn};
use rand_core::CryptoRngCore;

use shroud_core::{ShroudError, ShroudResult};
use shroud_flow::FillerConfig;
use shroud_hal::SessionAdapter;

use crate::require_write_cipher;
use crate::worker::{RunStats, Worker};

/// Cryptographically secure generator owned by a controller.
pub type FillerRng = Box<dyn CryptoRngCore + Send>;

/// Signals for one run, created fresh on every start.
struct Generation {
    cancel: Sender<()>,
    done: JoinHandle<()>,
}

impl Generation {
    fn is_finished(&self) -> bool {
        self.done.is_finished()
    }

    /// Raises cancellation and blocks until the worker has exited.
    fn finish(self) {
        let _ = self.cancel.send(());
        drop(self.cancel);
        if self.done.join().is_err() {
            warn!("filler worker panicked");
        }
    }
}

enum RunState {
    Idle,
    Running(Generation),
}

/// Start/stop lifecycle for filler injection on one session.
///
/// Dropping the controller stops any active run.
pub struct Controller {
    session: Arc<dyn SessionAdapter>,
    config: FillerConfig,
    rng: Arc<Mutex<FillerRng>>,
    stats: Arc<RunStats>,
    state: Mutex<RunState>,
}

impl Controller {
    /// Binds a controller to a session that already has a write cipher.
    pub fn new(
        session: Arc<dyn SessionAdapter>,
        config: FillerConfig,
        rng: FillerRng,
    ) -> ShroudResult<Self> {
        config.validate()?;
        require_write_cipher(&*session)?;
        Ok(Self {
            session,
            config,
            rng: Arc::new(Mutex::new(rng)),
            stats: Arc::new(RunStats::default()),
            state: Mutex::new(RunState::Idle),
        })
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens an injection window. Returns as soon as the worker is launched.
    ///
    /// A run that already ended on its own is reaped and replaced.
    pub fn start(&self) -> ShroudResult<()> {
        let mut state = self.lock_state();
        if let RunState::Running(generation) = &*state {
            if !generation.is_finished() {
                return Err(ShroudError::AlreadyRunning);
            }
        }
        if let RunState::Running(stale) = mem::replace(&mut *state, RunState::Idle) {
            stale.finish();
        }

        self.config.validate()?;
        self.stats.set_last_error(None);

        let (cancel, cancel_rx) = mpsc::channel();
        let worker = Worker {
            session: Arc::clone(&self.session),
            config: self.config,
            rng: Arc::clone(&self.rng),
            stats: Arc::clone(&self.stats),
            cancel: cancel_rx,
        };
        let done = thread::Builder::new()
            .name("shroud-filler".into())
            .spawn(move || worker.run())
            .map_err(|e| ShroudError::Spawn(e.to_string()))?;

        info!(
            "filler window open: len={}..={} interval={:?} initial_delay={:?}",
            self.config.min_len, self.config.max_len, self.config.interval, self.config.initial_delay
        );
        *state = RunState::Running(Generation { cancel, done });
        Ok(())
    }

    /// Closes the injection window. Blocks until the worker has exited, so no
    /// filler record is emitted after this returns. No-op while idle.
    pub fn stop(&self) {
        let mut state = self.lock_state();
        if let RunState::Running(generation) = mem::replace(&mut *state, RunState::Idle) {
            generation.finish();
            info!("filler window closed ({} records total)", self.records_sent());
        }
    }

    /// True exactly while a worker is alive.
    pub fn is_running(&self) -> bool {
        match &*self.lock_state() {
            RunState::Idle => false,
            RunState::Running(generation) => !generation.is_finished(),
        }
    }

    /// Filler records emitted over the controller's lifetime.
    pub fn records_sent(&self) -> u64 {
        self.stats.records_sent.load(Ordering::Relaxed)
    }

    /// The condition that ended the most recent run, if it did not end by `stop`.
    pub fn last_error(&self) -> Option<ShroudError> {
        self.stats.last_error()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}
