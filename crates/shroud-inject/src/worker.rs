use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};

use shroud_core::{ShroudError, ShroudResult};
use shroud_flow::{FillerConfig, Pacer};
use shroud_hal::SessionAdapter;

use crate::controller::FillerRng;
use crate::inject::inject_one;

/// Counters shared between a controller and its workers.
#[derive(Default)]
pub(crate) struct RunStats {
    pub records_sent: AtomicU64,
    pub last_error: Mutex<Option<ShroudError>>,
}

impl RunStats {
    pub fn set_last_error(&self, err: Option<ShroudError>) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = err;
    }

    pub fn last_error(&self) -> Option<ShroudError> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// One injection run. Lives on its own thread and exits on cancellation or
/// on the first run-fatal condition.
pub(crate) struct Worker {
    pub session: Arc<dyn SessionAdapter>,
    pub config: FillerConfig,
    pub rng: Arc<Mutex<FillerRng>>,
    pub stats: Arc<RunStats>,
    pub cancel: Receiver<()>,
}

impl Worker {
    pub fn run(self) {
        let mut sent = 0u64;
        match self.drive(&mut sent) {
            Ok(()) => debug!("filler run cancelled after {} records", sent),
            Err(e) => {
                warn!("filler run aborted after {} records: {}", sent, e);
                self.stats.set_last_error(Some(e));
            }
        }
    }

    fn drive(&self, sent: &mut u64) -> ShroudResult<()> {
        let mut pacer = Pacer::new(&self.config);
        loop {
            if let Some(wait) = pacer.next_wait() {
                if self.cancelled_within(wait) {
                    return Ok(());
                }
            }
            if self.cancelled() {
                return Ok(());
            }

            {
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                inject_one(&*self.session, &self.config, &mut **rng)?;
            }
            *sent += 1;
            self.stats.records_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    // A dropped sender counts as cancellation.
    fn cancelled(&self) -> bool {
        !matches!(self.cancel.try_recv(), Err(TryRecvError::Empty))
    }

    fn cancelled_within(&self, wait: Duration) -> bool {
        !matches!(self.cancel.recv_timeout(wait), Err(RecvTimeoutError::Timeout))
    }
}
