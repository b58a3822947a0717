use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;

use crate::ignore_poison::IgnorePoison;

// A superseded load may still finish its network calls but must not touch
// shared state; every merge point checks `LoadTicket::is_current`.
#[derive(Debug, Default)]
pub(crate) struct GenerationGuard {
    latest: Arc<AtomicU64>,
    active: Mutex<CancellationToken>,
}

#[derive(Debug, Clone)]
pub(crate) struct LoadTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
    token: CancellationToken,
}

impl GenerationGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&self) -> LoadTicket {
        let token = CancellationToken::new();
        let mut active = self.active.lock_ignore_poison();
        std::mem::replace(&mut *active, token.clone()).cancel();
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        drop(active);
        LoadTicket {
            generation,
            latest: Arc::clone(&self.latest),
            token,
        }
    }

    pub(crate) fn cancel_active(&self) {
        let active = self.active.lock_ignore_poison();
        active.cancel();
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

impl LoadTicket {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_current(&self) -> bool {
        !self.token.is_cancelled() && self.latest.load(Ordering::SeqCst) == self.generation
    }
}
