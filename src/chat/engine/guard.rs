use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use super::ChatEngine;

/// The single conversation every request talks to. Holding the lock is what keeps
/// turns against one history from overlapping.
#[derive(Clone)]
pub struct SharedEngine {
    engine: Arc<Mutex<ChatEngine>>,
}

impl SharedEngine {
    pub fn new(engine: ChatEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Waits for any turn in flight to finish.
    pub async fn lock(&self) -> MutexGuard<'_, ChatEngine> {
        self.engine.lock().await
    }
}
