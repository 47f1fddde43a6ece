//! Diagnostics sink that keeps every reported fault.

use std::sync::{Arc, Mutex};

use krishi_client::{Diagnostics, StorageFault};

#[derive(Debug, Clone, Default)]
pub struct RecordingDiagnostics {
    faults: Arc<Mutex<Vec<StorageFault>>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Faults reported so far, in order.
    pub fn faults(&self) -> Vec<StorageFault> {
        self.faults.lock().unwrap().clone()
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn storage_fault(&self, fault: &StorageFault) {
        self.faults.lock().unwrap().push(fault.clone());
    }
}
