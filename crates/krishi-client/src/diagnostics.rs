//! Storage fault reporting.
//!
//! Reads of corrupt or unreachable storage degrade to "empty" so the app keeps
//! working. Every such degradation is reported here so data loss is visible.

use tracing::warn;

/// A storage problem the client recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageFault {
    /// The store could not be read.
    ReadFailed { key: String, reason: String },
    /// The stored value could not be decoded and was treated as empty.
    Corrupt { key: String, reason: String },
    /// The store could not be written.
    WriteFailed { key: String, reason: String },
}

impl StorageFault {
    /// Storage key involved.
    pub fn key(&self) -> &str {
        match self {
            Self::ReadFailed { key, .. } | Self::Corrupt { key, .. } | Self::WriteFailed { key, .. } => {
                key
            }
        }
    }
}

/// Observer for recovered storage faults.
pub trait Diagnostics: Send + Sync {
    fn storage_fault(&self, fault: &StorageFault);
}

/// Reports faults as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn storage_fault(&self, fault: &StorageFault) {
        let key = fault.key();
        match fault {
            StorageFault::ReadFailed { reason, .. } => {
                warn!(key = %key, "Storage read failed, treating as empty: {}", reason)
            }
            StorageFault::Corrupt { reason, .. } => {
                warn!(key = %key, "Stored value corrupt, treating as empty: {}", reason)
            }
            StorageFault::WriteFailed { reason, .. } => {
                warn!(key = %key, "Storage write failed: {}", reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_key() {
        let fault = StorageFault::Corrupt {
            key: "krishi_offline_queue".to_string(),
            reason: "expected value".to_string(),
        };
        assert_eq!(fault.key(), "krishi_offline_queue");
        TracingDiagnostics.storage_fault(&fault);
    }
}
