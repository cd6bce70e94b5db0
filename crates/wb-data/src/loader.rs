//! Single-flight file loading
//!
//! Only one decode may be in flight per store. A load requested while another
//! is pending is rejected with [`DataError::LoadInProgress`]; the pending load
//! is never cancelled.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::sources::{RawTable, TableSource};
use crate::DataError;

/// Guards file decoding so that loads never overlap
#[derive(Debug, Clone, Default)]
pub struct DatasetLoader {
    in_flight: Arc<Mutex<Option<String>>>,
}

/// Released when dropped, on success or failure
#[derive(Debug)]
pub struct LoadTicket {
    slot: Arc<Mutex<Option<String>>>,
}

impl Drop for LoadTicket {
    fn drop(&mut self) {
        self.slot.lock().take();
    }
}

impl DatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the source currently decoding, if any
    pub fn in_flight(&self) -> Option<String> {
        self.in_flight.lock().clone()
    }

    /// Claim the loader for `source_name`
    pub fn try_begin(&self, source_name: &str) -> Result<LoadTicket, DataError> {
        let mut slot = self.in_flight.lock();
        if let Some(pending) = slot.as_ref() {
            warn!(pending = %pending, requested = source_name, "Rejected overlapping load");
            return Err(DataError::LoadInProgress);
        }
        *slot = Some(source_name.to_string());

        Ok(LoadTicket {
            slot: self.in_flight.clone(),
        })
    }

    /// Decode a source, rejecting the call if another load is pending
    pub async fn load(&self, source: &dyn TableSource) -> Result<RawTable, DataError> {
        let _ticket = self.try_begin(source.source_name())?;
        info!(source = source.source_name(), "Decoding file");
        source.read_table().await
    }
}
