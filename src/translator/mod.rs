//! Parameter translator for a Frelon acquisition engine.
//!
//! [`FrelonTranslator`] maps the remote command vocabulary (flat arrays,
//! integer codes, bitmasks, strings) onto [`AcquisitionEngine`] calls and
//! back, enforcing the cross-field rules the engine does not check itself:
//!
//! - trigger mode and exposure time are coupled (see [`coupling`])
//! - binning is transposed on the wire and kinetics windows must respect it
//!   (see [`windowing`])
//! - the mode bitmask mixes engine flags with one translator-held flag
//!   (see [`mode`])
//! - file streams derive their format and overwrite policy (see [`files`])
//! - frame reads are size-checked before and after the engine read
//!   (see [`readout`])
//!
//! # Concurrency
//!
//! Every public operation holds the session lock for its whole duration, so
//! the read-then-write sequences below run as one unit with respect to other
//! callers of the same translator. Internal helpers never take the lock.

pub mod coupling;
pub mod files;
pub mod mode;
pub mod readout;
pub mod status;
pub mod windowing;

use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::error::{CcdError, CcdResult};
use crate::hardware::AcquisitionEngine;

pub use coupling::{TriggerCode, TriggerExposure};
pub use files::{FileParamsReport, FileParamsUpdate};
pub use windowing::{HardwareParams, KineticsWindow};

/// Translator state that the engine does not store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    /// Count acquired rather than saved frames even when autosave is on.
    pub acquire_raw_frames: bool,
}

/// Command translator bound to one acquisition engine.
pub struct FrelonTranslator {
    engine: Arc<dyn AcquisitionEngine>,
    session: Mutex<SessionConfig>,
}

impl FrelonTranslator {
    /// Translator over `engine`, with a fresh session.
    pub fn new(engine: Arc<dyn AcquisitionEngine>) -> Self {
        Self {
            engine,
            session: Mutex::new(SessionConfig::default()),
        }
    }

    /// The engine this translator drives.
    pub fn engine(&self) -> &Arc<dyn AcquisitionEngine> {
        &self.engine
    }

    /// Snapshot of the translator-held session state.
    pub async fn session(&self) -> SessionConfig {
        *self.session.lock().await
    }

    async fn begin(&self) -> MutexGuard<'_, SessionConfig> {
        self.session.lock().await
    }
}

/// Convert a wire integer that must fit a non-negative `u32`.
pub(crate) fn non_negative(value: i64, what: &str) -> CcdResult<u32> {
    u32::try_from(value)
        .map_err(|_| CcdError::InvalidParameter(format!("Invalid {}: {}", what, value)))
}
