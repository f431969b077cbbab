//! Trigger mode / exposure time coupling.
//!
//! An exposure time of zero means "externally gated": the exposure window is
//! the gate signal itself. The engine does not know this, so the translator
//! keeps the two fields consistent:
//!
//! - a non-zero exposure moves an `ExternalGate` trigger to `ExternalSingle`
//! - a zero exposure moves any external trigger to `ExternalGate`, and is
//!   refused with an internal trigger
//! - while gated, the reported exposure is zero whatever the engine stores
//!
//! The rules are pure functions over a [`TriggerExposure`] snapshot; the
//! translator methods at the bottom only read the snapshot and write the diff.

use tracing::debug;

use super::FrelonTranslator;
use crate::core::TrigMode;
use crate::error::{CcdError, CcdResult};

/// Wire trigger codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerCode {
    /// Internal trigger
    Internal,
    /// Single external trigger, or gate when the exposure is unset.
    External,
    /// One external trigger per frame
    ExternalMultiple,
}

impl TriggerCode {
    /// Decode a wire code in `0..=2`.
    pub fn from_wire(code: i64) -> CcdResult<Self> {
        match code {
            0 => Ok(TriggerCode::Internal),
            1 => Ok(TriggerCode::External),
            2 => Ok(TriggerCode::ExternalMultiple),
            other => Err(CcdError::InvalidParameter(format!(
                "Invalid ext. trig: {}",
                other
            ))),
        }
    }

    /// Wire code of this trigger.
    pub fn wire(self) -> i64 {
        match self {
            TriggerCode::Internal => 0,
            TriggerCode::External => 1,
            TriggerCode::ExternalMultiple => 2,
        }
    }
}

/// The two coupled engine fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerExposure {
    /// Engine trigger mode
    pub trigger: TrigMode,
    /// Stored engine exposure in seconds
    pub exposure: f64,
}

/// Exposure as seen by clients: zero while gated.
pub fn reported_exposure(state: &TriggerExposure) -> f64 {
    if state.trigger == TrigMode::ExternalGate {
        0.0
    } else {
        state.exposure
    }
}

/// Engine trigger mode selected by a wire code in the given state.
pub fn trigger_for_code(code: TriggerCode, state: &TriggerExposure) -> TrigMode {
    match code {
        TriggerCode::Internal => TrigMode::Internal,
        TriggerCode::External if reported_exposure(state) == 0.0 => TrigMode::ExternalGate,
        TriggerCode::External => TrigMode::ExternalSingle,
        TriggerCode::ExternalMultiple => TrigMode::ExternalMultiple,
    }
}

/// Wire code for an engine trigger mode.
pub fn trigger_code(mode: TrigMode) -> CcdResult<TriggerCode> {
    match mode {
        TrigMode::Internal => Ok(TriggerCode::Internal),
        TrigMode::ExternalGate | TrigMode::ExternalSingle => Ok(TriggerCode::External),
        TrigMode::ExternalMultiple => Ok(TriggerCode::ExternalMultiple),
        other => Err(CcdError::InvalidState(format!(
            "Invalid trigger mode: {}",
            other
        ))),
    }
}

/// State after a client sets the exposure to `seconds`.
///
/// A zero exposure leaves the stored engine exposure untouched.
pub fn apply_exposure(state: TriggerExposure, seconds: f64) -> CcdResult<TriggerExposure> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(CcdError::InvalidParameter(format!(
            "Invalid exposure time: {}",
            seconds
        )));
    }
    if seconds == 0.0 {
        if state.trigger == TrigMode::Internal {
            return Err(CcdError::InvalidParameter(
                "Invalid zero exposure time with internal trigger".to_string(),
            ));
        }
        return Ok(TriggerExposure {
            trigger: TrigMode::ExternalGate,
            ..state
        });
    }
    let trigger = if state.trigger == TrigMode::ExternalGate {
        TrigMode::ExternalSingle
    } else {
        state.trigger
    };
    Ok(TriggerExposure {
        trigger,
        exposure: seconds,
    })
}

impl FrelonTranslator {
    pub(crate) async fn read_trigger_exposure(&self) -> CcdResult<TriggerExposure> {
        Ok(TriggerExposure {
            trigger: self.engine.trigger_mode().await?,
            exposure: self.engine.exposure_time().await?,
        })
    }

    /// Select the trigger mode from its wire code.
    pub async fn set_trigger(&self, code: i64) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting trigger: {}", code);
        let code = TriggerCode::from_wire(code)?;
        let state = self.read_trigger_exposure().await?;
        let mode = trigger_for_code(code, &state);
        debug!("Setting trigger mode: {}", mode);
        self.engine.set_trigger_mode(mode).await?;
        Ok(())
    }

    /// Wire trigger code of the engine trigger mode.
    pub async fn get_trigger(&self) -> CcdResult<i64> {
        let _session = self.begin().await;
        let mode = self.engine.trigger_mode().await?;
        let code = trigger_code(mode)?.wire();
        debug!("Getting trigger: {} ({})", code, mode);
        Ok(code)
    }

    /// Set the exposure time in seconds; zero selects gated exposure.
    pub async fn set_exp_time(&self, seconds: f64) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting exp. time: {}", seconds);
        let current = self.read_trigger_exposure().await?;
        let next = apply_exposure(current, seconds)?;
        if next.trigger != current.trigger {
            debug!("Changing trigger mode: {} -> {}", current.trigger, next.trigger);
            self.engine.set_trigger_mode(next.trigger).await?;
        }
        if seconds != 0.0 {
            self.engine.set_exposure_time(next.exposure).await?;
        }
        Ok(())
    }

    /// Exposure in seconds as seen by clients.
    pub async fn get_exp_time(&self) -> CcdResult<f64> {
        let _session = self.begin().await;
        self.exp_time().await
    }

    pub(crate) async fn exp_time(&self) -> CcdResult<f64> {
        let state = self.read_trigger_exposure().await?;
        let exp_time = reported_exposure(&state);
        debug!("Getting exp. time: {}", exp_time);
        Ok(exp_time)
    }
}
