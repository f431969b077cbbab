//! Device state, identification and legacy queries.

use tracing::{debug, error, info};

use super::FrelonTranslator;
use crate::core::{AcqStatus, DeviceState, EngineStatus, FrameDim};
use crate::error::{CcdError, CcdResult};

/// Marker preceding the image counters in the engine status text.
const COUNTERS_MARKER: &str = ", ImageCounters";

/// Legacy model code of 16-bit cameras.
pub const MODEL_CODE_16_BIT: i64 = 2016;
/// Legacy model code of 14-bit cameras.
pub const MODEL_CODE_14_BIT: i64 = 2014;

/// Index of the beam parameter cleared when the exposure is gated.
const GATED_BEAM_PARAM: usize = 19;

/// Diagnostic carried by an acquisition fault.
///
/// The engine status text is cut before its image counters and closed with
/// `>`; a text without counters is left as is.
pub fn fault_message(status: &EngineStatus) -> String {
    truncate_status_text(&format!("Acquisition error: {}", status))
}

fn truncate_status_text(text: &str) -> String {
    match text.find(COUNTERS_MARKER) {
        Some(pos) => format!("{}>", &text[..pos]),
        None => text.to_string(),
    }
}

/// Device state for an engine acquisition status, if it has one.
pub fn state_for_status(status: AcqStatus) -> Option<DeviceState> {
    match status {
        AcqStatus::Running => Some(DeviceState::Acquiring),
        AcqStatus::Ready => Some(DeviceState::Ready),
        _ => None,
    }
}

impl FrelonTranslator {
    /// Hard reset of the camera.
    pub async fn reset(&self) -> CcdResult<()> {
        let _session = self.begin().await;
        info!("Resetting camera");
        self.engine.reset().await?;
        Ok(())
    }

    /// Current device state.
    ///
    /// A faulted acquisition resets the engine error status and returns
    /// [`CcdError::AcquisitionFault`].
    pub async fn state(&self) -> CcdResult<DeviceState> {
        let _session = self.begin().await;
        self.device_state().await
    }

    pub(crate) async fn device_state(&self) -> CcdResult<DeviceState> {
        let status = self.engine.status().await?;
        match state_for_status(status.acquisition) {
            Some(state) => {
                debug!("Getting state: {}", state);
                Ok(state)
            }
            None => {
                let message = fault_message(&status);
                error!("{}", message);
                self.engine.reset_status().await?;
                Err(CcdError::AcquisitionFault(message))
            }
        }
    }

    /// Human-readable state with the raw CCD status byte.
    pub async fn status_text(&self) -> CcdResult<String> {
        let _session = self.begin().await;
        let state = self.device_state().await?;
        let ccd_status = self.engine.ccd_status().await?;
        let text = format!("{} (CCD Status: 0x{:02X})", state.description(), ccd_status);
        debug!("Getting status: {}", text);
        Ok(text)
    }

    /// Frame geometry of the sensor (`max`) or of the current ROI.
    pub async fn frame_dim(&self, max: bool) -> CcdResult<FrameDim> {
        let _session = self.begin().await;
        Ok(self.engine.frame_dim(max).await?)
    }

    /// Legacy camera type code, derived from the ADC depth.
    pub async fn model_code(&self) -> CcdResult<i64> {
        let _session = self.begin().await;
        let model = self.engine.camera_model().await?;
        let code = if model.adc_bits == 16 {
            MODEL_CODE_16_BIT
        } else {
            MODEL_CODE_14_BIT
        };
        debug!("Getting type: {} ({})", code, model.name);
        Ok(code)
    }

    /// No error buffer is kept; always empty.
    pub fn last_error_message(&self) -> String {
        String::new()
    }

    /// Number of configuration changes not yet applied; always zero.
    pub fn pending_change_count(&self) -> i64 {
        0
    }

    /// Pass `command` to the camera and return its answer.
    pub async fn exec_serial_command(&self, command: &str) -> CcdResult<String> {
        let _session = self.begin().await;
        debug!("Executing serial command: {}", command);
        Ok(self.engine.exec_serial_command(command).await?)
    }

    /// Beam-monitor values.
    pub async fn beam_params(&self) -> CcdResult<Vec<f64>> {
        let _session = self.begin().await;
        Ok(self.engine.read_beam_params().await?)
    }

    /// Legacy parameter block: exposure, unsupported fields, sensor size,
    /// current ROI and beam parameters.
    pub async fn legacy_ccd_params(&self) -> CcdResult<Vec<f64>> {
        let _session = self.begin().await;
        let exp_time = self.exp_time().await?;
        let max_dim = self.engine.frame_dim(true).await?;
        let roi = self.roi_corners().await?;

        let threshold = 0.0;
        let calib_intensity = -1.0;
        let is_live = -1.0;
        let mut params = vec![
            exp_time,
            threshold,
            calib_intensity,
            f64::from(max_dim.size.width),
            f64::from(max_dim.size.height),
        ];
        params.extend(roi.iter().map(|&v| f64::from(v)));
        params.push(is_live);

        let mut beam = self.engine.read_beam_params().await?;
        if exp_time == 0.0 {
            if let Some(value) = beam.get_mut(GATED_BEAM_PARAM) {
                *value = 0.0;
            }
        }
        params.extend(beam);
        debug!("Getting CCD params: {:?}", params);
        Ok(params)
    }
}
