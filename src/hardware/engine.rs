//! Acquisition Engine Interface
//!
//! The translator never talks to the detector directly. Everything it needs is
//! exposed by an acquisition engine: a handle owning the camera configuration
//! (trigger, exposure, binning, ROI, frame-transfer mode, saving streams) and
//! the acquisition itself.
//!
//! The engine is the single source of truth. Implementations must be
//! thread-safe; the translator serializes its own calls but other clients of
//! the same engine may not.
//!
//! # Design
//!
//! - Async (uses #[async_trait])
//! - Thread-safe (requires Send + Sync)
//! - Uses anyhow::Result for errors, which the translator lifts into
//!   [`CcdError::Engine`](crate::error::CcdError::Engine)
//! - One getter/setter pair per configuration field
//!
//! # Example
//!
//! ```rust,ignore
//! async fn arm(engine: &dyn AcquisitionEngine) -> Result<()> {
//!     engine.set_trigger_mode(TrigMode::ExternalSingle).await?;
//!     engine.set_exposure_time(0.5).await?;
//!     engine.start_acq().await
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::core::{
    Bin, CameraModel, EngineStatus, FileStreamParams, Flip, FrameDim, FrameTransferMode, Roi,
    RoiMode, TrigMode,
};

/// Capability: full control of a Frelon acquisition
///
/// Exposure times are in seconds. ROIs are expressed in binned pixel space.
#[async_trait]
pub trait AcquisitionEngine: Send + Sync {
    // ---------------------------------------------------------------------
    // Lifecycle and status
    // ---------------------------------------------------------------------

    /// Hard reset of the camera and the acquisition pipeline.
    async fn reset(&self) -> Result<()>;

    /// Current structured acquisition status.
    async fn status(&self) -> Result<EngineStatus>;

    /// Clear a latched acquisition error.
    async fn reset_status(&self) -> Result<()>;

    /// Raw CCD controller status byte.
    async fn ccd_status(&self) -> Result<u8>;

    /// Frame geometry; `max` selects the full sensor instead of the current ROI.
    async fn frame_dim(&self, max: bool) -> Result<FrameDim>;

    /// ADC depth and model name reported by the camera.
    async fn camera_model(&self) -> Result<CameraModel>;

    // ---------------------------------------------------------------------
    // Timing
    // ---------------------------------------------------------------------

    /// Current trigger mode.
    async fn trigger_mode(&self) -> Result<TrigMode>;
    /// Select the trigger mode.
    async fn set_trigger_mode(&self, mode: TrigMode) -> Result<()>;

    /// Exposure time in seconds.
    async fn exposure_time(&self) -> Result<f64>;
    /// Set the exposure time in seconds.
    async fn set_exposure_time(&self, seconds: f64) -> Result<()>;

    /// Frames per acquisition; 0 runs until stopped.
    async fn nb_frames(&self) -> Result<u32>;
    /// Set the number of frames per acquisition.
    async fn set_nb_frames(&self, nb_frames: u32) -> Result<()>;

    // ---------------------------------------------------------------------
    // Geometry
    // ---------------------------------------------------------------------

    /// Current binning.
    async fn binning(&self) -> Result<Bin>;
    /// Change the binning. The ROI follows so it covers the same sensor area.
    async fn set_binning(&self, bin: Bin) -> Result<()>;

    /// Current ROI in binned pixel space.
    async fn roi(&self) -> Result<Roi>;
    /// Replace the ROI; fails if it does not fit on the binned sensor.
    async fn set_roi(&self, roi: Roi) -> Result<()>;

    /// Image mirroring.
    async fn flip(&self) -> Result<Flip>;
    /// Set image mirroring.
    async fn set_flip(&self, flip: Flip) -> Result<()>;

    /// Sensor readout region mode.
    async fn roi_mode(&self) -> Result<RoiMode>;
    /// Select the sensor readout region mode.
    async fn set_roi_mode(&self, mode: RoiMode) -> Result<()>;

    /// First sensor line used by the kinetics window.
    async fn roi_line_begin(&self) -> Result<u32>;
    /// Move the kinetics window to start at `line`.
    async fn set_roi_line_begin(&self, line: u32) -> Result<()>;

    /// Full-frame or frame-transfer readout.
    async fn frame_transfer_mode(&self) -> Result<FrameTransferMode>;
    /// Select full-frame or frame-transfer readout.
    async fn set_frame_transfer_mode(&self, mode: FrameTransferMode) -> Result<()>;

    /// Number of kinetics stripes concatenated into one frame.
    async fn nb_concat_frames(&self) -> Result<u32>;
    /// Set the number of concatenated stripes.
    async fn set_nb_concat_frames(&self, nb: u32) -> Result<()>;

    /// Input channel selection, as a readout-channel bitmask.
    async fn input_channel(&self) -> Result<u32>;
    /// Select the input channels.
    async fn set_input_channel(&self, channel: u32) -> Result<()>;

    // ---------------------------------------------------------------------
    // Saving
    // ---------------------------------------------------------------------

    /// Saving parameters of file stream `stream`.
    async fn file_stream_params(&self, stream: usize) -> Result<FileStreamParams>;
    /// Replace the saving parameters of file stream `stream`.
    async fn set_file_stream_params(&self, stream: usize, params: FileStreamParams)
        -> Result<()>;

    /// Whether file stream `stream` is saving.
    async fn file_stream_active(&self, stream: usize) -> Result<bool>;
    /// Enable or disable file stream `stream`.
    async fn set_file_stream_active(&self, stream: usize, active: bool) -> Result<()>;

    /// Replace the header fields written into every saved file.
    async fn set_common_file_header(&self, header: BTreeMap<String, String>) -> Result<()>;

    /// Save `count` frames starting at `first`.
    async fn write_file(&self, first: i64, count: u32) -> Result<()>;

    // ---------------------------------------------------------------------
    // Mode switches
    // ---------------------------------------------------------------------

    /// Automatic saving of acquired frames.
    async fn autosave(&self) -> Result<bool>;
    /// Enable or disable automatic saving.
    async fn set_autosave(&self, enabled: bool) -> Result<()>;

    /// Live display of acquired frames.
    async fn live_display(&self) -> Result<bool>;
    /// Enable or disable live display.
    async fn set_live_display(&self, enabled: bool) -> Result<()>;

    /// Concatenation of kinetics stripes into one frame.
    async fn stripe_concat(&self) -> Result<bool>;
    /// Enable or disable stripe concatenation.
    async fn set_stripe_concat(&self, enabled: bool) -> Result<()>;

    /// Sensor-specific image correction.
    async fn e2v_correction_active(&self) -> Result<bool>;
    /// Enable or disable the sensor correction.
    async fn set_e2v_correction_active(&self, active: bool) -> Result<()>;

    // ---------------------------------------------------------------------
    // Acquisition
    // ---------------------------------------------------------------------

    /// Prepare and start an acquisition.
    async fn start_acq(&self) -> Result<()>;
    /// Stop the running acquisition.
    async fn stop_acq(&self) -> Result<()>;
    /// Start an endless acquisition feeding the live display.
    async fn start_live(&self) -> Result<()>;

    /// Raw bytes of `count` consecutive frames starting at `first`.
    async fn read_frames(&self, first: i64, count: u32) -> Result<Vec<u8>>;

    /// Pass a serial command straight to the camera and return its answer.
    async fn exec_serial_command(&self, command: &str) -> Result<String>;

    /// Beam-monitor values appended to the legacy CCD parameter block.
    async fn read_beam_params(&self) -> Result<Vec<f64>>;
}
