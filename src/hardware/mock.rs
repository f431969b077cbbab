//! Mock Acquisition Engine
//!
//! Provides a simulated Frelon acquisition engine for testing without a camera.
//! All state lives in memory behind a `parking_lot::Mutex`; no call blocks or
//! sleeps, so the mock can be shared freely between the translator and tests.
//!
//! # Behaviour
//!
//! - Frame dimensions follow the current ROI (binned space), 16-bit pixels
//! - Frame bytes are deterministic: byte `i` of a read is `i % 251`
//! - `start_acq` and `start_live` move the status to running, `stop_acq` back to ready
//! - Faults and short reads can be injected to exercise translator error paths
//! - Status resets, frame reads and file writes are recorded for assertions

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{
    AcqError, AcqStatus, Bin, CameraModel, EngineStatus, FileStreamParams, Flip, FrameDim,
    FrameTransferMode, ImageType, Point, Roi, RoiMode, Size, TrigMode,
};
use crate::hardware::engine::AcquisitionEngine;

/// Number of saving streams exposed by the engine.
pub const NB_FILE_STREAMS: usize = 2;

/// Sensor description used to build a [`MockEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockSensor {
    /// Sensor columns
    pub width: u32,
    /// Sensor rows
    pub height: u32,
    /// ADC resolution reported by the camera model
    pub adc_bits: u8,
    /// Model name
    pub model: String,
    /// Values returned by `read_beam_params`
    pub beam_params: Vec<f64>,
}

impl Default for MockSensor {
    fn default() -> Self {
        Self {
            width: 2048,
            height: 2048,
            adc_bits: 16,
            model: "Frelon 2k16".to_string(),
            beam_params: vec![0.0; 20],
        }
    }
}

struct MockState {
    status: EngineStatus,
    ccd_status: u8,
    trigger: TrigMode,
    exposure: f64,
    nb_frames: u32,
    bin: Bin,
    roi: Roi,
    flip: Flip,
    roi_mode: RoiMode,
    line_begin: u32,
    ft_mode: FrameTransferMode,
    nb_concat: u32,
    input_channel: u32,
    streams: [FileStreamParams; NB_FILE_STREAMS],
    stream_active: [bool; NB_FILE_STREAMS],
    header: BTreeMap<String, String>,
    autosave: bool,
    live_display: bool,
    stripe_concat: bool,
    e2v_correction: bool,
    short_read: Option<usize>,
    reset_calls: usize,
    reset_status_calls: usize,
    read_calls: usize,
    writes: Vec<(i64, u32)>,
    serial_log: Vec<String>,
}

/// In-memory simulated acquisition engine.
///
/// # Example
///
/// ```rust,ignore
/// let engine = Arc::new(MockEngine::new());
/// let translator = FrelonTranslator::new(engine.clone());
/// engine.inject_fault(AcqError::CameraError);
/// assert!(translator.state().await.is_err());
/// assert_eq!(engine.reset_status_calls(), 1);
/// ```
pub struct MockEngine {
    sensor: MockSensor,
    state: Mutex<MockState>,
}

impl MockEngine {
    /// Create a mock 2048x2048 16-bit camera.
    pub fn new() -> Self {
        Self::with_sensor(MockSensor::default())
    }

    /// Create a mock camera with the given sensor.
    pub fn with_sensor(sensor: MockSensor) -> Self {
        let full = Roi::new(Point::default(), Size::new(sensor.width, sensor.height));
        let state = MockState {
            status: EngineStatus::default(),
            ccd_status: 0,
            trigger: TrigMode::Internal,
            exposure: 1.0,
            nb_frames: 1,
            bin: Bin::default(),
            roi: full,
            flip: Flip::default(),
            roi_mode: RoiMode::None,
            line_begin: 0,
            ft_mode: FrameTransferMode::FullFrame,
            nb_concat: 1,
            input_channel: 0xf,
            streams: Default::default(),
            stream_active: [false; NB_FILE_STREAMS],
            header: BTreeMap::new(),
            autosave: false,
            live_display: false,
            stripe_concat: false,
            e2v_correction: true,
            short_read: None,
            reset_calls: 0,
            reset_status_calls: 0,
            read_calls: 0,
            writes: Vec::new(),
            serial_log: Vec::new(),
        };
        Self {
            sensor,
            state: Mutex::new(state),
        }
    }

    // ---------------------------------------------------------------------
    // Injection
    // ---------------------------------------------------------------------

    /// Put the acquisition in fault with the given cause.
    pub fn inject_fault(&self, error: AcqError) {
        let mut state = self.state.lock();
        state.status.acquisition = AcqStatus::Fault;
        state.status.error = error;
    }

    /// Force an arbitrary acquisition status.
    pub fn set_acq_status(&self, status: AcqStatus) {
        self.state.lock().status.acquisition = status;
    }

    /// Set the acquired and saved frame counters.
    pub fn set_image_counters(&self, last_acquired: i64, last_saved: i64) {
        let mut state = self.state.lock();
        state.status.image_counters.last_image_acquired = last_acquired;
        state.status.image_counters.last_image_saved = last_saved;
    }

    /// Set the raw CCD controller status byte.
    pub fn set_ccd_status(&self, status: u8) {
        self.state.lock().ccd_status = status;
    }

    /// Truncate every following frame read to `len` bytes.
    pub fn inject_short_read(&self, len: usize) {
        self.state.lock().short_read = Some(len);
    }

    // ---------------------------------------------------------------------
    // Observation
    // ---------------------------------------------------------------------

    /// Number of `reset` calls.
    pub fn reset_calls(&self) -> usize {
        self.state.lock().reset_calls
    }

    /// Number of `reset_status` calls.
    pub fn reset_status_calls(&self) -> usize {
        self.state.lock().reset_status_calls
    }

    /// Number of `read_frames` calls.
    pub fn read_calls(&self) -> usize {
        self.state.lock().read_calls
    }

    /// `(first, count)` of every `write_file` call, oldest first.
    pub fn writes(&self) -> Vec<(i64, u32)> {
        self.state.lock().writes.clone()
    }

    /// Header last set with `set_common_file_header`.
    pub fn common_header(&self) -> BTreeMap<String, String> {
        self.state.lock().header.clone()
    }

    /// Serial commands received, oldest first.
    pub fn serial_log(&self) -> Vec<String> {
        self.state.lock().serial_log.clone()
    }

    fn check_stream(stream: usize) -> Result<()> {
        if stream >= NB_FILE_STREAMS {
            return Err(anyhow!("Invalid file stream index: {}", stream));
        }
        Ok(())
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AcquisitionEngine for MockEngine {
    async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.reset_calls += 1;
        state.status = EngineStatus::default();
        state.bin = Bin::default();
        state.roi = Roi::new(
            Point::default(),
            Size::new(self.sensor.width, self.sensor.height),
        );
        state.roi_mode = RoiMode::None;
        state.line_begin = 0;
        debug!("MockEngine: reset");
        Ok(())
    }

    async fn status(&self) -> Result<EngineStatus> {
        Ok(self.state.lock().status)
    }

    async fn reset_status(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.reset_status_calls += 1;
        if state.status.acquisition == AcqStatus::Fault {
            state.status.acquisition = AcqStatus::Ready;
        }
        state.status.error = AcqError::NoError;
        Ok(())
    }

    async fn ccd_status(&self) -> Result<u8> {
        Ok(self.state.lock().ccd_status)
    }

    async fn frame_dim(&self, max: bool) -> Result<FrameDim> {
        let size = if max {
            Size::new(self.sensor.width, self.sensor.height)
        } else {
            self.state.lock().roi.size
        };
        Ok(FrameDim::new(size, ImageType::Bpp16))
    }

    async fn camera_model(&self) -> Result<CameraModel> {
        Ok(CameraModel {
            adc_bits: self.sensor.adc_bits,
            name: self.sensor.model.clone(),
        })
    }

    async fn trigger_mode(&self) -> Result<TrigMode> {
        Ok(self.state.lock().trigger)
    }

    async fn set_trigger_mode(&self, mode: TrigMode) -> Result<()> {
        self.state.lock().trigger = mode;
        Ok(())
    }

    async fn exposure_time(&self) -> Result<f64> {
        Ok(self.state.lock().exposure)
    }

    async fn set_exposure_time(&self, seconds: f64) -> Result<()> {
        self.state.lock().exposure = seconds;
        Ok(())
    }

    async fn nb_frames(&self) -> Result<u32> {
        Ok(self.state.lock().nb_frames)
    }

    async fn set_nb_frames(&self, nb_frames: u32) -> Result<()> {
        self.state.lock().nb_frames = nb_frames;
        Ok(())
    }

    async fn binning(&self) -> Result<Bin> {
        Ok(self.state.lock().bin)
    }

    async fn set_binning(&self, bin: Bin) -> Result<()> {
        let mut state = self.state.lock();
        // Keep the ROI on the same sensor area under the new binning.
        let unbinned = state.roi.unbinned(state.bin);
        state.roi = unbinned.binned(bin);
        state.bin = bin;
        Ok(())
    }

    async fn roi(&self) -> Result<Roi> {
        Ok(self.state.lock().roi)
    }

    async fn set_roi(&self, roi: Roi) -> Result<()> {
        let mut state = self.state.lock();
        let max = Size::new(
            self.sensor.width / state.bin.x,
            self.sensor.height / state.bin.y,
        );
        let end_x = u64::from(roi.top_left.x) + u64::from(roi.size.width);
        let end_y = u64::from(roi.top_left.y) + u64::from(roi.size.height);
        if roi.size.width == 0
            || roi.size.height == 0
            || end_x > u64::from(max.width)
            || end_y > u64::from(max.height)
        {
            return Err(anyhow!(
                "ROI {:?} outside of {}x{} binned sensor",
                roi,
                max.width,
                max.height
            ));
        }
        state.roi = roi;
        Ok(())
    }

    async fn flip(&self) -> Result<Flip> {
        Ok(self.state.lock().flip)
    }

    async fn set_flip(&self, flip: Flip) -> Result<()> {
        self.state.lock().flip = flip;
        Ok(())
    }

    async fn roi_mode(&self) -> Result<RoiMode> {
        Ok(self.state.lock().roi_mode)
    }

    async fn set_roi_mode(&self, mode: RoiMode) -> Result<()> {
        self.state.lock().roi_mode = mode;
        Ok(())
    }

    async fn roi_line_begin(&self) -> Result<u32> {
        Ok(self.state.lock().line_begin)
    }

    async fn set_roi_line_begin(&self, line: u32) -> Result<()> {
        self.state.lock().line_begin = line;
        Ok(())
    }

    async fn frame_transfer_mode(&self) -> Result<FrameTransferMode> {
        Ok(self.state.lock().ft_mode)
    }

    async fn set_frame_transfer_mode(&self, mode: FrameTransferMode) -> Result<()> {
        self.state.lock().ft_mode = mode;
        Ok(())
    }

    async fn nb_concat_frames(&self) -> Result<u32> {
        Ok(self.state.lock().nb_concat)
    }

    async fn set_nb_concat_frames(&self, nb: u32) -> Result<()> {
        self.state.lock().nb_concat = nb;
        Ok(())
    }

    async fn input_channel(&self) -> Result<u32> {
        Ok(self.state.lock().input_channel)
    }

    async fn set_input_channel(&self, channel: u32) -> Result<()> {
        self.state.lock().input_channel = channel;
        Ok(())
    }

    async fn file_stream_params(&self, stream: usize) -> Result<FileStreamParams> {
        Self::check_stream(stream)?;
        Ok(self.state.lock().streams[stream].clone())
    }

    async fn set_file_stream_params(
        &self,
        stream: usize,
        params: FileStreamParams,
    ) -> Result<()> {
        Self::check_stream(stream)?;
        self.state.lock().streams[stream] = params;
        Ok(())
    }

    async fn file_stream_active(&self, stream: usize) -> Result<bool> {
        Self::check_stream(stream)?;
        Ok(self.state.lock().stream_active[stream])
    }

    async fn set_file_stream_active(&self, stream: usize, active: bool) -> Result<()> {
        Self::check_stream(stream)?;
        self.state.lock().stream_active[stream] = active;
        Ok(())
    }

    async fn set_common_file_header(&self, header: BTreeMap<String, String>) -> Result<()> {
        self.state.lock().header = header;
        Ok(())
    }

    async fn write_file(&self, first: i64, count: u32) -> Result<()> {
        self.state.lock().writes.push((first, count));
        Ok(())
    }

    async fn autosave(&self) -> Result<bool> {
        Ok(self.state.lock().autosave)
    }

    async fn set_autosave(&self, enabled: bool) -> Result<()> {
        self.state.lock().autosave = enabled;
        Ok(())
    }

    async fn live_display(&self) -> Result<bool> {
        Ok(self.state.lock().live_display)
    }

    async fn set_live_display(&self, enabled: bool) -> Result<()> {
        self.state.lock().live_display = enabled;
        Ok(())
    }

    async fn stripe_concat(&self) -> Result<bool> {
        Ok(self.state.lock().stripe_concat)
    }

    async fn set_stripe_concat(&self, enabled: bool) -> Result<()> {
        self.state.lock().stripe_concat = enabled;
        Ok(())
    }

    async fn e2v_correction_active(&self) -> Result<bool> {
        Ok(self.state.lock().e2v_correction)
    }

    async fn set_e2v_correction_active(&self, active: bool) -> Result<()> {
        self.state.lock().e2v_correction = active;
        Ok(())
    }

    async fn start_acq(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status.acquisition == AcqStatus::Fault {
            return Err(anyhow!("Cannot start acquisition: {}", state.status));
        }
        state.status.acquisition = AcqStatus::Running;
        Ok(())
    }

    async fn stop_acq(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status.acquisition == AcqStatus::Running {
            state.status.acquisition = AcqStatus::Ready;
        }
        Ok(())
    }

    async fn start_live(&self) -> Result<()> {
        self.start_acq().await
    }

    async fn read_frames(&self, first: i64, count: u32) -> Result<Vec<u8>> {
        if first < 0 {
            return Err(anyhow!("Invalid frame number: {}", first));
        }
        let mut state = self.state.lock();
        state.read_calls += 1;
        let frame_size = FrameDim::new(state.roi.size, ImageType::Bpp16).mem_size();
        let mut len = frame_size * count as usize;
        if let Some(short) = state.short_read {
            len = len.min(short);
        }
        Ok((0..len).map(|i| (i % 251) as u8).collect())
    }

    async fn exec_serial_command(&self, command: &str) -> Result<String> {
        let mut state = self.state.lock();
        state.serial_log.push(command.to_string());
        Ok(format!("!OK:{}", command.trim_start_matches('>')))
    }

    async fn read_beam_params(&self) -> Result<Vec<f64>> {
        Ok(self.sensor.beam_params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_dim_follows_roi() {
        let engine = MockEngine::new();
        let roi = Roi::new(Point::new(0, 0), Size::new(100, 50));
        engine.set_roi(roi).await.unwrap();
        let dim = engine.frame_dim(false).await.unwrap();
        assert_eq!(dim.mem_size(), 100 * 50 * 2);
        let max = engine.frame_dim(true).await.unwrap();
        assert_eq!(max.size, Size::new(2048, 2048));
    }

    #[tokio::test]
    async fn binning_rescales_roi() {
        let engine = MockEngine::new();
        engine.set_binning(Bin::new(2, 4).unwrap()).await.unwrap();
        let roi = engine.roi().await.unwrap();
        assert_eq!(roi.size, Size::new(1024, 512));
    }

    #[tokio::test]
    async fn roi_outside_sensor_is_rejected() {
        let engine = MockEngine::new();
        let roi = Roi::new(Point::new(2000, 0), Size::new(100, 10));
        assert!(engine.set_roi(roi).await.is_err());
    }

    #[tokio::test]
    async fn reset_status_clears_fault() {
        let engine = MockEngine::new();
        engine.inject_fault(AcqError::CameraError);
        engine.reset_status().await.unwrap();
        let status = engine.status().await.unwrap();
        assert_eq!(status.acquisition, AcqStatus::Ready);
        assert_eq!(engine.reset_status_calls(), 1);
    }

    #[tokio::test]
    async fn short_read_truncates() {
        let engine = MockEngine::new();
        engine.inject_short_read(10);
        let data = engine.read_frames(0, 1).await.unwrap();
        assert_eq!(data.len(), 10);
        assert_eq!(engine.read_calls(), 1);
    }

    #[tokio::test]
    async fn invalid_stream_index() {
        let engine = MockEngine::new();
        assert!(engine.file_stream_params(NB_FILE_STREAMS).await.is_err());
    }
}
