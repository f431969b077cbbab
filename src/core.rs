//! Core value types shared by the translator and the acquisition engine.
//!
//! These types mirror the configuration owned by the acquisition engine. The
//! translator never caches them across calls: every operation reads what it
//! needs from the engine, derives, validates, and writes back.

use crate::error::{CcdError, CcdResult};
use bitflags::bitflags;
use std::fmt;

//==============================================================================
// Trigger
//==============================================================================

/// Trigger modes known to the acquisition engine.
///
/// Only `Internal`, `ExternalGate`, `ExternalSingle` and `ExternalMultiple`
/// have a wire code; the others are reported as an invalid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrigMode {
    /// Software start, exposure timed by the camera
    Internal,
    /// Software trigger per frame
    InternalMultiple,
    /// One external pulse starts the whole sequence
    ExternalSingle,
    /// One external pulse per frame
    ExternalMultiple,
    /// External gate sets the exposure
    ExternalGate,
    /// Separate external start and stop pulses
    ExternalStartStop,
    /// External pulse triggers the readout
    ExternalReadout,
}

impl fmt::Display for TrigMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrigMode::Internal => "IntTrig",
            TrigMode::InternalMultiple => "IntTrigMult",
            TrigMode::ExternalSingle => "ExtTrigSingle",
            TrigMode::ExternalMultiple => "ExtTrigMult",
            TrigMode::ExternalGate => "ExtGate",
            TrigMode::ExternalStartStop => "ExtStartStop",
            TrigMode::ExternalReadout => "ExtTrigReadout",
        };
        write!(f, "{}", label)
    }
}

//==============================================================================
// Geometry
//==============================================================================

/// Binning factors in the engine's (column, row) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bin {
    /// Column factor
    pub x: u32,
    /// Row factor
    pub y: u32,
}

impl Bin {
    /// Build a binning, rejecting zero factors.
    pub fn new(x: u32, y: u32) -> CcdResult<Self> {
        if x == 0 || y == 0 {
            return Err(CcdError::InvalidParameter(format!(
                "Invalid binning {}x{}: factors must be positive",
                x, y
            )));
        }
        Ok(Self { x, y })
    }
}

impl Default for Bin {
    fn default() -> Self {
        Self { x: 1, y: 1 }
    }
}

/// Pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

impl Point {
    /// Point at column `x`, row `y`.
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Pixel extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    /// Columns
    pub width: u32,
    /// Rows
    pub height: u32,
}

impl Size {
    /// Extent of `width` columns by `height` rows.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Region of interest: top-left corner plus size.
///
/// The bottom-right corner is inclusive, so a ROI from (0, 0) to (9, 9)
/// is 10x10 pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roi {
    /// First pixel of the region
    pub top_left: Point,
    /// Extent of the region
    pub size: Size,
}

impl Roi {
    /// ROI of `size` pixels starting at `top_left`.
    pub fn new(top_left: Point, size: Size) -> Self {
        Self { top_left, size }
    }

    /// Build a ROI from its two inclusive corners.
    ///
    /// Fails if the corners are inverted or the extent does not fit in a `u32`.
    pub fn from_corners(top_left: Point, bottom_right: Point) -> CcdResult<Self> {
        if bottom_right.x < top_left.x || bottom_right.y < top_left.y {
            return Err(CcdError::InvalidParameter(format!(
                "Invalid ROI: bottom-right ({}, {}) is above or left of top-left ({}, {})",
                bottom_right.x, bottom_right.y, top_left.x, top_left.y
            )));
        }
        let extent = |first: u32, last: u32| (last - first).checked_add(1);
        match (
            extent(top_left.x, bottom_right.x),
            extent(top_left.y, bottom_right.y),
        ) {
            (Some(width), Some(height)) => Ok(Self {
                top_left,
                size: Size::new(width, height),
            }),
            _ => Err(CcdError::InvalidParameter(format!(
                "Invalid ROI: ({}, {}) to ({}, {}) is too large",
                top_left.x, top_left.y, bottom_right.x, bottom_right.y
            ))),
        }
    }

    /// Inclusive bottom-right corner, saturating at `u32::MAX`.
    pub fn bottom_right(&self) -> Point {
        Point::new(
            self.top_left
                .x
                .saturating_add(self.size.width)
                .saturating_sub(1),
            self.top_left
                .y
                .saturating_add(self.size.height)
                .saturating_sub(1),
        )
    }

    /// Convert from binned to unbinned (sensor) pixel space.
    pub fn unbinned(&self, bin: Bin) -> Self {
        Self {
            top_left: Point::new(
                self.top_left.x.saturating_mul(bin.x),
                self.top_left.y.saturating_mul(bin.y),
            ),
            size: Size::new(
                self.size.width.saturating_mul(bin.x),
                self.size.height.saturating_mul(bin.y),
            ),
        }
    }

    /// Convert from unbinned (sensor) to binned pixel space.
    ///
    /// Coordinates that are not a multiple of the binning are truncated.
    pub fn binned(&self, bin: Bin) -> Self {
        Self {
            top_left: Point::new(self.top_left.x / bin.x, self.top_left.y / bin.y),
            size: Size::new(self.size.width / bin.x, self.size.height / bin.y),
        }
    }
}

/// Image mirroring, decoded from a two-bit wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flip {
    /// Bit 1 of the wire code
    pub vertical: bool,
    /// Bit 0 of the wire code
    pub horizontal: bool,
}

impl Flip {
    /// Decode a wire code in `0..=3`.
    pub fn from_code(code: u32) -> CcdResult<Self> {
        if code > 3 {
            return Err(CcdError::InvalidParameter(format!(
                "Invalid flip mode: {}",
                code
            )));
        }
        Ok(Self {
            vertical: code & 0b10 != 0,
            horizontal: code & 0b01 != 0,
        })
    }

    /// Wire code of this mirroring.
    pub fn code(&self) -> u32 {
        (u32::from(self.vertical) << 1) | u32::from(self.horizontal)
    }
}

/// Sensor readout region mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoiMode {
    /// Full sensor readout
    #[default]
    None,
    /// Region read out with slow line skipping
    Slow,
    /// Region read out with fast line skipping
    Fast,
    /// Kinetics window shifted under the mask
    Kinetic,
}

impl RoiMode {
    /// Decode a wire code in `0..=3`.
    pub fn from_code(code: u32) -> CcdResult<Self> {
        match code {
            0 => Ok(RoiMode::None),
            1 => Ok(RoiMode::Slow),
            2 => Ok(RoiMode::Fast),
            3 => Ok(RoiMode::Kinetic),
            other => Err(CcdError::InvalidParameter(format!(
                "Invalid ROI mode: {}",
                other
            ))),
        }
    }

    /// Wire code of this mode.
    pub fn code(self) -> u32 {
        match self {
            RoiMode::None => 0,
            RoiMode::Slow => 1,
            RoiMode::Fast => 2,
            RoiMode::Kinetic => 3,
        }
    }
}

/// Sensor readout profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameTransferMode {
    /// Whole sensor exposed and read out
    #[default]
    FullFrame,
    /// Half the sensor exposed while the other half is read out
    FrameTransfer,
}

impl FrameTransferMode {
    /// Decode the wire profile code: 0 is full frame, 3 is frame transfer.
    pub fn from_profile(code: i32) -> CcdResult<Self> {
        match code {
            0 => Ok(FrameTransferMode::FullFrame),
            3 => Ok(FrameTransferMode::FrameTransfer),
            other => Err(CcdError::InvalidParameter(format!(
                "Invalid profile value: {}",
                other
            ))),
        }
    }

    /// Wire profile code of this mode.
    pub fn profile(self) -> i32 {
        match self {
            FrameTransferMode::FrameTransfer => 3,
            _ => 0,
        }
    }
}

//==============================================================================
// Mode flags
//==============================================================================

bitflags! {
    /// Wire bitmask of acquisition capabilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModeFlags: u32 {
        /// Save every acquired frame.
        const AUTO_SAVE = 0x01;
        /// Held by the translator only, never by the engine.
        const ACQUIRE_RAW_FRAMES = 0x02;
        /// Feed the live display.
        const LIVE_DISPLAY = 0x04;
        /// Concatenate kinetics stripes into one frame.
        const STRIPE_CONCAT = 0x08;
        /// Inverted: set means sensor correction is disabled.
        const DISABLE_SENSOR_CORRECTION = 0x10;
    }
}

//==============================================================================
// File streams
//==============================================================================

/// On-disk format of saved frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    /// Bare pixel data
    #[default]
    Raw,
    /// ESRF data format with a text header
    Edf,
}

impl FileFormat {
    /// A case-insensitive `.edf` suffix selects EDF, anything else RAW.
    pub fn from_suffix(suffix: &str) -> Self {
        if suffix.to_ascii_lowercase().ends_with(".edf") {
            FileFormat::Edf
        } else {
            FileFormat::Raw
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Raw => write!(f, "RAW"),
            FileFormat::Edf => write!(f, "EDF"),
        }
    }
}

/// What saving does when the target file exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Fail the save
    #[default]
    Abort,
    /// Replace the file
    Overwrite,
}

impl OverwritePolicy {
    /// `"y"` and `"yes"` select overwrite; any other token aborts on existing files.
    pub fn from_token(token: &str) -> Self {
        match token {
            "y" | "yes" => OverwritePolicy::Overwrite,
            _ => OverwritePolicy::Abort,
        }
    }

    /// Wire token of this policy.
    pub fn token(self) -> &'static str {
        match self {
            OverwritePolicy::Overwrite => "yes",
            OverwritePolicy::Abort => "no",
        }
    }
}

/// Saving parameters for one file stream.
#[derive(Debug, Clone, PartialEq)]
pub struct FileStreamParams {
    /// Target directory
    pub directory: String,
    /// File name prefix
    pub prefix: String,
    /// File name suffix, extension included
    pub suffix: String,
    /// Index of the next file written
    pub next_number: i64,
    /// printf-style index format
    pub index_format: String,
    /// On-disk format
    pub file_format: FileFormat,
    /// Behaviour on existing files
    pub overwrite_policy: OverwritePolicy,
}

impl Default for FileStreamParams {
    fn default() -> Self {
        Self {
            directory: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            next_number: 0,
            index_format: "%04d".to_string(),
            file_format: FileFormat::Raw,
            overwrite_policy: OverwritePolicy::Abort,
        }
    }
}

//==============================================================================
// Frames
//==============================================================================

/// Pixel storage depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageType {
    /// 8 bits per pixel
    Bpp8,
    /// 10 bits per pixel, stored on 16
    Bpp10,
    /// 12 bits per pixel, stored on 16
    Bpp12,
    /// 14 bits per pixel, stored on 16
    Bpp14,
    /// 16 bits per pixel
    #[default]
    Bpp16,
    /// 32 bits per pixel
    Bpp32,
}

impl ImageType {
    /// Bytes used to store one pixel.
    pub fn depth(self) -> usize {
        match self {
            ImageType::Bpp8 => 1,
            ImageType::Bpp10 | ImageType::Bpp12 | ImageType::Bpp14 | ImageType::Bpp16 => 2,
            ImageType::Bpp32 => 4,
        }
    }
}

/// Frame geometry as delivered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDim {
    /// Frame extent in pixels
    pub size: Size,
    /// Pixel depth
    pub image_type: ImageType,
}

impl FrameDim {
    /// Geometry of a `size` frame of `image_type` pixels.
    pub fn new(size: Size, image_type: ImageType) -> Self {
        Self { size, image_type }
    }

    /// Bytes needed to store one frame.
    pub fn mem_size(&self) -> usize {
        self.size.width as usize * self.size.height as usize * self.image_type.depth()
    }
}

//==============================================================================
// Status
//==============================================================================

/// Acquisition status reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcqStatus {
    /// Idle, ready to start
    #[default]
    Ready,
    /// Acquisition in progress
    Running,
    /// Latched error, see [`AcqError`]
    Fault,
    /// Being reconfigured
    Config,
}

impl fmt::Display for AcqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AcqStatus::Ready => "AcqReady",
            AcqStatus::Running => "AcqRunning",
            AcqStatus::Fault => "AcqFault",
            AcqStatus::Config => "AcqConfig",
        };
        write!(f, "{}", label)
    }
}

/// Error cause attached to an engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcqError {
    /// No error latched
    #[default]
    NoError,
    /// A file could not be opened for saving
    SaveOpenError,
    /// The saving disk is full
    SaveDiskFull,
    /// Saving fell behind the acquisition
    SaveOverrun,
    /// Processing fell behind the acquisition
    ProcessingOverrun,
    /// The camera reported an error
    CameraError,
}

impl fmt::Display for AcqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AcqError::NoError => "NoError",
            AcqError::SaveOpenError => "SaveOpenError",
            AcqError::SaveDiskFull => "SaveDiskFull",
            AcqError::SaveOverrun => "SaveOverun",
            AcqError::ProcessingOverrun => "ProcessingOverun",
            AcqError::CameraError => "CameraError",
        };
        write!(f, "{}", label)
    }
}

/// Frame counters; `-1` means no frame yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCounters {
    /// Last frame received from the camera
    pub last_image_acquired: i64,
    /// Last frame ready before processing
    pub last_base_image_ready: i64,
    /// Last frame ready after processing
    pub last_image_ready: i64,
    /// Last frame written to disk
    pub last_image_saved: i64,
    /// Last frame counted by the processing chain
    pub last_counter_ready: i64,
}

impl Default for ImageCounters {
    fn default() -> Self {
        Self {
            last_image_acquired: -1,
            last_base_image_ready: -1,
            last_image_ready: -1,
            last_image_saved: -1,
            last_counter_ready: -1,
        }
    }
}

/// Structured engine status.
///
/// `Display` renders the engine's own textual format, which ends with the
/// image counters block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    /// Acquisition state
    pub acquisition: AcqStatus,
    /// Latched error cause
    pub error: AcqError,
    /// Frame progress
    pub image_counters: ImageCounters,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.image_counters;
        write!(
            f,
            "<AcquisitionStatus={}, Error={}, ImageCounters=<LastImageAcquired={}, \
             LastBaseImageReady={}, LastImageReady={}, LastImageSaved={}, LastCounterReady={}>>",
            self.acquisition,
            self.error,
            c.last_image_acquired,
            c.last_base_image_ready,
            c.last_image_ready,
            c.last_image_saved,
            c.last_counter_ready
        )
    }
}

/// Device state exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    /// Camera off, disconnected, or in error
    Fault,
    /// Idle
    Ready,
    /// Acquisition running
    Acquiring,
}

impl DeviceState {
    /// Human-readable description used in the status text.
    pub fn description(self) -> &'static str {
        match self {
            DeviceState::Fault => "Fault: Camera off or disconnected",
            DeviceState::Ready => "Ready: Camera is Idle",
            DeviceState::Acquiring => "Acquiring: Camera is Running",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeviceState::Fault => "Fault",
            DeviceState::Ready => "Ready",
            DeviceState::Acquiring => "Acquiring",
        };
        write!(f, "{}", label)
    }
}

/// Camera identification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraModel {
    /// ADC resolution in bits
    pub adc_bits: u8,
    /// Model name
    pub name: String,
}
