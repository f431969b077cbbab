//! Binning, ROI, kinetics window and readout profile.
//!
//! Binning travels on the wire as (row, column) while the engine stores
//! (column, row). ROIs travel as inclusive corners in binned pixel space.
//!
//! The kinetics window is a view over the ROI: its height in unbinned sensor
//! lines plus a line-begin offset stored separately by the engine. Setting the
//! window rewrites both so they stay consistent.

use tracing::{debug, warn};

use super::FrelonTranslator;
use crate::core::{Bin, Flip, FrameTransferMode, Point, Roi, RoiMode};
use crate::error::{CcdError, CcdResult};

/// Kinetics window in unbinned sensor lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KineticsWindow {
    /// Window height
    pub window: u32,
    /// First sensor line
    pub line_begin: u32,
    /// Always reported as 1
    pub stripes: u32,
}

/// Decoded hardware parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareParams {
    /// Image mirroring
    pub flip: Flip,
    /// Kinetics first line
    pub line_begin: u32,
    /// Kinetics stripes; only 1 is supported
    pub stripes: u32,
    /// Unused; reported as 0
    pub reserved: i64,
    /// Sensor readout region mode
    pub roi_mode: RoiMode,
}

impl HardwareParams {
    /// Decode `[flip, line_begin, stripes, reserved, roi_mode]`.
    pub fn from_codes(codes: [i64; 5]) -> CcdResult<Self> {
        let [flip, line_begin, stripes, reserved, roi_mode] = codes;
        let flip = u32::try_from(flip)
            .map_err(|_| CcdError::InvalidParameter(format!("Invalid flip mode: {}", flip)))?;
        let roi_mode = u32::try_from(roi_mode)
            .map_err(|_| CcdError::InvalidParameter(format!("Invalid ROI mode: {}", roi_mode)))?;
        Ok(Self {
            flip: Flip::from_code(flip)?,
            line_begin: super::non_negative(line_begin, "line begin")?,
            stripes: super::non_negative(stripes, "stripe count")?,
            reserved,
            roi_mode: RoiMode::from_code(roi_mode)?,
        })
    }

    /// Encode as `[flip, line_begin, stripes, reserved, roi_mode]`.
    pub fn to_codes(&self) -> [i64; 5] {
        [
            i64::from(self.flip.code()),
            i64::from(self.line_begin),
            i64::from(self.stripes),
            0,
            i64::from(self.roi_mode.code()),
        ]
    }
}

/// Fit a kinetics window below `line_begin` on a sensor `sensor_height` lines
/// tall, keeping it a multiple of the vertical binning.
///
/// A window that fits is returned unchanged.
pub fn clamp_window(window: u32, line_begin: u32, sensor_height: u32, bin_y: u32) -> u32 {
    if u64::from(line_begin) + u64::from(window) <= u64::from(sensor_height) {
        return window;
    }
    let available = sensor_height.saturating_sub(line_begin);
    available / bin_y * bin_y
}

/// ROI and line-begin to commit for a kinetics window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct KineticsPlan {
    roi: Roi,
    line_begin: u32,
}

impl FrelonTranslator {
    // ---------------------------------------------------------------------
    // Binning and ROI
    // ---------------------------------------------------------------------

    /// Set binning from its wire `(row, column)` order.
    pub async fn set_binning(&self, wire: [u32; 2]) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting binning: {:?}", wire);
        let bin = Bin::new(wire[1], wire[0])?;
        self.engine.set_binning(bin).await?;
        Ok(())
    }

    /// Binning in wire `(row, column)` order.
    pub async fn get_binning(&self) -> CcdResult<[u32; 2]> {
        let _session = self.begin().await;
        let bin = self.engine.binning().await?;
        let wire = [bin.y, bin.x];
        debug!("Getting binning: {:?}", wire);
        Ok(wire)
    }

    /// Set the ROI from inclusive corners `[x0, y0, x1, y1]`.
    pub async fn set_roi(&self, corners: [u32; 4]) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting ROI: {:?}", corners);
        let roi = Roi::from_corners(
            Point::new(corners[0], corners[1]),
            Point::new(corners[2], corners[3]),
        )?;
        self.engine.set_roi(roi).await?;
        Ok(())
    }

    /// ROI as inclusive corners `[x0, y0, x1, y1]`.
    pub async fn get_roi(&self) -> CcdResult<[u32; 4]> {
        let _session = self.begin().await;
        self.roi_corners().await
    }

    pub(crate) async fn roi_corners(&self) -> CcdResult<[u32; 4]> {
        let roi = self.engine.roi().await?;
        let tl = roi.top_left;
        let br = roi.bottom_right();
        let corners = [tl.x, tl.y, br.x, br.y];
        debug!("Getting ROI: {:?}", corners);
        Ok(corners)
    }

    // ---------------------------------------------------------------------
    // Kinetics
    // ---------------------------------------------------------------------

    /// Move and resize the kinetics window.
    pub async fn set_kinetics_params(
        &self,
        window: u32,
        line_begin: u32,
        stripes: u32,
    ) -> CcdResult<()> {
        let _session = self.begin().await;
        let plan = self.plan_kinetics(window, line_begin, stripes).await?;
        self.commit_kinetics(plan).await
    }

    /// Current kinetics window.
    pub async fn get_kinetics_params(&self) -> CcdResult<KineticsWindow> {
        let _session = self.begin().await;
        self.kinetics_window().await
    }

    /// Resize the kinetics window, keeping the current line-begin.
    pub async fn set_kinetics_window_size(&self, window: u32) -> CcdResult<()> {
        let _session = self.begin().await;
        let current = self.kinetics_window().await?;
        let plan = self
            .plan_kinetics(window, current.line_begin, current.stripes)
            .await?;
        self.commit_kinetics(plan).await
    }

    /// Kinetics window height in unbinned lines.
    pub async fn get_kinetics_window_size(&self) -> CcdResult<u32> {
        let _session = self.begin().await;
        Ok(self.kinetics_window().await?.window)
    }

    async fn kinetics_window(&self) -> CcdResult<KineticsWindow> {
        let bin = self.engine.binning().await?;
        let roi = self.engine.roi().await?.unbinned(bin);
        let line_begin = self.engine.roi_line_begin().await?;
        let kinetics = KineticsWindow {
            window: roi.size.height,
            line_begin,
            stripes: 1,
        };
        debug!("Getting kinetics params: {:?}", kinetics);
        Ok(kinetics)
    }

    /// Validate a kinetics request and derive the ROI to commit.
    ///
    /// Only reads from the engine.
    async fn plan_kinetics(
        &self,
        window: u32,
        line_begin: u32,
        stripes: u32,
    ) -> CcdResult<KineticsPlan> {
        debug!(
            "Setting kinetics params: window={}, line_begin={}, stripes={}",
            window, line_begin, stripes
        );
        if stripes > 1 {
            warn!("Ignoring nb of stripes: {}", stripes);
        }
        if window == 0 {
            return Err(CcdError::InvalidParameter(
                "Invalid kinetics window size: 0".to_string(),
            ));
        }
        let bin = self.engine.binning().await?;
        if window % bin.y != 0 {
            return Err(CcdError::InvalidParameter(format!(
                "Invalid kinetics window size ({}): must be a multiple of vert. binning ({})",
                window, bin.y
            )));
        }

        let sensor_height = self.engine.frame_dim(true).await?.size.height;
        if line_begin >= sensor_height {
            return Err(CcdError::InvalidParameter(format!(
                "Invalid kinetics line begin ({}): sensor has {} lines",
                line_begin, sensor_height
            )));
        }
        let clamped = clamp_window(window, line_begin, sensor_height, bin.y);
        if clamped == 0 {
            return Err(CcdError::InvalidParameter(format!(
                "No kinetics window fits below line {} with vert. binning {}",
                line_begin, bin.y
            )));
        }
        if clamped != window {
            warn!("Clamping kinetics window size: {} -> {}", window, clamped);
        }

        let mut roi = self.engine.roi().await?.unbinned(bin);
        roi.top_left.y = line_begin;
        roi.size.height = clamped;
        Ok(KineticsPlan {
            roi: roi.binned(bin),
            line_begin,
        })
    }

    async fn commit_kinetics(&self, plan: KineticsPlan) -> CcdResult<()> {
        self.engine.set_roi(plan.roi).await?;
        self.engine.set_roi_line_begin(plan.line_begin).await?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Hardware parameters
    // ---------------------------------------------------------------------

    /// Apply flip and ROI mode; in Kinetic mode also move the kinetics
    /// window to the requested line-begin.
    pub async fn set_hardware_params(&self, params: HardwareParams) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting hw par: {:?}", params);
        if params.reserved != 0 {
            warn!("Ignoring reserved hw par: {}", params.reserved);
        }

        let plan = if params.roi_mode == RoiMode::Kinetic {
            let current = self.kinetics_window().await?;
            Some(
                self.plan_kinetics(current.window, params.line_begin, params.stripes)
                    .await?,
            )
        } else {
            warn!("Ignoring kinetics parameters");
            None
        };

        self.engine.set_flip(params.flip).await?;
        self.engine.set_roi_mode(params.roi_mode).await?;
        if let Some(plan) = plan {
            self.commit_kinetics(plan).await?;
        }
        Ok(())
    }

    /// Flip, kinetics line-begin and ROI mode of the engine.
    pub async fn get_hardware_params(&self) -> CcdResult<HardwareParams> {
        let _session = self.begin().await;
        let kinetics = self.kinetics_window().await?;
        let params = HardwareParams {
            flip: self.engine.flip().await?,
            line_begin: kinetics.line_begin,
            stripes: kinetics.stripes,
            reserved: 0,
            roi_mode: self.engine.roi_mode().await?,
        };
        debug!("Getting hw par: {:?}", params);
        Ok(params)
    }

    // ---------------------------------------------------------------------
    // Profile
    // ---------------------------------------------------------------------

    /// Select full-frame (0) or frame-transfer (3) readout.
    pub async fn set_profile(&self, code: i64) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting profile: {}", code);
        let code = i32::try_from(code)
            .map_err(|_| CcdError::InvalidParameter(format!("Invalid profile value: {}", code)))?;
        let mode = FrameTransferMode::from_profile(code)?;
        self.engine.set_frame_transfer_mode(mode).await?;
        Ok(())
    }

    /// Wire profile code of the frame-transfer mode.
    pub async fn get_profile(&self) -> CcdResult<i64> {
        let _session = self.begin().await;
        let mode = self.engine.frame_transfer_mode().await?;
        let code = i64::from(mode.profile());
        debug!("Getting profile: {}", code);
        Ok(code)
    }
}
