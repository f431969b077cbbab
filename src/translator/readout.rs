//! Acquisition control and size-checked frame readout.

use tracing::{debug, info};

use super::FrelonTranslator;
use crate::error::{CcdError, CcdResult};

/// Concatenated frames used when stripe concatenation runs without a frame count.
pub const LIVE_NB_CONCAT_FRAMES: u32 = 16;

fn check_size(context: &'static str, expected: usize, actual: usize) -> CcdResult<()> {
    if expected != actual {
        return Err(CcdError::SizeMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}

impl FrelonTranslator {
    /// Set the number of frames to acquire; 0 means continuous.
    ///
    /// With stripe concatenation active, the concatenated-frame count follows
    /// the frame count, or [`LIVE_NB_CONCAT_FRAMES`] when continuous.
    pub async fn set_nb_frames(&self, nb_frames: u32) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting nb. frames: {}", nb_frames);
        self.engine.set_nb_frames(nb_frames).await?;
        if self.engine.stripe_concat().await? {
            let nb_concat = if nb_frames > 0 {
                nb_frames
            } else {
                LIVE_NB_CONCAT_FRAMES
            };
            debug!("Setting nb. concat. frames: {}", nb_concat);
            self.engine.set_nb_concat_frames(nb_concat).await?;
        }
        Ok(())
    }

    /// Frames per acquisition.
    pub async fn get_nb_frames(&self) -> CcdResult<u32> {
        let _session = self.begin().await;
        Ok(self.engine.nb_frames().await?)
    }

    /// Start an acquisition.
    pub async fn start_acquisition(&self) -> CcdResult<()> {
        let _session = self.begin().await;
        info!("Starting acquisition");
        self.engine.start_acq().await?;
        Ok(())
    }

    /// Stop the running acquisition.
    pub async fn stop_acquisition(&self) -> CcdResult<()> {
        let _session = self.begin().await;
        info!("Stopping acquisition");
        self.engine.stop_acq().await?;
        Ok(())
    }

    /// Start an endless live acquisition.
    pub async fn start_live(&self) -> CcdResult<()> {
        let _session = self.begin().await;
        info!("Starting live mode");
        self.engine.start_live().await?;
        Ok(())
    }

    /// Frames acquired so far, or saved so far when autosave counts them.
    pub async fn current_frame_count(&self) -> CcdResult<i64> {
        let session = self.begin().await;
        let counters = self.engine.status().await?.image_counters;
        let last_frame = if self.engine.autosave().await? && !session.acquire_raw_frames {
            counters.last_image_saved
        } else {
            counters.last_image_acquired
        };
        let nb_frames = last_frame + 1;
        debug!("Nb of frames: {}", nb_frames);
        Ok(nb_frames)
    }

    /// Read one frame, checking its size against the client's expectation
    /// before and after the read.
    pub async fn read_frame(&self, frame_nb: i64, expected_size: usize) -> CcdResult<Vec<u8>> {
        let _session = self.begin().await;
        debug!("Reading frame {} ({} bytes)", frame_nb, expected_size);
        let frame_size = self.engine.frame_dim(false).await?.mem_size();
        check_size("frame", expected_size, frame_size)?;
        let data = self.engine.read_frames(frame_nb, 1).await?;
        check_size("data str", expected_size, data.len())?;
        Ok(data)
    }

    /// Read as many whole frames from frame 0 as fit in `expected_size`.
    ///
    /// A size that is not a multiple of the frame size reads the frames that
    /// fit and then fails the size check.
    pub async fn read_concat_frames(&self, expected_size: usize) -> CcdResult<Vec<u8>> {
        let _session = self.begin().await;
        let frame_size = self.engine.frame_dim(false).await?.mem_size();
        if frame_size == 0 {
            return Err(CcdError::InvalidState("Frame size is zero".to_string()));
        }
        let nb_frames = u32::try_from(expected_size / frame_size).map_err(|_| {
            CcdError::InvalidParameter(format!("Too many frames requested: {} bytes", expected_size))
        })?;
        debug!(
            "Reading {} concatenated frames ({} bytes)",
            nb_frames, expected_size
        );
        let data = self.engine.read_frames(0, nb_frames).await?;
        check_size("data str", expected_size, data.len())?;
        Ok(data)
    }
}
