//! Mode bitmask and input channel.
//!
//! Four of the [`ModeFlags`] mirror engine switches. `ACQUIRE_RAW_FRAMES`
//! lives in the translator session only, and `DISABLE_SENSOR_CORRECTION` is
//! the inverse of the engine's correction switch.

use tracing::debug;

use super::FrelonTranslator;
use crate::core::ModeFlags;
use crate::error::CcdResult;

/// Engine switch values selected by a mode bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineModes {
    /// Kinetics stripe concatenation
    pub stripe_concat: bool,
    /// Live display
    pub live_display: bool,
    /// Automatic saving
    pub autosave: bool,
    /// Sensor correction, active when the wire bit is clear
    pub sensor_correction: bool,
}

/// Split a wire bitmask into engine switches and the raw-frames session flag.
///
/// Bits outside the defined flags are dropped.
pub fn decode_mode(bits: u32) -> (EngineModes, bool) {
    let flags = ModeFlags::from_bits_truncate(bits);
    let modes = EngineModes {
        stripe_concat: flags.contains(ModeFlags::STRIPE_CONCAT),
        live_display: flags.contains(ModeFlags::LIVE_DISPLAY),
        autosave: flags.contains(ModeFlags::AUTO_SAVE),
        sensor_correction: !flags.contains(ModeFlags::DISABLE_SENSOR_CORRECTION),
    };
    (modes, flags.contains(ModeFlags::ACQUIRE_RAW_FRAMES))
}

/// Combine engine switches and the raw-frames session flag into a wire bitmask.
pub fn encode_mode(modes: EngineModes, acquire_raw_frames: bool) -> u32 {
    let mut flags = ModeFlags::empty();
    flags.set(ModeFlags::STRIPE_CONCAT, modes.stripe_concat);
    flags.set(ModeFlags::LIVE_DISPLAY, modes.live_display);
    flags.set(ModeFlags::AUTO_SAVE, modes.autosave);
    flags.set(ModeFlags::ACQUIRE_RAW_FRAMES, acquire_raw_frames);
    flags.set(ModeFlags::DISABLE_SENSOR_CORRECTION, !modes.sensor_correction);
    flags.bits()
}

impl FrelonTranslator {
    /// Apply a wire mode bitmask.
    pub async fn set_mode(&self, bits: u32) -> CcdResult<()> {
        let mut session = self.begin().await;
        debug!("Setting mode: {} (0x{:x})", bits, bits);
        let (modes, acquire_raw_frames) = decode_mode(bits);
        self.engine.set_stripe_concat(modes.stripe_concat).await?;
        self.engine.set_live_display(modes.live_display).await?;
        self.engine.set_autosave(modes.autosave).await?;
        session.acquire_raw_frames = acquire_raw_frames;
        self.engine
            .set_e2v_correction_active(modes.sensor_correction)
            .await?;
        Ok(())
    }

    /// Wire mode bitmask of the engine switches and session flag.
    pub async fn get_mode(&self) -> CcdResult<u32> {
        let session = self.begin().await;
        let modes = EngineModes {
            stripe_concat: self.engine.stripe_concat().await?,
            live_display: self.engine.live_display().await?,
            autosave: self.engine.autosave().await?,
            sensor_correction: self.engine.e2v_correction_active().await?,
        };
        let bits = encode_mode(modes, session.acquire_raw_frames);
        debug!("Getting mode: {} (0x{:x})", bits, bits);
        Ok(bits)
    }

    /// Select the readout channels.
    pub async fn set_input_channel(&self, channel: u32) -> CcdResult<()> {
        let _session = self.begin().await;
        debug!("Setting input channel: 0x{:x}", channel);
        self.engine.set_input_channel(channel).await?;
        Ok(())
    }

    /// Selected readout channels.
    pub async fn get_input_channel(&self) -> CcdResult<u32> {
        let _session = self.begin().await;
        Ok(self.engine.input_channel().await?)
    }
}
