//! Remote command vocabulary.
//!
//! A [`CcdCommand`] is one remote call as it arrives on the wire: a command
//! name plus flat arguments (integers, strings, arrays). [`dispatch`] decodes
//! the arguments, runs the matching [`FrelonTranslator`] operation and encodes
//! the result as a [`Reply`].
//!
//! # Wire format
//!
//! Commands are JSON objects tagged by `cmd`, with arguments under `args`:
//!
//! ```json
//! {"cmd": "setRoi", "args": [0, 0, 1023, 511]}
//! {"cmd": "setHardwareParameters", "args": "2 100 1 0 3"}
//! {"cmd": "queryState"}
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CcdError, CcdResult};
use crate::translator::files::{FileParamsReport, FileParamsUpdate, DEFAULT_STREAM};
use crate::translator::{non_negative, FrelonTranslator, HardwareParams};

/// One remote command with its wire arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "args", rename_all = "camelCase")]
pub enum CcdCommand {
    /// Hard reset of camera and acquisition
    Reset,
    /// Device state name
    QueryState,
    /// Device state description with the CCD status byte
    QueryStatusText,
    /// `true` for the full sensor
    GetFrameDimensions(bool),
    /// 2016 or 2014 by ADC depth
    GetModelCode,
    /// Always empty
    GetLastErrorMessage,
    /// Wire trigger code
    SetTrigger(i64),
    /// Wire trigger code
    GetTrigger,
    /// Frames per acquisition
    SetNbFrames(i64),
    /// Frames per acquisition
    GetNbFrames,
    /// Seconds; 0 selects gate triggering
    SetExpTime(f64),
    /// Seconds; 0 under gate triggering
    GetExpTime,
    /// `[row, column]`
    SetBinning(Vec<i64>),
    /// `[row, column]`
    GetBinning,
    /// `[x0, y0, x1, y1]`, inclusive
    SetRoi(Vec<i64>),
    /// `[x0, y0, x1, y1]`, inclusive
    GetRoi,
    /// `[dir, prefix, suffix, next_number, index_format, overwrite]`
    SetFileParameters(Vec<String>),
    /// Default stream parameters
    GetFileParameters,
    /// `[stream, active, dir, prefix, suffix, next_number, index_format, overwrite]`
    SetFileParametersExt(Vec<String>),
    /// Stream index
    GetFileParametersExt(String),
    /// `key=value` lines
    SetFileHeader(String),
    /// Frame number
    WriteSingleFrame(i64),
    /// Save the concatenated stripes
    WriteConcatenatedFrames,
    /// Readout channel bitmask
    SetInputChannel(i64),
    /// Readout channel bitmask
    GetInputChannel,
    /// Mode bitmask
    SetMode(i64),
    /// Mode bitmask
    GetMode,
    /// `"flip line_begin stripes reserved roi_mode"`
    SetHardwareParameters(String),
    /// `"flip line_begin stripes reserved roi_mode"`
    GetHardwareParameters,
    /// 0 for full frame, 3 for frame transfer
    SetProfile(i64),
    /// 0 for full frame, 3 for frame transfer
    GetProfile,
    /// Unbinned lines
    SetKinematicsWindowSize(i64),
    /// Unbinned lines
    GetKinematicsWindowSize,
    /// `[window, line_begin, stripes]`
    SetKinematicsParameters(Vec<i64>),
    /// `[window, line_begin, stripes]`
    GetKinematicsParameters,
    /// Start an acquisition
    StartAcquisition,
    /// Stop the acquisition
    StopAcquisition,
    /// `(frame_nb, expected_bytes)`
    ReadFrame(i64, i64),
    /// Expected bytes
    ReadConcatenatedFrames(i64),
    /// Start an endless live acquisition
    StartLiveMode,
    /// Last acquired frame plus one
    QueryCurrentFrameCount,
    /// Raw camera command
    ExecSerialCommand(String),
    /// Always 0
    QueryPendingChangeCount,
    /// Legacy parameter block
    ReadLegacyCcdParameters,
    /// Beam-monitor values
    ReadBeamParameters,
}

impl CcdCommand {
    /// Parse one JSON command.
    pub fn parse(text: &str) -> CcdResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| CcdError::InvalidParameter(format!("Invalid command: {}", e)))
    }
}

/// Value returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// No value, rendered as `null`
    None,
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    Text(String),
    /// Integer array
    Ints(Vec<i64>),
    /// Float array
    Floats(Vec<f64>),
    /// String array
    Texts(Vec<String>),
    /// Frame data
    Bytes(Vec<u8>),
}

// =============================================================================
// Argument decoding
// =============================================================================

fn expect_len<T>(args: &[T], len: usize, what: &str) -> CcdResult<()> {
    if args.len() != len {
        return Err(CcdError::InvalidParameter(format!(
            "Invalid {}: expected {} values, got {}",
            what,
            len,
            args.len()
        )));
    }
    Ok(())
}

fn parse_int(text: &str, what: &str) -> CcdResult<i64> {
    text.trim()
        .parse()
        .map_err(|_| CcdError::InvalidParameter(format!("Invalid {}: {:?}", what, text)))
}

fn to_usize(value: i64, what: &str) -> CcdResult<usize> {
    usize::try_from(value)
        .map_err(|_| CcdError::InvalidParameter(format!("Invalid {}: {}", what, value)))
}

/// Decode a whitespace-separated hardware parameter string.
pub fn parse_hw_par(text: &str) -> CcdResult<HardwareParams> {
    let values = text
        .split_whitespace()
        .map(|token| parse_int(token, "hw par"))
        .collect::<CcdResult<Vec<_>>>()?;
    expect_len(&values, 5, "hw par")?;
    HardwareParams::from_codes([values[0], values[1], values[2], values[3], values[4]])
}

/// Encode hardware parameters as the wire string.
pub fn format_hw_par(params: &HardwareParams) -> String {
    params
        .to_codes()
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode an extended file parameter array.
pub fn parse_ext_file_par(args: &[String]) -> CcdResult<FileParamsUpdate> {
    expect_len(args, 8, "file par")?;
    let stream = to_usize(parse_int(&args[0], "stream index")?, "stream index")?;
    let active = parse_int(&args[1], "stream activation")? != 0;
    Ok(FileParamsUpdate {
        stream,
        active,
        directory: args[2].clone(),
        prefix: args[3].clone(),
        suffix: args[4].clone(),
        next_number: parse_int(&args[5], "next number")?,
        index_format: args[6].clone(),
        overwrite: args[7].clone(),
    })
}

/// Encode a file parameter report as the extended wire array.
pub fn format_ext_file_par(report: &FileParamsReport) -> Vec<String> {
    vec![
        report.stream.to_string(),
        i64::from(report.active).to_string(),
        report.directory.clone(),
        report.prefix.clone(),
        report.suffix.clone(),
        report.next_number.to_string(),
        report.file_format.to_string(),
        report.overwrite.token().to_string(),
    ]
}

fn u32_array<const N: usize>(args: &[i64], what: &str) -> CcdResult<[u32; N]> {
    expect_len(args, N, what)?;
    let mut out = [0u32; N];
    for (slot, &value) in out.iter_mut().zip(args) {
        *slot = non_negative(value, what)?;
    }
    Ok(out)
}

fn ints<const N: usize>(values: [u32; N]) -> Reply {
    Reply::Ints(values.iter().map(|&v| i64::from(v)).collect())
}

// =============================================================================
// Dispatch
// =============================================================================

/// Encode a command outcome as one JSON reply line.
///
/// Success is `{"ok": value}`, failure `{"error": {"kind": .., "message": ..}}`.
pub fn render_reply(result: &CcdResult<Reply>) -> serde_json::Value {
    match result {
        Ok(reply) => serde_json::json!({ "ok": reply }),
        Err(e) => serde_json::json!({
            "error": { "kind": e.kind(), "message": e.to_string() }
        }),
    }
}

/// Parse and run one JSON command line.
pub async fn execute_line(translator: &FrelonTranslator, line: &str) -> serde_json::Value {
    let result = match CcdCommand::parse(line) {
        Ok(command) => dispatch(translator, command).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        warn!(kind = e.kind(), "Command failed: {}", e);
    }
    render_reply(&result)
}

/// Run one command against the translator.
pub async fn dispatch(translator: &FrelonTranslator, command: CcdCommand) -> CcdResult<Reply> {
    debug!("Dispatching {:?}", command);
    let reply = match command {
        CcdCommand::Reset => {
            translator.reset().await?;
            Reply::None
        }
        CcdCommand::QueryState => {
            let state = translator.state().await?;
            Reply::Text(state.to_string())
        }
        CcdCommand::QueryStatusText => Reply::Text(translator.status_text().await?),
        CcdCommand::GetFrameDimensions(max) => {
            let dim = translator.frame_dim(max).await?;
            Reply::Ints(vec![
                i64::from(dim.size.width),
                i64::from(dim.size.height),
                dim.image_type.depth() as i64,
            ])
        }
        CcdCommand::GetModelCode => Reply::Int(translator.model_code().await?),
        CcdCommand::GetLastErrorMessage => Reply::Text(translator.last_error_message()),
        CcdCommand::SetTrigger(code) => {
            translator.set_trigger(code).await?;
            Reply::None
        }
        CcdCommand::GetTrigger => Reply::Int(translator.get_trigger().await?),
        CcdCommand::SetNbFrames(nb) => {
            translator
                .set_nb_frames(non_negative(nb, "nb. frames")?)
                .await?;
            Reply::None
        }
        CcdCommand::GetNbFrames => Reply::Int(i64::from(translator.get_nb_frames().await?)),
        CcdCommand::SetExpTime(seconds) => {
            translator.set_exp_time(seconds).await?;
            Reply::None
        }
        CcdCommand::GetExpTime => Reply::Float(translator.get_exp_time().await?),
        CcdCommand::SetBinning(args) => {
            translator
                .set_binning(u32_array(&args, "binning")?)
                .await?;
            Reply::None
        }
        CcdCommand::GetBinning => ints(translator.get_binning().await?),
        CcdCommand::SetRoi(args) => {
            translator.set_roi(u32_array(&args, "ROI")?).await?;
            Reply::None
        }
        CcdCommand::GetRoi => ints(translator.get_roi().await?),
        CcdCommand::SetFileParameters(args) => {
            let mut ext = vec![DEFAULT_STREAM.to_string(), "1".to_string()];
            ext.extend(args);
            translator
                .set_file_params(parse_ext_file_par(&ext)?)
                .await?;
            Reply::None
        }
        CcdCommand::GetFileParameters => {
            let report = translator.get_file_params().await?;
            Reply::Texts(format_ext_file_par(&report).split_off(2))
        }
        CcdCommand::SetFileParametersExt(args) => {
            translator
                .set_file_params_ext(parse_ext_file_par(&args)?)
                .await?;
            Reply::None
        }
        CcdCommand::GetFileParametersExt(stream) => {
            let stream = to_usize(parse_int(&stream, "stream index")?, "stream index")?;
            let report = translator.get_file_params_ext(stream).await?;
            Reply::Texts(format_ext_file_par(&report))
        }
        CcdCommand::SetFileHeader(text) => {
            translator.set_file_header(&text).await?;
            Reply::None
        }
        CcdCommand::WriteSingleFrame(frame_nb) => {
            translator.write_single_frame(frame_nb).await?;
            Reply::None
        }
        CcdCommand::WriteConcatenatedFrames => {
            translator.write_concat_frames().await?;
            Reply::None
        }
        CcdCommand::SetInputChannel(channel) => {
            translator
                .set_input_channel(non_negative(channel, "input channel")?)
                .await?;
            Reply::None
        }
        CcdCommand::GetInputChannel => {
            Reply::Int(i64::from(translator.get_input_channel().await?))
        }
        CcdCommand::SetMode(bits) => {
            translator.set_mode(non_negative(bits, "mode")?).await?;
            Reply::None
        }
        CcdCommand::GetMode => Reply::Int(i64::from(translator.get_mode().await?)),
        CcdCommand::SetHardwareParameters(text) => {
            translator.set_hardware_params(parse_hw_par(&text)?).await?;
            Reply::None
        }
        CcdCommand::GetHardwareParameters => {
            let params = translator.get_hardware_params().await?;
            Reply::Text(format_hw_par(&params))
        }
        CcdCommand::SetProfile(code) => {
            translator.set_profile(code).await?;
            Reply::None
        }
        CcdCommand::GetProfile => Reply::Int(translator.get_profile().await?),
        CcdCommand::SetKinematicsWindowSize(window) => {
            translator
                .set_kinetics_window_size(non_negative(window, "kinetics window size")?)
                .await?;
            Reply::None
        }
        CcdCommand::GetKinematicsWindowSize => {
            Reply::Int(i64::from(translator.get_kinetics_window_size().await?))
        }
        CcdCommand::SetKinematicsParameters(args) => {
            let [window, line_begin, stripes] = u32_array::<3>(&args, "kinetics pars")?;
            translator
                .set_kinetics_params(window, line_begin, stripes)
                .await?;
            Reply::None
        }
        CcdCommand::GetKinematicsParameters => {
            let kinetics = translator.get_kinetics_params().await?;
            ints([kinetics.window, kinetics.line_begin, kinetics.stripes])
        }
        CcdCommand::StartAcquisition => {
            translator.start_acquisition().await?;
            Reply::None
        }
        CcdCommand::StopAcquisition => {
            translator.stop_acquisition().await?;
            Reply::None
        }
        CcdCommand::ReadFrame(frame_nb, size) => {
            let size = to_usize(size, "frame size")?;
            Reply::Bytes(translator.read_frame(frame_nb, size).await?)
        }
        CcdCommand::ReadConcatenatedFrames(size) => {
            let size = to_usize(size, "frame size")?;
            Reply::Bytes(translator.read_concat_frames(size).await?)
        }
        CcdCommand::StartLiveMode => {
            translator.start_live().await?;
            Reply::None
        }
        CcdCommand::QueryCurrentFrameCount => {
            Reply::Int(translator.current_frame_count().await?)
        }
        CcdCommand::ExecSerialCommand(text) => {
            Reply::Text(translator.exec_serial_command(&text).await?)
        }
        CcdCommand::QueryPendingChangeCount => Reply::Int(translator.pending_change_count()),
        CcdCommand::ReadLegacyCcdParameters => {
            Reply::Floats(translator.legacy_ccd_params().await?)
        }
        CcdCommand::ReadBeamParameters => Reply::Floats(translator.beam_params().await?),
    };
    Ok(reply)
}
