//! Integration tests for the Frelon command translator
//!
//! Every test drives a `FrelonTranslator` bound to a fresh `MockEngine`
//! (2048x2048 sensor, 16-bit ADC, internal trigger, 1 s exposure) and checks
//! both the translator replies and the engine state underneath.

use frelon_ccd::core::{
    AcqError, AcqStatus, Bin, DeviceState, FileFormat, FrameTransferMode, OverwritePolicy,
    RoiMode, TrigMode,
};
use frelon_ccd::error::CcdError;
use frelon_ccd::hardware::mock::{MockSensor, NB_FILE_STREAMS};
use frelon_ccd::hardware::{AcquisitionEngine, MockEngine};
use frelon_ccd::translator::{FileParamsUpdate, FrelonTranslator, HardwareParams};
use std::sync::Arc;

fn setup() -> (Arc<MockEngine>, FrelonTranslator) {
    let engine = Arc::new(MockEngine::new());
    let translator = FrelonTranslator::new(engine.clone());
    (engine, translator)
}

fn file_update(stream: usize, suffix: &str, overwrite: &str) -> FileParamsUpdate {
    FileParamsUpdate {
        stream,
        active: true,
        directory: "/tmp".to_string(),
        prefix: "img".to_string(),
        suffix: suffix.to_string(),
        next_number: 1,
        index_format: "%04d".to_string(),
        overwrite: overwrite.to_string(),
    }
}

// =============================================================================
// Trigger / Exposure
// =============================================================================

#[tokio::test]
async fn test_positive_exposure_never_leaves_gate_trigger() {
    let (engine, translator) = setup();
    translator.set_trigger(1).await.unwrap();

    for exposure in [0.001, 0.5, 1.0, 5.0, 120.0] {
        translator.set_exp_time(0.0).await.unwrap();
        assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalGate);

        translator.set_exp_time(exposure).await.unwrap();
        assert_ne!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalGate);
        assert_eq!(translator.get_trigger().await.unwrap(), 1);
        assert_eq!(translator.get_exp_time().await.unwrap(), exposure);
    }
}

#[tokio::test]
async fn test_zero_exposure_reads_back_zero() {
    let (engine, translator) = setup();
    translator.set_trigger(2).await.unwrap();
    translator.set_exp_time(0.0).await.unwrap();

    assert_eq!(translator.get_exp_time().await.unwrap(), 0.0);
    assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalGate);
    // The stored engine exposure is untouched
    assert_eq!(engine.exposure_time().await.unwrap(), 1.0);
}

#[tokio::test]
async fn test_zero_exposure_refused_with_internal_trigger() {
    let (engine, translator) = setup();
    let err = translator.set_exp_time(0.0).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
    assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::Internal);
    assert_eq!(engine.exposure_time().await.unwrap(), 1.0);
}

#[tokio::test]
async fn test_trigger_code_one_follows_exposure() {
    let (engine, translator) = setup();

    engine.set_exposure_time(0.0).await.unwrap();
    translator.set_trigger(1).await.unwrap();
    assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalGate);

    translator.set_trigger(0).await.unwrap();
    translator.set_exp_time(5.0).await.unwrap();
    translator.set_trigger(1).await.unwrap();
    assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalSingle);
}

#[tokio::test]
async fn test_trigger_codes_round_trip() {
    let (engine, translator) = setup();
    translator.set_trigger(2).await.unwrap();
    assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalMultiple);
    assert_eq!(translator.get_trigger().await.unwrap(), 2);

    translator.set_trigger(0).await.unwrap();
    assert_eq!(translator.get_trigger().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_trigger_code_does_not_touch_engine() {
    let (engine, translator) = setup();
    translator.set_trigger(2).await.unwrap();

    let err = translator.set_trigger(7).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
    assert_eq!(engine.trigger_mode().await.unwrap(), TrigMode::ExternalMultiple);
}

#[tokio::test]
async fn test_unsupported_engine_trigger_is_invalid_state() {
    let (engine, translator) = setup();
    engine
        .set_trigger_mode(TrigMode::ExternalStartStop)
        .await
        .unwrap();

    let err = translator.get_trigger().await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidState(_)));
    assert_eq!(err.kind(), "invalid_state");
}

// =============================================================================
// Binning / ROI
// =============================================================================

#[tokio::test]
async fn test_binning_is_transposed() {
    let (engine, translator) = setup();
    translator.set_binning([2, 4]).await.unwrap();

    assert_eq!(engine.binning().await.unwrap(), Bin { x: 4, y: 2 });
    assert_eq!(translator.get_binning().await.unwrap(), [2, 4]);
}

#[tokio::test]
async fn test_zero_binning_rejected() {
    let (engine, translator) = setup();
    let err = translator.set_binning([0, 2]).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
    assert_eq!(engine.binning().await.unwrap(), Bin { x: 1, y: 1 });
}

#[tokio::test]
async fn test_roi_round_trip() {
    let (_engine, translator) = setup();
    translator.set_roi([100, 200, 1123, 711]).await.unwrap();
    assert_eq!(translator.get_roi().await.unwrap(), [100, 200, 1123, 711]);

    let dim = translator.frame_dim(false).await.unwrap();
    assert_eq!(dim.size.width, 1024);
    assert_eq!(dim.size.height, 512);
}

#[tokio::test]
async fn test_inverted_roi_rejected() {
    let (_engine, translator) = setup();
    let err = translator.set_roi([100, 200, 50, 711]).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
}

// =============================================================================
// Kinetics
// =============================================================================

#[tokio::test]
async fn test_kinetics_window_round_trip() {
    let (_engine, translator) = setup();
    translator.set_binning([4, 1]).await.unwrap();

    translator.set_kinetics_params(512, 1024, 1).await.unwrap();
    let kinetics = translator.get_kinetics_params().await.unwrap();
    assert_eq!(
        (kinetics.window, kinetics.line_begin, kinetics.stripes),
        (512, 1024, 1)
    );
    assert_eq!(translator.get_kinetics_window_size().await.unwrap(), 512);
}

#[tokio::test]
async fn test_kinetics_window_clamped_to_sensor() {
    let (_engine, translator) = setup();
    translator.set_binning([4, 1]).await.unwrap();

    translator.set_kinetics_params(100, 1990, 1).await.unwrap();
    let kinetics = translator.get_kinetics_params().await.unwrap();
    // (2048 - 1990) / 4 * 4
    assert_eq!(kinetics.window, 56);
    assert!(kinetics.window < 100);
    assert_eq!(kinetics.line_begin, 1990);
}

#[tokio::test]
async fn test_kinetics_window_must_match_binning() {
    let (engine, translator) = setup();
    translator.set_binning([4, 1]).await.unwrap();
    let roi_before = engine.roi().await.unwrap();

    let err = translator.set_kinetics_params(10, 0, 1).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
    assert_eq!(engine.roi().await.unwrap(), roi_before);
    assert_eq!(engine.roi_line_begin().await.unwrap(), 0);
}

#[tokio::test]
async fn test_kinetics_line_begin_outside_sensor() {
    let (_engine, translator) = setup();
    let err = translator.set_kinetics_params(16, 2048, 1).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
}

#[tokio::test]
async fn test_kinetics_window_size_keeps_line_begin() {
    let (_engine, translator) = setup();
    translator.set_kinetics_params(256, 300, 1).await.unwrap();

    translator.set_kinetics_window_size(128).await.unwrap();
    let kinetics = translator.get_kinetics_params().await.unwrap();
    assert_eq!((kinetics.window, kinetics.line_begin), (128, 300));
}

#[tokio::test]
async fn test_kinetics_keeps_horizontal_roi() {
    let (_engine, translator) = setup();
    translator.set_roi([64, 0, 1087, 2047]).await.unwrap();
    translator.set_kinetics_params(100, 50, 1).await.unwrap();
    assert_eq!(translator.get_roi().await.unwrap(), [64, 50, 1087, 149]);
}

// =============================================================================
// Hardware parameters / profile
// =============================================================================

#[tokio::test]
async fn test_hardware_params_in_kinetic_mode_move_window() {
    let (engine, translator) = setup();
    translator.set_kinetics_params(200, 0, 1).await.unwrap();

    let params = HardwareParams::from_codes([3, 1900, 1, 0, 3]).unwrap();
    translator.set_hardware_params(params).await.unwrap();

    assert_eq!(engine.roi_mode().await.unwrap(), RoiMode::Kinetic);
    let flip = engine.flip().await.unwrap();
    assert!(flip.vertical && flip.horizontal);

    // 1900 + 200 exceeds 2048 lines: clamped to 148
    let kinetics = translator.get_kinetics_params().await.unwrap();
    assert_eq!((kinetics.window, kinetics.line_begin), (148, 1900));

    let read_back = translator.get_hardware_params().await.unwrap();
    assert_eq!(read_back.to_codes(), [3, 1900, 1, 0, 3]);
}

#[tokio::test]
async fn test_hardware_params_validate_before_writing() {
    let (engine, translator) = setup();
    translator.set_binning([4, 1]).await.unwrap();

    let params = HardwareParams::from_codes([1, 2048, 1, 0, 3]).unwrap();
    let err = translator.set_hardware_params(params).await.unwrap_err();
    assert!(matches!(err, CcdError::InvalidParameter(_)));
    assert_eq!(engine.roi_mode().await.unwrap(), RoiMode::None);
    assert!(!engine.flip().await.unwrap().horizontal);
}

#[tokio::test]
async fn test_profile_codes() {
    let (engine, translator) = setup();
    translator.set_profile(3).await.unwrap();
    assert_eq!(
        engine.frame_transfer_mode().await.unwrap(),
        FrameTransferMode::FrameTransfer
    );
    assert_eq!(translator.get_profile().await.unwrap(), 3);

    translator.set_profile(0).await.unwrap();
    assert_eq!(translator.get_profile().await.unwrap(), 0);

    for bad in [1, 2, 4, -1] {
        let err = translator.set_profile(bad).await.unwrap_err();
        assert!(matches!(err, CcdError::InvalidParameter(_)));
    }
}

// =============================================================================
// Mode bitmask
// =============================================================================

#[tokio::test]
async fn test_mode_round_trip_restricted_to_defined_bits() {
    let (_engine, translator) = setup();
    for bits in [0x00, 0x01, 0x02, 0x0b, 0x10, 0x1f, 0x3f, 0xffe] {
        translator.set_mode(bits).await.unwrap();
        assert_eq!(translator.get_mode().await.unwrap(), bits & 0x1f);
    }
}

#[tokio::test]
async fn test_mode_pushes_engine_flags() {
    let (engine, translator) = setup();
    translator.set_mode(0x01 | 0x08 | 0x10).await.unwrap();

    assert!(engine.autosave().await.unwrap());
    assert!(engine.stripe_concat().await.unwrap());
    assert!(!engine.live_display().await.unwrap());
    assert!(!engine.e2v_correction_active().await.unwrap());
    assert!(!translator.session().await.acquire_raw_frames);

    translator.set_mode(0x02).await.unwrap();
    assert!(translator.session().await.acquire_raw_frames);
    assert!(engine.e2v_correction_active().await.unwrap());
}

// =============================================================================
// File streams
// =============================================================================

#[tokio::test]
async fn test_file_params_derive_format_and_policy() {
    let (_engine, translator) = setup();
    translator
        .set_file_params_ext(file_update(0, "frame.edf", "yes"))
        .await
        .unwrap();

    let report = translator.get_file_params_ext(0).await.unwrap();
    assert!(report.active);
    assert_eq!(report.file_format, FileFormat::Edf);
    assert_eq!(report.overwrite, OverwritePolicy::Overwrite);
    assert_eq!(report.overwrite.token(), "yes");
    assert_eq!(report.directory, "/tmp");
    assert_eq!(report.next_number, 1);
}

#[tokio::test]
async fn test_file_params_raw_and_abort() {
    let (_engine, translator) = setup();
    let mut update = file_update(1, ".raw", "n");
    update.active = false;
    translator.set_file_params_ext(update).await.unwrap();

    let report = translator.get_file_params_ext(1).await.unwrap();
    assert!(!report.active);
    assert_eq!(report.file_format, FileFormat::Raw);
    assert_eq!(report.overwrite.token(), "no");
}

#[tokio::test]
async fn test_single_stream_file_params_force_first_active_stream() {
    let (engine, translator) = setup();
    let mut update = file_update(1, ".EDF", "y");
    update.active = false;
    translator.set_file_params(update).await.unwrap();

    assert!(engine.file_stream_active(0).await.unwrap());
    let params = engine.file_stream_params(0).await.unwrap();
    assert_eq!(params.file_format, FileFormat::Edf);
    assert_eq!(params.index_format, "%04d");
    assert_eq!(translator.get_file_params().await.unwrap().stream, 0);
}

#[tokio::test]
async fn test_invalid_stream_index_is_engine_error() {
    let (_engine, translator) = setup();
    let err = translator
        .get_file_params_ext(NB_FILE_STREAMS)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "engine");
}

#[tokio::test]
async fn test_file_header_replaced_in_one_call() {
    let (engine, translator) = setup();
    translator
        .set_file_header("Sample = lysozyme;\nEnergy = 12.4;\n")
        .await
        .unwrap();
    translator.set_file_header("Operator=jdoe").await.unwrap();

    let header = engine.common_header();
    assert_eq!(header.len(), 1);
    assert_eq!(header["Operator"], "jdoe");
}

#[tokio::test]
async fn test_write_frames() {
    let (engine, translator) = setup();
    translator.write_single_frame(5).await.unwrap();

    translator.set_mode(0x08).await.unwrap();
    translator.set_nb_frames(4).await.unwrap();
    translator.write_concat_frames().await.unwrap();

    assert_eq!(engine.writes(), vec![(5, 1), (0, 4)]);
}

// =============================================================================
// Frame count / readout
// =============================================================================

#[tokio::test]
async fn test_nb_frames_sets_concat_count_with_stripe_concat() {
    let (engine, translator) = setup();
    translator.set_nb_frames(10).await.unwrap();
    assert_eq!(engine.nb_concat_frames().await.unwrap(), 1);

    translator.set_mode(0x08).await.unwrap();
    translator.set_nb_frames(10).await.unwrap();
    assert_eq!(engine.nb_concat_frames().await.unwrap(), 10);

    translator.set_nb_frames(0).await.unwrap();
    assert_eq!(engine.nb_concat_frames().await.unwrap(), 16);
    assert_eq!(translator.get_nb_frames().await.unwrap(), 0);
}

#[tokio::test]
async fn test_read_frame_size_mismatch_skips_engine_read() {
    let (engine, translator) = setup();
    let frame_size = 2048 * 2048 * 2;

    let err = translator.read_frame(0, frame_size + 2).await.unwrap_err();
    assert!(matches!(
        err,
        CcdError::SizeMismatch {
            context: "frame",
            ..
        }
    ));
    assert_eq!(engine.read_calls(), 0);

    let data = translator.read_frame(0, frame_size).await.unwrap();
    assert_eq!(data.len(), frame_size);
    assert_eq!(engine.read_calls(), 1);
}

#[tokio::test]
async fn test_short_read_detected_after_read() {
    let (engine, translator) = setup();
    translator.set_roi([0, 0, 9, 9]).await.unwrap();
    engine.inject_short_read(150);

    let err = translator.read_frame(0, 200).await.unwrap_err();
    assert_eq!(err.to_string(), "Client expects 200 bytes, data str has 150");
    assert_eq!(engine.read_calls(), 1);
}

#[tokio::test]
async fn test_read_concat_frames() {
    let (_engine, translator) = setup();
    translator.set_roi([0, 0, 9, 9]).await.unwrap();

    let data = translator.read_concat_frames(600).await.unwrap();
    assert_eq!(data.len(), 600);
}

#[tokio::test]
async fn test_read_concat_frames_truncates_partial_frames() {
    let (engine, translator) = setup();
    translator.set_roi([0, 0, 9, 9]).await.unwrap();

    // 500 bytes hold two whole 200-byte frames: 400 bytes come back
    let err = translator.read_concat_frames(500).await.unwrap_err();
    assert!(matches!(
        err,
        CcdError::SizeMismatch {
            expected: 500,
            actual: 400,
            ..
        }
    ));
    assert_eq!(engine.read_calls(), 1);
}

#[tokio::test]
async fn test_current_frame_count() {
    let (engine, translator) = setup();
    engine.set_image_counters(9, 4);
    assert_eq!(translator.current_frame_count().await.unwrap(), 10);

    translator.set_mode(0x01).await.unwrap();
    assert_eq!(translator.current_frame_count().await.unwrap(), 5);

    translator.set_mode(0x01 | 0x02).await.unwrap();
    assert_eq!(translator.current_frame_count().await.unwrap(), 10);
}

// =============================================================================
// State / status
// =============================================================================

#[tokio::test]
async fn test_state_follows_acquisition() {
    let (_engine, translator) = setup();
    assert_eq!(translator.state().await.unwrap(), DeviceState::Ready);

    translator.start_acquisition().await.unwrap();
    assert_eq!(translator.state().await.unwrap(), DeviceState::Acquiring);

    translator.stop_acquisition().await.unwrap();
    assert_eq!(translator.state().await.unwrap(), DeviceState::Ready);

    translator.start_live().await.unwrap();
    assert_eq!(translator.state().await.unwrap(), DeviceState::Acquiring);
}

#[tokio::test]
async fn test_fault_resets_status_once() {
    let (engine, translator) = setup();
    engine.inject_fault(AcqError::CameraError);

    let err = translator.state().await.unwrap_err();
    match err {
        CcdError::AcquisitionFault(message) => {
            assert_eq!(
                message,
                "Acquisition error: <AcquisitionStatus=AcqFault, Error=CameraError>"
            );
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(engine.reset_status_calls(), 1);
    assert_eq!(translator.state().await.unwrap(), DeviceState::Ready);
}

#[tokio::test]
async fn test_config_status_is_a_fault() {
    let (engine, translator) = setup();
    engine.set_acq_status(AcqStatus::Config);
    let err = translator.state().await.unwrap_err();
    assert_eq!(err.kind(), "acquisition_fault");
    assert_eq!(engine.reset_status_calls(), 1);
}

#[tokio::test]
async fn test_status_text() {
    let (engine, translator) = setup();
    engine.set_ccd_status(0x2a);
    assert_eq!(
        translator.status_text().await.unwrap(),
        "Ready: Camera is Idle (CCD Status: 0x2A)"
    );

    engine.inject_fault(AcqError::CameraError);
    let err = translator.status_text().await.unwrap_err();
    assert!(matches!(err, CcdError::AcquisitionFault(_)));
    assert_eq!(engine.reset_status_calls(), 1);
}

#[tokio::test]
async fn test_model_code() {
    let (_engine, translator) = setup();
    assert_eq!(translator.model_code().await.unwrap(), 2016);

    let engine = Arc::new(MockEngine::with_sensor(MockSensor {
        adc_bits: 14,
        ..MockSensor::default()
    }));
    let translator = FrelonTranslator::new(engine);
    assert_eq!(translator.model_code().await.unwrap(), 2014);
}

#[tokio::test]
async fn test_constant_queries() {
    let (engine, translator) = setup();
    assert_eq!(translator.last_error_message(), "");
    assert_eq!(translator.pending_change_count(), 0);

    translator.reset().await.unwrap();
    assert_eq!(engine.reset_calls(), 1);
}

#[tokio::test]
async fn test_serial_command_pass_through() {
    let (engine, translator) = setup();
    let answer = translator.exec_serial_command(">C0").await.unwrap();
    assert_eq!(answer, "!OK:C0");
    assert_eq!(engine.serial_log(), vec![">C0".to_string()]);
}

#[tokio::test]
async fn test_input_channel() {
    let (_engine, translator) = setup();
    translator.set_input_channel(0x3).await.unwrap();
    assert_eq!(translator.get_input_channel().await.unwrap(), 0x3);
}

// =============================================================================
// Legacy parameters
// =============================================================================

#[tokio::test]
async fn test_legacy_ccd_params() {
    let beam: Vec<f64> = (1..=20).map(f64::from).collect();
    let engine = Arc::new(MockEngine::with_sensor(MockSensor {
        beam_params: beam.clone(),
        ..MockSensor::default()
    }));
    let translator = FrelonTranslator::new(engine.clone());
    translator.set_roi([10, 20, 109, 219]).await.unwrap();

    let params = translator.legacy_ccd_params().await.unwrap();
    assert_eq!(
        &params[..10],
        &[1.0, 0.0, -1.0, 2048.0, 2048.0, 10.0, 20.0, 109.0, 219.0, -1.0]
    );
    assert_eq!(&params[10..], beam.as_slice());
    assert_eq!(translator.beam_params().await.unwrap(), beam);

    // Gated exposure clears the last beam parameter
    translator.set_trigger(1).await.unwrap();
    translator.set_exp_time(0.0).await.unwrap();
    let params = translator.legacy_ccd_params().await.unwrap();
    assert_eq!(params[0], 0.0);
    assert_eq!(params[10 + 19], 0.0);
    assert_eq!(params[10 + 18], 19.0);
}
