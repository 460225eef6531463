// End-to-end decoding of synthetic cluster frames
mod common;

use common::{calibration, init_logging, letterbox, ClusterPainter};
use dash_decoder::assembler::slots;
use dash_decoder::frame::{mark_probes, prepare_frame, REFERENCE_HEIGHT, REFERENCE_WIDTH};
use dash_decoder::gauges::Bar;
use dash_decoder::{DashboardDecoder, DecoderError, LapTracker, SharedVehicleState};
use image::RgbImage;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 7250 rpm, boost 50, 198 deg, 37.25 fuel, 215 km/h, 4th gear, 1:23.456
fn race_frame(width: u32, height: u32) -> RgbImage {
    let cal = calibration();
    ClusterPainter::new(&cal, width, height)
        .digits(slots::RPM.start, &[7, 2, 5, 0])
        .digits(slots::BOOST.start, &[5, 0])
        .digits(slots::TEMP.start, &[1, 9, 8])
        .digits(slots::FUEL.start, &[3, 7, 2, 5])
        .digits(slots::SPEED.start, &[2, 1, 5])
        .digit(slots::GEAR, 4)
        .digits(slots::LAP_TIME.start, &[6, 5, 4, 3, 2, 1])
        .bar(Bar::FrontRollbar, 3)
        .bar(Bar::RearRollbar, -1)
        .bar(Bar::Brake, 7)
        .knob(6)
        .finish()
}

#[test]
fn test_decode_full_frame() {
    init_logging();
    let t0 = Instant::now();
    let mut decoder = DashboardDecoder::with_start_time(Arc::new(calibration()), t0);

    let state = decoder.decode(&race_frame(400, 200), t0 + Duration::from_millis(33)).unwrap();

    assert_eq!(state.rpm, 7250);
    assert_eq!(state.boost_raw, 50);
    assert_eq!(state.temp, 198);
    assert!((state.fuel - 37.25).abs() < 1e-9);
    assert_eq!(state.speed, 215);
    assert_eq!(state.gear, 4);
    assert!((state.lap_time - 83.456).abs() < 1e-9);
    assert_eq!(state.front_rollbar, 3);
    assert_eq!(state.rear_rollbar, -1);
    assert_eq!(state.brake, 7);
    assert_eq!(state.boost_knob, 6);
    // 30 -> 50 is beyond the snap threshold
    assert_eq!(state.cur_boost, 50.0);
}

#[test]
fn test_repeated_ticks_are_idempotent() {
    let t0 = Instant::now();
    let mut decoder = DashboardDecoder::with_start_time(Arc::new(calibration()), t0);
    let frame = race_frame(400, 200);

    let first = decoder.decode(&frame, t0 + Duration::from_millis(33)).unwrap().clone();
    for tick in 2..6 {
        let state = decoder.decode(&frame, t0 + Duration::from_millis(33 * tick)).unwrap();
        assert!(state.same_readings(&first));
        assert_ne!(state.updated_at, first.updated_at);
    }
}

#[test]
fn test_unknown_pattern_reads_zero() {
    let cal = calibration();
    let frame = ClusterPainter::new(&cal, 400, 200)
        .digits(slots::SPEED.start, &[1, 2, 3])
        .raw_segments(slots::SPEED.start, "bcg")
        .finish();
    let decoder = DashboardDecoder::new(Arc::new(cal.clone()));

    let readout = decoder.read_readout(&frame).unwrap();
    assert_eq!(readout.digit(slots::SPEED.start), 0);
    assert!(!readout.is_recognized(slots::SPEED.start));
    assert!(readout.is_recognized(slots::SPEED.start + 1));
    assert_eq!(readout.digit(slots::SPEED.start + 2), 3);
}

#[test]
fn test_knob_keeps_last_position() {
    let cal = calibration();
    let t0 = Instant::now();
    let mut decoder = DashboardDecoder::with_start_time(Arc::new(cal.clone()), t0);

    let lit = ClusterPainter::new(&cal, 400, 200).knob(8).finish();
    assert_eq!(decoder.decode(&lit, t0).unwrap().boost_knob, 8);

    let dark = ClusterPainter::new(&cal, 400, 200).finish();
    assert_eq!(decoder.decode(&dark, t0).unwrap().boost_knob, 8);
}

#[test]
fn test_letterboxed_capture() {
    init_logging();
    let content = race_frame(REFERENCE_WIDTH, REFERENCE_HEIGHT);
    let capture = letterbox(&content, 1400, 1000, 60, 20);

    let (frame, crop) = prepare_frame(&capture, None).unwrap();
    assert_eq!((crop.left, crop.top), (60, 20));
    assert_eq!((crop.width(), crop.height()), (REFERENCE_WIDTH, REFERENCE_HEIGHT));

    let mut decoder = DashboardDecoder::new(Arc::new(calibration()));
    let state = decoder.decode(&frame, Instant::now()).unwrap();
    assert_eq!(state.rpm, 7250);
    assert_eq!(state.gear, 4);

    // A locked box gives the same frame without searching
    let (locked, _) = prepare_frame(&capture, Some(crop)).unwrap();
    assert_eq!(locked, frame);
}

#[test]
fn test_small_frame_is_rejected() {
    let mut decoder = DashboardDecoder::new(Arc::new(calibration()));
    let shared = SharedVehicleState::default();

    let err = decoder.tick(&RgbImage::new(100, 100), &shared, Instant::now()).unwrap_err();
    assert!(matches!(err, DecoderError::FrameTooSmall { .. }));
    assert!(shared.snapshot().updated_at.is_none());
}

#[test]
fn test_probe_overlay_marks_every_probe() {
    let cal = calibration();
    let mut frame = ClusterPainter::new(&cal, 400, 200).finish();

    let marked = mark_probes(&mut frame, &cal);
    assert_eq!(marked, cal.probe_points().len());
    assert_eq!(*frame.get_pixel(cal.knob.positions[0].x, cal.knob.positions[0].y), image::Rgb([255, 0, 0]));
}

#[test]
fn test_lap_closes_from_decoded_clock() {
    let cal = calibration();
    let t0 = Instant::now();
    let mut decoder = DashboardDecoder::with_start_time(Arc::new(cal.clone()), t0);
    let mut laps = LapTracker::new(t0);

    let finish_line = race_frame(400, 200);
    let new_lap = ClusterPainter::new(&cal, 400, 200)
        .digits(slots::FUEL.start, &[3, 7, 0, 0])
        .digits(slots::LAP_TIME.start, &[0, 0, 5, 0, 0, 0])
        .finish();

    let state = decoder.decode(&finish_line, t0).unwrap();
    assert!(laps.update(state.lap_time, state.fuel, t0).is_none());

    let later = t0 + Duration::from_millis(40);
    let state = decoder.decode(&new_lap, later).unwrap();
    let lap = laps.update(state.lap_time, state.fuel, later).unwrap();
    assert!((lap.lap_time - 83.456).abs() < 1e-9);
    assert!((lap.fuel - 37.0).abs() < 1e-9);
}
