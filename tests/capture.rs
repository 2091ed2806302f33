use std::fs;
use std::sync::mpsc;
use std::time::Duration;

use embassy_futures::{block_on, join::join};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal,
};
use embedded_can::{ExtendedId, Frame as _, StandardId};
use n2k_logger::{
    archive::completed_logs,
    capture::{pipeline, CaptureError, Queue},
    Error, Filter, LogWriter, ParsedRecord, WriterConfig,
};

use crate::bus::{Disconnected, FakeCan, Frame, StepClock};


const POSITION_RAPID: u32 = 0x09F8_0109; // 129025 from 9
const GNSS_POSITION: u32 = 0x0DF8_0509; // 129029 from 9

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn frame(raw: u32, data: &[u8]) -> Frame {
    Frame::new(ExtendedId::new(raw).unwrap(), data).unwrap()
}

fn records(contents: &str) -> Vec<ParsedRecord> {
    contents.lines().skip(1).map(|l| l.parse().unwrap()).collect()
}

#[test]
fn captured_frames_end_up_in_the_log() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = WriterConfig::new(dir.path().join("boat.n2k"));

    let frames = vec![
        frame(GNSS_POSITION, &[0x80, 0x2b, 0xb3, 0x6d, 0x48, 0xa0, 0xe2, 0xa8]),
        frame(POSITION_RAPID, &[1, 2, 3, 4, 5, 6, 7, 8]),
        frame(0x18EA_2301, &[]),
        frame(GNSS_POSITION, &[0xff]),
        // not N2K: dropped by the recorder
        Frame::new(StandardId::new(0x123).unwrap(), &[1]).unwrap(),
        // never captured
        Frame::new_remote(ExtendedId::new(GNSS_POSITION).unwrap(), 8).unwrap(),
    ];

    let stop = Signal::<CriticalSectionRawMutex, ()>::new();
    let queue = Queue::<CriticalSectionRawMutex, 2>::new();
    let clock = StepClock::default();
    let writer = LogWriter::create_with_clock(&config, StepClock::default()).unwrap();

    let (mut capture, recorder) =
        pipeline(&queue, &stop, FakeCan::new(frames, &stop), &clock, Vec::new(), writer);
    let (captured, recorded) = block_on(join(capture.run(), recorder.run()));

    let captured = captured.unwrap();
    assert_eq!(captured.received, 6);
    assert_eq!(captured.filtered, 0);
    assert_eq!(captured.rejected, 1);
    assert_eq!(captured.queued, 5);

    let recorded = recorded.unwrap();
    assert_eq!(recorded.written, 4);
    assert_eq!(recorded.dropped, 1);

    let contents = fs::read_to_string(&config.base_path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("timestamp,priority,pgn,source,destination,dlc,data"));
    assert_eq!(
        lines.next(),
        Some("2021-03-01 12:00:00.000000,3,129029,9,255,8,80,2B,B3,6D,48,A0,E2,A8")
    );
    assert_eq!(
        lines.next(),
        Some("2021-03-01 12:00:01.000000,2,129025,9,255,8,01,02,03,04,05,06,07,08")
    );
    assert_eq!(lines.next(), Some("2021-03-01 12:00:02.000000,6,59904,1,35,0"));
    assert_eq!(lines.next(), Some("2021-03-01 12:00:03.000000,3,129029,9,255,1,FF"));
    assert_eq!(lines.next(), None);
}

#[test]
fn only_accepted_pgns_are_logged() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = WriterConfig::new(dir.path().join("boat.n2k"));

    let frames = (0..6).map(|i| {
        let raw = if i % 2 == 0 { POSITION_RAPID } else { GNSS_POSITION };
        frame(raw, &[i])
    });

    let stop = Signal::<CriticalSectionRawMutex, ()>::new();
    let queue = Queue::<CriticalSectionRawMutex, 4>::new();
    let writer = LogWriter::create(&config).unwrap();

    let (mut capture, recorder) = pipeline(
        &queue,
        &stop,
        FakeCan::new(frames, &stop),
        StepClock::default(),
        vec![Filter::pgn(129_025)],
        writer,
    );
    let (captured, recorded) = block_on(join(capture.run(), recorder.run()));

    assert_eq!(captured.unwrap().filtered, 3);
    assert_eq!(recorded.unwrap().written, 3);

    let logged = records(&fs::read_to_string(&config.base_path).unwrap());
    assert_eq!(logged.len(), 3);
    assert!(logged.iter().all(|r| r.pgn == 129_025));
    assert_eq!(
        logged.iter().map(|r| r.data[0]).collect::<Vec<_>>(),
        [0, 2, 4]
    );
}

#[test]
fn transport_failure_still_completes_the_log() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = WriterConfig::new(dir.path().join("boat.n2k"));

    let frames = (0..3).map(|i| frame(GNSS_POSITION, &[i; 8]));

    let stop = Signal::<CriticalSectionRawMutex, ()>::new();
    let queue = Queue::<CriticalSectionRawMutex, 1>::new();
    let writer = LogWriter::create(&config).unwrap();

    let can = FakeCan::new(frames, &stop).disconnecting();
    let (mut capture, recorder) = pipeline(&queue, &stop, can, StepClock::default(), Vec::new(), writer);
    let (captured, recorded) = block_on(join(capture.run(), recorder.run()));

    assert!(matches!(captured, Err(CaptureError::Can(Disconnected))));
    assert_eq!(capture.stats().queued, 3);
    assert_eq!(recorded.unwrap().written, 3);
    assert_eq!(records(&fs::read_to_string(&config.base_path).unwrap()).len(), 3);
}

#[test]
fn recorder_on_its_own_thread_rotates_without_losing_frames() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    // header plus three 68 byte records crosses the limit
    let config = WriterConfig::new(dir.path().join("boat.n2k")).with_max_bytes(200);

    let frames: Vec<_> = (0..10).map(|i| frame(GNSS_POSITION, &[i; 8])).collect();

    let stop = Signal::<CriticalSectionRawMutex, ()>::new();
    let queue = Queue::<CriticalSectionRawMutex, 2>::new();
    let rotation_clock = StepClock::default();
    let writer = LogWriter::create_with_clock(&config, &rotation_clock).unwrap();

    let (mut capture, recorder) =
        pipeline(&queue, &stop, FakeCan::new(frames, &stop), StepClock::default(), Vec::new(), writer);

    let recorded = std::thread::scope(|s| {
        let recorder = s.spawn(move || block_on(recorder.run()));
        let captured = block_on(capture.run()).unwrap();
        assert_eq!(captured.queued, 10);

        recorder.join().unwrap()
    });
    assert_eq!(recorded.unwrap().written, 10);

    let mut files = completed_logs(&config.base_path).unwrap();
    assert_eq!(files.len(), 3);
    files.push(config.base_path.clone());

    let mut seen = Vec::new();
    for file in &files {
        let logged = records(&fs::read_to_string(file).unwrap());
        assert!(!logged.is_empty() && logged.len() <= 3);
        seen.extend(logged.iter().map(|r| r.data[0]));
    }
    assert_eq!(seen, (0..10).collect::<Vec<u8>>());
}

static FAILING_STOP: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static FAILING_QUEUE: Queue<CriticalSectionRawMutex, 1> = Channel::new();

#[test]
fn writer_failure_ends_the_capture_too() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = WriterConfig::new(dir.path().join("boat.n2k"));

    // every log() fails with WriterClosed
    let mut writer = LogWriter::create(&config).unwrap();
    writer.stop().unwrap();

    let frames: Vec<_> = (0..5).map(|i| frame(GNSS_POSITION, &[i; 8])).collect();
    let (done_tx, done_rx) = mpsc::channel();

    std::thread::spawn(move || {
        let (mut capture, recorder) = pipeline(
            &FAILING_QUEUE,
            &FAILING_STOP,
            FakeCan::new(frames, &FAILING_STOP),
            StepClock::default(),
            Vec::new(),
            writer,
        );
        let (captured, recorded) = block_on(join(capture.run(), recorder.run()));

        let _ = done_tx.send((captured.is_ok(), matches!(recorded, Err(Error::WriterClosed))));
    });

    let (captured_ok, writer_closed) = done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert!(captured_ok);
    assert!(writer_closed);
}
