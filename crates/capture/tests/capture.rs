//! Capture engine behaviour against a scripted chat surface

mod support;

use std::time::Duration;

use chatprobe_capture::surface::{Segment, SegmentKind};
use chatprobe_capture::{CaptureEngine, CaptureError, CaptureTimings};
use support::{FakeChat, Reply};
use tokio::time::Instant;

fn timings() -> CaptureTimings {
    CaptureTimings {
        appearance_timeout: Duration::from_secs(20),
        stabilization_timeout: Duration::from_secs(15),
        poll_interval: Duration::from_secs(1),
        settle_interval: Duration::from_secs(3),
    }
}

fn bound() -> Duration {
    let t = timings();
    t.appearance_timeout + t.stabilization_timeout
}

#[tokio::test(start_paused = true)]
async fn captures_streamed_answer_once_length_repeats() {
    let chat = FakeChat::with_history(
        Reply {
            chunks: vec![
                Segment::paragraph("The capital"),
                Segment::paragraph("of France"),
                Segment::paragraph("is Paris."),
            ],
            ..Default::default()
        },
        2,
    );
    let engine = CaptureEngine::new(timings());

    let answer = engine.submit_and_capture(&chat, "Capital of France?").await.unwrap();

    assert!(answer.stable);
    assert_eq!(answer.text, "The capital\nof France\nis Paris.");
    assert!(answer.readings >= 2);
    assert_eq!(chat.submissions(), vec!["Capital of France?".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn renders_line_breaks_as_explicit_tokens() {
    let chat = FakeChat::new(Reply {
        chunks: vec![
            Segment::paragraph("Line one"),
            Segment::new(SegmentKind::Other, "toolbar"),
            Segment::line_break(),
            Segment::paragraph("Line two"),
        ],
        chunk_every: Duration::ZERO,
        ..Default::default()
    });
    let engine = CaptureEngine::new(timings());

    let answer = engine.submit_and_capture(&chat, "two lines please").await.unwrap();

    assert_eq!(answer.text, "Line one\n\n\nLine two");
}

#[tokio::test(start_paused = true)]
async fn no_new_answer_block_is_appearance_timeout() {
    let chat = FakeChat::with_history(
        Reply {
            ignore_containing: Some("ignored".into()),
            ..Default::default()
        },
        1,
    );
    let engine = CaptureEngine::new(timings());

    let start = Instant::now();
    let err = engine
        .submit_and_capture(&chat, "this question is ignored")
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(!err.is_fatal());
    match err {
        CaptureError::AppearanceTimeout { waited } => {
            assert!(waited >= timings().appearance_timeout);
        }
        other => panic!("expected appearance timeout, got {other:?}"),
    }
    assert!(elapsed >= timings().appearance_timeout);
    assert!(elapsed <= bound());
}

#[tokio::test(start_paused = true)]
async fn never_ending_stream_returns_within_both_timeouts() {
    let chat = FakeChat::new(Reply {
        appear_after: Duration::from_secs(19),
        chunks: vec![Segment::paragraph("Once upon a time")],
        endless: true,
        ..Default::default()
    });
    let engine = CaptureEngine::new(timings());

    let start = Instant::now();
    let answer = engine.submit_and_capture(&chat, "tell me a story").await.unwrap();
    let elapsed = start.elapsed();

    assert!(!answer.stable);
    assert!(answer.text.starts_with("Once upon a time"));
    assert!(elapsed <= bound(), "took {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn tolerates_handles_invalidated_after_every_read() {
    let chat = FakeChat::with_history(
        Reply {
            chunks: vec![Segment::paragraph("42")],
            invalidate_after_read: true,
            stale_reads: 2,
            ..Default::default()
        },
        3,
    );
    let engine = CaptureEngine::new(timings());

    let answer = engine.submit_and_capture(&chat, "Six times seven?").await.unwrap();

    assert!(answer.stable);
    assert_eq!(answer.text, "42");
    assert!(chat.reads() >= 3);
}

#[tokio::test(start_paused = true)]
async fn re_locates_input_when_it_goes_stale_before_submit() {
    let chat = FakeChat::new(Reply {
        stale_submits: 2,
        ..Default::default()
    });
    let engine = CaptureEngine::new(timings());

    let answer = engine.submit_and_capture(&chat, "Capital of France?").await.unwrap();

    assert_eq!(answer.text, "Paris");
    assert_eq!(chat.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn consecutive_turns_each_read_their_own_block() {
    let chat = FakeChat::new(Reply {
        chunks: vec![Segment::paragraph("same answer")],
        ..Default::default()
    });
    let engine = CaptureEngine::new(timings());

    let first = engine.submit_and_capture(&chat, "first").await.unwrap();
    let second = engine.submit_and_capture(&chat, "second").await.unwrap();

    assert_eq!(first.text, "same answer");
    assert_eq!(second.text, "same answer");
    assert_eq!(chat.submissions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn blank_answer_block_is_no_answer_text() {
    let chat = FakeChat::new(Reply {
        chunks: vec![Segment::paragraph("")],
        ..Default::default()
    });
    let engine = CaptureEngine::new(timings());

    let err = engine.submit_and_capture(&chat, "anyone there?").await.unwrap_err();

    assert!(!err.is_fatal());
    assert!(matches!(err, CaptureError::NoAnswerText { .. }), "{:?}", err);
    assert!(chat.reads() >= 2);
}

#[tokio::test(start_paused = true)]
async fn keeps_reading_through_transient_driver_errors() {
    let chat = FakeChat::new(Reply {
        chunks: vec![
            Segment::paragraph("The capital"),
            Segment::paragraph("of France"),
            Segment::paragraph("is Paris."),
        ],
        failing_reads: 2,
        ..Default::default()
    });
    let engine = CaptureEngine::new(timings());

    let start = Instant::now();
    let answer = engine.submit_and_capture(&chat, "Capital of France?").await.unwrap();

    assert!(answer.stable);
    assert_eq!(answer.text, "The capital\nof France\nis Paris.");
    assert!(start.elapsed() <= bound());
}
