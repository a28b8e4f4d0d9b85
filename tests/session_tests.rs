//! Live session lifecycle against in-memory transport and signaling

mod common;

use common::{FakeSignaling, Harness};
use ria::session::{LiveSession, LocalAudioTrack, SessionState, TransportEvent, CONTROL_CHANNEL_LABEL};
use ria::RiaError;

#[tokio::test]
async fn test_connects_exactly_once() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());

    session.start().await.unwrap();

    assert_eq!(session.state(), SessionState::Connected { channel_open: false });
    assert_eq!(session.connections(), 1);
    assert_eq!(h.transport.created(), 1);

    let offers = h.signaling.offers.lock().clone();
    assert_eq!(offers.len(), 1);
    assert_eq!(offers[0].sdp_type, "offer");
    assert_eq!(Some(offers[0].session_id.as_str()), session.session_id());

    let peer = h.transport.last_peer().unwrap();
    assert!(peer.local.lock().is_some());
    assert!(peer.remote.lock().as_ref().unwrap().is_answer());
}

#[tokio::test]
async fn test_candidates_gathered_before_offer_are_not_lost() {
    let h = Harness::build(false, FakeSignaling::new(), 3);
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let session_id = session.session_id().unwrap().to_string();

    let peer = h.transport.last_peer().unwrap();
    peer.gather();
    peer.gather();

    assert_eq!(h.signaling.wait_for_candidates(5).await, 5);
    session.stop().await;

    let generated = peer.gathered.load(std::sync::atomic::Ordering::SeqCst);
    assert_eq!(h.signaling.candidate_count(), generated);
    for message in h.signaling.candidates.lock().iter() {
        assert_eq!(message.session_id, session_id);
        assert_eq!(message.message_type, "ice-candidate");
    }
}

#[tokio::test]
async fn test_candidate_failures_do_not_abort() {
    let h = Harness::build(false, FakeSignaling::dropping_candidates(), 2);
    let mut session = LiveSession::new(h.deps());

    session.start().await.unwrap();
    tokio::task::yield_now().await;

    assert!(session.state().is_connected());
    assert_eq!(h.signaling.candidate_count(), 0);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();

    session.stop().await;
    let once = (session.state(), h.journal.lock().clone());
    session.stop().await;
    let twice = (session.state(), h.journal.lock().clone());

    assert_eq!(once, twice);
    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.session_id().is_none());
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());

    session.stop().await;

    assert_eq!(session.state(), SessionState::Idle);
    assert!(h.journal.lock().is_empty());
}

#[tokio::test]
async fn test_teardown_order() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();

    session.stop().await;

    assert_eq!(
        *h.journal.lock(),
        vec!["track.stop", "channel.close", "peer.close"]
    );
    assert!(h.media.last_track().unwrap().is_stopped());
}

#[tokio::test]
async fn test_media_denied_creates_no_session() {
    let h = Harness::build(true, FakeSignaling::new(), 0);
    let mut session = LiveSession::new(h.deps());

    let result = session.start().await;

    assert!(matches!(result, Err(RiaError::MediaAcquisition(_))));
    assert_eq!(session.state(), SessionState::Error);
    assert_eq!(h.transport.created(), 0);
    assert!(h.signaling.offers.lock().is_empty());
    assert!(session.session_id().is_none());
}

#[tokio::test]
async fn test_signaling_failure_releases_everything() {
    let h = Harness::build(false, FakeSignaling::failing(), 0);
    let mut session = LiveSession::new(h.deps());

    let result = session.start().await;

    assert!(matches!(result, Err(RiaError::Signaling(_))));
    assert_eq!(session.state(), SessionState::Error);
    assert!(matches!(session.last_error(), Some(RiaError::Signaling(_))));
    assert!(h.transport.last_peer().unwrap().is_closed());
    assert!(h.media.last_track().unwrap().is_stopped());
    assert!(session.session_id().is_none());
    assert!(h.ducking.detach_track().is_none());

    // A fresh attempt is allowed; stopping from Error closes
    session.stop().await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_second_start_tears_down_first() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let first_id = session.session_id().unwrap().to_string();
    let first_peer = h.transport.last_peer().unwrap();

    session.start().await.unwrap();

    assert!(first_peer.is_closed());
    assert_eq!(h.transport.created(), 2);
    assert_ne!(session.session_id().unwrap(), first_id);
    assert_eq!(session.connections(), 2);
}

#[tokio::test]
async fn test_remote_track_attached_once() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let peer = h.transport.last_peer().unwrap();

    for _ in 0..3 {
        peer.emit(TransportEvent::RemoteTrack {
            stream_id: "remote-1".into(),
        });
    }
    for _ in 0..3 {
        let event = session.next_event().await.unwrap();
        assert!(session.handle_event(event).await.is_none());
    }

    assert_eq!(*h.sink.attached.lock(), vec!["remote-1"]);
}

#[tokio::test]
async fn test_channel_flag_follows_open_and_close() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let peer = h.transport.last_peer().unwrap();

    peer.emit(TransportEvent::ChannelOpen);
    let event = session.next_event().await.unwrap();
    session.handle_event(event).await;
    assert!(session.is_channel_open());

    session.send_control("ping").await.unwrap();
    let channel = peer.channel.lock().clone().unwrap();
    assert_eq!(*channel.sent.lock(), vec!["ping"]);
    assert_eq!(CONTROL_CHANNEL_LABEL, "text");

    peer.emit(TransportEvent::ChannelClosed);
    let event = session.next_event().await.unwrap();
    session.handle_event(event).await;
    assert_eq!(session.state(), SessionState::Connected { channel_open: false });
    assert!(session.send_control("ping").await.is_err());
}

#[tokio::test]
async fn test_channel_message_is_returned() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let peer = h.transport.last_peer().unwrap();

    peer.emit(TransportEvent::ChannelMessage(r#"{"reply_preview":"hi"}"#.into()));
    let event = session.next_event().await.unwrap();

    assert_eq!(
        session.handle_event(event).await.as_deref(),
        Some(r#"{"reply_preview":"hi"}"#)
    );
}

#[tokio::test]
async fn test_connection_failure_tears_down() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let peer = h.transport.last_peer().unwrap();

    peer.emit(TransportEvent::ConnectionFailed("ice failed".into()));
    let event = session.next_event().await.unwrap();
    session.handle_event(event).await;

    assert_eq!(session.state(), SessionState::Error);
    assert!(matches!(session.last_error(), Some(RiaError::Transport(_))));
    assert!(peer.is_closed());
    assert!(session.next_event().await.is_none());
}

#[tokio::test]
async fn test_mic_attached_to_ducking_while_connected() {
    let h = Harness::new();
    let mut session = LiveSession::new(h.deps());
    session.start().await.unwrap();
    let track = h.media.last_track().unwrap();

    let guard = h.ducking.begin();
    assert!(!track.is_enabled());
    drop(guard);
    assert!(track.is_enabled());

    session.stop().await;
    assert!(h.ducking.detach_track().is_none());
}
