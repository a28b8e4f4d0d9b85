pub mod live;
pub mod signaling;
pub mod state;
pub mod transport;

pub use live::{LiveSession, SessionDeps};
pub use signaling::{
    mint_session_id, CandidateMessage, HttpSignalingClient, IceCandidate, OfferRequest,
    SessionDescription, SignalingClient,
};
pub use state::SessionState;
pub use transport::{
    ControlChannel, LocalAudioTrack, MediaDevices, NoMediaEngine, PeerConnection, RemoteAudioSink, Transport,
    TransportEvent, TransportFactory, CONTROL_CHANNEL_LABEL,
};
