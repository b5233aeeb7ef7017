//! TCP protocol between a pose engine client and the analysis server.
//!
//! Length-prefixed frames carrying bincode-encoded messages.

use bytes::Bytes;
use futures::{Sink, SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::mode::AnalysisMode;
use crate::pose::RawFrame;
use crate::report::SessionReport;
use crate::session::{AnalysisSession, FrameUpdate, SessionEvent, SessionSummary};
use crate::tracker::PlankTick;

// --- Message types ---

/// Client → Server
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Frame(RawFrame),
    SetMode { mode: AnalysisMode },
    Start,
    Stop,
    ResetExercise,
}

/// Server → Client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Update(FrameUpdate),
    Rejected { reason: String, status: String },
    Report(SessionReport),
    PlankTick(PlankTick),
    Stalled { last_frame_ms: Option<u64> },
    SessionComplete(SessionSummary),
    Status(String),
}

impl From<SessionEvent> for ServerMessage {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Update(update) => ServerMessage::Update(update),
            SessionEvent::Rejected { reason, status } => ServerMessage::Rejected { reason, status },
            SessionEvent::Report(report) => ServerMessage::Report(report),
            SessionEvent::PlankTick(tick) => ServerMessage::PlankTick(tick),
            SessionEvent::Status(status) => ServerMessage::Status(status),
            SessionEvent::Stalled { last_frame_ms } => ServerMessage::Stalled { last_frame_ms },
        }
    }
}

impl ClientMessage {
    /// セッションに適用し、クライアントへ返すメッセージを得る
    pub fn apply(self, session: &mut AnalysisSession, now_ms: u64) -> Vec<ServerMessage> {
        match self {
            ClientMessage::Frame(frame) => session
                .process_frame(&frame, now_ms)
                .into_iter()
                .map(ServerMessage::from)
                .collect(),
            ClientMessage::SetMode { mode } => {
                session.switch_mode(mode, now_ms);
                vec![ServerMessage::Status(session.status().to_string())]
            }
            ClientMessage::Start => {
                session.start(now_ms);
                vec![ServerMessage::Status(session.status().to_string())]
            }
            ClientMessage::Stop => session
                .stop(now_ms)
                .map(ServerMessage::SessionComplete)
                .into_iter()
                .collect(),
            ClientMessage::ResetExercise => {
                session.reset_exercise(now_ms);
                Vec::new()
            }
        }
    }
}

// --- Codec helpers ---

pub type MessageStream<S> = Framed<S, LengthDelimitedCodec>;

/// Create a framed message stream with length-delimited framing.
pub fn message_stream<S: AsyncRead + AsyncWrite>(stream: S) -> MessageStream<S> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(1024 * 1024) // 1MB
        .new_codec();
    Framed::new(stream, codec)
}

/// Send a serializable message (bincode + length prefix).
pub async fn send_message<S, T>(stream: &mut MessageStream<S>, msg: &T) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: Serialize,
{
    let data = bincode::serialize(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Send through the write half of a split stream.
pub async fn send_to_sink<K, T>(sink: &mut K, msg: &T) -> anyhow::Result<()>
where
    K: Sink<Bytes, Error = std::io::Error> + Unpin,
    T: Serialize,
{
    let data = bincode::serialize(msg)?;
    sink.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and deserialize a message.
pub async fn recv_message<S, T>(stream: &mut MessageStream<S>) -> anyhow::Result<T>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: DeserializeOwned,
{
    match stream.next().await {
        Some(Ok(bytes)) => Ok(bincode::deserialize(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::features::posture::tests::upright_frame;
    use crate::random::FixedRandom;
    use crate::session::Reading;

    fn session() -> AnalysisSession {
        AnalysisSession::new(&Config::default(), Box::new(FixedRandom(0.5)))
    }

    fn upright() -> RawFrame {
        RawFrame::new(upright_frame().landmarks.to_vec())
    }

    #[tokio::test]
    async fn test_client_message_round_trip_over_duplex() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let mut client = message_stream(a);
        let mut server = message_stream(b);

        send_message(&mut client, &ClientMessage::Frame(upright())).await.unwrap();
        send_message(&mut client, &ClientMessage::SetMode { mode: AnalysisMode::Squat })
            .await
            .unwrap();

        let first: ClientMessage = recv_message(&mut server).await.unwrap();
        assert_eq!(first, ClientMessage::Frame(upright()));
        let second: ClientMessage = recv_message(&mut server).await.unwrap();
        assert_eq!(second, ClientMessage::SetMode { mode: AnalysisMode::Squat });
    }

    #[tokio::test]
    async fn test_server_update_over_split_sink() {
        let (a, b) = tokio::io::duplex(64 * 1024);
        let (mut sink, _reader) = message_stream(a).split();
        let mut client = message_stream(b);

        let mut s = session();
        let mut replies = ClientMessage::Start.apply(&mut s, 0);
        replies.extend(ClientMessage::Frame(upright()).apply(&mut s, 100));
        for msg in &replies {
            send_to_sink(&mut sink, msg).await.unwrap();
        }

        let status: ServerMessage = recv_message(&mut client).await.unwrap();
        assert!(matches!(status, ServerMessage::Status(_)));
        match recv_message::<_, ServerMessage>(&mut client).await.unwrap() {
            ServerMessage::Update(update) => {
                assert!(matches!(update.reading, Reading::Posture(m) if m.score == 92.0));
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_connection_is_an_error() {
        let (a, b) = tokio::io::duplex(1024);
        let mut server = message_stream(b);
        drop(a);
        assert!(recv_message::<_, ClientMessage>(&mut server).await.is_err());
    }

    #[test]
    fn test_stop_yields_session_complete_once() {
        let mut s = session();
        ClientMessage::Start.apply(&mut s, 0);
        let replies = ClientMessage::Stop.apply(&mut s, 5_000);
        match replies.as_slice() {
            [ServerMessage::SessionComplete(summary)] => assert_eq!(summary.duration_secs, 5),
            other => panic!("unexpected replies {:?}", other),
        }
        assert!(ClientMessage::Stop.apply(&mut s, 6_000).is_empty());
        assert!(ClientMessage::Frame(upright()).apply(&mut s, 6_100).is_empty());
    }

    #[test]
    fn test_rejection_is_forwarded() {
        let mut s = session();
        ClientMessage::Start.apply(&mut s, 0);
        let replies = ClientMessage::Frame(RawFrame::new(Vec::new())).apply(&mut s, 10);
        assert!(matches!(replies[0], ServerMessage::Rejected { .. }));
    }
}
