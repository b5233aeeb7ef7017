//! Analysis server: receives landmark frames over TCP, runs the posture /
//! exercise analysis session, and streams updates back to the client.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::net::TcpStream;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use posture_coach::config::Config;
use posture_coach::protocol::{self, ClientMessage, ServerMessage};
use posture_coach::session::AnalysisSession;

const CONFIG_PATH: &str = "posture_coach.toml";

type SharedSession = Arc<Mutex<AnalysisSession>>;

fn lock(session: &SharedSession) -> MutexGuard<'_, AnalysisSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 接続ごとの単調時計（ミリ秒）
#[derive(Clone, Copy)]
struct Clock(Instant);

impl Clock {
    fn now_ms(&self) -> u64 {
        self.0.elapsed().as_millis() as u64
    }
}

/// 周期タイマー: プランク経過・レポート進行・途絶検知
async fn tick_loop(
    session: SharedSession,
    clock: Clock,
    interval_ms: u64,
    out_tx: tokio::sync::mpsc::Sender<ServerMessage>,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let events = lock(&session).tick(clock.now_ms());
        for event in events {
            if out_tx.send(event.into()).await.is_err() {
                return;
            }
        }
    }
}

async fn connection_loop(
    stream: TcpStream,
    session: &SharedSession,
    clock: Clock,
    mut out_rx: tokio::sync::mpsc::Receiver<ServerMessage>,
) -> Result<()> {
    let framed = protocol::message_stream(stream);
    let (mut sink, mut reader) = framed.split();

    loop {
        tokio::select! {
            result = reader.next() => {
                let bytes = match result {
                    Some(Ok(b)) => b,
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                };
                let msg: ClientMessage = bincode::deserialize(&bytes)?;
                // ロックはメッセージ適用の間だけ保持し、送信前に手放す
                let replies = msg.apply(&mut lock(session), clock.now_ms());
                for reply in &replies {
                    protocol::send_to_sink(&mut sink, reply).await?;
                }
            }
            Some(out_msg) = out_rx.recv() => {
                protocol::send_to_sink(&mut sink, &out_msg).await?;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, config: &Config) -> Result<()> {
    let session: SharedSession = Arc::new(Mutex::new(AnalysisSession::with_entropy(config)));
    let clock = Clock(Instant::now());
    let (out_tx, out_rx) = tokio::sync::mpsc::channel::<ServerMessage>(32);

    let ticker = tokio::spawn(tick_loop(
        Arc::clone(&session),
        clock,
        config.server.tick_interval_ms,
        out_tx,
    ));

    let result = connection_loop(stream, &session, clock, out_rx).await;

    ticker.abort();
    if let Some(summary) = lock(&session).stop(clock.now_ms()) {
        info!(mode = %summary.mode, duration_secs = summary.duration_secs, "session closed with connection");
    }
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_or_default(CONFIG_PATH);

    info!("Analysis Server ({})", env!("GIT_VERSION"));
    info!("Listen: {}", config.server.listen_addr);
    info!("Tick interval: {}ms", config.server.tick_interval_ms);

    let bind_addr: SocketAddr = config.server.listen_addr.parse()
        .context("invalid listen_addr")?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Listening on {}", bind_addr);

    let config = Arc::new(config);
    loop {
        let (tcp_stream, addr) = listener.accept().await?;
        tcp_stream.set_nodelay(true)?;
        info!("Client connected: {}", addr);

        let config = Arc::clone(&config);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(tcp_stream, &config).await {
                warn!("connection {} error: {}", addr, e);
            }
            info!("Client disconnected: {}", addr);
        });
    }
}
