//! 記録済みランドマーク (JSON Lines) を解析セッションに流して結果を表示する
//!
//! 使い方: posture-coach <frames.jsonl> [posture|pushup|squat|plank]

use std::fs::File;
use std::io::{BufRead, BufReader};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use posture_coach::config::Config;
use posture_coach::mode::AnalysisMode;
use posture_coach::pose::{Landmark, RawFrame};
use posture_coach::session::{AnalysisSession, SessionEvent};

const CONFIG_PATH: &str = "posture_coach.toml";

/// 1行分の記録
#[derive(Debug, Deserialize)]
struct RecordedFrame {
    timestamp_ms: u64,
    landmarks: Vec<Landmark>,
}

fn print_event(event: &SessionEvent) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    // レポートはテキスト書き出しも併せて表示
    if let SessionEvent::Report(report) = event {
        println!("\n{}\n", report);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: posture-coach <frames.jsonl> [posture|pushup|squat|plank]");
    };
    let mode: AnalysisMode = match args.next() {
        Some(m) => m.parse()?,
        None => AnalysisMode::Posture,
    };

    let config = Config::load_or_default(CONFIG_PATH);
    let tick_interval = config.server.tick_interval_ms;
    let mut session = AnalysisSession::with_entropy(&config);

    let reader = BufReader::new(File::open(&path).with_context(|| format!("failed to open {}", path))?);

    // 最初のフレームの時刻をセッション開始とする
    let mut start_ms = None;
    let mut next_tick = 0;
    let mut last_ms = 0;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let recorded: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid frame", path, line_no + 1))?;
        let now = recorded.timestamp_ms;

        if start_ms.is_none() {
            session.switch_mode(mode, now);
            session.start(now);
            start_ms = Some(now);
            next_tick = now + tick_interval;
        }

        // 記録の間に入る周期タイマーを再現
        while next_tick <= now {
            for event in session.tick(next_tick) {
                print_event(&event)?;
            }
            next_tick += tick_interval;
        }

        for event in session.process_frame(&RawFrame::new(recorded.landmarks), now) {
            print_event(&event)?;
        }
        last_ms = now;
    }

    match session.stop(last_ms) {
        Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
        None => eprintln!("{}: no frames", path),
    }
    Ok(())
}
