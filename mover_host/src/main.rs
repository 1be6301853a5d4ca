//! Standalone host binary.
//!
//! Usage:
//!   cargo run -p mover_host -- [--config mover.json] [--seconds 5] [--peers 2]
//!                              [--drop-rate 0.0] [--seed 24301] [--script input.json]
//!
//! Runs several peers in one process, each owning one avatar. Peer 0 replays
//! the input script; the others stand still. Once per simulated second the
//! host logs every owned pose and how far each replica trails it.

use std::env;
use std::time::Duration;

use anyhow::Context;
use mover_host::{script::InputScript, Session, SessionOptions};
use mover_shared::config::MoverConfig;
use tracing::info;

struct Args {
    cfg: MoverConfig,
    duration: Duration,
    opts: SessionOptions,
    script: InputScript,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        cfg: MoverConfig::default(),
        duration: Duration::from_secs(5),
        opts: SessionOptions::default(),
        script: InputScript::demo(),
    };
    let argv: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--config" if i + 1 < argv.len() => {
                args.cfg = MoverConfig::load(&argv[i + 1])?;
                i += 2;
            }
            "--seconds" if i + 1 < argv.len() => {
                args.duration = parse_seconds(&argv[i + 1])?;
                i += 2;
            }
            "--peers" if i + 1 < argv.len() => {
                args.opts.peers = argv[i + 1].parse().context("parse --peers")?;
                i += 2;
            }
            "--drop-rate" if i + 1 < argv.len() => {
                args.opts.drop_rate = argv[i + 1].parse().context("parse --drop-rate")?;
                i += 2;
            }
            "--seed" if i + 1 < argv.len() => {
                args.opts.seed = argv[i + 1].parse().context("parse --seed")?;
                i += 2;
            }
            "--script" if i + 1 < argv.len() => {
                args.script = InputScript::load(&argv[i + 1])?;
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(args)
}

/// Run length from `--seconds`. Negative, non-finite and overflowing values
/// are errors rather than panics later on.
fn parse_seconds(s: &str) -> anyhow::Result<Duration> {
    let secs: f32 = s.parse().context("parse --seconds")?;
    Duration::try_from_secs_f32(secs).with_context(|| format!("invalid --seconds {s}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args()?;
    info!(
        peers = args.opts.peers,
        seconds = args.duration.as_secs_f32(),
        drop_rate = args.opts.drop_rate,
        fixed_hz = args.cfg.fixed_hz,
        frame_hz = args.cfg.frame_hz,
        send_rate_hz = args.cfg.send_rate_hz,
        "Starting host"
    );

    let mut session = Session::loopback(args.cfg, args.opts).context("create session")?;
    let ids = session.spawn_one_per_peer().await?;
    info!(avatars = ?ids, "Avatars spawned");

    let script = args.script;
    let mut last_report = 0u64;
    session
        .run_realtime(args.duration, |s| {
            let t = s.elapsed() as f32;
            if let Some(peer) = s.peer_mut(0) {
                let device = script.apply(t, peer.widgets());
                peer.set_device(device);
            }

            let second = s.elapsed() as u64;
            if second > last_report {
                last_report = second;
                report(s);
            }
        })
        .await?;

    report(&session);
    info!(
        frames = session.frames(),
        send_ticks = session.send_ticks(),
        "Host finished"
    );
    Ok(())
}

fn report(session: &Session) {
    for peer in session.peers() {
        for avatar in peer.roster().iter().filter(|a| a.is_local()) {
            let p = avatar.pose().position;
            info!(
                peer = %peer.name,
                avatar = %avatar.id(),
                x = p.x,
                y = p.y,
                z = p.z,
                "Owned pose"
            );
        }
    }
    for (id, observer, err) in session.replica_errors() {
        info!(avatar = %id, observer = %observer, error = err, "Replica error");
    }
}
