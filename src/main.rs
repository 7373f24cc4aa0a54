use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use metadump::config::Config;
use metadump::dump::{Dumper, FrameStats, build_target};
use metadump::reactor::Reactor;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("metadump=info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let reactor = Reactor::start().context("starting reactor")?;
    let target = build_target(&cfg, &reactor.handle()).context("building dump target")?;
    let dumper = Dumper::new(target);

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        reactor.handle().spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let fps = cfg.telemetry.target_fps.max(1);
    let period = Duration::from_secs_f64(1.0 / fps as f64);
    tracing::info!(kind = ?cfg.target.kind, fps, "emitting heartbeat telemetry");

    // Heartbeat: no detections, real timing.
    let mut frame = 0i64;
    let mut last = Instant::now();
    while !stop.load(Ordering::SeqCst) {
        let started = Instant::now();
        let elapsed = started.duration_since(last).as_secs_f64();
        last = started;

        let stats = FrameStats {
            target_fps: fps as i32,
            frame,
            fpga: false,
            cpu_use: 0.0,
            framerate: if elapsed > 0.0 { 1.0 / elapsed } else { 0.0 },
            frame_time_ms: (elapsed * 1000.0) as i32,
        };
        dumper.accept(&[], &stats);

        frame += 1;
        std::thread::sleep(period.saturating_sub(started.elapsed()));
    }

    drop(dumper);
    reactor.shutdown();
    Ok(())
}
