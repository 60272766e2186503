//! The `visor` binary: run the coprocessor control core on a dev host.
//!
//! Binds the serial link to a TCP port, loads (or degrades without) the
//! face detection model, and runs the sensing loop until Ctrl-C.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::warn;

use visor_engine::{
    Collaborators, Engine, EngineConfig, MonotonicClock, NoopAudio, NoopDisplay, SystemMemory,
    Watchdog,
};
use visor_runner::sim::{self, TestPatternCamera};
use visor_runner::transport::TcpSerialLink;

#[derive(Parser, Debug)]
#[command(name = "visor", about = "Vision/audio coprocessor control core")]
struct Args {
    /// TCP port exposing the serial link.
    #[arg(long, default_value_t = 7700)]
    port: u16,

    /// Path to the face detection model. Absent or unloadable models
    /// degrade the engine to running without face detection.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Override the inter-cycle tick in milliseconds.
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Test pattern frame width.
    #[arg(long, default_value_t = 64)]
    frame_width: u32,

    /// Test pattern frame height.
    #[arg(long, default_value_t = 48)]
    frame_height: u32,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut config = EngineConfig::default();
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }

    let link = TcpSerialLink::bind(args.port)?;
    let port = link.port();

    let detector = match &args.model {
        Some(path) => match sim::load_model(path) {
            Ok(detector) => Some(detector),
            Err(e) => {
                warn!("model load failed, running degraded: {}", e);
                None
            }
        },
        None => {
            warn!("no model path given; running degraded");
            None
        }
    };

    let detector_loaded = detector.is_some();

    let collaborators = Collaborators {
        link: Box::new(link),
        camera: Box::new(TestPatternCamera::new(args.frame_width, args.frame_height)),
        detector,
        audio: Box::new(NoopAudio),
        display: Box::new(NoopDisplay),
        memory: Box::new(SystemMemory::default()),
        clock: Box::new(MonotonicClock::new()),
    };

    let mut engine = Engine::new(config.clone(), collaborators);

    let watchdog = if config.watchdog_timeout_ms > 0 {
        let watchdog = Watchdog::new(Duration::from_millis(config.watchdog_timeout_ms));
        engine.attach_watchdog(Arc::clone(watchdog.state()));
        Some(watchdog)
    } else {
        None
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Relaxed);
    })?;

    eprintln!();
    eprintln!("visor control core");
    eprintln!("  serial link : tcp port {}", port);
    eprintln!("  tick        : {} ms", config.tick_ms);
    eprintln!("  detector    : {}", if detector_loaded { "loaded" } else { "degraded" });
    eprintln!("Ctrl-C to stop.");
    eprintln!();

    engine.run(&stop);

    if let Some(watchdog) = watchdog {
        watchdog.stop();
    }
    Ok(())
}
