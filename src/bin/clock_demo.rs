//! Clock demo: a small frame loop driven by the Runner.
//!
//! Usage:
//!   cargo run --bin clock_demo -- --seconds 3 --fps 60
//!
//! Set RUST_LOG=frame_clock=debug to watch scheduling decisions.

use frame_clock::{Args, Callback, Clock, MonotonicTime, Runner, RunnerConfig};
use std::cell::Cell;
use std::env;
use std::rc::Rc;
use tracing::info;

fn print_usage() {
    println!("Usage: clock_demo [--seconds N] [--fps N] [--rate R]");
    println!();
    println!("  --seconds, -s   How long to run (default 3)");
    println!("  --fps, -f       Frame limit (default 60)");
    println!("  --rate, -r      Time scale of the clock (default 1.0)");
}

fn parse_arg(args: &[String], i: usize, name: &str) -> Result<f64, Box<dyn std::error::Error>> {
    let raw = args
        .get(i)
        .ok_or_else(|| format!("Missing value for {name}"))?;
    Ok(raw.parse()?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut seconds = 3.0;
    let mut fps = 60.0;
    let mut rate = 1.0;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" | "-s" => {
                i += 1;
                seconds = parse_arg(&args, i, "--seconds")?;
            }
            "--fps" | "-f" => {
                i += 1;
                fps = parse_arg(&args, i, "--fps")?;
            }
            "--rate" | "-r" => {
                i += 1;
                rate = parse_arg(&args, i, "--rate")?;
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => {
                print_usage();
                return Err(format!("Unknown argument {other}").into());
            }
        }
        i += 1;
    }

    let time = MonotonicTime::new();
    time.set_rate(rate);
    let clock = Clock::new(time);

    // Every frame: integrate a position.
    let position = Rc::new(Cell::new(0.0));
    let p = position.clone();
    let update = Callback::new(move |_, dt, args| {
        let velocity = args.get::<f64>().copied().unwrap_or(0.0);
        p.set(p.get() + velocity * dt);
    });
    clock.schedule(&update, Args::new(10.0_f64));

    // Fixed cadence.
    let spawner = Callback::new(|clock, dt, _| {
        info!(dt, fps = clock.fps(), "spawn wave");
    });
    clock.schedule_interval(&spawner, 0.5, Args::none());

    // Several thinkers on the same period, spread out of phase.
    for id in 0..4u32 {
        let think = Callback::new(move |clock, _, _| {
            info!(id, ts = clock.last_ts().unwrap_or(0.0), "think");
        });
        clock.schedule_interval_soft(&think, 1.0, Args::none());
    }

    let banner = Callback::from_dt(|dt| info!(dt, "one second in"));
    clock.schedule_once(&banner, 1.0, Args::none());

    let done = Rc::new(Cell::new(false));
    let d = done.clone();
    let stop = Callback::from_dt(move |_| d.set(true));
    clock.schedule_once(&stop, seconds, Args::none());

    let config = RunnerConfig {
        fps_limit: Some(fps),
        ..Default::default()
    };
    let mut runner = Runner::with_config(clock, config)?;
    let frames = runner.run_until(move || done.get());

    info!(
        frames,
        position = position.get(),
        avg_frame = runner.clock().average_interval(),
        "finished"
    );
    Ok(())
}
