//! Varispeed player - play an audio file with live pitch and tempo control
//!
//! Starts the audio output, loads the file given on the command line and
//! reads commands from stdin (`play`, `pause`, `seek 50`, `pitch 0.8`, ...).
//! A ticker polls the controller so load results, end-of-stream and status
//! messages reach the terminal.

mod args;
mod command;
mod config;

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam::channel::{self, Receiver};

use args::CliArgs;
use command::{Command, HELP};
use config::PlayerConfig;
use varispeed_core::audio::{get_output_devices, start_audio_system};
use varispeed_core::config::{default_config_path, load_config};
use varispeed_core::decode::SymphoniaDecoder;
use varispeed_core::engine::{PlaybackController, PlaybackEvent};

/// How often the controller is polled
const TICK_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = CliArgs::parse();

    if args.list_devices {
        for device in get_output_devices().context("Failed to list audio devices")? {
            println!("{}  {:?} Hz, {} ch", device, device.sample_rates, device.max_channels);
        }
        return Ok(());
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config: PlayerConfig = load_config(&config_path);
    args.apply(&mut config);

    log::info!("varispeed-player starting up");

    let mut audio = start_audio_system(&config.audio, &config.engine, Box::new(SymphoniaDecoder::new()))
        .context("Failed to start audio output")?;
    println!(
        "Audio running at {} Hz, {} frames (~{:.1}ms)",
        audio.sample_rate, audio.buffer_size, audio.latency_ms
    );

    let controller = &mut audio.controller;
    let events = controller.subscribe();

    if let Some(file) = &args.file {
        controller
            .load_file(file)
            .with_context(|| format!("Failed to read {:?}", file))?;
    }

    println!("{}", HELP);
    run(controller, &events);

    log::info!("varispeed-player shutting down");
    Ok(())
}

/// Main loop: stdin commands and periodic polling until quit or EOF
fn run(controller: &mut PlaybackController, events: &Receiver<PlaybackEvent>) {
    let lines = spawn_stdin_reader();
    let ticker = channel::tick(TICK_INTERVAL);

    loop {
        channel::select! {
            recv(lines) -> line => {
                let Ok(line) = line else { break };
                match Command::parse(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => execute(controller, command),
                    Ok(None) => {}
                    Err(e) => eprintln!("{:#}", e),
                }
            }
            recv(ticker) -> _ => controller.poll(),
        }

        for event in events.try_iter() {
            print_event(&event);
        }
    }
}

fn execute(controller: &mut PlaybackController, command: Command) {
    match command {
        Command::Play => controller.play(),
        Command::Pause => controller.pause(),
        Command::Stop => controller.stop(),
        Command::Seek(percent) => controller.seek(percent),
        Command::Pitch(pitch) => controller.set_pitch(pitch),
        Command::Tempo(tempo) => controller.set_tempo(tempo),
        Command::Load(path) => {
            if let Err(e) = controller.load_file(&path) {
                eprintln!("Failed to read {:?}: {}", path, e);
            }
        }
        Command::Status => print_status(controller),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn print_status(controller: &PlaybackController) {
    let tracker = controller.tracker();
    println!(
        "{} [{}] {:.1}s / {:.1}s ({:.0}%)  pitch {:.2}  tempo {:.2}",
        controller.filename().unwrap_or("(nothing loaded)"),
        controller.action(),
        tracker.current_seconds(),
        tracker.duration_seconds(),
        tracker.percent_done(),
        controller.pitch(),
        controller.tempo()
    );
}

fn print_event(event: &PlaybackEvent) {
    match event {
        PlaybackEvent::Status(status) => println!("{}", status),
        PlaybackEvent::Loaded { name, duration_seconds } => {
            println!("Loaded {} ({:.1}s)", name, duration_seconds)
        }
        PlaybackEvent::LoadFailed(failure) => eprintln!("{}", failure),
        PlaybackEvent::ActionChanged(action) => println!("[{}]", action),
        PlaybackEvent::PitchChanged(pitch) => println!("pitch {:.2}", pitch),
        PlaybackEvent::TempoChanged(tempo) => println!("tempo {:.2}", tempo),
        PlaybackEvent::EndOfStream => println!("End of track"),
        // Too chatty for a terminal; `status` shows the position
        PlaybackEvent::LoadStarted { .. } | PlaybackEvent::Progress { .. } => {}
    }
}

/// Forward stdin lines to a channel from a dedicated thread
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = channel::unbounded();

    let spawned = std::thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

    if let Err(e) = spawned {
        log::error!("Failed to spawn stdin reader: {}", e);
    }

    rx
}
