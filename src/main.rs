use std::thread;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mixer_hal::mock::SimulatedMixer;
use mixer_hal::{
    BackendRegistry, Device, MixerError, MixerSession, VolumeLevel, UPDATE_INTERVAL,
};

/// Polling mixer monitor.
///
/// Runs the mixer core against the simulated backend, scripting external
/// changes (volume moved by another app, default switch, hot-plug) and
/// printing what the change-detection engine reports.
#[derive(Parser)]
#[command(name = "mixer-hal", version)]
struct Args {
    /// Do not print the initial mixer state, only subsequent changes.
    #[arg(long)]
    start_hidden: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("mixer-hal: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(args: &Args) -> Result<(), MixerError> {
    let mixer = SimulatedMixer::from_config(serde_json::json!({
        "devices": [
            {
                "name": "sim0",
                "description": "Simulated HD Audio",
                "lines": [
                    { "name": "Master", "has_enable": true, "volume": 80 },
                    { "name": "PCM", "volume": 65 },
                    { "name": "Mic", "capture": true, "channels": 1, "volume": 40 }
                ]
            },
            {
                "name": "sim1",
                "description": "Simulated USB Codec",
                "lines": [
                    { "name": "Master", "volume": 50 }
                ]
            }
        ],
        "default_device": 0
    }))?;
    let hardware = mixer.handle();

    let registry = BackendRegistry::init(vec![Box::new(mixer)]);
    let mut session = MixerSession::new(registry)?;

    if !args.start_hidden {
        print_devices(&session);
        if let Some(dev) = session.current_device() {
            print_lines(dev);
        }
    }

    // Scripted external events, keyed by base tick number.
    let script: &[(u32, &str, Box<dyn Fn()>)] = &[
        (20, "another app turns PCM down", {
            let hw = hardware.clone();
            Box::new(move || hw.borrow_mut().set_line_all(0, 1, 25))
        }),
        (60, "default device moves to sim1", {
            let hw = hardware.clone();
            Box::new(move || hw.borrow_mut().set_default(Some(1)))
        }),
        (100, "a third sound card is plugged in", {
            let hw = hardware.clone();
            Box::new(move || {
                hw.borrow_mut().add_device(mixer_hal::mock::SimDevice::new(
                    "sim2",
                    "Hot-plugged Webcam Mic",
                    vec![mixer_hal::mock::SimLine::stereo("Mic", 60).capture()],
                ))
            })
        }),
    ];

    for tick in 0..160u32 {
        for (at, what, event) in script {
            if *at == tick {
                println!("[tick {tick:3}] external event: {what}");
                event();
            }
        }

        match session.poll() {
            Ok(summary) if summary.anything_changed() => {
                if summary.device_list_changed {
                    println!("[tick {tick:3}] device list changed");
                    print_devices(&session);
                }
                if summary.default_device_changed {
                    println!("[tick {tick:3}] default device changed");
                }
                if summary.lines_updated != 0 {
                    println!("[tick {tick:3}] {} line(s) updated", summary.lines_updated);
                    if let Some(dev) = session.current_device() {
                        print_lines(dev);
                    }
                }
            }
            Ok(_) => {}
            // Backend hiccups are retried on the next tick.
            Err(e) => eprintln!("mixer-hal: poll: {e}"),
        }

        thread::sleep(UPDATE_INTERVAL);
    }

    session.shutdown();
    Ok(())
}

fn print_devices(session: &MixerSession) {
    println!("devices:");
    for (i, dev) in session.devices().iter().enumerate() {
        let plugin = session
            .registry()
            .plugin(dev.plugin_id())
            .map(|p| p.name().to_string())
            .unwrap_or_default();
        let marker = if session.current_index() == Some(i) {
            " *"
        } else {
            ""
        };
        println!("  {plugin}: {} ({}){marker}", dev.description(), dev.name());
    }
}

fn print_lines(dev: &Device) {
    for line in dev.lines() {
        let level = VolumeLevel::from_level(line.state.enabled, line.max_volume());
        let vols: Vec<String> = line
            .channels
            .iter()
            .map(|ch| format!("{}={}", ch.short_name(), line.state.volume(ch)))
            .collect();
        println!(
            "  {:<8} {:?}{} [{}]",
            line.display_name(),
            level,
            if line.is_capture { " (capture)" } else { "" },
            vols.join(" ")
        );
    }
}
