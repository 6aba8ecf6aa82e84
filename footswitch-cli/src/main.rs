mod halfkay;
mod hex;
mod simulate;
mod timeline;
mod trace;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use footswitch_core::{ConsumerKey, Millis, TimingConfig};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "footswitch")]
#[command(about = "Media footswitch flasher and gesture simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a .hex firmware file to Teensy via HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: PathBuf,
    },
    /// Detect if a Teensy is connected in bootloader mode
    Detect,
    /// Ask a running footswitch to enter the bootloader
    Reboot,
    /// Replay a trace script through the gesture decoder
    Simulate {
        /// Trace file: `down <ms>`, `up <ms>`, `chatter <ms>` per line
        trace: PathBuf,
        /// Polling interval of the simulated firmware loop
        #[arg(long, default_value_t = 1)]
        tick_ms: Millis,
        /// Write an SVG timing diagram here
        #[arg(long)]
        svg: Option<PathBuf>,
        #[arg(long, default_value_t = TimingConfig::DEFAULT.debounce_ms)]
        debounce_ms: Millis,
        /// Release time that closes a tap burst
        #[arg(long, default_value_t = TimingConfig::DEFAULT.burst_timeout_ms)]
        timeout_ms: Millis,
        /// Press time that counts as a hold
        #[arg(long, default_value_t = TimingConfig::DEFAULT.hold_ms)]
        hold_ms: Millis,
        /// Largest index; also the index a hold reports
        #[arg(long, default_value_t = TimingConfig::DEFAULT.max_index)]
        max_index: u8,
        /// Media key per index, comma separated
        #[arg(
            long,
            value_delimiter = ',',
            value_parser = parse_consumer_key,
            default_value = "PlayPause,ScanNext,ScanPrevious"
        )]
        commands: Vec<ConsumerKey>,
    },
}

fn parse_consumer_key(name: &str) -> Result<ConsumerKey, String> {
    ConsumerKey::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = ConsumerKey::ALL.iter().map(|k| k.display_name()).collect();
        format!("unknown media key {name:?} (known: {})", known.join(", "))
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Flash { firmware } => flash(&firmware)?,
        Command::Detect => {
            if halfkay::detect()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                println!("Teensy bootloader not detected.");
                println!("Press the reset button on the Teensy to enter bootloader mode.");
            }
        }
        Command::Reboot => {
            if !halfkay::reboot_to_bootloader()? {
                bail!("no running footswitch found");
            }
            if halfkay::wait_for_bootloader(50)? {
                println!("Footswitch is in bootloader mode.");
            } else {
                bail!("bootloader did not appear after reboot request");
            }
        }
        Command::Simulate {
            trace,
            tick_ms,
            svg,
            debounce_ms,
            timeout_ms,
            hold_ms,
            max_index,
            commands,
        } => {
            let config = TimingConfig::default()
                .with_debounce_ms(debounce_ms)
                .with_burst_timeout_ms(timeout_ms)
                .with_hold_ms(hold_ms)
                .with_max_index(max_index);
            run_simulation(&trace, &config, tick_ms, &commands, svg.as_deref())?;
        }
    }

    Ok(())
}

fn flash(firmware: &std::path::Path) -> Result<()> {
    let contents = fs::read_to_string(firmware)
        .with_context(|| format!("reading {}", firmware.display()))?;

    let segments = hex::parse_hex(&contents).context("parsing Intel HEX file")?;
    let (base_address, data) =
        hex::flatten_segments(&segments).context("flattening HEX segments")?;

    println!(
        "Firmware: {} bytes at base address 0x{:04X}",
        data.len(),
        base_address
    );

    if !halfkay::detect()? {
        if !halfkay::reboot_to_bootloader()? {
            bail!(
                "Teensy bootloader not detected and no footswitch found. \
                 Press the reset button on the Teensy and try again."
            );
        }
        println!("Rebooting footswitch into bootloader...");
        if !halfkay::wait_for_bootloader(50)? {
            bail!(
                "Teensy bootloader not detected after reboot. \
                 Press the reset button on the Teensy and try again."
            );
        }
    }

    halfkay::flash(base_address, &data)
}

fn run_simulation(
    path: &std::path::Path,
    config: &TimingConfig,
    tick_ms: Millis,
    commands: &[ConsumerKey],
    svg: Option<&std::path::Path>,
) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let steps = trace::parse_trace(&text).with_context(|| format!("parsing {}", path.display()))?;

    let sim = simulate::run(&steps, config, tick_ms, commands)?;
    info!(
        ticks = sim.samples.len(),
        duration_ms = sim.duration,
        "replayed trace"
    );

    if sim.pulses.is_empty() {
        println!("No commands decoded.");
    }
    for pulse in &sim.pulses {
        let command = pulse.command.map_or("-", |c| c.display_name());
        println!(
            "{:>8} ms  index {}  {:<10} {:?}",
            pulse.t, pulse.index, command, pulse.gesture
        );
    }

    if let Some(out) = svg {
        fs::write(out, timeline::render_svg(&sim, config.max_index))
            .with_context(|| format!("writing {}", out.display()))?;
        println!("Timing diagram written to {}", out.display());
    }

    Ok(())
}
