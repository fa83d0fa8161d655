use clap::Parser;
use cwkey_core::{ApplyRequest, AudioConfig, KeyerConfig, KeyerMode, Station};
use cwkey_device::{
    find_output_device, list_output_devices, list_serial_ports, CpalBackend, SerialPortBackend,
};
use tracing_subscriber::EnvFilter;

mod terminal;

#[derive(Parser, Debug)]
#[command(name = "cwkey", about = "Morse keyer with sidetone and serial PTT")]
struct Args {
    /// Output device name pattern (regex). Uses the default device if omitted.
    #[arg(long)]
    device: Option<String>,

    /// Serial port whose RTS line keys the transmitter.
    #[arg(long)]
    port: Option<String>,

    /// Speaker practice: sidetone follows the key regardless of PTT.
    #[arg(long)]
    bypass: bool,

    /// Keyer mode: straight or iambic.
    #[arg(long, default_value = "straight")]
    mode: KeyerMode,

    /// Speed in words per minute.
    #[arg(long, default_value_t = 20.0)]
    wpm: f64,

    /// Sidetone frequency in Hz.
    #[arg(long, default_value_t = 700.0)]
    frequency: f64,

    /// Output level, 0.0 to 0.2.
    #[arg(long, default_value_t = 0.01)]
    gain: f32,

    /// Audio block size in frames.
    #[arg(long, default_value_t = 256)]
    block_size: u32,

    /// List output devices and serial ports, then exit.
    #[arg(long)]
    list: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.list {
        println!("Audio output devices:");
        for device in list_output_devices() {
            println!("  {}", device.label());
        }
        println!("Serial ports:");
        for port in list_serial_ports() {
            println!("  {}", port);
        }
        return Ok(());
    }

    let device = match find_output_device(args.device.as_deref()) {
        Ok(device) => Some(device),
        Err(err) => {
            tracing::error!(%err, "no audio output; sidetone disabled");
            None
        }
    };

    let mut station = Station::new(
        CpalBackend,
        SerialPortBackend,
        AudioConfig::default(),
        KeyerConfig::default(),
    );
    station.set_block_size(Some(args.block_size));
    station.set_bypass(args.bypass);

    let report = station.apply(ApplyRequest {
        tone_freq_hz: args.frequency,
        wpm: args.wpm,
        gain: args.gain,
        mode: args.mode,
        device,
        port: args.port,
    });
    if !report.is_clean() {
        tracing::warn!(
            count = report.advisories.len(),
            "some settings were not applied"
        );
    }

    let result = terminal::run(&mut station);
    station.shutdown();
    result
}
