use clap::{Args, Parser, Subcommand};
use serial_transport::config::{Config, ConfigLoader, SerialConfig};
use serial_transport::error::{AppError, AppResult};
use serial_transport::logging;
use serial_transport::port::{list_devices, BackendPreference, Parity, PortError, SerialPort};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Pause between commands in `exchange`.
const INTER_COMMAND_DELAY: Duration = Duration::from_millis(100);

/// How long to keep retrying a write the device is not draining.
const WRITE_DEADLINE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(
    name = "serial-transport",
    version,
    about = "Send and receive lines over a serial device.",
    long_about = "Talks to serial devices such as Arduino boards using validated line settings. \
                  The device and line settings come from the command line, then the \
                  configuration file, then SERIAL_TRANSPORT_* / SERIAL_PORT environment variables."
)]
struct Cli {
    /// Configuration file to use instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (overrides the configuration file).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial devices present on this system.
    List {
        /// Print JSON instead of one line per device.
        #[arg(long)]
        json: bool,
    },

    /// Send one message and print the reply line.
    Send {
        #[command(flatten)]
        line: LineArgs,

        /// Wait this long after opening, for boards that reset on connect.
        #[arg(long, default_value_t = 2000)]
        startup_delay_ms: u64,

        /// How long to wait for the reply line (defaults to serial.read_timeout_ms).
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Message to send; a newline is appended.
        message: String,
    },

    /// Print the device's startup line, then send each command and print its reply.
    Exchange {
        #[command(flatten)]
        line: LineArgs,

        #[arg(long, default_value_t = 2000)]
        startup_delay_ms: u64,

        /// Pause after each write before reading the reply.
        #[arg(long, default_value_t = 200)]
        pause_ms: u64,

        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,

        #[arg(required = true)]
        commands: Vec<String>,
    },
}

/// Device and line settings shared by the port commands.
#[derive(Args, Debug, Default)]
struct LineArgs {
    /// Device name or configured alias, e.g. /dev/ttyACM0 or COM3.
    #[arg(short, long)]
    device: Option<String>,

    #[arg(short, long)]
    baud_rate: Option<u32>,

    #[arg(long)]
    data_bits: Option<u8>,

    /// none, odd or even.
    #[arg(long)]
    parity: Option<Parity>,

    #[arg(long)]
    stop_bits: Option<u8>,

    /// Windows backend: auto, native or shell.
    #[arg(long)]
    backend: Option<BackendPreference>,
}

impl LineArgs {
    fn apply(&self, serial: &mut SerialConfig) {
        if let Some(device) = &self.device {
            serial.device = Some(device.clone());
        }
        if let Some(baud_rate) = self.baud_rate {
            serial.baud_rate = baud_rate;
        }
        if let Some(data_bits) = self.data_bits {
            serial.data_bits = data_bits;
        }
        if let Some(parity) = self.parity {
            serial.parity = parity;
        }
        if let Some(stop_bits) = self.stop_bits {
            serial.stop_bits = stop_bits;
        }
        if let Some(backend) = self.backend {
            serial.backend = backend;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: Cli) -> AppResult<()> {
    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?.into_config(),
        None => ConfigLoader::load()?.into_config(),
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Warning: logging disabled: {e}");
    }

    match cli.command {
        Command::List { json } => list(json),
        Command::Send {
            line,
            startup_delay_ms,
            timeout_ms,
            message,
        } => {
            line.apply(&mut config.serial);
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| config.serial.read_timeout());
            send(
                &config,
                Duration::from_millis(startup_delay_ms),
                timeout,
                &message,
            )
        }
        Command::Exchange {
            line,
            startup_delay_ms,
            pause_ms,
            timeout_ms,
            commands,
        } => {
            line.apply(&mut config.serial);
            exchange(
                &config,
                Duration::from_millis(startup_delay_ms),
                Duration::from_millis(pause_ms),
                Duration::from_millis(timeout_ms),
                &commands,
            )
        }
    }
}

fn list(json: bool) -> AppResult<()> {
    let devices = list_devices()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if devices.is_empty() {
        println!("No serial devices found.");
    } else {
        for device in &devices {
            println!("{}", device.describe());
        }
    }
    Ok(())
}

fn open_port(config: &Config) -> AppResult<SerialPort> {
    let device = config.serial.resolve_device().ok_or_else(|| {
        AppError::usage(
            "no device given; pass --device, set serial.device in the configuration file, \
             or set SERIAL_PORT",
        )
    })?;
    let line = config.serial.configuration()?;

    let mut port = SerialPort::with_preference(device, line, config.serial.backend)?;
    if let Some(notice) = port.backend_notice() {
        eprintln!("Warning: {notice}");
    }

    println!(
        "Opening serial port: {} at {} baud",
        port.device(),
        port.configuration().baud_rate()
    );
    port.open()?;
    info!(device = %port.device(), backend = %port.backend_kind(), "port open");
    Ok(port)
}

/// Write all of `data`, retrying short writes until `WRITE_DEADLINE`.
fn write_all(port: &mut SerialPort, data: &[u8]) -> AppResult<()> {
    let deadline = Instant::now() + WRITE_DEADLINE;
    let mut offset = 0;

    while offset < data.len() {
        let written = port.write(&data[offset..])?;
        offset += written;
        if written == 0 {
            if Instant::now() >= deadline {
                return Err(PortError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("wrote {offset} of {} bytes before timing out", data.len()),
                ))
                .into());
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
    debug!(bytes = data.len(), "sent");
    Ok(())
}

fn print_reply(reply: &[u8]) {
    if reply.is_empty() {
        println!("Response: (none)");
    } else {
        println!("Response: {}", String::from_utf8_lossy(reply));
    }
}

fn wait_for_startup(delay: Duration) {
    if !delay.is_zero() {
        println!("Waiting for device to initialize...");
        thread::sleep(delay);
    }
}

fn send(
    config: &Config,
    startup_delay: Duration,
    timeout: Duration,
    message: &str,
) -> AppResult<()> {
    let mut port = open_port(config)?;
    wait_for_startup(startup_delay);

    println!("Sending: {message}");
    write_all(&mut port, format!("{message}\n").as_bytes())?;

    let reply = port.read_line(timeout)?;
    print_reply(&reply);

    port.close();
    Ok(())
}

fn exchange(
    config: &Config,
    startup_delay: Duration,
    pause: Duration,
    timeout: Duration,
    commands: &[String],
) -> AppResult<()> {
    let mut port = open_port(config)?;
    wait_for_startup(startup_delay);

    // Boards usually print a banner after reset; show it instead of letting
    // it be mistaken for the first reply.
    let banner = port.read_line(config.serial.read_timeout())?;
    if !banner.is_empty() {
        println!("Device startup: {}\n", String::from_utf8_lossy(&banner));
    }

    for (i, command) in commands.iter().enumerate() {
        if i > 0 {
            thread::sleep(INTER_COMMAND_DELAY);
        }
        println!("Sending: {command}");
        write_all(&mut port, format!("{command}\n").as_bytes())?;
        thread::sleep(pause);

        let reply = port.read_line(timeout)?;
        print_reply(&reply);
        println!();
    }

    port.close();
    println!("Done.");
    Ok(())
}
