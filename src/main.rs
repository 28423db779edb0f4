//! Interactive console for exercising a lock controller unit.
//!
//! Single-key commands, mirroring the bench utility this replaces:
//! `q` quits, `p` sends identify, `r` requests status, `x` sends a
//! keepalive, and a digit opens that lock channel. Everything the unit
//! sends back is printed as it arrives.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use crossterm::event::{Event as TermEvent, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

use lockbus::transport::serial::{DEFAULT_BAUD_RATE, discover_port};
use lockbus::{Error, LockPanel, Profile, Response, SerialConfig, SerialTransport};

/// Interactive console for serial lock controller units.
#[derive(Debug, Parser)]
#[command(name = "lockbus", version, about)]
struct Args {
    /// Serial port; the first available port is used when omitted.
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate.
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Wire profile the controller speaks.
    #[arg(long, value_enum, default_value = "legacy")]
    profile: ProfileArg,

    /// Unit address to target.
    #[arg(short, long, default_value = "01")]
    address: String,

    /// Discovery attempts before giving up when no port is given.
    #[arg(long, default_value_t = 30)]
    discovery_attempts: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Legacy,
    LegacyXor,
    Delimited,
    DelimitedXor,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Legacy => Self::Legacy,
            ProfileArg::LegacyXor => Self::LegacyXor,
            ProfileArg::Delimited => Self::Delimited,
            ProfileArg::DelimitedXor => Self::DelimitedXor,
        }
    }
}

/// Restores the terminal on scope exit.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self, Error> {
        terminal::enable_raw_mode().map_err(Error::Io)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let port = match args.port {
        Some(port) => port,
        None => discover_port(args.discovery_attempts, Duration::from_secs(1)).await?,
    };

    let config = SerialConfig::new(port).baud_rate(args.baud);
    let mut panel = LockPanel::with_serial_config(config, args.profile.into());
    panel.connect().await?;

    println!("ready");
    let result = run(&mut panel, &args.address).await;
    panel.disconnect().await?;
    result
}

/// The control loop: alternates between a timed read of the channel and the
/// keypress stream. Single task, one exchange in flight at most.
async fn run(panel: &mut LockPanel<SerialTransport>, address: &str) -> Result<(), Error> {
    let _guard = RawModeGuard::enable()?;
    let mut keys = EventStream::new();

    loop {
        tokio::select! {
            incoming = panel.poll() => match incoming {
                Ok(Some(response)) => say(&format!("<- {response}")),
                Ok(None) => {}
                Err(Error::Frame(e)) => say(&format!("!! {e}")),
                Err(e) => return Err(e),
            },
            event = keys.next() => match event {
                Some(Ok(TermEvent::Key(key))) if key.kind != KeyEventKind::Release => {
                    if handle_key(panel, address, &key).await? {
                        return Ok(());
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(Error::Io(e)),
                None => return Ok(()),
            },
        }
    }
}

async fn handle_key(
    panel: &mut LockPanel<SerialTransport>,
    address: &str,
    key: &KeyEvent,
) -> Result<bool, Error> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
        KeyCode::Char('p') => {
            panel.identify(address).await?;
            say("-> identify");
        }
        KeyCode::Char('r') => report(panel.report_status(address).await)?,
        KeyCode::Char('x') => match panel.ping().await? {
            Some(response) => say(&format!("<- {response}")),
            None => say("no pong"),
        },
        KeyCode::Char(c) if c.is_ascii_digit() => {
            report(panel.open_channel(address, c as u8 - b'0').await)?;
        }
        _ => {}
    }
    Ok(false)
}

/// Prints a reply, keeping codec failures visible instead of dumping
/// garbage; transport failures propagate.
fn report(result: Result<Response, Error>) -> Result<(), Error> {
    match result {
        Ok(response) => say(&format!("<- {response}")),
        Err(Error::Timeout { timeout_ms }) => say(&format!("no reply within {timeout_ms}ms")),
        Err(Error::Frame(e)) => say(&format!("!! {e}")),
        Err(e) => return Err(e),
    }
    Ok(())
}

/// Raw mode needs an explicit carriage return.
fn say(line: &str) {
    print!("{line}\r\n");
}
