//! droidrunner CLI - script Android devices from the shell
//!
//! Usage:
//!     droidrunner [OPTIONS] <COMMAND>
//!
//! Environment Variables:
//!     DROIDRUNNER_ADB_PATH: adb executable (default: adb)
//!     DROIDRUNNER_SERIAL: Pattern matched against device serial numbers
//!     DROIDRUNNER_POLL_INTERVAL: Seconds between device polls (default: 0.5)
//!     DROIDRUNNER_COMMAND_TIMEOUT: Seconds allowed per adb command (default: 30)

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use droidrunner::{
    wait_for_connection, AdbBackend, AdbSession, BackendRegistry, ConnectOptions, Device, Intent,
    MemoryImage, PressType, Snapshot, DEFAULT_DRAG_DURATION, DEFAULT_DRAG_STEPS,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// droidrunner - scriptable Android device automation
#[derive(Parser, Debug)]
#[command(name = "droidrunner")]
#[command(about = "Scriptable Android device automation over adb")]
#[command(after_help = r#"Examples:
    # List devices known to adb
    droidrunner devices

    # Tap on the first emulator, giving up after 3 attempts of 5s each
    droidrunner -s 'emulator-.*' --tries 3 --timeout 5 tap 540 1200

    # Swipe up over half a second
    droidrunner drag 540 1800 540 600 --duration 0.5

    # Launch an activity with an extra
    droidrunner start -n com.example/.MainActivity -e user=alice

    # Save a screenshot and compare it with a reference
    droidrunner snapshot now.png
    droidrunner compare now.png reference.png --percent 0.98
"#)]
struct Cli {
    /// adb executable
    #[arg(long, env = "DROIDRUNNER_ADB_PATH", default_value = "adb")]
    adb: String,

    /// Pattern matched against the whole device serial number
    #[arg(short = 's', long, env = "DROIDRUNNER_SERIAL")]
    serial: Option<String>,

    /// Seconds to wait for a device per attempt (default: forever)
    #[arg(long)]
    timeout: Option<f64>,

    /// Connection attempts before giving up (default: unlimited)
    #[arg(long, allow_negative_numbers = true)]
    tries: Option<i32>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List devices known to the adb server
    Devices,

    /// Connect to a remote device (e.g., 192.168.1.100:5555)
    Connect { address: String },

    /// Disconnect a remote device, or all of them
    Disconnect { address: Option<String> },

    /// Compare two image files pixel by pixel
    Compare {
        first: PathBuf,
        second: PathBuf,
        /// Fraction of pixels that must match
        #[arg(long, default_value = "1.0")]
        percent: f64,
    },

    #[command(flatten)]
    Device(DeviceCommand),
}

/// Commands run against a connected device
#[derive(Subcommand, Debug)]
enum DeviceCommand {
    /// Read a device property (display.width, ro.product.model, ...)
    Prop { key: String },

    /// Run a shell command on the device
    Shell {
        /// Seconds allowed for the command
        #[arg(long)]
        timeout: Option<f64>,

        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Touch the screen
    Tap {
        x: i32,
        y: i32,
        /// down, up or down_and_up
        #[arg(long, default_value = "down_and_up")]
        kind: PressType,
    },

    /// Drag between two points
    Drag {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,
        /// Duration in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Interpolation steps
        #[arg(long)]
        steps: Option<u32>,
    },

    /// Press a key by name (HOME, BACK, KEYCODE_ENTER, ...)
    Press {
        key: String,
        #[arg(long, default_value = "down_and_up")]
        kind: PressType,
    },

    /// Type text into the focused field
    Type { text: String },

    /// Install (or reinstall) an APK
    Install { path: PathBuf },

    /// Remove a package
    Uninstall { package: String },

    /// Start an activity
    Start(IntentArgs),

    /// Broadcast an intent
    Broadcast(IntentArgs),

    /// Run an instrumentation and print its result bundle as JSON
    Instrument {
        class_name: String,
        /// Instrumentation argument as key=value (repeatable)
        #[arg(short = 'e', long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },

    /// Reboot the device, optionally into bootloader or recovery
    Reboot { into: Option<String> },

    /// Wake the device
    Wake,

    /// Capture the screen to a file
    Snapshot {
        output: PathBuf,
        /// Image format (default: from the file extension)
        #[arg(long)]
        format: Option<String>,
        /// Crop to x,y,width,height
        #[arg(long, value_name = "X,Y,W,H")]
        crop: Option<String>,
    },
}

#[derive(Args, Debug)]
struct IntentArgs {
    /// URI appended after the options
    #[arg(long)]
    uri: Option<String>,
    #[arg(short = 'a', long)]
    action: Option<String>,
    #[arg(short = 'd', long)]
    data: Option<String>,
    #[arg(short = 't', long = "type")]
    mime_type: Option<String>,
    #[arg(short = 'c', long = "category")]
    categories: Vec<String>,
    /// Extra as key=value; numbers and booleans keep their type (repeatable)
    #[arg(short = 'e', long = "extra", value_name = "KEY=VALUE")]
    extras: Vec<String>,
    #[arg(short = 'n', long)]
    component: Option<String>,
    #[arg(short = 'f', long, default_value = "0")]
    flags: i32,
}

impl IntentArgs {
    fn into_intent(self) -> Result<Intent> {
        let mut intent = Intent {
            uri: self.uri,
            action: self.action,
            data: self.data,
            mime_type: self.mime_type,
            categories: self.categories,
            component: self.component,
            flags: self.flags,
            ..Intent::default()
        };
        for extra in &self.extras {
            let (key, value) = parse_key_value(extra)?;
            intent.extras.insert(key, value);
        }
        Ok(intent)
    }
}

/// Parse a value the way a script would write it
fn parse_value(s: &str) -> Value {
    if let Ok(n) = s.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::from(f);
    }
    match s {
        "true" | "True" => Value::Bool(true),
        "false" | "False" => Value::Bool(false),
        _ => Value::String(s.to_string()),
    }
}

fn parse_key_value(s: &str) -> Result<(String, Value)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        bail!("Empty key in '{}'", s);
    }
    Ok((key.to_string(), parse_value(value)))
}

fn parse_crop(s: &str) -> Result<(u32, u32, u32, u32)> {
    let parts: Vec<u32> = s
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Invalid crop '{}'", s))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok((*x, *y, *w, *h)),
        _ => bail!("Crop needs X,Y,W,H, got '{}'", s),
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Fail early with install hints when adb cannot be found
fn check_adb(adb: &str) -> Result<()> {
    if adb.contains(std::path::MAIN_SEPARATOR) || which::which(adb).is_ok() {
        return Ok(());
    }
    bail!(
        "{} is not installed or not in PATH.\n  \
         - macOS: brew install android-platform-tools\n  \
         - Linux: sudo apt install android-tools-adb\n  \
         - Windows: https://developer.android.com/studio/releases/platform-tools",
        adb
    )
}

/// Seconds given on the command line as a `Duration`
fn seconds(value: f64, flag: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| anyhow!("{} must be a non-negative number of seconds, got {}", flag, value))
}

fn connect_options(cli: &Cli) -> Result<ConnectOptions> {
    let mut options = ConnectOptions::new();
    if let Some(timeout) = cli.timeout {
        options = options.with_timeout(seconds(timeout, "--timeout")?);
    }
    if let Some(tries) = cli.tries {
        options = options.with_tries(tries);
    }
    if let Some(serial) = &cli.serial {
        options = options.with_device_id(serial);
    }
    Ok(options)
}

async fn open_device(
    adb: &str,
    options: &ConnectOptions,
    registry: &BackendRegistry<AdbBackend>,
) -> Result<Device<AdbSession>> {
    debug!("Waiting for device with {:?}", options);

    let device = wait_for_connection(registry, adb, options)
        .await
        .ok_or_else(|| anyhow!("No device found"))?;
    info!("Using device {}", device.session().serial());
    Ok(device)
}

fn load_snapshot(path: &Path) -> Result<Snapshot<MemoryImage>> {
    let bytes = std::fs::read(path).with_context(|| format!("Reading {}", path.display()))?;
    let image = MemoryImage::decode(&bytes).with_context(|| format!("Decoding {}", path.display()))?;
    Ok(Snapshot::new(Some(image)))
}

async fn run_on_device(command: DeviceCommand, device: &Device<AdbSession>) -> Result<()> {
    match command {
        DeviceCommand::Prop { key } => match device.get_property(&key).await? {
            Some(value) => println!("{}", value),
            None => bail!("Property {} has no value", key),
        },
        DeviceCommand::Shell { timeout, command } => {
            let command = command.join(" ");
            let output = match timeout {
                Some(t) => {
                    device
                        .shell_with_timeout(&command, seconds(t, "--timeout")?)
                        .await?
                }
                None => device.shell(&command).await?,
            };
            print!("{}", output);
        }
        DeviceCommand::Tap { x, y, kind } => device.touch(x, y, kind).await?,
        DeviceCommand::Drag {
            x1,
            y1,
            x2,
            y2,
            duration,
            steps,
        } => {
            let duration = match duration {
                Some(d) => seconds(d, "--duration")?,
                None => DEFAULT_DRAG_DURATION,
            };
            let steps = steps.unwrap_or(DEFAULT_DRAG_STEPS);
            device.drag_full((x1, y1), (x2, y2), duration, steps).await?
        }
        DeviceCommand::Press { key, kind } => device.press(&key, kind).await?,
        DeviceCommand::Type { text } => device.type_text(&text).await?,
        DeviceCommand::Install { path } => {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("APK path is not valid UTF-8"))?;
            device.install_package(path).await?;
            println!("Installed {}", path);
        }
        DeviceCommand::Uninstall { package } => {
            device.remove_package(&package).await?;
            println!("Removed {}", package);
        }
        DeviceCommand::Start(args) => device.start_activity(&args.into_intent()?).await?,
        DeviceCommand::Broadcast(args) => device.broadcast_intent(&args.into_intent()?).await?,
        DeviceCommand::Instrument { class_name, args } => {
            let args = args
                .iter()
                .map(|a| parse_key_value(a))
                .collect::<Result<HashMap<_, _>>>()?;
            let result = device.instrument(&class_name, &args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        DeviceCommand::Reboot { into } => device.reboot(into.as_deref()).await?,
        DeviceCommand::Wake => device.wake().await?,
        DeviceCommand::Snapshot {
            output,
            format,
            crop,
        } => {
            let mut snapshot = device.take_snapshot().await?;
            if !snapshot.is_valid() {
                bail!("The device returned no frame (secure window?)");
            }
            if let Some(crop) = crop {
                let (x, y, w, h) = parse_crop(&crop)?;
                snapshot = snapshot.get_sub_image(x, y, w, h)?;
            }
            snapshot.write_to_file(&output, format.as_deref())?;
            println!(
                "Saved {}x{} snapshot to {}",
                snapshot.width()?,
                snapshot.height()?,
                output.display()
            );
        }
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let options = connect_options(&cli)?;
    let registry = BackendRegistry::new();

    match cli.command {
        Command::Compare {
            first,
            second,
            percent,
        } => {
            let same = load_snapshot(&first)?.same_as(&load_snapshot(&second)?, percent)?;
            println!("{}", if same { "same" } else { "different" });
        }
        Command::Devices => {
            check_adb(&cli.adb)?;
            let backend = registry.get_or_create(&cli.adb).await;
            let devices = backend.list_devices().await?;
            if devices.is_empty() {
                println!("No devices connected");
            }
            for d in devices {
                println!(
                    "{}\t{}\t{}",
                    d.serial,
                    d.state,
                    d.model.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Connect { address } => {
            check_adb(&cli.adb)?;
            let backend = registry.get_or_create(&cli.adb).await;
            println!("{}", backend.connect(&address).await?);
        }
        Command::Disconnect { address } => {
            check_adb(&cli.adb)?;
            let backend = registry.get_or_create(&cli.adb).await;
            println!("{}", backend.disconnect(address.as_deref()).await?);
        }
        Command::Device(command) => {
            check_adb(&cli.adb)?;
            let device = open_device(&cli.adb, &options, &registry).await?;
            run_on_device(command, &device).await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_keeps_types() {
        assert_eq!(parse_value("42"), Value::from(42));
        assert_eq!(parse_value("0.5"), Value::from(0.5));
        assert_eq!(parse_value("True"), Value::Bool(true));
        assert_eq!(parse_value("alice"), Value::from("alice"));
    }

    #[test]
    fn test_parse_key_value() {
        let (key, value) = parse_key_value("url=http://x/?a=b").unwrap();
        assert_eq!(key, "url");
        assert_eq!(value, Value::from("http://x/?a=b"));
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=1").is_err());
    }

    #[test]
    fn test_parse_crop() {
        assert_eq!(parse_crop("0, 10,20,30").unwrap(), (0, 10, 20, 30));
        assert!(parse_crop("1,2,3").is_err());
        assert!(parse_crop("a,b,c,d").is_err());
    }

    #[test]
    fn test_intent_args_build_intent() {
        let cli = Cli::parse_from([
            "droidrunner",
            "start",
            "-n",
            "com.example/.Main",
            "-e",
            "count=3",
            "-c",
            "android.intent.category.LAUNCHER",
        ]);
        let Command::Device(DeviceCommand::Start(args)) = cli.command else {
            panic!("expected start");
        };
        let intent = args.into_intent().unwrap();
        assert_eq!(intent.component.as_deref(), Some("com.example/.Main"));
        assert_eq!(intent.extras.get("count"), Some(&Value::from(3)));
        assert_eq!(intent.categories, vec!["android.intent.category.LAUNCHER"]);
        assert_eq!(intent.flags, 0);
    }

    #[test]
    fn test_connect_options_from_flags() {
        let cli = Cli::parse_from([
            "droidrunner",
            "--tries",
            "-2",
            "--timeout",
            "1.5",
            "-s",
            "emulator-.*",
            "wake",
        ]);
        let options = connect_options(&cli).unwrap();
        assert_eq!(options.max_attempts(), Some(1));
        assert_eq!(options.timeout, Some(Duration::from_millis(1500)));
        assert_eq!(options.device_id.as_deref(), Some("emulator-.*"));
    }

    #[test]
    fn test_unrepresentable_seconds_are_rejected() {
        for value in ["inf", "-1", "NaN", "1e300"] {
            let flag = format!("--timeout={}", value);
            let cli = Cli::parse_from(["droidrunner", flag.as_str(), "wake"]);
            let err = connect_options(&cli).unwrap_err();
            assert!(err.to_string().contains("--timeout"));
        }
        assert_eq!(seconds(0.25, "--duration").unwrap(), Duration::from_millis(250));
        assert!(seconds(f64::INFINITY, "--duration").is_err());
    }
}
