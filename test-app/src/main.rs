// per-app -- run a LoRa PER test session from the command line.
//
// The command console is a serial port, the process's stdin/stdout, or a
// fixed script given on the command line. The radio is simulated, with
// configurable frame loss and corruption.
//
// Usage:
//   per-app --port /dev/ttyACM0
//   per-app --port COM5 --baud 115200 --loss 0.05
//   per-app --stdin -vv
//   per-app --script AT+TRSW=1 --script AT+NBFRAME=100 --script AT+START --seed 7

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

use lora_per::transports::serial::DEFAULT_BAUD_RATE;
use lora_per::{PerReport, PerRigBuilder, StdioTransport, Transport};
use lora_per_test_harness::{MockTransport, SentLog, SimRadio};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// LoRa PER test rig on a simulated radio.
#[derive(Parser)]
#[command(name = "per-app", version, about)]
#[command(group(ArgGroup::new("console").required(true).args(["port", "stdin", "script"])))]
struct Cli {
    /// Serial port carrying the AT console (e.g. /dev/ttyACM0, COM5).
    #[arg(long)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Read AT commands from stdin and write console output to stdout.
    #[arg(long)]
    stdin: bool,

    /// AT command line to feed to the console; repeat for several lines.
    #[arg(long, value_name = "LINE")]
    script: Vec<String>,

    /// Probability that a simulated frame is lost (0.0 to 1.0).
    #[arg(long, default_value_t = 0.0)]
    loss: f64,

    /// Probability that a simulated frame fails its CRC (0.0 to 1.0).
    #[arg(long, default_value_t = 0.0)]
    corruption: f64,

    /// Seed for the simulated link, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    // stdout may be the console itself.
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

// ---------------------------------------------------------------------------
// Console selection
// ---------------------------------------------------------------------------

/// The command link, plus the captured output when it is a script.
async fn open_console(cli: &Cli) -> Result<(Box<dyn Transport>, Option<SentLog>)> {
    if let Some(port) = &cli.port {
        let transport = lora_per::SerialTransport::open(port, cli.baud)
            .await
            .with_context(|| format!("failed to open console on {port}"))?;
        return Ok((Box::new(transport), None));
    }

    if cli.stdin {
        return Ok((Box::new(StdioTransport::new()), None));
    }

    let mut script = String::new();
    for line in &cli.script {
        script.push_str(line);
        script.push_str("\r\n");
    }
    let mut mock = MockTransport::new();
    mock.push_rx(script.as_bytes());
    mock.end_input();
    let output = mock.sent_log();
    Ok((Box::new(mock), Some(output)))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn run(cli: Cli) -> Result<Option<PerReport>> {
    let radio = SimRadio::new(cli.seed)
        .with_loss(cli.loss)
        .with_corruption(cli.corruption);
    let (transport, script_output) = open_console(&cli).await?;

    let mut rig = PerRigBuilder::new(radio)
        .build_with_transport(transport)
        .await
        .context("failed to build PER rig")?;

    let result = tokio::select! {
        result = rig.run() => result.context("PER session failed"),
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(None)
        }
    };

    if let Some(output) = script_output {
        print!("{}", output.text());
    }
    if let Err(e) = rig.shutdown().await {
        warn!(error = %e, "console shutdown failed");
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(Some(report)) => {
            info!(%report, "session complete");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_requires_a_console() {
        assert!(Cli::try_parse_from(["per-app"]).is_err());
        assert!(Cli::try_parse_from(["per-app", "--stdin", "--port", "/dev/ttyACM0"]).is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["per-app", "--stdin"]).unwrap();
        assert_eq!(cli.baud, 921_600);
        assert_eq!(cli.loss, 0.0);
        assert_eq!(cli.seed, None);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn cli_script_lines_repeat() {
        let cli = Cli::try_parse_from([
            "per-app", "--script", "AT+TRSW=1", "--script", "AT+START", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.script, vec!["AT+TRSW=1", "AT+START"]);
        assert_eq!(cli.verbose, 2);
    }

    #[tokio::test]
    async fn script_session_reports() {
        let cli = Cli::try_parse_from([
            "per-app",
            "--script",
            "AT+TRSW=1",
            "--script",
            "AT+NBFRAME=3",
            "--script",
            "AT+START",
            "--seed",
            "1",
        ])
        .unwrap();

        let report = run(cli).await.unwrap().unwrap();
        assert_eq!(report.nb_ok, 3);
        assert_eq!(report.per_percent, 0);
    }
}
