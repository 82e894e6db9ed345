//! The standard AT command set of the PER test rig.
//!
//! Each handler is a plain function over [`Params`] and a
//! [`CommandContext`]. Numeric parameters are parsed strictly: a missing,
//! non-numeric, or out-of-range value leaves the configuration field
//! untouched and returns a parameter error, which the dispatcher logs.

use lora_per_core::{Bandwidth, CodingRate, Error, Result, Role, SpreadingFactor};
use tracing::{debug, info};

use crate::dispatcher::{CommandContext, CommandEntry, CommandTable};
use crate::protocol::Params;

pub const FREQ: &str = "AT+FREQ";
pub const POWER: &str = "AT+POWER";
pub const SF: &str = "AT+SF";
pub const BW: &str = "AT+BW";
pub const CR: &str = "AT+CR";
pub const TRSW: &str = "AT+TRSW";
pub const CWSW: &str = "AT+CWSW";
pub const NBFRAME: &str = "AT+NBFRAME";
pub const RXBOOST: &str = "AT+RXBOOST";
pub const SLEEP: &str = "AT+SLEEP";
pub const PARAM: &str = "AT+PARAM";
pub const PER: &str = "AT+PER";
pub const HELP: &str = "AT+HELP";
pub const START: &str = "AT+START";

/// The command reference printed by `AT+HELP`.
pub const HELP_TEXT: &[&str] = &[
    "AT command reference:",
    "  AT+FREQ=<hz>        carrier frequency in Hz",
    "  AT+POWER=<dbm>      output power in dBm",
    "  AT+SF=<5..12>       spreading factor",
    "  AT+BW=<khz>         bandwidth: 10 15 20 31 41 62 125 200 250 400 500 800",
    "  AT+CR=<0..7>        coding rate: 1..4 = 4/5..4/8, 5..7 = long interleaved",
    "  AT+TRSW=<0|1>       role: 1 = receiver, 0 = transmitter",
    "  AT+CWSW=<0|1>       continuous wave mode",
    "  AT+NBFRAME=<n>      number of frames to receive",
    "  AT+RXBOOST=<0|1>    boosted receive gain",
    "  AT+SLEEP=<0|1>      sleep before starting",
    "  AT+PARAM=<n>        reserved",
    "  AT+PER              reset PER test (no effect)",
    "  AT+HELP             this text",
    "  AT+START            start the test",
];

// ---------------------------------------------------------------------------
// Parameter parsing
// ---------------------------------------------------------------------------

/// Parse a required integer parameter.
pub fn parse_int(command: &str, param: Option<&str>) -> Result<i64> {
    let text = param.ok_or_else(|| Error::MissingParameter(command.to_string()))?;
    text.trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidParameter(format!("{command}: {text:?} is not an integer")))
}

fn parse_in<T: TryFrom<i64>>(command: &str, param: Option<&str>, what: &str) -> Result<T> {
    let n = parse_int(command, param)?;
    T::try_from(n).map_err(|_| Error::InvalidParameter(format!("{command}: {what} {n} out of range")))
}

/// Parse a 0/1 switch. Only `1` turns the flag on.
fn parse_switch(command: &str, param: Option<&str>) -> Result<bool> {
    Ok(parse_int(command, param)? == 1)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn set_frequency(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let hz: u32 = parse_in(FREQ, p.first, "frequency")?;
    ctx.config.frequency_hz = hz;
    debug!(frequency_hz = hz, "frequency set");
    Ok(())
}

fn set_power(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let dbm: i8 = parse_in(POWER, p.first, "power")?;
    ctx.config.tx_power_dbm = dbm;
    debug!(dbm, "tx power set");
    Ok(())
}

fn set_spreading_factor(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let sf = SpreadingFactor::try_from(parse_int(SF, p.first)?)?;
    ctx.config.spreading_factor = sf;
    debug!(%sf, "spreading factor set");
    Ok(())
}

fn set_bandwidth(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let bw = Bandwidth::try_from(parse_int(BW, p.first)?)?;
    ctx.config.bandwidth = bw;
    debug!(%bw, "bandwidth set");
    Ok(())
}

fn set_coding_rate(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let cr = CodingRate::try_from(parse_int(CR, p.first)?)?;
    ctx.config.coding_rate = cr;
    debug!(%cr, "coding rate set");
    Ok(())
}

fn set_role(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let role = Role::from_switch(parse_int(TRSW, p.first)?);
    ctx.config.role = role;
    debug!(%role, "role set");
    Ok(())
}

fn set_continuous_wave(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let on = parse_switch(CWSW, p.first)?;
    ctx.config.continuous_wave = on;
    debug!(on, "continuous wave switch set");
    Ok(())
}

fn set_nb_frames(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let n: u32 = parse_in(NBFRAME, p.first, "frame count")?;
    if n == 0 {
        return Err(Error::InvalidParameter(format!(
            "{NBFRAME}: frame count must be at least 1"
        )));
    }
    ctx.config.nb_frames = n;
    debug!(nb_frames = n, "frame count set");
    Ok(())
}

fn set_rx_boost(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let on = parse_switch(RXBOOST, p.first)?;
    ctx.config.rx_boost = on;
    debug!(on, "rx boost set");
    Ok(())
}

fn set_sleep(p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    let on = parse_switch(SLEEP, p.first)?;
    ctx.config.sleep_before_run = on;
    debug!(on, "sleep before run set");
    Ok(())
}

fn reserved_param(p: Params<'_>, _ctx: &mut CommandContext<'_>) -> Result<()> {
    let value = parse_int(PARAM, p.first)?;
    info!(value, "AT+PARAM received");
    Ok(())
}

fn per_reset(_p: Params<'_>, _ctx: &mut CommandContext<'_>) -> Result<()> {
    info!("AT+PER received, reset has no effect");
    Ok(())
}

fn help(_p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    for line in HELP_TEXT {
        ctx.print(*line);
    }
    Ok(())
}

fn start(_p: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
    info!(config = %ctx.config, "start requested");
    ctx.request_start();
    Ok(())
}

/// The full command table, in matching order.
pub fn standard_table() -> CommandTable {
    CommandTable::from_entries([
        CommandEntry::new(FREQ, set_frequency),
        CommandEntry::new(POWER, set_power),
        CommandEntry::new(SF, set_spreading_factor),
        CommandEntry::new(BW, set_bandwidth),
        CommandEntry::new(CR, set_coding_rate),
        CommandEntry::new(TRSW, set_role),
        CommandEntry::new(CWSW, set_continuous_wave),
        CommandEntry::new(NBFRAME, set_nb_frames),
        CommandEntry::new(RXBOOST, set_rx_boost),
        CommandEntry::new(SLEEP, set_sleep),
        CommandEntry::new(PARAM, reserved_param),
        CommandEntry::new(PER, per_reset),
        CommandEntry::new(HELP, help),
        CommandEntry::new(START, start),
    ])
}
