//! `orbtrace`: list ORBTrace probes, pick one and configure it.
use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use clap::Parser;
use simple_logger::SimpleLogger;

use orbtrace_if::{
    parse_brightness, parse_voltage, resolve, teardown, usb_log_level, write_json, write_table,
    Config, DeviceDirectory, DiscoverySession, Error, Query, Result, SharedSession, TraceWidth,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set default brightness of output LEDs (0..255)
    #[arg(short = 'b', long, value_parser = parse_brightness)]
    brightness: Option<u8>,

    /// Force application of voltages the probe model doesn't list
    #[arg(short = 'F', long, default_value_t = false)]
    force_voltage: bool,

    /// Format listing output as JSON
    #[arg(short = 'j', long, default_value_t = false)]
    json: bool,

    /// Show all ORBTrace devices attached to system
    #[arg(short = 'l', long, default_value_t = false)]
    list: bool,

    /// Lock device (prevent further changes)
    #[arg(short = 'L', long, default_value_t = false)]
    lock: bool,

    /// Nickname for the probe (8 chars max)
    #[arg(short = 'n', long)]
    nick: Option<String>,

    /// Trace port width in bits: 1, 2 or 4
    #[arg(short = 'o', long)]
    trace_width: Option<TraceWidth>,

    /// Query all data from connected device
    #[arg(short = 'q', long, default_value_t = false)]
    query_all: bool,

    /// Query specified data from connected device (pPrR VPwr/IPwr/VRef/IRef)
    #[arg(short = 'Q', long)]
    query: Option<Query>,

    /// Set TPwr voltage in volts (0=Off)
    #[arg(short = 'p', long, value_parser = parse_voltage)]
    tpwr: Option<u32>,

    /// Set TRef voltage in volts (0=Passive)
    #[arg(short = 'r', long, value_parser = parse_voltage)]
    tref: Option<u32>,

    /// Any part of serial number to differentiate a specific probe
    #[arg(short = 's', long)]
    serial: Option<String>,

    /// Unlock device (allow changes, default state)
    #[arg(short = 'U', long, default_value_t = false)]
    unlock: bool,

    /// Verbosity 0 (errors) ..3 (debug trace)
    #[arg(short = 'v', long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    verbose: u8,

    /// Write parameters specified on command line to NVRAM
    #[arg(short = 'w', long, default_value_t = false)]
    write: bool,

    /// Reset all NVRAM parameters to default values
    #[arg(short = 'W', long, default_value_t = false)]
    reset: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            serial_filter: args.serial,
            list_only: args.list,
            json: args.json,
            brightness: args.brightness,
            trace_width: args.trace_width,
            tpwr_mv: args.tpwr,
            tref_mv: args.tref,
            nickname: args.nick,
            write_params: args.write,
            reset_params: args.reset,
            lock: args.lock,
            unlock: args.unlock,
            query: if args.query_all {
                Some(Query::all())
            } else {
                args.query
            },
            force_voltage: args.force_voltage,
        }
    }
}

fn set_log_level(verbose: u8) -> std::result::Result<(), log::SetLoggerError> {
    let logger = SimpleLogger::new().without_timestamps();
    match verbose {
        // just use env if not passed
        0 => logger.with_level(log::LevelFilter::Error).env(),
        1 => logger.with_level(log::LevelFilter::Info),
        2 => logger.with_level(log::LevelFilter::Debug),
        _ => logger.with_level(log::LevelFilter::Trace),
    }
    .init()
}

/// Ctrl-C is not an error: tear down whatever session is in `shared` and exit with status 0.
///
/// Teardown waits for the lock, so a USB transfer in progress finishes (or times out) first.
/// Anything it can't reach is left to the OS, which drops interface claims with the process.
fn exit_on_interrupt(shared: Arc<SharedSession>) -> io::Result<()> {
    let mut builder = tokio::runtime::Builder::new_current_thread();
    // the signal driver sits on the IO driver on unix only
    #[cfg(unix)]
    builder.enable_io();
    let runtime = builder.build()?;

    std::thread::Builder::new()
        .name("interrupt".into())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::info!("interrupted");
                        // keep the slot locked so the main thread can't start anything new
                        let _slot = teardown(&shared);
                        std::process::exit(0);
                    }
                    Err(e) => log::warn!("failed to establish interrupt handler: {}", e),
                }
            })
        })?;
    Ok(())
}

/// Runs `f` on the session in `shared` with the lock held.
fn with_session<T>(
    shared: &SharedSession,
    f: impl FnOnce(&mut DiscoverySession) -> Result<T>,
) -> Result<T> {
    let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
    match slot.as_mut() {
        Some(session) => f(session),
        // only after an interrupt, which is exiting the process
        None => Err(Error::SelectionAborted),
    }
}

fn list<W: Write>(directory: &DeviceDirectory, json: bool, mut out: W) -> Result<()> {
    if json {
        write_json(directory, &mut out)?;
    } else {
        write_table(directory, &mut out)?;
    }

    if directory.is_empty() {
        return Err(Error::NoMatch);
    }
    Ok(())
}

fn run(config: Config, usb_verbosity: u8) -> Result<()> {
    config.validate()?;

    let shared = Arc::new(Mutex::new(None));
    exit_on_interrupt(Arc::clone(&shared))?;

    let session = DiscoverySession::with_usb_log_level(usb_log_level(usb_verbosity))?;
    *shared.lock().unwrap_or_else(PoisonError::into_inner) = Some(session);

    let result = select_and_apply(&config, &shared);
    drop(teardown(&shared));
    result
}

fn select_and_apply(config: &Config, shared: &SharedSession) -> Result<()> {
    // the directory is copied out so the prompt doesn't block the interrupt handler
    let directory = with_session(shared, |session| {
        session.scan(config.serial_filter.as_deref())?;
        Ok(session.directory().clone())
    })?;

    if config.list_only {
        return list(&directory, config.json, io::stdout().lock());
    }

    let selection = resolve(&directory, io::stdin().lock(), io::stdout().lock())?;
    if let Some(d) = directory.get(selection) {
        log::info!(
            "Got device [{} {}, S/N {}]",
            d.manufacturer(),
            d.product(),
            d.serial()
        );
    }

    let commands = config.commands();
    if commands.is_empty() {
        return Ok(());
    }

    with_session(shared, |session| {
        let device = session.open(selection)?;
        // now the probe model is known the voltages can be checked properly
        config.check_voltages(|mv| device.validate_voltage(mv))?;
        for command in &commands {
            device.execute(command)?;
        }
        session.close();
        Ok(())
    })
}

fn main() {
    let args = Args::parse();
    if let Err(e) = set_log_level(args.verbose) {
        eprintln!("Failed to set log level: {}", e);
    }

    let verbose = args.verbose;
    if let Err(e) = run(args.into(), verbose) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
