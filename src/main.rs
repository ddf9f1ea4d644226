use anyhow::{Context, Result};
use clap::Parser;
use cpufreq_aperf::cli::Cli;
use cpufreq_aperf::config::MonitorConfig;
use cpufreq_aperf::counters::cpu_has_effective_freq;
use cpufreq_aperf::output::{JsonLines, OutputFormat, ReportSink, TextTable};
use cpufreq_aperf::sampling_loop::SamplingLoop;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::geteuid;
use std::ffi::c_int;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::EnvFilter;

/// Set by SIGINT/SIGTERM; the sampling loop stops before its next pass
static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn request_stop(_signal: c_int) {
    STOP.store(true, Ordering::SeqCst);
}

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn install_stop_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(request_stop),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only stores to an atomic
        unsafe { sigaction(signal, &action) }
            .with_context(|| format!("Failed to install {} handler", signal))?;
    }
    Ok(())
}

/// Refuse to start when the counters cannot possibly be read
fn check_counter_access(config: &MonitorConfig) -> Result<()> {
    if config.uses_hardware_counters() && !cpu_has_effective_freq() {
        anyhow::bail!("CPU doesn't support APERF/MPERF");
    }

    let counters = config.counter_source();
    let probe_cpu = config.cpu.unwrap_or(0);
    if let Err(err) = counters.probe(probe_cpu) {
        let hint = if geteuid().is_root() {
            ""
        } else {
            " (you must be root)"
        };
        return Err(err).with_context(|| {
            format!(
                "Error reading {}, load/enable msr.ko{}",
                counters.device_path(probe_cpu).display(),
                hint
            )
        });
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(args.debug);

    let config = args.to_config();
    config.validate().map_err(anyhow::Error::msg)?;
    tracing::debug!(?config, "starting monitor");

    let mut sampling = SamplingLoop::from_config(&config).context("Failed to resolve CPUs")?;

    check_counter_access(&config)?;

    // A single requested CPU that cannot be measured is fatal
    let failures = sampling.initialize();
    if let (Some(cpu), Some((_, err))) = (config.cpu, failures.into_iter().next()) {
        return Err(err).with_context(|| format!("Cannot measure CPU {}", cpu));
    }

    install_stop_handler()?;

    let stdout = io::stdout().lock();
    let mut sink: Box<dyn ReportSink> = match config.format {
        OutputFormat::Text => Box::new(TextTable::new(stdout, config.cpu.is_some(), config.once)),
        OutputFormat::Json => Box::new(JsonLines::new(stdout)),
    };

    sink.begin()?;
    let passes = sampling.run(&STOP, |reports| sink.write_pass(reports))?;
    sink.finish()?;

    tracing::debug!(passes, "monitor stopped");
    Ok(())
}
