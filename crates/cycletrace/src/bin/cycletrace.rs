//! Command-line front end for cycletrace.
//!
//! Runs a simulated periodic real-time task that traces its own job
//! releases and finishes, and inspects binary or JSON traces afterwards.
//!
//! # Usage
//!
//! ```bash
//! # 10 ms jobs every 100 ms for 5 s, reference id 7
//! cycletrace run --wcet-ms 10 --period-ms 100 --duration-s 5 --ref-id 7 --output trace.bin
//!
//! # Run until Ctrl+C, keep a JSON copy, keep all live records on wrap
//! cycletrace run --wcet-ms 2 --period-ms 5 --ref-id 1 --window chronological --json trace.json
//!
//! # Print a binary trace, with event names
//! cycletrace dump --input trace.bin --names
//!
//! # Per-event counts and span
//! cycletrace summary --input trace.bin --tsc-khz 3300000
//!
//! # Binary to JSON
//! cycletrace convert --input trace.bin --output trace.json
//! ```

use clap::{Parser, Subcommand};
use cycletrace::buffer::TraceBuffer;
use cycletrace::config::{ExportWindow, TraceConfig, DEFAULT_TSC_KHZ};
use cycletrace::events::EventId;
use cycletrace::export::{self, ExportError};
use cycletrace::trace_log::TraceLog;
use cycletrace::tsc::CycleSource;
use log::{debug, warn};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "cycletrace")]
#[command(about = "Cycle-counter event tracer for host, guest, and real-time task events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a periodic task and trace every job release and finish.
    Run {
        /// Execution time of each job, in milliseconds.
        #[arg(long)]
        wcet_ms: u64,

        /// Release period, in milliseconds.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        period_ms: u64,

        /// How long to run, in seconds (0 = until Ctrl+C).
        #[arg(long, default_value = "0")]
        duration_s: u64,

        /// Reference id stored as the source of every task event.
        #[arg(long, allow_negative_numbers = true)]
        ref_id: i32,

        /// JSON tracer config; flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Ring capacity in records.
        #[arg(long)]
        capacity: Option<usize>,

        /// Export window: cursor or chronological.
        #[arg(long)]
        window: Option<ExportWindow>,

        /// Counter frequency in kHz, for time conversion.
        #[arg(long)]
        tsc_khz: Option<u32>,

        /// Binary trace output path.
        #[arg(short, long, default_value = "trace.bin")]
        output: PathBuf,

        /// Also save a JSON trace log here.
        #[arg(long)]
        json: Option<PathBuf>,

        /// Don't dump the trace to stdout on exit.
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print a trace file one record per line.
    Dump {
        /// Binary (or .json) trace file.
        #[arg(short, long)]
        input: PathBuf,

        /// Show categories and registered events by name.
        #[arg(short, long)]
        names: bool,
    },

    /// Show per-event counts and the time span of a trace file.
    Summary {
        /// Binary (or .json) trace file.
        #[arg(short, long)]
        input: PathBuf,

        /// Counter frequency in kHz (binary traces only; JSON logs carry it).
        #[arg(long, default_value_t = DEFAULT_TSC_KHZ)]
        tsc_khz: u32,
    },

    /// Convert a binary trace into a JSON trace log.
    Convert {
        /// Binary trace file.
        #[arg(short, long)]
        input: PathBuf,

        /// JSON output path.
        #[arg(short, long)]
        output: PathBuf,

        /// Counter frequency in kHz recorded in the log.
        #[arg(long, default_value_t = DEFAULT_TSC_KHZ)]
        tsc_khz: u32,
    },
}

/// Parameters of the simulated periodic task.
struct TaskParams {
    wcet: Duration,
    period: Duration,
    /// Jobs to run; `None` runs until interrupted.
    jobs: Option<u64>,
    ref_id: i32,
}

impl TaskParams {
    fn new(wcet_ms: u64, period_ms: u64, duration_s: u64, ref_id: i32) -> Self {
        let jobs = match duration_s {
            0 => None,
            s => Some(s * 1_000 / period_ms + 1),
        };
        Self {
            wcet: Duration::from_millis(wcet_ms),
            period: Duration::from_millis(period_ms),
            jobs,
            ref_id,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            wcet_ms,
            period_ms,
            duration_s,
            ref_id,
            config,
            capacity,
            window,
            tsc_khz,
            output,
            json,
            quiet,
        } => {
            let params = TaskParams::new(wcet_ms, period_ms, duration_s, ref_id);
            resolve_config(config.as_deref(), capacity, window, tsc_khz)
                .and_then(|cfg| cmd_run(cfg, params, &output, json.as_deref(), quiet))
        }
        Commands::Dump { input, names } => cmd_dump(&input, names),
        Commands::Summary { input, tsc_khz } => cmd_summary(&input, tsc_khz),
        Commands::Convert {
            input,
            output,
            tsc_khz,
        } => cmd_convert(&input, &output, tsc_khz),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn resolve_config(
    path: Option<&Path>,
    capacity: Option<usize>,
    window: Option<ExportWindow>,
    tsc_khz: Option<u32>,
) -> Result<TraceConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(p) => TraceConfig::load(p)?,
        None => TraceConfig::default(),
    };
    if let Some(capacity) = capacity {
        config.capacity = capacity;
    }
    if let Some(window) = window {
        config.export_window = window;
    }
    if let Some(tsc_khz) = tsc_khz {
        config.tsc_khz = tsc_khz;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_run(
    config: TraceConfig,
    params: TaskParams,
    output: &Path,
    json: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if params.wcet > params.period {
        warn!(
            "wcet {:?} exceeds period {:?}; every job will overrun",
            params.wcet, params.period
        );
    }

    let mut trace = TraceBuffer::new(config)?;
    trace.initialize();

    install_stop_handler();
    match params.jobs {
        Some(n) => eprintln!(
            "Running {} jobs (wcet {:?}, period {:?})...",
            n, params.wcet, params.period
        ),
        None => eprintln!(
            "Running until Ctrl+C (wcet {:?}, period {:?})...",
            params.wcet, params.period
        ),
    }

    let completed = run_periodic(&mut trace, &params, &RUNNING);

    eprintln!(
        "Completed {} jobs, {} records ({} overwritten)",
        completed,
        trace.total_writes(),
        trace.dropped(),
    );

    if !quiet {
        let stdout = std::io::stdout();
        let mut out = BufWriter::new(stdout.lock());
        export::export_to_text(&trace, &mut out)?;
        out.flush()?;
    }

    let written = export::export_to_file(&trace, output)?;
    eprintln!("Wrote {} records to {}", written, output.display());

    if let Some(path) = json {
        TraceLog::from_buffer(&trace).save(path)?;
        eprintln!("Saved JSON trace log to {}", path.display());
    }
    Ok(())
}

/// Release jobs every `period`, tracing release and finish.
///
/// Returns the number of completed jobs.  Stops after `params.jobs` jobs
/// or as soon as `running` is cleared.
fn run_periodic<C: CycleSource>(
    trace: &mut TraceBuffer<C>,
    params: &TaskParams,
    running: &AtomicBool,
) -> u64 {
    let release = EventId::TaskReleaseJob.as_i32();
    let finish = EventId::TaskFinishJob.as_i32();

    let mut completed = 0u64;
    let mut next_release = Instant::now() + params.period;

    while running.load(Ordering::Relaxed) {
        if params.jobs.is_some_and(|n| completed >= n) {
            break;
        }

        let now = Instant::now();
        if next_release > now {
            std::thread::sleep(next_release - now);
        } else {
            debug!("job {} released {:?} late", completed, now - next_release);
        }
        if !running.load(Ordering::Relaxed) {
            break;
        }

        trace.record_task(release, params.ref_id);
        burn(params.wcet);
        trace.record_task(finish, params.ref_id);

        completed += 1;
        next_release += params.period;
    }

    completed
}

/// Spin on the CPU for `budget`, standing in for a job's computation.
fn burn(budget: Duration) {
    let start = Instant::now();
    while start.elapsed() < budget {
        std::hint::spin_loop();
    }
}

fn load_trace(path: &Path, tsc_khz: u32) -> Result<TraceLog, ExportError> {
    if path.extension().is_some_and(|ext| ext == "json") {
        TraceLog::load(path)
    } else {
        Ok(TraceLog::new(tsc_khz, export::read_records(path)?))
    }
}

fn cmd_dump(input: &Path, names: bool) -> Result<(), Box<dyn std::error::Error>> {
    let log = load_trace(input, DEFAULT_TSC_KHZ)?;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    export::write_text(&log.records, &mut out, names)?;
    out.flush()?;
    Ok(())
}

fn cmd_summary(input: &Path, tsc_khz: u32) -> Result<(), Box<dyn std::error::Error>> {
    let log = load_trace(input, tsc_khz)?;

    println!("Trace: {}", input.display());
    println!("Records: {}", log.len());
    if log.dropped > 0 {
        println!("Dropped before capture: {}", log.dropped);
    }
    println!("Counter: {} kHz", log.tsc_khz);
    if !log.metadata.kernel_version.is_empty() {
        println!("Kernel: {}", log.metadata.kernel_version);
    }
    println!("CPU: {}", log.metadata.cpu_model);
    println!();

    let summary = log.summary();
    let mut sorted: Vec<_> = summary.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    println!("{:>28} {:>10} {:>8}", "Event", "Count", "Percent");
    println!("{}", "-".repeat(48));
    let total = log.len().max(1) as f64;
    for (name, count) in &sorted {
        let pct = **count as f64 / total * 100.0;
        println!("{:>28} {:>10} {:>7.1}%", name, count, pct);
    }
    println!("{}", "-".repeat(48));
    println!("{:>28} {:>10}", "Total", log.len());

    if let (Some(cycles), Some(ns)) = (log.span_cycles(), log.span_ns()) {
        let ms = ns as f64 / 1_000_000.0;
        println!();
        println!("Span: {} cycles ({:.3} ms)", cycles, ms);
        if ms > 0.0 {
            println!("Event rate: {:.0} events/sec", log.len() as f64 / (ms / 1_000.0));
        }
    }
    Ok(())
}

fn cmd_convert(input: &Path, output: &Path, tsc_khz: u32) -> Result<(), Box<dyn std::error::Error>> {
    let records = export::read_records(input)?;
    let log = TraceLog::new(tsc_khz, records);
    log.save(output)?;
    eprintln!("Converted {} records to {}", log.len(), output.display());
    Ok(())
}

/// Cleared by SIGINT/SIGTERM.
static RUNNING: AtomicBool = AtomicBool::new(true);

/// Route SIGINT and SIGTERM to [`RUNNING`] (avoids pulling in a ctrlc crate).
fn install_stop_handler() {
    extern "C" fn handler(_: libc::c_int) {
        RUNNING.store(false, Ordering::Relaxed);
    }

    let h = handler as extern "C" fn(libc::c_int) as libc::sighandler_t;
    // SAFETY: the handler only performs an atomic store, which is
    // async-signal-safe.
    unsafe {
        libc::signal(libc::SIGINT, h);
        libc::signal(libc::SIGTERM, h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cycletrace::events::Category;
    use cycletrace::tsc::VirtualCycles;

    fn trace(capacity: usize) -> TraceBuffer<VirtualCycles> {
        let mut t = TraceBuffer::with_source(
            TraceConfig::with_capacity(capacity),
            VirtualCycles::new(0, 100),
        )
        .unwrap();
        t.initialize();
        t
    }

    #[test]
    fn job_count_matches_duration_over_period_plus_one() {
        let params = TaskParams::new(1, 100, 2, 7);
        assert_eq!(params.jobs, Some(21));
        assert_eq!(TaskParams::new(1, 100, 0, 7).jobs, None);
    }

    #[test]
    fn periodic_run_traces_release_and_finish_pairs() {
        let mut t = trace(64);
        let params = TaskParams {
            wcet: Duration::from_micros(100),
            period: Duration::from_millis(1),
            jobs: Some(3),
            ref_id: 7,
        };
        let running = AtomicBool::new(true);

        assert_eq!(run_periodic(&mut t, &params, &running), 3);

        let recs: Vec<_> = t.records().copied().collect();
        assert_eq!(recs.len(), 6);
        for pair in recs.chunks(2) {
            assert_eq!(pair[0].event_id, 301);
            assert_eq!(pair[1].event_id, 302);
            assert!(pair.iter().all(|r| r.category == Category::Task && r.source_id == 7));
        }
    }

    #[test]
    fn cleared_flag_stops_before_first_job() {
        let mut t = trace(8);
        let params = TaskParams::new(1, 1, 0, 1);
        let running = AtomicBool::new(false);
        assert_eq!(run_periodic(&mut t, &params, &running), 0);
        assert_eq!(t.records().count(), 0);
    }

    #[test]
    fn resolve_config_applies_overrides() {
        let config =
            resolve_config(None, Some(128), Some(ExportWindow::Chronological), Some(1_000)).unwrap();
        assert_eq!(config.capacity, 128);
        assert_eq!(config.export_window, ExportWindow::Chronological);
        assert_eq!(config.tsc_khz, 1_000);
        assert!(resolve_config(None, Some(0), None, None).is_err());
    }

    #[test]
    fn load_trace_reads_binary_and_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let bin = dir.path().join("t.bin");
        let json = dir.path().join("t.json");

        let mut t = trace(8);
        t.record_host(101);
        t.record_guest(202, 5);
        export::export_to_file(&t, &bin).unwrap();
        TraceLog::from_buffer(&t).save(&json).unwrap();

        let from_bin = load_trace(&bin, 2_000).unwrap();
        let from_json = load_trace(&json, 2_000).unwrap();
        assert_eq!(from_bin.records, from_json.records);
        assert_eq!(from_bin.tsc_khz, 2_000);
        assert_eq!(from_json.tsc_khz, t.config().tsc_khz);
    }

    #[test]
    fn cli_parses_run_with_negative_ref_id() {
        let cli = Cli::try_parse_from([
            "cycletrace", "run", "--wcet-ms", "1", "--period-ms", "10", "--ref-id", "-1",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Run { ref_id: -1, .. }));
    }

    #[test]
    fn cli_rejects_zero_period() {
        assert!(Cli::try_parse_from([
            "cycletrace", "run", "--wcet-ms", "1", "--period-ms", "0", "--ref-id", "1",
        ])
        .is_err());
    }
}
