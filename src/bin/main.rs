use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use ogengine::bamcodec::framing::DetectedFormat;
use ogengine::command_utils::{
    parse_compression_level, parse_forced_format, parse_region_arg, parse_sort_order,
};
use ogengine::config::Config;
use ogengine::header::Header;
use ogengine::markdup::MarkDuplicatesStage;
use ogengine::pipeline_dsl::StageSpec;
use ogengine::stage::filter::FilterStage;
use ogengine::stage::reader::ReaderStage;
use ogengine::stage::sorted_merge::SortedMergeStage;
use ogengine::stage::sorter::SorterStage;
use ogengine::stage::split::SplitStage;
use ogengine::stage::writer::WriterStage;
use ogengine::stage::{new_edge, run_chain, Stage, DEFAULT_QUEUE_BOUND};
use ogengine::util::{create_out_directory, format_int_with_commas, get_spinner, resolve_worker_count};
use ogengine::writers::{JsonStatsWriter, OutWriter, Stats};

#[derive(Parser)]
#[command(name = "modsort", about = "Streaming alignment pipeline engine")]
struct Cli {
    #[arg(long, global = true)]
    verbose: bool,
    #[arg(long, global = true)]
    threads: Option<usize>,
    #[arg(long, global = true)]
    single_threaded: bool,
    #[arg(long, global = true)]
    tmp_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    compression_level: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sort one or more inputs and merge them into one coordinate- or
    /// queryname-ordered output.
    Mergesort {
        inputs: Vec<PathBuf>,
        #[arg(long, default_value = "coordinate")]
        order: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        format: Option<String>,
    },
    /// Mark (or remove) PCR/optical duplicates.
    Dedup {
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        remove: bool,
        #[arg(long)]
        format: Option<String>,
    },
    /// Copy records through unchanged, optionally converting format.
    View {
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        format: Option<String>,
    },
    /// Filter by region, mapping quality, or record count.
    Filter {
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        region: Option<String>,
        #[arg(long)]
        min_mapq: Option<u8>,
        #[arg(long)]
        count: Option<u64>,
        #[arg(long)]
        format: Option<String>,
    },
    /// Split one input into N outputs by reference id.
    Split { input: PathBuf, outputs: Vec<PathBuf> },
    /// Print per-reference record counts as JSON.
    Stats { inputs: Vec<PathBuf> },
    /// Count total records across one or more files.
    Count { inputs: Vec<PathBuf> },
    /// Print a file's `@PG` command-line history.
    History { input: PathBuf },
    /// Run a small pipeline script (see `pipeline_dsl`).
    Pipeline { script: PathBuf },
}

fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    let _ = env_logger_style(level);
}

// log4rs configuration is typically driven by a config file in larger
// deployments; a minimal stderr logger is wired up directly here so the
// binary works without one.
fn env_logger_style(level: log::LevelFilter) -> std::result::Result<(), log::SetLoggerError> {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::config::{Appender, Root};
    let stderr = ConsoleAppender::builder().target(log4rs::append::console::Target::Stderr).build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level))
        .unwrap();
    log4rs::init_config(config).map(|_| ())
}

fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    config.single_threaded = cli.single_threaded;
    config.verbose = cli.verbose;
    if let Some(dir) = &cli.tmp_dir {
        config.tmp_dir = dir.clone();
    }
    config
}

fn output_format(output: &PathBuf, forced: Option<DetectedFormat>) -> DetectedFormat {
    forced.unwrap_or_else(|| {
        if output.extension().and_then(|e| e.to_str()) == Some("sam") {
            DetectedFormat::Sam
        } else {
            DetectedFormat::Bam
        }
    })
}

fn command_line_string() -> String {
    std::env::args().collect::<Vec<_>>().join(" ")
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let compression_level = parse_compression_level(cli.compression_level)?;
    let config = resolve_config(&cli);

    match cli.command {
        Command::View { input, output, format } => {
            let forced = parse_forced_format(format.as_deref())?;
            let reader = ReaderStage::open(vec![input], forced)?;
            let header = reader.header.clone();
            let (tx, rx) = new_edge(DEFAULT_QUEUE_BOUND);
            let mut reader = reader;
            reader.add_sink(tx);

            create_out_directory(&output)?;
            let out_format = output_format(&output, forced);
            let writer = WriterStage::open(
                output,
                out_format,
                header,
                rx,
                compression_level,
                "modsort",
                Some(command_line_string()),
            )?;

            run_chain(vec![Box::new(reader) as Box<dyn Stage>, Box::new(writer)])?;
        }

        Command::Filter { input, output, region, min_mapq, count, format } => {
            let forced = parse_forced_format(format.as_deref())?;
            let reader = ReaderStage::open(vec![input], forced)?;
            let header = reader.header.clone();
            let region = region.map(|r| parse_region_arg(&r, &header)).transpose()?;

            let (tx_a, rx_a) = new_edge(DEFAULT_QUEUE_BOUND);
            let (tx_b, rx_b) = new_edge(DEFAULT_QUEUE_BOUND);
            let mut reader = reader;
            reader.add_sink(tx_a);

            let mut filter = FilterStage::new(rx_a, region, min_mapq, count);
            filter.add_sink(tx_b);

            create_out_directory(&output)?;
            let out_format = output_format(&output, forced);
            let writer = WriterStage::open(
                output,
                out_format,
                header,
                rx_b,
                compression_level,
                "modsort",
                Some(command_line_string()),
            )?;

            run_chain(vec![
                Box::new(reader) as Box<dyn Stage>,
                Box::new(filter),
                Box::new(writer),
            ])?;
        }

        Command::Dedup { input, output, remove, format } => {
            let forced = parse_forced_format(format.as_deref())?;
            let reader = ReaderStage::open(vec![input], forced)?;
            let header = reader.header.clone();

            let (tx_a, rx_a) = new_edge(DEFAULT_QUEUE_BOUND);
            let (tx_b, rx_b) = new_edge(DEFAULT_QUEUE_BOUND);
            let mut reader = reader;
            reader.add_sink(tx_a);

            info!("resolved {} worker chain(s) for this run", resolve_worker_count(&config));
            let mut markdup =
                MarkDuplicatesStage::new(header.clone(), config.tmp_dir.clone(), remove, rx_a);
            markdup.add_sink(tx_b);

            create_out_directory(&output)?;
            let out_format = output_format(&output, forced);
            let writer = WriterStage::open(
                output,
                out_format,
                header,
                rx_b,
                compression_level,
                "modsort",
                Some(command_line_string()),
            )?;

            run_chain(vec![
                Box::new(reader) as Box<dyn Stage>,
                Box::new(markdup),
                Box::new(writer),
            ])?;
        }

        Command::Mergesort { inputs, order, output, format } => {
            if inputs.is_empty() {
                anyhow::bail!("mergesort requires at least one input");
            }
            let forced = parse_forced_format(format.as_deref())?;
            let order = parse_sort_order(&order)?;

            let mut stages: Vec<Box<dyn Stage>> = Vec::new();
            let mut merge_inputs = Vec::new();
            let mut header = None;

            for path in inputs {
                let reader = ReaderStage::open(vec![path], forced)?;
                if header.is_none() {
                    header = Some(reader.header.clone());
                }
                let (tx_a, rx_a) = new_edge(DEFAULT_QUEUE_BOUND);
                let (tx_b, rx_b) = new_edge(DEFAULT_QUEUE_BOUND);
                let mut reader = reader;
                reader.add_sink(tx_a);
                let mut sorter = SorterStage::new(order, rx_a);
                sorter.add_sink(tx_b);
                stages.push(Box::new(reader));
                stages.push(Box::new(sorter));
                merge_inputs.push(rx_b);
            }

            let header = header.expect("at least one input validated above");
            let (tx_out, rx_out) = new_edge(DEFAULT_QUEUE_BOUND);
            let merge = SortedMergeStage::new(order, merge_inputs, vec![tx_out]);

            create_out_directory(&output)?;
            let out_format = output_format(&output, forced);
            let writer = WriterStage::open(
                output,
                out_format,
                header,
                rx_out,
                compression_level,
                "modsort",
                Some(command_line_string()),
            )?;

            stages.push(Box::new(merge));
            stages.push(Box::new(writer));
            run_chain(stages)?;
        }

        Command::Split { input, outputs } => {
            if outputs.is_empty() {
                anyhow::bail!("split requires at least one output path");
            }
            let reader = ReaderStage::open(vec![input], None)?;
            let header = reader.header.clone();
            let (tx_a, rx_a) = new_edge(DEFAULT_QUEUE_BOUND);
            let mut reader = reader;
            reader.add_sink(tx_a);

            let mut sinks = Vec::new();
            let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(reader)];
            let mut writer_rxs = Vec::new();
            for _ in &outputs {
                let (tx, rx) = new_edge(DEFAULT_QUEUE_BOUND);
                sinks.push(tx);
                writer_rxs.push(rx);
            }
            let split = SplitStage::new(rx_a, sinks)?;
            stages.push(Box::new(split));

            for (path, rx) in outputs.into_iter().zip(writer_rxs) {
                create_out_directory(&path)?;
                let format = output_format(&path, None);
                let writer = WriterStage::open(
                    path,
                    format,
                    header.clone(),
                    rx,
                    compression_level,
                    "modsort",
                    Some(command_line_string()),
                )?;
                stages.push(Box::new(writer));
            }

            run_chain(stages)?;
        }

        Command::Count { inputs } => {
            let spinner = get_spinner();
            let mut total = 0u64;
            for path in inputs {
                let reader = ReaderStage::open(vec![path], None)?;
                let (tx, rx) = new_edge(DEFAULT_QUEUE_BOUND);
                let mut reader = reader;
                reader.add_sink(tx);
                let handle = std::thread::spawn(move || Box::new(reader).run());
                for _ in rx.iter() {
                    total += 1;
                    spinner.inc(1);
                }
                handle.join().expect("reader thread panicked")?;
            }
            spinner.finish_and_clear();
            println!("{}", format_int_with_commas(total));
        }

        Command::Stats { inputs } => {
            let mut stats = Stats::default();
            let mut per_ref = std::collections::HashMap::new();
            for path in inputs {
                let reader = ReaderStage::open(vec![path], None)?;
                let header = reader.header.clone();
                let (tx, rx) = new_edge(DEFAULT_QUEUE_BOUND);
                let mut reader = reader;
                reader.add_sink(tx);
                let handle = std::thread::spawn(move || Box::new(reader).run());
                for record in rx.iter() {
                    stats.total_records += 1;
                    if record.is_unmapped() {
                        stats.unmapped += 1;
                    } else {
                        stats.mapped += 1;
                        let name = header.references.name(record.ref_id).unwrap_or("*");
                        *per_ref.entry(name.to_string()).or_insert(0u64) += 1;
                    }
                    if record.flags.is_duplicate() {
                        stats.duplicates += 1;
                    }
                }
                handle.join().expect("reader thread panicked")?;
            }
            stats.per_reference = per_ref.into_iter().collect();
            stats.per_reference.sort();

            let stdout = std::io::stdout();
            let mut writer = JsonStatsWriter::new(stdout.lock());
            writer.write(&stats)?;
        }

        Command::History { input } => {
            let reader = ReaderStage::open(vec![input], None)?;
            for program in &reader.header.programs {
                match &program.command_line {
                    Some(cmd) if !cmd.is_empty() => println!("{cmd}"),
                    _ => println!("{}", program.id),
                }
            }
        }

        Command::Pipeline { script } => {
            let text = std::fs::read_to_string(&script)
                .with_context(|| format!("reading pipeline script {}", script.display()))?;
            let specs = ogengine::pipeline_dsl::parse_script(&text)?;
            info!("parsed {} pipeline stage(s) from {}", specs.len(), script.display());
            run_pipeline(&specs, &config, compression_level)?;
        }
    }

    Ok(())
}

/// Interprets a parsed pipeline script as a single linear chain: `read` opens
/// the source, `write` closes it, and any `filter`/`dedup`/`sort` stages in
/// between are wired in script order. Fan-out topologies (`split`) are
/// dedicated subcommands rather than pipeline stages.
fn run_pipeline(specs: &[StageSpec], config: &Config, compression_level: Option<u32>) -> Result<()> {
    let (first, rest) = specs.split_first().context("pipeline script has no stages")?;
    if first.name != "read" {
        anyhow::bail!("pipeline script must start with a 'read' stage");
    }
    let path = PathBuf::from(first.arg("path").context("'read' stage requires path=")?);
    let forced = parse_forced_format(first.arg("format"))?;

    let (last, middle) = rest.split_last().context("pipeline script has no 'write' stage")?;
    if last.name != "write" {
        anyhow::bail!("pipeline script must end with a 'write' stage");
    }

    let reader = ReaderStage::open(vec![path], forced)?;
    let mut header: Header = reader.header.clone();
    let mut stages: Vec<Box<dyn Stage>> = Vec::new();
    let (tx, mut rx) = new_edge(DEFAULT_QUEUE_BOUND);
    let mut reader = reader;
    reader.add_sink(tx);
    stages.push(Box::new(reader));

    for spec in middle {
        let (tx_next, rx_next) = new_edge(DEFAULT_QUEUE_BOUND);
        match spec.name.as_str() {
            "filter" => {
                let region = spec.arg("region").map(|r| parse_region_arg(r, &header)).transpose()?;
                let min_mapq = spec.arg("mapq").map(|v| v.parse()).transpose()?;
                let count = spec.arg("count").map(|v| v.parse()).transpose()?;
                let mut stage = FilterStage::new(rx, region, min_mapq, count);
                stage.add_sink(tx_next);
                stages.push(Box::new(stage));
            }
            "dedup" => {
                let remove = spec.arg("remove") == Some("true");
                let mut stage =
                    MarkDuplicatesStage::new(header.clone(), config.tmp_dir.clone(), remove, rx);
                stage.add_sink(tx_next);
                stages.push(Box::new(stage));
            }
            "sort" => {
                let order = parse_sort_order(spec.arg("order").unwrap_or("coordinate"))?;
                let mut stage = SorterStage::new(order, rx);
                stage.add_sink(tx_next);
                stages.push(Box::new(stage));
                header.sort_order = order;
            }
            other => anyhow::bail!("unsupported pipeline stage '{other}'"),
        }
        rx = rx_next;
    }

    let path = PathBuf::from(last.arg("path").context("'write' stage requires path=")?);
    let forced_out = parse_forced_format(last.arg("format"))?;
    create_out_directory(&path)?;
    let out_format = output_format(&path, forced_out);
    let writer = WriterStage::open(
        path,
        out_format,
        header,
        rx,
        compression_level,
        "modsort",
        Some(command_line_string()),
    )?;
    stages.push(Box::new(writer));

    run_chain(stages)?;
    Ok(())
}

fn main() -> Result<()> {
    if let Err(e) = run() {
        eprintln!("modsort: error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
