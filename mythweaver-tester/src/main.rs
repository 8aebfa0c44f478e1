mod autoplay;
mod reports;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use mythweaver_game::{CatalogLoader, EmbeddedLoader};
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::Instant;

use autoplay::{Autoplayer, RunSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored human-readable summary
    Console,
    /// Machine-readable JSON
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "mythweaver-tester", version)]
#[command(about = "Automated playthroughs and invariant checks for the Mythweaver rules core")]
struct Args {
    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Number of runs per seed; each iteration offsets the seed by one
    #[arg(long, default_value_t = 1)]
    iterations: u64,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Decorate each weave through the async narration fallback path
    #[arg(long)]
    narrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.report == ReportFormat::Console && args.output.is_none() {
        announce_banner();
    }

    let start_time = Instant::now();
    let seeds = parse_seeds(&args.seeds)?;
    let loader = EmbeddedLoader;
    let catalog = loader.load_catalog().context("bundled catalog is invalid")?;
    let rules = loader.load_rules().context("bundled rules are invalid")?;

    let mut runs = Vec::new();
    for seed in seeds {
        for iteration in 0..args.iterations {
            let run_seed = seed.wrapping_add(iteration);
            let player = Autoplayer::new(run_seed, catalog.clone(), rules.clone(), args.narrate);
            let summary = player.play().await;
            if args.verbose {
                eprintln!(
                    "seed {run_seed}: {} with {} points",
                    summary.outcome, summary.total_score
                );
            }
            runs.push(summary);
        }
    }

    write_reports(&args, &runs, start_time)?;

    if runs.iter().any(|r| !r.passed()) {
        std::process::exit(1);
    }
    Ok(())
}

fn announce_banner() {
    println!("{}", "🎴 Mythweaver Automated Tester".bright_cyan().bold());
    println!("{}", "==============================".cyan());
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn parse_seeds(raw: &str) -> Result<Vec<u64>> {
    let seeds = split_csv(raw)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed `{token}`"))
        })
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        bail!("no seeds given");
    }
    Ok(seeds)
}

fn write_reports(args: &Args, runs: &[RunSummary], start_time: Instant) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;
    match args.report {
        ReportFormat::Json => reports::generate_json_report(output_target.writer(), runs)?,
        ReportFormat::Console => {
            reports::generate_console_report(output_target.writer(), runs, start_time.elapsed())?;
            writeln!(&mut output_target)?;
            writeln!(&mut output_target, "🏁 Total time: {:?}", start_time.elapsed())?;
        }
    }
    output_target.flush_inner()?;
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_parse_from_csv() {
        assert_eq!(parse_seeds("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_seeds("x").is_err());
        assert!(parse_seeds(" , ").is_err());
    }

    #[test]
    fn args_parse_report_and_flags() {
        let args = Args::parse_from([
            "mythweaver-tester",
            "--seeds",
            "4,5",
            "--report",
            "json",
            "--narrate",
        ]);
        assert_eq!(args.report, ReportFormat::Json);
        assert!(args.narrate);
        assert_eq!(args.iterations, 1);
    }

    #[test]
    fn output_target_writes_file() {
        let path = std::env::temp_dir().join(format!("mythweaver-out-{}", std::process::id()));
        let mut target = OutputTarget::new(Some(path.clone())).unwrap();
        writeln!(target, "hello").unwrap();
        target.flush_inner().unwrap();
        drop(target);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
        std::fs::remove_file(path).unwrap();
    }
}
