use anyhow::{Context, Result};
use chartdecon::{data, deconstruct, ChartInput, DeconOptions};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chartdecon")]
#[command(about = "Recover the data and encodings behind an extracted chart", long_about = None)]
struct Args {
    /// Chart JSON produced by mark extraction (reads stdin when omitted)
    input: Option<PathBuf>,

    /// JSON file overriding inference thresholds
    #[arg(long)]
    options: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Write each group's data table as CSV instead of JSON
    #[arg(long)]
    csv: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let options = match &args.options {
        Some(path) => DeconOptions::from_json_file(path)?,
        None => DeconOptions::default(),
    };

    let input = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file {}", path.display()))?;
            ChartInput::from_reader(BufReader::new(file))?
        }
        None => ChartInput::from_reader(io::stdin().lock()).context("Failed to read chart from stdin")?,
    };

    let decon = deconstruct(input, &options);

    let output = if args.csv {
        let mut out = String::new();
        for (i, group) in decon.groups.iter().enumerate() {
            out.push_str(&format!("# group {}\n", i));
            out.push_str(&data::group_to_csv(group).with_context(|| format!("Failed to export group {}", i))?);
        }
        out
    } else if args.pretty {
        serde_json::to_string_pretty(&decon).context("Failed to serialize deconstruction")? + "\n"
    } else {
        serde_json::to_string(&decon).context("Failed to serialize deconstruction")? + "\n"
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(output.as_bytes())
        .context("Failed to write output to stdout")?;
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}
