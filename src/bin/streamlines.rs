use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use streamlines::cli;
use streamlines::geom::SmoothOptions;

#[derive(Parser)]
#[command(name = "streamlines", version, about = "Manipulate diffusion MRI streamlines")]
struct Cli {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Concatenate several files into one
    Merge(MergeArgs),
    /// Drop streamlines shorter than a minimum length
    Filter(FilterArgs),
    /// Orient all streamlines like a template streamline
    Reorient(ReorientArgs),
    /// Smooth streamlines with a B-spline fit
    Smooth(SmoothArgs),
    /// Summarize a file
    Info(InfoArgs),
}

#[derive(Args)]
struct MergeArgs {
    /// Input .trk files, merged in order
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,
    /// Output .trk file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct FilterArgs {
    input: PathBuf,
    output: PathBuf,
    /// Minimum length in mm
    #[arg(long)]
    min_length: f64,
}

#[derive(Args)]
struct ReorientArgs {
    input: PathBuf,
    output: PathBuf,
    /// Index of the template streamline
    #[arg(long)]
    template: Option<usize>,
}

#[derive(Args)]
struct SmoothArgs {
    input: PathBuf,
    output: PathBuf,
    /// Arc length between spline knots, in mm
    #[arg(long, default_value_t = SmoothOptions::default().knot_distance)]
    knot_distance: f64,
}

#[derive(Args)]
struct InfoArgs {
    input: PathBuf,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    streamlines::init_logger(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Merge(args) => {
            let count = cli::merge(&args.inputs, &args.output)?;
            println!("wrote {count} streamlines to {}", args.output.display());
        }
        Commands::Filter(args) => {
            let count = cli::filter(&args.input, &args.output, args.min_length)?;
            println!("kept {count} streamlines in {}", args.output.display());
        }
        Commands::Reorient(args) => {
            let count = cli::reorient(&args.input, &args.output, args.template)?;
            println!("reoriented {count} streamlines into {}", args.output.display());
        }
        Commands::Smooth(args) => {
            let options = SmoothOptions::new(args.knot_distance);
            let count = cli::smooth(&args.input, &args.output, options)?;
            println!("smoothed {count} streamlines into {}", args.output.display());
        }
        Commands::Info(args) => {
            let summary = cli::info(&args.input)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
        }
    }
    Ok(())
}
