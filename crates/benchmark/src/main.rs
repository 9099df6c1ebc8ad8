//! sheetnest command-line runner

use clap::{Parser, Subcommand};
use sheetnest_benchmark::{run_job, Job, RunOptions, SyntheticJobs};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sheetnest")]
#[command(about = "Nest irregular parts onto material sheets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a nesting job from a JSON file
    Run {
        /// Path to the job file
        job: PathBuf,

        /// Stop after this many generations
        #[arg(short, long)]
        generations: Option<u32>,

        /// Stop after this many seconds
        #[arg(short, long)]
        time_limit: Option<u64>,

        /// Number of evaluation workers
        #[arg(long)]
        threads: Option<usize>,

        /// Random seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Output file for the report and best layout (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate synthetic job files
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "jobs/synthetic")]
        output: PathBuf,

        /// Random seed for reproducibility
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            job,
            generations,
            time_limit,
            threads,
            seed,
            output,
        } => {
            let job = Job::load(&job)?;
            let options = RunOptions {
                max_generations: generations,
                time_limit: time_limit.map(Duration::from_secs),
                threads,
                seed,
            };

            let report = run_job(&job, &options)?;
            report.print_summary();

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string_pretty(&report)?)?;
                println!("Report saved to: {}", path.display());
            }
        }

        Commands::Generate { output, seed } => {
            std::fs::create_dir_all(&output)?;
            println!("Generating synthetic jobs (seed={}) to {}...", seed, output.display());

            for job in SyntheticJobs::all(seed)? {
                let path = output.join(format!("{}.json", job.name));
                job.save(&path)?;
                println!(
                    "  {} ... OK ({} parts, {} instances)",
                    job.name,
                    job.parts.len(),
                    job.total_instances()
                );
            }
        }
    }

    Ok(())
}
