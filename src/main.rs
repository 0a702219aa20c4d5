use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use imgcmp::core::metrics::fraction_above;
use imgcmp::core::scanner::discover_images;
use imgcmp::core::visualize::{render_difference_image, render_histogram, save_png};
use imgcmp::{
    bhattacharyya_distance, difference_grid, ColorHistogram, Config, DifferenceReport,
    DuplicateReport, FailurePolicy, Fingerprint,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "imgcmp", version, about = "Find duplicate images and compare image differences")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// JSON settings file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Find and list duplicate groups in a directory
    Duplicates {
        /// Directory to scan
        #[arg(short, long, value_name = "DIR")]
        path: PathBuf,
        /// Also scan sub-directories
        #[arg(short, long)]
        recursive: bool,
        /// Fail on the first unreadable image instead of skipping it
        #[arg(long)]
        abort_on_error: bool,
        /// Number of extraction workers (default: one per core)
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare two images
    Diff {
        first: PathBuf,
        second: PathBuf,
        /// Ignore cell differences at or below this value
        #[arg(short, long, value_name = "N")]
        threshold: Option<u8>,
        /// Write the difference grid as a PNG
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Print the difference grid export as JSON
        #[arg(long)]
        json: bool,
        /// Scale colors to the largest difference found
        #[arg(long)]
        adjust_colors: bool,
        /// Label cells with raw values instead of percentages
        #[arg(long)]
        absolute: bool,
    },

    /// Show the RGB histogram of an image
    Histogram {
        image: PathBuf,
        /// Report the histogram variance against another image
        #[arg(long, value_name = "FILE")]
        compare: Option<PathBuf>,
        /// Write the histogram chart as a PNG
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Print every bucket
        #[arg(long)]
        table: bool,
    },

    /// Print the 16x16 fingerprint of an image
    Fingerprint {
        image: PathBuf,
        /// Print as a single hex string
        #[arg(long)]
        hex: bool,
    },
}

#[derive(Serialize)]
struct DiffOutput {
    first: PathBuf,
    second: PathBuf,
    threshold: u8,
    percentage_difference: f32,
    bhattacharyya_distance: f32,
    difference: DifferenceReport,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Duplicates {
            path,
            recursive,
            abort_on_error,
            threads,
            json,
        } => {
            config.recursive |= recursive;
            if abort_on_error {
                config.on_decode_error = FailurePolicy::Abort;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }

            if !json {
                println!("▶ Scanning for duplicates in: {}", path.display());
            }
            let report = find_duplicates(&path, &config, !json)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Diff {
            first,
            second,
            threshold,
            output,
            json,
            adjust_colors,
            absolute,
        } => {
            let threshold = threshold.unwrap_or(config.threshold);
            config.adjust_color_scheme |= adjust_colors;
            config.absolute_text |= absolute;

            let a = load_fingerprint(&first)?;
            let b = load_fingerprint(&second)?;
            let differences = difference_grid(&a, &b);
            let percentage = fraction_above(&differences, threshold);
            let distance = bhattacharyya_distance(&a, &b);
            let report = DifferenceReport::new(&differences, config.difference_options());

            if json {
                let out = DiffOutput {
                    first: first.clone(),
                    second: second.clone(),
                    threshold,
                    percentage_difference: percentage,
                    bhattacharyya_distance: distance,
                    difference: report.clone(),
                };
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("▶ Comparing {} ↔ {}", first.display(), second.display());
                let differing = differences.iter().filter(|&d| d > threshold).count();
                println!(
                    "   Percentage difference (threshold {}): {:.4} ({} of {} cells)",
                    threshold,
                    percentage,
                    differing,
                    differences.len()
                );
                println!("   Bhattacharyya distance: {:.8}", distance);
            }

            // The metrics are already out; a rendering failure only warns.
            if let Some(out) = output {
                match save_png(&render_difference_image(&report), &out) {
                    Ok(()) => {
                        if !json {
                            println!("🖼️  Wrote difference image to {}", out.display());
                        }
                    }
                    Err(e) => eprintln!("⚠️  Could not write difference image: {}", e),
                }
            }
        }

        Commands::Histogram {
            image,
            compare,
            output,
            table,
        } => {
            let histogram = ColorHistogram::from_path(&image)
                .with_context(|| format!("Failed to read {:?}", image))?;

            println!("▶ Histogram of {}", image.display());
            let [red, green, blue] = histogram.max_values();
            println!("   Red, max value: {}", red);
            println!("   Green, max value: {}", green);
            println!("   Blue, max value: {}", blue);

            if let Some(other) = compare {
                let other_histogram = ColorHistogram::from_path(&other)
                    .with_context(|| format!("Failed to read {:?}", other))?;
                println!(
                    "   Variance against {}: {:.6}",
                    other.display(),
                    histogram.variance(&other_histogram)
                );
            }

            if table {
                print!("{}", histogram);
            }

            if let Some(out) = output {
                match save_png(&render_histogram(&histogram), &out) {
                    Ok(()) => println!("🖼️  Wrote histogram chart to {}", out.display()),
                    Err(e) => eprintln!("⚠️  Could not write histogram chart: {}", e),
                }
            }
        }

        Commands::Fingerprint { image, hex } => {
            let fingerprint = load_fingerprint(&image)?;
            if hex {
                println!("{}", fingerprint.to_hex());
            } else {
                print!("{}", fingerprint);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "imgcmp=warn",
        1 => "imgcmp=info",
        _ => "imgcmp=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time(),
        )
        .init();
}

fn load_fingerprint(path: &Path) -> Result<Fingerprint> {
    Fingerprint::from_path(path).with_context(|| format!("Failed to fingerprint {:?}", path))
}

/// Discover images under `dir`, fingerprint them in parallel and group the
/// duplicates.
fn find_duplicates(dir: &Path, config: &Config, show_progress: bool) -> Result<DuplicateReport> {
    let detector = config.detector();

    let spinner = if show_progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message("Scanning for images…");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let images = discover_images(
        dir,
        config.recursive,
        &config.extensions,
        &detector.get_cancellation_token(),
    )
    .with_context(|| format!("Failed to scan {:?}", dir))?;
    spinner.finish_with_message("Scan complete");

    if show_progress {
        println!("▶ Parallel fingerprinting {} images…", images.len());
    }

    let bar = if show_progress {
        ProgressBar::new(images.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    bar.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos}/{len} {wide_msg}",
    )?);
    let progress = bar.clone();
    let detector = detector.with_progress_callback(Box::new(move |p| {
        progress.set_position(p.completed as u64);
        progress.set_message(p.current_file.display().to_string());
    }));

    let report = benchmark("fingerprinting all images", show_progress, || {
        detector.find_duplicates(&images)
    })?;
    bar.finish_and_clear();
    Ok(report)
}

fn print_report(report: &DuplicateReport) {
    if report.groups.is_empty() {
        println!("No duplicates found.");
    } else {
        println!("Found {} duplicate group(s):", report.groups.len());
        for (i, group) in report.groups.iter().enumerate() {
            println!(" Group {}:", i + 1);
            for file in group {
                println!("   ▶ {}", file.display());
            }
        }
    }

    for skipped in &report.skipped {
        eprintln!("⚠️  Skipped {}: {}", skipped.path.display(), skipped.reason);
    }
}

/// Run `f()`, print how long it took (with `label`), and return its result.
fn benchmark<T, F: FnOnce() -> T>(label: &str, show: bool, f: F) -> T {
    let start = Instant::now();
    let result = f();
    if show {
        println!("⏱ {} took {:.2?}", label, start.elapsed());
    }
    result
}
