//! vesselseg CLI: batch retinal vessel segmentation and scoring.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use vesselseg::dataset::DEFAULT_IDS;
use vesselseg::{
    BatchOptions, BatchSummary, BinaryMask, Channel, Dataset, DatasetLayout, MeanScores,
    SegmentConfig, Segmenter,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "vesselseg")]
#[command(about = "Segment blood vessels in retinal fundus images and score them against manual annotations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment and score a numbered range of items in a DRIVE-style dataset.
    Batch(CliBatchArgs),

    /// Segment a single image.
    Segment(CliSegmentArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliBatchArgs {
    /// Dataset root (contains `<split>/images`, `<split>/mask`, `<split>/1st_manual`).
    #[arg(long)]
    root: PathBuf,

    /// Dataset split directory name.
    #[arg(long, default_value = vesselseg::dataset::DEFAULT_SPLIT)]
    split: String,

    /// First item id (inclusive).
    #[arg(long, default_value_t = *DEFAULT_IDS.start())]
    start: u32,

    /// Last item id (inclusive).
    #[arg(long, default_value_t = *DEFAULT_IDS.end())]
    end: u32,

    /// Path to write the full batch report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Score only; do not write segmentation PNGs.
    #[arg(long)]
    no_write: bool,

    /// Process items one after another.
    #[arg(long)]
    sequential: bool,

    #[command(flatten)]
    config: CliConfigArgs,
}

#[derive(Debug, Clone, Args)]
struct CliSegmentArgs {
    /// Input fundus image.
    #[arg(long)]
    image: PathBuf,

    /// Field-of-view mask image.
    #[arg(long)]
    fov: PathBuf,

    /// Manual annotation; when given, scores are printed.
    #[arg(long)]
    ground_truth: Option<PathBuf>,

    /// Output segmentation (PNG, 0/255).
    #[arg(long)]
    out: PathBuf,

    #[command(flatten)]
    config: CliConfigArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct CliConfigArgs {
    /// JSON configuration file; flags below override individual fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input channel.
    #[arg(long, value_enum)]
    channel: Option<ChannelArg>,

    /// Do not invert the selected channel.
    #[arg(long)]
    no_invert: bool,

    /// CLAHE clip limit (multiple of the mean bin count).
    #[arg(long)]
    clip_limit: Option<f32>,

    /// CLAHE tile grid size (rows = columns).
    #[arg(long)]
    tiles: Option<u32>,

    /// Smallest vesselness scale (px).
    #[arg(long)]
    sigma_min: Option<f64>,

    /// Largest vesselness scale (px).
    #[arg(long)]
    sigma_max: Option<f64>,

    /// Vesselness scale step (px).
    #[arg(long)]
    sigma_step: Option<f64>,

    /// Frangi blob sensitivity.
    #[arg(long)]
    beta: Option<f64>,

    /// Frangi structureness sensitivity.
    #[arg(long)]
    gamma: Option<f64>,

    /// Otsu histogram bins.
    #[arg(long)]
    bins: Option<usize>,

    /// Closing disk radius (0 disables).
    #[arg(long)]
    closing_radius: Option<u32>,

    /// Minimum kept component size in pixels.
    #[arg(long)]
    min_component_size: Option<usize>,

    /// FOV pixels are those strictly above this value.
    #[arg(long)]
    fov_threshold: Option<u8>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelArg {
    Red,
    Green,
    Blue,
}

impl ChannelArg {
    fn to_core(self) -> Channel {
        match self {
            Self::Red => Channel::Red,
            Self::Green => Channel::Green,
            Self::Blue => Channel::Blue,
        }
    }
}

impl CliConfigArgs {
    fn to_config(&self) -> CliResult<SegmentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading config: {}", path.display());
                SegmentConfig::from_json_file(path)?
            }
            None => SegmentConfig::default(),
        };

        if let Some(c) = self.channel {
            config.channel.channel = c.to_core();
        }
        if self.no_invert {
            config.channel.invert = false;
        }
        if let Some(v) = self.clip_limit {
            config.clahe.clip_limit = v;
        }
        if let Some(v) = self.tiles {
            config.clahe.tile_rows = v;
            config.clahe.tile_cols = v;
        }
        if let Some(v) = self.sigma_min {
            config.vesselness.sigma_min = v;
        }
        if let Some(v) = self.sigma_max {
            config.vesselness.sigma_max = v;
        }
        if let Some(v) = self.sigma_step {
            config.vesselness.sigma_step = v;
        }
        if let Some(v) = self.beta {
            config.vesselness.beta = v;
        }
        if let Some(v) = self.gamma {
            config.vesselness.gamma = v;
        }
        if let Some(v) = self.bins {
            config.threshold.bins = v;
        }
        if let Some(v) = self.closing_radius {
            config.cleanup.closing_radius = v;
        }
        if let Some(v) = self.min_component_size {
            config.cleanup.min_component_size = v;
        }
        if let Some(v) = self.fov_threshold {
            config.fov_threshold = v;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Batch(args) => run_batch(&args),
        Commands::Segment(args) => run_segment(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

fn print_mean(mean: &MeanScores) {
    println!("  accuracy:     {:.4}", mean.accuracy);
    println!("  sensitivity:  {:.4}", mean.sensitivity);
    println!("  specificity:  {:.4}", mean.specificity);
    println!("  dice:         {:.4}", mean.dice);
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&SegmentConfig::default())?);
    Ok(())
}

// ── batch ──────────────────────────────────────────────────────────────

fn run_batch(args: &CliBatchArgs) -> CliResult<()> {
    if args.start > args.end {
        return Err(format!("empty id range: --start {} > --end {}", args.start, args.end).into());
    }
    let segmenter = Segmenter::new(args.config.to_config()?)?;
    let dataset = Dataset::new(DatasetLayout::new(args.root.clone(), args.split.clone()));
    let ids: Vec<u32> = (args.start..=args.end).collect();
    tracing::info!(
        "Dataset: {} (split {}), items {:02}..={:02}",
        args.root.display(),
        args.split,
        args.start,
        args.end
    );

    if !args.no_write {
        let dir = dataset.ensure_output_dir()?;
        tracing::info!("Writing segmentations to {}", dir.display());
    }
    let sink: Option<&dyn vesselseg::SegmentationSink> = if args.no_write {
        None
    } else {
        Some(&dataset)
    };
    let options = BatchOptions {
        parallel: !args.sequential,
    };

    let report = segmenter.run_batch(&dataset, sink, &ids, options)?;

    for item in report.reports() {
        println!(
            "{:02}: accuracy {:.4}  sensitivity {:.4}  specificity {:.4}  dice {:.4}{}",
            item.id,
            item.scores.accuracy,
            item.scores.sensitivity,
            item.scores.specificity,
            item.scores.dice,
            if item.degenerate { "  (degenerate)" } else { "" }
        );
    }
    for failure in report.failures() {
        println!("{:02}: skipped: {}", failure.id, failure.message);
    }

    match &report.summary {
        BatchSummary::NoData { attempted } => {
            println!("No items processed ({attempted} attempted)");
        }
        BatchSummary::Aggregate {
            processed,
            failed,
            mean,
        } => {
            println!("Mean over {processed} items ({failed} skipped):");
            print_mean(mean);
        }
    }

    if let Some(path) = &args.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!("Report written to {}", path.display());
    }

    Ok(())
}

// ── segment ────────────────────────────────────────────────────────────

fn run_segment(args: &CliSegmentArgs) -> CliResult<()> {
    let config = args.config.to_config()?;
    let fov_threshold = config.fov_threshold;
    let segmenter = Segmenter::new(config)?;

    tracing::info!("Loading image: {}", args.image.display());
    let open = |path: &PathBuf| {
        image::open(path).map_err(|e| -> CliError {
            format!("Failed to open image {}: {}", path.display(), e).into()
        })
    };
    let image = open(&args.image)?.to_rgb8();
    let fov = BinaryMask::from_gray_threshold(&open(&args.fov)?.to_luma8(), fov_threshold);
    tracing::info!("Image size: {}x{}", image.width(), image.height());

    let seg = match &args.ground_truth {
        Some(path) => {
            let truth = BinaryMask::from_gray_threshold(&open(path)?.to_luma8(), 0);
            let (seg, counts) = segmenter.evaluate(&image, &fov, &truth)?;
            let s = counts.scores();
            println!(
                "accuracy {:.4}  sensitivity {:.4}  specificity {:.4}  dice {:.4}",
                s.accuracy, s.sensitivity, s.specificity, s.dice
            );
            seg
        }
        None => segmenter.segment(&image, &fov)?,
    };
    tracing::info!(
        "Threshold {:.4}, {} vessel pixels",
        seg.threshold,
        seg.mask.count_true()
    );

    seg.mask
        .to_gray_image()
        .save_with_format(&args.out, image::ImageFormat::Png)?;
    tracing::info!("Segmentation written to {}", args.out.display());
    Ok(())
}
