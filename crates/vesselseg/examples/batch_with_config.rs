use std::error::Error;
use std::path::Path;
use vesselseg::{BatchOptions, BatchSummary, Dataset, DatasetLayout, SegmentConfig, Segmenter};

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <drive_root> [config.json]", args[0]);
        std::process::exit(2);
    }

    let mut config = match args.get(2) {
        Some(path) => SegmentConfig::from_json_file(Path::new(path))?,
        None => SegmentConfig::default(),
    };
    // Finer scale sampling for thin capillaries.
    config.vesselness.sigma_step = 1.0;
    config.cleanup.min_component_size = 50;

    let segmenter = Segmenter::new(config)?;
    let dataset = Dataset::new(DatasetLayout::training(&args[1]));
    let ids: Vec<u32> = (21..=40).collect();
    let report = segmenter.run_batch(&dataset, None, &ids, BatchOptions::default())?;

    match report.summary {
        BatchSummary::Aggregate { processed, mean, .. } => {
            println!("{processed} items, mean Dice {:.4}", mean.dice);
        }
        BatchSummary::NoData { attempted } => println!("No items processed ({attempted} attempted)"),
    }
    Ok(())
}
