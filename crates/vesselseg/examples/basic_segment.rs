use image::ImageReader;
use vesselseg::{BinaryMask, SegmentConfig, Segmenter};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <fundus.tif> <fov_mask.gif> <out.png>", args[0]);
        std::process::exit(2);
    }

    let config = SegmentConfig::default();
    let image = ImageReader::open(&args[1])?.decode()?.to_rgb8();
    let fov_raster = ImageReader::open(&args[2])?.decode()?.to_luma8();
    let fov = BinaryMask::from_gray_threshold(&fov_raster, config.fov_threshold);

    let segmenter = Segmenter::new(config)?;
    let seg = segmenter.segment(&image, &fov)?;
    println!(
        "Otsu threshold {:.4}, {} vessel pixels.",
        seg.threshold,
        seg.mask.count_true()
    );

    seg.mask.to_gray_image().save(&args[3])?;
    println!("Wrote {}", args[3]);
    Ok(())
}
