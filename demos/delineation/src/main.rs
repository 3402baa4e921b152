use std::path::{Path, PathBuf};
use std::time::Instant;

use argh::FromArgs;
use rayon::prelude::*;

use ift::image::Image;
use ift::imgproc::delineation::{delineate, DelineationConfig, PropagationMethod};

#[derive(FromArgs, Debug)]
/// Delineate the salient objects of a set of images.
struct Args {
    /// directory with the saliency maps, named `<name>_layer<L>.png`
    #[argh(option, short = 's')]
    saliency_dir: PathBuf,

    /// directory with the original images, named `<name>.png`
    #[argh(option, short = 'i')]
    images_dir: PathBuf,

    /// layer of the saliency maps to use
    #[argh(option, short = 'l')]
    layer: u32,

    /// directory the label images are written to
    #[argh(option, short = 'o')]
    output_dir: PathBuf,

    /// propagation method: `watershed` or `dynamic-trees`
    #[argh(option, short = 'm', from_str_fn(parse_method))]
    method: Option<PropagationMethod>,

    /// json file with the pipeline parameters
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,
}

fn parse_method(value: &str) -> Result<PropagationMethod, String> {
    match value {
        "watershed" => Ok(PropagationMethod::Watershed),
        "dynamic-trees" => Ok(PropagationMethod::DynamicTrees),
        _ => Err(format!(
            "unknown method `{value}`, expected `watershed` or `dynamic-trees`"
        )),
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default, PartialEq)]
struct Summary {
    written: usize,
    with_objects: usize,
    failed: usize,
}

impl Summary {
    fn failure() -> Self {
        Self {
            failed: 1,
            ..Default::default()
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            written: self.written + other.written,
            with_objects: self.with_objects + other.with_objects,
            failed: self.failed + other.failed,
        }
    }
}

fn load_config(args: &Args) -> Result<DelineationConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => DelineationConfig::default(),
    };
    if let Some(method) = args.method {
        config.method = method;
    }
    Ok(config)
}

// saliency maps ending in `suffix`, sorted by name, with the name stripped of it
fn scan_saliency_maps(dir: &Path, suffix: &str) -> Vec<(String, PathBuf)> {
    let mut maps = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.strip_suffix(suffix)?.to_string();
            Some((name, entry.path().to_path_buf()))
        })
        .collect::<Vec<_>>();
    maps.sort();
    maps
}

fn read_rgb(path: &Path) -> Result<Image<f32, 3>, Box<dyn std::error::Error>> {
    let rgb = image::open(path)?.to_rgb8();
    let size = [rgb.width() as usize, rgb.height() as usize].into();
    Ok(Image::new(size, rgb.into_raw().into_iter().map(f32::from).collect())?)
}

fn read_gray(path: &Path) -> Result<Image<u8, 1>, Box<dyn std::error::Error>> {
    let gray = image::open(path)?.to_luma8();
    let size = [gray.width() as usize, gray.height() as usize].into();
    Ok(Image::new(size, gray.into_raw())?)
}

fn write_label(path: &Path, label: &Image<u32, 1>) -> Result<(), Box<dyn std::error::Error>> {
    let data = label.map(|&l| if l > 0 { u8::MAX } else { 0 }).into_vec();
    let gray = image::GrayImage::from_raw(label.width() as u32, label.height() as u32, data)
        .ok_or("label buffer does not match its size")?;
    gray.save(path)?;
    Ok(())
}

// reads, delineates and writes a single image; its buffers are dropped on return
fn process(name: &str, saliency_path: &Path, args: &Args, config: &DelineationConfig) -> Summary {
    let image_path = args.images_dir.join(format!("{name}.png"));
    let (image, saliency) = match (read_rgb(&image_path), read_gray(saliency_path)) {
        (Ok(image), Ok(saliency)) => (image, saliency),
        (Err(e), _) | (_, Err(e)) => {
            log::warn!("skipping {name}: {e}");
            return Summary::failure();
        }
    };

    let label = match delineate(&image, &saliency, config) {
        Ok(label) => label,
        Err(e) => {
            log::warn!("failed to delineate {name}: {e}");
            return Summary::failure();
        }
    };

    let path = args.output_dir.join(format!("{name}_label.png"));
    if let Err(e) = write_label(&path, &label) {
        log::warn!("failed to write {}: {e}", path.display());
        return Summary::failure();
    }

    Summary {
        written: 1,
        with_objects: usize::from(label.as_slice().iter().any(|&l| l > 0)),
        failed: 0,
    }
}

fn run(args: &Args) -> Result<Summary, Box<dyn std::error::Error>> {
    let config = load_config(args)?;
    std::fs::create_dir_all(&args.output_dir)?;

    let suffix = format!("_layer{}.png", args.layer);
    let maps = scan_saliency_maps(&args.saliency_dir, &suffix);
    log::info!(
        "found {} saliency maps in {}",
        maps.len(),
        args.saliency_dir.display()
    );

    let summary = maps
        .par_iter()
        .map(|(name, saliency_path)| process(name, saliency_path, args, &config))
        .reduce(Summary::default, Summary::merge);

    Ok(summary)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Args = argh::from_env();

    let start = Instant::now();
    let summary = run(&args)?;

    println!(
        "Done: {} label images written ({} with objects), {} failed in {:.2?}",
        summary.written,
        summary.with_objects,
        summary.failed,
        start.elapsed()
    );

    Ok(())
}
