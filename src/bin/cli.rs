//! CLI application for cascade object detection.
//!
//! Usage:
//!   cascade-detect <image> --classifier face=face.json          # Human-readable output
//!   cascade-detect <image> --classifier face=face.json --json   # JSON output
//!   cascade-detect <image> --config detect.json -o found.json   # Save to file

use cascade_detect::{load_config, ClassifierRegistry, DetectorConfig, ObjectTracker};
use clap::Parser;
use log::{debug, info};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cascade-detect")]
#[command(author, version, about = "Boosted cascade object detection", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Classifier to run, as NAME=PATH (repeatable)
    #[arg(short, long = "classifier", value_name = "NAME=PATH")]
    classifiers: Vec<String>,

    /// JSON config with classifiers and scan settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scale applied before the first scan level
    #[arg(long)]
    initial_scale: Option<f64>,

    /// Growth factor between scan levels
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Window step, in units of the current scale
    #[arg(long)]
    step_size: Option<f64>,

    /// Minimum edge density; 0 disables the edge filter
    #[arg(long)]
    edges_density: Option<f64>,

    /// Overlap threshold for merging windows
    #[arg(long)]
    overlap: Option<f64>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    image: String,
    width: u32,
    height: u32,
    objects_detected: usize,
    classifiers: Vec<ClassifierOutput>,
}

#[derive(Serialize)]
struct ClassifierOutput {
    name: String,
    objects: Vec<ObjectOutput>,
}

#[derive(Serialize)]
struct ObjectOutput {
    /// Object index within its classifier (1-based)
    index: usize,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    /// Raw windows merged into this object
    windows: usize,
    area_percent: f32,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            load_config(path)?
        }
        None => DetectorConfig::default(),
    };

    let mut registry = config.build_registry()?;
    for entry in &args.classifiers {
        let (name, path) = entry
            .split_once('=')
            .ok_or_else(|| format!("Invalid classifier {:?}, expected NAME=PATH", entry))?;
        info!("Loading classifier {} from {}", name, path);
        registry.load(name, path)?;
    }
    if registry.is_empty() {
        return Err("No classifiers given; use --classifier or --config".into());
    }

    let tracker = build_tracker(args, &config, &registry)?;

    info!("Loading image {:?}", args.image);
    let img = image::open(&args.image)?.to_rgba8();
    let (width, height) = img.dimensions();
    let image_area = (width as f32) * (height as f32);

    let per_classifier = tracker.track_by_classifier(img.as_raw(), width, height)?;

    let mut classifiers = Vec::new();
    let mut objects_detected = 0;
    for (name, detections) in per_classifier {
        debug!("{}: {} object(s)", name, detections.len());
        objects_detected += detections.len();
        let objects = detections
            .iter()
            .enumerate()
            .map(|(i, d)| ObjectOutput {
                index: i + 1,
                x: d.x,
                y: d.y,
                width: d.width,
                height: d.height,
                windows: d.total,
                area_percent: (d.width as f32) * (d.height as f32) / image_area * 100.0,
            })
            .collect();
        classifiers.push(ClassifierOutput { name, objects });
    }

    let output = Output {
        image: args.image.display().to_string(),
        width,
        height,
        objects_detected,
        classifiers,
    };

    // Generate output
    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    // Write output
    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        info!("Output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

/// Command-line scan settings override the config file's.
fn build_tracker(
    args: &Args,
    config: &DetectorConfig,
    registry: &ClassifierRegistry,
) -> Result<ObjectTracker, Box<dyn std::error::Error>> {
    let mut params = config.scan;
    if let Some(v) = args.initial_scale {
        params.initial_scale = v;
    }
    if let Some(v) = args.scale_factor {
        params.scale_factor = v;
    }
    if let Some(v) = args.step_size {
        params.step_size = v;
    }
    if let Some(v) = args.edges_density {
        params.edges_density = v;
    }

    let names: Vec<&str> = registry.names().collect();
    let tracker = ObjectTracker::from_registry(registry, &names)?
        .params(params)
        .overlap(args.overlap.unwrap_or(config.overlap));
    Ok(tracker)
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    s.push_str(&format!("Objects detected: {}\n", output.objects_detected));

    for classifier in &output.classifiers {
        s.push_str(&format!("\n--- {} ({}) ---\n", classifier.name, classifier.objects.len()));
        if classifier.objects.is_empty() {
            s.push_str("  No objects found.\n");
            continue;
        }
        for object in &classifier.objects {
            s.push_str(&format!(
                "  #{}: {}x{} at ({}, {}), {} window(s), {:.1}% of image\n",
                object.index,
                object.width,
                object.height,
                object.x,
                object.y,
                object.windows,
                object.area_percent
            ));
        }
    }

    s
}
