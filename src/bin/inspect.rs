use cascade_detect::Cascade;
use clap::Parser;
use std::path::PathBuf;

/// Print the structure of a classifier file.
#[derive(Parser, Debug)]
#[command(name = "inspect-classifier", version)]
struct Args {
    /// Classifier file (.json, bincode, optionally .bz2)
    classifier: PathBuf,

    /// List node counts for every stage
    #[arg(short, long)]
    stages: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!("Loading classifier: {}", args.classifier.display());
    let cascade = match Cascade::load(&args.classifier) {
        Ok(cascade) => cascade,
        Err(e) => {
            eprintln!("FAILED: {}", e);
            std::process::exit(1);
        }
    };

    println!("  window:       {}x{}", cascade.min_width(), cascade.min_height());
    println!("  stages:       {}", cascade.num_stages());
    println!("  nodes:        {}", cascade.num_nodes());
    println!("  tilted nodes: {}", cascade.num_tilted_nodes());
    println!("  rects:        {}", cascade.num_rects());
    println!("  flat length:  {}", cascade.to_flat().len());

    if args.stages {
        println!();
        for (i, stage) in cascade.stages().iter().enumerate() {
            let tilted = stage.nodes.iter().filter(|n| n.tilted).count();
            println!(
                "  stage[{:3}] threshold {:>10.4}  nodes {:4}  tilted {:4}",
                i,
                stage.threshold,
                stage.nodes.len(),
                tilted
            );
        }
    }
}
