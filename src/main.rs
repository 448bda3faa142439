use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use rast2poly::{build_region, load_oracle, quality, BuildConfig, PlaneGrid, RegionKind};

#[derive(Parser)]
#[command(
    name = "rast2poly",
    about = "Conservative rectilinear polygon bounds for classified rasters"
)]
struct Cli {
    /// Input classification image (white=exterior, black=interior, gray=unknown)
    #[arg(short, long, default_value = "_in.png")]
    input: PathBuf,

    /// Plane range as lo,hi (symmetric integer bounds)
    #[arg(long, default_value = "-2,2", value_parser = parse_range, allow_hyphen_values = true)]
    range: (i32, i32),

    /// Kernel tile edge length (values below 3 are clamped to 3)
    #[arg(long, default_value = "5")]
    granularity: i32,

    /// Discard polygons with this many vertices or fewer
    #[arg(long, default_value = "24")]
    min_vertices: usize,

    /// Directory polygon files and snapshots live in
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Construct interior polygons from the classification
    MakeInt,
    /// Construct exterior polygons from the classification
    MakeExt,
    /// Certify the persisted polygon set against the classification
    Quality,
    /// Answer membership queries against the persisted polygon set
    Oracle {
        /// A single query point as x,y
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        point: Option<(f64, f64)>,

        /// A file of x,y lines; lines that are not a point are skipped
        #[arg(long)]
        points: Option<PathBuf>,
    },
}

fn parse_range(s: &str) -> Result<(i32, i32), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected lo,hi, got {s:?}"))?;
    let lo = lo.trim().parse().map_err(|e| format!("bad low bound: {e}"))?;
    let hi = hi.trim().parse().map_err(|e| format!("bad high bound: {e}"))?;
    if lo >= hi {
        return Err(format!("empty range {lo},{hi}"));
    }
    Ok((lo, hi))
}

fn parse_point(s: &str) -> Result<(f64, f64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got {s:?}"))?;
    let x = x.trim().parse().map_err(|e| format!("bad x: {e}"))?;
    let y = y.trim().parse().map_err(|e| format!("bad y: {e}"))?;
    Ok((x, y))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let config = BuildConfig {
        range_low: cli.range.0,
        range_high: cli.range.1,
        granularity: cli.granularity,
        min_vertices: cli.min_vertices,
        out_dir: cli.out_dir.clone(),
    };

    match cli.command {
        Command::MakeInt => {
            let raster = rast2poly::bitmap::load_classified(&cli.input)?;
            build_region(&raster, RegionKind::Interior, &config)?;
        }
        Command::MakeExt => {
            let raster = rast2poly::bitmap::load_classified(&cli.input)?;
            build_region(&raster, RegionKind::Exterior, &config)?;
        }
        Command::Quality => {
            let raster = rast2poly::bitmap::load_classified(&cli.input)?;
            let grid = PlaneGrid::new(config.range_low, config.range_high, raster.width() as i32);
            let report = quality::certify(&raster, &grid, &config.out_dir)?;
            match &report.failure {
                None => println!(
                    "VALID: all {} interior and {} exterior polygons passed",
                    report.interior_count, report.exterior_count
                ),
                Some(failure) => {
                    println!("FAILURE: polygon set not usable: {}", failure.detail);
                    std::process::exit(1);
                }
            }
        }
        Command::Oracle { point, points } => {
            let oracle = load_oracle(&config)?;
            if let Some((x, y)) = point {
                println!("point ({x},{y}) {}", oracle.classify(x, y)?);
            }
            if let Some(path) = &points {
                for line in BufReader::new(File::open(path)?).lines() {
                    let line = line?;
                    let Ok((x, y)) = parse_point(&line) else {
                        continue;
                    };
                    println!("point ({x},{y}) {}", oracle.classify(x, y)?);
                }
            }
        }
    }

    Ok(())
}
