//! hydromon CLI - water levels of reservoirs from satellite image stacks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use hydromon_algorithms::imagery::SpectralIndex;
use hydromon_algorithms::morphology::{dilate, StructuringElement};
use hydromon_algorithms::pipeline::{WaterMonitor, WaterMonitorConfig, WaterReport};
use hydromon_algorithms::temporal::{composite, CompositeMethod, CompositeParams};
use hydromon_algorithms::vector::{polygonize, rasterize_layer, GridSpec, PolygonizeMode};
use hydromon_core::crs::ensure_compatible;
use hydromon_core::io::{
    load_stack, read_geojson, read_geotiff, read_mask, write_geotiff, write_mask, GeoTiffOptions,
};
use hydromon_core::{FrameStack, Mask, Raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hydromon")]
#[command(author, version, about = "Water-level monitoring from satellite image stacks", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Compute a normalized difference index from two bands
    Index {
        /// First band (green for NDWI)
        a: PathBuf,
        /// Second band (NIR for NDWI)
        b: PathBuf,
        /// Output file
        output: PathBuf,
        /// Index name: ndwi, ndvi, mndwi
        #[arg(long, default_value = "ndwi")]
        index: String,
    },
    /// Burn GeoJSON polygons onto the grid of a template raster
    Rasterize {
        /// GeoJSON with polygons or closed ways
        geojson: PathBuf,
        /// Raster whose grid the mask follows
        like: PathBuf,
        /// Output mask (0/1)
        output: PathBuf,
        /// Grow the mask by N pixels
        #[arg(long, default_value = "0")]
        dilate: usize,
        /// Replace polygonized ways by their convex hull
        #[arg(long)]
        hull: bool,
    },
    /// Extract water levels over a frame stack
    Water {
        /// Stack manifest (JSON)
        manifest: PathBuf,
        /// Nominal water extent: GeoJSON polygons or a mask GeoTIFF
        nominal: PathBuf,
        /// Pipeline configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Coverage threshold, overrides the configuration
        #[arg(long)]
        threshold: Option<f64>,
        /// Grow the nominal extent by N pixels, overrides the configuration
        #[arg(long)]
        dilate: Option<usize>,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format: json, csv
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Per-pixel composite of a band over the frames of a stack
    Composite {
        /// Stack manifest (JSON)
        manifest: PathBuf,
        /// Band name
        band: String,
        /// Output file
        output: PathBuf,
        /// Reduction: median, mean, max
        #[arg(long, default_value = "median")]
        method: String,
        /// Only use pixels valid under this per-frame mask
        #[arg(long)]
        valid_mask: Option<String>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn read_band(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...")?;
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_stack(path: &Path) -> Result<FrameStack> {
    let pb = spinner("Loading frame stack...")?;
    let stack = load_stack(path)
        .with_context(|| format!("Failed to load stack manifest {}", path.display()))?;
    pb.finish_and_clear();
    Ok(stack)
}

fn write_result(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn is_geojson(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("json" | "geojson")
    )
}

/// Rasterize a GeoJSON extent onto `grid`, polygonizing bare ways
fn extent_from_geojson(path: &Path, grid: &GridSpec, hull: bool) -> Result<Mask> {
    let mut layer = read_geojson(path)
        .with_context(|| format!("Failed to read GeoJSON {}", path.display()))?;
    if !layer.lines.is_empty() {
        let mode = if hull {
            PolygonizeMode::ConvexHull
        } else {
            PolygonizeMode::Exact
        };
        let polygons = polygonize(&layer.lines, mode);
        info!("Polygonized {} ways into {} polygons", layer.lines.len(), polygons.len());
        layer.polygons.extend(polygons);
    }
    if layer.polygons.is_empty() {
        anyhow::bail!("{} holds no polygons or closed ways", path.display());
    }
    rasterize_layer(&layer, grid).context("Failed to rasterize extent")
}

fn grow(mask: Mask, pixels: usize) -> Result<Mask> {
    if pixels == 0 {
        return Ok(mask);
    }
    dilate(&mask, &StructuringElement::Square(pixels)).context("Failed to dilate mask")
}

fn write_report(report: &WaterReport, format: &str, output: Option<&Path>) -> Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(std::io::stdout().lock()),
    };
    match format.to_ascii_lowercase().as_str() {
        "json" => {
            serde_json::to_writer_pretty(&mut writer, report).context("Failed to write JSON")?;
            writeln!(writer)?;
        }
        "csv" => report.write_csv(&mut writer).context("Failed to write CSV")?,
        other => anyhow::bail!("Unknown format: {}. Use json or csv.", other),
    }
    writer.flush()?;
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_band(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.transform().cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Index ────────────────────────────────────────────────────
        Commands::Index {
            a,
            b,
            output,
            index,
        } => {
            let index: SpectralIndex = index.parse().context("Invalid index")?;
            let band_a = read_band(&a)?;
            let band_b = read_band(&b)?;
            let start = Instant::now();
            let result = index
                .compute(&band_a, &band_b)
                .with_context(|| format!("Failed to calculate {}", index))?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done(index.name(), &output, elapsed);
        }

        // ── Rasterize ────────────────────────────────────────────────
        Commands::Rasterize {
            geojson,
            like,
            output,
            dilate,
            hull,
        } => {
            let template = read_band(&like)?;
            let start = Instant::now();
            let mask = extent_from_geojson(&geojson, &GridSpec::of_raster(&template), hull)?;
            let mask = grow(mask, dilate)?;
            let elapsed = start.elapsed();
            info!("Burned {} of {} pixels", mask.count_true(), mask.len());
            write_mask(&mask, &output).context("Failed to write mask")?;
            done("Mask", &output, elapsed);
        }

        // ── Water ────────────────────────────────────────────────────
        Commands::Water {
            manifest,
            nominal,
            config,
            threshold,
            dilate,
            output,
            format,
        } => {
            let mut config = match config {
                Some(path) => WaterMonitorConfig::from_path(&path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?,
                None => WaterMonitorConfig::default(),
            };
            if let Some(t) = threshold {
                config.coverage_threshold = t;
            }
            if let Some(d) = dilate {
                config.extent_dilation = d;
            }
            let monitor = WaterMonitor::new(config).context("Invalid configuration")?;

            let mut stack = read_stack(&manifest)?;
            let extent = if is_geojson(&nominal) {
                extent_from_geojson(&nominal, &GridSpec::of_stack(&stack), false)?
            } else {
                read_mask(&nominal)
                    .with_context(|| format!("Failed to read mask {}", nominal.display()))?
            };
            ensure_compatible(stack.crs(), extent.crs())
                .context("Nominal extent is not in the stack CRS")?;
            stack
                .insert_timeless_mask(monitor.config().nominal_mask.clone(), extent)
                .context("Nominal extent does not match the stack grid")?;

            let start = Instant::now();
            let report = monitor.run(&mut stack).context("Water monitoring failed")?;
            info!(
                "{} frames kept, {} dropped in {:.2?}",
                report.len(),
                report.dropped,
                start.elapsed()
            );
            write_report(&report, &format, output.as_deref())?;
        }

        // ── Composite ────────────────────────────────────────────────
        Commands::Composite {
            manifest,
            band,
            output,
            method,
            valid_mask,
        } => {
            let method: CompositeMethod = method.parse().context("Invalid method")?;
            let stack = read_stack(&manifest)?;
            let start = Instant::now();
            let result = composite(&stack, &band, &CompositeParams { method, valid_mask })
                .with_context(|| format!("Failed to composite band {}", band))?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("Composite", &output, elapsed);
        }
    }

    Ok(())
}
