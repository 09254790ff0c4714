use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pieceworks::config::EngineConfig;
use pieceworks::cutter::cut_with_settings;
use pieceworks::engine::{Engine, EngineHooks};
use pieceworks::renderer::{pixmap_to_rgba, PixmapSurface};
use pieceworks::source::open_image;
use pieceworks_core::codec::{decode, encode, from_json, to_json_pretty};
use pieceworks_core::grid::{build_grid_choices, grid_choice_label, DEFAULT_TARGET_COUNT};
use pieceworks_core::SavedPuzzle;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pieceworks-cli", version, about = "Cut and render jigsaw puzzles")]
struct Cli {
    /// TOML engine settings.
    #[arg(long, global = true, env = "PIECEWORKS_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List grid choices for an image size.
    Grids {
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Cut an image and write one PNG per piece plus a manifest.
    Cut {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TARGET_COUNT)]
        pieces: u32,
        #[arg(long)]
        seed: Option<u32>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Render a scattered or saved board to a PNG.
    Render {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value_t = DEFAULT_TARGET_COUNT)]
        pieces: u32,
        #[arg(long)]
        seed: Option<u32>,
        /// Saved state, JSON or binary (`.bin`).
        #[arg(long)]
        save: Option<PathBuf>,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 800)]
        height: u32,
        #[arg(long)]
        reference: bool,
        #[arg(long)]
        out: PathBuf,
    },
    /// Convert a saved state between JSON and binary.
    Convert {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct Manifest {
    seed: u32,
    cols: usize,
    rows: usize,
    image_width: u32,
    image_height: u32,
    cell_width: f32,
    cell_height: f32,
    padding: f32,
    pieces: Vec<ManifestPiece>,
}

#[derive(Serialize)]
struct ManifestPiece {
    id: usize,
    row: u32,
    col: u32,
    file: String,
    correct: (f32, f32),
    start: (f32, f32),
    outline: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Grids { width, height } => {
            for choice in build_grid_choices(width, height) {
                println!("{:>5}  {}", choice.target_count, grid_choice_label(&choice));
            }
        }
        Commands::Cut {
            image,
            pieces,
            seed,
            out,
        } => {
            let rgba = open_image(&image, config.image_max_dimension)?;
            let puzzle = cut_with_settings(&rgba, pieces, seed, &config.shape)?;
            fs::create_dir_all(&out)?;
            let mut manifest = Manifest {
                seed: puzzle.seed,
                cols: puzzle.cols(),
                rows: puzzle.rows(),
                image_width: puzzle.image_width,
                image_height: puzzle.image_height,
                cell_width: puzzle.cell_width,
                cell_height: puzzle.cell_height,
                padding: puzzle.padding,
                pieces: Vec::with_capacity(puzzle.pieces.len()),
            };
            for piece in &puzzle.pieces {
                let file = format!("piece_{:04}.png", piece.id);
                pixmap_to_rgba(piece.bitmap.pixmap()).save(out.join(&file))?;
                manifest.pieces.push(ManifestPiece {
                    id: piece.id,
                    row: piece.row,
                    col: piece.col,
                    file,
                    correct: piece.correct,
                    start: piece.current,
                    outline: piece.outline().to_svg(),
                });
            }
            fs::write(out.join("manifest.json"), to_json_pretty(&manifest)?)?;
            info!(
                pieces = manifest.pieces.len(),
                seed = manifest.seed,
                out = %out.display(),
                "cut written"
            );
        }
        Commands::Render {
            image,
            pieces,
            seed,
            save,
            width,
            height,
            reference,
            out,
        } => {
            let rgba = open_image(&image, config.image_max_dimension)?;
            let mut engine = Engine::new(
                config,
                (width as f32, height as f32),
                EngineHooks::empty(),
            );
            match save {
                Some(path) => {
                    let saved = read_saved(&path)?;
                    engine.load_saved(&rgba, &saved)?;
                }
                None => engine.cut_and_load(&rgba, pieces, seed)?,
            }
            if reference {
                engine.toggle_reference();
            }
            let mut surface =
                PixmapSurface::new(width, height).ok_or("render size must be non-zero")?;
            engine.render(&mut surface);
            surface.to_rgba_image().save(&out)?;
            info!(
                placed = engine.placed_count(),
                total = engine.pieces().len(),
                out = %out.display(),
                "frame rendered"
            );
        }
        Commands::Convert { input, out } => {
            let saved = read_saved(&input)?;
            if is_binary(&out) {
                fs::write(&out, encode(&saved)?)?;
            } else {
                fs::write(&out, to_json_pretty(&saved)?)?;
            }
            info!(pieces = saved.pieces.len(), out = %out.display(), "save converted");
        }
    }

    Ok(())
}

fn is_binary(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "bin")
}

fn read_saved(path: &Path) -> Result<SavedPuzzle, Box<dyn std::error::Error>> {
    if is_binary(path) {
        let bytes = fs::read(path)?;
        Ok(decode(&bytes)?)
    } else {
        let text = fs::read_to_string(path)?;
        Ok(from_json(&text)?)
    }
}
