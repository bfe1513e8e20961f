//! Command-line front end
//!
//! `datagen` writes the example mod's data pack, `place` plans and
//! materializes houses into a demo world and checks that the saved pieces
//! reproduce it, `biomes` shows what the biome modifications change.

use clap::{Parser, Subcommand};
use glam::IVec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::sync::Arc;

use minegen::biome::BiomeModifications;
use minegen::constants::{CHUNK_SIZE, DEFAULT_SETTINGS_FILE};
use minegen::content::{self, MY_HOUSE, PlacedFeatureProvider, StructureTemplateProvider};
use minegen::core::{CellState, Identifier};
use minegen::datagen::{DataGenerator, DataOutput, ExportOptions, FsWriter};
use minegen::error::Error;
use minegen::save::{SavedPieces, load_pieces, save_pieces};
use minegen::utils::settings::{GeneratorSettings, WorldSettings, load_settings, save_settings};
use minegen::world::structures::{StructureContext, StructureRegistries, TemplateManager};
use minegen::world::{GridSpace, SurfaceGenerator, TerrainPalette};

/// Content generation toolkit for the example mod
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file; a missing file means defaults
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every data provider and write the generated pack
    Datagen {
        /// Output root (overrides datagen.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Export workers, 0 for one per CPU
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Place houses into a demo world, save them, and verify a reload
    Place {
        #[arg(long)]
        seed: Option<u32>,
        /// Chunks around the origin to plan in
        #[arg(long)]
        radius: Option<i32>,
    },
    /// Apply the biome modifications to a set of demo biomes
    Biomes,
    /// Write the current settings (defaults if none) to the settings file
    InitConfig,
}

pub fn run() -> Result<(), Error> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config)?;

    match args.command {
        Command::Datagen { out, workers } => {
            if let Some(out) = out {
                settings.datagen.output_dir = out;
            }
            if let Some(workers) = workers {
                settings.datagen.worker_count = workers;
            }
            run_datagen(&settings)
        }
        Command::Place { seed, radius } => {
            if let Some(seed) = seed {
                settings.world.seed = seed;
            }
            if let Some(radius) = radius {
                settings.world.chunk_radius = radius;
            }
            run_place(&settings.world)
        }
        Command::Biomes => run_biomes(),
        Command::InitConfig => {
            save_settings(&args.config, &settings)?;
            tracing::info!("Settings written to {}", args.config.display());
            Ok(())
        }
    }
}

fn run_datagen(settings: &GeneratorSettings) -> Result<(), Error> {
    let output = DataOutput::new(&settings.datagen.output_dir);
    let options = ExportOptions {
        worker_count: settings.datagen.workers(),
    };
    let mut generator =
        DataGenerator::new(output, options).enforce_unique_identifiers(settings.datagen.enforce_unique_identifiers);
    generator
        .add_provider(PlacedFeatureProvider::new()?)
        .add_provider(StructureTemplateProvider::new()?);

    let runtime = tokio::runtime::Runtime::new()?;
    let writer = Arc::new(FsWriter::new());
    let report = runtime.block_on(generator.run(writer.clone()));
    tracing::info!(
        "Data generation finished: {} written, {} unchanged, into {}",
        writer.written(),
        writer.unchanged(),
        generator.output().root().display()
    );

    match report.outcomes.into_iter().find_map(|(_, outcome)| outcome.err()) {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn demo_space(world: &WorldSettings, min_xz: IVec2, max_xz: IVec2) -> Result<GridSpace, Error> {
    let chest = CellState::of(Identifier::with_default_namespace("chest")?);
    let palette = TerrainPalette::overworld()?;
    let water = palette.water.clone();
    let mut space = GridSpace::new(min_xz, max_xz).with_container(chest).with_fluid(water);
    SurfaceGenerator::new(world.seed, palette).fill(&mut space, min_xz, max_xz)?;
    Ok(space)
}

fn run_place(world: &WorldSettings) -> Result<(), Error> {
    let templates = match &world.templates_dir {
        Some(dir) => TemplateManager::new(dir),
        None => TemplateManager::in_memory(),
    };
    let mut registries = StructureRegistries::new();
    content::register_structures(&mut registries, &templates)?;
    registries.freeze();
    let house = content::id(MY_HOUSE)?;
    let markers = content::marker_handlers::<GridSpace>()?;

    let radius = world.chunk_radius.max(0);
    let chunks: Vec<IVec2> = (-radius..=radius)
        .flat_map(|x| (-radius..=radius).map(move |z| IVec2::new(x, z)))
        .collect();
    // One chunk of margin so rotated houses stay inside the space.
    let min_xz = IVec2::splat((-radius - 1) * CHUNK_SIZE);
    let max_xz = IVec2::splat((radius + 2) * CHUNK_SIZE);

    let mut space = demo_space(world, min_xz, max_xz)?;
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(world.seed));
    let mut records = Vec::new();
    let mut placed = 0;
    for chunk in chunks {
        let ctx = StructureContext {
            chunk,
            templates: &templates,
        };
        let mut start = registries.start(&house, &ctx, &mut rng)?;
        let report = start.place(&mut space, &markers, &mut rng);
        placed += report.placed;
        records.extend(start.records());
    }
    tracing::info!("Placed {} of {} houses", placed, records.len());

    save_pieces(
        &world.piece_file,
        &SavedPieces {
            seed: world.seed,
            pieces: records,
        },
    )?;

    let saved = load_pieces(&world.piece_file)?;
    let mut replay = demo_space(world, min_xz, max_xz)?;
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(saved.seed));
    for record in &saved.pieces {
        let mut piece = registries.load_piece(&templates, record)?;
        if let Err(e) = piece.generate(&mut replay, &markers, &mut rng) {
            tracing::warn!("Reloaded piece {} failed: {}", piece.template_id(), e);
        }
    }

    let expected = space.snapshot();
    let actual = replay.snapshot();
    if expected != actual {
        return Err(Error::ReplayMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    tracing::info!(
        "Reloaded {} pieces from {} and reproduced all {} cells",
        saved.pieces.len(),
        world.piece_file.display(),
        actual.len()
    );
    Ok(())
}

fn run_biomes() -> Result<(), Error> {
    let mut engine = BiomeModifications::new();
    content::register_modifications(&mut engine)?;
    let mut biomes = content::demo_biomes()?;
    let applied = engine.apply(&mut biomes);
    tracing::info!("Applied {} modifications to {} biomes", applied, biomes.len());

    for biome in &biomes {
        println!("{} ({})", biome.selection.key, biome.selection.dimension);
        for (step, features) in biome.settings.steps() {
            let names: Vec<String> = features.iter().map(ToString::to_string).collect();
            println!("  {:?}: {}", step, names.join(", "));
        }
    }
    Ok(())
}
