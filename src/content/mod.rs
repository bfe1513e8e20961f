//! The example mod: its features, biome modifications, and house structure.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::biome::selection::{found_in, tag};
use crate::biome::{BiomeContext, BiomeModifications, BiomeSelection, GenerationStep, ModificationPhase, ModificationSet};
use crate::core::{Identifier, IdentifierError, Registry};
use crate::datagen::{
    Codec, CodecProvider, DataOutput, Entries, EntriesError, JsonCodec, OutputType, PathResolver,
};
use crate::error::Error;
use crate::world::structures::{
    HouseStructure, MarkerHandlers, StructureRegistries, TemplateFile, TemplateManager, container_loot, house_layout,
    house_template,
};
use crate::world::structures::house::CHEST_MARKER;
use crate::world::TargetSpace;

pub const MOD_ID: &str = "modid";

pub const MY_ORE: &str = "my_ore";
pub const MY_LAKE: &str = "my_lake";
pub const MY_TREE: &str = "my_tree";
pub const MY_TREE_PATCH: &str = "my_tree_patch";
pub const MY_HOUSE: &str = "my_house";
pub const MY_HOUSE_PIECE: &str = "my_house_piece";
pub const HOUSE_LOOT_TABLE: &str = "chests/igloo_chest";

pub fn id(path: &str) -> Result<Identifier, IdentifierError> {
    Identifier::new(MOD_ID, path)
}

fn vanilla(path: &str) -> Result<Identifier, IdentifierError> {
    Identifier::with_default_namespace(path)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacementModifier {
    Count { count: u32 },
    RarityFilter { chance: u32 },
    InSquare,
    HeightRange { min_inclusive: i32, max_inclusive: i32 },
    Heightmap { heightmap: String },
    Biome,
}

/// A configured feature plus where it may be placed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedFeature {
    pub feature: Identifier,
    pub placement: Vec<PlacementModifier>,
}

pub fn placed_features() -> Result<Registry<PlacedFeature>, Error> {
    let mut registry = Registry::new("placed_feature");
    let surface = || PlacementModifier::Heightmap {
        heightmap: "WORLD_SURFACE_WG".into(),
    };

    registry.register(
        id(MY_ORE)?,
        PlacedFeature {
            feature: id(MY_ORE)?,
            placement: vec![
                PlacementModifier::Count { count: 10 },
                PlacementModifier::InSquare,
                PlacementModifier::HeightRange {
                    min_inclusive: -64,
                    max_inclusive: 64,
                },
                PlacementModifier::Biome,
            ],
        },
    )?;
    registry.register(
        id(MY_LAKE)?,
        PlacedFeature {
            feature: id(MY_LAKE)?,
            placement: vec![
                PlacementModifier::RarityFilter { chance: 20 },
                PlacementModifier::InSquare,
                surface(),
                PlacementModifier::Biome,
            ],
        },
    )?;
    registry.register(
        id(MY_TREE)?,
        PlacedFeature {
            feature: id(MY_TREE)?,
            placement: vec![surface()],
        },
    )?;
    registry.register(
        id(MY_TREE_PATCH)?,
        PlacedFeature {
            feature: id(MY_TREE_PATCH)?,
            placement: vec![
                PlacementModifier::Count { count: 2 },
                PlacementModifier::InSquare,
                surface(),
                PlacementModifier::Biome,
            ],
        },
    )?;
    registry.freeze();
    Ok(registry)
}

/// Ore everywhere in the overworld, lakes in forests, tree patches anywhere
/// but oceans.
pub fn features_modification() -> Result<ModificationSet, IdentifierError> {
    let ore = id(MY_ORE)?;
    let lake = id(MY_LAKE)?;
    let tree_patch = id(MY_TREE_PATCH)?;
    Ok(BiomeModifications::create(id("features")?)
        .add(ModificationPhase::Additions, found_in(vanilla("overworld")?), move |_, settings| {
            settings.add_feature(GenerationStep::UndergroundOres, ore.clone())
        })
        .add(ModificationPhase::Additions, tag(vanilla("is_forest")?), move |_, settings| {
            settings.add_feature(GenerationStep::Lakes, lake.clone())
        })
        .add(
            ModificationPhase::Additions,
            tag(vanilla("is_ocean")?).negate(),
            move |_, settings| settings.add_feature(GenerationStep::VegetalDecoration, tree_patch.clone()),
        )
        .finalize())
}

pub fn register_modifications(engine: &mut BiomeModifications) -> Result<(), Error> {
    engine.register(features_modification()?)?;
    Ok(())
}

/// A handful of vanilla-like biomes for the demo run.
pub fn demo_biomes() -> Result<Vec<BiomeContext>, IdentifierError> {
    let overworld = vanilla("overworld")?;
    let biome = |key: &str, tags: &[&str]| -> Result<BiomeContext, IdentifierError> {
        let mut selection = BiomeSelection::new(vanilla(key)?, overworld.clone());
        for t in tags {
            selection = selection.with_tag(vanilla(t)?);
        }
        Ok(BiomeContext::new(selection))
    };
    let mut biomes = vec![
        biome("plains", &["is_overworld"])?,
        biome("forest", &["is_overworld", "is_forest"])?,
        biome("ocean", &["is_overworld", "is_ocean"])?,
        biome("desert", &["is_overworld"])?,
    ];
    biomes.push(BiomeContext::new(
        BiomeSelection::new(vanilla("nether_wastes")?, vanilla("the_nether")?).with_tag(vanilla("is_nether")?),
    ));
    Ok(biomes)
}

/// Registers the house template, its piece type, and the structure.
pub fn register_structures(registries: &mut StructureRegistries, templates: &TemplateManager) -> Result<(), Error> {
    let layout = Arc::new(house_layout()?);
    templates.register(house_template(id(MY_HOUSE)?)?);
    registries.register_piece_type(id(MY_HOUSE_PIECE)?, HouseStructure::piece_loader(Arc::clone(&layout)))?;
    registries.register_structure(
        id(MY_HOUSE)?,
        Arc::new(HouseStructure {
            piece_type: id(MY_HOUSE_PIECE)?,
            template: id(MY_HOUSE)?,
            layout,
        }),
    )?;
    Ok(())
}

pub fn marker_handlers<S: TargetSpace + 'static>() -> Result<MarkerHandlers<S>, IdentifierError> {
    Ok(MarkerHandlers::new().with(CHEST_MARKER, container_loot::<S>(vanilla(HOUSE_LOOT_TABLE)?)))
}

pub struct PlacedFeatureProvider {
    features: Registry<PlacedFeature>,
}

impl PlacedFeatureProvider {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            features: placed_features()?,
        })
    }
}

impl CodecProvider for PlacedFeatureProvider {
    type Value = PlacedFeature;

    fn name(&self) -> &str {
        "Placed Features"
    }

    fn codec(&self) -> Arc<dyn Codec<PlacedFeature>> {
        Arc::new(JsonCodec::new())
    }

    fn generate(&self, entries: &mut Entries<PlacedFeature>) -> Result<(), EntriesError> {
        let ids: Vec<Identifier> = self.features.iter().map(|(id, _)| id.clone()).collect();
        for id in &ids {
            entries.add_registered(&self.features, id)?;
        }
        Ok(())
    }

    fn path_resolver(&self, output: &DataOutput) -> PathResolver {
        output.resolver(OutputType::DataPack, "worldgen/placed_feature")
    }
}

/// Writes the house template where [`TemplateManager`] looks for it, so a
/// generated data directory can serve as a template root.
pub struct StructureTemplateProvider {
    templates: Vec<(Identifier, TemplateFile)>,
}

impl StructureTemplateProvider {
    pub fn new() -> Result<Self, Error> {
        let house = house_template(id(MY_HOUSE)?)?;
        Ok(Self {
            templates: vec![(house.id().clone(), house.to_file())],
        })
    }
}

impl CodecProvider for StructureTemplateProvider {
    type Value = TemplateFile;

    fn name(&self) -> &str {
        "Structure Templates"
    }

    fn codec(&self) -> Arc<dyn Codec<TemplateFile>> {
        Arc::new(JsonCodec::new())
    }

    fn generate(&self, entries: &mut Entries<TemplateFile>) -> Result<(), EntriesError> {
        for (id, file) in &self.templates {
            entries.add(id.clone(), file.clone())?;
        }
        Ok(())
    }

    fn path_resolver(&self, output: &DataOutput) -> PathResolver {
        output.resolver(OutputType::DataPack, "structures")
    }
}
