use glam::{IVec2, IVec3};
use rand::RngCore;
use std::sync::Arc;

use crate::constants::CHUNK_SIZE;
use crate::core::{Identifier, Registry, RegistryError};
use crate::world::space::TargetSpace;
use crate::world::structures::markers::MarkerHandlers;
use crate::world::structures::piece::{GenerateOutcome, PieceError, PieceRecord, TemplatePiece};
use crate::world::structures::template::TemplateManager;

/// Everything a structure type may look at while planning.
pub struct StructureContext<'a> {
    pub chunk: IVec2,
    pub templates: &'a TemplateManager,
}

impl StructureContext<'_> {
    pub fn chunk_start(&self) -> IVec2 {
        self.chunk * CHUNK_SIZE
    }
}

/// Decides which pieces a structure places in a chunk.
pub trait StructureType: Send + Sync {
    fn plan(&self, ctx: &StructureContext<'_>, rng: &mut dyn RngCore) -> Result<Vec<TemplatePiece>, PieceError>;
}

pub type PieceLoader = dyn Fn(&TemplateManager, &PieceRecord) -> Result<TemplatePiece, PieceError> + Send + Sync;

/// Explicit replacement for global piece-type and structure-type registries.
pub struct StructureRegistries {
    pub piece_types: Registry<Box<PieceLoader>>,
    pub structures: Registry<Arc<dyn StructureType>>,
}

impl StructureRegistries {
    pub fn new() -> Self {
        Self {
            piece_types: Registry::new("structure_piece"),
            structures: Registry::new("structure_type"),
        }
    }

    pub fn register_piece_type<F>(&mut self, id: Identifier, loader: F) -> Result<(), RegistryError>
    where
        F: Fn(&TemplateManager, &PieceRecord) -> Result<TemplatePiece, PieceError> + Send + Sync + 'static,
    {
        self.piece_types.register(id, Box::new(loader)).map(|_| ())
    }

    pub fn register_structure(&mut self, id: Identifier, structure: Arc<dyn StructureType>) -> Result<(), RegistryError> {
        self.structures.register(id, structure).map(|_| ())
    }

    pub fn freeze(&mut self) {
        self.piece_types.freeze();
        self.structures.freeze();
    }

    /// Rebuild a planned piece from a persisted record.
    pub fn load_piece(&self, templates: &TemplateManager, record: &PieceRecord) -> Result<TemplatePiece, PieceError> {
        let loader = self
            .piece_types
            .get(&record.piece_type)
            .ok_or_else(|| PieceError::UnknownPieceType(record.piece_type.clone()))?;
        loader(templates, record)
    }

    pub fn start(
        &self,
        structure: &Identifier,
        ctx: &StructureContext<'_>,
        rng: &mut dyn RngCore,
    ) -> Result<StructureStart, PieceError> {
        let structure_type = self
            .structures
            .get(structure)
            .ok_or_else(|| PieceError::UnknownStructure(structure.clone()))?;
        let pieces = structure_type.plan(ctx, rng)?;
        Ok(StructureStart {
            structure: structure.clone(),
            chunk: ctx.chunk,
            pieces,
        })
    }
}

impl Default for StructureRegistries {
    fn default() -> Self {
        Self::new()
    }
}

/// Pieces planned for one structure in one chunk.
pub struct StructureStart {
    pub structure: Identifier,
    pub chunk: IVec2,
    pub pieces: Vec<TemplatePiece>,
}

#[derive(Debug, Default)]
pub struct PlacementReport {
    pub placed: usize,
    pub already_placed: usize,
    pub failed: Vec<(Identifier, IVec3, PieceError)>,
}

impl StructureStart {
    /// Materialize every piece. A failing piece is reported and skipped; the
    /// others still generate.
    pub fn place<S: TargetSpace>(
        &mut self,
        space: &mut S,
        markers: &MarkerHandlers<S>,
        rng: &mut dyn RngCore,
    ) -> PlacementReport {
        let mut report = PlacementReport::default();
        for piece in &mut self.pieces {
            match piece.generate(space, markers, rng) {
                Ok(GenerateOutcome::Materialized { .. }) => report.placed += 1,
                Ok(GenerateOutcome::AlreadyMaterialized) => report.already_placed += 1,
                Err(e) => {
                    tracing::warn!(
                        "Dropping piece {} of {} at {}: {}",
                        piece.template_id(),
                        self.structure,
                        piece.anchor(),
                        e
                    );
                    report
                        .failed
                        .push((piece.template_id().clone(), piece.anchor(), e));
                }
            }
        }
        report
    }

    pub fn records(&self) -> Vec<PieceRecord> {
        self.pieces.iter().map(TemplatePiece::to_record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellState, Rotation, SetFlags};
    use crate::world::space::GridSpace;
    use crate::world::structures::house::{house_layout, house_template};
    use crate::world::structures::piece::PieceLayout;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    /// Plans one house at each of the given anchors.
    struct FixedPlan {
        layout: Arc<PieceLayout>,
        anchors: Vec<IVec3>,
    }

    impl StructureType for FixedPlan {
        fn plan(&self, ctx: &StructureContext<'_>, _rng: &mut dyn RngCore) -> Result<Vec<TemplatePiece>, PieceError> {
            self.anchors
                .iter()
                .map(|anchor| {
                    TemplatePiece::new(
                        id("modid:test_piece"),
                        ctx.templates,
                        &id("modid:my_house"),
                        Arc::clone(&self.layout),
                        *anchor,
                        Rotation::R0,
                        0,
                    )
                })
                .collect()
        }
    }

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    fn setup(anchors: Vec<IVec3>) -> (TemplateManager, StructureRegistries) {
        let templates = TemplateManager::in_memory();
        templates.register(house_template(id("modid:my_house")).unwrap());
        let layout = Arc::new(house_layout().unwrap());
        let mut registries = StructureRegistries::new();
        let loader_layout = Arc::clone(&layout);
        registries
            .register_piece_type(id("modid:test_piece"), move |templates, record| {
                TemplatePiece::from_record(templates, Arc::clone(&loader_layout), record)
            })
            .unwrap();
        registries
            .register_structure(id("modid:fixed"), Arc::new(FixedPlan { layout, anchors }))
            .unwrap();
        registries.freeze();
        (templates, registries)
    }

    fn ground(min: i32, max: i32) -> GridSpace {
        let mut space = GridSpace::new(IVec2::splat(min), IVec2::splat(max));
        let stone = CellState::of(id("stone"));
        for x in min..max {
            for z in min..max {
                space.set_cell(IVec3::new(x, 63, z), stone.clone(), SetFlags::NONE).unwrap();
            }
        }
        space
    }

    #[test]
    fn failing_piece_is_dropped_and_the_rest_placed() {
        let (templates, registries) = setup(vec![IVec3::new(4, 90, 4), IVec3::new(500, 90, 500)]);
        let ctx = StructureContext {
            chunk: IVec2::ZERO,
            templates: &templates,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut start = registries.start(&id("modid:fixed"), &ctx, &mut rng).unwrap();
        let mut space = ground(-16, 32);
        let handlers = MarkerHandlers::new();

        let report = start.place(&mut space, &handlers, &mut rng);
        assert_eq!(report.placed, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(matches!(report.failed[0].2, PieceError::AnchorResolutionFailed { .. }));

        let again = start.place(&mut space, &handlers, &mut rng);
        assert_eq!(again.already_placed, 1);
        assert_eq!(again.failed.len(), 1);
    }

    #[test]
    fn records_reload_through_the_piece_registry() {
        let (templates, registries) = setup(vec![IVec3::new(4, 90, 4)]);
        let ctx = StructureContext {
            chunk: IVec2::ZERO,
            templates: &templates,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let start = registries.start(&id("modid:fixed"), &ctx, &mut rng).unwrap();
        let records = start.records();

        let piece = registries.load_piece(&templates, &records[0]).unwrap();
        assert_eq!(piece.anchor(), IVec3::new(4, 90, 4));

        let mut unknown = records[0].clone();
        unknown.piece_type = id("modid:nope");
        let err = registries.load_piece(&templates, &unknown).err().unwrap();
        assert!(matches!(err, PieceError::UnknownPieceType(_)));
    }

    #[test]
    fn unknown_structure_and_frozen_registries() {
        let (templates, mut registries) = setup(Vec::new());
        let ctx = StructureContext {
            chunk: IVec2::ZERO,
            templates: &templates,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let err = registries
            .start(&id("modid:missing"), &ctx, &mut rng)
            .err()
            .unwrap();
        assert!(matches!(err, PieceError::UnknownStructure(_)));

        let late = registries.register_structure(
            id("modid:late"),
            Arc::new(FixedPlan {
                layout: Arc::new(house_layout().unwrap()),
                anchors: Vec::new(),
            }),
        );
        assert!(matches!(late, Err(RegistryError::Frozen { .. })));
    }
}
