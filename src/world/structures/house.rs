use glam::IVec3;
use rand::RngCore;
use std::sync::Arc;

use super::{PieceError, PieceLayout, PieceRecord, StructureContext, StructureType, Template, TemplatePiece};
use crate::constants::PLANNING_HEIGHT;
use crate::core::{CellState, Identifier, IdentifierError, Rotation};
use crate::world::structures::template::{CellSpec, TemplateManager};
use crate::world::space::Heightmap;

pub const HOUSE_SIZE: IVec3 = IVec3::new(7, 7, 11);
pub const CHEST_MARKER: &str = "chest";

fn block(name: &str) -> Result<CellState, IdentifierError> {
    Ok(CellState::of(Identifier::with_default_namespace(name)?))
}

/// Constants for placing the house: pivot in the middle of the floor, surface
/// sampled at the front wall, hatch in the floor capped when nothing is below.
pub fn house_layout() -> Result<PieceLayout, IdentifierError> {
    Ok(PieceLayout {
        pivot: IVec3::new(3, 5, 5),
        front_column: IVec3::new(0, 0, -5),
        entrance: IVec3::new(3, 0, 5),
        planning_height: PLANNING_HEIGHT,
        sink_depth: 1,
        heightmap: Heightmap::WorldSurfaceWg,
        cap_cell: block("snow_block")?,
        traversal_aids: vec![block("ladder")?],
        ignored_cells: vec![block("structure_block")?],
    })
}

pub fn house_template(id: Identifier) -> Result<Template, IdentifierError> {
    let stone = block("cobblestone")?;
    let planks = block("oak_planks")?;
    let roof = block("oak_stairs")?;
    let chest = block("chest")?;
    let marker = block("structure_block")?;

    let (width, depth) = (HOUSE_SIZE.x, HOUSE_SIZE.z);
    let mut builder = Template::builder(id, HOUSE_SIZE);

    // Foundation
    for x in 0..width {
        for z in 0..depth {
            builder = builder.state(IVec3::new(x, 0, z), stone.clone());
        }
    }
    // Hatch in the middle of the floor
    builder = builder.state(IVec3::new(3, 0, 5), CellState::EMPTY);

    // Walls - outer ring at y=1..=3, interior cleared
    for y in 1..=3 {
        for x in 0..width {
            for z in 0..depth {
                let state = if x == 0 || x == width - 1 || z == 0 || z == depth - 1 {
                    planks.clone()
                } else {
                    CellState::EMPTY
                };
                builder = builder.state(IVec3::new(x, y, z), state);
            }
        }
    }

    // Roof - stepped
    for level in 0..3 {
        let y = 4 + level;
        for x in level..width - level {
            for z in level..depth - level {
                builder = builder.state(IVec3::new(x, y, z), roof.clone());
            }
        }
    }

    // Door in the front wall (z=0)
    builder = builder
        .state(IVec3::new(3, 1, 0), CellState::EMPTY)
        .state(IVec3::new(3, 2, 0), CellState::EMPTY);

    // Windows
    builder = builder
        .state(IVec3::new(0, 2, 5), CellState::EMPTY)
        .state(IVec3::new(width - 1, 2, 5), CellState::EMPTY)
        .state(IVec3::new(3, 2, depth - 1), CellState::EMPTY);

    // Chest in the back corner with its loot marker above
    builder = builder
        .state(IVec3::new(1, 1, depth - 2), chest)
        .cell(IVec3::new(1, 2, depth - 2), CellSpec::marker(marker, CHEST_MARKER));

    Ok(builder.build())
}

/// One house per chunk, anchored at the chunk's corner with a random rotation.
pub struct HouseStructure {
    pub piece_type: Identifier,
    pub template: Identifier,
    pub layout: Arc<PieceLayout>,
}

impl HouseStructure {
    /// Loader for persisted house pieces.
    pub fn piece_loader(
        layout: Arc<PieceLayout>,
    ) -> impl Fn(&TemplateManager, &PieceRecord) -> Result<TemplatePiece, PieceError> + Send + Sync + 'static {
        move |templates, record| TemplatePiece::from_record(templates, Arc::clone(&layout), record)
    }
}

impl StructureType for HouseStructure {
    fn plan(&self, ctx: &StructureContext<'_>, rng: &mut dyn RngCore) -> Result<Vec<TemplatePiece>, PieceError> {
        let start = ctx.chunk_start();
        let pos = IVec3::new(start.x, PLANNING_HEIGHT, start.y);
        let rotation = Rotation::random(rng);
        let piece = TemplatePiece::new(
            self.piece_type.clone(),
            ctx.templates,
            &self.template,
            Arc::clone(&self.layout),
            pos,
            rotation,
            0,
        )?;
        Ok(vec![piece])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::space::{GridSpace, TargetSpace};
    use crate::world::structures::markers::{MarkerHandlers, container_loot};
    use crate::world::structures::piece::PieceState;
    use glam::IVec2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup() -> (TemplateManager, HouseStructure) {
        let templates = TemplateManager::in_memory();
        let template_id = Identifier::new("modid", "my_house").unwrap();
        templates.register(house_template(template_id.clone()).unwrap());
        let house = HouseStructure {
            piece_type: Identifier::new("modid", "my_house_piece").unwrap(),
            template: template_id,
            layout: Arc::new(house_layout().unwrap()),
        };
        (templates, house)
    }

    fn flat_space(ground: i32) -> GridSpace {
        let chest = CellState::of("chest".parse().unwrap());
        let mut space = GridSpace::new(IVec2::splat(-32), IVec2::splat(48)).with_container(chest);
        let dirt = CellState::of("dirt".parse().unwrap());
        for x in -32..48 {
            for z in -32..48 {
                for y in ground - 3..ground {
                    space
                        .set_cell(IVec3::new(x, y, z), dirt.clone(), crate::core::SetFlags::NONE)
                        .unwrap();
                }
            }
        }
        space
    }

    #[test]
    fn template_has_one_chest_marker() {
        let template = house_template(Identifier::new("modid", "my_house").unwrap()).unwrap();
        assert_eq!(template.marker_names().collect::<Vec<_>>(), [CHEST_MARKER]);
        assert_eq!(template.size(), HOUSE_SIZE);
    }

    #[test]
    fn plan_anchors_at_chunk_start() {
        let (templates, house) = setup();
        let ctx = StructureContext {
            chunk: IVec2::new(1, -2),
            templates: &templates,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let pieces = house.plan(&ctx, &mut rng).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].anchor(), IVec3::new(16, PLANNING_HEIGHT, -32));
        assert_eq!(pieces[0].state(), PieceState::Planned);
    }

    #[test]
    fn house_lands_on_surface_with_loot() {
        let (templates, house) = setup();
        let ctx = StructureContext {
            chunk: IVec2::ZERO,
            templates: &templates,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut pieces = house.plan(&ctx, &mut rng).unwrap();
        let piece = &mut pieces[0];

        let mut space = flat_space(70);
        let loot: Identifier = "chests/igloo_chest".parse().unwrap();
        let handlers = MarkerHandlers::new().with(CHEST_MARKER, container_loot::<GridSpace>(loot.clone()));
        piece.generate(&mut space, &handlers, &mut rng).unwrap();

        // Floor sinks one below the surface: y = 70 - 1.
        let origin = piece.anchor() + IVec3::new(0, 70 - PLANNING_HEIGHT - 1, 0);
        let chest_pos = origin + piece.placement().transform(IVec3::new(1, 1, HOUSE_SIZE.z - 2));
        let chest = space.block_entity(chest_pos).unwrap();
        assert_eq!(chest.loot_table.as_ref().map(|l| &l.table), Some(&loot));
        assert!(space.get_cell(chest_pos + IVec3::Y).is_empty());

        // Hatch sits over dirt, so it gets capped.
        let hatch = origin + piece.placement().transform(IVec3::new(3, 0, 5));
        assert_eq!(space.get_cell(hatch), house.layout.cap_cell);
    }
}
