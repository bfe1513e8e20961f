use std::collections::BTreeMap;

use crate::biome::selection::BiomeSelection;
use crate::core::Identifier;

/// Feature decoration steps, in generation order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum GenerationStep {
    RawGeneration,
    Lakes,
    LocalModifications,
    UndergroundStructures,
    SurfaceStructures,
    Strongholds,
    UndergroundOres,
    UndergroundDecoration,
    FluidSprings,
    VegetalDecoration,
    TopLayerModification,
}

/// Mutable generation settings of one biome.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationSettings {
    features: BTreeMap<GenerationStep, Vec<Identifier>>,
    structures: Vec<Identifier>,
}

impl GenerationSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feature(&mut self, step: GenerationStep, feature: Identifier) {
        self.features.entry(step).or_default().push(feature);
    }

    /// Returns whether anything was removed.
    pub fn remove_feature(&mut self, step: GenerationStep, feature: &Identifier) -> bool {
        let Some(list) = self.features.get_mut(&step) else {
            return false;
        };
        let before = list.len();
        list.retain(|f| f != feature);
        before != list.len()
    }

    /// Swaps every occurrence of `old` in `step` for `new`, keeping positions.
    /// Returns the number of replacements.
    pub fn replace_feature(&mut self, step: GenerationStep, old: &Identifier, new: Identifier) -> usize {
        let Some(list) = self.features.get_mut(&step) else {
            return 0;
        };
        let mut replaced = 0;
        for f in list.iter_mut().filter(|f| *f == old) {
            *f = new.clone();
            replaced += 1;
        }
        replaced
    }

    pub fn features(&self, step: GenerationStep) -> &[Identifier] {
        self.features.get(&step).map(Vec::as_slice).unwrap_or_default()
    }

    /// Non-empty steps in generation order.
    pub fn steps(&self) -> impl Iterator<Item = (GenerationStep, &[Identifier])> {
        self.features
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(step, list)| (*step, list.as_slice()))
    }

    pub fn has_feature(&self, feature: &Identifier) -> bool {
        self.features.values().any(|list| list.contains(feature))
    }

    pub fn add_structure(&mut self, structure: Identifier) {
        if !self.structures.contains(&structure) {
            self.structures.push(structure);
        }
    }

    pub fn remove_structure(&mut self, structure: &Identifier) -> bool {
        let before = self.structures.len();
        self.structures.retain(|s| s != structure);
        before != self.structures.len()
    }

    pub fn structures(&self) -> &[Identifier] {
        &self.structures
    }
}

/// One biome as seen by the modification engine.
#[derive(Clone, Debug)]
pub struct BiomeContext {
    pub selection: BiomeSelection,
    pub settings: GenerationSettings,
}

impl BiomeContext {
    pub fn new(selection: BiomeSelection) -> Self {
        Self {
            selection,
            settings: GenerationSettings::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Identifier {
        s.parse().unwrap()
    }

    #[test]
    fn replace_keeps_position() {
        let mut settings = GenerationSettings::new();
        settings.add_feature(GenerationStep::UndergroundOres, id("ore_iron"));
        settings.add_feature(GenerationStep::UndergroundOres, id("ore_coal"));
        settings.add_feature(GenerationStep::UndergroundOres, id("ore_gold"));

        assert_eq!(
            settings.replace_feature(GenerationStep::UndergroundOres, &id("ore_coal"), id("modid:my_ore")),
            1
        );
        assert_eq!(
            settings.features(GenerationStep::UndergroundOres),
            [id("ore_iron"), id("modid:my_ore"), id("ore_gold")]
        );
    }

    #[test]
    fn remove_from_missing_step() {
        let mut settings = GenerationSettings::new();
        assert!(!settings.remove_feature(GenerationStep::Lakes, &id("lake_lava")));
        assert!(settings.features(GenerationStep::Lakes).is_empty());
    }

    #[test]
    fn structures_are_a_set() {
        let mut settings = GenerationSettings::new();
        settings.add_structure(id("igloo"));
        settings.add_structure(id("igloo"));
        assert_eq!(settings.structures().len(), 1);
        assert!(settings.remove_structure(&id("igloo")));
        assert!(settings.structures().is_empty());
    }
}
