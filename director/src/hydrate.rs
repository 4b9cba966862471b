use rand::{seq::SliceRandom, Rng};
use spawn_director_core::{
    EnemyKind, EnemyMetadataProvider, GeometryProvider, PresetTemplate, SpawnRequest, VariantId,
    VariantSlot,
};
use spawn_director_presets::Selection;

/// Expands a committed template into one request per entity.
///
/// Tokens and cooldown are split evenly over every entity the template
/// declares. Placements whose random variant cannot be resolved are skipped.
pub(crate) fn hydrate<G, M, R>(
    selection: &Selection,
    template: &PresetTemplate,
    sector_count: u16,
    geometry: &G,
    metadata: &M,
    rng: &mut R,
    out: &mut Vec<SpawnRequest>,
) where
    G: GeometryProvider + ?Sized,
    M: EnemyMetadataProvider + ?Sized,
    R: Rng + ?Sized,
{
    out.clear();
    let total = template.total_entities().max(1) as f32;
    let tokens_to_return = template.cost / total;
    let cooldown_share = template.cooldown as f32 / total;

    for placement in &template.placements {
        let Some(sector) = selection
            .main_sector
            .offset(placement.relative_sector, sector_count)
        else {
            continue;
        };
        let Some(variant) = resolve_variant(placement.variant, metadata, placement.kind, rng) else {
            log::warn!(
                "preset '{}' has no variants for kind {}; skipping placement",
                template.label,
                placement.kind.get()
            );
            continue;
        };

        let request = SpawnRequest {
            preset: selection.preset,
            kind: placement.kind,
            variant,
            sector,
            position: geometry.position_for(sector),
            cost_weight: metadata.cost_weight(placement.kind),
            tokens_to_return,
            cooldown_share,
            timer_reduction: placement.death_timer_reduction,
        };
        out.extend(std::iter::repeat(request).take(placement.count as usize));
    }
}

fn resolve_variant<M, R>(
    slot: VariantSlot,
    metadata: &M,
    kind: EnemyKind,
    rng: &mut R,
) -> Option<VariantId>
where
    M: EnemyMetadataProvider + ?Sized,
    R: Rng + ?Sized,
{
    match slot {
        VariantSlot::Fixed(variant) => Some(variant),
        VariantSlot::Random => metadata.variants(kind).choose(rng).copied(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use spawn_director_core::{
        DifficultyIndex, Placement, PresetId, RingGeometry, SectorId, WorldPosition,
    };

    use super::*;

    const SCOUT: EnemyKind = EnemyKind::new(0);
    const SHADE: EnemyKind = EnemyKind::new(1);

    struct Kinds {
        scout_variants: Vec<VariantId>,
    }

    impl EnemyMetadataProvider for Kinds {
        fn cost_weight(&self, kind: EnemyKind) -> f32 {
            if kind == SHADE {
                2.0
            } else {
                1.0
            }
        }

        fn variants(&self, kind: EnemyKind) -> &[VariantId] {
            if kind == SCOUT {
                &self.scout_variants
            } else {
                &[]
            }
        }
    }

    fn placement(
        kind: EnemyKind,
        variant: VariantSlot,
        relative_sector: u16,
        count: u32,
    ) -> Placement {
        Placement {
            kind,
            variant,
            relative_sector,
            count,
            death_timer_reduction: Duration::from_secs(1),
        }
    }

    #[test]
    fn splits_cost_and_cooldown_across_entities() {
        let template = PresetTemplate {
            label: "pincer".to_owned(),
            cost: 6.0,
            cooldown: 3,
            difficulties: vec![DifficultyIndex::new(0)],
            placements: vec![
                placement(SCOUT, VariantSlot::Random, 1, 2),
                placement(SHADE, VariantSlot::Fixed(VariantId::new(9)), 7, 1),
            ],
        };
        let metadata = Kinds {
            scout_variants: vec![VariantId::new(3), VariantId::new(4)],
        };
        let geometry = RingGeometry::new(WorldPosition::ZERO, 10.0, 12);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut out = Vec::new();

        let selection = Selection {
            preset: PresetId::new(5),
            main_sector: SectorId::new(1),
        };
        hydrate(
            &selection,
            &template,
            12,
            &geometry,
            &metadata,
            &mut rng,
            &mut out,
        );

        assert_eq!(out.len(), 3);
        for request in &out {
            assert_eq!(request.preset, PresetId::new(5));
            assert!((request.tokens_to_return - 2.0).abs() < f32::EPSILON);
            assert!((request.cooldown_share - 1.0).abs() < f32::EPSILON);
            assert_eq!(request.position, geometry.position_for(request.sector));
        }
        assert_eq!(out[0].sector, SectorId::new(1));
        assert!(metadata.scout_variants.contains(&out[0].variant));
        assert_eq!(out[2].sector, SectorId::new(7));
        assert_eq!(out[2].variant, VariantId::new(9));
        assert_eq!(out[2].cost_weight, 2.0);
    }

    #[test]
    fn unresolvable_random_variant_skips_placement() {
        let template = PresetTemplate {
            label: "shades".to_owned(),
            cost: 2.0,
            cooldown: 1,
            difficulties: vec![DifficultyIndex::new(0)],
            placements: vec![
                placement(SHADE, VariantSlot::Random, 1, 1),
                placement(SCOUT, VariantSlot::Fixed(VariantId::new(0)), 2, 1),
            ],
        };
        let metadata = Kinds {
            scout_variants: Vec::new(),
        };
        let geometry = RingGeometry::new(WorldPosition::ZERO, 10.0, 12);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut out = Vec::new();

        let selection = Selection {
            preset: PresetId::new(0),
            main_sector: SectorId::new(11),
        };
        hydrate(
            &selection,
            &template,
            12,
            &geometry,
            &metadata,
            &mut rng,
            &mut out,
        );

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SCOUT);
        assert_eq!(out[0].sector, SectorId::new(0));
        assert!((out[0].tokens_to_return - 1.0).abs() < f32::EPSILON);
    }
}
