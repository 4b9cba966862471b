use spawn_director_core::{ConfigError, Placement, PresetId, PresetTemplate};

/// Dense table of preset templates indexed by [`PresetId`].
///
/// Entries that are missing or malformed keep their slot so identifiers stay
/// stable, but they are never offered to the selector.
#[derive(Clone, Debug)]
pub struct PresetCatalog {
    slots: Vec<Option<PresetTemplate>>,
    sector_count: u16,
}

impl PresetCatalog {
    /// Validates `entries` against a ring of `sector_count` sectors.
    ///
    /// Placements pointing outside the ring are dropped. Templates with a
    /// non-positive cost, no difficulty or no placements left become vacant
    /// slots. Fails when no usable template remains.
    pub fn new(
        entries: Vec<Option<PresetTemplate>>,
        sector_count: u16,
    ) -> Result<Self, ConfigError> {
        if sector_count == 0 {
            return Err(ConfigError::NoSectors);
        }

        let slots: Vec<Option<PresetTemplate>> = entries
            .into_iter()
            .enumerate()
            .map(|(slot, entry)| match entry {
                Some(template) => sanitize(slot, template, sector_count),
                None => {
                    log::warn!("preset slot {slot} is empty; skipping");
                    None
                }
            })
            .collect();

        if slots.iter().all(Option::is_none) {
            log::error!("preset catalog has no usable template");
            return Err(ConfigError::EmptyPresetCatalog);
        }

        Ok(Self {
            slots,
            sector_count,
        })
    }

    /// Looks up a usable template.
    #[must_use]
    pub fn get(&self, id: PresetId) -> Option<&PresetTemplate> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of slots, vacant ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always `false`; a catalog without templates cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ring size the placements were validated against.
    #[must_use]
    pub const fn sector_count(&self) -> u16 {
        self.sector_count
    }

    /// Iterator over usable templates in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PresetId, &PresetTemplate)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            let id = PresetId::new(u32::try_from(slot).ok()?);
            entry.as_ref().map(|template| (id, template))
        })
    }
}

fn sanitize(
    slot: usize,
    mut template: PresetTemplate,
    sector_count: u16,
) -> Option<PresetTemplate> {
    if !template.cost.is_finite() || template.cost <= 0.0 {
        log::warn!(
            "preset '{}' (slot {slot}) has invalid cost {}; skipping",
            template.label,
            template.cost
        );
        return None;
    }

    if template.difficulties.is_empty() {
        log::warn!(
            "preset '{}' (slot {slot}) is not enabled for any difficulty; skipping",
            template.label
        );
        return None;
    }

    let label = template.label.clone();
    template
        .placements
        .retain(|placement| placement_in_range(&label, placement, sector_count));

    if template.placements.is_empty() {
        log::warn!(
            "preset '{}' (slot {slot}) has no valid placements; skipping",
            template.label
        );
        return None;
    }

    Some(template)
}

fn placement_in_range(label: &str, placement: &Placement, sector_count: u16) -> bool {
    if placement.count == 0 {
        log::warn!("preset '{label}' has a placement with zero entities; dropping it");
        return false;
    }
    if placement.relative_sector == 0 || placement.relative_sector > sector_count {
        log::warn!(
            "preset '{label}' places entities in sector offset {} outside 1..={sector_count}; dropping it",
            placement.relative_sector
        );
        return false;
    }
    true
}

/// Remaining cooldown cycles per catalog slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetCooldowns {
    remaining: Vec<u32>,
}

impl PresetCooldowns {
    /// Creates a cooldown table with every slot ready.
    #[must_use]
    pub fn new(catalog: &PresetCatalog) -> Self {
        Self {
            remaining: vec![0; catalog.len()],
        }
    }

    /// Cycles left before the preset is available again.
    #[must_use]
    pub fn remaining(&self, id: PresetId) -> u32 {
        self.remaining.get(id.index()).copied().unwrap_or(0)
    }

    /// Reports whether the preset's cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self, id: PresetId) -> bool {
        self.remaining(id) == 0
    }

    /// Starts the preset's cooldown.
    pub fn start(&mut self, id: PresetId, cycles: u32) {
        if let Some(slot) = self.remaining.get_mut(id.index()) {
            *slot = cycles;
        }
    }

    /// Applies the skip penalty: every cooldown loses one cycle.
    pub fn decrement_all(&mut self) {
        for slot in &mut self.remaining {
            *slot = slot.saturating_sub(1);
        }
    }

    /// Makes every preset available immediately.
    pub fn clear(&mut self) {
        self.remaining.fill(0);
    }
}
