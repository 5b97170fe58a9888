//! Value resolution against the configuration overlay.
//!
//! A lookup for a slotted category first tries the slot-specific key, then
//! the shared key, then falls back to identity. Multipliers resolve to `1.0`
//! when unset; absolutes resolve to `None`.

use crate::config::{Category, CategoryKind, Overlay};
use crate::host::member::Slot;

/// Result of resolving one category for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A scale factor. `1.0` when nothing is configured.
    Multiplier(f32),
    /// A replacement value, if one is configured.
    Absolute(Option<f32>),
}

/// Resolves configured values for entities.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    overlay: &'a Overlay,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over `overlay`.
    #[must_use]
    pub fn new(overlay: &'a Overlay) -> Self {
        Self { overlay }
    }

    /// The underlying overlay.
    #[must_use]
    pub fn overlay(&self) -> &'a Overlay {
        self.overlay
    }

    /// Resolves `category` for `entity`, optionally for one weapon slot.
    #[must_use]
    pub fn resolve(&self, category: Category, entity: &str, slot: Option<Slot>) -> Resolution {
        let slotted = slot
            .filter(|_| category.is_slotted())
            .and_then(|s| self.overlay.get(category, entity, Some(s)));
        let value = slotted.or_else(|| self.overlay.get(category, entity, None));

        match category.kind() {
            CategoryKind::Multiplier => Resolution::Multiplier(value.unwrap_or(1.0)),
            CategoryKind::Absolute => Resolution::Absolute(value),
        }
    }

    /// Multiplier for `category`, `1.0` if unset or if the category is an
    /// absolute.
    #[must_use]
    pub fn multiplier(&self, category: Category, entity: &str, slot: Option<Slot>) -> f32 {
        match self.resolve(category, entity, slot) {
            Resolution::Multiplier(m) => m,
            Resolution::Absolute(_) => 1.0,
        }
    }

    /// Absolute value for `category`, `None` if unset or if the category is
    /// a multiplier.
    #[must_use]
    pub fn absolute(&self, category: Category, entity: &str) -> Option<f32> {
        match self.resolve(category, entity, None) {
            Resolution::Absolute(v) => v,
            Resolution::Multiplier(_) => None,
        }
    }

    /// Whether `entity` has any value for `category` under any key.
    #[must_use]
    pub fn has_any(&self, category: Category, entity: &str) -> bool {
        if category.is_slotted() {
            Slot::ALL
                .into_iter()
                .any(|slot| self.overlay.get(category, entity, Some(slot)).is_some())
                || self.overlay.get(category, entity, None).is_some()
        } else {
            self.overlay.get(category, entity, None).is_some()
        }
    }
}
