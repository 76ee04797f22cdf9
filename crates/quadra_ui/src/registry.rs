//! # Element Registry
//!
//! Screen-space geometry of every mounted credit circle, looked up by key.
//!
//! ```text
//! PoolSurface ──register──┐
//! DiamondSurface ─────────┼──> ElementRegistry <──resolve── Choreographer
//! LiquidPoolSurface ──────┘                     <──resolve── LiquidPoolSurface
//! ```
//!
//! Each surface holds a [`Registration`]. Dropping it removes every key the
//! surface still owns, so an unmounted surface can never be resolved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use quadra_shared::{Color, QuestionId};

use crate::geometry::Circle;

/// Identifies one rendered circle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementKey {
    /// Credit circle `n` of the pool grid.
    PoolCircle(u32),
    /// Fallback landing point of the liquid pool.
    PoolAnchor,
    /// A diamond circle.
    DiamondPoint {
        /// Question the diamond belongs to.
        diamond: QuestionId,
        /// Level, 1-based.
        level: u32,
        /// Index within the level.
        unit: u32,
    },
}

/// What the registry knows about an element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementHandle {
    /// Screen-space geometry.
    pub circle: Circle,
    /// Fill currently shown, if the surface reports one.
    pub fill: Option<Color>,
}

impl ElementHandle {
    /// Creates a handle with no fill.
    #[must_use]
    pub const fn new(circle: Circle) -> Self {
        Self { circle, fill: None }
    }

    /// Sets the fill.
    #[must_use]
    pub const fn with_fill(mut self, fill: Color) -> Self {
        self.fill = Some(fill);
        self
    }
}

struct Entry {
    owner: u64,
    handle: ElementHandle,
}

#[derive(Default)]
struct RegistryInner {
    elements: RwLock<HashMap<ElementKey, Entry>>,
    next_owner: AtomicU64,
}

/// Shared key → geometry map.
///
/// Cloning is cheap; clones see the same elements.
#[derive(Clone, Default)]
pub struct ElementRegistry {
    inner: Arc<RegistryInner>,
}

impl ElementRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scoped registration for one surface.
    #[must_use]
    pub fn registration(&self) -> Registration {
        Registration {
            owner: self.inner.next_owner.fetch_add(1, Ordering::Relaxed) + 1,
            registry: self.clone(),
        }
    }

    /// Looks up one element.
    #[must_use]
    pub fn resolve(&self, key: &ElementKey) -> Option<ElementHandle> {
        self.inner.elements.read().get(key).map(|entry| entry.handle)
    }

    /// Returns every point of one diamond level, sorted by unit index.
    #[must_use]
    pub fn diamond_level(&self, diamond: &QuestionId, level: u32) -> Vec<(u32, ElementHandle)> {
        let elements = self.inner.elements.read();
        let mut points: Vec<(u32, ElementHandle)> = elements
            .iter()
            .filter_map(|(key, entry)| match key {
                ElementKey::DiamondPoint {
                    diamond: d,
                    level: l,
                    unit,
                } if d == diamond && *l == level => Some((*unit, entry.handle)),
                _ => None,
            })
            .collect();
        points.sort_unstable_by_key(|(unit, _)| *unit);
        points
    }

    /// Number of registered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.elements.read().len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.elements.read().is_empty()
    }
}

impl std::fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRegistry")
            .field("elements", &self.len())
            .finish()
    }
}

/// A surface's claim on a set of keys. Unregisters them on drop.
pub struct Registration {
    owner: u64,
    registry: ElementRegistry,
}

impl Registration {
    /// Registers or replaces an element.
    ///
    /// Replacing a key owned by another registration transfers it here.
    pub fn insert(&self, key: ElementKey, handle: ElementHandle) {
        let mut elements = self.registry.inner.elements.write();
        if let Some(previous) = elements.get(&key) {
            if previous.owner != self.owner {
                tracing::warn!(?key, "element key already mounted, last mount wins");
            }
        }
        elements.insert(
            key,
            Entry {
                owner: self.owner,
                handle,
            },
        );
    }

    /// Updates the fill of an element this registration owns.
    ///
    /// Returns false if the key is unknown or owned elsewhere.
    pub fn set_fill(&self, key: &ElementKey, fill: Color) -> bool {
        match self.registry.inner.elements.write().get_mut(key) {
            Some(entry) if entry.owner == self.owner => {
                entry.handle.fill = Some(fill);
                true
            }
            _ => false,
        }
    }

    /// Removes every key this registration owns.
    pub fn clear(&self) {
        self.registry
            .inner
            .elements
            .write()
            .retain(|_, entry| entry.owner != self.owner);
    }

    /// Number of keys this registration owns.
    #[must_use]
    pub fn owned(&self) -> usize {
        self.registry
            .inner
            .elements
            .read()
            .values()
            .filter(|entry| entry.owner == self.owner)
            .count()
    }

    /// The registry this registration writes to.
    #[must_use]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
