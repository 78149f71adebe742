//! Layered decoration sets.
//!
//! Decorations are derived, ephemeral visual instructions anchored to char ranges. The payload
//! type is left to the producer; the preview crate fills it with hide/widget/style/direction
//! values. Sets are sorted by layer, then position.

use crate::changes::{Assoc, ChangeSet};

/// A decoration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecorationLayerId(pub u32);

impl DecorationLayerId {
    /// Hidden formatting markers.
    pub const MARKERS: Self = Self(1);
    /// Block widgets replacing source ranges.
    pub const WIDGETS: Self = Self(2);
    /// Mark classes for the host theme.
    pub const STYLES: Self = Self(3);
    /// Line attributes (text direction).
    pub const LINES: Self = Self(4);

    /// Returns `true` for layers whose ranges replace source text and must not overlap.
    pub fn is_exclusive(&self) -> bool {
        matches!(*self, Self::MARKERS | Self::WIDGETS)
    }
}

/// A decoration over `from..to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decoration<T> {
    /// Layer the decoration belongs to.
    pub layer: DecorationLayerId,
    /// Start char offset.
    pub from: usize,
    /// End char offset (exclusive).
    pub to: usize,
    /// Producer-defined payload.
    pub value: T,
}

impl<T> Decoration<T> {
    /// Build a decoration.
    pub fn new(layer: DecorationLayerId, from: usize, to: usize, value: T) -> Self {
        Self {
            layer,
            from,
            to,
            value,
        }
    }
}

/// Sorted decorations across layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecorationSet<T> {
    items: Vec<Decoration<T>>,
}

impl<T> Default for DecorationSet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> DecorationSet<T> {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unsorted decorations.
    pub fn from_vec(mut items: Vec<Decoration<T>>) -> Self {
        items.sort_by_key(|d| (d.layer, d.from, d.to));
        Self { items }
    }

    /// Number of decorations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there are no decorations.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All decorations, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &Decoration<T>> {
        self.items.iter()
    }

    /// Decorations of one layer, sorted by position.
    pub fn layer(&self, layer: DecorationLayerId) -> impl Iterator<Item = &Decoration<T>> {
        self.items.iter().filter(move |d| d.layer == layer)
    }

    /// Merge another set into this one.
    pub fn extend(&mut self, other: DecorationSet<T>) {
        self.items.extend(other.items);
        self.items.sort_by_key(|d| (d.layer, d.from, d.to));
    }

    /// Returns `true` if two decorations of an exclusive layer overlap.
    pub fn has_overlaps(&self) -> bool {
        self.items.windows(2).any(|pair| {
            pair[0].layer == pair[1].layer
                && pair[0].layer.is_exclusive()
                && pair[1].from < pair[0].to
        })
    }

    /// Enforce `from <= to <= len` for every decoration.
    ///
    /// Debug builds panic on a violation; release builds drop the decoration and log.
    pub fn check_bounds(&mut self, len: usize) {
        self.items.retain(|d| {
            let ok = d.from <= d.to && d.to <= len;
            if !ok {
                debug_assert!(
                    ok,
                    "decoration {}..{} out of bounds (len {len})",
                    d.from, d.to
                );
                tracing::error!(
                    from = d.from,
                    to = d.to,
                    len,
                    layer = d.layer.0,
                    "dropping out-of-bounds decoration"
                );
            }
            ok
        });
    }

    /// Remap positions through a change set without recomputing payloads.
    ///
    /// Non-empty decorations collapsed by the change are dropped.
    pub fn map(self, changes: &ChangeSet) -> Self {
        if changes.is_empty() {
            return self;
        }
        let items = self
            .items
            .into_iter()
            .filter_map(|d| {
                let from = changes.map_pos(d.from, Assoc::Before);
                let to = changes.map_pos(d.to, Assoc::After).max(from);
                if d.from < d.to && from == to {
                    return None;
                }
                Some(Decoration::new(d.layer, from, to, d.value))
            })
            .collect();
        Self::from_vec(items)
    }
}

impl<T> FromIterator<Decoration<T>> for DecorationSet<T> {
    fn from_iter<I: IntoIterator<Item = Decoration<T>>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_layer_then_position() {
        let set = DecorationSet::from_vec(vec![
            Decoration::new(DecorationLayerId::STYLES, 0, 4, "strong"),
            Decoration::new(DecorationLayerId::MARKERS, 6, 8, "hide"),
            Decoration::new(DecorationLayerId::MARKERS, 0, 2, "hide"),
        ]);
        let order: Vec<_> = set.iter().map(|d| (d.layer, d.from)).collect();
        assert_eq!(
            order,
            vec![
                (DecorationLayerId::MARKERS, 0),
                (DecorationLayerId::MARKERS, 6),
                (DecorationLayerId::STYLES, 0),
            ]
        );
        assert_eq!(set.layer(DecorationLayerId::MARKERS).count(), 2);
    }

    #[test]
    fn test_overlap_only_counts_exclusive_layers() {
        let styles = DecorationSet::from_vec(vec![
            Decoration::new(DecorationLayerId::STYLES, 0, 8, ()),
            Decoration::new(DecorationLayerId::STYLES, 2, 6, ()),
        ]);
        assert!(!styles.has_overlaps());

        let markers = DecorationSet::from_vec(vec![
            Decoration::new(DecorationLayerId::MARKERS, 0, 3, ()),
            Decoration::new(DecorationLayerId::MARKERS, 2, 4, ()),
        ]);
        assert!(markers.has_overlaps());
    }

    #[test]
    fn test_map_through_replacement() {
        let set = DecorationSet::from_vec(vec![
            Decoration::new(DecorationLayerId::WIDGETS, 5, 20, "table"),
            Decoration::new(DecorationLayerId::MARKERS, 22, 24, "hide"),
        ]);
        let mapped = set.map(&ChangeSet::replace(5, 20, "| b |\n| - |"));
        let ranges: Vec<_> = mapped.iter().map(|d| (d.from, d.to)).collect();
        assert_eq!(ranges, vec![(18, 20), (5, 16)]);
    }

    #[test]
    fn test_map_drops_collapsed() {
        let set = DecorationSet::from_vec(vec![Decoration::new(
            DecorationLayerId::MARKERS,
            2,
            4,
            (),
        )]);
        assert!(set.map(&ChangeSet::delete(0, 6)).is_empty());
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_check_bounds_drops_in_release() {
        let mut set = DecorationSet::from_vec(vec![
            Decoration::new(DecorationLayerId::MARKERS, 0, 2, ()),
            Decoration::new(DecorationLayerId::MARKERS, 3, 9, ()),
        ]);
        set.check_bounds(5);
        assert_eq!(set.len(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "out of bounds")]
    fn test_check_bounds_panics_in_debug() {
        let mut set = DecorationSet::from_vec(vec![Decoration::new(
            DecorationLayerId::MARKERS,
            3,
            9,
            (),
        )]);
        set.check_bounds(5);
    }
}
