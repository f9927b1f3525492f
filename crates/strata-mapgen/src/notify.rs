//! Generation notifications: where notable features were placed in a chunk.

use std::collections::BTreeMap;

use glam::IVec3;

/// Report decoration placements.
pub const GENNOTIFY_DECORATION: u32 = 1 << 0;
/// Report ore clusters.
pub const GENNOTIFY_ORE: u32 = 1 << 1;
/// Report default trees.
pub const GENNOTIFY_TREE: u32 = 1 << 2;
/// Report schematic stamps.
pub const GENNOTIFY_SCHEMATIC: u32 = 1 << 3;
/// Every kind.
pub const GENNOTIFY_ALL: u32 = GENNOTIFY_DECORATION | GENNOTIFY_ORE | GENNOTIFY_TREE | GENNOTIFY_SCHEMATIC;

/// Category of a generation event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GenNotifyKind {
    Decoration,
    Ore,
    Tree,
    Schematic,
}

impl GenNotifyKind {
    fn flag(self) -> u32 {
        match self {
            GenNotifyKind::Decoration => GENNOTIFY_DECORATION,
            GenNotifyKind::Ore => GENNOTIFY_ORE,
            GenNotifyKind::Tree => GENNOTIFY_TREE,
            GenNotifyKind::Schematic => GENNOTIFY_SCHEMATIC,
        }
    }

    fn name(self) -> &'static str {
        match self {
            GenNotifyKind::Decoration => "decoration",
            GenNotifyKind::Ore => "ore",
            GenNotifyKind::Tree => "tree",
            GenNotifyKind::Schematic => "schematic",
        }
    }
}

/// A single recorded event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenEvent {
    pub kind: GenNotifyKind,
    /// Handle of the decoration or ore that produced the event, if any.
    pub id: Option<u32>,
    pub pos: IVec3,
}

impl GenEvent {
    /// Event key as exposed to callers: `"tree"`, `"decoration#3"`, ...
    pub fn key(&self) -> String {
        match self.id {
            Some(id) => format!("{}#{id}", self.kind.name()),
            None => self.kind.name().to_string(),
        }
    }
}

/// Unknown name in a notification flag string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gennotify flag '{0}'")]
pub struct UnknownNotifyFlag(pub String);

/// Which events are recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenNotifyFilter {
    flags: u32,
    /// When set, decoration events are limited to these handles.
    decorations: Option<Vec<u32>>,
}

impl GenNotifyFilter {
    /// Records everything.
    pub fn all() -> Self {
        Self::new(GENNOTIFY_ALL)
    }

    /// Records nothing.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn new(flags: u32) -> Self {
        Self {
            flags,
            decorations: None,
        }
    }

    /// Limits decoration events to the given decoration handles.
    pub fn with_decorations(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();
        self.decorations = Some(ids);
        self
    }

    /// Parses a comma-separated flag list such as `"decoration, tree"`.
    pub fn parse_flags(s: &str) -> Result<u32, UnknownNotifyFlag> {
        s.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .try_fold(0, |acc, f| {
                let flag = match f {
                    "decoration" => GENNOTIFY_DECORATION,
                    "ore" => GENNOTIFY_ORE,
                    "tree" => GENNOTIFY_TREE,
                    "schematic" => GENNOTIFY_SCHEMATIC,
                    "all" => GENNOTIFY_ALL,
                    other => return Err(UnknownNotifyFlag(other.to_string())),
                };
                Ok(acc | flag)
            })
    }

    /// Returns `true` if an event of this kind and id would be recorded.
    pub fn wants(&self, kind: GenNotifyKind, id: Option<u32>) -> bool {
        if self.flags & kind.flag() == 0 {
            return false;
        }
        match (kind, &self.decorations, id) {
            (GenNotifyKind::Decoration, Some(ids), Some(id)) => ids.binary_search(&id).is_ok(),
            _ => true,
        }
    }
}

impl Default for GenNotifyFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Event collector for one chunk.
#[derive(Clone, Debug, Default)]
pub struct GenNotify {
    filter: GenNotifyFilter,
    events: Vec<GenEvent>,
}

impl GenNotify {
    pub fn new(filter: GenNotifyFilter) -> Self {
        Self {
            filter,
            events: Vec::new(),
        }
    }

    /// Records an event if the filter accepts it.
    pub fn record(&mut self, kind: GenNotifyKind, id: Option<u32>, pos: IVec3) {
        if self.filter.wants(kind, id) {
            self.events.push(GenEvent { kind, id, pos });
        }
    }

    /// Events in the order they were recorded.
    pub fn events(&self) -> &[GenEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Groups positions by event key. Positions keep their recording order.
    pub fn into_map(self) -> BTreeMap<String, Vec<IVec3>> {
        let mut map: BTreeMap<String, Vec<IVec3>> = BTreeMap::new();
        for event in self.events {
            map.entry(event.key()).or_default().push(event.pos);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_kind() {
        let mut notify = GenNotify::new(GenNotifyFilter::new(GENNOTIFY_TREE));
        notify.record(GenNotifyKind::Tree, None, IVec3::ONE);
        notify.record(GenNotifyKind::Ore, Some(0), IVec3::ZERO);
        assert_eq!(notify.len(), 1);
        assert_eq!(notify.events()[0].kind, GenNotifyKind::Tree);
    }

    #[test]
    fn test_filter_by_decoration_id() {
        let filter = GenNotifyFilter::all().with_decorations([4, 2]);
        assert!(filter.wants(GenNotifyKind::Decoration, Some(2)));
        assert!(!filter.wants(GenNotifyKind::Decoration, Some(3)));
        assert!(filter.wants(GenNotifyKind::Ore, Some(3)));
    }

    #[test]
    fn test_into_map_keys() {
        let mut notify = GenNotify::default();
        notify.record(GenNotifyKind::Decoration, Some(3), IVec3::new(1, 2, 3));
        notify.record(GenNotifyKind::Tree, None, IVec3::new(4, 5, 6));
        notify.record(GenNotifyKind::Decoration, Some(3), IVec3::new(7, 8, 9));
        let map = notify.into_map();
        assert_eq!(
            map["decoration#3"],
            vec![IVec3::new(1, 2, 3), IVec3::new(7, 8, 9)]
        );
        assert_eq!(map["tree"], vec![IVec3::new(4, 5, 6)]);
    }

    #[test]
    fn test_parse_flags() {
        assert_eq!(
            GenNotifyFilter::parse_flags("decoration, tree"),
            Ok(GENNOTIFY_DECORATION | GENNOTIFY_TREE)
        );
        assert_eq!(GenNotifyFilter::parse_flags(""), Ok(0));
        assert_eq!(
            GenNotifyFilter::parse_flags("ore,dungeon"),
            Err(UnknownNotifyFlag("dungeon".into()))
        );
    }
}
