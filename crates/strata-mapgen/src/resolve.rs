//! Second phase of content registration: node names → node ids.
//!
//! Definitions reference nodes by name so they can be registered before the node
//! set is complete. [`NameResolver`] looks every name up once the node registry is
//! frozen and records failures in a [`ResolveReport`].

use strata_voxel::{NodeId, NodeRegistry};

use crate::error::ResolveError;

/// Outcome of resolving all registered content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Every name that failed to resolve.
    pub errors: Vec<ResolveError>,
    /// Records that were marked inert, as `(kind, name)`.
    pub inert: Vec<(&'static str, String)>,
}

impl ResolveReport {
    /// Returns `true` when every name resolved.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of inert records.
    pub fn inert_count(&self) -> usize {
        self.inert.len()
    }
}

/// Resolves the node names of a single record.
///
/// Any unresolved name marks the record failed; [`finish`](Self::finish) reports it.
pub struct NameResolver<'a> {
    nodes: &'a NodeRegistry,
    report: &'a mut ResolveReport,
    kind: &'static str,
    record: &'a str,
    failed: bool,
}

impl<'a> NameResolver<'a> {
    pub fn new(
        nodes: &'a NodeRegistry,
        report: &'a mut ResolveReport,
        kind: &'static str,
        record: &'a str,
    ) -> Self {
        Self {
            nodes,
            report,
            kind,
            record,
            failed: false,
        }
    }

    fn lookup(&mut self, name: &str) -> Option<NodeId> {
        let found = self.nodes.lookup_by_name(name);
        if found.is_none() {
            self.failed = true;
            self.report.errors.push(ResolveError {
                kind: self.kind,
                record: self.record.to_string(),
                node: name.to_string(),
            });
        }
        found
    }

    /// Resolves a name that may be left empty. An empty name resolves to `None`.
    pub fn optional(&mut self, name: &str) -> Option<NodeId> {
        if name.is_empty() {
            return None;
        }
        self.lookup(name)
    }

    /// Resolves a name that must be present. Failure yields air and marks the record.
    pub fn required(&mut self, name: &str) -> NodeId {
        self.lookup(name).unwrap_or(NodeId::AIR)
    }

    /// Resolves every name in a list, keeping only those that were found.
    pub fn list(&mut self, names: &[String]) -> Vec<NodeId> {
        names.iter().filter_map(|n| self.lookup(n)).collect()
    }

    /// Returns `true` if every name resolved; otherwise records the record as inert.
    pub fn finish(self) -> bool {
        if self.failed {
            tracing::warn!(
                "{} '{}' has unresolved node names and will not be placed",
                self.kind,
                self.record
            );
            self.report
                .inert
                .push((self.kind, self.record.to_string()));
        }
        !self.failed
    }
}
