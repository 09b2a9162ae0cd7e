//! Diff desired documentation parts against the parts already published.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::{DocumentationPart, Location};

/// A part as stored by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePart {
    pub id: String,
    pub location: Location,
    pub properties: Map<String, Value>,
}

/// One remote call needed to converge.
#[derive(Debug, Clone, PartialEq)]
pub enum PartChange {
    Create(DocumentationPart),
    Update { id: String, part: DocumentationPart },
    Delete { id: String, location: Location },
}

impl PartChange {
    pub fn location(&self) -> &Location {
        match self {
            Self::Create(part) | Self::Update { part, .. } => &part.location,
            Self::Delete { location, .. } => location,
        }
    }
}

/// The changes needed to turn the remote set into the desired set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartPlan {
    pub changes: Vec<PartChange>,
    pub unchanged: usize,
}

impl PartPlan {
    pub fn creates(&self) -> usize {
        self.count(|c| matches!(c, PartChange::Create(_)))
    }

    pub fn updates(&self) -> usize {
        self.count(|c| matches!(c, PartChange::Update { .. }))
    }

    pub fn deletes(&self) -> usize {
        self.count(|c| matches!(c, PartChange::Delete { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn count(&self, pred: impl Fn(&PartChange) -> bool) -> usize {
        self.changes.iter().filter(|c| pred(c)).count()
    }
}

/// Match parts by normalized location.
///
/// Desired-only parts are created, remote-only parts deleted, and parts
/// whose properties differ updated. If the remote holds several parts at
/// one location, the first is kept and the rest are deleted.
pub fn diff(desired: &[DocumentationPart], remote: &[RemotePart]) -> PartPlan {
    let mut by_location: BTreeMap<Location, &RemotePart> = BTreeMap::new();
    let mut plan = PartPlan::default();

    for part in remote {
        let location = part.location.clone().normalized();
        if by_location.contains_key(&location) {
            plan.changes.push(PartChange::Delete {
                id: part.id.clone(),
                location,
            });
        } else {
            by_location.insert(location, part);
        }
    }

    let mut desired_by_location: BTreeMap<Location, &DocumentationPart> = BTreeMap::new();
    for part in desired {
        desired_by_location.insert(part.location.clone().normalized(), part);
    }

    for (location, part) in &desired_by_location {
        match by_location.remove(location) {
            None => plan.changes.push(PartChange::Create(DocumentationPart {
                location: location.clone(),
                properties: part.properties.clone(),
            })),
            Some(existing) if existing.properties == part.properties => plan.unchanged += 1,
            Some(existing) => plan.changes.push(PartChange::Update {
                id: existing.id.clone(),
                part: DocumentationPart {
                    location: location.clone(),
                    properties: part.properties.clone(),
                },
            }),
        }
    }

    for (location, stale) in by_location {
        plan.changes.push(PartChange::Delete {
            id: stale.id.clone(),
            location,
        });
    }

    plan
}
