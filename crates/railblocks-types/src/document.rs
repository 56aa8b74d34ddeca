//! Persisted document format.
//!
//! A document is a flat list of node records: type tag, scalar fields,
//! desired arity and outgoing links, all by numeric id. Only the *desired*
//! arity of dynamic-arity nodes is stored; their shape is rematerialized by
//! reconciliation on load, so a hand-edited arity cannot produce a
//! half-materialized node. Record order is creation order, which keeps the
//! orphan block of the generated text stable across a save/load cycle.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::forest::Forest;
use crate::node::{
    ContactEvent, ContactIndex, CrossingAction, LightState, NodeData, NodeId, PointPosition,
    SlotRef, Speed,
};
use crate::segment::Segment;

// ══════════════════════════════════════════════════════════════════════════════
// Records
// ══════════════════════════════════════════════════════════════════════════════

/// A scalar field value. Untagged on the wire: `true`, `3`, `"KH_ST_0"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(u32),
    Text(String),
}

/// One persisted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: u32,
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_arity: Option<usize>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub slots: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
}

/// A complete persisted forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<NodeRecord>,
}

// ══════════════════════════════════════════════════════════════════════════════
// Save
// ══════════════════════════════════════════════════════════════════════════════

impl Document {
    /// Snapshot a forest. Ids are densified to creation order, so the entry
    /// root is always record 0.
    pub fn save(forest: &Forest) -> Document {
        let remap: HashMap<NodeId, u32> = forest
            .iter()
            .enumerate()
            .map(|(dense, (id, _))| (id, dense as u32))
            .collect();

        let nodes = forest
            .iter()
            .enumerate()
            .map(|(dense, (_, node))| {
                let mut slots = BTreeMap::new();
                for (slot_ref, _, value) in node.data.slots() {
                    if let Some(child) = value {
                        if let Some(&target) = remap.get(&child) {
                            slots.insert(slot_name(&node.data, slot_ref), target);
                        }
                    }
                }
                NodeRecord {
                    id: dense as u32,
                    kind: node.data.kind_name().to_string(),
                    fields: save_fields(&node.data),
                    desired_arity: node.data.desired_arity(),
                    slots,
                    next: node.next.and_then(|n| remap.get(&n).copied()),
                }
            })
            .collect();

        Document { nodes }
    }

    /// Rebuild a forest. Nodes are recreated first (record order), dynamic
    /// groups rematerialized from the stored desired arity, fields restored
    /// in repetition order, and linkage reconnected through the edit
    /// operations last so every stored edge is re-validated.
    pub fn load(&self) -> Result<Forest, DocumentError> {
        let mut seen = HashSet::new();
        for record in &self.nodes {
            if !seen.insert(record.id) {
                return Err(DocumentError::DuplicateId(record.id));
            }
        }

        let mut forest = Forest::new();
        let mut by_id: HashMap<u32, NodeId> = HashMap::new();
        for record in &self.nodes {
            if record.id == 0 {
                if record.kind != "Program" {
                    return Err(DocumentError::MissingEntryRoot);
                }
                by_id.insert(0, forest.entry());
                continue;
            }
            if record.kind == "Program" {
                return Err(bad(record.id, "kind", "only the entry root may be a Program node"));
            }
            let data = load_data(record)?;
            by_id.insert(record.id, forest.add_node(data));
        }
        if !by_id.contains_key(&0) {
            return Err(DocumentError::MissingEntryRoot);
        }

        for record in &self.nodes {
            let Some(&from) = by_id.get(&record.id) else {
                continue;
            };
            for (name, target) in &record.slots {
                let slot = parse_slot_name(name)
                    .ok_or_else(|| DocumentError::UnknownSlot(record.id, name.clone()))?;
                let child = *by_id.get(target).ok_or(DocumentError::DanglingLink {
                    from: record.id,
                    to: *target,
                })?;
                forest
                    .connect_slot(from, slot, child)
                    .map_err(|source| DocumentError::Link { id: record.id, source })?;
            }
            if let Some(target) = record.next {
                let child = *by_id.get(&target).ok_or(DocumentError::DanglingLink {
                    from: record.id,
                    to: target,
                })?;
                forest
                    .connect_next(from, child)
                    .map_err(|source| DocumentError::Link { id: record.id, source })?;
            }
        }
        Ok(forest)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Document, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Field & slot naming
// ══════════════════════════════════════════════════════════════════════════════

fn slot_name(data: &NodeData, slot: SlotRef) -> String {
    match (data, slot) {
        (NodeData::Program { .. }, SlotRef::Body) => "MAIN_BLOCK".to_string(),
        (_, SlotRef::Body) => "LOOP_CONTENT".to_string(),
        (_, SlotRef::Vector) => "SET_TRACK".to_string(),
        (NodeData::ConditionalStatic { .. } | NodeData::ConditionalDynamic { .. }, SlotRef::Branch(i)) => {
            format!("COND_BLOCK{i}")
        }
        (_, SlotRef::Branch(i)) => format!("PARA_BLOCK{i}"),
    }
}

fn parse_slot_name(name: &str) -> Option<SlotRef> {
    match name {
        "MAIN_BLOCK" | "LOOP_CONTENT" => Some(SlotRef::Body),
        "SET_TRACK" => Some(SlotRef::Vector),
        _ => {
            let index = name
                .strip_prefix("COND_BLOCK")
                .or_else(|| name.strip_prefix("PARA_BLOCK"))?;
            index.parse().ok().map(SlotRef::Branch)
        }
    }
}

fn text(value: &str) -> FieldValue {
    FieldValue::Text(value.to_string())
}

fn save_fields(data: &NodeData) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    match data {
        NodeData::TrackSet { segments, .. } => {
            for (i, seg) in segments.reps().iter().enumerate() {
                fields.insert(format!("SEGMENT{i}"), text(seg.name()));
            }
        }
        NodeData::TrackSetAlt { segments, .. } => {
            for (i, seg) in segments.reps().iter().enumerate() {
                fields.insert(format!("SEGMENT{i}"), text(seg));
            }
        }
        NodeData::PointSet { points, position } => {
            for (i, point) in points.reps().iter().enumerate() {
                fields.insert(format!("POINT{i}"), FieldValue::Number(*point));
            }
            fields.insert("POSITION".to_string(), text(position.as_str()));
        }
        NodeData::LightSet { lights, state } => {
            for (i, light) in lights.reps().iter().enumerate() {
                fields.insert(format!("LIGHT{i}"), FieldValue::Number(*light));
            }
            fields.insert("STATE".to_string(), text(state.as_str()));
        }
        NodeData::TrackVectorDir { speed, reverse } => {
            fields.insert("SPEED".to_string(), text(speed.as_str()));
            fields.insert("REVERSE".to_string(), FieldValue::Bool(*reverse));
        }
        NodeData::ContactWait {
            event,
            contact,
            segment,
        } => {
            fields.insert("EVENT".to_string(), text(event.as_str()));
            fields.insert("CONTACT".to_string(), text(contact.as_str()));
            fields.insert("SEGMENT".to_string(), text(segment.name()));
        }
        NodeData::TimeWait { duration_secs } => {
            fields.insert("DURATION".to_string(), FieldValue::Number(*duration_secs));
        }
        NodeData::Crossing { action } => {
            fields.insert("ACTION".to_string(), text(action.as_str()));
        }
        NodeData::ConditionalStatic { guards, .. } => {
            for (i, guard) in guards.iter().enumerate() {
                fields.insert(format!("CONTACT{i}"), text(guard.contact.as_str()));
                fields.insert(format!("SEGMENT{i}"), text(guard.segment.name()));
            }
        }
        NodeData::ConditionalDynamic { branches } => {
            for (i, branch) in branches.reps().iter().enumerate() {
                fields.insert(format!("CONTACT{i}"), text(branch.guard.contact.as_str()));
                fields.insert(format!("SEGMENT{i}"), text(branch.guard.segment.name()));
            }
        }
        _ => {}
    }
    fields
}

// ══════════════════════════════════════════════════════════════════════════════
// Load
// ══════════════════════════════════════════════════════════════════════════════

fn bad(id: u32, field: &str, reason: &str) -> DocumentError {
    DocumentError::BadField {
        id,
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn text_field<'a>(
    record: &'a NodeRecord,
    key: &str,
) -> Result<Option<&'a str>, DocumentError> {
    match record.fields.get(key) {
        None => Ok(None),
        Some(FieldValue::Text(s)) => Ok(Some(s)),
        Some(_) => Err(bad(record.id, key, "must be a string")),
    }
}

fn number_field(record: &NodeRecord, key: &str) -> Result<Option<u32>, DocumentError> {
    match record.fields.get(key) {
        None => Ok(None),
        Some(FieldValue::Number(n)) => Ok(Some(*n)),
        Some(_) => Err(bad(record.id, key, "must be a number")),
    }
}

fn bool_field(record: &NodeRecord, key: &str) -> Result<Option<bool>, DocumentError> {
    match record.fields.get(key) {
        None => Ok(None),
        Some(FieldValue::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(bad(record.id, key, "must be a boolean")),
    }
}

fn segment_field(record: &NodeRecord, key: &str) -> Result<Option<Segment>, DocumentError> {
    match text_field(record, key)? {
        None => Ok(None),
        Some(name) => Segment::parse(name)
            .map(Some)
            .ok_or_else(|| bad(record.id, key, "names no known segment")),
    }
}

/// Parse a two-way keyword field, falling back to the type default when the
/// field is absent.
fn keyword_field<T: Default>(
    record: &NodeRecord,
    key: &str,
    parse: fn(&str) -> Option<T>,
) -> Result<T, DocumentError> {
    match text_field(record, key)? {
        None => Ok(T::default()),
        Some(s) => parse(s).ok_or_else(|| bad(record.id, key, "is not a valid keyword")),
    }
}

fn load_data(record: &NodeRecord) -> Result<NodeData, DocumentError> {
    let desired = record.desired_arity.unwrap_or(1);
    let mut data = match record.kind.as_str() {
        "Loop" => NodeData::loop_statement(),
        "TrackSet" => NodeData::track_set(),
        "TrackSetAlt" => NodeData::track_set_alt(),
        "PointSet" => NodeData::point_set(),
        "LightSet" => NodeData::light_set(),
        "TrackVectorStop" => NodeData::TrackVectorStop,
        "TrackVectorDir" => NodeData::TrackVectorDir {
            speed: keyword_field(record, "SPEED", Speed::parse)?,
            reverse: bool_field(record, "REVERSE")?.unwrap_or(false),
        },
        "ContactWait" => NodeData::ContactWait {
            event: keyword_field(record, "EVENT", ContactEvent::parse)?,
            contact: keyword_field(record, "CONTACT", ContactIndex::parse)?,
            segment: segment_field(record, "SEGMENT")?.unwrap_or_default(),
        },
        "TimeWait" => NodeData::TimeWait {
            duration_secs: number_field(record, "DURATION")?.unwrap_or(0),
        },
        "Crossing" => NodeData::Crossing {
            action: keyword_field(record, "ACTION", CrossingAction::parse)?,
        },
        "ConditionalStatic" => NodeData::conditional_static(),
        "ConditionalDynamic" => NodeData::conditional_dynamic(),
        "ParallelStatic" => NodeData::parallel_static(),
        "ParallelDynamic" => NodeData::parallel_dynamic(),
        other => return Err(DocumentError::UnknownKind(other.to_string())),
    };

    // Rematerialize dynamic groups from the stored desired arity, then
    // restore repetition fields in index order.
    match &mut data {
        NodeData::TrackSet { segments, .. } => {
            segments.set_desired(desired);
            segments.reconcile();
            for i in 0..segments.actual() {
                if let Some(seg) = segment_field(record, &format!("SEGMENT{i}"))? {
                    if let Some(rep) = segments.get_mut(i) {
                        *rep = seg;
                    }
                }
            }
        }
        NodeData::TrackSetAlt { segments, .. } => {
            segments.set_desired(desired);
            segments.reconcile();
            for i in 0..segments.actual() {
                if let Some(name) = text_field(record, &format!("SEGMENT{i}"))? {
                    if let Some(rep) = segments.get_mut(i) {
                        *rep = name.to_string();
                    }
                }
            }
        }
        NodeData::PointSet { points, position } => {
            points.set_desired(desired);
            points.reconcile();
            for i in 0..points.actual() {
                if let Some(n) = number_field(record, &format!("POINT{i}"))? {
                    if let Some(rep) = points.get_mut(i) {
                        *rep = n;
                    }
                }
            }
            *position = keyword_field(record, "POSITION", PointPosition::parse)?;
        }
        NodeData::LightSet { lights, state } => {
            lights.set_desired(desired);
            lights.reconcile();
            for i in 0..lights.actual() {
                if let Some(n) = number_field(record, &format!("LIGHT{i}"))? {
                    if let Some(rep) = lights.get_mut(i) {
                        *rep = n;
                    }
                }
            }
            *state = keyword_field(record, "STATE", LightState::parse)?;
        }
        NodeData::ConditionalStatic { guards, .. } => {
            for (i, guard) in guards.iter_mut().enumerate() {
                guard.contact =
                    keyword_field(record, &format!("CONTACT{i}"), ContactIndex::parse)?;
                guard.segment = segment_field(record, &format!("SEGMENT{i}"))?.unwrap_or_default();
            }
        }
        NodeData::ConditionalDynamic { branches } => {
            branches.set_desired(desired);
            branches.reconcile();
            for i in 0..branches.actual() {
                let contact =
                    keyword_field(record, &format!("CONTACT{i}"), ContactIndex::parse)?;
                let segment = segment_field(record, &format!("SEGMENT{i}"))?.unwrap_or_default();
                if let Some(branch) = branches.get_mut(i) {
                    branch.guard.contact = contact;
                    branch.guard.segment = segment;
                }
            }
        }
        NodeData::ParallelDynamic { branches } => {
            branches.set_desired(desired);
            branches.reconcile();
        }
        _ => {}
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::BranchGuard;

    fn sample_forest() -> Forest {
        let mut forest = Forest::new();
        let track = forest.add_node(NodeData::track_set());
        forest.set_desired_arity(track, 2).unwrap();
        forest.reconcile(track);
        if let Some(NodeData::TrackSet { segments, .. }) = forest.data_mut(track) {
            *segments.get_mut(1).unwrap() = Segment::OC_LN_3;
        }
        let vector = forest.add_node(NodeData::TrackVectorDir {
            speed: Speed::Slow,
            reverse: true,
        });
        forest.connect_slot(track, SlotRef::Vector, vector).unwrap();
        let wait = forest.add_node(NodeData::TimeWait { duration_secs: 5 });
        forest.connect_next(track, wait).unwrap();
        forest
            .connect_slot(forest.entry(), SlotRef::Body, track)
            .unwrap();
        forest
    }

    #[test]
    fn test_save_load_roundtrip() {
        let forest = sample_forest();
        let doc = Document::save(&forest);
        let restored = doc.load().unwrap();
        assert_eq!(restored, forest);
        assert_eq!(Document::save(&restored), doc);
    }

    #[test]
    fn test_json_roundtrip() {
        let doc = Document::save(&sample_forest());
        let json = doc.to_json().unwrap();
        assert_eq!(Document::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn test_desired_arity_rematerializes_with_defaults() {
        let mut record = NodeRecord {
            id: 1,
            kind: "TrackSet".to_string(),
            fields: BTreeMap::new(),
            desired_arity: Some(3),
            slots: BTreeMap::new(),
            next: None,
        };
        record
            .fields
            .insert("SEGMENT0".to_string(), FieldValue::Text("IC_ST_2".to_string()));
        let doc = Document {
            nodes: vec![
                NodeRecord {
                    id: 0,
                    kind: "Program".to_string(),
                    fields: BTreeMap::new(),
                    desired_arity: None,
                    slots: BTreeMap::new(),
                    next: None,
                },
                record,
            ],
        };
        let forest = doc.load().unwrap();
        let (_, node) = forest.iter().nth(1).unwrap();
        match &node.data {
            NodeData::TrackSet { segments, .. } => {
                assert_eq!(
                    segments.reps(),
                    &[Segment::IC_ST_2, Segment::KH_ST_0, Segment::KH_ST_0]
                );
                assert!(segments.is_settled());
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_guards_roundtrip() {
        let mut forest = Forest::new();
        let cond = forest.add_node(NodeData::conditional_static());
        if let Some(NodeData::ConditionalStatic { guards, .. }) = forest.data_mut(cond) {
            guards[1] = BranchGuard {
                contact: ContactIndex::Second,
                segment: Segment::KH_LN_4,
            };
        }
        let restored = Document::save(&forest).load().unwrap();
        assert_eq!(restored, forest);
    }

    #[test]
    fn test_missing_entry_root_rejected() {
        let doc = Document {
            nodes: vec![NodeRecord {
                id: 1,
                kind: "Crossing".to_string(),
                fields: BTreeMap::new(),
                desired_arity: None,
                slots: BTreeMap::new(),
                next: None,
            }],
        };
        assert!(matches!(doc.load(), Err(DocumentError::MissingEntryRoot)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let doc = Document {
            nodes: vec![
                NodeRecord {
                    id: 0,
                    kind: "Program".to_string(),
                    fields: BTreeMap::new(),
                    desired_arity: None,
                    slots: BTreeMap::new(),
                    next: None,
                },
                NodeRecord {
                    id: 1,
                    kind: "Teleport".to_string(),
                    fields: BTreeMap::new(),
                    desired_arity: None,
                    slots: BTreeMap::new(),
                    next: None,
                },
            ],
        };
        assert!(matches!(doc.load(), Err(DocumentError::UnknownKind(k)) if k == "Teleport"));
    }

    #[test]
    fn test_bad_segment_name_rejected() {
        let mut fields = BTreeMap::new();
        fields.insert(
            "SEGMENT".to_string(),
            FieldValue::Text("NOWHERE_9".to_string()),
        );
        let doc = Document {
            nodes: vec![
                NodeRecord {
                    id: 0,
                    kind: "Program".to_string(),
                    fields: BTreeMap::new(),
                    desired_arity: None,
                    slots: BTreeMap::new(),
                    next: None,
                },
                NodeRecord {
                    id: 1,
                    kind: "ContactWait".to_string(),
                    fields,
                    desired_arity: None,
                    slots: BTreeMap::new(),
                    next: None,
                },
            ],
        };
        assert!(matches!(doc.load(), Err(DocumentError::BadField { .. })));
    }

    #[test]
    fn test_dangling_link_rejected() {
        let mut slots = BTreeMap::new();
        slots.insert("MAIN_BLOCK".to_string(), 9);
        let doc = Document {
            nodes: vec![NodeRecord {
                id: 0,
                kind: "Program".to_string(),
                fields: BTreeMap::new(),
                desired_arity: None,
                slots,
                next: None,
            }],
        };
        assert!(matches!(
            doc.load(),
            Err(DocumentError::DanglingLink { from: 0, to: 9 })
        ));
    }
}
