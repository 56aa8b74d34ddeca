//! Forest-to-RailSL translation.
//!
//! Translation is total and deterministic: it never fails, performs no I/O,
//! and its output is a pure function of the forest's current state. Malformed
//! input degrades the text (an empty value slot leaves a dangling fragment, a
//! defensively-detected cycle truncates a chain) instead of aborting, so the
//! editing surface can always show *something* for the current program.

use std::collections::HashSet;

use railblocks_types::{Forest, NodeData, NodeId, Slot};

/// Compile the forest to RailSL text.
///
/// The subtree under `entry` becomes the primary `Start: … End.` program.
/// Every other root is translated independently and appended inside a single
/// `/* … */` comment block, in creation order, separated by blank lines; the
/// block is omitted when there are no orphans.
pub fn compile(forest: &Forest, entry: NodeId) -> String {
    let mut generator = Generator {
        forest,
        visited: HashSet::new(),
    };
    let mut code = generator.translate_node(entry);

    let orphans: Vec<String> = forest
        .roots()
        .filter(|&root| root != entry)
        .map(|root| generator.translate_chain(Some(root)))
        .filter(|text| !text.is_empty())
        .collect();
    if !orphans.is_empty() {
        code.push_str("\n\n/*\n");
        code.push_str(&orphans.join("\n\n"));
        code.push_str("\n*/");
    }
    code
}

struct Generator<'a> {
    forest: &'a Forest,
    // Nodes already translated in this run. Edit operations keep the forest
    // acyclic and unshared, so a hit here means a corrupted forest; the walk
    // truncates instead of hanging.
    visited: HashSet<NodeId>,
}

impl Generator<'_> {
    /// Statement lines joined by newline, no trailing newline after the last.
    /// An empty slot yields the empty string.
    fn translate_chain(&mut self, head: Slot) -> String {
        let mut lines = Vec::new();
        let mut current = head;
        while let Some(id) = current {
            if self.visited.contains(&id) {
                break;
            }
            lines.push(self.translate_node(id));
            current = self.forest.node(id).and_then(|n| n.next);
        }
        lines.join("\n")
    }

    fn translate_node(&mut self, id: NodeId) -> String {
        if !self.visited.insert(id) {
            return String::new();
        }
        let Some(node) = self.forest.node(id) else {
            return String::new();
        };
        match &node.data {
            NodeData::Program { body } => {
                format!("Start:\n{}\nEnd.", self.translate_chain(*body))
            }
            NodeData::Loop { body } => {
                format!("Start:\n{}\nLoop.", self.translate_chain(*body))
            }
            NodeData::TrackSet { segments, vector } => {
                let names: Vec<&str> = segments.reps().iter().map(|s| s.name()).collect();
                format!(
                    "Set track {} to {}",
                    names.join(","),
                    self.vector_fragment(*vector)
                )
            }
            NodeData::TrackSetAlt { segments, vector } => {
                let names: Vec<&str> = segments.reps().iter().map(String::as_str).collect();
                format!(
                    "Set track {} to {}",
                    names.join(","),
                    self.vector_fragment(*vector)
                )
            }
            NodeData::PointSet { points, position } => {
                format!("Set point {} to {}.", join_numbers(points.reps()), position)
            }
            NodeData::LightSet { lights, state } => {
                format!("Turn light {} {}.", join_numbers(lights.reps()), state)
            }
            NodeData::TrackVectorStop | NodeData::TrackVectorDir { .. } => {
                vector_text(&node.data)
            }
            NodeData::ContactWait {
                event,
                contact,
                segment,
            } => {
                format!("{event} {contact} contact of {segment}.")
            }
            NodeData::TimeWait { duration_secs } => {
                format!("Wait for {duration_secs} seconds.")
            }
            NodeData::Crossing { action } => format!("{action} crossing."),
            NodeData::ConditionalStatic { guards, branches } => {
                let mut code = String::from("Branch:\n");
                for (guard, body) in guards.iter().zip(branches.iter()) {
                    let chain = self.translate_chain(*body);
                    code.push_str(&format!(
                        "If {} contact of {} is reached first, do\nStart:\n{}\nEnd.\n",
                        guard.contact, guard.segment, chain
                    ));
                }
                code
            }
            NodeData::ConditionalDynamic { branches } => {
                let reps: Vec<_> = branches
                    .reps()
                    .iter()
                    .map(|b| (b.guard, b.body))
                    .collect();
                let mut code = String::from("Branch:\n");
                for (guard, body) in reps {
                    let chain = self.translate_chain(body);
                    code.push_str(&format!(
                        "If {} contact of {} is reached first, do\nStart:\n{}\nEnd.\n",
                        guard.contact, guard.segment, chain
                    ));
                }
                code
            }
            NodeData::ParallelStatic { branches } => {
                let slots: Vec<Slot> = branches.to_vec();
                self.parallel_text(&slots)
            }
            NodeData::ParallelDynamic { branches } => {
                let slots: Vec<Slot> = branches.reps().iter().map(|b| b.body).collect();
                self.parallel_text(&slots)
            }
        }
    }

    fn parallel_text(&mut self, branches: &[Slot]) -> String {
        let mut code = String::from("Parallel:\n");
        for body in branches {
            let chain = self.translate_chain(*body);
            code.push_str(&format!("Start:\n{chain}\nEnd.\n"));
        }
        code.push_str("Join.");
        code
    }

    /// The atomic fragment of a track value slot. An empty or mistyped slot
    /// contributes the empty string rather than aborting.
    fn vector_fragment(&self, slot: Slot) -> String {
        match slot.and_then(|id| self.forest.data(id)) {
            Some(data) if data.is_value() => vector_text(data),
            _ => String::new(),
        }
    }
}

fn vector_text(data: &NodeData) -> String {
    match data {
        NodeData::TrackVectorStop => "stop.".to_string(),
        NodeData::TrackVectorDir { speed, reverse } => {
            if *reverse {
                format!("{speed} reverse.")
            } else {
                format!("{speed}.")
            }
        }
        _ => String::new(),
    }
}

fn join_numbers(values: &[u32]) -> String {
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
