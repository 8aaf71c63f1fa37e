//! # Document-Level Consistency
//!
//! Rules no single field can express:
//!
//! - Node names are unique within `Nodes`.
//! - Every Edge `Source`/`Destination` names an existing Node, no Edge
//!   connects a Node to itself, and the Edges form no cycle.
//! - Within a Node, Contrast names are unique and disjoint from the
//!   variables listed in `DummyContrasts.Contrasts`, which are themselves
//!   unique.
//! - Each Contrast holds exactly as many weights as `ConditionList` has
//!   entries, counted across all rows of a 2-D array. A 2-D array is only
//!   allowed when the test is not `t`.
//!
//! [`check_document`] reads the typed tree of a structurally valid
//! document. [`check_document_value`] applies the same rules to a document
//! the structural pass rejected: names and endpoints are read as plain
//! strings, and a Node or Contrast is checked in full only when it is
//! structurally clean on its own.
//!
//! Violations are anchored at the containing entity (the root, a Node, an
//! Edge or a Contrast) since no single field is at fault.

use std::collections::{BTreeSet, HashMap};

use bsm_core::{BidsStatsModel, Contrast, FieldPath, Node};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::registry;
use crate::structural;
use crate::violation::Violation;

/// An Edge's `(Source, Destination)`; `None` where the endpoint is not a
/// string.
type Endpoints<'a> = (Option<&'a str>, Option<&'a str>);

/// Run every document-level check on a structurally valid document.
pub fn check_document(model: &BidsStatsModel, out: &mut Vec<Violation>) {
    let nodes_path = FieldPath::root().key("Nodes");
    let names: Vec<Option<&str>> = model.nodes.iter().map(|n| Some(n.name.as_str())).collect();

    check_node_names(&names, &nodes_path, out);
    for (i, node) in model.nodes.iter().enumerate() {
        check_node(node, &nodes_path.index(i), out);
    }

    let edges: Vec<Endpoints<'_>> = model
        .edges()
        .iter()
        .map(|e| (Some(e.source.as_str()), Some(e.destination.as_str())))
        .collect();
    check_edges(&names, &edges, out);
}

/// Run the document-level checks that still apply to a document with
/// structural violations.
pub fn check_document_value(value: &Value, out: &mut Vec<Violation>) {
    let Some(nodes) = value.get("Nodes").and_then(Value::as_array) else {
        return;
    };
    let nodes_path = FieldPath::root().key("Nodes");
    let names: Vec<Option<&str>> = nodes.iter().map(|n| str_field(n, "Name")).collect();

    check_node_names(&names, &nodes_path, out);
    for (i, node) in nodes.iter().enumerate() {
        let path = nodes_path.index(i);
        match decode_clean::<Node>("Node", node) {
            Some(node) => check_node(&node, &path, out),
            None => check_node_value(node, &path, out),
        }
    }

    let edges: Vec<Endpoints<'_>> = value
        .get("Edges")
        .and_then(Value::as_array)
        .map(|edges| {
            edges
                .iter()
                .map(|e| (str_field(e, "Source"), str_field(e, "Destination")))
                .collect()
        })
        .unwrap_or_default();
    check_edges(&names, &edges, out);
}

fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// `value` as a `T`, if it passes the structural checks for `record` on
/// its own.
fn decode_clean<T: DeserializeOwned>(record: &str, value: &Value) -> Option<T> {
    let def = registry::record(record)?;
    let mut violations = Vec::new();
    structural::check_record(def, value, &FieldPath::root(), &mut violations).ok()?;
    if !violations.is_empty() {
        return None;
    }
    <T as serde::Deserialize>::deserialize(value).ok()
}

fn check_node_names(names: &[Option<&str>], nodes_path: &FieldPath, out: &mut Vec<Violation>) {
    let mut first_index: HashMap<&str, usize> = HashMap::new();
    for (i, name) in names.iter().enumerate() {
        let Some(name) = *name else { continue };
        if let Some(first) = first_index.get(name) {
            out.push(Violation::inconsistent(
                nodes_path.index(i),
                format!("duplicate Node name {name:?}; first defined at Nodes[{first}]"),
            ));
        } else {
            first_index.insert(name, i);
        }
    }
}

fn check_edges(names: &[Option<&str>], edges: &[Endpoints<'_>], out: &mut Vec<Violation>) {
    let edges_path = FieldPath::root().key("Edges");
    // Endpoints are only judged when every Node has a readable name.
    let known: Option<BTreeSet<&str>> = names.iter().copied().collect();

    for (i, (source, destination)) in edges.iter().enumerate() {
        if let Some(known) = &known {
            for (role, endpoint) in [("Source", source), ("Destination", destination)] {
                if let Some(name) = endpoint {
                    if !known.contains(name) {
                        out.push(Violation::inconsistent(
                            edges_path.index(i),
                            format!("{role} {name:?} does not name a Node"),
                        ));
                    }
                }
            }
        }
        if let (Some(source), Some(destination)) = (source, destination) {
            if source == destination {
                out.push(Violation::inconsistent(
                    edges_path.index(i),
                    format!("Edge connects Node {source:?} to itself"),
                ));
            }
        }
    }

    let cyclic = nodes_on_cycles(names, edges);
    if !cyclic.is_empty() {
        out.push(Violation::inconsistent(
            FieldPath::root(),
            format!("Edges form a cycle among Nodes: {}", cyclic.join(", ")),
        ));
    }
}

/// Names of Nodes that lie on (or between) cycles of the Edge graph, in
/// `Nodes` order. Self-loops and dangling endpoints are reported elsewhere
/// and ignored here.
fn nodes_on_cycles(names: &[Option<&str>], edges: &[Endpoints<'_>]) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    for name in names.iter().copied().flatten() {
        if !order.contains(&name) {
            order.push(name);
        }
    }

    let edges: BTreeSet<(&str, &str)> = edges
        .iter()
        .filter_map(|(s, d)| Some(((*s)?, (*d)?)))
        .filter(|(s, d)| s != d && order.contains(s) && order.contains(d))
        .collect();

    // Peel sources (no incoming edge) and sinks (no outgoing edge) until
    // neither remains; what is left is on or between cycles.
    let mut remaining: BTreeSet<&str> = order.iter().copied().collect();
    loop {
        let live = |(s, d): &&(&str, &str)| remaining.contains(s) && remaining.contains(d);
        let peel: Vec<&str> = remaining
            .iter()
            .copied()
            .filter(|n| {
                let has_in = edges.iter().filter(live).any(|(_, d)| d == n);
                let has_out = edges.iter().filter(live).any(|(s, _)| s == n);
                !has_in || !has_out
            })
            .collect();
        if peel.is_empty() {
            break;
        }
        for n in peel {
            remaining.remove(n);
        }
    }

    order
        .into_iter()
        .filter(|n| remaining.contains(n))
        .map(str::to_string)
        .collect()
}

/// Node-local checks: contrast naming, then each contrast's weights.
pub fn check_node(node: &Node, path: &FieldPath, out: &mut Vec<Violation>) {
    let names: Vec<Option<&str>> = node
        .contrasts()
        .iter()
        .map(|c| Some(c.name.as_str()))
        .collect();
    let dummies: Vec<&str> = node
        .dummy_contrasts
        .as_ref()
        .and_then(|d| d.contrasts.as_deref())
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect();
    check_contrast_names(&names, &dummies, path, out);

    let contrasts_path = path.key("Contrasts");
    for (j, contrast) in node.contrasts().iter().enumerate() {
        check_contrast(contrast, &contrasts_path.index(j), out);
    }
}

/// Node-local checks on a Node with structural violations. Only the
/// Contrasts that are structurally clean have their weights checked.
pub fn check_node_value(node: &Value, path: &FieldPath, out: &mut Vec<Violation>) {
    let contrasts: &[Value] = node
        .get("Contrasts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let names: Vec<Option<&str>> = contrasts.iter().map(|c| str_field(c, "Name")).collect();
    let dummies: Vec<&str> = node
        .get("DummyContrasts")
        .and_then(|d| d.get("Contrasts"))
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    check_contrast_names(&names, &dummies, path, out);

    let contrasts_path = path.key("Contrasts");
    for (j, value) in contrasts.iter().enumerate() {
        if let Some(contrast) = decode_clean::<Contrast>("Contrast", value) {
            check_contrast(&contrast, &contrasts_path.index(j), out);
        }
    }
}

fn check_contrast_names(
    names: &[Option<&str>],
    dummies: &[&str],
    path: &FieldPath,
    out: &mut Vec<Violation>,
) {
    let mut first_index: HashMap<&str, usize> = HashMap::new();
    for (j, name) in names.iter().enumerate() {
        let Some(name) = *name else { continue };
        if let Some(first) = first_index.get(name) {
            out.push(Violation::inconsistent(
                path.clone(),
                format!(
                    "Contrasts[{j}] repeats Contrast name {name:?} first used by Contrasts[{first}]"
                ),
            ));
        } else {
            first_index.insert(name, j);
        }
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for &name in dummies {
        if !seen.insert(name) {
            out.push(Violation::inconsistent(
                path.clone(),
                format!("DummyContrasts.Contrasts lists {name:?} more than once"),
            ));
        }
        if let Some(j) = first_index.get(name) {
            out.push(Violation::inconsistent(
                path.clone(),
                format!(
                    "Contrasts[{j}] name {name:?} collides with a dummy contrast of the same name"
                ),
            ));
        }
    }
}

/// Weights cardinality against `ConditionList`, and the `t`-test arity rule.
///
/// The count is the total number of weights in either shape; how a 2-D
/// array splits them into rows is not constrained.
pub fn check_contrast(contrast: &Contrast, path: &FieldPath, out: &mut Vec<Violation>) {
    let conditions = contrast.condition_list.len();
    let weights = contrast.weights.element_count();
    if weights != conditions {
        out.push(Violation::inconsistent(
            path.clone(),
            format!("Weights has {weights} element(s) but ConditionList has {conditions}"),
        ));
    }

    if contrast.weights.is_matrix() && !contrast.test.allows_matrix_weights() {
        out.push(Violation::inconsistent(
            path.clone(),
            format!(
                "Test {:?} requires 1-D Weights, got {} row(s)",
                contrast.test.as_str(),
                contrast.weights.row_count()
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node(name: &str) -> serde_json::Value {
        json!({
            "Level": "Run",
            "Name": name,
            "GroupBy": [],
            "Model": {"Type": "glm", "X": [1]}
        })
    }

    fn model(nodes: Vec<serde_json::Value>, edges: serde_json::Value) -> BidsStatsModel {
        serde_json::from_value(json!({
            "Name": "m",
            "BIDSModelVersion": "1.0.0",
            "Nodes": nodes,
            "Edges": edges
        }))
        .unwrap()
    }

    fn contrast(conditions: serde_json::Value, weights: serde_json::Value, test: &str) -> Contrast {
        serde_json::from_value(json!({
            "Name": "c",
            "ConditionList": conditions,
            "Weights": weights,
            "Test": test
        }))
        .unwrap()
    }

    fn contrast_violations(c: &Contrast) -> Vec<Violation> {
        let mut out = Vec::new();
        check_contrast(c, &FieldPath::root(), &mut out);
        out
    }

    #[test]
    fn test_chain_is_consistent() {
        let m = model(
            vec![node("run"), node("subject"), node("dataset")],
            json!([
                {"Source": "run", "Destination": "subject"},
                {"Source": "subject", "Destination": "dataset"}
            ]),
        );
        let mut out = Vec::new();
        check_document(&m, &mut out);
        assert!(out.is_empty(), "{out:?}");
    }

    #[test]
    fn test_duplicate_node_names() {
        let m = model(vec![node("subject"), node("subject")], json!([]));
        let mut out = Vec::new();
        check_document(&m, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "Nodes[1]");
        assert!(out[0].to_string().contains("duplicate Node name \"subject\""));
    }

    #[test]
    fn test_dangling_edge_endpoints() {
        let m = model(
            vec![node("run")],
            json!([{"Source": "run", "Destination": "subjcet"}]),
        );
        let mut out = Vec::new();
        check_document(&m, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].path.to_string(), "Edges[0]");
        assert!(out[0].to_string().contains("Destination \"subjcet\" does not name a Node"));
    }

    #[test]
    fn test_self_loop() {
        let m = model(vec![node("run")], json!([{"Source": "run", "Destination": "run"}]));
        let mut out = Vec::new();
        check_document(&m, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].to_string().contains("to itself"));
    }

    #[test]
    fn test_cycle_reports_only_cyclic_nodes() {
        let m = model(
            vec![node("run"), node("a"), node("b"), node("leaf")],
            json!([
                {"Source": "run", "Destination": "a"},
                {"Source": "a", "Destination": "b"},
                {"Source": "b", "Destination": "a"},
                {"Source": "b", "Destination": "leaf"}
            ]),
        );
        let mut out = Vec::new();
        check_document(&m, &mut out);
        assert_eq!(out.len(), 1);
        assert!(out[0].path.is_root());
        assert!(out[0].to_string().ends_with("cycle among Nodes: a, b"), "{}", out[0]);
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let m = model(
            vec![node("run"), node("l"), node("r"), node("d")],
            json!([
                {"Source": "run", "Destination": "l"},
                {"Source": "run", "Destination": "r"},
                {"Source": "l", "Destination": "d"},
                {"Source": "r", "Destination": "d"}
            ]),
        );
        let mut out = Vec::new();
        check_document(&m, &mut out);
        assert!(out.is_empty(), "{out:?}");
    }

    #[test]
    fn test_weights_cardinality() {
        let ok = contrast(json!(["A", "B"]), json!([1, -1]), "t");
        assert!(contrast_violations(&ok).is_empty());

        let bad = contrast(json!(["A", "B"]), json!([1, -1, 1]), "t");
        let out = contrast_violations(&bad);
        assert_eq!(out.len(), 1);
        assert!(out[0].to_string().contains("Weights has 3 element(s) but ConditionList has 2"));
    }

    #[test]
    fn test_t_test_requires_vector() {
        let c = contrast(json!(["A", "B"]), json!([[1], [-1]]), "t");
        let out = contrast_violations(&c);
        assert_eq!(out.len(), 1);
        assert!(out[0].to_string().contains("requires 1-D Weights"));
    }

    #[test]
    fn test_matrix_weights_count_every_element() {
        let ok = contrast(json!(["A", "B"]), json!([[1], [-1]]), "F");
        assert!(contrast_violations(&ok).is_empty());

        let ragged = contrast(json!(["A", "B", "C"]), json!([[1, 0], [-1]]), "pass");
        assert!(contrast_violations(&ragged).is_empty());

        let too_many = contrast(json!(["A", "B"]), json!([[1, 0], [0, 1]]), "F");
        let out = contrast_violations(&too_many);
        assert_eq!(out.len(), 1);
        assert!(out[0]
            .to_string()
            .contains("Weights has 4 element(s) but ConditionList has 2"));
    }

    #[test]
    fn test_fraction_strings_count_as_weights() {
        let c = contrast(json!(["A", "B", "C"]), json!(["1/3", "1/3", "1/3"]), "pass");
        assert!(contrast_violations(&c).is_empty());
    }

    #[test]
    fn test_contrast_name_collisions() {
        let n: Node = serde_json::from_value(json!({
            "Level": "Subject",
            "Name": "subject",
            "GroupBy": ["subject"],
            "Model": {"Type": "glm", "X": ["A", "B"]},
            "Contrasts": [
                {"Name": "A", "ConditionList": ["A"], "Weights": [1], "Test": "t"},
                {"Name": "A", "ConditionList": ["B"], "Weights": [1], "Test": "t"}
            ],
            "DummyContrasts": {"Contrasts": ["A", "B", "B"], "Test": "t"}
        }))
        .unwrap();
        let mut out = Vec::new();
        check_node(&n, &FieldPath::root().key("Nodes").index(0), &mut out);
        let messages: Vec<String> = out.iter().map(ToString::to_string).collect();
        assert_eq!(out.len(), 3, "{messages:?}");
        assert!(out.iter().all(|v| v.path.to_string() == "Nodes[0]"));
        assert!(messages.iter().any(|m| m.contains("repeats Contrast name \"A\"")));
        assert!(messages.iter().any(|m| m.contains("collides with a dummy contrast")));
        assert!(messages.iter().any(|m| m.contains("lists \"B\" more than once")));
    }
}
