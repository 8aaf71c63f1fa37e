//! Property tests: enumeration closure, union first-match and contrast
//! round-trips over generated inputs.

use bsm_core::{Aggregate, HrfModel, ModelType, NodeLevel, StatisticalTest, TransformerId};
use bsm_schema::{check_value, validate_entity, validate_value, ValidatedEntity};
use proptest::prelude::*;
use serde_json::{json, Value};

fn document() -> Value {
    json!({
        "Name": "m",
        "BIDSModelVersion": "1.0.0",
        "Nodes": [{
            "Level": "Run",
            "Name": "run",
            "GroupBy": ["run", "subject"],
            "Transformations": {"Transformer": "pybids-transforms-v1", "Instructions": []},
            "Model": {
                "Type": "glm",
                "X": ["face", 1],
                "HRF": {"Variables": ["face"], "Model": "Gamma"},
                "Options": {"Aggregate": "mean"}
            },
            "Contrasts": [{
                "Name": "face",
                "ConditionList": ["face"],
                "Weights": [1],
                "Test": "t"
            }],
            "DummyContrasts": {"Test": "F"}
        }]
    })
}

/// Every enumerated field: JSON Pointer and accepted literals.
fn enum_fields() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        ("/Nodes/0/Level", NodeLevel::LITERALS),
        ("/Nodes/0/Transformations/Transformer", TransformerId::LITERALS),
        ("/Nodes/0/Model/Type", ModelType::LITERALS),
        ("/Nodes/0/Model/HRF/Model", HrfModel::LITERALS),
        ("/Nodes/0/Model/Options/Aggregate", Aggregate::LITERALS),
        ("/Nodes/0/Contrasts/0/Test", StatisticalTest::LITERALS),
        ("/Nodes/0/DummyContrasts/Test", StatisticalTest::LITERALS),
    ]
}

fn with(pointer: &str, value: Value) -> Value {
    let mut doc = document();
    if let Some(slot) = doc.pointer_mut(pointer) {
        *slot = value;
    }
    doc
}

#[test]
fn every_listed_literal_is_accepted() {
    for (pointer, literals) in enum_fields() {
        for literal in literals {
            let doc = with(pointer, json!(literal));
            assert!(
                check_value(&doc).unwrap().is_empty(),
                "{pointer} should accept {literal}"
            );
        }
    }
}

proptest! {
    /// Any string outside the vocabulary is one violation at that field.
    #[test]
    fn enumerations_are_closed(
        field in 0usize..7,
        candidate in "[A-Za-z0-9 _-]{0,24}",
    ) {
        let (pointer, literals) = enum_fields()[field];
        prop_assume!(!literals.contains(&candidate.as_str()));
        let violations = check_value(&with(pointer, json!(candidate))).unwrap();
        prop_assert_eq!(violations.len(), 1);
        prop_assert_eq!(violations.violations()[0].kind.category(), "type_mismatch");
    }

    /// Case variants of a literal are not the literal.
    #[test]
    fn enumerations_do_not_fold_case(field in 0usize..7, upper in any::<bool>()) {
        let (pointer, literals) = enum_fields()[field];
        for literal in literals {
            let folded = if upper { literal.to_uppercase() } else { literal.to_lowercase() };
            if folded != *literal {
                let violations = check_value(&with(pointer, json!(folded))).unwrap();
                prop_assert_eq!(violations.len(), 1);
            }
        }
    }

    /// Numbers and strings are weights; booleans and null are not.
    #[test]
    fn weight_union_first_match(number in -1.0e6f64..1.0e6, text in ".{0,12}", flag in any::<bool>()) {
        let pointer = "/Nodes/0/Contrasts/0/Weights/0";
        prop_assert!(check_value(&with(pointer, json!(number))).unwrap().is_empty());
        prop_assert!(check_value(&with(pointer, json!(text))).unwrap().is_empty());
        prop_assert_eq!(check_value(&with(pointer, json!(flag))).unwrap().len(), 1);
        prop_assert_eq!(check_value(&with(pointer, Value::Null)).unwrap().len(), 1);
    }

    /// A contrast with one weight per condition validates and round-trips.
    #[test]
    fn contrast_round_trip(weights in prop::collection::vec(-100i64..100, 1..6)) {
        let conditions: Vec<String> = (0..weights.len()).map(|i| format!("cond_{i}")).collect();
        let contrast = json!({
            "Name": "c",
            "ConditionList": conditions,
            "Weights": weights,
            "Test": "t"
        });
        let first = match validate_entity("Contrast", &contrast).unwrap() {
            ValidatedEntity::Contrast(c) => c,
            other => panic!("unexpected entity {other:?}"),
        };
        let again = serde_json::to_value(&first).unwrap();
        prop_assert_eq!(&again, &contrast);

        let mut longer = contrast.clone();
        longer["Weights"].as_array_mut().unwrap().push(json!(0));
        prop_assert!(validate_entity("Contrast", &longer).is_err());
    }

    /// Node name permutations never change validity of a chain.
    #[test]
    fn chain_validates_for_any_distinct_names(names in prop::collection::btree_set("[a-z]{1,8}", 2..5)) {
        let names: Vec<String> = names.into_iter().collect();
        let nodes: Vec<Value> = names
            .iter()
            .map(|n| json!({
                "Level": "Subject",
                "Name": n,
                "GroupBy": [],
                "Model": {"Type": "glm", "X": [1]}
            }))
            .collect();
        let edges: Vec<Value> = names
            .windows(2)
            .map(|w| json!({"Source": w[0], "Destination": w[1]}))
            .collect();
        let doc = json!({
            "Name": "chain",
            "BIDSModelVersion": "1.0.0",
            "Nodes": nodes,
            "Edges": edges
        });
        let model = validate_value(&doc).unwrap();
        prop_assert_eq!(model.nodes.len(), names.len());
    }
}
