//! Load-time validation tests for dialog scripts.
//!
mod common;
use common::*;
use kaiwa::prelude::*;
use serde_json::json;

#[cfg(test)]
mod graph_tests {
    use super::*;

    #[test]
    fn test_slot_script_loads() {
        init_tracing();
        let graph = Graph::load(slot_script()).expect("Failed to load slot script");

        assert_eq!(graph.len(), 4);
        assert_eq!(graph.start().label, FlowLabel::new("flow", "node"));
        assert_eq!(graph.fallback().label, FlowLabel::new("flow", "node"));
        assert_eq!(graph.schema().leaves().len(), 2);

        let node = graph.lookup("flow", "node").unwrap();
        assert_eq!(node.transitions.len(), 2);
        assert_eq!(node.transitions[1].destination.to_string(), "flow/node2@2");
        let Destination::Node(target, _) = &node.transitions[1].destination else {
            panic!("expected a fixed target");
        };
        assert_eq!(graph.node(*target).label, FlowLabel::new("flow", "node2"));
    }

    #[test]
    fn test_lookup_of_missing_node() {
        let graph = Graph::load(slot_script()).unwrap();
        assert_eq!(
            graph.lookup("flow", "nowhere").unwrap_err(),
            LookupError::NotFound {
                flow: "flow".to_string(),
                node: "nowhere".to_string()
            }
        );
        assert!(graph.resolve(&FlowLabel::new("flow", "node2").with_priority(7.0)).is_ok());
    }

    #[test]
    fn test_dangling_transition_target_fails_load() {
        let mut script = slot_script();
        script["flow"]["flow"]["node"]["TRANSITIONS"][0]["lbl"] = json!(["flow", "missing"]);

        let err = Graph::load(script).unwrap_err();
        match err {
            ConfigError::NodeNotFound { label, referenced_from } => {
                assert_eq!(label, "flow/missing");
                assert_eq!(referenced_from, "flow/node > TRANSITIONS[0]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_start_and_fallback_fail_load() {
        let mut script = slot_script();
        script["start_label"] = json!(["flow", "ghost"]);
        assert!(matches!(Graph::load(script), Err(ConfigError::NodeNotFound { .. })));

        let mut script = slot_script();
        script["fallback_label"] = json!(["other", "node"]);
        assert!(matches!(Graph::load(script), Err(ConfigError::NodeNotFound { .. })));

        let mut script = slot_script();
        script["start_label"] = json!("node");
        assert!(matches!(Graph::load(script), Err(ConfigError::InvalidLabel { .. })));
    }

    #[test]
    fn test_fallback_defaults_to_start() {
        let mut script = slot_script();
        script.as_object_mut().unwrap().remove("fallback_label");
        script["start_label"] = json!(["flow", "done"]);
        let graph = Graph::load(script).unwrap();
        assert_eq!(graph.fallback().label, FlowLabel::new("flow", "done"));
    }

    #[test]
    fn test_invalid_regex_fails_load() {
        let mut script = slot_script();
        script["slots"]["person"]["programmer"]["email"]["regexp"] = json!("email is ([a-z");
        assert!(matches!(Graph::load(script), Err(ConfigError::InvalidRegex { .. })));

        let mut script = slot_script();
        script["slots"]["person"]["programmer"]["email"]["match_group_idx"] = json!(3);
        assert!(matches!(Graph::load(script), Err(ConfigError::InvalidRegex { .. })));
    }

    #[test]
    fn test_unknown_slot_reference_fails_load() {
        let mut script = slot_script();
        script["flow"]["flow"]["node"]["TRANSITIONS"][0]["cnd"] = json!({ "slots_extracted": "person.phone" });
        assert!(matches!(Graph::load(script), Err(ConfigError::UnknownSlot { .. })));
    }

    #[test]
    fn test_unknown_condition_fails_load() {
        let mut script = slot_script();
        script["flow"]["flow"]["node"]["TRANSITIONS"][0]["cnd"] = json!({ "sounds_like": "bob" });
        assert!(matches!(Graph::load(script), Err(ConfigError::UnknownCondition { .. })));
    }

    #[test]
    fn test_unknown_script_key_fails_parse() {
        let mut script = slot_script();
        script["flow"]["flow"]["node"]["RESPONCE"] = json!("typo");
        assert!(matches!(Graph::load(script), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_custom_condition_must_be_registered() {
        let mut script = slot_script();
        script["flow"]["flow"]["node"]["TRANSITIONS"][0]["cnd"] = json!("custom_dir.cnd.is_vip");

        let err = Graph::load(script.clone()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnresolvedReference {
                name: "custom_dir.cnd.is_vip".to_string(),
                location: "flow/node > TRANSITIONS[0]".to_string()
            }
        );

        let graph = Graph::builder(script)
            .unwrap()
            .with_condition("custom_dir.cnd.is_vip", |ctx: &Context<'_>| ctx.session_id.starts_with("vip"))
            .build()
            .expect("registered condition should resolve");
        let node = graph.lookup("flow", "node").unwrap();
        assert_eq!(node.transitions[0].condition.describe(), "custom_dir.cnd.is_vip");
    }

    #[test]
    fn test_custom_dir_renames_namespace() {
        let mut script = slot_script();
        script["custom_dir"] = json!("plugins");
        script["flow"]["flow"]["node"]["PRE_TRANSITIONS_PROCESSING"]["audit"] = json!("plugins.proc.audit");

        let graph = Graph::builder(script)
            .unwrap()
            .with_processing("plugins.proc.audit", |_state: &mut TurnState<'_>| Ok::<(), ProcessingError>(()))
            .build()
            .unwrap();
        assert_eq!(graph.custom_dir(), "plugins");
        assert_eq!(graph.lookup("flow", "node").unwrap().pre_transition.len(), 3);
    }

    #[test]
    fn test_global_and_local_transitions_are_appended() {
        let graph = Graph::load(inheritance_script()).unwrap();

        let start = graph.lookup("shop", "start").unwrap();
        let targets: Vec<String> = start.transitions.iter().map(|t| t.destination.to_string()).collect();
        assert_eq!(targets, vec!["shop/cart", "help/start", "shop/start", "help/start"]);
        assert_eq!(start.misc["channel"], json!("web"));

        // LOCAL only applies to its own flow.
        let help = graph.lookup("help", "start").unwrap();
        assert_eq!(help.transitions.len(), 1);
        assert!(graph.lookup("shop", "LOCAL").is_err());
    }

    #[test]
    fn test_destinations_load_without_fixed_targets() {
        let mut script = slot_script();
        script["flow"]["flow"]["done"]["TRANSITIONS"] = json!([
            { "lbl": { "start": null }, "cnd": { "exact_match": "restart" } },
            { "lbl": { "repeat": { "shift": 1 } }, "cnd": { "exact_match": "back" } },
            { "dst": { "backward": { "loop": true } }, "cnd": true }
        ]);
        let graph = Graph::load(script).unwrap();
        let done = graph.lookup("flow", "done").unwrap();
        let destinations: Vec<_> = done.transitions.iter().map(|t| t.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![
                Destination::Start,
                Destination::Repeat { shift: 1 },
                Destination::Backward { wrap: true }
            ]
        );

        let mut script = slot_script();
        script["flow"]["flow"]["done"]["TRANSITIONS"] = json!([{ "lbl": { "repeat": { "shift": "one" } }, "cnd": true }]);
        assert!(matches!(Graph::load(script), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_local_only_flow_is_validated() {
        let mut script = slot_script();
        script["flow"]["empty"] = json!({
            "LOCAL": { "TRANSITIONS": [{ "lbl": ["flow", "node"], "cnd": { "no_such_cnd": 1 } }] }
        });
        match Graph::load(script).unwrap_err() {
            ConfigError::UnknownCondition { name, location } => {
                assert_eq!(name, "no_such_cnd");
                assert_eq!(location, "empty/LOCAL > TRANSITIONS[0]");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_overflowing_response_weights_fail_load() {
        let mut script = slot_script();
        script["flow"]["flow"]["done"]["RESPONSE"] = json!({ "weighted_choice": [
            { "response": "a", "weight": 1e308 },
            { "response": "b", "weight": 1e308 }
        ]});
        assert!(matches!(Graph::load(script), Err(ConfigError::InvalidResponse { .. })));
    }

    #[test]
    fn test_json_text_loads() {
        let graph = Graph::load(slot_script().to_string().as_str()).unwrap();
        assert_eq!(graph.len(), 4);
        assert!(matches!(Graph::load("{ not json"), Err(ConfigError::Parse(_))));
    }
}
