// crates/taleruntime/tests/engine_test.rs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use talecore::{
    node_types, Connection, DialogueEvent, DialogueHost, GraphDocument, HostRegistry, Value,
};
use taleruntime::DialogueEngine;

fn document(
    nodes: Vec<(&str, Vec<Value>)>,
    connections: &[(u32, u32, u32, u32)],
) -> GraphDocument {
    let connections: Vec<Connection> = connections
        .iter()
        .map(|&(from_node, from_port, to_node, to_port)| {
            Connection::new(from_node, from_port, to_node, to_port)
        })
        .collect();

    GraphDocument::from_nodes(nodes, &connections)
}

fn engine_for(document: GraphDocument) -> (DialogueEngine, Receiver<DialogueEvent>) {
    engine_with_host(document, Arc::new(HostRegistry::new()))
}

fn engine_with_host(
    document: GraphDocument,
    host: Arc<dyn DialogueHost>,
) -> (DialogueEngine, Receiver<DialogueEvent>) {
    let mut engine = DialogueEngine::with_host(host);
    let events = engine.subscribe();
    engine.set_document(Some(document));
    drain(&events); // discard the document-changed event
    (engine, events)
}

fn drain(events: &Receiver<DialogueEvent>) -> Vec<DialogueEvent> {
    events.try_iter().collect()
}

fn outputs(events: &[DialogueEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter_map(|event| match event {
            DialogueEvent::Output { text, speaker, .. } => {
                Some((text.clone(), speaker.clone()))
            }
            _ => None,
        })
        .collect()
}

fn ended_count(events: &[DialogueEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, DialogueEvent::Ended { .. }))
        .count()
}

fn output_payload(text: &str, speaker: &str) -> Vec<Value> {
    vec![Value::from(text), Value::from(speaker)]
}

#[test]
fn test_no_start_node_ends_immediately() {
    let (mut engine, events) = engine_for(document(
        vec![(node_types::OUTPUT, output_payload("Hi", "Bob"))],
        &[],
    ));

    engine.start_dialogue();

    let events = drain(&events);
    assert_eq!(ended_count(&events), 1, "Exactly one ended event");
    assert!(outputs(&events).is_empty(), "No output events");
    assert!(!engine.is_active());
}

#[test]
fn test_no_document_ends_immediately() {
    let mut engine = DialogueEngine::new();
    let events = engine.subscribe();

    engine.start_dialogue();

    assert_eq!(ended_count(&drain(&events)), 1);
    assert!(!engine.is_active());
}

#[test]
fn test_start_output_suspends_then_ends() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::OUTPUT, output_payload("Hi", "Bob")),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();

    let events_after_start = drain(&events);
    assert_eq!(
        outputs(&events_after_start),
        vec![("Hi".to_string(), "Bob".to_string())]
    );
    assert_eq!(ended_count(&events_after_start), 0);
    assert!(engine.is_active(), "Output node suspends, session stays active");

    engine.send_input("", &[]);

    let events_after_input = drain(&events);
    assert!(outputs(&events_after_input).is_empty());
    assert_eq!(ended_count(&events_after_input), 1);
    assert!(!engine.is_active());
}

fn switch_document() -> GraphDocument {
    document(
        vec![
            (node_types::START, vec![]),
            (node_types::SWITCH, vec![Value::from(vec!["yes", "no"])]),
            (node_types::OUTPUT, output_payload("Great!", "Bob")),
            (node_types::OUTPUT, output_payload("Shame.", "Bob")),
            (node_types::OUTPUT, output_payload("What?", "Bob")),
        ],
        &[(0, 0, 1, 0), (1, 0, 2, 0), (1, 1, 3, 0), (1, 2, 4, 0)],
    )
}

#[test]
fn test_switch_case_insensitive_match() {
    let (mut engine, events) = engine_for(switch_document());

    engine.start_dialogue();
    drain(&events);

    engine.send_input("Yes please", &[]);

    assert_eq!(
        outputs(&drain(&events)),
        vec![("Great!".to_string(), "Bob".to_string())]
    );
}

#[test]
fn test_switch_no_match_routes_else_port() {
    let (mut engine, events) = engine_for(switch_document());

    engine.start_dialogue();
    drain(&events);

    engine.send_input("maybe", &[]);

    assert_eq!(
        outputs(&drain(&events)),
        vec![("What?".to_string(), "Bob".to_string())]
    );
}

#[test]
fn test_switch_substring_quirk() {
    let (mut engine, events) = engine_for(switch_document());

    engine.start_dialogue();
    drain(&events);

    // Documented quirk: matching is substring search, so "snow" hits the
    // "no" case rather than the else port.
    engine.send_input("snow", &[]);

    assert_eq!(
        outputs(&drain(&events)),
        vec![("Shame.".to_string(), "Bob".to_string())]
    );
}

#[test]
fn test_switch_empty_case_matches_everything() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::SWITCH, vec![Value::from(vec!["yes", ""])]),
            (node_types::OUTPUT, output_payload("Matched yes", "Bob")),
            (node_types::OUTPUT, output_payload("Matched empty", "Bob")),
        ],
        &[(0, 0, 1, 0), (1, 0, 2, 0), (1, 1, 3, 0)],
    ));

    engine.start_dialogue();
    drain(&events);

    engine.send_input("zzz", &[]);

    assert_eq!(
        outputs(&drain(&events)),
        vec![("Matched empty".to_string(), "Bob".to_string())]
    );
}

#[test]
fn test_action_condition_chain_resolves_in_one_call() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);

    let mut host = HostRegistry::new();
    host.action_fn("quest.grant", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    host.condition_fn("quest.ready", |_| true);

    let (mut engine, events) = engine_with_host(
        document(
            vec![
                (node_types::START, vec![]),
                (node_types::ACTION, vec![Value::from("quest.grant")]),
                (node_types::CONDITION, vec![Value::from("quest.ready")]),
                (node_types::OUTPUT, output_payload("Quest granted", "Bob")),
            ],
            &[(0, 0, 1, 0), (1, 0, 2, 0), (2, 0, 3, 0)],
        ),
        Arc::new(host),
    );

    engine.start_dialogue();

    let events = drain(&events);
    assert_eq!(
        outputs(&events),
        vec![("Quest granted".to_string(), "Bob".to_string())],
        "Whole chain resolves inside one start_dialogue call"
    );
    assert_eq!(ended_count(&events), 0);
    assert_eq!(invocations.load(Ordering::SeqCst), 1, "Action fired once");
}

#[test]
fn test_missing_action_still_advances() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::ACTION, vec![Value::from("not.registered")]),
            (node_types::OUTPUT, output_payload("Moved on", "Bob")),
        ],
        &[(0, 0, 1, 0), (1, 0, 2, 0)],
    ));

    engine.start_dialogue();

    assert_eq!(
        outputs(&drain(&events)),
        vec![("Moved on".to_string(), "Bob".to_string())]
    );
}

fn condition_document() -> GraphDocument {
    document(
        vec![
            (node_types::START, vec![]),
            (node_types::CONDITION, vec![Value::from("door.open")]),
            (node_types::OUTPUT, output_payload("Come in", "Bob")),
            (node_types::OUTPUT, output_payload("Locked", "Bob")),
        ],
        &[(0, 0, 1, 0), (1, 0, 2, 0), (1, 1, 3, 0)],
    )
}

#[test]
fn test_condition_false_routes_port_one() {
    let mut host = HostRegistry::new();
    host.condition_fn("door.open", |_| false);

    let (mut engine, events) = engine_with_host(condition_document(), Arc::new(host));

    engine.start_dialogue();

    assert_eq!(
        outputs(&drain(&events)),
        vec![("Locked".to_string(), "Bob".to_string())]
    );
}

#[test]
fn test_missing_condition_routes_port_one() {
    let (mut engine, events) = engine_for(condition_document());

    engine.start_dialogue();

    assert_eq!(
        outputs(&drain(&events)),
        vec![("Locked".to_string(), "Bob".to_string())]
    );
}

#[test]
fn test_call_jumps_to_function_node() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::CALL, vec![Value::from(2i64)]),
            (node_types::FUNCTION, vec![Value::from("greeting")]),
            (node_types::OUTPUT, output_payload("Routed via function", "Bob")),
        ],
        &[(0, 0, 1, 0), (2, 0, 3, 0)],
    ));

    engine.start_dialogue();

    let events = drain(&events);
    assert_eq!(
        outputs(&events),
        vec![("Routed via function".to_string(), "Bob".to_string())]
    );
    assert_eq!(ended_count(&events), 0);
}

#[test]
fn test_call_without_target_ends_dialogue() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::CALL, vec![Value::from(-1i64)]),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();

    let events = drain(&events);
    assert_eq!(ended_count(&events), 1);
    assert!(outputs(&events).is_empty());
    assert!(!engine.is_active());
}

#[test]
fn test_call_wrong_kind_target_ends_dialogue() {
    // The call references node 0, which is the start node, not a function
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::CALL, vec![Value::from(0i64)]),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();

    assert_eq!(ended_count(&drain(&events)), 1);
    assert!(!engine.is_active());
}

fn variable_payload(name: &str, value: &str) -> Vec<Value> {
    vec![
        Value::from(name),
        Value::from("enum"),
        Value::from(value),
        Value::from(vec!["calm", "angry"]),
    ]
}

fn setter_payload(variable: i64, label: &str) -> Vec<Value> {
    vec![
        Value::from(variable),
        Value::Array(vec![Value::from(label)]),
    ]
}

#[test]
fn test_variable_setter_then_condition_in_one_chain() {
    // set mood = angry, then branch on mood == angry: the condition must
    // observe the value written earlier in the same synchronous chain.
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::VARIABLE, variable_payload("mood", "calm")),
            (node_types::VARIABLE_SET, setter_payload(1, "angry")),
            (node_types::VARIABLE_CHECK, setter_payload(1, "angry")),
            (node_types::OUTPUT, output_payload("You seem angry", "Narrator")),
            (node_types::OUTPUT, output_payload("All calm", "Narrator")),
        ],
        &[(0, 0, 2, 0), (2, 0, 3, 0), (3, 0, 4, 0), (3, 1, 5, 0)],
    ));

    engine.start_dialogue();

    assert_eq!(
        outputs(&drain(&events)),
        vec![("You seem angry".to_string(), "Narrator".to_string())]
    );
    assert_eq!(
        engine.variable_value(1),
        Some(Value::from("angry")),
        "The committed value is visible afterwards"
    );
}

#[test]
fn test_variable_changing_fires_before_commit() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::VARIABLE, variable_payload("mood", "calm")),
            (node_types::VARIABLE_SET, setter_payload(1, "angry")),
            (node_types::OUTPUT, output_payload("Done", "Narrator")),
        ],
        &[(0, 0, 2, 0), (2, 0, 3, 0)],
    ));

    engine.start_dialogue();

    let events = drain(&events);
    let changing_position = events.iter().position(|event| {
        matches!(
            event,
            DialogueEvent::VariableChanging { node: 1, name, new_value, .. }
                if name == "mood" && *new_value == Value::from("angry")
        )
    });
    let output_position = events
        .iter()
        .position(|event| matches!(event, DialogueEvent::Output { .. }));

    assert!(changing_position.is_some(), "Variable-changing event fired");
    assert!(
        changing_position < output_position,
        "Notification precedes the rest of the chain"
    );
}

#[test]
fn test_unresolved_variable_reference_skips_write_and_advances() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::VARIABLE_SET, setter_payload(-1, "angry")),
            (node_types::OUTPUT, output_payload("Still here", "Narrator")),
        ],
        &[(0, 0, 1, 0), (1, 0, 2, 0)],
    ));

    engine.start_dialogue();

    let events = drain(&events);
    assert_eq!(
        outputs(&events),
        vec![("Still here".to_string(), "Narrator".to_string())]
    );
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, DialogueEvent::VariableChanging { .. })),
        "No variable mutation happened"
    );
}

#[test]
fn test_enum_setter_sets_label_verbatim() {
    // "furious" is outside the definition; the built-in enum kind does not
    // validate, it assigns the label as-is.
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::VARIABLE, variable_payload("mood", "calm")),
            (node_types::VARIABLE_SET, setter_payload(1, "furious")),
        ],
        &[(0, 0, 2, 0)],
    ));

    engine.start_dialogue();
    drain(&events);

    assert_eq!(engine.variable_value(1), Some(Value::from("furious")));
}

#[test]
fn test_input_options_reflect_focused_node() {
    let (mut engine, events) = engine_for(switch_document());

    assert!(engine.input_options().is_empty(), "Idle engine offers nothing");

    engine.start_dialogue();
    drain(&events);

    let option_texts: Vec<String> = engine
        .input_options()
        .into_iter()
        .map(|option| option.text)
        .collect();
    assert_eq!(option_texts, vec!["yes", "no"]);
}

#[test]
fn test_output_node_offers_empty_continue_option() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::OUTPUT, output_payload("Hi", "Bob")),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();
    drain(&events);

    let options = engine.input_options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].text, "");
}

#[test]
fn test_unknown_node_type_ends_dialogue() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            ("dialogue.mystery", vec![]),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();

    assert_eq!(ended_count(&drain(&events)), 1);
    assert!(!engine.is_active());
}

#[test]
fn test_undecodable_payload_leaves_node_inert() {
    // An output node whose payload is numbers instead of strings: the node
    // instantiates inert, takes focus, and does nothing.
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::OUTPUT, vec![Value::from(1.0), Value::from(2.0)]),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();

    let events_after_start = drain(&events);
    assert!(outputs(&events_after_start).is_empty());
    assert_eq!(ended_count(&events_after_start), 0);
    assert!(engine.is_active(), "Inert node holds focus");
    assert!(engine.input_options().is_empty());

    engine.send_input("anything", &[]);
    assert!(drain(&events).is_empty(), "Input to an inert node is a no-op");
}

#[test]
fn test_set_document_mid_session_resets_to_idle() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::OUTPUT, output_payload("Hi", "Bob")),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();
    drain(&events);
    assert!(engine.is_active());

    engine.set_document(None);

    let events_after_swap = drain(&events);
    assert_eq!(ended_count(&events_after_swap), 1, "Active session ends");
    assert!(events_after_swap
        .iter()
        .any(|event| matches!(event, DialogueEvent::DocumentChanged { .. })));
    assert!(!engine.is_active());

    // The stale cache is gone: input and restart both read the new document
    engine.send_input("", &[]);
    assert!(drain(&events).is_empty());

    engine.start_dialogue();
    assert_eq!(ended_count(&drain(&events)), 1, "No document, ends at once");
}

#[test]
fn test_send_input_is_noop_while_idle() {
    let (mut engine, events) = engine_for(switch_document());

    engine.send_input("yes", &[]);

    assert!(drain(&events).is_empty());
    assert!(!engine.is_active());
}

#[test]
fn test_end_dialogue_as_cancellation() {
    let (mut engine, events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::OUTPUT, output_payload("Hi", "Bob")),
        ],
        &[(0, 0, 1, 0)],
    ));

    engine.start_dialogue();
    drain(&events);

    engine.end_dialogue();

    assert_eq!(ended_count(&drain(&events)), 1);
    assert!(!engine.is_active());
    assert!(engine.input_options().is_empty());
}

#[test]
fn test_find_instances_matches_save_data() {
    let (mut engine, _events) = engine_for(document(
        vec![
            (node_types::START, vec![]),
            (node_types::VARIABLE, variable_payload("mood", "calm")),
            (node_types::VARIABLE, variable_payload("karma", "calm")),
        ],
        &[],
    ));

    let variables = engine.find_instances(|token, _| token == node_types::VARIABLE);
    assert_eq!(variables, vec![1, 2]);

    let named = engine.find_instances(|token, payload| {
        token == node_types::VARIABLE
            && payload.first().and_then(Value::as_str) == Some("karma")
    });
    assert_eq!(named, vec![2]);
}
