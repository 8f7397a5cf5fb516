use std::collections::BTreeSet;
use std::path::PathBuf;

use bpmn_inject_core::{InjectError, Injector, InjectorSettings, Role, TaskAttributes};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

fn node_ids(injector: &Injector) -> BTreeSet<String> {
    injector
        .nodes()
        .unwrap()
        .into_iter()
        .map(|node| node.id)
        .collect()
}

fn edges(injector: &Injector) -> BTreeSet<(String, String)> {
    injector
        .flows()
        .unwrap()
        .into_iter()
        .map(|flow| (flow.source_ref, flow.target_ref))
        .collect()
}

fn edge(source: &str, target: &str) -> (String, String) {
    (source.to_string(), target.to_string())
}

fn set<const N: usize>(items: [&str; N]) -> BTreeSet<String> {
    items.into_iter().map(str::to_string).collect()
}

#[test]
fn pre_and_post_injection_splice_the_main_path() {
    let mut injector = Injector::parse(&fixture("order.bpmn")).unwrap();

    let pre = injector.inject_after_each_start("Init").unwrap();
    let post = injector.inject_before_each_end("Cleanup").unwrap();

    // One counter serves every prefix, so the start side uses 1000..=1002.
    assert_eq!(pre, vec!["ServiceTask_1000"]);
    assert_eq!(post, vec!["ServiceTask_1003"]);

    assert_eq!(
        node_ids(&injector),
        set([
            "StartEvent_1",
            "Task_A",
            "EndEvent_1",
            "ServiceTask_1000",
            "ServiceTask_1003"
        ])
    );
    assert_eq!(
        edges(&injector),
        BTreeSet::from([
            edge("StartEvent_1", "ServiceTask_1000"),
            edge("ServiceTask_1000", "Task_A"),
            edge("Task_A", "ServiceTask_1003"),
            edge("ServiceTask_1003", "EndEvent_1"),
        ])
    );

    let tasks = injector.find_by_role(&Role::ServiceTask).unwrap();
    let names: Vec<_> = tasks.iter().map(|task| task.name.as_deref()).collect();
    assert_eq!(names, vec![Some("Init"), Some("Cleanup")]);
    assert_eq!(tasks[0].attribute("camunda:type"), Some("external"));
    assert_eq!(tasks[0].attribute("camunda:topic"), Some("service-task-topic"));
}

#[test]
fn start_side_replaces_flows_and_end_side_retargets_them() {
    let mut injector = Injector::parse(&fixture("order.bpmn")).unwrap();
    injector.inject_after_each_start("Init").unwrap();
    injector.inject_before_each_end("Cleanup").unwrap();

    let flow_ids: BTreeSet<_> = injector
        .flows()
        .unwrap()
        .into_iter()
        .map(|flow| flow.id)
        .collect();
    assert_eq!(flow_ids, set(["Flow_1001", "Flow_1002", "Flow_2", "Flow_1004"]));

    let retargeted = injector.find_outgoing("Task_A").unwrap();
    assert_eq!(retargeted.len(), 1);
    assert_eq!(retargeted[0].id, "Flow_2");
    assert_eq!(retargeted[0].target_ref, "ServiceTask_1003");
}

#[test]
fn start_without_successors_becomes_a_dead_end_task() {
    let xml = r#"<definitions><process id="P"><startEvent id="S"/><task id="X"/></process></definitions>"#;
    let mut injector = Injector::parse(xml).unwrap();

    let created = injector.inject_after_each_start("Init").unwrap();

    assert_eq!(created, vec!["ServiceTask_1000"]);
    assert_eq!(edges(&injector), BTreeSet::from([edge("S", "ServiceTask_1000")]));
    assert!(injector.find_outgoing("ServiceTask_1000").unwrap().is_empty());
}

#[test]
fn fan_out_start_moves_every_successor_behind_the_task() {
    let mut injector = Injector::parse(&fixture("fork.bpmn")).unwrap();
    let existing: BTreeSet<_> = injector
        .flows()
        .unwrap()
        .into_iter()
        .map(|flow| flow.id)
        .chain(injector.nodes().unwrap().into_iter().map(|node| node.id))
        .collect();

    let created = injector.inject_after_each_start("Init").unwrap();
    let task = &created[0];

    let outgoing: Vec<_> = injector
        .find_outgoing(task)
        .unwrap()
        .into_iter()
        .map(|flow| (flow.id, flow.target_ref))
        .collect();
    assert_eq!(
        outgoing,
        vec![
            ("Flow_1002".to_string(), "A".to_string()),
            ("Flow_1003".to_string(), "B".to_string())
        ]
    );

    let from_start = injector.find_outgoing("Start").unwrap();
    assert_eq!(from_start.len(), 1);
    assert_eq!(from_start[0].id, "Flow_1001");
    assert_eq!(&from_start[0].target_ref, task);

    let all_ids: Vec<_> = injector
        .flows()
        .unwrap()
        .into_iter()
        .map(|flow| flow.id)
        .collect();
    assert!(!all_ids.contains(&"f1".to_string()));
    assert!(!all_ids.contains(&"f2".to_string()));
    for id in ["Flow_1001", "Flow_1002", "Flow_1003"] {
        assert!(!existing.contains(id));
    }
}

#[test]
fn fan_in_end_keeps_predecessor_flow_ids() {
    let mut injector = Injector::parse(&fixture("fork.bpmn")).unwrap();

    let created = injector.inject_before_each_end("Cleanup").unwrap();
    let task = &created[0];

    let incoming: Vec<_> = injector
        .find_incoming(task)
        .unwrap()
        .into_iter()
        .map(|flow| (flow.id, flow.source_ref))
        .collect();
    assert_eq!(
        incoming,
        vec![
            ("f3".to_string(), "A".to_string()),
            ("f4".to_string(), "B".to_string())
        ]
    );

    let into_end = injector.find_incoming("End").unwrap();
    assert_eq!(into_end.len(), 1);
    assert_eq!(&into_end[0].source_ref, task);
}

#[test]
fn repeated_injection_chains_tasks() {
    let mut injector = Injector::parse(&fixture("order.bpmn")).unwrap();

    let first = injector.inject_after_each_start("First").unwrap();
    let second = injector.inject_after_each_start("Second").unwrap();

    assert_eq!(first, vec!["ServiceTask_1000"]);
    assert_eq!(second, vec!["ServiceTask_1003"]);
    assert_eq!(
        edges(&injector),
        BTreeSet::from([
            edge("StartEvent_1", "ServiceTask_1003"),
            edge("ServiceTask_1003", "ServiceTask_1000"),
            edge("ServiceTask_1000", "Task_A"),
            edge("Task_A", "EndEvent_1"),
        ])
    );
}

#[test]
fn every_start_event_is_handled_in_document_order() {
    let xml = r#"<process id="P">
  <startEvent id="S1"/>
  <startEvent id="S2"/>
  <task id="X"/>
  <sequenceFlow id="a" sourceRef="S1" targetRef="X"/>
  <sequenceFlow id="b" sourceRef="S2" targetRef="X"/>
</process>"#;
    let mut injector = Injector::parse(xml).unwrap();

    let created = injector.inject_after_each_start("Init").unwrap();

    assert_eq!(created, vec!["ServiceTask_1000", "ServiceTask_1003"]);
    assert_eq!(
        edges(&injector),
        BTreeSet::from([
            edge("S1", "ServiceTask_1000"),
            edge("ServiceTask_1000", "X"),
            edge("S2", "ServiceTask_1003"),
            edge("ServiceTask_1003", "X"),
        ])
    );
}

#[test]
fn documents_without_anchors_round_trip() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions id="D">
  <!-- nothing to anchor on -->
  <process id="P">
    <task id="A" name="Fish &amp; chips"/>
  </process>
</definitions>
"#;
    let mut injector = Injector::parse(xml).unwrap();

    assert!(injector.inject_after_each_start("Init").unwrap().is_empty());
    assert!(injector.inject_before_each_end("Cleanup").unwrap().is_empty());
    assert_eq!(injector.serialize().unwrap(), xml);
}

#[test]
fn insert_between_adds_parallel_path_with_custom_attributes() {
    let mut injector = Injector::parse(&fixture("order.bpmn")).unwrap();
    injector.inject_after_each_start("Init").unwrap();
    injector.inject_before_each_end("Cleanup").unwrap();

    let attributes = TaskAttributes::new("Audit")
        .with("type", "external")
        .with("topic", "audit-topic")
        .with("camunda:class", "com.example.AuditDelegate");
    let id = injector
        .insert_between("Task_A", "EndEvent_1", &attributes)
        .unwrap();

    assert_eq!(id, "CustomServiceTask_1005");

    let task = injector
        .nodes()
        .unwrap()
        .into_iter()
        .find(|node| node.id == id)
        .unwrap();
    assert_eq!(task.role, Role::ServiceTask);
    assert_eq!(task.name.as_deref(), Some("Audit"));
    assert_eq!(task.attribute("camunda:type"), Some("external"));
    assert_eq!(task.attribute("camunda:topic"), Some("audit-topic"));
    assert_eq!(
        task.attribute("camunda:class"),
        Some("com.example.AuditDelegate")
    );

    let targets: Vec<_> = injector
        .find_outgoing("Task_A")
        .unwrap()
        .into_iter()
        .map(|flow| flow.target_ref)
        .collect();
    assert_eq!(targets, vec!["ServiceTask_1003", "CustomServiceTask_1005"]);

    let into_end: BTreeSet<_> = injector
        .find_incoming("EndEvent_1")
        .unwrap()
        .into_iter()
        .map(|flow| flow.source_ref)
        .collect();
    assert_eq!(into_end, set(["ServiceTask_1003", "CustomServiceTask_1005"]));
}

#[test]
fn permissive_insert_accepts_unknown_nodes() {
    let mut injector = Injector::parse(&fixture("order.bpmn")).unwrap();

    let id = injector
        .insert_between("Ghost_1", "Ghost_2", &TaskAttributes::new("Orphan"))
        .unwrap();

    assert!(edges(&injector).contains(&edge("Ghost_1", &id)));
    assert!(edges(&injector).contains(&edge(&id, "Ghost_2")));
}

#[test]
fn strict_insert_rejects_unknown_nodes() {
    let source = fixture("order.bpmn");
    let mut injector = Injector::parse(&source).unwrap();

    let err = injector
        .insert_between_checked("Task_A", "Flow_2", &TaskAttributes::new("Audit"))
        .unwrap_err();

    assert!(matches!(err, InjectError::UnknownNode { ref id } if id == "Flow_2"));
    assert_eq!(
        injector.serialize().unwrap(),
        Injector::parse(&source).unwrap().serialize().unwrap()
    );

    let id = injector
        .insert_between_checked("Task_A", "EndEvent_1", &TaskAttributes::new("Audit"))
        .unwrap();
    assert_eq!(id, "CustomServiceTask_1000");
}

#[test]
fn generated_ids_may_collide_with_existing_ones() {
    let xml = r#"<process id="P">
  <startEvent id="S"/>
  <task id="ServiceTask_1000"/>
</process>"#;
    let mut injector = Injector::parse(xml).unwrap();

    injector.inject_after_each_start("Init").unwrap();

    let duplicates = injector
        .nodes()
        .unwrap()
        .into_iter()
        .filter(|node| node.id == "ServiceTask_1000")
        .count();
    assert_eq!(duplicates, 2);
}

#[test]
fn created_elements_follow_the_process_prefix() {
    let mut injector = Injector::parse(&fixture("fork.bpmn")).unwrap();
    injector.inject_after_each_start("Init").unwrap();

    let output = injector.serialize().unwrap();
    assert!(output.contains(
        r#"<serviceTask id="ServiceTask_1000" name="Init" camunda:type="external" camunda:topic="service-task-topic"/>"#
    ));
    assert!(output.contains(r#"<sequenceFlow id="Flow_1001" sourceRef="Start" targetRef="ServiceTask_1000"/>"#));
    assert!(!output.contains("bpmn:"));

    let mut prefixed = Injector::parse(&fixture("order.bpmn")).unwrap();
    prefixed.inject_before_each_end("Cleanup").unwrap();
    let output = prefixed.serialize().unwrap();
    assert!(output.contains(r#"<bpmn:serviceTask id="ServiceTask_1000" name="Cleanup""#));
    assert!(output.contains(r#"<bpmn:sequenceFlow id="Flow_1001" sourceRef="ServiceTask_1000" targetRef="EndEvent_1"/>"#));
}

#[test]
fn rewrites_leave_diagram_section_untouched() {
    let source = fixture("order.bpmn");
    let mut injector = Injector::parse(&source).unwrap();
    injector.inject_after_each_start("Init").unwrap();

    let output = injector.serialize().unwrap();
    let diagram_start = source.find("  <bpmndi:BPMNDiagram").unwrap();
    assert!(output.ends_with(&source[diagram_start..]));
    assert!(output.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
}

#[test]
fn custom_seed_and_task_settings_apply() {
    let mut settings = InjectorSettings::default();
    settings.id_seed = 1;
    settings.task.topic = "billing".into();
    let mut injector = Injector::with_settings(&fixture("order.bpmn"), settings).unwrap();

    let created = injector.inject_after_each_start("Init").unwrap();

    assert_eq!(created, vec!["ServiceTask_1"]);
    let task = &injector.find_by_role(&Role::ServiceTask).unwrap()[0];
    assert_eq!(task.attribute("camunda:topic"), Some("billing"));
}

#[test]
fn malformed_xml_is_reported() {
    let err = Injector::parse("<definitions><process id=\"P\"></definitions>").unwrap_err();
    assert!(matches!(err, InjectError::Xml(_)));
}

#[test]
fn compact_process_without_whitespace_rewires_fan_out_and_fan_in() {
    let xml = concat!(
        r#"<definitions><process id="P">"#,
        r#"<startEvent id="S"/><task id="A"/><task id="B"/><endEvent id="E"/>"#,
        r#"<sequenceFlow id="f1" sourceRef="S" targetRef="A"/>"#,
        r#"<sequenceFlow id="f2" sourceRef="S" targetRef="B"/>"#,
        r#"<sequenceFlow id="f3" sourceRef="A" targetRef="E"/>"#,
        r#"<sequenceFlow id="f4" sourceRef="B" targetRef="E"/>"#,
        r#"</process></definitions>"#
    );
    let mut injector = Injector::parse(xml).unwrap();

    let pre = injector.inject_after_each_start("Init").unwrap();
    let post = injector.inject_before_each_end("Cleanup").unwrap();
    assert_eq!(pre, vec!["ServiceTask_1000"]);
    assert_eq!(post, vec!["ServiceTask_1004"]);

    assert_eq!(
        edges(&injector),
        BTreeSet::from([
            edge("S", "ServiceTask_1000"),
            edge("ServiceTask_1000", "A"),
            edge("ServiceTask_1000", "B"),
            edge("A", "ServiceTask_1004"),
            edge("B", "ServiceTask_1004"),
            edge("ServiceTask_1004", "E"),
        ])
    );
    assert_eq!(
        node_ids(&injector),
        set(["S", "A", "B", "E", "ServiceTask_1000", "ServiceTask_1004"])
    );

    let flow_ids: Vec<_> = injector
        .flows()
        .unwrap()
        .into_iter()
        .map(|flow| flow.id)
        .collect();
    assert_eq!(
        flow_ids,
        vec!["f3", "f4", "Flow_1001", "Flow_1002", "Flow_1003", "Flow_1005"]
    );

    let output = injector.serialize().unwrap();
    assert!(!output.contains('\n'));
    assert!(output.starts_with(
        r#"<definitions><process id="P"><startEvent id="S"/><task id="A"/><task id="B"/><endEvent id="E"/><sequenceFlow id="f3""#
    ));
}
