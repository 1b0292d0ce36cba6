use super::*;
use crate::schema::SchemaRegistry;
use serde_json::json;

fn context() -> Value {
    json!({
        "title": "Logistics unit review",
        "industry": "Transportation",
        "decision_outcomes": ["Sell", "Retain & optimize"]
    })
}

fn every_envelope() -> Vec<Envelope> {
    vec![
        step1_clarify(
            context(),
            "We are exploring whether to divest a logistics unit",
            Vec::new(),
        ),
        step2_assessment_toggle(
            context(),
            "Customer dependency matters here.",
            CanonicalCategories::standard(),
        ),
        step3_subassessments(
            context(),
            "Go deeper.",
            vec!["Competitive intensity".to_string()],
        ),
        prompt_doctor("help me think about selling stuff"),
    ]
}

#[test]
fn builder_fields_are_drawn_from_the_step_schema() {
    let registry = SchemaRegistry::builtin();
    for envelope in every_envelope() {
        let schema = registry.get(envelope.step).expect("schema");
        let properties: Vec<_> = schema.property_names().collect();
        for field in &envelope.fields {
            assert!(
                properties.contains(&field.as_str()),
                "{} requests {field} which its schema does not declare",
                envelope.step
            );
        }
        for required in schema.required_keys() {
            assert!(
                envelope.fields.iter().any(|field| field == required),
                "{} does not request required field {required}",
                envelope.step
            );
        }
        assert!(envelope.check().is_ok());
    }
}

#[test]
fn clarify_requests_every_strategic_field() {
    let envelope = step1_clarify(context(), "divest?", Vec::new());
    let registry = SchemaRegistry::builtin();
    let schema = registry.get(StepId::Clarify).unwrap();
    let expected: Vec<_> = schema
        .property_names()
        .filter(|name| *name != "notes")
        .collect();
    assert_eq!(envelope.fields, expected);
}

#[test]
fn builders_are_deterministic() {
    assert_eq!(every_envelope(), every_envelope());
}

#[test]
fn serialized_envelope_uses_wire_names() {
    let history = vec![
        ChatTurn::user("We may sell the unit."),
        ChatTurn::assistant("Which geography?"),
    ];
    let envelope = step1_clarify(context(), "US only.", history).with_temperature(0.7);
    let value = serde_json::to_value(&envelope).unwrap();

    assert_eq!(value["step"], json!("step_1_clarify"));
    assert_eq!(value["constraints"]["max_chars"], json!(1000));
    assert_eq!(value["constraints"]["do"].as_array().unwrap().len(), 4);
    assert_eq!(value["constraints"]["dont"].as_array().unwrap().len(), 4);
    assert_eq!(
        value["conversation_history"][1],
        json!({"role": "assistant", "content": "Which geography?"})
    );
    assert!(value.get("temperature").is_none());
    assert!(value.get("canonical").is_none());
}

#[test]
fn assessment_toggle_carries_catalogue_and_ui_hints() {
    let envelope = step2_assessment_toggle(context(), "x", CanonicalCategories::standard());
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["ui_hints"]["selection_mode"], json!("toggle"));
    assert_eq!(value["ui_hints"]["return_ids_instead_of_labels"], json!(true));
    assert_eq!(value["canonical"]["internal"].as_array().unwrap().len(), 3);
    assert!(value["constraints"].get("do").is_none());
    assert_eq!(value["constraints"]["dont"], json!(["no subassessments yet"]));
}

#[test]
fn prompt_doctor_has_no_project_context() {
    let value = serde_json::to_value(prompt_doctor("raw")).unwrap();
    assert_eq!(value["raw_prompt"], json!("raw"));
    assert!(value.get("project_context").is_none());
    assert!(value.get("user_input").is_none());
}

#[test]
fn corrective_envelope_only_replaces_do_list() {
    let original = step3_subassessments(context(), "Go.", vec!["Strategic optionality".into()])
        .with_temperature(0.9);
    let corrected = corrective_envelope(&original);

    assert_eq!(corrected.constraints.must, vec![CORRECTIVE_DIRECTIVE.to_string()]);
    assert_eq!(
        original.constraints.must,
        vec!["return short why + required_inputs + effort".to_string()]
    );

    let mut restored = corrected.clone();
    restored.constraints.must = original.constraints.must.clone();
    assert_eq!(restored, original);
}

#[test]
fn corrective_envelope_adds_do_list_when_step_had_none() {
    let original = step2_assessment_toggle(context(), "x", CanonicalCategories::standard());
    let corrected = corrective_envelope(&original);
    let value = serde_json::to_value(&corrected).unwrap();
    assert_eq!(value["constraints"]["do"], json!([CORRECTIVE_DIRECTIVE]));
    assert_eq!(value["constraints"]["dont"], json!(["no subassessments yet"]));
}

#[test]
fn envelope_json_round_trips_through_from_json() {
    let envelope = step2_assessment_toggle(context(), "x", CanonicalCategories::standard());
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(Envelope::from_json(value).unwrap(), envelope);
}

#[test]
fn from_json_rejects_unknown_step() {
    let mut value = serde_json::to_value(prompt_doctor("raw")).unwrap();
    value["step"] = json!("step_9_unknown");
    let err = Envelope::from_json(value).unwrap_err();
    assert!(matches!(err, ProtocolError::UnknownStep(name) if name == "step_9_unknown"));
}

#[test]
fn from_json_rejects_empty_fields() {
    let mut value = serde_json::to_value(prompt_doctor("raw")).unwrap();
    value["fields"] = json!([]);
    let err = Envelope::from_json(value).unwrap_err();
    assert!(matches!(err, ProtocolError::InvalidEnvelope(_)));
}
