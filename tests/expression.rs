//! Tests for expression helpers, the datasource catalog, wire records and configuration.
mod common;
use bunki::error::{ConversionError, ExpressionError};
use bunki::prelude::*;
use bunki::step::{ActionKind, Datasource, datasource_tokens, normalize_list, parse_list, token_for};
use common::*;
use serde_json::json;

fn catalog(names: &[&str]) -> DatasourceCatalog {
    DatasourceCatalog::new(
        names
            .iter()
            .map(|name| Datasource {
                name: name.to_string(),
                parameters: serde_json::Value::Null,
                return_type: String::new(),
                description: String::new(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod expression_tests {
    use super::*;

    #[test]
    fn test_normalize_list_accepts_json_or_comma_separated() {
        assert_eq!(normalize_list(r#"["a", "b"]"#).unwrap(), r#"["a","b"]"#);
        assert_eq!(normalize_list(" x, y ,,z ").unwrap(), r#"["x","y","z"]"#);
        assert_eq!(normalize_list("").unwrap(), "[]");
        assert!(matches!(normalize_list("[1, 2]"), Err(ExpressionError::NonStringItem(_))));
        assert!(matches!(normalize_list("[\"a\""), Err(ExpressionError::InvalidList(_))));
    }

    #[test]
    fn test_parse_list_requires_a_json_array_of_strings() {
        assert_eq!(parse_list(r#"["DE","FR"]"#).unwrap(), vec!["DE", "FR"]);
        assert!(parse_list("DE,FR").is_err());
        assert!(parse_list(r#"{"a": 1}"#).is_err());
        assert!(parse_list("[true]").is_err());
    }

    #[test]
    fn test_datasource_tokens_are_distinct_and_ordered() {
        let tokens = datasource_tokens("{{ amount }} > {{limit}} and {{amount}} {{}} {{open");
        assert_eq!(tokens, vec!["amount", "limit"]);
        assert_eq!(token_for("amount"), "{{amount}}");
        assert!(datasource_tokens("plain text").is_empty());
    }

    #[test]
    fn test_catalog_completion_and_unknown_references() {
        let catalog = catalog(&["country", "Amount", "age", "amount_limit", "age"]);

        assert_eq!(catalog.datasources().len(), 4);
        let completed: Vec<&str> = catalog.complete("{{am").iter().map(|d| d.name.as_str()).collect();
        assert_eq!(completed, vec!["Amount", "amount_limit"]);
        assert_eq!(catalog.complete("").len(), 4);
        assert!(catalog.get("country").is_some());

        assert_eq!(catalog.unknown_references("{{country}} == {{region}}"), vec!["region"]);
    }

    #[test]
    fn test_operator_wire_names() {
        assert_eq!(serde_json::to_value(Operator::GreaterThanOrEqual).unwrap(), json!("gte"));
        assert_eq!(serde_json::from_value::<Operator>(json!("not_in_starts_with")).unwrap(), Operator::NotInStartsWith);
        for operator in Operator::ALL {
            assert_eq!(Operator::from_name(operator.as_str()), Some(operator));
        }
        assert_eq!(Operator::Equal.symbol(), "==");
        assert_eq!(Operator::Contains.symbol(), "contains");
        assert!(Operator::InContain.is_set_membership());
        assert!(!Operator::Contains.is_set_membership());
    }

    #[test]
    fn test_action_decoding_from_wire() {
        let action = Action::from_wire(
            ActionKind::ProceedToStepById,
            &json!({"next_step_id": "17", "note": "go"}),
            Some(3),
            Branch::True,
        )
        .unwrap();
        assert_eq!(action, proceed(17, "go"));

        let action = Action::from_wire(ActionKind::CompleteFailure, &serde_json::Value::Null, Some(3), Branch::False).unwrap();
        assert_eq!(action, failure(""));

        let err = Action::from_wire(ActionKind::ProceedToStepById, &json!({"note": "x"}), Some(3), Branch::True).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidActionData { step_id: Some(3), branch: Branch::True, .. }));
    }

    #[test]
    fn test_step_record_reads_server_json() {
        let record: StepRecord = serde_json::from_value(json!({
            "id": 7,
            "name": "Age check",
            "order": 4,
            "x": 10.5,
            "y": null,
            "left_expression": "{{age}}",
            "operator": "gte",
            "right_expression": "18",
            "if_true_action": "proceed_to_step_by_id",
            "if_true_action_data": {"next_step_id": 8, "note": "adult"},
            "if_false_action": "complete_failure",
            "if_false_action_data": {"error": "minor"}
        }))
        .unwrap();

        assert!(record.is_active);
        assert_eq!(record.position(), None);
        assert_eq!(record.operator, Operator::GreaterThanOrEqual);
        assert_eq!(record.action(Branch::True).unwrap(), proceed(8, "adult"));
        assert_eq!(record.action(Branch::False).unwrap(), failure("minor"));

        let wire = serde_json::to_value(&record).unwrap();
        assert_eq!(wire["if_true_action"], "proceed_to_step_by_id");
        assert_eq!(wire["if_false_action_data"], json!({"error": "minor"}));
    }

    #[test]
    fn test_workflow_record_keeps_unknown_fields() {
        let record: WorkflowRecord = serde_json::from_value(json!({
            "id": 5,
            "name": "Payouts",
            "execution_point": "payout",
            "new_step_id": 12,
            "owner": "risk-team",
            "steps": []
        }))
        .unwrap();

        assert_eq!(record.new_step_id, 12);
        assert_eq!(record.extra.get("owner"), Some(&json!("risk-team")));
        let meta = record.meta();
        assert_eq!(meta.execution_point, "payout");
        assert_eq!(meta.extra.len(), 1);
    }

    #[test]
    fn test_config_defaults_and_overrides() {
        let config = EditorConfig::from_toml_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.notes.passed, "Condition passed");
        assert_eq!(config.store.timeout_secs, 30);

        let config = EditorConfig::from_toml_str(
            r#"
            [store]
            base_url = "https://rules.example.com/api"
            api_token = "secret"

            [layout]
            base_spacing = 500.0

            [notes]
            failed = "Nope"
            "#,
        )
        .unwrap();
        assert_eq!(config.store.base_url, "https://rules.example.com/api");
        assert_eq!(config.store.api_token.as_deref(), Some("secret"));
        assert_eq!(config.layout.base_spacing, 500.0);
        assert_eq!(config.layout.decay, 0.7);
        assert_eq!(config.notes.failed, "Nope");
        assert_eq!(config.notes.passed, "Condition passed");

        assert!(EditorConfig::from_toml_str("[layout]\nbase_spacing = \"wide\"").is_err());
    }

    #[test]
    fn test_config_file_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bunki.toml");
        std::fs::write(&path, "[store]\ntimeout_secs = 5\n").unwrap();

        let config = EditorConfig::from_file(&path).unwrap();
        assert_eq!(config.store.timeout_secs, 5);
        assert!(EditorConfig::from_file(dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn test_http_store_accepts_default_config() {
        assert!(HttpStepStore::new(&StoreConfig::default()).is_ok());
    }
}
