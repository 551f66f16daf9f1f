use contract_drafter::agents::quality::quality_excerpt;
use contract_drafter::contract::{normalize, DataModels, QualityCheck};
use contract_drafter::llm::mock::ScriptedModel;
use contract_drafter::QualityTranslator;
use serde_json::json;
use std::sync::Arc;

fn customer_models() -> DataModels {
    normalize(&json!({
        "customers": {
            "type": "table",
            "description": "customer master data",
            "fields": {
                "age": {
                    "type": "integer",
                    "description": "age in years",
                    "quality": [{
                        "type": "sql",
                        "query": "SELECT COUNT(*) FROM t WHERE age <= 18",
                        "expectedResult": "= 0"
                    }]
                },
                "email": {"type": "string", "description": "contact email", "format": "email"}
            }
        }
    }))
}

#[tokio::test]
async fn test_age_check_translates_to_a_single_rule() {
    let model = Arc::new(ScriptedModel::new(vec![
        "Rules = [\n    ColumnValues \"age\" > 18\n]",
    ]));
    let translator = QualityTranslator::new(model.clone());

    let rules = translator.translate_models(&customer_models()).await.unwrap();
    assert!(rules.contains("\"age\""));
    assert!(!rules.contains("email"));

    // the model only ever sees the checked field
    let requests = model.requests();
    let excerpt = &requests[0][1].content;
    assert!(excerpt.contains("age <= 18"));
    assert!(!excerpt.contains("email"));
}

#[test]
fn test_unknown_check_types_pass_through() {
    let models: DataModels = normalize(&json!({
        "orders": {
            "type": "table",
            "quality": [
                {"type": "great-expectations", "expectation": "expect_table_row_count_to_be_between"},
                {"type": "sql", "query": ""}
            ],
            "fields": {"id": {"type": "string"}}
        }
    }));

    let checks = &models["orders"].quality;
    assert_eq!(checks.len(), 1);
    assert!(matches!(checks[0], QualityCheck::Unstructured(_)));

    let excerpt = quality_excerpt(&models).unwrap();
    assert!(excerpt.contains("great-expectations"));
}
