//! End-to-end SPL → query-DSL transfer scenarios.
//!
//! These pin the exact wire shape of the produced documents, the default
//! and clamped paging behavior, and the way the optional type catalog
//! gates transpilation.

use serde_json::json;
use splq_core::ast::FieldValueType;
use splq_dsl::{transpile, SplError, Transpiler, TypeMapping};

#[test]
fn plain_query_document_shape() {
    let dsl = transpile("a=1 AND NOT b=\"x\"").unwrap();
    assert_eq!(
        serde_json::to_value(&dsl).unwrap(),
        json!({
            "query": {
                "query_string": {
                    "query": "a_number:1 AND NOT b_string:\"x\"",
                    "default_field": "_message"
                }
            },
            "from": 0,
            "size": 10,
            "_source": [],
            "sort": [
                { "_event_time": { "order": "desc", "unmapped_type": "long" } }
            ]
        })
    );
}

#[test]
fn aggregation_document_shape() {
    let dsl = transpile("* | stats count(fieldName) by group1, group2").unwrap();
    assert_eq!(
        serde_json::to_value(dsl.aggs.unwrap()).unwrap(),
        json!({
            "group1": {
                "terms": { "field": "group1", "size": 10000 },
                "aggs": {
                    "group2": {
                        "terms": { "field": "group2", "size": 10000 },
                        "aggs": {
                            "count(fieldName)": {
                                "terms": { "field": "fieldName", "size": 10000 }
                            }
                        }
                    }
                }
            }
        })
    );
}

#[test]
fn metric_aggregation_uses_typed_field() {
    let dsl = transpile("* | stats avg(latency)").unwrap();
    assert_eq!(
        serde_json::to_value(dsl.aggs.unwrap()).unwrap(),
        json!({
            "avg(latency)": { "avg": { "field": "latency_number" } }
        })
    );
}

#[test]
fn script_fields_document_shape() {
    let dsl = transpile("* | eval newField=ceil(fieldName*(3+4))").unwrap();
    assert_eq!(
        serde_json::to_value(dsl.script_fields.unwrap()).unwrap(),
        json!({
            "newField": {
                "script": {
                    "lang": "painless",
                    "source": "Math.ceil(doc['fieldName_number'].value*(3+4))"
                }
            }
        })
    );
}

#[test]
fn explicit_sort_document_shape() {
    let dsl = transpile("* | sort by ts-, host+").unwrap();
    assert_eq!(
        serde_json::to_value(dsl.sort.unwrap()).unwrap(),
        json!([
            { "ts_string": { "order": "desc", "unmapped_type": "string" } },
            { "host_string": { "order": "asc", "unmapped_type": "string" } }
        ])
    );
}

#[test]
fn range_and_regexp_values_pass_through() {
    let dsl = transpile("lat=[10 TO 200] AND path=/api.*/").unwrap();
    assert_eq!(
        dsl.query.query_string.query,
        "lat_number:[10 TO 200] AND path_string:/api.*/"
    );
}

#[test]
fn bracketed_field_names_are_escaped() {
    let dsl = transpile("a[0]=1").unwrap();
    assert_eq!(dsl.query.query_string.query, "a\\[0\\]_number:1");
}

#[test]
fn size_defaults_and_clamping() {
    assert_eq!(transpile("*").unwrap().size, Some(10));
    assert_eq!(transpile("* | limit 500").unwrap().size, Some(500));
    assert_eq!(transpile("* | limit 20000").unwrap().size, Some(10000));
}

#[test]
fn fields_command_prefixes_system_fields() {
    let dsl = transpile("* | fields host").unwrap();
    assert_eq!(
        dsl.source,
        Some(vec![
            "_message".to_string(),
            "_event_time".to_string(),
            "host_string".to_string()
        ])
    );
}

#[test]
fn type_catalog_gates_transpilation() {
    let mut mapping = TypeMapping::new();
    mapping.insert(
        "level".to_string(),
        vec![FieldValueType::String],
    );
    mapping.insert(
        "latency".to_string(),
        vec![FieldValueType::Number, FieldValueType::Range],
    );
    let transpiler = Transpiler::new(Some(mapping));

    assert!(transpiler.transpile("level=error AND latency=[1 TO 9]").is_ok());
    assert!(matches!(
        transpiler.transpile("level=3"),
        Err(SplError::FieldType(_))
    ));
    assert!(matches!(
        transpiler.transpile("unknown=1"),
        Err(SplError::FieldType(_))
    ));
    // System fields need no catalog entry.
    assert!(transpiler.transpile("_exists_=level").is_ok());
}

#[test]
fn no_catalog_means_no_gating() {
    let transpiler = Transpiler::new(None);
    assert!(transpiler.transpile("anything=atall").is_ok());
}

#[test]
fn unsupported_commands_name_the_offender() {
    let err = transpile("* | table host").unwrap_err();
    assert!(err.to_string().contains("table"), "{err}");

    let err = transpile("* | transaction session maxopentxn=5").unwrap_err();
    assert!(err.to_string().contains("transaction"), "{err}");
}

#[test]
fn syntax_errors_surface_through_the_pipeline() {
    let err = transpile("a=").unwrap_err();
    match err {
        SplError::Syntax(syntax) => {
            assert_eq!(syntax.location.offset, 2);
            assert!(!syntax.expected.is_empty());
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
}
