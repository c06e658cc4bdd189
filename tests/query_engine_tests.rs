//! End-to-end query engine tests
//!
//! Covers:
//! - Model compilation (projection shape, generated SQL)
//! - Grouped aggregation with filters
//! - SORT and LIMIT combinations
//! - Expression-backed measures and soft-fail semantics

use serde_json::{json, Value};

use pivotdb::{
    build_query, AggregateKind, AnalyticsClient, Dimension, FilterValue, Measure,
    MemorySnapshotStore, QueryModel, RangeFilter, SortDir, SortKey,
};

fn dim(name: &str) -> Dimension {
    Dimension {
        name: name.to_string(),
        expression: None,
    }
}

fn measure(name: &str, agg: AggregateKind) -> Measure {
    Measure {
        name: name.to_string(),
        agg,
        expression: None,
        format: None,
    }
}

fn sample_client() -> AnalyticsClient<MemorySnapshotStore> {
    let mut client = AnalyticsClient::new(MemorySnapshotStore::new());
    client
        .load_dataset_text(
            Some("ads"),
            "channel,campaign,spend,clicks\n\
             Search,Brand,10,5\n\
             Search,Generic,5,1\n\
             Social,Brand,7,2\n\
             Social,Video,3,6\n\
             Display,Brand,2,4\n",
        )
        .unwrap();
    client
}

fn numbers(rows: &[serde_json::Map<String, Value>], field: &str) -> Vec<f64> {
    rows.iter()
        .map(|row| row.get(field).and_then(Value::as_f64).unwrap())
        .collect()
}

// ============================================================================
// Compilation
// ============================================================================

#[test]
fn test_projection_length_equals_dims_plus_measures() {
    let cases = vec![
        (vec![], vec![]),
        (vec![dim("channel")], vec![]),
        (
            vec![dim("channel"), dim("campaign")],
            vec![
                measure("spend", AggregateKind::Sum),
                measure("clicks", AggregateKind::Max),
            ],
        ),
    ];

    for (dimensions, measures) in cases {
        let expected = if dimensions.is_empty() && measures.is_empty() {
            1
        } else {
            dimensions.len() + measures.len()
        };
        let model = QueryModel {
            dimensions,
            measures,
            ..Default::default()
        };
        let compiled = build_query(&model, "ads");
        assert_eq!(compiled.projection.columns.len(), expected);
    }
}

#[test]
fn test_generated_sql_matches_model() {
    let mut model = QueryModel {
        dimensions: vec![dim("channel")],
        measures: vec![measure("spend", AggregateKind::Sum)],
        sort: vec![SortKey {
            field: "spend".to_string(),
            dir: SortDir::Desc,
        }],
        limit: Some(3),
        ..Default::default()
    };
    model.filters.insert(
        "campaign".to_string(),
        FilterValue::OneOf(vec![json!("Brand"), json!("Video")]),
    );

    let compiled = build_query(&model, "ads");
    assert_eq!(
        compiled.sql,
        "SELECT \"channel\" AS \"channel\", SUM(\"spend\") AS \"spend\" FROM \"ads\" \
         WHERE \"campaign\" IN ('Brand', 'Video') GROUP BY \"channel\" \
         ORDER BY \"spend\" DESC LIMIT 3"
    );
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_filtered_grouped_sum_end_to_end() {
    let mut client = AnalyticsClient::new(MemorySnapshotStore::new());
    client
        .load_dataset_text(
            Some("ads"),
            "channel,spend\nSearch,10\nSearch,5\nSocial,7\n",
        )
        .unwrap();

    let mut model = QueryModel {
        dimensions: vec![dim("channel")],
        measures: vec![measure("spend", AggregateKind::Sum)],
        ..Default::default()
    };
    model
        .filters
        .insert("channel".to_string(), FilterValue::Equals(json!("Search")));

    let out = client.run(&model, "explore".into()).unwrap();
    assert_eq!(out.result.rows.len(), 1);
    assert_eq!(out.result.rows[0].get("channel"), Some(&json!("Search")));
    assert_eq!(out.result.rows[0].get("spend"), Some(&json!(15.0)));
}

#[test]
fn test_group_count_bounded_by_distinct_keys() {
    let mut client = sample_client();
    let model = QueryModel {
        dimensions: vec![dim("channel")],
        measures: vec![measure("spend", AggregateKind::Count)],
        ..Default::default()
    };
    let out = client.run(&model, "explore".into()).unwrap();
    // Three distinct channels in the fixture.
    assert_eq!(out.result.rows.len(), 3);

    let mut filtered = model.clone();
    filtered.filters.insert(
        "spend".to_string(),
        FilterValue::Range(RangeFilter {
            min: Some(5.0),
            max: None,
        }),
    );
    let out = client.run(&filtered, "explore".into()).unwrap();
    // Display (spend 2) and Social/Video (spend 3) fail the filter.
    assert_eq!(out.result.rows.len(), 2);
    assert_eq!(numbers(&out.result.rows, "spend"), vec![2.0, 1.0]);
}

#[test]
fn test_avg_equals_sum_over_count() {
    let mut client = sample_client();
    let model = QueryModel {
        dimensions: vec![dim("channel")],
        measures: vec![
            measure("spend", AggregateKind::Sum),
            Measure {
                name: "avg_spend".to_string(),
                agg: AggregateKind::Avg,
                expression: Some("spend".to_string()),
                format: None,
            },
            Measure {
                name: "n".to_string(),
                agg: AggregateKind::Count,
                expression: None,
                format: None,
            },
        ],
        ..Default::default()
    };
    let out = client.run(&model, "explore".into()).unwrap();
    for row in &out.result.rows {
        let sum = row.get("spend").and_then(Value::as_f64).unwrap();
        let avg = row.get("avg_spend").and_then(Value::as_f64).unwrap();
        let count = row.get("n").and_then(Value::as_f64).unwrap();
        assert!(count > 0.0);
        assert!((avg - sum / count).abs() < 1e-9);
    }
}

#[test]
fn test_expression_measure_soft_fails_to_zero() {
    let mut client = AnalyticsClient::new(MemorySnapshotStore::new());
    client
        .load_dataset_text(Some("ads"), "channel,revenue,clicks\nSearch,100,0\n")
        .unwrap();

    let model = QueryModel {
        dimensions: vec![dim("channel")],
        measures: vec![Measure {
            name: "rpc".to_string(),
            agg: AggregateKind::Sum,
            expression: Some("revenue / clicks".to_string()),
            format: None,
        }],
        ..Default::default()
    };
    let out = client.run(&model, "explore".into()).unwrap();
    assert_eq!(out.result.rows[0].get("rpc"), Some(&json!(0.0)));
}

// ============================================================================
// Sort and limit
// ============================================================================

#[test]
fn test_ascending_sort_yields_non_decreasing_values() {
    let mut client = sample_client();
    let model = QueryModel {
        dimensions: vec![dim("channel"), dim("campaign")],
        measures: vec![measure("spend", AggregateKind::Sum)],
        sort: vec![SortKey {
            field: "spend".to_string(),
            dir: SortDir::Asc,
        }],
        ..Default::default()
    };
    let out = client.run(&model, "explore".into()).unwrap();
    let values = numbers(&out.result.rows, "spend");
    assert!(values.windows(2).all(|w| w[0] <= w[1]));

    let mut desc = model.clone();
    desc.sort[0].dir = SortDir::Desc;
    let out = client.run(&desc, "explore".into()).unwrap();
    let reversed = numbers(&out.result.rows, "spend");
    assert!(reversed.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_limit_preserves_relative_order() {
    let mut client = sample_client();
    let full = QueryModel {
        dimensions: vec![dim("channel"), dim("campaign")],
        measures: vec![measure("spend", AggregateKind::Sum)],
        sort: vec![SortKey {
            field: "spend".to_string(),
            dir: SortDir::Desc,
        }],
        ..Default::default()
    };
    let all = client.run(&full, "explore".into()).unwrap();

    let mut limited = full.clone();
    limited.limit = Some(2);
    let top = client.run(&limited, "explore".into()).unwrap();

    assert_eq!(top.result.rows.len(), 2);
    assert_eq!(top.result.rows[..], all.result.rows[..2]);

    let mut oversized = full;
    oversized.limit = Some(100);
    let out = client.run(&oversized, "explore".into()).unwrap();
    assert_eq!(out.result.rows.len(), all.result.rows.len());
}
