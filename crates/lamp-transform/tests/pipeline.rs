//! Integration tests: end-to-end batches over the weather schema and the
//! bundled fixtures, plus ordering and idempotence properties.

use std::sync::Arc;

use lamp_core::{FieldType, MapError, RawRecord, SchemaError, TypedValue};
use lamp_schema::{FieldDefinition, SchemaDocument};
use lamp_transform::{
    run_batch, write_records, write_skip_report, ColumnMapping, DriverError, FieldMapper,
    PipelineConfig, SkipReason, Stage, TransformDriver,
};
use proptest::prelude::*;

const WEATHER_SCHEMA: &str = r#"[
    {"name": "location", "type": "GEOGRAPHY", "mode": "REQUIRED"},
    {"name": "average_temperature", "type": "INTEGER", "mode": "REQUIRED"},
    {"name": "month", "type": "STRING", "mode": "REQUIRED"},
    {"name": "inches_of_rain", "type": "NUMERIC"},
    {"name": "is_current", "type": "BOOLEAN"},
    {"name": "latest_measurement", "type": "DATE"}
]"#;

const SCENARIO_LINE: &str = "37.7749,-122.4194,68,January,3.2,true,2024-01-15";

fn repo_root() -> std::path::PathBuf {
    let mut dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

/// The 7-column layout: latitude and longitude both feed `location`.
fn weather_config() -> PipelineConfig {
    PipelineConfig {
        columns: Some(
            [
                "location",
                "location",
                "average_temperature",
                "month",
                "inches_of_rain",
                "is_current",
                "latest_measurement",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ),
        ..PipelineConfig::default()
    }
}

#[test]
fn scenario_a_valid_line_is_emitted() {
    let report = run_batch(WEATHER_SCHEMA, SCENARIO_LINE, &weather_config()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.emitted.len(), 1);

    let r = &report.emitted[0];
    assert_eq!(
        r.get("location"),
        Some(&TypedValue::Geography("37.7749,-122.4194".parse().unwrap()))
    );
    assert_eq!(r.get("average_temperature"), Some(&TypedValue::Integer(68)));
    assert_eq!(r.get("month"), Some(&TypedValue::String("January".into())));
    assert_eq!(
        r.get("inches_of_rain"),
        Some(&TypedValue::Numeric("3.2".parse().unwrap()))
    );
    assert_eq!(r.get("is_current"), Some(&TypedValue::Boolean(true)));
    assert_eq!(
        r.get("latest_measurement"),
        Some(&TypedValue::Date(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        ))
    );
}

#[test]
fn scenario_b_type_mismatch_is_skipped() {
    let input = "37.7749,-122.4194,sixty-eight,January,3.2,true,2024-01-15";
    let report = run_batch(WEATHER_SCHEMA, input, &weather_config()).unwrap();
    assert!(report.emitted.is_empty());
    assert_eq!(report.skipped.len(), 1);
    match &report.skipped[0].reason {
        SkipReason::Map(MapError::TypeMismatch { field, expected, token, .. }) => {
            assert_eq!(field, "average_temperature");
            assert_eq!(*expected, FieldType::Integer);
            assert_eq!(token, "sixty-eight");
        }
        other => panic!("unexpected skip reason: {other:?}"),
    }
}

#[test]
fn scenario_c_short_line_is_skipped_and_later_lines_emitted() {
    let input = format!("37.7749,-122.4194,68,January,3.2,true\n{SCENARIO_LINE}\n");
    let report = run_batch(WEATHER_SCHEMA, &input, &weather_config()).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].line, 1);
    assert_eq!(
        report.skipped[0].reason,
        SkipReason::Map(MapError::ColumnCountMismatch { expected: 7, found: 6 })
    );
    assert_eq!(report.emitted.len(), 1);
}

#[test]
fn scenario_d_duplicate_field_aborts() {
    let schema = r#"[
        {"name": "month", "type": "STRING", "mode": "REQUIRED"},
        {"name": "month", "type": "STRING"}
    ]"#;
    let err = run_batch(schema, "January", &PipelineConfig::default()).unwrap_err();
    match err {
        DriverError::Aborted(SchemaError::DuplicateField { name }) => assert_eq!(name, "month"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_input_yields_nothing() {
    let report = run_batch(WEATHER_SCHEMA, "", &weather_config()).unwrap();
    assert!(report.emitted.is_empty());
    assert!(report.skipped.is_empty());
    assert!(!report.cancelled);
}

#[test]
fn missing_required_value_is_a_validation_skip() {
    let input = "37.7749,-122.4194,,January,3.2,true,2024-01-15";
    let report = run_batch(WEATHER_SCHEMA, input, &weather_config()).unwrap();
    assert!(report.emitted.is_empty());
    let skip = &report.skipped[0];
    assert_eq!(skip.reason.stage(), Stage::Validating);
    let v = skip.reason.violations();
    assert_eq!(v.len(), 1);
    assert_eq!(v[0].field_name, "average_temperature");
    assert_eq!(v[0].reason, "missing required field");
}

#[test]
fn bundled_fixtures_run() {
    let root = repo_root();
    let schema = std::fs::read_to_string(root.join("files/jsonSchema.json")).unwrap();
    let input = std::fs::read_to_string(root.join("files/inputFile.txt")).unwrap();
    let config = PipelineConfig::load(&root.join("files/pipeline.yaml")).unwrap();

    let report = run_batch(&schema, &input, &config).unwrap();

    let emitted_months: Vec<&TypedValue> =
        report.emitted.iter().map(|r| r.get("month").unwrap()).collect();
    assert_eq!(
        emitted_months,
        [
            &TypedValue::String("January".into()),
            &TypedValue::String("February".into()),
            &TypedValue::String("June".into()),
        ]
    );
    let skipped_lines: Vec<usize> = report.skipped.iter().map(|s| s.line).collect();
    assert_eq!(skipped_lines, [3, 4, 5]);

    let mut out = Vec::new();
    write_records(&report.emitted, &mut out).unwrap();
    let first: serde_json::Value =
        serde_json::from_str(std::str::from_utf8(&out).unwrap().lines().next().unwrap()).unwrap();
    assert_eq!(first["location"], "POINT(-122.4194 37.7749)");
    assert_eq!(first["inches_of_rain"], "3.2");

    let mut skips = Vec::new();
    write_skip_report(&report.skipped, &mut skips).unwrap();
    assert_eq!(std::str::from_utf8(&skips).unwrap().lines().count(), 3);
}

#[test]
fn fixtures_run_the_same_in_parallel() {
    let root = repo_root();
    let schema = std::fs::read_to_string(root.join("files/jsonSchema.json")).unwrap();
    let input = std::fs::read_to_string(root.join("files/inputFile.txt")).unwrap();
    let config = PipelineConfig::load(&root.join("files/pipeline.yaml")).unwrap();
    let parallel = PipelineConfig {
        parallelism: 3,
        ..config.clone()
    };
    assert_eq!(
        run_batch(&schema, &input, &config).unwrap(),
        run_batch(&schema, &input, &parallel).unwrap()
    );
}

#[test]
fn bom_and_non_utf8_line_do_not_sink_the_batch() {
    let schema = r#"[{"name":"n","type":"INTEGER","mode":"REQUIRED"},{"name":"pair","type":"STRING"}]"#;
    let input: &[u8] = b"\xEF\xBB\xBF1,\"1,2\"\n2,\"1,\xff\"\n3,\"3,4\"\n";
    for parallelism in [1, 2] {
        let config = PipelineConfig {
            parallelism,
            ..PipelineConfig::default()
        };
        let report = run_batch(schema, input, &config).unwrap();
        let ns: Vec<&TypedValue> = report.emitted.iter().map(|r| r.get("n").unwrap()).collect();
        assert_eq!(ns, [&TypedValue::Integer(1), &TypedValue::Integer(3)]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].line, 2);
        assert_eq!(report.skipped[0].reason.stage(), Stage::Parsing);
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

fn field_type() -> impl Strategy<Value = FieldType> {
    prop::sample::select(FieldType::all().to_vec())
}

/// A token that always coerces to `t`.
fn coercible_token(t: FieldType) -> BoxedStrategy<String> {
    match t {
        FieldType::Integer => any::<i64>().prop_map(|i| i.to_string()).boxed(),
        FieldType::Numeric => "[+-]?[0-9]{1,20}(\\.[0-9]{1,9})?".boxed(),
        FieldType::Boolean => prop::sample::select(vec!["true", "false", "TRUE", "False"])
            .prop_map(str::to_string)
            .boxed(),
        FieldType::Date => (1000i32..=9999, 1u32..=12, 1u32..=28)
            .prop_map(|(y, m, d)| format!("{y:04}-{m:02}-{d:02}"))
            .boxed(),
        FieldType::Geography => (-90.0f64..=90.0, -180.0f64..=180.0)
            .prop_map(|(lat, lon)| format!("POINT({lon} {lat})"))
            .boxed(),
        FieldType::String => "[ -~]{0,12}".boxed(),
    }
}

fn typed_fields() -> impl Strategy<Value = Vec<FieldType>> {
    prop::collection::vec(field_type(), 1..8)
}

fn schema_for(types: &[FieldType]) -> SchemaDocument {
    SchemaDocument::from_fields(
        types
            .iter()
            .enumerate()
            .map(|(i, t)| FieldDefinition::new(format!("f{i}"), *t))
            .collect(),
    )
    .unwrap()
}

/// Lines for a fixed `INTEGER, STRING, BOOLEAN` schema, mixing good rows,
/// type errors, short rows, blank lines, and broken quoting.
fn batch_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (any::<i32>(), "[a-z]{0,6}", any::<bool>())
            .prop_map(|(i, s, b)| format!("{i},{s},{b}")),
        1 => "[a-z]{1,4},[a-z]{0,4},true",
        1 => Just("1,short".to_string()),
        1 => Just(String::new()),
        1 => Just("2,\"open,false".to_string()),
        1 => Just(",missing,true".to_string()),
    ]
}

fn batch_schema() -> Arc<SchemaDocument> {
    Arc::new(
        SchemaDocument::from_fields(vec![
            FieldDefinition::new("id", FieldType::Integer).required(),
            FieldDefinition::new("label", FieldType::String),
            FieldDefinition::new("flag", FieldType::Boolean),
        ])
        .unwrap(),
    )
}

proptest! {
    /// Tokens that fit their declared types always map.
    #[test]
    fn coercible_tokens_always_map(
        (types, tokens) in typed_fields().prop_flat_map(|types| {
            let tokens: Vec<BoxedStrategy<String>> =
                types.iter().map(|t| coercible_token(*t)).collect();
            (Just(types), tokens)
        })
    ) {
        let schema = schema_for(&types);
        let mapper = FieldMapper::new(ColumnMapping::from_schema(&schema));
        let record = mapper.map(&RawRecord::new(1, tokens));
        prop_assert!(record.is_ok(), "{:?}", record);
        prop_assert_eq!(record.unwrap().len(), types.len());
    }

    /// Running the same batch twice gives identical reports.
    #[test]
    fn batch_is_idempotent(lines in prop::collection::vec(batch_line(), 0..40)) {
        let input = lines.join("\n");
        let mut driver = TransformDriver::new(batch_schema(), &PipelineConfig::default()).unwrap();
        let first = driver.run(&input);
        let second = driver.run(&input);
        prop_assert_eq!(first, second);
    }

    /// Fan-out gives the sequential result, in line order.
    #[test]
    fn parallel_matches_sequential(
        lines in prop::collection::vec(batch_line(), 0..60),
        workers in 2usize..8,
    ) {
        let input = lines.join("\n");
        let sequential = TransformDriver::new(batch_schema(), &PipelineConfig::default())
            .unwrap()
            .run(&input);
        let config = PipelineConfig { parallelism: workers, ..PipelineConfig::default() };
        let parallel = TransformDriver::new(batch_schema(), &config).unwrap().run(&input);
        prop_assert_eq!(&parallel, &sequential);

        let skipped: Vec<usize> = parallel.skipped.iter().map(|s| s.line).collect();
        let mut sorted = skipped.clone();
        sorted.sort_unstable();
        prop_assert_eq!(skipped, sorted);
    }

    /// Every non-blank line is either emitted or skipped, so the skip report
    /// is empty exactly when every line emitted.
    #[test]
    fn every_line_is_accounted_for(lines in prop::collection::vec(batch_line(), 0..40)) {
        let input = lines.join("\n");
        let report = TransformDriver::new(batch_schema(), &PipelineConfig::default())
            .unwrap()
            .run(&input);
        let non_blank = lines.iter().filter(|l| !l.trim().is_empty()).count();
        prop_assert_eq!(report.emitted.len() + report.skipped.len(), non_blank);
        prop_assert_eq!(report.is_clean(), report.emitted.len() == non_blank);
    }
}
