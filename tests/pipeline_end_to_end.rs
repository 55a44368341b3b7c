use etl_pipeline::extract::{DelimitedText, Extract, MemoryRows};
use etl_pipeline::load::{DuplicatePolicy, HashLoader, Load, MemoryLoader, StoreEntry, WriteOutcome};
use etl_pipeline::pipeline::{Pipeline, RunReport};
use etl_pipeline::types::{Fields, Value};
use etl_pipeline::EtlError;

fn person(name: &str, age: &str) -> Fields {
    Fields::from([
        ("Age".to_string(), Value::from(age)),
        ("Name".to_string(), Value::from(name)),
        ("Source".to_string(), Value::from("import")),
    ])
}

#[test]
fn csv_into_keyed_store_with_constant() {
    let mut store = HashLoader::new("Name");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(DelimitedText::from_path("tests/fixtures/people.csv"))
        .load(&mut store)
        .map("Name", 0)
        .map("Age", 1)
        .constant("Source", "import");
    let report = pipeline.run().unwrap();
    drop(pipeline);

    assert_eq!(report.records_read, 3);
    assert_eq!(report.records_written, 3);
    assert!(report.failures.is_empty());

    assert_eq!(store.store().len(), 3);
    assert_eq!(
        store.get("Ada"),
        Some(&StoreEntry::Many(vec![person("Ada", "36")]))
    );
    assert_eq!(store.get("Grace").unwrap().records(), &[person("Grace", "45")]);
    assert_eq!(store.get("Linus").unwrap().records(), &[person("Linus", "28")]);
}

#[test]
fn headers_and_blank_rows_do_not_reach_the_loader() {
    let mut out = MemoryLoader::new();

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(
            DelimitedText::from_path("tests/fixtures/people_headers.csv")
                .header_rows(2)
                .names_from_header(true),
        )
        .load(&mut out)
        .map("who", "Name")
        .map("where", "City")
        .map_with("n", |e| Value::Int64(e.record_number() as i64));
    let report = pipeline.run().unwrap();
    drop(pipeline);

    assert_eq!(report.records_written, 3);
    let rows: Vec<(String, String, String)> = out
        .records()
        .iter()
        .map(|r| (r["n"].to_string(), r["who"].to_string(), r["where"].to_string()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("1".to_string(), "Ada".to_string(), "London".to_string()),
            ("2".to_string(), "Grace".to_string(), String::new()),
            ("3".to_string(), "Linus".to_string(), "Helsinki".to_string()),
        ]
    );
}

fn load_same_key_twice(policy: DuplicatePolicy) -> (HashLoader, RunReport) {
    let mut store = HashLoader::new("id").duplicates(policy);
    let report = {
        let mut pipeline = Pipeline::new();
        pipeline
            .extract(MemoryRows::new(vec![vec!["K", "r1"], vec!["K", "r2"]]))
            .load(&mut store)
            .map("id", 0)
            .map("tag", 1);
        pipeline.run().unwrap()
    };
    (store, report)
}

fn tagged(tag: &str) -> Fields {
    Fields::from([
        ("id".to_string(), Value::from("K")),
        ("tag".to_string(), Value::from(tag)),
    ])
}

#[test]
fn keep_collects_duplicates_in_order() {
    let (store, report) = load_same_key_twice(DuplicatePolicy::Keep);
    assert_eq!(report.records_written, 2);
    assert_eq!(store.get("K"), Some(&StoreEntry::Many(vec![tagged("r1"), tagged("r2")])));
}

#[test]
fn overwrite_keeps_the_last_duplicate() {
    let (store, report) = load_same_key_twice(DuplicatePolicy::Overwrite);
    assert_eq!(report.records_written, 2);
    assert_eq!(store.get("K"), Some(&StoreEntry::One(tagged("r2"))));
}

#[test]
fn skip_keeps_the_first_duplicate_and_reports_the_second() {
    let (store, report) = load_same_key_twice(DuplicatePolicy::Skip);
    assert_eq!(store.get("K"), Some(&StoreEntry::One(tagged("r1"))));

    assert_eq!(report.records_written, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].record_number, 2);
    assert!(matches!(report.failures[0].outcome, WriteOutcome::Skipped(_)));
}

#[test]
fn records_without_key_are_set_aside() {
    let mut store = HashLoader::new("Name");

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(MemoryRows::new(vec![vec!["Ada", "36"], vec!["", "99"]]))
        .load(&mut store)
        .map("Name", 0)
        .map("Age", 1);
    let report = pipeline.run().unwrap();
    drop(pipeline);

    assert_eq!(report.records_read, 2);
    assert_eq!(report.records_written, 1);
    assert_eq!(report.failures[0].origin.as_deref(), Some("record 2 in memory"));
    assert_eq!(store.unkeyed().len(), 1);
    assert_eq!(store.unkeyed()[0]["Age"], Value::from("99"));
}

#[test]
fn second_run_does_not_see_first_run_configuration() {
    let mut first = MemoryLoader::new();
    let mut second = MemoryLoader::new();

    let mut pipeline = Pipeline::new();
    pipeline
        .extract(MemoryRows::new(vec![vec!["a", "b"]]))
        .load(&mut first)
        .map("x", 0)
        .map("y", 1)
        .constant("tag", "first");
    pipeline.run().unwrap();

    pipeline
        .extract(MemoryRows::new(vec![vec!["c", "d"]]))
        .load(&mut second)
        .map("z", 1);
    pipeline.run().unwrap();
    drop(pipeline);

    assert_eq!(
        first.records(),
        &[Fields::from([
            ("tag".to_string(), Value::from("first")),
            ("x".to_string(), Value::from("a")),
            ("y".to_string(), Value::from("b")),
        ])]
    );
    assert_eq!(
        second.records(),
        &[Fields::from([("z".to_string(), Value::from("d"))])]
    );
}

#[test]
fn missing_configuration_fails_before_any_input_is_read() {
    let mut input = MemoryRows::new(vec![vec!["a"]]);

    let mut pipeline = Pipeline::new();
    pipeline.extract(&mut input).map("x", 0);
    let err = pipeline.run().unwrap_err();
    drop(pipeline);

    assert!(matches!(err, EtlError::Configuration { .. }));
    assert!(err.to_string().contains("no loader configured"));
    assert_eq!(input.remaining(), 1);
    assert_eq!(input.record_number(), 0);
}

#[test]
fn unopenable_source_fails_the_run_and_closes_the_loader() {
    struct Tracking<'t>(&'t mut Vec<&'static str>);

    impl Load for Tracking<'_> {
        fn setup(&mut self, _extract: &dyn Extract) -> etl_pipeline::EtlResult<()> {
            self.0.push("setup");
            Ok(())
        }
        fn set(&mut self, _field: &str, _value: Value) {}
        fn write_record(&mut self, _record_number: usize) -> WriteOutcome {
            WriteOutcome::Written
        }
        fn records_written(&self) -> usize {
            0
        }
        fn finished(&mut self) -> etl_pipeline::EtlResult<()> {
            self.0.push("finished");
            Ok(())
        }
        fn describe(&self) -> String {
            "tracking".to_string()
        }
    }

    let mut calls = Vec::new();
    let mut pipeline = Pipeline::new();
    pipeline
        .extract(DelimitedText::from_path("tests/fixtures/does_not_exist.csv"))
        .load(Tracking(&mut calls))
        .map("x", 0);
    let err = pipeline.run().unwrap_err();
    drop(pipeline);

    assert!(matches!(err, EtlError::ResourceOpen { .. }));
    assert_eq!(calls, vec!["finished"]);
}
