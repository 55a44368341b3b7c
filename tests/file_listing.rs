use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use etl_pipeline::extract::{Extract, FileListing, ListingOptions};
use etl_pipeline::load::MemoryLoader;
use etl_pipeline::pipeline::Pipeline;
use etl_pipeline::types::{FieldId, Value};

fn tmp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("etl-pipeline-{name}-{nanos}"));
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.csv"), "1,2\n").unwrap();
    fs::write(dir.join("a.txt"), "hello").unwrap();
    fs::write(dir.join("nested").join("c.csv"), "3\n").unwrap();
    dir
}

#[test]
fn lists_top_level_files_in_name_order() {
    let dir = tmp_dir("listing");
    let mut input = FileListing::new(&dir);
    input.setup().unwrap();

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("file")), &Value::from("a.txt"));
    assert_eq!(input.get(&FieldId::name("stem")), &Value::from("a"));
    assert_eq!(input.get(&FieldId::name("extension")), &Value::from("txt"));
    assert_eq!(input.get(&FieldId::name("size")), &Value::Int64(5));

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("file")), &Value::from("b.csv"));

    assert!(!input.next_record().unwrap());
    assert!(input.end_of_input());
    input.finished();

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn pattern_and_depth_filter_files() {
    let dir = tmp_dir("listing-deep");
    let options = ListingOptions {
        pattern: "*.csv".to_string(),
        max_depth: None,
    };

    let mut out = MemoryLoader::new();
    let mut pipeline = Pipeline::new();
    pipeline
        .extract(FileListing::with_options(&dir, options))
        .load(&mut out)
        .map("relative", "relative");
    pipeline.run().unwrap();
    drop(pipeline);

    let relative: Vec<String> = out
        .records()
        .iter()
        .map(|r| r["relative"].to_string())
        .collect();
    let nested = PathBuf::from("nested").join("c.csv").display().to_string();
    assert_eq!(relative, vec!["b.csv".to_string(), nested]);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_root_fails_at_setup() {
    let mut input = FileListing::new("tests/fixtures/no_such_dir");
    assert!(input.setup().is_err());
}
