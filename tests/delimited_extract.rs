use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use etl_pipeline::extract::{
    open_source, DelimitedOptions, DelimitedText, Extract, FileOptions, FileSource, SourceOptions,
};
use etl_pipeline::types::{FieldId, Value};
use etl_pipeline::EtlError;

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("etl-pipeline-{name}-{nanos}.csv"))
}

fn col(n: usize) -> FieldId {
    FieldId::Column(n)
}

#[test]
fn reads_every_row_when_there_are_no_headers() {
    let mut input = DelimitedText::from_path("tests/fixtures/people.csv");
    input.setup().unwrap();

    let mut names = Vec::new();
    while input.next_record().unwrap() {
        names.push(input.get(&col(0)).clone());
        assert_eq!(input.record_number(), names.len());
    }
    input.finished();

    assert_eq!(
        names,
        vec![Value::from("Ada"), Value::from("Grace"), Value::from("Linus")]
    );
    assert!(input.end_of_input());
    assert_eq!(input.record_number(), 3);
}

#[test]
fn skips_headers_and_blank_rows() {
    let mut input = DelimitedText::from_path("tests/fixtures/people_headers.csv").header_rows(2);

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&col(0)), &Value::from("Ada"));
    assert_eq!(input.record().unwrap().origin(), Some("row 3 in people_headers.csv"));

    // Row 4 is all empty fields; row 6 is whitespace only.
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&col(0)), &Value::from("Grace"));
    assert_eq!(input.record_number(), 2);
    assert_eq!(input.get(&col(2)), &Value::Null);

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&col(0)), &Value::from("Linus"));
    assert_eq!(input.record_number(), 3);

    assert!(!input.next_record().unwrap());
    assert!(input.end_of_input());
    input.finished();
}

#[test]
fn header_row_names_columns() {
    let mut input = DelimitedText::from_path("tests/fixtures/people_headers.csv")
        .header_rows(2)
        .names_from_header(true);

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("Name")), &Value::from("Ada"));
    assert_eq!(input.get(&FieldId::name("City")), &Value::from("London"));
    // Positional access still works.
    assert_eq!(input.get(&col(1)), &Value::from("36"));
    assert_eq!(input.header_names().len(), 3);
    input.finished();
}

#[test]
fn fewer_rows_than_header_count_is_an_empty_result() {
    let path = tmp_file("short");
    std::fs::write(&path, "only one line\n").unwrap();

    let mut input = DelimitedText::from_path(&path).header_rows(2);
    input.setup().unwrap();
    assert!(!input.next_record().unwrap());
    assert!(input.end_of_input());
    assert_eq!(input.record_number(), 0);
    input.finished();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn exact_header_count_leaves_no_records() {
    let path = tmp_file("headers-only");
    std::fs::write(&path, "a,b\nc,d\n").unwrap();

    let mut input = DelimitedText::from_path(&path).header_rows(2);
    assert!(!input.next_record().unwrap());
    assert!(input.end_of_input());
    input.finished();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn custom_delimiter_and_quotes() {
    let options = DelimitedOptions {
        delimiter: b';',
        ..Default::default()
    };
    let file = FileOptions {
        header_rows: 1,
        names_from_header: true,
    };
    let mut input = DelimitedText::source(FileSource::path("tests/fixtures/semicolon.csv"), options, file);

    assert!(input.next_record().unwrap());
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("name")), &Value::from("Hopper; Grace"));
    assert_eq!(input.get(&FieldId::name("score")), &Value::from("87.25"));
    assert!(!input.next_record().unwrap());
    input.finished();
}

#[test]
fn missing_field_reads_as_null() {
    let mut input = DelimitedText::from_path("tests/fixtures/people.csv");
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&col(9)), &Value::Null);
    assert_eq!(input.get(&FieldId::name("nope")), &Value::Null);
    input.finished();
}

#[test]
fn missing_file_fails_at_setup() {
    let mut input = DelimitedText::from_path("tests/fixtures/does_not_exist.csv");
    let err = input.setup().unwrap_err();
    assert!(matches!(err, EtlError::ResourceOpen { .. }));
    assert!(err.to_string().contains("does_not_exist.csv"));
    input.finished();
}

#[test]
fn registry_infers_delimited_text_from_extension() {
    let mut opts = SourceOptions::default();
    opts.file.header_rows = 2;

    let mut input = open_source(FileSource::path("tests/fixtures/people_headers.csv"), &opts).unwrap();
    let mut count = 0;
    while input.next_record().unwrap() {
        count += 1;
    }
    input.finished();
    assert_eq!(count, 3);
}

#[test]
fn source_found_by_pattern() {
    let source = FileSource::matching("tests/fixtures/inbox", "report-*.csv");
    let mut input = DelimitedText::source(source, DelimitedOptions::default(), FileOptions::default());

    input.setup().unwrap();
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&col(0)), &Value::from("Ada"));
    assert_eq!(
        input.path().and_then(|p| p.file_name()).and_then(|f| f.to_str()),
        Some("report-2024-01.csv")
    );
    input.finished();
}

#[test]
fn empty_lines_count_as_physical_rows() {
    // Row 2 is an empty line inside the header block; rows 5 and 6 are empty lines between data.
    let mut input = DelimitedText::from_path("tests/fixtures/blank_lines.csv")
        .header_rows(3)
        .names_from_header(true);

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("Name")), &Value::from("Ada"));
    assert_eq!(input.record().unwrap().origin(), Some("row 4 in blank_lines.csv"));
    assert_eq!(input.record_number(), 1);

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("Age")), &Value::from("45"));
    assert_eq!(input.record().unwrap().origin(), Some("row 7 in blank_lines.csv"));
    assert_eq!(input.record_number(), 2);
    assert_eq!(input.position(), 7);

    assert!(!input.next_record().unwrap());
    input.finished();
}

#[test]
fn trailing_empty_lines_are_not_records() {
    let path = tmp_file("trailing-empty");
    std::fs::write(&path, "Ada,36\r\n\r\nGrace,45\r\n\r\n\r\n").unwrap();

    let mut input = DelimitedText::from_path(&path);
    assert!(input.next_record().unwrap());
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&col(0)), &Value::from("Grace"));
    assert_eq!(input.position(), 3);
    assert!(!input.next_record().unwrap());
    assert_eq!(input.record_number(), 2);
    assert_eq!(input.position(), 5);
    input.finished();

    let _ = std::fs::remove_file(&path);
}
