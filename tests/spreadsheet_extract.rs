#![cfg(feature = "excel_test_writer")]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use etl_pipeline::extract::{
    open_source, Extract, FileOptions, FileSource, SheetSelection, SourceOptions, Spreadsheet,
};
use etl_pipeline::types::{DataType, FieldId, Value};

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("etl-pipeline-{name}-{nanos}.xlsx"))
}

fn write_people_xlsx(path: &PathBuf) {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();

    let notes = wb.add_worksheet();
    notes.set_name("Notes").unwrap();
    notes.write_string(0, 0, "not people").unwrap();

    let ws = wb.add_worksheet();
    ws.set_name("People").unwrap();

    // header
    ws.write_string(0, 0, "Name").unwrap();
    ws.write_string(0, 1, "Age").unwrap();
    ws.write_string(0, 2, "Active").unwrap();

    ws.write_string(1, 0, "Ada").unwrap();
    ws.write_number(1, 1, 36).unwrap();
    ws.write_boolean(1, 2, true).unwrap();

    // row 2 left empty

    ws.write_string(3, 0, "Grace").unwrap();
    ws.write_number(3, 1, 45).unwrap();

    wb.save(path).unwrap();
}

#[test]
fn reads_named_sheet_by_column_letter() {
    let path = tmp_file("people");
    write_people_xlsx(&path);

    let mut input = Spreadsheet::source(
        FileSource::path(&path),
        SheetSelection::Named("People".to_string()),
        FileOptions {
            header_rows: 1,
            names_from_header: true,
        },
    );
    input.setup().unwrap();

    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::letters("A").unwrap()), &Value::from("Ada"));
    assert_eq!(
        input.get(&FieldId::letters("B").unwrap()).coerce(DataType::Int64),
        Ok(Value::Int64(36))
    );
    assert_eq!(input.get(&FieldId::name("Active")), &Value::Bool(true));
    let origin = input.record().unwrap().origin().unwrap().to_string();
    assert!(origin.starts_with("row 2 of sheet 'People' in "));

    // The empty worksheet row is skipped.
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::name("Name")), &Value::from("Grace"));
    assert_eq!(input.get(&FieldId::name("Active")), &Value::Null);
    assert_eq!(input.record_number(), 2);

    assert!(!input.next_record().unwrap());
    input.finished();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn registry_defaults_to_first_sheet() {
    let path = tmp_file("first");
    write_people_xlsx(&path);

    let mut input = open_source(FileSource::path(&path), &SourceOptions::default()).unwrap();
    assert!(input.next_record().unwrap());
    assert_eq!(input.get(&FieldId::Column(0)), &Value::from("not people"));
    assert!(!input.next_record().unwrap());
    input.finished();

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_sheet_fails_at_setup() {
    let path = tmp_file("missing-sheet");
    write_people_xlsx(&path);

    let mut opts = SourceOptions::default();
    opts.sheet = SheetSelection::Named("Nope".to_string());
    let mut input = open_source(FileSource::path(&path), &opts).unwrap();
    let err = input.setup().unwrap_err();
    assert!(err.to_string().contains("not found"));
    input.finished();

    let _ = std::fs::remove_file(&path);
}
