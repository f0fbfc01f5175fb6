use std::path::PathBuf;
use uuid::Uuid;
use vital_monitor::collector::{
    parse_assignment, read_csv_window, read_json_window, validate_window, window_request, FormCollector,
    DEFAULT_FORM, MAX_UPLOAD_BYTES,
};
use vital_monitor::{ErrorKind, MonitorError, PredictionRequest, ValidationError, WindowPayload};

fn scratch_path(extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vital-window-{}.{}", Uuid::new_v4(), extension))
}

fn csv_window(rows: usize) -> Vec<u8> {
    let mut csv = String::from("Age,BMI,Derived_HRV\n");
    for i in 0..rows {
        csv.push_str(&format!("45,24.5,{}\n", 5 + i));
    }
    csv.into_bytes()
}

#[test]
fn test_form_starts_with_default_fields() {
    let form = FormCollector::new();
    let names: Vec<&str> = form.fields().map(|(name, _)| name).collect();
    let expected: Vec<&str> = DEFAULT_FORM.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, expected);

    let record = form.collect().expect("defaults are numeric");
    assert_eq!(record.get("Age"), Some(45.0));
    assert_eq!(record.get("BMI"), Some(24.5));
    assert_eq!(record.get("Derived_MAP"), Some(90.0));
}

#[test]
fn test_form_edits_and_new_fields() {
    let mut form = FormCollector::new();
    form.set("Age", " 61 ");
    form.set("Resting Glucose", "5.4");

    let record = form.collect().unwrap();
    assert_eq!(record.get("Age"), Some(61.0));
    assert_eq!(record.get("Resting Glucose"), Some(5.4));
    assert_eq!(record.field_names().last(), Some("Resting Glucose"));
    assert_eq!(record.len(), DEFAULT_FORM.len() + 1);
}

#[test]
fn test_form_rejects_non_numeric_text() {
    let mut form = FormCollector::new();
    form.set("BMI", "24,5");

    let err = form.single_request().unwrap_err();
    assert_eq!(
        err,
        ValidationError::NonNumeric {
            field: "BMI".to_string(),
            value: "24,5".to_string()
        }
    );
}

#[test]
fn test_parse_assignment() {
    assert_eq!(
        parse_assignment("Heart Rate = 80").unwrap(),
        ("Heart Rate".to_string(), "80".to_string())
    );
    assert!(matches!(parse_assignment("80"), Err(ValidationError::Malformed(_))));
    assert!(matches!(parse_assignment("=80"), Err(ValidationError::Malformed(_))));
}

#[test]
fn test_json_window_shapes() {
    let row = r#"{"Age":45,"BMI":24.5,"Derived_HRV":"5.1"}"#;
    let array = format!("[{}]", vec![row; 7].join(","));
    let object = format!(r#"{{"rows":[{}]}}"#, vec![row; 10].join(","));

    let records = validate_window(&WindowPayload::JsonText(array)).unwrap();
    assert_eq!(records.len(), 7);
    assert_eq!(records[0].get("Derived_HRV"), Some(5.1));

    assert_eq!(validate_window(&WindowPayload::JsonText(object)).unwrap().len(), 10);
}

#[test]
fn test_json_window_errors() {
    assert!(matches!(
        validate_window(&WindowPayload::JsonText("not json".into())),
        Err(ValidationError::Malformed(_))
    ));
    assert!(matches!(
        validate_window(&WindowPayload::JsonText(r#"{"data": []}"#.into())),
        Err(ValidationError::Malformed(_))
    ));
    assert!(matches!(
        validate_window(&WindowPayload::JsonText("[1,2,3,4,5,6,7]".into())),
        Err(ValidationError::Malformed(_))
    ));

    let bad = format!("[{}]", vec![r#"{"Age":"old"}"#; 7].join(","));
    assert!(matches!(
        validate_window(&WindowPayload::JsonText(bad)),
        Err(ValidationError::NonNumeric { field, .. }) if field == "Age"
    ));
}

#[test]
fn test_csv_window_rows_are_counted() {
    for rows in [6, 11] {
        let payload = WindowPayload::Csv {
            filename: "window.csv".into(),
            bytes: csv_window(rows),
        };
        assert!(matches!(
            validate_window(&payload),
            Err(ValidationError::WindowSize { count, .. }) if count == rows
        ));
    }

    let payload = WindowPayload::Csv {
        filename: "WINDOW.CSV".into(),
        bytes: csv_window(8),
    };
    let records = validate_window(&payload).unwrap();
    assert_eq!(records.len(), 8);
    assert_eq!(records[7].get("Derived_HRV"), Some(12.0));
}

#[test]
fn test_csv_blank_cells_are_skipped() {
    let mut csv = String::from("Age,BMI\n");
    for _ in 0..7 {
        csv.push_str("45,\n");
    }
    let payload = WindowPayload::Csv {
        filename: "w.csv".into(),
        bytes: csv.into_bytes(),
    };
    let records = validate_window(&payload).unwrap();
    assert!(records.iter().all(|r| r.get("BMI").is_none() && r.get("Age") == Some(45.0)));
}

#[test]
fn test_csv_upload_constraints() {
    let wrong_type = WindowPayload::Csv {
        filename: "window.xlsx".into(),
        bytes: csv_window(7),
    };
    assert!(matches!(
        validate_window(&wrong_type),
        Err(ValidationError::UnsupportedFile { .. })
    ));

    let too_big = WindowPayload::Csv {
        filename: "window.csv".into(),
        bytes: vec![b'1'; MAX_UPLOAD_BYTES + 1],
    };
    assert!(matches!(
        validate_window(&too_big),
        Err(ValidationError::PayloadTooLarge { .. })
    ));

    let non_numeric = WindowPayload::Csv {
        filename: "window.csv".into(),
        bytes: b"Age,Note\n45,ok\n45,ok\n45,ok\n45,ok\n45,ok\n45,ok\n45,ok\n".to_vec(),
    };
    assert!(matches!(
        validate_window(&non_numeric),
        Err(ValidationError::NonNumeric { field, .. }) if field == "Note"
    ));
}

#[test]
fn test_window_request_wraps_valid_payload() {
    let payload = WindowPayload::Csv {
        filename: "window.csv".into(),
        bytes: csv_window(9),
    };
    let request = window_request(payload.clone()).unwrap();
    assert_eq!(request, PredictionRequest::Window(payload));
    assert_eq!(request.kind(), "window");
}

#[tokio::test]
async fn test_window_files_are_loaded_from_disk() {
    let csv_path = scratch_path("csv");
    std::fs::write(&csv_path, csv_window(7)).unwrap();
    let payload = read_csv_window(&csv_path).await.unwrap();
    let expected_name = csv_path.file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(
        payload,
        WindowPayload::Csv {
            filename: expected_name,
            bytes: csv_window(7)
        }
    );
    assert_eq!(validate_window(&payload).unwrap().len(), 7);

    let json_path = scratch_path("json");
    let rows = format!("[{}]", vec![r#"{"Age":45}"#; 8].join(","));
    std::fs::write(&json_path, &rows).unwrap();
    assert_eq!(read_json_window(&json_path).await.unwrap(), WindowPayload::JsonText(rows));

    std::fs::remove_file(csv_path).ok();
    std::fs::remove_file(json_path).ok();
}

#[tokio::test]
async fn test_missing_window_file_is_io_error() {
    let err = read_csv_window(&scratch_path("csv")).await.unwrap_err();
    assert!(matches!(err, MonitorError::Io(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);

    let err = read_json_window(&scratch_path("json")).await.unwrap_err();
    assert!(matches!(err, MonitorError::Io(_)));
}
