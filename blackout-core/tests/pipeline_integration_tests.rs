// blackout-core/tests/pipeline_integration_tests.rs
//! End-to-end tests of `redact` and `scan_document` on generated PDFs.

mod common;

use std::fs;
use std::time::Instant;

use blackout_core::{
    redact, scan_document, DetectorConfig, OpenError, PatternRegistry, RedactOptions, RedactionError,
};
use tempfile::tempdir;
use test_log::test;

use common::{contains_bytes, page_texts, write_pdf};

fn registry() -> PatternRegistry {
    PatternRegistry::from_config(&DetectorConfig::load_default().unwrap()).unwrap()
}

#[test]
fn test_two_page_document_redacts_first_page_only() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("report.pdf");
    let output = dir.path().join("redacted_report.pdf");
    write_pdf(
        &input,
        &[&["Contact: jane@example.com, call 9876543210"], &["Quarterly summary of the garden club."]],
    );
    let input_before = fs::read(&input).unwrap();

    let report = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap();

    assert_eq!(report.output, "redacted_report.pdf");
    assert_eq!(report.pages, 2);
    assert_eq!(report.pages_redacted, 1);
    assert_eq!(report.regions_redacted, 2);
    assert_eq!(report.unresolved_literals, 0);

    let texts = page_texts(&output);
    assert_eq!(texts.len(), 2);
    assert!(!texts[0].contains("jane@example.com"), "page 0: {}", texts[0]);
    assert!(!texts[0].contains("9876543210"), "page 0: {}", texts[0]);
    assert!(texts[0].starts_with("Contact:"));
    assert_eq!(texts[1], "Quarterly summary of the garden club.");

    // The input is never touched.
    assert_eq!(fs::read(&input).unwrap(), input_before);
}

#[test]
fn test_redacted_literals_are_gone_from_the_file_bytes() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(&input, &[&["mail jane@example.com please"]]);
    assert!(contains_bytes(&fs::read(&input).unwrap(), b"jane@example.com"));

    redact(&input, &output, &registry(), &RedactOptions::default()).unwrap();

    let bytes = fs::read(&output).unwrap();
    assert!(!contains_bytes(&bytes, b"jane@example.com"));
    assert!(!contains_bytes(&bytes, b"example"));
}

#[test]
fn test_document_without_matches_is_copied_unchanged() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("plain.pdf");
    let output = dir.path().join("redacted_plain.pdf");
    write_pdf(&input, &[&["Nothing to see here."], &["Still nothing."]]);

    let report = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap();

    assert_eq!(report.total_matches, 0);
    assert_eq!(fs::read(&output).unwrap(), fs::read(&input).unwrap());
    assert_eq!(page_texts(&output), page_texts(&input));
}

#[test]
fn test_redaction_is_idempotent() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let once = dir.path().join("once.pdf");
    let twice = dir.path().join("twice.pdf");
    write_pdf(&input, &[&["ip 192.168.1.20 and mail a@b.io", "PAN ABCDE1234F"]]);

    redact(&input, &once, &registry(), &RedactOptions::default()).unwrap();
    let second = redact(&once, &twice, &registry(), &RedactOptions::default()).unwrap();

    assert_eq!(second.regions_redacted, 0);
    assert_eq!(page_texts(&once), page_texts(&twice));
}

#[test]
fn test_literal_wrapped_across_lines_is_not_an_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("wrapped.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(&input, &[&["call 987654", "3210 today"]]);

    let report = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap();

    // The extracted text breaks the number, so no detector fires and the
    // page is left as it was.
    assert_eq!(report.regions_redacted, 0);
    assert_eq!(page_texts(&output), vec!["call 987654\n3210 today".to_string()]);
}

#[test]
fn test_grouped_id_wrapped_across_lines_is_redacted_on_both() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("grouped.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(&input, &[&["id 1234 5678", "9012 issued"]]);

    let report = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap();

    assert_eq!(report.regions_redacted, 2);
    let text = &page_texts(&output)[0];
    assert!(!text.contains("1234"));
    assert!(!text.contains("9012"));
    assert!(text.contains("issued"));
}

#[test]
fn test_malformed_input_creates_no_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.pdf");
    let output = dir.path().join("redacted_broken.pdf");
    fs::write(&input, b"%PDF-1.4\nthis is not really a pdf").unwrap();

    let err = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap_err();

    assert!(matches!(err, RedactionError::Open(OpenError::Malformed(_))), "{err:?}");
    assert!(!output.exists());
}

#[test]
fn test_missing_input_reports_read_error() {
    let dir = tempdir().unwrap();
    let err = redact(
        &dir.path().join("absent.pdf"),
        &dir.path().join("out.pdf"),
        &registry(),
        &RedactOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RedactionError::Open(OpenError::Read { .. })));
}

#[test]
fn test_expired_deadline_writes_nothing() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    write_pdf(&input, &[&["a@b.io"], &["c@d.io"]]);
    let options = RedactOptions {
        deadline: Some(Instant::now()),
    };

    let err = redact(&input, &output, &registry(), &options).unwrap_err();

    assert!(matches!(err, RedactionError::DeadlineExceeded { next_page: 0 }));
    assert!(!output.exists());
}

#[test]
fn test_output_may_not_overwrite_input() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    write_pdf(&input, &[&["a@b.io"]]);
    let before = fs::read(&input).unwrap();

    let err = redact(&input, &input, &registry(), &RedactOptions::default()).unwrap_err();

    assert!(matches!(err, RedactionError::Save { .. }));
    assert_eq!(fs::read(&input).unwrap(), before);
}

fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_missing_output_directory_is_a_save_error() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("missing").join("out.pdf");
    write_pdf(&input, &[&["mail jane@example.com"]]);

    let err = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap_err();

    assert!(matches!(&err, RedactionError::Save { path, .. } if path == &output), "{err:?}");
    assert!(!output.exists());
    assert_eq!(entries(dir.path()), vec!["in.pdf"]);
}

#[test]
fn test_failed_persist_leaves_no_temporary_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    // A directory in the way makes the final rename fail after the
    // temporary file was fully written.
    let output = dir.path().join("taken");
    fs::create_dir(&output).unwrap();

    for text in ["mail jane@example.com", "nothing to see"] {
        write_pdf(&input, &[&[text]]);
        let err = redact(&input, &output, &registry(), &RedactOptions::default()).unwrap_err();

        assert!(matches!(err, RedactionError::Save { .. }), "{err:?}");
        assert!(output.is_dir());
        assert_eq!(fs::read_dir(&output).unwrap().count(), 0);
        assert_eq!(entries(dir.path()), vec!["in.pdf", "taken"]);
    }
}

#[test]
fn test_scan_document_counts_per_page() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    write_pdf(&input, &[&["a@b.io", "call 9876543210"], &["clean"], &["token here"]]);

    let report = scan_document(&input, &registry()).unwrap();

    assert_eq!(report.pages, 3);
    assert_eq!(report.total_matches, 3);
    assert_eq!(
        report.per_page.iter().map(|p| p.matches).collect::<Vec<_>>(),
        vec![2, 0, 1]
    );
    assert!(!report.to_json().unwrap().contains("a@b.io"));
}
