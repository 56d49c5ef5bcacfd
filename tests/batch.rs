use std::fs;

use badge_tools::{strip_badges, BatchConfig, Error, Result, SkipSet};

fn strip_or_fail(input: &[u8]) -> Result<Vec<u8>> {
    if input.starts_with(b"corrupt") {
        return Err(Error::UnsupportedFormat("corrupt input".to_string()));
    }
    Ok(input.to_ascii_uppercase())
}

#[test]
fn skipped_success_and_failure_are_accounted_separately() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.png"), b"alpha").unwrap();
    fs::write(dir.path().join("b.png"), b"bravo").unwrap();
    fs::write(dir.path().join("c.png"), b"corrupt charlie").unwrap();

    let config = BatchConfig::new(dir.path()).with_skip(SkipSet::from_iter(["b.png"]));
    let mut out = Vec::new();
    let summary = strip_badges(&config, &strip_or_fail, &mut out).unwrap();

    assert_eq!(summary.success, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "c.png");

    assert_eq!(fs::read(dir.path().join("a.png")).unwrap(), b"ALPHA");
    assert_eq!(fs::read(dir.path().join("b.png")).unwrap(), b"bravo");
    assert_eq!(fs::read(dir.path().join("c.png")).unwrap(), b"corrupt charlie");

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("[1/2] a.png ... OK"));
    assert!(printed.contains("[2/2] c.png ... FAIL (unsupported image format: corrupt input)"));
    assert!(!printed.contains("b.png"));
    assert!(printed.contains("Succeeded: 1"));
    assert!(printed.contains("Failed: 1"));
    assert!(printed.contains("Total: 2"));
}

#[test]
fn builtin_skip_set_protects_processed_badges() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("category_washoku_visit_3.png"), b"done").unwrap();
    fs::write(dir.path().join("comment_posted_1.png"), b"done").unwrap();
    fs::write(dir.path().join("comment_posted_2.png"), b"todo").unwrap();

    let config = BatchConfig::new(dir.path());
    let summary = strip_badges(&config, &strip_or_fail, &mut Vec::new()).unwrap();

    assert_eq!(summary.total, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(fs::read(dir.path().join("comment_posted_1.png")).unwrap(), b"done");
    assert_eq!(fs::read(dir.path().join("comment_posted_2.png")).unwrap(), b"TODO");
}

#[test]
fn rerunning_reprocesses_files_outside_the_skip_set() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("x.png"), b"x").unwrap();

    let config = BatchConfig::new(dir.path()).with_skip(SkipSet::new());
    let append = |input: &[u8]| -> Result<Vec<u8>> {
        let mut v = input.to_vec();
        v.push(b'!');
        Ok(v)
    };
    strip_badges(&config, &append, &mut Vec::new()).unwrap();
    strip_badges(&config, &append, &mut Vec::new()).unwrap();

    assert_eq!(fs::read(dir.path().join("x.png")).unwrap(), b"x!!");
}

#[test]
fn empty_directory_reports_zero_totals() {
    let dir = tempfile::tempdir().unwrap();
    let config = BatchConfig::new(dir.path());
    let mut out = Vec::new();
    let summary = strip_badges(&config, &strip_or_fail, &mut out).unwrap();

    assert_eq!(summary, badge_tools::BatchSummary::default());
    assert!(String::from_utf8(out).unwrap().contains("Total: 0"));
}
