//! Directory walks, header threading and progress reporting.

mod common;

use std::fs;

use common::{events, hdf5_lock, lines, simple_spec, write_fast5, Fast5Spec, LegacyEvent, ReadSpec};
use fast5dump::batch::{self, discover, FileOutcome};
use fast5dump::{DataKind, ExtractOptions};
use tempfile::tempdir;

#[test]
fn directory_with_three_fast5_and_two_other_files() {
    let _guard = hdf5_lock();
    let dir = tempdir().unwrap();
    let nested = dir.path().join("pass").join("0");
    fs::create_dir_all(&nested).unwrap();
    write_fast5(&dir.path().join("a.fast5"), &simple_spec(vec![ReadSpec { name: "Read_1", start_mux: Some(1), events: events(2) }])).unwrap();
    write_fast5(&dir.path().join("b.fast5"), &simple_spec(vec![ReadSpec { name: "Read_2", start_mux: Some(2), events: events(3) }])).unwrap();
    write_fast5(&nested.join("c.fast5"), &simple_spec(vec![ReadSpec { name: "Read_3", start_mux: Some(3), events: events(4) }])).unwrap();
    fs::write(dir.path().join("sequencing_summary.txt"), "filename\tread_id\n").unwrap();
    fs::write(nested.join("c.fast5.bak"), "stale").unwrap();

    let mut out = Vec::new();
    let mut diag = Vec::new();
    let opts = ExtractOptions::new(DataKind::Event);
    let summary = batch::run(dir.path(), &opts, &mut out, &mut diag).unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.records, 9);

    let data = lines(&out);
    assert_eq!(data.len(), 1 + 9);
    assert!(data[0].starts_with("runID,channel,mux,read,"));
    assert_eq!(data.iter().filter(|l| l.starts_with("runID")).count(), 1);

    let progress = lines(&diag);
    assert!(progress[0].starts_with("Processing directory"));
    let done: Vec<&String> = progress.iter().filter(|l| l.contains(" done (")).collect();
    assert_eq!(done.len(), 3);
    assert!(done[0].ends_with("done (2 more files to process)"));
    assert!(done[1].ends_with("done (1 more file to process)"));
    assert!(done[2].ends_with("done (0 more files to process)"));
    assert!(!String::from_utf8(out).unwrap().contains("Processing"));
}

#[test]
fn unreadable_file_is_skipped_and_header_moves_on() {
    let _guard = hdf5_lock();
    let dir = tempdir().unwrap();
    // Sorted walk order puts the broken file first.
    fs::write(dir.path().join("0_broken.fast5"), b"\x89HDF truncated").unwrap();
    write_fast5(&dir.path().join("1_good.fast5"), &simple_spec(vec![ReadSpec { name: "Read_1", start_mux: Some(1), events: events(2) }])).unwrap();

    let mut out = Vec::new();
    let mut diag = Vec::new();
    let summary = batch::run(dir.path(), &ExtractOptions::new(DataKind::Event), &mut out, &mut diag).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    let data = lines(&out);
    assert_eq!(data.len(), 3);
    assert!(data[0].starts_with("runID,"));
    assert!(data[1..].iter().all(|l| l.contains(",Read_1,")));
    let progress = lines(&diag);
    assert!(progress.iter().any(|l| l.contains("'0_broken.fast5'... skipped (1 more file to process)")));
}

#[test]
fn partly_bad_first_file_leaves_no_rows_and_one_header() {
    let _guard = hdf5_lock();
    let dir = tempdir().unwrap();
    let first = simple_spec(vec![
        ReadSpec { name: "Read_1", start_mux: Some(1), events: events(2) },
        ReadSpec { name: "Read_2", start_mux: None, events: events(2) },
    ]);
    write_fast5(&dir.path().join("a.fast5"), &first).unwrap();
    write_fast5(&dir.path().join("b.fast5"), &simple_spec(vec![ReadSpec { name: "Read_3", start_mux: Some(3), events: events(4) }])).unwrap();

    let mut out = Vec::new();
    let mut diag = Vec::new();
    let summary = batch::run(dir.path(), &ExtractOptions::new(DataKind::Event), &mut out, &mut diag).unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    let data = lines(&out);
    assert_eq!(data.len(), 1 + 4);
    assert_eq!(data[0], "runID,channel,mux,read,start,length,mean,stdv");
    assert_eq!(data.iter().filter(|l| l.starts_with("runID")).count(), 1);
    assert!(data[1..].iter().all(|l| l.contains(",Read_3,")));
    assert!(lines(&diag).iter().any(|l| l.contains("'a.fast5'... skipped (1 more file to process)")));
}

#[test]
fn files_with_different_event_layouts_share_one_header() {
    let _guard = hdf5_lock();
    let dir = tempdir().unwrap();
    let legacy = Fast5Spec {
        device_id: "GA10000",
        run_id: "0123456789abcdefXYZ",
        channel_number: "5",
        reads: vec![ReadSpec {
            name: "Read_9",
            start_mux: Some(4),
            events: vec![LegacyEvent { mean: 55.5, start: 0.25, variance: 2.0, mv: -1 }],
        }],
        fastq: Vec::new(),
    };
    write_fast5(&dir.path().join("a_legacy.fast5"), &legacy).unwrap();
    write_fast5(&dir.path().join("b_current.fast5"), &simple_spec(vec![ReadSpec { name: "Read_1", start_mux: Some(1), events: events(2) }])).unwrap();

    let mut out = Vec::new();
    let mut diag = Vec::new();
    let summary = batch::run(dir.path(), &ExtractOptions::new(DataKind::Event), &mut out, &mut diag).unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.records, 3);

    // The header comes from the first file that has reads; later files keep
    // their own columns.
    let data = lines(&out);
    assert_eq!(data.len(), 1 + 3);
    assert_eq!(data[0], "runID,channel,mux,read,mean,start,variance,mv");
    assert_eq!(data[1], "GA10000_0123456789abcdef,5,4,Read_9,55.5,0.25,2.0,-1");
    assert!(data[2..].iter().all(|l| l.starts_with("MN12345_a1b2c3d4e5f6a7b8,117,1,Read_1,") && l.split(',').count() == 8));
}

#[test]
fn discover_matches_suffix_recursively() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("x/y")).unwrap();
    for name in ["a.fast5", "x/b.fast5", "x/y/c.fast5", "x/y/notes.txt", "x/fast5"] {
        fs::write(dir.path().join(name), "").unwrap();
    }
    let found = discover(dir.path(), ".fast5");
    let names: Vec<String> = found.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, ["a.fast5", "b.fast5", "c.fast5"]);
}

#[test]
fn single_file_raw_is_a_no_op() {
    let _guard = hdf5_lock();
    let dir = tempdir().unwrap();
    let path = dir.path().join("r.fast5");
    write_fast5(&path, &simple_spec(vec![ReadSpec { name: "Read_1", start_mux: Some(1), events: events(2) }])).unwrap();

    let mut out = Vec::new();
    let outcome = batch::process_file(&path, DataKind::Raw, &mut true, &mut out).unwrap();
    assert!(matches!(outcome, FileOutcome::Extracted(e) if e.records == 0));
    assert!(out.is_empty());
}

#[test]
fn single_file_not_a_container_is_skipped() {
    let _guard = hdf5_lock();
    let dir = tempdir().unwrap();
    let path = dir.path().join("plain.txt");
    fs::write(&path, "not hdf5").unwrap();

    let mut out = Vec::new();
    let mut diag = Vec::new();
    let summary = batch::run(&path, &ExtractOptions::new(DataKind::Event), &mut out, &mut diag).unwrap();
    assert_eq!(summary.skipped, 1);
    assert!(out.is_empty());
}
