use std::path::PathBuf;

use iondg_cli::{dump, normalize, stats, CliError, TableStats};
use iondg_core::{Datagram, Element};
use tempfile::TempDir;

fn write_sample(dir: &TempDir, name: &str) -> PathBuf {
    let mut datagram = Datagram::new();
    datagram.add(Element::symbol("color")).unwrap();
    datagram
        .add(Element::structure([("size", Element::from(3))]))
        .unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, datagram.to_bytes().unwrap()).unwrap();
    path
}

fn run_dump(path: &PathBuf, system: bool, json: bool) -> String {
    let mut out = Vec::new();
    dump(path, system, json, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_dump_prints_user_values() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "sample.10n");

    let text = run_dump(&path, false, false);
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], Element::symbol("color").to_string());
}

#[test]
fn test_dump_system_view_labels_kinds() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "sample.10n");

    let text = run_dump(&path, true, false);
    let labels: Vec<_> = text
        .lines()
        .map(|line| line.split_whitespace().next().unwrap())
        .collect();
    assert_eq!(labels, ["version-marker", "symbol-table", "user", "user"]);
}

#[test]
fn test_dump_json() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "sample.10n");

    let text = run_dump(&path, false, true);
    let values: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(
        values,
        [serde_json::json!("color"), serde_json::json!({"size": 3})]
    );
}

#[test]
fn test_stats_counts_views_and_tables() {
    let dir = TempDir::new().unwrap();
    let path = write_sample(&dir, "sample.10n");
    let size = std::fs::metadata(&path).unwrap().len() as usize;

    let stats = stats(&path).unwrap();
    assert_eq!(stats.user_values, 2);
    assert_eq!(stats.system_values, 4);
    assert_eq!(stats.version_markers, 1);
    assert_eq!(stats.symbol_table_structs, 1);
    assert_eq!(stats.bytes, size);
    assert_eq!(
        stats.tables,
        [TableStats {
            max_id: 11,
            imports: Vec::new(),
            local_symbols: 2,
        }]
    );
}

#[test]
fn test_normalize_drops_padding() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("padded.10n");
    let output = dir.path().join("clean.10n");
    // marker, int 1, two-byte pad, int 2
    std::fs::write(
        &input,
        [0xE0, 0x01, 0x00, 0xEA, 0x21, 0x01, 0x01, 0x00, 0x21, 0x02],
    )
    .unwrap();

    let written = normalize(&input, &output).unwrap();
    assert_eq!(written, 8);
    assert_eq!(
        std::fs::read(&output).unwrap(),
        [0xE0, 0x01, 0x00, 0xEA, 0x21, 0x01, 0x21, 0x02]
    );
}

#[test]
fn test_corrupt_file_is_a_datagram_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.10n");
    std::fs::write(&path, [0xE0, 0x01, 0x00, 0xEA, 0x8F, 0x05]).unwrap();

    let mut out = Vec::new();
    let err = dump(&path, false, false, &mut out).unwrap_err();
    assert!(matches!(err, CliError::Datagram(_)));
}
