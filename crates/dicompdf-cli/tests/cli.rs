//! End-to-end tests of the `dicompdf` binary.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

/// Command with its configuration directory isolated under `home`.
fn dicompdf(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("dicompdf").unwrap();
    cmd.env("HOME", home).env("XDG_CONFIG_HOME", home.join("config"));
    cmd
}

/// Explicit VR little endian element.
fn element(out: &mut Vec<u8>, group: u16, elem: u16, vr: &[u8; 2], value: &[u8]) {
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&elem.to_le_bytes());
    out.extend_from_slice(vr);
    if matches!(vr, b"OB" | b"OW") {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
}

fn padded(value: &str, pad: u8) -> Vec<u8> {
    let mut bytes = value.as_bytes().to_vec();
    if bytes.len() % 2 == 1 {
        bytes.push(pad);
    }
    bytes
}

/// A 4x4 16-bit MONOCHROME2 secondary capture image.
fn tiny_dicom(patient: &str) -> Vec<u8> {
    let sop_class = padded("1.2.840.10008.5.1.4.1.1.7", 0);
    let mut meta = Vec::new();
    element(&mut meta, 0x0002, 0x0001, b"OB", &[0, 1]);
    element(&mut meta, 0x0002, 0x0002, b"UI", &sop_class);
    element(&mut meta, 0x0002, 0x0003, b"UI", &padded("1.2.3.4", 0));
    element(&mut meta, 0x0002, 0x0010, b"UI", &padded("1.2.840.10008.1.2.1", 0));
    element(&mut meta, 0x0002, 0x0012, b"UI", &padded("1.2.826.0.1.3680043.9.1", 0));

    let mut out = vec![0u8; 128];
    out.extend_from_slice(b"DICM");
    element(&mut out, 0x0002, 0x0000, b"UL", &(meta.len() as u32).to_le_bytes());
    out.extend_from_slice(&meta);

    element(&mut out, 0x0008, 0x0016, b"UI", &sop_class);
    element(&mut out, 0x0008, 0x0018, b"UI", &padded("1.2.3.4", 0));
    element(&mut out, 0x0010, 0x0010, b"PN", &padded(patient, b' '));
    element(&mut out, 0x0028, 0x0002, b"US", &1u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0004, b"CS", &padded("MONOCHROME2", b' '));
    element(&mut out, 0x0028, 0x0010, b"US", &4u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0011, b"US", &4u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0100, b"US", &16u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0101, b"US", &16u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0102, b"US", &15u16.to_le_bytes());
    element(&mut out, 0x0028, 0x0103, b"US", &0u16.to_le_bytes());

    let pixels: Vec<u8> = (0u16..16).flat_map(|v| (v * 50).to_le_bytes()).collect();
    element(&mut out, 0x7FE0, 0x0010, b"OW", &pixels);
    out
}

#[test]
fn test_help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    dicompdf(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("inspect"));
}

#[test]
fn test_convert_empty_directory_exits_with_failure_mask() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("empty");
    std::fs::create_dir(&input).unwrap();

    dicompdf(home.path())
        .arg("convert")
        .arg(&input)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No input files supplied"));
}

#[test]
fn test_convert_undecodable_files_exits_with_conversion_flag() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("broken");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("1.dcm"), b"not dicom").unwrap();

    dicompdf(home.path())
        .arg("convert")
        .arg(&input)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to generate PDF"));

    assert!(!input.join("broken.pdf").exists());
}

#[test]
fn test_convert_series_writes_pdf() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("CT_HEAD");
    std::fs::create_dir(&input).unwrap();
    std::fs::write(input.join("1.dcm"), tiny_dicom("DOE^JOHN")).unwrap();
    std::fs::write(input.join("2.dcm"), b"garbage").unwrap();
    std::fs::write(input.join("3.dcm"), tiny_dicom("DOE^JOHN")).unwrap();
    std::fs::write(input.join("notes.txt"), b"ignored").unwrap();
    let out = home.path().join("out");

    dicompdf(home.path())
        .arg("convert")
        .arg(&input)
        .arg("--output-dir")
        .arg(&out)
        .args(["--dpi", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 2 pages"));

    let pdf = std::fs::read(out.join("CT_HEAD.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test]
fn test_inspect_prints_json_metadata() {
    let home = tempfile::tempdir().unwrap();
    let file = home.path().join("IM0001.dcm");
    std::fs::write(&file, tiny_dicom("DOE^JANE")).unwrap();

    dicompdf(home.path())
        .arg("inspect")
        .arg(&file)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"patient_name\": \"DOE^JANE\""))
        .stdout(predicate::str::contains("\"rows\": 4"));
}

#[test]
fn test_inspect_missing_file_fails() {
    let home = tempfile::tempdir().unwrap();
    dicompdf(home.path())
        .arg("inspect")
        .arg(home.path().join("nope.dcm"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_config_init_then_set_and_get() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("settings.json");

    dicompdf(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    dicompdf(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "render.dpi", "150"])
        .assert()
        .success();

    dicompdf(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "render.dpi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("150"));
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("settings.json");

    dicompdf(home.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "normalize.contrast_factor", "-2"])
        .assert()
        .failure();
    assert!(!config.exists());
}
