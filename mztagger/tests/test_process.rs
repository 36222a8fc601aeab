use std::{error::Error, fs, path::PathBuf, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn output_prefix(name: &str) -> PathBuf {
    [env!("CARGO_TARGET_TMPDIR"), name].iter().collect()
}

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mztagger")?;

    cmd.arg("not_real.tsv");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("An IO error occurred"));
    Ok(())
}

#[test]
fn test_malformed_length_range() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mztagger")?;

    cmd.arg("./tests/data/masses.tsv").args(["-L", "a-5"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "Failed to parse length range minimum",
    ));
    Ok(())
}

#[test]
fn test_parameter_violation() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mztagger")?;
    cmd.arg("./tests/data/masses.tsv").args(["-L", "10-4"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(
            "min_length (10) must not exceed max_length (4)",
        ))
        .stderr(predicate::str::contains("Tags:").not());

    let mut cmd = Command::cargo_bin("mztagger")?;
    cmd.arg("./tests/data/masses.tsv").args(["--fdr", "0.001"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("fdr = 0.001 is outside of the allowed range"));
    Ok(())
}

#[test]
fn test_malformed_mass_list() -> Result<(), Box<dyn Error>> {
    let path = output_prefix("malformed.tsv");
    fs::write(&path, "# mass\tscore\n131.04048\t11\n259.09906\televen\n")?;

    let mut cmd = Command::cargo_bin("mztagger")?;
    cmd.arg(&path);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Malformed mass list line 3"));
    Ok(())
}

#[test]
fn test_tag_and_match() -> Result<(), Box<dyn Error>> {
    let prefix = output_prefix("ubiquitin");
    let mut cmd = Command::cargo_bin("mztagger")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/masses.tsv")
        .args(["--fasta", "./tests/data/proteins.fasta", "-t", "2", "-o"])
        .arg(&prefix);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Tags: "))
        .stderr(predicate::str::contains("Tags: 0").not())
        .stderr(predicate::str::contains("Protein Hits: 1"));

    let tags = fs::read_to_string(output_prefix("ubiquitin.tags.tsv"))?;
    let mut lines = tags.lines();
    assert!(lines.next().unwrap().starts_with("sequence\tlength\tscore"));
    assert!(lines.next().is_some());

    let proteins = fs::read_to_string(output_prefix("ubiquitin.proteins.tsv"))?;
    let rows: Vec<_> = proteins.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("sp|P0CG48|UBC_HUMAN\tPolyubiquitin-C"));
    Ok(())
}

#[test]
fn test_json_output() -> Result<(), Box<dyn Error>> {
    let prefix = output_prefix("ubiquitin_json");
    let mut cmd = Command::cargo_bin("mztagger")?;
    cmd.arg("./tests/data/masses.tsv")
        .args(["--fasta", "./tests/data/proteins.fasta", "--json", "-L", "5", "-o"])
        .arg(&prefix);
    cmd.assert().success();

    let text = fs::read_to_string(output_prefix("ubiquitin_json.json"))?;
    let value: serde_json::Value = serde_json::from_str(&text)?;
    let tags = value["tags"].as_array().unwrap();
    assert!(!tags.is_empty());
    assert!(tags
        .iter()
        .all(|t| t["sequence"].as_str().unwrap().chars().count() == 5));
    let hits = value["protein_hits"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["accession"], "sp|P0CG48|UBC_HUMAN");
    assert_eq!(hits[0]["is_decoy"], false);
    assert_eq!(hits[0]["q_value"], 0.0);
    assert!(!output_prefix("ubiquitin_json.tags.tsv").exists());
    Ok(())
}

#[test]
fn test_no_database() -> Result<(), Box<dyn Error>> {
    let prefix = output_prefix("tags_only");
    let mut cmd = Command::cargo_bin("mztagger")?;
    cmd.arg("./tests/data/masses.tsv")
        .args(["-n", "3", "-L", "4-5", "-o"])
        .arg(&prefix);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Protein Hits").not());

    let tags = fs::read_to_string(output_prefix("tags_only.tags.tsv"))?;
    let rows: Vec<Vec<&str>> = tags.lines().skip(1).map(|l| l.split('\t').collect()).collect();
    assert!(!rows.is_empty());
    for length in ["4", "5"] {
        let n = rows.iter().filter(|r| r[1] == length).count();
        assert!(n > 0 && n <= 3);
    }
    assert!(!output_prefix("tags_only.proteins.tsv").exists());
    Ok(())
}
