use std::{fs, path::PathBuf};

use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};

fn output_prefix(name: &str) -> PathBuf {
    [env!("CARGO_TARGET_TMPDIR"), name].iter().collect()
}

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_configured_run() {
    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("tests/data/tagger_test.toml"));
    config = config.merge(Serialized::default(
        "output_prefix",
        output_prefix("configured"),
    ));
    let driver: mztagger::MZTagger = config.extract().unwrap();
    assert_eq!(driver.length_range, mztagger::LengthRange::new(4, 6));
    assert_eq!(driver.tagger_params().fdr, 0.05);
    driver.main().unwrap();

    let proteins = fs::read_to_string(output_prefix("configured.proteins.tsv")).unwrap();
    let rows: Vec<_> = proteins.lines().skip(1).collect();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("sp|P0CG48|UBC_HUMAN"));

    let tags = fs::read_to_string(output_prefix("configured.tags.tsv")).unwrap();
    assert!(tags
        .lines()
        .skip(1)
        .all(|l| matches!(l.split('\t').nth(1), Some("4" | "5" | "6"))));
}

#[test_log::test]
fn test_write_effective_config() {
    let path = output_prefix("effective.toml");
    let mut config = Figment::new();
    config = config.merge(Toml::file_exact("tests/data/tagger_test.toml"));
    config = config.merge(Serialized::default(
        "output_prefix",
        output_prefix("effective"),
    ));
    config = config.merge(Serialized::default("write_config", &path));
    config = config.merge(Serialized::default("json", true));
    let driver: mztagger::MZTagger = config.extract().unwrap();
    driver.main().unwrap();
    assert!(output_prefix("effective.json").exists());

    let reloaded: mztagger::MZTagger = Figment::from(Toml::file_exact(&path)).extract().unwrap();
    assert_eq!(reloaded.max_tag_count, 100);
    assert_eq!(reloaded.length_range, driver.length_range);
    assert!(reloaded.json);
}
