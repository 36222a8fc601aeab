use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use mztag::params::check_tolerance;
use mztag::{ParameterError, TaggerError, TaggerParams, TaggingEngine};

use crate::length_range::LengthRange;
use crate::mass_list::{read_mass_list_path, MassList};
use crate::write::{create_output, write_json, write_protein_hits, write_tags};

fn non_negative_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Error)]
pub enum MZTaggerError {
    #[error("An IO error occurred: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
    #[error("Invalid parameter: {0}")]
    ParameterError(#[from] ParameterError),
    #[error(transparent)]
    TaggerError(#[from] TaggerError),
    #[error("Malformed mass list line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
    #[error("Failed to read configuration: {0}")]
    ConfigError(#[from] figment::Error),
    #[error("Failed to write configuration: {0}")]
    ConfigWriteError(#[from] toml::ser::Error),
    #[error("Failed to build the thread pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),
}

/// Sequence tag generation and protein matching for deconvolved mass lists.
///
/// Read a tab-separated list of deconvolved masses, enumerate the sequence tags they
/// support, and optionally match those tags against a FASTA protein database.
#[derive(Parser, Debug, Clone, Deserialize, Serialize)]
#[command(author, version)]
pub struct MZTagger {
    /// The path to read the mass list from, with columns mass, score and optionally scan
    #[arg()]
    pub input_file: PathBuf,

    /// A FASTA protein database to match tags against. Decoy entries are recognized
    /// by their accession prefix.
    #[arg(short = 'd', long = "fasta")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fasta: Option<PathBuf>,

    /// The prefix of the output files, defaulting to the input path without its extension
    #[arg(short = 'o', long = "output-prefix")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_prefix: Option<PathBuf>,

    /// Write a single JSON document instead of tab-separated tables
    #[arg(long = "json")]
    pub json: bool,

    /// The path to write a log file to, in addition to STDERR
    #[arg(short = 'l', long = "log-file")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// A TOML configuration file to read additional parameters from.
    ///
    /// Configurations are also read from `mztagger.toml` in the working directory.
    /// Environment variables prefixed with `MZTAGGER_` will be read too. Values from
    /// these sources take precedence over command line arguments, including ones given
    /// explicitly, with the environment applied last.
    #[arg(long = "config-file")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,

    /// Write the effective configuration to this path as TOML before running
    #[arg(long = "write-config")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_config: Option<PathBuf>,

    /// The number of threads to use, passing a value < 1 to use all available threads
    #[arg(
        short='t',
        long="threads",
        default_value_t=-1,
    )]
    pub threads: i32,

    /// The mass tolerance in parts-per-million for matching gaps to residues
    #[arg(short = 'p', long = "ppm", default_value_t = 10.0, value_parser = non_negative_float)]
    pub ppm: f64,

    /// Read the second column as a quality score in [0, 1] rather than an integer score
    #[arg(short = 'q', long = "quality-scores")]
    pub quality_scores: bool,

    /// The most tags to keep for each tag length
    #[arg(short = 'n', long = "max-tag-count", default_value_t = 500)]
    pub max_tag_count: usize,

    /// The range of tag lengths to generate, denoted (min)-(max) or (length)
    #[arg(
        short = 'L',
        long = "length-range",
        default_value_t = LengthRange::default(),
        value_name = "MIN-MAX",
    )]
    pub length_range: LengthRange,

    /// The tolerance in Daltons when comparing a tag's flanking mass to a protein
    #[arg(
        long = "flanking-mass-tol",
        default_value_t = 500.0,
        value_parser = non_negative_float
    )]
    pub flanking_mass_tol: f64,

    /// The most isotope errors a tag may contain
    #[arg(short = 'i', long = "max-iso-error-count", default_value_t = 0)]
    pub max_iso_error_count: usize,

    /// The fewest residues a protein must have covered by tags to be reported
    #[arg(short = 'm', long = "min-matched-aa", default_value_t = 5)]
    pub min_matched_aa: usize,

    /// The protein-level false discovery rate threshold
    #[arg(short = 'f', long = "fdr", default_value_t = 1.0)]
    pub fdr: f64,

    /// Report decoy protein hits too
    #[arg(long = "keep-decoy")]
    pub keep_decoy: bool,

    /// The accession prefix marking decoy proteins
    #[arg(long = "decoy-prefix", default_value = "DECOY")]
    pub decoy_prefix: String,

    /// The most masses to build the tag graph over, keeping the highest scoring
    #[arg(long = "max-node-count", default_value_t = 500)]
    pub max_node_count: usize,

    /// The most sequences one path may expand to when its gaps are ambiguous
    #[arg(long = "max-sequence-expansion", default_value_t = 256)]
    pub max_sequence_expansion: usize,
}

impl MZTagger {
    /// Layer the configuration sources over these arguments: the `--config-file`,
    /// then `mztagger.toml`, then `MZTAGGER_` environment variables.
    pub fn load_config(self) -> Result<Self, MZTaggerError> {
        let mut config = Figment::from(Serialized::defaults(&self));
        if let Some(path) = self.config_file.as_ref() {
            config = config.merge(Toml::file_exact(path));
        }
        config = config
            .merge(Toml::file("mztagger.toml"))
            .merge(Env::prefixed("MZTAGGER_"));
        Ok(config.extract()?)
    }

    pub fn tagger_params(&self) -> TaggerParams {
        TaggerParams {
            max_tag_count: self.max_tag_count,
            min_length: self.length_range.min,
            max_length: self.length_range.max,
            flanking_mass_tol: self.flanking_mass_tol,
            max_iso_error_count: self.max_iso_error_count,
            min_matched_aa: self.min_matched_aa,
            fdr: self.fdr,
            keep_decoy: self.keep_decoy,
            decoy_prefix: self.decoy_prefix.clone(),
            max_node_count: self.max_node_count,
            max_sequence_expansion: self.max_sequence_expansion,
            ..Default::default()
        }
    }

    pub fn output_path(&self, suffix: &str) -> PathBuf {
        let mut path = self
            .output_prefix
            .clone()
            .unwrap_or_else(|| self.input_file.with_extension(""))
            .into_os_string();
        path.push(suffix);
        path.into()
    }

    fn create_threadpool(&self) -> Result<rayon::ThreadPool, MZTaggerError> {
        let num_threads = if self.threads > 0 {
            self.threads as usize
        } else {
            thread::available_parallelism()?.into()
        };
        debug!("Using {} cores", num_threads);
        Ok(rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?)
    }

    fn save_config(&self, path: &Path) -> Result<(), MZTaggerError> {
        info!("Writing configuration to {}", path.display());
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn main(&self) -> Result<(), MZTaggerError> {
        info!(
            "mztagger v{}",
            option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
        );
        let params = self.tagger_params();
        params.validate()?;
        check_tolerance("ppm", self.ppm)?;
        if let Some(path) = self.write_config.as_deref() {
            self.save_config(path)?;
        }
        info!("Input: {}", self.input_file.display());
        if let Some(fasta) = self.fasta.as_ref() {
            info!("Database: {}", fasta.display());
        }
        self.create_threadpool()?
            .install(|| self.run_workflow(params))
    }

    fn run_workflow(&self, params: TaggerParams) -> Result<(), MZTaggerError> {
        let start = Instant::now();
        let mass_list = read_mass_list_path(&self.input_file, self.quality_scores)?;
        info!("Masses: {}", mass_list.len());

        let mut engine = TaggingEngine::new(params)?;
        let tag_count = if mass_list.scan_count() > 1 {
            debug!("Merging masses from {} scans", mass_list.scan_count());
            let spectra = mass_list.into_spectra(engine.params().max_node_count);
            engine.run_spectra(spectra, self.ppm)?.len()
        } else {
            match mass_list {
                MassList::Scored(nodes) => engine.run(&nodes, self.ppm)?.len(),
                MassList::Quality(groups) => engine.run_peak_groups(&groups, self.ppm)?.len(),
            }
        };
        info!("Tags: {tag_count}");

        if let Some(fasta) = self.fasta.as_ref() {
            let hits = engine.run_matching_fasta(fasta)?;
            info!("Protein Hits: {}", hits.len());
        }

        self.write_results(&engine)?;
        info!("Total Elapsed Time: {:0.3?}", start.elapsed());
        Ok(())
    }

    fn write_results(&self, engine: &TaggingEngine) -> io::Result<()> {
        if self.json {
            let path = self.output_path(".json");
            info!("Output: {}", path.display());
            let mut handle = create_output(&path)?;
            write_json(&mut handle, engine)?;
            io::Write::flush(&mut handle)?;
            return Ok(());
        }
        let path = self.output_path(".tags.tsv");
        info!("Output: {}", path.display());
        let mut handle = create_output(&path)?;
        write_tags(&mut handle, engine.tags())?;
        io::Write::flush(&mut handle)?;
        if self.fasta.is_some() {
            let path = self.output_path(".proteins.tsv");
            info!("Output: {}", path.display());
            let mut handle = create_output(&path)?;
            write_protein_hits(&mut handle, engine)?;
            io::Write::flush(&mut handle)?;
        }
        Ok(())
    }
}
