//! Run configuration and its validation.
use std::io;

use thiserror::Error;

use crate::residues::{standard_residues, Residue};

/// A configuration value the tagger cannot run with
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("{name} = {value} is outside of the allowed range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("min_length ({min_length}) must not exceed max_length ({max_length})")]
    InvertedLengthRange { min_length: usize, max_length: usize },
    #[error("The residue alphabet is empty")]
    EmptyAlphabet,
    #[error("Residue {symbol} has an invalid mass {mass}")]
    InvalidResidueMass { symbol: char, mass: f64 },
    #[error("{name} = {value} must be a finite, non-negative tolerance")]
    InvalidTolerance { name: &'static str, value: f64 },
}

/// An error that might occur while tagging or matching
#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("Invalid parameter: {0}")]
    Parameter(#[from] ParameterError),
    #[error("An IO error occurred: {0}")]
    IOError(#[from] io::Error),
}

pub const MIN_TAG_LENGTH: usize = 3;
pub const MAX_TAG_LENGTH: usize = 30;
pub const MAX_ISOTOPE_ERRORS: usize = 2;
/// The largest magnitude a mass score may have. Path scores span the tag length times
/// this, and every graph edge is repeated across that span.
pub const MAX_NODE_SCORE: i32 = 1000;

/// The parameters of a tagging run, fixed for its duration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TaggerParams {
    /// The most tags to keep per tag length. Zero disables tagging.
    pub max_tag_count: usize,
    /// The shortest tag length, in residues
    pub min_length: usize,
    /// The longest tag length, in residues
    pub max_length: usize,
    /// The tolerance in Daltons for comparing a tag's flanking mass to a protein
    pub flanking_mass_tol: f64,
    /// The most isotope errors a single tag may absorb
    pub max_iso_error_count: usize,
    /// The fewest covered residues a protein needs to be reported
    pub min_matched_aa: usize,
    /// The q-value threshold for reporting protein hits
    pub fdr: f64,
    /// Report decoy hits regardless of their q-value
    pub keep_decoy: bool,
    /// The accession prefix marking decoy proteins
    pub decoy_prefix: String,
    /// The most masses to build a tag graph over
    pub max_node_count: usize,
    /// The most sequences one path may expand into when its gaps are ambiguous
    pub max_sequence_expansion: usize,
    /// The residues tag gaps are explained with
    pub residues: Vec<Residue>,
}

impl Default for TaggerParams {
    fn default() -> Self {
        Self {
            max_tag_count: 500,
            min_length: 4,
            max_length: 10,
            flanking_mass_tol: 500.0,
            max_iso_error_count: 0,
            min_matched_aa: 5,
            fdr: 1.0,
            keep_decoy: false,
            decoy_prefix: "DECOY".to_string(),
            max_node_count: 500,
            max_sequence_expansion: 256,
            residues: standard_residues(),
        }
    }
}

pub(crate) fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ParameterError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name,
            value,
            min,
            max,
        })
    }
}

/// Check that `ppm` is usable as a mass tolerance
pub fn check_tolerance(name: &'static str, value: f64) -> Result<(), ParameterError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::InvalidTolerance { name, value })
    }
}

impl TaggerParams {
    /// Check every parameter against its allowed range, reporting the first violation
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_range(
            "min_length",
            self.min_length as f64,
            MIN_TAG_LENGTH as f64,
            MAX_TAG_LENGTH as f64,
        )?;
        check_range(
            "max_length",
            self.max_length as f64,
            MIN_TAG_LENGTH as f64,
            MAX_TAG_LENGTH as f64,
        )?;
        if self.min_length > self.max_length {
            return Err(ParameterError::InvertedLengthRange {
                min_length: self.min_length,
                max_length: self.max_length,
            });
        }
        check_range(
            "max_iso_error_count",
            self.max_iso_error_count as f64,
            0.0,
            MAX_ISOTOPE_ERRORS as f64,
        )?;
        check_range("fdr", self.fdr, 0.01, 1.0)?;
        check_tolerance("flanking_mass_tol", self.flanking_mass_tol)?;
        check_range("max_node_count", self.max_node_count as f64, 1.0, f64::INFINITY)?;
        check_range(
            "max_sequence_expansion",
            self.max_sequence_expansion as f64,
            1.0,
            f64::INFINITY,
        )?;
        if self.residues.is_empty() {
            return Err(ParameterError::EmptyAlphabet);
        }
        if let Some(res) = self
            .residues
            .iter()
            .find(|r| !(r.mass.is_finite() && r.mass > 0.0))
        {
            return Err(ParameterError::InvalidResidueMass {
                symbol: res.symbol,
                mass: res.mass,
            });
        }
        Ok(())
    }
}
