use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The two sections of a TaqMan export that carry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Setup,
    Results,
}

impl Section {
    /// The literal marker that opens this section.
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Setup => "[Sample Setup]",
            Self::Results => "[Results]",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => write!(f, "Sample Setup"),
            Self::Results => write!(f, "Results"),
        }
    }
}

/// Every way a run can fail. None of these are recoverable.
#[derive(Debug, Error)]
pub enum TaqmanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error writing output: {0}")]
    Csv(#[from] csv::Error),
    #[error("Error building the call matrix: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Input file '{0}' does not exist or is not a regular file.")]
    InputNotFound(PathBuf),
    #[error("Did not find {0} section!")]
    MissingSection(Section),
    #[error(
        "In {section}, header has {expected} fields but row has {actual} at line {line}:\n{content}"
    )]
    FieldCount {
        section: Section,
        line: usize,
        expected: usize,
        actual: usize,
        content: String,
    },
    #[error("{section} has multiple entries for {sample} {assay} (line {line})")]
    DuplicateKey {
        section: Section,
        line: usize,
        sample: String,
        assay: String,
    },
    #[error("Setup and Results have differing numbers of rows! Setup: {setup}; Results: {results}")]
    CardinalityMismatch { setup: usize, results: usize },
    #[error("Results missing entry for {sample} {assay}")]
    MissingResults { sample: String, assay: String },
    #[error("Could not parse Crt value '{value}' for {sample} {assay} as a number")]
    InvalidCrt {
        sample: String,
        assay: String,
        value: String,
    },
    #[error("Assay name '{0}' is not a plate position (expected a letter followed by digits)")]
    InvalidAssay(String),
    #[error("No call for sample {sample} at assay {assay}")]
    MissingCall { sample: String, assay: String },
}

pub type Result<T> = std::result::Result<T, TaqmanError>;
