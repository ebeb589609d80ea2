#![crate_name = "taqman"]
use log::info;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

pub mod prelude;

pub mod barcode;
pub mod error;
pub mod genetics;
pub mod observable;
pub mod plate;

use crate::barcode::{format_results, Barcode};
use crate::error::{Result, Section, TaqmanError};
use crate::genetics::call_snps;
use crate::observable::TaqmanReader;

/// Setup rows keyed by sample name concatenated with assay name.
pub type Setup = BTreeMap<String, SetupRecord>;
/// Results rows keyed by sample name concatenated with assay name.
pub type Results = BTreeMap<String, ResultsRecord>;

/// The join key between the two sections.
///
/// This is plain concatenation with no separator, so sample `A` with assay
/// `B1` and sample `AB` with assay `1` share a key. The export format does not
/// rule that out and neither do we.
pub fn composite_key(sample: &str, assay: &str) -> String {
    format!("{}{}", sample, assay)
}

/// One row of the `[Sample Setup]` section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetupRecord {
    pub sample: String,
    pub assay: String,
    pub allele1: String,
    pub allele2: String,
}

impl SetupRecord {
    pub fn key(&self) -> String {
        composite_key(&self.sample, &self.assay)
    }
}

/// One row of the `[Results]` section. Crt values are kept as text until
/// a call is made.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultsRecord {
    pub sample: String,
    pub assay: String,
    pub allele1_crt: String,
    pub allele2_crt: String,
}

impl ResultsRecord {
    pub fn key(&self) -> String {
        composite_key(&self.sample, &self.assay)
    }
}

/// A single row read from one of the sections of an export
pub enum Observation {
    /// A `[Sample Setup]` row and the line it came from
    Setup { line: usize, record: SetupRecord },

    /// A `[Results]` row and the line it came from
    Results { line: usize, record: ResultsRecord },
}

/// Both tables of one TaqMan export.
#[derive(Debug, Default)]
pub struct Experiment {
    setup: Setup,
    results: Results,
}

impl Experiment {
    /// Constructs a new empty `Experiment`
    ///
    /// The `Experiment` can be filled up by calling `observe()`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a complete export and checks that both tables line up.
    pub fn from_reader(reader: Box<dyn Read>) -> Result<Self> {
        let mut experiment = Self::new();
        experiment.observe(TaqmanReader::from_reader(reader))?;
        experiment.validate()?;
        Ok(experiment)
    }

    /// Same as `from_reader()`, for a file on disk.
    ///
    /// The path must name an existing regular file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut experiment = Self::new();
        experiment.observe(TaqmanReader::from_path(path)?)?;
        experiment.validate()?;
        Ok(experiment)
    }

    /// Observes a single `Observation`
    ///
    /// Fails if the table already holds a row for the same sample and assay.
    pub fn _observe(&mut self, observation: Observation) -> Result<()> {
        match observation {
            Observation::Setup { line, record } => {
                let key = record.key();
                if self.setup.contains_key(&key) {
                    return Err(TaqmanError::DuplicateKey {
                        section: Section::Setup,
                        line,
                        sample: record.sample,
                        assay: record.assay,
                    });
                }
                self.setup.insert(key, record);
            }
            Observation::Results { line, record } => {
                let key = record.key();
                if self.results.contains_key(&key) {
                    return Err(TaqmanError::DuplicateKey {
                        section: Section::Results,
                        line,
                        sample: record.sample,
                        assay: record.assay,
                    });
                }
                self.results.insert(key, record);
            }
        }
        Ok(())
    }

    /// Observe all the data in the argument.
    pub fn observe<I>(&mut self, observable: I) -> Result<()>
    where
        I: Iterator<Item = Result<Observation>>,
    {
        for observation in observable {
            self._observe(observation?)?;
        }
        Ok(())
    }

    /// Both tables must hold the same number of rows.
    pub fn validate(&self) -> Result<()> {
        info!(
            "Read {} Sample Setup rows and {} Results rows",
            self.setup.len(),
            self.results.len()
        );
        if self.setup.len() != self.results.len() {
            return Err(TaqmanError::CardinalityMismatch {
                setup: self.setup.len(),
                results: self.results.len(),
            });
        }
        Ok(())
    }

    /// Calls every sample at every assay and lays the calls out as barcodes.
    pub fn barcodes(&self) -> Result<Vec<Barcode>> {
        let calls = call_snps(self.setup(), self.results())?;
        format_results(self.setup(), &calls)
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    pub fn results(&self) -> &Results {
        &self.results
    }
}
