use crate::error::{Result, TaqmanError};
use crate::{Results, ResultsRecord, Setup, SetupRecord};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Crt values closer than this are called heterozygous.
pub const THRESHOLD: f64 = 6.0;
/// What the instrument writes when a channel never crossed threshold.
pub const UNDETERMINED: &str = "Undetermined";
pub const HETEROZYGOUS: char = 'N';
pub const MISSING: char = 'X';

/// Calls keyed by sample name concatenated with assay name.
pub type Calls = BTreeMap<String, Call>;

/// The genotype called for one sample at one assay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Homozygous for the named allele
    Allele(String),
    Heterozygous,
    Missing,
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allele(name) => write!(f, "{}", name),
            Self::Heterozygous => write!(f, "{}", HETEROZYGOUS),
            Self::Missing => write!(f, "{}", MISSING),
        }
    }
}

/// Parses a Crt value that is not the sentinel, naming the sample and assay
/// on failure.
pub fn parse_crt(text: &str, sample: &str, assay: &str) -> Result<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| TaqmanError::InvalidCrt {
            sample: sample.to_owned(),
            assay: assay.to_owned(),
            value: text.to_owned(),
        })
}

/// Calls one sample/assay pair.
///
/// Both channels undetermined is missing data. If only one is undetermined
/// the other allele is the call. Otherwise values closer than `THRESHOLD`
/// are heterozygous, and past that the allele that crossed first (smaller
/// Crt) wins.
pub fn call_genotype(setup: &SetupRecord, results: &ResultsRecord) -> Result<Call> {
    let a1 = results.allele1_crt.as_str();
    let a2 = results.allele2_crt.as_str();
    match (a1 == UNDETERMINED, a2 == UNDETERMINED) {
        (true, true) => Ok(Call::Missing),
        (true, false) => Ok(Call::Allele(setup.allele2.clone())),
        (false, true) => Ok(Call::Allele(setup.allele1.clone())),
        (false, false) => {
            let a1 = parse_crt(a1, &setup.sample, &setup.assay)?;
            let a2 = parse_crt(a2, &setup.sample, &setup.assay)?;
            if (a1 - a2).abs() < THRESHOLD {
                Ok(Call::Heterozygous)
            } else if a1 < a2 {
                Ok(Call::Allele(setup.allele1.clone()))
            } else {
                Ok(Call::Allele(setup.allele2.clone()))
            }
        }
    }
}

/// Calls every key in `setup`. Each one must have a row in `results`.
pub fn call_snps(setup: &Setup, results: &Results) -> Result<Calls> {
    let mut calls = Calls::new();
    for (key, record) in setup.iter() {
        let reading = results
            .get(key)
            .ok_or_else(|| TaqmanError::MissingResults {
                sample: record.sample.clone(),
                assay: record.assay.clone(),
            })?;
        let call = call_genotype(record, reading)?;
        debug!("{} {} -> {}", record.sample, record.assay, call);
        calls.insert(key.clone(), call);
    }
    Ok(calls)
}
