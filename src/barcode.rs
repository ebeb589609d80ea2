use crate::error::{Result, TaqmanError};
use crate::genetics::{Call, Calls};
use crate::plate::assay_sort;
use crate::{composite_key, Setup};
use log::info;
use ndarray;
use std::collections::BTreeSet;
use std::io::Write;

/// One output line: a sample and its calls in plate order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barcode {
    pub sample: String,
    pub barcode: String,
}

/// Calls laid out with one row per sample and one column per assay.
pub struct CallMatrix {
    samples: Vec<String>,
    assays: Vec<String>,
    data: ndarray::Array2<Call>,
}

impl CallMatrix {
    /// Looks up the call for every sample at every assay.
    ///
    /// Every sample must have been called at every assay.
    pub fn from_calls(samples: Vec<String>, assays: Vec<String>, calls: &Calls) -> Result<Self> {
        let mut data = Vec::with_capacity(samples.len() * assays.len());
        for sample in samples.iter() {
            for assay in assays.iter() {
                let call = calls.get(&composite_key(sample, assay)).ok_or_else(|| {
                    TaqmanError::MissingCall {
                        sample: sample.clone(),
                        assay: assay.clone(),
                    }
                })?;
                data.push(call.clone());
            }
        }
        let data = ndarray::Array2::from_shape_vec((samples.len(), assays.len()), data)?;
        Ok(Self {
            samples,
            assays,
            data,
        })
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn assays(&self) -> &[String] {
        &self.assays
    }

    /// Joins each row into a barcode.
    pub fn barcodes(&self) -> Vec<Barcode> {
        self.data
            .outer_iter()
            .zip(self.samples().iter())
            .map(|(row, sample)| Barcode {
                sample: sample.clone(),
                barcode: row.iter().map(|call| call.to_string()).collect(),
            })
            .collect()
    }
}

/// Distinct sample names seen in Sample Setup.
pub fn get_samples(setup: &Setup) -> Vec<String> {
    setup
        .values()
        .map(|record| record.sample.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

/// Builds one barcode per sample, sorted by sample name.
pub fn format_results(setup: &Setup, calls: &Calls) -> Result<Vec<Barcode>> {
    let assays = assay_sort(setup)?;
    let samples = get_samples(setup);

    let matrix = CallMatrix::from_calls(samples, assays, calls)?;
    info!(
        "Formatting {} samples across {} assays",
        matrix.samples().len(),
        matrix.assays().len()
    );
    let mut barcodes = matrix.barcodes();
    barcodes.sort_by(|a, b| a.sample.cmp(&b.sample));
    Ok(barcodes)
}

/// Writes `sample<TAB>barcode` lines.
pub fn write_barcodes<W: Write>(writer: W, barcodes: &[Barcode]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    for barcode in barcodes {
        wtr.write_record([barcode.sample.as_str(), barcode.barcode.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}
