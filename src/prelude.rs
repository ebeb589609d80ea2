pub use crate::barcode::{format_results, get_samples, write_barcodes, Barcode, CallMatrix};
pub use crate::error::{Result, Section, TaqmanError};
pub use crate::genetics::{call_genotype, call_snps, Call, Calls};
pub use crate::observable::TaqmanReader;
pub use crate::plate::{assay_sort, sort_assays, PlatePosition};
pub use crate::{composite_key, Experiment, Observation, Results, ResultsRecord, Setup, SetupRecord};
