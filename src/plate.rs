//! Ordering of assays by their position on a 384-well plate.
//!
//! Barcode assays are laid out down the columns of the plate, so the
//! barcode reads A1, B1, A2, B2, ... A12, B12 rather than in row order.

use crate::error::{Result, TaqmanError};
use crate::Setup;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A well position parsed from an assay name such as `B12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatePosition {
    pub column: u32,
    /// Lowercased row letters
    pub row: String,
}

impl PlatePosition {
    /// Splits an assay name into its leading letters and trailing digits.
    ///
    /// Names that do not split that way (`A1_x`, `12`, `Well`) are rejected
    /// with `InvalidAssay` instead of being given an arbitrary position.
    pub fn parse(assay: &str) -> Result<Self> {
        let invalid = || TaqmanError::InvalidAssay(assay.to_owned());
        let split = assay
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (row, column) = assay.split_at(split);
        if row.is_empty()
            || !row.chars().all(char::is_alphabetic)
            || !column.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        Ok(Self {
            column: column.parse().map_err(|_| invalid())?,
            row: row.to_lowercase(),
        })
    }
}

impl Ord for PlatePosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.column
            .cmp(&other.column)
            .then_with(|| self.row.cmp(&other.row))
    }
}

impl PartialOrd for PlatePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorts assay names column first, then row.
pub fn sort_assays<'a, I>(assays: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keyed = assays
        .into_iter()
        .map(|assay| Ok((PlatePosition::parse(assay)?, assay.to_owned())))
        .collect::<Result<Vec<_>>>()?;
    keyed.sort();
    Ok(keyed.into_iter().map(|(_, assay)| assay).collect())
}

/// The distinct assays seen in Sample Setup, in plate order.
pub fn assay_sort(setup: &Setup) -> Result<Vec<String>> {
    let seen: BTreeSet<&str> = setup.values().map(|record| record.assay.as_str()).collect();
    sort_assays(seen)
}
