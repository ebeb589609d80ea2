use crate::error::{Result, Section, TaqmanError};
use crate::{Observation, ResultsRecord, SetupRecord};
use log::debug;
use std::fs::File;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const SAMPLE_NAME: &str = "Sample Name";
const ASSAY_NAME: &str = "SNP Assay Name";
const ALLELE1_NAME: &str = "Allele1 Name";
const ALLELE2_NAME: &str = "Allele2 Name";
const ALLELE1_CRT: &str = "Allele1 Crt";
const ALLELE2_CRT: &str = "Allele2 Crt";

/// Which column of a section a header field feeds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Sample,
    Assay,
    Allele1,
    Allele2,
    Ignored,
}

impl Field {
    fn from_header(section: Section, name: &str) -> Self {
        match (section, name) {
            (_, SAMPLE_NAME) => Self::Sample,
            (_, ASSAY_NAME) => Self::Assay,
            (Section::Setup, ALLELE1_NAME) | (Section::Results, ALLELE1_CRT) => Self::Allele1,
            (Section::Setup, ALLELE2_NAME) | (Section::Results, ALLELE2_CRT) => Self::Allele2,
            _ => Self::Ignored,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionState {
    Outside,
    AwaitingHeader,
    ReadingRows,
}

/// What a section did with a line.
enum Step {
    /// The line was a marker or header and belongs to no one else.
    Consumed,
    Row(Observation),
    Passed,
}

/// Tracks one section of the export across a single pass over its lines.
///
/// The header is captured once. A repeated marker resumes reading rows
/// against it.
struct SectionParser {
    section: Section,
    state: SectionState,
    header: Option<Vec<Field>>,
}

impl SectionParser {
    fn new(section: Section) -> Self {
        Self {
            section,
            state: SectionState::Outside,
            header: None,
        }
    }

    fn got_header(&self) -> bool {
        self.header.is_some()
    }

    /// `blank` lines close a section that is reading rows.
    fn step(&mut self, lnum: usize, line: &str, blank: bool) -> Result<Step> {
        if line.contains(self.section.marker()) {
            debug!("{} marker at line {}", self.section, lnum);
            self.state = if self.got_header() {
                SectionState::ReadingRows
            } else {
                SectionState::AwaitingHeader
            };
            return Ok(Step::Consumed);
        }

        match self.state {
            SectionState::Outside => Ok(Step::Passed),
            SectionState::AwaitingHeader => {
                let header: Vec<Field> = line
                    .split('\t')
                    .map(|name| Field::from_header(self.section, name))
                    .collect();
                debug!(
                    "{} header at line {} has {} fields",
                    self.section,
                    lnum,
                    header.len()
                );
                self.header = Some(header);
                self.state = SectionState::ReadingRows;
                Ok(Step::Consumed)
            }
            SectionState::ReadingRows if blank => {
                debug!("{} section closed at line {}", self.section, lnum);
                self.state = SectionState::Outside;
                Ok(Step::Passed)
            }
            SectionState::ReadingRows => self.read_row(lnum, line),
        }
    }

    fn read_row(&self, lnum: usize, line: &str) -> Result<Step> {
        let header = self.header.as_deref().unwrap_or_default();
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != header.len() {
            return Err(TaqmanError::FieldCount {
                section: self.section,
                line: lnum,
                expected: header.len(),
                actual: fields.len(),
                content: line.to_owned(),
            });
        }

        // Columns missing from the header leave their field empty.
        let (mut sample, mut assay, mut allele1, mut allele2) = ("", "", "", "");
        for (field, value) in header.iter().zip(fields) {
            match field {
                Field::Sample => sample = value,
                Field::Assay => assay = value,
                Field::Allele1 => allele1 = value,
                Field::Allele2 => allele2 = value,
                Field::Ignored => {}
            }
        }

        let observation = match self.section {
            Section::Setup => Observation::Setup {
                line: lnum,
                record: SetupRecord {
                    sample: sample.into(),
                    assay: assay.into(),
                    allele1: allele1.into(),
                    allele2: allele2.into(),
                },
            },
            Section::Results => Observation::Results {
                line: lnum,
                record: ResultsRecord {
                    sample: sample.into(),
                    assay: assay.into(),
                    allele1_crt: allele1.into(),
                    allele2_crt: allele2.into(),
                },
            },
        };
        Ok(Step::Row(observation))
    }
}

/// Produces Observations from a TaqMan text export
///
/// `TaqmanReader` implements Iterator so it can be passed
/// directly to `Experiment::observe()`. Both sections are tracked over the
/// same pass; the first error ends iteration.
pub struct TaqmanReader {
    reader: BufReader<Box<dyn Read>>,
    lnum: usize,
    buf: String,
    sections: [SectionParser; 2],
    pending: VecDeque<Observation>,
    done: bool,
}

impl TaqmanReader {
    pub fn from_reader(reader: Box<dyn Read>) -> Self {
        Self {
            reader: BufReader::new(reader),
            lnum: 0,
            buf: String::new(),
            sections: [
                SectionParser::new(Section::Setup),
                SectionParser::new(Section::Results),
            ],
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Opens `path`, which must be an existing regular file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TaqmanError::InputNotFound(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Ok(Self::from_reader(Box::new(file)))
    }

    fn feed_line(&mut self, lnum: usize, line: &str, blank: bool) -> Result<()> {
        for section in self.sections.iter_mut() {
            match section.step(lnum, line, blank)? {
                Step::Consumed => break,
                Step::Row(observation) => self.pending.push_back(observation),
                Step::Passed => {}
            }
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        for section in self.sections.iter() {
            if !section.got_header() {
                return Err(TaqmanError::MissingSection(section.section));
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: TaqmanError) -> Option<Result<Observation>> {
        self.done = true;
        self.pending.clear();
        Some(Err(err))
    }
}

impl Iterator for TaqmanReader {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Result<Observation>> {
        loop {
            if let Some(observation) = self.pending.pop_front() {
                return Some(Ok(observation));
            }
            if self.done {
                return None;
            }
            let mut buf = std::mem::take(&mut self.buf);
            buf.clear();
            let read = self.reader.read_line(&mut buf);
            let result = match read {
                Ok(0) => {
                    self.done = true;
                    self.finish()
                }
                Ok(_) => {
                    self.lnum += 1;
                    let (line, blank) = split_terminator(&buf);
                    self.feed_line(self.lnum, line, blank)
                }
                Err(err) => Err(err.into()),
            };
            self.buf = buf;
            if let Err(err) = result {
                return self.fail(err);
            }
        }
    }
}

/// Strips the line terminator and decides whether the line is blank.
///
/// A line is blank when it is at most one character long counting its `\n`,
/// so a lone character on an unterminated last line is blank too.
fn split_terminator(raw: &str) -> (&str, bool) {
    let (line, terminated) = match raw.strip_suffix('\n') {
        Some(line) => (line.strip_suffix('\r').unwrap_or(line), true),
        None => (raw, false),
    };
    let blank = line.chars().count() + usize::from(terminated) <= 1;
    (line, blank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const SETUP_HEADER: &str = "Well\tSample Name\tSNP Assay Name\tAllele1 Name\tAllele2 Name";
    const RESULTS_HEADER: &str = "Well\tSample Name\tSNP Assay Name\tAllele1 Crt\tAllele2 Crt";

    fn reader(text: &str) -> TaqmanReader {
        TaqmanReader::from_reader(Box::new(std::io::Cursor::new(text.to_owned())))
    }

    fn export() -> String {
        [
            "* Instrument Type = QuantStudio",
            "",
            "[Sample Setup]",
            SETUP_HEADER,
            "1\tS1\tA1\tA\tG",
            "2\tS1\tB1\tC\tT",
            "",
            "[Results]",
            RESULTS_HEADER,
            "1\tS1\tA1\t20.5\tUndetermined",
            "2\tS1\tB1\t22.0\t23.1",
            "",
        ]
        .join("\n")
    }

    #[test]
    fn test_reads_both_sections() -> std::result::Result<(), Box<dyn Error>> {
        let observations = reader(&export()).collect::<crate::error::Result<Vec<_>>>()?;
        assert_eq!(observations.len(), 4);
        match &observations[0] {
            Observation::Setup { line, record } => {
                assert_eq!(*line, 5);
                assert_eq!(record.sample, "S1");
                assert_eq!(record.assay, "A1");
                assert_eq!(record.allele1, "A");
                assert_eq!(record.allele2, "G");
            }
            _ => panic!("expected a setup row first"),
        }
        match &observations[3] {
            Observation::Results { line, record } => {
                assert_eq!(*line, 11);
                assert_eq!(record.allele1_crt, "22.0");
                assert_eq!(record.allele2_crt, "23.1");
            }
            _ => panic!("expected a results row last"),
        }
        Ok(())
    }

    #[test]
    fn test_header_columns_are_order_independent() -> std::result::Result<(), Box<dyn Error>> {
        let text = "[Sample Setup]\nAllele2 Name\tSNP Assay Name\tAllele1 Name\tSample Name\r\nG\tA1\tA\tS1\r\n\r\n[Results]\nAllele2 Crt\tSample Name\tAllele1 Crt\tSNP Assay Name\nUndetermined\tS1\t20.0\tA1\n";
        let observations = reader(text).collect::<crate::error::Result<Vec<_>>>()?;
        assert_eq!(observations.len(), 2);
        if let Observation::Setup { record, .. } = &observations[0] {
            assert_eq!(record.sample, "S1");
            assert_eq!(record.allele2, "G");
        } else {
            panic!("expected a setup row");
        }
        if let Observation::Results { record, .. } = &observations[1] {
            assert_eq!(record.allele1_crt, "20.0");
            assert_eq!(record.allele2_crt, "Undetermined");
        } else {
            panic!("expected a results row");
        }
        Ok(())
    }

    #[test]
    fn test_missing_column_leaves_field_empty() -> std::result::Result<(), Box<dyn Error>> {
        let text = "[Sample Setup]\nSample Name\tSNP Assay Name\tAllele1 Name\nS1\tA1\tA\n\n[Results]\nSample Name\tSNP Assay Name\tAllele1 Crt\tAllele2 Crt\nS1\tA1\t20.0\t30.0\n";
        let observations = reader(text).collect::<crate::error::Result<Vec<_>>>()?;
        if let Observation::Setup { record, .. } = &observations[0] {
            assert_eq!(record.allele2, "");
        } else {
            panic!("expected a setup row");
        }
        Ok(())
    }

    #[test]
    fn test_short_results_row_reports_line() {
        let text = export().replace("2\tS1\tB1\t22.0\t23.1", "2\tS1\tB1\t22.0");
        let err = reader(&text)
            .find_map(|o| o.err())
            .expect("parse should fail");
        match err {
            TaqmanError::FieldCount {
                section,
                line,
                expected,
                actual,
                content,
            } => {
                assert_eq!(section, Section::Results);
                assert_eq!(line, 11);
                assert_eq!(expected, 5);
                assert_eq!(actual, 4);
                assert_eq!(content, "2\tS1\tB1\t22.0");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_results_section() {
        let text = "[Sample Setup]\nSample Name\tSNP Assay Name\nS1\tA1\n";
        let err = reader(text).find_map(|o| o.err()).expect("parse should fail");
        assert!(matches!(err, TaqmanError::MissingSection(Section::Results)));
    }

    #[test]
    fn test_missing_setup_section_is_reported_first() {
        let err = reader("nothing here\n")
            .find_map(|o| o.err())
            .expect("parse should fail");
        assert!(matches!(err, TaqmanError::MissingSection(Section::Setup)));
    }

    #[test]
    fn test_header_is_taken_verbatim_after_marker() {
        // A blank line right after the marker still becomes the (one column) header.
        let text = "[Sample Setup]\n\nS1\tA1\n";
        let err = reader(text).find_map(|o| o.err()).expect("parse should fail");
        assert!(matches!(
            err,
            TaqmanError::FieldCount {
                section: Section::Setup,
                line: 3,
                expected: 1,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_repeated_marker_keeps_first_header() -> std::result::Result<(), Box<dyn Error>> {
        let text = format!(
            "[Sample Setup]\n{}\n1\tS1\tA1\tA\tG\n\n[Sample Setup]\n2\tS2\tA1\tA\tG\n3\tS3\tA1\tA\tG\n\n[Results]\n{}\n",
            SETUP_HEADER, RESULTS_HEADER
        );
        let samples: Vec<String> = reader(&text)
            .collect::<crate::error::Result<Vec<_>>>()?
            .into_iter()
            .filter_map(|o| match o {
                Observation::Setup { record, .. } => Some(record.sample),
                _ => None,
            })
            .collect();
        assert_eq!(samples, vec!["S1", "S2", "S3"]);
        Ok(())
    }

    #[test]
    fn test_single_character_last_line_closes_section() -> std::result::Result<(), Box<dyn Error>> {
        let text = format!(
            "[Results]\n{}\n1\tS1\tA1\t20.0\t30.0\n\n[Sample Setup]\n{}\n1\tS1\tA1\tA\tG\nx",
            RESULTS_HEADER, SETUP_HEADER
        );
        let observations = reader(&text).collect::<crate::error::Result<Vec<_>>>()?;
        assert_eq!(observations.len(), 2);
        Ok(())
    }

    #[test]
    fn test_split_terminator() {
        assert_eq!(split_terminator("a\tb\r\n"), ("a\tb", false));
        assert_eq!(split_terminator("\n"), ("", true));
        assert_eq!(split_terminator("\r\n"), ("", true));
        assert_eq!(split_terminator("x\n"), ("x", false));
        assert_eq!(split_terminator("x"), ("x", true));
        assert_eq!(split_terminator("xy"), ("xy", false));
    }

    #[test]
    fn test_rows_end_at_end_of_input() -> std::result::Result<(), Box<dyn Error>> {
        let text = format!(
            "[Sample Setup]\n{}\n1\tS1\tA1\tA\tG\n\n[Results]\n{}\n1\tS1\tA1\t20.0\t30.0",
            SETUP_HEADER, RESULTS_HEADER
        );
        let observations = reader(&text).collect::<crate::error::Result<Vec<_>>>()?;
        assert_eq!(observations.len(), 2);
        Ok(())
    }
}
