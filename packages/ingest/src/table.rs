//! CSV plumbing shared by the ingest stages.

use std::io::Read;

use csv::StringRecord;

use crate::IngestError;

/// Opens a CSV reader over `input` that expects a header row.
pub fn reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().has_headers(true).from_reader(input)
}

/// Reads the header row with surrounding whitespace stripped from every
/// name.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the header row cannot be read.
pub fn trimmed_headers<R: Read>(reader: &mut csv::Reader<R>) -> Result<StringRecord, IngestError> {
    let headers: StringRecord = reader.headers()?.iter().map(str::trim).collect();
    reader.set_headers(headers.clone());
    Ok(headers)
}

/// Position of the column called `name`.
///
/// # Errors
///
/// Returns [`IngestError::MissingColumn`] listing the available columns if
/// there is no such column.
pub fn column_index(headers: &StringRecord, name: &str) -> Result<usize, IngestError> {
    find_column(headers, name).ok_or_else(|| IngestError::MissingColumn {
        name: name.to_string(),
        available: headers.iter().collect::<Vec<_>>().join(", "),
    })
}

/// Position of the column called `name`, if present.
#[must_use]
pub fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

/// Output header row plus where each derived column lands in it.
///
/// A derived column that already exists in the input is overwritten in
/// place; otherwise it is appended after the input columns.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    headers: StringRecord,
    input_width: usize,
    slots: Vec<usize>,
}

impl OutputLayout {
    #[must_use]
    pub fn new(input: &StringRecord, derived: &[&str]) -> Self {
        let mut headers = input.clone();
        let mut slots = Vec::with_capacity(derived.len());

        for name in derived {
            if let Some(idx) = find_column(&headers, name) {
                slots.push(idx);
            } else {
                slots.push(headers.len());
                headers.push_field(name);
            }
        }

        Self {
            headers,
            input_width: input.len(),
            slots,
        }
    }

    #[must_use]
    pub const fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Builds an output row from an input row and one value per derived
    /// column, in the order the columns were passed to [`Self::new`].
    #[must_use]
    pub fn render(&self, row: &StringRecord, values: &[&str]) -> StringRecord {
        debug_assert_eq!(values.len(), self.slots.len());

        let mut fields: Vec<&str> = row.iter().collect();
        fields.resize(self.input_width, "");
        fields.resize(self.headers.len(), "");
        for (&slot, value) in self.slots.iter().zip(values) {
            fields[slot] = *value;
        }
        fields.into_iter().collect()
    }
}
