//! Normalized address records and their tab-separated wire format

/// Column order of the staging/target tables and of the TSV batch format.
pub const COLUMNS: [&str; 5] = ["cep", "street", "city", "region", "neighborhood"];

/// One normalized address entry decoded from a DNE snapshot line
///
/// `cep` is the unique reconciliation key and is always non-empty; every
/// other field may be empty. All fields are whitespace-normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    pub cep: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub neighborhood: String,
}

impl AddressRecord {
    /// Serialize as one TSV row in [`COLUMNS`] order, newline-terminated.
    ///
    /// The output doubles as Postgres `COPY ... FROM STDIN` text input:
    /// backslashes are escaped, and normalized fields cannot contain tabs
    /// or newlines.
    pub fn to_tsv_row(&self) -> String {
        let mut row = String::with_capacity(
            self.cep.len()
                + self.street.len()
                + self.city.len()
                + self.region.len()
                + self.neighborhood.len()
                + 5,
        );
        for (i, field) in [
            &self.cep,
            &self.street,
            &self.city,
            &self.region,
            &self.neighborhood,
        ]
        .into_iter()
        .enumerate()
        {
            if i > 0 {
                row.push('\t');
            }
            for ch in field.chars() {
                if ch == '\\' {
                    row.push('\\');
                }
                row.push(ch);
            }
        }
        row.push('\n');
        row
    }
}

/// Collapse internal whitespace runs to a single space and trim the ends.
pub fn normalize_spaces(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
