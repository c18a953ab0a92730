//! License reference table loading.
//!
//! The reference table is a CSV published alongside the licensing docs. Each
//! row names a product, its identifier and the service plans it bundles as a
//! pipe-delimited list of `"Friendly name (plan-id)"` entries.

use std::fs::File;
use std::path::Path;

use crate::constants;
use crate::error::{LoadError, SelectionError};
use crate::state::LicenseMappingEntry;

/// The loaded reference table, in file order.
#[derive(Clone, Debug, Default)]
pub struct ReferenceTable {
    entries: Vec<LicenseMappingEntry>,
}

impl ReferenceTable {
    /// Loads the table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the file cannot be read, a row is malformed,
    /// or one of the required columns is missing.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let mut reader = open_csv(path)?;
        let id_col = column_index(&mut reader, path, constants::COL_PRODUCT_ID)?;
        let name_col = column_index(&mut reader, path, constants::COL_PRODUCT_NAME)?;
        let plans_col = column_index(&mut reader, path, constants::COL_SERVICE_PLANS)?;

        let mut entries = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| LoadError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let line = record.position().map_or(0, csv::Position::line);
            let field = |col: usize, name: &str| {
                record
                    .get(col)
                    .map(str::trim)
                    .ok_or_else(|| LoadError::EmptyField {
                        path: path.to_path_buf(),
                        line,
                        column: name.to_string(),
                    })
            };
            let product_id = field(id_col, constants::COL_PRODUCT_ID)?;
            if product_id.is_empty() {
                return Err(LoadError::EmptyField {
                    path: path.to_path_buf(),
                    line,
                    column: constants::COL_PRODUCT_ID.to_string(),
                });
            }
            entries.push(LicenseMappingEntry {
                product_id: product_id.to_string(),
                friendly_name: field(name_col, constants::COL_PRODUCT_NAME)?.to_string(),
                service_plans: split_plans(field(plans_col, constants::COL_SERVICE_PLANS)?),
            });
        }

        log::info!("Loaded {} reference entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    /// Builds a table from already parsed entries.
    #[must_use]
    pub fn from_entries(entries: Vec<LicenseMappingEntry>) -> Self {
        Self { entries }
    }

    /// All entries in file order.
    #[must_use]
    pub fn entries(&self) -> &[LicenseMappingEntry] {
        &self.entries
    }

    /// Finds the entry for a product identifier (case-insensitive).
    #[must_use]
    pub fn by_product_id(&self, product_id: &str) -> Option<&LicenseMappingEntry> {
        self.entries
            .iter()
            .find(|e| e.product_id.eq_ignore_ascii_case(product_id))
    }

    /// Finds the first entry with the given friendly name.
    ///
    /// Names are not guaranteed unique; when several rows share a name the
    /// first one wins and a warning is logged.
    #[must_use]
    pub fn by_friendly_name(&self, name: &str) -> Option<&LicenseMappingEntry> {
        let mut matches = self.entries.iter().filter(|e| e.friendly_name == name);
        let first = matches.next()?;
        let others = matches.count();
        if others > 0 {
            log::warn!(
                "{} reference rows are named '{name}'; using {}",
                others + 1,
                first.product_id
            );
        }
        Some(first)
    }
}

/// Splits the pipe-delimited plan column into trimmed, non-empty entries.
fn split_plans(raw: &str) -> Vec<String> {
    raw.split(constants::SERVICE_PLAN_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Extracts the plan identifier from a `"Friendly name (plan-id)"` entry.
///
/// The identifier is the text inside the final pair of parentheses, so plan
/// names that contain parentheses themselves are handled.
///
/// # Errors
///
/// Returns [`SelectionError::MalformedPlan`] when the entry does not end in a
/// parenthesized token.
pub fn parse_plan_id(entry: &str) -> Result<String, SelectionError> {
    let malformed = || SelectionError::MalformedPlan(entry.to_string());
    let body = entry.trim().strip_suffix(')').ok_or_else(malformed)?;
    let start = body.rfind('(').ok_or_else(malformed)?;
    let id = body[start + 1..].trim();
    if id.is_empty() {
        return Err(malformed());
    }
    Ok(id.to_string())
}

/// Opens a CSV file with a header row. Every record must have as many fields
/// as the header.
pub(crate) fn open_csv(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new()
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(file))
}

/// Position of a named column in the header row.
pub(crate) fn column_index(
    reader: &mut csv::Reader<File>,
    path: &Path,
    column: &str,
) -> Result<usize, LoadError> {
    let headers = reader.headers().map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == column)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        })
}

/// Reads every non-blank value of one column.
pub(crate) fn read_column(path: &Path, column: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = open_csv(path)?;
    let idx = column_index(&mut reader, path, column)?;
    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(value) = record.get(idx).map(str::trim).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    pub(crate) const E5_ID: &str = "06ebc4ee-1bb5-47dd-8120-11324bc54e06";

    /// Writes `content` to a uniquely named file in the temp dir.
    pub(crate) fn write_temp(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "skuctl-{}-{}-{name}",
            std::process::id(),
            std::thread::current().name().unwrap_or("t").replace("::", "-")
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    const TABLE: &str = "\
Product name,String ID,GUID,Service plans included,Service plans included (friendly names)
Microsoft 365 E5,SPE_E5,06ebc4ee-1bb5-47dd-8120-11324bc54e06,x,\"Exchange Online (Plan 2) (efb87545-963c-4e0d-99df-69c6916d9eb0)|Microsoft Teams (57ff2da0-773e-42df-b2af-ffb7a2317929)\"
Office 365 E3,ENTERPRISEPACK,6fd2c87f-b296-42f0-b197-1e91e994b900,x,\"Exchange Online (Plan 2) (efb87545-963c-4e0d-99df-69c6916d9eb0) | | SharePoint Online (Plan 2) (5dbe027f-2339-4123-9542-606e4d348a72)\"
Microsoft 365 E5,SPE_E5_DUP,11111111-1bb5-47dd-8120-11324bc54e06,x,
";

    #[test]
    fn test_load_preserves_order_and_splits_plans() {
        let path = write_temp("table.csv", TABLE);
        let table = ReferenceTable::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let entries = table.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].product_id, E5_ID);
        assert_eq!(entries[0].service_plans.len(), 2);
        assert_eq!(
            entries[1].service_plans,
            vec![
                "Exchange Online (Plan 2) (efb87545-963c-4e0d-99df-69c6916d9eb0)".to_string(),
                "SharePoint Online (Plan 2) (5dbe027f-2339-4123-9542-606e4d348a72)".to_string(),
            ]
        );
        assert!(entries[2].service_plans.is_empty());
    }

    #[test]
    fn test_duplicate_names_return_first_match() {
        let path = write_temp("dup.csv", TABLE);
        let table = ReferenceTable::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let entry = table.by_friendly_name("Microsoft 365 E5").unwrap();
        assert_eq!(entry.product_id, E5_ID);
        assert!(table.by_friendly_name("Unknown").is_none());
        assert!(table
            .by_product_id("6FD2C87F-B296-42F0-B197-1E91E994B900")
            .is_some());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ReferenceTable::load(Path::new("/nonexistent/skuctl/table.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_missing_column() {
        let path = write_temp("nocol.csv", "GUID,Product name\nabc,Thing\n");
        let err = ReferenceTable::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        match err {
            LoadError::MissingColumn { column, .. } => {
                assert_eq!(column, constants::COL_SERVICE_PLANS);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_rejects_short_row() {
        let path = write_temp(
            "short.csv",
            "Product name,GUID,Service plans included (friendly names)\n\
             Microsoft 365 E5,06ebc4ee-1bb5-47dd-8120-11324bc54e06\n",
        );
        let err = ReferenceTable::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, LoadError::Csv { .. }), "got {err}");
    }

    #[test]
    fn test_load_rejects_blank_product_id() {
        let path = write_temp(
            "blankid.csv",
            "Product name,GUID,Service plans included (friendly names)\n\
             Microsoft 365 E5,06ebc4ee-1bb5-47dd-8120-11324bc54e06,Teams (abc)\n\
             Orphan product, ,Teams (abc)\n",
        );
        let err = ReferenceTable::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        match err {
            LoadError::EmptyField { line, column, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, constants::COL_PRODUCT_ID);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_plan_id() {
        assert_eq!(
            parse_plan_id("Exchange Online (Plan 2) (19ec0d23-8335-4cbf-531a-99b1122334455)")
                .unwrap(),
            "19ec0d23-8335-4cbf-531a-99b1122334455"
        );
        assert_eq!(
            parse_plan_id("  Microsoft Teams (57ff2da0-773e-42df-b2af-ffb7a2317929) ").unwrap(),
            "57ff2da0-773e-42df-b2af-ffb7a2317929"
        );
    }

    #[test]
    fn test_parse_plan_id_malformed() {
        assert!(parse_plan_id("Exchange Online").is_err());
        assert!(parse_plan_id("Exchange Online ()").is_err());
        assert!(parse_plan_id("Exchange Online (Plan 2) trailing").is_err());
    }

    #[test]
    fn test_read_column_skips_blanks() {
        let path = write_temp("users.csv", "UserPrincipalName\na@contoso.com\n\n b@contoso.com \n");
        let values = read_column(&path, constants::COL_USER_PRINCIPAL_NAME).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(values, vec!["a@contoso.com", "b@contoso.com"]);
    }
}
