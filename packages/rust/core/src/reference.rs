//! The fallacy taxonomy: an ordered, read-only table of named fallacies.
//!
//! Loaded once per pipeline from a two-column CSV (`Fallacy`, `Description`).
//! Any schema problem is a fatal [`FallacyDetectorError::Config`] raised before
//! a run can start.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use fallacydetector_shared::{Configuration, FallacyDefinition, FallacyDetectorError, Result};

/// Table shipped with the binary, used when no override path is configured.
const BUILTIN_TABLE: &str = include_str!("../data/fallacies.csv");

const NAME_COLUMN: &str = "Fallacy";
const DESCRIPTION_COLUMN: &str = "Description";

/// Characters of description shown per entry in a listing.
const LISTING_PREVIEW_CHARS: usize = 80;

/// Loaded fallacy definitions, in file order.
#[derive(Debug, Clone)]
pub struct FallacyReference {
    entries: Vec<FallacyDefinition>,
}

impl FallacyReference {
    /// The compiled-in table.
    pub fn builtin() -> Result<Self> {
        Self::from_reader(BUILTIN_TABLE.as_bytes(), "built-in table")
    }

    /// Load the table from a CSV file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            FallacyDetectorError::config(format!(
                "fallacy reference not found at {}: {e}",
                path.display()
            ))
        })?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// The configured override table, or the built-in one.
    pub fn from_config(config: &Configuration) -> Result<Self> {
        match config.fallacies_path() {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        }
    }

    /// Parse CSV from any reader. `source` names the input in error messages.
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| schema_error(source, format!("unreadable header: {e}")))?
            .clone();

        for column in [NAME_COLUMN, DESCRIPTION_COLUMN] {
            if !headers.iter().any(|h| h == column) {
                return Err(schema_error(source, format!("missing '{column}' column")));
            }
        }

        let mut entries = Vec::new();
        for (i, record) in rdr.deserialize::<FallacyDefinition>().enumerate() {
            // header is line 1
            let line = i + 2;
            let def = record.map_err(|e| schema_error(source, format!("line {line}: {e}")))?;

            if def.name.is_empty() {
                return Err(schema_error(source, format!("line {line}: empty fallacy name")));
            }
            if def.description.is_empty() {
                return Err(schema_error(
                    source,
                    format!("line {line}: empty description for '{}'", def.name),
                ));
            }
            entries.push(def);
        }

        if entries.is_empty() {
            return Err(schema_error(source, "no fallacy definitions"));
        }

        info!(source, count = entries.len(), "loaded fallacy reference");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[FallacyDefinition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&FallacyDefinition> {
        self.entries.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Flat text table interpolated into prompts.
    pub fn render_table(&self) -> String {
        let mut out = format!("{NAME_COLUMN}: {DESCRIPTION_COLUMN}\n");
        for def in &self.entries {
            out.push_str(&def.name);
            out.push_str(": ");
            out.push_str(&def.description);
            out.push('\n');
        }
        debug!(chars = out.len(), "rendered fallacy table");
        out
    }

    /// One bullet line per entry with a shortened description.
    pub fn listing(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|def| {
                let preview: String = def.description.chars().take(LISTING_PREVIEW_CHARS).collect();
                format!("• {}: {preview}...", def.name)
            })
            .collect()
    }
}

fn schema_error(source: &str, detail: impl std::fmt::Display) -> FallacyDetectorError {
    FallacyDetectorError::config(format!("invalid fallacy reference ({source}): {detail}"))
}
