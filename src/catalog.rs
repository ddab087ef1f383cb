use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::textutil::looks_like_technique_id;

/// Joins two adjacent descriptions into one combined utterance.
pub const DEFAULT_CONNECTOR: &str = " . This leads to: ";

const BUILTIN: [(&str, &str); 3] = [
    (
        "T1566",
        "Attackers leveraged spearphishing emails with malicious links to gain access to the system",
    ),
    (
        "T1548",
        "Attackers modifies the tty_tickets line in the sudoers file to gain root access",
    ),
    (
        "T1048",
        "Exfiltration over standard encrypted web protocols to disguise the exchanges as normal network traffic",
    ),
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse catalog {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("catalog entry #{position} has an empty id")]
    EmptyId { position: usize },
    #[error("technique {id} has an empty description")]
    EmptyDescription { id: String },
    #[error("duplicate technique id: {id}")]
    DuplicateId { id: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
    pub description: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct CatalogFile {
    #[serde(default)]
    techniques: Vec<Technique>,
}

/// Ordered technique-id → description mapping. Order defines adjacency.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TechniqueCatalog {
    entries: Vec<Technique>,
}

impl TechniqueCatalog {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN
                .iter()
                .map(|(id, description)| Technique {
                    id: (*id).to_string(),
                    description: (*description).to_string(),
                })
                .collect(),
        }
    }

    /// Builds a catalog from `(id, description)` pairs, keeping their order.
    pub fn from_entries<I, K, V>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(id, description)| Technique {
                id: id.into(),
                description: description.into(),
            })
            .collect();
        Self::validated(entries)
    }

    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text).map_err(|err| CatalogError::Parse {
            path: origin.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::validated(file.techniques)
    }

    pub fn from_toml_path(path: &Path) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        let file = CatalogFile {
            techniques: self.entries.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    fn validated(entries: Vec<Technique>) -> Result<Self, CatalogError> {
        let mut seen: HashSet<&str> = HashSet::new();
        for (position, t) in entries.iter().enumerate() {
            if t.id.trim().is_empty() {
                return Err(CatalogError::EmptyId { position });
            }
            if t.description.trim().is_empty() {
                return Err(CatalogError::EmptyDescription { id: t.id.clone() });
            }
            if !seen.insert(t.id.as_str()) {
                return Err(CatalogError::DuplicateId { id: t.id.clone() });
            }
            if !looks_like_technique_id(&t.id) {
                tracing::warn!(id = %t.id, "technique id does not look like an ATT&CK id");
            }
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Technique] {
        &self.entries
    }

    /// Lazily yields `len() - 1` combined utterances, one per adjacent pair.
    pub fn pairs<'a>(&'a self, connector: &'a str) -> UtterancePairs<'a> {
        UtterancePairs {
            windows: self.entries.windows(2).enumerate(),
            connector,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UtterancePair {
    pub index: usize,
    pub first: String,
    pub second: String,
    pub utterance: String,
}

pub struct UtterancePairs<'a> {
    windows: std::iter::Enumerate<std::slice::Windows<'a, Technique>>,
    connector: &'a str,
}

impl Iterator for UtterancePairs<'_> {
    type Item = UtterancePair;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, w) = self.windows.next()?;
        let (a, b) = (&w[0], &w[1]);
        let mut utterance =
            String::with_capacity(a.description.len() + self.connector.len() + b.description.len());
        utterance.push_str(&a.description);
        utterance.push_str(self.connector);
        utterance.push_str(&b.description);
        Some(UtterancePair {
            index,
            first: a.id.clone(),
            second: b.id.clone(),
            utterance,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

impl ExactSizeIterator for UtterancePairs<'_> {}
