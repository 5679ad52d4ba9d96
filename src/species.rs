use std::path::Path;

use anyhow::{bail, Context, Result};

/// Static common ↔ scientific name lookup.
///
/// Loaded from two line-aligned lists: line N of the common list names the
/// same bird as line N of the scientific list.
#[derive(Debug, Clone, Default)]
pub struct SpeciesTable {
    common: Vec<String>,
    scientific: Vec<String>,
}

impl SpeciesTable {
    pub fn from_pairs<I, C, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (C, S)>,
        C: Into<String>,
        S: Into<String>,
    {
        let (common, scientific) = pairs
            .into_iter()
            .map(|(c, s)| (c.into(), s.into()))
            .unzip();
        Self { common, scientific }
    }

    /// Parse two newline-separated lists. Blank lines are ignored.
    pub fn parse(common: &str, scientific: &str) -> Result<Self> {
        let common: Vec<String> = lines(common);
        let scientific: Vec<String> = lines(scientific);

        if common.len() != scientific.len() {
            bail!(
                "species lists differ in length: {} common names, {} scientific names",
                common.len(),
                scientific.len()
            );
        }

        Ok(Self { common, scientific })
    }

    pub fn load(common_path: &Path, scientific_path: &Path) -> Result<Self> {
        let common = std::fs::read_to_string(common_path)
            .with_context(|| format!("reading {}", common_path.display()))?;
        let scientific = std::fs::read_to_string(scientific_path)
            .with_context(|| format!("reading {}", scientific_path.display()))?;

        let table = Self::parse(&common, &scientific)?;
        tracing::info!(
            "loaded {} species from {}",
            table.len(),
            common_path.display()
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.common.len()
    }

    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
    }

    pub fn contains_common(&self, name: &str) -> bool {
        self.common.iter().any(|c| c == name)
    }

    pub fn scientific_for(&self, common: &str) -> Option<&str> {
        self.common
            .iter()
            .position(|c| c == common)
            .map(|i| self.scientific[i].as_str())
    }

    pub fn common_for(&self, scientific: &str) -> Option<&str> {
        self.scientific
            .iter()
            .position(|s| s == scientific)
            .map(|i| self.common[i].as_str())
    }

    /// Scientific name for a common name, or the input unchanged.
    pub fn to_scientific<'a>(&'a self, name: &'a str) -> &'a str {
        self.scientific_for(name).unwrap_or(name)
    }

    pub fn scientific_names(&self) -> &[String] {
        &self.scientific
    }
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
