//! Named analysis results handed to reporting and charting consumers.
//!
//! [`AnalysisResults`] is filled explicitly by the caller from the values
//! the [`Analyzer`](crate::analysis::Analyzer) queries return. Inserting a
//! key replaces only that key; nothing is ever cleared.

use std::{collections::BTreeMap, fmt};

use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{analysis::Summary, frame::Table, stats::DisparityStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResultKey {
    UnderservedRegions,
    RuralUrbanGap,
    InequalityIndex,
    RegionalDisparities,
    Summary,
}

impl ResultKey {
    pub const ALL: [ResultKey; 5] = [
        ResultKey::UnderservedRegions,
        ResultKey::RuralUrbanGap,
        ResultKey::InequalityIndex,
        ResultKey::RegionalDisparities,
        ResultKey::Summary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultKey::UnderservedRegions => "underserved_regions",
            ResultKey::RuralUrbanGap => "rural_urban_gap",
            ResultKey::InequalityIndex => "inequality_index",
            ResultKey::RegionalDisparities => "regional_disparities",
            ResultKey::Summary => "summary",
        }
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisEntry {
    Table(Table),
    Disparities(BTreeMap<String, DisparityStats>),
    Summary(Summary),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisResults {
    entries: BTreeMap<ResultKey, AnalysisEntry>,
}

impl AnalysisResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_underserved_regions(&mut self, table: Table) -> &mut Self {
        self.insert(ResultKey::UnderservedRegions, AnalysisEntry::Table(table))
    }

    pub fn insert_rural_urban_gap(&mut self, table: Table) -> &mut Self {
        self.insert(ResultKey::RuralUrbanGap, AnalysisEntry::Table(table))
    }

    pub fn insert_inequality_index(&mut self, table: Table) -> &mut Self {
        self.insert(ResultKey::InequalityIndex, AnalysisEntry::Table(table))
    }

    pub fn insert_regional_disparities(
        &mut self,
        disparities: BTreeMap<String, DisparityStats>,
    ) -> &mut Self {
        self.insert(
            ResultKey::RegionalDisparities,
            AnalysisEntry::Disparities(disparities),
        )
    }

    pub fn insert_summary(&mut self, summary: Summary) -> &mut Self {
        self.insert(ResultKey::Summary, AnalysisEntry::Summary(summary))
    }

    fn insert(&mut self, key: ResultKey, entry: AnalysisEntry) -> &mut Self {
        self.entries.insert(key, entry);
        self
    }

    pub fn get(&self, key: ResultKey) -> Option<&AnalysisEntry> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: ResultKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = ResultKey> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn table(&self, key: ResultKey) -> Option<&Table> {
        match self.entries.get(&key)? {
            AnalysisEntry::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self.entries.get(&ResultKey::Summary)? {
            AnalysisEntry::Summary(summary) => Some(summary),
            _ => None,
        }
    }

    pub fn disparities(&self) -> Option<&BTreeMap<String, DisparityStats>> {
        match self.entries.get(&ResultKey::RegionalDisparities)? {
            AnalysisEntry::Disparities(disparities) => Some(disparities),
            _ => None,
        }
    }
}

impl Serialize for AnalysisResults {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, entry) in &self.entries {
            map.serialize_entry(key.as_str(), entry)?;
        }
        map.end()
    }
}
