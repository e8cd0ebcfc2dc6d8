use crate::types::AirportRecord;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Airports per country, built once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryCountTable {
    counts: HashMap<String, u32>,
    skipped: usize,
}

impl CountryCountTable {
    /// Count records per country in a single pass.
    ///
    /// Records whose country is absent, empty or only whitespace are skipped
    /// and tallied in [`skipped`](Self::skipped).
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AirportRecord>,
    {
        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut skipped = 0;

        for record in records {
            match record.country.as_deref().map(str::trim) {
                Some(country) if !country.is_empty() => {
                    *counts.entry(country.to_string()).or_insert(0) += 1;
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!("Skipped {} airport records without a country", skipped);
        }
        debug!("Counted airports for {} countries", counts.len());

        Self { counts, skipped }
    }

    pub fn get(&self, country: &str) -> Option<u32> {
        self.counts.get(country).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Number of records that were counted under some country.
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Countries with the most airports, ties broken by name.
    pub fn top(&self, n: usize) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> = self.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{color_for, COLORS};

    fn records(countries: &[&str]) -> Vec<AirportRecord> {
        countries.iter().map(|c| AirportRecord::new(*c)).collect()
    }

    #[test]
    fn counts_per_country() {
        let table = CountryCountTable::from_records(&records(&["France", "France", "Spain"]));

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("France"), Some(2));
        assert_eq!(table.get("Spain"), Some(1));
        assert_eq!(table.get("Germany"), None);
        assert_eq!(color_for(table.get("France")), COLORS[0]);
        assert_eq!(color_for(table.get("Germany")), COLORS[0]);
    }

    #[test]
    fn skips_records_without_country() {
        let mut input = records(&["Chile", "", "  ", "Chile", "Peru"]);
        input.push(AirportRecord::missing());

        let table = CountryCountTable::from_records(&input);

        assert_eq!(table.skipped(), 3);
        assert_eq!(table.get(""), None);
        assert_eq!(table.total(), 3);
    }

    #[test]
    fn total_matches_non_empty_records() {
        let input = records(&["A", "B", "", "C", "A", "A", "B"]);
        let expected = input
            .iter()
            .filter(|r| r.country.as_deref().is_some_and(|c| !c.trim().is_empty()))
            .count() as u64;

        let table = CountryCountTable::from_records(&input);
        assert_eq!(table.total(), expected);
        assert_eq!(table.total() + table.skipped() as u64, input.len() as u64);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let input = records(&["Japan", "Japan", "Korea", "Japan"]);
        let first = CountryCountTable::from_records(&input);
        let second = CountryCountTable::from_records(&input);
        assert_eq!(first, second);
    }

    #[test]
    fn top_orders_by_count_then_name() {
        let table = CountryCountTable::from_records(&records(&[
            "Brazil", "Brazil", "Argentina", "Argentina", "Chile", "Brazil",
        ]));
        assert_eq!(
            table.top(2),
            vec![("Brazil", 3), ("Argentina", 2)]
        );
        assert_eq!(table.top(10).len(), 3);
    }
}
