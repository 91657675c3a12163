// src/checker/dedupe.rs
// =============================================================================
// This module groups occurrences by URL.
//
// Each unique URL is probed exactly once, however many times it appears.
// Unless duplicates are allowed, a URL that appears more than once is also
// reported as a duplicate, with every place it appeared.
// =============================================================================

use std::collections::HashMap;

use super::extract::Occurrence;

/// Occurrences grouped by normalized URL, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dedup {
    /// One group per unique URL
    pub groups: Vec<UrlGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGroup {
    pub url: String,
    /// Every occurrence of the URL, first one first
    pub occurrences: Vec<Occurrence>,
    /// Reported in the duplicates bucket
    pub duplicate: bool,
}

impl Dedup {
    /// The URLs to probe, one per group, in first-seen order.
    pub fn unique_urls(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.url.clone()).collect()
    }

    /// Groups flagged as duplicates.
    pub fn duplicates(&self) -> impl Iterator<Item = &UrlGroup> {
        self.groups.iter().filter(|g| g.duplicate)
    }
}

// Partitions occurrences by URL
//
// Parameters:
//   occurrences: everything the extractor found
//   allow_dupe: when true no group is ever flagged as duplicate
pub fn dedupe(occurrences: &[Occurrence], allow_dupe: bool) -> Dedup {
    let mut groups: Vec<UrlGroup> = Vec::new();
    // url -> index into groups
    let mut index: HashMap<&str, usize> = HashMap::new();

    for occurrence in occurrences {
        match index.get(occurrence.url.as_str()) {
            Some(&i) => groups[i].occurrences.push(occurrence.clone()),
            None => {
                index.insert(occurrence.url.as_str(), groups.len());
                groups.push(UrlGroup {
                    url: occurrence.url.clone(),
                    occurrences: vec![occurrence.clone()],
                    duplicate: false,
                });
            }
        }
    }

    if !allow_dupe {
        for group in &mut groups {
            group.duplicate = group.occurrences.len() > 1;
        }
    }

    Dedup { groups }
}
