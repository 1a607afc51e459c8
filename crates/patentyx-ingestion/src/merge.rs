//! Family-aware merge of provider records.
//!
//! Two passes:
//!   1. Identity merge: records sharing an identity key (doc number, else
//!      family id, else provider) are folded with [`merge_two_records`].
//!   2. Family overlay: the five list fields are unioned across every record
//!      of the same family and written back onto each merged record.
//!
//! Output keeps the first-seen order of identity keys. Running the merge on
//! its own output returns the same records.

use std::collections::{BTreeSet, HashMap};

use serde_json::{json, Map};

use crate::models::{is_present, RawRecord};

/// Merge two records describing the same document. `left` wins ties.
pub fn merge_two_records(left: RawRecord, right: RawRecord) -> RawRecord {
    let mut providers = BTreeSet::new();
    providers.insert(left.provider.clone());
    providers.insert(right.provider.clone());
    let mut source = Map::new();
    source.insert("providers".to_string(), json!(providers));

    RawRecord {
        doc_number: first_non_empty(left.doc_number, right.doc_number),
        jurisdiction: first_non_empty(left.jurisdiction, right.jurisdiction),
        kind_code: either(left.kind_code, right.kind_code),
        family_id: either(left.family_id, right.family_id),
        title: longer(left.title, right.title),
        abstract_text: longer(left.abstract_text, right.abstract_text),
        claims: either(left.claims, right.claims),
        description: either(left.description, right.description),
        filing_date: either(left.filing_date, right.filing_date),
        publication_date: either(left.publication_date, right.publication_date),
        grant_date: either(left.grant_date, right.grant_date),
        assignees: sorted_union(left.assignees, right.assignees),
        inventors: sorted_union(left.inventors, right.inventors),
        cpc_codes: sorted_union(left.cpc_codes, right.cpc_codes),
        ipc_codes: sorted_union(left.ipc_codes, right.ipc_codes),
        priority_numbers: sorted_union(left.priority_numbers, right.priority_numbers),
        source,
        provider: format!("{}+{}", left.provider, right.provider),
    }
}

fn first_non_empty(left: String, right: String) -> String {
    if left.is_empty() { right } else { left }
}

fn either(left: Option<String>, right: Option<String>) -> Option<String> {
    if is_present(&left) { left } else { right }
}

fn longer(left: Option<String>, right: Option<String>) -> Option<String> {
    let len = |v: &Option<String>| v.as_deref().map_or(0, |s| s.chars().count());
    if len(&left) >= len(&right) { left } else { right }
}

fn sorted_union(left: Vec<String>, right: Vec<String>) -> Vec<String> {
    left.into_iter().chain(right).collect::<BTreeSet<_>>().into_iter().collect()
}

// ── Family overlay ────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct FamilySets {
    assignees: BTreeSet<String>,
    inventors: BTreeSet<String>,
    cpc_codes: BTreeSet<String>,
    ipc_codes: BTreeSet<String>,
    priority_numbers: BTreeSet<String>,
}

impl FamilySets {
    fn absorb(&mut self, record: &RawRecord) {
        self.assignees.extend(record.assignees.iter().cloned());
        self.inventors.extend(record.inventors.iter().cloned());
        self.cpc_codes.extend(record.cpc_codes.iter().cloned());
        self.ipc_codes.extend(record.ipc_codes.iter().cloned());
        self.priority_numbers.extend(record.priority_numbers.iter().cloned());
    }

    fn apply(&self, record: &mut RawRecord) {
        let overlay = |own: &mut Vec<String>, family: &BTreeSet<String>| {
            let merged: BTreeSet<String> = own.drain(..).chain(family.iter().cloned()).collect();
            *own = merged.into_iter().collect();
        };
        overlay(&mut record.assignees, &self.assignees);
        overlay(&mut record.inventors, &self.inventors);
        overlay(&mut record.cpc_codes, &self.cpc_codes);
        overlay(&mut record.ipc_codes, &self.ipc_codes);
        overlay(&mut record.priority_numbers, &self.priority_numbers);
    }
}

/// Collapse duplicates and propagate family-level list fields.
pub fn merge_by_family(records: Vec<RawRecord>) -> Vec<RawRecord> {
    let mut merged: Vec<RawRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut families: HashMap<String, FamilySets> = HashMap::new();

    for record in records {
        families.entry(record.family_key()).or_default().absorb(&record);

        let key = record.identity_key();
        match index.get(&key) {
            Some(&i) => {
                let existing = std::mem::take(&mut merged[i]);
                merged[i] = merge_two_records(existing, record);
            }
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    // A merged record may carry a family id its raw parts did not agree on;
    // fold the merged records into their post-merge family as well.
    for record in &merged {
        families.entry(record.family_key()).or_default().absorb(record);
    }

    merged
        .into_iter()
        .map(|mut record| {
            if let Some(family) = families.get(&record.family_key()) {
                family.apply(&mut record);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(doc: &str, family: Option<&str>, provider: &str) -> RawRecord {
        RawRecord {
            doc_number: doc.to_string(),
            jurisdiction: "US".to_string(),
            family_id: family.map(String::from),
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_two_prefers_left_and_longer_text() {
        let mut left = rec("US1", None, "patentsview");
        left.title = Some("Short".into());
        left.abstract_text = Some("Same".into());
        left.claims = Some(String::new());
        left.assignees = vec!["Moderna".into()];

        let mut right = rec("US1", Some("FAM-1"), "epo_ops");
        right.title = Some("A much longer title".into());
        right.abstract_text = Some("Tied".into());
        right.claims = Some("1. A method".into());
        right.assignees = vec!["Moderna".into(), "Acme".into()];

        let m = merge_two_records(left, right);
        assert_eq!(m.title.as_deref(), Some("A much longer title"));
        assert_eq!(m.abstract_text.as_deref(), Some("Same"));
        assert_eq!(m.claims.as_deref(), Some("1. A method"));
        assert_eq!(m.family_id.as_deref(), Some("FAM-1"));
        assert_eq!(m.assignees, vec!["Acme", "Moderna"]);
        assert_eq!(m.provider, "patentsview+epo_ops");
        assert_eq!(m.source["providers"], json!(["epo_ops", "patentsview"]));
    }

    #[test]
    fn test_duplicates_collapse_in_first_seen_order() {
        let out = merge_by_family(vec![
            rec("US2", None, "patentsview"),
            rec("US1", None, "patentsview"),
            rec("US2", None, "wipo_patentscope"),
        ]);
        let docs: Vec<_> = out.iter().map(|r| r.doc_number.as_str()).collect();
        assert_eq!(docs, vec!["US2", "US1"]);
        assert_eq!(out[0].provider, "patentsview+wipo_patentscope");
    }

    #[test]
    fn test_family_propagation() {
        let mut a = rec("US1", Some("FAM-1"), "patentsview");
        a.assignees = vec!["Moderna".into()];
        let mut b = rec("EP1", Some("FAM-1"), "epo_ops");
        b.assignees = vec!["PeptiDream".into()];
        b.cpc_codes = vec!["C07K".into()];

        let out = merge_by_family(vec![a, b]);
        assert_eq!(out.len(), 2);
        for r in &out {
            assert_eq!(r.assignees, vec!["Moderna", "PeptiDream"]);
            assert_eq!(r.cpc_codes, vec!["C07K"]);
        }
    }

    #[test]
    fn test_overlay_only_touches_list_fields() {
        let mut a = rec("US1", Some("FAM-1"), "patentsview");
        a.title = Some("Title A".into());
        let mut b = rec("EP1", Some("FAM-1"), "epo_ops");
        b.title = Some("Title B, longer".into());
        b.inventors = vec!["C. Lee".into()];

        let out = merge_by_family(vec![a, b]);
        assert_eq!(out[0].title.as_deref(), Some("Title A"));
        assert_eq!(out[0].provider, "patentsview");
        assert_eq!(out[0].inventors, vec!["C. Lee"]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut a = rec("US1", None, "patentsview");
        a.assignees = vec!["Zeta".into()];
        // Same document, but this copy carries a family id the first lacks.
        let mut b = rec("US1", Some("FAM-9"), "epo_ops");
        b.inventors = vec!["B. Smith".into()];
        let mut c = rec("EP9", Some("FAM-9"), "epo_ops");
        c.cpc_codes = vec!["C12N".into(), "C07K".into()];
        let d = rec("", None, "wipo_patentscope");

        let once = merge_by_family(vec![a, b, c, d]);
        let twice = merge_by_family(once.clone());
        assert_eq!(once, twice);

        let us1 = &once[0];
        assert_eq!(us1.family_id.as_deref(), Some("FAM-9"));
        assert_eq!(us1.cpc_codes, vec!["C07K", "C12N"]);
        let ep9 = &once[1];
        assert_eq!(ep9.assignees, vec!["Zeta"]);
        assert_eq!(once[2].identity_key(), "unknown-wipo_patentscope");
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_by_family(vec![]).is_empty());
    }
}
