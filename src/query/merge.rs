//! Merge fetched pages into one ordered, deduplicated collection.
//!
//! Items can shift rank between page requests when the live catalog mutates,
//! so consecutive pages may overlap. Identity (`id`), not content, is the
//! dedup key: a duplicate keeps its first position in the output but takes
//! the most-recently-fetched attributes (last-seen-wins).

use std::collections::HashMap;

use crate::wire::{CatalogItem, Page};

/// Combine pages in arrival order, collapsing duplicate ids.
///
/// Output length is at most the sum of the input page lengths, and output
/// order is stable with respect to the scan's sort key for items that appear
/// in only one page.
pub fn merge_pages(pages: &[Page]) -> Vec<CatalogItem> {
    let mut merged: Vec<CatalogItem> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    for page in pages {
        for item in &page.items {
            match position.get(&item.id) {
                Some(&at) => merged[at] = item.clone(),
                None => {
                    position.insert(item.id.clone(), merged.len());
                    merged.push(item.clone());
                }
            }
        }
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::item;

    fn page(index: u32, items: Vec<CatalogItem>) -> Page {
        Page {
            index,
            items,
            more: true,
            count: None,
        }
    }

    #[test]
    fn disjoint_pages_concatenate_in_order() {
        let pages = vec![
            page(1, vec![item("v1", 100), item("v2", 90)]),
            page(2, vec![item("v3", 80), item("v4", 70)]),
        ];
        let merged = merge_pages(&pages);
        let ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["v1", "v2", "v3", "v4"]);
    }

    #[test]
    fn overlap_dedups_and_keeps_later_content() {
        // v2 shifted rank between requests and reappears on page 2 with a
        // fresher votecount.
        let mut newer = item("v2", 93);
        newer.title = Some("retitled".to_string());
        let pages = vec![
            page(1, vec![item("v1", 100), item("v2", 90)]),
            page(2, vec![newer.clone(), item("v3", 80)]),
        ];
        let merged = merge_pages(&pages);
        assert_eq!(merged.len(), 3); // 2 + 2 - 1 overlap
        assert_eq!(merged[1], newer);
        let ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["v1", "v2", "v3"]);
    }

    #[test]
    fn empty_input_merges_to_empty() {
        assert!(merge_pages(&[]).is_empty());
    }

    #[test]
    fn merge_is_idempotent_over_duplicate_pages() {
        let p = page(1, vec![item("v1", 10), item("v2", 9)]);
        let merged = merge_pages(&[p.clone(), p]);
        assert_eq!(merged.len(), 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_pages() -> impl Strategy<Value = Vec<Page>> {
            proptest::collection::vec(
                proptest::collection::vec((0u32..50, 0u64..10_000), 0..20),
                0..6,
            )
            .prop_map(|raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(i, items)| Page {
                        index: i as u32 + 1,
                        items: items
                            .into_iter()
                            .map(|(id, votes)| item(&format!("v{id}"), votes))
                            .collect(),
                        more: true,
                        count: None,
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn output_never_longer_than_input(pages in arb_pages()) {
                let total: usize = pages.iter().map(|p| p.items.len()).sum();
                prop_assert!(merge_pages(&pages).len() <= total);
            }

            #[test]
            fn output_ids_are_unique(pages in arb_pages()) {
                let merged = merge_pages(&pages);
                let mut ids: Vec<&str> = merged.iter().map(|i| i.id.as_str()).collect();
                ids.sort_unstable();
                ids.dedup();
                prop_assert_eq!(ids.len(), merged.len());
            }

            #[test]
            fn remerging_the_merged_set_is_identity(pages in arb_pages()) {
                let merged = merge_pages(&pages);
                let again = merge_pages(&[Page {
                    index: 1,
                    items: merged.clone(),
                    more: false,
                    count: None,
                }]);
                prop_assert_eq!(again, merged);
            }
        }
    }
}
