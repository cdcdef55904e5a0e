//! Query-parameter driven page/search state and the pure filter+paginate
//! composition used when the whole list is held in memory.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const SEARCH_PARAM: &str = "search";
pub const PAGE_PARAM: &str = "page";

/// Anything the search box can filter on.
pub trait Named {
    fn name(&self) -> &str;
}

/// Ordered query-string pairs. Unknown keys are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self {
            pairs: form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Replaces the first occurrence in place and drops duplicates, or appends.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| k == key) {
            Some(index) => {
                self.pairs[index].1 = value;
                let mut seen = false;
                self.pairs.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[must_use]
    pub fn to_query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

/// Page and search derived from the query, plus the remembered search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationSearchState {
    query: QueryParams,
    persisted_term: String,
}

impl PaginationSearchState {
    #[must_use]
    pub fn new(query: QueryParams, persisted_term: impl Into<String>) -> Self {
        Self {
            query,
            persisted_term: persisted_term.into(),
        }
    }

    #[must_use]
    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    #[must_use]
    pub fn persisted_term(&self) -> &str {
        &self.persisted_term
    }

    /// Router navigation from the shell (back/forward, deep link).
    pub fn sync_query(&mut self, query: QueryParams) {
        self.query = query;
    }

    pub fn restore_persisted_term(&mut self, term: impl Into<String>) {
        self.persisted_term = term.into();
    }

    /// The `search` parameter if the key is present, otherwise empty. The
    /// persisted term never leaks in here.
    #[must_use]
    pub fn effective_search_term(&self) -> &str {
        self.query.get(SEARCH_PARAM).unwrap_or("")
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        parse_page(self.query.get(PAGE_PARAM))
    }

    /// Returns the trimmed term, which the caller persists even when empty.
    pub fn handle_search(&mut self, term: &str) -> String {
        let trimmed = term.trim().to_string();
        if trimmed.is_empty() {
            self.query.remove(SEARCH_PARAM);
        } else {
            self.query.set(SEARCH_PARAM, trimmed.clone());
        }
        self.query.set(PAGE_PARAM, "1");
        self.persisted_term.clone_from(&trimmed);
        trimmed
    }

    pub fn handle_page_change(&mut self, page: usize) {
        self.query.set(PAGE_PARAM, page.to_string());
    }
}

/// `max(1, n)` where `n` is the leading integer of `raw`, so `3abc` is 3 and
/// `2.5` is 2. Missing, zero, negative or digit-less values give 1.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> usize {
    let Some(value) = raw.map(str::trim_start) else {
        return 1;
    };
    let (negative, rest) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if len == 0 || negative {
        return 1;
    }
    rest.bytes()
        .take(len)
        .fold(0usize, |acc, digit| {
            acc.saturating_mul(10).saturating_add(usize::from(digit - b'0'))
        })
        .max(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    /// Filtered length before slicing.
    pub total: usize,
}

/// Case-insensitive substring filter on `name`, then a 1-based page slice.
#[must_use]
pub fn compose<T: Named + Clone>(
    full_list: &[T],
    search_term: &str,
    page: usize,
    page_size: usize,
) -> PageSlice<T> {
    let filtered: Vec<&T> = if search_term.is_empty() {
        full_list.iter().collect()
    } else {
        let needle = search_term.to_lowercase();
        full_list
            .iter()
            .filter(|item| item.name().to_lowercase().contains(&needle))
            .collect()
    };

    let total = filtered.len();
    let start = page.max(1).saturating_sub(1).saturating_mul(page_size);
    let items = if start >= total {
        Vec::new()
    } else {
        let end = start.saturating_add(page_size).min(total);
        filtered[start..end].iter().map(|item| (*item).clone()).collect()
    };

    PageSlice { items, total }
}

/// `ceil(total / page_size)`; an empty result is zero pages, not one.
#[must_use]
pub const fn total_pages(total: usize, page_size: usize) -> usize {
    if total == 0 || page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

#[must_use]
pub const fn page_offset(page: usize, page_size: usize) -> usize {
    let page = if page == 0 { 1 } else { page };
    (page - 1).saturating_mul(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListItem;
    use proptest::prelude::*;

    fn names(items: &[ListItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    fn list(names: &[&str]) -> Vec<ListItem> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| ListItem::new(*n, format!("https://pokeapi.co/api/v2/pokemon/{}/", i + 1)))
            .collect()
    }

    mod query_tests {
        use super::*;

        #[test]
        fn test_parse_and_serialize_keep_order() {
            let query = QueryParams::parse("?tab=list&search=pika%20chu&page=2");
            assert_eq!(query.get("search"), Some("pika chu"));
            assert_eq!(query.get("page"), Some("2"));
            assert_eq!(query.to_query_string(), "tab=list&search=pika+chu&page=2");
        }

        #[test]
        fn test_set_replaces_in_place_and_dedupes() {
            let mut query = QueryParams::parse("page=1&x=y&page=7");
            query.set("page", "3");
            assert_eq!(query.to_query_string(), "page=3&x=y");
        }

        #[test]
        fn test_remove_drops_all_occurrences() {
            let mut query = QueryParams::parse("search=a&page=1&search=b");
            query.remove("search");
            assert!(!query.contains("search"));
            assert_eq!(query.to_query_string(), "page=1");
        }
    }

    mod state_tests {
        use super::*;

        fn state(query: &str) -> PaginationSearchState {
            PaginationSearchState::new(QueryParams::parse(query), "remembered")
        }

        #[test]
        fn test_effective_term_ignores_persisted_fallback() {
            assert_eq!(state("").effective_search_term(), "");
            assert_eq!(state("search=").effective_search_term(), "");
            assert_eq!(state("search=char").effective_search_term(), "char");
        }

        #[test]
        fn test_current_page_clamps() {
            assert_eq!(state("").current_page(), 1);
            assert_eq!(state("page=0").current_page(), 1);
            assert_eq!(state("page=abc").current_page(), 1);
            assert_eq!(state("page=-4").current_page(), 1);
            assert_eq!(state("page=12").current_page(), 12);
            assert_eq!(state("page=%2B7").current_page(), 7);
        }

        #[test]
        fn test_current_page_reads_leading_digits() {
            assert_eq!(state("page=3abc").current_page(), 3);
            assert_eq!(state("page=2.5").current_page(), 2);
            assert_eq!(state("page=12px").current_page(), 12);
            assert_eq!(state("page=%204").current_page(), 4);
            assert_eq!(state("page=-0").current_page(), 1);
            assert_eq!(state("page=px12").current_page(), 1);
        }

        #[test]
        fn test_current_page_saturates_on_overflow() {
            let huge = format!("page={}", "9".repeat(40));
            assert_eq!(state(&huge).current_page(), usize::MAX);
        }

        #[test]
        fn test_handle_search_trims_and_resets_page() {
            let mut padded = state("page=4&tab=x");
            let mut plain = state("page=4&tab=x");

            assert_eq!(padded.handle_search("  Bulba  "), "Bulba");
            plain.handle_search("Bulba");

            assert_eq!(padded.query(), plain.query());
            assert_eq!(padded.effective_search_term(), "Bulba");
            assert_eq!(padded.current_page(), 1);
            assert_eq!(padded.query().get("tab"), Some("x"));
            assert_eq!(padded.persisted_term(), "Bulba");
        }

        #[test]
        fn test_empty_search_removes_param_and_persists_empty() {
            let mut s = state("search=pika&page=3");
            assert_eq!(s.handle_search("   "), "");
            assert!(!s.query().contains(SEARCH_PARAM));
            assert_eq!(s.query().get(PAGE_PARAM), Some("1"));
            assert_eq!(s.persisted_term(), "");
        }

        #[test]
        fn test_page_change_preserves_other_params() {
            let mut s = state("search=pika&page=1&sort=name");
            s.handle_page_change(5);
            assert_eq!(s.query().to_query_string(), "search=pika&page=5&sort=name");
            assert_eq!(s.current_page(), 5);
        }
    }

    mod compose_tests {
        use super::*;

        #[test]
        fn test_filter_is_case_insensitive_substring() {
            let all = list(&["Bulbasaur", "Ivysaur", "Charmander", "pikachu"]);
            let slice = compose(&all, "SAUR", 1, 10);
            assert_eq!(names(&slice.items), vec!["Bulbasaur", "Ivysaur"]);
            assert_eq!(slice.total, 2);
        }

        #[test]
        fn test_slices_requested_page() {
            let all = list(&["a", "b", "c", "d", "e"]);
            assert_eq!(names(&compose(&all, "", 2, 2).items), vec!["c", "d"]);
            assert_eq!(names(&compose(&all, "", 3, 2).items), vec!["e"]);
            assert!(compose(&all, "", 4, 2).items.is_empty());
            assert_eq!(compose(&all, "", 4, 2).total, 5);
        }

        #[test]
        fn test_zero_page_size_yields_nothing() {
            let all = list(&["a", "b"]);
            let slice = compose(&all, "", 1, 0);
            assert!(slice.items.is_empty());
            assert_eq!(slice.total, 2);
            assert_eq!(total_pages(slice.total, 0), 0);
        }

        #[test]
        fn test_total_pages_convention() {
            assert_eq!(total_pages(0, 20), 0);
            assert_eq!(total_pages(1, 20), 1);
            assert_eq!(total_pages(40, 20), 2);
            assert_eq!(total_pages(41, 20), 3);
        }

        #[test]
        fn test_page_offset() {
            assert_eq!(page_offset(1, 20), 0);
            assert_eq!(page_offset(3, 20), 40);
            assert_eq!(page_offset(0, 20), 0);
        }
    }

    fn arb_list() -> impl Strategy<Value = Vec<ListItem>> {
        prop::collection::vec("[a-zA-Z]{1,8}", 0..60).prop_map(|names| {
            names
                .into_iter()
                .enumerate()
                .map(|(i, n)| ListItem::new(n, format!("https://pokeapi.co/api/v2/pokemon/{}/", i + 1)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_empty_term_is_noop_filter(all in arb_list(), page in 1usize..10, size in 1usize..15) {
            prop_assert_eq!(compose(&all, "", page, size).total, all.len());
        }

        #[test]
        fn prop_every_item_matches_term(all in arb_list(), term in "[a-zA-Z]{1,3}", page in 1usize..5, size in 1usize..15) {
            let needle = term.to_lowercase();
            for item in compose(&all, &term, page, size).items {
                prop_assert!(item.name.to_lowercase().contains(&needle));
            }
        }

        #[test]
        fn prop_pages_concatenate_to_filtered_list(all in arb_list(), term in "[a-z]{0,2}", size in 1usize..15) {
            let first = compose(&all, &term, 1, size);
            let pages = total_pages(first.total, size);
            let mut joined = Vec::new();
            for page in 1..=pages {
                joined.extend(compose(&all, &term, page, size).items);
            }
            let expected = compose(&all, &term, 1, all.len().max(1)).items;
            prop_assert_eq!(joined, expected);
        }

        #[test]
        fn prop_compose_is_idempotent(all in arb_list(), term in "[a-z]{0,2}", page in 1usize..6, size in 1usize..15) {
            prop_assert_eq!(compose(&all, &term, page, size), compose(&all, &term, page, size));
        }
    }
}
