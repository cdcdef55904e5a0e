//! Decoding of upstream list/detail responses, the id-keyed detail cache and
//! request sequencing for list fetches.

use lru::LruCache;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

use crate::capabilities::{HttpError, HttpResponse};
use crate::model::{parse_trailing_id, DetailItem, ListItem, Stat};

/// One page of the upstream list plus the upstream total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub results: Vec<ListItem>,
    pub total: usize,
}

#[derive(Deserialize)]
struct RawListPage {
    count: usize,
    results: Vec<ListItem>,
}

#[derive(Deserialize)]
struct RawDetail {
    id: Option<u32>,
    name: String,
    #[serde(default)]
    sprites: RawSprites,
    #[serde(default)]
    stats: Vec<RawStat>,
    #[serde(default)]
    types: Vec<RawType>,
}

#[derive(Deserialize, Default)]
struct RawSprites {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct RawStat {
    base_stat: u32,
    stat: NamedRef,
}

#[derive(Deserialize)]
struct RawType {
    #[serde(rename = "type")]
    kind: NamedRef,
}

#[derive(Deserialize)]
struct NamedRef {
    name: String,
}

/// Status check then decode of a list reply.
pub fn parse_list_page(response: HttpResponse) -> Result<ListPage, HttpError> {
    let raw: RawListPage = response.error_for_status()?.json()?;
    Ok(ListPage {
        results: raw.results,
        total: raw.count,
    })
}

/// Status check then projection of a detail reply. A missing `id` falls back
/// to the trailing segment of the request URL.
pub fn parse_detail(response: HttpResponse, request_url: &str) -> Result<DetailItem, HttpError> {
    let raw: RawDetail = response.error_for_status()?.json()?;
    let id = raw
        .id
        .or_else(|| parse_trailing_id(request_url))
        .ok_or_else(|| HttpError::InvalidResponse {
            reason: format!("detail for '{}' has no id", raw.name),
        })?;

    Ok(DetailItem {
        id,
        name: raw.name,
        image_url: raw.sprites.front_default,
        stats: raw
            .stats
            .into_iter()
            .map(|s| Stat {
                name: s.stat.name,
                value: s.base_stat,
            })
            .collect(),
        types: raw.types.into_iter().map(|t| t.kind.name).collect(),
    })
}

/// Cache key for a detail request: trimmed, lowercase, non-empty.
#[must_use]
pub fn normalize_key(id_or_name: &str) -> Option<String> {
    let key = id_or_name.trim().to_lowercase();
    (!key.is_empty()).then_some(key)
}

/// Memoised details by normalised key. Unbounded unless a capacity is set,
/// in which case the least recently used entry is evicted.
///
/// A detail stored under a name is also reachable by its numeric id through
/// an alias that does not count against the capacity.
pub struct DetailCache {
    entries: LruCache<String, DetailItem>,
    aliases: HashMap<String, String>,
}

impl DetailCache {
    #[must_use]
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        let entries = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries,
            aliases: HashMap::new(),
        }
    }

    fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        if self.entries.contains(key) {
            key
        } else {
            self.aliases.get(key).map_or(key, String::as_str)
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&DetailItem> {
        let target = self.resolve(key).to_owned();
        self.entries.get(&target)
    }

    #[must_use]
    pub fn peek(&self, key: &str) -> Option<&DetailItem> {
        self.entries.peek(self.resolve(key))
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(self.resolve(key))
    }

    /// Last write wins.
    pub fn insert(&mut self, key: String, item: DetailItem) {
        let id_key = item.id.to_string();
        self.aliases.remove(&key);
        if id_key != key {
            self.aliases.insert(id_key, key.clone());
        }
        if let Some((evicted, old)) = self.entries.push(key.clone(), item) {
            if evicted != key {
                self.forget_alias(&old.id.to_string(), &evicted);
            }
        }
    }

    fn forget_alias(&mut self, id_key: &str, target: &str) {
        if self.aliases.get(id_key).is_some_and(|t| t == target) {
            self.aliases.remove(id_key);
        }
    }

    pub fn resize(&mut self, capacity: Option<usize>) {
        match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => self.entries.resize(cap),
            None => {
                if let Some(unbounded) = NonZeroUsize::new(usize::MAX) {
                    self.entries.resize(unbounded);
                }
            }
        }
        let entries = &self.entries;
        self.aliases.retain(|_, target| entries.contains(target.as_str()));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.aliases.clear();
    }

    /// Number of stored details; aliases are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DetailCache {
    fn default() -> Self {
        Self::with_capacity(None)
    }
}

impl fmt::Debug for DetailCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetailCache")
            .field("len", &self.entries.len())
            .field("aliases", &self.aliases.len())
            .field("cap", &self.entries.cap())
            .finish()
    }
}

/// Monotonic tag for list requests; only the latest one may land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestSeq {
    latest: u64,
}

impl RequestSeq {
    pub fn next(&mut self) -> u64 {
        self.latest = self.latest.wrapping_add(1);
        self.latest
    }

    #[must_use]
    pub fn latest(&self) -> u64 {
        self.latest
    }

    #[must_use]
    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pikachu_json() -> serde_json::Value {
        json!({
            "id": 25,
            "name": "pikachu",
            "sprites": { "front_default": "https://img/25.png", "back_default": null },
            "stats": [
                { "base_stat": 35, "effort": 0, "stat": { "name": "hp", "url": "u" } },
                { "base_stat": 55, "effort": 0, "stat": { "name": "attack", "url": "u" } }
            ],
            "types": [ { "slot": 1, "type": { "name": "electric", "url": "u" } } ],
            "height": 4
        })
    }

    fn item(id: u32, name: &str) -> DetailItem {
        DetailItem {
            id,
            name: name.into(),
            image_url: None,
            stats: Vec::new(),
            types: Vec::new(),
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn test_parse_list_page() {
            let body = json!({
                "count": 1302,
                "next": "https://pokeapi.co/api/v2/pokemon?offset=20&limit=20",
                "previous": null,
                "results": [
                    { "name": "bulbasaur", "url": "https://pokeapi.co/api/v2/pokemon/1/" },
                    { "name": "ivysaur", "url": "https://pokeapi.co/api/v2/pokemon/2/" }
                ]
            });
            let page = parse_list_page(HttpResponse::json_body(200, &body)).unwrap();
            assert_eq!(page.total, 1302);
            assert_eq!(page.results.len(), 2);
            assert_eq!(page.results[1].id(), Some(2));
        }

        #[test]
        fn test_list_error_uses_body_message() {
            let response = HttpResponse::json_body(500, &json!({ "message": "db down" }));
            let err = parse_list_page(response).unwrap_err();
            assert_eq!(
                err,
                HttpError::Status {
                    status: 500,
                    message: "db down".into()
                }
            );
        }

        #[test]
        fn test_parse_detail_projection() {
            let detail = parse_detail(
                HttpResponse::json_body(200, &pikachu_json()),
                "https://pokeapi.co/api/v2/pokemon/pikachu",
            )
            .unwrap();
            assert_eq!(detail.id, 25);
            assert_eq!(detail.image_url.as_deref(), Some("https://img/25.png"));
            assert_eq!(
                detail.stats,
                vec![
                    Stat { name: "hp".into(), value: 35 },
                    Stat { name: "attack".into(), value: 55 }
                ]
            );
            assert_eq!(detail.types, vec!["electric".to_string()]);
        }

        #[test]
        fn test_detail_id_falls_back_to_url() {
            let body = json!({ "name": "mew" });
            let detail =
                parse_detail(HttpResponse::json_body(200, &body), "https://x/pokemon/151").unwrap();
            assert_eq!(detail.id, 151);
            assert!(detail.stats.is_empty());
            assert_eq!(detail.image_url, None);
        }

        #[test]
        fn test_detail_without_any_id_is_invalid() {
            let body = json!({ "name": "mew" });
            let err =
                parse_detail(HttpResponse::json_body(200, &body), "https://x/pokemon/mew").unwrap_err();
            assert!(matches!(err, HttpError::InvalidResponse { .. }));
        }

        #[test]
        fn test_detail_not_found_plain_text() {
            let response = HttpResponse::new(404, b"Not Found".to_vec());
            let err = parse_detail(response, "https://x/pokemon/nope").unwrap_err();
            assert_eq!(err.to_string(), "HTTP error! Status: 404");
        }
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn test_normalize_key() {
            assert_eq!(normalize_key("  Pikachu "), Some("pikachu".into()));
            assert_eq!(normalize_key("25"), Some("25".into()));
            assert_eq!(normalize_key("   "), None);
        }

        #[test]
        fn test_insert_aliases_numeric_id() {
            let mut cache = DetailCache::default();
            cache.insert("pikachu".into(), item(25, "pikachu"));
            assert!(cache.contains("pikachu"));
            assert!(cache.contains("25"));
            assert_eq!(cache.peek("25").map(|d| d.id), Some(25));
            assert_eq!(cache.len(), 1);

            cache.insert("25".into(), item(25, "pikachu"));
            assert_eq!(cache.len(), 2);
        }

        #[test]
        fn test_aliases_do_not_use_capacity() {
            let mut cache = DetailCache::with_capacity(Some(2));
            cache.insert("bulbasaur".into(), item(1, "bulbasaur"));
            cache.insert("ivysaur".into(), item(2, "ivysaur"));

            assert_eq!(cache.len(), 2);
            for key in ["bulbasaur", "1", "ivysaur", "2"] {
                assert!(cache.contains(key), "{key} should be cached");
            }
        }

        #[test]
        fn test_evicted_entry_drops_its_alias() {
            let mut cache = DetailCache::with_capacity(Some(1));
            cache.insert("bulbasaur".into(), item(1, "bulbasaur"));
            cache.insert("ivysaur".into(), item(2, "ivysaur"));

            assert!(!cache.contains("bulbasaur"));
            assert!(!cache.contains("1"));
            assert!(cache.get("2").is_some());

            cache.resize(Some(1));
            cache.clear();
            assert!(!cache.contains("2"));
        }

        #[test]
        fn test_last_write_wins() {
            let mut cache = DetailCache::default();
            cache.insert("1".into(), item(1, "old"));
            cache.insert("1".into(), item(1, "new"));
            assert_eq!(cache.peek("1").map(|d| d.name.as_str()), Some("new"));
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn test_bounded_cache_evicts_lru() {
            let mut cache = DetailCache::with_capacity(Some(2));
            cache.insert("1".into(), item(1, "a"));
            cache.insert("2".into(), item(2, "b"));
            assert!(cache.get("1").is_some());
            cache.insert("3".into(), item(3, "c"));
            assert!(cache.contains("1"));
            assert!(!cache.contains("2"));
            assert!(cache.contains("3"));
        }

        #[test]
        fn test_resize_and_clear() {
            let mut cache = DetailCache::default();
            for id in 1..=5 {
                cache.insert(id.to_string(), item(id, "x"));
            }
            cache.resize(Some(3));
            assert_eq!(cache.len(), 3);
            cache.resize(None);
            cache.insert("9".into(), item(9, "y"));
            assert_eq!(cache.len(), 4);
            cache.clear();
            assert!(cache.is_empty());
        }
    }

    #[test]
    fn test_request_seq() {
        let mut seq = RequestSeq::default();
        let first = seq.next();
        let second = seq.next();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert_eq!(seq.latest(), second);
    }
}
