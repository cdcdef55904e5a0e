use serde::{Deserialize, Serialize};

use crate::model::ListItem;

pub const CSV_HEADER: &str = "id,name,url";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectedItem {
    pub id: u32,
    pub name: String,
    pub url: String,
}

impl SelectedItem {
    /// `None` when the item's URL carries no numeric id.
    #[must_use]
    pub fn from_list_item(item: &ListItem) -> Option<Self> {
        Some(Self {
            id: item.id()?,
            name: item.name.clone(),
            url: item.url.clone(),
        })
    }
}

/// Selected items in insertion order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionSet {
    items: Vec<SelectedItem>,
}

impl SelectionSet {
    /// Adds the item, or removes it if its id is already present. Returns
    /// whether the item is selected afterwards.
    pub fn toggle(&mut self, item: SelectedItem) -> bool {
        if let Some(index) = self.items.iter().position(|i| i.id == item.id) {
            self.items.remove(index);
            false
        } else {
            self.items.push(item);
            true
        }
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Folds a snapshot loaded from storage in front of anything selected
    /// since startup, dropping duplicate ids.
    pub fn merge_restored(&mut self, restored: SelectionSet) {
        let current = std::mem::replace(&mut self.items, restored.items);
        let mut seen = std::collections::HashSet::new();
        self.items.retain(|i| seen.insert(i.id));
        for item in current {
            if seen.insert(item.id) {
                self.items.push(item);
            }
        }
    }

    #[must_use]
    pub fn items(&self) -> &[SelectedItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvExport {
    pub file_name: String,
    pub content: String,
}

impl CsvExport {
    /// `None` for an empty selection.
    #[must_use]
    pub fn from_selection(selection: &SelectionSet) -> Option<Self> {
        if selection.is_empty() {
            return None;
        }
        Some(Self {
            file_name: format!("{}_pokemons.csv", selection.len()),
            content: to_csv(selection.items()),
        })
    }
}

#[must_use]
pub fn to_csv(items: &[SelectedItem]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push_str("\r\n");
    for item in items {
        out.push_str(&item.id.to_string());
        out.push(',');
        out.push_str(&csv_field(&item.name));
        out.push(',');
        out.push_str(&csv_field(&item.url));
        out.push_str("\r\n");
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
