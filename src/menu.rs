//! JSON-file menu store.
//!
//! The menu is a pretty-printed JSON array of `{name, description, price}`
//! records, fully rewritten on every mutation. Names are unique under
//! case-insensitive comparison.

use crate::error::MenuError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

type MenuResult<T> = std::result::Result<T, MenuError>;

/// A dish on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
        }
    }

    fn validate(&self) -> MenuResult<()> {
        if self.name.trim().is_empty() {
            return Err(MenuError::InvalidItem("name must not be empty".to_string()));
        }
        validate_price(self.price)
    }

    fn matches(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

impl std::fmt::Display for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, format_price(self.price))?;
        if !self.description.is_empty() {
            write!(f, "\n  {}", self.description)?;
        }
        Ok(())
    }
}

/// Fields to change on an existing item. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MenuUpdate {
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl MenuUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.price.is_none()
    }
}

/// A loosely-typed candidate for bulk insertion, as produced by the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

impl BulkItem {
    /// Read a candidate from a JSON object. Prices given as numeric strings
    /// (e.g. `"50000"`) are accepted.
    pub fn from_value(value: &Value) -> Self {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);
        let price = value.get("price").and_then(|p| match p {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        });
        Self {
            name,
            description,
            price,
        }
    }
}

/// Why a bulk candidate was not added.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingName,
    MissingPrice,
    AlreadyExists,
    Invalid(String),
    PersistFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingName => write!(f, "missing name"),
            SkipReason::MissingPrice => write!(f, "missing price"),
            SkipReason::AlreadyExists => write!(f, "already exists"),
            SkipReason::Invalid(reason) => write!(f, "invalid: {}", reason),
            SkipReason::PersistFailed(reason) => write!(f, "could not save: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedItem {
    pub name: Option<String>,
    pub reason: SkipReason,
}

/// Result of a bulk insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkAddReport {
    pub added: Vec<String>,
    pub skipped: Vec<SkippedItem>,
}

impl BulkAddReport {
    pub fn summary(&self) -> String {
        let mut summary = if self.added.is_empty() {
            "No new items were added.".to_string()
        } else {
            format!(
                "Added {} new item(s): {}.",
                self.added.len(),
                self.added.join(", ")
            )
        };

        if !self.skipped.is_empty() {
            let skipped: Vec<String> = self
                .skipped
                .iter()
                .map(|s| {
                    format!(
                        "{} ({})",
                        s.name.as_deref().unwrap_or("unnamed item"),
                        s.reason
                    )
                })
                .collect();
            summary.push_str(&format!(" Skipped: {}.", skipped.join(", ")));
        }

        summary
    }
}

/// Menu persisted as a JSON file.
///
/// All mutations run under one mutex: the change is applied to a copy, the
/// copy is written to disk, and only then does it replace the in-memory menu.
#[derive(Debug)]
pub struct MenuStore {
    path: PathBuf,
    items: Mutex<Vec<MenuItem>>,
}

impl MenuStore {
    /// Open the menu at `path`. A missing or unreadable file is an empty menu.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = load(&path);
        info!("Loaded {} menu item(s) from {:?}", items.len(), path);
        Self {
            path,
            items: Mutex::new(items),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> MenuResult<Vec<MenuItem>> {
        Ok(self.lock()?.clone())
    }

    pub fn add(&self, item: MenuItem) -> MenuResult<()> {
        item.validate()?;
        let mut items = self.lock()?;
        if items.iter().any(|i| i.matches(&item.name)) {
            return Err(MenuError::DuplicateItem(item.name));
        }

        let mut updated = items.clone();
        debug!("Adding menu item '{}'", item.name);
        updated.push(item);
        self.commit(&mut items, updated)
    }

    /// Apply `update` to the item called `name`. Returns the updated item.
    /// An empty update is rejected and leaves the file untouched.
    pub fn edit(&self, name: &str, update: MenuUpdate) -> MenuResult<MenuItem> {
        if let Some(price) = update.price {
            validate_price(price)?;
        }

        let mut items = self.lock()?;
        let mut updated = items.clone();
        let item = updated
            .iter_mut()
            .find(|i| i.matches(name))
            .ok_or_else(|| MenuError::NotFound(name.to_string()))?;
        if update.is_empty() {
            return Err(MenuError::NoChanges(item.name.clone()));
        }

        if let Some(description) = update.description {
            item.description = description;
        }
        if let Some(price) = update.price {
            item.price = price;
        }
        let edited = item.clone();

        self.commit(&mut items, updated)?;
        Ok(edited)
    }

    pub fn delete(&self, name: &str) -> MenuResult<MenuItem> {
        let mut items = self.lock()?;
        let position = items
            .iter()
            .position(|i| i.matches(name))
            .ok_or_else(|| MenuError::NotFound(name.to_string()))?;

        let mut updated = items.clone();
        let removed = updated.remove(position);
        self.commit(&mut items, updated)?;
        Ok(removed)
    }

    /// Add several items, skipping incomplete, invalid or duplicate entries.
    /// Each accepted item is persisted before the next is considered.
    pub fn bulk_add(&self, candidates: Vec<BulkItem>) -> MenuResult<BulkAddReport> {
        let mut items = self.lock()?;
        let mut report = BulkAddReport::default();

        for candidate in candidates {
            let Some(name) = candidate.name else {
                report.skipped.push(SkippedItem {
                    name: None,
                    reason: SkipReason::MissingName,
                });
                continue;
            };
            let Some(price) = candidate.price else {
                report.skipped.push(SkippedItem {
                    name: Some(name),
                    reason: SkipReason::MissingPrice,
                });
                continue;
            };

            let item = MenuItem::new(name, candidate.description.unwrap_or_default(), price);
            if let Err(e) = item.validate() {
                report.skipped.push(SkippedItem {
                    name: Some(item.name),
                    reason: SkipReason::Invalid(e.to_string()),
                });
                continue;
            }
            if items.iter().any(|i| i.matches(&item.name)) {
                report.skipped.push(SkippedItem {
                    name: Some(item.name),
                    reason: SkipReason::AlreadyExists,
                });
                continue;
            }

            let name = item.name.clone();
            let mut updated = items.clone();
            updated.push(item);
            match self.commit(&mut items, updated) {
                Ok(()) => report.added.push(name),
                Err(e) => report.skipped.push(SkippedItem {
                    name: Some(name),
                    reason: SkipReason::PersistFailed(e.to_string()),
                }),
            }
        }

        info!(
            "Bulk add: {} added, {} skipped",
            report.added.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    fn lock(&self) -> MenuResult<MutexGuard<'_, Vec<MenuItem>>> {
        self.items
            .lock()
            .map_err(|_| MenuError::Persist("menu lock poisoned".to_string()))
    }

    /// Persist `updated`, then make it the current menu.
    fn commit(&self, current: &mut Vec<MenuItem>, updated: Vec<MenuItem>) -> MenuResult<()> {
        save(&self.path, &updated)?;
        *current = updated;
        Ok(())
    }
}

fn load(path: &Path) -> Vec<MenuItem> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&content) {
        Ok(items) => items,
        Err(e) => {
            warn!("Ignoring malformed menu file {:?}: {}", path, e);
            Vec::new()
        }
    }
}

/// Write the menu to a temp file beside `path` and rename it into place.
fn save(path: &Path, items: &[MenuItem]) -> MenuResult<()> {
    let persist_err = |e: std::io::Error| MenuError::Persist(e.to_string());

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(persist_err)?;

    let json = serde_json::to_string_pretty(items)
        .map_err(|e| MenuError::Persist(e.to_string()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(persist_err)?;
    tmp.write_all(json.as_bytes()).map_err(persist_err)?;
    tmp.as_file().sync_all().map_err(persist_err)?;
    tmp.persist(path).map_err(|e| persist_err(e.error))?;
    Ok(())
}

fn validate_price(price: f64) -> MenuResult<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(MenuError::InvalidItem(format!(
            "price must be a non-negative number, got {}",
            price
        )));
    }
    Ok(())
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Whole prices print without decimals.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{:.0}", price)
    } else {
        format!("{:.2}", price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (TempDir, MenuStore) {
        let dir = TempDir::new().unwrap();
        let store = MenuStore::open(dir.path().join("menu.json"));
        (dir, store)
    }

    fn on_disk(store: &MenuStore) -> Vec<MenuItem> {
        let content = std::fs::read_to_string(store.path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_menu() {
        let (_dir, store) = store();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_file_is_empty_menu() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("menu.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(MenuStore::open(&path).read_all().unwrap().is_empty());
    }

    #[test]
    fn test_add_persists_pretty_json() {
        let (_dir, store) = store();
        store
            .add(MenuItem::new("Phở Bò", "Beef noodle soup", 50000.0))
            .unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("\n"));
        assert!(content.contains("Phở Bò"));
        assert_eq!(on_disk(&store).len(), 1);
    }

    #[test]
    fn test_add_duplicate_case_insensitive() {
        let (_dir, store) = store();
        store.add(MenuItem::new("Pho", "", 1.0)).unwrap();

        let err = store.add(MenuItem::new("PHO", "", 2.0)).unwrap_err();
        assert_eq!(err, MenuError::DuplicateItem("PHO".to_string()));
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_add_rejects_negative_price() {
        let (_dir, store) = store();
        let err = store.add(MenuItem::new("Pho", "", -1.0)).unwrap_err();
        assert!(matches!(err, MenuError::InvalidItem(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_edit_updates_only_given_fields() {
        let (_dir, store) = store();
        store.add(MenuItem::new("Pho", "Soup", 50000.0)).unwrap();

        let edited = store
            .edit(
                "pho",
                MenuUpdate {
                    price: Some(55000.0),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(edited, MenuItem::new("Pho", "Soup", 55000.0));
        assert_eq!(on_disk(&store), vec![edited]);
    }

    #[test]
    fn test_edit_missing_item() {
        let (_dir, store) = store();
        store.add(MenuItem::new("Pho", "Soup", 50000.0)).unwrap();
        let before = store.read_all().unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();

        let err = store
            .edit(
                "Bun Cha",
                MenuUpdate {
                    price: Some(45000.0),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err, MenuError::NotFound("Bun Cha".to_string()));

        assert_eq!(store.read_all().unwrap(), before);
        assert_eq!(on_disk(&store), before);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), content);
    }

    #[test]
    fn test_edit_without_fields_keeps_file() {
        let (_dir, store) = store();
        store.add(MenuItem::new("Pho", "Soup", 50000.0)).unwrap();
        let modified = std::fs::metadata(store.path()).unwrap().modified().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));

        let err = store.edit("pho", MenuUpdate::default()).unwrap_err();
        assert_eq!(err, MenuError::NoChanges("Pho".to_string()));
        assert_eq!(
            std::fs::metadata(store.path()).unwrap().modified().unwrap(),
            modified
        );
        assert_eq!(on_disk(&store), vec![MenuItem::new("Pho", "Soup", 50000.0)]);

        // Unknown names are still reported as missing.
        let err = store.edit("Bun Cha", MenuUpdate::default()).unwrap_err();
        assert_eq!(err, MenuError::NotFound("Bun Cha".to_string()));
    }

    #[test]
    fn test_delete_then_delete_again() {
        let (_dir, store) = store();
        store.add(MenuItem::new("Pho", "", 1.0)).unwrap();

        let removed = store.delete("PHO").unwrap();
        assert_eq!(removed.name, "Pho");
        assert!(on_disk(&store).is_empty());
        assert!(matches!(store.delete("Pho"), Err(MenuError::NotFound(_))));
    }

    #[test]
    fn test_bulk_add_reports_skips() {
        let (_dir, store) = store();
        store.add(MenuItem::new("Pho", "", 1.0)).unwrap();

        let candidates = [
            json!({"name": "Bun Cha", "description": "Grilled pork", "price": 45000}),
            json!({"name": "pho", "price": 2}),
            json!({"description": "No name", "price": 3}),
            json!({"name": "Banh Mi"}),
            json!({"name": "BUN CHA", "price": 4}),
            json!({"name": "Che", "price": "15000"}),
        ]
        .iter()
        .map(BulkItem::from_value)
        .collect();

        let report = store.bulk_add(candidates).unwrap();
        assert_eq!(report.added, vec!["Bun Cha", "Che"]);

        let reasons: Vec<SkipReason> = report.skipped.iter().map(|s| s.reason.clone()).collect();
        assert_eq!(
            reasons,
            vec![
                SkipReason::AlreadyExists,
                SkipReason::MissingName,
                SkipReason::MissingPrice,
                SkipReason::AlreadyExists,
            ]
        );
        assert_eq!(on_disk(&store).len(), 3);
    }

    #[test]
    fn test_bulk_add_summary() {
        let report = BulkAddReport {
            added: vec!["Pho".to_string()],
            skipped: vec![SkippedItem {
                name: None,
                reason: SkipReason::MissingName,
            }],
        };
        assert_eq!(
            report.summary(),
            "Added 1 new item(s): Pho. Skipped: unnamed item (missing name)."
        );
        assert_eq!(BulkAddReport::default().summary(), "No new items were added.");
    }

    #[test]
    fn test_reopen_sees_persisted_state() {
        let (dir, store) = store();
        store.add(MenuItem::new("Pho", "Soup", 1.0)).unwrap();
        drop(store);

        let reopened = MenuStore::open(dir.path().join("menu.json"));
        assert_eq!(reopened.read_all().unwrap()[0].name, "Pho");
    }

    #[test]
    fn test_concurrent_adds_keep_names_unique() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let name = if i % 2 == 0 { "Pho" } else { "PHO" };
                    store.add(MenuItem::new(name, "", 1.0)).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
        assert_eq!(on_disk(&store).len(), 1);
    }
}
