//! Menu management tools.

use super::{BuiltinTool, ParamType, ParameterSpec, Tool, ToolArgs, ToolOutput};
use crate::error::Result;
use crate::menu::{BulkItem, MenuItem, MenuStore, MenuUpdate};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// Store failures are reported to the model, not raised.
fn rejected(e: crate::error::MenuError) -> ToolOutput {
    ToolOutput::Error(e.to_string())
}

pub struct ReadMenuTool {
    store: Arc<MenuStore>,
}

impl ReadMenuTool {
    pub fn new(store: Arc<MenuStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ReadMenuTool {
    fn name(&self) -> &str {
        BuiltinTool::ReadMenu.as_str()
    }

    fn description(&self) -> &str {
        "Read the full current menu. Use this when the user wants to know which dishes are available."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    async fn invoke(&self, _args: &ToolArgs) -> Result<ToolOutput> {
        let items = match self.store.read_all() {
            Ok(items) => items,
            Err(e) => return Ok(rejected(e)),
        };
        if items.is_empty() {
            return Ok(ToolOutput::Text("The menu is currently empty.".to_string()));
        }
        Ok(ToolOutput::Text(serde_json::to_string_pretty(&items)?))
    }
}

pub struct AddMenuItemTool {
    store: Arc<MenuStore>,
}

impl AddMenuItemTool {
    pub fn new(store: Arc<MenuStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddMenuItemTool {
    fn name(&self) -> &str {
        BuiltinTool::AddMenuItem.as_str()
    }

    fn description(&self) -> &str {
        "Add a new dish to the menu. Fails if a dish with the same name already exists."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("name", ParamType::String, "Name of the dish"),
            ParameterSpec::required("description", ParamType::String, "Description of the dish"),
            ParameterSpec::required("price", ParamType::Number, "Price of the dish"),
        ]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let name = args.str("name")?;
        let item = MenuItem::new(name, args.str("description")?, args.f64("price")?);

        Ok(match self.store.add(item) {
            Ok(()) => ToolOutput::Text(format!("Added '{}' to the menu.", name)),
            Err(e) => rejected(e),
        })
    }
}

pub struct EditMenuItemTool {
    store: Arc<MenuStore>,
}

impl EditMenuItemTool {
    pub fn new(store: Arc<MenuStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for EditMenuItemTool {
    fn name(&self) -> &str {
        BuiltinTool::EditMenuItem.as_str()
    }

    fn description(&self) -> &str {
        "Change the description and/or the price of an existing dish. Only the fields provided are updated."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![
            ParameterSpec::required("name", ParamType::String, "Name of the dish to edit"),
            ParameterSpec::optional("new_description", ParamType::String, "New description"),
            ParameterSpec::optional("new_price", ParamType::Number, "New price"),
        ]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let name = args.str("name")?;
        let update = MenuUpdate {
            description: args.opt_str("new_description").map(str::to_string),
            price: args.opt_f64("new_price"),
        };

        Ok(match self.store.edit(name, update) {
            Ok(item) => ToolOutput::Text(format!("Updated '{}'.", item.name)),
            Err(e) => rejected(e),
        })
    }
}

pub struct DeleteMenuItemTool {
    store: Arc<MenuStore>,
}

impl DeleteMenuItemTool {
    pub fn new(store: Arc<MenuStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteMenuItemTool {
    fn name(&self) -> &str {
        BuiltinTool::DeleteMenuItem.as_str()
    }

    fn description(&self) -> &str {
        "Remove a dish from the menu by name."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "name",
            ParamType::String,
            "Name of the dish to delete",
        )]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        Ok(match self.store.delete(args.str("name")?) {
            Ok(item) => ToolOutput::Text(format!("Removed '{}' from the menu.", item.name)),
            Err(e) => rejected(e),
        })
    }
}

pub struct AddMultipleMenuItemsTool {
    store: Arc<MenuStore>,
}

impl AddMultipleMenuItemsTool {
    pub fn new(store: Arc<MenuStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AddMultipleMenuItemsTool {
    fn name(&self) -> &str {
        BuiltinTool::AddMultipleMenuItems.as_str()
    }

    fn description(&self) -> &str {
        "Add several dishes at once, for example all dishes recognised in a photo. \
         Incomplete or already existing dishes are skipped and reported."
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "items",
            ParamType::Array,
            "Dishes to add, each an object with 'name', 'description' and 'price'",
        )
        .with_items(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "description": {"type": "string"},
                "price": {"type": "number"}
            },
            "required": ["name", "price"]
        }))]
    }

    async fn invoke(&self, args: &ToolArgs) -> Result<ToolOutput> {
        let candidates = args
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(BulkItem::from_value).collect())
            .unwrap_or_default();

        Ok(match self.store.bulk_add(candidates) {
            Ok(report) => ToolOutput::Text(report.summary()),
            Err(e) => rejected(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;
    use tempfile::TempDir;

    fn registry() -> (TempDir, Arc<MenuStore>, ToolRegistry) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MenuStore::open(dir.path().join("menu.json")));
        let registry = ToolRegistry::new()
            .with(Arc::new(ReadMenuTool::new(store.clone())))
            .unwrap()
            .with(Arc::new(AddMenuItemTool::new(store.clone())))
            .unwrap()
            .with(Arc::new(EditMenuItemTool::new(store.clone())))
            .unwrap()
            .with(Arc::new(DeleteMenuItemTool::new(store.clone())))
            .unwrap()
            .with(Arc::new(AddMultipleMenuItemsTool::new(store.clone())))
            .unwrap();
        (dir, store, registry)
    }

    #[tokio::test]
    async fn test_read_empty_menu() {
        let (_dir, _store, registry) = registry();
        let invocation = registry.invoke("read_menu", "{}").await;
        assert_eq!(
            invocation.output,
            ToolOutput::Text("The menu is currently empty.".to_string())
        );
    }

    #[tokio::test]
    async fn test_add_then_duplicate() {
        let (_dir, store, registry) = registry();
        let args = r#"{"name": "Pho", "description": "Soup", "price": 50000}"#;

        assert!(registry.invoke("add_menu_item", args).await.success());
        let again = registry
            .invoke("add_menu_item", r#"{"name": "PHO", "description": "", "price": 1}"#)
            .await;
        assert_eq!(
            again.output,
            ToolOutput::Error("Menu item 'PHO' already exists".to_string())
        );
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_price_only() {
        let (_dir, store, registry) = registry();
        store.add(MenuItem::new("Pho", "Soup", 50000.0)).unwrap();

        let invocation = registry
            .invoke("edit_menu_item", r#"{"name": "pho", "new_price": 60000}"#)
            .await;
        assert!(invocation.success());
        assert_eq!(
            store.read_all().unwrap(),
            vec![MenuItem::new("Pho", "Soup", 60000.0)]
        );
    }

    #[tokio::test]
    async fn test_edit_without_fields_reports_no_changes() {
        let (_dir, store, registry) = registry();
        store.add(MenuItem::new("Pho", "Soup", 50000.0)).unwrap();
        let content = std::fs::read_to_string(store.path()).unwrap();

        let invocation = registry
            .invoke("edit_menu_item", r#"{"name": "pho"}"#)
            .await;
        assert_eq!(
            invocation.output,
            ToolOutput::Error("No changes given for menu item 'Pho'".to_string())
        );
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), content);
    }

    #[tokio::test]
    async fn test_delete_missing_is_error_result() {
        let (_dir, _store, registry) = registry();
        let invocation = registry
            .invoke("delete_menu_item", r#"{"name": "Bun Cha"}"#)
            .await;
        assert_eq!(
            invocation.output,
            ToolOutput::Error("Menu item 'Bun Cha' not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_bulk_add_summary() {
        let (_dir, store, registry) = registry();
        let invocation = registry
            .invoke(
                "add_multiple_menu_items",
                r#"{"items": [{"name": "Pho", "price": 1}, {"name": "Che"}]}"#,
            )
            .await;

        assert_eq!(
            invocation.output,
            ToolOutput::Text("Added 1 new item(s): Pho. Skipped: Che (missing price).".to_string())
        );
        assert_eq!(store.read_all().unwrap().len(), 1);
    }
}
