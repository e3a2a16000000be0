//! Menu command: edit the menu file without the agent.

use crate::cli::preflight::{self, Operation};
use crate::cli::{MenuAction, Output};
use crate::config::Settings;
use crate::menu::{MenuItem, MenuStore, MenuUpdate};
use anyhow::Result;

pub fn run_menu(action: &MenuAction, settings: &Settings) -> Result<()> {
    preflight::check(Operation::Menu, settings)?;
    let store = MenuStore::open(settings.menu_path());

    match action {
        MenuAction::List => {
            let items = store.read_all()?;
            if items.is_empty() {
                Output::info("The menu is empty.");
                return Ok(());
            }
            Output::header(&format!("Menu ({} items)", items.len()));
            for item in &items {
                Output::menu_item(item);
            }
        }

        MenuAction::Add {
            name,
            description,
            price,
        } => {
            store.add(MenuItem::new(name.as_str(), description.as_str(), *price))?;
            Output::success(&format!("Added '{}'", name));
        }

        MenuAction::Edit {
            name,
            description,
            price,
        } => {
            let update = MenuUpdate {
                description: description.clone(),
                price: *price,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to change: pass --description and/or --price");
            }
            let item = store.edit(name, update)?;
            Output::success(&format!("Updated '{}'", item.name));
            Output::menu_item(&item);
        }

        MenuAction::Delete { name } => {
            let item = store.delete(name)?;
            Output::success(&format!("Deleted '{}'", item.name));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.menu.path = format!("{}/menu.json", dir.path().display());
        settings
    }

    #[test]
    fn test_add_edit_delete() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        run_menu(
            &MenuAction::Add {
                name: "Pho".to_string(),
                description: "Beef noodle soup".to_string(),
                price: 45000.0,
            },
            &settings,
        )
        .unwrap();
        run_menu(
            &MenuAction::Edit {
                name: "pho".to_string(),
                description: None,
                price: Some(50000.0),
            },
            &settings,
        )
        .unwrap();

        let items = MenuStore::open(settings.menu_path()).read_all().unwrap();
        assert_eq!(items, vec![MenuItem::new("Pho", "Beef noodle soup", 50000.0)]);

        run_menu(&MenuAction::Delete { name: "Pho".to_string() }, &settings).unwrap();
        assert!(MenuStore::open(settings.menu_path()).read_all().unwrap().is_empty());
    }

    #[test]
    fn test_empty_edit_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = run_menu(
            &MenuAction::Edit {
                name: "Pho".to_string(),
                description: None,
                price: None,
            },
            &settings(&dir),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_missing_item_fails() {
        let dir = TempDir::new().unwrap();
        let result = run_menu(&MenuAction::Delete { name: "Bun cha".to_string() }, &settings(&dir));
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
