use crate::config::StaticEntry;
use crate::error::SourceError;
use crate::sources::{
    ChangeListener, MenuDirectory, MenuElement, MenuEntry, MenuNode, MenuSource, Subscription,
};
use log::info;
use std::path::PathBuf;

/// Launchers defined directly in the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticMenuSource {
    items: Vec<StaticEntry>,
}

impl StaticMenuSource {
    pub fn new(items: Vec<StaticEntry>) -> Self {
        Self { items }
    }
}

impl MenuSource for StaticMenuSource {
    fn name(&self) -> &str {
        "custom"
    }

    fn load(&self, _desktop: Option<&str>) -> Result<MenuNode, SourceError> {
        let elements = self
            .items
            .iter()
            .map(|item| {
                let mut entry = MenuEntry::new(&format!("custom:{}", item.name), &item.name, &item.command);
                entry.icon = item.icon.clone();
                entry.comment = item.comment.clone();
                entry.requires_terminal = item.terminal;
                MenuElement::Item(entry)
            })
            .collect();

        info!("StaticMenuSource: found {} entries", self.items.len());
        Ok(MenuNode {
            directory: None,
            elements: vec![MenuElement::Menu(MenuNode {
                directory: Some(MenuDirectory::new("Custom", Some("applications-other"))),
                elements,
                origin: None,
            })],
            origin: None,
        })
    }

    fn watch(&self, _targets: &[PathBuf], _listener: ChangeListener) -> Result<Subscription, SourceError> {
        Ok(Subscription::inert())
    }
}
