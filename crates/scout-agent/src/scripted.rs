//! Scripted in-memory browser driver.
//!
//! Models a small site as data: named pages with interactive elements and
//! deterministic transitions. Used by the integration tests and the CLI demo
//! mode; real browser adapters implement [`BrowserDriver`] against a live
//! page instead.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use scout_core_types::{ActionType, DomNode, InteractiveElement, PageSnapshot, ScrollDirection};

use crate::errors::DriverError;
use crate::ports::BrowserDriver;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptedSite {
    /// Name of the page the start URL resolves to.
    pub start: String,
    pub pages: BTreeMap<String, ScriptedPage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptedPage {
    pub url: String,
    pub dom: DomNode,
    #[serde(default)]
    pub elements: BTreeMap<String, ScriptedElement>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScriptedElement {
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_action")]
    pub action: ActionType,
    #[serde(default)]
    pub locator: Option<String>,
    /// Page name this element navigates to when activated; `None` is a no-op.
    #[serde(default)]
    pub goes_to: Option<String>,
    /// Marks a link that leaves the allowed origin.
    #[serde(default)]
    pub external: bool,
}

fn default_action() -> ActionType {
    ActionType::Click
}

pub struct ScriptedDriver {
    site: ScriptedSite,
    current: String,
    history: Vec<String>,
    /// Set when an external link was followed; cleared by any navigation.
    external_url: Option<String>,
}

impl ScriptedDriver {
    pub fn new(site: ScriptedSite) -> Self {
        let current = site.start.clone();
        Self {
            site,
            current,
            history: Vec::new(),
            external_url: None,
        }
    }

    fn page(&self) -> Result<&ScriptedPage, DriverError> {
        self.site
            .pages
            .get(&self.current)
            .ok_or_else(|| DriverError::internal(format!("unknown page: {}", self.current)))
    }

    fn element(&self, element_id: &str) -> Result<&ScriptedElement, DriverError> {
        self.page()?
            .elements
            .get(element_id)
            .ok_or_else(|| DriverError::ElementNotFound(element_id.to_string()))
    }

    fn activate(&mut self, element_id: &str) -> Result<(), DriverError> {
        let element = self.element(element_id)?.clone();
        if element.external {
            self.external_url = Some(format!("https://external.example/{element_id}"));
            return Ok(());
        }
        if let Some(target) = element.goes_to {
            if !self.site.pages.contains_key(&target) {
                return Err(DriverError::Navigation(format!("unknown page: {target}")));
            }
            self.history.push(self.current.clone());
            self.current = target;
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn goto(&mut self, url: &str) -> Result<(), DriverError> {
        self.external_url = None;
        let name = self
            .site
            .pages
            .iter()
            .find(|(_, page)| page.url == url)
            .map(|(name, _)| name.clone())
            .ok_or_else(|| DriverError::Navigation(format!("no page for url: {url}")))?;
        self.history.push(self.current.clone());
        self.current = name;
        Ok(())
    }

    async fn back(&mut self) -> Result<(), DriverError> {
        self.external_url = None;
        if let Some(previous) = self.history.pop() {
            self.current = previous;
        }
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, DriverError> {
        let page = self.page()?;
        let mut snapshot = PageSnapshot::new(page.url.clone(), page.dom.clone());
        for (id, element) in &page.elements {
            snapshot.interactive.insert(
                id.clone(),
                InteractiveElement {
                    default_action: element.action,
                    label: element.label.clone(),
                    locator: element.locator.clone(),
                },
            );
        }
        Ok(snapshot)
    }

    async fn click(&mut self, element_id: &str) -> Result<(), DriverError> {
        self.activate(element_id)
    }

    async fn fill(&mut self, element_id: &str, _text: &str) -> Result<(), DriverError> {
        self.element(element_id).map(|_| ())
    }

    async fn scroll(
        &mut self,
        element_id: &str,
        _direction: ScrollDirection,
    ) -> Result<(), DriverError> {
        self.element(element_id).map(|_| ())
    }

    async fn would_leave_origin(&mut self, element_id: &str) -> Result<bool, DriverError> {
        Ok(self.element(element_id).map(|e| e.external).unwrap_or(false))
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        if let Some(external) = &self.external_url {
            return Ok(external.clone());
        }
        Ok(self.page()?.url.clone())
    }

    async fn close_extra_pages(&mut self) -> Result<(), DriverError> {
        Ok(())
    }
}
