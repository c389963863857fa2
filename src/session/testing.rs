//! In-memory listing site for crawler tests
//!
//! `FakeSite` models the stateful parts of the real site: checkbox filters,
//! collapsible filter groups, apply/clear buttons and a forward-only result
//! pager. Faults can be injected per page to exercise recovery.

use super::driver::{DriverFactory, DriverResult, PageDriver, PageElement, SessionFault};
use crate::config::{BrowserConfig, Config, DelayConfig, FilterGroup, SelectorConfig};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// Counters observed by tests
#[derive(Debug, Clone, Default)]
pub(crate) struct SiteStats {
    pub launches: u32,
    pub shutdowns: u32,
    pub navigations: u32,
    pub applies: u32,
    pub clears: u32,
    pub toggles: u32,
    pub advances: u32,
    pub next_queries: u32,
    pub item_queries: u32,
}

struct SiteState {
    selectors: SelectorConfig,
    groups: Vec<FilterGroup>,
    default_pages: Vec<Vec<String>>,
    status_pages: Vec<Vec<String>>,
    tag_pages: HashMap<String, Vec<Vec<String>>>,
    results: Vec<Vec<String>>,
    page: usize,
    checked: HashSet<String>,
    expanded: HashSet<String>,
    loaded: bool,
    item_faults: HashMap<u32, u32>,
    next_faults: u32,
    apply_faults: u32,
    fail_launch: bool,
    fail_navigation: bool,
    stats: SiteStats,
}

impl SiteState {
    fn is_control(&self, id: &str) -> bool {
        self.selectors.status_controls.iter().any(|c| c == id)
            || self
                .groups
                .iter()
                .any(|g| g.tags.iter().any(|t| t.control_id == id))
    }

    fn reset_view(&mut self) {
        self.results = self.default_pages.clone();
        self.page = 0;
        self.checked.clear();
        if let Some(open) = self.selectors.status_controls.first() {
            self.checked.insert(open.clone());
        }
        self.expanded.clear();
    }

    fn apply(&mut self) {
        self.stats.applies += 1;
        let checked_tags: Vec<&String> = self
            .tag_pages
            .keys()
            .filter(|id| self.checked.contains(*id))
            .collect();

        self.results = if let Some(tag) = checked_tags.first() {
            self.tag_pages.get(*tag).cloned().unwrap_or_default()
        } else if self
            .selectors
            .status_controls
            .iter()
            .all(|c| self.checked.contains(c))
        {
            self.status_pages.clone()
        } else {
            self.default_pages.clone()
        };
        self.page = 0;
    }
}

#[derive(Clone)]
enum FakeKind {
    Container,
    Item(String),
    NextPage,
    Control(String),
    Panel(String),
    Toggle(String),
    Apply,
    Clear,
}

/// Shared handle to the fake site
#[derive(Clone)]
pub(crate) struct FakeSite {
    state: Arc<Mutex<SiteState>>,
}

impl FakeSite {
    pub fn new(config: &Config) -> Self {
        let state = SiteState {
            selectors: config.selectors.clone(),
            groups: config.filter_groups.clone(),
            default_pages: Vec::new(),
            status_pages: Vec::new(),
            tag_pages: HashMap::new(),
            results: Vec::new(),
            page: 0,
            checked: HashSet::new(),
            expanded: HashSet::new(),
            loaded: false,
            item_faults: HashMap::new(),
            next_faults: 0,
            apply_faults: 0,
            fail_launch: false,
            fail_navigation: false,
            stats: SiteStats::default(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Pages shown before any filter is applied
    pub fn with_default_pages(self, pages: Vec<Vec<String>>) -> Self {
        self.state.lock().unwrap().default_pages = pages;
        self
    }

    /// Pages shown once every status control has been applied
    pub fn with_status_pages(self, pages: Vec<Vec<String>>) -> Self {
        self.state.lock().unwrap().status_pages = pages;
        self
    }

    /// Pages shown when the given tag control is applied
    pub fn with_tag_pages(self, control_id: &str, pages: Vec<Vec<String>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .tag_pages
            .insert(control_id.to_string(), pages);
        self
    }

    /// Makes the item query on `page` (1-based) fail `times` times
    pub fn fail_items_on_page(&self, page: u32, times: u32) {
        self.state.lock().unwrap().item_faults.insert(page, times);
    }

    /// Makes the next `times` next-page lookups fail
    pub fn fail_next_page(&self, times: u32) {
        self.state.lock().unwrap().next_faults = times;
    }

    /// Makes the next `times` apply-button lookups fail
    pub fn fail_apply(&self, times: u32) {
        self.state.lock().unwrap().apply_faults = times;
    }

    pub fn fail_launch(&self, fail: bool) {
        self.state.lock().unwrap().fail_launch = fail;
    }

    pub fn fail_navigation(&self, fail: bool) {
        self.state.lock().unwrap().fail_navigation = fail;
    }

    pub fn stats(&self) -> SiteStats {
        self.state.lock().unwrap().stats.clone()
    }

    pub fn is_checked(&self, control_id: &str) -> bool {
        self.state.lock().unwrap().checked.contains(control_id)
    }

    pub fn is_expanded(&self, panel_selector: &str) -> bool {
        self.state.lock().unwrap().expanded.contains(panel_selector)
    }

    /// 1-based number of the page currently displayed
    pub fn current_page(&self) -> usize {
        self.state.lock().unwrap().page + 1
    }

    pub fn factory(&self) -> Box<dyn DriverFactory> {
        Box::new(FakeFactory {
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeFactory {
    state: Arc<Mutex<SiteState>>,
}

#[async_trait]
impl DriverFactory for FakeFactory {
    async fn launch(&self, _config: &BrowserConfig) -> DriverResult<Box<dyn PageDriver>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            return Err(SessionFault::Launch("browser binary not found".to_string()));
        }
        state.stats.launches += 1;
        state.loaded = false;
        Ok(Box::new(FakeDriver {
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeDriver {
    state: Arc<Mutex<SiteState>>,
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_navigation {
            return Err(SessionFault::Navigation {
                url: url.to_string(),
                message: "connection refused".to_string(),
            });
        }
        state.stats.navigations += 1;
        state.loaded = true;
        state.reset_view();
        Ok(())
    }

    async fn query(&self, selector: &str) -> DriverResult<Vec<Box<dyn PageElement>>> {
        let mut state = self.state.lock().unwrap();
        if !state.loaded {
            return Ok(Vec::new());
        }

        let s = state.selectors.clone();
        let kinds: Vec<FakeKind> = if selector == s.results_container {
            vec![FakeKind::Container]
        } else if selector == s.listing_item {
            state.stats.item_queries += 1;
            let page_number = state.page as u32 + 1;
            if let Some(remaining) = state.item_faults.get_mut(&page_number) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SessionFault::Timeout {
                        operation: format!("Loading results page {}", page_number),
                        seconds: 180,
                    });
                }
            }
            state
                .results
                .get(state.page)
                .map(|items| items.iter().cloned().map(FakeKind::Item).collect())
                .unwrap_or_default()
        } else if selector == s.next_page {
            state.stats.next_queries += 1;
            if state.next_faults > 0 {
                state.next_faults -= 1;
                return Err(SessionFault::Command(
                    "next page: node is detached from document".to_string(),
                ));
            }
            if state.page + 1 < state.results.len() {
                vec![FakeKind::NextPage]
            } else {
                Vec::new()
            }
        } else if selector == s.apply_button {
            if state.apply_faults > 0 {
                state.apply_faults -= 1;
                return Err(SessionFault::Command(
                    "apply filters: node is detached from document".to_string(),
                ));
            }
            vec![FakeKind::Apply]
        } else if selector == s.clear_button {
            vec![FakeKind::Clear]
        } else if selector == s.status_panel {
            vec![FakeKind::Panel(s.status_panel.clone())]
        } else if selector == s.status_toggle {
            vec![FakeKind::Toggle(s.status_panel.clone())]
        } else if let Some(group) = state.groups.iter().find(|g| g.panel_selector == selector) {
            vec![FakeKind::Panel(group.panel_selector.clone())]
        } else if let Some(group) = state.groups.iter().find(|g| g.menu_selector == selector) {
            vec![FakeKind::Toggle(group.panel_selector.clone())]
        } else if let Some(id) = selector.strip_prefix('#').filter(|id| state.is_control(id)) {
            vec![FakeKind::Control(id.to_string())]
        } else {
            Vec::new()
        };

        Ok(kinds
            .into_iter()
            .map(|kind| {
                Box::new(FakeElement {
                    state: Arc::clone(&self.state),
                    kind,
                }) as Box<dyn PageElement>
            })
            .collect())
    }

    async fn shutdown(&mut self) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        state.stats.shutdowns += 1;
        state.loaded = false;
        Ok(())
    }
}

struct FakeElement {
    state: Arc<Mutex<SiteState>>,
    kind: FakeKind,
}

#[async_trait]
impl PageElement for FakeElement {
    async fn text(&self) -> DriverResult<String> {
        Ok(match &self.kind {
            FakeKind::Item(html) => html.clone(),
            FakeKind::NextPage => "Siguiente".to_string(),
            _ => String::new(),
        })
    }

    async fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        let state = self.state.lock().unwrap();
        Ok(match (&self.kind, name) {
            (FakeKind::Panel(panel), "class") => Some(if state.expanded.contains(panel) {
                "collapse show".to_string()
            } else {
                "collapse".to_string()
            }),
            _ => None,
        })
    }

    async fn is_checked(&self) -> DriverResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(match &self.kind {
            FakeKind::Control(id) => state.checked.contains(id),
            _ => false,
        })
    }

    async fn click(&self) -> DriverResult<()> {
        let mut state = self.state.lock().unwrap();
        match &self.kind {
            FakeKind::Control(id) => {
                state.stats.toggles += 1;
                if !state.checked.remove(id) {
                    state.checked.insert(id.clone());
                }
            }
            FakeKind::Toggle(panel) => {
                if !state.expanded.remove(panel) {
                    state.expanded.insert(panel.clone());
                }
            }
            FakeKind::Apply => state.apply(),
            FakeKind::Clear => {
                state.stats.clears += 1;
                let expanded = state.expanded.clone();
                state.reset_view();
                state.expanded = expanded;
            }
            FakeKind::NextPage => {
                state.stats.advances += 1;
                state.page += 1;
            }
            FakeKind::Container | FakeKind::Item(_) | FakeKind::Panel(_) => {}
        }
        Ok(())
    }

    async fn scroll_into_view(&self) -> DriverResult<()> {
        Ok(())
    }

    async fn outer_html(&self) -> DriverResult<String> {
        Ok(match &self.kind {
            FakeKind::Item(html) => html.clone(),
            _ => String::new(),
        })
    }
}

/// Configuration pointing at the fake site, with every delay disabled
pub(crate) fn test_config() -> Config {
    let mut config = crate::config::parse_config(
        r#"
[crawler]
base-url = "https://listings.example.com/programs"
inter-request-delay-seconds = 0
"#,
    )
    .expect("test config should parse");
    config.delays = DelayConfig::none();
    config.browser.element_wait_seconds = 0;
    config
}

/// Listing item markup matching the default selectors
pub(crate) fn item(name: &str, href: &str) -> String {
    format!(
        r#"<div class="caja-resultados_uno">
  <h4 class="titulo-cajas_fechas">{name}</h4>
  <div class="apertura">Apertura: <span>01/03/2024</span></div>
  <div class="cierre">Cierre: <span>30/04/2024</span></div>
  <ul><li>Alcance: Nacional</li><li>Estado: Abierta</li></ul>
  <p>Apoyo para {name}.</p>
  <div class="foot-caja_result"><a href="{href}">Más información</a></div>
</div>"#
    )
}
