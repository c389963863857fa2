use crate::store::DedupKey;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for the harvester
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default = "default_filter_groups")]
    pub filter_groups: Vec<FilterGroup>,
    #[serde(default)]
    pub detail: DetailConfig,
}

impl Config {
    /// Absolute root that relative listing links are joined against.
    ///
    /// Falls back to the origin of `crawler.base-url` when no explicit
    /// `site-root` is configured.
    pub fn site_root(&self) -> Result<url::Url, url::ParseError> {
        match &self.crawler.site_root {
            Some(root) => url::Url::parse(root),
            None => {
                let base = url::Url::parse(&self.crawler.base_url)?;
                url::Url::parse(&base.origin().ascii_serialization())
            }
        }
    }

    /// All tag column names, in group order
    pub fn tag_names(&self) -> Vec<String> {
        self.filter_groups
            .iter()
            .flat_map(|group| group.tags.iter().map(|tag| tag.name.clone()))
            .collect()
    }
}

/// Dataset location and merge policy
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Dataset read at the start of a run (missing file = empty dataset)
    #[serde(default = "default_dataset_path")]
    pub input_path: String,

    /// Dataset written after every merge
    #[serde(default = "default_dataset_path")]
    pub output_path: String,

    /// Key used to recognise records that are already stored
    #[serde(default)]
    pub dedup_key: DedupKey,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_path: default_dataset_path(),
            output_path: default_dataset_path(),
            dedup_key: DedupKey::default(),
        }
    }
}

/// Crawl behaviour configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Listing page every session starts from
    pub base_url: String,

    /// Root for resolving relative item links
    #[serde(default)]
    pub site_root: Option<String>,

    /// Attempts per page before the crawl is aborted
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between detail page requests
    ///
    /// Only the HTTP detail pass uses this. Browser crawls are paced by the
    /// `[delays]` settle times, `page-advance-ms` between pages.
    #[serde(default = "default_inter_request_delay")]
    pub inter_request_delay_seconds: u64,

    /// User agent sent by the detail-page HTTP client
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl CrawlerConfig {
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_secs(self.inter_request_delay_seconds)
    }
}

/// Headless browser settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserConfig {
    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_seconds: u64,

    #[serde(default = "default_script_timeout")]
    pub script_timeout_seconds: u64,

    /// Upper bound when waiting for an element to appear
    #[serde(default = "default_element_wait")]
    pub element_wait_seconds: u64,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Explicit Chromium binary; auto-detected when absent
    #[serde(default)]
    pub chrome_executable: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_seconds: default_page_load_timeout(),
            script_timeout_seconds: default_script_timeout(),
            element_wait_seconds: default_element_wait(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            chrome_executable: None,
        }
    }
}

/// Fixed settle delays after UI-mutating actions (milliseconds)
///
/// The target site gives no reliable signal when its result list has been
/// refreshed, so these are unconditional sleeps.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelayConfig {
    /// After scrolling an element into view
    #[serde(default = "default_short_settle")]
    pub scroll_settle_ms: u64,

    /// After expanding a collapsed filter group
    #[serde(default = "default_short_settle")]
    pub group_open_ms: u64,

    /// After toggling one filter control
    #[serde(default = "default_short_settle")]
    pub filter_toggle_ms: u64,

    /// After pressing "apply filters" or "clear filters"
    #[serde(default = "default_apply_settle")]
    pub filter_apply_ms: u64,

    /// After clicking the next-page control
    #[serde(default = "default_advance_settle")]
    pub page_advance_ms: u64,

    /// Between two tag passes of the enrichment crawl
    #[serde(default = "default_advance_settle")]
    pub between_tags_ms: u64,
}

impl DelayConfig {
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn group_open(&self) -> Duration {
        Duration::from_millis(self.group_open_ms)
    }

    pub fn filter_toggle(&self) -> Duration {
        Duration::from_millis(self.filter_toggle_ms)
    }

    pub fn filter_apply(&self) -> Duration {
        Duration::from_millis(self.filter_apply_ms)
    }

    pub fn page_advance(&self) -> Duration {
        Duration::from_millis(self.page_advance_ms)
    }

    pub fn between_tags(&self) -> Duration {
        Duration::from_millis(self.between_tags_ms)
    }

    /// All delays set to zero (used by tests)
    pub fn none() -> Self {
        Self {
            scroll_settle_ms: 0,
            group_open_ms: 0,
            filter_toggle_ms: 0,
            filter_apply_ms: 0,
            page_advance_ms: 0,
            between_tags_ms: 0,
        }
    }
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            scroll_settle_ms: default_short_settle(),
            group_open_ms: default_short_settle(),
            filter_toggle_ms: default_short_settle(),
            filter_apply_ms: default_apply_settle(),
            page_advance_ms: default_advance_settle(),
            between_tags_ms: default_advance_settle(),
        }
    }
}

/// CSS selectors and marker strings for the listing site
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    /// Region that holds the result items
    pub results_container: String,
    /// One listing item
    pub listing_item: String,
    pub name: String,
    pub opens_at: String,
    pub closes_at: String,
    /// Text label preceding the scope value
    pub scope_label: String,
    /// Text label preceding the status value
    pub status_label: String,
    pub summary: String,
    pub link: String,
    pub next_page: String,
    pub apply_button: String,
    pub clear_button: String,
    pub status_panel: String,
    pub status_toggle: String,
    /// Element ids of the status checkboxes enabled for the catalog crawl
    pub status_controls: Vec<String>,
    pub promo_banner: String,
    /// Phrase that identifies the promotional banner inside summaries
    pub promo_marker: String,
    /// Substrings removed from cleaned summaries, in order
    pub summary_artifacts: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            results_container: "#listSearch".to_string(),
            listing_item: ".caja-resultados_uno".to_string(),
            name: ".titulo-cajas_fechas".to_string(),
            opens_at: ".apertura span".to_string(),
            closes_at: ".cierre span".to_string(),
            scope_label: "Alcance:".to_string(),
            status_label: "Estado:".to_string(),
            summary: "p".to_string(),
            link: ".foot-caja_result a".to_string(),
            next_page: "a.page-link[href*='getRedirectNext']".to_string(),
            apply_button: "button.cpp-button-search[onclick*='funcSearch']".to_string(),
            clear_button: "button.cpp-button-search[onclick*='removeAllFiltros']".to_string(),
            status_panel: "#collapse1".to_string(),
            status_toggle: "#heading1".to_string(),
            status_controls: vec![
                "pullEstado-abierta-checkbox".to_string(),
                "pullEstado-cerrada-checkbox".to_string(),
            ],
            promo_banner:
                r#"span[style="border: 2px solid #2fca70;padding: 20px;display: inline-block;"]"#
                    .to_string(),
            promo_marker: "Plataforma Matchmaking".to_string(),
            summary_artifacts: vec!["<br> \" -".to_string(), "\" -".to_string()],
        }
    }
}

/// A named cluster of filter controls on the listing site
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterGroup {
    pub name: String,

    /// Control that expands the group
    pub menu_selector: String,

    /// Collapsible region; expanded when its class contains `show`
    pub panel_selector: String,

    /// Tags in application order
    pub tags: Vec<TagFilter>,
}

/// One tag filter: the dataset column it feeds and the checkbox that selects it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TagFilter {
    pub name: String,
    pub control_id: String,
}

/// Detail-page enrichment settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DetailConfig {
    /// Persist after this many processed records
    pub checkpoint_every: usize,

    pub request_timeout_seconds: u64,

    /// Leading heading stripped from the detail text
    pub heading_pattern: String,

    pub legacy: LayoutSelectors,

    pub current: LayoutSelectors,
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            checkpoint_every: 10,
            request_timeout_seconds: 30,
            heading_pattern: r"^¿Qué es\?[\s:]*".to_string(),
            legacy: LayoutSelectors {
                container: Some(".col-sm-8".to_string()),
                detail: "p".to_string(),
                benefit: ".beneficios".to_string(),
                eligibility: ".requisitos".to_string(),
                results: ".resultados_esperados".to_string(),
            },
            current: LayoutSelectors {
                container: None,
                detail: ".marcoque_fase2".to_string(),
                benefit: ".postula_fase2-cuerpodos_fase2_bloque_q_entrega".to_string(),
                eligibility: ".postula_fase2-der_fase2".to_string(),
                results: ".diviPuntoTexto_fase2".to_string(),
            },
        }
    }
}

/// Selectors for one detail-page layout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutSelectors {
    /// Region every other selector is scoped to
    #[serde(default)]
    pub container: Option<String>,
    pub detail: String,
    pub benefit: String,
    pub eligibility: String,
    pub results: String,
}

fn default_dataset_path() -> String {
    "listings.csv".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_inter_request_delay() -> u64 {
    2
}

fn default_user_agent() -> String {
    format!("listing-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_load_timeout() -> u64 {
    180
}

fn default_script_timeout() -> u64 {
    180
}

fn default_element_wait() -> u64 {
    20
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_short_settle() -> u64 {
    1000
}

fn default_apply_settle() -> u64 {
    3000
}

fn default_advance_settle() -> u64 {
    2000
}

fn group(name: &str, collapse: &str, tags: &[(&str, &str)]) -> FilterGroup {
    FilterGroup {
        name: name.to_string(),
        menu_selector: format!(r##"a[data-target="#{}"]"##, collapse),
        panel_selector: format!("#{}", collapse),
        tags: tags
            .iter()
            .map(|(name, control_id)| TagFilter {
                name: name.to_string(),
                control_id: control_id.to_string(),
            })
            .collect(),
    }
}

/// Filter groups of the listing site, in crawl order
pub fn default_filter_groups() -> Vec<FilterGroup> {
    vec![
        group(
            "profile",
            "collapse5",
            &[
                ("person", "asPerfilQuienSoy-persona-checkbox"),
                ("company", "asPerfilQuienSoy-empresa-checkbox"),
                ("organization", "asPerfilQuienSoy-organizacion-checkbox"),
                ("intermediary", "asPerfilQuienSoy-intermediario-checkbox"),
                ("institution", "asPerfilQuienSoy-institucion-checkbox"),
                ("foreign", "asPerfilQuienSoy-extranjero-checkbox"),
            ],
        ),
        group(
            "stage",
            "collapse4",
            &[
                ("entrepreneurship", "asEtapaQueBusco-emprender-checkbox"),
                ("business-idea", "asEtapaQueBusco-ideaNegocio-checkbox"),
                ("sales-growth", "asEtapaQueBusco-aumentarVentas-checkbox"),
                ("scale-up", "asEtapaQueBusco-escalar-checkbox"),
                ("innovation", "asEtapaQueBusco-innovar-checkbox"),
                ("r-and-d", "asEtapaQueBusco-desarrollandoID-checkbox"),
                ("service-delivery", "asEtapaQueBusco-entregarServicios-checkbox"),
                ("ecosystem", "asEtapaQueBusco-fortalecerEcosistema-checkbox"),
            ],
        ),
        group(
            "gender",
            "collapse3",
            &[("women-incentive", "asQueNecesito-incentivoMujeres-checkbox")],
        ),
    ]
}
