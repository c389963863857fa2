//! Integration tests for the harvester
//!
//! These tests use wiremock to serve detail pages and tempfile for the
//! dataset, exercising the public API end-to-end.

use listing_harvester::config::{load_config_with_hash, parse_config, Config};
use listing_harvester::crawler::{DetailPass, RunMode};
use listing_harvester::store::{Dataset, DedupKey, IncrementalStore, ListingRecord, NOT_AVAILABLE};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LEGACY_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="col-sm-8">
    <p>¿Qué es? Subsidio para validar ideas de negocio.</p>
    <div class="beneficios">Hasta 15 millones</div>
    <div class="requisitos">Personas naturales</div>
    <div class="resultados_esperados">Prototipo validado</div>
  </div>
</body></html>"#;

const CURRENT_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="marcoque_fase2">¿Qué es?: Apoyo a la expansión internacional.</div>
  <div class="postula_fase2-cuerpodos_fase2_bloque_q_entrega">Cofinanciamiento</div>
  <div class="postula_fase2-der_fase2">Empresas exportadoras</div>
  <div class="diviPuntoTexto_fase2">Nuevos mercados</div>
</body></html>"#;

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, dataset: &Path) -> Config {
    parse_config(&format!(
        r#"
[storage]
input-path = '{path}'
output-path = '{path}'

[crawler]
base-url = "{base}/programs"
inter-request-delay-seconds = 0

[detail]
checkpoint-every = 2
"#,
        path = dataset.display(),
        base = base_url
    ))
    .expect("Failed to parse test config")
}

fn record(name: &str, url: &str) -> ListingRecord {
    ListingRecord::new(name, url)
}

async fn mount_html(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_detail_pass_enriches_both_layouts() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("listings.csv");
    let config = create_test_config(&base, &dataset_path);

    mount_html(&mock_server, "/programs/semilla", LEGACY_PAGE).await;
    mount_html(&mock_server, "/programs/expande", CURRENT_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/programs/cerrado"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/programs/bases.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut store = IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::Url).unwrap();
    store
        .merge(vec![
            record("Semilla", &format!("{}/programs/semilla", base)),
            record("Expande", &format!("{}/programs/expande", base)),
            record("Cerrado", &format!("{}/programs/cerrado", base)),
            record("Sin enlace", NOT_AVAILABLE),
            record("Bases", &format!("{}/programs/bases.pdf", base)),
        ])
        .unwrap();

    let pass = DetailPass::new(&config).unwrap();
    let report = pass.run(&mut store).await.unwrap();

    assert_eq!(report.pending, 4);
    assert_eq!(report.enriched, 2);
    assert_eq!(report.failed, 2);
    assert_eq!(report.unrecognized, 0);

    let dataset = Dataset::load(&dataset_path).unwrap();
    assert!(dataset.has_details);
    assert_eq!(
        dataset.header().join(","),
        "id,name,opensAt,closesAt,scope,status,summary,url,detail,benefit,eligibility,results"
    );

    let legacy = dataset.records[0].details.as_ref().expect("legacy details");
    assert_eq!(legacy.detail, "Subsidio para validar ideas de negocio.");
    assert_eq!(legacy.benefit, "Hasta 15 millones");
    assert_eq!(legacy.eligibility, "Personas naturales");
    assert_eq!(legacy.results, "Prototipo validado");

    let current = dataset.records[1].details.as_ref().expect("current details");
    assert_eq!(current.detail, "Apoyo a la expansión internacional.");
    assert_eq!(current.benefit, "Cofinanciamiento");
    assert_eq!(current.eligibility, "Empresas exportadoras");
    assert_eq!(current.results, "Nuevos mercados");

    assert!(dataset.records[2].details.is_none());
    assert!(dataset.records[3].details.is_none());
    assert!(dataset.records[4].details.is_none());
}

#[tokio::test]
async fn test_detail_rerun_only_fetches_pending_records() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("listings.csv");
    let config = create_test_config(&base, &dataset_path);

    mount_html(&mock_server, "/programs/semilla", LEGACY_PAGE).await;
    Mock::given(method("GET"))
        .and(path("/programs/nuevo"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body><h1>Próximamente</h1></body></html>", "text/html"),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut store = IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::Url).unwrap();
    store
        .merge(vec![
            record("Semilla", &format!("{}/programs/semilla", base)),
            record("Nuevo", &format!("{}/programs/nuevo", base)),
        ])
        .unwrap();

    let pass = DetailPass::new(&config).unwrap();
    let first = pass.run(&mut store).await.unwrap();
    assert_eq!(first.enriched, 1);
    assert_eq!(first.unrecognized, 1);

    // a fresh store sees the persisted details and skips the enriched record
    let mut reopened =
        IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::Url).unwrap();
    let second = pass.run(&mut reopened).await.unwrap();
    assert_eq!(second.pending, 1);
    assert_eq!(second.enriched, 0);
    assert_eq!(second.unrecognized, 1);
}

#[tokio::test]
async fn test_detail_pass_on_empty_dataset_writes_header() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("listings.csv");
    let config = create_test_config(&mock_server.uri(), &dataset_path);

    let mut store = IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::Url).unwrap();
    let report = DetailPass::new(&config).unwrap().run(&mut store).await.unwrap();

    assert_eq!(report.pending, 0);
    let content = std::fs::read_to_string(&dataset_path).unwrap();
    assert_eq!(
        content.trim_end(),
        "id,name,opensAt,closesAt,scope,status,summary,url"
    );
}

#[test]
fn test_incremental_merge_across_runs() {
    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("data").join("listings.csv");

    let mut first = IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::Url).unwrap();
    assert_eq!(
        first
            .merge(vec![record("A", "https://listings.example.com/a")])
            .unwrap(),
        1
    );

    let mut second = IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::Url).unwrap();
    let added = second
        .merge(vec![
            record("A", "https://listings.example.com/a"),
            record("B", "https://listings.example.com/b"),
        ])
        .unwrap();
    assert_eq!(added, 1);

    let dataset = Dataset::load(&dataset_path).unwrap();
    let rows: Vec<(u64, &str)> = dataset
        .records
        .iter()
        .map(|r| (r.id, r.name.as_str()))
        .collect();
    assert_eq!(rows, vec![(1, "A"), (2, "B")]);
}

#[test]
fn test_name_url_dedup_refreshes_rows() {
    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("listings.csv");

    let mut store =
        IncrementalStore::open(&dataset_path, &dataset_path, DedupKey::NameUrl).unwrap();
    let mut open = record("A", "https://listings.example.com/a");
    open.status = "Abierta".to_string();
    store.merge(vec![open]).unwrap();

    let mut closed = record("A", "https://listings.example.com/a");
    closed.status = "Cerrada".to_string();
    let added = store.merge(vec![closed]).unwrap();

    assert_eq!(added, 0);
    let dataset = Dataset::load(&dataset_path).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.records[0].id, 1);
    assert_eq!(dataset.records[0].status, "Cerrada");
}

#[test]
fn test_load_config_from_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("harvest.toml");
    std::fs::write(
        &config_path,
        r##"
[storage]
input-path = "base.csv"
output-path = "tagged.csv"
dedup-key = "name+url"

[crawler]
base-url = "https://listings.example.com/programs"
max-retries = 5

[delays]
filter-apply-ms = 500

[[filter-groups]]
name = "profile"
menu-selector = "a[data-target='#collapse5']"
panel-selector = "#collapse5"
tags = [
  { name = "person", control-id = "asPerfilQuienSoy-persona-checkbox" },
]
"##,
    )
    .unwrap();

    let (config, hash) = load_config_with_hash(&config_path).unwrap();

    assert_eq!(hash.len(), 64);
    assert_eq!(config.storage.input_path, "base.csv");
    assert_eq!(config.storage.output_path, "tagged.csv");
    assert_eq!(config.storage.dedup_key, DedupKey::NameUrl);
    assert_eq!(config.crawler.max_retries, 5);
    assert_eq!(config.delays.filter_apply_ms, 500);
    assert_eq!(config.tag_names(), vec!["person".to_string()]);
    assert_eq!(
        config.site_root().unwrap().as_str(),
        "https://listings.example.com/"
    );
}

#[test]
fn test_run_mode_parsing() {
    assert_eq!("tags".parse::<RunMode>(), Ok(RunMode::Tags));
    assert!("everything".parse::<RunMode>().is_err());
}
