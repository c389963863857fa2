//! In-memory dataset backed by a CSV file

use super::record::{DedupKey, DetailFields, ListingRecord, BASE_COLUMNS, DETAIL_COLUMNS};
use super::{StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Ordered records plus the optional column groups present in the file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    /// Tag columns in file order
    pub tag_columns: Vec<String>,
    /// Whether detail columns are written
    pub has_details: bool,
    pub records: Vec<ListingRecord>,
}

impl Dataset {
    /// Loads a dataset; a missing file yields an empty dataset
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No dataset at {}, starting empty", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let (tag_columns, has_details) = split_header(&headers)?;

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            // header is line 1
            let line = index + 2;
            records.push(parse_row(&row, &tag_columns, has_details, line)?);
        }

        tracing::debug!(
            "Loaded {} records from {} ({} tag columns)",
            records.len(),
            path.display(),
            tag_columns.len()
        );

        Ok(Self {
            tag_columns,
            has_details,
            records,
        })
    }

    /// Writes the dataset through a temporary file and renames it over `path`
    pub fn persist(&self, path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = temp_path(path);
        let written = self
            .write_csv(&tmp)
            .and_then(|()| fs::rename(&tmp, path).map_err(StoreError::from));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                tracing::debug!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e);
        }

        tracing::debug!("Persisted {} records to {}", self.records.len(), path.display());
        Ok(())
    }

    fn write_csv(&self, path: &Path) -> StoreResult<()> {
        let mut writer = csv::Writer::from_writer(File::create(path)?);

        writer.write_record(self.header())?;
        for record in &self.records {
            writer.write_record(self.row(record))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))?;
        file.sync_all()?;
        Ok(())
    }

    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = BASE_COLUMNS.iter().map(|c| c.to_string()).collect();
        header.extend(self.tag_columns.iter().cloned());
        if self.has_details {
            header.extend(DETAIL_COLUMNS.iter().map(|c| c.to_string()));
        }
        header
    }

    fn row(&self, record: &ListingRecord) -> Vec<String> {
        let mut row = vec![
            record.id.to_string(),
            record.name.clone(),
            record.opens_at.clone(),
            record.closes_at.clone(),
            record.scope.clone(),
            record.status.clone(),
            record.summary.clone(),
            record.url.clone(),
        ];
        for tag in &self.tag_columns {
            row.push(if record.has_tag(tag) { "1" } else { "0" }.to_string());
        }
        if self.has_details {
            let details = record.details.clone().unwrap_or_default();
            row.extend(details.values().iter().map(|v| v.to_string()));
        }
        row
    }

    /// Highest id in use, 0 when empty
    pub fn max_id(&self) -> u64 {
        self.records.iter().map(|r| r.id).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merges newly scraped records and returns how many were added
    ///
    /// New records receive consecutive ids after the current maximum, in
    /// the order given. A record whose key is already stored is dropped
    /// under `DedupKey::Url` and refreshes the stored row under
    /// `DedupKey::NameUrl`.
    pub fn merge_records(&mut self, incoming: Vec<ListingRecord>, dedup: DedupKey) -> usize {
        let mut index: HashMap<_, usize> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (dedup.key_of(record), position))
            .collect();

        let mut next_id = self.max_id() + 1;
        let mut added = 0;

        for mut record in incoming {
            let key = dedup.key_of(&record);
            match index.get(&key) {
                Some(&position) if dedup.last_write_wins() => {
                    self.records[position].refresh_from(record);
                }
                Some(_) => {
                    tracing::trace!("Skipping known record '{}'", record.name);
                }
                None => {
                    record.id = next_id;
                    next_id += 1;
                    record.tags.clear();
                    record.details = None;
                    index.insert(key, self.records.len());
                    self.records.push(record);
                    added += 1;
                }
            }
        }

        added
    }

    /// Adds any missing tag columns; existing flags are left alone
    pub fn ensure_tag_columns<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if !self.tag_columns.iter().any(|c| c == name) {
                self.tag_columns.push(name.to_string());
            }
        }
    }

    /// Sets `tag` on every record whose url is in `urls`
    ///
    /// Returns the number of flags that went from 0 to 1.
    pub fn apply_tag<S: AsRef<str>>(&mut self, urls: &[S], tag: &str) -> usize {
        self.ensure_tag_columns(&[tag]);

        let wanted: HashSet<&str> = urls.iter().map(|u| u.as_ref()).collect();
        let mut newly_set = 0;
        for record in self.records.iter_mut() {
            if record.has_url() && wanted.contains(record.url.as_str()) && !record.has_tag(tag) {
                record.tags.insert(tag.to_string(), true);
                newly_set += 1;
            }
        }
        newly_set
    }

    /// Stores detail fields on the record at `position`
    pub fn set_details(&mut self, position: usize, fields: DetailFields) {
        if let Some(record) = self.records.get_mut(position) {
            record.details = Some(fields);
            self.has_details = true;
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn split_header(headers: &[String]) -> StoreResult<(Vec<String>, bool)> {
    let base_matches = headers.len() >= BASE_COLUMNS.len()
        && headers.iter().zip(BASE_COLUMNS.iter()).all(|(h, c)| h == c);
    if !base_matches {
        return Err(StoreError::MalformedRow {
            line: 1,
            message: format!("expected header to start with {}", BASE_COLUMNS.join(",")),
        });
    }

    let rest = &headers[BASE_COLUMNS.len()..];
    let has_details = rest.len() >= DETAIL_COLUMNS.len()
        && rest[rest.len() - DETAIL_COLUMNS.len()..]
            .iter()
            .zip(DETAIL_COLUMNS.iter())
            .all(|(h, c)| h == c);

    let tag_end = if has_details {
        rest.len() - DETAIL_COLUMNS.len()
    } else {
        rest.len()
    };
    Ok((rest[..tag_end].to_vec(), has_details))
}

fn parse_row(
    row: &csv::StringRecord,
    tag_columns: &[String],
    has_details: bool,
    line: usize,
) -> StoreResult<ListingRecord> {
    let field = |i: usize| row.get(i).unwrap_or_default().to_string();

    let id = row
        .get(0)
        .unwrap_or_default()
        .trim()
        .parse::<u64>()
        .map_err(|e| StoreError::MalformedRow {
            line,
            message: format!("invalid id: {}", e),
        })?;

    let mut record = ListingRecord::new(field(1), field(7));
    record.id = id;
    record.opens_at = field(2);
    record.closes_at = field(3);
    record.scope = field(4);
    record.status = field(5);
    record.summary = field(6);

    for (offset, tag) in tag_columns.iter().enumerate() {
        let value = row.get(BASE_COLUMNS.len() + offset).unwrap_or_default().trim();
        let flag = match value {
            "1" => true,
            "0" | "" => false,
            other => {
                return Err(StoreError::MalformedRow {
                    line,
                    message: format!("tag '{}' has value '{}', expected 0 or 1", tag, other),
                })
            }
        };
        if flag {
            record.tags.insert(tag.clone(), true);
        }
    }

    if has_details {
        let start = BASE_COLUMNS.len() + tag_columns.len();
        let fields = DetailFields {
            detail: field(start),
            benefit: field(start + 1),
            eligibility: field(start + 2),
            results: field(start + 3),
        };
        // rows never enriched keep the placeholder in every column
        if fields.populated() > 0 {
            record.details = Some(fields);
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NOT_AVAILABLE;
    use tempfile::TempDir;

    fn record(name: &str, url: &str) -> ListingRecord {
        ListingRecord::new(name, url)
    }

    fn stored(id: u64, name: &str, url: &str) -> ListingRecord {
        let mut r = record(name, url);
        r.id = id;
        r
    }

    #[test]
    fn test_merge_scenario() {
        let mut dataset = Dataset {
            records: vec![stored(1, "A", "https://x.example/a")],
            ..Default::default()
        };

        let added = dataset.merge_records(
            vec![record("A", "https://x.example/a"), record("B", "https://x.example/b")],
            DedupKey::Url,
        );

        assert_eq!(added, 1);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.records[1].id, 2);
        assert_eq!(dataset.records[1].name, "B");
    }

    #[test]
    fn test_merge_into_empty_starts_at_one() {
        let mut dataset = Dataset::default();
        let added = dataset.merge_records(
            vec![record("A", "https://x.example/a"), record("B", "https://x.example/b")],
            DedupKey::Url,
        );
        assert_eq!(added, 2);
        let ids: Vec<u64> = dataset.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_ids_continue_after_gaps() {
        let mut dataset = Dataset {
            records: vec![stored(3, "A", "https://x.example/a"), stored(9, "B", "https://x.example/b")],
            ..Default::default()
        };
        dataset.merge_records(vec![record("C", "https://x.example/c")], DedupKey::Url);
        assert_eq!(dataset.records[2].id, 10);
    }

    #[test]
    fn test_duplicates_within_batch() {
        let mut dataset = Dataset::default();
        let added = dataset.merge_records(
            vec![
                record("A", "https://x.example/a"),
                record("A again", "https://x.example/a"),
            ],
            DedupKey::Url,
        );
        assert_eq!(added, 1);
        assert_eq!(dataset.records[0].name, "A");
    }

    #[test]
    fn test_placeholder_urls_are_not_collapsed() {
        let mut dataset = Dataset::default();
        let added = dataset.merge_records(
            vec![record("A", NOT_AVAILABLE), record("B", NOT_AVAILABLE)],
            DedupKey::Url,
        );
        assert_eq!(added, 2);

        let added = dataset.merge_records(vec![record("A", NOT_AVAILABLE)], DedupKey::Url);
        assert_eq!(added, 0);
    }

    #[test]
    fn test_name_url_last_write_wins() {
        let mut existing = stored(4, "A", "https://x.example/a");
        existing.status = "Abierta".to_string();
        existing.tags.insert("person".to_string(), true);
        let mut dataset = Dataset {
            tag_columns: vec!["person".to_string()],
            records: vec![existing],
            ..Default::default()
        };

        let mut update = record("A", "https://x.example/a");
        update.status = "Cerrada".to_string();
        let renamed = record("A (2024)", "https://x.example/a");

        let added = dataset.merge_records(vec![update, renamed], DedupKey::NameUrl);

        assert_eq!(added, 1);
        assert_eq!(dataset.records[0].id, 4);
        assert_eq!(dataset.records[0].status, "Cerrada");
        assert!(dataset.records[0].has_tag("person"));
        assert_eq!(dataset.records[1].id, 5);
        assert_eq!(dataset.records[1].name, "A (2024)");
    }

    #[test]
    fn test_apply_tag_only_sets_flags() {
        let mut dataset = Dataset {
            records: vec![
                stored(1, "A", "https://x.example/a"),
                stored(2, "B", "https://x.example/b"),
                stored(3, "C", NOT_AVAILABLE),
            ],
            ..Default::default()
        };

        let set = dataset.apply_tag(&["https://x.example/a", NOT_AVAILABLE], "person");
        assert_eq!(set, 1);
        assert_eq!(dataset.tag_columns, vec!["person"]);
        assert!(dataset.records[0].has_tag("person"));
        assert!(!dataset.records[2].has_tag("person"));

        // tagging again with a smaller set never clears a flag
        let set = dataset.apply_tag(&["https://x.example/b"], "person");
        assert_eq!(set, 1);
        assert!(dataset.records[0].has_tag("person"));
        assert!(dataset.records[1].has_tag("person"));
    }

    #[test]
    fn test_ensure_tag_columns_keeps_flags() {
        let mut dataset = Dataset::default();
        dataset.merge_records(vec![record("A", "https://x.example/a")], DedupKey::Url);
        dataset.apply_tag(&["https://x.example/a"], "company");

        dataset.ensure_tag_columns(&["person", "company"]);

        assert_eq!(dataset.tag_columns, vec!["company", "person"]);
        assert!(dataset.records[0].has_tag("company"));
        assert!(!dataset.records[0].has_tag("person"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let dataset = Dataset::load(&dir.path().join("absent.csv")).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_persist_and_load_preserve_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("listings.csv");

        let mut dataset = Dataset::default();
        let mut a = record("Fondo, \"Semilla\"", "https://x.example/a");
        a.summary = "Línea uno\nLínea dos".to_string();
        dataset.merge_records(vec![a, record("B", "https://x.example/b")], DedupKey::Url);
        dataset.ensure_tag_columns(&["stage", "person"]);
        dataset.apply_tag(&["https://x.example/b"], "person");
        let mut fields = DetailFields::default();
        fields.benefit = "Mentorías".to_string();
        dataset.set_details(0, fields);

        dataset.persist(&path).unwrap();
        assert!(!dir.path().join("out").join("listings.csv.tmp").exists());

        let loaded = Dataset::load(&path).unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(
            loaded.header().join(","),
            "id,name,opensAt,closesAt,scope,status,summary,url,stage,person,detail,benefit,eligibility,results"
        );
        assert!(loaded.records[1].details.is_none());
    }

    #[test]
    fn test_failed_persist_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listings.csv");
        fs::create_dir(&path).unwrap();

        let mut dataset = Dataset::default();
        dataset.merge_records(vec![record("A", "https://x.example/a")], DedupKey::Url);

        assert!(dataset.persist(&path).is_err());
        assert!(path.is_dir());
        assert!(!dir.path().join("listings.csv.tmp").exists());
    }

    #[test]
    fn test_load_tolerates_bom() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listings.csv");
        fs::write(
            &path,
            "\u{feff}id,name,opensAt,closesAt,scope,status,summary,url\n\
             1,A,01/03/2024,30/04/2024,Nacional,Abierta,Apoyo,https://x.example/a\n",
        )
        .unwrap();

        let dataset = Dataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records[0].scope, "Nacional");
        assert!(dataset.tag_columns.is_empty());
        assert!(!dataset.has_details);
    }

    #[test]
    fn test_load_rejects_bad_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listings.csv");
        fs::write(&path, "name,url\nA,https://x.example/a\n").unwrap();
        assert!(matches!(
            Dataset::load(&path),
            Err(StoreError::MalformedRow { line: 1, .. })
        ));
    }

    #[test]
    fn test_load_rejects_bad_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("listings.csv");
        fs::write(
            &path,
            "id,name,opensAt,closesAt,scope,status,summary,url\n\
             x,A,-,-,-,-,-,https://x.example/a\n",
        )
        .unwrap();
        assert!(matches!(
            Dataset::load(&path),
            Err(StoreError::MalformedRow { line: 2, .. })
        ));
    }
}
