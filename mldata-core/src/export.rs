// mldata-core/src/export.rs

//! Writing a dataset to a local folder.
//!
//! Layout of an export:
//!
//! ```text
//! folder/
//!   metadata.json | metadata.csv         per-element metadata keyed by file name
//!   dataset_info.json | dataset_info.csv collection-level fields and count
//!   content/<file name>                  raw stored content of each element
//! ```
//!
//! File names are element identifiers, or zero-based positions when
//! numbered ids are requested, plus the optional extension.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::dataset::{Dataset, Element};
use crate::error::{ClientError, Result};

/// Format of the metadata files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetadataFormat {
    #[default]
    Json,
    Csv,
}

impl MetadataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataFormat::Json => "json",
            MetadataFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetadataFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(MetadataFormat::Json),
            "csv" => Ok(MetadataFormat::Csv),
            _ => Err(ClientError::invalid_argument(format!(
                "format {} for metadata not supported",
                s
            ))),
        }
    }
}

/// Options for [`Dataset::save_to_folder`].
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub format: MetadataFormat,
    /// Appended to every content file name. A leading `.` is ignored.
    pub extension: Option<String>,
    /// Name files `0`, `1`, ... in iteration order instead of by identifier.
    pub numbered_ids: bool,
    /// Skip the `content/` directory.
    pub only_metadata: bool,
}

impl ExportOptions {
    fn file_name(&self, position: usize, id: &str) -> String {
        let stem = if self.numbered_ids {
            position.to_string()
        } else {
            id.to_string()
        };
        match self.extension.as_deref().map(|e| e.strip_prefix('.').unwrap_or(e)) {
            Some(ext) if !ext.is_empty() => format!("{}.{}", stem, ext),
            _ => stem,
        }
    }
}

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub folder: PathBuf,
    pub elements: usize,
    pub content_files: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ElementMetadata {
    id: String,
    title: String,
    description: String,
    http_ref: String,
    tags: Vec<String>,
}

impl From<&Element> for ElementMetadata {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id().to_string(),
            title: element.title().to_string(),
            description: element.description().to_string(),
            http_ref: element.http_ref().to_string(),
            tags: element.tags().to_vec(),
        }
    }
}

/// File-name keyed metadata, serialised as a map in iteration order.
struct MetadataEntries<'a>(&'a [(String, ElementMetadata)]);

impl Serialize for MetadataEntries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (file_name, metadata) in self.0 {
            map.serialize_entry(file_name, metadata)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
struct DatasetInfo<'a> {
    url_prefix: &'a str,
    title: &'a str,
    description: &'a str,
    reference: &'a str,
    tags: &'a [String],
    num_elements: usize,
}

impl<'a> From<&'a Dataset> for DatasetInfo<'a> {
    fn from(dataset: &'a Dataset) -> Self {
        Self {
            url_prefix: dataset.url_prefix(),
            title: dataset.title(),
            description: dataset.description(),
            reference: dataset.reference(),
            tags: dataset.tags(),
            num_elements: dataset.len(),
        }
    }
}

impl Dataset {
    /// Exports metadata and, unless `only_metadata` is set, the raw content
    /// of every element into `folder`, creating it if needed.
    ///
    /// Content files are written while iterating, so at most the current
    /// and the prefetched page are held in memory. Metadata files are
    /// written once every element has been visited.
    pub async fn save_to_folder(
        &self,
        folder: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<ExportSummary> {
        let folder = folder.as_ref();
        create_dir(folder).await?;

        let content_dir = folder.join("content");
        if !options.only_metadata {
            create_dir(&content_dir).await?;
        }

        tracing::info!("exporting {} elements of {}", self.len(), self.url_prefix());
        let total = self.len().max(1);
        let mut reported = 0;
        let mut content_files = 0;
        let mut entries = Vec::with_capacity(self.len());
        let mut stream = self.iter();
        while let Some(element) = stream.next_element().await? {
            let file_name = options.file_name(entries.len(), element.id());
            if !options.only_metadata {
                let path = content_path(&content_dir, &file_name)?;
                let content = element.raw_content().await?;
                write_file(&path, &content).await?;
                content_files += 1;

                let percent = (content_files * 100 / total).min(100);
                if percent / 10 > reported / 10 {
                    reported = percent;
                    tracing::info!("progress: {}%", percent);
                }
            }
            entries.push((file_name, ElementMetadata::from(&element)));
        }

        let info = DatasetInfo::from(self);
        let (metadata, dataset_info) = match options.format {
            MetadataFormat::Json => (render_metadata_json(&entries)?, render_info_json(&info)?),
            MetadataFormat::Csv => (render_metadata_csv(&entries), render_info_csv(&info)),
        };
        let ext = options.format.as_str();
        write_file(&folder.join(format!("metadata.{}", ext)), &metadata).await?;
        write_file(&folder.join(format!("dataset_info.{}", ext)), &dataset_info).await?;
        tracing::info!(
            "finished export of {} elements of {} to {}",
            entries.len(),
            self.url_prefix(),
            folder.display()
        );

        Ok(ExportSummary {
            folder: folder.to_path_buf(),
            elements: entries.len(),
            content_files,
        })
    }
}

/// `dir/file_name`, provided `file_name` is a single plain path component.
fn content_path(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(file_name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !plain || file_name.contains(['/', '\\']) {
        return Err(ClientError::invalid_argument(format!(
            "element file name {:?} is not a plain file name",
            file_name
        )));
    }
    Ok(dir.join(file_name))
}

async fn create_dir(path: &Path) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| ClientError::io(path, "failed to create directory", e))
}

async fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data)
        .await
        .map_err(|e| ClientError::io(path, "failed to write file", e))
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| ClientError::serialization(format!("failed to encode export JSON: {}", e)))?;
    Ok(out)
}

fn render_metadata_json(entries: &[(String, ElementMetadata)]) -> Result<Vec<u8>> {
    to_pretty_json(&MetadataEntries(entries))
}

fn render_info_json(info: &DatasetInfo<'_>) -> Result<Vec<u8>> {
    to_pretty_json(info)
}

fn render_metadata_csv(entries: &[(String, ElementMetadata)]) -> Vec<u8> {
    let mut out = Vec::new();
    write_csv_row(
        &mut out,
        &["file_name", "id", "title", "description", "http_ref", "tags"],
    );
    for (file_name, metadata) in entries {
        let tags = quote_tags(&metadata.tags);
        write_csv_row(
            &mut out,
            &[
                file_name.as_str(),
                metadata.id.as_str(),
                metadata.title.as_str(),
                metadata.description.as_str(),
                metadata.http_ref.as_str(),
                tags.as_str(),
            ],
        );
    }
    out
}

fn render_info_csv(info: &DatasetInfo<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    write_csv_row(
        &mut out,
        &["url_prefix", "title", "description", "num_elements", "reference", "tags"],
    );
    let num_elements = info.num_elements.to_string();
    let tags = quote_tags(info.tags);
    write_csv_row(
        &mut out,
        &[
            info.url_prefix,
            info.title,
            info.description,
            num_elements.as_str(),
            info.reference,
            tags.as_str(),
        ],
    );
    out
}

/// Tags as one `'a;b;c'` cell.
fn quote_tags(tags: &[String]) -> String {
    format!("'{}'", tags.join(";"))
}

fn write_csv_row(out: &mut Vec<u8>, cells: &[&str]) {
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_csv_cell(out, cell.as_bytes());
    }
    out.extend_from_slice(b"\r\n");
}

/// RFC 4180: quote only cells containing `,`, `"`, `\n` or `\r`, doubling
/// inner quotes.
fn write_csv_cell(out: &mut Vec<u8>, cell: &[u8]) {
    let needs_quoting = cell
        .iter()
        .any(|&b| b == b',' || b == b'"' || b == b'\n' || b == b'\r');

    if !needs_quoting {
        out.extend_from_slice(cell);
        return;
    }

    out.push(b'"');
    for &b in cell {
        if b == b'"' {
            out.push(b'"');
        }
        out.push(b);
    }
    out.push(b'"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::ClientConfig;
    use crate::content::LengthPrefixedBundle;
    use crate::testing::{MockApi, PREFIX};
    use std::sync::Arc;

    async fn open(api: &Arc<MockApi>) -> Dataset {
        let client = Client::with_api(
            ClientConfig::default(),
            api.clone(),
            Arc::new(LengthPrefixedBundle::new()),
        )
        .await
        .unwrap();
        client.dataset(PREFIX).await.unwrap()
    }

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<MetadataFormat>().unwrap(), MetadataFormat::Json);
        assert_eq!("CSV".parse::<MetadataFormat>().unwrap(), MetadataFormat::Csv);

        let err = "xml".parse::<MetadataFormat>().unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { .. }));
    }

    #[test]
    fn test_file_names() {
        let mut options = ExportOptions::default();
        assert_eq!(options.file_name(3, "5f1c"), "5f1c");

        options.extension = Some(".png".to_string());
        assert_eq!(options.file_name(3, "5f1c"), "5f1c.png");

        options.numbered_ids = true;
        options.extension = Some("jpg".to_string());
        assert_eq!(options.file_name(3, "5f1c"), "3.jpg");
    }

    #[test]
    fn test_csv_quoting() {
        let mut out = Vec::new();
        write_csv_row(&mut out, &["plain", "a,b", "say \"hi\"", "two\nlines"]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\"\r\n"
        );
    }

    #[tokio::test]
    async fn test_json_export() {
        let api = Arc::new(MockApi::with_elements(2, &["a", "b", "c"]));
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("out");

        let summary = dataset
            .save_to_folder(&folder, &ExportOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.elements, 3);
        assert_eq!(summary.content_files, 3);

        let metadata = read(&folder.join("metadata.json"));
        assert!(metadata.starts_with("{\n    \"a\": {\n        \"id\": \"a\",\n"));
        let parsed: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(parsed["b"]["title"], "title b");
        assert_eq!(parsed["c"]["tags"], serde_json::json!(["tag", "c"]));
        // Keys keep iteration order.
        let a = metadata.find("\"a\":").unwrap();
        let b = metadata.find("\"b\":").unwrap();
        let c = metadata.find("\"c\":").unwrap();
        assert!(a < b && b < c);

        let info: serde_json::Value =
            serde_json::from_str(&read(&folder.join("dataset_info.json"))).unwrap();
        assert_eq!(info["url_prefix"], PREFIX);
        assert_eq!(info["num_elements"], 3);
        assert_eq!(info["tags"], serde_json::json!(["animals", "cats"]));

        for id in ["a", "b", "c"] {
            let content = std::fs::read(folder.join("content").join(id)).unwrap();
            assert_eq!(content, api.content_of(id).to_vec());
        }
    }

    #[tokio::test]
    async fn test_csv_export_numbered_with_extension() {
        let api = Arc::new(MockApi::with_elements(2, &["a", "b"]));
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();

        let options = ExportOptions {
            format: MetadataFormat::Csv,
            extension: Some(".bin".to_string()),
            numbered_ids: true,
            only_metadata: false,
        };
        dataset.save_to_folder(dir.path(), &options).await.unwrap();

        assert_eq!(
            read(&dir.path().join("metadata.csv")),
            "file_name,id,title,description,http_ref,tags\r\n\
             0.bin,a,title a,description a,http://example.org/a,'tag;a'\r\n\
             1.bin,b,title b,description b,http://example.org/b,'tag;b'\r\n"
        );
        assert_eq!(
            read(&dir.path().join("dataset_info.csv")),
            "url_prefix,title,description,num_elements,reference,tags\r\n\
             alice/cats,Cats,Pictures of cats,2,none,'animals;cats'\r\n"
        );
        assert!(dir.path().join("content").join("1.bin").exists());
    }

    #[tokio::test]
    async fn test_only_metadata_skips_content() {
        let api = Arc::new(MockApi::with_elements(2, &["a", "b"]));
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();

        let options = ExportOptions {
            only_metadata: true,
            ..Default::default()
        };
        let summary = dataset.save_to_folder(dir.path(), &options).await.unwrap();

        assert_eq!(summary.content_files, 0);
        assert!(dir.path().join("metadata.json").exists());
        assert!(!dir.path().join("content").exists());
    }

    #[tokio::test]
    async fn test_export_writes_raw_content() {
        let api = Arc::new(MockApi::with_elements(2, &["a"]));
        let mut dataset = open(&api).await;
        dataset.set_binary_interpreter(Some(Arc::new(crate::testing::XorInterpreter(7))));
        let dir = tempfile::tempdir().unwrap();

        dataset
            .save_to_folder(dir.path(), &ExportOptions::default())
            .await
            .unwrap();

        let content = std::fs::read(dir.path().join("content").join("a")).unwrap();
        assert_eq!(content, api.content_of("a").to_vec());
    }

    #[test]
    fn test_content_path_rejects_escaping_names() {
        let dir = Path::new("out/content");
        assert_eq!(content_path(dir, "5f1c.png").unwrap(), dir.join("5f1c.png"));

        for name in ["../escaped", "..", ".", "", "a/b", "a\\b", "/etc/passwd"] {
            let err = content_path(dir, name).unwrap_err();
            assert!(matches!(err, ClientError::InvalidArgument { .. }), "{:?}", name);
        }
    }

    #[tokio::test]
    async fn test_export_refuses_id_outside_content_dir() {
        let api = Arc::new(MockApi::with_elements(2, &["a"]));
        api.push_element("../escaped");
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("out");

        let err = dataset
            .save_to_folder(&folder, &ExportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidArgument { .. }));
        assert!(!folder.join("escaped").exists());
        assert!(!dir.path().join("escaped").exists());
    }

    #[tokio::test]
    async fn test_numbered_ids_export_any_identifier() {
        let api = Arc::new(MockApi::with_elements(2, &["a"]));
        api.push_element("../escaped");
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();

        let options = ExportOptions {
            numbered_ids: true,
            ..Default::default()
        };
        let summary = dataset.save_to_folder(dir.path(), &options).await.unwrap();

        assert_eq!(summary.content_files, 2);
        let content = std::fs::read(dir.path().join("content").join("1")).unwrap();
        assert_eq!(content, api.content_of("../escaped").to_vec());
    }

    #[tokio::test]
    async fn test_export_over_many_pages() {
        let ids = ["a", "b", "c", "d", "e", "f", "g"];
        let api = Arc::new(MockApi::with_elements(2, &ids));
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();

        let summary = dataset
            .save_to_folder(dir.path(), &ExportOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.elements, ids.len());
        assert_eq!(summary.content_files, ids.len());

        // One content bundle per page.
        let requests = api.content_requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|ids| ids.len() <= 2));
        for id in ids {
            let content = std::fs::read(dir.path().join("content").join(id)).unwrap();
            assert_eq!(content, api.content_of(id).to_vec());
        }
    }

    #[tokio::test]
    async fn test_content_failure_aborts_export() {
        let api = Arc::new(MockApi::with_elements(2, &["a"]));
        api.fail_content(true);
        let dataset = open(&api).await;
        let dir = tempfile::tempdir().unwrap();

        let err = dataset
            .save_to_folder(dir.path(), &ExportOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Content { .. }));
    }
}
