//! Source loading and text extraction.
//!
//! A source reference is either an `http(s)://` URL or a local path. Every
//! loader yields "normalized text": trimmed, non-empty lines joined by `\n`.

use cairn_core::{AppError, AppResult};
use scraper::{Html, Node};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Browser user-agent; some wikis reject unknown clients.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Elements whose content never reaches the text.
const SKIPPED_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }
}

/// Where a source reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Url(String),
    Path(PathBuf),
}

impl SourceRef {
    pub fn parse(reference: &str) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else {
            Self::Path(PathBuf::from(trimmed))
        }
    }
}

/// Normalized text of one loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// URL or file path, recorded on every passage
    pub source: String,
    pub text: String,
}

/// Loads source references into normalized text.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    client: reqwest::Client,
}

impl SourceLoader {
    pub fn new() -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| AppError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Load a reference. A directory yields one document per readable file.
    pub async fn load(&self, reference: &str) -> AppResult<Vec<SourceDocument>> {
        match SourceRef::parse(reference) {
            SourceRef::Url(url) => Ok(vec![self.fetch_url(&url).await?]),
            SourceRef::Path(path) => load_path(&path),
        }
    }

    async fn fetch_url(&self, url: &str) -> AppResult<SourceDocument> {
        tracing::debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::malformed_source(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::malformed_source(url, format!("HTTP {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| AppError::malformed_source(url, e.to_string()))?;

        Ok(SourceDocument {
            source: url.to_string(),
            text: html_to_text(&html),
        })
    }
}

fn load_path(path: &Path) -> AppResult<Vec<SourceDocument>> {
    if path.is_file() {
        return Ok(vec![parse_file(path)?]);
    }

    if !path.is_dir() {
        return Err(AppError::malformed_source(
            path.display().to_string(),
            "no such file or directory",
        ));
    }

    let mut documents = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        match parse_file(entry.path()) {
            Ok(doc) => documents.push(doc),
            Err(e) => tracing::warn!("Skipping {:?}: {}", entry.path(), e),
        }
    }

    Ok(documents)
}

/// Parse a source file and extract normalized text.
pub fn parse_file(path: &Path) -> AppResult<SourceDocument> {
    let source = path.display().to_string();

    let bytes = fs::read(path).map_err(|e| AppError::malformed_source(&source, e.to_string()))?;
    let raw = String::from_utf8(bytes)
        .map_err(|_| AppError::malformed_source(&source, "binary file not supported"))?;

    let text = match ContentType::from_path(path) {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => html_to_text(&raw),
        ContentType::PlainText => normalize_text(&raw),
        ContentType::Unknown => {
            if !is_likely_text(&raw) {
                return Err(AppError::malformed_source(&source, "binary file not supported"));
            }
            normalize_text(&raw)
        }
    };

    Ok(SourceDocument { source, text })
}

/// Trim every line and drop the empty ones.
pub fn normalize_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean markdown by removing heading markers, rules and code fences.
fn clean_markdown(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_start().trim_start_matches('#').trim())
        .filter(|line| {
            !(line.is_empty()
                || line.starts_with("---")
                || line.starts_with("```")
                || line.starts_with("~~~"))
        })
        .collect();
    lines.join("\n")
}

/// Reduce an HTML page to normalized text.
///
/// Skipped elements are dropped with their content; every text node ends its
/// own line, so adjacent elements never run together.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 2);

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let skipped = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(e) if SKIPPED_ELEMENTS.contains(&e.name()))
        });
        if !skipped {
            out.push_str(&text.replace('\u{a0}', " "));
            out.push('\n');
        }
    }

    normalize_text(&out)
}

/// Check if content is likely text (not binary).
fn is_likely_text(content: &str) -> bool {
    let sample: Vec<char> = content.chars().take(1000).collect();
    if sample.is_empty() {
        return true;
    }
    let control = sample
        .iter()
        .filter(|c| c.is_control() && !c.is_whitespace())
        .count();
    control * 10 < sample.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_source_ref_parse() {
        assert_eq!(
            SourceRef::parse("https://es.wikipedia.org/wiki/Argentina"),
            SourceRef::Url("https://es.wikipedia.org/wiki/Argentina".to_string())
        );
        assert_eq!(
            SourceRef::parse("docs/historia.md"),
            SourceRef::Path(PathBuf::from("docs/historia.md"))
        );
    }

    #[test]
    fn test_html_to_text_drops_scripts_and_tags() {
        let html = r#"<html><head><title>Argentina</title>
            <style>body { color: red; }</style>
            <SCRIPT type="text/javascript">var x = "<p>no</p>";</SCRIPT></head>
            <body><h1>Historia</h1><!-- comentario -->
            <p>La <b>Revolución</b> de Mayo &amp; la independencia.</p>
            <noscript>Activá JavaScript</noscript>
            <p>  Año&nbsp;1816 &#8212; Tucumán  </p></body></html>"#;

        let text = html_to_text(html);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Argentina",
                "Historia",
                "La",
                "Revolución",
                "de Mayo & la independencia.",
                "Año 1816 — Tucumán",
            ]
        );
    }

    #[test]
    fn test_html_unclosed_script_drops_rest() {
        assert_eq!(html_to_text("<p>Antes</p><script>var a = 1;"), "Antes");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(html_to_text("<p>AT&T &foo; &#65;</p>"), "AT&T &foo; A");
    }

    #[test]
    fn test_html_named_entities_and_attribute_brackets() {
        let html = r#"<p>Jos&eacute; de San Mart&iacute;n cruz&oacute; los Andes</p><img alt="1 > 0">Texto"#;
        assert_eq!(html_to_text(html), "José de San Martín cruzó los Andes\nTexto");
    }

    #[test]
    fn test_parse_markdown_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("notas.md");
        fs::write(&file, "# Título\n\n```\ncode\n```\n\n  Párrafo uno.  \n---\nPárrafo dos.\n").unwrap();

        let doc = parse_file(&file).unwrap();
        assert_eq!(doc.text, "Título\ncode\nPárrafo uno.\nPárrafo dos.");
        assert!(doc.source.ends_with("notas.md"));
    }

    #[test]
    fn test_binary_file_is_malformed_source() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("imagen.bin");
        fs::write(&file, [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let err = parse_file(&file).unwrap_err();
        assert!(matches!(err, AppError::MalformedSource { .. }));
    }

    #[tokio::test]
    async fn test_load_directory_walks_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), "Primero").unwrap();
        fs::write(dir.path().join("sub").join("b.md"), "## Segundo").unwrap();

        let loader = SourceLoader::new().unwrap();
        let docs = loader.load(dir.path().to_str().unwrap()).await.unwrap();

        let texts: Vec<&str> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["Primero", "Segundo"]);
    }

    #[tokio::test]
    async fn test_missing_path_is_malformed_source() {
        let loader = SourceLoader::new().unwrap();
        let err = loader.load("/definitely/not/here").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedSource { .. }));
    }

    #[tokio::test]
    async fn test_fetch_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Argentina"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<p>República Argentina</p>"),
            )
            .mount(&server)
            .await;

        let loader = SourceLoader::new().unwrap();
        let url = format!("{}/wiki/Argentina", server.uri());
        let docs = loader.load(&url).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, url);
        assert_eq!(docs[0].text, "República Argentina");
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_malformed_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let loader = SourceLoader::new().unwrap();
        let err = loader
            .load(&format!("{}/wiki/Nada", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
