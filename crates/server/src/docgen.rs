//! Document rendering for extended-mode replies.
//!
//! A structured answer is rendered through an HTML template and converted
//! to PDF with wkhtmltopdf when the binary is on PATH. Without it the HTML
//! itself becomes the attachment, so the feature degrades instead of
//! failing.

use std::process::Stdio;

use deskmate_agent::DocumentSpec;
use tera::{Context, Tera};
use tokio::process::Command;
use tracing::{info, warn};

const SPEC_TEMPLATE: &str = "spec.html.tera";
const ACCENT_COLOR: &str = "#2563eb";

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(String),
    #[error("conversion error: {0}")]
    Conversion(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered document ready for file upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentArtifact {
    pub filename: String,
    pub title: String,
    pub bytes: Vec<u8>,
}

pub struct DocumentRenderer {
    tera: Tera,
    wkhtmltopdf_path: Option<String>,
}

impl DocumentRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            SPEC_TEMPLATE,
            include_str!("../../../templates/documents/spec.html.tera"),
        )
        .map_err(|e| RenderError::Template(e.to_string()))?;

        let wkhtmltopdf_path =
            which::which("wkhtmltopdf").ok().map(|p| p.to_string_lossy().to_string());

        match wkhtmltopdf_path {
            Some(ref path) => info!(path = %path, "wkhtmltopdf found"),
            None => {
                warn!("wkhtmltopdf not found in PATH - documents will be delivered as HTML")
            }
        }

        Ok(Self { tera, wkhtmltopdf_path })
    }

    /// Render one structured answer into an attachable artifact.
    pub async fn render(&self, spec: &DocumentSpec) -> Result<DocumentArtifact, RenderError> {
        let mut context = Context::new();
        context.insert("doc", spec);
        context.insert("primary_color", ACCENT_COLOR);
        context.insert("generated_at", &chrono::Utc::now().to_rfc3339());

        let html = self
            .tera
            .render(SPEC_TEMPLATE, &context)
            .map_err(|e| RenderError::Template(e.to_string()))?;

        let title = if spec.title.trim().is_empty() {
            "Specification Document".to_string()
        } else {
            spec.title.clone()
        };
        let stem = filename_stem(&title);

        if let Some(ref wkhtmltopdf) = self.wkhtmltopdf_path {
            match convert_html_to_pdf(&html, wkhtmltopdf).await {
                Ok(pdf_bytes) => {
                    return Ok(DocumentArtifact {
                        filename: format!("{stem}.pdf"),
                        title,
                        bytes: pdf_bytes,
                    });
                }
                Err(e) => {
                    warn!(error = %e, "PDF conversion failed, falling back to HTML");
                }
            }
        }

        Ok(DocumentArtifact {
            filename: format!("{stem}.html"),
            title,
            bytes: html.into_bytes(),
        })
    }
}

/// Lowercase alphanumeric slug of the title, safe for attachment names.
fn filename_stem(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "specification".to_string()
    } else {
        slug.chars().take(48).collect()
    }
}

async fn convert_html_to_pdf(html: &str, wkhtmltopdf_path: &str) -> Result<Vec<u8>, RenderError> {
    let temp_dir = std::env::temp_dir();
    let html_path = temp_dir.join(format!("deskmate_{}.html", uuid::Uuid::new_v4()));
    let pdf_path = temp_dir.join(format!("deskmate_{}.pdf", uuid::Uuid::new_v4()));

    let result = run_wkhtmltopdf(html, wkhtmltopdf_path, &html_path, &pdf_path).await;

    // Temp files are removed whether the conversion succeeded or not.
    let _ = tokio::fs::remove_file(&html_path).await;
    let _ = tokio::fs::remove_file(&pdf_path).await;

    let pdf_bytes = result?;
    info!(size = pdf_bytes.len(), "document PDF generated");
    Ok(pdf_bytes)
}

async fn run_wkhtmltopdf(
    html: &str,
    wkhtmltopdf_path: &str,
    html_path: &std::path::Path,
    pdf_path: &std::path::Path,
) -> Result<Vec<u8>, RenderError> {
    tokio::fs::write(html_path, html).await?;

    let output = Command::new(wkhtmltopdf_path)
        .arg("--page-size")
        .arg("A4")
        .arg("--margin-top")
        .arg("10mm")
        .arg("--margin-bottom")
        .arg("10mm")
        .arg("--margin-left")
        .arg("10mm")
        .arg("--margin-right")
        .arg("10mm")
        .arg("--encoding")
        .arg("utf-8")
        .arg(html_path)
        .arg(pdf_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RenderError::Conversion(stderr.to_string()));
    }

    Ok(tokio::fs::read(pdf_path).await?)
}
