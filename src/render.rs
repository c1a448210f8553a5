use std::path::Path;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, error, info};

use crate::contract::{FileContent, FileInfo, RenderedPage, Renderer};
use crate::error::RenderError;

/// Default per-file byte budget.
pub const MAX_DEFAULT_BYTES: u64 = 50 * 1024;

/// Bytes inspected for NUL when sniffing binary files.
const BINARY_SNIFF_LEN: usize = 8192;

const PAGE_TEMPLATE_NAME: &str = "page.html";

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ repo_url }}</title>
<style>
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 0 auto; max-width: 1100px; padding: 1rem 2rem; }
pre { background: #f6f8fa; padding: 1rem; overflow-x: auto; font-size: 0.85rem; }
nav ul { columns: 2; }
.meta { color: #57606a; }
</style>
</head>
<body>
<header>
<h1>{{ repo_url }}</h1>
<p class="meta">Revision: <code>{{ revision }}</code> | Snapshot: <code>{{ snapshot }}</code> | {{ rendered | length }} files rendered | {{ skipped | length }} skipped</p>
</header>
<nav>
<h2>Contents</h2>
<ul>
{% for f in rendered %}<li><a href="#file-{{ loop.index }}">{{ f.path }}</a> ({{ f.size }} bytes)</li>
{% endfor %}</ul>
</nav>
{% for f in rendered %}<section id="file-{{ loop.index }}">
<h2>{{ f.path }}</h2>
<pre><code>{{ f.text }}</code></pre>
</section>
{% endfor %}{% if skipped %}<section>
<h2>Skipped files</h2>
<ul>
{% for f in skipped %}<li>{{ f.path }} ({{ f.reason }}, {{ f.size }} bytes)</li>
{% endfor %}</ul>
</section>
{% endif %}</body>
</html>
"##;

#[derive(Serialize)]
struct RenderedFile<'a> {
    path: &'a str,
    size: u64,
    text: &'a str,
}

#[derive(Serialize)]
struct SkippedFile<'a> {
    path: &'a str,
    size: u64,
    reason: &'static str,
}

/// Default [`Renderer`]: walks the repository and renders it through a Tera template.
pub struct HtmlRenderer {
    tera: Tera,
}

impl HtmlRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { tera })
    }
}

impl Renderer for HtmlRenderer {
    fn collect_files(&self, directory: &Path, max_bytes: u64) -> Result<Vec<FileInfo>, RenderError> {
        info!(path = %directory.display(), max_bytes = max_bytes, "Collecting repository files");
        let mut files = Vec::new();
        if let Err(e) = visit_dir(directory, directory, max_bytes, &mut files) {
            error!(error = ?e, path = %directory.display(), "Error occurred while collecting files");
            return Err(e.into());
        }
        Ok(files)
    }

    fn build_html(
        &self,
        repo_url: &str,
        directory: &Path,
        revision: &str,
        files: &[FileInfo],
    ) -> Result<RenderedPage, RenderError> {
        let mut rendered = Vec::new();
        let mut skipped = Vec::new();
        for f in files {
            match &f.content {
                FileContent::Text(text) => rendered.push(RenderedFile {
                    path: &f.path,
                    size: f.size,
                    text,
                }),
                FileContent::Binary => skipped.push(SkippedFile {
                    path: &f.path,
                    size: f.size,
                    reason: "binary",
                }),
                FileContent::TooLarge => skipped.push(SkippedFile {
                    path: &f.path,
                    size: f.size,
                    reason: "too large",
                }),
            }
        }

        let snapshot = directory
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut ctx = Context::new();
        ctx.insert("repo_url", repo_url);
        ctx.insert("revision", revision);
        ctx.insert("snapshot", &snapshot);
        ctx.insert("rendered", &rendered);
        ctx.insert("skipped", &skipped);

        let html = self.tera.render(PAGE_TEMPLATE_NAME, &ctx)?;
        Ok(RenderedPage::new(html))
    }
}

fn visit_dir(
    dir: &Path,
    root: &Path,
    max_bytes: u64,
    results: &mut Vec<FileInfo>,
) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        let meta = std::fs::symlink_metadata(&path)?;
        if meta.is_dir() {
            if path.file_name().is_some_and(|n| n == ".git") {
                debug!(path = %path.display(), "Skipping directory");
                continue;
            }
            visit_dir(&path, root, max_bytes, results)?;
        } else if meta.is_file() {
            let rel = path.strip_prefix(root).unwrap_or(&path);
            let rel_path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let size = meta.len();
            let content = if size > max_bytes {
                FileContent::TooLarge
            } else {
                classify(std::fs::read(&path)?)
            };
            debug!(path = %rel_path, size = size, "Collected file");
            results.push(FileInfo {
                path: rel_path,
                size,
                content,
            });
        }
    }
    Ok(())
}

fn classify(bytes: Vec<u8>) -> FileContent {
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return FileContent::Binary;
    }
    match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text(text),
        Err(_) => FileContent::Binary,
    }
}
