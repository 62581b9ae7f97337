//! Image export through the Mermaid CLI (`mmdc`).
//!
//! Takes finished diagram text and returns the rendered image bytes. This
//! runs after rendering and fails independently of it.

use anyhow::{bail, Context};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;

/// Image formats `mmdc` can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
    Pdf,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
            ImageFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "svg" => Ok(ImageFormat::Svg),
            "png" => Ok(ImageFormat::Png),
            "pdf" => Ok(ImageFormat::Pdf),
            _ => Err(format!(
                "Unknown image format: {}. Valid options: svg, png, pdf",
                s
            )),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Options passed through to `mmdc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Mermaid theme: default, dark, forest or neutral
    pub theme: String,
    /// Background color, e.g. `white` or `transparent`
    pub background: String,
    /// Scale factor (PNG only)
    pub scale: u32,
    /// Program to run
    pub command: PathBuf,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            background: "white".to_string(),
            scale: 2,
            command: PathBuf::from("mmdc"),
        }
    }
}

/// Render diagram text to an image with `mmdc`, returning the file bytes
pub fn export_diagram(
    diagram: &str,
    format: ImageFormat,
    options: &ExportOptions,
) -> anyhow::Result<Vec<u8>> {
    let dir = tempfile::tempdir().context("failed to create temporary directory")?;
    let input = dir.path().join("diagram.mmd");
    let output = dir.path().join(format!("diagram.{}", format.extension()));
    fs::write(&input, diagram).context("failed to write diagram source")?;

    let mut cmd = Command::new(&options.command);
    cmd.arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-b")
        .arg(&options.background)
        .arg("-t")
        .arg(&options.theme);
    if format == ImageFormat::Png {
        cmd.arg("-s").arg(options.scale.to_string());
    }

    let result = cmd.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "mermaid-cli '{}' not found. Install with: npm install -g @mermaid-js/mermaid-cli",
                options.command.display()
            )
        } else {
            anyhow::anyhow!("failed to run {}: {}", options.command.display(), e)
        }
    })?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        let stdout = String::from_utf8_lossy(&result.stdout);
        let detail = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        bail!(
            "mermaid-cli failed with status {}: {}",
            result.status,
            if detail.is_empty() { "no output" } else { &detail }
        );
    }

    fs::read(&output)
        .with_context(|| format!("mermaid-cli did not produce a {} file", format))
}
