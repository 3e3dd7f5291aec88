//! File selections and the file-bound rules (`file`, `image`, `mimes`,
//! `dimensions`).
//!
//! These rules pass when no selection context is available for the field.

use std::io::Cursor;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp"];

/// One file picked in a file input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFile {
    pub name: String,
    /// MIME type as reported by the host, e.g. `image/png`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Pixel dimensions already known to the host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<(u32, u32)>,
    /// File contents, when the host has read them.
    #[serde(skip)]
    pub content: Option<Arc<[u8]>>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            size: 0,
            dimensions: None,
            content: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_content(mut self, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        self.size = bytes.len() as u64;
        self.content = Some(bytes);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.dimensions = Some((width, height));
        self
    }

    /// Lower-cased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    pub fn is_image(&self) -> bool {
        if let Some(mime) = &self.mime {
            return mime.starts_with("image/");
        }
        self.extension()
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
    }

    /// `true` when the extension or the MIME subtype is in `allowed`.
    pub fn matches_mimes(&self, allowed: &[String]) -> bool {
        let subtype = self
            .mime
            .as_deref()
            .and_then(|m| m.split_once('/'))
            .map(|(_, sub)| sub.to_ascii_lowercase());
        let ext = self.extension();
        allowed.iter().any(|a| {
            let a = a.trim().to_ascii_lowercase();
            ext.as_deref() == Some(a.as_str())
                || subtype.as_deref() == Some(a.as_str())
                || (a == "jpg" && subtype.as_deref() == Some("jpeg"))
        })
    }

    /// Pixel dimensions: the known ones, else read from the image header.
    pub fn pixel_dimensions(&self) -> Option<(u32, u32)> {
        if self.dimensions.is_some() {
            return self.dimensions;
        }
        let bytes = self.content.as_ref()?;
        let reader = image::ImageReader::new(Cursor::new(bytes.as_ref()))
            .with_guessed_format()
            .ok()?;
        match reader.into_dimensions() {
            Ok(dims) => Some(dims),
            Err(err) => {
                tracing::debug!(file = %self.name, error = %err, "Could not read image dimensions");
                None
            }
        }
    }
}

/// Bounds parsed from a `dimensions:` operand such as
/// `min_width=100,max_height=400,ratio=3/2`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DimensionBounds {
    pub min_width: Option<u32>,
    pub max_width: Option<u32>,
    pub min_height: Option<u32>,
    pub max_height: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub ratio: Option<f64>,
}

impl DimensionBounds {
    pub fn parse(operand: &str) -> Result<Self, RuleError> {
        let bad = || RuleError::InvalidOperand {
            rule: "dimensions".to_string(),
            operand: operand.to_string(),
        };
        let mut bounds = Self::default();
        for pair in operand.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(bad)?;
            let value = value.trim();
            if key.trim() == "ratio" {
                let ratio = match value.split_once('/') {
                    Some((n, d)) => {
                        let n: f64 = n.trim().parse().map_err(|_| bad())?;
                        let d: f64 = d.trim().parse().map_err(|_| bad())?;
                        if d == 0.0 {
                            return Err(bad());
                        }
                        n / d
                    }
                    None => value.parse().map_err(|_| bad())?,
                };
                bounds.ratio = Some(ratio);
                continue;
            }
            let n: u32 = value.parse().map_err(|_| bad())?;
            match key.trim() {
                "min_width" => bounds.min_width = Some(n),
                "max_width" => bounds.max_width = Some(n),
                "min_height" => bounds.min_height = Some(n),
                "max_height" => bounds.max_height = Some(n),
                "width" => bounds.width = Some(n),
                "height" => bounds.height = Some(n),
                _ => return Err(bad()),
            }
        }
        Ok(bounds)
    }

    pub fn accepts(&self, (w, h): (u32, u32)) -> bool {
        let within = |value: u32, min: Option<u32>, max: Option<u32>, exact: Option<u32>| {
            min.is_none_or(|m| value >= m)
                && max.is_none_or(|m| value <= m)
                && exact.is_none_or(|e| value == e)
        };
        let ratio_ok = self.ratio.is_none_or(|r| {
            h != 0 && (f64::from(w) / f64::from(h) - r).abs() < 1e-3
        });
        within(w, self.min_width, self.max_width, self.width)
            && within(h, self.min_height, self.max_height, self.height)
            && ratio_ok
    }
}
