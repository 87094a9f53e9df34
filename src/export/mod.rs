//! Export planning and delivery.
//!
//! An export target's `source`, `destination`, and `filename` are templates.
//! [`plan_export`] renders them against the working context and produces an
//! [`ExportPlan`]; an [`ExportDelivery`] carries the plan out. Folder delivery
//! lives here. HTTP delivery is supplied by the embedding application.

use crate::config::{ExportKind, ExportTarget};
use crate::error::{MediaTaskError, Result};
use crate::fs::atomic_copy;
use crate::template::TemplateEngine;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::Value;
use std::path::{Component, Path, PathBuf};

/// Characters replaced with `_` in exported file names.
const RESERVED_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Fallback name when a rendered file name sanitizes to nothing.
const UNTITLED: &str = "untitled";

/// A fully rendered export, ready to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    /// Name of the export target in the config.
    pub target: String,
    pub kind: ExportKind,
    /// File being exported.
    pub source: PathBuf,
    /// Rendered folder path or URL.
    pub destination: String,
    /// Sanitized output file name, extension included.
    pub filename: String,
    pub overwrite: bool,
    /// Set when the export should not happen, with the reason.
    pub skipped: Option<String>,
}

impl ExportPlan {
    /// Output path for folder exports (before collision handling).
    pub fn folder_path(&self) -> PathBuf {
        Path::new(&self.destination).join(&self.filename)
    }
}

/// Result of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Final path or URL the file was delivered to.
    pub location: String,
}

/// Carries out an export plan.
pub trait ExportDelivery: Send + Sync {
    fn deliver(&self, plan: &ExportPlan) -> Result<DeliveryReceipt>;
}

impl<T: ExportDelivery + ?Sized> ExportDelivery for &T {
    fn deliver(&self, plan: &ExportPlan) -> Result<DeliveryReceipt> {
        (**self).deliver(plan)
    }
}

/// Copies the source file into a local folder.
///
/// An existing file is replaced only when the plan allows overwriting.
/// Otherwise a free `name (n).ext` is picked next to it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FolderDelivery;

impl ExportDelivery for FolderDelivery {
    fn deliver(&self, plan: &ExportPlan) -> Result<DeliveryReceipt> {
        if plan.kind != ExportKind::Folder {
            return Err(MediaTaskError::ExportFailed(format!(
                "export '{}': folder delivery cannot handle {:?} targets",
                plan.target, plan.kind
            )));
        }

        let mut path = plan.folder_path();
        if !plan.overwrite {
            path = free_path(&path);
        }

        let bytes = atomic_copy(&plan.source, &path)?;
        tracing::debug!(
            target_name = %plan.target,
            path = %path.display(),
            bytes,
            "exported file"
        );

        Ok(DeliveryReceipt {
            location: path.display().to_string(),
        })
    }
}

/// Render an export target against `data`.
///
/// Fails when the source or destination renders empty, when a folder
/// destination climbs out with `..`, or when an include glob is invalid.
/// A source that does not match `include_globs` yields a plan with
/// `skipped` set rather than an error.
pub fn plan_export(
    engine: &TemplateEngine,
    name: &str,
    target: &ExportTarget,
    data: &Value,
) -> Result<ExportPlan> {
    let fail = |msg: String| MediaTaskError::ExportFailed(format!("export '{}': {}", name, msg));

    let source = engine.render(&target.source, data);
    let source = source.trim();
    if source.is_empty() {
        return Err(fail(format!(
            "source template '{}' rendered empty",
            target.source
        )));
    }
    let source = PathBuf::from(source);
    let source_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let destination = engine.render(&target.destination, data).trim().to_string();
    if destination.is_empty() {
        return Err(fail(format!(
            "destination template '{}' rendered empty",
            target.destination
        )));
    }
    if target.kind == ExportKind::Folder
        && Path::new(&destination)
            .components()
            .any(|c| c == Component::ParentDir)
    {
        return Err(fail(format!(
            "destination '{}' must not contain '..'",
            destination
        )));
    }

    let rendered_name = engine.render(&target.filename, data);
    let mut filename = if rendered_name.trim().is_empty() {
        sanitize_filename(&source_name)
    } else {
        sanitize_filename(&rendered_name)
    };
    if !has_extension(&filename)
        && let Some(ext) = source.extension()
    {
        filename = format!("{}.{}", filename, ext.to_string_lossy());
    }

    let mut skipped = None;
    if !target.include_globs.is_empty() {
        let globs = build_globset(&target.include_globs)
            .map_err(|e| fail(format!("invalid include glob: {}", e)))?;
        if !globs.is_match(&source_name) {
            skipped = Some(format!("'{}' does not match include globs", source_name));
        }
    }

    Ok(ExportPlan {
        target: name.to_string(),
        kind: target.kind,
        source,
        destination,
        filename,
        overwrite: target.overwrite,
        skipped,
    })
}

/// Make a rendered string safe to use as a single file name.
///
/// ```
/// use mediatask::export::sanitize_filename;
///
/// assert_eq!(sanitize_filename("cat/dog: best?"), "cat_dog_ best_");
/// assert_eq!(sanitize_filename(" ..hidden. "), "hidden");
/// assert_eq!(sanitize_filename("..."), "untitled");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c| c == '.' || c == ' ');
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// True when `name` ends in something shaped like a file extension: up to
/// five ASCII alphanumerics, at least one a letter (`.png`, `.mp4`). Dots
/// inside metadata such as `sdxl_1.0_42` or `cfg 7.5` do not count.
fn has_extension(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && (1..=5).contains(&ext.len())
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
        && ext.chars().any(|c| c.is_ascii_alphabetic())
}

fn build_globset(patterns: &[String]) -> std::result::Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let normalized = pattern.trim().replace('\\', "/");
        if normalized.is_empty() {
            continue;
        }
        builder.add(Glob::new(&normalized)?);
    }

    builder.build()
}

/// First of `path`, `stem (1).ext`, `stem (2).ext`, ... that does not exist.
fn free_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1u32;
    loop {
        let candidate = parent.join(format!("{} ({}){}", stem, n, ext));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
