//! Write every known article page to a directory tree.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, warn};

use crate::application::error::AppError;
use crate::application::generator::{RenderedPage, StaticPageGenerator};
use crate::infra::error::InfraError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub built: usize,
    pub not_found: usize,
    pub failed: Vec<String>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct StaticExporter {
    generator: StaticPageGenerator,
    output_dir: PathBuf,
}

impl StaticExporter {
    pub fn new(generator: StaticPageGenerator, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// A failed enumeration aborts the export. A failed page is recorded in the
    /// report and its siblings are still built.
    pub async fn export(&self) -> Result<BuildReport, AppError> {
        let targets = self.generator.enumerate().await?;
        let mut report = BuildReport::default();

        for target in targets {
            if !is_path_safe(&target.slug) {
                warn!(
                    target = "lectern::application::export",
                    slug = %target.slug,
                    "slug is not a single path segment"
                );
                report.failed.push(target.slug);
                continue;
            }
            match self.generator.render(&target.slug).await {
                Ok(RenderedPage::Article { html, .. }) => {
                    let path = self
                        .output_dir
                        .join("post")
                        .join(&target.slug)
                        .join("index.html");
                    match write_file(&path, &html).await {
                        Ok(()) => report.built += 1,
                        Err(err) => {
                            error!(
                                target = "lectern::application::export",
                                slug = %target.slug,
                                error = %err,
                                "failed to write page"
                            );
                            report.failed.push(target.slug);
                        }
                    }
                }
                Ok(RenderedPage::NotFound) => {
                    warn!(
                        target = "lectern::application::export",
                        slug = %target.slug,
                        "enumerated slug resolved to no article"
                    );
                    report.not_found += 1;
                }
                Err(err) => {
                    error!(
                        target = "lectern::application::export",
                        slug = %err.slug(),
                        error = %err,
                        "failed to build page"
                    );
                    report.failed.push(target.slug);
                }
            }
        }

        let not_found = self
            .generator
            .renderer()
            .render_not_found()
            .map_err(|err| AppError::unexpected(err.to_string()))?;
        write_file(&self.output_dir.join("404.html"), &not_found).await?;

        info!(
            target = "lectern::application::export",
            built = report.built,
            not_found = report.not_found,
            failed = report.failed.len(),
            output = %self.output_dir.display(),
            "static export finished"
        );
        Ok(report)
    }
}

fn is_path_safe(slug: &str) -> bool {
    slug != "." && slug != ".." && !slug.contains(['/', '\\'])
}

async fn write_file(path: &Path, contents: &str) -> Result<(), InfraError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, contents).await?;
    Ok(())
}
