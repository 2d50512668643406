//! Resolve asset references embedded in documents to public CDN URLs.

const IMAGE_CDN_BASE: &str = "https://cdn.sanity.io/images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResolver {
    project_id: String,
    dataset: String,
}

impl AssetResolver {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    /// Map `image-<id>-<width>x<height>-<ext>` to its CDN URL.
    ///
    /// Returns `None` for anything that is not an image reference.
    pub fn image_url(&self, reference: &str) -> Option<String> {
        let rest = reference.strip_prefix("image-")?;
        let (rest, ext) = rest.rsplit_once('-')?;
        let (id, dimensions) = rest.rsplit_once('-')?;

        let (width, height) = dimensions.split_once('x')?;
        let is_dimension =
            |value: &str| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit());
        if id.is_empty() || ext.is_empty() || !is_dimension(width) || !is_dimension(height) {
            return None;
        }

        Some(format!(
            "{IMAGE_CDN_BASE}/{}/{}/{id}-{dimensions}.{ext}",
            self.project_id, self.dataset
        ))
    }
}
