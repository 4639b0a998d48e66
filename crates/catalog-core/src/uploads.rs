//! Naming and acceptance rules for uploaded product images.

use std::path::{Component, Path};

use chrono::Utc;
use rand::Rng;

use crate::CoreError;

pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Upper bound (exclusive) of the random suffix in generated file names.
const RANDOM_SUFFIX_BOUND: u32 = 1_000_000_000;

/// Whether `original_name` carries an allowed image extension. The check is
/// case-insensitive.
#[must_use]
pub fn is_allowed_image(original_name: &str) -> bool {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            ALLOWED_IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
}

/// Build the on-disk name for an upload:
/// `product-<epoch-ms>-<random><original extension>`.
///
/// # Errors
///
/// Returns [`CoreError::DisallowedImage`] if the original name's extension is
/// not in [`ALLOWED_IMAGE_EXTENSIONS`].
pub fn image_file_name(original_name: &str) -> Result<String, CoreError> {
    if !is_allowed_image(original_name) {
        return Err(CoreError::DisallowedImage(original_name.to_string()));
    }

    let ext = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let suffix = rand::rng().random_range(0..RANDOM_SUFFIX_BOUND);
    Ok(format!(
        "product-{}-{suffix}.{ext}",
        Utc::now().timestamp_millis()
    ))
}

/// Whether `name` is a single normal path component, i.e. it cannot escape
/// the upload directory.
#[must_use]
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
