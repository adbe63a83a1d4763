use crate::constants::FALLBACK_SLUG;

/// Derive a URL-safe slug from a display name.
///
/// ASCII letters and digits are kept (lowercased); every other run of
/// characters becomes a single `-`. Leading and trailing dashes are dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Slug with a numeric suffix, used when `base` is already taken.
pub fn with_suffix(base: &str, n: u32) -> String {
    format!("{base}-{n}")
}
