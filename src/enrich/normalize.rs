/// Make a raw user string dereferenceable: trim it and default the scheme
/// to https when none is present.
///
/// Never fails — any string is accepted, and an unusable one surfaces
/// later as a fetch error instead.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        return trimmed.to_string();
    }

    format!("https://{trimmed}")
}
