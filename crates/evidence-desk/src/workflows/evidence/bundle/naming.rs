use url::Url;

use crate::workflows::evidence::domain::EvidenceItem;

const SLUG_LIMIT: usize = 60;

/// Lowercase, hyphen-separated, at most 60 characters.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut gap = false;

    for c in raw.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.push(c);
        } else {
            gap = true;
        }
    }

    slug.chars().take(SLUG_LIMIT).collect()
}

/// Single archive path component built from a caller-supplied id.
///
/// Keeps runs of ASCII letters, digits, `-` and `_`, joined by `-`, so
/// separators and `..` never reach the archive. Falls back when nothing is left.
pub fn path_component(raw: &str, fallback: &str) -> String {
    let component = raw
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if component.is_empty() {
        fallback.to_string()
    } else {
        component
    }
}

/// File extension for a `Content-Type` header value, `bin` when unknown.
pub fn extension_for_content_type(content_type: Option<&str>) -> String {
    let Some(parsed) = content_type.and_then(|raw| raw.trim().parse::<mime::Mime>().ok()) else {
        return "bin".to_string();
    };

    let subtype = parsed.subtype().as_str();
    match mime_guess::get_mime_extensions_str(parsed.essence_str()) {
        Some(known) if known.iter().any(|ext| *ext == subtype) => subtype.to_string(),
        Some(known) => known
            .first()
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "bin".to_string()),
        None => "bin".to_string(),
    }
}

/// Last path segment of a link, ignoring query string and fragment.
pub fn last_path_segment(link: &str) -> String {
    let link = link.trim();
    if let Ok(url) = Url::parse(link) {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();
    }

    let path = link.split(&['?', '#'][..]).next().unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default().to_string()
}

fn has_extension(segment: &str) -> bool {
    match segment.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Name an evidence payload is stored under inside a bundle.
///
/// Links ending in a file name keep it (`BKT-001-report.pdf`); otherwise the
/// name is built from the description and the response content type
/// (`bank-statement-BKT-001.pdf`).
pub fn archive_file_name(item: &EvidenceItem, content_type: Option<&str>) -> String {
    let id = path_component(&item.id, "evidence");
    let segment = last_path_segment(&item.source_link);
    if has_extension(&segment) {
        return format!("{id}-{segment}");
    }

    let slug = slugify(&item.description);
    let stem = if slug.is_empty() { "evidence" } else { slug.as_str() };
    format!("{stem}-{id}.{}", extension_for_content_type(content_type))
}
