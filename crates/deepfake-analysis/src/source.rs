//! Image source decoding and filename / content-type resolution.

use std::path::Path;

use base64::Engine;
use url::Url;

use crate::types::{DeepfakeError, DeepfakeResult, ImagePayload};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";
const FALLBACK_STEM: &str = "image";

/// Decode base64 image data, stripping a `data:image/...;base64,` prefix.
pub fn decode_base64_image(data: &str) -> DeepfakeResult<Vec<u8>> {
    let trimmed = data.trim();
    let encoded = match trimmed.strip_prefix("data:") {
        Some(rest) => rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| {
                DeepfakeError::Validation("Data URL must use ';base64,' encoding".to_string())
            })?,
        None => trimmed,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(DeepfakeError::Validation("Image data is empty".to_string()));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DeepfakeError::Validation(format!("Invalid base64: {e}")))?;

    if bytes.is_empty() {
        return Err(DeepfakeError::Validation("Image data is empty".to_string()));
    }
    Ok(bytes)
}

/// Build a payload from caller-supplied bytes.
pub fn payload_from_bytes(bytes: Vec<u8>, filename: &str) -> DeepfakeResult<ImagePayload> {
    if bytes.is_empty() {
        return Err(DeepfakeError::Validation("Image data is empty".to_string()));
    }
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(DeepfakeError::Validation("Filename is required".to_string()));
    }

    Ok(ImagePayload {
        content_type: content_type_for(filename).to_string(),
        filename: filename.to_string(),
        bytes,
    })
}

/// Parse and check an image URL. Only http and https are accepted.
pub fn parse_image_url(raw: &str) -> DeepfakeResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DeepfakeError::Validation("Image URL is required".to_string()));
    }
    let url = Url::parse(raw)
        .map_err(|e| DeepfakeError::Validation(format!("Invalid image URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DeepfakeError::Validation(format!(
            "Unsupported URL scheme: {other}. Use 'http' or 'https'."
        ))),
    }
}

/// Derive a filename from the last URL path segment.
///
/// When the segment has no extension, one is taken from the response content
/// type if it names an image format.
pub fn filename_from_url(url: &Url, content_type: Option<&str>) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .unwrap_or_default();

    let stem = if segment.is_empty() { FALLBACK_STEM } else { segment };
    if has_extension(stem) {
        return stem.to_string();
    }

    match content_type.and_then(extension_for) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// Pick the content type for an upload: an `image/*` response header wins,
/// otherwise the filename extension decides.
pub fn resolve_content_type(header: Option<&str>, filename: &str) -> String {
    header
        .map(|h| h.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|h| h.starts_with("image/"))
        .unwrap_or_else(|| content_type_for(filename).to_string())
}

/// MIME type for a filename, by extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match mime.as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn has_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| !e.is_empty())
}
