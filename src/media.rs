use image::{ ImageFormat, RgbImage };
use std::fs;
use std::io::Cursor;
use std::path::Path;

use crate::error::{ Result, SearchError };

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

const TEXT_EXTENSIONS: &[&str] = &[
    "txt",
    "md",
    "rs",
    "py",
    "js",
    "json",
    "yaml",
    "yml",
    "toml",
    "css",
    "html",
    "htm",
    "xml",
    "csv",
    "log",
    "pdf",
];

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];
const JPEG_SIGNATURE: &[u8] = &[0xff, 0xd8, 0xff];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Text,
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// True when the path has one of the accepted image extensions and guesses to an `image/*` type.
pub fn is_accepted_image(path: &Path) -> bool {
    let allowed = extension_of(path).map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));
    allowed &&
        mime_guess
            ::from_path(path)
            .first()
            .map_or(false, |mime| mime.type_() == mime_guess::mime::IMAGE)
}

pub fn classify(path: &Path) -> Option<MediaKind> {
    if is_accepted_image(path) {
        return Some(MediaKind::Image);
    }
    match extension_of(path) {
        Some(ext) if TEXT_EXTENSIONS.contains(&ext.as_str()) => Some(MediaKind::Text),
        _ => None,
    }
}

/// Identify PNG and JPEG payloads by their leading bytes.
pub fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PNG_SIGNATURE) {
        Some("image/png")
    } else if bytes.starts_with(JPEG_SIGNATURE) {
        Some("image/jpeg")
    } else {
        None
    }
}

/// Check an uploaded image and return its MIME type.
///
/// The file name is optional because multipart clients may omit it; when it is
/// present its extension must be one we accept. The payload itself must be a
/// PNG or JPEG regardless of what the name claims, and must decode completely.
pub fn validate_image_upload(file_name: Option<&str>, bytes: &[u8]) -> Result<&'static str> {
    if bytes.is_empty() {
        return Err(SearchError::InvalidInput("uploaded file is empty".to_string()));
    }
    if let Some(name) = file_name.filter(|n| !n.is_empty()) {
        if !is_accepted_image(Path::new(name)) {
            return Err(SearchError::UnsupportedImage(format!("{} (expected .png, .jpg or .jpeg)", name)));
        }
    }
    let mime_type = sniff_image(bytes).ok_or_else(||
        SearchError::UnsupportedImage("payload is not a PNG or JPEG image".to_string())
    )?;
    let format = if mime_type == "image/png" { ImageFormat::Png } else { ImageFormat::Jpeg };
    image
        ::load_from_memory_with_format(bytes, format)
        .map_err(|e| SearchError::UnsupportedImage(format!("could not decode image: {}", e)))?;
    Ok(mime_type)
}

pub fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

pub fn extract_text_content(path: &Path) -> Result<String> {
    let extension = extension_of(path).unwrap_or_default();

    match extension.as_str() {
        "pdf" => {
            let bytes = fs::read(path)?;
            pdf_extract
                ::extract_text_from_mem(&bytes)
                .map_err(|e| SearchError::PdfExtraction(e.to_string()))
        }
        _ if TEXT_EXTENSIONS.contains(&extension.as_str()) => {
            fs::read_to_string(path).map_err(SearchError::Io)
        }
        _ => Err(SearchError::UnsupportedFileType(extension)),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{ ImageFormat, Rgb, RgbImage };
    use std::io::Cursor;

    /// A small solid-colour PNG; different tags give different bytes.
    pub fn png_bytes(tag: u8) -> Vec<u8> {
        let image = RgbImage::from_pixel(4, 4, Rgb([tag, 255 - tag, 128]));
        super::encode_png(&image).unwrap()
    }

    pub fn jpeg_bytes(tag: u8) -> Vec<u8> {
        let image = RgbImage::from_pixel(8, 8, Rgb([tag, 64, 255 - tag]));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Jpeg).unwrap();
        bytes.into_inner()
    }
}
