// Rendered view images

use serde::Serialize;

/// Format detected from the leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Unknown,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
            ImageFormat::Png
        } else if bytes.starts_with(&[0xff, 0xd8, 0xff]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            ImageFormat::Gif
        } else {
            ImageFormat::Unknown
        }
    }

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Gif => "gif",
            ImageFormat::Unknown => "bin",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
            ImageFormat::Unknown => "application/octet-stream",
        }
    }
}

/// Opaque image bytes as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl Image {
    pub fn new(bytes: Vec<u8>) -> Self {
        let format = ImageFormat::sniff(&bytes);
        Self { bytes, format }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// PNG width/height from the IHDR chunk.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if self.format != ImageFormat::Png || self.bytes.len() < 24 {
            return None;
        }
        let w = u32::from_be_bytes(self.bytes[16..20].try_into().ok()?);
        let h = u32::from_be_bytes(self.bytes[20..24].try_into().ok()?);
        Some((w, h))
    }

    /// One-line description for text surfaces, e.g. "png 800x600, 12.3 KB"
    pub fn summary(&self) -> String {
        let size = if self.bytes.len() >= 1024 {
            format!("{:.1} KB", self.bytes.len() as f64 / 1024.0)
        } else {
            format!("{} bytes", self.bytes.len())
        };
        match self.dimensions() {
            Some((w, h)) => format!("{} {}x{}, {}", self.format.extension(), w, h, size),
            None => format!("{}, {}", self.format.extension(), size),
        }
    }
}
