//! # Asset Loading
//!
//! Fetches the optional custom font, logo and stamp for one build. This is
//! the only place a build awaits. Every failure degrades instead of
//! propagating: a font that can't be fetched or parsed falls back to the
//! built-in Helvetica faces, and an image that can't be fetched or decoded is
//! simply left off the page.
//!
//! URLs are normalized before fetching. Absolute URLs (`https://...`) and
//! `data:` URIs pass through; bare paths are rooted at `/`. `data:` URIs are
//! decoded inline and never reach the fetcher.
//!
//! JPEG images pass through without re-encoding (PDF readers support
//! DCTDecode natively). PNG images are decoded to RGB pixels with a
//! separate alpha channel for SMask transparency.

use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::error::AssetError;
use crate::font::{CustomFont, FontHandle, Typeface};
use crate::model::RenderOptions;

/// Upper bound on a single fetched asset.
const MAX_ASSET_BYTES: u64 = 32 * 1024 * 1024;

/// A fully decoded/loaded image ready for PDF embedding.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub pixel_data: ImagePixelData,
    pub width_px: u32,
    pub height_px: u32,
}

impl LoadedImage {
    /// Largest size with this image's aspect ratio that fits the box.
    pub fn fit_within(&self, max_width: f64, max_height: f64) -> (f64, f64) {
        if self.width_px == 0 || self.height_px == 0 {
            return (0.0, 0.0);
        }
        let scale = (max_width / self.width_px as f64).min(max_height / self.height_px as f64);
        (self.width_px as f64 * scale, self.height_px as f64 * scale)
    }
}

/// The pixel data in a format the PDF serializer can consume directly.
#[derive(Debug, Clone)]
pub enum ImagePixelData {
    /// Raw JPEG bytes, embedded directly with DCTDecode.
    Jpeg {
        data: Vec<u8>,
        color_space: JpegColorSpace,
    },
    /// Decoded RGB pixels + optional alpha channel.
    Decoded {
        /// width * height * 3 bytes (RGB)
        rgb: Vec<u8>,
        /// width * height bytes (grayscale alpha). None if fully opaque.
        alpha: Option<Vec<u8>>,
    },
}

/// JPEG color space for the PDF /ColorSpace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JpegColorSpace {
    DeviceRGB,
    DeviceGray,
}

/// Everything a build draws with besides the records themselves.
#[derive(Debug, Clone, Default)]
pub struct Assets {
    pub typeface: Typeface,
    pub logo: Option<Arc<LoadedImage>>,
    pub stamp: Option<Arc<LoadedImage>>,
}

// ── URL handling ────────────────────────────────────────────────

fn is_absolute_url(url: &str) -> bool {
    url.contains("://") || url.starts_with("data:")
}

/// Absolute URLs pass through; bare paths are rooted at `/`.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if is_absolute_url(url) || url.starts_with('/') {
        url.to_string()
    } else {
        format!("/{}", url.trim_start_matches("./"))
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let comma_pos = uri
        .find(',')
        .ok_or_else(|| AssetError::DataUri("missing comma".to_string()))?;
    let header = &uri[..comma_pos];
    if !header.ends_with(";base64") {
        return Err(AssetError::DataUri("only base64 payloads are supported".to_string()));
    }
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(uri[comma_pos + 1..].trim())
        .map_err(|e| AssetError::DataUri(e.to_string()))
}

// ── Fetchers ────────────────────────────────────────────────────

/// Source of asset bytes for normalized URLs.
#[allow(async_fn_in_trait)]
pub trait AssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError>;
}

impl<T: AssetFetcher + ?Sized> AssetFetcher for &T {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        (**self).fetch(url).await
    }
}

/// Fetches over HTTP(S) with caching disabled. Rooted paths are resolved
/// against `base_url`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    pub base_url: Option<String>,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }

    fn resolve(&self, url: &str) -> Result<String, AssetError> {
        if url.contains("://") {
            return Ok(url.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!("{}{}", base.trim_end_matches('/'), url)),
            None => Err(AssetError::Fetch {
                url: url.to_string(),
                reason: "relative URL and no base URL configured".to_string(),
            }),
        }
    }
}

fn fetch_blocking(url: &str) -> Result<Vec<u8>, AssetError> {
    let fetch_err = |reason: String| AssetError::Fetch {
        url: url.to_string(),
        reason,
    };
    let response = ureq::get(url)
        .set("Cache-Control", "no-cache")
        .set("Pragma", "no-cache")
        .call()
        .map_err(|e| fetch_err(e.to_string()))?;

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_ASSET_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|e| fetch_err(e.to_string()))?;
    Ok(bytes)
}

impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let target = self.resolve(url)?;
        let for_task = target.clone();
        tokio::task::spawn_blocking(move || fetch_blocking(&for_task))
            .await
            .map_err(|e| AssetError::Fetch {
                url: target,
                reason: e.to_string(),
            })?
    }
}

/// Serves rooted paths from a local directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    pub root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(url.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if url.contains("://") || escapes {
            return Err(AssetError::Fetch {
                url: url.to_string(),
                reason: "not a path under the asset root".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl AssetFetcher for FsFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(url)?;
        tokio::fs::read(&path).await.map_err(|e| AssetError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Refuses every fetch. Only `data:` URIs resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct Offline;

impl AssetFetcher for Offline {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        Err(AssetError::Fetch {
            url: url.to_string(),
            reason: "offline".to_string(),
        })
    }
}

// ── Loader ──────────────────────────────────────────────────────

/// Resolves optional assets through a fetcher, never failing.
pub struct AssetLoader<F> {
    fetcher: F,
}

impl<F: AssetFetcher> AssetLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    async fn read(&self, url: Option<&str>) -> Result<Vec<u8>, AssetError> {
        let url = match url.map(str::trim) {
            Some(u) if !u.is_empty() => normalize_url(u),
            _ => return Err(AssetError::Missing),
        };
        if url.starts_with("data:") {
            return decode_data_uri(&url);
        }
        self.fetcher.fetch(&url).await
    }

    /// Load the custom face, or the built-in faces on any failure.
    pub async fn load_font(&self, url: Option<&str>) -> Typeface {
        let parsed = match self.read(url).await {
            Ok(bytes) => CustomFont::parse(bytes)
                .ok_or_else(|| AssetError::Malformed("not a TrueType/OpenType font".to_string())),
            Err(e) => Err(e),
        };
        match parsed {
            Ok(font) => {
                log::debug!("using custom font ({} bytes)", font.data.len());
                Typeface::single(FontHandle::Custom(Arc::new(font)))
            }
            Err(AssetError::Missing) => Typeface::standard(),
            Err(e) => {
                log::warn!("font unavailable, falling back to Helvetica: {}", e);
                Typeface::standard()
            }
        }
    }

    /// Load an image, or `None` on any failure.
    pub async fn load_image(&self, url: Option<&str>) -> Option<Arc<LoadedImage>> {
        let loaded = match self.read(url).await {
            Ok(bytes) => decode_image_bytes(&bytes),
            Err(e) => Err(e),
        };
        match loaded {
            Ok(image) => Some(Arc::new(image)),
            Err(AssetError::Missing) => None,
            Err(e) => {
                log::warn!("image unavailable, omitting it: {}", e);
                None
            }
        }
    }

    /// Resolve every asset named by `options`, concurrently.
    pub async fn resolve(&self, options: &RenderOptions) -> Assets {
        let (typeface, logo, stamp) = tokio::join!(
            self.load_font(options.font_url.as_deref()),
            self.load_image(options.logo_url.as_deref()),
            self.load_image(options.stamp_url.as_deref()),
        );
        Assets {
            typeface,
            logo,
            stamp,
        }
    }
}

// ── Image decoding ──────────────────────────────────────────────

/// Detect image format from magic bytes and decode accordingly.
pub fn decode_image_bytes(data: &[u8]) -> Result<LoadedImage, AssetError> {
    if data.len() < 4 {
        return Err(AssetError::Malformed("image data too short".to_string()));
    }

    if is_jpeg(data) {
        decode_jpeg(data)
    } else if is_png(data) {
        decode_png(data)
    } else {
        Err(AssetError::Malformed(
            "unsupported image format (expected JPEG or PNG)".to_string(),
        ))
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8
}

fn is_png(data: &[u8]) -> bool {
    data.len() >= 4 && data[..4] == [0x89, 0x50, 0x4E, 0x47]
}

/// JPEG: read dimensions without decoding pixels.
fn decode_jpeg(data: &[u8]) -> Result<LoadedImage, AssetError> {
    let (width, height) = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AssetError::Malformed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| AssetError::Malformed(format!("JPEG dimensions: {}", e)))?;

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Jpeg {
            data: data.to_vec(),
            color_space: detect_jpeg_color_space(data),
        },
        width_px: width,
        height_px: height,
    })
}

/// Scan JPEG markers for the SOF segment and read its component count.
fn detect_jpeg_color_space(data: &[u8]) -> JpegColorSpace {
    let mut i = 2; // skip SOI
    while i + 3 < data.len() && data[i] == 0xFF {
        let marker = data[i + 1];
        let is_sof = matches!(marker, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF);
        if is_sof && i + 9 < data.len() {
            return if data[i + 9] == 1 {
                JpegColorSpace::DeviceGray
            } else {
                JpegColorSpace::DeviceRGB
            };
        }
        let seg_len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        i += 2 + seg_len;
    }
    JpegColorSpace::DeviceRGB
}

/// PNG: decode to RGBA, split into RGB + alpha.
fn decode_png(data: &[u8]) -> Result<LoadedImage, AssetError> {
    let img = image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AssetError::Malformed(e.to_string()))?
        .decode()
        .map_err(|e| AssetError::Malformed(format!("PNG decode: {}", e)))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
    }
    let has_transparency = alpha.iter().any(|&a| a != 255);

    Ok(LoadedImage {
        pixel_data: ImagePixelData::Decoded {
            rgb,
            alpha: has_transparency.then_some(alpha),
        },
        width_px: width,
        height_px: height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    pub(crate) fn png_bytes(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(w, h, image::Rgba(rgba));
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), w, h, image::ColorType::Rgba8)
            .unwrap();
        buf
    }

    fn data_uri(bytes: &[u8]) -> String {
        use base64::Engine;
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes)
        )
    }

    /// Serves canned bytes and records every URL it was asked for.
    #[derive(Default)]
    struct MapFetcher {
        files: HashMap<String, Vec<u8>>,
        seen: std::sync::Mutex<Vec<String>>,
    }

    impl AssetFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, AssetError> {
            self.seen.lock().unwrap().push(url.to_string());
            self.files.get(url).cloned().ok_or_else(|| AssetError::Fetch {
                url: url.to_string(),
                reason: "404".to_string(),
            })
        }
    }

    #[test]
    fn normalizes_urls() {
        assert_eq!(normalize_url("img/logo.png"), "/img/logo.png");
        assert_eq!(normalize_url("./img/logo.png"), "/img/logo.png");
        assert_eq!(normalize_url("/img/logo.png"), "/img/logo.png");
        assert_eq!(normalize_url("https://cdn.test/a.png"), "https://cdn.test/a.png");
        assert_eq!(normalize_url("data:image/png;base64,AA"), "data:image/png;base64,AA");
    }

    #[test]
    fn http_fetcher_joins_base() {
        let f = HttpFetcher::new("http://localhost:5173/");
        assert_eq!(f.resolve("/fonts/a.ttf").unwrap(), "http://localhost:5173/fonts/a.ttf");
        assert_eq!(f.resolve("https://x.test/a").unwrap(), "https://x.test/a");
        assert!(HttpFetcher::default().resolve("/fonts/a.ttf").is_err());
    }

    #[test]
    fn fs_fetcher_rejects_escapes() {
        let f = FsFetcher::new("/srv/assets");
        assert_eq!(f.resolve("/img/a.png").unwrap(), PathBuf::from("/srv/assets/img/a.png"));
        assert!(f.resolve("/../etc/passwd").is_err());
        assert!(f.resolve("https://x.test/a.png").is_err());
    }

    #[test]
    fn detects_magic_bytes() {
        assert!(is_jpeg(&[0xFF, 0xD8, 0xFF, 0xE0]));
        assert!(!is_jpeg(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(is_png(&[0x89, 0x50, 0x4E, 0x47]));
        assert!(!is_png(&[0x89, 0x50]));
    }

    #[test]
    fn rejects_garbage_images() {
        assert!(decode_image_bytes(&[0x00, 0x01]).is_err());
        assert!(decode_image_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04]).is_err());
    }

    #[test]
    fn decodes_opaque_png_without_alpha() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, [255, 0, 0, 255])).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (1, 1));
        match &loaded.pixel_data {
            ImagePixelData::Decoded { rgb, alpha } => {
                assert_eq!(rgb, &[255, 0, 0]);
                assert!(alpha.is_none(), "Fully opaque should have no alpha");
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn decodes_png_alpha() {
        let loaded = decode_image_bytes(&png_bytes(1, 1, [255, 0, 0, 128])).unwrap();
        match &loaded.pixel_data {
            ImagePixelData::Decoded { alpha, .. } => {
                assert_eq!(alpha.as_deref(), Some(&[128u8][..]));
            }
            _ => panic!("PNG should decode to Decoded variant"),
        }
    }

    #[test]
    fn jpeg_passes_through() {
        let img = image::RgbImage::from_fn(2, 2, |_, _| image::Rgb([0, 128, 255]));
        let mut buf = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new(&mut buf);
        image::ImageEncoder::write_image(encoder, img.as_raw(), 2, 2, image::ColorType::Rgb8)
            .unwrap();

        let loaded = decode_image_bytes(&buf).unwrap();
        assert_eq!((loaded.width_px, loaded.height_px), (2, 2));
        match &loaded.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                assert!(data.starts_with(&[0xFF, 0xD8]));
                assert_eq!(*color_space, JpegColorSpace::DeviceRGB);
            }
            _ => panic!("JPEG should stay as Jpeg variant"),
        }
    }

    #[test]
    fn fit_within_keeps_aspect() {
        let loaded = decode_image_bytes(&png_bytes(4, 2, [0, 0, 0, 255])).unwrap();
        assert_eq!(loaded.fit_within(40.0, 40.0), (40.0, 20.0));
        assert_eq!(loaded.fit_within(10.0, 2.0), (4.0, 2.0));
    }

    #[tokio::test]
    async fn missing_urls_fall_back_quietly() {
        let loader = AssetLoader::new(Offline);
        let assets = loader.resolve(&RenderOptions::default()).await;
        assert!(assets.typeface.regular.is_standard());
        assert!(assets.logo.is_none());
        assert!(assets.stamp.is_none());
    }

    #[tokio::test]
    async fn failed_fetches_degrade() {
        let loader = AssetLoader::new(Offline);
        let options = RenderOptions {
            font_url: Some("fonts/missing.ttf".into()),
            logo_url: Some("https://nowhere.invalid/logo.png".into()),
            stamp_url: Some("data:image/png;base64,@@@".into()),
            ..RenderOptions::default()
        };
        let assets = loader.resolve(&options).await;
        assert!(assets.typeface.regular.is_standard());
        assert!(assets.logo.is_none());
        assert!(assets.stamp.is_none());
    }

    #[tokio::test]
    async fn malformed_font_bytes_fall_back() {
        let mut fetcher = MapFetcher::default();
        fetcher.files.insert("/fonts/bad.ttf".into(), b"not a font".to_vec());
        let loader = AssetLoader::new(&fetcher);
        let typeface = loader.load_font(Some("fonts/bad.ttf")).await;
        assert!(typeface.regular.is_standard());
        assert_eq!(*fetcher.seen.lock().unwrap(), vec!["/fonts/bad.ttf".to_string()]);
    }

    #[tokio::test]
    async fn loads_image_through_fetcher_and_data_uri() {
        let png = png_bytes(3, 1, [10, 20, 30, 255]);
        let mut fetcher = MapFetcher::default();
        fetcher.files.insert("/img/logo.png".into(), png.clone());
        let loader = AssetLoader::new(&fetcher);

        let logo = loader.load_image(Some("img/logo.png")).await.unwrap();
        assert_eq!(logo.width_px, 3);

        let stamp = loader.load_image(Some(&data_uri(&png))).await.unwrap();
        assert_eq!(stamp.height_px, 1);
        assert_eq!(fetcher.seen.lock().unwrap().len(), 1, "data URIs skip the fetcher");
    }

    #[tokio::test]
    async fn fs_fetcher_reads_from_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("img")).unwrap();
        std::fs::write(dir.path().join("img/stamp.png"), png_bytes(2, 2, [0, 0, 0, 0])).unwrap();

        let loader = AssetLoader::new(FsFetcher::new(dir.path()));
        let stamp = loader.load_image(Some("img/stamp.png")).await;
        assert!(stamp.is_some());
        assert!(loader.load_image(Some("img/none.png")).await.is_none());
    }
}
