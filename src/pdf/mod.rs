//! # PDF Serializer
//!
//! Takes the laid-out pages from the layout engine and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. We write the raw bytes ourselves
//! because the subset a ticket export needs (text, filled and stroked paths,
//! two images, at most two fonts) is small and this keeps the output fully
//! deterministic for a given input.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Fonts
//!
//! The built-in Helvetica faces are referenced by name with WinAnsiEncoding;
//! characters outside WinAnsi are written as `?`. A custom face is embedded
//! whole as a CIDFontType2 with Identity-H encoding, a /W array for the
//! glyphs actually used, and a ToUnicode CMap so text stays copyable.

use std::collections::BTreeSet;
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>
use std::sync::Arc;

use chrono::NaiveDateTime;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::assets::{ImagePixelData, JpegColorSpace, LoadedImage};
use crate::error::{FolioError, Result};
use crate::font::metrics::unicode_to_winansi;
use crate::font::{CustomFont, FontHandle, FontKey, FontRole, Typeface};
use crate::layout::{DrawCommand, LayoutElement, LayoutPage};
use crate::style::Color;

/// Document information written to the Info dictionary.
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    pub title: String,
    pub creator: String,
    pub created: NaiveDateTime,
}

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// One entry per distinct face, in resource order (/F0, /F1, ...).
    font_objects: Vec<(FontKey, usize)>,
    /// Image identity -> XObject id, in resource order (/Im0, /Im1, ...).
    image_objects: Vec<(usize, usize)>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        let id = self.objects.len();
        self.objects.push(PdfObject { data });
        id
    }

    fn push_stream(&mut self, dict_entries: &str, payload: &[u8]) -> usize {
        let mut data: Vec<u8> = Vec::new();
        let _ = write!(
            data,
            "<< {} /Length {} >>\nstream\n",
            dict_entries,
            payload.len()
        );
        data.extend_from_slice(payload);
        data.extend_from_slice(b"\nendstream");
        self.push(data)
    }

    fn font_index(&self, key: FontKey) -> usize {
        self.font_objects
            .iter()
            .position(|(k, _)| *k == key)
            .unwrap_or(0)
    }

    fn image_index(&self, image: &Arc<LoadedImage>) -> Option<usize> {
        let identity = image_identity(image);
        self.image_objects.iter().position(|(i, _)| *i == identity)
    }
}

fn image_identity(image: &Arc<LoadedImage>) -> usize {
    Arc::as_ptr(image) as usize
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write laid-out pages to a PDF byte vector.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &PdfMetadata,
        typeface: &Typeface,
    ) -> Result<Vec<u8>> {
        for page in pages {
            let finite = page.width.is_finite() && page.height.is_finite();
            if !finite || page.width <= 0.0 || page.height <= 0.0 {
                return Err(FolioError::Render(format!(
                    "invalid page size {}x{}",
                    page.width, page.height
                )));
            }
        }

        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            image_objects: Vec::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, images, then page objects and content streams
        builder.push(vec![]);
        builder.push(vec![]);
        builder.push(vec![]);

        self.register_fonts(&mut builder, pages, typeface)?;
        self.register_images(&mut builder, pages);

        let font_resources = self.build_font_resource_dict(&builder);
        let mut page_obj_ids: Vec<usize> = Vec::new();

        for page in pages {
            let content = self.build_content_stream(page, &builder, typeface);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let content_obj_id = builder.push_stream("/Filter /FlateDecode", &compressed);

            let xobject_resources = self.build_xobject_resource_dict(page, &builder);
            let resources = if xobject_resources.is_empty() {
                format!("/Font << {} >>", font_resources)
            } else {
                format!("/Font << {} >> /XObject << {} >>", font_resources, xobject_resources)
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << {} >> >>",
                page.width, page.height, content_obj_id, resources
            );
            page_obj_ids.push(builder.push(page_dict.into_bytes()));
        }

        // Write Catalog (object 1)
        builder.objects[1].data = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();

        // Write Pages tree (object 2)
        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        let _ = write!(info, "/Title {} ", pdf_text_string(&metadata.title));
        let _ = write!(info, "/Creator {} ", pdf_text_string(&metadata.creator));
        let _ = write!(
            info,
            "/Producer (Folio {}) /CreationDate (D:{}) >>",
            env!("CARGO_PKG_VERSION"),
            metadata.created.format("%Y%m%d%H%M%S")
        );
        let info_obj_id = builder.push(info.into_bytes());

        Ok(self.serialize(&builder, info_obj_id))
    }

    // ── Content streams ─────────────────────────────────────────

    fn build_content_stream(
        &self,
        page: &LayoutPage,
        builder: &PdfBuilder,
        typeface: &Typeface,
    ) -> String {
        let mut stream = String::new();
        for element in &page.elements {
            self.write_element(&mut stream, element, page.height, builder, typeface);
        }
        stream
    }

    fn write_element(
        &self,
        stream: &mut String,
        element: &LayoutElement,
        page_height: f64,
        builder: &PdfBuilder,
        typeface: &Typeface,
    ) {
        match &element.draw {
            DrawCommand::Rect {
                background,
                border,
                radius,
            } => {
                let x = element.x;
                let y = page_height - element.y - element.height;
                let (w, h) = (element.width, element.height);

                if let Some(bg) = background {
                    let _ = writeln!(stream, "q\n{} rg", color_ops(bg));
                    self.write_rect_path(stream, x, y, w, h, *radius);
                    let _ = writeln!(stream, "f\nQ");
                }
                if let Some((width, color)) = border {
                    let _ = writeln!(stream, "q\n{} RG\n{:.2} w", color_ops(color), width);
                    self.write_rect_path(stream, x, y, w, h, *radius);
                    let _ = writeln!(stream, "S\nQ");
                }
            }

            DrawCommand::Rule { thickness, color } => {
                let y = page_height - element.y;
                let _ = writeln!(
                    stream,
                    "q\n{} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ",
                    color_ops(color),
                    thickness,
                    element.x,
                    y,
                    element.x + element.width,
                    y
                );
            }

            DrawCommand::Text {
                text,
                role,
                font_size,
                color,
            } => {
                let font = typeface.get(*role);
                let index = builder.font_index(font.key());
                let _ = writeln!(
                    stream,
                    "BT\n{} rg\n/F{} {:.1} Tf\n{:.2} {:.2} Td\n{} Tj\nET",
                    color_ops(color),
                    index,
                    font_size,
                    element.x,
                    page_height - element.y,
                    encode_text(font, text)
                );
            }

            DrawCommand::Image { image } => {
                if let Some(index) = builder.image_index(image) {
                    let y = page_height - element.y - element.height;
                    let _ = writeln!(
                        stream,
                        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/Im{} Do\nQ",
                        element.width, element.height, element.x, y, index
                    );
                }
            }
        }
    }

    /// Append a rectangle path, with corners rounded by `radius` when positive.
    /// Coordinates are already in PDF space (origin bottom-left).
    fn write_rect_path(&self, stream: &mut String, x: f64, y: f64, w: f64, h: f64, radius: f64) {
        let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
        if r <= 0.0 {
            let _ = writeln!(stream, "{:.2} {:.2} {:.2} {:.2} re", x, y, w, h);
            return;
        }

        // Control point offset approximating a quarter circle.
        let k = r * 0.5522847498;
        let _ = writeln!(stream, "{:.2} {:.2} m", x + r, y);
        let _ = writeln!(stream, "{:.2} {:.2} l", x + w - r, y);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + w - r + k, y, x + w, y + r - k, x + w, y + r
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x + w, y + h - r);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + w, y + h - r + k, x + w - r + k, y + h, x + w - r, y + h
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x + r, y + h);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x + r - k, y + h, x, y + h - r + k, x, y + h - r
        );
        let _ = writeln!(stream, "{:.2} {:.2} l", x, y + r);
        let _ = writeln!(
            stream,
            "{:.2} {:.2} {:.2} {:.2} {:.2} {:.2} c",
            x, y + r - k, x + r - k, y, x + r, y
        );
        let _ = writeln!(stream, "h");
    }

    // ── Fonts ───────────────────────────────────────────────────

    /// Register one font object per distinct face of the typeface.
    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        typeface: &Typeface,
    ) -> Result<()> {
        for role in [FontRole::Regular, FontRole::Bold] {
            let font = typeface.get(role);
            let key = font.key();
            if builder.font_objects.iter().any(|(k, _)| *k == key) {
                continue;
            }

            let obj_id = match font {
                FontHandle::Standard(std_font) => {
                    let font_dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    builder.push(font_dict.into_bytes())
                }
                FontHandle::Custom(custom) => {
                    let used = Self::collect_used_chars(pages, typeface, key);
                    let name = format!("FolioEmbedded{}", builder.font_objects.len());
                    Self::write_custom_font_objects(builder, custom, &name, &used)?
                }
            };
            builder.font_objects.push((key, obj_id));
        }
        Ok(())
    }

    fn collect_used_chars(
        pages: &[LayoutPage],
        typeface: &Typeface,
        key: FontKey,
    ) -> BTreeSet<char> {
        let mut used = BTreeSet::new();
        for page in pages {
            for element in &page.elements {
                if let DrawCommand::Text { text, role, .. } = &element.draw {
                    if typeface.get(*role).key() == key {
                        used.extend(text.chars());
                    }
                }
            }
        }
        used
    }

    /// Write the 5 CIDFont PDF objects for a custom TrueType font.
    /// Returns the object ID of the Type0 root font dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        font: &CustomFont,
        name: &str,
        used_chars: &BTreeSet<char>,
    ) -> Result<usize> {
        if font.data.is_empty() {
            return Err(FolioError::Font(format!("font '{}' has no data to embed", name)));
        }
        let scale = 1000.0 / font.units_per_em as f64;

        // 1. FontFile2 stream, the whole face compressed
        let compressed = compress_to_vec_zlib(&font.data, 6);
        let fontfile2_id = builder.push_stream(
            &format!("/Length1 {} /Filter /FlateDecode", font.data.len()),
            &compressed,
        );

        // 2. FontDescriptor
        let [x_min, y_min, x_max, y_max] = font.bbox;
        let descriptor = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle 0 \
             /Ascent {} /Descent {} /CapHeight {} /StemV 80 \
             /FontFile2 {} 0 R >>",
            name,
            (x_min as f64 * scale) as i32,
            (y_min as f64 * scale) as i32,
            (x_max as f64 * scale) as i32,
            (y_max as f64 * scale) as i32,
            (font.ascender as f64 * scale) as i32,
            (font.descender as f64 * scale) as i32,
            (font.cap_height as f64 * scale) as i32,
            fontfile2_id,
        );
        let descriptor_id = builder.push(descriptor.into_bytes());

        // 3. CIDFont dictionary (DescendantFont)
        let char_to_gid: Vec<(char, u16)> = used_chars
            .iter()
            .map(|&ch| (ch, font.glyph_id(ch)))
            .filter(|&(_, gid)| gid != 0)
            .collect();
        let cidfont = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            name,
            descriptor_id,
            (font.default_advance as f64 * scale) as u32,
            Self::build_w_array(&char_to_gid, font),
        );
        let cidfont_id = builder.push(cidfont.into_bytes());

        // 4. ToUnicode CMap
        let cmap = Self::build_tounicode_cmap(&char_to_gid, name);
        let tounicode_id = builder.push_stream(
            "/Filter /FlateDecode",
            &compress_to_vec_zlib(cmap.as_bytes(), 6),
        );

        // 5. Type0 font dictionary (the root, referenced by /Resources)
        let type0 = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            name, cidfont_id, tounicode_id,
        );
        Ok(builder.push(type0.into_bytes()))
    }

    /// Build the /W array for per-glyph widths in CIDFont.
    /// Format: [gid [width] gid [width] ...]
    fn build_w_array(char_to_gid: &[(char, u16)], font: &CustomFont) -> String {
        let scale = 1000.0 / font.units_per_em as f64;
        let mut entries: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|&(ch, gid)| (gid, (font.advance(ch) as f64 * scale) as u32))
            .collect();
        entries.sort_by_key(|(gid, _)| *gid);
        entries.dedup_by_key(|(gid, _)| *gid);

        let mut result = String::from("[");
        for (gid, width) in &entries {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// Build a ToUnicode CMap for text extraction/copy-paste support.
    fn build_tounicode_cmap(char_to_gid: &[(char, u16)], font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, char)> =
            char_to_gid.iter().map(|&(ch, gid)| (gid, ch)).collect();
        gid_to_unicode.sort_by_key(|(gid, _)| *gid);
        gid_to_unicode.dedup_by_key(|(gid, _)| *gid);

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
        cmap.push_str(
            "/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n",
        );
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        // beginbfchar blocks hold at most 100 entries
        for chunk in gid_to_unicode.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, ch) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = ch
                    .encode_utf16(&mut units)
                    .iter()
                    .map(|u| format!("{:04X}", u))
                    .collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", gid, utf16);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }

    fn build_font_resource_dict(&self, builder: &PdfBuilder) -> String {
        builder
            .font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ── Images ──────────────────────────────────────────────────

    /// Register each distinct image once, however many pages draw it.
    fn register_images(&self, builder: &mut PdfBuilder, pages: &[LayoutPage]) {
        for page in pages {
            for element in &page.elements {
                if let DrawCommand::Image { image } = &element.draw {
                    if builder.image_index(image).is_none() {
                        let obj_id = Self::write_image_xobject(builder, image);
                        builder.image_objects.push((image_identity(image), obj_id));
                    }
                }
            }
        }
    }

    /// Write a single image as one or two XObject PDF objects.
    /// Returns the main XObject ID.
    fn write_image_xobject(builder: &mut PdfBuilder, image: &LoadedImage) -> usize {
        match &image.pixel_data {
            ImagePixelData::Jpeg { data, color_space } => {
                let color_space = match color_space {
                    JpegColorSpace::DeviceRGB => "/DeviceRGB",
                    JpegColorSpace::DeviceGray => "/DeviceGray",
                };
                builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace {} /BitsPerComponent 8 /Filter /DCTDecode",
                        image.width_px, image.height_px, color_space
                    ),
                    data,
                )
            }

            ImagePixelData::Decoded { rgb, alpha } => {
                // SMask first, so the image can reference it
                let smask_ref = alpha
                    .as_ref()
                    .map(|alpha_data| {
                        let id = builder.push_stream(
                            &format!(
                                "/Type /XObject /Subtype /Image /Width {} /Height {} \
                                 /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode",
                                image.width_px, image.height_px
                            ),
                            &compress_to_vec_zlib(alpha_data, 6),
                        );
                        format!(" /SMask {} 0 R", id)
                    })
                    .unwrap_or_default();

                builder.push_stream(
                    &format!(
                        "/Type /XObject /Subtype /Image /Width {} /Height {} \
                         /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode{}",
                        image.width_px, image.height_px, smask_ref
                    ),
                    &compress_to_vec_zlib(rgb, 6),
                )
            }
        }
    }

    /// Build the /XObject resource dict entries for a specific page.
    fn build_xobject_resource_dict(&self, page: &LayoutPage, builder: &PdfBuilder) -> String {
        let mut entries: Vec<usize> = page
            .elements
            .iter()
            .filter_map(|el| match &el.draw {
                DrawCommand::Image { image } => builder.image_index(image),
                _ => None,
            })
            .collect();
        entries.sort_unstable();
        entries.dedup();
        entries
            .iter()
            .map(|&idx| format!("/Im{} {} 0 R", idx, builder.image_objects[idx].1))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        // Header
        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}

fn color_ops(c: &Color) -> String {
    format!("{:.3} {:.3} {:.3}", c.r, c.g, c.b)
}

/// Escape special characters in a PDF literal string.
fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Encode metadata text: a literal string when it's plain ASCII, else
/// UTF-16BE hex with a byte-order mark.
fn pdf_text_string(s: &str) -> String {
    if s.chars().all(|c| (' '..='~').contains(&c)) {
        return format!("({})", escape_pdf_string(s));
    }
    let mut hex = String::from("<FEFF");
    for unit in s.encode_utf16() {
        let _ = write!(hex, "{:04X}", unit);
    }
    hex.push('>');
    hex
}

/// Encode one text run for the face it is set in.
fn encode_text(font: &FontHandle, text: &str) -> String {
    match font {
        FontHandle::Standard(_) => {
            let mut out = String::from("(");
            for ch in text.chars() {
                match unicode_to_winansi(ch).unwrap_or(b'?') {
                    b'(' => out.push_str("\\("),
                    b')' => out.push_str("\\)"),
                    b'\\' => out.push_str("\\\\"),
                    byte @ 0x20..=0x7E => out.push(byte as char),
                    byte => {
                        let _ = write!(out, "\\{:03o}", byte);
                    }
                }
            }
            out.push(')');
            out
        }
        FontHandle::Custom(custom) => {
            let mut out = String::from("<");
            for ch in text.chars() {
                let _ = write!(out, "{:04X}", custom.glyph_id(ch));
            }
            out.push('>');
            out
        }
    }
}

/// Cheap structural read-back for tests and sanity checks: the /Count of
/// the page tree.
pub fn page_count(pdf: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(pdf);
    let start = text.find("/Type /Pages")?;
    let rest = &text[start..];
    let count_at = rest.find("/Count ")? + "/Count ".len();
    let digits: String = rest[count_at..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
