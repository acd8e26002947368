use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::ReportError;

/// A4 portrait in points.
pub const A4: (f64, f64) = (595.28, 841.89);
/// Points per millimetre.
pub const MM: f64 = 72.0 / 25.4;

/// The standard Type 1 fonts registered on every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Bold,
    Regular,
    Mono,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Bold => "F1",
            Font::Regular => "F2",
            Font::Mono => "F3",
        }
    }

    /// Rough advance width of `text` at `size`, for centring.
    pub fn text_width(self, text: &str, size: f64) -> f64 {
        let em = match self {
            Font::Bold => 0.58,
            Font::Regular => 0.52,
            Font::Mono => 0.6,
        };
        text.chars().count() as f64 * size * em
    }
}

/// An image XObject stored in the document.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    name: String,
    id: ObjectId,
    pub width: u32,
    pub height: u32,
}

fn real(x: f64) -> Object {
    Object::Real(x as _)
}

fn name(n: &str) -> Object {
    Object::Name(n.as_bytes().to_vec())
}

/// Operations drawing one line of text with its baseline at (`x`, `y`).
pub fn text_ops(font: Font, size: f64, x: f64, y: f64, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![name(font.resource()), real(size)]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// Operations painting `image` into the box with lower-left (`x`, `y`).
pub fn image_ops(image: &EmbeddedImage, x: f64, y: f64, width: f64, height: f64) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
        ),
        Operation::new("Do", vec![name(&image.name)]),
        Operation::new("Q", vec![]),
    ]
}

/// Builds a PDF page by page.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    fonts_id: ObjectId,
    pages: Vec<Object>,
    images: usize,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font = |base: &str| {
            dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => name(base),
                "Encoding" => "WinAnsiEncoding",
            }
        };
        let fonts_id = doc.add_object(dictionary! {
            Font::Bold.resource() => font("Helvetica-Bold"),
            Font::Regular.resource() => font("Helvetica"),
            Font::Mono.resource() => font("Courier"),
        });
        PdfWriter {
            doc,
            pages_id,
            fonts_id,
            pages: Vec::new(),
            images: 0,
        }
    }

    /// Decode a PNG and store it as an RGB image object.
    pub fn embed_png(&mut self, png: &[u8]) -> Result<EmbeddedImage, image::ImageError> {
        let rgb = image::load_from_memory(png)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            rgb.into_raw(),
        );
        let id = self.doc.add_object(stream);
        self.images += 1;
        Ok(EmbeddedImage {
            name: format!("Im{}", self.images),
            id,
            width,
            height,
        })
    }

    /// Append a page of `size` points drawing `operations`.
    pub fn add_page(
        &mut self,
        size: (f64, f64),
        operations: Vec<Operation>,
        images: &[&EmbeddedImage],
    ) -> Result<(), ReportError> {
        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));

        let mut xobjects = lopdf::Dictionary::new();
        for image in images {
            xobjects.set(image.name.as_bytes().to_vec(), image.id);
        }
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => self.fonts_id,
            "XObject" => xobjects,
        });

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), real(size.0), real(size.1)],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        self.pages.push(page_id.into());
        Ok(())
    }

    /// Append a page exactly the size of the image, one point per pixel.
    pub fn add_image_page(&mut self, image: &EmbeddedImage) -> Result<(), ReportError> {
        let (w, h) = (image.width as f64, image.height as f64);
        self.add_page((w, h), image_ops(image, 0.0, 0.0, w, h), &[image])
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Write the document, replacing any existing file. Returns the page
    /// count.
    pub fn save(mut self, path: &Path) -> Result<usize, ReportError> {
        let count = self.pages.len();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.pages,
            "Count" => count as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();
        self.doc
            .save(path)
            .map_err(|e| ReportError::Pdf(e.into()))?;
        log::info!("Wrote {} ({count} pages)", path.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::raster::encode_png;

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode_png(width, height, vec![200; (width * height * 3) as usize])
            .unwrap()
            .png
    }

    #[test]
    fn image_pages_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");

        let mut pdf = PdfWriter::new();
        for size in [(40, 30), (20, 10)] {
            let image = pdf.embed_png(&png(size.0, size.1)).unwrap();
            pdf.add_image_page(&image).unwrap();
        }
        assert_eq!(pdf.save(&path).unwrap(), 2);

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn text_page_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("text.pdf");
        let mut pdf = PdfWriter::new();
        pdf.add_page(A4, text_ops(Font::Bold, 16.0, 50.0, 800.0, "Title"), &[])
            .unwrap();
        pdf.save(&path).unwrap();
        assert_eq!(Document::load(&path).unwrap().get_pages().len(), 1);
    }

    #[test]
    fn garbage_png_is_rejected() {
        assert!(PdfWriter::new().embed_png(b"not a png").is_err());
    }
}
