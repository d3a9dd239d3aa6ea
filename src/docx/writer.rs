//! Minimal OOXML writer.
//!
//! A .docx file is a ZIP archive of XML parts. This writer emits the five
//! parts a plain word-processing document needs: content types, package
//! rels, document rels, styles, numbering (one bullet list), and the
//! document body itself.

use std::io::{Cursor, Write};

use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum DocxError {
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Escapes text for XML content.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Right tab stop position for a US-letter page with 1" margins, in twips.
const RIGHT_TAB_TWIPS: u32 = 9360;

/// Accumulates body paragraphs, then packages the archive.
pub struct DocxWriter {
    body: String,
}

impl DocxWriter {
    pub fn new() -> Self {
        Self {
            body: String::new(),
        }
    }

    /// Centered document heading: 16 pt bold (sizes are half-points in OOXML).
    pub fn heading(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr>\
             <w:r><w:rPr><w:b/><w:sz w:val=\"32\"/></w:rPr>{}</w:r></w:p>",
            run_text(text)
        ));
    }

    /// Centered plain line, used for the contact row under the heading.
    pub fn centered_line(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r>{}</w:r></w:p>",
            run_text(text)
        ));
    }

    /// Bold 12 pt section header with a bottom border rule.
    pub fn section_header(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:pBdr>\
             <w:bottom w:val=\"single\" w:sz=\"6\" w:space=\"1\" w:color=\"auto\"/>\
             </w:pBdr></w:pPr>\
             <w:r><w:rPr><w:b/><w:sz w:val=\"24\"/></w:rPr>{}</w:r></w:p>",
            run_text(text)
        ));
    }

    /// Bold left text with italic right text tab-stopped to the margin
    /// (experience/education title + date rows).
    pub fn split_line(&mut self, left: &str, right: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"right\" w:pos=\"{RIGHT_TAB_TWIPS}\"/></w:tabs></w:pPr>\
             <w:r><w:rPr><w:b/></w:rPr>{}</w:r>\
             <w:r><w:tab/></w:r>\
             <w:r><w:rPr><w:i/></w:rPr>{}</w:r></w:p>",
            run_text(left),
            run_text(right)
        ));
    }

    /// Plain paragraph.
    pub fn plain(&mut self, text: &str) {
        self.body.push_str(&format!("<w:p><w:r>{}</w:r></w:p>", run_text(text)));
    }

    /// Bold paragraph (project names, standalone entry titles).
    pub fn bold_line(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:r><w:rPr><w:b/></w:rPr>{}</w:r></w:p>",
            run_text(text)
        ));
    }

    /// Italic paragraph (company/location second lines).
    pub fn italic_line(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:r><w:rPr><w:i/></w:rPr>{}</w:r></w:p>",
            run_text(text)
        ));
    }

    /// First-level bullet.
    pub fn bullet(&mut self, text: &str) {
        self.body.push_str(&format!(
            "<w:p><w:pPr><w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr></w:pPr>\
             <w:r>{}</w:r></w:p>",
            run_text(text)
        ));
    }

    /// Empty paragraph as vertical spacing.
    pub fn spacer(&mut self) {
        self.body.push_str("<w:p/>");
    }

    /// Packages the accumulated body into DOCX bytes.
    pub fn finish(self) -> Result<Vec<u8>, DocxError> {
        let document = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{REL_NS}\">\
             <w:body>{}\
             <w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>\
             <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\"/>\
             </w:sectPr></w:body></w:document>",
            self.body
        );

        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(PACKAGE_RELS.as_bytes())?;

        zip.start_file("word/_rels/document.xml.rels", options)?;
        zip.write_all(DOCUMENT_RELS.as_bytes())?;

        zip.start_file("word/styles.xml", options)?;
        zip.write_all(STYLES.as_bytes())?;

        zip.start_file("word/numbering.xml", options)?;
        zip.write_all(NUMBERING.as_bytes())?;

        zip.start_file("word/document.xml", options)?;
        zip.write_all(document.as_bytes())?;

        Ok(zip.finish()?.into_inner())
    }
}

impl Default for DocxWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn run_text(text: &str) -> String {
    format!("<w:t xml:space=\"preserve\">{}</w:t>", xml_escape(text))
}

const CONTENT_TYPES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>\
<Override PartName=\"/word/numbering.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml\"/>\
</Types>";

const PACKAGE_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>\
</Relationships>";

const DOCUMENT_RELS: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering\" Target=\"numbering.xml\"/>\
</Relationships>";

const STYLES: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:docDefaults><w:rPrDefault><w:rPr>\
<w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\"/><w:sz w:val=\"22\"/>\
</w:rPr></w:rPrDefault></w:docDefaults>\
</w:styles>";

const NUMBERING: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<w:numbering xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
<w:abstractNum w:abstractNumId=\"0\">\
<w:lvl w:ilvl=\"0\"><w:numFmt w:val=\"bullet\"/><w:lvlText w:val=\"\u{2022}\"/>\
<w:pPr><w:ind w:left=\"720\" w:hanging=\"360\"/></w:pPr></w:lvl>\
</w:abstractNum>\
<w:num w:numId=\"1\"><w:abstractNumId w:val=\"0\"/></w:num>\
</w:numbering>";

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn unzip_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a < b & c > \"d\""), "a &lt; b &amp; c &gt; &quot;d&quot;");
    }

    #[test]
    fn test_finish_produces_zip_with_required_parts() {
        let mut writer = DocxWriter::new();
        writer.heading("A B");
        let bytes = writer.finish().unwrap();
        // ZIP local file header magic.
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/styles.xml",
            "word/numbering.xml",
            "word/document.xml",
        ] {
            assert!(archive.by_name(part).is_ok(), "missing part {part}");
        }
    }

    #[test]
    fn test_heading_is_centered_16pt_bold() {
        let mut writer = DocxWriter::new();
        writer.heading("Ada Lovelace");
        let doc = unzip_part(&writer.finish().unwrap(), "word/document.xml");
        assert!(doc.contains("<w:jc w:val=\"center\"/>"));
        assert!(doc.contains("<w:sz w:val=\"32\"/>"));
        assert!(doc.contains("Ada Lovelace"));
    }

    #[test]
    fn test_split_line_has_right_tab_and_italic_date() {
        let mut writer = DocxWriter::new();
        writer.split_line("Engineer", "2020 - Present");
        let doc = unzip_part(&writer.finish().unwrap(), "word/document.xml");
        assert!(doc.contains("<w:tab w:val=\"right\""));
        assert!(doc.contains("<w:i/>"));
    }

    #[test]
    fn test_bold_line_has_bold_run_only() {
        let mut writer = DocxWriter::new();
        writer.bold_line("difference_engine");
        let doc = unzip_part(&writer.finish().unwrap(), "word/document.xml");
        assert!(doc.contains("<w:b/>"));
        assert!(!doc.contains("<w:tab"));
    }

    #[test]
    fn test_bullet_references_numbering() {
        let mut writer = DocxWriter::new();
        writer.bullet("Did a thing");
        let doc = unzip_part(&writer.finish().unwrap(), "word/document.xml");
        assert!(doc.contains("<w:numId w:val=\"1\"/>"));
    }

    #[test]
    fn test_user_text_is_xml_escaped() {
        let mut writer = DocxWriter::new();
        writer.plain("AT&T <rocks>");
        let doc = unzip_part(&writer.finish().unwrap(), "word/document.xml");
        assert!(doc.contains("AT&amp;T &lt;rocks&gt;"));
    }
}
