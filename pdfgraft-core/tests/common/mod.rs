//! Shared fixtures for integration tests
#![allow(dead_code)]

use pdfgraft::{Dictionary, Document, Object, ObjectId, SaveOptions, Stream};

/// A document whose pages all share one resource dictionary holding a font
/// and an image. Page `i` (0-based) shows the text `page {i + 1}`.
pub fn shared_resource_document(pages: usize) -> Document {
    let mut doc = Document::new();

    let mut font = Dictionary::new();
    font.set("Type", Object::name("Font"));
    font.set("Subtype", Object::name("Type1"));
    font.set("BaseFont", Object::name("Helvetica"));
    let font = doc.add_object(font);

    let mut image_dict = Dictionary::new();
    image_dict.set("Type", Object::name("XObject"));
    image_dict.set("Subtype", Object::name("Image"));
    image_dict.set("Width", 2);
    image_dict.set("Height", 2);
    let image = doc.add_object(Stream::with_dictionary(image_dict, vec![0, 255, 255, 0]));

    let mut fonts = Dictionary::new();
    fonts.set("F1", font);
    let mut xobjects = Dictionary::new();
    xobjects.set("Im1", image);
    let mut resources = Dictionary::new();
    resources.set("Font", fonts);
    resources.set("XObject", xobjects);
    let resources = doc.add_object(resources);

    for i in 1..=pages {
        add_page(&mut doc, &format!("BT /F1 12 Tf 72 720 Td (page {i}) Tj ET"), Some(resources));
    }
    doc
}

/// Appends a page drawing `content`
pub fn add_page(doc: &mut Document, content: &str, resources: Option<ObjectId>) -> ObjectId {
    let content = doc.add_object(Stream::new(content.as_bytes().to_vec()));
    let mut page = Dictionary::new();
    page.set("Type", Object::name("Page"));
    page.set(
        "MediaBox",
        vec![Object::from(0), Object::from(0), Object::from(612), Object::from(792)],
    );
    page.set("Contents", content);
    if let Some(resources) = resources {
        page.set("Resources", resources);
    }
    let page = doc.add_object(page);
    doc.append_page(page).unwrap();
    page
}

/// Saved bytes of [`shared_resource_document`]
pub fn shared_resource_pdf(pages: usize) -> Vec<u8> {
    shared_resource_document(pages)
        .save(&SaveOptions::default())
        .unwrap()
}

/// Builds a classic PDF from object bodies numbered from 1, with a correct
/// xref table. `trailer` is the trailer dictionary without `/Size`.
pub fn raw_pdf(objects: &[&str], trailer: &str) -> Vec<u8> {
    let mut pdf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }

    let xref = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} {trailer} >>\nstartxref\n{xref}\n%%EOF\n",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

/// The text lines of every page, one `Vec` per page
pub fn page_texts(doc: &mut Document) -> Vec<Vec<String>> {
    (0..doc.page_count())
        .map(|i| pdfgraft::operations::extract_page_lines(doc, i).unwrap())
        .collect()
}

/// The resource dictionary reference of page `index`
pub fn page_resources(doc: &mut Document, index: usize) -> Option<Object> {
    let id = doc.page(index)?.id();
    let dict = doc.get_object(id).ok()??.as_dict()?;
    dict.get("Resources").cloned()
}

/// A file whose page tree root (object 2) lives in object stream 3, with
/// the given `/N` and stream header
pub fn object_stream_pdf(n: &str, header: &str) -> Vec<u8> {
    let mut pdf = b"%PDF-1.5\n".to_vec();
    let catalog = pdf.len();
    pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

    let body = format!("{header}<< /Type /Pages /Kids [] /Count 0 >>");
    let objstm = pdf.len();
    pdf.extend_from_slice(
        format!(
            "3 0 obj\n<< /Type /ObjStm /N {n} /First {} /Length {} >>\nstream\n{body}\nendstream\nendobj\n",
            header.len(),
            body.len()
        )
        .as_bytes(),
    );

    let xref = pdf.len();
    let mut rows = vec![0, 0, 0, 0, 0, 0xFF, 0xFF];
    for (kind, field) in [(1u8, catalog as u32), (2, 3), (1, objstm as u32), (1, xref as u32)] {
        rows.push(kind);
        rows.extend_from_slice(&field.to_be_bytes());
        rows.extend_from_slice(&[0, 0]);
    }
    pdf.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XRef /Size 5 /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    pdf.extend_from_slice(&rows);
    pdf.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{xref}\n%%EOF\n").as_bytes());
    pdf
}
