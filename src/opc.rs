//! OPC (Open Packaging Conventions) collaborators
//!
//! Reads the main body XML out of a .docx ZIP container and rebuilds the
//! container around a mutated body. The parser and injector never touch the
//! archive themselves; they only see the XML string.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use log::warn;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::FsopError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read `word/document.xml` from raw .docx bytes.
pub fn read_document_xml(file_data: &[u8]) -> Result<String, FsopError> {
    let mut archive = ZipArchive::new(Cursor::new(file_data))?;
    let mut file = archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| FsopError::PartNotFound(DOCUMENT_PART.to_string()))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Rebuild the archive with a replacement body, copying every other part
/// verbatim (raw copy keeps the original compression).
pub fn write_document_xml(original: &[u8], new_xml: &str) -> Result<Vec<u8>, FsopError> {
    let mut archive = ZipArchive::new(Cursor::new(original))?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut found = false;
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        if file.name() == DOCUMENT_PART {
            found = true;
            continue;
        }
        writer.raw_copy_file(file)?;
    }
    if !found {
        return Err(FsopError::PartNotFound(DOCUMENT_PART.to_string()));
    }

    writer.start_file(DOCUMENT_PART, FileOptions::default())?;
    writer.write_all(new_xml.as_bytes())?;
    let bytes = writer
        .finish()
        .map_err(FsopError::from)?
        .into_inner();
    if bytes.is_empty() {
        return Err(FsopError::EmptyArtifact);
    }
    Ok(bytes)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Atomically replace the body of the .docx at `path`: write a temp file,
/// keep a `.bak` of the original, rename over it, then verify the final
/// artifact and restore the backup if verification fails.
pub fn replace_document_in_file(path: &Path, new_xml: &str) -> Result<(), FsopError> {
    let original = fs::read(path)?;
    let rebuilt = write_document_xml(&original, new_xml)?;
    if rebuilt.is_empty() {
        return Err(FsopError::EmptyArtifact);
    }

    let tmp = sibling_path(path, ".tmp");
    let backup = sibling_path(path, ".bak");

    fs::write(&tmp, &rebuilt)?;
    fs::copy(path, &backup)?;
    fs::rename(&tmp, path)?;

    // Verification read of the final artifact.
    match read_document_xml(&fs::read(path)?) {
        Ok(xml) if !xml.trim().is_empty() => {
            let _ = fs::remove_file(&backup);
            Ok(())
        }
        _ => {
            warn!("verification failed for {}; restoring backup", path.display());
            fs::copy(&backup, path)?;
            let _ = fs::remove_file(&backup);
            Err(FsopError::InjectionFailed(
                "rebuilt archive failed verification".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docx_with(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in parts {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_document_xml() {
        let data = docx_with(&[
            ("[Content_Types].xml", "<Types/>"),
            (DOCUMENT_PART, "<w:document><w:body/></w:document>"),
        ]);
        let xml = read_document_xml(&data).unwrap();
        assert!(xml.contains("<w:body/>"));
    }

    #[test]
    fn test_missing_part_is_distinct_error() {
        let data = docx_with(&[("[Content_Types].xml", "<Types/>")]);
        let err = read_document_xml(&data).unwrap_err();
        assert!(matches!(err, FsopError::PartNotFound(_)));
    }

    #[test]
    fn test_not_a_zip_is_archive_error() {
        let err = read_document_xml(b"pas une archive").unwrap_err();
        assert!(matches!(err, FsopError::Zip(_)));
    }

    #[test]
    fn test_write_replaces_body_and_keeps_other_parts() {
        let data = docx_with(&[
            ("[Content_Types].xml", "<Types/>"),
            ("word/styles.xml", "<w:styles/>"),
            (DOCUMENT_PART, "<w:document><w:body>ancien</w:body></w:document>"),
        ]);
        let rebuilt =
            write_document_xml(&data, "<w:document><w:body>nouveau</w:body></w:document>")
                .unwrap();
        let xml = read_document_xml(&rebuilt).unwrap();
        assert!(xml.contains("nouveau"));

        let mut archive = ZipArchive::new(Cursor::new(rebuilt.as_slice())).unwrap();
        let mut styles = String::new();
        archive
            .by_name("word/styles.xml")
            .unwrap()
            .read_to_string(&mut styles)
            .unwrap();
        assert_eq!(styles, "<w:styles/>");
    }

    #[test]
    fn test_write_requires_existing_body_part() {
        let data = docx_with(&[("[Content_Types].xml", "<Types/>")]);
        let err = write_document_xml(&data, "<w:document/>").unwrap_err();
        assert!(matches!(err, FsopError::PartNotFound(_)));
    }
}
