//! Unpacking of the distributed FHIR package and example archives

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;

use crate::error::CorpusError;

/// FHIR core package (StructureDefinitions etc.), a gzipped tarball
pub const SCHEMA_ARCHIVE: &str = "package.tgz";
/// FHIR example resources, a zip of JSON files
pub const EXAMPLES_ARCHIVE: &str = "examples.json.zip";

pub const SCHEMA_DIR: &str = "fhir_data";
pub const EXAMPLES_DIR: &str = "example_data";

fn archive_error(path: &Path, reason: impl ToString) -> CorpusError {
    CorpusError::Archive {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn open(path: &Path) -> Result<File, CorpusError> {
    File::open(path).map_err(|source| CorpusError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Unpack whichever of the two archives exist in `content_dir` into
/// `corpus_dir/fhir_data` and `corpus_dir/example_data`.
///
/// Returns the directories that were written. A missing `content_dir` or
/// missing archive is not an error.
pub fn extract_bundled_archives(
    content_dir: &Path,
    corpus_dir: &Path,
) -> Result<Vec<PathBuf>, CorpusError> {
    let mut extracted = Vec::new();

    let schema = content_dir.join(SCHEMA_ARCHIVE);
    if schema.is_file() {
        let out = corpus_dir.join(SCHEMA_DIR);
        std::fs::create_dir_all(&out).map_err(|source| CorpusError::Io {
            path: out.clone(),
            source,
        })?;
        tar::Archive::new(GzDecoder::new(open(&schema)?))
            .unpack(&out)
            .map_err(|e| archive_error(&schema, e))?;
        tracing::info!(archive = %schema.display(), into = %out.display(), "Extracted FHIR package");
        extracted.push(out);
    }

    let examples = content_dir.join(EXAMPLES_ARCHIVE);
    if examples.is_file() {
        let out = corpus_dir.join(EXAMPLES_DIR);
        std::fs::create_dir_all(&out).map_err(|source| CorpusError::Io {
            path: out.clone(),
            source,
        })?;
        zip::ZipArchive::new(open(&examples)?)
            .and_then(|mut archive| archive.extract(&out))
            .map_err(|e| archive_error(&examples, e))?;
        tracing::info!(archive = %examples.display(), into = %out.display(), "Extracted FHIR examples");
        extracted.push(out);
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_tgz(path: &Path, name: &str, data: &[u8]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn write_zip(path: &Path, name: &str, data: &[u8]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        zip.start_file(name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_extracts_both_archives() {
        let content = TempDir::new().unwrap();
        let corpus = TempDir::new().unwrap();
        write_tgz(
            &content.path().join(SCHEMA_ARCHIVE),
            "package/StructureDefinition-Patient.json",
            br#"{"resourceType":"StructureDefinition"}"#,
        );
        write_zip(
            &content.path().join(EXAMPLES_ARCHIVE),
            "patient-example.json",
            br#"{"resourceType":"Patient"}"#,
        );

        let dirs = extract_bundled_archives(content.path(), corpus.path()).unwrap();
        assert_eq!(dirs.len(), 2);
        assert!(
            corpus
                .path()
                .join("fhir_data/package/StructureDefinition-Patient.json")
                .is_file()
        );
        assert!(corpus.path().join("example_data/patient-example.json").is_file());
    }

    #[test]
    fn test_missing_archives_are_skipped() {
        let content = TempDir::new().unwrap();
        let corpus = TempDir::new().unwrap();
        let dirs = extract_bundled_archives(&content.path().join("absent"), corpus.path()).unwrap();
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_corrupt_archive_is_reported() {
        let content = TempDir::new().unwrap();
        let corpus = TempDir::new().unwrap();
        std::fs::write(content.path().join(EXAMPLES_ARCHIVE), b"not a zip").unwrap();
        let err = extract_bundled_archives(content.path(), corpus.path()).unwrap_err();
        assert!(matches!(err, CorpusError::Archive { .. }));
    }
}
