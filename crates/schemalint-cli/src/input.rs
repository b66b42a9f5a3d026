//! Input discovery and decoding
//!
//! Turns the paths given on the command line into schema objects, one
//! [`SourceFile`] per input file. Problems confined to one statement or one
//! JSON element are kept as violations next to the objects that did decode.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use schemalint_core::{InputError, Location, SchemaObject, Violation, ViolationCode};
use schemalint_sql::{ExtractError, SqlParser};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How input files are read
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// Pick by file extension
    Auto,
    /// SQL DDL scripts
    Sql,
    /// JSON arrays of schema object descriptors
    Json,
}

impl InputFormat {
    /// Format of a file, or `None` when the file should be skipped
    fn resolve(self, path: &Path) -> Option<InputFormat> {
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);

        match (self, ext.as_deref()) {
            (InputFormat::Auto, Some("sql")) => Some(InputFormat::Sql),
            (InputFormat::Auto, Some("json")) => Some(InputFormat::Json),
            (InputFormat::Auto, _) => None,
            (InputFormat::Sql, Some("sql")) | (InputFormat::Json, Some("json")) => Some(self),
            _ => None,
        }
    }
}

/// Everything decoded from one input file
#[derive(Debug, Default)]
pub struct SourceFile {
    pub path: String,

    /// Objects in file order
    pub objects: Vec<SchemaObject>,

    /// Parse and decode failures, already in violation form
    pub errors: Vec<Violation>,
}

/// Expand directories and check explicit files
///
/// Directories are walked recursively in file-name order; files with other
/// extensions are skipped. An explicit file with an unknown extension is an
/// error unless a format is forced.
pub fn discover(paths: &[PathBuf], format: InputFormat) -> Result<Vec<(PathBuf, InputFormat)>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                if let Some(resolved) = format.resolve(entry.path()) {
                    files.push((entry.into_path(), resolved));
                }
            }
        } else if path.is_file() {
            let resolved = match format {
                InputFormat::Auto => match format.resolve(path) {
                    Some(resolved) => resolved,
                    None => bail!(
                        "Cannot tell the format of {}; use --format sql or --format json",
                        path.display()
                    ),
                },
                forced => forced,
            };
            files.push((path.clone(), resolved));
        } else {
            bail!("Input not found: {}", path.display());
        }
    }

    Ok(files)
}

/// Read one file
pub fn load(path: &Path, format: InputFormat, parser: &SqlParser) -> Result<SourceFile> {
    match format {
        InputFormat::Json => load_json(path),
        _ => load_sql(path, parser),
    }
}

fn load_sql(path: &Path, parser: &SqlParser) -> Result<SourceFile> {
    let file_name = path.display().to_string();

    match parser.extract_file(path) {
        Ok(extraction) => {
            tracing::debug!(
                file = %file_name,
                objects = extraction.objects.len(),
                fields = extraction.field_count(),
                "read SQL file"
            );
            Ok(SourceFile {
                path: file_name,
                objects: extraction.objects,
                errors: extraction.errors,
            })
        }
        Err(err @ ExtractError::Io { .. }) => Err(err.into()),
        Err(err @ ExtractError::Tokenize { .. }) => {
            tracing::warn!(file = %file_name, error = %err, "SQL file could not be tokenized");
            Ok(SourceFile {
                errors: vec![Violation::new(ViolationCode::SqlParseError, file_name.clone(), err.to_string())
                    .with_location(Some(Location::new(file_name.clone())))],
                path: file_name,
                objects: Vec::new(),
            })
        }
    }
}

fn load_json(path: &Path) -> Result<SourceFile> {
    let file_name = path.display().to_string();
    let json = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", file_name))?;

    let mut file = SourceFile {
        path: file_name.clone(),
        ..SourceFile::default()
    };

    let batch = match SchemaObject::batch_from_json(&json) {
        Ok(batch) => batch,
        Err(err) => {
            file.errors.push(malformed(&file_name, file_name.clone(), err));
            return Ok(file);
        }
    };

    for (index, item) in batch.into_iter().enumerate() {
        match item {
            Ok(mut object) => {
                if object.location.is_none() {
                    object.location = Some(Location::new(file_name.clone()));
                }
                file.objects.push(object);
            }
            Err(err) => file.errors.push(malformed(&file_name, format!("element #{}", index), err)),
        }
    }

    Ok(file)
}

fn malformed(file: &str, subject: String, err: InputError) -> Violation {
    Violation::new(ViolationCode::InputMalformed, subject, err.to_string())
        .with_location(Some(Location::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn discover_walks_directories_in_name_order() {
        let dir = TempDir::new().unwrap();
        write(&dir, "b.sql", "");
        write(&dir, "a.json", "[]");
        write(&dir, "nested/c.sql", "");
        write(&dir, "README.md", "");

        let found: Vec<_> = discover(&[dir.path().to_path_buf()], InputFormat::Auto)
            .unwrap()
            .into_iter()
            .map(|(p, f)| (p.file_name().unwrap().to_string_lossy().into_owned(), f))
            .collect();

        assert_eq!(
            found,
            vec![
                ("a.json".to_string(), InputFormat::Json),
                ("b.sql".to_string(), InputFormat::Sql),
                ("c.sql".to_string(), InputFormat::Sql),
            ]
        );

        let only_sql = discover(&[dir.path().to_path_buf()], InputFormat::Sql).unwrap();
        assert_eq!(only_sql.len(), 2);
    }

    #[test]
    fn explicit_file_needs_known_format() {
        let dir = TempDir::new().unwrap();
        let ddl = write(&dir, "schema.ddl", "CREATE TABLE tb_a (id INT);");

        assert!(discover(&[ddl.clone()], InputFormat::Auto).is_err());
        assert_eq!(discover(&[ddl], InputFormat::Sql).unwrap().len(), 1);
        assert!(discover(&[dir.path().join("missing.sql")], InputFormat::Auto).is_err());
    }

    #[test]
    fn json_elements_fail_independently() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "objects.json",
            r#"[
                {"name": "tb_users", "kind": "table"},
                {"name": "vw_users", "kind": 42},
                {"name": "mv_users", "kind": "materialized_view"}
            ]"#,
        );

        let file = load(&path, InputFormat::Json, &SqlParser::new()).unwrap();
        assert_eq!(file.objects.len(), 2);
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].code, ViolationCode::InputMalformed);
        assert_eq!(file.errors[0].object_name, "element #1");
        assert_eq!(file.objects[0].location, Some(Location::new(path.display().to_string())));
    }

    #[test]
    fn json_document_that_is_not_an_array() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "objects.json", r#"{"name": "tb_users"}"#);

        let file = load(&path, InputFormat::Json, &SqlParser::new()).unwrap();
        assert!(file.objects.is_empty());
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].code, ViolationCode::InputMalformed);
    }

    #[test]
    fn untokenizable_sql_is_one_violation() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.sql", "COMMENT ON TABLE tb_a IS 'unterminated");

        let file = load(&path, InputFormat::Sql, &SqlParser::new()).unwrap();
        assert!(file.objects.is_empty());
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].code, ViolationCode::SqlParseError);
    }
}
