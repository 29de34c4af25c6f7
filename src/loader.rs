//! Declaration Loading
//!
//! Builds a [`TypeUniverse`] from JSON declaration files. Each input path is
//! either a file or a directory walked recursively for `*.json` files. A file
//! holds one declaration, a list of them, or `{ "types": [...] }`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use walkdir::WalkDir;

use crate::types::{parse_declarations, TypeUniverse};

/// Directory names never descended into
const SKIP_DIRS: [&str; 4] = ["target", ".git", "node_modules", ".cargo"];

/// Load every declaration found under `paths`
pub fn load_universe<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<TypeUniverse> {
    let mut universe = TypeUniverse::new();
    for file in declaration_files(paths)? {
        let content =
            fs::read_to_string(&file).with_context(|| format!("Failed to read {}", file.display()))?;
        let decls = parse_declarations(&content)
            .with_context(|| format!("Failed to parse declarations in {}", file.display()))?;
        tracing::debug!(file = %file.display(), count = decls.len(), "loaded declarations");
        universe.extend(decls);
    }
    tracing::info!(types = universe.declarations().count(), "type universe ready");
    Ok(universe)
}

/// Input files in a stable order: explicit files as given, directory
/// contents sorted by path
fn declaration_files<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if !path.is_dir() {
            anyhow::bail!("Input path does not exist: {}", path.display());
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .map_or(false, |name| SKIP_DIRS.contains(&name))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .map(|e| e.into_path())
            .collect();
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_directory_and_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("billing")).unwrap();
        fs::create_dir_all(dir.path().join("target")).unwrap();
        fs::write(
            dir.path().join("billing/invoice.json"),
            r#"{ "name": "com.acme.Invoice", "members": [{ "name": "total", "type": "big-decimal" }] }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("status.json"),
            r#"{ "types": [{ "name": "com.acme.Status", "kind": "enum", "constants": ["OPEN"] }] }"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "not json").unwrap();
        fs::write(dir.path().join("target/stale.json"), "{ broken").unwrap();

        let universe = load_universe(&[dir.path()]).unwrap();
        assert!(universe.contains("com.acme.Invoice"));
        assert!(universe.contains("com.acme.Status"));
        assert_eq!(universe.declarations().count(), 2);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.json");
        fs::write(&file, "[{ \"name\": 3 }]").unwrap();

        let err = load_universe(&[&file]).unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        assert!(load_universe(&[dir.path().join("absent")]).is_err());
    }
}
