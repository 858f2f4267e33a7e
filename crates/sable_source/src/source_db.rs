//! Central database of all source files in a compilation session.

use crate::file_id::FileId;
use crate::resolved_span::ResolvedSpan;
use crate::source_file::SourceFile;
use crate::span::Span;
use std::io;
use std::path::{Path, PathBuf};

/// The source database, owning all loaded source text, resolving
/// [`FileId`] + byte offsets to line/column coordinates for diagnostics,
/// and searching include directories for the preprocessor.
pub struct SourceDb {
    files: Vec<SourceFile>,
    user_dirs: Vec<PathBuf>,
    system_dirs: Vec<PathBuf>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            user_dirs: Vec::new(),
            system_dirs: Vec::new(),
        }
    }

    /// Adds a directory to the user include search path (`` `include "..." ``).
    pub fn add_user_dir(&mut self, dir: impl Into<PathBuf>) {
        self.user_dirs.push(dir.into());
    }

    /// Adds a directory to the system include search path (`` `include <...> ``).
    pub fn add_system_dir(&mut self, dir: impl Into<PathBuf>) {
        self.system_dirs.push(dir.into());
    }

    /// Loads a source file from the filesystem and returns its [`FileId`].
    pub fn load_file(&mut self, path: &Path) -> Result<FileId, io::Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.add_source(path.to_path_buf(), content))
    }

    /// Adds a source file from an in-memory string (useful for tests).
    ///
    /// The `name` parameter is used as the file path in diagnostics.
    pub fn add_source(&mut self, name: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        let file = SourceFile::new(id, name.into(), content);
        self.files.push(file);
        id
    }

    /// Resolves an included file name against the search paths and loads it.
    ///
    /// Quoted includes (`is_system == false`) search the including file's
    /// directory, then the user directories, then the system directories.
    /// Angle-bracket includes search only the system directories. Returns
    /// `None` if the file cannot be found or read.
    pub fn load_include(
        &mut self,
        name: &str,
        is_system: bool,
        including_file: FileId,
    ) -> Option<FileId> {
        let mut candidates = Vec::new();
        if !is_system {
            if let Some(parent) = self.get_file(including_file).path.parent() {
                candidates.push(parent.join(name));
            }
            for dir in &self.user_dirs {
                candidates.push(dir.join(name));
            }
        }
        for dir in &self.system_dirs {
            candidates.push(dir.join(name));
        }
        for path in candidates {
            if let Ok(content) = std::fs::read_to_string(&path) {
                return Some(self.add_source(path, content));
            }
        }
        None
    }

    /// Returns the [`SourceFile`] for the given [`FileId`].
    ///
    /// # Panics
    ///
    /// Panics if the `FileId` is invalid.
    pub fn get_file(&self, id: FileId) -> &SourceFile {
        &self.files[id.as_raw() as usize]
    }

    /// Resolves a [`Span`] to human-readable line/column coordinates.
    pub fn resolve_span(&self, span: Span) -> ResolvedSpan {
        let file = self.get_file(span.file);
        let (start_line, start_col) = file.line_col(span.start);
        let (end_line, end_col) = file.line_col(span.end.saturating_sub(1).max(span.start));
        ResolvedSpan {
            file_path: file.path.clone(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Returns the source text corresponding to a [`Span`].
    pub fn snippet(&self, span: Span) -> &str {
        let file = self.get_file(span.file);
        file.snippet(span.start, span.end)
    }
}

impl Default for SourceDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut db = SourceDb::new();
        let id = db.add_source("test.sv", "module top;".to_string());
        let file = db.get_file(id);
        assert_eq!(file.content, "module top;");
    }

    #[test]
    fn resolve_span() {
        let mut db = SourceDb::new();
        let id = db.add_source("test.sv", "abc\ndef\nghi".to_string());
        let span = Span::new(id, 4, 7); // "def"
        let resolved = db.resolve_span(span);
        assert_eq!(resolved.file_path, PathBuf::from("test.sv"));
        assert_eq!(resolved.start_line, 2);
        assert_eq!(resolved.start_col, 1);
        assert_eq!(resolved.end_line, 2);
        assert_eq!(resolved.end_col, 3);
    }

    #[test]
    fn snippet() {
        let mut db = SourceDb::new();
        let id = db.add_source("test.sv", "module top;".to_string());
        let span = Span::new(id, 0, 6);
        assert_eq!(db.snippet(span), "module");
    }

    #[test]
    fn multiple_files() {
        let mut db = SourceDb::new();
        let id1 = db.add_source("a.sv", "file one".to_string());
        let id2 = db.add_source("b.sv", "file two".to_string());
        assert_ne!(id1, id2);
        assert_eq!(db.get_file(id1).content, "file one");
        assert_eq!(db.get_file(id2).content, "file two");
    }

    #[test]
    fn include_search_user_dirs() {
        let dir = std::env::temp_dir().join("sable_source_inc_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("defs.svh"), "`define FROM_INCLUDE 1\n").unwrap();

        let mut db = SourceDb::new();
        let main = db.add_source("main.sv", "`include \"defs.svh\"\n".to_string());
        db.add_user_dir(&dir);

        let inc = db.load_include("defs.svh", false, main);
        assert!(inc.is_some());
        assert!(db.get_file(inc.unwrap()).content.contains("FROM_INCLUDE"));

        assert!(db.load_include("missing.svh", false, main).is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn system_include_skips_user_dirs() {
        let dir = std::env::temp_dir().join("sable_source_sys_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("sys.svh"), "// system header\n").unwrap();

        let mut db = SourceDb::new();
        let main = db.add_source("main.sv", String::new());
        db.add_user_dir(&dir);
        // As a user dir only, an angle-bracket include must not find it.
        assert!(db.load_include("sys.svh", true, main).is_none());

        db.add_system_dir(&dir);
        assert!(db.load_include("sys.svh", true, main).is_some());
        std::fs::remove_dir_all(&dir).ok();
    }
}
