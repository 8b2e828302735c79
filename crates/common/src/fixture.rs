//! Fixture entries and the file-list rows they are expected to produce

use serde::{Deserialize, Serialize};

/// A row of the file list as reported by `getFileList`:
/// `[name, size, type, last modified]`.
pub type FileRow = Vec<String>;

/// Column holding the size text in a [`FileRow`]
pub const SIZE_COLUMN: usize = 1;

/// Column holding the last-modified text in a [`FileRow`]
pub const LAST_MODIFIED_COLUMN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    SharedDrive,
    Computer,
}

/// Description of an entry seeded into a fake volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestEntryInfo {
    #[serde(rename = "type")]
    pub kind: EntryKind,

    /// Path of the entry inside its volume
    pub target_path: String,

    /// Name as rendered in the file list
    pub name_text: String,

    /// Size as rendered in the file list ("--" for folders)
    pub size_text: String,

    /// Type column text, e.g. "Plain text" or "Folder"
    pub type_text: String,

    /// Last-modified column text
    pub last_modified_text: String,
}

impl TestEntryInfo {
    pub fn file(target_path: impl Into<String>, size_text: impl Into<String>, type_text: impl Into<String>) -> Self {
        let target_path = target_path.into();
        Self {
            kind: EntryKind::File,
            name_text: base_name(&target_path),
            target_path,
            size_text: size_text.into(),
            type_text: type_text.into(),
            last_modified_text: String::new(),
        }
    }

    pub fn directory(target_path: impl Into<String>) -> Self {
        let target_path = target_path.into();
        Self {
            kind: EntryKind::Directory,
            name_text: base_name(&target_path),
            target_path,
            size_text: "--".to_string(),
            type_text: "Folder".to_string(),
            last_modified_text: String::new(),
        }
    }

    pub fn modified(mut self, last_modified_text: impl Into<String>) -> Self {
        self.last_modified_text = last_modified_text.into();
        self
    }

    pub fn named(mut self, name_text: impl Into<String>) -> Self {
        self.name_text = name_text.into();
        self
    }

    /// The row this entry should appear as in the file list.
    pub fn expected_row(&self) -> FileRow {
        vec![
            self.name_text.clone(),
            self.size_text.clone(),
            self.type_text.clone(),
            self.last_modified_text.clone(),
        ]
    }
}

/// Expected rows for `entries`, sorted for order-independent comparison.
pub fn rows_sorted(entries: &[TestEntryInfo]) -> Vec<FileRow> {
    let mut rows: Vec<FileRow> = entries.iter().map(TestEntryInfo::expected_row).collect();
    rows.sort();
    rows
}

/// Drop the given columns from every row.
pub fn strip_columns(rows: &[FileRow], columns: &[usize]) -> Vec<FileRow> {
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(i, _)| !columns.contains(i))
                .map(|(_, cell)| cell.clone())
                .collect()
        })
        .collect()
}

fn base_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_row_uses_display_columns() {
        let entry = TestEntryInfo::file("photos/hello.txt", "51 bytes", "Plain text")
            .modified("Sep 4, 1998, 12:34 PM");
        assert_eq!(
            entry.expected_row(),
            vec!["hello.txt", "51 bytes", "Plain text", "Sep 4, 1998, 12:34 PM"]
        );
    }

    #[test]
    fn test_directory_defaults() {
        let entry = TestEntryInfo::directory("photos/");
        assert_eq!(entry.name_text, "photos");
        assert_eq!(entry.size_text, "--");
        assert_eq!(entry.type_text, "Folder");
    }

    #[test]
    fn test_rows_sorted_and_column_stripping() {
        let entries = vec![
            TestEntryInfo::file("world.ogv", "59 KB", "OGG video").modified("Jul 4, 2012"),
            TestEntryInfo::file("beautiful.ogg", "14 KB", "OGG audio").modified("Nov 12, 2013"),
        ];
        let rows = rows_sorted(&entries);
        assert_eq!(rows[0][0], "beautiful.ogg");

        let stripped = strip_columns(&rows, &[LAST_MODIFIED_COLUMN]);
        assert_eq!(stripped[1], vec!["world.ogv", "59 KB", "OGG video"]);

        let names_only = strip_columns(&rows, &[SIZE_COLUMN, 2, LAST_MODIFIED_COLUMN]);
        assert_eq!(names_only, vec![vec!["beautiful.ogg"], vec!["world.ogv"]]);
    }

    #[test]
    fn test_serializes_for_add_entries_message() {
        let entry = TestEntryInfo::directory("photos");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "directory");
        assert_eq!(json["targetPath"], "photos");
        assert_eq!(json["nameText"], "photos");
    }
}
