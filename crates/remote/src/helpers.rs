//! Waits built from the polling waiter and one remote operation each.
//!
//! Every helper is `#[track_caller]`, so pending messages and timeouts name
//! the test line that started the wait rather than this module.

use filesapp_harness_common::fixture::{rows_sorted, strip_columns, LAST_MODIFIED_COLUMN, SIZE_COLUMN};
use filesapp_harness_common::{pending, poll_until, CallerTag, FileRow, ProbeOutcome, Result, TestEntryInfo};
use serde::Serialize;
use std::future::Future;

use crate::call::TestMessage;
use crate::dispatcher::AppHandle;
use crate::ops::{ElementObject, FakeMouseClick, GetBreadcrumbPath, GetFileList, QueryAllElements};

/// How `wait_for_files` compares rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileListOptions {
    pub ignore_file_size: bool,
    pub ignore_last_modified: bool,
    /// Require the rows in the listed order instead of comparing them sorted
    pub check_order: bool,
}

impl FileListOptions {
    fn ignored_columns(&self) -> Vec<usize> {
        let mut columns = Vec::new();
        if self.ignore_file_size {
            columns.push(SIZE_COLUMN);
        }
        if self.ignore_last_modified {
            columns.push(LAST_MODIFIED_COLUMN);
        }
        columns
    }

    fn normalize(&self, rows: &[FileRow]) -> Vec<FileRow> {
        let mut rows = strip_columns(rows, &self.ignored_columns());
        if !self.check_order {
            rows.sort();
        }
        rows
    }
}

/// Volume a fixture entry is seeded into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Volume {
    Local,
    Drive,
    Usb,
    Smbfs,
    Android,
}

/// Fake volume the application can be asked to mount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeVolume {
    Usb,
    UsbDcim,
    Mtp,
    Smbfs,
    Android,
}

impl FakeVolume {
    fn message_name(&self) -> &'static str {
        match self {
            FakeVolume::Usb => "mountFakeUsb",
            FakeVolume::UsbDcim => "mountFakeUsbDcim",
            FakeVolume::Mtp => "mountFakeMtp",
            FakeVolume::Smbfs => "mountSmbfs",
            FakeVolume::Android => "mountPlayFiles",
        }
    }
}

impl AppHandle {
    /// Wait until `query` matches at least one element and return the first.
    #[track_caller]
    pub fn wait_for_element<'a>(&'a self, query: &'a str) -> impl Future<Output = Result<ElementObject>> + 'a {
        let caller = CallerTag::here();
        async move {
            poll_until(caller, self.policy.clone(), move || async move {
                let elements = self.call(&QueryAllElements::new(query)).await?;
                Ok(match elements.into_iter().next() {
                    Some(element) => ProbeOutcome::Done(element),
                    None => pending!("Element %s does not exist", query),
                })
            })
            .await
        }
    }

    /// Wait until nothing matches `query`.
    #[track_caller]
    pub fn wait_for_element_lost<'a>(&'a self, query: &'a str) -> impl Future<Output = Result<()>> + 'a {
        let caller = CallerTag::here();
        async move {
            poll_until(caller, self.policy.clone(), move || async move {
                let elements = self.call(&QueryAllElements::new(query)).await?;
                Ok(if elements.is_empty() {
                    ProbeOutcome::Done(())
                } else {
                    pending!("Element %s still exists (%d match)", query, elements.len())
                })
            })
            .await
        }
    }

    /// Wait until an element matching `query` shows exactly `text`.
    #[track_caller]
    pub fn wait_for_element_with_text<'a>(
        &'a self,
        query: &'a str,
        text: &'a str,
    ) -> impl Future<Output = Result<ElementObject>> + 'a {
        let caller = CallerTag::here();
        async move {
            poll_until(caller, self.policy.clone(), move || async move {
                let elements = self.call(&QueryAllElements::new(query)).await?;
                let seen: Vec<String> = elements
                    .iter()
                    .filter_map(|e| e.visible_text().map(|t| t.trim().to_string()))
                    .collect();
                Ok(
                    match elements
                        .into_iter()
                        .find(|e| e.visible_text().map(str::trim) == Some(text))
                    {
                        Some(element) => ProbeOutcome::Done(element),
                        None => pending!("Element %s with text %j not found, saw %j", query, text, seen),
                    },
                )
            })
            .await
        }
    }

    /// Wait until the file list holds exactly `expected`.
    #[track_caller]
    pub fn wait_for_files<'a>(
        &'a self,
        expected: &'a [FileRow],
        options: FileListOptions,
    ) -> impl Future<Output = Result<()>> + 'a {
        let caller = CallerTag::here();
        async move {
            let expected = options.normalize(expected);
            let expected = &expected;
            poll_until(caller, self.policy.clone(), move || async move {
                let actual = options.normalize(&self.call(&GetFileList).await?);
                Ok(if actual == *expected {
                    ProbeOutcome::Done(())
                } else {
                    pending!("waitForFiles: expected: %j actual %j", expected, actual)
                })
            })
            .await
        }
    }

    /// Wait until the file list shows the rows of `entries`.
    #[track_caller]
    pub fn wait_for_entries<'a>(
        &'a self,
        entries: &'a [TestEntryInfo],
        options: FileListOptions,
    ) -> impl Future<Output = Result<()>> + 'a {
        let caller = CallerTag::here();
        async move {
            let rows: Vec<FileRow> = if options.check_order {
                entries.iter().map(TestEntryInfo::expected_row).collect()
            } else {
                rows_sorted(entries)
            };
            let expected = options.normalize(&rows);
            let expected = &expected;
            poll_until(caller, self.policy.clone(), move || async move {
                let actual = options.normalize(&self.call(&GetFileList).await?);
                Ok(if actual == *expected {
                    ProbeOutcome::Done(())
                } else {
                    pending!("waitForFiles: expected: %j actual %j", expected, actual)
                })
            })
            .await
        }
    }

    /// Wait until the file list has `count` rows and return them.
    #[track_caller]
    pub fn wait_for_file_list_count(&self, count: usize) -> impl Future<Output = Result<Vec<FileRow>>> + '_ {
        let caller = CallerTag::here();
        async move {
            poll_until(caller, self.policy.clone(), move || async move {
                let rows = self.call(&GetFileList).await?;
                Ok(if rows.len() == count {
                    ProbeOutcome::Done(rows)
                } else {
                    pending!("Expected %d files, found %d", count, rows.len())
                })
            })
            .await
        }
    }

    /// Wait until the breadcrumb shows `path`.
    #[track_caller]
    pub fn wait_until_current_directory_is<'a>(&'a self, path: &'a str) -> impl Future<Output = Result<()>> + 'a {
        let caller = CallerTag::here();
        async move {
            poll_until(caller, self.policy.clone(), move || async move {
                let current = self.call(&GetBreadcrumbPath).await?;
                Ok(if current == path {
                    ProbeOutcome::Done(())
                } else {
                    pending!("Expected current directory %s, got %s", path, current)
                })
            })
            .await
        }
    }

    /// Click `query`, retrying until the remote side reports the click landed.
    #[track_caller]
    pub fn click_and_wait<'a>(&'a self, query: &'a str) -> impl Future<Output = Result<()>> + 'a {
        let caller = CallerTag::here();
        async move {
            poll_until(caller, self.policy.clone(), move || async move {
                Ok(if self.call(&FakeMouseClick::new(query)).await? {
                    ProbeOutcome::Done(())
                } else {
                    pending!("Failed to click %s", query)
                })
            })
            .await
        }
    }

    /// Seed `entries` into `volume`.
    pub async fn add_entries(&self, volume: Volume, entries: &[TestEntryInfo]) -> Result<String> {
        let message = TestMessage::new("addEntries")
            .field("volume", volume)?
            .field("entries", entries)?;
        self.send_test_message(&message).await
    }

    /// Ask the application to mount a fake volume.
    pub async fn mount_fake_volume(&self, volume: FakeVolume) -> Result<String> {
        self.send_test_message(&TestMessage::new(volume.message_name()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> FileRow {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_normalize_sorts_unless_order_checked() {
        let rows = vec![row(&["b", "1 KB", "Text", "Jan 2"]), row(&["a", "2 KB", "Text", "Jan 1"])];

        let sorted = FileListOptions::default().normalize(&rows);
        assert_eq!(sorted[0][0], "a");

        let ordered = FileListOptions {
            check_order: true,
            ..Default::default()
        }
        .normalize(&rows);
        assert_eq!(ordered[0][0], "b");
    }

    #[test]
    fn test_normalize_drops_ignored_columns() {
        let rows = vec![row(&["a", "2 KB", "Text", "Jan 1"])];
        let options = FileListOptions {
            ignore_file_size: true,
            ignore_last_modified: true,
            check_order: false,
        };
        assert_eq!(options.normalize(&rows), vec![row(&["a", "Text"])]);
    }

    #[test]
    fn test_fake_volume_messages() {
        assert_eq!(FakeVolume::Usb.message_name(), "mountFakeUsb");
        assert_eq!(FakeVolume::Android.message_name(), "mountPlayFiles");
    }
}
