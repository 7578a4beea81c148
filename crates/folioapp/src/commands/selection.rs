//! Checked-file state over a folder listing.
//!
//! A [`Selection`] owns the listed files, the set of checked ids and an optional
//! segment filter. The filter only hides files; it never unchecks them, but
//! [`Selection::checked_ids`] reports visible checked files only, so a batch never
//! touches a file the operator cannot see.

use crate::model::RemoteFile;
use crate::segments::extract;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Selection {
    files: Vec<RemoteFile>,
    checked: HashSet<String>,
    filter: Option<String>,
}

impl Selection {
    pub fn new(files: Vec<RemoteFile>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    /// Replaces the listing, keeping checks on files still present.
    pub fn replace_files(&mut self, files: Vec<RemoteFile>) {
        let present: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();
        self.checked.retain(|id| present.contains(id.as_str()));
        self.files = files;
    }

    fn is_visible(&self, file: &RemoteFile) -> bool {
        match &self.filter {
            None => true,
            Some(segment) => extract(&file.name)
                .segments
                .iter()
                .any(|s| s.to_lowercase() == *segment),
        }
    }

    /// Files passing the current filter, in listing order.
    pub fn visible(&self) -> Vec<&RemoteFile> {
        self.files.iter().filter(|f| self.is_visible(f)).collect()
    }

    /// Checks every visible file.
    pub fn select_all(&mut self) {
        let ids: Vec<String> = self.visible().iter().map(|f| f.id.clone()).collect();
        self.checked.extend(ids);
    }

    pub fn clear(&mut self) {
        self.checked.clear();
    }

    /// Flips one file. Returns whether it is now checked; unknown ids stay unchecked.
    pub fn toggle(&mut self, id: &str) -> bool {
        if !self.files.iter().any(|f| f.id == id) {
            return false;
        }
        if self.checked.remove(id) {
            false
        } else {
            self.checked.insert(id.to_string());
            true
        }
    }

    /// Shows only files having `segment` among their segments (case-insensitive).
    pub fn filter_by_segment(&mut self, segment: &str) {
        let segment = segment.trim().to_lowercase();
        self.filter = (!segment.is_empty()).then_some(segment);
    }

    pub fn clear_filter(&mut self) {
        self.filter = None;
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn is_checked(&self, id: &str) -> bool {
        self.checked.contains(id)
    }

    /// Visible checked ids in listing order; this is what batch commands take.
    pub fn checked_ids(&self) -> Vec<String> {
        self.visible()
            .into_iter()
            .filter(|f| self.checked.contains(&f.id))
            .map(|f| f.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Selection {
        Selection::new(vec![
            RemoteFile::new("f1", "1234567_report.pdf"),
            RemoteFile::new("f2", "1234568_Report-draft.docx"),
            RemoteFile::new("f3", "D09_photo.jpg"),
        ])
    }

    #[test]
    fn toggle_and_clear() {
        let mut sel = listing();
        assert!(sel.toggle("f2"));
        assert!(sel.is_checked("f2"));
        assert!(!sel.toggle("f2"));
        assert!(!sel.toggle("nope"));
        sel.toggle("f1");
        sel.clear();
        assert!(sel.checked_ids().is_empty());
    }

    #[test]
    fn select_all_respects_filter() {
        let mut sel = listing();
        sel.filter_by_segment("REPORT");
        assert_eq!(sel.visible().len(), 2);
        sel.select_all();
        sel.clear_filter();
        assert_eq!(sel.checked_ids(), vec!["f1", "f2"]);
    }

    #[test]
    fn hidden_checked_files_are_not_reported() {
        let mut sel = listing();
        sel.select_all();
        sel.filter_by_segment("photo");
        assert_eq!(sel.checked_ids(), vec!["f3"]);
        sel.clear_filter();
        assert_eq!(sel.checked_ids().len(), 3);
    }

    #[test]
    fn blank_filter_clears() {
        let mut sel = listing();
        sel.filter_by_segment("photo");
        sel.filter_by_segment("  ");
        assert_eq!(sel.filter(), None);
        assert_eq!(sel.visible().len(), 3);
    }

    #[test]
    fn replacing_files_drops_stale_checks() {
        let mut sel = listing();
        sel.select_all();
        sel.replace_files(vec![RemoteFile::new("f3", "D09_photo.jpg")]);
        assert_eq!(sel.checked_ids(), vec!["f3"]);
    }
}
