//! Chat folder resolution and membership.

use crate::channels::{Dialog, Folder};

/// The folder titled exactly `title`, if any.
pub fn find_folder<'a>(folders: &'a [Folder], title: &str) -> Option<&'a Folder> {
    folders.iter().find(|f| f.title == title)
}

/// Whether `dialog` belongs to `folder`.
///
/// Exclusion wins over everything. Otherwise a dialog is a member if it is
/// listed explicitly, or if the folder takes all broadcast channels and the
/// dialog is one (supergroups do not count).
pub fn is_member(folder: &Folder, dialog: &Dialog) -> bool {
    if folder.exclude_peers.contains(&dialog.peer) {
        return false;
    }
    if folder.include_peers.contains(&dialog.peer) {
        return true;
    }
    folder.broadcasts && dialog.is_broadcast()
}

/// Dialogs that belong to `folder`, in input order.
pub fn members(folder: &Folder, dialogs: &[Dialog]) -> Vec<Dialog> {
    dialogs
        .iter()
        .filter(|d| is_member(folder, d))
        .cloned()
        .collect()
}
