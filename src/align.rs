// Slot alignment: the file at sorted position `p` in every folder goes into
// item `p`. Folders are matched by position only, never by name, so a file
// missing from the middle of one folder shifts every later pairing for it.

use serde::{Deserialize, Serialize};

use crate::folders::SortedFolder;

/// One file placed into a named slot of an item.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub as_frames: bool,
    pub file_name: String,
    pub slot_name: String,
}

/// An item as sent to the registration endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub path: String,
    pub slots: Vec<SlotAssignment>,
    pub name: String,
}

/// Index of the folder with the most files; the first one wins a tie.
pub fn anchor_index(folders: &[SortedFolder]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, folder) in folders.iter().enumerate() {
        match best {
            Some(b) if folders[b].len() >= folder.len() => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Build one item per position of the anchor folder.
///
/// Each item is named after the anchor's file at that position and gets a
/// slot from every folder that still has a file there. Shorter folders are
/// skipped for the remaining positions. Returns no items when every folder
/// is empty.
pub fn align_slots(folders: &[SortedFolder], item_path: &str) -> Vec<Item> {
    let Some(anchor) = anchor_index(folders) else {
        return Vec::new();
    };

    folders[anchor]
        .files
        .iter()
        .enumerate()
        .map(|(position, anchor_file)| {
            let slots = folders
                .iter()
                .filter_map(|folder| {
                    folder.files.get(position).map(|file| SlotAssignment {
                        as_frames: false,
                        file_name: file.name.clone(),
                        slot_name: folder.slot_name.clone(),
                    })
                })
                .collect();
            Item {
                path: item_path.to_string(),
                slots,
                name: anchor_file.name.clone(),
            }
        })
        .collect()
}
