// Wires the stages together: list and sort folders, align them into items,
// register the items, then hand the returned upload handles to the uploader.
//
// Everything up to `Plan::prepare` touches only the local filesystem, so a
// bad config or a missing folder aborts before anything is sent.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::align::{align_slots, Item};
use crate::api::{DatasetApi, RegisterUploadRequest};
use crate::config::UploadConfig;
use crate::error::{Result, UploadError};
use crate::folders::{FileIndex, SortedFolder};
use crate::retry::RetryPolicy;
use crate::upload::{UploadHandle, UploadObserver, UploadReport, Uploader};

/// Everything known locally before the first request.
#[derive(Debug)]
pub struct Plan {
    pub folders: Vec<SortedFolder>,
    pub items: Vec<Item>,
    pub index: FileIndex,
}

impl Plan {
    pub fn prepare(config: &UploadConfig) -> Result<Plan> {
        config.validate()?;
        let folders = config
            .slot_folders()
            .map(|(slot, path)| SortedFolder::load(slot, path))
            .collect::<Result<Vec<_>>>()?;
        for folder in &folders {
            info!(
                "Slot {} <- {} ({} files)",
                folder.slot_name,
                folder.path.display(),
                folder.len()
            );
        }
        let items = align_slots(&folders, &config.item_path);
        let index = FileIndex::build(&folders);
        Ok(Plan {
            folders,
            items,
            index,
        })
    }

    /// The exact body that registration would send.
    pub fn payload<'a>(&'a self, dataset_slug: &'a str) -> RegisterUploadRequest<'a> {
        RegisterUploadRequest {
            items: &self.items,
            dataset_slug,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.items.iter().map(|i| i.slots.len()).sum()
    }
}

/// Result of the registration call, resolved against local files.
#[derive(Debug, Default)]
pub struct Registration {
    pub items_registered: usize,
    pub handles: Vec<UploadHandle>,
    pub blocked_items: Vec<String>,
}

/// Register every planned item in one request and map each returned upload
/// id to the local file it belongs to.
pub fn register<A: DatasetApi + ?Sized>(
    api: &A,
    dataset_slug: &str,
    plan: &Plan,
    retry: &RetryPolicy,
) -> Result<Registration> {
    info!("Registering {} items in dataset {}", plan.items.len(), dataset_slug);
    let response = retry.run("register_upload", || {
        api.register_upload(dataset_slug, &plan.items)
    })?;

    let mut seen = HashSet::new();
    let mut handles = Vec::new();
    for slot in response.items.iter().flat_map(|item| &item.slots) {
        if !seen.insert(slot.upload_id.as_str()) {
            continue;
        }
        let path = plan.index.resolve(&slot.file_name).ok_or_else(|| {
            UploadError::Registration(format!(
                "service returned file name {} which is not in any source folder",
                slot.file_name
            ))
        })?;
        handles.push(UploadHandle {
            upload_id: slot.upload_id.clone(),
            file_name: slot.file_name.clone(),
            slot_name: slot.slot_name.clone(),
            path: path.to_path_buf(),
        });
    }

    let blocked_items: Vec<String> = response
        .blocked_items
        .iter()
        .map(|b| format!("{} ({})", b.name, b.reason()))
        .collect();
    for blocked in &blocked_items {
        warn!("Item blocked by the service: {}", blocked);
    }

    Ok(Registration {
        items_registered: response.items.len(),
        handles,
        blocked_items,
    })
}

/// Register the plan and upload every handle. An empty plan makes no
/// request at all and yields an empty report.
pub fn upload_all<A: DatasetApi + ?Sized>(
    api: &A,
    config: &UploadConfig,
    dataset_slug: &str,
    plan: &Plan,
    observer: &mut dyn UploadObserver,
) -> Result<UploadReport> {
    if plan.items.is_empty() {
        info!("All source folders are empty; nothing to register");
        return Ok(UploadReport::default());
    }

    let registration = register(api, dataset_slug, plan, &config.retry)?;
    let uploader = Uploader::new(api, &config.batch_name, config.retry.clone());
    let mut report = uploader.run(&registration.handles, observer);
    report.items_registered = registration.items_registered;
    report.blocked_items = registration.blocked_items;
    Ok(report)
}
