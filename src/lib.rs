// Library root
// -----------
// This crate exposes the building blocks of the `multislot-upload` CLI. The
// binary (`main.rs`) parses arguments and drives `pipeline` with a real HTTP
// client.
//
// Module responsibilities:
// - `natsort`: natural ordering of file names ("img2" before "img10").
// - `folders`: folder listing and the file name -> path lookup.
// - `align`: pairs sorted files from every folder into multi-slot items.
// - `api`: HTTP interactions with the dataset service behind `DatasetApi`.
// - `upload`: sign / transfer / confirm for each registered upload handle.
// - `pipeline`: runs the stages in order.
// - `config`, `error`, `retry`: run configuration, error types, backoff.
// - `ui`: terminal progress, prompts and the end-of-run summary.
pub mod align;
pub mod api;
pub mod config;
pub mod error;
pub mod folders;
pub mod natsort;
pub mod pipeline;
pub mod retry;
pub mod ui;
pub mod upload;
