// Library root
// -----------
// The binary (`main.rs`) wires these modules together to run one upload.
//
// Module responsibilities:
// - `config`: credentials and upload settings from the environment or
//   `~/.ikupload.json`.
// - `api`: the `MediaService` seam and the blocking ImageKit client.
// - `error`: service/config error types and the `UploadFailure` record.
// - `uploader`: the upload flow and its diagnostic output.
//
// Keeping the service behind a trait lets the uploader be exercised with
// in-memory fakes instead of the network.
pub mod api;
pub mod config;
pub mod error;
pub mod uploader;
