// Entrypoint: upload one fixed file and print what happened.
// - Credentials come from the environment (see `config::Settings::load`).
// - Exit status is 0 whatever the outcome unless IKUPLOAD_STRICT is set.

use anyhow::Context;
use ikupload::{
    api::ImageKitClient,
    config::Settings,
    uploader::{UploadRequest, Uploader},
};
use std::process::ExitCode;

const LOCAL_FILE: &str = "Gemini_Generated_Image_a4pdpda4pdpda4pd.png";
const REMOTE_NAME: &str = "debug_test.png";

fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("Starting upload test...");
    match std::env::current_dir() {
        Ok(dir) => println!("Working directory: {}", dir.display()),
        Err(e) => println!("Working directory: <unavailable: {}>", e),
    }

    let settings = Settings::load().context("Failed to load ImageKit settings")?;
    if let Some(endpoint) = &settings.credentials.url_endpoint {
        println!("URL endpoint: {}", endpoint);
    }
    let client = ImageKitClient::from_settings(&settings)?;
    log::debug!("uploading via {}", client.upload_url());

    let mut uploader = Uploader::new(client).spinner(true);
    let outcome = uploader.upload(&UploadRequest::new(LOCAL_FILE, REMOTE_NAME));

    if settings.strict && !outcome.is_success() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
