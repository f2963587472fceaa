use std::{env, fs};

use anyhow::Context;
use free_throw_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

/// Print the OpenAPI document, or write it to the path given as first argument.
fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi()
        .to_pretty_json()
        .context("serializing OpenAPI document")?;

    match env::args().nth(1) {
        Some(path) => fs::write(&path, doc).with_context(|| format!("writing {path}"))?,
        None => println!("{doc}"),
    }
    Ok(())
}
