//! `bytelink run` - bootstrap a shared-library module.

use super::load_config;
use anyhow::Context;
use bytelink_runtime::module::SharedLibraryLoader;
use bytelink_runtime::Bootstrap;
use std::path::Path;

pub async fn execute(module: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    if !module.exists() {
        anyhow::bail!("Module not found: {}", module.display());
    }
    let config = load_config(config)?;

    let mut rt = Bootstrap::new(config)
        .run(SharedLibraryLoader::new(module))
        .await
        .with_context(|| format!("Failed to bootstrap {}", module.display()))?;
    rt.flush();

    log::debug!(
        "{} heap objects, {} linked call sites, {} open files",
        rt.heap().len(),
        rt.linker().len(),
        rt.files().open_count()
    );
    Ok(())
}
