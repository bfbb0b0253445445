//! Bootstrap sequencer for compiled modules
//!
//! Instantiation is asynchronous; everything after it runs in a fixed
//! order:
//!
//! 1. instantiate the module (suspends until ready or failed)
//! 2. build an exported-mode runtime around it
//! 3. hand the module the import dispatch (`link`)
//! 4. run guest static initialization (`bootstrap`)
//! 5. enable file I/O
//!
//! Static initializers therefore see a fully wired import table, and file
//! I/O only becomes usable once they have finished.

use crate::config::{BridgeConfig, ExecutionMode};
use crate::files::{ByteSource, ConsoleWriter};
use crate::imports::ImportTable;
use crate::module::{LoadError, ModuleLoader};
use crate::runtime::Runtime;
use bytelink_sdk::BridgeError;
use std::sync::Arc;
use thiserror::Error;

/// Bootstrap failures, by phase
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The module could not be loaded or instantiated
    #[error("Failed to instantiate module: {0}")]
    Instantiate(#[from] LoadError),

    /// The runtime could not be built or the module rejected linkage
    #[error("Failed to link module: {0}")]
    Link(BridgeError),

    /// Guest static initialization failed
    #[error("Static initialization failed: {0}")]
    StaticInit(BridgeError),
}

/// Drives a module from instantiation to a ready runtime
pub struct Bootstrap {
    config: BridgeConfig,
    imports: Option<Arc<ImportTable>>,
    source: Option<Arc<dyn ByteSource>>,
    console: Option<Arc<dyn ConsoleWriter>>,
}

impl Bootstrap {
    /// Create a sequencer. The configured mode is ignored; bootstrapped
    /// runtimes always run in exported mode.
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            imports: None,
            source: None,
            console: None,
        }
    }

    /// Use a custom import table
    pub fn with_imports(mut self, imports: Arc<ImportTable>) -> Self {
        self.imports = Some(imports);
        self
    }

    /// Use a custom byte source
    pub fn with_byte_source(mut self, source: Arc<dyn ByteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use a custom console writer
    pub fn with_console(mut self, console: Arc<dyn ConsoleWriter>) -> Self {
        self.console = Some(console);
        self
    }

    /// Run the full sequence
    pub async fn run(self, loader: impl ModuleLoader) -> Result<Runtime, BootstrapError> {
        let module = loader.instantiate().await.map_err(|e| {
            log::error!("module instantiation failed: {}", e);
            e
        })?;
        log::debug!("module {} instantiated", module.name());

        let mut config = self.config;
        config.mode = ExecutionMode::Exported;
        let mut builder = Runtime::builder(config).module(Arc::clone(&module));
        if let Some(imports) = self.imports {
            builder = builder.imports(imports);
        }
        if let Some(source) = self.source {
            builder = builder.byte_source(source);
        }
        if let Some(console) = self.console {
            builder = builder.console(console);
        }
        let mut rt = builder.build().map_err(BootstrapError::Link)?;

        module.link(&mut rt).map_err(BootstrapError::Link)?;
        module.bootstrap(&mut rt).map_err(|e| {
            log::error!("static initialization of {} failed: {}", module.name(), e);
            BootstrapError::StaticInit(e)
        })?;
        rt.files_mut().enable();

        log::info!("Bootstrapped module {}", module.name());
        Ok(rt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::MemorySource;
    use crate::module::{MemoryModule, ModuleExports, ReadyModule};

    #[tokio::test]
    async fn test_file_io_enabled_after_static_init() {
        let source = Arc::new(MemorySource::new());
        source.stage("boot.txt", b"ok".to_vec());

        let module = MemoryModule::new("guest").with_bootstrap(|rt| {
            assert!(!rt.files().is_enabled());
            assert_eq!(rt.files_mut().open_for_read("boot.txt"), -1);
            Ok(())
        });
        let module: Arc<dyn ModuleExports> = Arc::new(module);

        let mut rt = Bootstrap::new(BridgeConfig::default())
            .with_byte_source(source)
            .run(ReadyModule(module))
            .await
            .unwrap();
        assert_eq!(rt.mode(), ExecutionMode::Exported);
        assert!(rt.files().is_enabled());
        assert!(rt.files_mut().open_for_read("boot.txt") >= 3);
    }

    #[tokio::test]
    async fn test_static_init_failure() {
        let module = MemoryModule::new("broken")
            .with_bootstrap(|_| Err(BridgeError::UnsupportedOperation("boom".to_string())));
        let module: Arc<dyn ModuleExports> = Arc::new(module);

        let result = Bootstrap::new(BridgeConfig::default())
            .run(ReadyModule(module))
            .await;
        assert!(matches!(result, Err(BootstrapError::StaticInit(_))));
    }
}
