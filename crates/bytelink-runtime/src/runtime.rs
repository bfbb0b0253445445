//! Bridge runtime
//!
//! [`Runtime`] owns every piece of mutable bridge state: the host heap, the
//! class registry, the call-site linker and the file table. It is the
//! context every native handler receives, so handlers reach all bridge
//! services through `&mut Runtime`.

use crate::config::{BridgeConfig, ExecutionMode};
use crate::files::{self, ByteSource, ConsoleWriter, FileTable, LogConsole};
use crate::heap::{Heap, NativeSlot};
use crate::imports::{ImportEntry, ImportTable};
use crate::linker::{InvocationKind, Linker, MethodHandleDescriptor};
use crate::module::ModuleExports;
use crate::strings::{DirectStrings, ExportedStrings, StringBridge, TextKind};
use crate::types::{ClassBuilder, ClassId, ClassRegistry, MethodKind, OBJECT};
use bytelink_sdk::{BridgeError, BridgeResult, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// Instance field of `FileInputStream` / `FileOutputStream` holding the
/// `FileDescriptor`, and of `FileDescriptor` holding the handle
pub const FD_FIELD: &str = "fd";

// ============================================================================
// Core classes
// ============================================================================

/// Classes the bridge itself allocates instances of
#[derive(Debug, Clone, Copy)]
pub struct CoreClasses {
    /// `java.lang.Object`
    pub object: ClassId,
    /// `java.lang.Class`
    pub class: ClassId,
    /// `java.lang.String`
    pub string: ClassId,
    /// `java.lang.StringBuilder`
    pub string_builder: ClassId,
    /// `java.lang.StringBuffer`
    pub string_buffer: ClassId,
    /// `java.io.FileDescriptor`
    pub file_descriptor: ClassId,
    /// `java.io.FileInputStream`
    pub file_input_stream: ClassId,
    /// `java.io.FileOutputStream`
    pub file_output_stream: ClassId,
    /// `java.lang.invoke.MethodHandle`
    pub method_handle: ClassId,
    /// `java.lang.invoke.MethodType`
    pub method_type: ClassId,
    /// `java.lang.invoke.CallSite`
    pub call_site: ClassId,
    /// `bytelink.api.web.FloatArray`
    pub float_array: ClassId,
    /// `bytelink.api.web.IntArray`
    pub int_array: ClassId,
    /// `bytelink.api.web.Int16Array`
    pub int16_array: ClassId,
    /// `bytelink.api.web.Int8Array`
    pub int8_array: ClassId,
    /// `bytelink.api.web.OpaqueReferenceArray`
    pub reference_array: ClassId,
    /// `bytelink.api.web.Console`
    pub console: ClassId,
    /// `bytelink.api.web.Window`
    pub window: ClassId,
    /// `bytelink.api.web.Document`
    pub document: ClassId,
}

impl CoreClasses {
    fn register(classes: &mut ClassRegistry) -> BridgeResult<Self> {
        let mut class = |name: &str| classes.register(ClassBuilder::new(name));
        let class_id = class("java.lang.Class")?;
        let string = class("java.lang.String")?;
        let string_builder = class("java.lang.StringBuilder")?;
        let string_buffer = class("java.lang.StringBuffer")?;
        let file_descriptor = class("java.io.FileDescriptor")?;
        let file_input_stream = class("java.io.FileInputStream")?;
        let file_output_stream = class("java.io.FileOutputStream")?;
        let method_handle = class("java.lang.invoke.MethodHandle")?;
        let method_type = class("java.lang.invoke.MethodType")?;
        let call_site = class("java.lang.invoke.CallSite")?;

        let mut web = |name: &str| classes.register(ClassBuilder::new(format!("bytelink.api.web.{}", name)).interface());
        Ok(Self {
            object: OBJECT,
            class: class_id,
            string,
            string_builder,
            string_buffer,
            file_descriptor,
            file_input_stream,
            file_output_stream,
            method_handle,
            method_type,
            call_site,
            float_array: web("FloatArray")?,
            int_array: web("IntArray")?,
            int16_array: web("Int16Array")?,
            int8_array: web("Int8Array")?,
            reference_array: web("OpaqueReferenceArray")?,
            console: web("Console")?,
            window: web("Window")?,
            document: web("Document")?,
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Runtime`]
pub struct RuntimeBuilder {
    config: BridgeConfig,
    imports: Option<Arc<ImportTable>>,
    source: Option<Arc<dyn ByteSource>>,
    console: Option<Arc<dyn ConsoleWriter>>,
    module: Option<Arc<dyn ModuleExports>>,
}

impl RuntimeBuilder {
    /// Use a custom import table instead of the standard one
    pub fn imports(mut self, imports: Arc<ImportTable>) -> Self {
        self.imports = Some(imports);
        self
    }

    /// Use `source` instead of the one described by the configuration
    pub fn byte_source(mut self, source: Arc<dyn ByteSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Send console lines to `console` instead of the log facade
    pub fn console(mut self, console: Arc<dyn ConsoleWriter>) -> Self {
        self.console = Some(console);
        self
    }

    /// Attach a binary module; required in exported mode
    pub fn module(mut self, module: Arc<dyn ModuleExports>) -> Self {
        self.module = Some(module);
        self
    }

    /// Build the runtime.
    ///
    /// Direct mode enables file I/O immediately; exported mode leaves it
    /// to the bootstrap sequencer.
    pub fn build(self) -> BridgeResult<Runtime> {
        let config = self.config;
        config
            .validate()
            .map_err(|e| BridgeError::ArgumentError(e.to_string()))?;

        let source = match self.source {
            Some(source) => source,
            None => files::from_config(&config.files)
                .map_err(|e| BridgeError::ArgumentError(e.to_string()))?,
        };
        let console: Arc<dyn ConsoleWriter> = match self.console {
            Some(console) => console,
            None => Arc::new(LogConsole::new(&config.console)),
        };
        let imports = self.imports.unwrap_or_else(ImportTable::standard);

        let mut classes = ClassRegistry::new();
        let core = CoreClasses::register(&mut classes)?;

        let strings: Arc<dyn StringBridge> = match config.mode {
            ExecutionMode::Direct => Arc::new(DirectStrings::new(
                core.string,
                core.string_builder,
                core.string_buffer,
            )),
            ExecutionMode::Exported => {
                let module = self.module.clone().ok_or_else(|| {
                    BridgeError::ModuleError("exported mode requires a module".to_string())
                })?;
                Arc::new(ExportedStrings::new(module))
            }
        };

        let mut files = FileTable::new(source, console);
        if config.mode == ExecutionMode::Direct {
            files.enable();
        }

        log::debug!(
            "runtime ready: {:?} mode, {} import owners, {} core classes",
            config.mode,
            imports.len(),
            classes.len()
        );
        Ok(Runtime {
            config,
            heap: Heap::new(),
            classes,
            core,
            linker: Linker::new(),
            files,
            strings,
            imports,
            module: self.module,
        })
    }
}

// ============================================================================
// Runtime
// ============================================================================

/// Mutable bridge state shared by all native handlers
pub struct Runtime {
    pub(crate) config: BridgeConfig,
    pub(crate) heap: Heap,
    pub(crate) classes: ClassRegistry,
    pub(crate) core: CoreClasses,
    pub(crate) linker: Linker,
    pub(crate) files: FileTable,
    pub(crate) strings: Arc<dyn StringBridge>,
    pub(crate) imports: Arc<ImportTable>,
    pub(crate) module: Option<Arc<dyn ModuleExports>>,
}

impl Runtime {
    /// Create a runtime with the standard import table and the configured
    /// byte source
    pub fn new(config: BridgeConfig) -> BridgeResult<Self> {
        Self::builder(config).build()
    }

    /// Start building a runtime
    pub fn builder(config: BridgeConfig) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            imports: None,
            source: None,
            console: None,
            module: None,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Execution mode
    pub fn mode(&self) -> ExecutionMode {
        self.config.mode
    }

    /// Host heap
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable host heap
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Class registry
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Mutable class registry
    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    /// Register a guest class
    pub fn define_class(&mut self, builder: ClassBuilder) -> BridgeResult<ClassId> {
        self.classes.register(builder)
    }

    /// Classes the bridge allocates itself
    pub fn core(&self) -> &CoreClasses {
        &self.core
    }

    /// File-handle table
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// Mutable file-handle table
    pub fn files_mut(&mut self) -> &mut FileTable {
        &mut self.files
    }

    /// Import table
    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    /// Call-site linker
    pub fn linker(&self) -> &Linker {
        &self.linker
    }

    /// Attached binary module, if any
    pub fn module(&self) -> Option<&Arc<dyn ModuleExports>> {
        self.module.as_ref()
    }

    fn exports(&self) -> BridgeResult<Arc<dyn ModuleExports>> {
        self.module
            .clone()
            .ok_or_else(|| BridgeError::ModuleError("no module attached".to_string()))
    }

    /// Emit any partial console lines
    pub fn flush(&mut self) {
        self.files.flush();
    }
}

// ============================================================================
// Strings
// ============================================================================

impl Runtime {
    /// Host string behind a guest string, builder or buffer. Null reads as
    /// the empty string.
    pub fn host_string(&self, value: Value) -> BridgeResult<String> {
        self.strings.text(&self.heap, value)
    }

    /// New guest `java.lang.String`
    pub fn guest_string(&mut self, text: &str) -> BridgeResult<Value> {
        self.new_text(TextKind::String, text)
    }

    /// New guest text object of the given kind
    pub fn new_text(&mut self, kind: TextKind, text: &str) -> BridgeResult<Value> {
        self.strings.new_text(&mut self.heap, kind, text)
    }

    /// Replace the contents of a guest text object
    pub fn set_text(&mut self, value: Value, text: &str) -> BridgeResult<()> {
        self.strings.set_text(&mut self.heap, value, text)
    }
}

// ============================================================================
// Arrays
// ============================================================================

impl Runtime {
    /// New guest array. Exported mode allocates it inside the module.
    pub fn new_array(&mut self, items: Vec<Value>) -> BridgeResult<Value> {
        match self.mode() {
            ExecutionMode::Direct => Ok(Value::Ref(self.heap.alloc_array(items))),
            ExecutionMode::Exported => self.exports()?.new_array(&items),
        }
    }

    /// Length of a guest array
    pub fn array_len(&self, array: Value) -> BridgeResult<usize> {
        match array {
            Value::Ref(r) => Ok(self.heap.array(r)?.len()),
            Value::Extern(handle) => self.exports()?.array_len(handle),
            other => Err(null_or_mismatch("array", other)),
        }
    }

    /// Read a guest array element
    pub fn array_get(&self, array: Value, index: usize) -> BridgeResult<Value> {
        match array {
            Value::Ref(r) => self.heap.array(r)?.get(index),
            Value::Extern(handle) => self.exports()?.array_get(handle, index),
            other => Err(null_or_mismatch("array", other)),
        }
    }

    /// Write a guest array element
    pub fn array_set(&mut self, array: Value, index: usize, value: Value) -> BridgeResult<()> {
        match array {
            Value::Ref(r) => self.heap.array_mut(r)?.set(index, value),
            Value::Extern(handle) => self.exports()?.array_set(handle, index, value),
            other => Err(null_or_mismatch("array", other)),
        }
    }

    /// All elements of a guest array
    pub fn array_values(&self, array: Value) -> BridgeResult<Vec<Value>> {
        match array {
            Value::Ref(r) => Ok(self.heap.array(r)?.items.clone()),
            Value::Extern(handle) => {
                let module = self.exports()?;
                let len = module.array_len(handle)?;
                (0..len).map(|i| module.array_get(handle, i)).collect()
            }
            other => Err(null_or_mismatch("array", other)),
        }
    }
}

fn null_or_mismatch(expected: &str, got: Value) -> BridgeError {
    if got.is_null() {
        BridgeError::InvalidReference(format!("null {}", expected))
    } else {
        BridgeError::type_mismatch(expected, got.type_name())
    }
}

// ============================================================================
// File descriptors
// ============================================================================

impl Runtime {
    /// Handle stored in a file stream's descriptor, or `-1` if none
    pub fn descriptor(&self, stream: Value) -> BridgeResult<i32> {
        match stream {
            Value::Ref(r) => match self.heap.field(r, FD_FIELD)? {
                Value::Ref(fd) => Ok(self.heap.field(fd, FD_FIELD)?.as_i32().unwrap_or(-1)),
                _ => Ok(-1),
            },
            Value::Extern(handle) => self.exports()?.descriptor_handle(handle),
            other => Err(null_or_mismatch("file stream", other)),
        }
    }

    /// Store `fd` in a file stream's descriptor, allocating the
    /// `FileDescriptor` if the stream has none yet
    pub fn set_descriptor(&mut self, stream: Value, fd: i32) -> BridgeResult<()> {
        match stream {
            Value::Ref(r) => {
                let descriptor = match self.heap.field(r, FD_FIELD)? {
                    Value::Ref(existing) => existing,
                    _ => {
                        let created = self.heap.alloc_object(self.core.file_descriptor);
                        self.heap.set_field(r, FD_FIELD, Value::Ref(created))?;
                        created
                    }
                };
                self.heap.set_field(descriptor, FD_FIELD, Value::Int(fd))
            }
            Value::Extern(handle) => self.exports()?.set_descriptor_handle(handle, fd),
            other => Err(null_or_mismatch("file stream", other)),
        }
    }
}

// ============================================================================
// Natives and helpers
// ============================================================================

impl Runtime {
    fn resolve_import(&self, owner: &str, key: &str) -> BridgeResult<ImportEntry> {
        self.imports.resolve(owner, key).cloned().map_err(|e| {
            log::error!("{}", e);
            e
        })
    }

    /// Entry point for translated code and binary modules.
    ///
    /// In exported mode the module passes a placeholder before the
    /// arguments of static natives; it is dropped here so handlers see the
    /// same argument list in both modes.
    pub fn call_native(&mut self, owner: &str, key: &str, args: &[Value]) -> BridgeResult<Value> {
        let entry = self.resolve_import(owner, key)?;
        let args = if self.mode() == ExecutionMode::Exported && entry.kind == MethodKind::Static {
            args.get(1..).unwrap_or(&[])
        } else {
            args
        };
        log::trace!("native {}::{} ({} args)", owner, key, args.len());
        (entry.function)(self, args)
    }

    /// Invoke a native with an already normalized argument list
    pub fn invoke_native(&mut self, owner: &str, key: &str, args: &[Value]) -> BridgeResult<Value> {
        let entry = self.resolve_import(owner, key)?;
        (entry.function)(self, args)
    }

    /// New `java.lang.invoke.MethodHandle` for a method reference. `kind`
    /// is the raw invocation kind number.
    pub fn method_handle(&mut self, owner: ClassId, method: &str, kind: u8) -> BridgeResult<Value> {
        let kind = InvocationKind::try_from(kind)?;
        self.classes.class(owner)?;
        let handle = MethodHandleDescriptor::new(owner, method, kind);
        Ok(Value::Ref(self.heap.alloc_object_with(
            self.core.method_handle,
            NativeSlot::MethodHandle(handle),
        )))
    }

    /// New `java.lang.invoke.MethodType` returning `returns`
    pub fn method_type(&mut self, returns: ClassId) -> BridgeResult<Value> {
        self.classes.class(returns)?;
        Ok(Value::Ref(self.heap.alloc_object_with(
            self.core.method_type,
            NativeSlot::MethodType(returns),
        )))
    }

    /// Guest boolean as a host bool
    pub fn host_bool(value: Value) -> bool {
        value.as_bool().unwrap_or(false)
    }

    /// Host bool as a guest boolean
    pub fn guest_bool(value: bool) -> Value {
        Value::from_bool(value)
    }

    /// Three-way comparison as used by `lcmp`/`fcmp`/`dcmp`; unordered
    /// operands compare equal
    pub fn cmp<T: PartialOrd>(a: T, b: T) -> i32 {
        match a.partial_cmp(&b) {
            Some(Ordering::Greater) => 1,
            Some(Ordering::Less) => -1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_mode_enables_files() {
        let rt = Runtime::new(BridgeConfig::default()).unwrap();
        assert_eq!(rt.mode(), ExecutionMode::Direct);
        assert!(rt.files().is_enabled());
    }

    #[test]
    fn test_exported_mode_requires_module() {
        let config = BridgeConfig {
            mode: ExecutionMode::Exported,
            ..BridgeConfig::default()
        };
        assert!(matches!(Runtime::new(config), Err(BridgeError::ModuleError(_))));
    }

    #[test]
    fn test_core_classes_registered() {
        let rt = Runtime::new(BridgeConfig::default()).unwrap();
        let classes = rt.classes();
        assert_eq!(classes.by_name("java.lang.String"), Some(rt.core().string));
        assert!(classes.get(rt.core().console).unwrap().is_interface());
        assert_eq!(rt.core().object, OBJECT);
    }

    #[test]
    fn test_string_helpers() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let s = rt.guest_string("abc").unwrap();
        assert_eq!(rt.host_string(s).unwrap(), "abc");
        assert_eq!(rt.host_string(Value::Null).unwrap(), "");

        rt.set_text(s, "xyz").unwrap();
        assert_eq!(rt.host_string(s).unwrap(), "xyz");
    }

    #[test]
    fn test_array_helpers() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let arr = rt.new_array(vec![Value::Int(0); 3]).unwrap();
        rt.array_set(arr, 2, Value::Int(7)).unwrap();

        assert_eq!(rt.array_len(arr).unwrap(), 3);
        assert_eq!(rt.array_get(arr, 2).unwrap(), Value::Int(7));
        assert_eq!(rt.array_values(arr).unwrap(), vec![Value::Int(0), Value::Int(0), Value::Int(7)]);
        assert!(matches!(rt.array_len(Value::Null), Err(BridgeError::InvalidReference(_))));
    }

    #[test]
    fn test_descriptor_round_trip() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        let fis = rt.allocate(rt.core().file_input_stream).unwrap();

        assert_eq!(rt.descriptor(fis).unwrap(), -1);
        rt.set_descriptor(fis, 3).unwrap();
        assert_eq!(rt.descriptor(fis).unwrap(), 3);
        rt.set_descriptor(fis, -1).unwrap();
        assert_eq!(rt.descriptor(fis).unwrap(), -1);
    }

    #[test]
    fn test_method_handle_rejects_unknown_kind() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        assert_eq!(
            rt.method_handle(OBJECT, "V$run$$", 7).unwrap_err(),
            BridgeError::UnsupportedInvocationKind(7)
        );
        assert!(rt.method_handle(OBJECT, "V$run$$", 1).is_ok());
    }

    #[test]
    fn test_unresolved_native() {
        let mut rt = Runtime::new(BridgeConfig::default()).unwrap();
        assert!(matches!(
            rt.call_native("java.lang.Thread", "V$yield$$", &[]),
            Err(BridgeError::UnresolvedNativeMethod { .. })
        ));
    }

    #[test]
    fn test_cmp() {
        assert_eq!(Runtime::cmp(2, 1), 1);
        assert_eq!(Runtime::cmp(1.0, 2.0), -1);
        assert_eq!(Runtime::cmp(3i64, 3i64), 0);
        assert_eq!(Runtime::cmp(f64::NAN, 1.0), 0);
        assert!(Runtime::host_bool(Value::Int(2)));
        assert_eq!(Runtime::guest_bool(false), Value::Int(0));
    }
}
