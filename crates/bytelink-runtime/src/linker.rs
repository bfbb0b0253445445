//! Dynamic call-site linker
//!
//! Lambda expressions and method references are linked on first use. A
//! [`LambdaFactory`] is bootstrapped once per site: it fixes the target
//! [`MethodHandleDescriptor`] and the type the synthesized instances
//! implement. Every instantiation binds a set of linking arguments and
//! allocates a fresh functional-interface instance whose single abstract
//! method forwards to the target.
//!
//! ```text
//! site --bootstrap--> LambdaFactory --instantiate(linking)--> CallSite
//!                                                              |
//!                      target(linking ++ capture) <--invoke(capture)
//! ```

use crate::heap::NativeSlot;
use crate::runtime::Runtime;
use crate::types::{AdapterKind, ClassId};
use bytelink_sdk::{BridgeError, BridgeResult, ObjRef, Value};
use rustc_hash::FxHashMap;
use std::sync::Arc;

// ============================================================================
// Method handles
// ============================================================================

/// How a method handle reaches its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InvocationKind {
    /// `owner.method(args)`
    Static = 1,
    /// Resolved on the receiver's class
    Virtual = 2,
    /// Resolved on the receiver's class through an interface
    Interface = 3,
    /// Allocate `owner`, run the named initializer, return the instance
    Constructor = 4,
    /// Private or super call, resolved on the receiver
    Special = 5,
}

impl InvocationKind {
    /// Raw kind number used by translated code
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for InvocationKind {
    type Error = BridgeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(InvocationKind::Static),
            2 => Ok(InvocationKind::Virtual),
            3 => Ok(InvocationKind::Interface),
            4 => Ok(InvocationKind::Constructor),
            5 => Ok(InvocationKind::Special),
            other => Err(BridgeError::UnsupportedInvocationKind(other)),
        }
    }
}

/// Target of a lambda or method reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandleDescriptor {
    /// Type declaring the target method
    pub owner: ClassId,
    /// Signature key of the target method
    pub method: String,
    /// Dispatch shape
    pub kind: InvocationKind,
}

impl MethodHandleDescriptor {
    /// Create a descriptor
    pub fn new(owner: ClassId, method: impl Into<String>, kind: InvocationKind) -> Self {
        Self {
            owner,
            method: method.into(),
            kind,
        }
    }
}

// ============================================================================
// Linked targets
// ============================================================================

/// A method handle with its linking arguments bound
#[derive(Debug)]
pub struct LinkedTarget {
    handle: MethodHandleDescriptor,
    linking_args: Vec<Value>,
}

impl LinkedTarget {
    /// Bind `linking_args` to `handle`
    pub fn new(handle: MethodHandleDescriptor, linking_args: Vec<Value>) -> Self {
        Self {
            handle,
            linking_args,
        }
    }

    /// Target descriptor
    pub fn handle(&self) -> &MethodHandleDescriptor {
        &self.handle
    }

    /// Arguments fixed at link time
    pub fn linking_args(&self) -> &[Value] {
        &self.linking_args
    }

    /// Call the target with `linking ++ capture`
    pub fn invoke(&self, rt: &mut Runtime, capture: &[Value]) -> BridgeResult<Value> {
        let mut all = Vec::with_capacity(self.linking_args.len() + capture.len());
        all.extend_from_slice(&self.linking_args);
        all.extend_from_slice(capture);

        let handle = &self.handle;
        match handle.kind {
            InvocationKind::Static => rt.invoke_static(handle.owner, &handle.method, &all),
            InvocationKind::Virtual | InvocationKind::Interface | InvocationKind::Special => {
                let (receiver, rest) = all.split_first().ok_or_else(|| {
                    BridgeError::ArgumentError(format!(
                        "{:?} call to {} without a receiver",
                        handle.kind, handle.method
                    ))
                })?;
                rt.invoke_virtual(*receiver, &handle.method, rest)
            }
            InvocationKind::Constructor => {
                let instance = rt.allocate(handle.owner)?;
                rt.invoke_special(handle.owner, instance, &handle.method, &all)?;
                Ok(instance)
            }
        }
    }
}

// ============================================================================
// Factories and call sites
// ============================================================================

/// Bootstrapped linkage for one site
#[derive(Debug, Clone)]
pub struct LambdaFactory {
    interface: ClassId,
    implementing: ClassId,
    handle: MethodHandleDescriptor,
}

impl LambdaFactory {
    /// Functional interface the instances implement
    pub fn interface(&self) -> ClassId {
        self.interface
    }

    /// Concrete type of the synthesized instances
    pub fn implementing(&self) -> ClassId {
        self.implementing
    }

    /// Target descriptor
    pub fn handle(&self) -> &MethodHandleDescriptor {
        &self.handle
    }

    /// Bind `linking_args` and allocate a fresh forwarding instance
    pub fn instantiate(&self, rt: &mut Runtime, linking_args: &[Value]) -> BridgeResult<CallSite> {
        let target = Arc::new(LinkedTarget::new(self.handle.clone(), linking_args.to_vec()));
        let instance = rt
            .heap
            .alloc_object_with(self.implementing, NativeSlot::Lambda(Arc::clone(&target)));
        log::trace!(
            "instantiated lambda {:?} for {} with {} linking args",
            instance,
            self.handle.method,
            linking_args.len()
        );
        Ok(CallSite {
            instance,
            interface: self.interface,
            target,
        })
    }
}

/// A linked call site: the synthesized instance and its bound target
#[derive(Debug, Clone)]
pub struct CallSite {
    instance: ObjRef,
    interface: ClassId,
    target: Arc<LinkedTarget>,
}

impl CallSite {
    /// The functional-interface instance handed to guest code
    pub fn instance(&self) -> Value {
        Value::Ref(self.instance)
    }

    /// Functional interface implemented
    pub fn interface(&self) -> ClassId {
        self.interface
    }

    /// Target descriptor
    pub fn handle(&self) -> &MethodHandleDescriptor {
        self.target.handle()
    }

    /// Arguments fixed at link time
    pub fn linking_args(&self) -> &[Value] {
        self.target.linking_args()
    }

    /// Call the single abstract method with `capture`
    pub fn invoke(&self, rt: &mut Runtime, capture: &[Value]) -> BridgeResult<Value> {
        self.target.invoke(rt, capture)
    }
}

// ============================================================================
// Linker
// ============================================================================

/// Identifies one lambda expression or method reference site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u32);

/// Everything needed to link a site
#[derive(Debug, Clone)]
pub struct LinkRequest {
    /// Functional interface to implement
    pub interface: ClassId,
    /// Target method
    pub handle: MethodHandleDescriptor,
    /// Arguments bound at link time
    pub linking_args: Vec<Value>,
}

/// Link state of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    /// Never bootstrapped
    Unlinked,
    /// Bootstrapped; terminal
    Linked,
}

/// Per-site linkage cache
#[derive(Debug)]
pub struct Linker {
    factories: FxHashMap<SiteId, Arc<LambdaFactory>>,
    call_sites: FxHashMap<SiteId, CallSite>,
    next_anonymous: u32,
}

impl Linker {
    /// Create an empty linker
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
            call_sites: FxHashMap::default(),
            next_anonymous: u32::MAX,
        }
    }

    /// Link state of `site`
    pub fn state(&self, site: SiteId) -> SiteState {
        if self.factories.contains_key(&site) {
            SiteState::Linked
        } else {
            SiteState::Unlinked
        }
    }

    /// Number of linked sites
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if no site has been linked
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Allocate a site ID for linkage requested through the import table.
    /// Anonymous IDs count down from `u32::MAX` so they never collide with
    /// IDs assigned by the translator.
    pub fn anonymous_site(&mut self) -> SiteId {
        let site = SiteId(self.next_anonymous);
        self.next_anonymous = self.next_anonymous.wrapping_sub(1);
        site
    }
}

impl Default for Linker {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Bootstrap `site`, at most once.
    ///
    /// The implementing type is a lambda adapter (memoized per interface)
    /// when `interface` carries the interface modifier, else `interface`
    /// itself.
    pub fn bootstrap_site(
        &mut self,
        site: SiteId,
        interface: ClassId,
        handle: MethodHandleDescriptor,
    ) -> BridgeResult<Arc<LambdaFactory>> {
        if let Some(factory) = self.linker.factories.get(&site) {
            return Ok(Arc::clone(factory));
        }

        self.classes.class(handle.owner)?;
        let implementing = if self.classes.class(interface)?.is_interface() {
            self.classes.adapter_for(AdapterKind::Lambda, interface)?
        } else {
            interface
        };

        log::debug!(
            "linked site {:?}: {:?} {} on class #{} via class #{}",
            site,
            handle.kind,
            handle.method,
            handle.owner,
            implementing
        );
        let factory = Arc::new(LambdaFactory {
            interface,
            implementing,
            handle,
        });
        self.linker.factories.insert(site, Arc::clone(&factory));
        Ok(factory)
    }

    /// Link `site` and return its call site. Later links of the same site
    /// return the memoized call site.
    pub fn link(&mut self, site: SiteId, request: LinkRequest) -> BridgeResult<CallSite> {
        if let Some(call_site) = self.linker.call_sites.get(&site) {
            return Ok(call_site.clone());
        }
        let factory = self.bootstrap_site(site, request.interface, request.handle)?;
        let call_site = factory.instantiate(self, &request.linking_args)?;
        self.linker.call_sites.insert(site, call_site.clone());
        Ok(call_site)
    }
}
