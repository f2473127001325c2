//! # Bean Container
//!
//! A deliberately small dependency container: beans are stored once per concrete type and
//! handed out as `Arc<T>`. Besides lookup it owns two lists of hooks:
//!
//! - startup hooks, run once by [`BeanContext::start`]
//! - shutdown hooks, run in reverse registration order by [`BeanContext::close`]
//!
//! ## Lifecycle
//!
//! ```text
//! Created ──start()──▶ Running ──close()──▶ Closed
//!    └───────────────close()──────────────────┘
//! ```
//!
//! Closing a closed container is an error; whoever owns the container must close it exactly
//! once. Lookups on a closed container find nothing.
//!
//! Trait objects are registered behind an `Arc`, e.g. an exit handler is registered as an
//! `Arc<dyn ExitHandler>` bean and looked up with `find_bean::<Arc<dyn ExitHandler>>()`.

use crate::codec::CodecRegistry;
use crate::config::FunctionConfig;
use crate::convert::ConversionService;
use crate::error::{FnError, Result};
use crate::registry::FunctionRegistry;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Something whose dependencies are resolved from a [`BeanContext`].
pub trait Injectable {
    fn inject(&mut self, container: &BeanContext) -> Result<()>;
}

impl Injectable for () {
    fn inject(&mut self, _container: &BeanContext) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Created,
    Running,
    Closed,
}

type StartupHook = Box<dyn FnOnce(&BeanContext) -> Result<()> + Send>;
type ShutdownHook = Box<dyn FnOnce() -> Result<()> + Send>;

struct Bean {
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

pub struct BeanContext {
    beans: HashMap<TypeId, Bean>,
    startup_hooks: Vec<StartupHook>,
    shutdown_hooks: Vec<ShutdownHook>,
    state: ContainerState,
}

impl Default for BeanContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BeanContext {
    /// A container with no beans at all.
    pub fn empty() -> Self {
        Self {
            beans: HashMap::new(),
            startup_hooks: Vec::new(),
            shutdown_hooks: Vec::new(),
            state: ContainerState::Created,
        }
    }

    /// A container holding the beans every invocation needs: conversion service, codec
    /// registry (JSON + text), an empty function registry and the default config.
    pub fn with_defaults() -> Self {
        Self::with_config(FunctionConfig::default())
    }

    pub fn with_config(config: FunctionConfig) -> Self {
        let mut container = Self::empty();
        container.register(ConversionService::default());
        container.register(CodecRegistry::default());
        container.register(FunctionRegistry::default());
        container.register(config);
        container
    }

    pub fn state(&self) -> ContainerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ContainerState::Running
    }

    pub fn is_closed(&self) -> bool {
        self.state == ContainerState::Closed
    }

    /// Registers `bean`, replacing any previous bean of the same type.
    pub fn register<T: Any + Send + Sync>(&mut self, bean: T) {
        self.register_arc(Arc::new(bean));
    }

    pub fn register_arc<T: Any + Send + Sync>(&mut self, bean: Arc<T>) {
        let type_name = std::any::type_name::<T>();
        tracing::trace!(target: "fnrun::container", bean = type_name, "Registering bean");
        self.beans.insert(
            TypeId::of::<T>(),
            Bean {
                type_name,
                instance: bean,
            },
        );
    }

    pub fn contains<T: Any>(&self) -> bool {
        !self.is_closed() && self.beans.contains_key(&TypeId::of::<T>())
    }

    pub fn find_bean<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        if self.is_closed() {
            return None;
        }
        self.beans
            .get(&TypeId::of::<T>())
            .and_then(|bean| bean.instance.clone().downcast::<T>().ok())
    }

    pub fn get_bean<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.find_bean::<T>()
            .ok_or(FnError::BeanNotFound(std::any::type_name::<T>()))
    }

    /// Resolves the dependencies of `target` from this container.
    pub fn inject<T: Injectable + ?Sized>(&self, target: &mut T) -> Result<()> {
        if self.is_closed() {
            return Err(FnError::Container(
                "cannot inject from a closed container".to_string(),
            ));
        }
        target.inject(self)
    }

    pub fn on_startup<F>(&mut self, hook: F)
    where
        F: FnOnce(&BeanContext) -> Result<()> + Send + 'static,
    {
        self.startup_hooks.push(Box::new(hook));
    }

    pub fn on_shutdown<F>(&mut self, hook: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.shutdown_hooks.push(Box::new(hook));
    }

    /// Runs the startup hooks. Only valid on a freshly created container.
    pub fn start(&mut self) -> Result<()> {
        if self.state != ContainerState::Created {
            return Err(FnError::Container(format!(
                "cannot start a container in state {:?}",
                self.state
            )));
        }

        let hooks = std::mem::take(&mut self.startup_hooks);
        tracing::debug!(
            target: "fnrun::container",
            hooks = hooks.len(),
            beans = self.beans.len(),
            "Starting container"
        );
        for hook in hooks {
            hook(self)?;
        }
        self.state = ContainerState::Running;
        Ok(())
    }

    /// Runs the shutdown hooks (newest first) and drops every bean.
    ///
    /// All hooks run even if one fails; the first failure is returned.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Err(FnError::Container("container already closed".to_string()));
        }
        self.state = ContainerState::Closed;

        let hooks = std::mem::take(&mut self.shutdown_hooks);
        tracing::debug!(target: "fnrun::container", hooks = hooks.len(), "Closing container");

        let mut first_error = None;
        for hook in hooks.into_iter().rev() {
            if let Err(e) = hook() {
                tracing::warn!(target: "fnrun::container", error = %e, "Shutdown hook failed");
                first_error.get_or_insert(e);
            }
        }
        self.beans.clear();
        self.startup_hooks.clear();

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for BeanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut beans: Vec<&str> = self.beans.values().map(|bean| bean.type_name).collect();
        beans.sort_unstable();
        f.debug_struct("BeanContext")
            .field("state", &self.state)
            .field("beans", &beans)
            .finish()
    }
}
