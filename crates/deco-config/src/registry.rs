//! Configuration registry
//!
//! Provides [`ConfigurationRegistry`]: one generator seeds each configuration
//! type, overlays fill what is still unset, and the resolved value is cached
//! for the rest of the pass.
//!
//! # Resolution
//! 1. start from `C::default()` (everything unset)
//! 2. apply the generator, if one is registered
//! 3. for each overlay in registration order, compute a partial
//!    configuration from the current state and fill unset fields from it
//! 4. cache; later registrations for `C` fail with [`ConfigError::AlreadyResolved`]

use crate::configuration::{Configuration, GenerationContext, ProjectAware};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, trace};

/// Seeds the initial value of a configuration type
pub trait ConfigGenerator<C: Configuration> {
    /// Produce the initial configuration
    fn generate(&self, context: &GenerationContext) -> C;
}

impl<C, F> ConfigGenerator<C> for F
where
    C: Configuration,
    F: Fn(&GenerationContext) -> C,
{
    fn generate(&self, context: &GenerationContext) -> C {
        self(context)
    }
}

/// Contributes defaults to a configuration type
///
/// The returned value is a partial configuration: only the fields it sets
/// are considered, and only where the current configuration is unset.
pub trait Configurator<C: Configuration> {
    /// Compute defaults from the current configuration
    fn configure(&self, current: &C, context: &GenerationContext) -> C;
}

/// Generator returning a fixed configuration
#[derive(Debug, Clone)]
pub struct StaticGenerator<C>(pub C);

impl<C: Configuration> ConfigGenerator<C> for StaticGenerator<C> {
    fn generate(&self, _context: &GenerationContext) -> C {
        self.0.clone()
    }
}

/// Overlay filling project coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyProjectInfo;

impl<C: ProjectAware> Configurator<C> for ApplyProjectInfo {
    fn configure(&self, _current: &C, context: &GenerationContext) -> C {
        C::from_project(&context.project)
    }
}

/// Per-type registrations and cache
struct Entry<C: Configuration> {
    generator: Option<Box<dyn ConfigGenerator<C>>>,
    overlays: Vec<Box<dyn Configurator<C>>>,
    resolved: Option<C>,
}

impl<C: Configuration> Default for Entry<C> {
    fn default() -> Self {
        Self {
            generator: None,
            overlays: Vec::new(),
            resolved: None,
        }
    }
}

/// Registry of typed configurations for one generation pass
pub struct ConfigurationRegistry {
    context: GenerationContext,
    entries: HashMap<TypeId, Box<dyn Any>>,
    names: Vec<&'static str>,
}

impl ConfigurationRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new(context: GenerationContext) -> Self {
        Self {
            context,
            entries: HashMap::new(),
            names: Vec::new(),
        }
    }

    /// Generation context
    #[inline]
    #[must_use]
    pub fn context(&self) -> &GenerationContext {
        &self.context
    }

    /// Names of configuration types known to the registry
    #[inline]
    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Register the generator of `C`
    ///
    /// # Errors
    /// - [`ConfigError::DuplicateGenerator`] if `C` already has one
    /// - [`ConfigError::AlreadyResolved`] if `C` was resolved
    pub fn add_generator<C, G>(&mut self, generator: G) -> Result<(), ConfigError>
    where
        C: Configuration,
        G: ConfigGenerator<C> + 'static,
    {
        let entry = self.open::<C>()?;
        if entry.generator.is_some() {
            return Err(ConfigError::DuplicateGenerator { config: C::NAME });
        }
        entry.generator = Some(Box::new(generator));
        debug!(config = C::NAME, "registered configuration generator");
        Ok(())
    }

    /// Register the generator of `C`, replacing any existing one
    ///
    /// Returns `true` if a generator was replaced.
    ///
    /// # Errors
    /// Returns [`ConfigError::AlreadyResolved`] if `C` was resolved
    pub fn replace_generator<C, G>(&mut self, generator: G) -> Result<bool, ConfigError>
    where
        C: Configuration,
        G: ConfigGenerator<C> + 'static,
    {
        let entry = self.open::<C>()?;
        let replaced = entry.generator.replace(Box::new(generator)).is_some();
        debug!(config = C::NAME, replaced, "replaced configuration generator");
        Ok(replaced)
    }

    /// Register an overlay for `C`
    ///
    /// # Errors
    /// Returns [`ConfigError::AlreadyResolved`] if `C` was resolved
    pub fn add_overlay<C, O>(&mut self, overlay: O) -> Result<(), ConfigError>
    where
        C: Configuration,
        O: Configurator<C> + 'static,
    {
        let entry = self.open::<C>()?;
        entry.overlays.push(Box::new(overlay));
        trace!(config = C::NAME, overlays = entry.overlays.len(), "registered overlay");
        Ok(())
    }

    /// Check if `C` was resolved
    #[must_use]
    pub fn is_resolved<C: Configuration>(&self) -> bool {
        self.entries
            .get(&TypeId::of::<C>())
            .and_then(|e| e.downcast_ref::<Entry<C>>())
            .is_some_and(|e| e.resolved.is_some())
    }

    /// Resolve `C`
    ///
    /// The first call runs the generator and the overlays; later calls
    /// return the cached value.
    ///
    /// # Errors
    /// Returns [`ConfigError::TypeMismatch`] if the registry state is corrupt
    pub fn resolve<C: Configuration>(&mut self) -> Result<C, ConfigError> {
        let context = self.context.clone();
        let entry = self.entry::<C>()?;
        if let Some(resolved) = &entry.resolved {
            return Ok(resolved.clone());
        }

        let mut config = entry
            .generator
            .as_ref()
            .map_or_else(C::default, |g| g.generate(&context));
        for overlay in &entry.overlays {
            let defaults = overlay.configure(&config, &context);
            config.fill_unset(&defaults);
        }

        debug!(
            config = C::NAME,
            generated = entry.generator.is_some(),
            overlays = entry.overlays.len(),
            "resolved configuration"
        );
        entry.resolved = Some(config.clone());
        Ok(config)
    }

    /// Entry for `C` that still accepts registrations
    fn open<C: Configuration>(&mut self) -> Result<&mut Entry<C>, ConfigError> {
        let entry = self.entry::<C>()?;
        if entry.resolved.is_some() {
            return Err(ConfigError::AlreadyResolved { config: C::NAME });
        }
        Ok(entry)
    }

    fn entry<C: Configuration>(&mut self) -> Result<&mut Entry<C>, ConfigError> {
        let id = TypeId::of::<C>();
        if !self.entries.contains_key(&id) {
            self.names.push(C::NAME);
        }
        self.entries
            .entry(id)
            .or_insert_with(|| Box::new(Entry::<C>::default()))
            .downcast_mut::<Entry<C>>()
            .ok_or(ConfigError::TypeMismatch { config: C::NAME })
    }
}

impl Default for ConfigurationRegistry {
    fn default() -> Self {
        Self::new(GenerationContext::default())
    }
}

impl fmt::Debug for ConfigurationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationRegistry")
            .field("context", &self.context)
            .field("configurations", &self.names)
            .finish()
    }
}

/// Errors from the configuration registry
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Second generator for one configuration type
    #[error("configuration {config} already has a generator; use replace_generator to override it")]
    DuplicateGenerator { config: &'static str },

    /// Registration after resolution
    #[error("configuration {config} is already resolved")]
    AlreadyResolved { config: &'static str },

    /// Registry entry holds a different type
    #[error("registry entry for {config} has an unexpected type")]
    TypeMismatch { config: &'static str },

    /// Invalid configuration document
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
