#![forbid(unsafe_code)]

//! Localized lookup binding.
//!
//! [`LocBinding`] resolves `(resource set, key)` for the active culture and
//! pushes the result into its targets whenever the culture changes.
//!
//! # Value production
//!
//! ```text
//! key configured?            no  -> Err(MissingKey)
//! resource set (own|default) no  -> Err(MissingResourceSet)
//! culture = forced | context.current_culture()
//! lookup(set, key, culture)  ──found──> convert to property kind ──ok──> value
//!        │ not found / set unavailable          │ failed
//!        v                                      v
//! missing-key handler ──Some──> value      default policy
//!        │ None
//!        v
//! default policy: Explicit(value) | "#<key>"
//! ```
//!
//! Resource set failures never surface as errors; they degrade to the
//! default policy (the resolver logs them).
//!
//! Text is parsed in the culture of the table that supplied it, so an
//! invariant `"0.5"` stays one half under `fr`. The formatting culture only
//! shapes values rendered back into text.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use locbind_core::Culture;
use locbind_i18n::catalog::ResourceSet;
use locbind_i18n::resolver::ResourceResolver;
use locbind_i18n::value::{ConversionCultures, StandardConverter, Value, ValueConverter};
use tracing::warn;

use crate::binding::{BindingError, ManagedBinding, PropertyKey, TargetList};
use crate::context::CultureContext;

/// `Set:Key` or bare `Key` address of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceKey {
    resource_set: Option<String>,
    key: Option<String>,
}

impl ResourceKey {
    #[must_use]
    pub fn new(resource_set: Option<String>, key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            resource_set: resource_set.filter(|s| !s.is_empty()),
            key: (!key.is_empty()).then_some(key),
        }
    }

    /// Parse `"Set:Key"` or `"Key"`. Surrounding whitespace is ignored; an
    /// empty key part leaves the key unset.
    ///
    /// ```
    /// use locbind_runtime::loc_binding::ResourceKey;
    ///
    /// let key = ResourceKey::parse("Strings:Greeting");
    /// assert_eq!(key.resource_set(), Some("Strings"));
    /// assert_eq!(key.key(), Some("Greeting"));
    /// assert_eq!(ResourceKey::parse("Greeting").resource_set(), None);
    /// ```
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        match spec.trim().rsplit_once(':') {
            Some((set, key)) => Self::new(Some(set.trim().to_string()), key.trim()),
            None => Self::new(None, spec.trim()),
        }
    }

    #[must_use]
    pub fn resource_set(&self) -> Option<&str> {
        self.resource_set.as_deref()
    }

    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.resource_set, &self.key) {
            (Some(set), Some(key)) => write!(f, "{set}:{key}"),
            (None, Some(key)) => f.write_str(key),
            (Some(set), None) => write!(f, "{set}:"),
            (None, None) => Ok(()),
        }
    }
}

/// What a binding produces when its key cannot be resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DefaultPolicy {
    /// A visible `#<key>` placeholder.
    #[default]
    KeyMarker,
    /// A caller-supplied value.
    Explicit(Value),
}

impl DefaultPolicy {
    fn value_for(&self, key: &str) -> Value {
        match self {
            Self::KeyMarker => Value::Text(format!("#{key}")),
            Self::Explicit(value) => value.clone(),
        }
    }
}

/// Binding that looks up a localized resource for the active culture.
pub struct LocBinding {
    targets: TargetList,
    key: ResourceKey,
    default: DefaultPolicy,
    force_culture: Option<Culture>,
    context: CultureContext,
    resolver: Rc<ResourceResolver>,
    converter: Rc<dyn ValueConverter>,
    // Strong handle: keeps the resolved set alive while this binding lives.
    resource_set: RefCell<Option<Rc<ResourceSet>>>,
}

impl fmt::Debug for LocBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocBinding")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("force_culture", &self.force_culture)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

impl LocBinding {
    /// Start building a binding against `context` and `resolver`.
    #[must_use]
    pub fn builder(context: &CultureContext, resolver: &Rc<ResourceResolver>) -> LocBindingBuilder {
        LocBindingBuilder {
            context: context.clone(),
            resolver: Rc::clone(resolver),
            key: ResourceKey::default(),
            default: DefaultPolicy::default(),
            force_culture: None,
            converter: None,
        }
    }

    #[must_use]
    pub fn resource_key(&self) -> &ResourceKey {
        &self.key
    }

    #[must_use]
    pub fn default_policy(&self) -> &DefaultPolicy {
        &self.default
    }

    /// Culture the binding is pinned to, if any.
    #[must_use]
    pub fn forced_culture(&self) -> Option<&Culture> {
        self.force_culture.as_ref()
    }

    /// Produce the value for an explicit culture, without touching targets.
    pub fn value_for(
        &self,
        culture: &Culture,
        property: &PropertyKey,
    ) -> Result<Value, BindingError> {
        let key = self.key.key().ok_or(BindingError::MissingKey)?;
        let set_name = self
            .key
            .resource_set()
            .map(str::to_string)
            .or_else(|| self.resolver.default_resource_set())
            .ok_or_else(|| BindingError::MissingResourceSet {
                key: key.to_string(),
            })?;

        // Handler values count as written in the requested culture.
        let found = match self.resolver.lookup_entry(&set_name, key, culture) {
            Some(entry) => {
                *self.resource_set.borrow_mut() = Some(entry.set);
                Some((entry.value, entry.source))
            }
            None => self
                .resolver
                .resolve_missing(&set_name, key, culture)
                .map(|value| (value, culture.clone())),
        };

        let Some((raw, source)) = found else {
            return Ok(self.default.value_for(key));
        };

        let format_culture = self
            .force_culture
            .clone()
            .unwrap_or_else(|| self.context.formatting_culture());
        let cultures = ConversionCultures::new(&source, &format_culture);
        match self.converter.convert(raw, property.kind(), cultures) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!(
                    resource = %self.key,
                    property = %property,
                    source_culture = %source,
                    error = %err,
                    "resource value conversion failed"
                );
                Ok(self.default.value_for(key))
            }
        }
    }

    /// Set the last successful lookup came from, if still held.
    #[must_use]
    pub fn resource_set(&self) -> Option<Rc<ResourceSet>> {
        self.resource_set.borrow().clone()
    }
}

impl ManagedBinding for LocBinding {
    fn targets(&self) -> &TargetList {
        &self.targets
    }

    fn produce_value(&self, property: &PropertyKey) -> Result<Value, BindingError> {
        let culture = self
            .force_culture
            .clone()
            .unwrap_or_else(|| self.context.current_culture());
        self.value_for(&culture, property)
    }
}

/// Builder for [`LocBinding`].
pub struct LocBindingBuilder {
    context: CultureContext,
    resolver: Rc<ResourceResolver>,
    key: ResourceKey,
    default: DefaultPolicy,
    force_culture: Option<Culture>,
    converter: Option<Rc<dyn ValueConverter>>,
}

impl fmt::Debug for LocBindingBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocBindingBuilder")
            .field("key", &self.key)
            .field("default", &self.default)
            .finish_non_exhaustive()
    }
}

impl LocBindingBuilder {
    /// Resource address in `Set:Key` or `Key` form.
    #[must_use]
    pub fn key(mut self, spec: &str) -> Self {
        self.key = ResourceKey::parse(spec);
        self
    }

    #[must_use]
    pub fn resource_key(mut self, key: ResourceKey) -> Self {
        self.key = key;
        self
    }

    /// Value produced when the key cannot be resolved.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = DefaultPolicy::Explicit(value.into());
        self
    }

    /// Pin lookups to `culture` regardless of the context.
    #[must_use]
    pub fn force_culture(mut self, culture: Culture) -> Self {
        self.force_culture = Some(culture);
        self
    }

    /// Conversion strategy; defaults to [`StandardConverter`].
    #[must_use]
    pub fn converter(mut self, converter: Rc<dyn ValueConverter>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Build without registering.
    #[must_use]
    pub fn build(self) -> LocBinding {
        LocBinding {
            targets: TargetList::new(),
            key: self.key,
            default: self.default,
            force_culture: self.force_culture,
            context: self.context,
            resolver: self.resolver,
            converter: self
                .converter
                .unwrap_or_else(|| Rc::new(StandardConverter::new())),
            resource_set: RefCell::new(None),
        }
    }

    /// Build and register with the context's registry.
    pub fn register(self) -> Rc<LocBinding> {
        let context = self.context.clone();
        let binding = Rc::new(self.build());
        context.register(binding.clone());
        binding
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::test_support::RecordingTarget;
    use crate::binding::{ProvideTarget, Provided};
    use locbind_i18n::catalog::ResourceTable;
    use locbind_i18n::provider::{MemoryProvider, ResourceError};
    use locbind_i18n::value::ValueKind;

    fn c(tag: &str) -> Culture {
        Culture::parse(tag).unwrap()
    }

    fn resolver() -> Rc<ResourceResolver> {
        let provider = MemoryProvider::new().with(
            ResourceSet::new("Strings")
                .with_culture(
                    Culture::invariant(),
                    ResourceTable::new()
                        .with("hello", "Hello")
                        .with("max", "10")
                        .with("ratio", "0.5")
                        .with("scale", "0.5")
                        .with("label", "not a number"),
                )
                .with_culture(
                    c("de"),
                    ResourceTable::new().with("hello", "Hallo").with("ratio", "0,25"),
                ),
        );
        Rc::new(ResourceResolver::new(Rc::new(provider)).with_default_resource_set("Strings"))
    }

    #[test]
    fn resource_key_parsing() {
        assert_eq!(ResourceKey::parse("A:B").to_string(), "A:B");
        assert_eq!(ResourceKey::parse(" B ").key(), Some("B"));
        assert_eq!(ResourceKey::parse("A:").key(), None);
        assert_eq!(ResourceKey::parse(":B").resource_set(), None);
        assert_eq!(ResourceKey::parse("").key(), None);
    }

    #[test]
    fn produces_live_value_for_current_culture() {
        let ctx = CultureContext::new(c("de-AT"));
        let binding = LocBinding::builder(&ctx, &resolver()).key("hello").build();
        assert_eq!(
            binding.produce_value(&PropertyKey::text("Text")),
            Ok(Value::from("Hallo"))
        );
    }

    #[test]
    fn missing_key_falls_back() {
        let ctx = CultureContext::new(c("en"));
        let res = resolver();
        let marker = LocBinding::builder(&ctx, &res).key("Strings:absent").build();
        assert_eq!(
            marker.produce_value(&PropertyKey::text("Text")),
            Ok(Value::from("#absent"))
        );
        let explicit = LocBinding::builder(&ctx, &res)
            .key("absent")
            .default_value("n/a")
            .build();
        assert_eq!(
            explicit.produce_value(&PropertyKey::text("Text")),
            Ok(Value::from("n/a"))
        );
    }

    #[test]
    fn missing_configuration_fails_fast() {
        let ctx = CultureContext::new(c("en"));
        let res = resolver();
        let no_key = LocBinding::builder(&ctx, &res).build();
        assert_eq!(
            no_key.produce_value(&PropertyKey::text("Text")),
            Err(BindingError::MissingKey)
        );

        res.set_default_resource_set(None);
        let no_set = LocBinding::builder(&ctx, &res).key("hello").build();
        assert_eq!(
            no_set.produce_value(&PropertyKey::text("Text")),
            Err(BindingError::MissingResourceSet {
                key: "hello".into()
            })
        );
    }

    #[test]
    fn unavailable_set_uses_default_policy() {
        let ctx = CultureContext::new(c("en"));
        let binding = LocBinding::builder(&ctx, &resolver())
            .key("Missing:hello")
            .default_value("fallback")
            .build();
        assert_eq!(
            binding.produce_value(&PropertyKey::text("Text")),
            Ok(Value::from("fallback"))
        );
    }

    #[test]
    fn converts_to_property_kind() {
        let ctx = CultureContext::new(c("en"));
        let res = resolver();
        let max = LocBinding::builder(&ctx, &res).key("max").build();
        assert_eq!(
            max.produce_value(&PropertyKey::new("Maximum", ValueKind::Integer)),
            Ok(Value::Integer(10))
        );

        let bad = LocBinding::builder(&ctx, &res)
            .key("label")
            .default_value(0i64)
            .build();
        assert_eq!(
            bad.produce_value(&PropertyKey::new("Maximum", ValueKind::Integer)),
            Ok(Value::Integer(0))
        );
    }

    #[test]
    fn conversion_parses_table_text() {
        let ctx = CultureContext::new(c("de"));
        let ratio = LocBinding::builder(&ctx, &resolver()).key("ratio").build();
        let prop = PropertyKey::new("Opacity", ValueKind::Float);
        assert_eq!(ratio.produce_value(&prop), Ok(Value::Float(0.25)));
    }

    #[test]
    fn invariant_numbers_parse_under_comma_cultures() {
        let res = resolver();
        let prop = PropertyKey::new("Scale", ValueKind::Float);
        for tag in ["fr", "de-DE", "en"] {
            let ctx = CultureContext::new(c(tag));
            let scale = LocBinding::builder(&ctx, &res).key("scale").build();
            assert_eq!(scale.produce_value(&prop), Ok(Value::Float(0.5)), "culture {tag}");
        }
    }

    #[test]
    fn localized_numbers_parse_in_their_table_culture() {
        let ctx = CultureContext::new(c("en"));
        ctx.set_sync_formatting_culture(false);
        ctx.set_culture(c("de"));
        assert_eq!(ctx.formatting_culture(), c("en"));

        let ratio = LocBinding::builder(&ctx, &resolver()).key("ratio").build();
        let prop = PropertyKey::new("Opacity", ValueKind::Float);
        assert_eq!(ratio.produce_value(&prop), Ok(Value::Float(0.25)));
    }

    #[test]
    fn forced_culture_ignores_context() {
        let ctx = CultureContext::new(c("de"));
        let binding = LocBinding::builder(&ctx, &resolver())
            .key("hello")
            .force_culture(c("en"))
            .build();
        assert_eq!(binding.forced_culture(), Some(&c("en")));
        assert_eq!(
            binding.produce_value(&PropertyKey::text("Text")),
            Ok(Value::from("Hello"))
        );
    }

    #[test]
    fn missing_key_handler_precedes_default() {
        let ctx = CultureContext::new(c("en"));
        let res = resolver();
        res.set_missing_key_handler(|missing| Some(Value::from(format!("<{}>", missing.key))));
        let binding = LocBinding::builder(&ctx, &res).key("absent").build();
        assert_eq!(
            binding.produce_value(&PropertyKey::text("Text")),
            Ok(Value::from("<absent>"))
        );
    }

    #[test]
    fn binding_keeps_resolved_set_alive() {
        // Fresh set per load: only the binding can keep it alive.
        let fresh = |name: &str| -> Result<Rc<ResourceSet>, ResourceError> {
            Ok(Rc::new(ResourceSet::new(name).with_culture(
                Culture::invariant(),
                ResourceTable::new().with("hello", "Hello"),
            )))
        };
        let res =
            Rc::new(ResourceResolver::new(Rc::new(fresh)).with_default_resource_set("Strings"));
        let ctx = CultureContext::new(c("en"));
        let binding = LocBinding::builder(&ctx, &res).key("hello").build();
        assert_eq!(res.cached_count(), 0);

        binding.produce_value(&PropertyKey::text("Text")).unwrap();
        binding.produce_value(&PropertyKey::text("Text")).unwrap();
        assert_eq!(res.cached_count(), 1);
        assert_eq!(binding.resource_set().unwrap().name(), "Strings");
        // Pinned set and resolver cache agree.
        let cached = res.resolve("Strings").unwrap();
        assert!(Rc::ptr_eq(&binding.resource_set().unwrap(), &cached));
        drop(cached);

        drop(binding);
        assert_eq!(res.cached_count(), 0);
    }

    #[test]
    fn registered_binding_follows_culture_changes() {
        let ctx = CultureContext::new(c("en"));
        let binding = LocBinding::builder(&ctx, &resolver()).key("hello").register();
        assert_eq!(ctx.registry().len(), 1);

        let (target, handle) = RecordingTarget::new_dyn();
        let provided = binding
            .provide_value(ProvideTarget::Element {
                target: handle,
                property: PropertyKey::text("Text"),
            })
            .unwrap();
        assert_eq!(provided, Provided::Value(Value::from("Hello")));

        ctx.set_culture(c("de-CH"));
        assert_eq!(target.last(), Some(Value::from("Hallo")));
        ctx.set_culture(c("fr"));
        assert_eq!(target.last(), Some(Value::from("Hello")));
        ctx.registry().clear();
    }
}
