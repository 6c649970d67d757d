//! Resource values and typed conversion strategies.
//!
//! Destination properties declare a [`ValueKind`]; a [`ValueConverter`]
//! coerces looked-up values into that kind. Conversions form a small closed
//! set chosen by the kind, with image decoding delegated to an injected
//! [`ImageBridge`].
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unparseable text | `"abc"` into `Integer` | `ConversionError::Parse` |
//! | No image bridge | `Bytes` into `Image` without a bridge | `ConversionError::Unsupported` |
//! | Kind mismatch | e.g. `Bool` into `Image` | `ConversionError::Unsupported` |

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use locbind_core::Culture;

/// A culture-dependent value pushed into binding targets.
#[derive(Clone)]
pub enum Value {
    /// No value.
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// Raw binary resource (e.g. encoded image data).
    Bytes(Rc<[u8]>),
    /// Host-specific object produced by a conversion bridge.
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Kind name for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Bytes(_) => "bytes",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Borrow the text payload, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast an opaque payload.
    #[must_use]
    pub fn downcast_opaque<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Integer(i) => f.debug_tuple("Integer").field(i).finish(),
            Self::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

// Opaque values compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

/// Declared semantic type of a destination property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueKind {
    /// Accept whatever the resource holds.
    #[default]
    Any,
    Text,
    Integer,
    Float,
    Bool,
    /// Bitmap/icon object produced by an [`ImageBridge`].
    Image,
}

impl ValueKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from value conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// Text could not be parsed into the requested kind.
    Parse { input: String, kind: ValueKind },
    /// No strategy converts this value into the requested kind.
    Unsupported { from: &'static str, kind: ValueKind },
    /// The image bridge rejected the data.
    Image(String),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { input, kind } => write!(f, "cannot parse {input:?} as {kind}"),
            Self::Unsupported { from, kind } => write!(f, "no conversion from {from} to {kind}"),
            Self::Image(msg) => write!(f, "image conversion failed: {msg}"),
        }
    }
}

impl std::error::Error for ConversionError {}

/// Platform bridge turning binary resources into image objects.
pub trait ImageBridge {
    /// Decode `bytes` into a host image value (typically [`Value::Opaque`]).
    fn decode(&self, bytes: &[u8]) -> Result<Value, ConversionError>;
}

/// Cultures involved in one conversion.
///
/// Text is parsed in the conventions of the table it came from (`source`):
/// an invariant-table `"0.5"` means one half under every UI culture.
/// Values rendered as text use the formatting culture (`format`).
#[derive(Debug, Clone, Copy)]
pub struct ConversionCultures<'a> {
    pub source: &'a Culture,
    pub format: &'a Culture,
}

impl<'a> ConversionCultures<'a> {
    #[must_use]
    pub fn new(source: &'a Culture, format: &'a Culture) -> Self {
        Self { source, format }
    }

    /// Parse and render in the same culture.
    #[must_use]
    pub fn uniform(culture: &'a Culture) -> Self {
        Self::new(culture, culture)
    }
}

/// Coerces resource values into the kind a destination property declares.
pub trait ValueConverter {
    fn convert(
        &self,
        value: Value,
        kind: ValueKind,
        cultures: ConversionCultures<'_>,
    ) -> Result<Value, ConversionError>;
}

/// Built-in conversions between text, numbers and booleans, plus image
/// decoding through an optional [`ImageBridge`].
#[derive(Default, Clone)]
pub struct StandardConverter {
    image_bridge: Option<Rc<dyn ImageBridge>>,
}

impl fmt::Debug for StandardConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardConverter")
            .field("image_bridge", &self.image_bridge.is_some())
            .finish()
    }
}

impl StandardConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the bridge used for [`ValueKind::Image`] destinations.
    #[must_use]
    pub fn with_image_bridge(mut self, bridge: Rc<dyn ImageBridge>) -> Self {
        self.image_bridge = Some(bridge);
        self
    }
}

impl ValueConverter for StandardConverter {
    fn convert(
        &self,
        value: Value,
        kind: ValueKind,
        cultures: ConversionCultures<'_>,
    ) -> Result<Value, ConversionError> {
        match (kind, value) {
            (ValueKind::Any, v) => Ok(v),
            (ValueKind::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (ValueKind::Text, Value::Integer(i)) => Ok(Value::Text(i.to_string())),
            (ValueKind::Text, Value::Float(x)) => Ok(Value::Text(format_float(x, cultures.format))),
            (ValueKind::Text, Value::Bool(b)) => Ok(Value::Text(b.to_string())),
            (ValueKind::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (ValueKind::Integer, Value::Text(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| ConversionError::Parse {
                    input: s,
                    kind: ValueKind::Integer,
                }),
            (ValueKind::Float, Value::Float(x)) => Ok(Value::Float(x)),
            (ValueKind::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (ValueKind::Float, Value::Text(s)) => parse_float(&s, cultures.source)
                .map(Value::Float)
                .ok_or(ConversionError::Parse {
                    input: s,
                    kind: ValueKind::Float,
                }),
            (ValueKind::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (ValueKind::Bool, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(ConversionError::Parse {
                    input: s,
                    kind: ValueKind::Bool,
                }),
            },
            (ValueKind::Image, Value::Opaque(obj)) => Ok(Value::Opaque(obj)),
            (ValueKind::Image, Value::Bytes(bytes)) => match &self.image_bridge {
                Some(bridge) => bridge.decode(&bytes),
                None => Err(ConversionError::Unsupported {
                    from: "bytes",
                    kind: ValueKind::Image,
                }),
            },
            (kind, other) => Err(ConversionError::Unsupported {
                from: other.type_name(),
                kind,
            }),
        }
    }
}

/// Languages writing `1,5` for one and a half.
const COMMA_DECIMAL_LANGUAGES: &[&str] = &[
    "de", "fr", "es", "it", "pt", "nl", "ru", "pl", "cs", "sv", "da", "fi", "nb", "tr", "uk",
];

fn uses_decimal_comma(culture: &Culture) -> bool {
    COMMA_DECIMAL_LANGUAGES.contains(&culture.language())
}

fn parse_float(raw: &str, culture: &Culture) -> Option<f64> {
    let raw = raw.trim();
    if uses_decimal_comma(culture) {
        let canonical: String = raw
            .chars()
            .filter(|c| *c != '.' && *c != ' ')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        canonical.parse().ok()
    } else {
        raw.replace(',', "").parse().ok()
    }
}

fn format_float(x: f64, culture: &Culture) -> String {
    let text = x.to_string();
    if uses_decimal_comma(culture) {
        text.replace('.', ",")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(tag: &str) -> Culture {
        Culture::parse(tag).unwrap()
    }

    /// Convert with source and formatting culture both set to `tag`.
    fn convert_in(
        conv: &StandardConverter,
        value: impl Into<Value>,
        kind: ValueKind,
        tag: &str,
    ) -> Result<Value, ConversionError> {
        let culture = c(tag);
        conv.convert(value.into(), kind, ConversionCultures::uniform(&culture))
    }

    struct LenBridge;

    impl ImageBridge for LenBridge {
        fn decode(&self, bytes: &[u8]) -> Result<Value, ConversionError> {
            if bytes.is_empty() {
                return Err(ConversionError::Image("empty".into()));
            }
            Ok(Value::Opaque(Rc::new(bytes.len())))
        }
    }

    #[test]
    fn any_passes_through() {
        let conv = StandardConverter::new();
        let v = convert_in(&conv, true, ValueKind::Any, "en-US").unwrap();
        assert_eq!(v, Value::Bool(true));
    }

    #[test]
    fn text_to_numbers() {
        let conv = StandardConverter::new();
        assert_eq!(
            convert_in(&conv, " 42 ", ValueKind::Integer, "en-US").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            convert_in(&conv, "1,234.5", ValueKind::Float, "en-US").unwrap(),
            Value::Float(1234.5)
        );
        assert_eq!(
            convert_in(&conv, "1.234,5", ValueKind::Float, "de-DE").unwrap(),
            Value::Float(1234.5)
        );
    }

    #[test]
    fn text_is_parsed_in_its_source_culture() {
        let conv = StandardConverter::new();
        let invariant = Culture::invariant();

        // Invariant text uses '.', whatever the formatting culture.
        for format in [c("fr"), c("de-DE"), c("en-US")] {
            let cultures = ConversionCultures::new(&invariant, &format);
            assert_eq!(
                conv.convert("0.5".into(), ValueKind::Float, cultures),
                Ok(Value::Float(0.5))
            );
        }

        // A German table writes "0,25"; English formatting must not re-read it.
        let (de, en) = (c("de"), c("en"));
        let cultures = ConversionCultures::new(&de, &en);
        assert_eq!(
            conv.convert("0,25".into(), ValueKind::Float, cultures),
            Ok(Value::Float(0.25))
        );
    }

    #[test]
    fn float_to_text_uses_formatting_culture() {
        let conv = StandardConverter::new();
        let (en, de) = (c("en"), c("de"));
        assert_eq!(
            conv.convert(Value::Float(2.5), ValueKind::Text, ConversionCultures::new(&en, &de)),
            Ok(Value::Text("2,5".into()))
        );
        assert_eq!(
            convert_in(&conv, Value::Float(2.5), ValueKind::Text, "en-US").unwrap(),
            Value::Text("2.5".into())
        );
    }

    #[test]
    fn bad_text_reports_parse_error() {
        let conv = StandardConverter::new();
        let err = convert_in(&conv, "abc", ValueKind::Integer, "en-US").unwrap_err();
        assert_eq!(
            err,
            ConversionError::Parse {
                input: "abc".into(),
                kind: ValueKind::Integer
            }
        );
        assert_eq!(err.to_string(), "cannot parse \"abc\" as integer");
    }

    #[test]
    fn bool_parsing() {
        let conv = StandardConverter::new();
        assert_eq!(
            convert_in(&conv, "Yes", ValueKind::Bool, "en-US").unwrap(),
            Value::Bool(true)
        );
        assert!(convert_in(&conv, "perhaps", ValueKind::Bool, "en-US").is_err());
    }

    #[test]
    fn image_needs_bridge() {
        let bytes: Value = vec![1u8, 2, 3].into();
        let plain = StandardConverter::new();
        assert!(matches!(
            convert_in(&plain, bytes.clone(), ValueKind::Image, "en"),
            Err(ConversionError::Unsupported { from: "bytes", .. })
        ));

        let bridged = StandardConverter::new().with_image_bridge(Rc::new(LenBridge));
        let img = convert_in(&bridged, bytes, ValueKind::Image, "en").unwrap();
        assert_eq!(img.downcast_opaque::<usize>(), Some(&3));

        let empty: Value = Vec::<u8>::new().into();
        assert_eq!(
            convert_in(&bridged, empty, ValueKind::Image, "en").unwrap_err(),
            ConversionError::Image("empty".into())
        );
    }

    #[test]
    fn opaque_equality_is_identity() {
        let a: Rc<dyn Any> = Rc::new(1u8);
        let v1 = Value::Opaque(Rc::clone(&a));
        let v2 = Value::Opaque(a);
        let v3 = Value::Opaque(Rc::new(1u8));
        assert_eq!(v1, v2);
        assert_ne!(v1, v3);
    }
}
