//! Schema Document Model
//!
//! Ordered, typed views over the three sections the engine reasons about
//! (`classes`, `slots`, `enums`), backed by the raw top-level YAML mapping so
//! everything else in the document (id, prefixes, imports, extra attributes)
//! survives a re-serialization untouched.
//!
//! Reading is lenient below the section level. Only text that is not YAML,
//! a root that is not a mapping, or a section that is not a mapping fails.
//! Definition bodies with unexpected shapes are read as far as they make
//! sense, and repeated keys keep the last entry.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{
    self, Deserialize, Deserializer, EnumAccess, MapAccess, SeqAccess, VariantAccess, Visitor,
};
use serde::Serialize;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::error::{Result, SchemaError};

pub const CLASSES: &str = "classes";
pub const SLOTS: &str = "slots";
pub const ENUMS: &str = "enums";

// =============================================================================
// Definitions
// =============================================================================

/// An entity type. `slots` is a reference list; the definitions live in the
/// document-wide slot table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassDef {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub slots: Vec<String>,

    /// Attributes the engine does not interpret (description, is_a, ...)
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ClassDef {
    /// Read a class body. A scalar `slots` is a one-element list; any other
    /// non-sequence `slots` is empty, and non-scalar items are dropped.
    pub fn from_value(body: &Value) -> Self {
        let mut class = Self::default();
        let Value::Mapping(mapping) = body else {
            return class;
        };

        for (key, value) in mapping {
            let Some(key) = scalar_text(key) else { continue };
            if key == "slots" {
                class.slots = match value {
                    Value::Sequence(items) => items.iter().filter_map(scalar_text).collect(),
                    other => scalar_text(other).into_iter().collect(),
                };
            } else {
                class.extra.insert(key, value.clone());
            }
        }
        class
    }
}

/// A globally named field definition
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlotDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Builtin type keyword, class name or enum name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl SlotDef {
    pub fn new(range: impl Into<String>) -> Self {
        Self {
            range: Some(range.into()),
            ..Default::default()
        }
    }

    /// Read a slot body. A `range` that is not a string counts as absent;
    /// flags accept booleans and the YAML 1.1 spellings (`yes`, `off`, ...).
    /// Attributes that do not fit stay in `extra`.
    pub fn from_value(body: &Value) -> Self {
        let mut slot = Self::default();
        let Value::Mapping(mapping) = body else {
            return slot;
        };

        for (key, value) in mapping {
            let Some(key) = scalar_text(key) else { continue };
            match key.as_str() {
                "description" if value.is_string() => {
                    slot.description = value.as_str().map(String::from)
                }
                "range" if value.is_string() => slot.range = value.as_str().map(String::from),
                "identifier" if flag(value).is_some() => slot.identifier = flag(value),
                "required" if flag(value).is_some() => slot.required = flag(value),
                _ => {
                    slot.extra.insert(key, value.clone());
                }
            }
        }
        slot
    }

    pub fn is_identifier(&self) -> bool {
        self.identifier.unwrap_or(false)
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }
}

/// Enum bodies are carried verbatim; only their existence matters here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumDef {
    pub body: Value,
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" => Some(true),
            "false" | "no" | "n" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Scalars usable as names: strings, numbers and booleans
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Document
// =============================================================================

/// A parsed schema document
#[derive(Debug, Clone, Default)]
pub struct SchemaDocument {
    root: Mapping,
    pub classes: IndexMap<String, ClassDef>,
    pub slots: IndexMap<String, SlotDef>,
    pub enums: IndexMap<String, EnumDef>,
}

impl SchemaDocument {
    /// Parse document text.
    ///
    /// Missing or null sections read as empty. Fails only when the text is
    /// not YAML, the root is not a mapping, or a section is not a mapping.
    pub fn parse(text: &str) -> Result<Self> {
        let LastWins(value) = serde_yaml::from_str(text)?;
        let root = match value {
            Value::Mapping(mapping) => mapping,
            _ => return Err(SchemaError::NotAMapping),
        };

        let classes = read_section(&root, CLASSES, ClassDef::from_value)?;
        let slots = read_section(&root, SLOTS, SlotDef::from_value)?;
        let enums = read_section(&root, ENUMS, |body| EnumDef { body: body.clone() })?;

        Ok(Self {
            root,
            classes,
            slots,
            enums,
        })
    }

    /// Map each referenced slot name to the classes referencing it, in
    /// class order, each class listed once.
    pub fn slot_references(&self) -> IndexMap<&str, Vec<&str>> {
        let mut references: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (class_name, class) in &self.classes {
            for slot in &class.slots {
                let classes = references.entry(slot.as_str()).or_default();
                if !classes.contains(&class_name.as_str()) {
                    classes.push(class_name.as_str());
                }
            }
        }
        references
    }

    /// Declare a new slot at the end of the slot table.
    ///
    /// A missing `slots` section is created right after `classes`.
    pub fn add_slot(&mut self, name: &str, def: SlotDef) -> Result<()> {
        let value = serde_yaml::to_value(&def)?;
        self.ensure_slots_section();
        if let Some(Value::Mapping(slots)) = self.root.get_mut(SLOTS) {
            slots.insert(Value::String(name.to_string()), value);
        }
        self.slots.insert(name.to_string(), def);
        Ok(())
    }

    /// Serialize the document, keeping the original top-level key order
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    fn ensure_slots_section(&mut self) {
        let placeholder = match self.root.get(SLOTS) {
            Some(Value::Mapping(_)) => return,
            Some(_) => true,
            None => false,
        };
        let key = Value::String(SLOTS.to_string());

        if placeholder {
            // null section: keep its position
            self.root.insert(key, Value::Mapping(Mapping::new()));
            return;
        }

        let has_classes = self.root.contains_key(CLASSES);
        let mut rebuilt = Mapping::new();
        for (name, value) in std::mem::take(&mut self.root) {
            let after = name.as_str() == Some(CLASSES);
            rebuilt.insert(name, value);
            if after {
                rebuilt.insert(key.clone(), Value::Mapping(Mapping::new()));
            }
        }
        if !has_classes {
            rebuilt.insert(key, Value::Mapping(Mapping::new()));
        }
        self.root = rebuilt;
    }
}

fn section<'a>(root: &'a Mapping, name: &str) -> Result<Option<&'a Mapping>> {
    match root.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Mapping(mapping)) => Ok(Some(mapping)),
        Some(other) => Err(SchemaError::InvalidSection {
            section: name.to_string(),
            found: value_kind(other).to_string(),
        }),
    }
}

fn read_section<T>(
    root: &Mapping,
    name: &str,
    read: impl Fn(&Value) -> T,
) -> Result<IndexMap<String, T>> {
    let mut definitions = IndexMap::new();
    let Some(mapping) = section(root, name)? else {
        return Ok(definitions);
    };

    for (key, body) in mapping {
        match scalar_text(key) {
            Some(key) => {
                definitions.insert(key, read(body));
            }
            None => warn!(section = name, "skipping definition with a non-scalar name"),
        }
    }
    Ok(definitions)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// =============================================================================
// Duplicate keys
// =============================================================================

/// A YAML value whose mappings keep the last of any repeated key
struct LastWins(Value);

impl<'de> Deserialize<'de> for LastWins {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(LastWinsVisitor).map(LastWins)
    }
}

struct LastWinsVisitor;

impl<'de> Visitor<'de> for LastWinsVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("any YAML value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> std::result::Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> std::result::Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> std::result::Result<Value, E> {
        Ok(Value::Number(n.into()))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        LastWins::deserialize(deserializer).map(|LastWins(value)| value)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(LastWins(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Sequence(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut mapping = Mapping::new();
        while let Some((LastWins(key), LastWins(value))) = map.next_entry()? {
            if mapping.contains_key(&key) {
                warn!(key = ?key, "duplicate mapping key, keeping the last entry");
            }
            mapping.insert(key, value);
        }
        Ok(Value::Mapping(mapping))
    }

    fn visit_enum<A>(self, data: A) -> std::result::Result<Value, A::Error>
    where
        A: EnumAccess<'de>,
    {
        let (tag, variant) = data.variant::<String>()?;
        let LastWins(value) = variant.newtype_variant()?;
        Ok(Value::Tagged(Box::new(TaggedValue {
            tag: Tag::new(tag),
            value,
        })))
    }
}
