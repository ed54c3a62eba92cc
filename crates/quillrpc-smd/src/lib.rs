//! # Service Mapping Description
//!
//! Data model for the SMD schema emitted by the quillrpc code generator and
//! assembled by the server at runtime. The shape follows the Dojo SMD
//! convention (<http://dojotoolkit.org/reference-guide/1.10/dojox/rpc/smd.html>)
//! without implementing the complete specification: only the subset a
//! JSON-RPC 2.0 endpoint needs to describe itself.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// SMD version emitted by servers.
pub const SMD_VERSION: &str = "2.0";

/// Coarse schema-level type tag.
///
/// Float maps to the JSON-schema spelling `number`; everything else is the
/// lowercase of the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Boolean,
    Integer,
    #[serde(rename = "number")]
    Float,
    String,
    Array,
    Object,
}

impl Kind {
    /// Wire spelling of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Boolean => "boolean",
            Kind::Integer => "integer",
            Kind::Float => "number",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Object => "object",
        }
    }
}

/// Top-level schema document for one endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Transport mechanism used to deliver service calls.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub transport: String,

    /// How a service message string is created from the provided parameters.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub envelope: String,

    /// Content type of the content returned by the endpoint.
    #[serde(rename = "contentType", default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,

    /// Version level of the SMD being used.
    #[serde(rename = "SMDVersion", default, skip_serializing_if = "String::is_empty")]
    pub smd_version: String,

    /// URL (absolute or relative) to use for method call requests.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target: String,

    /// Description of the endpoint.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// One entry per fully-qualified method name.
    pub services: BTreeMap<String, Service>,
}

/// One remotely callable method.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    pub description: String,

    /// Parameter schemas in declaration order.
    pub parameters: Vec<JsonSchema>,

    /// Expected type of the value returned from the method call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<JsonSchema>,

    /// Documented JSON-RPC 2.0 error codes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<i64, String>,
}

/// JSON-schema node for a parameter or return value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Parameter name. Named parameters SHOULD be issued by clients, but
    /// positional parameters MAY be issued and servers SHOULD support them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub kind: Kind,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Definition>,

    /// Element description for array nodes: either `{"type": <kind>}` or
    /// `{"$ref": "#/definitions/<name>"}`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub items: BTreeMap<String, String>,
}

impl JsonSchema {
    /// A bare node of the given kind, everything else empty.
    pub fn of(kind: Kind) -> Self {
        Self {
            name: None,
            kind,
            optional: false,
            default: None,
            description: String::new(),
            properties: BTreeMap::new(),
            definitions: BTreeMap::new(),
            items: BTreeMap::new(),
        }
    }

    /// A named parameter node.
    pub fn named(name: impl Into<String>, kind: Kind) -> Self {
        let mut schema = Self::of(kind);
        schema.name = Some(name.into());
        schema
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_properties(
        mut self,
        properties: impl IntoIterator<Item = (String, Property)>,
    ) -> Self {
        self.properties = properties.into_iter().collect();
        self
    }

    pub fn with_definitions(
        mut self,
        definitions: impl IntoIterator<Item = (String, Definition)>,
    ) -> Self {
        self.definitions = definitions.into_iter().collect();
        self
    }

    /// Array element description by kind: `{"type": <kind>}`.
    pub fn with_items_kind(mut self, kind: Kind) -> Self {
        self.items = BTreeMap::from([("type".to_string(), kind.as_str().to_string())]);
        self
    }

    /// Array element description by reference: `{"$ref": "#/definitions/.."}`.
    pub fn with_items_ref(mut self, name: &str) -> Self {
        self.items = BTreeMap::from([("$ref".to_string(), definitions_ref(name))]);
        self
    }
}

/// Property of an object schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: Kind,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub items: BTreeMap<String, String>,

    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Property {
    pub fn of(kind: Kind) -> Self {
        Self {
            kind,
            description: String::new(),
            items: BTreeMap::new(),
            reference: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ref(mut self, name: &str) -> Self {
        self.reference = Some(definitions_ref(name));
        self
    }

    pub fn with_items_kind(mut self, kind: Kind) -> Self {
        self.items = BTreeMap::from([("type".to_string(), kind.as_str().to_string())]);
        self
    }

    pub fn with_items_ref(mut self, name: &str) -> Self {
        self.items = BTreeMap::from([("$ref".to_string(), definitions_ref(name))]);
        self
    }
}

/// Named object definition referenced through `$ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    #[serde(rename = "type")]
    pub kind: Kind,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Property>,
}

/// Per-service description returned by generated `smd()` implementations,
/// before the server prefixes namespaces and merges everything into [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct ServiceInfo {
    pub description: String,
    pub methods: HashMap<String, Service>,
}

impl Definition {
    /// Object definition from a property list.
    pub fn object(properties: impl IntoIterator<Item = (String, Property)>) -> Self {
        Self {
            kind: Kind::Object,
            properties: properties.into_iter().collect(),
        }
    }
}

/// `$ref` pointer into the definitions map.
pub fn definitions_ref(name: &str) -> String {
    format!("#/definitions/{name}")
}

/// Documented error-code map from `(code, message)` pairs.
pub fn errors<'a>(entries: impl IntoIterator<Item = (i64, &'a str)>) -> BTreeMap<i64, String> {
    entries
        .into_iter()
        .map(|(code, message)| (code, message.to_string()))
        .collect()
}
