//! # quillrpc-parser
//!
//! Source analyzer behind the quillrpc code generator. Given one file of a
//! service package it parses the whole package plus transitively imported
//! packages, discovers services and their methods, reads the directive
//! mini-language out of doc blocks, and flattens every referenced struct
//! into an ordered property list ready for schema emission.

pub mod cases;
pub mod directive;
pub mod imports;
mod package;
mod structs;
pub mod types;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use quillrpc_smd::Kind;
use thiserror::Error;

pub use cases::EndpointCase;
pub use directive::{ArgDirective, Directive};
pub use imports::{Import, ImportKind};
pub use types::{StructRef, TypeInfo};

/// Suffix of generated files; the analyzer skips them to avoid parsing its
/// own output.
pub const GENERATED_FILE_SUFFIX: &str = "_quillrpc.rs";

/// Marker type spelling that tags a struct as a service.
pub const MARKER_TYPE: &str = "quillrpc::Service";

/// Analyzer and generator diagnostics.
#[derive(Debug, Error)]
pub enum GenError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("can't parse type of argument {arg} in {method}: {detail}")]
    UnsupportedArgType {
        method: String,
        arg: String,
        detail: String,
    },

    #[error("can't parse type of return value in {method}: {detail}")]
    UnsupportedReturnType { method: String, detail: String },

    #[error("multiple data returns in {method}; methods may return at most one value besides the error")]
    AmbiguousReturns { method: String },

    #[error("default value on non-optional argument {arg} in {method}; wrap the parameter in Option")]
    DefaultOnRequired { method: String, arg: String },
}

/// File-scope table: top-level struct name → its declaration.
pub type FileScope = HashMap<String, syn::ItemStruct>;

/// Root of the generator state for one analyzed package.
#[derive(Debug, Default)]
pub struct PackageInfo {
    /// Entry directory name; names the generated file.
    pub name: String,

    /// Absolute entry directory.
    pub dir: PathBuf,

    /// Services in discovery order.
    pub services: Vec<Service>,

    /// Package-name → file scopes. Key `.` is the analyzed package, other
    /// keys are import names or aliases.
    pub scopes: HashMap<String, Vec<FileScope>>,

    /// Deduplicated import specs of the analyzed package.
    pub imports: Vec<Import>,

    /// Every struct referenced directly or transitively by arguments and
    /// returns, keyed by `StructRef::key()`.
    pub structs: BTreeMap<String, StructDef>,

    pub(crate) visited_imports: HashSet<String>,
}

impl PackageInfo {
    /// Namespaces (import names) referenced by argument or return types.
    /// These are the imports the emitted file must restate.
    pub fn referenced_namespaces(&self) -> Vec<&Import> {
        let mut namespaces: HashSet<&str> = HashSet::new();
        for service in &self.services {
            for method in &service.methods {
                for arg in &method.args {
                    if let Some(reference) = &arg.ty.reference {
                        namespaces.insert(&reference.namespace);
                    }
                }
                if let Some(data) = &method.returns.data {
                    if let Some(reference) = &data.reference {
                        namespaces.insert(&reference.namespace);
                    }
                }
            }
        }

        self.imports
            .iter()
            .filter(|import| namespaces.contains(import.name.as_str()))
            .collect()
    }
}

/// An exported receiver type recognized by a directive doc line or a marker
/// field.
#[derive(Debug)]
pub struct Service {
    pub name: String,
    pub description: String,
    pub methods: Vec<Method>,
}

/// How the source method reports failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// `quillrpc::Error`: propagated verbatim.
    Library,
    /// Anything else: wrapped as InternalError with its display text.
    Plain,
}

/// Return slots of a method: at most one data value and at most one error.
#[derive(Debug, Default)]
pub struct Returns {
    pub data: Option<TypeInfo>,
    pub error: Option<ErrorKind>,
}

#[derive(Debug)]
pub struct Method {
    pub name: String,

    /// Case-transformed name the dispatch switches on.
    pub route_name: String,

    /// First parameter is the call context.
    pub has_context: bool,

    /// Generated call must `.await`.
    pub is_async: bool,

    pub args: Vec<Arg>,
    pub returns: Returns,

    /// Description of the data return, from the `return` directive.
    pub return_description: String,

    pub description: String,

    /// Documented error codes in source order.
    pub errors: Vec<(i64, String)>,
}

#[derive(Debug)]
pub struct Arg {
    pub name: String,

    /// Wire name: lower-camel of the parameter name, or the alias directive.
    pub json_name: String,

    pub ty: TypeInfo,

    /// Verbatim default expression from the directive; only allowed on
    /// optional arguments.
    pub default: Option<String>,

    pub description: String,
}

/// A struct referenced by the schema, resolved into ordered properties.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub namespace: String,
    pub type_name: String,

    /// Declaration found in the scope tables; `None` until located.
    pub item: Option<syn::ItemStruct>,

    /// `None` until resolved; unresolvable structs stay bare references.
    pub properties: Option<Vec<Property>>,
}

impl StructDef {
    pub fn key(&self) -> String {
        StructRef {
            namespace: self.namespace.clone(),
            name: self.type_name.clone(),
        }
        .key()
    }
}

/// One flattened struct property.
#[derive(Debug, Clone)]
pub struct Property {
    /// Field name after serde renaming.
    pub name: String,
    pub description: String,
    pub kind: Kind,
    pub item_kind: Option<Kind>,
    /// Key of the referenced struct, if any.
    pub reference: Option<String>,
}
