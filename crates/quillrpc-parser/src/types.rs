//! Type-expression classifier.
//!
//! Maps a syntactic type to the host spelling used verbatim in generated
//! code and to the coarse SMD triple (kind, item kind, struct reference).

use quillrpc_smd::Kind;
use syn::{GenericArgument, PathArguments, Type};

/// Reference to a user-defined struct: namespace `.` is the analyzed
/// package, anything else is an import's local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructRef {
    pub namespace: String,
    pub name: String,
}

impl StructRef {
    pub fn local(name: impl Into<String>) -> Self {
        Self { namespace: ".".to_string(), name: name.into() }
    }

    /// Key into the package's structure map and the `$ref` spelling.
    pub fn key(&self) -> String {
        if self.namespace == "." {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }
}

/// Classifier output for one type expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    /// Host spelling, reused untouched in emitted declarations.
    pub spelling: String,
    pub kind: Kind,
    /// Element kind for arrays.
    pub item_kind: Option<Kind>,
    pub reference: Option<StructRef>,
    /// `Option<..>` at the outermost level.
    pub optional: bool,
}

impl TypeInfo {
    fn basic(spelling: impl Into<String>, kind: Kind) -> Self {
        Self {
            spelling: spelling.into(),
            kind,
            item_kind: None,
            reference: None,
            optional: false,
        }
    }
}

/// A type form the generator cannot describe; the caller attaches
/// `service.method` context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedType(pub String);

const INTEGERS: &[&str] = &[
    "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
];

/// Classify a type expression, failing on forms the generated code could not
/// declare or deserialize (references, trait objects, bare tuples).
pub fn classify(ty: &Type) -> Result<TypeInfo, UnsupportedType> {
    match ty {
        Type::Paren(inner) => classify(&inner.elem),

        Type::Array(array) => {
            let elem = classify(&array.elem)?;
            let len = spell_expr(&array.len);
            Ok(TypeInfo {
                spelling: format!("[{}; {len}]", elem.spelling),
                kind: Kind::Array,
                item_kind: Some(elem.kind),
                reference: elem.reference,
                optional: false,
            })
        }

        Type::Path(path) => {
            let segments: Vec<String> =
                path.path.segments.iter().map(|s| s.ident.to_string()).collect();
            let last = path.path.segments.last().ok_or_else(|| unsupported(ty))?;
            let last_name = last.ident.to_string();

            match last_name.as_str() {
                "Option" => {
                    let inner = classify(generic_arg(last, 0).ok_or_else(|| unsupported(ty))?)?;
                    Ok(TypeInfo {
                        spelling: format!("Option<{}>", inner.spelling),
                        optional: true,
                        ..inner
                    })
                }
                "Box" => {
                    let inner = classify(generic_arg(last, 0).ok_or_else(|| unsupported(ty))?)?;
                    Ok(TypeInfo {
                        spelling: format!("Box<{}>", inner.spelling),
                        ..inner
                    })
                }
                "Vec" => {
                    let elem = classify(generic_arg(last, 0).ok_or_else(|| unsupported(ty))?)?;
                    Ok(TypeInfo {
                        spelling: format!("Vec<{}>", elem.spelling),
                        kind: Kind::Array,
                        item_kind: Some(elem.kind),
                        reference: elem.reference,
                        optional: false,
                    })
                }
                "HashMap" | "BTreeMap" => {
                    let key = classify(generic_arg(last, 0).ok_or_else(|| unsupported(ty))?)?;
                    let value = classify(generic_arg(last, 1).ok_or_else(|| unsupported(ty))?)?;
                    Ok(TypeInfo::basic(
                        format!("{last_name}<{}, {}>", key.spelling, value.spelling),
                        Kind::Object,
                    ))
                }
                "Value" => Ok(TypeInfo::basic(spell_path(&segments), Kind::Object)),
                "bool" => Ok(TypeInfo::basic("bool", Kind::Boolean)),
                "String" | "str" | "char" => {
                    Ok(TypeInfo::basic(spell_path(&segments), Kind::String))
                }
                "f32" | "f64" => Ok(TypeInfo::basic(spell_path(&segments), Kind::Float)),
                name if INTEGERS.contains(&name) => {
                    Ok(TypeInfo::basic(spell_path(&segments), Kind::Integer))
                }
                _ => {
                    if !matches!(last.arguments, PathArguments::None) {
                        // Generic user types have no schema rendering.
                        return Err(unsupported(ty));
                    }

                    // Strip path qualifiers; the namespace is the segment
                    // the importing source spells before the type name.
                    let meaningful: Vec<&String> = segments
                        .iter()
                        .filter(|s| !matches!(s.as_str(), "crate" | "self" | "super"))
                        .collect();

                    let reference = match meaningful.as_slice() {
                        [name] => StructRef::local((*name).clone()),
                        [.., namespace, name] => StructRef {
                            namespace: (*namespace).clone(),
                            name: (*name).clone(),
                        },
                        [] => return Err(unsupported(ty)),
                    };

                    Ok(TypeInfo {
                        spelling: spell_path(&segments),
                        kind: Kind::Object,
                        item_kind: None,
                        reference: Some(reference),
                        optional: false,
                    })
                }
            }
        }

        _ => Err(unsupported(ty)),
    }
}

/// Classifier for struct fields: forms the strict classifier rejects are
/// described as bare objects so one odd field does not sink the schema.
pub fn classify_lossy(ty: &Type) -> TypeInfo {
    classify(ty).unwrap_or_else(|UnsupportedType(spelling)| TypeInfo::basic(spelling, Kind::Object))
}

fn generic_arg(segment: &syn::PathSegment, index: usize) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };

    args.args
        .iter()
        .filter_map(|arg| match arg {
            GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .nth(index)
}

fn spell_path(segments: &[String]) -> String {
    segments.join("::")
}

fn spell_expr(expr: &syn::Expr) -> String {
    match expr {
        syn::Expr::Lit(lit) => match &lit.lit {
            syn::Lit::Int(int) => int.base10_digits().to_string(),
            other => format!("{other:?}"),
        },
        syn::Expr::Path(path) => path
            .path
            .segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect::<Vec<_>>()
            .join("::"),
        _ => String::new(),
    }
}

/// Best-effort spelling for diagnostics.
pub fn describe(ty: &Type) -> String {
    match ty {
        Type::Path(path) => spell_path(
            &path.path.segments.iter().map(|s| s.ident.to_string()).collect::<Vec<_>>(),
        ),
        Type::Reference(_) => "reference type".to_string(),
        Type::Tuple(_) => "tuple type".to_string(),
        Type::TraitObject(_) => "trait object".to_string(),
        Type::ImplTrait(_) => "impl trait".to_string(),
        Type::Slice(_) => "slice type".to_string(),
        _ => "unsupported type".to_string(),
    }
}

fn unsupported(ty: &Type) -> UnsupportedType {
    UnsupportedType(describe(ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(source: &str) -> TypeInfo {
        classify(&syn::parse_str::<Type>(source).unwrap()).unwrap()
    }

    #[test]
    fn basic_kinds() {
        assert_eq!(classify_str("bool").kind, Kind::Boolean);
        assert_eq!(classify_str("String").kind, Kind::String);
        assert_eq!(classify_str("u64").kind, Kind::Integer);
        assert_eq!(classify_str("f32").kind, Kind::Float);
        assert_eq!(classify_str("serde_json::Value").kind, Kind::Object);
        assert!(classify_str("serde_json::Value").reference.is_none());
    }

    #[test]
    fn option_marks_optional_and_keeps_inner_kind() {
        let info = classify_str("Option<f64>");
        assert!(info.optional);
        assert_eq!(info.kind, Kind::Float);
        assert_eq!(info.spelling, "Option<f64>");
    }

    #[test]
    fn vec_is_array_with_item_kind() {
        let info = classify_str("Vec<f64>");
        assert_eq!(info.kind, Kind::Array);
        assert_eq!(info.item_kind, Some(Kind::Float));
        assert!(info.reference.is_none());
        assert_eq!(info.spelling, "Vec<f64>");
    }

    #[test]
    fn vec_of_structs_carries_the_reference() {
        let info = classify_str("Vec<model::Point>");
        assert_eq!(info.kind, Kind::Array);
        assert_eq!(info.item_kind, Some(Kind::Object));
        assert_eq!(info.reference.as_ref().unwrap().key(), "model.Point");
    }

    #[test]
    fn fixed_arrays_keep_their_length() {
        let info = classify_str("[u8; 16]");
        assert_eq!(info.kind, Kind::Array);
        assert_eq!(info.spelling, "[u8; 16]");
        assert_eq!(info.item_kind, Some(Kind::Integer));
    }

    #[test]
    fn maps_are_bare_objects() {
        let info = classify_str("HashMap<String, i64>");
        assert_eq!(info.kind, Kind::Object);
        assert!(info.reference.is_none());
        assert_eq!(info.spelling, "HashMap<String, i64>");
    }

    #[test]
    fn local_structs_reference_themselves() {
        let info = classify_str("Quotient");
        assert_eq!(info.kind, Kind::Object);
        assert_eq!(info.reference, Some(StructRef::local("Quotient")));
    }

    #[test]
    fn crate_qualifier_is_stripped_from_namespaces() {
        let info = classify_str("crate::model::Point");
        assert_eq!(info.reference.as_ref().unwrap().namespace, "model");
        assert_eq!(info.spelling, "crate::model::Point");
    }

    #[test]
    fn unsupported_forms_are_rejected() {
        for source in ["&str", "(i64, bool)", "dyn std::fmt::Debug", "Result<i64, String>"] {
            let ty = syn::parse_str::<Type>(source).unwrap();
            assert!(classify(&ty).is_err(), "source: {source}");
        }
    }

    #[test]
    fn lossy_classifier_falls_back_to_object() {
        let ty = syn::parse_str::<Type>("&str").unwrap();
        let info = classify_lossy(&ty);
        assert_eq!(info.kind, Kind::Object);
        assert!(info.reference.is_none());
    }
}
