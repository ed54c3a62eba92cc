//! Structure graph resolution: flattening referenced structs into ordered
//! property lists for schema emission.

use std::collections::HashSet;

use syn::{Attribute, Fields, LitStr};
use tracing::debug;

use crate::directive;
use crate::types::{self, StructRef};
use crate::{PackageInfo, Property, StructDef};

#[derive(Debug, Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    flatten: bool,
}

impl PackageInfo {
    /// Ensure a referenced struct is present in the structure map.
    pub(crate) fn register_struct(&mut self, reference: &StructRef) {
        self.structs.entry(reference.key()).or_insert_with(|| StructDef {
            namespace: reference.namespace.clone(),
            type_name: reference.name.clone(),
            item: None,
            properties: None,
        });
    }

    /// Resolve every registered struct; resolution registers further structs,
    /// so loop until the worklist drains.
    pub(crate) fn resolve_structs(&mut self) {
        let mut in_progress = HashSet::new();
        let mut missing = HashSet::new();

        loop {
            let pending: Vec<String> = self
                .structs
                .iter()
                .filter(|(key, def)| def.properties.is_none() && !missing.contains(*key))
                .map(|(key, _)| key.clone())
                .collect();

            if pending.is_empty() {
                break;
            }

            for key in pending {
                self.resolve_struct(&key, &mut in_progress, &mut missing);
            }
        }
    }

    fn resolve_struct(
        &mut self,
        key: &str,
        in_progress: &mut HashSet<String>,
        missing: &mut HashSet<String>,
    ) {
        if missing.contains(key) || in_progress.contains(key) {
            return;
        }
        let Some(def) = self.structs.get(key) else {
            return;
        };
        if def.properties.is_some() {
            return;
        }

        let namespace = def.namespace.clone();
        let type_name = def.type_name.clone();

        let Some(item) = self.find_declaration(&namespace, &type_name) else {
            // No declaration in any known scope; the struct stays a bare
            // reference in the schema.
            debug!(key, "struct declaration not found");
            missing.insert(key.to_string());
            return;
        };

        if let Some(def) = self.structs.get_mut(key) {
            def.item = Some(item.clone());
        }
        in_progress.insert(key.to_string());

        let mut properties = Vec::new();
        if let Fields::Named(fields) = &item.fields {
            for field in &fields.named {
                let Some(ident) = &field.ident else {
                    continue;
                };

                let attrs = parse_serde_attrs(&field.attrs);
                if attrs.skip {
                    continue;
                }

                let info = types::classify_lossy(&field.ty);

                // A local reference inside an imported struct lives in that
                // import's namespace.
                let reference = info.reference.map(|mut reference| {
                    if reference.namespace == "." && namespace != "." {
                        reference.namespace = namespace.clone();
                    }
                    reference
                });

                if let Some(reference) = &reference {
                    self.register_struct(reference);
                    self.resolve_struct(&reference.key(), in_progress, missing);
                }

                if attrs.flatten {
                    // Splice the embedded struct's properties at the embed
                    // point; the field itself contributes none.
                    if let Some(target) = reference
                        .as_ref()
                        .and_then(|reference| self.structs.get(&reference.key()))
                    {
                        if let Some(spliced) = &target.properties {
                            properties.extend(spliced.iter().cloned());
                        }
                    }
                    continue;
                }

                let (description, _) = directive::parse_doc_block(&field.attrs);
                properties.push(Property {
                    name: attrs.rename.unwrap_or_else(|| ident.to_string()),
                    description,
                    kind: info.kind,
                    item_kind: info.item_kind,
                    reference: reference.map(|reference| reference.key()),
                });
            }
        }

        in_progress.remove(key);
        if let Some(def) = self.structs.get_mut(key) {
            def.properties = Some(properties);
        }
    }

    fn find_declaration(&self, namespace: &str, type_name: &str) -> Option<syn::ItemStruct> {
        self.scopes
            .get(namespace)?
            .iter()
            .find_map(|scope| scope.get(type_name))
            .cloned()
    }
}

/// The serde field controls the resolver honours: `rename`, `skip`,
/// `flatten`. Everything else in the attribute is consumed and ignored.
fn parse_serde_attrs(attrs: &[Attribute]) -> FieldAttrs {
    let mut out = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        let result = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(syn::token::Paren) {
                    // rename(serialize = "..", deserialize = "..")
                    meta.parse_nested_meta(|inner| {
                        let value: LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") {
                            out.rename = Some(value.value());
                        }
                        Ok(())
                    })?;
                } else {
                    let value: LitStr = meta.value()?.parse()?;
                    out.rename = Some(value.value());
                }
            } else if meta.path.is_ident("skip") {
                out.skip = true;
            } else if meta.path.is_ident("flatten") {
                out.flatten = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: syn::Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let content;
                syn::parenthesized!(content in meta.input);
                let _: proc_macro2::TokenStream = content.parse()?;
            }
            Ok(())
        });

        if let Err(err) = result {
            debug!("unparsed serde attribute ignored: {err}");
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillrpc_smd::Kind;

    fn package_with(sources: &[(&str, &str)]) -> PackageInfo {
        let mut pi = PackageInfo::default();
        for (namespace, source) in sources {
            let file = syn::parse_file(source).unwrap();
            let scope = crate::package::file_scope(&file);
            pi.scopes.entry((*namespace).to_string()).or_default().push(scope);
        }
        pi
    }

    #[test]
    fn flattens_fields_with_renames_and_skips() {
        let mut pi = package_with(&[(
            ".",
            r#"
            pub struct Quotient {
                /// Integer part.
                #[serde(rename = "Quo")]
                pub quo: i64,
                pub rem: i64,
                #[serde(skip)]
                pub scratch: i64,
            }
            "#,
        )]);

        pi.register_struct(&StructRef::local("Quotient"));
        pi.resolve_structs();

        let props = pi.structs["Quotient"].properties.as_ref().unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props[0].name, "Quo");
        assert_eq!(props[0].description, "Integer part.");
        assert_eq!(props[1].name, "rem");
    }

    #[test]
    fn serde_flatten_splices_embedded_properties() {
        let mut pi = package_with(&[(
            ".",
            r#"
            pub struct Identity {
                pub id: u64,
                pub name: String,
            }

            pub struct Person {
                #[serde(flatten)]
                pub identity: Identity,
                pub phone: String,
            }
            "#,
        )]);

        pi.register_struct(&StructRef::local("Person"));
        pi.resolve_structs();

        let props = pi.structs["Person"].properties.as_ref().unwrap();
        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "phone"]);

        // The embedded struct is still registered for the definitions map.
        assert!(pi.structs["Identity"].properties.is_some());
    }

    #[test]
    fn cross_package_references_inherit_the_namespace() {
        let mut pi = package_with(&[
            (
                "model",
                r#"
                pub struct Point {
                    pub x: i64,
                    pub inner: Inner,
                }

                pub struct Inner {
                    pub tag: String,
                }
                "#,
            ),
        ]);

        pi.register_struct(&StructRef { namespace: "model".into(), name: "Point".into() });
        pi.resolve_structs();

        let props = pi.structs["model.Point"].properties.as_ref().unwrap();
        assert_eq!(props[1].reference.as_deref(), Some("model.Inner"));
        assert!(pi.structs.contains_key("model.Inner"));
    }

    #[test]
    fn cycles_resolve_once() {
        let mut pi = package_with(&[(
            ".",
            r#"
            pub struct Group {
                pub id: i64,
                pub nodes: Vec<Group>,
                pub child: Option<Group>,
            }
            "#,
        )]);

        pi.register_struct(&StructRef::local("Group"));
        pi.resolve_structs();

        let props = pi.structs["Group"].properties.as_ref().unwrap();
        assert_eq!(props.len(), 3);
        assert_eq!(props[1].kind, Kind::Array);
        assert_eq!(props[1].reference.as_deref(), Some("Group"));
        assert_eq!(pi.structs.len(), 1);
    }

    #[test]
    fn unresolvable_structs_stay_bare_references() {
        let mut pi = package_with(&[(".", "pub struct Known { pub x: i64 }")]);

        pi.register_struct(&StructRef::local("Unknown"));
        pi.resolve_structs();

        assert!(pi.structs["Unknown"].properties.is_none());
    }
}
