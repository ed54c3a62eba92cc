//! Package analyzer: walks the entry package and its imports, discovering
//! services, extracting methods and wiring up the scope tables the struct
//! resolver draws from.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use syn::{FnArg, Item, ItemStruct, Pat, ReturnType, Type, Visibility};
use tracing::{debug, info};

use crate::cases::{self, EndpointCase};
use crate::directive::{self, Directive};
use crate::imports::{self, Import};
use crate::types::{self, StructRef, TypeInfo};
use crate::{Arg, ErrorKind, FileScope, GenError, Method, PackageInfo, Returns, Service};

impl PackageInfo {
    /// Analyze the package containing `entry` plus everything it imports.
    pub fn parse(
        entry: &Path,
        search_paths: &[PathBuf],
        case: EndpointCase,
    ) -> Result<PackageInfo, GenError> {
        let dir = entry.parent().unwrap_or_else(|| Path::new("."));
        let dir = std::path::absolute(dir).map_err(|source| GenError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let name = dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "package".to_string());

        let mut package = PackageInfo {
            name,
            dir: dir.clone(),
            ..PackageInfo::default()
        };

        let files = imports::package_files(&dir)
            .map_err(|source| GenError::Io { path: dir.clone(), source })?;

        let mut parsed = Vec::with_capacity(files.len());
        for path in files {
            debug!(path = %path.display(), "parsing");
            parsed.push(parse_file(&path)?);
        }

        // Services from every file must be known before methods link, so the
        // package is analyzed in two passes.
        let mut seen_imports = HashSet::new();
        for file in &parsed {
            package.collect_scope_and_services(file);
            for import in imports::collect_imports(file) {
                if seen_imports.insert(import.dedup_key()) {
                    package.imports.push(import);
                }
            }
        }
        for file in &parsed {
            package.collect_methods(file, case)?;
        }

        let entry_imports = package.imports.clone();
        package.parse_imports(&entry_imports, search_paths)?;

        package.resolve_structs();

        info!(
            package = %package.name,
            services = package.services.len(),
            structs = package.structs.len(),
            "analysis complete"
        );

        Ok(package)
    }

    /// Pass 1 over an entry file: scope table plus service discovery.
    pub(crate) fn collect_scope_and_services(&mut self, file: &syn::File) {
        self.scopes.entry(".".to_string()).or_default().push(file_scope(file));

        for item in &file.items {
            let Item::Struct(item) = item else {
                continue;
            };
            if !matches!(item.vis, Visibility::Public(_)) {
                continue;
            }

            if directive::has_marker_line(&item.attrs) || has_marker_field(item) {
                let (description, _) = directive::parse_doc_block(&item.attrs);
                debug!(service = %item.ident, "service detected");
                self.services.push(Service {
                    name: item.ident.to_string(),
                    description,
                    methods: Vec::new(),
                });
            }
        }
    }

    /// Pass 2 over an entry file: methods from inherent impl blocks of
    /// detected services.
    pub(crate) fn collect_methods(
        &mut self,
        file: &syn::File,
        case: EndpointCase,
    ) -> Result<(), GenError> {
        for item in &file.items {
            let Item::Impl(block) = item else {
                continue;
            };
            if block.trait_.is_some() {
                continue;
            }
            let Some(receiver) = impl_target(&block.self_ty) else {
                continue;
            };
            let Some(index) = self.services.iter().position(|s| s.name == receiver) else {
                // Methods that bind to no service are discarded.
                continue;
            };

            for impl_item in &block.items {
                let syn::ImplItem::Fn(function) = impl_item else {
                    continue;
                };
                if !matches!(function.vis, Visibility::Public(_)) {
                    continue;
                }
                if !has_receiver(function) {
                    continue;
                }

                let (method, references) = build_method(&receiver, function, case)?;
                for reference in references {
                    self.register_struct(&reference);
                }
                self.services[index].methods.push(method);
            }
        }

        Ok(())
    }

    /// Descend into imported packages, accumulating their scopes under the
    /// import's local name. Imported packages contribute type declarations
    /// and inner imports only, never services.
    fn parse_imports(
        &mut self,
        pending: &[Import],
        search_paths: &[PathBuf],
    ) -> Result<(), GenError> {
        for import in pending {
            if !self.visited_imports.insert(import.dedup_key()) {
                continue;
            }

            let Some(location) = imports::resolve(import, &self.dir, search_paths) else {
                continue;
            };

            let files = imports::package_files(&location).map_err(|source| GenError::Io {
                path: location.clone(),
                source,
            })?;

            let mut inner = Vec::new();
            let mut seen = HashSet::new();
            for path in files {
                let file = parse_file(&path)?;
                self.scopes
                    .entry(import.name.clone())
                    .or_default()
                    .push(file_scope(&file));
                for inner_import in imports::collect_imports(&file) {
                    if seen.insert(inner_import.dedup_key()) {
                        inner.push(inner_import);
                    }
                }
            }

            self.parse_imports(&inner, search_paths)?;
        }

        Ok(())
    }
}

pub(crate) fn file_scope(file: &syn::File) -> FileScope {
    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Struct(item) => Some((item.ident.to_string(), item.clone())),
            _ => None,
        })
        .collect()
}

fn parse_file(path: &Path) -> Result<syn::File, GenError> {
    let source = std::fs::read_to_string(path).map_err(|source| GenError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    syn::parse_file(&source).map_err(|source| GenError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn has_marker_field(item: &ItemStruct) -> bool {
    item.fields
        .iter()
        .any(|field| types::describe(&field.ty) == crate::MARKER_TYPE)
}

fn impl_target(self_ty: &Type) -> Option<String> {
    let Type::Path(path) = self_ty else {
        return None;
    };
    path.path.get_ident().map(|ident| ident.to_string())
}

fn has_receiver(function: &syn::ImplItemFn) -> bool {
    matches!(function.sig.inputs.first(), Some(FnArg::Receiver(_)))
}

/// `&Context` / `&quillrpc::Context` in first parameter position.
fn is_context_param(ty: &Type) -> bool {
    let Type::Reference(reference) = ty else {
        return false;
    };
    let Type::Path(path) = &*reference.elem else {
        return false;
    };

    path.path
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "Context")
}

fn is_library_error(ty: &Type) -> bool {
    let spelling = types::describe(ty);
    spelling == "quillrpc::Error" || spelling == "Error"
}

fn build_method(
    service: &str,
    function: &syn::ImplItemFn,
    case: EndpointCase,
) -> Result<(Method, Vec<StructRef>), GenError> {
    let name = function.sig.ident.to_string();
    let label = format!("{service}.{name}");
    let (description, directives) = directive::parse_doc_block(&function.attrs);

    let mut method = Method {
        route_name: case.apply(&name),
        name,
        has_context: false,
        is_async: function.sig.asyncness.is_some(),
        args: Vec::new(),
        returns: Returns::default(),
        return_description: String::new(),
        description,
        errors: Vec::new(),
    };

    let mut references = Vec::new();

    for (position, input) in function.sig.inputs.iter().enumerate() {
        let FnArg::Typed(param) = input else {
            continue; // receiver
        };

        // Parameter 1 of context type is absorbed into a flag.
        if position == 1 && is_context_param(&param.ty) {
            method.has_context = true;
            continue;
        }

        let Pat::Ident(pat) = &*param.pat else {
            return Err(GenError::UnsupportedArgType {
                method: label.clone(),
                arg: "<pattern>".to_string(),
                detail: "argument patterns are not supported".to_string(),
            });
        };
        let arg_name = pat.ident.to_string();

        let ty = types::classify(&param.ty).map_err(|err| GenError::UnsupportedArgType {
            method: label.clone(),
            arg: arg_name.clone(),
            detail: err.0,
        })?;

        if let Some(reference) = &ty.reference {
            references.push(reference.clone());
        }

        method.args.push(Arg {
            json_name: cases::lower_camel(&arg_name),
            name: arg_name,
            ty,
            default: None,
            description: String::new(),
        });
    }

    method.returns = parse_returns(&function.sig.output, &label)?;
    if let Some(data) = &method.returns.data {
        if let Some(reference) = &data.reference {
            references.push(reference.clone());
        }
    }

    apply_directives(&mut method, directives, &label)?;

    Ok((method, references))
}

fn parse_returns(output: &ReturnType, label: &str) -> Result<Returns, GenError> {
    let ty = match output {
        ReturnType::Default => return Ok(Returns::default()),
        ReturnType::Type(_, ty) => &**ty,
    };

    // Result<T, E> fills both slots; a bare type is the lone data return.
    if let Type::Path(path) = ty {
        if let Some(last) = path.path.segments.last() {
            if last.ident == "Result" {
                let args: Vec<&Type> = generic_types(last);

                let data = match args.first() {
                    None => None,
                    Some(Type::Tuple(tuple)) if tuple.elems.is_empty() => None,
                    Some(Type::Tuple(tuple)) if tuple.elems.len() >= 2 => {
                        return Err(GenError::AmbiguousReturns { method: label.to_string() });
                    }
                    Some(data_ty) => Some(classify_return(data_ty, label)?),
                };

                let error = match args.get(1) {
                    Some(error_ty) if is_library_error(error_ty) => ErrorKind::Library,
                    _ => ErrorKind::Plain,
                };

                return Ok(Returns { data, error: Some(error) });
            }
        }
    }

    match ty {
        Type::Tuple(tuple) if tuple.elems.is_empty() => Ok(Returns::default()),
        Type::Tuple(tuple) if tuple.elems.len() >= 2 => {
            Err(GenError::AmbiguousReturns { method: label.to_string() })
        }
        _ => Ok(Returns {
            data: Some(classify_return(ty, label)?),
            error: None,
        }),
    }
}

fn classify_return(ty: &Type, label: &str) -> Result<TypeInfo, GenError> {
    types::classify(ty).map_err(|err| GenError::UnsupportedReturnType {
        method: label.to_string(),
        detail: err.0,
    })
}

fn generic_types(segment: &syn::PathSegment) -> Vec<&Type> {
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return Vec::new();
    };

    args.args
        .iter()
        .filter_map(|arg| match arg {
            syn::GenericArgument::Type(ty) => Some(ty),
            _ => None,
        })
        .collect()
}

fn apply_directives(
    method: &mut Method,
    directives: Vec<Directive>,
    label: &str,
) -> Result<(), GenError> {
    for directive in directives {
        match directive {
            Directive::Argument(meta) => {
                // Directives naming no parameter are ignored so that new
                // directive forms stay additive.
                let Some(arg) = method.args.iter_mut().find(|arg| arg.name == meta.name) else {
                    debug!(directive = %meta.name, method = label, "directive matches no argument");
                    continue;
                };

                if let Some(alias) = meta.alias {
                    arg.json_name = alias;
                }
                if let Some(default) = meta.default {
                    if !arg.ty.optional {
                        return Err(GenError::DefaultOnRequired {
                            method: label.to_string(),
                            arg: arg.name.clone(),
                        });
                    }
                    arg.default = Some(default);
                }
                if !meta.description.is_empty() {
                    arg.description = meta.description;
                }
            }
            Directive::Return(description) => method.return_description = description,
            Directive::Error(code, message) => method.errors.push((code, message)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quillrpc_smd::Kind;

    fn analyze(source: &str) -> Result<PackageInfo, GenError> {
        let file = syn::parse_file(source).unwrap();
        let mut package = PackageInfo::default();
        package.collect_scope_and_services(&file);
        package.collect_methods(&file, EndpointCase::Lower)?;
        package.resolve_structs();
        Ok(package)
    }

    const SERVICE: &str = r#"
        pub struct ArithService {
            rpc: quillrpc::Service,
        }

        impl ArithService {
            /// Pow returns base**exp.
            /// quillrpc:exp=2.0 exponent could be empty
            pub fn pow(&self, base: f64, exp: Option<f64>) -> f64 {
                base.powf(exp.unwrap_or(2.0))
            }

            /// quillrpc:404 not found
            pub fn by_id(&self, ctx: &quillrpc::Context, id: u64) -> Result<Quotient, quillrpc::Error> {
                unimplemented!()
            }

            pub async fn multiply(&self, a: i64, b: i64) -> i64 {
                a * b
            }

            fn private_helper(&self) -> i64 {
                0
            }

            pub fn no_receiver() -> i64 {
                0
            }
        }

        pub struct Quotient {
            pub quo: i64,
            pub rem: i64,
        }
    "#;

    #[test]
    fn marker_field_discovers_the_service() {
        let package = analyze(SERVICE).unwrap();
        assert_eq!(package.services.len(), 1);
        assert_eq!(package.services[0].name, "ArithService");

        let methods: Vec<&str> =
            package.services[0].methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["pow", "by_id", "multiply"]);
    }

    #[test]
    fn doc_marker_discovers_the_service() {
        let package = analyze(
            r#"
            /// Phone book.
            /// quillrpc
            pub struct PhoneBook;
            "#,
        )
        .unwrap();

        assert_eq!(package.services.len(), 1);
        assert_eq!(package.services[0].description, "Phone book.");
    }

    #[test]
    fn unmarked_structs_are_not_services() {
        let package = analyze("pub struct Plain { pub x: i64 }").unwrap();
        assert!(package.services.is_empty());
    }

    #[test]
    fn defaults_bind_to_optional_args() {
        let package = analyze(SERVICE).unwrap();
        let pow = &package.services[0].methods[0];

        assert_eq!(pow.route_name, "pow");
        assert!(!pow.args[0].ty.optional);
        assert!(pow.args[1].ty.optional);
        assert_eq!(pow.args[1].default.as_deref(), Some("2.0"));
        assert_eq!(pow.args[1].description, "exponent could be empty");
        assert_eq!(pow.description, "Pow returns base**exp.");
    }

    #[test]
    fn context_parameter_is_absorbed() {
        let package = analyze(SERVICE).unwrap();
        let by_id = &package.services[0].methods[1];

        assert!(by_id.has_context);
        assert_eq!(by_id.args.len(), 1);
        assert_eq!(by_id.args[0].name, "id");
        assert_eq!(by_id.errors, vec![(404, "not found".to_string())]);
        assert_eq!(by_id.returns.error, Some(ErrorKind::Library));
        assert_eq!(by_id.returns.data.as_ref().unwrap().kind, Kind::Object);
    }

    #[test]
    fn async_methods_are_flagged() {
        let package = analyze(SERVICE).unwrap();
        assert!(package.services[0].methods[2].is_async);
    }

    #[test]
    fn referenced_structs_are_resolved() {
        let package = analyze(SERVICE).unwrap();
        let quotient = &package.structs["Quotient"];
        let props = quotient.properties.as_ref().unwrap();
        assert_eq!(props.len(), 2);
    }

    #[test]
    fn plain_errors_are_classified() {
        let package = analyze(
            r#"
            /// quillrpc
            pub struct S;

            impl S {
                pub fn check(&self, is_err: bool) -> Result<(), std::io::Error> {
                    Ok(())
                }
            }
            "#,
        )
        .unwrap();

        let check = &package.services[0].methods[0];
        assert_eq!(check.returns.error, Some(ErrorKind::Plain));
        assert!(check.returns.data.is_none());
        assert_eq!(check.args[0].json_name, "isErr");
    }

    #[test]
    fn tuple_returns_are_rejected_with_context() {
        let err = analyze(
            r#"
            /// quillrpc
            pub struct S;

            impl S {
                pub fn bad(&self) -> (i64, bool) {
                    (0, false)
                }
            }
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, GenError::AmbiguousReturns { ref method } if method == "S.bad"));
    }

    #[test]
    fn default_on_required_arg_is_rejected() {
        let err = analyze(
            r#"
            /// quillrpc
            pub struct S;

            impl S {
                /// quillrpc:a=1
                pub fn f(&self, a: i64) -> i64 {
                    a
                }
            }
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, GenError::DefaultOnRequired { ref arg, .. } if arg == "a"));
    }

    #[test]
    fn reference_args_are_diagnosed() {
        let err = analyze(
            r#"
            /// quillrpc
            pub struct S;

            impl S {
                pub fn f(&self, name: &str) -> i64 {
                    0
                }
            }
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, GenError::UnsupportedArgType { ref method, .. } if method == "S.f"));
    }
}
