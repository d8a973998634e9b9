//! Import resolver
//!
//! Maps a file's normalized AST to canonical `(package, export)` symbol
//! usages. Works in three passes over source order: build binding maps from
//! imports, attach call and JSX sites to bindings, then emit an
//! import-location usage for every named binding nothing referenced
//! (importing a removed symbol is a hazard on its own).
//!
//! Out of scope and silently skipped: computed dynamic specifiers,
//! cross-file re-export chains, bundler aliases that are not in the path
//! alias map, and bare globals.

pub mod adapters;

use crate::ast::{NormalizedAst, SourceLocation};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use adapters::AdapterRegistry;

/// How a symbol entered the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
    Dynamic,
}

/// One place a symbol is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSite {
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arg_names: Vec<String>,
}

/// All uses of one `(package, export)` in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolUsage {
    pub package: String,
    pub export: String,
    pub import_kind: ImportKind,
    pub sites: Vec<UsageSite>,
}

/// Resolver output for one file.
#[derive(Debug, Default)]
pub struct ResolvedImports {
    /// Unique by `(package, export)`, in first-appearance order.
    pub usages: Vec<SymbolUsage>,
    /// Tracked packages this file references.
    pub imported_packages: BTreeSet<String>,
    /// Source strings of imports outside the tracked set; drives
    /// new-package-appears invalidation.
    pub unresolved_imports: Vec<String>,
}

/// Extract the package name from an import source string.
///
/// Relative and absolute specifiers yield `None`. Scoped packages are the
/// first two slash-delimited segments; anything else is the first segment.
/// Subpaths are discarded here; adapters canonicalize upstream.
pub fn extract_package_name(source: &str) -> Option<String> {
    if source.is_empty() || source.starts_with('.') || source.starts_with('/') {
        return None;
    }
    let mut segments = source.split('/');
    if source.starts_with('@') {
        let scope = segments.next()?;
        let name = segments.next()?;
        if name.is_empty() {
            return None;
        }
        Some(format!("{scope}/{name}"))
    } else {
        segments.next().map(str::to_string)
    }
}

#[derive(Debug, Clone)]
struct Binding {
    package: String,
    imported: String,
    kind: ImportKind,
    location: SourceLocation,
}

/// Resolve a file's imports and usages.
///
/// `tracked_packages`: restrict binding construction to these packages;
/// `None` tracks every non-relative package. `path_aliases` is the
/// configured prefix map applied as a pre-pass before adapters.
pub fn resolve_imports(
    ast: &NormalizedAst,
    tracked_packages: Option<&BTreeSet<String>>,
    adapters: &AdapterRegistry,
    path_aliases: &BTreeMap<String, String>,
) -> ResolvedImports {
    let mut out = ResolvedImports::default();
    let mut bindings: FxHashMap<String, Binding> = FxHashMap::default();
    // Default and namespace locals double as dotted-call receivers.
    let mut namespace_like: FxHashMap<String, (String, ImportKind)> = FxHashMap::default();

    for import in &ast.imports {
        if import.is_type_only {
            continue;
        }

        let source = apply_aliases(&import.source, path_aliases);
        let source = adapters.canonicalize(&source);
        let Some(package) = extract_package_name(&source) else {
            continue;
        };

        let tracked = tracked_packages
            .map(|set| set.contains(&package))
            .unwrap_or(true);
        if !tracked {
            out.unresolved_imports.push(import.source.clone());
            continue;
        }
        out.imported_packages.insert(package.clone());

        if import.is_dynamic {
            continue;
        }

        for spec in &import.named {
            if spec.is_type_only {
                continue;
            }
            bindings.insert(
                spec.local.clone(),
                Binding {
                    package: package.clone(),
                    imported: spec.imported.clone(),
                    kind: ImportKind::Named,
                    location: import.location,
                },
            );
        }
        if let Some(local) = &import.default_local {
            bindings.insert(
                local.clone(),
                Binding {
                    package: package.clone(),
                    imported: "default".to_string(),
                    kind: ImportKind::Default,
                    location: import.location,
                },
            );
            // Default imports are conventionally used as namespaces in this
            // ecosystem (`React.useState()`).
            namespace_like.insert(local.clone(), (package.clone(), ImportKind::Default));
        }
        if let Some(local) = &import.namespace_local {
            bindings.insert(
                local.clone(),
                Binding {
                    package: package.clone(),
                    imported: "default".to_string(),
                    kind: ImportKind::Namespace,
                    location: import.location,
                },
            );
            namespace_like.insert(local.clone(), (package.clone(), ImportKind::Namespace));
        }
    }

    let mut usages: Vec<SymbolUsage> = Vec::new();
    let mut index: FxHashMap<(String, String), usize> = FxHashMap::default();
    let mut used_locals: BTreeSet<String> = BTreeSet::new();

    let add_site =
        |usages: &mut Vec<SymbolUsage>,
         index: &mut FxHashMap<(String, String), usize>,
         package: &str,
         export: &str,
         kind: ImportKind,
         site: UsageSite| {
            let key = (package.to_string(), export.to_string());
            match index.get(&key) {
                Some(&i) => usages[i].sites.push(site),
                None => {
                    index.insert(key, usages.len());
                    usages.push(SymbolUsage {
                        package: package.to_string(),
                        export: export.to_string(),
                        import_kind: kind,
                        sites: vec![site],
                    });
                }
            }
        };

    for call in &ast.calls {
        match call.callee.split_once('.') {
            None => {
                if let Some(binding) = bindings.get(&call.callee) {
                    if binding.kind == ImportKind::Named {
                        used_locals.insert(call.callee.clone());
                        add_site(
                            &mut usages,
                            &mut index,
                            &binding.package,
                            &binding.imported,
                            ImportKind::Named,
                            UsageSite {
                                location: call.location,
                                arg_count: call.arg_count,
                                arg_names: call.arg_names.clone(),
                            },
                        );
                    }
                }
            }
            Some((head, tail)) => {
                if let Some((package, kind)) = namespace_like.get(head) {
                    used_locals.insert(head.to_string());
                    add_site(
                        &mut usages,
                        &mut index,
                        package,
                        tail,
                        *kind,
                        UsageSite {
                            location: call.location,
                            arg_count: call.arg_count,
                            arg_names: call.arg_names.clone(),
                        },
                    );
                }
            }
        }
    }

    for element in &ast.jsx_elements {
        let site = UsageSite {
            location: element.location,
            arg_count: None,
            arg_names: element.attributes.clone(),
        };
        match element.tag_name.split_once('.') {
            None => {
                if let Some(binding) = bindings.get(&element.tag_name) {
                    if binding.kind == ImportKind::Named {
                        used_locals.insert(element.tag_name.clone());
                        add_site(
                            &mut usages,
                            &mut index,
                            &binding.package,
                            &binding.imported,
                            ImportKind::Named,
                            site,
                        );
                    }
                }
            }
            Some((head, tail)) => {
                if let Some((package, kind)) = namespace_like.get(head) {
                    used_locals.insert(head.to_string());
                    add_site(&mut usages, &mut index, package, tail, *kind, site);
                }
            }
        }
    }

    // Import-only usages: a named binding with no site still means the
    // symbol is loaded at runtime.
    for (local, binding) in &bindings {
        if binding.kind != ImportKind::Named || used_locals.contains(local) {
            continue;
        }
        add_site(
            &mut usages,
            &mut index,
            &binding.package,
            &binding.imported,
            ImportKind::Named,
            UsageSite {
                location: binding.location,
                arg_count: None,
                arg_names: Vec::new(),
            },
        );
    }

    out.unresolved_imports.sort();
    out.unresolved_imports.dedup();
    out.usages = usages;
    out
}

/// Rewrite a source through the configured alias map (longest prefix wins).
fn apply_aliases(source: &str, aliases: &BTreeMap<String, String>) -> String {
    let mut best: Option<(&str, &str)> = None;
    for (prefix, target) in aliases {
        let prefix_trimmed = prefix.trim_end_matches('*');
        if source.starts_with(prefix_trimmed) {
            match best {
                Some((current, _)) if current.len() >= prefix_trimmed.len() => {}
                _ => best = Some((prefix_trimmed, target)),
            }
        }
    }
    match best {
        Some((prefix, target)) => {
            let target = target.trim_end_matches('*');
            format!("{}{}", target, &source[prefix.len()..])
        }
        None => source.to_string(),
    }
}
