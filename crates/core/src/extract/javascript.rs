use super::{clean_type, split_params, ExtractError, Extraction, LineIndex, SignatureExtractor};
use mapscope_api::{Language, Signature, SignatureKind, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IMPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*import\s+(?:type\s+)?(?:[\w*{}\s,$]+?\s+from\s+)?['"]([^'"]+)['"]"#)
        .unwrap()
});
static EXPORT_FROM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^\s*export\s+(?:type\s+)?(?:\*|\{[^}]*\})\s*(?:as\s+[\w$]+\s+)?from\s+['"]([^'"]+)['"]"#)
        .unwrap()
});
static REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static DYNAMIC_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bimport\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());

static FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export\s+)?(default\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>(]*>)?\s*\(([^)]*)\)(?:\s*:\s*([^{;\n]+))?",
    )
    .unwrap()
});
static ARROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[^=\n]+)?=\s*(async\s+)?(?:\(([^)]*)\)|([A-Za-z_$][\w$]*))\s*(?::\s*([^=\n]+?))?\s*=>",
    )
    .unwrap()
});
static FUNCTION_EXPR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(async\s+)?function\s*\*?\s*[\w$]*\s*\(([^)]*)\)",
    )
    .unwrap()
});
static CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(export\s+)?(default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)")
        .unwrap()
});
static INTERFACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)").unwrap()
});
static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?type\s+([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*=")
        .unwrap()
});
static ENUM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)")
        .unwrap()
});
static METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]+((?:public|private|protected)\s+)?(?:static\s+)?(?:readonly\s+)?(async\s+)?(#?[A-Za-z_$][\w$]*)\s*\(([^)]*)\)\s*(?::\s*([^{\n]+?))?\s*\{",
    )
    .unwrap()
});

static EXPORT_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^\s*export\s+(?:declare\s+)?(?:const|let|var|class|abstract\s+class|interface|type|enum|const\s+enum|function\*?|async\s+function\*?)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});
static EXPORT_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*export\s+(?:type\s+)?\{([^}]*)\}").unwrap());
static EXPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*export\s+default\s+(?:async\s+)?(?:function\s*\*?\s*|class\s+)?([A-Za-z_$][\w$]*)?")
        .unwrap()
});
static MODULE_EXPORTS_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"module\.exports\s*=\s*\{([^}]*)\}").unwrap());
static MODULE_EXPORTS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)module\.exports\s*=\s*([A-Za-z_$][\w$]*)\s*;?\s*$").unwrap());
static EXPORTS_PROPERTY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=").unwrap());

const NOT_METHODS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "function", "return", "with", "constructor", "else",
    "do", "try", "super", "typeof", "await", "new",
];

/// JavaScript, TypeScript and single-file component scripts.
pub struct JavaScriptExtractor;

impl SignatureExtractor for JavaScriptExtractor {
    fn name(&self) -> &'static str {
        "javascript"
    }

    fn supports(&self, language: &Language) -> bool {
        *language == Language::JAVASCRIPT
            || *language == Language::TYPESCRIPT
            || *language == Language::VUE
    }

    fn extract(&self, text: &str, _language: &Language) -> Result<Extraction, ExtractError> {
        let lines = LineIndex::new(text);
        let exports = collect_exports(text);
        let exported: HashSet<&str> = exports.iter().map(String::as_str).collect();

        let mut imports = Vec::new();
        for re in [&*IMPORT_FROM, &*EXPORT_FROM, &*REQUIRE, &*DYNAMIC_IMPORT] {
            imports.extend(re.captures_iter(text).map(|c| c[1].to_string()));
        }

        let mut signatures = Vec::new();
        let mut taken: HashSet<(usize, String)> = HashSet::new();

        for caps in FUNCTION.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let name = caps[4].to_string();
            let mut sig = Signature::new(name.clone(), SignatureKind::Function, line);
            sig.is_async = caps.get(3).is_some();
            sig.params = split_params(&caps[5]);
            sig.return_type = clean_type(caps.get(6).map(|m| m.as_str()));
            set_module_visibility(&mut sig, caps.get(1).is_some() || exported.contains(name.as_str()));
            taken.insert((line, name));
            signatures.push(sig);
        }

        for caps in ARROW.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let name = caps[2].to_string();
            let mut sig = Signature::new(name.clone(), SignatureKind::Function, line);
            sig.is_async = caps.get(3).is_some();
            sig.params = match (caps.get(4), caps.get(5)) {
                (Some(list), _) => split_params(list.as_str()),
                (None, Some(single)) => vec![single.as_str().to_string()],
                _ => Vec::new(),
            };
            sig.return_type = clean_type(caps.get(6).map(|m| m.as_str()));
            set_module_visibility(&mut sig, caps.get(1).is_some() || exported.contains(name.as_str()));
            taken.insert((line, name));
            signatures.push(sig);
        }

        for caps in FUNCTION_EXPR.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let name = caps[2].to_string();
            if !taken.insert((line, name.clone())) {
                continue;
            }
            let mut sig = Signature::new(name.clone(), SignatureKind::Function, line);
            sig.is_async = caps.get(3).is_some();
            sig.params = split_params(&caps[4]);
            set_module_visibility(&mut sig, caps.get(1).is_some() || exported.contains(name.as_str()));
            signatures.push(sig);
        }

        for caps in CLASS.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let name = caps[3].to_string();
            let mut sig = Signature::new(name.clone(), SignatureKind::Class, line);
            set_module_visibility(&mut sig, caps.get(1).is_some() || exported.contains(name.as_str()));
            signatures.push(sig);
        }

        let simple = [
            (&*INTERFACE, SignatureKind::Interface),
            (&*TYPE_ALIAS, SignatureKind::Type),
            (&*ENUM, SignatureKind::Enum),
        ];
        for (re, kind) in simple {
            for caps in re.captures_iter(text) {
                let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
                let name = caps[2].to_string();
                let mut sig = Signature::new(name.clone(), kind, line);
                set_module_visibility(&mut sig, caps.get(1).is_some() || exported.contains(name.as_str()));
                signatures.push(sig);
            }
        }

        for caps in METHOD.captures_iter(text) {
            let raw_name = &caps[3];
            if NOT_METHODS.contains(&raw_name) {
                continue;
            }
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            if taken.contains(&(line, raw_name.to_string())) {
                continue;
            }
            let mut sig = Signature::new(raw_name.trim_start_matches('#'), SignatureKind::Method, line);
            sig.is_async = caps.get(2).is_some();
            sig.params = split_params(&caps[4]);
            sig.return_type = clean_type(caps.get(5).map(|m| m.as_str()));
            sig.visibility = match caps.get(1).map(|m| m.as_str().trim()) {
                Some("private") => Visibility::Private,
                Some("protected") => Visibility::Protected,
                _ if raw_name.starts_with('#') => Visibility::Private,
                _ => Visibility::Public,
            };
            signatures.push(sig);
        }

        Ok(Extraction {
            exports,
            imports,
            signatures,
        })
    }
}

fn set_module_visibility(sig: &mut Signature, exported: bool) {
    sig.exported = exported;
    sig.visibility = if exported {
        Visibility::Public
    } else {
        Visibility::Private
    };
}

fn collect_exports(text: &str) -> Vec<String> {
    let mut exports = Vec::new();
    exports.extend(EXPORT_DECL.captures_iter(text).map(|c| c[1].to_string()));

    for caps in EXPORT_LIST.captures_iter(text) {
        exports.extend(caps[1].split(',').filter_map(|item| {
            let item = item.trim();
            let name = item.rsplit(" as ").next()?.trim();
            (!name.is_empty()).then(|| name.to_string())
        }));
    }

    for caps in EXPORT_DEFAULT.captures_iter(text) {
        let name = caps.get(1).map_or("default", |m| m.as_str());
        exports.push(name.to_string());
    }

    for caps in MODULE_EXPORTS_OBJECT.captures_iter(text) {
        exports.extend(caps[1].split(',').filter_map(|item| {
            let key = item.split(':').next()?.trim();
            let key = key.trim_start_matches("...");
            (!key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
                .then(|| key.to_string())
        }));
    }

    exports.extend(MODULE_EXPORTS_NAME.captures_iter(text).map(|c| c[1].to_string()));
    exports.extend(EXPORTS_PROPERTY.captures_iter(text).map(|c| c[1].to_string()));
    exports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Extraction {
        JavaScriptExtractor
            .extract(text, &Language::TYPESCRIPT)
            .unwrap()
    }

    #[test]
    fn test_es_module_imports_and_exports() {
        let out = extract(
            r#"
import express from 'express';
import { Router, json } from "express";
import './side-effect';
import type { User } from '../models/user';
export * from './helpers';

export async function getUser(id: string, opts?: Options): Promise<User> {
  return db.find(id);
}

export const listUsers = async (page: number) => [];
function internal() {}
export default class UserController {}
"#,
        );

        assert!(out.imports.contains(&"express".to_string()));
        assert!(out.imports.contains(&"./side-effect".to_string()));
        assert!(out.imports.contains(&"../models/user".to_string()));
        assert!(out.imports.contains(&"./helpers".to_string()));

        assert!(out.exports.contains(&"getUser".to_string()));
        assert!(out.exports.contains(&"listUsers".to_string()));
        assert!(out.exports.contains(&"UserController".to_string()));

        let get_user = out.signatures.iter().find(|s| s.name == "getUser").unwrap();
        assert!(get_user.is_async);
        assert!(get_user.exported);
        assert_eq!(get_user.params.len(), 2);
        assert_eq!(get_user.return_type.as_deref(), Some("Promise<User>"));
        assert_eq!(get_user.line, 8);

        let internal = out.signatures.iter().find(|s| s.name == "internal").unwrap();
        assert!(!internal.exported);
        assert_eq!(internal.visibility, Visibility::Private);

        let list = out.signatures.iter().find(|s| s.name == "listUsers").unwrap();
        assert!(list.is_async);
        assert_eq!(list.params, vec!["page: number".to_string()]);
    }

    #[test]
    fn test_commonjs_exports_mark_signatures() {
        let out = extract(
            r#"
const service = require('../services/user.service');

function create(req, res) {}
function remove(req, res) {}

module.exports = { create, remove };
"#,
        );
        assert_eq!(out.imports, vec!["../services/user.service".to_string()]);
        assert_eq!(out.exports, vec!["create".to_string(), "remove".to_string()]);
        assert!(out.signatures.iter().all(|s| s.exported));
    }

    #[test]
    fn test_class_methods_and_visibility() {
        let out = extract(
            r#"
export class UserService {
  constructor(private repo: Repo) {}

  async findAll(): Promise<User[]> {
    if (x) {
    }
    return [];
  }

  private hash(value: string): string {
    return value;
  }
}
"#,
        );
        let names: Vec<_> = out.signatures.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["UserService", "findAll", "hash"]);
        let hash = &out.signatures[2];
        assert_eq!(hash.kind, SignatureKind::Method);
        assert_eq!(hash.visibility, Visibility::Private);
        assert_eq!(out.signatures[1].return_type.as_deref(), Some("Promise<User[]>"));
    }
}
