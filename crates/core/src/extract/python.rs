use super::{clean_type, split_params, ExtractError, Extraction, LineIndex, SignatureExtractor};
use mapscope_api::{Language, Signature, SignatureKind, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*import\s+([\w.]+(?:\s+as\s+\w+)?(?:[ \t]*,[ \t]*[\w.]+(?:\s+as\s+\w+)?)*)").unwrap());
static FROM_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*from\s+(\.*[\w.]*)\s+import\s+").unwrap());
static DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^([ \t]*)(async\s+)?def\s+([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?:->\s*([^:]+))?:").unwrap()
});
static CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^([ \t]*)class\s+([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:").unwrap());
static ALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)__all__\s*=\s*[\[(](.*?)[\])]").unwrap());

pub struct PythonExtractor;

impl SignatureExtractor for PythonExtractor {
    fn name(&self) -> &'static str {
        "python"
    }

    fn supports(&self, language: &Language) -> bool {
        *language == Language::PYTHON
    }

    fn extract(&self, text: &str, _language: &Language) -> Result<Extraction, ExtractError> {
        let lines = LineIndex::new(text);

        let mut imports = Vec::new();
        for caps in IMPORT.captures_iter(text) {
            imports.extend(caps[1].split(',').filter_map(|part| {
                let module = part.split_whitespace().next()?;
                Some(module.to_string())
            }));
        }
        imports.extend(FROM_IMPORT.captures_iter(text).map(|c| c[1].to_string()));

        let declared_all: Option<Vec<String>> = ALL.captures(text).map(|caps| {
            caps[1]
                .split(',')
                .map(|s| s.trim().trim_matches(['"', '\'']).to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });
        let is_exported = |name: &str, top_level: bool| match &declared_all {
            Some(all) => all.iter().any(|n| n == name),
            None => top_level && !name.starts_with('_'),
        };

        let mut signatures = Vec::new();

        for caps in DEF.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let top_level = caps[1].is_empty();
            let name = &caps[3];
            let kind = if top_level {
                SignatureKind::Function
            } else {
                SignatureKind::Method
            };
            let mut sig = Signature::new(name, kind, line);
            sig.is_async = caps.get(2).is_some();
            sig.params = split_params(&caps[4])
                .into_iter()
                .filter(|p| p != "self" && p != "cls")
                .collect();
            sig.return_type = clean_type(caps.get(5).map(|m| m.as_str()));
            sig.visibility = visibility_of(name);
            sig.exported = is_exported(name, top_level);
            signatures.push(sig);
        }

        for caps in CLASS.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let top_level = caps[1].is_empty();
            let name = &caps[2];
            let bases = caps.get(3).map(|m| m.as_str()).unwrap_or("");
            let kind = if bases.contains("Enum") {
                SignatureKind::Enum
            } else if bases.contains("Protocol") || bases.contains("ABC") {
                SignatureKind::Interface
            } else {
                SignatureKind::Class
            };
            let mut sig = Signature::new(name, kind, line);
            sig.visibility = visibility_of(name);
            sig.exported = is_exported(name, top_level);
            signatures.push(sig);
        }

        let exports = match declared_all {
            Some(all) => all,
            None => signatures
                .iter()
                .filter(|s| s.exported)
                .map(|s| s.name.clone())
                .collect(),
        };

        Ok(Extraction {
            exports,
            imports,
            signatures,
        })
    }
}

fn visibility_of(name: &str) -> Visibility {
    if name.starts_with("__") && !name.ends_with("__") {
        Visibility::Private
    } else if name.starts_with('_') && !name.ends_with("__") {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_python_module() {
        let text = r#"import os, sys as system
from .models import User
from app.services.user_service import UserService

class UserRepository(BaseRepository):
    def __init__(self, session):
        self.session = session

    async def find(self, user_id: int) -> Optional[User]:
        pass

    def _cache_key(self, user_id):
        pass

def build_router():
    pass

def _helper():
    pass
"#;
        let out = PythonExtractor.extract(text, &Language::PYTHON).unwrap();
        assert_eq!(
            out.imports,
            vec!["os", "sys", ".models", "app.services.user_service"]
        );
        assert_eq!(out.exports, vec!["build_router", "UserRepository"]);

        let find = out.signatures.iter().find(|s| s.name == "find").unwrap();
        assert_eq!(find.kind, SignatureKind::Method);
        assert!(find.is_async);
        assert_eq!(find.params, vec!["user_id: int"]);
        assert_eq!(find.return_type.as_deref(), Some("Optional[User]"));
        assert_eq!(find.line, 9);

        let key = out.signatures.iter().find(|s| s.name == "_cache_key").unwrap();
        assert_eq!(key.visibility, Visibility::Protected);
        let init = out.signatures.iter().find(|s| s.name == "__init__").unwrap();
        assert_eq!(init.visibility, Visibility::Public);
    }

    #[test]
    fn test_dunder_all_wins() {
        let text = "__all__ = ['public_api']\n\ndef public_api():\n    pass\n\ndef other():\n    pass\n";
        let out = PythonExtractor.extract(text, &Language::PYTHON).unwrap();
        assert_eq!(out.exports, vec!["public_api"]);
        assert!(!out.signatures.iter().find(|s| s.name == "other").unwrap().exported);
    }
}
