use super::{clean_type, split_params, ExtractError, Extraction, LineIndex, SignatureExtractor};
use mapscope_api::{Language, Signature, SignatureKind, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*import\s+(?:static\s+)?(\w+(?:\.\w+)*(?:\.\*)?)").unwrap());
static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)((?:(?:public|protected|private|internal|abstract|final|static|sealed|open|data|enum|annotation)\s+)*)(class|interface|enum|record|object|@interface)\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});
static JAVA_METHOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]+((?:(?:public|protected|private|static|final|abstract|synchronized|native|default)\s+)*)(?:<[^>]+>\s+)?([\w<>\[\],.? ]+?)\s+([a-z_]\w*)\s*\(([^)]*)\)\s*(?:throws\s+[\w., ]+)?\s*[{;]",
    )
    .unwrap()
});
static KOTLIN_FUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^([ \t]*)((?:(?:public|protected|private|internal|override|open|suspend|inline|abstract|operator|infix|tailrec)\s+)*)fun\s+(?:<[^>]+>\s*)?(?:[\w.]+\.)?([A-Za-z_]\w*)\s*\(([^)]*)\)\s*(?::\s*([^{=\n]+))?",
    )
    .unwrap()
});

const NOT_RETURN_TYPES: &[&str] = &["return", "new", "else", "throw", "case", "yield"];

/// Java and Kotlin sources.
pub struct JvmExtractor;

impl SignatureExtractor for JvmExtractor {
    fn name(&self) -> &'static str {
        "jvm"
    }

    fn supports(&self, language: &Language) -> bool {
        *language == Language::JAVA || *language == Language::KOTLIN
    }

    fn extract(&self, text: &str, language: &Language) -> Result<Extraction, ExtractError> {
        let kotlin = *language == Language::KOTLIN;
        let lines = LineIndex::new(text);

        let imports = IMPORT
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect();

        let mut signatures = Vec::new();

        for caps in TYPE_DECL.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let modifiers = &caps[2];
            let kind = match &caps[3] {
                "interface" | "@interface" => SignatureKind::Interface,
                "enum" => SignatureKind::Enum,
                _ if modifiers.contains("enum") => SignatureKind::Enum,
                "record" => SignatureKind::Type,
                _ => SignatureKind::Class,
            };
            let mut sig = Signature::new(&caps[4], kind, line);
            sig.visibility = visibility_of(modifiers, kotlin);
            sig.exported = is_exported(modifiers, kotlin);
            signatures.push(sig);
        }

        if kotlin {
            for caps in KOTLIN_FUN.captures_iter(text) {
                let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
                let modifiers = &caps[2];
                let kind = if caps[1].is_empty() {
                    SignatureKind::Function
                } else {
                    SignatureKind::Method
                };
                let mut sig = Signature::new(&caps[3], kind, line);
                sig.is_async = modifiers.contains("suspend");
                sig.params = split_params(&caps[4]);
                sig.return_type = clean_type(caps.get(5).map(|m| m.as_str()));
                sig.visibility = visibility_of(modifiers, true);
                sig.exported = is_exported(modifiers, true);
                signatures.push(sig);
            }
        } else {
            for caps in JAVA_METHOD.captures_iter(text) {
                let return_type = caps[2].trim();
                let first_word = return_type.split_whitespace().next().unwrap_or("");
                if NOT_RETURN_TYPES.contains(&first_word) {
                    continue;
                }
                let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
                let modifiers = &caps[1];
                let mut sig = Signature::new(&caps[3], SignatureKind::Method, line);
                sig.params = split_params(&caps[4]);
                sig.is_async = return_type.starts_with("CompletableFuture")
                    || return_type.starts_with("Mono")
                    || return_type.starts_with("Flux");
                sig.return_type = (return_type != "void").then(|| return_type.to_string());
                sig.visibility = visibility_of(modifiers, false);
                sig.exported = is_exported(modifiers, false);
                signatures.push(sig);
            }
        }

        let exports = signatures
            .iter()
            .filter(|s| s.exported && (s.is_type_like() || s.kind == SignatureKind::Enum))
            .map(|s| s.name.clone())
            .collect();

        Ok(Extraction {
            exports,
            imports,
            signatures,
        })
    }
}

/// Kotlin declarations are public unless stated otherwise; Java ones are package-private,
/// which maps to protected here.
fn visibility_of(modifiers: &str, kotlin: bool) -> Visibility {
    if modifiers.contains("private") {
        Visibility::Private
    } else if modifiers.contains("protected") || modifiers.contains("internal") {
        Visibility::Protected
    } else if modifiers.contains("public") || kotlin {
        Visibility::Public
    } else {
        Visibility::Protected
    }
}

fn is_exported(modifiers: &str, kotlin: bool) -> bool {
    visibility_of(modifiers, kotlin) == Visibility::Public
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_controller() {
        let text = r#"package com.acme.web;

import com.acme.service.UserService;
import static org.junit.Assert.*;

@RestController
public class UserController {
    private final UserService service;

    @GetMapping("/users/{id}")
    public ResponseEntity<User> getUser(@PathVariable Long id) {
        return service.find(id);
    }

    void audit(String action, int level) {
    }
}
"#;
        let out = JvmExtractor.extract(text, &Language::JAVA).unwrap();
        assert_eq!(
            out.imports,
            vec!["com.acme.service.UserService", "org.junit.Assert.*"]
        );
        assert_eq!(out.exports, vec!["UserController"]);

        let get_user = out.signatures.iter().find(|s| s.name == "getUser").unwrap();
        assert_eq!(get_user.return_type.as_deref(), Some("ResponseEntity<User>"));
        assert_eq!(get_user.params, vec!["@PathVariable Long id"]);
        assert!(get_user.exported);
        assert_eq!(get_user.line, 11);

        let audit = out.signatures.iter().find(|s| s.name == "audit").unwrap();
        assert_eq!(audit.visibility, Visibility::Protected);
        assert_eq!(audit.return_type, None);
        assert_eq!(audit.param_count(), 2);
        assert!(!out.signatures.iter().any(|s| s.name == "find"));
    }

    #[test]
    fn test_kotlin_functions() {
        let text = r#"import kotlinx.coroutines.flow.Flow

data class User(val id: Long)

interface UserRepository {
    suspend fun findById(id: Long): User?
}

private fun helper() = 1
"#;
        let out = JvmExtractor.extract(text, &Language::KOTLIN).unwrap();
        assert_eq!(out.imports, vec!["kotlinx.coroutines.flow.Flow"]);
        assert_eq!(out.exports, vec!["User", "UserRepository"]);

        let find = out.signatures.iter().find(|s| s.name == "findById").unwrap();
        assert!(find.is_async);
        assert_eq!(find.kind, SignatureKind::Method);
        assert_eq!(find.return_type.as_deref(), Some("User?"));

        let helper = out.signatures.iter().find(|s| s.name == "helper").unwrap();
        assert_eq!(helper.visibility, Visibility::Private);
        assert!(!helper.exported);
    }
}
