use super::{clean_type, split_params, ExtractError, Extraction, LineIndex, SignatureExtractor};
use mapscope_api::{Language, Signature, SignatureKind, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;

static USE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;]+);").unwrap());
static MOD_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_]\w*)\s*;").unwrap());
static FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)^([ \t]*)(pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(async\s+)?(?:unsafe\s+)?(?:extern\s+"[^"]*"\s+)?fn\s+([A-Za-z_]\w*)\s*(?:<[^(]*>)?\s*\(([^)]*)\)\s*(?:->\s*([^{;]+?))?\s*(?:where\b[^{;]*)?[{;]"#,
    )
    .unwrap()
});
static ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(pub(?:\([^)]*\))?\s+)?(struct|enum|trait|type|union)\s+([A-Za-z_]\w*)")
        .unwrap()
});

/// Prefix marking `mod x;` declarations among the imports.
pub const MOD_PREFIX: &str = "mod ";

pub struct RustExtractor;

impl SignatureExtractor for RustExtractor {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn supports(&self, language: &Language) -> bool {
        *language == Language::RUST
    }

    fn extract(&self, text: &str, _language: &Language) -> Result<Extraction, ExtractError> {
        let lines = LineIndex::new(text);

        let mut imports = Vec::new();
        for caps in USE.captures_iter(text) {
            imports.extend(expand_use(&caps[1]));
        }
        imports.extend(
            MOD_DECL
                .captures_iter(text)
                .map(|c| format!("{}{}", MOD_PREFIX, &c[1])),
        );

        let mut signatures = Vec::new();

        for caps in FN.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let kind = if caps[1].is_empty() {
                SignatureKind::Function
            } else {
                SignatureKind::Method
            };
            let mut sig = Signature::new(&caps[4], kind, line);
            sig.is_async = caps.get(3).is_some();
            sig.params = split_params(&caps[5])
                .into_iter()
                .filter(|p| !is_receiver(p))
                .collect();
            sig.return_type = clean_type(caps.get(6).map(|m| m.as_str()));
            apply_visibility(&mut sig, caps.get(2).map(|m| m.as_str()));
            signatures.push(sig);
        }

        for caps in ITEM.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let kind = match &caps[2] {
                "struct" | "union" => SignatureKind::Class,
                "trait" => SignatureKind::Interface,
                "enum" => SignatureKind::Enum,
                _ => SignatureKind::Type,
            };
            let mut sig = Signature::new(&caps[3], kind, line);
            apply_visibility(&mut sig, caps.get(1).map(|m| m.as_str()));
            signatures.push(sig);
        }

        let exports = signatures
            .iter()
            .filter(|s| s.exported && s.kind != SignatureKind::Method)
            .map(|s| s.name.clone())
            .collect();

        Ok(Extraction {
            exports,
            imports,
            signatures,
        })
    }
}

fn is_receiver(param: &str) -> bool {
    matches!(param, "self" | "&self" | "&mut self" | "mut self")
        || param.starts_with("self:")
        || (param.starts_with("&'") && param.ends_with("self"))
}

fn apply_visibility(sig: &mut Signature, modifier: Option<&str>) {
    let modifier = modifier.map(str::trim);
    sig.visibility = match modifier {
        Some("pub") => Visibility::Public,
        Some(_) => Visibility::Protected,
        None => Visibility::Private,
    };
    sig.exported = sig.visibility == Visibility::Public;
}

/// `a::b::{c, d::e}` becomes `a::b::c`, `a::b::d::e`; aliases are dropped.
fn expand_use(tree: &str) -> Vec<String> {
    let tree: String = tree.split_whitespace().collect::<Vec<_>>().join(" ");
    let Some(open) = tree.find('{') else {
        return vec![strip_alias(&tree)];
    };
    let base = tree[..open].trim_end_matches("::").trim();
    let inner = tree[open + 1..].trim_end().trim_end_matches('}');
    let members = super::split_params(inner);
    if members.is_empty() {
        return vec![base.to_string()];
    }
    members
        .iter()
        .flat_map(|member| {
            let member = member.trim();
            if member == "self" {
                vec![base.to_string()]
            } else if member.contains('{') {
                expand_use(&format!("{}::{}", base, member))
            } else {
                vec![format!("{}::{}", base, strip_alias(member))]
            }
        })
        .collect()
}

fn strip_alias(path: &str) -> String {
    path.split(" as ").next().unwrap_or(path).trim().to_string()
}
