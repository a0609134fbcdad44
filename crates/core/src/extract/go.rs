use super::{clean_type, split_params, ExtractError, Extraction, LineIndex, SignatureExtractor};
use mapscope_api::{Language, Signature, SignatureKind, Visibility};
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_SINGLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#).unwrap());
static IMPORT_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)import\s*\((.*?)\)").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]+)""#).unwrap());
static FUNC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^func\s+(?:\(\s*(?:\w+\s+)?\*?\s*(\w+)[^)]*\)\s*)?([A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*\(([^)]*)\)\s*([^{\n]*)",
    )
    .unwrap()
});
static TYPE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^type\s+([A-Za-z_]\w*)\s+(?:\[[^\]]*\]\s+)?(struct|interface|[\w.\[\]*]+)").unwrap()
});

pub struct GoExtractor;

impl SignatureExtractor for GoExtractor {
    fn name(&self) -> &'static str {
        "go"
    }

    fn supports(&self, language: &Language) -> bool {
        *language == Language::GO
    }

    fn extract(&self, text: &str, _language: &Language) -> Result<Extraction, ExtractError> {
        let lines = LineIndex::new(text);

        let mut imports: Vec<String> = IMPORT_SINGLE
            .captures_iter(text)
            .map(|c| c[1].to_string())
            .collect();
        for block in IMPORT_BLOCK.captures_iter(text) {
            imports.extend(QUOTED.captures_iter(&block[1]).map(|c| c[1].to_string()));
        }

        let mut signatures = Vec::new();

        for caps in FUNC.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let name = &caps[2];
            let kind = if caps.get(1).is_some() {
                SignatureKind::Method
            } else {
                SignatureKind::Function
            };
            let mut sig = Signature::new(name, kind, line);
            sig.params = split_params(&caps[3]);
            sig.return_type = clean_type(caps.get(4).map(|m| m.as_str()));
            // goroutine-returning helpers are the closest Go has to async
            sig.is_async = sig
                .return_type
                .as_deref()
                .is_some_and(|rt| rt.starts_with("<-chan") || rt.starts_with("chan "));
            apply_case_visibility(&mut sig);
            signatures.push(sig);
        }

        for caps in TYPE_DECL.captures_iter(text) {
            let line = lines.line_of(caps.get(0).map_or(0, |m| m.start()));
            let kind = match &caps[2] {
                "struct" => SignatureKind::Class,
                "interface" => SignatureKind::Interface,
                _ => SignatureKind::Type,
            };
            let mut sig = Signature::new(&caps[1], kind, line);
            apply_case_visibility(&mut sig);
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

fn apply_case_visibility(sig: &mut Signature) {
    sig.exported = sig.name.chars().next().is_some_and(|c| c.is_uppercase());
    sig.visibility = if sig.exported {
        Visibility::Public
    } else {
        Visibility::Private
    };
}
