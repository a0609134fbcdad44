//! Framework, syntactic-marker and table detection from file content.

use mapscope_api::{Language, Layer};
use once_cell::sync::Lazy;
use regex::Regex;

/// A framework recognised through one of its import specifiers.
pub struct FrameworkDef {
    pub name: &'static str,
    pub category: &'static str,
    /// Matched against import specifiers; a trailing `/` means "any sub-path"
    pub prefix: &'static str,
}

pub const FRAMEWORKS: &[FrameworkDef] = &[
    fw("express", "backend", "express"),
    fw("fastify", "backend", "fastify"),
    fw("koa", "backend", "koa"),
    fw("nestjs", "backend", "@nestjs/"),
    fw("next", "frontend", "next"),
    fw("react", "frontend", "react"),
    fw("vue", "frontend", "vue"),
    fw("angular", "frontend", "@angular/"),
    fw("svelte", "frontend", "svelte"),
    fw("mongoose", "database", "mongoose"),
    fw("sequelize", "database", "sequelize"),
    fw("typeorm", "database", "typeorm"),
    fw("prisma", "database", "@prisma/client"),
    fw("knex", "database", "knex"),
    fw("postgres", "database", "pg"),
    fw("mysql", "database", "mysql"),
    fw("mysql", "database", "mysql2"),
    fw("mongodb", "database", "mongodb"),
    fw("redis", "database", "redis"),
    fw("redis", "database", "ioredis"),
    fw("jest", "testing", "jest"),
    fw("mocha", "testing", "mocha"),
    fw("vitest", "testing", "vitest"),
    fw("django", "backend", "django"),
    fw("flask", "backend", "flask"),
    fw("fastapi", "backend", "fastapi"),
    fw("sqlalchemy", "database", "sqlalchemy"),
    fw("pydantic", "validation", "pydantic"),
    fw("pytest", "testing", "pytest"),
    fw("spring", "backend", "org.springframework"),
    fw("jpa", "database", "javax.persistence"),
    fw("jpa", "database", "jakarta.persistence"),
    fw("hibernate", "database", "org.hibernate"),
    fw("junit", "testing", "org.junit"),
    fw("gin", "backend", "github.com/gin-gonic/gin"),
    fw("echo", "backend", "github.com/labstack/echo"),
    fw("gorm", "database", "gorm.io/gorm"),
    fw("actix-web", "backend", "actix_web"),
    fw("axum", "backend", "axum"),
    fw("rocket", "backend", "rocket"),
    fw("diesel", "database", "diesel"),
    fw("sqlx", "database", "sqlx"),
];

const fn fw(name: &'static str, category: &'static str, prefix: &'static str) -> FrameworkDef {
    FrameworkDef {
        name,
        category,
        prefix,
    }
}

impl FrameworkDef {
    fn matches(&self, specifier: &str) -> bool {
        if self.prefix.ends_with('/') {
            return specifier.starts_with(self.prefix);
        }
        match specifier.strip_prefix(self.prefix) {
            Some("") => true,
            Some(rest) => rest.starts_with(['/', '.', ':']),
            None => false,
        }
    }
}

pub fn framework_category(name: &str) -> &'static str {
    FRAMEWORKS
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.category)
        .unwrap_or("other")
}

struct MarkerDef {
    id: &'static str,
    layer: Option<Layer>,
    pattern: Regex,
}

fn marker(id: &'static str, layer: Option<Layer>, pattern: &str) -> MarkerDef {
    MarkerDef {
        id,
        layer,
        pattern: Regex::new(pattern).unwrap(),
    }
}

// Order matters: the first marker with a layer decides the framework layer.
static MARKERS: Lazy<Vec<MarkerDef>> = Lazy::new(|| {
    vec![
        marker("spring-controller", Some(Layer::Controllers), r"@(?:Rest)?Controller\b"),
        marker("spring-service", Some(Layer::Services), r"@Service\b"),
        marker(
            "spring-repository",
            Some(Layer::Repositories),
            r"@Repository\b|extends\s+(?:Jpa|Crud|PagingAndSorting)Repository\b",
        ),
        marker("entity", Some(Layer::Entities), r"@Entity\b"),
        marker("nestjs-injectable", Some(Layer::Services), r"@Injectable\("),
        marker(
            "express-router",
            Some(Layer::Routes),
            r#"\b(?:express\.)?Router\(\)|\b(?:router|app|server)\.(?:get|post|put|patch|delete|route)\(\s*['"`]/"#,
        ),
        marker(
            "python-route",
            Some(Layer::Routes),
            r"@(?:app|router|bp|blueprint|api)\.(?:route|get|post|put|patch|delete)\(|\bAPIRouter\(",
        ),
        marker(
            "http-handler",
            Some(Layer::Controllers),
            r"\*gin\.Context\b|\bhttp\.ResponseWriter\b|\becho\.Context\b|\bHttpRequest\b",
        ),
        marker(
            "orm-model",
            Some(Layer::Models),
            r"mongoose\.model\(|new\s+(?:mongoose\.)?Schema\(|sequelize\.define\(|extends\s+Model\b|\bmodels\.Model\b|\bgorm\.Model\b|derive\([^)]*Queryable",
        ),
        marker(
            "validation-schema",
            Some(Layer::Schemas),
            r"\(BaseModel\)|\bJoi\.object\(|\bz\.object\(|\byup\.object\(",
        ),
        marker(
            "express-middleware",
            Some(Layer::Middleware),
            r"\(\s*req\s*(?::\s*\w+\s*)?,\s*res\s*(?::\s*\w+\s*)?,\s*next\s*(?::\s*\w+\s*)?\)",
        ),
        marker("react-component", None, r"return\s*\(?\s*<[A-Za-z]|React\.FC\b"),
    ]
});

static TABLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"@Table\(\s*name\s*=\s*"(\w+)""#,
        r#"__tablename__\s*=\s*['"](\w+)['"]"#,
        r#"tableName\s*:\s*['"](\w+)['"]"#,
        r#"@Entity\(\s*['"](\w+)['"]"#,
        r#"@Entity\(\s*\{\s*name\s*:\s*['"](\w+)['"]"#,
        r#"mongoose\.model\(\s*['"](\w+)['"]"#,
        r#"sequelize\.define\(\s*['"](\w+)['"]"#,
        r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?[`"']?(\w+)"#,
        r"table_name\s*=\s*(\w+)",
        r"\btable!\s*\{\s*(\w+)",
        r#"TableName\(\)\s*string\s*\{\s*return\s*"(\w+)""#,
        r#"db_table\s*=\s*['"](\w+)['"]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentMarkers {
    pub frameworks: Vec<String>,
    pub markers: Vec<String>,
    pub tables: Vec<String>,
}

/// Detect frameworks (through imports), syntactic markers and declared tables.
pub fn detect_markers(text: &str, language: &Language, imports: &[String]) -> ContentMarkers {
    let mut frameworks: Vec<String> = imports
        .iter()
        .flat_map(|spec| {
            FRAMEWORKS
                .iter()
                .filter(move |f| f.matches(spec))
                .map(|f| f.name.to_string())
        })
        .collect();
    frameworks.sort();
    frameworks.dedup();

    let mut markers: Vec<String> = MARKERS
        .iter()
        .filter(|m| m.pattern.is_match(text))
        .map(|m| m.id.to_string())
        .collect();
    if *language == Language::VUE {
        markers.push("vue-component".to_string());
    }

    let mut tables: Vec<String> = TABLE_PATTERNS
        .iter()
        .flat_map(|re| re.captures_iter(text).map(|c| c[1].to_string()))
        .collect();
    tables.sort();
    tables.dedup();

    ContentMarkers {
        frameworks,
        markers,
        tables,
    }
}

/// Layer implied by the first layer-bearing marker present.
pub fn marker_layer(markers: &[String]) -> Option<Layer> {
    MARKERS
        .iter()
        .filter(|m| m.layer.is_some())
        .find(|m| markers.iter().any(|id| id == m.id))
        .and_then(|m| m.layer)
}

pub fn is_component_marker(marker: &str) -> bool {
    marker == "react-component" || marker == "vue-component"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framework_prefix_boundaries() {
        let imports = vec![
            "express".to_string(),
            "pg-format".to_string(),
            "@nestjs/common".to_string(),
            "org.springframework.web.bind.annotation.RestController".to_string(),
        ];
        let found = detect_markers("", &Language::JAVASCRIPT, &imports);
        assert_eq!(found.frameworks, vec!["express", "nestjs", "spring"]);
    }

    #[test]
    fn test_markers_and_layer() {
        let text = r#"
@RestController
@RequestMapping("/users")
public class UserController {}
"#;
        let found = detect_markers(text, &Language::JAVA, &[]);
        assert_eq!(found.markers, vec!["spring-controller"]);
        assert_eq!(marker_layer(&found.markers), Some(Layer::Controllers));

        let router = "const router = express.Router();\nrouter.get('/users', list);";
        let found = detect_markers(router, &Language::JAVASCRIPT, &[]);
        assert_eq!(marker_layer(&found.markers), Some(Layer::Routes));
        assert_eq!(marker_layer(&[]), None);
    }

    #[test]
    fn test_table_detection() {
        let text = r#"
class User(Base):
    __tablename__ = "users"

const Order = sequelize.define('orders', {});
CREATE TABLE IF NOT EXISTS audit_log (id int);
"#;
        let found = detect_markers(text, &Language::PYTHON, &[]);
        assert_eq!(found.tables, vec!["audit_log", "orders", "users"]);
    }
}
