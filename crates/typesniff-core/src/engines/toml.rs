//! TOML documents
//!
//! The only language engine with a structural layer: a full parse through the
//! `toml` crate. A lone `key = value` line is also valid Python, INI or shell,
//! so the parse only counts with a table or at least two keys.

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules};

/// A table header on the first line plus key/value syntax somewhere.
fn strong(text: &str) -> bool {
    let first = text.lines().next().unwrap_or_default();
    first.trim_start().starts_with('[')
        && first.contains(']')
        && text.contains('=')
        && text.contains('\n')
}

fn is_table_like(value: &toml::Value) -> bool {
    match value {
        toml::Value::Table(_) => true,
        toml::Value::Array(items) => !items.is_empty() && items.iter().all(toml::Value::is_table),
        _ => false,
    }
}

fn parses(text: &str) -> bool {
    text.parse::<toml::Table>()
        .is_ok_and(|table| table.len() >= 2 || table.values().any(is_table_like))
}

pub const RULES: LanguageRules = LanguageRules {
    name: "toml",
    media_type: "application/toml",
    extension: "toml",
    cost: TEXT_ENGINE_COST,
    oracle_hint: Some("toml"),
    interpreter: None,
    case_insensitive: false,
    strong,
    markers: &["[[", "]\n", " = ", " = \"", " = true", " = false", "\"\"\""],
    min_hits: 3,
    structural: Some(parses),
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
