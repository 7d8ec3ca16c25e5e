//! C++ source

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

/// `std::` alone also appears in Rust, so it needs a C++-only companion.
fn strong(text: &str) -> bool {
    any_group(
        text,
        &[&["#include <iostream>"], &["std::", "#include"], &["std::", "<<"]],
    )
}

pub const RULES: LanguageRules = LanguageRules {
    name: "cpp",
    media_type: "text/x-c++",
    extension: "cpp",
    cost: TEXT_ENGINE_COST,
    oracle_hint: Some("c++"),
    interpreter: None,
    case_insensitive: false,
    strong,
    markers: &[
        "#include",
        "int main(",
        "namespace ",
        "template",
        "nullptr",
        "cout",
        "class ",
        "public:",
    ],
    min_hits: 2,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
