//! PHP source

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

fn strong(text: &str) -> bool {
    any_group(text, &[&["<?php"], &["$", "function", "<?"]])
}

pub const RULES: LanguageRules = LanguageRules {
    name: "php",
    media_type: "text/x-php",
    extension: "php",
    cost: TEXT_ENGINE_COST,
    oracle_hint: Some("php"),
    interpreter: Some("php"),
    case_insensitive: false,
    strong,
    markers: &[
        "$this->",
        "function ",
        "echo ",
        "namespace ",
        "public function",
        "=> ",
        "?>",
        "require_once",
    ],
    min_hits: 2,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
