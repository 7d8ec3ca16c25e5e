//! Swift source

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

fn strong(text: &str) -> bool {
    any_group(
        text,
        &[
            &["import Swift"],
            &["import Foundation"],
            &["import UIKit"],
            &["func ", "let "],
        ],
    )
}

pub const RULES: LanguageRules = LanguageRules {
    name: "swift",
    media_type: "text/x-swift",
    extension: "swift",
    cost: TEXT_ENGINE_COST,
    oracle_hint: None,
    interpreter: Some("swift"),
    case_insensitive: false,
    strong,
    markers: &[
        "func ", "let ", "var ", "guard ", "struct ", "-> ", "extension ", "protocol ",
    ],
    min_hits: 3,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
