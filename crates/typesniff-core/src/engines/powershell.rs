//! PowerShell scripts
//!
//! Matching is case-insensitive, as PowerShell itself is.

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

fn strong(text: &str) -> bool {
    text.trim_start().starts_with("#requires") || any_group(text, &[&["write-host"]])
}

pub const RULES: LanguageRules = LanguageRules {
    name: "powershell",
    media_type: "text/x-powershell",
    extension: "ps1",
    cost: TEXT_ENGINE_COST,
    oracle_hint: None,
    interpreter: Some("pwsh"),
    case_insensitive: true,
    strong,
    markers: &[
        "param(",
        "$_",
        "get-",
        "set-",
        " -eq ",
        "write-output",
        "foreach-object",
        "$psscriptroot",
    ],
    min_hits: 2,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
