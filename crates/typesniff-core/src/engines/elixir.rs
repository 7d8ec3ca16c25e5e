//! Elixir source

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

fn strong(text: &str) -> bool {
    any_group(text, &[&["defmodule ", " do"]])
}

pub const RULES: LanguageRules = LanguageRules {
    name: "elixir",
    media_type: "text/x-elixir",
    extension: "ex",
    cost: TEXT_ENGINE_COST,
    oracle_hint: None,
    interpreter: Some("elixir"),
    case_insensitive: false,
    strong,
    markers: &[
        "defmodule ", "def ", "defp ", "|>", "do:", "@moduledoc", "%{", "IO.puts",
    ],
    min_hits: 3,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
