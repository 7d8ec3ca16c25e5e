//! Python source

use crate::engine::{Engine, EngineContext};
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

fn strong(text: &str) -> bool {
    any_group(
        text,
        &[&["if __name__ ==", "__main__"], &["def __init__(self"]],
    )
}

pub const RULES: LanguageRules = LanguageRules {
    name: "python",
    media_type: "text/x-python",
    extension: "py",
    cost: 0.01,
    oracle_hint: Some("python"),
    interpreter: Some("python"),
    case_insensitive: false,
    strong,
    markers: &[
        "def ", "import ", "class ", "__name__", "from ", "async def ", "self.", "elif ",
        "print(",
    ],
    min_hits: 2,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}
