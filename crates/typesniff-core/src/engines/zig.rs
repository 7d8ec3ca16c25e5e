//! Zig source

use crate::engine::{Engine, EngineContext};
use crate::engines::TEXT_ENGINE_COST;
use crate::engines::language::{LanguageEngine, LanguageRules, any_group};

fn strong(text: &str) -> bool {
    any_group(
        text,
        &[&["pub fn main", "std.debug"], &["@import(\"std\")"]],
    )
}

pub const RULES: LanguageRules = LanguageRules {
    name: "zig",
    media_type: "text/x-zig",
    extension: "zig",
    cost: TEXT_ENGINE_COST,
    oracle_hint: None,
    interpreter: None,
    case_insensitive: false,
    strong,
    markers: &[
        "const std", "@import", "pub fn ", "comptime", "try ", "defer ", "!void", "[]const u8",
    ],
    min_hits: 2,
    structural: None,
};

pub fn factory(ctx: &EngineContext) -> Box<dyn Engine> {
    Box::new(LanguageEngine::new(RULES, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sniff(payload: &[u8]) -> Vec<crate::models::Candidate> {
        LanguageEngine::new(RULES, &EngineContext::offline())
            .sniff(payload)
            .unwrap()
    }

    #[test]
    fn test_hello_world() {
        let src = b"const std = @import(\"std\");\n\npub fn main() !void {\n    std.debug.print(\"hi\\n\", .{});\n}\n";
        let cands = sniff(src);
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].extension.as_deref(), Some("zig"));
        assert!(cands[0].signal("strong_marker").is_some());
    }

    #[test]
    fn test_rust_is_not_zig() {
        assert!(sniff(b"pub fn main() { println!(\"hi\"); }").is_empty());
    }
}
