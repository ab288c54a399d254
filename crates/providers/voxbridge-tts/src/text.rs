//! Text preparation for synthesis
//!
//! Chat text is full of markup, emoji and network slang that TTS engines
//! either choke on or read out loud verbatim. These helpers strip the
//! former, rewrite the latter into speakable words, and guess the dominant
//! language so reference-conditioned backends get a usable language hint.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Network slang rewritten into speakable text, applied in order
const SLANG_REPLACEMENTS: &[(&str, &str)] = &[
    ("www", "哈哈哈"),
    ("hhh", "哈哈"),
    ("233", "哈哈"),
    ("666", "厉害"),
    ("88", "拜拜"),
    ("...", "。"),
];

fn unsupported_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"[^\u{4e00}-\u{9fff}\u{3040}-\u{309f}\u{30a0}-\u{30ff}a-zA-Z0-9\s，。！？、；：（）【】“”‘’"'.,!?;:()\[\]`-]"#,
        )
        .expect("invalid unsupported-chars pattern")
    })
}

fn chinese_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("invalid chinese pattern"))
}

fn english_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z]").expect("invalid english pattern"))
}

fn japanese_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\u{3040}-\u{309f}\u{30a0}-\u{30ff}]").expect("invalid japanese pattern")
    })
}

/// Strip unsupported characters and rewrite network slang
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = unsupported_chars().replace_all(text, "").into_owned();
    for (slang, spoken) in SLANG_REPLACEMENTS {
        cleaned = cleaned.replace(slang, spoken);
    }
    cleaned.trim().to_string()
}

/// Detect the dominant language of a text: "zh", "ja" or "en"
///
/// Ratio heuristic over CJK/kana/Latin character counts. Mixed or
/// unrecognizable text defaults to Chinese.
pub fn detect_language(text: &str) -> &'static str {
    if text.is_empty() {
        return "zh";
    }

    let chinese = chinese_chars().find_iter(text).count();
    let english = english_chars().find_iter(text).count();
    let japanese = japanese_chars().find_iter(text).count();
    let total = chinese + english + japanese;
    if total == 0 {
        return "zh";
    }

    let total = total as f64;
    if chinese as f64 / total > 0.3 {
        "zh"
    } else if japanese as f64 / total > 0.3 {
        "ja"
    } else if english as f64 / total > 0.8 {
        "en"
    } else {
        "zh"
    }
}

/// Resolve a voice alias against an alias table
///
/// Ids already carrying `prefix` pass through untouched. Otherwise the alias
/// table is consulted for the requested name, then for the default name.
/// Returns `None` when neither resolves.
pub fn resolve_voice_alias(
    voice: Option<&str>,
    alias_map: &HashMap<String, String>,
    default: &str,
    prefix: &str,
) -> Option<String> {
    let name = voice.unwrap_or(default);

    if !prefix.is_empty() && name.starts_with(prefix) {
        return Some(name.to_string());
    }
    if let Some(id) = alias_map.get(name) {
        return Some(id.clone());
    }
    alias_map.get(default).cloned()
}
