//! Canned media and prompt tables keyed by language code.
//!
//! These stand in for a real generative-media backend. Lookups are
//! deterministic and fall back to the [`FALLBACK_LANGUAGE`] entry for any
//! code not in the table.

/// Language whose entries are used when a lookup key is absent.
pub const FALLBACK_LANGUAGE: &str = "en";

const MEDIA_BASE_URL: &str = "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample";

/// `(code, media file)` pairs, resolved against [`MEDIA_BASE_URL`].
const MEDIA_FILES: &[(&str, &str)] = &[
    ("zh-TW", "ForBiggerBlazes.mp4"),
    ("en", "ForBiggerEscapes.mp4"),
    ("ja", "ForBiggerFun.mp4"),
    ("th", "ForBiggerJoyrides.mp4"),
];

const DEFAULT_PROMPTS: &[(&str, &str)] = &[
    (
        "zh-TW",
        "Create a promotional GFX card for Hell's Paradise Season 2 in Traditional Chinese. \
         Include the title \"地獄樂\" prominently with \"Season 2\" subtitle. Use dramatic dark \
         fantasy aesthetic with red and black color scheme.",
    ),
    (
        "en",
        "Create a promotional GFX card for Hell's Paradise: Jigokuraku Season 2 in English. \
         Feature the main title prominently with Season 2 designation. Use dramatic dark \
         fantasy aesthetic with red and black color scheme.",
    ),
    (
        "ja",
        "Create a promotional GFX card for Hell's Paradise Season 2 in Japanese. Include the \
         title \"地獄楽\" prominently with \"Season 2\" subtitle. Use dramatic dark fantasy \
         aesthetic with red and black color scheme.",
    ),
    (
        "th",
        "Create a promotional GFX card for Hell's Paradise Season 2 in Thai. Include the title \
         in Thai script prominently with \"Season 2\" subtitle. Use dramatic dark fantasy \
         aesthetic with red and black color scheme.",
    ),
];

fn lookup(table: &'static [(&'static str, &'static str)], code: &str) -> &'static str {
    let find = |key: &str| table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v);
    find(code)
        .or_else(|| find(FALLBACK_LANGUAGE))
        .unwrap_or_default()
}

/// Media URL for a language, falling back to the English clip.
pub fn media_url_for(code: &str) -> String {
    format!("{MEDIA_BASE_URL}/{}", lookup(MEDIA_FILES, code))
}

/// Default generation prompt for a language, falling back to English.
pub fn default_prompt_for(code: &str) -> &'static str {
    lookup(DEFAULT_PROMPTS, code)
}

/// Whether the catalog has a dedicated entry for `code`.
pub fn has_entry(code: &str) -> bool {
    MEDIA_FILES.iter().any(|(k, _)| *k == code)
}
