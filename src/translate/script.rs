use zhconv::{zhconv, Variant};

/// True when `text` has a character from the CJK Unified Ideographs block
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c))
}

/// Convert traditional Chinese to mainland simplified Chinese
pub fn to_simplified(text: &str) -> String {
    zhconv(text, Variant::ZhCN)
}
