use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Collapse a display name into the canonical form used for matching:
/// lowercase, accents stripped via NFD, "ß" expanded to "ss", anything
/// outside `[a-z0-9 ]` turned into a space, whitespace runs collapsed.
///
/// The same function covers stored names and typed queries, so a query
/// matches exactly when it is a substring of a stored key. Idempotent: the
/// output only contains characters the function maps to themselves.
pub fn search_key(raw: &str) -> String {
    let mut stripped = String::with_capacity(raw.len());
    for ch in raw.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        match ch {
            'ß' => stripped.push_str("ss"),
            'a'..='z' | '0'..='9' => stripped.push(ch),
            _ => stripped.push(' '),
        }
    }

    let mut key = String::with_capacity(stripped.len());
    for word in stripped.split_whitespace() {
        if !key.is_empty() {
            key.push(' ');
        }
        key.push_str(word);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_accents_and_case() {
        assert_eq!(search_key("José"), "jose");
        assert_eq!(search_key("JOSÉ"), "jose");
        assert_eq!(search_key("jose"), "jose");
        assert_eq!(search_key("Conceição"), "conceicao");
        assert_eq!(search_key("Müller"), "muller");
    }

    #[test]
    fn expands_sharp_s() {
        assert_eq!(search_key("Groß"), "gross");
    }

    #[test]
    fn symbols_become_single_spaces() {
        assert_eq!(search_key("Ana-Maria  d'Ávila"), "ana maria d avila");
        assert_eq!(search_key("  João   da Silva  "), "joao da silva");
        assert_eq!(search_key("***"), "");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(search_key("UMP 2024"), "ump 2024");
    }

    #[test]
    fn empty_input_yields_empty_key() {
        assert_eq!(search_key(""), "");
        assert_eq!(search_key("   "), "");
    }

    #[test]
    fn idempotent() {
        for sample in ["José da Silva", "GROSSE Straße", "  a  b  ", "Çétõrz!"] {
            let once = search_key(sample);
            assert_eq!(search_key(&once), once);
        }
    }
}
