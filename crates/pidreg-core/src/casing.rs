//! Key casing helpers shared by the document projection and facet titles.

/// `JournalArticle` -> `journal_article`.
pub(crate) fn underscore(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev_lower = false;
    for ch in raw.chars() {
        if ch.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
            prev_lower = false;
        } else if ch == ' ' || ch == '-' {
            out.push('_');
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

/// `journal_article` -> `journal-article`.
pub(crate) fn dasherize(raw: &str) -> String {
    raw.replace('_', "-")
}

/// `journal_article`, `JournalArticle` -> `Journal Article`.
pub(crate) fn titleize(raw: &str) -> String {
    underscore(raw)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `computer_and_information_sciences` -> `Computer and information sciences`.
pub(crate) fn humanize(raw: &str) -> String {
    let spaced = raw.trim().replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

/// `Earth and related sciences` -> `earth_and_related_sciences`.
pub(crate) fn parameterize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casing_helpers_cover_resource_type_and_fos_keys() {
        assert_eq!(underscore("JournalArticle"), "journal_article");
        assert_eq!(underscore("Dataset"), "dataset");
        assert_eq!(dasherize("journal_article"), "journal-article");
        assert_eq!(titleize("journal_article"), "Journal Article");
        assert_eq!(titleize("findable"), "Findable");
        assert_eq!(
            parameterize("Earth and related environmental sciences"),
            "earth_and_related_environmental_sciences"
        );
        assert_eq!(
            humanize("computer_and_information_sciences"),
            "Computer and information sciences"
        );
        assert_eq!(parameterize("Arts (arts, history)"), "arts_arts_history");
    }
}
