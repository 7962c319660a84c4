//! English pluralization for convention-derived names.
//!
//! Only the trailing word of an identifier is inflected, so `CategoryPerson`
//! becomes `CategoryPeople` and `AuthorId` becomes `AuthorIds`. Words are
//! split on `_`, `-`, spaces and lower-to-upper case transitions; runs of
//! capitals such as `ID` are treated as a single word.

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
    ("criterion", "criteria"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("quiz", "quizzes"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "deer",
    "news",
    "data",
    "metadata",
];

/// Pluralize the trailing word of `name`.
pub fn pluralize(name: &str) -> String {
    let (head, word) = split_last_word(name);
    format!("{}{}", head, pluralize_word(word))
}

/// Singularize the trailing word of `name`.
pub fn singularize(name: &str) -> String {
    let (head, word) = split_last_word(name);
    format!("{}{}", head, singularize_word(word))
}

fn split_last_word(name: &str) -> (&str, &str) {
    let mut start = 0;
    let mut prev_upper = false;
    for (idx, c) in name.char_indices() {
        if matches!(c, '_' | '-' | ' ') {
            start = idx + c.len_utf8();
            prev_upper = false;
            continue;
        }
        let upper = c.is_uppercase();
        if upper && !prev_upper {
            start = idx;
        }
        prev_upper = upper;
    }
    name.split_at(start)
}

fn is_consonant(c: u8) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, b'a' | b'e' | b'i' | b'o' | b'u')
}

fn match_case(original: &str, replacement: &str) -> String {
    let mut chars = replacement.chars();
    match (original.chars().next(), chars.next()) {
        (Some(first), Some(head)) if first.is_uppercase() => {
            head.to_uppercase().chain(chars).collect()
        }
        _ => replacement.to_string(),
    }
}

fn is_acronym(word: &str) -> bool {
    word.chars().count() > 1 && word.chars().all(|c| !c.is_lowercase())
}

fn pluralize_word(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    if is_acronym(word) {
        return format!("{}s", word);
    }

    let lower = word.to_ascii_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *singular {
            return match_case(word, plural);
        }
        if lower == *plural {
            return word.to_string();
        }
    }

    let bytes = lower.as_bytes();
    let len = bytes.len();
    if len > 1 && bytes[len - 1] == b'y' && is_consonant(bytes[len - 2]) {
        return format!("{}ies", &word[..len - 1]);
    }
    if lower.ends_with("sis") {
        return format!("{}es", &word[..len - 2]);
    }
    if lower.ends_with("ss") || lower.ends_with("us") {
        return format!("{}es", word);
    }
    if lower.ends_with('s') {
        return word.to_string();
    }
    if lower.ends_with("sh") || lower.ends_with("ch") || lower.ends_with('x') || lower.ends_with('z')
    {
        return format!("{}es", word);
    }
    format!("{}s", word)
}

fn singularize_word(word: &str) -> String {
    if word.is_empty() || is_acronym(word) {
        return word.to_string();
    }

    let lower = word.to_ascii_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR {
        if lower == *plural {
            return match_case(word, singular);
        }
        if lower == *singular {
            return word.to_string();
        }
    }

    let len = lower.len();
    if lower.ends_with("ies") && len > 3 {
        return format!("{}y", &word[..len - 3]);
    }
    if lower.ends_with("sses")
        || lower.ends_with("uses")
        || lower.ends_with("ches")
        || lower.ends_with("shes")
        || lower.ends_with("xes")
        || lower.ends_with("zes")
    {
        return word[..len - 2].to_string();
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return word.to_string();
    }
    if lower.ends_with('s') && len > 1 {
        return word[..len - 1].to_string();
    }
    word.to_string()
}
