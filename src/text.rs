//! Small string helpers for labels shown next to cached data.

/// Capitalises the first letter of every space-separated word and lowercases
/// the rest: `"main courses"` becomes `"Main Courses"`.
pub fn to_word_case(text: &str) -> String {
    text.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Upper-cased first letters of both names, for avatar placeholders.
pub fn name_initials(first_name: &str, last_name: &str) -> String {
    first_name
        .chars()
        .next()
        .into_iter()
        .chain(last_name.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_case() {
        assert_eq!(to_word_case("starters"), "Starters");
        assert_eq!(to_word_case("MAIN courses"), "Main Courses");
        assert_eq!(to_word_case("a  b"), "A  B");
        assert_eq!(to_word_case(""), "");
    }

    #[test]
    fn initials() {
        assert_eq!(name_initials("tilly", "doe"), "TD");
        assert_eq!(name_initials("Tilly", ""), "T");
        assert_eq!(name_initials("", ""), "");
        assert_eq!(name_initials("émile", "zola"), "ÉZ");
    }
}
