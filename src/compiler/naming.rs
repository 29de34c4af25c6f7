//! Property naming strategies
//!
//! A class-level `naming` directive renames every property that has no
//! explicit name. Strategy names are accepted in any of the usual spellings:
//! `SNAKE_CASE`, `snake_case`, `SnakeCaseStrategy` or a qualified
//! `...PropertyNamingStrategies$SnakeCaseStrategy`.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyNaming {
    SnakeCase,
    UpperSnakeCase,
    LowerCamelCase,
    UpperCamelCase,
    LowerCase,
    KebabCase,
    LowerDotCase,
}

impl PropertyNaming {
    pub fn translate(&self, name: &str) -> String {
        match self {
            Self::SnakeCase => separated(name.trim_start_matches('_'), '_'),
            Self::UpperSnakeCase => separated(name.trim_start_matches('_'), '_').to_uppercase(),
            Self::LowerCamelCase => with_first(name, |c| c.to_ascii_lowercase()),
            Self::UpperCamelCase => with_first(name, |c| c.to_ascii_uppercase()),
            Self::LowerCase => name.to_lowercase(),
            Self::KebabCase => separated(name, '-'),
            Self::LowerDotCase => separated(name, '.'),
        }
    }
}

impl FromStr for PropertyNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let last = s.rsplit(|c: char| c == '.' || c == '$').next().unwrap_or(s);
        let key: String = last
            .strip_suffix("Strategy")
            .unwrap_or(last)
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "snakecase" => Ok(Self::SnakeCase),
            "uppersnakecase" => Ok(Self::UpperSnakeCase),
            "lowercamelcase" => Ok(Self::LowerCamelCase),
            "uppercamelcase" => Ok(Self::UpperCamelCase),
            "lowercase" => Ok(Self::LowerCase),
            "kebabcase" => Ok(Self::KebabCase),
            "lowerdotcase" => Ok(Self::LowerDotCase),
            _ => Err(format!("unknown naming strategy '{}'", s)),
        }
    }
}

/// Lower-case the name, inserting `separator` before each run of capitals
fn separated(name: &str, separator: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_translated = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if !prev_translated && !out.is_empty() && !out.ends_with(separator) {
                out.push(separator);
            }
            out.extend(c.to_lowercase());
            prev_translated = true;
        } else {
            out.push(c);
            prev_translated = false;
        }
    }
    out
}

fn with_first(name: &str, f: impl Fn(char) -> char) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => f(first).to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_spellings() {
        for spelling in [
            "SNAKE_CASE",
            "snake_case",
            "SnakeCaseStrategy",
            "com.fasterxml.jackson.databind.PropertyNamingStrategies$SnakeCaseStrategy",
        ] {
            assert_eq!(spelling.parse::<PropertyNaming>(), Ok(PropertyNaming::SnakeCase));
        }
        assert_eq!("KEBAB_CASE".parse::<PropertyNaming>(), Ok(PropertyNaming::KebabCase));
        assert!("shouting".parse::<PropertyNaming>().is_err());
    }

    #[test]
    fn test_translations() {
        assert_eq!(PropertyNaming::SnakeCase.translate("createdAt"), "created_at");
        assert_eq!(PropertyNaming::SnakeCase.translate("userID"), "user_id");
        assert_eq!(PropertyNaming::UpperSnakeCase.translate("createdAt"), "CREATED_AT");
        assert_eq!(PropertyNaming::KebabCase.translate("createdAt"), "created-at");
        assert_eq!(PropertyNaming::LowerDotCase.translate("createdAt"), "created.at");
        assert_eq!(PropertyNaming::UpperCamelCase.translate("createdAt"), "CreatedAt");
        assert_eq!(PropertyNaming::LowerCamelCase.translate("CreatedAt"), "createdAt");
        assert_eq!(PropertyNaming::LowerCase.translate("createdAt"), "createdat");
    }
}
