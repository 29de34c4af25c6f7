//! Documentation text
//!
//! Splits free-form doc text into its description and `@param name text`
//! entries. Other `@` tags are dropped.

use indexmap::IndexMap;

/// Parsed documentation of one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocText {
    pub description: Option<String>,
    pub params: IndexMap<String, String>,
}

impl DocText {
    pub fn parse(text: &str) -> Self {
        let mut description = Vec::new();
        let mut params: IndexMap<String, String> = IndexMap::new();
        let mut current_param: Option<String> = None;
        let mut in_other_tag = false;

        for line in text.lines() {
            let line = line.trim().trim_start_matches('*').trim();
            if let Some(rest) = line.strip_prefix("@param") {
                let mut parts = rest.trim().splitn(2, char::is_whitespace);
                let name = parts.next().unwrap_or("").to_string();
                let body = parts.next().unwrap_or("").trim().to_string();
                if !name.is_empty() {
                    params.insert(name.clone(), body);
                    current_param = Some(name);
                }
                in_other_tag = false;
            } else if line.starts_with('@') {
                current_param = None;
                in_other_tag = true;
            } else if let Some(name) = &current_param {
                if !line.is_empty() {
                    if let Some(body) = params.get_mut(name) {
                        if !body.is_empty() {
                            body.push(' ');
                        }
                        body.push_str(line);
                    }
                }
            } else if !in_other_tag {
                description.push(line);
            }
        }

        let description = description.join("\n").trim().to_string();
        Self {
            description: (!description.is_empty()).then_some(description),
            params,
        }
    }

    /// Parse optional doc text
    pub fn from_option(text: Option<&str>) -> Option<Self> {
        text.map(Self::parse)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}
