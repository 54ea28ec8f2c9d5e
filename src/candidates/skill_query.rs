// src/candidates/skill_query.rs
//! Skill filter expressions
//!
//! A query is a disjunction of conjunctions: `(a AND b) OR (c)`. Terms match
//! case-insensitively as substrings of the serialized skills list, so `ruby`
//! matches `"Ruby on Rails"`.

use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::common::helpers::encode_string_list;

static RE_OR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+or\s+").unwrap());
static RE_AND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\s+and\s+").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkillQueryMode {
    /// `and` / `or` keywords, `and` binds tighter
    #[default]
    Boolean,
    /// Every comma-separated token is its own alternative
    Comma,
}

impl FromStr for SkillQueryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boolean" => Ok(SkillQueryMode::Boolean),
            "comma" => Ok(SkillQueryMode::Comma),
            other => Err(format!(
                "Invalid skill_mode '{}'. Must be 'boolean' or 'comma'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillQuery {
    groups: Vec<Vec<String>>,
}

impl SkillQuery {
    pub fn parse(input: &str, mode: SkillQueryMode) -> Self {
        match mode {
            SkillQueryMode::Boolean => Self::parse_boolean(input),
            SkillQueryMode::Comma => Self::parse_comma(input),
        }
    }

    pub fn parse_boolean(input: &str) -> Self {
        let groups = RE_OR
            .split(input)
            .map(|group| {
                RE_AND
                    .split(group)
                    .map(str::trim)
                    .filter(|term| !term.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|group| !group.is_empty())
            .collect();

        Self { groups }
    }

    pub fn parse_comma(input: &str) -> Self {
        let groups = input
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(|term| vec![term.to_string()])
            .collect();

        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// No groups means no filtering
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Boolean-mode text that parses back to the same groups
    pub fn canonical(&self) -> String {
        self.groups
            .iter()
            .map(|group| group.join(" and "))
            .collect::<Vec<_>>()
            .join(" or ")
    }

    pub fn matches(&self, skills: &[String]) -> bool {
        if self.is_empty() {
            return true;
        }

        let haystack = skills_search_text(skills);
        self.groups.iter().any(|group| {
            group
                .iter()
                .all(|term| haystack.contains(&term.to_lowercase()))
        })
    }

    /// `WHERE` fragment over `column` plus its LIKE patterns, in bind order
    ///
    /// `column` must already hold [`skills_search_text`]: SQLite `LOWER()`
    /// only folds ASCII, so folding happens in Rust on both sides.
    pub fn to_sql(&self, column: &str) -> Option<(String, Vec<String>)> {
        if self.is_empty() {
            return None;
        }

        let mut binds = Vec::new();
        let clauses: Vec<String> = self
            .groups
            .iter()
            .map(|group| {
                let terms: Vec<String> = group
                    .iter()
                    .map(|term| {
                        binds.push(format!("%{}%", escape_like(&term.to_lowercase())));
                        format!("{} LIKE ? ESCAPE '\\'", column)
                    })
                    .collect();
                format!("({})", terms.join(" AND "))
            })
            .collect();

        Some((format!("({})", clauses.join(" OR ")), binds))
    }
}

/// Lower-cased serialized skills, the text skill filters search
pub fn skills_search_text(skills: &[String]) -> String {
    encode_string_list(skills).to_lowercase()
}

/// Make `%`, `_` and `\` match literally
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
