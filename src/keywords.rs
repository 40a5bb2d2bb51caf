//! Keyword spelling configuration.
//!
//! The language has eight logical keywords whose surface spelling is not fixed.
//! A [`KeywordTable`] maps each of them to the text the lexer should recognize,
//! loaded once (usually from `config/keywords.json`) and handed to
//! [`Lexer::new`](crate::lexer::Lexer::new).

use crate::diagnostic::Diagnostic;
use crate::token::Token;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Location checked when no explicit keyword file is given.
pub const DEFAULT_KEYWORDS_PATH: &str = "config/keywords.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    If,
    Else,
    While,
    Fn,
    Return,
    Import,
    Then,
    End,
}

impl Keyword {
    pub const ALL: [Keyword; 8] = [
        Keyword::If,
        Keyword::Else,
        Keyword::While,
        Keyword::Fn,
        Keyword::Return,
        Keyword::Import,
        Keyword::Then,
        Keyword::End,
    ];

    /// The key used for this keyword in the configuration file.
    pub fn name(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::Fn => "fn",
            Keyword::Return => "return",
            Keyword::Import => "import",
            Keyword::Then => "then",
            Keyword::End => "end",
        }
    }

    pub fn token(self) -> Token {
        match self {
            Keyword::If => Token::If,
            Keyword::Else => Token::Else,
            Keyword::While => Token::While,
            Keyword::Fn => Token::Fn,
            Keyword::Return => Token::Return,
            Keyword::Import => Token::Import,
            Keyword::Then => Token::Then,
            Keyword::End => Token::End,
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read keyword configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid keyword configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("keyword configuration is missing `{0}`")]
    MissingKeyword(Keyword),
    #[error("keyword `{0}` has an empty spelling")]
    EmptySpelling(Keyword),
    #[error("keywords `{first}` and `{second}` share the spelling `{spelling}`")]
    DuplicateSpelling {
        spelling: String,
        first: Keyword,
        second: Keyword,
    },
}

impl ConfigError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            Self::Io { .. } => "E0301",
            Self::Json(_) => "E0302",
            Self::MissingKeyword(_) => "E0303",
            Self::EmptySpelling(_) => "E0304",
            Self::DuplicateSpelling { .. } => "E0305",
        };
        let diagnostic = Diagnostic::error(self.to_string()).with_code(code);
        match self {
            Self::MissingKeyword(_) | Self::EmptySpelling(_) | Self::DuplicateSpelling { .. } => diagnostic
                .with_help("every one of if, else, while, fn, return, import, then, end needs its own spelling"),
            _ => diagnostic,
        }
    }
}

/// Immutable mapping from logical keyword to surface spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    spellings: IndexMap<Keyword, String>,
}

impl KeywordTable {
    /// Builds a table from a name -> spelling map. Every keyword in
    /// [`Keyword::ALL`] must be present; unknown keys are ignored.
    pub fn from_map(map: &IndexMap<String, String>) -> Result<Self, ConfigError> {
        let mut spellings = IndexMap::with_capacity(Keyword::ALL.len());

        for keyword in Keyword::ALL {
            let spelling = map
                .get(keyword.name())
                .ok_or(ConfigError::MissingKeyword(keyword))?;
            if spelling.is_empty() {
                return Err(ConfigError::EmptySpelling(keyword));
            }
            if let Some((&first, _)) = spellings.iter().find(|(_, s)| *s == spelling) {
                return Err(ConfigError::DuplicateSpelling {
                    spelling: spelling.clone(),
                    first,
                    second: keyword,
                });
            }
            spellings.insert(keyword, spelling.clone());
        }

        for key in map.keys() {
            if !Keyword::ALL.iter().any(|k| k.name() == key) {
                tracing::debug!(key = %key, "ignoring unknown keyword configuration entry");
            }
        }

        Ok(Self { spellings })
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let map: IndexMap<String, String> = serde_json::from_str(text)?;
        Self::from_map(&map)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded keyword configuration");
        Self::from_json(&text)
    }

    /// Loads the explicit file if given, otherwise [`DEFAULT_KEYWORDS_PATH`]
    /// when it exists, otherwise the built-in spellings.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = Path::new(DEFAULT_KEYWORDS_PATH);
        if default_path.is_file() {
            Self::load(default_path)
        } else {
            tracing::debug!("no keyword configuration found, using built-in spellings");
            Ok(Self::default())
        }
    }

    pub fn spelling(&self, keyword: Keyword) -> &str {
        self.spellings
            .get(&keyword)
            .map(String::as_str)
            .unwrap_or_else(|| keyword.name())
    }

    /// Finds the keyword spelled exactly `word`, if any.
    pub fn lookup(&self, word: &str) -> Option<Keyword> {
        self.spellings
            .iter()
            .find(|(_, spelling)| spelling.as_str() == word)
            .map(|(&keyword, _)| keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Keyword, &str)> {
        self.spellings.iter().map(|(&k, s)| (k, s.as_str()))
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        let spellings = Keyword::ALL
            .iter()
            .map(|&k| (k, k.name().to_string()))
            .collect();
        Self { spellings }
    }
}
