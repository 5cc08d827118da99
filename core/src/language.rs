//! Supported languages and their interpreters.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A language the sandbox knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    Python,
    Shell,
}

/// Lookup row: (language, tag / file extension, interpreter binary).
struct LanguageEntry {
    language: Language,
    extension: &'static str,
    interpreter: &'static str,
}

const LANGUAGES: &[LanguageEntry] = &[
    LanguageEntry {
        language: Language::JavaScript,
        extension: "js",
        interpreter: "node",
    },
    LanguageEntry {
        language: Language::Python,
        extension: "py",
        interpreter: "python3",
    },
    LanguageEntry {
        language: Language::Shell,
        extension: "sh",
        interpreter: "bash",
    },
];

impl Language {
    /// All supported languages, in table order.
    pub fn all() -> impl Iterator<Item = Language> {
        LANGUAGES.iter().map(|entry| entry.language)
    }

    // Table rows are in declaration order, so the discriminant is the index.
    fn entry(self) -> &'static LanguageEntry {
        &LANGUAGES[self as usize]
    }

    /// Parses a user-supplied tag (`js`, `py`, `sh`). Tags are case-sensitive.
    pub fn from_tag(tag: &str) -> Result<Self> {
        LANGUAGES
            .iter()
            .find(|entry| entry.extension == tag)
            .map(|entry| entry.language)
            .ok_or_else(|| Error::UnsupportedLanguage(tag.to_string()))
    }

    /// Determines the language of a file from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_tag(ext).map_err(|_| Error::UnsupportedLanguage(path.display().to_string()))
    }

    /// The tag, which doubles as the file extension.
    pub fn tag(self) -> &'static str {
        self.entry().extension
    }

    /// The interpreter binary invoked with the script path as its only argument.
    pub fn interpreter(self) -> &'static str {
        self.entry().interpreter
    }

    /// File name used to persist accepted single-file output (`code.<ext>`).
    pub fn output_filename(self) -> String {
        format!("code.{}", self.tag())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}
