//! Code samples and their lifecycle ordering
//!
//! A sample is one documentation snippet tied to a resource path, an HTTP
//! method and a language. Samples come from [`scan_samples`] and are put
//! into lifecycle order by [`order_samples`].

mod order;
mod scanner;

pub use order::order_samples;
pub use scanner::{resource_path_from_dirs, scan_samples, ScanOptions};

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::common::Error;

/// HTTP method of a sample, taken from its parent directory name
///
/// The declaration order is the lifecycle order used for slots in a
/// resource node: create, read, update, delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Post,
    Get,
    Put,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 4] = [
        HttpMethod::Post,
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Post => "POST",
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "POST" => Ok(HttpMethod::Post),
            "GET" => Ok(HttpMethod::Get),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("Unknown HTTP method: {}", other)),
        }
    }
}

/// Language a sample is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Language {
    #[value(name = "js")]
    JavaScript,
    #[value(name = "python")]
    Python,
    #[value(name = "shell")]
    Shell,
}

impl Language {
    /// Fixed order in which language groups run
    pub const ALL: [Language; 3] = [Language::JavaScript, Language::Python, Language::Shell];

    /// Detect the language from a sample file name
    ///
    /// Shell samples are either `*.sh` files or files named like `curl`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".js") {
            Some(Language::JavaScript)
        } else if name.ends_with(".py") {
            Some(Language::Python)
        } else if name.ends_with(".sh") || name.ends_with("curl") {
            Some(Language::Shell)
        } else {
            None
        }
    }

    /// Short identifier, as accepted by `--lang`
    pub fn id(&self) -> &'static str {
        match self {
            Language::JavaScript => "js",
            Language::Python => "python",
            Language::Shell => "shell",
        }
    }

    /// Display name used in reports
    pub fn display_name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Shell => "cURL",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One documentation code sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Location of the sample source file
    pub path: PathBuf,
    /// Logical resource path, e.g. `api/users/{id}`
    pub name: String,
    pub method: HttpMethod,
    pub language: Language,
}

impl Sample {
    /// Resource path split into its non-empty segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.name.split('/').filter(|s| !s.is_empty())
    }

    /// Read the raw sample source
    pub fn source(&self) -> crate::common::Result<String> {
        std::fs::read_to_string(&self.path).map_err(|e| Error::file_read(&self.path, &e))
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.language, self.method, self.name)
    }
}
