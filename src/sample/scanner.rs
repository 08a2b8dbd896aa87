//! Sample discovery
//!
//! Samples follow the layout `root/<segment>/.../<METHOD>/<sample file>`.
//! The method comes from the parent directory, the resource path from the
//! directories above it.

use std::path::{Component, Path};
use tracing::debug;
use walkdir::WalkDir;

use super::{HttpMethod, Language, Sample};
use crate::common::{Error, Result};

/// Options narrowing down which samples are scanned
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Only keep samples in these languages (all when `None`)
    pub languages: Option<Vec<Language>>,
    /// Only keep samples whose resource path contains this text
    pub keyword: Option<String>,
    /// Directories with this suffix are dropped from resource paths
    pub spec_dir_suffix: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            languages: None,
            keyword: None,
            spec_dir_suffix: "_spec".to_string(),
        }
    }
}

/// Walk `root` and turn every recognised sample file into a [`Sample`]
///
/// Files are visited sorted by name, so the result is deterministic, but
/// no lifecycle order is applied here; see [`super::order_samples`].
pub fn scan_samples(root: &Path, opts: &ScanOptions) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(language) = Language::from_path(path) else {
            continue;
        };
        if let Some(languages) = &opts.languages {
            if !languages.contains(&language) {
                continue;
            }
        }

        let sample = sample_from_path(root, path, language, &opts.spec_dir_suffix)?;
        if let Some(keyword) = &opts.keyword {
            if !sample.name.contains(keyword.as_str()) {
                continue;
            }
        }

        debug!(path = %path.display(), name = %sample.name, method = %sample.method, "found sample");
        samples.push(sample);
    }

    Ok(samples)
}

fn sample_from_path(root: &Path, path: &Path, language: Language, suffix: &str) -> Result<Sample> {
    let method_dir = path.parent().unwrap_or(root);
    let dir_name = method_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let method = dir_name
        .parse::<HttpMethod>()
        .map_err(|_| Error::InvalidMethodDir {
            path: path.display().to_string(),
            dir: dir_name.to_string(),
        })?;

    let resource_dir = method_dir.parent().unwrap_or(root);
    let relative = resource_dir.strip_prefix(root).unwrap_or(Path::new(""));
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    Ok(Sample {
        path: path.to_path_buf(),
        name: resource_path_from_dirs(&segments, suffix),
        method,
        language,
    })
}

/// Build a logical resource path from directory names
///
/// Underscores inside a directory name separate path segments, except
/// inside `{...}` placeholders where they are kept. Directories ending with
/// `suffix` only hold documentation specs and are dropped.
pub fn resource_path_from_dirs<S: AsRef<str>>(dirs: &[S], suffix: &str) -> String {
    dirs.iter()
        .map(AsRef::as_ref)
        .filter(|dir| suffix.is_empty() || !dir.ends_with(suffix))
        .map(expand_underscores)
        .collect::<Vec<_>>()
        .join("/")
}

fn expand_underscores(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut depth = 0usize;
    for ch in segment.chars() {
        match ch {
            '{' => {
                depth += 1;
                out.push(ch);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                out.push(ch);
            }
            '_' if depth == 0 => out.push('/'),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch_all(root: &Path, rel_paths: &[&str]) {
        for rel in rel_paths {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
    }

    #[test]
    fn test_base_loading() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(
            dir.path(),
            &["api/POST/sample.js", "api/POST/sample.py", "api/POST/curl", "api/POST/trash"],
        );

        let samples = scan_samples(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(samples.len(), 3);
        for sample in &samples {
            assert_eq!(sample.name, "api");
            assert_eq!(sample.method, HttpMethod::Post);
        }
        let languages: Vec<Language> = samples.iter().map(|s| s.language).collect();
        assert!(languages.contains(&Language::JavaScript));
        assert!(languages.contains(&Language::Python));
        assert!(languages.contains(&Language::Shell));
    }

    #[test]
    fn test_http_methods_parsing() {
        for (dir_name, expected) in [
            ("POST", HttpMethod::Post),
            ("GET", HttpMethod::Get),
            ("DELETE", HttpMethod::Delete),
            ("put", HttpMethod::Put),
        ] {
            let dir = tempfile::tempdir().unwrap();
            touch_all(dir.path(), &[&format!("api/{}/sample.js", dir_name)]);
            let samples = scan_samples(dir.path(), &ScanOptions::default()).unwrap();
            assert_eq!(samples[0].method, expected);
        }
    }

    #[test]
    fn test_invalid_method_dir_fails_scan() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(dir.path(), &["api/PATCH/curl"]);
        let result = scan_samples(dir.path(), &ScanOptions::default());
        assert!(matches!(result, Err(Error::InvalidMethodDir { dir, .. }) if dir == "PATCH"));
    }

    #[test]
    fn test_underscores_expand_outside_placeholders() {
        assert_eq!(
            resource_path_from_dirs(&["users_{user_id}_friends"], "_spec"),
            "users/{user_id}/friends"
        );
        assert_eq!(resource_path_from_dirs(&["api", "{a_b}"], "_spec"), "api/{a_b}");
    }

    #[test]
    fn test_spec_dirs_dropped() {
        assert_eq!(
            resource_path_from_dirs(&["docs_spec", "products", "{id}"], "_spec"),
            "products/{id}"
        );
    }

    #[test]
    fn test_nested_resource_path() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(dir.path(), &["api/users_{id}/link/GET/curl"]);
        let samples = scan_samples(dir.path(), &ScanOptions::default()).unwrap();
        assert_eq!(samples[0].name, "api/users/{id}/link");
    }

    #[test]
    fn test_language_and_keyword_filters() {
        let dir = tempfile::tempdir().unwrap();
        touch_all(
            dir.path(),
            &["api/users/POST/curl", "api/users/POST/sample.py", "api/orders/POST/curl"],
        );
        let opts = ScanOptions {
            languages: Some(vec![Language::Shell]),
            keyword: Some("users".to_string()),
            ..ScanOptions::default()
        };
        let samples = scan_samples(dir.path(), &opts).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "api/users");
        assert_eq!(samples[0].language, Language::Shell);
    }
}
