//! Test and feature file discovery
//!
//! Expands the user's inputs (files, directories or glob patterns) into a sorted,
//! duplicate-free list of files the active template can run. Missing inputs,
//! unsupported files and unreadable directories are warned about and skipped.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::types::TemplateKind;

/// Directory and file names never descended into or collected
pub const EXCLUDE_PATTERNS: &[&str] = &["node_modules", ".git", ".DS_Store", "coverage", "screenshots", "reports"];

pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Options for a discovery pass
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Directory levels to descend below each input directory
    pub max_depth: usize,
    /// Log the final file list
    pub verbose: bool,
    /// Directory relative inputs are resolved against; the process cwd when unset
    pub base_dir: Option<PathBuf>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            verbose: false,
            base_dir: None,
        }
    }
}

/// Expand `inputs` into runnable files for `template`
pub fn discover<P: AsRef<Path>>(inputs: &[P], template: TemplateKind, options: &DiscoveryOptions) -> Vec<PathBuf> {
    info!("🔍 Processing input for template: {}", template);

    let extensions = template.extensions();
    let mut files = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        // Only the user's own text can carry wildcards, never the base directory
        if is_glob(input) {
            for matched in expand_glob(&glob_pattern(input, options.base_dir.as_deref())) {
                files.extend(discover_single(&matched, extensions, options));
            }
        } else {
            let resolved = match &options.base_dir {
                Some(base) if input.is_relative() => base.join(input),
                _ => input.to_path_buf(),
            };
            files.extend(discover_single(&resolved, extensions, options));
        }
    }

    let mut files: Vec<PathBuf> = files.iter().map(|p| normalize(p)).collect();
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    files.dedup();

    info!("✓ Found {} file(s) to process", files.len());
    if options.verbose && !files.is_empty() {
        let listing: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
        info!("Files: {}", listing.join(", "));
    }

    files
}

fn discover_single(input: &Path, extensions: &[&str], options: &DiscoveryOptions) -> Vec<PathBuf> {
    let metadata = match std::fs::metadata(input) {
        Ok(metadata) => metadata,
        Err(_) => {
            warn!("Input not found: {}", input.display());
            return Vec::new();
        }
    };

    if metadata.is_file() {
        if has_extension(input, extensions) {
            vec![input.to_path_buf()]
        } else {
            warn!("Unsupported file type: {}", input.display());
            Vec::new()
        }
    } else if metadata.is_dir() {
        scan_directory(input, extensions, options.max_depth)
    } else {
        warn!("Unknown input type: {}", input.display());
        Vec::new()
    }
}

/// Recursively collect matching files, at most `max_depth` levels down
fn scan_directory(dir: &Path, extensions: &[&str], max_depth: usize) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .follow_links(true)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_exclude(&entry.file_name().to_string_lossy()));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_file() => {
                if has_extension(entry.path(), extensions) {
                    files.push(entry.into_path());
                }
            }
            Ok(_) => {}
            Err(e) => {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_else(|| dir.display().to_string());
                warn!("Could not scan directory {}: {}", path, e);
            }
        }
    }

    files
}

/// Plain names match exactly; dotted names also match as a prefix
pub fn should_exclude(name: &str) -> bool {
    EXCLUDE_PATTERNS.iter().any(|pattern| {
        if pattern.starts_with('.') {
            name.starts_with(pattern)
        } else {
            name == *pattern
        }
    })
}

/// Case-insensitive extension check against `.ext` entries
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .map(|ext| extensions.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn is_glob(input: &Path) -> bool {
    input.to_string_lossy().contains(&['*', '?', '['][..])
}

/// Anchor a relative pattern under `base`, with the base's own metacharacters escaped
fn glob_pattern(input: &Path, base: Option<&Path>) -> PathBuf {
    match base {
        Some(base) if input.is_relative() => {
            PathBuf::from(glob::Pattern::escape(&base.to_string_lossy())).join(input)
        }
        _ => input.to_path_buf(),
    }
}

fn expand_glob(pattern: &Path) -> Vec<PathBuf> {
    let pattern = pattern.to_string_lossy();
    let paths = match glob::glob(&pattern) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("Invalid pattern {}: {}", pattern, e);
            return Vec::new();
        }
    };

    let matches: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Could not read {}: {}", e.path().display(), e);
                None
            }
        })
        .collect();

    if matches.is_empty() {
        warn!("Pattern matched nothing: {}", pattern);
    } else {
        debug!("Pattern {} matched {} path(s)", pattern, matches.len());
    }
    matches
}

/// Drop `.` components so `./tests/a.js` and `tests/a.js` compare equal
fn normalize(path: &Path) -> PathBuf {
    let normalized: PathBuf = path.components().filter(|c| !matches!(c, Component::CurDir)).collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Re-check of a discovered file set
#[derive(Debug, Clone, Default)]
pub struct FileValidation {
    pub valid: Vec<PathBuf>,
    pub invalid: Vec<PathBuf>,
    pub total: usize,
}

/// Split `files` into those that are still regular files and those that are not
pub fn validate_files(files: &[PathBuf]) -> FileValidation {
    let mut validation = FileValidation {
        total: files.len(),
        ..Default::default()
    };

    for file in files {
        if file.is_file() {
            validation.valid.push(file.clone());
        } else {
            validation.invalid.push(file.clone());
        }
    }

    validation
}

/// Size statistics over a file set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileStats {
    pub total: usize,
    pub by_extension: BTreeMap<String, usize>,
    pub total_size: u64,
    pub average_size: u64,
}

pub fn file_stats(files: &[PathBuf]) -> FileStats {
    let mut stats = FileStats {
        total: files.len(),
        ..Default::default()
    };

    for file in files {
        // Unreadable files still count toward the total
        let Ok(metadata) = std::fs::metadata(file) else {
            continue;
        };
        let ext = file
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        *stats.by_extension.entry(ext).or_insert(0) += 1;
        stats.total_size += metadata.len();
    }

    if stats.total > 0 {
        stats.average_size = (stats.total_size as f64 / stats.total as f64).round() as u64;
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) -> PathBuf {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, "// test").unwrap();
        path
    }

    #[test]
    fn test_extension_filter_and_exclusions() {
        let tmp = TempDir::new().unwrap();
        let a = touch(tmp.path(), "a.js");
        touch(tmp.path(), "b.feature");
        touch(tmp.path(), "node_modules/c.js");

        let files = discover(&[tmp.path()], TemplateKind::BasicWebdriver, &DiscoveryOptions::default());
        assert_eq!(files, vec![normalize(&a)]);
    }

    #[test]
    fn test_feature_template_picks_feature_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.js");
        let b = touch(tmp.path(), "features/b.feature");

        let files = discover(&[tmp.path()], TemplateKind::CucumberBdd, &DiscoveryOptions::default());
        assert_eq!(files, vec![normalize(&b)]);
    }

    #[test]
    fn test_no_duplicates_from_overlapping_inputs() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.js");
        touch(tmp.path(), "sub/b.js");

        let sub = tmp.path().join("sub");
        let dotted = tmp.path().join(".").join("sub");
        let inputs = [tmp.path().to_path_buf(), sub.clone(), dotted, sub.join("b.js")];
        let files = discover(&inputs, TemplateKind::BasicWebdriver, &DiscoveryOptions::default());

        assert_eq!(files.len(), 2);
        let mut sorted = files.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), files.len());
    }

    #[test]
    fn test_output_is_sorted() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "z.js");
        touch(tmp.path(), "m/a.js");
        touch(tmp.path(), "a.js");

        let files = discover(&[tmp.path()], TemplateKind::BasicWebdriver, &DiscoveryOptions::default());
        let mut expected = files.clone();
        expected.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        assert_eq!(files, expected);
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_missing_and_unsupported_inputs_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let good = touch(tmp.path(), "good.js");
        let readme = touch(tmp.path(), "README.md");

        let inputs = [tmp.path().join("missing.js"), readme, good.clone()];
        let files = discover(&inputs, TemplateKind::BasicWebdriver, &DiscoveryOptions::default());
        assert_eq!(files, vec![normalize(&good)]);
    }

    #[test]
    fn test_depth_limit() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "one.js");
        touch(tmp.path(), "l1/two.js");
        touch(tmp.path(), "l1/l2/three.js");

        let options = DiscoveryOptions {
            max_depth: 2,
            ..Default::default()
        };
        let files = discover(&[tmp.path()], TemplateKind::BasicWebdriver, &options);
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| !f.ends_with("three.js")));

        let options = DiscoveryOptions {
            max_depth: 0,
            ..Default::default()
        };
        assert!(discover(&[tmp.path()], TemplateKind::BasicWebdriver, &options).is_empty());
    }

    #[test]
    fn test_dotfile_patterns_match_by_prefix() {
        assert!(should_exclude(".git"));
        assert!(should_exclude(".github"));
        assert!(should_exclude(".DS_Store"));
        assert!(should_exclude("node_modules"));
        assert!(!should_exclude("node_modules_backup"));
        assert!(!should_exclude("reports-old"));
    }

    #[test]
    fn test_extension_check_is_case_insensitive() {
        assert!(has_extension(Path::new("Login.JS"), &[".js"]));
        assert!(!has_extension(Path::new("login.jsx"), &[".js"]));
        assert!(!has_extension(Path::new("Makefile"), &[".js"]));
    }

    #[test]
    fn test_glob_inputs_are_expanded() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "login.spec.js");
        touch(tmp.path(), "search.spec.js");
        touch(tmp.path(), "helper.js");

        let pattern = tmp.path().join("*.spec.js");
        let files = discover(&[pattern], TemplateKind::BasicWebdriver, &DiscoveryOptions::default());
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_base_dir_with_glob_metacharacters() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("proj[1]");
        let a = touch(&base, "tests/a.js");
        let spec = touch(&base, "tests/login.spec.js");

        let options = DiscoveryOptions {
            base_dir: Some(base.clone()),
            ..Default::default()
        };
        let files = discover(&["tests"], TemplateKind::BasicWebdriver, &options);
        assert_eq!(files, vec![normalize(&a), normalize(&spec)]);

        let files = discover(&["tests/*.spec.js"], TemplateKind::BasicWebdriver, &options);
        assert_eq!(files, vec![normalize(&spec)]);
    }

    #[test]
    fn test_validate_files_detects_removed_files() {
        let tmp = TempDir::new().unwrap();
        let kept = touch(tmp.path(), "kept.js");
        let removed = touch(tmp.path(), "removed.js");
        fs::remove_file(&removed).unwrap();

        let validation = validate_files(&[kept.clone(), removed.clone()]);
        assert_eq!(validation.total, 2);
        assert_eq!(validation.valid, vec![kept]);
        assert_eq!(validation.invalid, vec![removed]);
    }

    #[test]
    fn test_file_stats() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.js");
        let b = tmp.path().join("b.feature");
        fs::write(&a, "1234").unwrap();
        fs::write(&b, "12").unwrap();

        let stats = file_stats(&[a, b]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.total_size, 6);
        assert_eq!(stats.average_size, 3);
        assert_eq!(stats.by_extension.get(".js"), Some(&1));
    }
}
