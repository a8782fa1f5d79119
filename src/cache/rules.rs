//! Path rules applied while selecting package assets

use crate::graph::normalize_separators;
use std::path::MAIN_SEPARATOR;

/// Marker file restoring packages use for "this asset group is intentionally empty"
pub const PLACEHOLDER_FILE: &str = "_._";

/// Whether a package-relative path is the empty-group marker.
///
/// Matches the marker itself or the marker as the final path segment.
pub fn is_placeholder_file(path: &str) -> bool {
    match path.strip_suffix(PLACEHOLDER_FILE) {
        Some("") => true,
        Some(rest) => rest.ends_with('/') || rest.ends_with('\\'),
        None => false,
    }
}

/// Source language family, as far as analyzer selection is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerLanguage {
    CSharp,
    VisualBasic,
}

impl AnalyzerLanguage {
    /// Map a project language name; languages without analyzer support yield `None`
    pub fn from_project_language(language: &str) -> Option<Self> {
        let language = language.trim();
        if ["C#", "cs", "csharp"]
            .iter()
            .any(|l| language.eq_ignore_ascii_case(l))
        {
            Some(Self::CSharp)
        } else if ["VB", "visualbasic"]
            .iter()
            .any(|l| language.eq_ignore_ascii_case(l))
        {
            Some(Self::VisualBasic)
        } else {
            None
        }
    }
}

/// Language named by the first `cs` or `vb` directory segment (not the file name)
fn language_segment(path: &str) -> Option<AnalyzerLanguage> {
    let mut parts: Vec<&str> = path.split(['/', '\\']).collect();
    parts.pop();
    parts.into_iter().find_map(|part| match part {
        "cs" => Some(AnalyzerLanguage::CSharp),
        "vb" => Some(AnalyzerLanguage::VisualBasic),
        _ => None,
    })
}

/// Whether a package file is an analyzer that applies to `project_language`.
///
/// Files under a `cs` directory only apply to C#, files under `vb` only to
/// VB, and anything else applies to both. When a path names both, the
/// outermost segment decides.
pub fn is_applicable_analyzer(file: &str, project_language: &str) -> bool {
    let lower = file.to_ascii_lowercase();
    let is_analyzer = file.starts_with("analyzers")
        && lower.ends_with(".dll")
        && !lower.ends_with(".resources.dll");
    if !is_analyzer {
        return false;
    }

    match AnalyzerLanguage::from_project_language(project_language) {
        Some(language) => language_segment(file).map_or(true, |segment| segment == language),
        None => false,
    }
}

/// Directory part of a package-relative path followed by a separator
pub fn destination_subdirectory(relative: &str) -> String {
    let dir = match relative.rfind(['/', '\\']) {
        Some(pos) => &relative[..pos],
        None => "",
    };
    let mut out = normalize_separators(dir);
    out.push(MAIN_SEPARATOR);
    out
}

/// Final segment of a package-relative path
pub fn file_name(relative: &str) -> &str {
    match relative.rfind(['/', '\\']) {
        Some(pos) => &relative[pos + 1..],
        None => relative,
    }
}

/// Culture-specific output directory for a satellite assembly
pub fn culture_subdirectory(locale: &str) -> String {
    format!("{}{}", locale, MAIN_SEPARATOR)
}
