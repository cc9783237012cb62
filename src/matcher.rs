/*!
 * Ignore rules: hidden entries, user patterns and .gitignore files
 *
 * A pattern without glob metacharacters (`*`, `?`, `/`) matches a bare entry
 * name exactly. Anything else is a glob, matched against the bare name and the
 * path relative to the selection root. A glob match starts on a `/` boundary
 * and runs to the end of the path, so an ancestor's name never hides its
 * descendants. Patterns prefixed with `re:` are raw regular expressions tested
 * against the bare name.
 *
 * `.gitignore` files use git's own rules through the `ignore` crate.
 */

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;
use log::{debug, warn};
use regex::Regex;

use crate::fs::{FileSystem, LocalFs};

/// Name of the per-directory version-control ignore file
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Prefix marking a raw regular expression pattern
pub const REGEX_PREFIX: &str = "re:";

/// User-configured filtering rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRules {
    /// Ordered user ignore patterns
    pub patterns: Vec<String>,
    /// Show entries whose name starts with a dot
    pub include_hidden: bool,
    /// Let patterns hide directories themselves, not only their contents
    pub apply_filters_to_directories: bool,
    /// Honor .gitignore files between the selection root and the entry
    pub respect_gitignore: bool,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            include_hidden: false,
            apply_filters_to_directories: true,
            respect_gitignore: true,
        }
    }
}

/// A compiled ignore pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Exact bare-name match
    Exact(String),
    /// Glob compiled to a segment-bounded regex
    Glob(Regex),
    /// Raw regular expression over the bare name
    Regex(Regex),
}

impl Pattern {
    /// Compile a user pattern. Blank patterns compile to `None`.
    pub fn compile(raw: &str) -> Result<Option<Self>, regex::Error> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        if let Some(expr) = raw.strip_prefix(REGEX_PREFIX) {
            return Regex::new(expr).map(|re| Some(Pattern::Regex(re)));
        }

        if !raw.contains(['*', '?', '/']) {
            return Ok(Some(Pattern::Exact(raw.to_string())));
        }

        Regex::new(&glob_to_regex(raw)).map(|re| Some(Pattern::Glob(re)))
    }

    /// Test the pattern against an entry name and its relative path
    pub fn matches(&self, name: &str, rel_path: &str) -> bool {
        match self {
            Pattern::Exact(literal) => literal == name,
            Pattern::Glob(re) => re.is_match(name) || re.is_match(rel_path),
            Pattern::Regex(re) => re.is_match(name),
        }
    }
}

/// Translate a glob into a regex matching a trailing run of path segments
pub fn glob_to_regex(glob: &str) -> String {
    let mut body = String::with_capacity(glob.len() * 2);
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    body.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    body.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                body.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                body.push_str("[^/]");
                i += 1;
            }
            c => {
                body.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    format!("(?:^|/){}$", body)
}

/// Compile a list of patterns, logging and skipping the ones that fail
pub fn compile_patterns<S: AsRef<str>>(raw_patterns: &[S]) -> Vec<Pattern> {
    raw_patterns
        .iter()
        .filter_map(|raw| match Pattern::compile(raw.as_ref()) {
            Ok(pattern) => pattern,
            Err(e) => {
                warn!("Invalid ignore pattern '{}': {}", raw.as_ref(), e);
                None
            }
        })
        .collect()
}

/// Render a path relative to `base` with `/` separators
pub fn relative_path(path: &Path, base: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Filtering decisions for one tree build or selection pass
///
/// Patterns are compiled once at construction and .gitignore files are cached
/// for the lifetime of the matcher, so every decision made through one matcher
/// sees the same rules. An entry is hidden when either the user patterns or
/// the .gitignore rules exclude it.
pub struct Matcher {
    root: PathBuf,
    rules: IgnoreRules,
    patterns: Vec<Pattern>,
    fs: Arc<dyn FileSystem>,
    gitignore_cache: Mutex<HashMap<PathBuf, Option<Arc<Gitignore>>>>,
}

impl Matcher {
    /// Create a matcher for the selection root
    pub fn new(root: impl Into<PathBuf>, rules: IgnoreRules, fs: Arc<dyn FileSystem>) -> Self {
        let patterns = compile_patterns(&rules.patterns);
        Self {
            root: root.into(),
            rules,
            patterns,
            fs,
            gitignore_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Selection root relative paths are computed from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rules this matcher was built from
    pub fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Decide whether an entry named `name` inside `parent` is shown
    pub fn should_include(&self, name: &str, is_dir: bool, parent: &Path) -> bool {
        if !self.rules.include_hidden && name.starts_with('.') {
            return false;
        }

        if is_dir && !self.rules.apply_filters_to_directories {
            return true;
        }

        let full_path = parent.join(name);
        let rel_path = relative_path(&full_path, &self.root);

        if self.patterns.iter().any(|p| p.matches(name, &rel_path)) {
            debug!("Excluded by ignore pattern: {}", rel_path);
            return false;
        }

        if self.rules.respect_gitignore && self.is_gitignored(&full_path, is_dir, parent) {
            debug!("Excluded by .gitignore: {}", rel_path);
            return false;
        }

        true
    }

    /// Convenience wrapper taking a full path
    pub fn should_include_path(&self, path: &Path, is_dir: bool) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let parent = path.parent().unwrap_or(Path::new(""));
        self.should_include(&name, is_dir, parent)
    }

    /// The closest .gitignore with a matching rule decides, as in git
    fn is_gitignored(&self, full_path: &Path, is_dir: bool, parent: &Path) -> bool {
        let mut dir = Some(parent);

        while let Some(current) = dir {
            if let Some(gitignore) = self.gitignore(current) {
                match gitignore.matched(full_path, is_dir) {
                    Match::Ignore(glob) => {
                        debug!(
                            "{} matches gitignore rule '{}'",
                            full_path.display(),
                            glob.original()
                        );
                        return true;
                    }
                    Match::Whitelist(_) => return false,
                    Match::None => {}
                }
            }

            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            dir = current.parent();
        }

        false
    }

    fn gitignore(&self, dir: &Path) -> Option<Arc<Gitignore>> {
        let mut cache = match self.gitignore_cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };

        cache
            .entry(dir.to_path_buf())
            .or_insert_with(|| self.load_gitignore(dir))
            .clone()
    }

    fn load_gitignore(&self, dir: &Path) -> Option<Arc<Gitignore>> {
        let path = dir.join(GITIGNORE_FILE);
        let bytes = self.fs.read(&path).ok()?;
        let content = String::from_utf8_lossy(&bytes);

        let mut builder = GitignoreBuilder::new(dir);
        for line in content.lines() {
            if let Err(e) = builder.add_line(Some(path.clone()), line) {
                warn!("Skipping rule in {}: {}", path.display(), e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => {
                debug!("Loaded {} rules from {}", gitignore.num_ignores(), path.display());
                Some(Arc::new(gitignore))
            }
            Err(e) => {
                warn!("Cannot use {}: {}", path.display(), e);
                None
            }
        }
    }
}

/// One-shot inclusion check against the local disk
pub fn should_include(
    name: &str,
    is_dir: bool,
    parent: &Path,
    rules: &IgnoreRules,
    root: &Path,
) -> bool {
    Matcher::new(root, rules.clone(), Arc::new(LocalFs)).should_include(name, is_dir, parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn rules(patterns: &[&str]) -> IgnoreRules {
        IgnoreRules {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            include_hidden: false,
            apply_filters_to_directories: true,
            respect_gitignore: false,
        }
    }

    fn matcher(patterns: &[&str]) -> Matcher {
        Matcher::new("/p", rules(patterns), Arc::new(LocalFs))
    }

    #[test]
    fn test_glob_excludes_at_any_depth() {
        let m = matcher(&["*.log"]);
        assert!(!m.should_include("app.log", false, Path::new("/p")));
        assert!(!m.should_include("app.log", false, Path::new("/p/a/b")));
        assert!(m.should_include("app.logger", false, Path::new("/p")));
    }

    #[test]
    fn test_literal_pattern_matches_whole_name_only() {
        let m = matcher(&["node_modules"]);
        assert!(!m.should_include("node_modules", true, Path::new("/p")));
        assert!(!m.should_include("node_modules", true, Path::new("/p/web/app")));
        assert!(m.should_include("my_node_modules", true, Path::new("/p")));
        assert!(m.should_include("node_modules.txt", false, Path::new("/p")));
    }

    #[test]
    fn test_glob_is_segment_bounded() {
        let m = matcher(&["build/*"]);
        assert!(!m.should_include("out.js", false, Path::new("/p/build")));
        assert!(!m.should_include("out.js", false, Path::new("/p/web/build")));
        assert!(m.should_include("out.js", false, Path::new("/p/rebuild")));
        assert!(m.should_include("build", true, Path::new("/p")));
    }

    #[test]
    fn test_double_star_crosses_separators() {
        let m = matcher(&["docs/**/*.md"]);
        assert!(!m.should_include("a.md", false, Path::new("/p/docs")));
        assert!(!m.should_include("a.md", false, Path::new("/p/docs/x/y")));
        assert!(m.should_include("a.md", false, Path::new("/p/src")));
    }

    #[test]
    fn test_question_mark_matches_single_character() {
        let m = matcher(&["temp?"]);
        assert!(!m.should_include("temp1", false, Path::new("/p")));
        assert!(m.should_include("temp12", false, Path::new("/p")));
    }

    #[test]
    fn test_hidden_entries_excluded_before_patterns() {
        let m = matcher(&[]);
        assert!(!m.should_include(".env", false, Path::new("/p")));
        assert!(!m.should_include(".git", true, Path::new("/p")));

        let mut visible = rules(&[]);
        visible.include_hidden = true;
        let m = Matcher::new("/p", visible, Arc::new(LocalFs));
        assert!(m.should_include(".env", false, Path::new("/p")));
    }

    #[test]
    fn test_directories_exempt_when_filters_not_applied() {
        let mut r = rules(&["build"]);
        r.apply_filters_to_directories = false;
        let m = Matcher::new("/p", r, Arc::new(LocalFs));

        assert!(m.should_include("build", true, Path::new("/p")));
        assert!(!m.should_include("build", false, Path::new("/p")));
    }

    #[test]
    fn test_hidden_rule_still_applies_to_exempt_directories() {
        let mut r = rules(&[]);
        r.apply_filters_to_directories = false;
        let m = Matcher::new("/p", r, Arc::new(LocalFs));
        assert!(!m.should_include(".git", true, Path::new("/p")));
    }

    #[test]
    fn test_malformed_pattern_is_skipped() {
        let m = matcher(&["re:([unclosed", "*.tmp"]);
        assert!(m.should_include("main.rs", false, Path::new("/p")));
        assert!(!m.should_include("x.tmp", false, Path::new("/p")));
    }

    #[test]
    fn test_regex_pattern_matches_name() {
        let m = matcher(&[r"re:^test_.*\.rs$"]);
        assert!(!m.should_include("test_api.rs", false, Path::new("/p/src")));
        assert!(m.should_include("api.rs", false, Path::new("/p/src")));
    }

    #[test]
    fn test_exempt_directory_contents_stay_visible() {
        let mut r = rules(&["*.d"]);
        r.apply_filters_to_directories = false;
        let m = Matcher::new("/p", r, Arc::new(LocalFs));

        assert!(m.should_include("conf.d", true, Path::new("/p")));
        assert!(m.should_include("app.rs", false, Path::new("/p/conf.d")));
        assert!(m.should_include("main.rs", false, Path::new("/p/etc/conf.d/x")));
        assert!(!m.should_include("extra.d", false, Path::new("/p/conf.d")));
    }

    #[test]
    fn test_gitignore_negation_anchor_and_directory_rules() -> std::io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pkg"))?;
        fs::write(root.join(".gitignore"), "*.log\n!keep.log\n/dist\nbuild/\n")?;

        let mut r = rules(&[]);
        r.respect_gitignore = true;
        let m = Matcher::new(root, r, Arc::new(LocalFs));

        assert!(!m.should_include("app.log", false, root));
        assert!(m.should_include("keep.log", false, root));
        assert!(!m.should_include("dist", true, root));
        assert!(m.should_include("dist", true, &root.join("pkg")));
        assert!(!m.should_include("build", true, &root.join("pkg")));
        assert!(m.should_include("build", false, root));
        Ok(())
    }

    #[test]
    fn test_nested_gitignore_can_reinclude() -> std::io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pkg"))?;
        fs::write(root.join(".gitignore"), "*.log\n")?;
        fs::write(root.join("pkg/.gitignore"), "!trace.log\n")?;

        let mut r = rules(&[]);
        r.respect_gitignore = true;
        let m = Matcher::new(root, r, Arc::new(LocalFs));

        assert!(m.should_include("trace.log", false, &root.join("pkg")));
        assert!(!m.should_include("other.log", false, &root.join("pkg")));
        assert!(!m.should_include("trace.log", false, root));
        Ok(())
    }

    #[test]
    fn test_gitignore_rules_union_with_patterns() -> std::io::Result<()> {
        let temp_dir = tempdir()?;
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pkg/src"))?;
        fs::write(root.join(".gitignore"), "# root rules\n*.log\n")?;
        fs::write(root.join("pkg/.gitignore"), "generated.rs\n")?;

        let mut r = rules(&["*.tmp"]);
        r.respect_gitignore = true;
        let m = Matcher::new(root, r.clone(), Arc::new(LocalFs));

        assert!(!m.should_include("app.log", false, &root.join("pkg/src")));
        assert!(!m.should_include("generated.rs", false, &root.join("pkg/src")));
        assert!(!m.should_include("x.tmp", false, &root.join("pkg")));
        assert!(m.should_include("lib.rs", false, &root.join("pkg/src")));
        // pkg/.gitignore does not apply outside pkg
        assert!(m.should_include("generated.rs", false, root));

        r.respect_gitignore = false;
        let m = Matcher::new(root, r, Arc::new(LocalFs));
        assert!(m.should_include("app.log", false, &root.join("pkg/src")));
        Ok(())
    }

    #[test]
    fn test_free_function_uses_same_rules() {
        let r = rules(&["*.log"]);
        assert!(!should_include("a.log", false, Path::new("/p/x"), &r, Path::new("/p")));
        assert!(should_include("a.rs", false, Path::new("/p/x"), &r, Path::new("/p")));
    }

    #[test]
    fn test_glob_to_regex_anchors() {
        assert_eq!(glob_to_regex("*.rs"), r"(?:^|/)[^/]*\.rs$");
        assert_eq!(glob_to_regex("**/a?"), r"(?:^|/)(?:.*/)?a[^/]$");
    }
}
