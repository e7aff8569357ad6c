//! Repository digest for the repository analyzer.
//!
//! A digest is a plain-text summary of a source tree (totals, language
//! distribution, git history, per-file metrics and file contents) that is
//! sent to the model as the analysis input. Remote repositories are cloned
//! into a temporary directory that is removed when the digest is built.

use crate::error::{ExecError, IoError, Result, ToolError};
use crate::io::{FileReader, find_char_boundary};
use crate::tools::exec::install_hint;
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

/// Accepted prefix for remote repositories.
pub const GITHUB_PREFIX: &str = "https://github.com/";

/// Directory names never descended into.
pub const IGNORED_DIRS: &[&str] = &[".git", "__pycache__", "node_modules", "venv", ".env"];

/// File extensions never read.
pub const IGNORED_EXTENSIONS: &[&str] = &["pyc", "pyo", "pyd", "so", "dll", "class"];

/// Per-file content cap in the rendered digest (bytes).
pub const MAX_CONTENT_BYTES: usize = 16 * 1024;

/// Where the repository comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum RepoSource {
    /// A GitHub URL to clone.
    Remote(String),
    /// A directory on disk.
    Local(PathBuf),
}

impl RepoSource {
    /// Parses a GitHub URL or local directory path.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidRepositoryUrl`] for a non-GitHub URL or
    /// a GitHub URL without owner and name, and [`IoError::FileNotFound`]
    /// for a path that is not a directory.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Some(rest) = input.strip_prefix(GITHUB_PREFIX) {
            let segments = rest.trim_end_matches('/').split('/').filter(|s| !s.is_empty()).count();
            if segments < 2 {
                return Err(ToolError::InvalidRepositoryUrl {
                    url: input.to_string(),
                }
                .into());
            }
            return Ok(Self::Remote(input.to_string()));
        }
        if input.contains("://") || input.starts_with("git@") {
            return Err(ToolError::InvalidRepositoryUrl {
                url: input.to_string(),
            }
            .into());
        }

        let path = PathBuf::from(input);
        if !path.is_dir() {
            return Err(IoError::FileNotFound {
                path: input.to_string(),
            }
            .into());
        }
        Ok(Self::Local(path))
    }

    /// Returns the URL or path as given.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Remote(url) => url.clone(),
            Self::Local(path) => path.display().to_string(),
        }
    }
}

/// Metrics for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigest {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,

    /// Lowercase extension without the dot (empty if none).
    pub extension: String,

    /// Language inferred from the extension.
    pub language: Option<&'static str>,

    /// Size in bytes.
    pub size_bytes: usize,

    /// Number of lines.
    pub line_count: usize,

    /// Number of blank lines.
    pub empty_lines: usize,

    /// Occurrence counts of language features (imports, classes, ...).
    pub features: BTreeMap<&'static str, usize>,

    /// File text.
    #[serde(skip)]
    pub content: String,
}

impl FileDigest {
    /// Analyses `content` stored at `path`.
    #[must_use]
    pub fn analyze(path: &str, content: String) -> Self {
        let extension = Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let language = language_for_extension(&extension);

        let features = feature_indicators(&extension)
            .iter()
            .map(|(feature, tokens)| {
                let count: usize = tokens.iter().map(|t| content.matches(*t).count()).sum();
                (*feature, count)
            })
            .collect();

        Self {
            path: path.to_string(),
            language,
            size_bytes: content.len(),
            line_count: content.lines().count(),
            empty_lines: content.lines().filter(|l| l.trim().is_empty()).count(),
            features,
            extension,
            content,
        }
    }
}

/// Language name for a file extension.
#[must_use]
pub fn language_for_extension(extension: &str) -> Option<&'static str> {
    let language = match extension {
        "py" => "Python",
        "js" | "mjs" | "cjs" | "jsx" => "JavaScript",
        "ts" | "tsx" => "TypeScript",
        "java" => "Java",
        "rs" => "Rust",
        "go" => "Go",
        "rb" => "Ruby",
        "swift" => "Swift",
        "c" | "h" => "C",
        "cpp" | "cc" | "cxx" | "hpp" => "C++",
        "cs" => "C#",
        "php" => "PHP",
        _ => return None,
    };
    Some(language)
}

type Indicators = &'static [(&'static str, &'static [&'static str])];

fn feature_indicators(extension: &str) -> Indicators {
    match extension {
        "py" => &[
            ("imports", &["import ", "from "]),
            ("classes", &["class "]),
            ("functions", &["def "]),
            ("async", &["async ", "await"]),
            ("decorators", &["@"]),
        ],
        "js" => &[
            ("imports", &["import ", "require("]),
            ("classes", &["class "]),
            ("functions", &["function ", "=>"]),
            ("async", &["async ", "await"]),
            ("decorators", &["@"]),
        ],
        "ts" => &[
            ("imports", &["import "]),
            ("interfaces", &["interface "]),
            ("types", &["type "]),
            ("classes", &["class "]),
            ("functions", &["function ", "=>"]),
            ("async", &["async ", "await"]),
            ("decorators", &["@"]),
        ],
        _ => &[],
    }
}

/// Most recent commit on the checked-out branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// Full commit message, trimmed.
    pub message: String,
    /// Author name.
    pub author: String,
    /// Author date, ISO 8601.
    pub date: String,
}

/// Git metadata of a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoInfo {
    /// Checked-out branch (`HEAD` when detached).
    pub active_branch: String,
    /// Local branch names, sorted.
    pub branches: Vec<String>,
    /// Latest commit.
    pub last_commit: CommitInfo,
    /// Commits reachable from `HEAD`.
    pub commit_count: usize,
    /// Distinct author names among those commits.
    pub contributors: usize,
}

impl RepoInfo {
    /// Reads git metadata for the checkout at `root`.
    ///
    /// Returns `None` when `root` is not the top of a git checkout, has no
    /// commits yet, or `git` is not installed.
    #[must_use]
    pub fn read(root: &Path) -> Option<Self> {
        if !root.join(".git").exists() {
            return None;
        }
        let Ok(git) = which::which("git") else {
            debug!("git not found, skipping repository metadata");
            return None;
        };
        let run = |args: &[&str]| git_output(&git, root, args);

        let active_branch = run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branches: Vec<String> = run(&["branch", "--format=%(refname:short)"])?
            .lines()
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let last = run(&["log", "-1", "--format=%an%x00%aI%x00%B"])?;
        let mut fields = last.splitn(3, '\0');
        let last_commit = CommitInfo {
            author: fields.next()?.to_string(),
            date: fields.next()?.to_string(),
            message: fields.next().unwrap_or_default().trim().to_string(),
        };

        let authors = run(&["log", "--format=%an"])?;
        let commit_count = authors.lines().count();
        let contributors = authors.lines().collect::<BTreeSet<_>>().len();

        debug!(branch = %active_branch, commit_count, contributors, "read repository metadata");
        Some(Self {
            active_branch,
            branches,
            last_commit,
            commit_count,
            contributors,
        })
    }
}

/// Summary of a source tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoDigest {
    /// URL or path the digest was built from.
    pub source: String,

    /// Git metadata; `None` for directories that are not git checkouts.
    pub info: Option<RepoInfo>,

    /// Analysed files, sorted by path.
    pub files: Vec<FileDigest>,

    /// Files skipped because they were not UTF-8 text.
    pub skipped: usize,
}

impl RepoDigest {
    /// Builds the digest for `source`, cloning it first if remote.
    ///
    /// # Errors
    ///
    /// Returns an error if `git` is missing, the clone fails, or the tree
    /// cannot be walked.
    pub fn collect(source: &RepoSource) -> Result<Self> {
        match source {
            RepoSource::Local(path) => Self::from_dir(path, source.display_name()),
            RepoSource::Remote(url) => {
                let checkout = tempfile::Builder::new().prefix("devtools-repo-").tempdir()?;
                clone_repo(url, checkout.path())?;
                Self::from_dir(checkout.path(), url.clone())
            }
        }
    }

    /// Builds the digest for the directory `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory.
    pub fn from_dir(root: &Path, source: String) -> Result<Self> {
        if !root.is_dir() {
            return Err(IoError::FileNotFound {
                path: root.display().to_string(),
            }
            .into());
        }

        let paths = walk(root);
        debug!(files = paths.len(), "walked repository");

        let analysed: Vec<Option<FileDigest>> = paths
            .par_iter()
            .map(|path| read_text(path).map(|content| FileDigest::analyze(&relative(root, path), content)))
            .collect();

        let skipped = analysed.iter().filter(|d| d.is_none()).count();
        let mut files: Vec<FileDigest> = analysed.into_iter().flatten().collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let info = RepoInfo::read(root);
        info!(files = files.len(), skipped, git = info.is_some(), "built repository digest");
        Ok(Self {
            source,
            info,
            files,
            skipped,
        })
    }

    /// Total number of analysed files.
    #[must_use]
    pub fn total_files(&self) -> usize {
        self.files.len()
    }

    /// Total number of lines across files.
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.line_count).sum()
    }

    /// Files per known language.
    #[must_use]
    pub fn language_distribution(&self) -> BTreeMap<&'static str, usize> {
        let mut distribution = BTreeMap::new();
        for language in self.files.iter().filter_map(|f| f.language) {
            *distribution.entry(language).or_insert(0) += 1;
        }
        distribution
    }

    /// Renders the digest as model input.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let distribution = self
            .language_distribution()
            .iter()
            .map(|(language, count)| format!("{language}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");

        let _ = writeln!(out, "Repository Analysis: {}", self.source);
        let _ = writeln!(out, "General Statistics:");
        let _ = writeln!(out, "- Total Files: {}", self.total_files());
        let _ = writeln!(out, "- Total Lines of Code: {}", self.total_lines());
        if let Some(info) = &self.info {
            let _ = writeln!(out, "- Total Commits: {}", info.commit_count);
            let _ = writeln!(out, "- Contributors: {}", info.contributors);
        }
        let _ = writeln!(out, "- Language Distribution: {distribution}");
        let _ = writeln!(out);
        if let Some(info) = &self.info {
            let _ = writeln!(out, "Branch Info:");
            let _ = writeln!(out, "- Active Branch: {}", info.active_branch);
            let _ = writeln!(out, "- Available Branches: {}", info.branches.join(", "));
            let _ = writeln!(out);
            let _ = writeln!(out, "Latest Commit:");
            let _ = writeln!(out, "- Message: {}", info.last_commit.message);
            let _ = writeln!(out, "- Author: {}", info.last_commit.author);
            let _ = writeln!(out, "- Date: {}", info.last_commit.date);
            let _ = writeln!(out);
        }
        let _ = writeln!(out, "Detailed File Analysis:");
        for file in &self.files {
            let features = file
                .features
                .iter()
                .filter(|(_, count)| **count > 0)
                .map(|(feature, count)| format!("{feature}: {count}"))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "File: {}", file.path);
            let _ = writeln!(out, "- Language: {}", file.language.unwrap_or("Unknown"));
            let _ = writeln!(
                out,
                "- Lines of Code: {} ({} empty)",
                file.line_count, file.empty_lines
            );
            let _ = writeln!(out, "- Features: {features}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "File Contents:");
        for file in &self.files {
            let _ = writeln!(out, "### {} ###", file.path);
            let end = find_char_boundary(&file.content, MAX_CONTENT_BYTES);
            out.push_str(&file.content[..end]);
            if end < file.content.len() {
                let _ = write!(out, "\n[... {} more bytes]", file.content.len() - end);
            }
            out.push('\n');
        }
        out
    }
}

/// Lists candidate files under `root`, skipping hidden entries, ignored
/// directories and extensions. Ignore files are not consulted.
fn walk(root: &Path) -> Vec<PathBuf> {
    WalkBuilder::new(root)
        .parents(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && IGNORED_DIRS.iter().any(|d| entry.file_name() == *d))
        })
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(ignore::DirEntry::into_path)
        .filter(|path| {
            path.extension().is_none_or(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                !IGNORED_EXTENSIONS.contains(&ext.as_str())
            })
        })
        .collect()
}

/// Reads a file as UTF-8 text; `None` for binary or unreadable files.
fn read_text(path: &Path) -> Option<String> {
    let content = match FileReader::open(path).and_then(|reader| reader.read_content()) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    };
    content.as_text().ok().map(str::to_string)
}

fn relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Runs `git -C root <args>`; `None` on failure.
fn git_output(git: &Path, root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(git)
        .arg("-C")
        .arg(root)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(?args, stderr = %stderr.trim(), "git command failed");
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

fn clone_repo(url: &str, dest: &Path) -> Result<()> {
    let git = which::which("git").map_err(|_| ExecError::RuntimeNotFound {
        command: "git".to_string(),
        hint: install_hint("git", std::env::consts::OS),
    })?;

    info!(url, "cloning repository");
    let output = Command::new(git)
        .args(["clone", "--quiet", url])
        .arg(dest)
        .output()
        .map_err(|e| ExecError::Spawn {
            command: "git".to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ExecError::Spawn {
            command: "git clone".to_string(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::fs;
    use tempfile::TempDir;
    use test_case::test_case;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(
            root.join("src/app.py"),
            "import os\n\ndef main():\n    print(os.name)\n",
        )
        .unwrap();
        fs::write(root.join("src/util.js"), "const f = () => 1;\n").unwrap();
        fs::write(root.join("README.md"), "# demo\n").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "ignored").unwrap();
        fs::write(root.join("__pycache__/app.cpython.pyc"), [0u8, 1, 2]).unwrap();
        fs::write(root.join("lib.so"), [0u8, 159, 146, 150]).unwrap();
        fs::write(root.join("blob.bin"), [0xffu8, 0xfe, 0x00]).unwrap();
        dir
    }

    #[test]
    fn test_digest_skips_ignored_and_binary() {
        let dir = fixture();
        let digest = RepoDigest::from_dir(dir.path(), "demo".to_string()).unwrap();
        let paths: Vec<&str> = digest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["README.md", "src/app.py", "src/util.js"]);
        assert_eq!(digest.skipped, 1);
        assert_eq!(digest.total_files(), 3);
        assert_eq!(digest.total_lines(), 1 + 4 + 1);
    }

    #[test]
    fn test_file_metrics() {
        let dir = fixture();
        let digest = RepoDigest::from_dir(dir.path(), "demo".to_string()).unwrap();
        let app = digest.files.iter().find(|f| f.path == "src/app.py").unwrap();
        assert_eq!(app.language, Some("Python"));
        assert_eq!(app.line_count, 4);
        assert_eq!(app.empty_lines, 1);
        assert_eq!(app.features["imports"], 1);
        assert_eq!(app.features["functions"], 1);

        let distribution = digest.language_distribution();
        assert_eq!(distribution.get("Python"), Some(&1));
        assert_eq!(distribution.get("JavaScript"), Some(&1));
        assert!(!distribution.contains_key("Unknown"));
    }

    #[test]
    fn test_render() {
        let dir = fixture();
        let digest = RepoDigest::from_dir(dir.path(), "demo".to_string()).unwrap();
        let text = digest.render();
        assert!(text.starts_with("Repository Analysis: demo\n"));
        assert!(text.contains("- Total Files: 3"));
        assert!(text.contains("- Language Distribution: JavaScript: 1, Python: 1"));
        assert!(text.contains("File: README.md\n- Language: Unknown"));
        assert!(text.contains("### src/app.py ###\nimport os"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn test_ignore_files_not_consulted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "generated.py\n").unwrap();
        fs::write(dir.path().join(".ignore"), "notes.txt\n").unwrap();
        fs::write(dir.path().join("generated.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "todo\n").unwrap();

        let digest = RepoDigest::from_dir(dir.path(), "demo".to_string()).unwrap();
        let paths: Vec<&str> = digest.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["generated.py", "notes.txt"]);
    }

    /// Runs git in `root` as `author`.
    fn git(root: &Path, author: &str, args: &[&str]) {
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(["-c", &format!("user.name={author}")])
            .args(["-c", "user.email=dev@example.com", "-c", "commit.gpgsign=false"])
            .args(args)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&output.stderr));
    }

    #[test]
    fn test_repo_info_from_git_checkout() {
        if which::which("git").is_err() {
            return;
        }
        let dir = fixture();
        let root = dir.path();
        git(root, "Ada", &["init", "-q"]);
        git(root, "Ada", &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(root, "Ada", &["add", "src"]);
        git(root, "Ada", &["commit", "-q", "-m", "Add sources"]);
        git(root, "Grace", &["add", "README.md"]);
        git(root, "Grace", &["commit", "-q", "-m", "Add readme\n\nWith a body."]);
        git(root, "Ada", &["branch", "feature"]);

        let digest = RepoDigest::from_dir(root, "demo".to_string()).unwrap();
        let info = digest.info.as_ref().unwrap();
        assert_eq!(info.active_branch, "main");
        assert_eq!(info.branches, vec!["feature", "main"]);
        assert_eq!(info.commit_count, 2);
        assert_eq!(info.contributors, 2);
        assert_eq!(info.last_commit.author, "Grace");
        assert_eq!(info.last_commit.message, "Add readme\n\nWith a body.");
        assert!(!info.last_commit.date.is_empty());
        assert!(!digest.files.iter().any(|f| f.path.starts_with(".git")));

        let text = digest.render();
        assert!(text.contains("- Total Commits: 2\n- Contributors: 2\n"));
        assert!(text.contains("Branch Info:\n- Active Branch: main\n- Available Branches: feature, main\n"));
        assert!(text.contains("Latest Commit:\n- Message: Add readme"));
        assert!(text.contains("- Author: Grace\n"));
    }

    #[test]
    fn test_repo_info_absent_outside_checkout() {
        let dir = fixture();
        assert_eq!(RepoInfo::read(dir.path()), None);

        let digest = RepoDigest::from_dir(dir.path(), "demo".to_string()).unwrap();
        assert!(digest.info.is_none());
        let text = digest.render();
        assert!(!text.contains("Total Commits"));
        assert!(!text.contains("Branch Info:"));
    }

    #[test]
    fn test_repo_info_absent_before_first_commit() {
        if which::which("git").is_err() {
            return;
        }
        let dir = fixture();
        git(dir.path(), "Ada", &["init", "-q"]);
        assert_eq!(RepoInfo::read(dir.path()), None);
    }

    #[test]
    fn test_render_truncates_large_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(MAX_CONTENT_BYTES + 10)).unwrap();
        let digest = RepoDigest::from_dir(dir.path(), "big".to_string()).unwrap();
        assert!(digest.render().contains("[... 10 more bytes]"));
    }

    #[test_case("https://github.com/owner/repo" ; "plain")]
    #[test_case("https://github.com/owner/repo/" ; "trailing slash")]
    fn test_parse_remote(url: &str) {
        assert_eq!(
            RepoSource::parse(url).unwrap(),
            RepoSource::Remote(url.to_string())
        );
    }

    #[test_case("https://gitlab.com/owner/repo" ; "other host")]
    #[test_case("https://github.com/owner" ; "missing repo")]
    #[test_case("git@github.com:owner/repo.git" ; "ssh")]
    fn test_parse_rejects_url(url: &str) {
        let err = RepoSource::parse(url).unwrap_err();
        assert!(matches!(
            err,
            Error::Tool(ToolError::InvalidRepositoryUrl { .. })
        ));
    }

    #[test]
    fn test_parse_local() {
        let dir = TempDir::new().unwrap();
        let source = RepoSource::parse(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(source, RepoSource::Local(dir.path().to_path_buf()));

        let missing = RepoSource::parse("/definitely/not/here");
        assert!(matches!(
            missing,
            Err(Error::Io(IoError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_collect_local() {
        let dir = fixture();
        let source = RepoSource::Local(dir.path().to_path_buf());
        let digest = RepoDigest::collect(&source).unwrap();
        assert_eq!(digest.source, dir.path().display().to_string());
        assert_eq!(digest.total_files(), 3);
    }
}
