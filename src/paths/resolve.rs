// src/paths/resolve.rs

//! Turning whatever the front end passed as `taskPath` into an absolute,
//! existing task file.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::{Result, WardenError};
use crate::fs::FileSystem;

/// Leading marker some front ends put in front of file references (`@tasks/a.md`).
const REFERENCE_MARKER: char = '@';

/// Resolves raw task-path input against a fixed set of base directories.
#[derive(Debug, Clone)]
pub struct TaskResolver {
    fs: Arc<dyn FileSystem>,
    cwd: PathBuf,
    install_root: Option<PathBuf>,
    tasks_dir: PathBuf,
    default_extension: String,
}

impl TaskResolver {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        cwd: PathBuf,
        tasks_dir: impl Into<PathBuf>,
        default_extension: impl Into<String>,
    ) -> Self {
        Self {
            fs,
            cwd,
            install_root: None,
            tasks_dir: tasks_dir.into(),
            default_extension: default_extension.into(),
        }
    }

    /// Also search relative to this installation root.
    pub fn with_install_root(mut self, root: Option<PathBuf>) -> Self {
        self.install_root = root;
        self
    }

    /// Resolve `input` to an absolute path of an existing file.
    ///
    /// Candidates, first hit wins:
    /// 1. absolute path as given (after stripping a leading `@`)
    /// 2. relative to the current working directory
    /// 3. relative to the installation root, then its tasks dir (with and
    ///    without the default extension)
    /// 4. the tasks dir under the current working directory (with and
    ///    without the default extension)
    pub fn resolve(&self, input: &str) -> Result<PathBuf> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(WardenError::EmptyTaskPath);
        }
        let stripped = raw.strip_prefix(REFERENCE_MARKER).unwrap_or(raw);
        let given = Path::new(stripped);

        for candidate in self.candidates(given).into_iter().map(|c| normalize(&c)) {
            if self.fs.is_file(&candidate) {
                debug!(input = %input, resolved = %candidate.display(), "task path resolved");
                return Ok(candidate);
            }
        }

        Err(WardenError::TaskNotFound(input.to_string()))
    }

    fn candidates(&self, given: &Path) -> Vec<PathBuf> {
        if given.is_absolute() {
            return vec![given.to_path_buf()];
        }

        let mut out = vec![self.cwd.join(given)];
        if let Some(root) = &self.install_root {
            out.push(root.join(given));
            out.extend(self.in_tasks_dir(root, given));
        }
        out.extend(self.in_tasks_dir(&self.cwd, given));
        out
    }

    fn in_tasks_dir(&self, base: &Path, given: &Path) -> [PathBuf; 2] {
        let plain = base.join(&self.tasks_dir).join(given);
        let with_ext = self.with_default_extension(&plain);
        [plain, with_ext]
    }

    fn with_default_extension(&self, path: &Path) -> PathBuf {
        let ext = self.default_extension.trim_start_matches('.');
        let already = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if already || ext.is_empty() {
            path.to_path_buf()
        } else {
            let mut s = path.as_os_str().to_os_string();
            s.push(".");
            s.push(ext);
            PathBuf::from(s)
        }
    }
}

/// Lexically drop `.` segments and fold `..` into the preceding segment.
///
/// Runs before the `tasks` anchor is looked up, so `tasks/../notes/a.md`
/// counts as living in `notes`. Symlinks are not followed.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Installation root used as an extra search base: the parent of the
/// directory holding the running executable.
pub fn install_root() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    exe.parent()?.parent().map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    const TASKS: &str = ".kilocode/sub-memory-bank/tasks";

    fn resolver(fs: &MockFileSystem) -> TaskResolver {
        TaskResolver::new(Arc::new(fs.clone()), PathBuf::from("/work"), TASKS, "md")
            .with_install_root(Some(PathBuf::from("/opt/scoutwarden")))
    }

    #[test]
    fn empty_input_is_rejected() {
        let fs = MockFileSystem::new();
        assert!(matches!(
            resolver(&fs).resolve("   "),
            Err(WardenError::EmptyTaskPath)
        ));
    }

    #[test]
    fn absolute_path_with_marker() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/tasks/a.md", "x");
        assert_eq!(
            resolver(&fs).resolve("@/p/tasks/a.md").unwrap(),
            PathBuf::from("/p/tasks/a.md")
        );
    }

    #[test]
    fn missing_absolute_path_is_not_found() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/.kilocode/sub-memory-bank/tasks/p/tasks/a.md", "x");
        assert!(matches!(
            resolver(&fs).resolve("/p/tasks/a.md"),
            Err(WardenError::TaskNotFound(given)) if given == "/p/tasks/a.md"
        ));
    }

    #[test]
    fn relative_to_cwd_first() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/tasks/a.md", "cwd");
        fs.add_file("/opt/scoutwarden/tasks/a.md", "install");
        assert_eq!(
            resolver(&fs).resolve("tasks/a.md").unwrap(),
            PathBuf::from("/work/tasks/a.md")
        );
    }

    #[test]
    fn install_root_tasks_dir_without_extension() {
        let fs = MockFileSystem::new();
        fs.add_file("/opt/scoutwarden/.kilocode/sub-memory-bank/tasks/demo.md", "x");
        assert_eq!(
            resolver(&fs).resolve("demo").unwrap(),
            PathBuf::from("/opt/scoutwarden/.kilocode/sub-memory-bank/tasks/demo.md")
        );
    }

    #[test]
    fn cwd_tasks_dir_is_last_resort() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/.kilocode/sub-memory-bank/tasks/demo.md", "x");
        assert_eq!(
            resolver(&fs).resolve("@demo").unwrap(),
            PathBuf::from("/work/.kilocode/sub-memory-bank/tasks/demo.md")
        );
    }

    #[test]
    fn directories_are_not_task_files() {
        let fs = MockFileSystem::new();
        fs.add_dir("/work/demo");
        assert!(matches!(
            resolver(&fs).resolve("demo"),
            Err(WardenError::TaskNotFound(_))
        ));
    }

    #[test]
    fn dot_segments_are_folded_away() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/notes/a.md", "x");
        fs.add_file("/work/.kilocode/sub-memory-bank/tasks/demo.md", "x");
        let r = resolver(&fs);

        assert_eq!(
            r.resolve("/p/tasks/../notes/./a.md").unwrap(),
            PathBuf::from("/p/notes/a.md")
        );
        assert_eq!(
            r.resolve("sub/../.kilocode/sub-memory-bank/tasks/demo.md").unwrap(),
            PathBuf::from("/work/.kilocode/sub-memory-bank/tasks/demo.md")
        );
    }

    #[test]
    fn normalize_stops_at_the_root() {
        assert_eq!(normalize(Path::new("/../a/./b/..")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("../a/../../b")), PathBuf::from("../../b"));
    }

    #[test]
    fn extension_not_doubled() {
        let fs = MockFileSystem::new();
        let r = resolver(&fs);
        assert_eq!(
            r.with_default_extension(Path::new("/t/demo.MD")),
            PathBuf::from("/t/demo.MD")
        );
        assert_eq!(
            r.with_default_extension(Path::new("/t/demo.txt")),
            PathBuf::from("/t/demo.txt.md")
        );
    }
}
