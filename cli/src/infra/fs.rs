//! Filesystem infrastructure: implements `ModuleStager` and suite loading.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use verify_common::SuiteFile;

use crate::application::ports::{ModuleStager, StagedModule};

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static LOCAL_SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*source\s*=\s*"(\.{1,2}/[^"]*)""#).expect("valid module source regex")
});

/// Entries never copied into a staged module: provider caches, local state
/// and version control metadata.
fn is_local_state(name: &str) -> bool {
    name == ".terraform" || name == ".git" || name.starts_with("terraform.tfstate")
}

/// The directory to copy so that every local `source = "../..."` reference
/// of `module` still resolves inside the copy.
///
/// Follows local sources transitively and returns the deepest directory
/// containing `module` and everything it references. Sources that do not
/// exist are left for terraform to report.
///
/// # Errors
///
/// Returns an error if a directory or `.tf` file cannot be read.
pub fn staging_root(module: &Path) -> Result<PathBuf> {
    let mut root = module.to_path_buf();
    let mut visited = vec![module.to_path_buf()];
    let mut pending = vec![module.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "tf") {
                continue;
            }
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            for caps in LOCAL_SOURCE_RE.captures_iter(&text) {
                let Ok(target) = dir.join(&caps[1]).canonicalize() else {
                    continue;
                };
                if visited.contains(&target) {
                    continue;
                }
                while !target.starts_with(&root) && root.pop() {}
                visited.push(target.clone());
                pending.push(target);
            }
        }
    }
    Ok(root)
}

/// Production filesystem implementation of `ModuleStager`.
pub struct LocalFs;

impl ModuleStager for LocalFs {
    async fn stage(&self, source: &Path) -> Result<StagedModule> {
        let source = source.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let module = source
                .canonicalize()
                .with_context(|| format!("resolving {}", source.display()))?;
            let root = staging_root(&module)?;
            let dir = tempfile::Builder::new()
                .prefix("infra-verify-module-")
                .tempdir()
                .context("creating staging directory")?;
            copy_module(&root, dir.path())
                .with_context(|| format!("staging {}", root.display()))?;
            let relative = module.strip_prefix(&root).unwrap_or(Path::new(""));
            Ok::<StagedModule, anyhow::Error>(StagedModule {
                path: dir.path().join(relative),
                guard: Box::new(dir),
            })
        })
        .await
        .context("spawn_blocking for stage")?
    }
}

/// Recursively copy `src` into `dst`, skipping local state.
///
/// # Errors
///
/// Returns an error if any entry cannot be read or written.
pub fn copy_module(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).with_context(|| format!("creating {}", dst.display()))?;
    for entry in std::fs::read_dir(src).with_context(|| format!("reading {}", src.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        if is_local_state(&name.to_string_lossy()) {
            continue;
        }
        let from = entry.path();
        let to = dst.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copy_module(&from, &to)?;
        } else {
            std::fs::copy(&from, &to)
                .with_context(|| format!("copying {}", from.display()))?;
        }
    }
    Ok(())
}

/// A parsed suite file and the directory its relative module paths start from.
#[derive(Debug)]
pub struct LoadedSuite {
    pub suite: SuiteFile,
    pub base_dir: PathBuf,
}

/// Read and parse a suite file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid suite.
pub fn load_suite(path: &Path) -> Result<LoadedSuite> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read suite {}", path.display()))?;
    let suite: SuiteFile = serde_yaml::from_str(&content)
        .with_context(|| format!("cannot parse suite {}", path.display()))?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    Ok(LoadedSuite { suite, base_dir })
}
