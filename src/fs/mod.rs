use anyhow::Result;
use ignore::WalkBuilder;
use ignore::overrides::OverrideBuilder;
use std::path::{Path, PathBuf};

/// Traversal settings borrowed from the graph configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkConfig<'a> {
    pub ignore_patterns: &'a [String],
    pub include_patterns: &'a [String],
    pub max_depth: Option<usize>,
}

pub fn walk_directory(path: &Path, ignore_patterns: &[String]) -> Result<Vec<PathBuf>> {
    walk_directory_with_config(
        path,
        WalkConfig {
            ignore_patterns,
            ..Default::default()
        },
    )
}

/// Lists regular files under `path`, sorted, honouring gitignore and the configured globs.
pub fn walk_directory_with_config(path: &Path, config: WalkConfig<'_>) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(path);

    // In the override builder a bare glob whitelists and "!glob" ignores.
    // Ignores go last so they win over includes.
    let mut override_builder = OverrideBuilder::new(path);
    for pattern in config.include_patterns {
        override_builder.add(pattern)?;
    }
    for pattern in config.ignore_patterns {
        override_builder.add(&format!("!{}", pattern))?;
    }
    builder.overrides(override_builder.build()?);
    builder.standard_filters(true);
    builder.max_depth(config.max_depth);

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => log::warn!("Error walking directory: {}", err),
        }
    }

    files.sort();
    Ok(files)
}

/// Repository-relative path with forward slashes.
pub fn relative_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn names(paths: &[PathBuf], root: &Path) -> Vec<String> {
        paths.iter().map(|p| relative_path(p, root)).collect()
    }

    #[test]
    fn test_walk_directory_ignore_logic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        File::create(root.join("include.rs"))?;
        File::create(root.join("exclude.env"))?;
        fs::create_dir(root.join("node_modules"))?;
        File::create(root.join("node_modules/dep.js"))?;

        let paths = walk_directory(root, &["*.env".to_string(), "node_modules".to_string()])?;
        assert_eq!(names(&paths, root), vec!["include.rs"]);

        Ok(())
    }

    #[test]
    fn test_include_patterns_and_depth() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        fs::create_dir_all(root.join("src/deep"))?;
        File::create(root.join("top.py"))?;
        File::create(root.join("src/mid.py"))?;
        File::create(root.join("src/mid.go"))?;
        File::create(root.join("src/deep/low.py"))?;

        let include = vec!["*.py".to_string()];
        let paths = walk_directory_with_config(
            root,
            WalkConfig {
                ignore_patterns: &[],
                include_patterns: &include,
                max_depth: Some(2),
            },
        )?;
        assert_eq!(names(&paths, root), vec!["src/mid.py", "top.py"]);

        Ok(())
    }
}
