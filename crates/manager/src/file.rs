//! Manager backed by a directory of YAML files

use crate::store::ConfigStore;
use crate::traits::PropertyManager;
use crate::yaml::{parse_document, section_names, to_document};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use types::{ManagerError, Result};

const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// One `<name>.yaml` file per namespace under a root directory
#[derive(Debug)]
pub struct FileYamlManager {
    root: PathBuf,
    store: ConfigStore,
}

impl FileYamlManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            store: ConfigStore::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File a namespace is written to. Slashes in the name become dots.
    pub fn file_for(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.yaml", file_stem(name)))
    }

    async fn resources(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| EXTENSIONS.contains(&ext))
                .unwrap_or(false);
            if is_yaml && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    async fn load_file(&mut self, path: &Path) -> Result<String> {
        let stem = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| ManagerError::InvalidDocument {
                namespace: path.display().to_string(),
                message: "file name is not valid UTF-8".to_string(),
            })?
            .to_string();

        let text = tokio::fs::read_to_string(path).await?;
        let name = namespace_for(&stem, &text);
        let tree = parse_document(&name, &text)?;
        self.store.insert(name.clone(), tree);
        Ok(name)
    }
}

fn file_stem(name: &str) -> String {
    name.trim_start_matches('/').replace('/', ".")
}

/// Namespace stored in a file. The document's own section name wins when it
/// maps back to the same file; otherwise the file stem is used as is.
fn namespace_for(stem: &str, text: &str) -> String {
    section_names(text)
        .into_iter()
        .find(|section| file_stem(section) == stem)
        .unwrap_or_else(|| stem.to_string())
}

#[async_trait]
impl PropertyManager for FileYamlManager {
    fn config(&self) -> &ConfigStore {
        &self.store
    }

    fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.store
    }

    async fn load(&mut self) -> Result<()> {
        let files = self.resources().await.map_err(|e| {
            warn!(root = %self.root.display(), error = %e, "Configuration scan failed");
            e
        })?;

        for path in files {
            match self.load_file(&path).await {
                Ok(name) => info!(namespace = %name, "Found configuration"),
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to load configuration"),
            }
        }
        Ok(())
    }

    async fn store_all(&mut self, path: &str) -> Result<()> {
        for name in self.store.names() {
            self.store(path, &name).await?;
        }
        Ok(())
    }

    /// Writes `<path>/<name>.yaml`, or under the root when `path` is empty
    async fn store(&mut self, path: &str, name: &str) -> Result<()> {
        let tree = self.store.get(name).ok_or_else(|| ManagerError::NotFound {
            namespace: name.to_string(),
        })?;
        let text = to_document(name, tree)?;

        let dir = if path.is_empty() {
            self.root.clone()
        } else {
            PathBuf::from(path)
        };
        tokio::fs::create_dir_all(&dir).await?;
        let file = Self::file_for(&dir, name);
        tokio::fs::write(&file, &text).await?;
        info!(namespace = name, file = %file.display(), "Stored configuration");

        if let Some(tree) = self.store.get_mut(name) {
            tree.set_source(Some(text));
        }
        Ok(())
    }

    async fn copy(&mut self, other: &dyn PropertyManager) -> Result<()> {
        self.store.import_from(other.config());
        self.store_all("").await
    }

    async fn get_keys(&self, lookup: &str) -> Vec<String> {
        self.store
            .names()
            .into_iter()
            .filter(|name| name.starts_with(lookup))
            .collect()
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use properties::PropertyTree;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, content: &str) {
        std::fs::write(dir.join(file), content).unwrap();
    }

    #[tokio::test]
    async fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "server.yaml", "server:\n  port: 8080\n");
        write(dir.path(), "client.yml", "client:\n  retries: 2\n");
        write(dir.path(), "broken.yaml", "broken: [oops\n");
        write(dir.path(), "notes.txt", "ignored");

        let mut manager = FileYamlManager::new(dir.path());
        manager.load().await.unwrap();

        assert_eq!(manager.config().names(), vec!["client", "server"]);
        assert_eq!(manager.properties("server").get_int_property("port", 0), 8080);
        assert_eq!(manager.get_keys("ser").await, vec!["server"]);
        assert_eq!(manager.scan_for_default_config("/global/eur").await, "");
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileYamlManager::new(dir.path().join("absent"));
        assert!(matches!(manager.load().await, Err(ManagerError::Io(_))));
    }

    #[tokio::test]
    async fn test_copy_writes_files() {
        let source_dir = TempDir::new().unwrap();
        write(source_dir.path(), "server.yaml", "server:\n  port: 8080\n  global:\n    region: eu\n");
        let mut source = FileYamlManager::new(source_dir.path());
        source.load().await.unwrap();

        let target_dir = TempDir::new().unwrap();
        let mut target = FileYamlManager::new(target_dir.path());
        target.copy(&source).await.unwrap();

        assert_eq!(target.properties_json("server"), source.properties_json("server"));

        let mut reloaded = FileYamlManager::new(target_dir.path());
        reloaded.load().await.unwrap();
        let server = reloaded.properties("server");
        assert_eq!(server.get_int_property("port", 0), 8080);
        assert_eq!(server.get_property("region", ""), "eu");
    }

    #[tokio::test]
    async fn test_update_nested_name() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileYamlManager::new(dir.path());

        let mut tree = PropertyTree::new();
        tree.insert("threads", "{processors}");
        manager.update("", "/global/eur", tree).await.unwrap();

        assert!(dir.path().join("global.eur.yaml").exists());
        assert!(manager.properties("/global/eur").source().is_some());
    }

    #[tokio::test]
    async fn test_rooted_namespace_survives_reload() {
        let dir = TempDir::new().unwrap();
        let mut manager = FileYamlManager::new(dir.path());

        let mut tree = PropertyTree::new();
        tree.insert("threads", 4i64);
        manager.update("", "/global/eur/default", tree).await.unwrap();
        assert!(dir.path().join("global.eur.default.yaml").exists());

        let mut reloaded = FileYamlManager::new(dir.path());
        reloaded.load().await.unwrap();

        assert_eq!(reloaded.config().names(), vec!["/global/eur/default"]);
        assert!(reloaded.contains("/global/eur/default"));
        let section = reloaded.properties("/global/eur/default");
        assert_eq!(section.get_int_property("threads", -1), 4);
        assert!(section.get_long_property(crate::yaml::LOADED_KEY, 0) > 0);
        assert_eq!(
            reloaded.scan_for_default_config("/global/eur/gb").await,
            "/global/eur/default"
        );
    }

    #[tokio::test]
    async fn test_file_stem_used_when_sections_do_not_match() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "legacy.yaml", "other:\n  k: v\n");

        let mut manager = FileYamlManager::new(dir.path());
        manager.load().await.unwrap();

        assert_eq!(manager.config().names(), vec!["legacy"]);
        assert_eq!(manager.properties("legacy").get_property("k", ""), "v");
    }
}
