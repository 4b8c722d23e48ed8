// src/common/blob_store.rs

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ---
// Categorias de diretório do armazenamento
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BlobCategory {
    Photos,
    Videos,
    Texts,
    EmployeePhotos,
}

impl BlobCategory {
    pub fn prefix(self) -> &'static str {
        match self {
            BlobCategory::Photos => "photos",
            BlobCategory::Videos => "videos",
            BlobCategory::Texts => "text_instructions",
            BlobCategory::EmployeePhotos => "employee_photos",
        }
    }

    /// Segmento de rota ou nome de campo do multipart -> categoria de instrução.
    pub fn instruction_from_str(raw: &str) -> Option<BlobCategory> {
        match raw {
            "photo" | "photos" => Some(BlobCategory::Photos),
            "video" | "videos" => Some(BlobCategory::Videos),
            "text" | "texts" => Some(BlobCategory::Texts),
            _ => None,
        }
    }

    /// As três categorias que compõem um pacote de instrução.
    pub const INSTRUCTION: [BlobCategory; 3] =
        [BlobCategory::Photos, BlobCategory::Videos, BlobCategory::Texts];
}

/// Remove qualquer componente de caminho do nome enviado pelo cliente.
/// Retorna `None` se não sobrar nada utilizável.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned)
    }
}

// ---
// O contrato do armazenamento opaco (chaveado por caminho relativo)
// ---
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Cria um diretório novo e único sob a categoria e devolve o caminho relativo.
    async fn create_dir(&self, category: BlobCategory) -> io::Result<String>;

    async fn write_file(&self, dir: &str, file_name: &str, bytes: &[u8]) -> io::Result<()>;

    async fn read_file(&self, dir: &str, file_name: &str) -> io::Result<Vec<u8>>;

    /// Apaga um arquivo; `Ok(false)` se ele já não existia.
    async fn delete_file(&self, dir: &str, file_name: &str) -> io::Result<bool>;

    /// Lista os arquivos de um diretório (ordenados). Diretório ausente = lista vazia.
    async fn list_files(&self, dir: &str) -> io::Result<Vec<String>>;

    /// Remove o diretório e tudo dentro dele, se existir.
    async fn remove_dir(&self, dir: &str) -> io::Result<()>;
}

// ---
// Implementação em disco local
// ---
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, dir: &str) -> io::Result<PathBuf> {
        let relative = Path::new(dir);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if dir.is_empty() || !safe {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("caminho de blob inválido: {dir}"),
            ));
        }
        Ok(self.root.join(relative))
    }

    fn resolve_file(&self, dir: &str, file_name: &str) -> io::Result<PathBuf> {
        match sanitize_file_name(file_name) {
            Some(name) if name == file_name => Ok(self.resolve(dir)?.join(name)),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("nome de arquivo inválido: {file_name}"),
            )),
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create_dir(&self, category: BlobCategory) -> io::Result<String> {
        let dir = format!("{}/{}", category.prefix(), Uuid::new_v4().simple());
        tokio::fs::create_dir_all(self.resolve(&dir)?).await?;
        Ok(dir)
    }

    async fn write_file(&self, dir: &str, file_name: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.resolve_file(dir, file_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, bytes).await
    }

    async fn read_file(&self, dir: &str, file_name: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(self.resolve_file(dir, file_name)?).await
    }

    async fn delete_file(&self, dir: &str, file_name: &str) -> io::Result<bool> {
        match tokio::fs::remove_file(self.resolve_file(dir, file_name)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_files(&self, dir: &str) -> io::Result<Vec<String>> {
        let path = self.resolve(dir)?;
        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn remove_dir(&self, dir: &str) -> io::Result<()> {
        let path = self.resolve(dir)?;
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_dir_all(path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("C:\\tmp\\photo.png").as_deref(), Some("photo.png"));
        assert_eq!(sanitize_file_name("step 1.jpg").as_deref(), Some("step 1.jpg"));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("dir/"), None);
    }

    #[test]
    fn instruction_categories_accept_singular_and_plural() {
        assert_eq!(BlobCategory::instruction_from_str("photos"), Some(BlobCategory::Photos));
        assert_eq!(BlobCategory::instruction_from_str("text"), Some(BlobCategory::Texts));
        assert_eq!(BlobCategory::instruction_from_str("employee_photos"), None);
    }

    #[tokio::test]
    async fn write_list_delete_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path());

        let dir = store.create_dir(BlobCategory::Photos).await.unwrap();
        assert!(dir.starts_with("photos/"));

        store.write_file(&dir, "b.png", b"b").await.unwrap();
        store.write_file(&dir, "a.png", b"a").await.unwrap();
        assert_eq!(store.list_files(&dir).await.unwrap(), vec!["a.png", "b.png"]);
        assert_eq!(store.read_file(&dir, "a.png").await.unwrap(), b"a");

        assert!(store.delete_file(&dir, "a.png").await.unwrap());
        assert!(!store.delete_file(&dir, "a.png").await.unwrap());
        assert_eq!(store.list_files(&dir).await.unwrap(), vec!["b.png"]);

        store.remove_dir(&dir).await.unwrap();
        assert!(store.list_files(&dir).await.unwrap().is_empty());
        // Remover de novo não é erro.
        store.remove_dir(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn directories_are_unique_per_call() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path());

        let a = store.create_dir(BlobCategory::Texts).await.unwrap();
        let b = store.create_dir(BlobCategory::Texts).await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("text_instructions/"));
    }

    #[tokio::test]
    async fn rejects_paths_escaping_the_root() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(tmp.path());

        let err = store.list_files("../outside").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let dir = store.create_dir(BlobCategory::Videos).await.unwrap();
        let err = store.write_file(&dir, "../x.mp4", b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
