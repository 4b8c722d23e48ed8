// src/services/operation_service.rs

use std::{io, sync::Arc};

use sqlx::PgPool;

use crate::{
    common::{
        blob_store::{sanitize_file_name, BlobCategory, BlobStore},
        error::{required_name, AppError},
    },
    db::{OperationRepository, ProductRepository},
    models::{
        catalog::CatalogKind,
        identity::Session,
        operation::{
            dedup_refs, ComponentDescriptor, ComponentRef, DeletedFiles, Instruction, InstructionFiles, InstructionUploads,
            NewOperation, Operation, OperationDetail, OperationLinks, OperationUpdate, UploadedFile,
        },
    },
    services::{catalog_service::CatalogService, product_service::ProductService},
};

/// Os três diretórios de um pacote de instrução.
#[derive(Debug, Clone)]
struct InstructionDirs {
    photo: String,
    video: String,
    text: String,
}

impl InstructionDirs {
    fn from_instruction(instruction: &Instruction) -> Self {
        Self {
            photo: instruction.photo_path.clone(),
            video: instruction.video_path.clone(),
            text: instruction.text_path.clone(),
        }
    }

    fn get(&self, category: BlobCategory) -> &str {
        match category {
            BlobCategory::Photos => &self.photo,
            BlobCategory::Videos => &self.video,
            _ => &self.text,
        }
    }

    fn all(&self) -> [&str; 3] {
        [&self.photo, &self.video, &self.text]
    }
}

#[derive(Clone)]
pub struct OperationService {
    repo: OperationRepository,
    product_repo: ProductRepository,
    products: ProductService,
    catalogs: CatalogService,
    blobs: Arc<dyn BlobStore>,
    pool: PgPool,
}

impl OperationService {
    pub fn new(
        repo: OperationRepository,
        product_repo: ProductRepository,
        products: ProductService,
        catalogs: CatalogService,
        blobs: Arc<dyn BlobStore>,
        pool: PgPool,
    ) -> Self {
        Self { repo, product_repo, products, catalogs, blobs, pool }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn operation(&self, session: &Session, operation_id: i64) -> Result<Operation, AppError> {
        let operation = self
            .repo
            .find_operation(operation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("operation {operation_id}")))?;
        session.ensure_company(operation.company_id)?;
        Ok(operation)
    }

    pub async fn list_for_component(
        &self,
        session: &Session,
        component: ComponentRef,
    ) -> Result<Vec<Operation>, AppError> {
        self.products.resolve_component(session, component).await?;
        self.repo.list_for_component(component).await
    }

    /// Operação + componente resolvido + vínculos + listagem de arquivos.
    pub async fn detail(&self, session: &Session, operation_id: i64) -> Result<OperationDetail, AppError> {
        let operation = self.operation(session, operation_id).await?;
        let component = self.products.resolve_component(session, operation.component()).await?;

        let location_id = self.repo.location_id(operation_id).await?;
        let tool_ids = self.repo.tool_ids(operation_id).await?;
        let material_ids = self.repo.material_ids(operation_id).await?;
        let dependencies = self.repo.dependencies(operation_id).await?;

        let instruction = match self.repo.find_instruction(&self.pool, operation_id).await? {
            Some(instruction) => {
                let dirs = InstructionDirs::from_instruction(&instruction);
                InstructionFiles {
                    photos: self.blobs.list_files(dirs.get(BlobCategory::Photos)).await?,
                    videos: self.blobs.list_files(dirs.get(BlobCategory::Videos)).await?,
                    texts: self.blobs.list_files(dirs.get(BlobCategory::Texts)).await?,
                }
            }
            None => InstructionFiles::default(),
        };

        Ok(OperationDetail {
            operation,
            component,
            location_id,
            tool_ids,
            material_ids,
            dependencies,
            instruction,
        })
    }

    pub async fn read_instruction_file(
        &self,
        session: &Session,
        operation_id: i64,
        category: BlobCategory,
        file_name: &str,
    ) -> Result<Vec<u8>, AppError> {
        self.operation(session, operation_id).await?;
        let not_found = || AppError::ResourceNotFound(format!("file {file_name}"));

        let instruction = self
            .repo
            .find_instruction(&self.pool, operation_id)
            .await?
            .ok_or_else(not_found)?;
        let dir = instruction.dir_for(category).ok_or_else(not_found)?;
        if sanitize_file_name(file_name).as_deref() != Some(file_name) {
            return Err(not_found());
        }

        match self.blobs.read_file(dir, file_name).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Blobs primeiro; depois operação, vínculos e instrução numa só transação.
    pub async fn create(&self, session: &Session, input: NewOperation) -> Result<Operation, AppError> {
        let name = required_name(&input.name)?;
        let target = self.products.resolve_component(session, input.component).await?;
        let links = self.validate_links(session, &target, input.links).await?;
        validate_uploads(&input.files)?;

        let dirs = self.create_dirs().await?;
        if let Err(e) = self.write_uploads(&dirs, &input.files).await {
            self.discard_dirs(&dirs).await;
            return Err(e);
        }

        match self.insert_operation(session.company_id, name, input.component, &links, &dirs).await {
            Ok(operation) => {
                tracing::info!(
                    operation_id = operation.id,
                    component = %input.component,
                    tools = links.tool_ids.len(),
                    materials = links.material_ids.len(),
                    dependencies = links.dependencies.len(),
                    "Operação criada"
                );
                Ok(operation)
            }
            Err(e) => {
                self.discard_dirs(&dirs).await;
                Err(e)
            }
        }
    }

    async fn insert_operation(
        &self,
        company_id: i64,
        name: &str,
        component: ComponentRef,
        links: &OperationLinks,
        dirs: &InstructionDirs,
    ) -> Result<Operation, AppError> {
        let mut tx = self.pool.begin().await?;

        let operation = self.repo.create_operation(&mut *tx, company_id, name, component).await?;
        self.insert_links(&mut tx, operation.id, links).await?;
        self.repo
            .create_instruction(&mut *tx, operation.id, &dirs.photo, &dirs.video, &dirs.text)
            .await?;

        tx.commit().await?;
        Ok(operation)
    }

    /// Troca nome, recria todos os vínculos e ajusta os arquivos do pacote.
    /// Repetir a mesma chamada leva ao mesmo estado final.
    pub async fn update(
        &self,
        session: &Session,
        operation_id: i64,
        input: OperationUpdate,
    ) -> Result<Operation, AppError> {
        let name = required_name(&input.name)?;
        let operation = self.operation(session, operation_id).await?;
        let target = self.products.resolve_component(session, operation.component()).await?;
        let links = self.validate_links(session, &target, input.links).await?;
        validate_uploads(&input.files)?;

        let existing = self.repo.find_instruction(&self.pool, operation_id).await?;
        let (dirs, created) = match &existing {
            Some(instruction) => (InstructionDirs::from_instruction(instruction), false),
            None => (self.create_dirs().await?, true),
        };

        if !created {
            self.delete_named_files(&dirs, &input.deleted_files).await;
        }
        let overwritten = if created {
            Vec::new()
        } else {
            snapshot_overwritten(self.blobs.as_ref(), &dirs, &input.files).await?
        };
        if let Err(e) = self.write_uploads(&dirs, &input.files).await {
            self.rollback_uploads(&dirs, created, &input.files, &overwritten).await;
            return Err(e);
        }

        match self.rewrite_operation(operation_id, name, &links, created.then_some(&dirs)).await {
            Ok(operation) => {
                tracing::info!(
                    operation_id,
                    tools = links.tool_ids.len(),
                    materials = links.material_ids.len(),
                    dependencies = links.dependencies.len(),
                    instruction_created = created,
                    "Operação atualizada"
                );
                Ok(operation)
            }
            Err(e) => {
                self.rollback_uploads(&dirs, created, &input.files, &overwritten).await;
                Err(e)
            }
        }
    }

    async fn rewrite_operation(
        &self,
        operation_id: i64,
        name: &str,
        links: &OperationLinks,
        new_dirs: Option<&InstructionDirs>,
    ) -> Result<Operation, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut operation = self
            .repo
            .lock_operation(&mut *tx, operation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("operation {operation_id}")))?;

        self.repo.rename(&mut *tx, operation_id, name).await?;
        self.repo.clear_links(&mut *tx, operation_id).await?;
        self.insert_links(&mut tx, operation_id, links).await?;

        if let Some(dirs) = new_dirs {
            self.repo
                .create_instruction(&mut *tx, operation_id, &dirs.photo, &dirs.video, &dirs.text)
                .await?;
        }

        tx.commit().await?;

        operation.name = name.to_string();
        Ok(operation)
    }

    /// Recusa se houver tarefas; senão apaga vínculos, instrução e operação, e depois os diretórios.
    pub async fn delete(&self, session: &Session, operation_id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let operation = self
            .repo
            .lock_operation(&mut *tx, operation_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound(format!("operation {operation_id}")))?;
        session.ensure_company(operation.company_id)?;

        if self.repo.count_tasks(&mut *tx, operation_id).await? > 0 {
            return Err(AppError::OperationInUse(operation_id));
        }

        let instruction = self.repo.find_instruction(&mut *tx, operation_id).await?;
        self.repo.clear_links(&mut *tx, operation_id).await?;
        self.repo.delete_instruction(&mut *tx, operation_id).await?;
        self.repo.delete_operation(&mut *tx, operation_id).await?;

        tx.commit().await?;
        tracing::info!(operation_id, "Operação excluída");

        if let Some(instruction) = instruction {
            self.discard_dirs(&InstructionDirs::from_instruction(&instruction)).await;
        }
        Ok(())
    }

    // =========================================================================
    //  AUXILIARES
    // =========================================================================

    /// Catálogos da empresa; dependências sem repetição, dentro do produto do alvo e sem o próprio alvo.
    async fn validate_links(
        &self,
        session: &Session,
        target: &ComponentDescriptor,
        links: OperationLinks,
    ) -> Result<OperationLinks, AppError> {
        let company_id = session.company_id;

        if let Some(location_id) = links.location_id {
            self.catalogs
                .ensure_owned(&self.pool, CatalogKind::Location, company_id, &[location_id])
                .await?;
        }
        self.catalogs
            .ensure_owned(&self.pool, CatalogKind::Tool, company_id, &links.tool_ids)
            .await?;
        self.catalogs
            .ensure_owned(&self.pool, CatalogKind::Material, company_id, &links.material_ids)
            .await?;

        let dependencies = own_dependencies(ComponentRef::new(target.kind, target.id), &links.dependencies)?;
        if !dependencies.is_empty() {
            let found = self
                .product_repo
                .count_in_product(&self.pool, target.product_id, &dependencies)
                .await?;
            if found != dependencies.len() as i64 {
                return Err(AppError::InvalidInput("dependência fora do produto".to_string()));
            }
        }

        Ok(OperationLinks { dependencies, ..links })
    }

    async fn insert_links(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        operation_id: i64,
        links: &OperationLinks,
    ) -> Result<(), AppError> {
        if let Some(location_id) = links.location_id {
            self.repo.insert_location(&mut **tx, operation_id, location_id).await?;
        }
        self.repo.insert_tools(&mut **tx, operation_id, &links.tool_ids).await?;
        self.repo.insert_materials(&mut **tx, operation_id, &links.material_ids).await?;
        self.repo.insert_dependencies(&mut **tx, operation_id, &links.dependencies).await?;
        Ok(())
    }

    async fn create_dirs(&self) -> Result<InstructionDirs, AppError> {
        let photo = self.blobs.create_dir(BlobCategory::Photos).await?;
        let video = match self.blobs.create_dir(BlobCategory::Videos).await {
            Ok(dir) => dir,
            Err(e) => {
                self.discard_dir(&photo).await;
                return Err(e.into());
            }
        };
        let text = match self.blobs.create_dir(BlobCategory::Texts).await {
            Ok(dir) => dir,
            Err(e) => {
                self.discard_dir(&photo).await;
                self.discard_dir(&video).await;
                return Err(e.into());
            }
        };
        Ok(InstructionDirs { photo, video, text })
    }

    async fn write_uploads(&self, dirs: &InstructionDirs, files: &InstructionUploads) -> Result<(), AppError> {
        for category in BlobCategory::INSTRUCTION {
            for file in files.for_category(category) {
                let name = upload_name(file)?;
                self.blobs.write_file(dirs.get(category), &name, &file.bytes).await?;
            }
        }
        Ok(())
    }

    async fn delete_named_files(&self, dirs: &InstructionDirs, deleted: &DeletedFiles) {
        for category in BlobCategory::INSTRUCTION {
            for name in deleted.for_category(category) {
                let Some(clean) = sanitize_file_name(name).filter(|clean| clean == name) else {
                    tracing::warn!(file = %name, "Nome de arquivo inválido ignorado na exclusão");
                    continue;
                };
                if let Err(e) = self.blobs.delete_file(dirs.get(category), &clean).await {
                    tracing::warn!(file = %clean, error = %e, "Falha ao remover arquivo de instrução");
                }
            }
        }
    }

    /// Desfaz o que foi escrito nesta chamada (melhor esforço).
    async fn rollback_uploads(
        &self,
        dirs: &InstructionDirs,
        created: bool,
        files: &InstructionUploads,
        overwritten: &[OverwrittenFile],
    ) {
        if created {
            self.discard_dirs(dirs).await;
            return;
        }
        restore_uploads(self.blobs.as_ref(), dirs, files, overwritten).await;
    }

    async fn discard_dirs(&self, dirs: &InstructionDirs) {
        for dir in dirs.all() {
            self.discard_dir(dir).await;
        }
    }

    async fn discard_dir(&self, dir: &str) {
        if let Err(e) = self.blobs.remove_dir(dir).await {
            tracing::warn!(dir, error = %e, "Falha ao remover diretório de blob");
        }
    }
}

/// Conteúdo anterior de um arquivo que um upload vai sobrescrever.
#[derive(Debug)]
struct OverwrittenFile {
    category: BlobCategory,
    name: String,
    bytes: Vec<u8>,
}

/// Guarda os arquivos existentes que os uploads vão substituir.
async fn snapshot_overwritten(
    blobs: &dyn BlobStore,
    dirs: &InstructionDirs,
    files: &InstructionUploads,
) -> Result<Vec<OverwrittenFile>, AppError> {
    let mut saved: Vec<OverwrittenFile> = Vec::new();
    for category in BlobCategory::INSTRUCTION {
        let uploads = files.for_category(category);
        if uploads.is_empty() {
            continue;
        }
        let dir = dirs.get(category);
        let existing = blobs.list_files(dir).await?;
        for file in uploads {
            let name = upload_name(file)?;
            let already = saved.iter().any(|s| s.category == category && s.name == name);
            if existing.contains(&name) && !already {
                let bytes = blobs.read_file(dir, &name).await?;
                saved.push(OverwrittenFile { category, name, bytes });
            }
        }
    }
    Ok(saved)
}

/// Apaga os arquivos novos e devolve o conteúdo original dos sobrescritos.
async fn restore_uploads(
    blobs: &dyn BlobStore,
    dirs: &InstructionDirs,
    files: &InstructionUploads,
    overwritten: &[OverwrittenFile],
) {
    for category in BlobCategory::INSTRUCTION {
        let dir = dirs.get(category);
        for file in files.for_category(category) {
            let Ok(name) = upload_name(file) else { continue };
            if overwritten.iter().any(|o| o.category == category && o.name == name) {
                continue;
            }
            if let Err(e) = blobs.delete_file(dir, &name).await {
                tracing::warn!(file = %name, error = %e, "Falha ao desfazer upload");
            }
        }
    }
    for original in overwritten {
        if let Err(e) = blobs.write_file(dirs.get(original.category), &original.name, &original.bytes).await {
            tracing::warn!(file = %original.name, error = %e, "Falha ao restaurar arquivo sobrescrito");
        }
    }
}

/// Remove repetições e recusa o próprio componente como dependência.
fn own_dependencies(target: ComponentRef, refs: &[ComponentRef]) -> Result<Vec<ComponentRef>, AppError> {
    if refs.contains(&target) {
        return Err(AppError::InvalidInput(format!("{target} não pode depender de si mesmo")));
    }
    Ok(dedup_refs(refs))
}

fn upload_name(file: &UploadedFile) -> Result<String, AppError> {
    sanitize_file_name(&file.file_name)
        .ok_or_else(|| AppError::InvalidInput(format!("nome de arquivo '{}'", file.file_name)))
}

fn validate_uploads(files: &InstructionUploads) -> Result<(), AppError> {
    for category in BlobCategory::INSTRUCTION {
        for file in files.for_category(category) {
            upload_name(file)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile { file_name: name.into(), bytes: vec![1, 2, 3] }
    }

    #[test]
    fn uploads_with_unusable_names_are_rejected_up_front() {
        let ok = InstructionUploads { photos: vec![upload("a.png")], ..Default::default() };
        assert!(validate_uploads(&ok).is_ok());

        let bad = InstructionUploads { texts: vec![upload("../")], ..Default::default() };
        assert!(matches!(validate_uploads(&bad), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn upload_names_lose_their_directories() {
        assert_eq!(upload_name(&upload("C:\\fotos\\passo1.jpg")).unwrap(), "passo1.jpg");
    }

    #[test]
    fn dirs_map_each_category() {
        let dirs = InstructionDirs {
            photo: "photos/a".into(),
            video: "videos/b".into(),
            text: "text_instructions/c".into(),
        };
        assert_eq!(dirs.get(BlobCategory::Videos), "videos/b");
        assert_eq!(dirs.all(), ["photos/a", "videos/b", "text_instructions/c"]);
    }

    #[test]
    fn a_component_cannot_depend_on_itself() {
        let target = ComponentRef::Block(4);
        assert!(matches!(
            own_dependencies(target, &[ComponentRef::Block(5), ComponentRef::Block(4)]),
            Err(AppError::InvalidInput(_))
        ));
        assert_eq!(
            own_dependencies(target, &[ComponentRef::Block(5), ComponentRef::Detail(4), ComponentRef::Block(5)]).unwrap(),
            vec![ComponentRef::Block(5), ComponentRef::Detail(4)]
        );
    }

    #[tokio::test]
    async fn failed_update_restores_files_it_overwrote() {
        let tmp = tempfile::tempdir().unwrap();
        let store = crate::common::blob_store::FsBlobStore::new(tmp.path());
        let dirs = InstructionDirs {
            photo: store.create_dir(BlobCategory::Photos).await.unwrap(),
            video: store.create_dir(BlobCategory::Videos).await.unwrap(),
            text: store.create_dir(BlobCategory::Texts).await.unwrap(),
        };
        store.write_file(&dirs.photo, "passo1.jpg", b"original").await.unwrap();

        let files = InstructionUploads {
            photos: vec![upload("passo1.jpg"), upload("passo2.jpg")],
            ..Default::default()
        };
        let overwritten = snapshot_overwritten(&store, &dirs, &files).await.unwrap();
        assert_eq!(overwritten.len(), 1);

        for file in &files.photos {
            store.write_file(&dirs.photo, &file.file_name, &file.bytes).await.unwrap();
        }
        restore_uploads(&store, &dirs, &files, &overwritten).await;

        assert_eq!(store.list_files(&dirs.photo).await.unwrap(), vec!["passo1.jpg"]);
        assert_eq!(store.read_file(&dirs.photo, "passo1.jpg").await.unwrap(), b"original");
    }
}
