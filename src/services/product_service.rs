// src/services/product_service.rs

use sqlx::PgPool;

use crate::{
    common::{
        db_utils::retry_transient,
        error::{required_name, AppError},
    },
    db::ProductRepository,
    models::{
        identity::Session,
        operation::{ComponentDescriptor, ComponentRef},
        product::{Block, DeletedTree, Detail, Product, ProductTree},
    },
};

#[derive(Clone)]
pub struct ProductService {
    repo: ProductRepository,
    pool: PgPool,
}

impl ProductService {
    pub fn new(repo: ProductRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    pub async fn create_product(&self, company_id: i64, name: &str) -> Result<Product, AppError> {
        let name = required_name(name)?;
        if self.repo.name_exists(company_id, name).await? {
            return Err(AppError::DuplicateProductName);
        }
        let product = self.repo.create_product(company_id, name).await?;
        tracing::info!(company_id, product_id = product.id, "Produto criado");
        Ok(product)
    }

    pub async fn list_products(&self, company_id: i64) -> Result<Vec<Product>, AppError> {
        self.repo.list_products(company_id).await
    }

    pub async fn product(&self, session: &Session, product_id: i64) -> Result<Product, AppError> {
        let product = self
            .repo
            .find_product(product_id)
            .await?
            .ok_or(AppError::ComponentNotFound(ComponentRef::Product(product_id)))?;
        session.ensure_company(product.company_id)?;
        Ok(product)
    }

    pub async fn tree(&self, session: &Session, product_id: i64) -> Result<ProductTree, AppError> {
        let product = self.product(session, product_id).await?;
        let blocks = self.repo.list_blocks(product_id).await?;
        let details = self.repo.list_details_for_product(product_id).await?;
        Ok(ProductTree::assemble(product, blocks, details))
    }

    pub async fn add_block(&self, session: &Session, product_id: i64, name: &str) -> Result<Block, AppError> {
        let name = required_name(name)?;
        self.product(session, product_id).await?;
        self.repo.create_block(product_id, name).await
    }

    pub async fn add_detail(&self, session: &Session, block_id: i64, name: &str) -> Result<Detail, AppError> {
        let name = required_name(name)?;
        self.resolve_component(session, ComponentRef::Block(block_id)).await?;
        self.repo.create_detail(block_id, name).await
    }

    /// Apaga detalhes, blocos e o produto; recusa se operações ou aTasks ainda apontam para a árvore.
    pub async fn delete_product(&self, session: &Session, product_id: i64) -> Result<DeletedTree, AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .repo
            .lock_product(&mut *tx, product_id)
            .await?
            .ok_or(AppError::ComponentNotFound(ComponentRef::Product(product_id)))?;
        session.ensure_company(product.company_id)?;

        if self.repo.is_referenced(&mut *tx, product_id).await? {
            return Err(AppError::ProductInUse(product_id));
        }

        let details = self.repo.delete_details_of_product(&mut *tx, product_id).await?;
        let blocks = self.repo.delete_blocks_of_product(&mut *tx, product_id).await?;
        let products = self.repo.delete_product(&mut *tx, product_id).await?;

        tx.commit().await?;

        let deleted = DeletedTree { products, blocks, details };
        tracing::info!(product_id, ?deleted, "Produto excluído em cascata");
        Ok(deleted)
    }

    // --- Referência polimórfica ---

    /// (tipo, id) -> descritor, restrito à empresa da sessão.
    pub async fn resolve_component(
        &self,
        session: &Session,
        component: ComponentRef,
    ) -> Result<ComponentDescriptor, AppError> {
        let descriptor = retry_transient("resolve_component", || {
            self.repo.resolve_component(&self.pool, component)
        })
        .await?
        .ok_or(AppError::ComponentNotFound(component))?;

        session.ensure_company(descriptor.company_id)?;
        Ok(descriptor)
    }

    /// Outros nós do mesmo nível (produtos não têm irmãos).
    pub async fn dependency_candidates(
        &self,
        session: &Session,
        component: ComponentRef,
    ) -> Result<Vec<ComponentDescriptor>, AppError> {
        let descriptor = self.resolve_component(session, component).await?;
        self.repo.siblings(&descriptor).await
    }
}
