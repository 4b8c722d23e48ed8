// src/models/product.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    #[schema(example = "Bomba centrífuga")]
    pub name: String,
    #[schema(ignore)]
    pub company_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: i64,
    pub name: String,
    pub product_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Detail {
    pub id: i64,
    pub name: String,
    pub block_id: i64,
}

// --- Árvore para a tela do produto ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockNode {
    #[serde(flatten)]
    pub block: Block,
    pub details: Vec<Detail>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductTree {
    #[serde(flatten)]
    pub product: Product,
    pub blocks: Vec<BlockNode>,
}

impl ProductTree {
    /// Monta a árvore a partir das linhas planas (já ordenadas por id).
    pub fn assemble(product: Product, blocks: Vec<Block>, details: Vec<Detail>) -> Self {
        let blocks = blocks
            .into_iter()
            .map(|block| {
                let details = details
                    .iter()
                    .filter(|d| d.block_id == block.id)
                    .cloned()
                    .collect();
                BlockNode { block, details }
            })
            .collect();
        ProductTree { product, blocks }
    }
}

/// Quantas linhas saíram de cada tabela numa exclusão em cascata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedTree {
    pub products: u64,
    pub blocks: u64,
    pub details: u64,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NamePayload {
    #[validate(length(min = 1, max = 128, message = "O nome é obrigatório."))]
    #[schema(example = "Carcaça")]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_groups_details_under_their_block() {
        let product = Product { id: 1, name: "P".into(), company_id: 1 };
        let blocks = vec![
            Block { id: 10, name: "B1".into(), product_id: 1 },
            Block { id: 11, name: "B2".into(), product_id: 1 },
        ];
        let details = vec![
            Detail { id: 100, name: "D1".into(), block_id: 10 },
            Detail { id: 101, name: "D2".into(), block_id: 11 },
            Detail { id: 102, name: "D3".into(), block_id: 10 },
        ];

        let tree = ProductTree::assemble(product, blocks, details);
        assert_eq!(tree.blocks.len(), 2);
        let ids: Vec<i64> = tree.blocks[0].details.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![100, 102]);
        assert_eq!(tree.blocks[1].details.len(), 1);
    }
}
