// src/models/operation.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::common::blob_store::BlobCategory;

// --- Enums ---

/// Nível da hierarquia a que uma referência aponta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "component_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Product,
    Block,
    Detail,
}

impl ComponentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Product => "product",
            ComponentKind::Block => "block",
            ComponentKind::Detail => "detail",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" => Ok(ComponentKind::Product),
            "block" => Ok(ComponentKind::Block),
            "detail" => Ok(ComponentKind::Detail),
            other => Err(format!("tipo de componente desconhecido '{other}'")),
        }
    }
}

// --- Referência polimórfica ---

/// Referência a exatamente um nó da hierarquia Produto -> Bloco -> Detalhe.
/// Serializada como `"tipo:id"` (ex.: `"detail:12"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentRef {
    Product(i64),
    Block(i64),
    Detail(i64),
}

impl ComponentRef {
    pub fn new(kind: ComponentKind, id: i64) -> Self {
        match kind {
            ComponentKind::Product => ComponentRef::Product(id),
            ComponentKind::Block => ComponentRef::Block(id),
            ComponentKind::Detail => ComponentRef::Detail(id),
        }
    }

    pub fn kind(self) -> ComponentKind {
        match self {
            ComponentRef::Product(_) => ComponentKind::Product,
            ComponentRef::Block(_) => ComponentKind::Block,
            ComponentRef::Detail(_) => ComponentKind::Detail,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            ComponentRef::Product(id) | ComponentRef::Block(id) | ComponentRef::Detail(id) => id,
        }
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

impl FromStr for ComponentRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("referência '{s}' deve ter o formato tipo:id"))?;
        let kind: ComponentKind = kind.parse()?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| format!("id inválido em '{s}'"))?;
        if id <= 0 {
            return Err(format!("id inválido em '{s}'"));
        }
        Ok(ComponentRef::new(kind, id))
    }
}

impl Serialize for ComponentRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl utoipa::PartialSchema for ComponentRef {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        utoipa::openapi::ObjectBuilder::new()
            .schema_type(utoipa::openapi::schema::Type::String)
            .description(Some("Referência no formato tipo:id, ex.: detail:12"))
            .into()
    }
}

impl ToSchema for ComponentRef {}

/// Remove referências repetidas preservando a ordem da primeira ocorrência.
pub fn dedup_refs(refs: &[ComponentRef]) -> Vec<ComponentRef> {
    let mut seen = std::collections::HashSet::new();
    refs.iter().copied().filter(|r| seen.insert(*r)).collect()
}

// --- Descritor resolvido (linha da view component_index) ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    pub id: i64,
    #[schema(example = "Corpo da bomba")]
    pub name: String,
    /// Produto raiz da árvore (o próprio id quando kind = product).
    pub product_id: i64,
    /// Produto do bloco ou bloco do detalhe; ausente para produtos.
    pub parent_id: Option<i64>,
    #[serde(skip)]
    #[schema(ignore)]
    pub company_id: i64,
}

impl ComponentDescriptor {
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.kind, self.id)
    }
}

// --- Operação ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: i64,
    #[schema(example = "Soldagem do flange")]
    pub name: String,
    pub component_id: i64,
    pub component_kind: ComponentKind,
    #[schema(ignore)]
    pub company_id: i64,
}

impl Operation {
    pub fn component(&self) -> ComponentRef {
        ComponentRef::new(self.component_kind, self.component_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub id: i64,
    pub operation_id: i64,
    pub photo_path: String,
    pub video_path: String,
    pub text_path: String,
}

impl Instruction {
    pub fn dir_for(&self, category: BlobCategory) -> Option<&str> {
        match category {
            BlobCategory::Photos => Some(&self.photo_path),
            BlobCategory::Videos => Some(&self.video_path),
            BlobCategory::Texts => Some(&self.text_path),
            BlobCategory::EmployeePhotos => None,
        }
    }
}

/// Arquivos presentes no pacote de instrução, por categoria.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InstructionFiles {
    pub photos: Vec<String>,
    pub videos: Vec<String>,
    pub texts: Vec<String>,
}

/// A visão completa de uma operação (tela de edição / tela de instrução).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationDetail {
    #[serde(flatten)]
    pub operation: Operation,
    pub component: ComponentDescriptor,
    pub location_id: Option<i64>,
    pub tool_ids: Vec<i64>,
    pub material_ids: Vec<i64>,
    pub dependencies: Vec<ComponentRef>,
    pub instruction: InstructionFiles,
}

// --- Entradas do serviço (montadas pelo handler a partir do multipart) ---

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct InstructionUploads {
    pub photos: Vec<UploadedFile>,
    pub videos: Vec<UploadedFile>,
    pub texts: Vec<UploadedFile>,
}

impl InstructionUploads {
    pub fn for_category(&self, category: BlobCategory) -> &[UploadedFile] {
        match category {
            BlobCategory::Photos => &self.photos,
            BlobCategory::Videos => &self.videos,
            BlobCategory::Texts => &self.texts,
            BlobCategory::EmployeePhotos => &[],
        }
    }
}

/// Arquivos a remover do pacote na atualização.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFiles {
    #[serde(default)]
    pub photo: Vec<String>,
    #[serde(default)]
    pub video: Vec<String>,
    #[serde(default)]
    pub text: Vec<String>,
}

impl DeletedFiles {
    pub fn for_category(&self, category: BlobCategory) -> &[String] {
        match category {
            BlobCategory::Photos => &self.photo,
            BlobCategory::Videos => &self.video,
            BlobCategory::Texts => &self.text,
            BlobCategory::EmployeePhotos => &[],
        }
    }
}

/// Recursos vinculados a uma operação (localização, ferramentas, materiais, dependências).
#[derive(Debug, Clone, Default)]
pub struct OperationLinks {
    pub location_id: Option<i64>,
    pub tool_ids: Vec<i64>,
    pub material_ids: Vec<i64>,
    pub dependencies: Vec<ComponentRef>,
}

#[derive(Debug, Clone)]
pub struct NewOperation {
    pub name: String,
    pub component: ComponentRef,
    pub links: OperationLinks,
    pub files: InstructionUploads,
}

#[derive(Debug, Clone)]
pub struct OperationUpdate {
    pub name: String,
    pub links: OperationLinks,
    pub files: InstructionUploads,
    pub deleted_files: DeletedFiles,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_ref_parses_type_and_id() {
        assert_eq!("detail:12".parse::<ComponentRef>(), Ok(ComponentRef::Detail(12)));
        assert_eq!("Block: 3".parse::<ComponentRef>(), Ok(ComponentRef::Block(3)));
        assert_eq!(ComponentRef::Product(5).to_string(), "product:5");
    }

    #[test]
    fn component_ref_rejects_malformed_input() {
        assert!("detail".parse::<ComponentRef>().is_err());
        assert!("widget:1".parse::<ComponentRef>().is_err());
        assert!("block:abc".parse::<ComponentRef>().is_err());
        assert!("block:0".parse::<ComponentRef>().is_err());
    }

    #[test]
    fn component_ref_serializes_as_string() {
        let json = serde_json::to_string(&vec![ComponentRef::Block(1), ComponentRef::Detail(2)]).unwrap();
        assert_eq!(json, r#"["block:1","detail:2"]"#);
        let back: Vec<ComponentRef> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![ComponentRef::Block(1), ComponentRef::Detail(2)]);
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let refs = [
            ComponentRef::Detail(2),
            ComponentRef::Block(1),
            ComponentRef::Detail(2),
            ComponentRef::Block(1),
            ComponentRef::Detail(3),
        ];
        assert_eq!(
            dedup_refs(&refs),
            vec![ComponentRef::Detail(2), ComponentRef::Block(1), ComponentRef::Detail(3)]
        );
    }

    #[test]
    fn kind_and_id_roundtrip_through_new() {
        for kind in [ComponentKind::Product, ComponentKind::Block, ComponentKind::Detail] {
            let r = ComponentRef::new(kind, 9);
            assert_eq!(r.kind(), kind);
            assert_eq!(r.id(), 9);
        }
    }
}
