// src/models/catalog.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Os três catálogos planos por empresa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Location,
    Material,
    Tool,
}

impl CatalogKind {
    pub fn table(self) -> &'static str {
        match self {
            CatalogKind::Location => "locations",
            CatalogKind::Material => "materials",
            CatalogKind::Tool => "tools",
        }
    }

    /// Tabela-ponte com as operações e a coluna que aponta para o catálogo.
    pub fn link_table(self) -> (&'static str, &'static str) {
        match self {
            CatalogKind::Location => ("locations_for_operation", "location_id"),
            CatalogKind::Material => ("materials_for_operation", "material_id"),
            CatalogKind::Tool => ("tools_for_operation", "tool_id"),
        }
    }
}

impl FromStr for CatalogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "location" | "locations" => Ok(CatalogKind::Location),
            "material" | "materials" => Ok(CatalogKind::Material),
            "tool" | "tools" => Ok(CatalogKind::Tool),
            other => Err(format!("catálogo desconhecido '{other}'")),
        }
    }
}

/// Uma linha de qualquer catálogo (localização, material, ferramenta).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: i64,
    #[schema(example = "Furadeira de bancada")]
    pub name: String,
    #[schema(ignore)]
    pub company_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singular_and_plural_path_segments() {
        assert_eq!("tools".parse::<CatalogKind>(), Ok(CatalogKind::Tool));
        assert_eq!("location".parse::<CatalogKind>(), Ok(CatalogKind::Location));
        assert!("widgets".parse::<CatalogKind>().is_err());
    }

    #[test]
    fn link_tables_match_schema() {
        assert_eq!(CatalogKind::Material.link_table(), ("materials_for_operation", "material_id"));
        assert_eq!(CatalogKind::Tool.table(), "tools");
    }
}
