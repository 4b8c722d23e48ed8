// tests/operations_and_products.rs

mod common;

use sqlx::PgPool;

use shopfloor::{
    common::{blob_store::BlobCategory, error::AppError},
    models::{
        catalog::CatalogKind,
        operation::{ComponentKind, ComponentRef, DeletedFiles, InstructionUploads, OperationLinks, OperationUpdate},
        product::DeletedTree,
        task::AssignTaskPayload,
    },
};

use common::{harness, upload};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn update_replaces_files_and_links(pool: PgPool) {
    let h = harness(pool);
    let admin = h.admin("Acme", "111").await;
    let (product, block, detail) = h.product(&admin, "Bomba").await;
    let sibling = h.state.product_service.add_detail(&admin, block.id, "Vizinho").await.unwrap();

    let catalogs = &h.state.catalog_service;
    let bench = catalogs.create(CatalogKind::Location, admin.company_id, "Bancada 3").await.unwrap();
    let hammer = catalogs.create(CatalogKind::Tool, admin.company_id, "Martelo").await.unwrap();
    let wrench = catalogs.create(CatalogKind::Tool, admin.company_id, "Chave").await.unwrap();
    let steel = catalogs.create(CatalogKind::Material, admin.company_id, "Aço").await.unwrap();

    let operation = h.operation(&admin, ComponentRef::Detail(detail.id), &["antes.jpg"]).await;

    let products = &h.state.product_service;
    let candidates = products.dependency_candidates(&admin, ComponentRef::Detail(detail.id)).await.unwrap();
    assert_eq!(candidates.iter().map(|c| c.id).collect::<Vec<_>>(), vec![sibling.id]);
    assert!(products.dependency_candidates(&admin, ComponentRef::Product(product.id)).await.unwrap().is_empty());

    let attached = h
        .state
        .operation_service
        .list_for_component(&admin, ComponentRef::Detail(detail.id))
        .await
        .unwrap();
    assert_eq!(attached.iter().map(|o| o.id).collect::<Vec<_>>(), vec![operation.id]);

    let update = OperationUpdate {
        name: "Soldagem revisada".into(),
        links: OperationLinks {
            location_id: Some(bench.id),
            tool_ids: vec![hammer.id, wrench.id],
            material_ids: vec![steel.id],
            dependencies: vec![ComponentRef::Detail(sibling.id), ComponentRef::Detail(sibling.id)],
        },
        files: InstructionUploads {
            photos: vec![upload("depois.jpg", b"novo")],
            texts: vec![upload("passos.txt", b"1. soldar")],
            ..Default::default()
        },
        deleted_files: DeletedFiles { photo: vec!["antes.jpg".into()], ..Default::default() },
    };

    let ops = &h.state.operation_service;
    ops.update(&admin, operation.id, update.clone()).await.unwrap();
    // Idempotente: repetir leva ao mesmo estado.
    let renamed = ops.update(&admin, operation.id, update).await.unwrap();
    assert_eq!(renamed.name, "Soldagem revisada");

    let detail_view = ops.detail(&admin, operation.id).await.unwrap();
    assert_eq!(detail_view.instruction.photos, vec!["depois.jpg".to_string()]);
    assert_eq!(detail_view.instruction.texts, vec!["passos.txt".to_string()]);
    assert_eq!(detail_view.location_id, Some(bench.id));
    let mut tools = detail_view.tool_ids.clone();
    tools.sort();
    let mut expected = vec![hammer.id, wrench.id];
    expected.sort();
    assert_eq!(tools, expected);
    assert_eq!(detail_view.material_ids, vec![steel.id]);
    assert_eq!(detail_view.dependencies, vec![ComponentRef::Detail(sibling.id)]);

    assert_eq!(h.count("SELECT COUNT(*) FROM tools_for_operation").await, 2);
    assert_eq!(h.count("SELECT COUNT(*) FROM locations_for_operation").await, 1);
    assert_eq!(h.count("SELECT COUNT(*) FROM dependent_components").await, 1);

    let text = ops
        .read_instruction_file(&admin, operation.id, BlobCategory::Texts, "passos.txt")
        .await
        .unwrap();
    assert_eq!(text, b"1. soldar");
    assert!(matches!(
        ops.read_instruction_file(&admin, operation.id, BlobCategory::Photos, "antes.jpg").await,
        Err(AppError::ResourceNotFound(_))
    ));

    // Ferramenta apagada some dos vínculos.
    catalogs.delete(&admin, CatalogKind::Tool, hammer.id).await.unwrap();
    assert_eq!(ops.detail(&admin, operation.id).await.unwrap().tool_ids, vec![wrench.id]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn links_must_belong_to_the_company(pool: PgPool) {
    let h = harness(pool);
    let acme = h.admin("Acme", "111").await;
    let globex = h.admin("Globex", "222").await;
    let (_p, _b, detail) = h.product(&acme, "Bomba").await;
    let foreign_tool = h
        .state
        .catalog_service
        .create(CatalogKind::Tool, globex.company_id, "Martelo")
        .await
        .unwrap();
    let operation = h.operation(&acme, ComponentRef::Detail(detail.id), &[]).await;

    let result = h
        .state
        .operation_service
        .update(
            &acme,
            operation.id,
            OperationUpdate {
                name: "Soldagem".into(),
                links: OperationLinks { tool_ids: vec![foreign_tool.id], ..Default::default() },
                files: Default::default(),
                deleted_files: Default::default(),
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert_eq!(h.count("SELECT COUNT(*) FROM tools_for_operation").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn deleting_a_product_removes_the_whole_tree(pool: PgPool) {
    let h = harness(pool);
    let admin = h.admin("Acme", "111").await;
    let products = &h.state.product_service;

    let product = products.create_product(admin.company_id, "Bomba").await.unwrap();
    for b in 0..2 {
        let block = products.add_block(&admin, product.id, &format!("Bloco {b}")).await.unwrap();
        for d in 0..3 {
            products.add_detail(&admin, block.id, &format!("Detalhe {b}.{d}")).await.unwrap();
        }
    }

    let tree = products.tree(&admin, product.id).await.unwrap();
    assert_eq!(tree.blocks.len(), 2);
    assert!(tree.blocks.iter().all(|b| b.details.len() == 3));

    let deleted = products.delete_product(&admin, product.id).await.unwrap();
    assert_eq!(deleted, DeletedTree { products: 1, blocks: 2, details: 6 });
    assert_eq!(h.count("SELECT COUNT(*) FROM component_index").await, 0);
    assert!(matches!(
        products.tree(&admin, product.id).await,
        Err(AppError::ComponentNotFound(ComponentRef::Product(_)))
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn referenced_products_and_operations_are_kept(pool: PgPool) {
    let h = harness(pool);
    let admin = h.admin("Acme", "111").await;
    let (employee, _) = h.hire(&admin, "222", None).await;
    let (product, block, detail) = h.product(&admin, "Bomba").await;
    let operation = h.operation(&admin, ComponentRef::Block(block.id), &["a.jpg"]).await;

    assert!(matches!(
        h.state.product_service.delete_product(&admin, product.id).await,
        Err(AppError::ProductInUse(id)) if id == product.id
    ));

    let admin_task = h
        .state
        .task_service
        .get_or_create_admin_task(&admin, None, Some(product.id))
        .await
        .unwrap();
    h.state
        .task_service
        .assign_task(
            &admin,
            AssignTaskPayload {
                admin_task_id: admin_task.id,
                component_id: detail.id,
                component_type: ComponentKind::Detail,
                operation_id: operation.id,
                employee_id: employee.id,
            },
        )
        .await
        .unwrap();

    assert!(matches!(
        h.state.operation_service.delete(&admin, operation.id).await,
        Err(AppError::OperationInUse(_))
    ));

    h.state.task_service.delete_admin_task(&admin, admin_task.id).await.unwrap();
    h.state.operation_service.delete(&admin, operation.id).await.unwrap();
    assert_eq!(h.count("SELECT COUNT(*) FROM instructions").await, 0);

    let deleted = h.state.product_service.delete_product(&admin, product.id).await.unwrap();
    assert_eq!(deleted, DeletedTree { products: 1, blocks: 1, details: 1 });
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn dependencies_stay_inside_the_product(pool: PgPool) {
    let h = harness(pool);
    let admin = h.admin("Acme", "111").await;
    let (_pump, block, detail) = h.product(&admin, "Bomba").await;
    let (valve, _valve_block, valve_detail) = h.product(&admin, "Válvula").await;
    let operation = h.operation(&admin, ComponentRef::Block(block.id), &[]).await;
    let ops = &h.state.operation_service;

    let with_dependencies = |dependencies: Vec<ComponentRef>| OperationUpdate {
        name: "Soldagem".into(),
        links: OperationLinks { dependencies, ..Default::default() },
        files: Default::default(),
        deleted_files: Default::default(),
    };

    assert!(matches!(
        ops.update(&admin, operation.id, with_dependencies(vec![ComponentRef::Detail(valve_detail.id)])).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        ops.update(&admin, operation.id, with_dependencies(vec![ComponentRef::Block(block.id)])).await,
        Err(AppError::InvalidInput(_))
    ));
    assert_eq!(h.count("SELECT COUNT(*) FROM dependent_components").await, 0);

    ops.update(&admin, operation.id, with_dependencies(vec![ComponentRef::Detail(detail.id)]))
        .await
        .unwrap();
    assert_eq!(h.count("SELECT COUNT(*) FROM dependent_components").await, 1);

    // Uma dependência gravada apontando para outro produto também o protege.
    sqlx::query(
        "INSERT INTO dependent_components (component_id, component_kind, operation_id) VALUES ($1, 'DETAIL', $2)",
    )
    .bind(valve_detail.id)
    .bind(operation.id)
    .execute(&h.state.db_pool)
    .await
    .unwrap();
    assert!(matches!(
        h.state.product_service.delete_product(&admin, valve.id).await,
        Err(AppError::ProductInUse(id)) if id == valve.id
    ));
    assert_eq!(
        h.count(
            "SELECT COUNT(*) FROM dependent_components dc \
             LEFT JOIN component_index c ON c.kind = dc.component_kind AND c.id = dc.component_id \
             WHERE c.id IS NULL"
        )
        .await,
        0
    );
}
