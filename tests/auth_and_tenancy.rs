// tests/auth_and_tenancy.rs

mod common;

use sqlx::PgPool;

use shopfloor::{
    common::error::AppError,
    models::{catalog::CatalogKind, identity::ADMIN_DISPLAY_NAME, operation::ComponentRef},
};

use common::{harness, PASSWORD};

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn duplicate_registration_writes_nothing(pool: PgPool) {
    let h = harness(pool);
    h.admin("Acme", "111").await;

    let same_company = h.state.auth_service.register("Acme", "222", PASSWORD).await;
    assert!(matches!(same_company, Err(AppError::DuplicateCompanyName)));

    let same_login = h.state.auth_service.register("Globex", "111", PASSWORD).await;
    assert!(matches!(same_login, Err(AppError::DuplicateLogin)));

    assert_eq!(h.count("SELECT COUNT(*) FROM companies").await, 1);
    assert_eq!(h.count("SELECT COUNT(*) FROM accounts").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn sessions_carry_role_and_display_name(pool: PgPool) {
    let h = harness(pool);
    let admin = h.admin("Acme", "111").await;
    assert!(admin.is_admin);
    assert_eq!(admin.employee_id, None);
    assert_eq!(admin.display_name, ADMIN_DISPLAY_NAME);

    let (employee, session) = h.hire(&admin, "222", None).await;
    assert!(!session.is_admin);
    assert_eq!(session.employee_id, Some(employee.id));
    assert_eq!(session.company_id, admin.company_id);
    assert_eq!(session.display_name, "Petrenko Ivan");

    let wrong = h.state.auth_service.authenticate("222", "outra").await;
    assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    let unknown = h.state.auth_service.authenticate("999", PASSWORD).await;
    assert!(matches!(unknown, Err(AppError::InvalidCredentials)));

    let (token, _) = h.state.auth_service.authenticate("222", PASSWORD).await.unwrap();
    assert_eq!(h.state.auth_service.validate_token(&token).await.unwrap(), session);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn companies_never_see_each_other(pool: PgPool) {
    let h = harness(pool);
    let acme = h.admin("Acme", "111").await;
    let globex = h.admin("Globex", "222").await;

    let (product, block, _detail) = h.product(&acme, "Bomba").await;
    let tool = h
        .state
        .catalog_service
        .create(CatalogKind::Tool, acme.company_id, "Martelo")
        .await
        .unwrap();

    h.hire(&acme, "333", None).await;
    assert_eq!(h.state.employee_service.list(acme.company_id).await.unwrap().len(), 1);
    assert!(h.state.employee_service.list(globex.company_id).await.unwrap().is_empty());

    assert!(h.state.product_service.list_products(globex.company_id).await.unwrap().is_empty());
    assert!(matches!(
        h.state.product_service.tree(&globex, product.id).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        h.state.product_service.resolve_component(&globex, ComponentRef::Block(block.id)).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        h.state.catalog_service.delete(&globex, CatalogKind::Tool, tool.id).await,
        Err(AppError::Forbidden)
    ));

    // Mesmo nome em outra empresa é permitido.
    h.state
        .product_service
        .create_product(globex.company_id, "Bomba")
        .await
        .unwrap();
    assert!(matches!(
        h.state.product_service.create_product(acme.company_id, "Bomba").await,
        Err(AppError::DuplicateProductName)
    ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a running PostgreSQL (DATABASE_URL)"]
async fn employee_photo_and_account_go_away_together(pool: PgPool) {
    let h = harness(pool);
    let admin = h.admin("Acme", "111").await;

    let (employee, _) = h
        .hire(&admin, "222", Some(common::upload("rosto.jpg", b"jpg")))
        .await;
    let photo_dir = employee.photo_path.clone().unwrap();
    assert!(h.blobs.path().join(&photo_dir).join("rosto.jpg").exists());

    let duplicate = h
        .state
        .employee_service
        .create(
            admin.company_id,
            shopfloor::models::identity::NewEmployee {
                name: "Outro".into(),
                surname: "Nome".into(),
                middle_name: None,
                phone_number: "222".into(),
                password: PASSWORD.into(),
            },
            None,
        )
        .await;
    assert!(matches!(duplicate, Err(AppError::DuplicateLogin)));

    h.state.employee_service.delete(&admin, employee.id).await.unwrap();

    assert_eq!(h.count("SELECT COUNT(*) FROM employees").await, 0);
    assert_eq!(h.count("SELECT COUNT(*) FROM accounts WHERE NOT is_admin").await, 0);
    assert!(!h.blobs.path().join(&photo_dir).exists());
}
