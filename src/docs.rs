// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::common;
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,

        // --- Employees ---
        handlers::employees::create_employee,
        handlers::employees::list_employees,
        handlers::employees::delete_employee,

        // --- Catalogs ---
        handlers::catalogs::create_item,
        handlers::catalogs::list_items,
        handlers::catalogs::delete_item,

        // --- Products ---
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::product_tree,
        handlers::products::delete_product,
        handlers::products::add_block,
        handlers::products::add_detail,
        handlers::products::resolve_component,
        handlers::products::dependency_candidates,
        handlers::products::list_operations,

        // --- Operations ---
        handlers::operations::create_operation,
        handlers::operations::operation_detail,
        handlers::operations::update_operation,
        handlers::operations::delete_operation,
        handlers::operations::instruction_file,

        // --- Tasks (admin) ---
        handlers::tasks::get_or_create_admin_task,
        handlers::tasks::list_admin_tasks,
        handlers::tasks::admin_task_board,
        handlers::tasks::delete_admin_task,
        handlers::tasks::assign_task,
        handlers::tasks::list_active_alarms,
        handlers::tasks::admin_resolve_alarm,

        // --- Tasks (funcionário) ---
        handlers::tasks::employee_home,
        handlers::tasks::start_task,
        handlers::tasks::finish_task,
        handlers::tasks::raise_alarm,
        handlers::tasks::resolve_alarm,
        handlers::tasks::task_instruction,
        handlers::tasks::task_instruction_file,

        // --- Notifications ---
        handlers::notifications::check_alarm,
        handlers::notifications::alarm_socket,
    ),
    components(
        schemas(
            // --- Identidade ---
            models::identity::Company,
            models::identity::Account,
            models::identity::Employee,
            models::identity::Session,
            models::identity::RegisterPayload,
            models::identity::LoginPayload,
            models::identity::AuthResponse,

            // --- Catálogos ---
            models::catalog::CatalogKind,
            models::catalog::CatalogItem,

            // --- Produtos ---
            models::product::Product,
            models::product::Block,
            models::product::Detail,
            models::product::BlockNode,
            models::product::ProductTree,
            models::product::DeletedTree,
            models::product::NamePayload,

            // --- Operações ---
            models::operation::ComponentKind,
            models::operation::ComponentRef,
            models::operation::ComponentDescriptor,
            models::operation::Operation,
            models::operation::Instruction,
            models::operation::InstructionFiles,
            models::operation::OperationDetail,
            models::operation::DeletedFiles,
            common::blob_store::BlobCategory,

            // --- Tarefas ---
            models::task::TaskStatus,
            models::task::AdminTask,
            models::task::Task,
            models::task::Alarm,
            models::task::TaskView,
            models::task::ActiveAlarm,
            models::task::AdminTaskBoard,
            models::task::AlarmStatus,
            models::task::AssignTaskPayload,
            models::task::RaiseAlarmPayload,
            models::task::BlockingScreen,
            models::task::BlockingTask,
            models::task::EmployeeHome,
        )
    ),
    tags(
        (name = "Auth", description = "Registro da empresa, login e sessão"),
        (name = "Employees", description = "Funcionários e suas contas"),
        (name = "Catalogs", description = "Localizações, materiais e ferramentas"),
        (name = "Products", description = "Hierarquia Produto -> Bloco -> Detalhe"),
        (name = "Operations", description = "Operações e pacotes de instrução"),
        (name = "Tasks", description = "Atribuição e supervisão (admin)"),
        (name = "Employee tasks", description = "Fluxo de trabalho do funcionário"),
        (name = "Notifications", description = "Estado de alarme da empresa")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_routes_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/employee/tasks/{task_id}/start"));
        assert!(doc.paths.paths.contains_key("/api/admin/operations/{operation_id}"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_jwt"));
        assert!(components.schemas.contains_key("OperationDetail"));
    }
}
