// src/common/i18n.rs

use std::{collections::HashMap, sync::Arc};

pub const DEFAULT_LANGUAGE: &str = "en";

type Catalog = HashMap<&'static str, &'static str>;

// ---
// Catálogos de mensagens de erro (código -> modelo com {0}, {1}...)
// ---
const EN: &[(&str, &str)] = &[
    ("VALIDATION_ERROR", "One or more fields are invalid."),
    ("INVALID_INPUT", "Invalid input: {0}."),
    ("MISSING_PARAMETER", "Missing parameter: {0}."),
    ("DUPLICATE_COMPANY_NAME", "A company with this name already exists."),
    ("DUPLICATE_LOGIN", "An account with this login already exists."),
    ("DUPLICATE_PRODUCT_NAME", "A product with this name already exists."),
    ("DUPLICATE_NAME", "The name '{0}' is already in use."),
    ("RESOURCE_NOT_FOUND", "Not found: {0}."),
    ("COMPONENT_NOT_FOUND", "Component {0} was not found."),
    ("INVALID_CREDENTIALS", "Invalid login or password."),
    ("INVALID_TOKEN", "Authentication token is invalid or missing."),
    ("FORBIDDEN", "You do not have access to this resource."),
    ("INVALID_TRANSITION", "Cannot {0} a task with status '{1}'."),
    ("ACTIVE_TASK_EXISTS", "Task {0} must be finished first."),
    ("PRODUCT_IN_USE", "Product {0} still has operations or assignments."),
    ("OPERATION_IN_USE", "Operation {0} is still assigned in tasks."),
    ("TASK_REQUIRED", "Task {0} needs your attention first."),
    ("EMPLOYEE_HAS_OPEN_TASKS", "Employee {0} still has unfinished tasks."),
    ("INVALID_UPLOAD", "The uploaded form could not be read."),
    ("STORE_UNAVAILABLE", "The service is temporarily unavailable. Try again."),
    ("INTERNAL_SERVER_ERROR", "An unexpected error occurred."),
];

const UK: &[(&str, &str)] = &[
    ("VALIDATION_ERROR", "Одне або кілька полів заповнені неправильно."),
    ("INVALID_INPUT", "Неправильні дані: {0}."),
    ("MISSING_PARAMETER", "Відсутній параметр: {0}."),
    ("DUPLICATE_COMPANY_NAME", "Компанія з такою назвою вже існує."),
    ("DUPLICATE_LOGIN", "Обліковий запис з таким логіном вже існує."),
    ("DUPLICATE_PRODUCT_NAME", "Виріб з такою назвою вже існує."),
    ("DUPLICATE_NAME", "Назва '{0}' вже використовується."),
    ("RESOURCE_NOT_FOUND", "Не знайдено: {0}."),
    ("COMPONENT_NOT_FOUND", "Компонент {0} не знайдено."),
    ("INVALID_CREDENTIALS", "Неправильний логін або пароль."),
    ("INVALID_TOKEN", "Токен автентифікації недійсний або відсутній."),
    ("FORBIDDEN", "У вас немає доступу до цього ресурсу."),
    ("INVALID_TRANSITION", "Неможливо виконати дію '{0}' для завдання зі статусом '{1}'."),
    ("ACTIVE_TASK_EXISTS", "Спочатку завершіть завдання {0}."),
    ("PRODUCT_IN_USE", "Виріб {0} має операції або призначення."),
    ("OPERATION_IN_USE", "Операція {0} використовується в завданнях."),
    ("TASK_REQUIRED", "Спочатку поверніться до завдання {0}."),
    ("EMPLOYEE_HAS_OPEN_TASKS", "Працівник {0} має незавершені завдання."),
    ("INVALID_UPLOAD", "Не вдалося прочитати завантажену форму."),
    ("STORE_UNAVAILABLE", "Сервіс тимчасово недоступний. Спробуйте ще раз."),
    ("INTERNAL_SERVER_ERROR", "Сталася неочікувана помилка."),
];

/// Armazena as mensagens traduzidas por idioma.
#[derive(Clone)]
pub struct I18nStore {
    catalogs: Arc<HashMap<&'static str, Catalog>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        let mut catalogs = HashMap::new();
        catalogs.insert("en", EN.iter().copied().collect::<Catalog>());
        catalogs.insert("uk", UK.iter().copied().collect::<Catalog>());
        Self {
            catalogs: Arc::new(catalogs),
        }
    }
}

impl I18nStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Traduz `code` para `lang`, caindo para o inglês e depois para o próprio código.
    pub fn translate(&self, lang: &str, code: &str, args: &[String]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|c| c.get(code))
            .or_else(|| {
                self.catalogs
                    .get(DEFAULT_LANGUAGE)
                    .and_then(|c| c.get(code))
            })
            .copied()
            .unwrap_or(code);

        args.iter()
            .enumerate()
            .fold(template.to_string(), |msg, (i, arg)| {
                msg.replace(&format!("{{{}}}", i), arg)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_with_arguments() {
        let store = I18nStore::new();
        let msg = store.translate("en", "DUPLICATE_NAME", &["Drill".to_string()]);
        assert_eq!(msg, "The name 'Drill' is already in use.");
    }

    #[test]
    fn ukrainian_catalog_is_used_when_requested() {
        let store = I18nStore::new();
        let msg = store.translate("uk", "INVALID_CREDENTIALS", &[]);
        assert_eq!(msg, "Неправильний логін або пароль.");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let store = I18nStore::new();
        assert!(!store.supports("pt"));
        let msg = store.translate("pt", "FORBIDDEN", &[]);
        assert_eq!(msg, "You do not have access to this resource.");
    }

    #[test]
    fn unknown_code_is_returned_verbatim() {
        let store = I18nStore::new();
        assert_eq!(store.translate("en", "NOPE", &[]), "NOPE");
    }

    #[test]
    fn every_english_code_has_a_ukrainian_message() {
        let uk: Catalog = UK.iter().copied().collect();
        for (code, _) in EN {
            assert!(uk.contains_key(code), "missing uk message for {code}");
        }
    }
}
