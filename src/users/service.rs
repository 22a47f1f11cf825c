use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::password::{hash_password, verify_password};
use super::{StoredUser, User, UserStore, DEFAULT_DUBINA, STATUS_ACTIVE};
use crate::clock::{Clock, SystemClock};

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 5;
pub const MIN_AGE: i64 = 18;
pub const MAX_AGE: i64 = 120;

/// Text form field. Numbers and booleans are taken as their JSON text; null,
/// arrays and objects count as absent.
fn form_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        value @ (Value::Number(_) | Value::Bool(_)) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

/// Registration form as posted by the site.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    #[serde(default, deserialize_with = "form_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "form_text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "form_text")]
    pub confirm_password: Option<String>,
    /// Number or numeric string.
    pub age: Option<Value>,
    #[serde(default, deserialize_with = "form_text")]
    pub dubina: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "form_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "form_text")]
    pub password: Option<String>,
}

/// Why a registration was refused. Messages are shown to the user as is.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("Братуха, минимум 3 буквы черкани")]
    UsernameTooShort,
    #[error("Укажи свой возраст, кореш")]
    AgeMissing,
    #[error("Возраст должен быть числом")]
    AgeNotANumber,
    #[error("Сюда только 18+, подрасти сначала")]
    TooYoung,
    #[error("Не ври, кореш")]
    TooOld,
    #[error("Слишком мало символов, минимум 5 давай")]
    PasswordTooShort,
    #[error("Пароли не совпадают")]
    PasswordMismatch,
    #[error("У меня уже есть кореш с таким именем")]
    UsernameTaken,
    #[error("Ошибка сервера")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for RegistrationError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Введи логин и пароль, кореш")]
    MissingCredentials,
    #[error("Не знаю таких")]
    UnknownUser,
    #[error("Неверный пароль")]
    WrongPassword,
    #[error("Ошибка сервера")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for LoginError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

/// Interpret the `age` form field. Zero and empty values count as missing.
pub fn parse_age(value: Option<&Value>) -> Result<i64, RegistrationError> {
    match value {
        None | Some(Value::Null) => Err(RegistrationError::AgeMissing),
        Some(Value::String(s)) if s.is_empty() => Err(RegistrationError::AgeMissing),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| RegistrationError::AgeNotANumber),
        Some(Value::Number(n)) => {
            let age = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                .ok_or(RegistrationError::AgeNotANumber)?;
            if age == 0 && n.as_f64() == Some(0.0) {
                Err(RegistrationError::AgeMissing)
            } else {
                Ok(age)
            }
        }
        Some(_) => Err(RegistrationError::AgeNotANumber),
    }
}

/// Validate a registration form, returning the checked age.
///
/// Checks run in a fixed order and the first violation wins.
pub fn validate_registration(request: &RegistrationRequest) -> Result<u32, RegistrationError> {
    let username = request.username.as_deref().unwrap_or_default();
    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(RegistrationError::UsernameTooShort);
    }

    let age = parse_age(request.age.as_ref())?;
    if age < MIN_AGE {
        return Err(RegistrationError::TooYoung);
    }
    if age > MAX_AGE {
        return Err(RegistrationError::TooOld);
    }

    let password = request.password.as_deref().unwrap_or_default();
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(RegistrationError::PasswordTooShort);
    }
    if request.confirm_password.as_deref() != Some(password) {
        return Err(RegistrationError::PasswordMismatch);
    }

    // Bounded by MAX_AGE above.
    Ok(age as u32)
}

/// Registration and login over a [`UserStore`].
pub struct UserService {
    store: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    /// Serializes the check-then-insert of registrations.
    registration_lock: Mutex<()>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock::default()),
            registration_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn register(&self, request: &RegistrationRequest) -> Result<User, RegistrationError> {
        let age = validate_registration(request)?;
        let username = request.username.clone().unwrap_or_default();
        let password = request.password.as_deref().unwrap_or_default();

        let _guard = self.registration_lock.lock().await;

        if self.store.find_by_username(&username).await?.is_some() {
            debug!(username = %username, "registration refused: username taken");
            return Err(RegistrationError::UsernameTaken);
        }

        let user = User {
            id: self.store.next_id().await?,
            username,
            dubina: request
                .dubina
                .clone()
                .unwrap_or_else(|| DEFAULT_DUBINA.to_string()),
            age,
            registered_at: self.clock.now(),
            status: STATUS_ACTIVE.to_string(),
        };
        let stored = StoredUser {
            user: user.clone(),
            password_hash: hash_password(password),
        };
        self.store.save_user(&stored).await?;

        info!(user_id = user.id, username = %user.username, "registered user");
        Ok(user)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<User, LoginError> {
        let (Some(username), Some(password)) = (
            request.username.as_deref().filter(|u| !u.is_empty()),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(LoginError::MissingCredentials);
        };

        let stored = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(LoginError::UnknownUser)?;

        if !verify_password(password, &stored.password_hash) {
            debug!(user_id = stored.id(), "login refused: wrong password");
            return Err(LoginError::WrongPassword);
        }

        info!(user_id = stored.id(), "user logged in");
        Ok(stored.user)
    }

    pub async fn get_user(&self, id: u64) -> Result<Option<User>> {
        Ok(self.store.get_user(id).await?.map(|stored| stored.user))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self
            .store
            .list_users()
            .await?
            .into_iter()
            .map(|stored| stored.user)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::clock::FixedClock;
    use crate::users::MemoryUserStore;

    fn form(username: &str, age: Value, password: &str, confirm: &str) -> RegistrationRequest {
        RegistrationRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            confirm_password: Some(confirm.to_string()),
            age: Some(age),
            dubina: None,
        }
    }

    fn service() -> UserService {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        UserService::new(Arc::new(MemoryUserStore::new())).with_clock(Arc::new(FixedClock::new(now)))
    }

    #[test]
    fn parse_age_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_age(Some(&json!(25))).unwrap(), 25);
        assert_eq!(parse_age(Some(&json!("25"))).unwrap(), 25);
        assert_eq!(parse_age(Some(&json!(" 40 "))).unwrap(), 40);
        assert_eq!(parse_age(Some(&json!(30.9))).unwrap(), 30);
    }

    #[test]
    fn parse_age_treats_empty_values_as_missing() {
        for value in [None, Some(json!(null)), Some(json!("")), Some(json!(0))] {
            assert!(matches!(
                parse_age(value.as_ref()),
                Err(RegistrationError::AgeMissing)
            ));
        }
    }

    #[test]
    fn parse_age_rejects_non_numbers() {
        for value in [json!("abc"), json!("25.5"), json!(true), json!([25])] {
            assert!(matches!(
                parse_age(Some(&value)),
                Err(RegistrationError::AgeNotANumber)
            ));
        }
    }

    #[test]
    fn validation_order_and_messages() {
        let cases = [
            (form("ab", json!(20), "12345", "12345"), "Братуха, минимум 3 буквы черкани"),
            (form("abc", json!(null), "12345", "12345"), "Укажи свой возраст, кореш"),
            (form("abc", json!("old"), "12345", "12345"), "Возраст должен быть числом"),
            (form("abc", json!(17), "1", "2"), "Сюда только 18+, подрасти сначала"),
            (form("abc", json!(121), "12345", "12345"), "Не ври, кореш"),
            (form("abc", json!(18), "1234", "1234"), "Слишком мало символов, минимум 5 давай"),
            (form("abc", json!(120), "12345", "54321"), "Пароли не совпадают"),
        ];
        for (request, message) in cases {
            let err = validate_registration(&request).unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn username_length_counts_characters_not_bytes() {
        // Two Cyrillic letters are four bytes but still too short.
        let err = validate_registration(&form("яя", json!(20), "12345", "12345")).unwrap_err();
        assert!(matches!(err, RegistrationError::UsernameTooShort));
        assert_eq!(
            validate_registration(&form("яяя", json!(20), "12345", "12345")).unwrap(),
            20
        );
    }

    #[test]
    fn form_fields_of_other_json_types_are_kept() {
        let request: RegistrationRequest = serde_json::from_value(json!({
            "username": "vasya",
            "password": 12345,
            "confirmPassword": "12345",
            "age": 30,
            "dubina": 5
        }))
        .unwrap();

        assert_eq!(request.password.as_deref(), Some("12345"));
        assert_eq!(request.dubina.as_deref(), Some("5"));
        assert_eq!(validate_registration(&request).unwrap(), 30);

        let request: RegistrationRequest =
            serde_json::from_value(json!({"username": "vasya", "dubina": null, "password": ["x"]}))
                .unwrap();
        assert_eq!(request.dubina, None);
        assert_eq!(request.password, None);
        assert_eq!(request.confirm_password, None);
    }

    #[tokio::test]
    async fn register_assigns_sequential_ids_and_defaults() {
        let service = service();

        let first = service.register(&form("vasya", json!(30), "12345", "12345")).await.unwrap();
        let mut second_form = form("petya", json!("45"), "qwerty", "qwerty");
        second_form.dubina = Some("бита".to_string());
        let second = service.register(&second_form).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(first.dubina, DEFAULT_DUBINA);
        assert_eq!(first.status, STATUS_ACTIVE);
        assert_eq!(first.registered_at, Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
        assert_eq!(second.id, 2);
        assert_eq!(second.age, 45);
        assert_eq!(second.dubina, "бита");
    }

    #[tokio::test]
    async fn register_refuses_duplicate_username() {
        let service = service();
        service.register(&form("vasya", json!(30), "12345", "12345")).await.unwrap();

        let err = service
            .register(&form("vasya", json!(31), "54321", "54321"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::UsernameTaken));
        assert_eq!(service.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_checks_hash() {
        let service = service();
        let registered = service.register(&form("vasya", json!(30), "12345", "12345")).await.unwrap();

        let ok = service
            .login(&LoginRequest {
                username: Some("vasya".into()),
                password: Some("12345".into()),
            })
            .await
            .unwrap();
        assert_eq!(ok, registered);

        let wrong = service
            .login(&LoginRequest {
                username: Some("vasya".into()),
                password: Some("00000".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(wrong, LoginError::WrongPassword));

        let unknown = service
            .login(&LoginRequest {
                username: Some("kolya".into()),
                password: Some("12345".into()),
            })
            .await
            .unwrap_err();
        assert!(matches!(unknown, LoginError::UnknownUser));

        let missing = service.login(&LoginRequest::default()).await.unwrap_err();
        assert!(matches!(missing, LoginError::MissingCredentials));
    }
}
