//! Site accounts: registration, login and their storage.

mod json_file;
mod memory;
mod migrate;
mod models;
mod password;
mod service;
mod store;

pub use json_file::JsonFileUserStore;
pub use memory::MemoryUserStore;
pub use migrate::{migrate_legacy_users, parse_legacy_timestamp, MigrationReport};
pub use models::{LegacyUser, StoredUser, User, DEFAULT_DUBINA, STATUS_ACTIVE};
pub use password::{hash_password, verify_password};
pub use service::{
    parse_age, validate_registration, LoginError, LoginRequest, RegistrationError,
    RegistrationRequest, UserService, MAX_AGE, MIN_AGE, MIN_PASSWORD_CHARS, MIN_USERNAME_CHARS,
};
pub use store::UserStore;
