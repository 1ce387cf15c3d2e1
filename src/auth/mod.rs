pub mod service;
pub mod session;
pub mod storage;
pub mod token_store;

pub use service::{AuthService, ChangePasswordRequest, ChangePasswordResponse};
pub use session::{AuthUser, LoginResponse, Session};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage, StorageScope};
pub use token_store::TokenStore;
