mod auth_service;
mod credential_hasher;
mod refresh_token_store;
mod token_codec;

pub use auth_service::*;
pub use credential_hasher::*;
pub use refresh_token_store::*;
pub use token_codec::*;
