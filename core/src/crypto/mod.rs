pub mod types;
pub mod mac;
pub mod aead;
pub mod nonce;
pub mod provider;

pub use types::*;
pub use mac::*;
pub use aead::*;
pub use nonce::*;
pub use provider::*;
