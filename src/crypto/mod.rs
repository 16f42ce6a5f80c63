//! Primitives behind stored credentials: the field cipher, the password hasher
//! the public identifier allocator and secret comparison.

pub mod cipher;
pub mod compare;
pub mod identity;
pub mod password;

pub use cipher::{Cipher, CipherError};
pub use compare::secrets_match;
pub use password::{PasswordCheck, PasswordError};
