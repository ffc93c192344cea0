#![warn(missing_docs, unused_imports)]

//! The Brakerski-Fan-Vercauteren encryption scheme, restricted to what the
//! multiparty protocols need: parameters with a chain of ciphertext moduli,
//! plaintext encodings, degree-1 ciphertexts and secret/public keys.

mod ciphertext;
mod encoding;
mod keys;
mod parameters;
mod plaintext;

pub use ciphertext::Ciphertext;
pub use encoding::Encoding;
pub use keys::{PublicKey, SecretKey};
pub use parameters::{BfvParameters, BfvParametersBuilder};
pub use plaintext::Plaintext;
