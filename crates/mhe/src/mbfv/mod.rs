//! The Multiparty BFV scheme, as described by Christian Mouchet et. al.
//! in [Multiparty Homomorphic Encryption from Ring-Learning-with-Errors](https://eprint.iacr.org/2020/304.pdf).
//!
//! Every protocol runs in a single round: each party allocates a share,
//! generates it locally, and the shares are aggregated pairwise in any order
//! before being used to finalize the protocol. Exchanging the shares between
//! the parties is left to the caller.

mod aggregate;
mod crp;
mod masked_transform;
mod nizk;
mod public_key_gen;
mod public_key_switch;
mod refresh;
mod secret_key_switch;
mod sharing;

pub use aggregate::{Aggregate, AggregateIter};
pub use crp::CommonRandomPoly;
pub use masked_transform::{
    MaskedTransformFunc, MaskedTransformProtocol, MaskedTransformShare,
    NizkMaskedTransformProtocol,
};
pub use nizk::{MaskedTransformRandomness, PublicKeySwitchRandomness, SmudgingRandomness};
pub use public_key_gen::PublicKeyShare;
pub use public_key_switch::{
    NizkPublicKeySwitchProtocol, PublicKeySwitchProtocol, PublicKeySwitchShare,
};
pub use refresh::{NizkRefreshProtocol, RefreshProtocol, RefreshShare};
pub use secret_key_switch::{
    NizkSecretKeySwitchProtocol, SecretKeySwitchProtocol, SecretKeySwitchShare,
};
pub use sharing::{
    AdditiveShare, AggregatedPublicShare, EncryptionToSharesProtocol,
    NizkEncryptionToSharesProtocol, NizkSharesToEncryptionProtocol, SharesToEncryptionProtocol,
};
