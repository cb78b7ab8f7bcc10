//! Transaction pipeline: resolve defaults, mutate, build companions, sign

pub mod companion;
pub mod modifier;
pub mod params;
pub mod resolver;
pub mod signer;

pub use companion::{PreSend, PreSendOutput};
pub use modifier::{
    apply_all, Modifier, ModifierContext, Override, PayloadOverride, RecipientOverride,
    ValueOverride,
};
pub use resolver::{FeeHeuristics, ParameterResolver};
