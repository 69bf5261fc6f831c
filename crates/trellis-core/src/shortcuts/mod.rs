//! Shortcut collections: ordered lists of typed shortcuts with per-collection
//! uniqueness, an active-collection pointer, and advisory hydration.

mod hydrate;
mod store;


pub use hydrate::{hydrate, HydratedShortcut, ResolvedTarget};
pub use store::{AddOptions, BatchOutcome, ShortcutError, ShortcutStore};

pub(crate) use store::fingerprint;
