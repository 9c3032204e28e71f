//! Ownership transfer between the scripting runtime and native code.
//!
//! Every wrapper instance carries a single ownership flag:
//!
//! - script-owned: finalizing the wrapper requests deletion of the native
//!   object
//! - foreign-owned: native code is responsible for the object
//!
//! [`acquire`] and [`release`] overwrite the flag; the last call wins.

use tracing::debug;

use crate::wrapper::WrapperInstance;

/// Ownership of the native object behind a wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    ScriptOwned,
    ForeignOwned,
}

/// Make the scripting side responsible for the native object.
pub fn acquire(instance: &WrapperInstance) {
    instance.set_foreign_owned(false);
    debug!(target: "metabridge::lifecycle", object = ?instance.object_id(), "acquired");
}

/// Hand responsibility for the native object back to native code.
pub fn release(instance: &WrapperInstance) {
    instance.set_foreign_owned(true);
    debug!(target: "metabridge::lifecycle", object = ?instance.object_id(), "released");
}

pub fn ownership(instance: &WrapperInstance) -> Ownership {
    if instance.is_foreign_owned() {
        Ownership::ForeignOwned
    } else {
        Ownership::ScriptOwned
    }
}

/// Called exactly once, when the wrapper is dropped.
pub(crate) fn on_wrapper_finalized(instance: &WrapperInstance) {
    if instance.is_foreign_owned() {
        return;
    }
    debug!(
        target: "metabridge::lifecycle",
        object = ?instance.object_id(),
        class = instance.wrapper_type().name(),
        "deleting script-owned object"
    );
    instance.object().delete_later();
}
