use crate::NativeObjectRef;

/// Native event connection primitives.
///
/// Delivery is synchronous: when `source` emits `signal_index`, the event
/// system calls [`NativeObject::meta_call`](crate::NativeObject::meta_call)
/// on every connected receiver with the receiver's method index, on the
/// emitting thread.
pub trait EventSystem: Send + Sync {
    /// Connect `source`'s signal to `receiver`'s method. Returns `false`
    /// if the native framework refuses the connection.
    fn connect(
        &self,
        source: &NativeObjectRef,
        signal_index: usize,
        receiver: &NativeObjectRef,
        method_index: usize,
    ) -> bool;

    /// Remove a connection made by [`EventSystem::connect`].
    fn disconnect(
        &self,
        source: &NativeObjectRef,
        signal_index: usize,
        receiver: &NativeObjectRef,
        method_index: usize,
    ) -> bool;
}
