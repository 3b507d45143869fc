//! Output contract of a repository: an observable last-value slot.

/// Values a sink can hold. `Default` is the empty value a sink resets to.
pub trait SinkValue: Clone + Default + Send + Sync + 'static {}

impl<T> SinkValue for T where T: Clone + Default + Send + Sync + 'static {}

/// Observable slot holding the latest published value.
///
/// Publishing may happen from any task; readers always observe a complete
/// value.
pub trait Sink<T: SinkValue>: Send + Sync + 'static {
    /// A sink holding the empty value.
    fn empty() -> Self
    where
        Self: Sized;

    /// Replaces the current value.
    fn publish(&self, value: T);

    /// Clone of the current value.
    fn current(&self) -> T;

    /// Resets the sink to the empty value.
    fn reset(&self) {
        self.publish(T::default());
    }
}

/// Family of sinks a repository publishes into.
pub trait SinkKind: Send + Sync + 'static {
    type Slot<T: SinkValue>: Sink<T>;
}
