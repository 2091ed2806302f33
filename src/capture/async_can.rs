/// Receive side of an async CAN interface. Until the [`embedded-can`] crate
/// supports async, we need to define our own trait.
///
/// The logger never transmits, so only reception is required.
pub trait AsyncCan {
    type Error: core::fmt::Debug;

    type Frame: embedded_can::Frame;

    /// Wait for the next frame on the bus.
    async fn receive(&mut self) -> Result<Self::Frame, Self::Error>;
}

impl<T> AsyncCan for &mut T
where
    T: AsyncCan,
{
    type Error = T::Error;
    type Frame = T::Frame;

    async fn receive(&mut self) -> Result<Self::Frame, Self::Error> {
        (*self).receive().await
    }
}
