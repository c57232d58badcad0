use std::{future::Future, time::Duration};

#[cfg(not(any(feature = "rt-tokio", feature = "rt-smol")))]
compile_error!("herdlock requires one of the `rt-tokio` or `rt-smol` features");

#[cfg(feature = "rt-tokio")]
pub(crate) type Interval = tokio::time::Interval;

#[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
pub(crate) type Interval = smol::Timer;

#[cfg(feature = "rt-tokio")]
pub(crate) fn new_interval(sync_interval: Duration) -> Interval {
    tokio::time::interval(sync_interval)
}

#[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
pub(crate) fn new_interval(sync_interval: Duration) -> Interval {
    smol::Timer::interval(sync_interval)
}

#[cfg(feature = "rt-tokio")]
pub(crate) fn spawn_task<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(fut);
}

#[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
pub(crate) fn spawn_task<F>(fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    smol::spawn(fut).detach();
}

#[cfg(feature = "rt-tokio")]
pub(crate) async fn tick(interval: &mut Interval) {
    interval.tick().await;
}

#[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
pub(crate) async fn tick(interval: &mut Interval) {
    use futures::StreamExt;
    interval.next().await;
}

#[cfg(feature = "rt-tokio")]
pub(crate) async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await;
}

#[cfg(all(feature = "rt-smol", not(feature = "rt-tokio")))]
pub(crate) async fn sleep(duration: Duration) {
    smol::Timer::after(duration).await;
}
