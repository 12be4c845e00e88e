use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures_util::Stream;
use pin_project_lite::pin_project;
use tokio::time::{Sleep, sleep};

pin_project! {
    /// A stream adapter that waits `delay` before yielding each item.
    pub struct Paced<S> {
        #[pin]
        inner: S,
        #[pin]
        sleep: Option<Sleep>,
        delay: Duration,
    }
}

impl<S> Paced<S> {
    /// Wraps `inner`.
    #[inline]
    pub fn new(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            sleep: None,
            delay,
        }
    }
}

impl<S: Stream> Stream for Paced<S> {
    type Item = S::Item;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if this.sleep.is_none() {
            this.sleep.set(Some(sleep(*this.delay)));
        }
        if let Some(sleep) = this.sleep.as_mut().as_pin_mut() {
            ready!(sleep.poll(cx));
        }

        let item = ready!(this.inner.poll_next(cx));
        this.sleep.set(None);
        Poll::Ready(item)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{StreamExt, stream};
    use tokio::time::Instant;

    use super::*;

    #[tokio::test]
    async fn test_delays_every_item() {
        let started = Instant::now();
        let items: Vec<_> =
            Paced::new(stream::iter([1, 2, 3]), Duration::from_millis(20))
                .collect()
                .await;
        assert_eq!(items, [1, 2, 3]);
        assert!(started.elapsed() >= Duration::from_millis(60));
    }
}
