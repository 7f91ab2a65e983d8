//! Transport capability required underneath a compressed stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Byte-stream transport with read-some/write-some semantics.
///
/// `poll_read_some` completes with `Ok(0)` only at end of input (for a
/// non-empty buffer). `poll_write_some` may accept fewer bytes than offered.
pub trait Transport {
    fn poll_read_some(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>>;

    fn poll_write_some(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>>;

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;

    /// Shuts down the write half.
    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T> Transport for T
where
    T: AsyncRead + AsyncWrite + ?Sized,
{
    fn poll_read_some(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let mut read_buf = ReadBuf::new(buf);
        match AsyncRead::poll_read(self, cx, &mut read_buf) {
            Poll::Ready(Ok(())) => Poll::Ready(Ok(read_buf.filled().len())),
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_write_some(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        AsyncWrite::poll_write(self, cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_flush(self, cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncWrite::poll_shutdown(self, cx)
    }
}

#[cfg(feature = "futures-io")]
pub use self::futures_io::FuturesIo;

#[cfg(feature = "futures-io")]
mod futures_io {
    use super::*;
    use pin_project_lite::pin_project;

    pin_project! {
        /// Adapts a `futures::io` stream so it can sit under a compressed stream.
        #[derive(Debug)]
        pub struct FuturesIo<T> {
            #[pin]
            inner: T,
        }
    }

    impl<T> FuturesIo<T> {
        pub fn new(inner: T) -> Self {
            Self { inner }
        }

        pub fn get_ref(&self) -> &T {
            &self.inner
        }

        pub fn get_mut(&mut self) -> &mut T {
            &mut self.inner
        }

        pub fn into_inner(self) -> T {
            self.inner
        }
    }

    impl<T: futures::io::AsyncRead> AsyncRead for FuturesIo<T> {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let unfilled = buf.initialize_unfilled();
            match futures::io::AsyncRead::poll_read(self.project().inner, cx, unfilled) {
                Poll::Ready(Ok(n)) => {
                    buf.advance(n);
                    Poll::Ready(Ok(()))
                }
                Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
                Poll::Pending => Poll::Pending,
            }
        }
    }

    impl<T: futures::io::AsyncWrite> AsyncWrite for FuturesIo<T> {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            futures::io::AsyncWrite::poll_write(self.project().inner, cx, buf)
        }

        fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            futures::io::AsyncWrite::poll_flush(self.project().inner, cx)
        }

        fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            futures::io::AsyncWrite::poll_close(self.project().inner, cx)
        }
    }
}
