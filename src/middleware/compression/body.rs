//! Streaming compression and decompression bodies.
//!
//! Both directions use write-side codecs from `flate2`, `brotli`, and
//! `zstd` that push their output into a [`SharedBuf`]. The body
//! implementations poll the inner body for frames, feed data through the
//! codec, and drain whatever the codec has produced so far as output
//! frames. Trailer frames pass through untouched after the codec stream is
//! finalized.

use std::io::Write;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use http::HeaderMap;
use http_body::{Body as HttpBody, Frame};

use crate::body::Body;
use crate::error::BoxError;
use crate::middleware::compression::encoding::Encoding;
use crate::middleware::compression::CompressionLevel;

/// Shared output sink for the write-side codecs.
///
/// The codec owns one handle and the body the other, so output written
/// during `write` or finalization is visible to the drain loop.
#[derive(Clone, Default)]
pub(crate) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn take(&self) -> Bytes {
        let mut guard = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if guard.is_empty() {
            Bytes::new()
        } else {
            Bytes::from(std::mem::take(&mut *guard))
        }
    }

    fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

enum Encoder {
    Gzip(flate2::write::GzEncoder<SharedBuf>),
    Deflate(flate2::write::ZlibEncoder<SharedBuf>),
    Brotli(Box<brotli::CompressorWriter<SharedBuf>>),
    Zstd(zstd::stream::write::Encoder<'static, SharedBuf>),
}

impl Encoder {
    fn new(
        encoding: Encoding,
        level: CompressionLevel,
        sink: SharedBuf,
    ) -> Result<Encoder, BoxError> {
        let encoder = match encoding {
            Encoding::Gzip => Encoder::Gzip(flate2::write::GzEncoder::new(
                sink,
                flate2::Compression::new(level.gzip()),
            )),
            Encoding::Deflate => Encoder::Deflate(flate2::write::ZlibEncoder::new(
                sink,
                flate2::Compression::new(level.gzip()),
            )),
            Encoding::Brotli => Encoder::Brotli(Box::new(brotli::CompressorWriter::new(
                sink,
                4096,
                level.brotli(),
                22,
            ))),
            Encoding::Zstd => Encoder::Zstd(zstd::stream::write::Encoder::new(sink, level.zstd())?),
            Encoding::Identity => {
                return Err("identity is not a compressing coding".into());
            }
        };
        Ok(encoder)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BoxError> {
        match self {
            Encoder::Gzip(w) => w.write_all(data)?,
            Encoder::Deflate(w) => w.write_all(data)?,
            Encoder::Brotli(w) => w.write_all(data)?,
            Encoder::Zstd(w) => w.write_all(data)?,
        }
        Ok(())
    }

    /// Flush the final block into the sink. The encoder is consumed.
    fn finish(self) -> Result<(), BoxError> {
        match self {
            Encoder::Gzip(w) => {
                w.finish()?;
            }
            Encoder::Deflate(w) => {
                w.finish()?;
            }
            // The brotli writer emits its final block on drop.
            Encoder::Brotli(mut w) => {
                w.flush()?;
            }
            Encoder::Zstd(w) => {
                w.finish()?;
            }
        }
        Ok(())
    }
}

/// Response body that compresses the inner body's data frames.
///
/// The size hint is left unbounded; the compressed length is not known
/// until the stream completes.
pub struct CompressedBody {
    inner: Body,
    encoder: Option<Encoder>,
    sink: SharedBuf,
    trailers: Option<HeaderMap>,
    done: bool,
}

impl CompressedBody {
    pub(crate) fn new(
        inner: Body,
        encoding: Encoding,
        level: CompressionLevel,
    ) -> Result<CompressedBody, BoxError> {
        let sink = SharedBuf::default();
        let encoder = Encoder::new(encoding, level, sink.clone())?;
        Ok(CompressedBody {
            inner,
            encoder: Some(encoder),
            sink,
            trailers: None,
            done: false,
        })
    }
}

impl HttpBody for CompressedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        let this = self.get_mut();
        loop {
            if !this.sink.is_empty() {
                return Poll::Ready(Some(Ok(Frame::data(this.sink.take()))));
            }
            if this.done {
                return Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))));
            }
            match std::task::ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        if let Some(encoder) = this.encoder.as_mut() {
                            if let Err(e) = encoder.write(&data) {
                                return Poll::Ready(Some(Err(e)));
                            }
                        }
                    }
                    Err(frame) => {
                        if let Ok(trailers) = frame.into_trailers() {
                            this.trailers = Some(trailers);
                        }
                    }
                },
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    this.done = true;
                    if let Some(encoder) = this.encoder.take() {
                        if let Err(e) = encoder.finish() {
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
            }
        }
    }
}

enum Decoder {
    Gzip(flate2::write::GzDecoder<SharedBuf>),
    Deflate(flate2::write::ZlibDecoder<SharedBuf>),
    Brotli(Box<brotli::DecompressorWriter<SharedBuf>>),
    Zstd(zstd::stream::write::Decoder<'static, SharedBuf>),
}

impl Decoder {
    fn new(encoding: Encoding, sink: SharedBuf) -> Result<Decoder, BoxError> {
        let decoder = match encoding {
            Encoding::Gzip => Decoder::Gzip(flate2::write::GzDecoder::new(sink)),
            Encoding::Deflate => Decoder::Deflate(flate2::write::ZlibDecoder::new(sink)),
            Encoding::Brotli => {
                Decoder::Brotli(Box::new(brotli::DecompressorWriter::new(sink, 4096)))
            }
            Encoding::Zstd => Decoder::Zstd(zstd::stream::write::Decoder::new(sink)?),
            Encoding::Identity => {
                return Err("identity is not a compressed coding".into());
            }
        };
        Ok(decoder)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BoxError> {
        match self {
            Decoder::Gzip(w) => w.write_all(data)?,
            Decoder::Deflate(w) => w.write_all(data)?,
            Decoder::Brotli(w) => w.write_all(data)?,
            Decoder::Zstd(w) => w.write_all(data)?,
        }
        Ok(())
    }

    fn finish(self) -> Result<(), BoxError> {
        match self {
            Decoder::Gzip(w) => {
                w.finish()?;
            }
            Decoder::Deflate(w) => {
                w.finish()?;
            }
            Decoder::Brotli(mut w) => {
                w.flush()?;
            }
            Decoder::Zstd(mut w) => {
                w.flush()?;
            }
        }
        Ok(())
    }
}

/// Request body that decompresses the inner body's data frames.
pub struct DecompressedBody {
    inner: Body,
    decoder: Option<Decoder>,
    sink: SharedBuf,
    trailers: Option<HeaderMap>,
    done: bool,
}

impl DecompressedBody {
    pub(crate) fn new(inner: Body, encoding: Encoding) -> Result<DecompressedBody, BoxError> {
        let sink = SharedBuf::default();
        let decoder = Decoder::new(encoding, sink.clone())?;
        Ok(DecompressedBody {
            inner,
            decoder: Some(decoder),
            sink,
            trailers: None,
            done: false,
        })
    }
}

impl HttpBody for DecompressedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        let this = self.get_mut();
        loop {
            if !this.sink.is_empty() {
                return Poll::Ready(Some(Ok(Frame::data(this.sink.take()))));
            }
            if this.done {
                return Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))));
            }
            match std::task::ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        if let Some(decoder) = this.decoder.as_mut() {
                            if let Err(e) = decoder.write(&data) {
                                return Poll::Ready(Some(Err(e)));
                            }
                        }
                    }
                    Err(frame) => {
                        if let Ok(trailers) = frame.into_trailers() {
                            this.trailers = Some(trailers);
                        }
                    }
                },
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    this.done = true;
                    if let Some(decoder) = this.decoder.take() {
                        if let Err(e) = decoder.finish() {
                            return Poll::Ready(Some(Err(e)));
                        }
                    }
                }
            }
        }
    }
}
