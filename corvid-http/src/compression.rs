//! Response body decompression (spec.md §4.3 step 7).

use crate::error::{Error, ErrorKind};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::Read;

/// Decode a response body according to its `Content-Encoding` header.
///
/// # Errors
///
/// Returns [`ErrorKind::Compression`] if the named encoding is unsupported
/// or the body is malformed for that encoding.
pub fn decode(encoding: Option<&str>, body: Vec<u8>) -> Result<Vec<u8>, Error> {
    match encoding.map(str::trim) {
        None | Some("") | Some("identity") => Ok(body),
        Some("gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(&body[..])
                .read_to_end(&mut out)
                .map_err(|e| Error::new(ErrorKind::Compression, "gzip decode failed").with_source(e))?;
            Ok(out)
        }
        Some("deflate") => {
            let mut out = Vec::new();
            ZlibDecoder::new(&body[..])
                .read_to_end(&mut out)
                .map_err(|e| Error::new(ErrorKind::Compression, "deflate decode failed").with_source(e))?;
            Ok(out)
        }
        #[cfg(feature = "brotli")]
        Some("br") => {
            let mut out = Vec::new();
            brotli_decompressor::Decompressor::new(&body[..], 4096)
                .read_to_end(&mut out)
                .map_err(|e| Error::new(ErrorKind::Compression, "brotli decode failed").with_source(e))?;
            Ok(out)
        }
        Some(other) => Err(Error::new(
            ErrorKind::Compression,
            format!("unsupported content-encoding '{other}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    #[test]
    fn identity_passes_through_untouched() {
        let body = b"hello".to_vec();
        assert_eq!(decode(None, body.clone()).unwrap(), body);
        assert_eq!(decode(Some("identity"), body.clone()).unwrap(), body);
    }

    #[test]
    fn gzip_round_trips() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"discord").unwrap();
        let compressed = encoder.finish().unwrap();

        let decoded = decode(Some("gzip"), compressed).unwrap();
        assert_eq!(decoded, b"discord");
    }

    #[test]
    fn unknown_encoding_is_an_error() {
        let err = decode(Some("zstd"), Vec::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compression);
    }
}
