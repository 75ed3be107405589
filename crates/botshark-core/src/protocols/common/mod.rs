pub(crate) mod reader;

pub(crate) use reader::{ByteReader, strip_trailing_zeros, truncated};

pub(crate) fn serialize_hex<S, T>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: AsRef<[u8]>,
{
    serializer.serialize_str(&hex::encode(bytes))
}
