use std::io::{Read, Write};

use bincode::Options;

use super::GraphDocument;

/// File magic for the native binary format.
pub const MAGIC: &[u8; 4] = b"DGB1";

/// Upper bound on a decoded payload, so a corrupt length prefix cannot
/// trigger an unbounded allocation.
const MAX_PAYLOAD_BYTES: u64 = 1 << 32;

fn codec() -> impl Options {
    bincode::options().with_limit(MAX_PAYLOAD_BYTES)
}

pub fn write_document<W: Write>(doc: &GraphDocument, mut writer: W) -> Result<(), String> {
    writer.write_all(MAGIC).map_err(|e| e.to_string())?;
    codec()
        .serialize_into(writer, doc)
        .map_err(|e| e.to_string())
}

pub fn read_document<R: Read>(mut reader: R) -> Result<GraphDocument, String> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|_| "file too short for a binary graph".to_string())?;
    if &magic != MAGIC {
        return Err(format!(
            "bad magic {magic:?}, expected {:?}",
            String::from_utf8_lossy(MAGIC)
        ));
    }
    codec()
        .deserialize_from(reader)
        .map_err(|e| format!("corrupt payload: {e}"))
}
