use std::io::{Read, Write};

use super::GraphDocument;

pub fn write_document<W: Write>(doc: &GraphDocument, writer: W) -> Result<(), String> {
    serde_json::to_writer_pretty(writer, doc).map_err(|e| e.to_string())
}

pub fn read_document<R: Read>(reader: R) -> Result<GraphDocument, String> {
    serde_json::from_reader(reader).map_err(|e| e.to_string())
}
