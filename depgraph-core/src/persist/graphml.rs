// GraphML encoding.
//
// Every value is a plain string: name, package and kind per node, the full
// code object as a JSON string in full mode, and one `attr.<name>` key per
// node attribute. Document metadata lives in graph-level data.

use std::collections::{BTreeSet, HashMap};
use std::io::{BufRead, Write};

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::types::ObjectKind;

use super::{EdgeRecord, FORMAT_VERSION, GraphDocument, NodeRecord, PersistMode};

const NAMESPACE: &str = "http://graphml.graphdrawing.org/xmlns";
const ATTR_PREFIX: &str = "attr.";

// ── Writing ────────────────────────────────────────────────────────

pub fn write_document<W: Write>(doc: &GraphDocument, writer: W) -> Result<(), String> {
    write_inner(doc, writer).map_err(|e| e.to_string())
}

fn write_inner<W: Write>(doc: &GraphDocument, writer: W) -> Result<(), Box<dyn std::error::Error>> {
    let mut w = Writer::new_with_indent(writer, b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::Start(
        BytesStart::new("graphml").with_attributes([("xmlns", NAMESPACE)]),
    ))?;

    let full = doc.mode == PersistMode::Full;
    for (id, domain) in [
        ("format_version", "graph"),
        ("mode", "graph"),
        ("saved_at", "graph"),
        ("name", "node"),
        ("package", "node"),
        ("kind", "node"),
    ] {
        write_key(&mut w, id, domain, id)?;
    }
    if full {
        write_key(&mut w, "code_object", "node", "code_object")?;
    }
    let attr_names: BTreeSet<&str> = doc
        .nodes
        .iter()
        .flat_map(|n| n.attributes.keys().map(String::as_str))
        .collect();
    for name in &attr_names {
        write_key(&mut w, &format!("{ATTR_PREFIX}{name}"), "node", name)?;
    }

    w.write_event(Event::Start(
        BytesStart::new("graph").with_attributes([("id", "callgraph"), ("edgedefault", "directed")]),
    ))?;
    write_data(&mut w, "format_version", &doc.format_version.to_string())?;
    write_data(&mut w, "mode", doc.mode.as_str())?;
    write_data(&mut w, "saved_at", &doc.saved_at.to_rfc3339())?;

    for node in &doc.nodes {
        w.write_event(Event::Start(
            BytesStart::new("node").with_attributes([("id", node.id.as_str())]),
        ))?;
        write_data(&mut w, "name", &node.name)?;
        if !node.package_name.is_empty() {
            write_data(&mut w, "package", &node.package_name)?;
        }
        write_data(&mut w, "kind", node.kind.as_str())?;
        if full {
            if let Some(object) = &node.object {
                write_data(&mut w, "code_object", &serde_json::to_string(object)?)?;
            }
        }
        for (key, value) in &node.attributes {
            write_data(&mut w, &format!("{ATTR_PREFIX}{key}"), value)?;
        }
        w.write_event(Event::End(BytesEnd::new("node")))?;
    }

    for edge in &doc.edges {
        w.write_event(Event::Empty(BytesStart::new("edge").with_attributes([
            ("source", edge.source.as_str()),
            ("target", edge.target.as_str()),
        ])))?;
    }

    w.write_event(Event::End(BytesEnd::new("graph")))?;
    w.write_event(Event::End(BytesEnd::new("graphml")))?;
    Ok(())
}

fn write_key<W: Write>(
    w: &mut Writer<W>,
    id: &str,
    domain: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    w.write_event(Event::Empty(BytesStart::new("key").with_attributes([
        ("id", id),
        ("for", domain),
        ("attr.name", name),
        ("attr.type", "string"),
    ])))?;
    Ok(())
}

fn write_data<W: Write>(w: &mut Writer<W>, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    w.create_element("data")
        .with_attribute(("key", key))
        .write_text_content(BytesText::new(value))?;
    Ok(())
}

// ── Reading ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PendingNode {
    id: String,
    data: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct ParseState {
    saw_root: bool,
    /// key id → `attr.name`
    keys: HashMap<String, String>,
    graph_data: Vec<(String, String)>,
    node: Option<PendingNode>,
    /// Key of the `<data>` element being read, with its text so far.
    data: Option<(String, String)>,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
}

fn attributes(e: &BytesStart<'_>) -> Result<HashMap<String, String>, String> {
    let mut out = HashMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        out.insert(key, value);
    }
    Ok(out)
}

fn required(attrs: &mut HashMap<String, String>, element: &str, name: &str) -> Result<String, String> {
    attrs
        .remove(name)
        .ok_or_else(|| format!("<{element}> is missing its {name:?} attribute"))
}

impl ParseState {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) -> Result<(), String> {
        let local = e.local_name();
        let element = String::from_utf8_lossy(local.as_ref()).into_owned();
        match element.as_str() {
            "graphml" => self.saw_root = true,
            "key" => {
                let mut attrs = attributes(e)?;
                let id = required(&mut attrs, "key", "id")?;
                let name = attrs.remove("attr.name").unwrap_or_else(|| id.clone());
                self.keys.insert(id, name);
            }
            "node" => {
                let mut attrs = attributes(e)?;
                let node = PendingNode {
                    id: required(&mut attrs, "node", "id")?,
                    data: Vec::new(),
                };
                if empty {
                    self.nodes.push(Self::finish_node(node)?);
                } else {
                    self.node = Some(node);
                }
            }
            "edge" => {
                let mut attrs = attributes(e)?;
                self.edges.push(EdgeRecord {
                    source: required(&mut attrs, "edge", "source")?,
                    target: required(&mut attrs, "edge", "target")?,
                });
            }
            "data" => {
                let mut attrs = attributes(e)?;
                let key = required(&mut attrs, "data", "key")?;
                if empty {
                    self.store_data(key, String::new());
                } else {
                    self.data = Some((key, String::new()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self, element: &[u8]) -> Result<(), String> {
        match element {
            b"data" => {
                if let Some((key, text)) = self.data.take() {
                    self.store_data(key, text);
                }
            }
            b"node" => {
                if let Some(node) = self.node.take() {
                    self.nodes.push(Self::finish_node(node)?);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        if let Some((_, buf)) = self.data.as_mut() {
            buf.push_str(text);
        }
    }

    fn store_data(&mut self, key: String, value: String) {
        // Node attribute keys are stored under their declared name.
        let resolved = if key.starts_with(ATTR_PREFIX) {
            let name = self
                .keys
                .get(&key)
                .cloned()
                .unwrap_or_else(|| key[ATTR_PREFIX.len()..].to_string());
            format!("{ATTR_PREFIX}{name}")
        } else {
            self.keys.get(&key).cloned().unwrap_or(key)
        };
        match self.node.as_mut() {
            Some(node) => node.data.push((resolved, value)),
            None => self.graph_data.push((resolved, value)),
        }
    }

    fn finish_node(pending: PendingNode) -> Result<NodeRecord, String> {
        let mut record = NodeRecord {
            name: pending.id.clone(),
            id: pending.id,
            package_name: String::new(),
            kind: ObjectKind::Unknown,
            attributes: std::collections::BTreeMap::new(),
            object: None,
        };
        for (key, value) in pending.data {
            match key.as_str() {
                "name" => record.name = value,
                "package" => record.package_name = value,
                "kind" => record.kind = ObjectKind::parse(&value),
                "code_object" => {
                    let object = serde_json::from_str(&value)
                        .map_err(|e| format!("node {:?}: bad code_object: {e}", record.id))?;
                    record.object = Some(object);
                }
                other => {
                    if let Some(name) = other.strip_prefix(ATTR_PREFIX) {
                        record.attributes.insert(name.to_string(), value);
                    } else {
                        record.attributes.insert(other.to_string(), value);
                    }
                }
            }
        }
        Ok(record)
    }

    fn finish(self) -> Result<GraphDocument, String> {
        if !self.saw_root {
            return Err("not a GraphML document (no <graphml> root)".into());
        }
        let mut format_version = FORMAT_VERSION;
        let mut mode = None;
        let mut saved_at = DateTime::<Utc>::default();
        for (key, value) in self.graph_data {
            match key.as_str() {
                "format_version" => {
                    format_version = value
                        .trim()
                        .parse()
                        .map_err(|_| format!("bad format_version {value:?}"))?;
                }
                "mode" => mode = Some(value.parse::<PersistMode>().map_err(|e| e.to_string())?),
                "saved_at" => {
                    saved_at = DateTime::parse_from_rfc3339(value.trim())
                        .map_err(|e| format!("bad saved_at {value:?}: {e}"))?
                        .with_timezone(&Utc);
                }
                _ => {}
            }
        }
        let mode = mode.unwrap_or(if self.nodes.iter().any(|n| n.object.is_some()) {
            PersistMode::Full
        } else {
            PersistMode::StructureOnly
        });
        Ok(GraphDocument {
            format_version,
            mode,
            saved_at,
            nodes: self.nodes,
            edges: self.edges,
        })
    }
}

pub fn read_document<R: BufRead>(reader: R) -> Result<GraphDocument, String> {
    let mut reader = Reader::from_reader(reader);
    let mut buf = Vec::new();
    let mut state = ParseState::default();
    loop {
        match reader.read_event_into(&mut buf).map_err(|e| e.to_string())? {
            Event::Start(e) => state.open(&e, false)?,
            Event::Empty(e) => state.open(&e, true)?,
            Event::End(e) => state.close(e.local_name().as_ref())?,
            Event::Text(t) => state.text(&t.unescape().map_err(|e| e.to_string())?),
            Event::CData(c) => state.text(&String::from_utf8_lossy(&c.into_inner())),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    state.finish()
}

// ── Tests ──────────────────────────────────────────────────────────
