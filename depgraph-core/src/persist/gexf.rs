// GEXF 1.2 encoding.
//
// Node fields other than the label are declared under
// `<attributes class="node">` and written as `<attvalues>`. The persist mode
// is implied by whether a `code_object` attribute is declared.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{BufRead, Write};

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::types::ObjectKind;

use super::{EdgeRecord, FORMAT_VERSION, GraphDocument, NodeRecord, PersistMode};

const NAMESPACE: &str = "http://gexf.net/1.2";
const ATTR_PREFIX: &str = "attr.";

type WriteResult = Result<(), Box<dyn std::error::Error>>;

pub fn write_document<W: Write>(doc: &GraphDocument, writer: W) -> Result<(), String> {
    write_inner(doc, writer).map_err(|e| e.to_string())
}

fn write_inner<W: Write>(doc: &GraphDocument, writer: W) -> WriteResult {
    let mut w = Writer::new_with_indent(writer, b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    w.write_event(Event::Start(
        BytesStart::new("gexf").with_attributes([("xmlns", NAMESPACE), ("version", "1.2")]),
    ))?;

    let date = doc.saved_at.format("%Y-%m-%d").to_string();
    w.write_event(Event::Start(
        BytesStart::new("meta").with_attributes([("lastmodifieddate", date.as_str())]),
    ))?;
    w.create_element("creator")
        .write_text_content(BytesText::new("depgraph"))?;
    w.create_element("description")
        .write_text_content(BytesText::new("call graph"))?;
    w.write_event(Event::End(BytesEnd::new("meta")))?;

    w.write_event(Event::Start(
        BytesStart::new("graph").with_attributes([("mode", "static"), ("defaultedgetype", "directed")]),
    ))?;

    let full = doc.mode == PersistMode::Full;
    let attr_names: BTreeSet<&str> = doc
        .nodes
        .iter()
        .flat_map(|n| n.attributes.keys().map(String::as_str))
        .collect();
    w.write_event(Event::Start(
        BytesStart::new("attributes").with_attributes([("class", "node")]),
    ))?;
    let mut declared = vec![
        ("package".to_string(), "package".to_string()),
        ("kind".to_string(), "kind".to_string()),
    ];
    if full {
        declared.push(("code_object".into(), "code_object".into()));
    }
    declared.extend(
        attr_names
            .iter()
            .map(|name| (format!("{ATTR_PREFIX}{name}"), (*name).to_string())),
    );
    for (id, title) in &declared {
        w.write_event(Event::Empty(BytesStart::new("attribute").with_attributes([
            ("id", id.as_str()),
            ("title", title.as_str()),
            ("type", "string"),
        ])))?;
    }
    w.write_event(Event::End(BytesEnd::new("attributes")))?;

    w.write_event(Event::Start(BytesStart::new("nodes")))?;
    for node in &doc.nodes {
        w.write_event(Event::Start(BytesStart::new("node").with_attributes([
            ("id", node.id.as_str()),
            ("label", node.name.as_str()),
        ])))?;
        w.write_event(Event::Start(BytesStart::new("attvalues")))?;
        let mut values: Vec<(String, String)> = vec![
            ("package".into(), node.package_name.clone()),
            ("kind".into(), node.kind.as_str().into()),
        ];
        if full {
            if let Some(object) = &node.object {
                values.push(("code_object".into(), serde_json::to_string(object)?));
            }
        }
        values.extend(
            node.attributes
                .iter()
                .map(|(k, v)| (format!("{ATTR_PREFIX}{k}"), v.clone())),
        );
        for (key, value) in &values {
            w.write_event(Event::Empty(
                BytesStart::new("attvalue")
                    .with_attributes([("for", key.as_str()), ("value", value.as_str())]),
            ))?;
        }
        w.write_event(Event::End(BytesEnd::new("attvalues")))?;
        w.write_event(Event::End(BytesEnd::new("node")))?;
    }
    w.write_event(Event::End(BytesEnd::new("nodes")))?;

    w.write_event(Event::Start(BytesStart::new("edges")))?;
    for (i, edge) in doc.edges.iter().enumerate() {
        let id = i.to_string();
        w.write_event(Event::Empty(BytesStart::new("edge").with_attributes([
            ("id", id.as_str()),
            ("source", edge.source.as_str()),
            ("target", edge.target.as_str()),
        ])))?;
    }
    w.write_event(Event::End(BytesEnd::new("edges")))?;

    w.write_event(Event::End(BytesEnd::new("graph")))?;
    w.write_event(Event::End(BytesEnd::new("gexf")))?;
    Ok(())
}

// ── Reading ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ParseState {
    saw_root: bool,
    saved_at: Option<DateTime<Utc>>,
    /// Attribute id → title.
    titles: HashMap<String, String>,
    node: Option<NodeRecord>,
    nodes: Vec<NodeRecord>,
    edges: Vec<EdgeRecord>,
    declares_object: bool,
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
        match local.as_ref() {
            b"gexf" => self.saw_root = true,
            b"meta" => {
                let attrs = attributes(e)?;
                self.saved_at = attrs
                    .get("lastmodifieddate")
                    .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc());
            }
            b"attribute" => {
                let mut attrs = attributes(e)?;
                let id = required(&mut attrs, "attribute", "id")?;
                let title = attrs.remove("title").unwrap_or_else(|| id.clone());
                if title == "code_object" {
                    self.declares_object = true;
                }
                self.titles.insert(id, title);
            }
            b"node" => {
                let mut attrs = attributes(e)?;
                let id = required(&mut attrs, "node", "id")?;
                let node = NodeRecord {
                    name: attrs.remove("label").unwrap_or_else(|| id.clone()),
                    id,
                    package_name: String::new(),
                    kind: ObjectKind::Unknown,
                    attributes: BTreeMap::new(),
                    object: None,
                };
                if empty {
                    self.nodes.push(node);
                } else {
                    self.node = Some(node);
                }
            }
            b"attvalue" => {
                let mut attrs = attributes(e)?;
                let key = required(&mut attrs, "attvalue", "for")?;
                let value = attrs.remove("value").unwrap_or_default();
                self.store_value(&key, value)?;
            }
            b"edge" => {
                let mut attrs = attributes(e)?;
                self.edges.push(EdgeRecord {
                    source: required(&mut attrs, "edge", "source")?,
                    target: required(&mut attrs, "edge", "target")?,
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn store_value(&mut self, key: &str, value: String) -> Result<(), String> {
        let Some(node) = self.node.as_mut() else {
            return Ok(());
        };
        let title = self.titles.get(key).map_or(key, String::as_str);
        if key.starts_with(ATTR_PREFIX) {
            node.attributes.insert(title.to_string(), value);
            return Ok(());
        }
        match title {
            "package" => node.package_name = value,
            "kind" => node.kind = ObjectKind::parse(&value),
            "code_object" => {
                let object = serde_json::from_str(&value)
                    .map_err(|e| format!("node {:?}: bad code_object: {e}", node.id))?;
                node.object = Some(object);
            }
            other => {
                node.attributes.insert(other.to_string(), value);
            }
        }
        Ok(())
    }

    fn close(&mut self, element: &[u8]) {
        if element == b"node" {
            if let Some(node) = self.node.take() {
                self.nodes.push(node);
            }
        }
    }

    fn finish(self) -> Result<GraphDocument, String> {
        if !self.saw_root {
            return Err("not a GEXF document (no <gexf> root)".into());
        }
        let mode = if self.declares_object {
            PersistMode::Full
        } else {
            PersistMode::StructureOnly
        };
        Ok(GraphDocument {
            format_version: FORMAT_VERSION,
            mode,
            saved_at: self.saved_at.unwrap_or_default(),
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
            Event::End(e) => state.close(e.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    state.finish()
}
