//! PPTX (Office Open XML) reader.
//!
//! A `.pptx` is a ZIP container of XML parts linked by relationship files. Slide order comes from
//! `ppt/presentation.xml`; each slide's shape tree, notes and pictures are followed through the
//! slide's `_rels` part. Placeholders without their own transform inherit it from the slide
//! layout, then from the slide master.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;
use zip::result::ZipError;

use crate::deck::DocumentParser;
use crate::deck::model::EmuRect;
use crate::deck::raw::{RawDeck, RawParagraph, RawRun, RawShape, RawShapeKind, RawSlide};
use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Default ceiling on the decompressed size of one package part.
pub const DEFAULT_MAX_PART_BYTES: u64 = 256 * 1024 * 1024;

/// Preallocation cap; the size a ZIP header declares is not trusted beyond this.
const PREALLOC_CAP: u64 = 8 * 1024 * 1024;

struct Archive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
    max_part_bytes: u64,
}

const REL_SLIDE_LAYOUT: &str = "/slideLayout";
const REL_SLIDE_MASTER: &str = "/slideMaster";
const REL_NOTES_SLIDE: &str = "/notesSlide";

/// Parser for PPTX files.
#[derive(Clone, Copy, Debug)]
pub struct PptxParser {
    max_part_bytes: u64,
}

impl Default for PptxParser {
    fn default() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
        }
    }
}

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject documents with any part that decompresses to more than `bytes`.
    pub fn with_max_part_bytes(mut self, bytes: u64) -> Self {
        self.max_part_bytes = bytes;
        self
    }
}

impl DocumentParser for PptxParser {
    #[tracing::instrument(skip_all, fields(bytes = bytes.len()))]
    fn parse(&self, bytes: &[u8]) -> SlidecastResult<RawDeck> {
        let zip = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| SlidecastError::parse(format!("open pptx container: {e}")))?;
        let mut archive = Archive {
            zip,
            max_part_bytes: self.max_part_bytes,
        };

        let presentation = read_part(&mut archive, "ppt/presentation.xml")?;
        let (slide_rids, slide_size_emu) = parse_presentation(&presentation)?;
        let rels = read_rels(&mut archive, "ppt/presentation.xml")?;

        let mut slides = Vec::with_capacity(slide_rids.len());
        for rid in &slide_rids {
            let target = rels
                .get(rid)
                .and_then(|r| r.target.as_deref())
                .ok_or_else(|| {
                    SlidecastError::parse(format!("slide relationship '{rid}' does not resolve"))
                })?;
            slides.push(parse_slide(&mut archive, target)?);
        }

        tracing::debug!(slides = slides.len(), "parsed pptx");
        Ok(RawDeck {
            slides,
            slide_size_emu,
        })
    }
}

#[derive(Clone, Debug)]
struct Relationship {
    rel_type: String,
    /// Archive path of the target part; `None` for external targets.
    target: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Placeholder {
    ph_type: Option<String>,
    idx: Option<u32>,
}

impl Placeholder {
    /// Placeholder type with the OOXML defaults and title/body aliases folded in.
    fn family(&self) -> &str {
        match self.ph_type.as_deref() {
            None | Some("obj") | Some("subTitle") => "body",
            Some("ctrTitle") => "title",
            Some(other) => other,
        }
    }
}

#[derive(Clone, Debug)]
struct ShapeXml {
    kind: RawShapeKind,
    name: Option<String>,
    placeholder: Option<Placeholder>,
    frame: Option<EmuRect>,
    paragraphs: Option<Vec<RawParagraph>>,
    embed: Option<String>,
}

impl ShapeXml {
    fn new(kind: RawShapeKind) -> Self {
        Self {
            kind,
            name: None,
            placeholder: None,
            frame: None,
            paragraphs: None,
            embed: None,
        }
    }

    /// Paragraph texts joined with newlines, runs concatenated.
    fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .flatten()
            .map(|p| p.runs.iter().map(|r| r.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn parse_slide(archive: &mut Archive<'_>, slide_path: &str) -> SlidecastResult<RawSlide> {
    let xml = read_part(archive, slide_path)?;
    let shapes = parse_shape_tree(&xml)
        .map_err(|e| SlidecastError::parse(format!("'{slide_path}': {e}")))?;
    let rels = read_rels(archive, slide_path)?;

    let layout_path = find_rel_target(&rels, REL_SLIDE_LAYOUT);
    let (layout, master) = match layout_path {
        Some(layout_path) => {
            let layout = read_shape_part(archive, &layout_path)?;
            let layout_rels = read_rels(archive, &layout_path)?;
            let master = match find_rel_target(&layout_rels, REL_SLIDE_MASTER) {
                Some(master_path) => read_shape_part(archive, &master_path)?,
                None => Vec::new(),
            };
            (layout, master)
        }
        None => (Vec::new(), Vec::new()),
    };

    let notes = match find_rel_target(&rels, REL_NOTES_SLIDE) {
        Some(notes_path) => read_shape_part(archive, &notes_path)?
            .iter()
            .find(|s| {
                s.placeholder
                    .as_ref()
                    .is_some_and(|p| p.ph_type.as_deref() == Some("body"))
            })
            .map(ShapeXml::plain_text),
        None => None,
    };

    let mut out = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let frame = shape.frame.or_else(|| {
            shape
                .placeholder
                .as_ref()
                .and_then(|ph| inherited_frame(ph, &layout, &master))
        });
        let image = match (&shape.kind, &shape.embed) {
            (RawShapeKind::Picture, Some(rid)) => match rels.get(rid) {
                Some(Relationship {
                    target: Some(target),
                    ..
                }) => Some(Arc::new(read_part_bytes(archive, target)?)),
                Some(Relationship { target: None, .. }) => {
                    tracing::debug!(rid, "picture links an external image");
                    None
                }
                None => {
                    return Err(SlidecastError::parse(format!(
                        "'{slide_path}': picture relationship '{rid}' does not resolve"
                    )));
                }
            },
            _ => None,
        };
        out.push(RawShape {
            kind: shape.kind,
            name: shape.name.unwrap_or_default(),
            frame,
            text_frame: shape.paragraphs,
            image,
        });
    }

    Ok(RawSlide { shapes: out, notes })
}

fn read_shape_part(archive: &mut Archive<'_>, path: &str) -> SlidecastResult<Vec<ShapeXml>> {
    let xml = read_part(archive, path)?;
    parse_shape_tree(&xml).map_err(|e| SlidecastError::parse(format!("'{path}': {e}")))
}

fn inherited_frame(ph: &Placeholder, layout: &[ShapeXml], master: &[ShapeXml]) -> Option<EmuRect> {
    find_placeholder(layout, ph)
        .and_then(|s| s.frame)
        .or_else(|| find_placeholder(master, ph).and_then(|s| s.frame))
}

fn find_placeholder<'a>(shapes: &'a [ShapeXml], ph: &Placeholder) -> Option<&'a ShapeXml> {
    if let Some(idx) = ph.idx
        && let Some(s) = shapes
            .iter()
            .find(|s| s.placeholder.as_ref().and_then(|p| p.idx) == Some(idx))
    {
        return Some(s);
    }
    let family = ph.family();
    shapes.iter().find(|s| {
        s.placeholder
            .as_ref()
            .is_some_and(|p| p.family() == family)
    })
}

fn find_rel_target(rels: &HashMap<String, Relationship>, type_suffix: &str) -> Option<String> {
    rels.values()
        .find(|r| r.rel_type.ends_with(type_suffix))
        .and_then(|r| r.target.clone())
}

fn read_part(archive: &mut Archive<'_>, path: &str) -> SlidecastResult<String> {
    read_part_opt(archive, path)?
        .ok_or_else(|| SlidecastError::parse(format!("missing part '{path}'")))
}

fn read_part_opt(archive: &mut Archive<'_>, path: &str) -> SlidecastResult<Option<String>> {
    let bytes = match read_bytes_opt(archive, path)? {
        Some(b) => b,
        None => return Ok(None),
    };
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| SlidecastError::parse(format!("part '{path}' is not utf-8: {e}")))
}

fn read_part_bytes(archive: &mut Archive<'_>, path: &str) -> SlidecastResult<Vec<u8>> {
    read_bytes_opt(archive, path)?
        .ok_or_else(|| SlidecastError::parse(format!("missing part '{path}'")))
}

fn read_bytes_opt(archive: &mut Archive<'_>, path: &str) -> SlidecastResult<Option<Vec<u8>>> {
    let limit = archive.max_part_bytes;
    let file = match archive.zip.by_name(path) {
        Ok(f) => f,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(SlidecastError::parse(format!("read part '{path}': {e}"))),
    };
    let declared = file.size();
    let mut bytes = Vec::with_capacity(declared.min(limit).min(PREALLOC_CAP) as usize);
    file.take(limit.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| SlidecastError::parse(format!("read part '{path}': {e}")))?;
    if bytes.len() as u64 > limit {
        return Err(SlidecastError::parse(format!(
            "part '{path}' exceeds {limit} bytes when decompressed"
        )));
    }
    Ok(Some(bytes))
}

/// Read the relationships of `part_path`, with targets resolved to archive paths.
///
/// A part without a `_rels` file has no relationships.
fn read_rels(
    archive: &mut Archive<'_>,
    part_path: &str,
) -> SlidecastResult<HashMap<String, Relationship>> {
    let (dir, file) = split_dir(part_path);
    let rels_path = if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    };
    let Some(xml) = read_part_opt(archive, &rels_path)? else {
        return Ok(HashMap::new());
    };

    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let id = attr(e, b"Id", false);
                let rel_type = attr(e, b"Type", false).unwrap_or_default();
                let target = attr(e, b"Target", false);
                let external = attr(e, b"TargetMode", false).as_deref() == Some("External");
                if let (Some(id), Some(target)) = (id, target) {
                    let target = (!external).then(|| resolve_target(dir, &target));
                    rels.insert(id, Relationship { rel_type, target });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SlidecastError::parse(format!(
                    "relationships '{rels_path}': {e}"
                )));
            }
            _ => {}
        }
    }
    Ok(rels)
}

/// Slide relationship ids in presentation order, plus the declared slide size.
fn parse_presentation(xml: &str) -> SlidecastResult<(Vec<String>, Option<(i64, i64)>)> {
    let mut reader = Reader::from_str(xml);
    let mut rids = Vec::new();
    let mut size = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                match local_name(e.name().as_ref()) {
                    b"sldId" => {
                        if let Some(rid) = attr(e, b"id", true) {
                            rids.push(rid);
                        }
                    }
                    b"sldSz" => {
                        size = attr_i64(e, b"cx").zip(attr_i64(e, b"cy"));
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SlidecastError::parse(format!("presentation.xml: {e}"))),
            _ => {}
        }
    }
    Ok((rids, size))
}

/// Streaming reader for a `p:spTree`.
///
/// Only top-level shapes are reported; a group is reported as one opaque shape. Content under
/// `mc:Fallback` duplicates the preceding `mc:Choice` and is skipped.
#[derive(Default)]
struct ShapeTreeReader {
    shapes: Vec<ShapeXml>,
    cur: Option<ShapeXml>,
    depth: usize,
    skip_depth: usize,
    in_xfrm: bool,
    off: Option<(i64, i64)>,
    ext: Option<(i64, i64)>,
    run: Option<RawRun>,
    in_text: bool,
}

fn parse_shape_tree(xml: &str) -> Result<Vec<ShapeXml>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut st = ShapeTreeReader::default();
    loop {
        match reader.read_event()? {
            Event::Start(ref e) => st.open(e, false),
            Event::Empty(ref e) => st.open(e, true),
            Event::End(ref e) => st.close(local_name(e.name().as_ref())),
            Event::Text(ref t) => {
                if st.in_text
                    && let Some(run) = st.run.as_mut()
                {
                    run.text.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(st.shapes)
}

impl ShapeTreeReader {
    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        let qname = e.name();
        let name = local_name(qname.as_ref());
        if self.skip_depth > 0 {
            if !empty {
                self.skip_depth += 1;
            }
            return;
        }
        if name == b"Fallback" {
            if !empty {
                self.skip_depth = 1;
            }
            return;
        }

        let Some(shape) = self.cur.as_mut() else {
            if let Some(kind) = shape_kind(name) {
                self.cur = Some(ShapeXml::new(kind));
                self.depth = 1;
                if empty {
                    self.close(name);
                }
            }
            return;
        };

        if !empty {
            self.depth += 1;
        }
        if name == b"cNvPr" && shape.name.is_none() {
            shape.name = attr(e, b"name", false);
        }
        if shape.kind == RawShapeKind::Group {
            return;
        }

        match name {
            b"ph" => {
                shape.placeholder = Some(Placeholder {
                    ph_type: attr(e, b"type", false),
                    idx: attr(e, b"idx", false).and_then(|v| v.parse().ok()),
                });
            }
            b"xfrm" if !empty && shape.frame.is_none() => {
                self.in_xfrm = true;
                self.off = None;
                self.ext = None;
            }
            b"off" if self.in_xfrm => self.off = attr_i64(e, b"x").zip(attr_i64(e, b"y")),
            b"ext" if self.in_xfrm => self.ext = attr_i64(e, b"cx").zip(attr_i64(e, b"cy")),
            // Only auto shapes own a text frame; table cells inside graphic frames do not count.
            b"txBody" if shape.kind == RawShapeKind::AutoShape && shape.paragraphs.is_none() => {
                shape.paragraphs = Some(Vec::new());
            }
            b"p" | b"br" => {
                if let Some(paragraphs) = shape.paragraphs.as_mut() {
                    paragraphs.push(RawParagraph::default());
                }
            }
            b"r" | b"fld" if shape.paragraphs.is_some() && !empty => {
                self.run = Some(RawRun::default());
            }
            b"rPr" => {
                if let Some(run) = self.run.as_mut() {
                    run.size_centipoints = attr(e, b"sz", false).and_then(|v| v.parse().ok());
                }
            }
            b"t" if self.run.is_some() && !empty => self.in_text = true,
            b"blip" => shape.embed = attr(e, b"embed", true),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        let Some(shape) = self.cur.as_mut() else {
            return;
        };

        match name {
            b"xfrm" if self.in_xfrm => {
                self.in_xfrm = false;
                let (x, y) = self.off.unwrap_or_default();
                let (cx, cy) = self.ext.unwrap_or_default();
                shape.frame = Some(EmuRect::new(x, y, cx, cy));
            }
            b"t" => self.in_text = false,
            b"r" | b"fld" => {
                if let (Some(run), Some(paragraphs)) = (self.run.take(), shape.paragraphs.as_mut())
                {
                    if paragraphs.is_empty() {
                        paragraphs.push(RawParagraph::default());
                    }
                    if let Some(last) = paragraphs.last_mut() {
                        last.runs.push(run);
                    }
                }
            }
            _ => {}
        }

        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0
            && let Some(done) = self.cur.take()
        {
            self.shapes.push(done);
            self.in_xfrm = false;
            self.in_text = false;
            self.run = None;
        }
    }
}

fn shape_kind(local: &[u8]) -> Option<RawShapeKind> {
    match local {
        b"sp" => Some(RawShapeKind::AutoShape),
        b"pic" => Some(RawShapeKind::Picture),
        b"grpSp" => Some(RawShapeKind::Group),
        b"graphicFrame" => Some(RawShapeKind::GraphicFrame),
        b"cxnSp" => Some(RawShapeKind::Connector),
        _ => None,
    }
}

fn local_name(qname: &[u8]) -> &[u8] {
    match qname.iter().position(|&b| b == b':') {
        Some(i) => &qname[i + 1..],
        None => qname,
    }
}

/// Attribute value by local name. `prefixed` selects namespaced (`r:id`) over plain (`id`) keys.
fn attr(e: &BytesStart<'_>, local: &[u8], prefixed: bool) -> Option<String> {
    e.attributes().flatten().find_map(|a| {
        let key = a.key.as_ref();
        let has_prefix = key.contains(&b':');
        if has_prefix == prefixed && local_name(key) == local {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn attr_i64(e: &BytesStart<'_>, local: &[u8]) -> Option<i64> {
    attr(e, local, false).and_then(|v| v.trim().parse().ok())
}

fn split_dir(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return abs.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for seg in target.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

#[cfg(test)]
#[path = "../../tests/unit/deck/pptx.rs"]
mod tests;
