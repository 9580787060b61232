use super::*;

const SLIDE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
       xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
       xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"
       xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006">
  <p:cSld><p:spTree>
    <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
    <p:grpSpPr/>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
      <p:spPr/>
      <p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="en-US" sz="4400"/><a:t>Fish &amp; Chips </a:t></a:r><a:r><a:t>today</a:t></a:r></a:p></p:txBody>
    </p:sp>
    <p:pic>
      <p:nvPicPr><p:cNvPr id="3" name="Picture 2"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>
      <p:blipFill><a:blip r:embed="rId2"/></p:blipFill>
      <p:spPr><a:xfrm><a:off x="12700" y="25400"/><a:ext cx="127000" cy="254000"/></a:xfrm></p:spPr>
    </p:pic>
    <p:grpSp>
      <p:nvGrpSpPr><p:cNvPr id="4" name="Group 3"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:sp><p:nvSpPr><p:cNvPr id="5" name="Inner"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:txBody><a:p><a:r><a:t>hidden</a:t></a:r></a:p></p:txBody></p:sp>
    </p:grpSp>
    <mc:AlternateContent>
      <mc:Choice Requires="p14"><p:sp><p:nvSpPr><p:cNvPr id="6" name="Choice"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="10" cy="10"/></a:xfrm></p:spPr></p:sp></mc:Choice>
      <mc:Fallback><p:sp><p:nvSpPr><p:cNvPr id="6" name="Fallback"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr></p:sp></mc:Fallback>
    </mc:AlternateContent>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="7" name="Body"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
      <p:spPr/>
      <p:txBody><a:bodyPr/><a:p><a:r><a:t>one</a:t></a:r><a:br/><a:r><a:t>two</a:t></a:r></a:p><a:p/></p:txBody>
    </p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

#[test]
fn shape_tree_reports_top_level_shapes_in_order() {
    let shapes = parse_shape_tree(SLIDE_XML).unwrap();
    let names: Vec<_> = shapes.iter().map(|s| s.name.clone().unwrap()).collect();
    assert_eq!(names, vec!["Title 1", "Picture 2", "Group 3", "Choice", "Body"]);
    assert_eq!(shapes[2].kind, RawShapeKind::Group);
    assert!(shapes[2].paragraphs.is_none());
}

#[test]
fn shape_tree_reads_runs_sizes_and_entities() {
    let shapes = parse_shape_tree(SLIDE_XML).unwrap();
    let title = &shapes[0];
    assert_eq!(title.placeholder.as_ref().unwrap().family(), "title");
    let paragraphs = title.paragraphs.as_ref().unwrap();
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].runs[0].text, "Fish & Chips ");
    assert_eq!(paragraphs[0].runs[0].size_centipoints, Some(4400));
    assert_eq!(paragraphs[0].runs[1].size_centipoints, None);
    assert_eq!(title.plain_text(), "Fish & Chips today");
    assert!(title.frame.is_none());
}

#[test]
fn line_breaks_split_paragraphs() {
    let shapes = parse_shape_tree(SLIDE_XML).unwrap();
    let body = &shapes[4];
    assert_eq!(body.placeholder.as_ref().unwrap().idx, Some(1));
    assert_eq!(body.plain_text(), "one\ntwo\n");
}

#[test]
fn picture_geometry_and_embed() {
    let shapes = parse_shape_tree(SLIDE_XML).unwrap();
    let pic = &shapes[1];
    assert_eq!(pic.kind, RawShapeKind::Picture);
    assert_eq!(pic.embed.as_deref(), Some("rId2"));
    assert_eq!(pic.frame, Some(EmuRect::new(12_700, 25_400, 127_000, 254_000)));
}

#[test]
fn placeholders_inherit_by_idx_then_family() {
    let mut layout_title = ShapeXml::new(RawShapeKind::AutoShape);
    layout_title.placeholder = Some(Placeholder {
        ph_type: Some("ctrTitle".into()),
        idx: None,
    });
    layout_title.frame = Some(EmuRect::new(1, 2, 3, 4));
    let mut layout_body = ShapeXml::new(RawShapeKind::AutoShape);
    layout_body.placeholder = Some(Placeholder {
        ph_type: None,
        idx: Some(1),
    });
    let mut master_body = ShapeXml::new(RawShapeKind::AutoShape);
    master_body.placeholder = Some(Placeholder {
        ph_type: Some("body".into()),
        idx: None,
    });
    master_body.frame = Some(EmuRect::new(5, 6, 7, 8));
    let layout = vec![layout_title, layout_body];
    let master = vec![master_body];

    let title = Placeholder {
        ph_type: Some("title".into()),
        idx: None,
    };
    assert_eq!(
        inherited_frame(&title, &layout, &master),
        Some(EmuRect::new(1, 2, 3, 4))
    );

    let body = Placeholder {
        ph_type: None,
        idx: Some(1),
    };
    assert_eq!(
        inherited_frame(&body, &layout, &master),
        Some(EmuRect::new(5, 6, 7, 8))
    );

    let footer = Placeholder {
        ph_type: Some("ftr".into()),
        idx: Some(11),
    };
    assert_eq!(inherited_frame(&footer, &layout, &master), None);
}

#[test]
fn presentation_order_and_size() {
    let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r">
        <p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>
        <p:sldIdLst><p:sldId id="257" r:id="rId7"/><p:sldId id="256" r:id="rId2"/></p:sldIdLst>
        <p:sldSz cx="12192000" cy="6858000"/>
    </p:presentation>"#;
    let (rids, size) = parse_presentation(xml).unwrap();
    assert_eq!(rids, vec!["rId7", "rId2"]);
    assert_eq!(size, Some((12_192_000, 6_858_000)));
}

#[test]
fn relationship_targets_resolve_against_source_dir() {
    assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
    assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
    assert_eq!(resolve_target("ppt/slides", "/ppt/media/x.png"), "ppt/media/x.png");
    assert_eq!(split_dir("ppt/presentation.xml"), ("ppt", "presentation.xml"));
}

#[test]
fn non_zip_input_is_a_parse_error() {
    let err = PptxParser::new().parse(b"definitely not a zip").unwrap_err();
    assert!(matches!(err, SlidecastError::Parse(_)));
}

#[test]
fn table_cells_do_not_become_a_text_frame() {
    let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree>
      <p:graphicFrame>
        <p:nvGraphicFramePr><p:cNvPr id="2" name="Table 1"/></p:nvGraphicFramePr>
        <p:xfrm><a:off x="0" y="0"/><a:ext cx="100" cy="50"/></p:xfrm>
        <a:graphic><a:graphicData><a:tbl><a:tr>
          <a:tc><a:txBody><a:p><a:r><a:t>CellA</a:t></a:r></a:p></a:txBody></a:tc>
          <a:tc><a:txBody><a:p><a:r><a:t>CellB</a:t></a:r></a:p></a:txBody></a:tc>
        </a:tr></a:tbl></a:graphicData></a:graphic>
      </p:graphicFrame>
    </p:spTree></p:cSld></p:sld>"#;
    let shapes = parse_shape_tree(xml).unwrap();
    assert_eq!(shapes.len(), 1);
    assert_eq!(shapes[0].kind, RawShapeKind::GraphicFrame);
    assert!(shapes[0].paragraphs.is_none());
    assert_eq!(shapes[0].frame, Some(EmuRect::new(0, 0, 100, 50)));
}

fn zip_with(name: &str, body: &[u8]) -> Vec<u8> {
    use std::io::Write as _;
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(name, zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(body).unwrap();
    zip.finish().unwrap().into_inner()
}

#[test]
fn oversized_part_is_a_parse_error() {
    let body = format!(
        r#"<p:presentation xmlns:p="p">{}</p:presentation>"#,
        " ".repeat(4096)
    );
    let bytes = zip_with("ppt/presentation.xml", body.as_bytes());
    let err = PptxParser::new()
        .with_max_part_bytes(1024)
        .parse(&bytes)
        .unwrap_err();
    assert!(matches!(&err, SlidecastError::Parse(m) if m.contains("exceeds 1024 bytes")));
}

#[test]
fn part_at_the_limit_is_read() {
    let bytes = zip_with("ppt/presentation.xml", b"0123456789");
    let mut archive = Archive {
        zip: ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap(),
        max_part_bytes: 10,
    };
    let part = read_bytes_opt(&mut archive, "ppt/presentation.xml").unwrap();
    assert_eq!(part.as_deref(), Some(&b"0123456789"[..]));
    assert!(read_bytes_opt(&mut archive, "missing.xml").unwrap().is_none());
}
