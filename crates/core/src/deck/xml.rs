//! PresentationML/DrawingML part serialization. Everything here renders to
//! owned strings; the zip assembly lives in the parent module.

use crate::compose::{Align, Block, ImageBlock, Master, SlideSpec, TableBlock, TextBlock};
use crate::theme::{Theme, HEADER_H, SLIDE_H, SLIDE_W};
use std::fmt::Write;

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// English Metric Units per inch.
const EMU_PER_INCH: f64 = 914_400.0;

pub fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn xfrm(x: f64, y: f64, w: f64, h: f64) -> String {
    format!(
        r#"<a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm>"#,
        emu(x),
        emu(y),
        emu(w),
        emu(h)
    )
}

fn run_props(font: &crate::theme::FontSpec, color: &str, underline: bool) -> String {
    format!(
        r#"<a:rPr lang="en-US" sz="{}"{}{} dirty="0"><a:solidFill><a:srgbClr val="{}"/></a:solidFill><a:latin typeface="{}"/></a:rPr>"#,
        font.size * 100,
        if font.bold { r#" b="1""# } else { "" },
        if underline { r#" u="sng""# } else { "" },
        color,
        font.face
    )
}

fn paragraphs(block: &TextBlock) -> String {
    let mut ppr = String::new();
    let mut ppr_attrs = String::new();
    if block.align == Align::Center {
        ppr_attrs.push_str(r#" algn="ctr""#);
    }
    if let Some(pts) = block.line_spacing {
        write!(
            ppr,
            r#"<a:lnSpc><a:spcPts val="{}"/></a:lnSpc>"#,
            pts * 100
        )
        .unwrap();
    }
    let ppr = format!("<a:pPr{ppr_attrs}>{ppr}</a:pPr>");

    let rpr = run_props(&block.font, &block.color, block.underline);
    block
        .text
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                format!("<a:p>{ppr}<a:endParaRPr lang=\"en-US\"/></a:p>")
            } else {
                format!("<a:p>{ppr}<a:r>{rpr}<a:t>{}</a:t></a:r></a:p>", esc(line))
            }
        })
        .collect()
}

pub fn text_shape(id: u32, block: &TextBlock) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/>"#,
            r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="square" rtlCol="0"/><a:lstStyle/>{paras}</p:txBody></p:sp>"#
        ),
        id = id,
        xfrm = xfrm(block.x, block.y, block.w, block.h),
        paras = paragraphs(block)
    )
}

/// The fixed-height dark band across the top of every content slide.
pub fn header_band_shape(id: u32, theme: &Theme) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Header Band"/>"#,
            r#"<p:cNvSpPr/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#,
            r#"<a:solidFill><a:srgbClr val="{fill}"/></a:solidFill><a:ln><a:noFill/></a:ln></p:spPr>"#,
            r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></p:txBody></p:sp>"#
        ),
        id = id,
        xfrm = xfrm(0.0, 0.0, SLIDE_W, HEADER_H),
        fill = theme.brand_dark
    )
}

/// Bottom-right page number, rendered on every slide via a `slidenum` field
/// so the viewer fills in the actual index.
pub fn slide_number_shape(id: u32, theme: &Theme) -> String {
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="Slide Number {id}"/>"#,
            r#"<p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="none" rtlCol="0"/><a:lstStyle/><a:p>"#,
            r#"<a:fld id="{{2A7E93CF-5B14-4E4B-9C6A-0D8F31B7C4D2}}" type="slidenum">"#,
            r#"<a:rPr lang="en-US" sz="1200" dirty="0"><a:solidFill><a:srgbClr val="{color}"/></a:solidFill>"#,
            r#"<a:latin typeface="{face}"/></a:rPr><a:t>1</a:t></a:fld>"#,
            r#"</a:p></p:txBody></p:sp>"#
        ),
        id = id,
        xfrm = xfrm(SLIDE_W - 1.1, SLIDE_H - 0.6, 0.8, 0.4),
        color = theme.subtle,
        face = theme.small.face
    )
}

fn table_cell(text: &str, font_size: u32, theme: &Theme, header: bool) -> String {
    let border = format!(
        r#"<a:ln{{side}} w="12700" cap="flat"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln{{side}}>"#,
        theme.table_border
    );
    let borders: String = ["L", "R", "T", "B"]
        .iter()
        .map(|side| border.replace("{side}", side))
        .collect();
    let fill = if header {
        format!(
            r#"<a:solidFill><a:srgbClr val="{}"/></a:solidFill>"#,
            theme.table_header_fill
        )
    } else {
        String::new()
    };

    let para = if text.is_empty() {
        r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string()
    } else {
        format!(
            r#"<a:p><a:r><a:rPr lang="en-US" sz="{sz}"{b}><a:solidFill><a:srgbClr val="{color}"/></a:solidFill><a:latin typeface="{face}"/></a:rPr><a:t>{t}</a:t></a:r></a:p>"#,
            sz = font_size * 100,
            b = if header { r#" b="1""# } else { "" },
            color = theme.text,
            face = theme.body.face,
            t = esc(text)
        )
    };

    format!(
        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{para}</a:txBody><a:tcPr marL="91440" marR="91440" marT="45720" marB="45720">{borders}{fill}</a:tcPr></a:tc>"#
    )
}

pub fn table_frame(id: u32, block: &TableBlock, theme: &Theme) -> String {
    let grid: String = block
        .col_fracs
        .iter()
        .map(|f| format!(r#"<a:gridCol w="{}"/>"#, emu(block.w * f)))
        .collect();

    let rows: String = block
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let cells: String = row
                .iter()
                .map(|cell| table_cell(cell, block.font_size, theme, i == 0))
                .collect();
            format!(r#"<a:tr h="{}">{cells}</a:tr>"#, emu(block.row_h))
        })
        .collect();

    let table_h = block.row_h * block.rows.len() as f64;
    format!(
        concat!(
            r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/>"#,
            r#"<p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr>"#,
            r#"<p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></p:xfrm>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">"#,
            r#"<a:tbl><a:tblPr firstRow="1" bandRow="0"/><a:tblGrid>{grid}</a:tblGrid>{rows}</a:tbl>"#,
            r#"</a:graphicData></a:graphic></p:graphicFrame>"#
        ),
        id = id,
        x = emu(block.x),
        y = emu(block.y),
        cx = emu(block.w),
        cy = emu(table_h),
        grid = grid,
        rows = rows
    )
}

pub fn picture(id: u32, r_id: &str, block: &ImageBlock) -> String {
    format!(
        concat!(
            r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/>"#,
            r#"<p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr>"#,
            r#"<p:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>"#,
            r#"<p:spPr>{xfrm}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
        ),
        id = id,
        rid = r_id,
        xfrm = xfrm(block.x, block.y, block.w, block.h)
    )
}

/// One slide part. Image blocks reference `rId2`, `rId3`, ... in slide order
/// (`rId1` is the layout); the caller writes matching relationship entries.
pub fn slide_part(slide: &SlideSpec, theme: &Theme) -> String {
    let mut shapes = String::new();
    let mut shape_id: u32 = 2;
    let mut image_rel: u32 = 2;

    if slide.master == Master::Content {
        shapes.push_str(&header_band_shape(shape_id, theme));
        shape_id += 1;
    }

    for block in &slide.blocks {
        match block {
            Block::Text(t) => shapes.push_str(&text_shape(shape_id, t)),
            Block::Table(t) => shapes.push_str(&table_frame(shape_id, t, theme)),
            Block::Image(i) => {
                shapes.push_str(&picture(shape_id, &format!("rId{image_rel}"), i));
                image_rel += 1;
            }
        }
        shape_id += 1;
    }

    shapes.push_str(&slide_number_shape(shape_id, theme));

    format!(
        concat!(
            "{decl}",
            r#"<p:sld xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}"><p:cSld>"#,
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="FFFFFF"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
            "<p:spTree>{tree_root}{shapes}</p:spTree></p:cSld>",
            r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        tree_root = sp_tree_root(),
        shapes = shapes
    )
}

fn sp_tree_root() -> &'static str {
    concat!(
        r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
        r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/>"#,
        r#"<a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
    )
}

pub fn presentation_part(slide_count: usize) -> String {
    let mut slide_ids = String::new();
    for i in 0..slide_count {
        write!(
            slide_ids,
            r#"<p:sldId id="{}" r:id="rId{}"/>"#,
            256 + i as u32,
            2 + i
        )
        .unwrap();
    }

    format!(
        concat!(
            "{decl}",
            r#"<p:presentation xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}">"#,
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            r#"<p:sldIdLst>{slide_ids}</p:sldIdLst>"#,
            r#"<p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="{cy}" cy="{cx}"/>"#,
            r#"</p:presentation>"#
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        slide_ids = slide_ids,
        cx = emu(SLIDE_W),
        cy = emu(SLIDE_H)
    )
}

pub fn slide_master_part() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<p:sldMaster xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}"><p:cSld>"#,
            r#"<p:bg><p:bgPr><a:solidFill><a:srgbClr val="FFFFFF"/></a:solidFill><a:effectLst/></p:bgPr></p:bg>"#,
            "<p:spTree>{tree_root}</p:spTree></p:cSld>",
            r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
            r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
            r#"</p:sldMaster>"#
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        tree_root = sp_tree_root()
    )
}

pub fn slide_layout_part() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="blank" preserve="1"><p:cSld name="Blank">"#,
            "<p:spTree>{tree_root}</p:spTree></p:cSld>",
            r#"<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
        ),
        decl = XML_DECL,
        a = NS_A,
        r = NS_R,
        p = NS_P,
        tree_root = sp_tree_root()
    )
}

pub fn theme_part(theme: &Theme) -> String {
    // Shapes set explicit srgb colors, so the scheme mostly satisfies the
    // schema; the accents still carry the brand palette.
    format!(
        concat!(
            "{decl}",
            r#"<a:theme xmlns:a="{a}" name="Deck Theme"><a:themeElements>"#,
            r#"<a:clrScheme name="Deck">"#,
            r#"<a:dk1><a:srgbClr val="{text}"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
            r#"<a:dk2><a:srgbClr val="{dark}"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2>"#,
            r#"<a:accent1><a:srgbClr val="{light}"/></a:accent1><a:accent2><a:srgbClr val="{dark}"/></a:accent2>"#,
            r#"<a:accent3><a:srgbClr val="{positive}"/></a:accent3><a:accent4><a:srgbClr val="{negative}"/></a:accent4>"#,
            r#"<a:accent5><a:srgbClr val="{subtle}"/></a:accent5><a:accent6><a:srgbClr val="{border}"/></a:accent6>"#,
            r#"<a:hlink><a:srgbClr val="{light}"/></a:hlink><a:folHlink><a:srgbClr val="{subtle}"/></a:folHlink>"#,
            r#"</a:clrScheme>"#,
            r#"<a:fontScheme name="Deck">"#,
            r#"<a:majorFont><a:latin typeface="{face}"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="{face}"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
            r#"</a:fontScheme>"#,
            r#"<a:fmtScheme name="Deck">"#,
            r#"<a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst>"#,
            r#"<a:lnStyleLst><a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst>"#,
            r#"<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>"#,
            r#"<a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst>"#,
            r#"</a:fmtScheme></a:themeElements></a:theme>"#
        ),
        decl = XML_DECL,
        a = NS_A,
        text = theme.text,
        dark = theme.brand_dark,
        light = theme.brand_light,
        positive = theme.positive,
        negative = theme.negative,
        subtle = theme.subtle,
        border = theme.table_border,
        face = theme.body.face
    )
}

pub fn content_types_part(slide_count: usize) -> String {
    let mut overrides = String::new();
    for i in 1..=slide_count {
        write!(
            overrides,
            r#"<Override PartName="/ppt/slides/slide{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        )
        .unwrap();
    }

    format!(
        concat!(
            "{decl}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Default Extension="png" ContentType="image/png"/>"#,
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
            r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#,
            r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#,
            r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
            "{overrides}",
            r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
            r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
            r#"</Types>"#
        ),
        decl = XML_DECL,
        overrides = overrides
    )
}

fn relationships(entries: &[(String, &str, String)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, rel_type, target)| {
            format!(r#"<Relationship Id="{id}" Type="{rel_type}" Target="{target}"/>"#)
        })
        .collect();
    format!(
        concat!(
            "{decl}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
        ),
        decl = XML_DECL,
        body = body
    )
}

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXT_PROPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const REL_IMAGE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

pub fn root_rels() -> String {
    relationships(&[
        (
            "rId1".into(),
            REL_OFFICE_DOCUMENT,
            "ppt/presentation.xml".into(),
        ),
        ("rId2".into(), REL_CORE_PROPS, "docProps/core.xml".into()),
        ("rId3".into(), REL_EXT_PROPS, "docProps/app.xml".into()),
    ])
}

pub fn presentation_rels(slide_count: usize) -> String {
    let mut entries = vec![(
        "rId1".to_string(),
        REL_SLIDE_MASTER,
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for i in 1..=slide_count {
        entries.push((
            format!("rId{}", 1 + i),
            REL_SLIDE,
            format!("slides/slide{i}.xml"),
        ));
    }
    entries.push((
        format!("rId{}", 2 + slide_count),
        REL_THEME,
        "theme/theme1.xml".to_string(),
    ));
    relationships(&entries)
}

pub fn slide_master_rels() -> String {
    relationships(&[
        (
            "rId1".into(),
            REL_SLIDE_LAYOUT,
            "../slideLayouts/slideLayout1.xml".into(),
        ),
        ("rId2".into(), REL_THEME, "../theme/theme1.xml".into()),
    ])
}

pub fn slide_layout_rels() -> String {
    relationships(&[(
        "rId1".into(),
        REL_SLIDE_MASTER,
        "../slideMasters/slideMaster1.xml".into(),
    )])
}

/// `image_indices` are the 1-based media numbers of the slide's image blocks,
/// in block order, matching the `rId2..` references in [`slide_part`].
pub fn slide_rels(image_indices: &[usize]) -> String {
    let mut entries = vec![(
        "rId1".to_string(),
        REL_SLIDE_LAYOUT,
        "../slideLayouts/slideLayout1.xml".to_string(),
    )];
    for (offset, media) in image_indices.iter().enumerate() {
        entries.push((
            format!("rId{}", 2 + offset),
            REL_IMAGE,
            format!("../media/image{media}.png"),
        ));
    }
    relationships(&entries)
}

pub fn core_props_part(title: &str) -> String {
    format!(
        concat!(
            "{decl}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/">"#,
            "<dc:title>{title}</dc:title>",
            r#"</cp:coreProperties>"#
        ),
        decl = XML_DECL,
        title = esc(title)
    )
}

pub fn app_props_part() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
            r#"<Application>decksmith</Application></Properties>"#
        ),
        decl = XML_DECL
    )
}
