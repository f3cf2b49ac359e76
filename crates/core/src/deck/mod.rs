//! Document builder: serializes a theme plus an ordered run of
//! [`SlideSpec`]s into a PPTX package (an OPC zip of PresentationML parts).
//! The composer is the only caller; any error here is a build failure and
//! fatal for the request.

mod xml;

use crate::compose::{Block, SlideSpec};
use crate::theme::Theme;
use anyhow::Context;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Fully materialize the presentation binary for a slide sequence.
pub fn build_pptx(theme: &Theme, slides: &[SlideSpec], title: &str) -> anyhow::Result<Vec<u8>> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let opts =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut put = |path: &str, bytes: &[u8]| -> anyhow::Result<()> {
        zip.start_file(path, opts)
            .with_context(|| format!("failed to start pptx part {path}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write pptx part {path}"))?;
        Ok(())
    };

    put("[Content_Types].xml", xml::content_types_part(slides.len()).as_bytes())?;
    put("_rels/.rels", xml::root_rels().as_bytes())?;
    put("docProps/core.xml", xml::core_props_part(title).as_bytes())?;
    put("docProps/app.xml", xml::app_props_part().as_bytes())?;
    put(
        "ppt/presentation.xml",
        xml::presentation_part(slides.len()).as_bytes(),
    )?;
    put(
        "ppt/_rels/presentation.xml.rels",
        xml::presentation_rels(slides.len()).as_bytes(),
    )?;
    put(
        "ppt/slideMasters/slideMaster1.xml",
        xml::slide_master_part().as_bytes(),
    )?;
    put(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        xml::slide_master_rels().as_bytes(),
    )?;
    put(
        "ppt/slideLayouts/slideLayout1.xml",
        xml::slide_layout_part().as_bytes(),
    )?;
    put(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        xml::slide_layout_rels().as_bytes(),
    )?;
    put("ppt/theme/theme1.xml", xml::theme_part(theme).as_bytes())?;

    // Media numbering is global across the deck; each slide's rels map its
    // own rId2.. references onto these numbers.
    let mut media_count: usize = 0;
    for (i, slide) in slides.iter().enumerate() {
        let mut image_indices = Vec::new();
        let mut images = Vec::new();
        for block in &slide.blocks {
            if let Block::Image(image) = block {
                media_count += 1;
                image_indices.push(media_count);
                images.push((media_count, image.bytes.clone()));
            }
        }

        put(
            &format!("ppt/slides/slide{}.xml", i + 1),
            xml::slide_part(slide, theme).as_bytes(),
        )?;
        put(
            &format!("ppt/slides/_rels/slide{}.xml.rels", i + 1),
            xml::slide_rels(&image_indices).as_bytes(),
        )?;
        for (media, bytes) in images {
            put(&format!("ppt/media/image{media}.png"), &bytes)?;
        }
    }

    let cursor = zip.finish().context("failed to finalize pptx package")?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, SlideKind};
    use crate::report::payload::{Rating, ReportPayload, Snapshot, Tone};
    use chrono::NaiveDate;
    use std::io::Read;

    fn payload() -> ReportPayload {
        ReportPayload {
            ticker: "ACME".into(),
            company_name: "Acme Corp".into(),
            as_of_date: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            price_today: Some(100.0),
            snapshot: Snapshot {
                industry: "Widgets".into(),
                business_model: "B2B manufacturing".into(),
                market_cap: None,
                growth_focus: "International expansion".into(),
            },
            ratings: vec![Rating {
                source: "Bank A".into(),
                rating: "Buy".into(),
                target: 120.0,
            }],
            positives: vec!["Strong margins".into()],
            negatives: vec!["Customer concentration".into()],
            competitors: None,
            risks: None,
            watch: None,
            tone: Tone::Bullish,
            why_tone: "Targets sit well above spot.".into(),
            sources: None,
            logo_url: None,
        }
    }

    fn part_names(buf: &[u8]) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(buf)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    #[test]
    fn package_contains_one_part_per_slide() {
        let theme = Theme::default();
        let slides = compose(&payload(), &theme, None);
        let buf = build_pptx(&theme, &slides, "Acme Corp").unwrap();
        let names = part_names(&buf);
        assert!(names.contains(&"ppt/presentation.xml".to_string()));
        for i in 1..=slides.len() {
            assert!(names.contains(&format!("ppt/slides/slide{i}.xml")));
        }
        assert!(!names.contains(&format!("ppt/slides/slide{}.xml", slides.len() + 1)));
    }

    #[test]
    fn logo_bytes_land_in_media() {
        let theme = Theme::default();
        let logo = vec![0x89, 0x50, 0x4E, 0x47];
        let slides = compose(&payload(), &theme, Some(&logo));
        assert_eq!(slides[0].kind, SlideKind::Cover);
        let buf = build_pptx(&theme, &slides, "Acme Corp").unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(buf)).unwrap();
        let mut media = archive.by_name("ppt/media/image1.png").unwrap();
        let mut bytes = Vec::new();
        media.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, logo);
    }

    #[test]
    fn every_slide_carries_a_page_number_field() {
        let theme = Theme::default();
        let slides = compose(&payload(), &theme, None);
        let buf = build_pptx(&theme, &slides, "Acme Corp").unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(buf)).unwrap();
        for i in 1..=slides.len() {
            let mut xml = String::new();
            archive
                .by_name(&format!("ppt/slides/slide{i}.xml"))
                .unwrap()
                .read_to_string(&mut xml)
                .unwrap();
            assert!(xml.contains(r#"type="slidenum""#), "slide {i} has no page number");
            assert!(xml.contains(&format!(r#"<a:srgbClr val="{}"/>"#, theme.subtle)));
        }
    }

    #[test]
    fn slide_xml_carries_band_and_title_text() {
        let theme = Theme::default();
        let slides = compose(&payload(), &theme, None);
        let buf = build_pptx(&theme, &slides, "Acme Corp").unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(buf)).unwrap();
        let mut slide2 = String::new();
        archive
            .by_name("ppt/slides/slide2.xml")
            .unwrap()
            .read_to_string(&mut slide2)
            .unwrap();
        assert!(slide2.contains("Company Snapshot"));
        assert!(slide2.contains(&format!(r#"<a:srgbClr val="{}"/>"#, theme.brand_dark)));
    }
}
