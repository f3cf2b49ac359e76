//! The composition engine: maps a validated [`ReportPayload`] into an ordered
//! sequence of [`SlideSpec`]s. Composition is a pure function of the payload,
//! the theme, and the (optionally fetched) logo bytes; the only suspension
//! point is the single fail-open logo fetch in [`compose_with_logo`].

use crate::fetch::ImageFetcher;
use crate::report::payload::{Competitor, ReportPayload};
use crate::theme::{
    FontSpec, Theme, COL1_X, COL2_X, COL_W, CONTENT_TOP, HEADER_TITLE_BOX_H, HEADER_TITLE_Y,
    MARGIN, SLIDE_H, SLIDE_W,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlideKind {
    Cover,
    Snapshot,
    Ratings,
    Takeaways,
    Peers,
    RisksWatch,
    Commentary,
    Sources,
}

/// Which master the document builder renders the slide on. `Content` carries
/// the dark header band; `Title` is plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Master {
    Title,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBlock {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub font: FontSpec,
    pub color: String,
    pub align: Align,
    pub underline: bool,
    /// Paragraph line spacing in points, where the layout wants it.
    pub line_spacing: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableBlock {
    /// First row is the header row.
    pub rows: Vec<Vec<String>>,
    /// Column widths as fractions of `w`; must sum to ~1.
    pub col_fracs: Vec<f64>,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub font_size: u32,
    pub row_h: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageBlock {
    pub bytes: Vec<u8>,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Serialize)]
pub enum Block {
    Text(TextBlock),
    Table(TableBlock),
    Image(ImageBlock),
}

/// A fully-resolved slide: layout kind plus positioned content blocks.
/// Immutable once produced; consumed exactly once by the document builder.
#[derive(Debug, Clone, Serialize)]
pub struct SlideSpec {
    pub kind: SlideKind,
    pub master: Master,
    pub blocks: Vec<Block>,
}

/// One entry in the composition plan: the slide kind, whether the payload
/// includes it, and how to build it. Evaluated in fixed order, once per
/// request, so inclusion rules stay auditable slide-by-slide.
struct SlidePlan {
    kind: SlideKind,
    included: fn(&ReportPayload) -> bool,
    build: fn(&ReportPayload, &Theme, Option<&[u8]>) -> SlideSpec,
}

const PLAN: &[SlidePlan] = &[
    SlidePlan { kind: SlideKind::Cover, included: always, build: cover },
    SlidePlan { kind: SlideKind::Snapshot, included: always, build: snapshot },
    SlidePlan { kind: SlideKind::Ratings, included: always, build: ratings },
    SlidePlan { kind: SlideKind::Takeaways, included: always, build: takeaways },
    SlidePlan { kind: SlideKind::Peers, included: has_competitors, build: peers },
    SlidePlan { kind: SlideKind::RisksWatch, included: always, build: risks_watch },
    SlidePlan { kind: SlideKind::Commentary, included: always, build: commentary },
    SlidePlan { kind: SlideKind::Sources, included: has_sources, build: sources },
];

fn always(_: &ReportPayload) -> bool {
    true
}

// Absent and empty both suppress the slide.
fn has_competitors(p: &ReportPayload) -> bool {
    p.competitors.as_ref().is_some_and(|c| !c.is_empty())
}

fn has_sources(p: &ReportPayload) -> bool {
    p.sources.as_ref().is_some_and(|s| !s.is_empty())
}

/// Pure composition: same payload, theme and logo bytes always yield the same
/// slide sequence.
pub fn compose(payload: &ReportPayload, theme: &Theme, logo: Option<&[u8]>) -> Vec<SlideSpec> {
    PLAN.iter()
        .filter(|plan| (plan.included)(payload))
        .map(|plan| {
            let slide = (plan.build)(payload, theme, logo);
            debug_assert_eq!(slide.kind, plan.kind);
            slide
        })
        .collect()
}

/// Composition with the single optional logo fetch. Any fetch failure is
/// collapsed to "no logo" and logged; it never fails the request.
pub async fn compose_with_logo(
    payload: &ReportPayload,
    theme: &Theme,
    fetcher: &dyn ImageFetcher,
) -> Vec<SlideSpec> {
    let logo = match &payload.logo_url {
        Some(url) => match fetcher.fetch_image(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "logo fetch failed; continuing without image");
                None
            }
        },
        None => None,
    };

    compose(payload, theme, logo.as_deref())
}

fn text(
    s: impl Into<String>,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    font: FontSpec,
    color: &str,
) -> TextBlock {
    TextBlock {
        text: s.into(),
        x,
        y,
        w,
        h,
        font,
        color: color.to_string(),
        align: Align::Left,
        underline: false,
        line_spacing: None,
    }
}

/// Content slides share one band title placement, centered in the band.
fn content_slide(kind: SlideKind, title: &str, theme: &Theme) -> SlideSpec {
    SlideSpec {
        kind,
        master: Master::Content,
        blocks: vec![Block::Text(text(
            title,
            MARGIN,
            HEADER_TITLE_Y,
            SLIDE_W - 2.0 * MARGIN,
            HEADER_TITLE_BOX_H,
            theme.header_title,
            "FFFFFF",
        ))],
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("• {s}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a number the way the wire JSON carried it: no trailing `.0` on
/// whole values.
fn plain_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn cover(p: &ReportPayload, theme: &Theme, logo: Option<&[u8]>) -> SlideSpec {
    let mut blocks = Vec::new();

    let mut title = text(
        format!("{} ({})", p.company_name, p.ticker),
        MARGIN,
        SLIDE_H / 2.0 - 1.2,
        SLIDE_W - 2.0 * MARGIN,
        1.8,
        theme.cover_title,
        theme.text,
    );
    title.align = Align::Center;
    blocks.push(Block::Text(title));

    let mut subtitle = text(
        format!("As of {}", p.as_of_date.format("%Y-%m-%d")),
        MARGIN,
        SLIDE_H / 2.0 + 0.8,
        SLIDE_W - 2.0 * MARGIN,
        0.6,
        theme.cover_subtitle,
        theme.subtle,
    );
    subtitle.align = Align::Center;
    blocks.push(Block::Text(subtitle));

    if let Some(bytes) = logo {
        blocks.push(Block::Image(ImageBlock {
            bytes: bytes.to_vec(),
            x: SLIDE_W - 2.3,
            y: 0.6,
            w: 1.5,
            h: 1.5,
        }));
    }

    SlideSpec {
        kind: SlideKind::Cover,
        master: Master::Title,
        blocks,
    }
}

fn snapshot(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::Snapshot, "Company Snapshot", theme);

    let mut lines = vec![
        format!("• Industry: {}", p.snapshot.industry),
        format!("• Business model: {}", p.snapshot.business_model),
    ];
    // Market cap line is omitted entirely when absent, never left blank.
    if let Some(cap) = &p.snapshot.market_cap {
        lines.push(format!("• Market cap: {cap}"));
    }
    lines.push(format!("• Growth focus: {}", p.snapshot.growth_focus));

    let mut body = text(
        lines.join("\n"),
        MARGIN,
        CONTENT_TOP,
        SLIDE_W - 2.0 * MARGIN,
        4.2,
        theme.body,
        theme.text,
    );
    body.line_spacing = Some(20);
    slide.blocks.push(Block::Text(body));
    slide
}

fn ratings(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::Ratings, "Analyst Ratings & Targets", theme);

    // Header row always present; an empty ratings list still gets its slide
    // so "no data" is explicit.
    let mut rows = vec![vec![
        "Source".to_string(),
        "Rating".to_string(),
        "Target".to_string(),
        "Upside/Downside".to_string(),
    ]];
    for r in &p.ratings {
        rows.push(vec![
            r.source.clone(),
            r.rating.clone(),
            format!("${}", plain_number(r.target)),
            p.upside_cell(r.target),
        ]);
    }

    slide.blocks.push(Block::Table(TableBlock {
        rows,
        col_fracs: vec![0.47, 0.18, 0.15, 0.20],
        x: MARGIN,
        y: CONTENT_TOP,
        w: SLIDE_W - 2.0 * MARGIN,
        font_size: 14,
        row_h: 0.45,
    }));
    slide
}

fn takeaways(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::Takeaways, "Key Takeaways", theme);

    slide.blocks.push(Block::Text(text(
        "Positives",
        COL1_X,
        CONTENT_TOP,
        COL_W,
        0.5,
        theme.column_heading,
        theme.positive,
    )));
    let mut pos = text(
        bullets(&p.positives),
        COL1_X,
        CONTENT_TOP + 0.5,
        COL_W,
        4.0,
        theme.body,
        theme.text,
    );
    pos.line_spacing = Some(20);
    slide.blocks.push(Block::Text(pos));

    slide.blocks.push(Block::Text(text(
        "Negatives",
        COL2_X,
        CONTENT_TOP,
        COL_W,
        0.5,
        theme.column_heading,
        theme.negative,
    )));
    let mut neg = text(
        bullets(&p.negatives),
        COL2_X,
        CONTENT_TOP + 0.5,
        COL_W,
        4.0,
        theme.body,
        theme.text,
    );
    neg.line_spacing = Some(20);
    slide.blocks.push(Block::Text(neg));

    slide
}

fn peer_row(c: &Competitor) -> Vec<String> {
    vec![
        c.peer.clone(),
        // Payload carries market cap in millions; column shows billions.
        c.mkt_cap
            .map(|cap| format!("{:.1}", cap / 1e3))
            .unwrap_or_else(|| "—".to_string()),
        c.pe.map(plain_number).unwrap_or_else(|| "—".to_string()),
        c.note.clone().unwrap_or_default(),
    ]
}

fn peers(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::Peers, "Peer Comparison", theme);

    let mut rows = vec![vec![
        "Peer".to_string(),
        "Mkt Cap ($B)".to_string(),
        "P/E".to_string(),
        "Note".to_string(),
    ]];
    if let Some(competitors) = &p.competitors {
        rows.extend(competitors.iter().map(peer_row));
    }

    slide.blocks.push(Block::Table(TableBlock {
        rows,
        col_fracs: vec![0.40, 0.23, 0.15, 0.22],
        x: MARGIN,
        y: CONTENT_TOP,
        w: SLIDE_W - 2.0 * MARGIN,
        font_size: 14,
        row_h: 0.45,
    }));
    slide
}

fn placeholder_bullets(items: Option<&Vec<String>>) -> String {
    match items {
        Some(list) if !list.is_empty() => bullets(list),
        _ => "• (none provided)".to_string(),
    }
}

fn risks_watch(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::RisksWatch, "Risks & What to Watch", theme);

    slide.blocks.push(Block::Text(text(
        "Risks",
        COL1_X,
        CONTENT_TOP,
        COL_W,
        0.5,
        theme.heading,
        theme.text,
    )));
    let mut risks = text(
        placeholder_bullets(p.risks.as_ref()),
        COL1_X,
        CONTENT_TOP + 0.5,
        COL_W,
        4.0,
        theme.body,
        theme.text,
    );
    risks.line_spacing = Some(20);
    slide.blocks.push(Block::Text(risks));

    slide.blocks.push(Block::Text(text(
        "What to Watch",
        COL2_X,
        CONTENT_TOP,
        COL_W,
        0.5,
        theme.heading,
        theme.text,
    )));
    let mut watch = text(
        placeholder_bullets(p.watch.as_ref()),
        COL2_X,
        CONTENT_TOP + 0.5,
        COL_W,
        4.0,
        theme.body,
        theme.text,
    );
    watch.line_spacing = Some(20);
    slide.blocks.push(Block::Text(watch));

    slide
}

fn commentary(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::Commentary, "Strategic Commentary", theme);

    slide.blocks.push(Block::Text(text(
        "Overall Tone:",
        MARGIN,
        CONTENT_TOP,
        3.2,
        0.5,
        theme.heading,
        theme.text,
    )));

    let mut tone = text(
        format!(" {}", p.tone.label()),
        MARGIN + 2.5,
        CONTENT_TOP,
        8.8,
        0.5,
        theme.heading,
        theme.brand_light,
    );
    tone.underline = true;
    slide.blocks.push(Block::Text(tone));

    let mut why = text(
        p.why_tone.clone(),
        MARGIN,
        CONTENT_TOP + 0.7,
        SLIDE_W - 2.0 * MARGIN,
        4.0,
        theme.body,
        theme.text,
    );
    why.line_spacing = Some(20);
    slide.blocks.push(Block::Text(why));

    slide
}

fn sources(p: &ReportPayload, theme: &Theme, _logo: Option<&[u8]>) -> SlideSpec {
    let mut slide = content_slide(SlideKind::Sources, "Sources", theme);

    let listed = p.sources.as_deref().unwrap_or_default();
    let mut body = text(
        bullets(listed),
        MARGIN,
        CONTENT_TOP,
        SLIDE_W - 2.0 * MARGIN,
        4.6,
        theme.small,
        theme.text,
    );
    body.line_spacing = Some(18);
    slide.blocks.push(Block::Text(body));
    slide
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ImageFetcher;
    use crate::report::payload::{Rating, ReportPayload, Snapshot, Tone};
    use chrono::NaiveDate;

    fn base_payload() -> ReportPayload {
        ReportPayload {
            ticker: "ACME".into(),
            company_name: "Acme Corp".into(),
            as_of_date: NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
            price_today: Some(100.0),
            snapshot: Snapshot {
                industry: "Widgets".into(),
                business_model: "B2B manufacturing".into(),
                market_cap: Some("$12B".into()),
                growth_focus: "International expansion".into(),
            },
            ratings: vec![
                Rating { source: "Bank A".into(), rating: "Buy".into(), target: 120.0 },
                Rating { source: "Bank B".into(), rating: "Hold".into(), target: 80.0 },
            ],
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

    fn kinds(slides: &[SlideSpec]) -> Vec<SlideKind> {
        slides.iter().map(|s| s.kind).collect()
    }

    fn ratings_table(slides: &[SlideSpec]) -> &TableBlock {
        let slide = slides
            .iter()
            .find(|s| s.kind == SlideKind::Ratings)
            .unwrap();
        slide
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Table(t) => Some(t),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn minimal_payload_yields_six_slides_in_order() {
        let slides = compose(&base_payload(), &Theme::default(), None);
        assert_eq!(
            kinds(&slides),
            vec![
                SlideKind::Cover,
                SlideKind::Snapshot,
                SlideKind::Ratings,
                SlideKind::Takeaways,
                SlideKind::RisksWatch,
                SlideKind::Commentary,
            ]
        );
    }

    #[test]
    fn full_payload_yields_eight_slides() {
        let mut p = base_payload();
        p.competitors = Some(vec![Competitor {
            peer: "Rival Inc".into(),
            mkt_cap: Some(2500.0),
            pe: Some(22.5),
            note: None,
        }]);
        p.sources = Some(vec!["10-K filing".into()]);
        let slides = compose(&p, &Theme::default(), None);
        assert_eq!(slides.len(), 8);
        assert_eq!(slides[4].kind, SlideKind::Peers);
        assert_eq!(slides[7].kind, SlideKind::Sources);
    }

    #[test]
    fn empty_competitors_and_absent_are_equivalent() {
        let mut with_empty = base_payload();
        with_empty.competitors = Some(vec![]);
        let a = compose(&with_empty, &Theme::default(), None);
        let b = compose(&base_payload(), &Theme::default(), None);
        assert_eq!(kinds(&a), kinds(&b));
        assert!(!kinds(&a).contains(&SlideKind::Peers));
    }

    #[test]
    fn upside_cells_use_price_today() {
        let slides = compose(&base_payload(), &Theme::default(), None);
        let table = ratings_table(&slides);
        assert_eq!(table.rows[1], vec!["Bank A", "Buy", "$120", "20.0%"]);
        assert_eq!(table.rows[2], vec!["Bank B", "Hold", "$80", "-20.0%"]);
    }

    #[test]
    fn missing_price_renders_placeholder_in_every_row() {
        let mut p = base_payload();
        p.price_today = None;
        let slides = compose(&p, &Theme::default(), None);
        let table = ratings_table(&slides);
        for row in &table.rows[1..] {
            assert_eq!(row[3], "—");
        }
    }

    #[test]
    fn empty_ratings_keep_header_only_table() {
        let mut p = base_payload();
        p.ratings = vec![];
        let slides = compose(&p, &Theme::default(), None);
        let table = ratings_table(&slides);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], "Source");
        assert_eq!(slides.len(), 6);
    }

    #[test]
    fn peer_market_cap_renders_in_billions() {
        let row = peer_row(&Competitor {
            peer: "Rival Inc".into(),
            mkt_cap: Some(2500.0),
            pe: None,
            note: None,
        });
        assert_eq!(row, vec!["Rival Inc", "2.5", "—", ""]);
    }

    #[test]
    fn risks_watch_defaults_to_placeholder_bullets() {
        let slides = compose(&base_payload(), &Theme::default(), None);
        let slide = slides
            .iter()
            .find(|s| s.kind == SlideKind::RisksWatch)
            .unwrap();
        let texts: Vec<&str> = slide
            .blocks
            .iter()
            .filter_map(|b| match b {
                Block::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            texts.iter().filter(|t| **t == "• (none provided)").count(),
            2
        );
    }

    #[test]
    fn two_column_slides_share_column_offsets() {
        let mut p = base_payload();
        p.risks = Some(vec!["Litigation".into()]);
        let slides = compose(&p, &Theme::default(), None);
        for kind in [SlideKind::Takeaways, SlideKind::RisksWatch] {
            let slide = slides.iter().find(|s| s.kind == kind).unwrap();
            let xs: Vec<f64> = slide
                .blocks
                .iter()
                .skip(1) // band title
                .filter_map(|b| match b {
                    Block::Text(t) => Some(t.x),
                    _ => None,
                })
                .collect();
            assert_eq!(xs, vec![COL1_X, COL1_X, COL2_X, COL2_X]);
        }
    }

    #[test]
    fn snapshot_omits_market_cap_line_when_absent() {
        let mut p = base_payload();
        p.snapshot.market_cap = None;
        let slides = compose(&p, &Theme::default(), None);
        let slide = slides
            .iter()
            .find(|s| s.kind == SlideKind::Snapshot)
            .unwrap();
        let body = match &slide.blocks[1] {
            Block::Text(t) => &t.text,
            _ => panic!("expected text body"),
        };
        assert!(!body.contains("Market cap"));
        assert!(body.contains("• Growth focus: International expansion"));
    }

    #[test]
    fn commentary_tone_is_underlined_accent() {
        let slides = compose(&base_payload(), &Theme::default(), None);
        let slide = slides
            .iter()
            .find(|s| s.kind == SlideKind::Commentary)
            .unwrap();
        let tone = match &slide.blocks[2] {
            Block::Text(t) => t,
            _ => panic!("expected tone label"),
        };
        assert_eq!(tone.text, " Bullish");
        assert!(tone.underline);
        assert_eq!(tone.color, Theme::default().brand_light);
    }

    #[test]
    fn composition_is_deterministic() {
        let mut p = base_payload();
        p.logo_url = Some("https://example.com/logo.png".into());
        let logo = vec![0u8; 16];
        let theme = Theme::default();
        let a = serde_json::to_string(&compose(&p, &theme, Some(&logo))).unwrap();
        let b = serde_json::to_string(&compose(&p, &theme, Some(&logo))).unwrap();
        assert_eq!(a, b);
    }

    struct FailingFetcher;

    #[async_trait::async_trait]
    impl ImageFetcher for FailingFetcher {
        async fn fetch_image(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("connection refused")
        }
    }

    struct FixedFetcher(Vec<u8>);

    #[async_trait::async_trait]
    impl ImageFetcher for FixedFetcher {
        async fn fetch_image(&self, _url: &str) -> anyhow::Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn failed_logo_fetch_still_produces_cover() {
        let mut p = base_payload();
        p.logo_url = Some("https://example.com/logo.png".into());
        let slides = compose_with_logo(&p, &Theme::default(), &FailingFetcher).await;
        assert_eq!(slides[0].kind, SlideKind::Cover);
        assert!(slides[0]
            .blocks
            .iter()
            .all(|b| !matches!(b, Block::Image(_))));
        assert_eq!(slides.len(), 6);
    }

    #[tokio::test]
    async fn successful_logo_fetch_places_image_top_right() {
        let mut p = base_payload();
        p.logo_url = Some("https://example.com/logo.png".into());
        let slides =
            compose_with_logo(&p, &Theme::default(), &FixedFetcher(vec![1, 2, 3])).await;
        let image = slides[0]
            .blocks
            .iter()
            .find_map(|b| match b {
                Block::Image(i) => Some(i),
                _ => None,
            })
            .unwrap();
        assert_eq!(image.bytes, vec![1, 2, 3]);
        assert!((image.x - (SLIDE_W - 2.3)).abs() < 1e-9);
        assert!((image.y - 0.6).abs() < 1e-9);
    }
}
