//! Visual constants and derived slide geometry. A [`Theme`] is an immutable
//! value passed explicitly into the composer; nothing here is global state,
//! so tests can substitute their own palette.

use serde::Serialize;

/// Slide dimensions in inches, 16:9.
pub const SLIDE_W: f64 = 13.33;
pub const SLIDE_H: f64 = 7.5;

/// Uniform margin on every slide.
pub const MARGIN: f64 = 0.6;

/// Height of the colored header band on content slides.
pub const HEADER_H: f64 = 1.1;

/// The band title sits in a 0.6" text box centered inside the band.
pub const HEADER_TITLE_BOX_H: f64 = 0.6;
pub const HEADER_TITLE_Y: f64 = (HEADER_H - HEADER_TITLE_BOX_H) / 2.0;

/// All content slides start their body at the same Y, under the band.
pub const CONTENT_TOP: f64 = 0.8 + HEADER_H;

/// Two-column layout shared by Key Takeaways and Risks & What to Watch.
pub const COL_W: f64 = 5.6;
pub const COL1_X: f64 = MARGIN;
pub const COL2_X: f64 = MARGIN + 5.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FontSpec {
    pub face: &'static str,
    pub size: u32,
    pub bold: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    /// Accent used only on the cover slide (tone highlight shares it).
    pub brand_light: &'static str,
    /// Fill of the header band on every content slide.
    pub brand_dark: &'static str,
    pub text: &'static str,
    pub subtle: &'static str,
    pub positive: &'static str,
    pub negative: &'static str,
    pub table_header_fill: &'static str,
    pub table_border: &'static str,

    pub cover_title: FontSpec,
    pub cover_subtitle: FontSpec,
    pub header_title: FontSpec,
    pub heading: FontSpec,
    pub column_heading: FontSpec,
    pub body: FontSpec,
    pub small: FontSpec,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            brand_light: "1F6FEB",
            brand_dark: "0A3A8B",
            text: "111111",
            subtle: "666666",
            positive: "157347",
            negative: "B02A37",
            table_header_fill: "F3F4F6",
            table_border: "D1D5DB",
            cover_title: FontSpec { face: "Calibri", size: 60, bold: true },
            cover_subtitle: FontSpec { face: "Calibri", size: 22, bold: false },
            header_title: FontSpec { face: "Calibri", size: 30, bold: true },
            heading: FontSpec { face: "Calibri", size: 20, bold: true },
            column_heading: FontSpec { face: "Calibri", size: 18, bold: true },
            body: FontSpec { face: "Calibri", size: 16, bold: false },
            small: FontSpec { face: "Calibri", size: 14, bold: false },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_title_is_centered_in_band() {
        assert!((HEADER_TITLE_Y - 0.25).abs() < 1e-9);
        assert!(HEADER_TITLE_Y + HEADER_TITLE_BOX_H <= HEADER_H);
    }

    #[test]
    fn columns_fit_inside_margins() {
        assert!(COL2_X + COL_W <= SLIDE_W - MARGIN + 1e-9);
    }
}
