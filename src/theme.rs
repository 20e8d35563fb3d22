// Colour palettes for exported seating charts

use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn gray(level: f32) -> Self {
        Self::new(level, level, level)
    }
}

const BLACK: RgbColor = RgbColor::gray(0.0);
const WHITE: RgbColor = RgbColor::gray(1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Theme {
    /// Coloured desk fills and accents
    #[default]
    Color,
    /// Black, white and grays
    Monochrome,
    /// Outlines only, no filled areas
    InkSaving,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub title: RgbColor,
    pub text: RgbColor,
    pub muted_text: RgbColor,
    pub desk_fill: Option<RgbColor>,
    pub desk_stroke: RgbColor,
    pub desk_stroke_width: f32,
    pub seat_divider: RgbColor,
    pub board_fill: Option<RgbColor>,
    pub board_stroke: RgbColor,
    pub board_text: RgbColor,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Color => Palette {
                title: RgbColor::new(0.12, 0.31, 0.62),
                text: RgbColor::gray(0.1),
                muted_text: RgbColor::gray(0.55),
                desk_fill: Some(RgbColor::new(0.91, 0.95, 1.0)),
                desk_stroke: RgbColor::new(0.12, 0.31, 0.62),
                desk_stroke_width: 0.6,
                seat_divider: RgbColor::new(0.55, 0.68, 0.86),
                board_fill: Some(RgbColor::new(0.16, 0.42, 0.29)),
                board_stroke: RgbColor::new(0.1, 0.3, 0.2),
                board_text: WHITE,
            },
            Theme::Monochrome => Palette {
                title: BLACK,
                text: BLACK,
                muted_text: RgbColor::gray(0.5),
                desk_fill: Some(RgbColor::gray(0.93)),
                desk_stroke: BLACK,
                desk_stroke_width: 0.6,
                seat_divider: RgbColor::gray(0.6),
                board_fill: Some(RgbColor::gray(0.2)),
                board_stroke: BLACK,
                board_text: WHITE,
            },
            Theme::InkSaving => Palette {
                title: BLACK,
                text: BLACK,
                muted_text: RgbColor::gray(0.6),
                desk_fill: None,
                desk_stroke: RgbColor::gray(0.45),
                desk_stroke_width: 0.3,
                seat_divider: RgbColor::gray(0.75),
                board_fill: None,
                board_stroke: RgbColor::gray(0.45),
                board_text: BLACK,
            },
        }
    }
}
