// Page layout for a seating chart: orientation, desk cell sizes and font scale

use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// A4 dimensions in mm (portrait)
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Margins
const MARGIN_MM: f32 = 12.0;

/// Title block above the grid
const HEADER_HEIGHT_MM: f32 = 18.0;

/// Board indicator below the grid
const BOARD_HEIGHT_MM: f32 = 10.0;
const BOARD_GAP_MM: f32 = 6.0;

/// Space left of the grid for "Reihe N" labels
const ROW_LABEL_WIDTH_MM: f32 = 14.0;

/// Spacing between desks, shrunk for dense grids
const DESK_GAP_MM: f32 = 4.0;

/// Upper bound for a desk's height in sparse grids
const MAX_DESK_HEIGHT_MM: f32 = 28.0;

/// Preferred seat height relative to seat width
const SEAT_ASPECT: f32 = 0.8;

pub const PT_PER_MM: f32 = 72.0 / 25.4;

/// Font sizes in points
const FONT_DIVISOR: f32 = 5.0;
pub const MIN_FONT_SIZE: f32 = 6.0;
pub const MAX_FONT_SIZE: f32 = 14.0;
pub const MIN_LABEL_FONT_SIZE: f32 = 4.0;
pub const LINE_SPACING: f32 = 1.2;

/// Horizontal padding inside a seat
const LABEL_PADDING_MM: f32 = 1.0;

/// Logo box in the header's top-right corner
pub const LOGO_MAX_WIDTH_MM: f32 = 40.0;
const LOGO_GAP_MM: f32 = 4.0;

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Which dimension determined the desk height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    WidthBound,
    HeightBound,
}

/// Paper and fixed page regions, all in mm. Width and height are given
/// for portrait and swapped for landscape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSpec {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_mm: f32,
    pub header_mm: f32,
    pub board_mm: f32,
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageSpec {
    pub fn a4() -> Self {
        Self {
            width_mm: A4_WIDTH_MM,
            height_mm: A4_HEIGHT_MM,
            margin_mm: MARGIN_MM,
            header_mm: HEADER_HEIGHT_MM,
            board_mm: BOARD_HEIGHT_MM,
        }
    }

    pub fn dimensions(&self, orientation: Orientation) -> (f32, f32) {
        let short = self.width_mm.min(self.height_mm);
        let long = self.width_mm.max(self.height_mm);
        match orientation {
            Orientation::Portrait => (short, long),
            Orientation::Landscape => (long, short),
        }
    }
}

/// Axis-aligned box with a top-left origin, in mm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutMetrics {
    pub orientation: Orientation,
    pub constraint: Constraint,
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub rows: usize,
    pub columns: usize,
    pub seats: usize,
    pub header: Rect,
    pub board: Rect,
    /// Top-left corner of the desk at storage row 0, column 0
    pub origin_x: f32,
    pub origin_y: f32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub seat_width: f32,
    pub gap_x: f32,
    pub gap_y: f32,
    pub row_label_width: f32,
    /// Base font size in points for seat labels
    pub font_size: f32,
}

impl LayoutMetrics {
    /// Desk box by storage position. Storage row 0 is drawn at the top,
    /// farthest from the board.
    pub fn desk_rect(&self, storage_row: usize, col: usize) -> Rect {
        Rect {
            x: self.origin_x + col as f32 * (self.cell_width + self.gap_x),
            y: self.origin_y + storage_row as f32 * (self.cell_height + self.gap_y),
            w: self.cell_width,
            h: self.cell_height,
        }
    }

    pub fn seat_rect(&self, storage_row: usize, col: usize, seat: usize) -> Rect {
        let desk = self.desk_rect(storage_row, col);
        Rect {
            x: desk.x + seat as f32 * self.seat_width,
            y: desk.y,
            w: self.seat_width,
            h: desk.h,
        }
    }

    /// Largest box with the logo's width/height ratio that fits in the
    /// header's top-right corner.
    pub fn logo_rect(&self, aspect_ratio: f32) -> Rect {
        let aspect = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            aspect_ratio
        } else {
            1.0
        };
        let max_w = LOGO_MAX_WIDTH_MM.min(self.header.w);
        let max_h = self.header.h;
        let (w, h) = if max_w / max_h > aspect {
            (max_h * aspect, max_h)
        } else {
            (max_w, max_w / aspect)
        };
        Rect {
            x: self.header.right() - w,
            y: self.header.y,
            w,
            h,
        }
    }

    /// Header width left for the title, clear of the logo if there is one.
    pub fn title_width(&self, logo: Option<&Rect>) -> f32 {
        match logo {
            Some(logo) => (logo.x - self.header.x - LOGO_GAP_MM).max(0.0),
            None => self.header.w,
        }
    }

    /// Bounding box of all desks
    pub fn grid_rect(&self) -> Rect {
        Rect {
            x: self.origin_x,
            y: self.origin_y,
            w: self.columns as f32 * self.cell_width + (self.columns - 1) as f32 * self.gap_x,
            h: self.rows as f32 * self.cell_height + (self.rows - 1) as f32 * self.gap_y,
        }
    }
}

// ============================================================================
// Solver
// ============================================================================

/// Fits a rows x columns grid of desks with `seats` seats each onto one page,
/// together with the header block and the board indicator.
///
/// Shape values below 1 are treated as 1. Never fails.
pub fn solve(rows: usize, columns: usize, seats: usize, page: &PageSpec) -> LayoutMetrics {
    let rows = rows.max(1);
    let columns = columns.max(1);
    let seats = seats.max(1);

    let orientation = if rows > columns {
        Orientation::Portrait
    } else {
        Orientation::Landscape
    };
    let (page_width, page_height) = page.dimensions(orientation);
    let margin = page.margin_mm;

    let grid_left = margin + ROW_LABEL_WIDTH_MM;
    let grid_top = margin + page.header_mm;
    let grid_bottom = page_height - margin - page.board_mm - BOARD_GAP_MM;
    let available_width = (page_width - margin - grid_left).max(1.0);
    let available_height = (grid_bottom - grid_top).max(1.0);

    // Gaps never take more than a quarter of a cell's share, so cells stay positive.
    let gap_x = DESK_GAP_MM.min(available_width / (columns as f32 * 4.0));
    let gap_y = DESK_GAP_MM.min(available_height / (rows as f32 * 4.0));

    let even_width = (available_width - gap_x * (columns - 1) as f32) / columns as f32;
    let even_height = (available_height - gap_y * (rows - 1) as f32) / rows as f32;

    let preferred_height = (even_width / seats as f32 * SEAT_ASPECT).min(MAX_DESK_HEIGHT_MM);
    let needed_height = preferred_height * rows as f32 + gap_y * (rows - 1) as f32;
    let (cell_height, constraint) = if needed_height > available_height {
        (even_height, Constraint::HeightBound)
    } else {
        (preferred_height, Constraint::WidthBound)
    };
    let cell_width = even_width;

    let grid_width = cell_width * columns as f32 + gap_x * (columns - 1) as f32;
    let grid_height = cell_height * rows as f32 + gap_y * (rows - 1) as f32;
    let origin_x = grid_left + (available_width - grid_width) / 2.0;
    let origin_y = grid_top + (available_height - grid_height) / 2.0;

    let font_size = (cell_height * PT_PER_MM / FONT_DIVISOR).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);

    let board_width = (page_width - 2.0 * margin) * 0.5;
    let metrics = LayoutMetrics {
        orientation,
        constraint,
        page_width,
        page_height,
        margin,
        rows,
        columns,
        seats,
        header: Rect {
            x: margin,
            y: margin,
            w: page_width - 2.0 * margin,
            h: page.header_mm,
        },
        board: Rect {
            x: (page_width - board_width) / 2.0,
            y: page_height - margin - page.board_mm,
            w: board_width,
            h: page.board_mm,
        },
        origin_x,
        origin_y,
        cell_width,
        cell_height,
        seat_width: cell_width / seats as f32,
        gap_x,
        gap_y,
        row_label_width: ROW_LABEL_WIDTH_MM,
        font_size,
    };

    debug!(
        rows,
        columns,
        seats,
        ?orientation,
        ?constraint,
        cell_width,
        cell_height,
        font_size,
        "layout solved"
    );
    metrics
}

// ============================================================================
// Label Fitting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelFit {
    pub font_size: f32,
    /// The label is wider or taller than its box even at the minimum size.
    pub overflows: bool,
}

/// Picks a font size for a multi-line label inside a seat.
///
/// The base size is kept when it fits. Otherwise a second pass scales it down
/// to fit, floored at `MIN_LABEL_FONT_SIZE`; below that floor the label is
/// allowed to overlap the seat border.
pub fn fit_label(lines: &[&str], box_width: f32, box_height: f32, base_size: f32) -> LabelFit {
    let usable_width = (box_width - 2.0 * LABEL_PADDING_MM).max(0.1);
    let widest = lines
        .iter()
        .map(|line| text_width_mm(line, base_size))
        .fold(0.0_f32, f32::max);
    let tallest = text_block_height_mm(lines.len(), base_size);

    let width_ratio = if widest > 0.0 { usable_width / widest } else { 1.0 };
    let height_ratio = if tallest > 0.0 { box_height / tallest } else { 1.0 };
    let ratio = width_ratio.min(height_ratio);

    if ratio >= 1.0 {
        return LabelFit {
            font_size: base_size,
            overflows: false,
        };
    }

    let scaled = base_size * ratio;
    if scaled >= MIN_LABEL_FONT_SIZE {
        LabelFit {
            font_size: scaled,
            overflows: false,
        }
    } else {
        LabelFit {
            font_size: MIN_LABEL_FONT_SIZE.min(base_size),
            overflows: true,
        }
    }
}

/// Cuts `text` down and appends "..." until it is at most `max_width` wide.
pub fn ellipsize(text: &str, max_width: f32, font_size: f32) -> String {
    if text_width_mm(text, font_size) <= max_width {
        return text.to_string();
    }
    let mut kept: Vec<char> = text.chars().collect();
    while kept.pop().is_some() {
        let candidate = format!("{}...", kept.iter().collect::<String>().trim_end());
        if text_width_mm(&candidate, font_size) <= max_width {
            return candidate;
        }
    }
    "...".to_string()
}

pub fn text_block_height_mm(lines: usize, font_size: f32) -> f32 {
    lines as f32 * font_size * LINE_SPACING / PT_PER_MM
}

/// Rendered width of `text` in Helvetica at `font_size` points, in mm.
pub fn text_width_mm(text: &str, font_size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| helvetica_advance(c) as u32).sum();
    units as f32 / 1000.0 * font_size / PT_PER_MM
}

/// Helvetica advance widths in 1/1000 em.
fn helvetica_advance(c: char) -> u16 {
    match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | '\\' | ']' | 'f' | 't' | 'I' => 278,
        'i' | 'j' | 'l' | '\'' => 222,
        '"' => 355,
        '(' | ')' | '-' | 'r' | '`' => 333,
        '*' => 389,
        '+' | '<' | '=' | '>' | '~' => 584,
        '^' => 469,
        '|' => 260,
        '{' | '}' => 334,
        '%' => 889,
        '@' => 1015,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' | 'J' => 500,
        'm' | 'M' => 833,
        'w' | 'C' | 'D' | 'H' | 'N' | 'R' | 'U' | 'Ü' => 722,
        'W' => 944,
        'F' | 'T' | 'Z' | 'ß' => 611,
        'G' | 'O' | 'Q' | 'Ö' => 778,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' | '&' | 'Ä' => 667,
        _ => 556,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_are_positive_for_all_small_shapes() {
        let page = PageSpec::a4();
        for rows in 1..=20 {
            for columns in 1..=20 {
                for seats in 1..=4 {
                    let m = solve(rows, columns, seats, &page);
                    assert!(m.cell_width > 0.0, "{}x{}x{}", rows, columns, seats);
                    assert!(m.cell_height > 0.0, "{}x{}x{}", rows, columns, seats);
                    assert!(m.seat_width > 0.0);
                    assert!(m.font_size >= MIN_FONT_SIZE && m.font_size <= MAX_FONT_SIZE);
                }
            }
        }
    }

    #[test]
    fn grid_stays_between_header_and_board() {
        let page = PageSpec::a4();
        let shapes = [(1, 1, 1), (2, 2, 2), (6, 5, 2), (20, 20, 4), (3, 12, 3), (15, 2, 1)];
        for (rows, columns, seats) in shapes {
            let m = solve(rows, columns, seats, &page);
            let grid = m.grid_rect();
            assert!(grid.x >= m.margin + m.row_label_width - 1e-3);
            assert!(grid.right() <= m.page_width - m.margin + 1e-3);
            assert!(grid.y >= m.header.bottom() - 1e-3);
            assert!(grid.bottom() <= m.board.y + 1e-3);
            assert!(m.board.bottom() <= m.page_height - m.margin + 1e-3);
        }
    }

    #[test]
    fn orientation_follows_grid_shape() {
        let page = PageSpec::a4();
        let tall = solve(6, 4, 2, &page);
        assert_eq!(tall.orientation, Orientation::Portrait);
        assert_eq!((tall.page_width, tall.page_height), (A4_WIDTH_MM, A4_HEIGHT_MM));

        let wide = solve(4, 4, 2, &page);
        assert_eq!(wide.orientation, Orientation::Landscape);
        assert_eq!((wide.page_width, wide.page_height), (A4_HEIGHT_MM, A4_WIDTH_MM));
    }

    #[test]
    fn single_desk_is_width_bound_and_capped() {
        let m = solve(1, 1, 1, &PageSpec::a4());
        assert_eq!(m.constraint, Constraint::WidthBound);
        assert!((m.cell_height - MAX_DESK_HEIGHT_MM).abs() < 1e-4);
        assert_eq!(m.font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn many_rows_switch_to_height_bound() {
        let m = solve(20, 2, 1, &PageSpec::a4());
        assert_eq!(m.constraint, Constraint::HeightBound);
        assert!(m.cell_height < m.cell_width);
    }

    #[test]
    fn font_scales_with_cell_height() {
        let page = PageSpec::a4();
        let sparse = solve(3, 4, 2, &page);
        let dense = solve(12, 14, 2, &page);
        assert!(dense.cell_height < sparse.cell_height);
        assert!(dense.font_size <= sparse.font_size);
    }

    #[test]
    fn short_label_keeps_base_size() {
        let fit = fit_label(&["Max", "Muster"], 30.0, 20.0, 10.0);
        assert_eq!(fit.font_size, 10.0);
        assert!(!fit.overflows);
    }

    #[test]
    fn long_label_gets_second_smaller_pass() {
        let name = "Maximilian-Alexander";
        let base = 10.0;
        assert!(text_width_mm(name, base) > 28.0);

        let fit = fit_label(&[name], 30.0, 20.0, base);
        assert!(fit.font_size < base);
        assert!(!fit.overflows);
        assert!(text_width_mm(name, fit.font_size) <= 28.0 + 1e-3);
    }

    #[test]
    fn extremely_long_label_overflows_without_failing() {
        let name = "W".repeat(200);
        let fit = fit_label(&[name.as_str()], 10.0, 8.0, 8.0);
        assert_eq!(fit.font_size, MIN_LABEL_FONT_SIZE);
        assert!(fit.overflows);
    }

    #[test]
    fn logo_rect_sits_in_the_header_corner() {
        let m = solve(4, 5, 2, &PageSpec::a4());
        for aspect in [0.25, 1.0, 3.0, 10.0, 0.0, f32::NAN] {
            let logo = m.logo_rect(aspect);
            assert!(logo.x >= m.header.x - 1e-3, "aspect {}", aspect);
            assert!(logo.y >= m.header.y - 1e-3);
            assert!(logo.w <= LOGO_MAX_WIDTH_MM + 1e-3);
            assert!(logo.bottom() <= m.header.bottom() + 1e-3);
            assert!((logo.right() - m.header.right()).abs() < 1e-3);
        }
        let wide = m.logo_rect(4.0);
        assert!((wide.w - LOGO_MAX_WIDTH_MM).abs() < 1e-3);
        assert!((wide.h - 10.0).abs() < 1e-3);

        assert_eq!(m.title_width(None), m.header.w);
        assert!(m.title_width(Some(&wide)) < wide.x - m.header.x);
    }

    #[test]
    fn ellipsize_shortens_only_when_needed() {
        assert_eq!(ellipsize("Klasse 5a", 100.0, 12.0), "Klasse 5a");

        let long = "Arbeitsgemeinschaft Naturwissenschaften ".repeat(5);
        let short = ellipsize(&long, 60.0, 12.0);
        assert!(short.ends_with("..."));
        assert!(text_width_mm(&short, 12.0) <= 60.0);
        assert_eq!(ellipsize("Klasse", 0.5, 12.0), "...");
    }

    #[test]
    fn helvetica_widths() {
        // "Max" = 833 + 556 + 500 units
        let width = text_width_mm("Max", 10.0);
        assert!((width - 1.889 * 10.0 / PT_PER_MM).abs() < 1e-4);
        assert!(text_width_mm("iii", 10.0) < text_width_mm("MMM", 10.0));
    }
}
