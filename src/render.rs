// Target-agnostic chart rendering: walks the classroom and emits draw operations

use chrono::NaiveDate;

use crate::layout::{
    ellipsize, fit_label, text_block_height_mm, text_width_mm, LayoutMetrics, Rect, LINE_SPACING,
    PT_PER_MM,
};
use crate::model::{to_display_order, Classroom, Student};
use crate::theme::{Palette, RgbColor};

/// Font sizes in points
const TITLE_FONT_SIZE: f32 = 16.0;
const SUBTITLE_FONT_SIZE: f32 = 10.0;
const BOARD_FONT_SIZE: f32 = 12.0;
const MAX_ROW_LABEL_FONT_SIZE: f32 = 9.0;

/// Share of the font size above the baseline
const ASCENT: f32 = 0.8;

pub const EMPTY_SEAT_LABEL: &str = "frei";
pub const BOARD_LABEL: &str = "Tafel";

/// One drawing instruction in page coordinates (mm, origin top-left).
/// Text positions are the left end of the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        rect: Rect,
        fill: Option<RgbColor>,
        stroke: Option<RgbColor>,
        line_width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: RgbColor,
        line_width: f32,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        font_size: f32,
        bold: bool,
        color: RgbColor,
    },
    /// Slot for the header logo; the backend draws the image into it.
    Logo {
        rect: Rect,
    },
}

/// Emits the whole chart: header, desks row by row starting at the board,
/// seats left to right, then the board indicator.
pub fn render_chart(
    classroom: &Classroom,
    metrics: &LayoutMetrics,
    palette: &Palette,
    date: NaiveDate,
) -> Vec<DrawOp> {
    render_chart_with_logo(classroom, metrics, palette, date, None)
}

/// Like `render_chart`, reserving the header's top-right corner for a logo
/// with the given width/height ratio.
pub fn render_chart_with_logo(
    classroom: &Classroom,
    metrics: &LayoutMetrics,
    palette: &Palette,
    date: NaiveDate,
    logo_aspect: Option<f32>,
) -> Vec<DrawOp> {
    let mut ops = Vec::new();
    let logo = logo_aspect.map(|aspect| metrics.logo_rect(aspect));
    draw_header(&mut ops, classroom, metrics, palette, date, logo.as_ref());
    if let Some(rect) = logo {
        ops.push(DrawOp::Logo { rect });
    }

    let mapping = classroom.mapping();
    for (display_row, row) in to_display_order(&classroom.desks).into_iter().enumerate() {
        let Some(storage_row) = mapping.to_storage(display_row) else {
            continue;
        };
        draw_row_label(&mut ops, metrics, palette, storage_row, display_row);

        for (col, desk) in row.iter().enumerate() {
            let desk_rect = metrics.desk_rect(storage_row, col);
            ops.push(DrawOp::Rect {
                rect: desk_rect,
                fill: palette.desk_fill,
                stroke: Some(palette.desk_stroke),
                line_width: palette.desk_stroke_width,
            });

            for seat in 1..metrics.seats {
                let x = desk_rect.x + seat as f32 * metrics.seat_width;
                ops.push(DrawOp::Line {
                    x1: x,
                    y1: desk_rect.y,
                    x2: x,
                    y2: desk_rect.bottom(),
                    color: palette.seat_divider,
                    line_width: 0.3,
                });
            }

            for seat in 0..metrics.seats {
                let seat_rect = metrics.seat_rect(storage_row, col, seat);
                draw_seat_label(&mut ops, metrics, palette, seat_rect, desk.students.get(seat));
            }
        }
    }

    draw_board(&mut ops, metrics, palette);
    ops
}

fn draw_header(
    ops: &mut Vec<DrawOp>,
    classroom: &Classroom,
    metrics: &LayoutMetrics,
    palette: &Palette,
    date: NaiveDate,
    logo: Option<&Rect>,
) {
    let header = metrics.header;
    let title_width = metrics.title_width(logo);
    let title = format!("Sitzplan - {}", classroom.name);
    let fit = fit_label(&[title.as_str()], title_width, header.h, TITLE_FONT_SIZE);
    let title = if fit.overflows {
        ellipsize(&title, title_width, fit.font_size)
    } else {
        title
    };
    ops.push(DrawOp::Text {
        x: header.x,
        y: header.y + TITLE_FONT_SIZE / PT_PER_MM,
        text: title,
        font_size: fit.font_size,
        bold: true,
        color: palette.title,
    });

    let subtitle = format!(
        "{} | {} Personen | {} Reihen x {} Tische x {} Plaetze",
        date.format("%d.%m.%Y"),
        classroom.seated_count(),
        classroom.rows,
        classroom.columns,
        classroom.students_per_desk
    );
    ops.push(DrawOp::Text {
        x: header.x,
        y: header.y + TITLE_FONT_SIZE / PT_PER_MM + 2.0 + SUBTITLE_FONT_SIZE / PT_PER_MM,
        text: subtitle,
        font_size: SUBTITLE_FONT_SIZE,
        bold: false,
        color: palette.muted_text,
    });
}

fn draw_row_label(
    ops: &mut Vec<DrawOp>,
    metrics: &LayoutMetrics,
    palette: &Palette,
    storage_row: usize,
    display_row: usize,
) {
    let row_rect = metrics.desk_rect(storage_row, 0);
    let text = format!("Reihe {}", display_row + 1);
    let font_size = metrics.font_size.min(MAX_ROW_LABEL_FONT_SIZE);
    let fit = fit_label(&[text.as_str()], metrics.row_label_width, row_rect.h, font_size);
    ops.push(DrawOp::Text {
        x: metrics.margin,
        y: row_rect.y + row_rect.h / 2.0 + fit.font_size * ASCENT / PT_PER_MM / 2.0,
        text,
        font_size: fit.font_size,
        bold: false,
        color: palette.muted_text,
    });
}

fn draw_seat_label(
    ops: &mut Vec<DrawOp>,
    metrics: &LayoutMetrics,
    palette: &Palette,
    seat: Rect,
    student: Option<&Student>,
) {
    let (lines, color): (Vec<&str>, RgbColor) = match student {
        Some(student) if !student.is_free_seat() => {
            let lines = [student.first_name.trim(), student.last_name.trim()]
                .into_iter()
                .filter(|line| !line.is_empty())
                .collect();
            (lines, palette.text)
        }
        _ => (vec![EMPTY_SEAT_LABEL], palette.muted_text),
    };
    if lines.is_empty() {
        return;
    }

    let fit = fit_label(&lines, seat.w, seat.h, metrics.font_size);
    let line_height = fit.font_size * LINE_SPACING / PT_PER_MM;
    let block_top = seat.y + (seat.h - text_block_height_mm(lines.len(), fit.font_size)) / 2.0;

    for (i, line) in lines.iter().enumerate() {
        let width = text_width_mm(line, fit.font_size);
        ops.push(DrawOp::Text {
            x: seat.x + (seat.w - width) / 2.0,
            y: block_top + i as f32 * line_height + fit.font_size * ASCENT / PT_PER_MM,
            text: line.to_string(),
            font_size: fit.font_size,
            bold: false,
            color,
        });
    }
}

fn draw_board(ops: &mut Vec<DrawOp>, metrics: &LayoutMetrics, palette: &Palette) {
    let board = metrics.board;
    ops.push(DrawOp::Rect {
        rect: board,
        fill: palette.board_fill,
        stroke: Some(palette.board_stroke),
        line_width: 0.8,
    });
    let width = text_width_mm(BOARD_LABEL, BOARD_FONT_SIZE);
    ops.push(DrawOp::Text {
        x: board.x + (board.w - width) / 2.0,
        y: board.y + board.h / 2.0 + BOARD_FONT_SIZE * ASCENT / PT_PER_MM / 2.0,
        text: BOARD_LABEL.to_string(),
        font_size: BOARD_FONT_SIZE,
        bold: true,
        color: palette.board_text,
    });
}
