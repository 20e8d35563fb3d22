// sitzplan: classroom seating charts with single-page PDF export

pub mod error;
pub mod import;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod picker;
pub mod placement;
pub mod remote;
pub mod render;
pub mod theme;

pub use error::AppError;
pub use layout::{solve, LayoutMetrics, PageSpec};
pub use model::{
    CapacityNotice, Classroom, Desk, NoticeLevel, Position, RowMapping, Student, FREE_SEAT_ID,
};
pub use render::{render_chart, render_chart_with_logo, DrawOp};
pub use theme::Theme;
