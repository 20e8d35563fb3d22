// sitzplan: build classroom seating charts and export them as PDF

use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sitzplan::import::{self, ColumnMapping};
use sitzplan::layout::PageSpec;
use sitzplan::pdf::{self, ExportOptions, Logo};
use sitzplan::picker::{self, Timing};
use sitzplan::remote::{self, HttpRosterSource, SessionRoster};
use sitzplan::{AppError, Classroom, NoticeLevel, Student, Theme};

// ============================================================================
// Defaults
// ============================================================================

const DEFAULT_ROWS: usize = 5;
const DEFAULT_COLUMNS: usize = 6;
const DEFAULT_SEATS: usize = 2;

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Build classroom seating charts and export them as PDF")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a seating chart and export it as a single-page PDF
    Export(ExportArgs),
    /// Randomly pick students, form groups or plan a presentation order
    Pick(PickArgs),
    /// List the classes of a teacher from the remote service
    Classes(ClassesArgs),
}

/// Where students come from. Sources are combined.
#[derive(Args, Debug)]
struct StudentSources {
    /// Student roster file (JSON array of {firstName, lastName} or {name})
    #[arg(long)]
    roster: Option<String>,

    /// Spreadsheet with a header row (.csv)
    #[arg(long, requires_all = ["first_name_col", "last_name_col"])]
    spreadsheet: Option<String>,

    /// Spreadsheet column holding first names (0-based)
    #[arg(long)]
    first_name_col: Option<usize>,

    /// Spreadsheet column holding last names (0-based)
    #[arg(long)]
    last_name_col: Option<usize>,

    /// Bulk text file with lines like U[(first);(last);(email);(number)]
    #[arg(long)]
    bulk: Option<String>,

    /// Anonymous students numbered 1..=N
    #[arg(long)]
    numbered: Option<u32>,

    /// Base URL of the remote REST service
    #[arg(long, env = "SITZPLAN_REMOTE_URL")]
    remote_url: Option<String>,

    /// API key for the remote REST service
    #[arg(long, env = "SITZPLAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Remote class whose students to load
    #[arg(long, requires = "remote_url")]
    class_id: Option<String>,

    /// Student ids to leave out
    #[arg(long)]
    exclude: Vec<String>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Class name
    #[arg(short, long, required_unless_present = "chart")]
    name: Option<String>,

    /// Rows of desks
    #[arg(short, long)]
    rows: Option<usize>,

    /// Desks per row
    #[arg(short, long)]
    columns: Option<usize>,

    /// Seats per desk
    #[arg(short, long)]
    seats: Option<usize>,

    /// Existing chart file to start from
    #[arg(long)]
    chart: Option<String>,

    /// Save the filled chart to this file
    #[arg(long)]
    save: Option<String>,

    #[command(flatten)]
    sources: StudentSources,

    /// Keep placements as loaded instead of seating the roster randomly
    #[arg(long)]
    no_fill: bool,

    /// Empty all desks before filling
    #[arg(long)]
    reshuffle: bool,

    /// Random seed for reproducible charts
    #[arg(long)]
    seed: Option<u64>,

    /// Colour theme
    #[arg(short, long, value_enum, default_value_t = Theme::Color)]
    theme: Theme,

    /// Date (YYYY-MM-DD or DD.MM.YYYY, defaults to today)
    #[arg(short, long)]
    date: Option<String>,

    /// Logo image (file path or URL) to display in header top-right
    #[arg(long)]
    logo: Option<String>,

    /// Output filename (defaults to Sitzplan_<name>.pdf)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args, Debug)]
struct PickArgs {
    #[command(flatten)]
    sources: StudentSources,

    /// Number of students to pick
    #[arg(short = 'k', long, default_value = "1")]
    count: usize,

    /// Split everyone into this many groups instead of picking
    #[arg(short, long, conflicts_with = "schedule_start")]
    groups: Option<usize>,

    /// Plan a presentation order starting at this date (YYYY-MM-DD or DD.MM.YYYY)
    #[arg(long)]
    schedule_start: Option<String>,

    /// Presentations per school day
    #[arg(long, default_value = "2")]
    per_day: usize,

    /// Show the result without the animation
    #[arg(long)]
    no_animation: bool,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ClassesArgs {
    /// Teacher account id
    #[arg(long)]
    owner_id: String,

    /// Restrict to one school
    #[arg(long)]
    school_id: Option<String>,

    /// Base URL of the remote REST service
    #[arg(long, env = "SITZPLAN_REMOTE_URL")]
    remote_url: String,

    /// API key for the remote REST service
    #[arg(long, env = "SITZPLAN_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sitzplan=info")),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    match Cli::parse().command {
        Command::Export(args) => run_export(args),
        Command::Pick(args) => run_pick(args),
        Command::Classes(args) => run_classes(args),
    }
}

// ============================================================================
// Export
// ============================================================================

fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let date = parse_date(args.date.as_deref())?;
    let mut rng = make_rng(args.seed);

    let mut classroom = match &args.chart {
        Some(path) => {
            let mut classroom = Classroom::load(path)?;
            if args.rows.is_some() || args.columns.is_some() || args.seats.is_some() {
                classroom.resize(args.rows, args.columns, args.seats);
            }
            classroom
        }
        None => Classroom::new(
            args.name.clone().unwrap_or_default(),
            args.rows.unwrap_or(DEFAULT_ROWS),
            args.columns.unwrap_or(DEFAULT_COLUMNS),
            args.seats.unwrap_or(DEFAULT_SEATS),
        ),
    };
    if let Some(name) = &args.name {
        classroom.name = name.clone();
    }

    import::merge_students(&mut classroom.students, load_students(&args.sources)?);
    for id in &args.sources.exclude {
        if !classroom.set_excluded(id, true) {
            tracing::warn!(id = %id, "unknown student id in --exclude");
        }
    }

    if args.reshuffle {
        classroom.reset();
    }
    if !args.no_fill {
        classroom.auto_fill(&mut rng);
    }

    let notice = classroom.capacity_notice();
    match notice.level() {
        Some(NoticeLevel::Warning) => println!("⚠ {}", notice),
        Some(NoticeLevel::Info) => println!("ℹ {}", notice),
        None => {}
    }

    let output_file = args
        .output
        .clone()
        .unwrap_or_else(|| pdf::chart_filename(&classroom.name));

    let options = ExportOptions {
        theme: args.theme,
        date,
        page: PageSpec::a4(),
        logo: args.logo.as_deref().map(Logo::load).transpose()?,
    };
    let summary = pdf::export_chart(&classroom, &options, &output_file)?;

    if let Some(path) = &args.save {
        classroom.save(path)?;
        println!("✓ Saved chart: {}", path);
    }

    println!("✓ Generated: {}", output_file);
    println!("  Class: {}", classroom.name);
    println!("  Date: {}", date.format("%d.%m.%Y"));
    println!(
        "  Layout: {} x {} desks, {} seats each ({:?})",
        classroom.rows(),
        classroom.columns(),
        classroom.students_per_desk(),
        summary.orientation
    );
    println!("  Seated: {} of {}", summary.seated, classroom.capacity());

    Ok(())
}

// ============================================================================
// Random Selection
// ============================================================================

fn run_pick(args: PickArgs) -> Result<(), AppError> {
    let mut rng = make_rng(args.seed);
    let students: Vec<Student> = load_students(&args.sources)?
        .into_iter()
        .filter(|s| !args.sources.exclude.contains(&s.id))
        .collect();
    if students.is_empty() {
        return Err(AppError::RosterError("no students to pick from".into()));
    }

    let schedule_start = match args.schedule_start.as_deref() {
        Some(start) => Some(parse_date(Some(start))?),
        None => None,
    };
    let count = args.count.max(1);

    // Frames of the animation are drawn the same way as the result.
    let draw = |rng: &mut StdRng| -> String {
        if let Some(groups) = args.groups {
            picker::assign_groups(&students, groups, rng)
                .iter()
                .enumerate()
                .map(|(i, group)| format!("Gruppe {}: {}", i + 1, names(group)))
                .collect::<Vec<_>>()
                .join("\n")
        } else if let Some(start) = schedule_start {
            picker::submission_schedule(&students, start, args.per_day, rng)
                .iter()
                .map(|(day, s)| format!("{}  {}", day.format("%a %d.%m.%Y"), s.display_name()))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            names(&picker::pick_many(&students, count, rng))
        }
    };

    let result = draw(&mut rng);
    if args.no_animation {
        println!("{}", result);
        return Ok(());
    }

    let frames = picker::plan(result, Timing::default(), &mut rng, |r| draw(r));
    play(picker::spawn(frames, Duration::from_millis(picker::TICK_MS)));
    Ok(())
}

/// Redraws each frame over the previous one, however many lines it has.
fn play(handle: picker::AnimationHandle<String>) {
    let mut stdout = std::io::stdout();
    let mut shown_lines = 0;
    while let Some(frame) = handle.next_frame() {
        if shown_lines > 0 {
            // Cursor to the first line of the previous frame, then clear below.
            let _ = write!(stdout, "\x1b[{}F", shown_lines);
        }
        let _ = writeln!(stdout, "\x1b[J{}", frame.value);
        let _ = stdout.flush();
        shown_lines = frame.value.lines().count().max(1);
    }
}

fn names(students: &[Student]) -> String {
    students
        .iter()
        .map(Student::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Remote Classes
// ============================================================================

fn run_classes(args: ClassesArgs) -> Result<(), AppError> {
    let source = HttpRosterSource::new(args.remote_url, args.api_key);
    let classes =
        remote::fetch_classes_or_empty(&source, &args.owner_id, args.school_id.as_deref());
    if classes.is_empty() {
        println!("No classes found");
    }
    for class in classes {
        println!("{}  {}", class.id, class.name);
    }
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// ISO or German date; today when none is given.
fn parse_date(text: Option<&str>) -> Result<NaiveDate, AppError> {
    let Some(text) = text.map(str::trim) else {
        return Ok(Local::now().date_naive());
    };
    ["%Y-%m-%d", "%d.%m.%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .ok_or_else(|| AppError::DateError(text.to_string()))
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Students from every given source, duplicates dropped.
fn load_students(sources: &StudentSources) -> Result<Vec<Student>, AppError> {
    let mut students = Vec::new();

    if let Some(path) = &sources.roster {
        import::merge_students(&mut students, import::load_roster_json(path)?);
    }

    if let Some(path) = &sources.spreadsheet {
        let rows = import::read_spreadsheet(path)?;
        let mapping = ColumnMapping {
            first_name: sources.first_name_col.unwrap_or(0),
            last_name: sources.last_name_col.unwrap_or(1),
        };
        let width = import::header(&rows).len();
        if mapping.first_name >= width || mapping.last_name >= width {
            return Err(AppError::ImportError(format!(
                "{}: the header has only {} columns",
                path, width
            )));
        }
        import::merge_students(&mut students, import::students_from_rows(&rows, mapping));
    }

    if let Some(path) = &sources.bulk {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::ImportError(format!("{}: {}", path, e)))?;
        let parsed = import::parse_bulk(&text);
        for skipped in &parsed.skipped {
            eprintln!("  skipped line {}: {}", skipped.line, skipped.reason);
        }
        import::merge_students(&mut students, parsed.students);
    }

    if let Some(count) = sources.numbered {
        import::merge_students(&mut students, import::numbered_roster(count));
    }

    if let (Some(url), Some(class_id)) = (&sources.remote_url, &sources.class_id) {
        let source = HttpRosterSource::new(url.clone(), sources.api_key.clone());
        let mut session = SessionRoster::new(source);
        import::merge_students(&mut students, session.students(class_id));
    }

    Ok(students)
}
