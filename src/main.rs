use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use piste::config::Config;
use piste::db::{Database, Decision, ImportSource};
use piste::gazetteer::{load_seed, seed_resorts};
use piste::import::{KeyUpdate, SessionReport};
use piste::scanner::{discover_photos, FsImageStore};
use piste::season::SeasonCalendar;
use piste::tasks::{TaskHandle, TaskType, TaskUpdate};
use piste::{logging, Importer, Outcome};

enum Command {
    OwnerAdd { name: String, season_start: Option<String> },
    OwnerSeasonStart { owner: i64, season_start: String },
    ResortSeed { path: PathBuf },
    ResortSuggest { owner: i64, name: String, country: String, coordinates: Option<(f64, f64)> },
    ImportText { owner: i64, path: String, season_offset: i32 },
    ImportPhotos { owner: i64, directory: PathBuf },
    Drafts { session: i64 },
    DraftKey { draft: i64, date: NaiveDate, resort: i64 },
    DraftDecision { draft: i64, decision: Decision },
    EvidenceKey { evidence: i64, date: NaiveDate, resort: i64 },
    DayAdd { owner: i64, date: NaiveDate, resort: i64, notes: Option<String> },
    DayMove { day: i64, date: NaiveDate, resort: i64 },
    DayDelete { day: i64 },
    Commit { session: i64 },
    Cancel { session: i64 },
    Renumber { owner: i64, dates: Vec<NaiveDate> },
}

struct Args {
    config_path: Option<PathBuf>,
    command: Command,
}

fn parse_id(value: Option<&String>, what: &str) -> Result<i64> {
    let value = value.ok_or_else(|| anyhow!("missing {}", what))?;
    value.parse().with_context(|| format!("invalid {}: {}", what, value))
}

fn parse_date(value: Option<&String>) -> Result<NaiveDate> {
    let value = value.ok_or_else(|| anyhow!("missing date"))?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d").with_context(|| format!("invalid date: {}", value))
}

fn required(value: Option<&String>, what: &str) -> Result<String> {
    value.cloned().ok_or_else(|| anyhow!("missing {}", what))
}

fn parse_args() -> Result<Args> {
    let mut config_path = None;
    let mut season_start = None;
    let mut season_offset = 0;
    let mut positional: Vec<String> = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("piste {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                let path = args.next().ok_or_else(|| anyhow!("--config requires a path argument"))?;
                config_path = Some(PathBuf::from(path));
            }
            "--season-start" => {
                season_start = Some(args.next().ok_or_else(|| anyhow!("--season-start requires MM-DD"))?);
            }
            "--season-offset" => {
                let value = args.next().ok_or_else(|| anyhow!("--season-offset requires a number"))?;
                season_offset = value
                    .parse()
                    .with_context(|| format!("invalid season offset: {}", value))?;
            }
            _ => positional.push(arg),
        }
    }

    let words: Vec<&str> = positional.iter().map(String::as_str).collect();
    let command = match words.as_slice() {
        ["owner", "add", ..] => Command::OwnerAdd {
            name: required(positional.get(2), "owner name")?,
            season_start,
        },
        ["owner", "season-start", ..] => Command::OwnerSeasonStart {
            owner: parse_id(positional.get(2), "owner id")?,
            season_start: required(positional.get(3), "season start (MM-DD)")?,
        },
        ["resort", "seed", ..] => Command::ResortSeed {
            path: PathBuf::from(required(positional.get(2), "seed file")?),
        },
        ["resort", "suggest", ..] => {
            let coordinates = match (positional.get(5), positional.get(6)) {
                (Some(lat), Some(lon)) => Some((
                    lat.parse().with_context(|| format!("invalid latitude: {}", lat))?,
                    lon.parse().with_context(|| format!("invalid longitude: {}", lon))?,
                )),
                _ => None,
            };
            Command::ResortSuggest {
                owner: parse_id(positional.get(2), "owner id")?,
                name: required(positional.get(3), "resort name")?,
                country: required(positional.get(4), "country")?,
                coordinates,
            }
        }
        ["import", "text", ..] => Command::ImportText {
            owner: parse_id(positional.get(2), "owner id")?,
            path: required(positional.get(3), "text file (or -)")?,
            season_offset,
        },
        ["import", "photos", ..] => Command::ImportPhotos {
            owner: parse_id(positional.get(2), "owner id")?,
            directory: PathBuf::from(required(positional.get(3), "photo directory")?),
        },
        ["drafts", ..] => Command::Drafts {
            session: parse_id(positional.get(1), "session id")?,
        },
        ["draft", "key", ..] => Command::DraftKey {
            draft: parse_id(positional.get(2), "draft id")?,
            date: parse_date(positional.get(3))?,
            resort: parse_id(positional.get(4), "resort id")?,
        },
        ["draft", "decision", ..] => {
            let value = required(positional.get(3), "decision")?;
            Command::DraftDecision {
                draft: parse_id(positional.get(2), "draft id")?,
                decision: Decision::from_str(&value)
                    .ok_or_else(|| anyhow!("decision must be pending, merge, duplicate or skip"))?,
            }
        }
        ["evidence", "key", ..] => Command::EvidenceKey {
            evidence: parse_id(positional.get(2), "evidence id")?,
            date: parse_date(positional.get(3))?,
            resort: parse_id(positional.get(4), "resort id")?,
        },
        ["day", "add", ..] => Command::DayAdd {
            owner: parse_id(positional.get(2), "owner id")?,
            date: parse_date(positional.get(3))?,
            resort: parse_id(positional.get(4), "resort id")?,
            notes: positional.get(5).cloned(),
        },
        ["day", "move", ..] => Command::DayMove {
            day: parse_id(positional.get(2), "day id")?,
            date: parse_date(positional.get(3))?,
            resort: parse_id(positional.get(4), "resort id")?,
        },
        ["day", "delete", ..] => Command::DayDelete {
            day: parse_id(positional.get(2), "day id")?,
        },
        ["commit", ..] => Command::Commit {
            session: parse_id(positional.get(1), "session id")?,
        },
        ["cancel", ..] => Command::Cancel {
            session: parse_id(positional.get(1), "session id")?,
        },
        ["renumber", ..] => Command::Renumber {
            owner: parse_id(positional.get(1), "owner id")?,
            dates: positional[2..]
                .iter()
                .map(|d| parse_date(Some(d)))
                .collect::<Result<Vec<_>>>()?,
        },
        [] => {
            print_help();
            std::process::exit(1);
        }
        _ => bail!("unknown command: {}", positional.join(" ")),
    };

    Ok(Args {
        config_path,
        command,
    })
}

fn print_help() {
    println!(
        r#"piste - ski-day journal import engine

USAGE:
    piste [OPTIONS] <COMMAND>

COMMANDS:
    owner add NAME [--season-start MM-DD]
    owner season-start OWNER MM-DD
    resort seed FILE.toml
    resort suggest OWNER NAME COUNTRY [LAT LON]
    import text OWNER FILE|- [--season-offset N]
    import photos OWNER DIRECTORY
    drafts SESSION
    draft key DRAFT YYYY-MM-DD RESORT
    draft decision DRAFT pending|merge|duplicate|skip
    evidence key EVIDENCE YYYY-MM-DD RESORT
    day add OWNER YYYY-MM-DD RESORT [NOTES]
    day move DAY YYYY-MM-DD RESORT
    day delete DAY
    commit SESSION
    cancel SESSION
    renumber OWNER YYYY-MM-DD...

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    PISTE_CONFIG        Path to config file (overrides default location)
    PISTE_LOG           Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/piste/config.toml"#
    );
}

fn day_label(day_number: Option<i64>) -> String {
    day_number.map_or_else(|| "-".to_string(), |n| n.to_string())
}

fn finish<T>(outcome: Outcome<T>) -> Result<T> {
    outcome.into_result().map_err(|e| anyhow!(e))
}

fn print_report(report: &SessionReport) {
    println!(
        "Session {} ({}, {})",
        report.session.id, report.session.source, report.session.status
    );
    for entry in &report.drafts {
        let draft = &entry.draft;
        let link = draft
            .linked_day_id
            .map(|id| format!(" -> day {}", id))
            .unwrap_or_default();
        println!(
            "  draft {:>4}  {}  resort {:>4}  {}{}  ({} items)",
            draft.id,
            draft.date,
            draft.resort_id,
            draft.decision,
            link,
            entry.evidence.len()
        );
    }
    if !report.unattached.is_empty() {
        println!("  needs review:");
        for item in &report.unattached {
            println!(
                "    evidence {:>4}  {}  {}",
                item.id,
                item.raw,
                item.error.as_deref().unwrap_or("unresolved")
            );
        }
    }
}

/// Run `job` on a worker thread while printing its progress updates.
fn with_progress<T: Send>(
    task_type: TaskType,
    job: impl FnOnce(mpsc::Sender<TaskUpdate>, &AtomicBool) -> Outcome<T> + Send,
) -> Result<(Outcome<T>, Duration)> {
    let (handle, tx) = TaskHandle::new(task_type);
    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| job(tx, &handle.cancel_flag));
        for update in handle.updates() {
            match update {
                TaskUpdate::Progress(progress) => eprint!(
                    "\r{}: {:>3}% ({}/{})",
                    handle.task_type.display_name(),
                    progress.percent(),
                    progress.current,
                    progress.total
                ),
                TaskUpdate::Completed { message } => eprintln!("\n{}", message),
                TaskUpdate::Failed { error } => eprintln!("\n{}", error),
                TaskUpdate::Started { .. } | TaskUpdate::Cancelled => {}
            }
        }
        worker
            .join()
            .map_err(|_| anyhow!("{} worker panicked", handle.task_type.display_name()))
    })?;
    Ok((outcome, handle.elapsed()))
}

fn import_photos(importer: &Importer, config: &Config, owner: i64, directory: &PathBuf) -> Result<()> {
    let photos = discover_photos(directory, &config.scanner.image_extensions)?;
    let session = finish(importer.start_session(owner, ImportSource::Photos))?;
    for path in &photos {
        let blob_ref = path.to_string_lossy();
        if let Err(e) = finish(importer.enqueue_photo(session.id, &blob_ref)) {
            eprintln!("skipping {}: {}", path.display(), e);
        }
    }

    let (outcome, elapsed) = with_progress(TaskType::PhotoExtraction, |tx, cancel| {
        importer.process_photos(session.id, Some(tx), cancel)
    })?;
    let summary = finish(outcome)?;
    println!(
        "Session {}: {} photos, {} with GPS, {} placed ({:.1}s)",
        session.id,
        summary.processed,
        summary.extracted,
        summary.attached,
        elapsed.as_secs_f64()
    );
    print_report(&finish(importer.session_report(session.id))?);
    Ok(())
}

fn run(args: Args, config: Config, db: Arc<Database>) -> Result<()> {
    let importer = Importer::new(db.clone(), Arc::new(FsImageStore::new()), config.import.clone());

    match args.command {
        Command::OwnerAdd { name, season_start } => {
            let id = finish(importer.create_owner(&name))?;
            if let Some(start) = season_start {
                let (month, day) = SeasonCalendar::parse(&start)?.start();
                finish(importer.set_season_start(id, month, day))?;
            }
            println!("Owner {} created", id);
        }
        Command::OwnerSeasonStart { owner, season_start } => {
            let (month, day) = SeasonCalendar::parse(&season_start)?.start();
            let summary = finish(importer.set_season_start(owner, month, day))?;
            println!("Season start set; {} days renumbered in the current season", summary.days);
        }
        Command::ResortSeed { path } => {
            let seeds = load_seed(&path)?;
            let inserted = db.write(|store| seed_resorts(store, &seeds))?;
            println!("{} resorts added, {} already present", inserted, seeds.len() - inserted);
        }
        Command::ResortSuggest { owner, name, country, coordinates } => {
            let resort = finish(importer.suggest_resort(owner, &name, &country, coordinates))?;
            println!("Resort {} suggested: {} ({})", resort.id, resort.name, resort.country);
        }
        Command::ImportText { owner, path, season_offset } => {
            let mut raw = String::new();
            if path == "-" {
                std::io::stdin().read_to_string(&mut raw)?;
            } else {
                raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path))?;
            }
            let session = finish(importer.start_session(owner, ImportSource::Text))?;
            let import = finish(importer.parse_text(session.id, &raw, season_offset))?;
            println!("Session {}: {} lines, {} drafts", session.id, import.lines, import.drafts.len());
            if let Some(summary) = import.error_summary() {
                println!("{}:", summary);
                for line in &import.errors {
                    println!("  line {}: {} ({})", line.line_no, line.error, line.text);
                }
            }
        }
        Command::ImportPhotos { owner, directory } => import_photos(&importer, &config, owner, &directory)?,
        Command::Drafts { session } => print_report(&finish(importer.session_report(session))?),
        Command::DraftKey { draft, date, resort } => match finish(importer.update_draft_key(draft, date, resort))? {
            KeyUpdate::Updated(draft) => println!("Draft {} is now {} ({})", draft.id, draft.date, draft.decision),
            KeyUpdate::MergedInto { target, removed_id } => {
                println!("Draft {} merged into existing draft {}", removed_id, target.id)
            }
        },
        Command::DraftDecision { draft, decision } => {
            let draft = finish(importer.update_draft_decision(draft, decision))?;
            println!("Draft {} decision: {}", draft.id, draft.decision);
        }
        Command::EvidenceKey { evidence, date, resort } => {
            match finish(importer.update_evidence(evidence, date, resort))? {
                Some(draft) => println!("Evidence {} filed under draft {}", evidence, draft.id),
                None => println!("Evidence {} left unattached", evidence),
            }
        }
        Command::DayAdd { owner, date, resort, notes } => {
            let day = finish(importer.create_day(owner, date, resort, notes.as_deref()))?;
            println!("Day {} recorded on {} (#{})", day.id, day.date, day_label(day.day_number));
        }
        Command::DayMove { day, date, resort } => {
            let day = finish(importer.move_day(day, date, resort))?;
            println!("Day {} moved to {} (#{})", day.id, day.date, day_label(day.day_number));
        }
        Command::DayDelete { day } => {
            finish(importer.delete_day(day))?;
            println!("Day {} deleted", day);
        }
        Command::Commit { session } => {
            let (outcome, _) = with_progress(TaskType::Commit, |tx, cancel| {
                importer.commit_with_progress(session, Some(tx), Some(cancel))
            })?;
            if let Some(report) = &outcome.value {
                println!(
                    "Session {} {}: {} created, {} merged, {} ignored",
                    report.session_id,
                    report.status,
                    report.created.len(),
                    report.merged.len(),
                    report.ignored
                );
                for failure in &report.failures {
                    match failure.draft_id {
                        Some(id) => println!("  draft {}: {}", id, failure.reason),
                        None => println!("  {}", failure.reason),
                    }
                }
            }
            finish(outcome)?;
        }
        Command::Cancel { session } => {
            let session = finish(importer.cancel(session))?;
            println!("Session {} {}", session.id, session.status);
        }
        Command::Renumber { owner, dates } => {
            let summary = finish(importer.renumber(owner, &dates))?;
            println!(
                "{} seasons, {} days, {} numbers changed",
                summary.seasons, summary.days, summary.updated
            );
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let _ = logging::init(None);

    let config = Config::load(args.config_path.as_deref())?;
    if config.scanner.parallelism > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.scanner.parallelism)
            .build_global()?;
    }

    let db = Database::open(&config.db_path)?;
    db.initialize()?;

    run(args, config, Arc::new(db))
}
