use anyhow::Context;
use drivelist_core::{DirectoryEntry, DriveClient, ErrorClass, FolderCount, SearchScope};
use drivelistd::config::SessionConfig;
use drivelistd::report::ActivityReport;
use drivelistd::session::{BrowseSession, SessionEvent};
use log::{debug, info};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CliMode {
    List,
    Report,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    mode: CliMode,
    search: Option<String>,
    scope: SearchScope,
    json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Help,
    Run(CliArgs),
}

fn parse_cli_args<I>(args: I) -> anyhow::Result<CliCommand>
where
    I: IntoIterator<Item = String>,
{
    let mut parsed = CliArgs {
        mode: CliMode::List,
        search: None,
        scope: SearchScope::Global,
        json: false,
    };
    let mut args = args.into_iter().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--report" => parsed.mode = CliMode::Report,
            "--help" | "-h" => return Ok(CliCommand::Help),
            "--search" => {
                parsed.search = Some(args.next().context("--search needs a value")?);
            }
            "--current" => parsed.scope = SearchScope::Current,
            "--global" => parsed.scope = SearchScope::Global,
            "--json" => parsed.json = true,
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }
    Ok(CliCommand::Run(parsed))
}

fn print_usage() {
    println!("Usage: drivelistd [--search TEXT [--global|--current]] [--report] [--json]");
    println!("  --search TEXT   List entries whose name contains TEXT");
    println!("  --current       Search only inside the root container");
    println!("  --global        Search everything accessible (default)");
    println!("  --report        Print folder activity for the selected time range");
    println!("  --json          Print machine-readable output");
}

fn describe_event(event: &SessionEvent) {
    match event {
        SessionEvent::LoadStarted {
            generation,
            container_id,
        } => debug!("load {generation} started for {container_id}"),
        SessionEvent::Batch {
            generation,
            entries,
        } => debug!("load {generation} received {} entries", entries.len()),
        SessionEvent::TimeRangeWidened { .. } => {
            info!("nothing changed in the selected range; showing all time")
        }
        SessionEvent::WiderRangeAvailable { entries, .. } => {
            info!("nothing changed in the selected range; {entries} entries exist overall")
        }
        SessionEvent::LoadFinished { generation, total } => {
            debug!("load {generation} finished with {total} entries")
        }
        SessionEvent::LoadFailed { .. } => {}
        SessionEvent::StatsMerged { counts } => debug!("merged {} folder counts", counts.len()),
    }
}

fn entry_line(entry: &DirectoryEntry, count: Option<FolderCount>) -> String {
    let detail = if entry.is_folder() {
        match count.and_then(FolderCount::counted) {
            Some(count) => format!("{count} folders"),
            None => "-".to_string(),
        }
    } else {
        entry
            .size_bytes()
            .map(|size| format!("{size} B"))
            .unwrap_or_else(|| "-".to_string())
    };
    let kind = if entry.is_folder() { "dir " } else { "file" };
    format!(
        "{kind}  {}  {:<12}  {}",
        entry.last_modified.date(),
        detail,
        entry.name
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_cli_args(std::env::args())? {
        CliCommand::Help => {
            print_usage();
            return Ok(());
        }
        CliCommand::Run(args) => args,
    };

    let config = SessionConfig::from_env()?;
    let client = DriveClient::with_base_url(&config.base_url, config.api_key.clone())
        .context("invalid DRIVE_API_BASE_URL")?;
    let (session, mut events) = BrowseSession::new(
        client,
        config.root_id.clone(),
        config.root_name.clone(),
        config.session_options(),
    );
    let listener = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            describe_event(&event);
        }
    });

    let outcome = match args.search.clone() {
        Some(text) => session.set_search(Some(text), args.scope).await,
        None => session.load().await,
    };
    if let Err(err) = outcome {
        let hint = match err.class() {
            ErrorClass::Access => "check DRIVE_API_KEY, DRIVE_ROOT_ID and folder sharing",
            ErrorClass::Transient => "try again later",
            ErrorClass::Request => "adjust the search",
        };
        anyhow::bail!("{err} ({hint})");
    }

    match args.mode {
        CliMode::Report => {
            let report = ActivityReport::build(
                &session.entries(),
                session.time_range(),
                OffsetDateTime::now_utc(),
            );
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "new folders: {}  updated folders: {}  size: {} B",
                    report.new_folders, report.updated_folders, report.total_size
                );
                println!(
                    "images: {}  videos: {}  other files: {}",
                    report.image_files, report.video_files, report.other_files
                );
                for day in &report.daily {
                    println!(
                        "{}  new {:>3}  updated {:>3}",
                        day.day, day.new_folders, day.updated_folders
                    );
                }
            }
        }
        CliMode::List => {
            session.enrich_visible(None).await;
            let entries = session.entries();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                let crumbs: Vec<String> = session.path().into_iter().map(|c| c.name).collect();
                println!("{} ({})", crumbs.join(" / "), session.time_range());
                for entry in &entries {
                    println!("{}", entry_line(entry, session.folder_count(&entry.id)));
                }
                let summary = session.summary(None);
                println!(
                    "{} folders, {} files, {} total",
                    summary.folders, summary.files, summary.total
                );
            }
        }
    }

    drop(session);
    listener.await.ok();
    Ok(())
}
