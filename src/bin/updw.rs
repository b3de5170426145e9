use clap::{Parser, Subcommand};

use updw::detail::{EntityDetail, HomeSummary, TasksHome};
use updw::{Dashboard, EntityKind, PercentChange, Period, RangePair};

#[derive(Parser)]
#[command(name = "updw", about = "Comparative analytics over the content catalog warehouse")]
struct Cli {
    /// Database path (default: ~/.updw/updw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare an entity over two date ranges
    Detail {
        #[command(subcommand)]
        target: DetailTarget,
    },
    /// Project counts by status
    Home {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Visits per task over a range
    Tasks {
        /// Date range (<start>/<end>)
        #[arg(long)]
        range: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show warehouse status
    Status,
}

#[derive(clap::Args)]
struct RangeArgs {
    /// Primary date range (<start>/<end>)
    #[arg(long, requires = "comparison", conflicts_with = "period")]
    range: Option<String>,
    /// Comparison date range (<start>/<end>)
    #[arg(long, requires = "range")]
    comparison: Option<String>,
    /// Named period compared with the one before it (e.g. 2024-Q1, 2024-03, 30d)
    #[arg(long, default_value = "30d")]
    period: String,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

impl RangeArgs {
    fn resolve(&self) -> anyhow::Result<RangePair> {
        match (&self.range, &self.comparison) {
            (Some(range), Some(comparison)) => Ok(RangePair::parse(range, comparison)?),
            _ => Ok(RangePair::from_period(&Period::parse(&self.period)?)?),
        }
    }
}

#[derive(Subcommand)]
enum DetailTarget {
    /// Detail for a project
    Project {
        #[arg(value_name = "PROJECT_ID")]
        id: String,
        #[command(flatten)]
        ranges: RangeArgs,
    },
    /// Detail for a task
    Task {
        #[arg(value_name = "TASK_ID")]
        id: String,
        #[command(flatten)]
        ranges: RangeArgs,
    },
    /// Detail for a page
    Page {
        #[arg(value_name = "PAGE_ID")]
        id: String,
        #[command(flatten)]
        ranges: RangeArgs,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => updw::Database::open_at(path).await?,
        None => updw::Database::open().await?,
    };
    let dw = Dashboard::new(db);

    match cli.command {
        Commands::Detail { target } => {
            handle_detail(&dw, target).await?;
        }
        Commands::Home { json } => {
            let home = dw.home_summary().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&home)?);
            } else {
                print_home(&home);
            }
        }
        Commands::Tasks { range, json } => {
            let home = dw.tasks_home(&range).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&home)?);
            } else {
                print_tasks_home(&home);
            }
        }
        Commands::Config { action } => {
            handle_config(&dw, action).await?;
        }
        Commands::Status => {
            print_status(&dw).await?;
        }
    }

    Ok(())
}

async fn handle_detail(dw: &Dashboard, target: DetailTarget) -> anyhow::Result<()> {
    let (kind, id, args) = match target {
        DetailTarget::Project { id, ranges } => (EntityKind::Project, id, ranges),
        DetailTarget::Task { id, ranges } => (EntityKind::Task, id, ranges),
        DetailTarget::Page { id, ranges } => (EntityKind::Page, id, ranges),
    };
    let pair = args.resolve()?;
    let detail = dw
        .entity_detail(kind, Some(&id), &pair.primary_token, &pair.comparison_token)
        .await?
        .ok_or_else(|| anyhow::anyhow!("{kind} {id} not found"))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_detail(&detail);
    }
    Ok(())
}

async fn handle_config(dw: &Dashboard, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match dw.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            dw.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = dw.config_list().await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    println!("{k} = {v}");
                }
            }
        }
    }
    Ok(())
}

async fn print_status(dw: &Dashboard) -> anyhow::Result<()> {
    let stats = dw
        .db()
        .reader()
        .call(|conn| {
            let count = |table: &str| -> Result<i64, rusqlite::Error> {
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
            };
            let latest: Option<String> =
                conn.query_row("SELECT MAX(date_key) FROM fact_page_metrics", [], |row| {
                    row.get(0)
                })?;
            Ok::<_, rusqlite::Error>((
                count("dim_projects")?,
                count("dim_tasks")?,
                count("dim_pages")?,
                count("dim_ux_tests")?,
                count("fact_page_metrics")?,
                count("fact_feedback")?,
                latest,
            ))
        })
        .await?;

    let (projects, tasks, pages, ux_tests, metrics, feedback, latest) = stats;
    println!("Warehouse Status");
    println!("  Projects:     {projects}");
    println!("  Tasks:        {tasks}");
    println!("  Pages:        {pages}");
    println!("  UX tests:     {ux_tests}");
    println!("  Page-days:    {metrics}");
    println!("  Feedback:     {feedback}");
    println!(
        "  Latest day:   {}",
        latest.unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}

fn fmt_change(change: Option<&PercentChange>) -> String {
    match change {
        Some(PercentChange::Ratio(r)) => format!("{:+.1}%", r * 100.0),
        Some(PercentChange::NoChange) => "no change".to_string(),
        Some(PercentChange::Undefined) => "new".to_string(),
        None => "-".to_string(),
    }
}

fn print_detail(d: &EntityDetail) {
    println!("{} {}: {}", d.kind, d.id, d.title);
    println!("  Range:      {} vs {}", d.date_range, d.comparison_date_range);
    println!("  Status:     {}{}", d.status, if d.cops { " (COPS)" } else { "" });

    let totals = &d.date_range_data.totals;
    let change = |key: &str| fmt_change(d.totals_change.get(key));
    println!("  Traffic:");
    println!("    Visits:      {} ({})", totals.visits, change("visitsChange"));
    println!(
        "    DYF yes/no:  {}/{} ({}/{})",
        totals.dyf_yes,
        totals.dyf_no,
        change("dyf_yesChange"),
        change("dyf_noChange")
    );
    println!(
        "    GSC clicks:  {} ({})",
        totals.gsc_total_clicks,
        change("gsc_total_clicksChange")
    );
    println!(
        "    GSC CTR:     {:.2}% at position {:.1}",
        totals.gsc_total_ctr * 100.0,
        totals.gsc_total_position
    );
    println!(
        "    Calls:       {} ({})",
        d.date_range_data.calldrivers.total_calldrivers,
        change("total_calldriversChange")
    );

    if let Some(avg) = d.avg_task_success_from_last_test {
        println!("  UX tests:");
        println!(
            "    Last test:   {} avg success {:.1}% ({})",
            d.date_from_last_test.as_deref().unwrap_or("-"),
            avg * 100.0,
            fmt_change(d.avg_success_percent_change.as_ref())
        );
    }

    if !d.search_terms.is_empty() {
        println!("  Search terms:");
        for t in &d.search_terms {
            println!(
                "    {:<30} {:>6} ({})",
                t.current.term,
                t.current.clicks,
                fmt_change(t.changes.get("clicksChange"))
            );
        }
    }

    println!(
        "  Comments:     {} ({})",
        d.num_comments,
        fmt_change(Some(&d.num_comments_percent_change))
    );
    let words: Vec<&str> = d
        .most_relevant_comments_and_words
        .en
        .words
        .iter()
        .chain(&d.most_relevant_comments_and_words.fr.words)
        .map(|w| w.word.as_str())
        .collect();
    if !words.is_empty() {
        println!("  Top words:    {}", words.join(", "));
    }
}

fn print_home(h: &HomeSummary) {
    println!("Projects");
    println!("  In progress:        {}", h.num_in_progress);
    println!("  Planning:           {}", h.num_planning);
    println!("  Delayed:            {}", h.num_delayed);
    println!("  Completed:          {}", h.total_completed);
    println!("  Completed recently: {}", h.num_completed_recently);
    println!("  Completed COPS:     {}", h.completed_cops);
    for p in &h.projects {
        println!(
            "  {:<40} {:<16} {}",
            p.title,
            p.status,
            p.start_date.as_deref().unwrap_or("-")
        );
    }
}

fn print_tasks_home(h: &TasksHome) {
    println!("Tasks for {} ({} visits)", h.date_range, h.total_visits);
    for t in &h.tasks {
        println!("  {:<50} {:>8}", t.title, t.visits);
    }
}
