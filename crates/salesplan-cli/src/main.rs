//! `salesplan`: command-line client for the sales-planning API.
//!
//! # Usage
//!
//! ```text
//! salesplan --url http://localhost:3001 plans list
//! salesplan --config ~/.config/salesplan/config.toml view review --year 2025
//! salesplan row approve <PLAN_ID> 0
//! salesplan watch
//! ```

mod client;
mod render;
mod watch;

use std::{
  io::Read as _,
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use salesplan_core::{
  plan::{Figure, PlanInput, RowInput, WorkflowAction, WorkflowStatus},
  review::{ReviewAction, RowKey, RowStatus},
  roles::RoleSet,
  views::ViewFilter,
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:3001";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "salesplan", about = "Command-line client for the sales-planning API")]
struct Args {
  /// Path to a TOML config file (url, user, poll_interval_ms).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the server (default: http://localhost:3001).
  #[arg(long, env = "SALESPLAN_URL")]
  url: Option<String>,

  /// The acting user, used by `view editor` when `--user` is not given.
  #[arg(long, env = "SALESPLAN_USER")]
  user: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Check that the server is up.
  Health,
  /// Create, inspect and remove sales plans.
  #[command(subcommand)]
  Plans(PlansCommand),
  /// Review a single row.
  #[command(subcommand)]
  Row(RowCommand),
  /// Show one of the derived views.
  #[command(subcommand)]
  View(ViewCommand),
  /// Manage user roles.
  #[command(subcommand)]
  Roles(RolesCommand),
  /// Poll row statuses and print every change.
  Watch {
    /// Poll interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,
  },
}

#[derive(Subcommand, Debug)]
enum PlansCommand {
  /// List plans, newest first.
  List {
    #[arg(long)]
    status: Option<WorkflowStatus>,
  },
  Show { id: Uuid },
  /// Create a plan from a JSON file (`-` for stdin).
  Create { file: PathBuf },
  /// Replace a plan from a JSON file.
  Update {
    id:   Uuid,
    file: PathBuf,
    /// ETag from `plans show`. Without it the write is unconditional.
    #[arg(long)]
    if_match: Option<String>,
  },
  Delete { id: Uuid },
  /// Delete every plan and row status.
  Clear {
    #[arg(long)]
    yes: bool,
  },
  /// Move a plan along its workflow: submit, approve, deny, publish, revise.
  Workflow { id: Uuid, action: WorkflowAction },
}

#[derive(ClapArgs, Debug)]
struct RowRef {
  plan_id: Uuid,
  ordinal: usize,
}

impl RowRef {
  fn key(&self) -> RowKey { RowKey::new(self.plan_id, self.ordinal) }
}

#[derive(Subcommand, Debug)]
enum RowCommand {
  Approve(RowRef),
  Deny(RowRef),
  Publish(RowRef),
  Reset(RowRef),
  Resubmit(RowRef),
  /// Replace the row's values and return it to pending.
  Revise {
    #[command(flatten)]
    row:           RowRef,
    #[arg(long)]
    period:        String,
    #[arg(long)]
    hfb:           Option<String>,
    #[arg(long)]
    sales_goal:    f64,
    #[arg(long)]
    actual_sales:  f64,
    #[arg(long)]
    qty:           Option<f64>,
  },
}

#[derive(ClapArgs, Debug, Default)]
struct FilterArgs {
  #[arg(long)]
  year:    Option<String>,
  #[arg(long)]
  country: Option<String>,
  #[arg(long)]
  hfb:     Option<String>,
  #[arg(long)]
  status:  Option<RowStatus>,
}

impl FilterArgs {
  /// `All` on the command line means the same as omitting the flag.
  fn into_filter(self) -> ViewFilter {
    let keep = |v: Option<String>| v.filter(|s| !s.eq_ignore_ascii_case("all"));
    ViewFilter {
      year:    keep(self.year),
      country: keep(self.country),
      hfb:     keep(self.hfb),
      status:  self.status,
    }
  }
}

#[derive(Subcommand, Debug)]
enum ViewCommand {
  /// Plans owned by a user, minus published rows.
  Editor {
    #[arg(long)]
    user:    Option<String>,
    #[command(flatten)]
    filters: FilterArgs,
  },
  /// Pending and approved rows across all plans.
  Review {
    #[command(flatten)]
    filters: FilterArgs,
  },
  /// Published rows with totals.
  Published {
    #[command(flatten)]
    filters: FilterArgs,
  },
  /// Row counts by status.
  Counts,
}

#[derive(Subcommand, Debug)]
enum RolesCommand {
  List,
  /// Replace a user's roles with exactly the flags given.
  Set {
    user:       String,
    #[arg(long)]
    input_user: bool,
    #[arg(long)]
    reviewer:   bool,
    #[arg(long)]
    admin:      bool,
  },
  /// Show the tabs a user can see.
  Tabs { user: String },
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug, PartialEq)]
struct ConfigFile {
  #[serde(default)]
  url:              String,
  #[serde(default)]
  user:             String,
  #[serde(default)]
  poll_interval_ms: Option<u64>,
}

/// Settings after merging flags, the config file and defaults.
#[derive(Debug, PartialEq)]
struct Settings {
  url:           String,
  user:          Option<String>,
  poll_interval: Duration,
}

/// CLI flags override config file, which overrides defaults.
fn resolve(url: Option<String>, user: Option<String>, file: ConfigFile) -> Settings {
  Settings {
    url:           url
      .or_else(|| (!file.url.is_empty()).then(|| file.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    user:          user.or_else(|| (!file.user.is_empty()).then(|| file.user.clone())),
    poll_interval: Duration::from_millis(
      file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
    ),
  }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
  let raw = if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).context("reading stdin")?;
    buf
  } else {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
  };
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let settings = resolve(args.url, args.user, file_cfg);
  let client = ApiClient::new(ApiConfig { base_url: settings.url.clone() })?;

  match args.command {
    Command::Health => {
      let health = client.health().await?;
      println!("{}", health["message"].as_str().unwrap_or("OK"));
    }
    Command::Plans(cmd) => plans(&client, cmd).await?,
    Command::Row(cmd) => row(&client, cmd).await?,
    Command::View(cmd) => view(&client, &settings, cmd).await?,
    Command::Roles(cmd) => roles(&client, cmd).await?,
    Command::Watch { interval_ms } => {
      let interval = interval_ms.map_or(settings.poll_interval, Duration::from_millis);
      watch::run(&client, interval).await?;
    }
  }
  Ok(())
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn plans(client: &ApiClient, cmd: PlansCommand) -> Result<()> {
  match cmd {
    PlansCommand::List { status } => {
      let status = status.map(|s| s.as_ref().to_owned());
      print!("{}", render::plan_summaries(&client.list_plans(status.as_deref()).await?));
    }
    PlansCommand::Show { id } => {
      let (plan, etag) = client.get_plan(id).await?;
      print!("{}", render::plan(&plan, etag.as_deref()));
    }
    PlansCommand::Create { file } => {
      let input: PlanInput = read_json(&file)?;
      println!("{}", client.create_plan(&input).await?);
    }
    PlansCommand::Update { id, file, if_match } => {
      let input: PlanInput = read_json(&file)?;
      client.update_plan(id, &input, if_match.as_deref()).await?;
      println!("updated {id}");
    }
    PlansCommand::Delete { id } => {
      client.delete_plan(id).await?;
      println!("deleted {id}");
    }
    PlansCommand::Clear { yes } => {
      if !yes {
        bail!("refusing to delete every plan without --yes");
      }
      println!("deleted {} plans", client.clear_plans().await?);
    }
    PlansCommand::Workflow { id, action } => {
      let plan = client.workflow(id, action).await?;
      println!("{id} is now {}", plan.status);
    }
  }
  Ok(())
}

async fn row(client: &ApiClient, cmd: RowCommand) -> Result<()> {
  let (key, action) = match cmd {
    RowCommand::Approve(r) => (r.key(), ReviewAction::Approve),
    RowCommand::Deny(r) => (r.key(), ReviewAction::Deny),
    RowCommand::Publish(r) => (r.key(), ReviewAction::Publish),
    RowCommand::Reset(r) => (r.key(), ReviewAction::Reset),
    RowCommand::Resubmit(r) => (r.key(), ReviewAction::Resubmit),
    RowCommand::Revise { row, period, hfb, sales_goal, actual_sales, qty } => {
      let input = RowInput {
        planning_period: Some(period),
        hfb,
        sales_goal: Some(Figure::from(sales_goal)),
        actual_sales: Some(Figure::from(actual_sales)),
        variance: None,
        qty: qty.map(Figure::from),
      };
      let plan = client.revise_row(row.key(), &input).await?;
      print!("{}", render::plan(&plan, None));
      return Ok(());
    }
  };
  let status = client.row_action(key, action).await?;
  println!("{key} {status}");
  Ok(())
}

async fn view(client: &ApiClient, settings: &Settings, cmd: ViewCommand) -> Result<()> {
  match cmd {
    ViewCommand::Editor { user, filters } => {
      let Some(user) = user.or_else(|| settings.user.clone()) else {
        bail!("no user given; pass --user or set SALESPLAN_USER");
      };
      let view = client.editor_view(&user, &filters.into_filter()).await?;
      print!("{}", render::editor(&view));
    }
    ViewCommand::Review { filters } => {
      print!("{}", render::review(&client.review_queue(&filters.into_filter()).await?));
    }
    ViewCommand::Published { filters } => {
      let report = client.published_report(&filters.into_filter()).await?;
      print!("{}", render::published(&report));
    }
    ViewCommand::Counts => println!("{}", render::counts(&client.counts().await?)),
  }
  Ok(())
}

async fn roles(client: &ApiClient, cmd: RolesCommand) -> Result<()> {
  match cmd {
    RolesCommand::List => {
      for (user, r) in client.list_roles().await? {
        println!(
          "{user:<32} inputUser={} reviewer={} admin={}",
          r.input_user, r.reviewer, r.admin
        );
      }
    }
    RolesCommand::Set { user, input_user, reviewer, admin } => {
      let roles = RoleSet { input_user, reviewer, admin };
      client.set_roles(&user, roles).await?;
      println!("updated roles of {user}");
    }
    RolesCommand::Tabs { user } => {
      let tabs: Vec<String> =
        client.tabs(&user).await?.iter().map(ToString::to_string).collect();
      println!("{}", tabs.join(" "));
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_file_which_overrides_defaults() {
    let file = ConfigFile {
      url:              "http://plans.internal:8080".into(),
      user:             "editor@example.com".into(),
      poll_interval_ms: Some(250),
    };
    let s = resolve(Some("http://localhost:9999".into()), None, file);
    assert_eq!(s.url, "http://localhost:9999");
    assert_eq!(s.user.as_deref(), Some("editor@example.com"));
    assert_eq!(s.poll_interval, Duration::from_millis(250));

    let s = resolve(None, None, ConfigFile::default());
    assert_eq!(s, Settings {
      url:           DEFAULT_URL.into(),
      user:          None,
      poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
    });
  }

  #[test]
  fn config_file_parses_from_toml() {
    let cfg: ConfigFile =
      toml::from_str("url = \"http://x\"\npoll_interval_ms = 5000\n").unwrap();
    assert_eq!(cfg.url, "http://x");
    assert_eq!(cfg.user, "");
    assert_eq!(cfg.poll_interval_ms, Some(5000));
  }

  #[test]
  fn all_filters_are_dropped() {
    let filter = FilterArgs {
      year:    Some("All".into()),
      country: Some("Sweden".into()),
      ..FilterArgs::default()
    }
    .into_filter();
    assert_eq!(filter.year, None);
    assert_eq!(filter.country.as_deref(), Some("Sweden"));
  }

  #[test]
  fn command_line_parses() {
    let id = Uuid::nil();
    let args = Args::try_parse_from([
      "salesplan", "row", "revise", &id.to_string(), "2", "--period", "T2",
      "--sales-goal", "10", "--actual-sales", "12",
    ])
    .unwrap();
    assert!(matches!(args.command, Command::Row(RowCommand::Revise { ref row, .. }) if row.ordinal == 2));

    let args = Args::try_parse_from(["salesplan", "plans", "workflow", &id.to_string(), "submit"])
      .unwrap();
    assert!(matches!(
      args.command,
      Command::Plans(PlansCommand::Workflow { action: WorkflowAction::Submit, .. })
    ));
  }

  #[test]
  fn plan_update_is_unconditional_without_if_match() {
    let id = Uuid::nil().to_string();
    let args = Args::try_parse_from(["salesplan", "plans", "update", &id, "plan.json"]).unwrap();
    assert!(matches!(args.command, Command::Plans(PlansCommand::Update { if_match: None, .. })));

    let args = Args::try_parse_from([
      "salesplan", "plans", "update", &id, "plan.json", "--if-match", "\"abc\"",
    ])
    .unwrap();
    let Command::Plans(PlansCommand::Update { if_match, .. }) = args.command else {
      panic!("expected plans update");
    };
    assert_eq!(if_match.as_deref(), Some("\"abc\""));
  }
}
