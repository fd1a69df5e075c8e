//! Command handlers. Results go to stdout as JSON, logs go to stderr.

use almanac_app::{
    create_activity_action, update_activity_action, ActionResult, ActivityForm, AlmanacApp,
    RenderContext, RenderError, RouteParams, SuspenseBoundary,
};
use almanac_core::{Activity, ActivityId, AlmanacConfig, DateRange};
use almanac_store::{seeded_service, Backend};
use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;
use tracing::info;

#[derive(Args)]
pub struct EditArgs {
    /// Activity id as it appears in a route
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// Start time, YYYY-MM-DDTHH:MM or RFC 3339
    #[arg(long)]
    pub start: Option<String>,
    /// End time, YYYY-MM-DDTHH:MM or RFC 3339
    #[arg(long)]
    pub end: Option<String>,
    /// work, personal or health
    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "")]
    pub location: String,
    /// Start time, YYYY-MM-DDTHH:MM or RFC 3339
    #[arg(long)]
    pub start: String,
    /// End time, YYYY-MM-DDTHH:MM or RFC 3339
    #[arg(long)]
    pub end: String,
    /// work, personal or health
    #[arg(long, default_value = "personal")]
    pub category: String,
}

pub fn build_app(backend: Backend, config: &AlmanacConfig, today: NaiveDate) -> Result<AlmanacApp> {
    let service = seeded_service(backend, config, today)?;
    info!(%backend, month = %today.format("%Y-%m"), "calendar seeded");
    Ok(AlmanacApp::new(service, config))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn render<V, F>(render: F) -> Result<V>
where
    F: FnMut(&mut RenderContext) -> std::result::Result<V, RenderError>,
{
    let rendered = SuspenseBoundary::new().render(render).await?;
    info!(
        passes = rendered.passes,
        suspensions = rendered.suspensions.len(),
        "rendered"
    );
    Ok(rendered.value)
}

pub async fn list(app: &AlmanacApp) -> Result<()> {
    let data = app.loader().load(&RouteParams::index());
    let activities = render(|ctx| Ok(ctx.read(&data.activities)?.many())).await?;
    print_json(&activities)
}

async fn selected(app: &AlmanacApp, id: &str) -> Result<Option<Activity>> {
    let data = app.loader().load(&RouteParams::activity(id));
    render(|ctx| {
        ctx.read(&data.activities)?;
        match &data.selected_activity {
            Some(selected) => Ok(ctx.read(selected)?.one()),
            None => Ok(None),
        }
    })
    .await
}

pub async fn show(app: &AlmanacApp, id: &str) -> Result<()> {
    print_json(&selected(app, id).await?)
}

pub async fn range(app: &AlmanacApp, from: NaiveDate, to: NaiveDate) -> Result<()> {
    let handle = app.loader().range(DateRange::days(from, to)?);
    let activities = render(|ctx| Ok(ctx.read(&handle)?.many())).await?;
    print_json(&activities)
}

fn form_from(current: &Activity, args: EditArgs) -> ActivityForm {
    ActivityForm {
        title: args.title.unwrap_or_else(|| current.title.clone()),
        description: args
            .description
            .unwrap_or_else(|| current.description.clone()),
        location: args.location.unwrap_or_else(|| current.location.clone()),
        start_time: args
            .start
            .unwrap_or_else(|| current.start_time.to_rfc3339()),
        end_time: args.end.unwrap_or_else(|| current.end_time.to_rfc3339()),
        category: args
            .category
            .unwrap_or_else(|| current.category.to_string()),
    }
}

fn finish(result: ActionResult) -> Result<()> {
    print_json(&result)?;
    match result.error {
        Some(error) if !result.success => bail!(error),
        _ => Ok(()),
    }
}

pub async fn edit(app: &AlmanacApp, args: EditArgs) -> Result<()> {
    let Some(current) = selected(app, &args.id).await? else {
        bail!("Activity not found: {}", args.id);
    };
    let id = args.id.clone();
    let form = form_from(&current, args);

    let detail = app.loader().activity(current.id).settled().await?;
    let _watch = detail.subscribe(|data| {
        if let Some(activity) = data.clone().one() {
            info!(id = %activity.id, title = %activity.title, "detail view updated");
        }
    });

    let coordinator = app.coordinator();
    coordinator.begin_edit(current.id);
    let result = update_activity_action(coordinator, &id, &form).await;
    info!(status = ?coordinator.state().status, "edit finished");
    finish(result)
}

pub async fn create(app: &AlmanacApp, args: CreateArgs) -> Result<()> {
    let form = ActivityForm {
        title: args.title,
        description: args.description,
        location: args.location,
        start_time: args.start,
        end_time: args.end,
        category: args.category,
    };
    finish(create_activity_action(app.coordinator(), &form).await)
}

#[derive(Serialize)]
struct Deleted {
    id: ActivityId,
    deleted: bool,
}

pub async fn delete(app: &AlmanacApp, id: &str) -> Result<()> {
    let id = ActivityId::from_route(id)?;
    let deleted = app.coordinator().delete(id).await?;
    print_json(&Deleted { id, deleted })
}
