//! # Form Orchestrator
//!
//! Drives the data form: the user picks a route, the form discovers its
//! frequencies, facets, data fields and available dates, the user narrows the
//! selection and fetches a table, then asks for an analysis of it.
//!
//! ## Pieces
//! - `session`: selection state and the rules for moving between stages
//! - `jobs`: the remote work a session asks for and how it runs
//! - `worker`: runs jobs on the async compute pool and hands outcomes back
//! - `ui`: the egui controls
//!
//! All network calls and retry waits happen on the task pool; the frame loop
//! only mutates the session and drains finished jobs.

#[cfg(test)]
mod fakes;
mod jobs;
mod session;
mod ui;
mod worker;

use bevy::prelude::*;

pub use jobs::*;
pub use session::*;
pub use worker::*;

use crate::settings::Settings;

const MAX_WORKERS: usize = 3;

#[derive(Resource)]
pub struct FormState {
    pub session: FormSession,
    pub preview_rows: usize,
}

pub struct FormPlugin;

impl Plugin for FormPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_form).add_systems(
            Update,
            (
                sync_settings,
                ui::form_ui,
                process_jobs,
                collect_outcomes,
                cleanup_tasks,
            )
                .chain(),
        );
    }
}

fn setup_form(mut commands: Commands, settings: Res<Settings>) {
    commands.insert_resource(JobWorker::new(MAX_WORKERS, settings.job_context()));
    commands.insert_resource(FormState {
        session: FormSession::new(settings.max_fetch_rows, settings.route_limit),
        preview_rows: settings.preview_rows,
    });
}

/// Rebuilds the clients when settings change (credentials typed in the
/// panel) and loads the route list once everything needed is there.
fn sync_settings(
    settings: Res<Settings>,
    mut worker: ResMut<JobWorker>,
    mut form: ResMut<FormState>,
) {
    if !settings.is_changed() {
        return;
    }
    worker.set_context(settings.job_context());
    form.preview_rows = settings.preview_rows;

    if settings.is_ready()
        && form.session.routes.is_empty()
        && !form.session.is_busy(JobKind::Routes)
    {
        info!("Loading data routes");
        let request = form.session.load_routes();
        worker.queue(request);
    }
}
