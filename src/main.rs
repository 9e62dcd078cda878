use bevy::{
    prelude::*,
    winit::{UpdateMode, WinitSettings},
};

use bevy_egui::EguiPlugin;
use form::FormPlugin;
use settings::SettingsPlugin;

pub mod eia;
pub mod form;
pub mod http;
pub mod llm;
pub mod present;
pub mod settings;
pub mod types;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Energy Cost Advisor".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }))
        .add_plugins(EguiPlugin {
            enable_multipass_for_primary_context: false,
        })
        // Jobs finish in the background, so keep ticking while unfocused.
        .insert_resource(WinitSettings {
            unfocused_mode: UpdateMode::Reactive {
                wait: std::time::Duration::from_millis(250),
                react_to_device_events: true,
                react_to_user_events: true,
                react_to_window_events: true,
            },
            ..Default::default()
        })
        .insert_resource(ClearColor(Color::from(Srgba {
            red: 0.12,
            green: 0.12,
            blue: 0.14,
            alpha: 1.0,
        })))
        .add_systems(Startup, spawn_camera)
        .add_plugins(SettingsPlugin)
        .add_plugins(FormPlugin)
        .run();
}

// egui draws through a camera; nothing else is rendered.
fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}
