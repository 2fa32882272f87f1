pub mod dashboard_cmd;
pub mod output;
pub mod renderer;
pub mod settings_cmd;
pub mod settings_panel;
pub mod watch_cmd;
