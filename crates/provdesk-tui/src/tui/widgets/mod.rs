// TUI widget modules, one per screen zone.

pub mod estimate_panel;
pub mod help_bar;
pub mod notice_banner;
pub mod request_form;
pub mod status_bar;
